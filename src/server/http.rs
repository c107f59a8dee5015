//! HTTP transport
//!
//! Each `POST /` carries one framed LSP message; the reply body is the framed
//! outgoing message. Requests are dispatched one at a time under the context
//! lock, so the workspace never sees concurrent mutation.

use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::post,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tracing::{Level, error, info};

use crate::log_lsp_message;
use crate::lsp::MessageFramer;
use crate::server::context::ServerContext;
use crate::server::dispatcher::Dispatcher;
use crate::server::error::ServerError;
use crate::validator::Validator;

/// State shared by all HTTP handlers
pub struct HttpState<V: Validator> {
    pub context: Mutex<ServerContext>,
    pub dispatcher: Dispatcher<V>,
}

impl<V: Validator> HttpState<V> {
    pub fn new(context: ServerContext, dispatcher: Dispatcher<V>) -> Self {
        Self {
            context: Mutex::new(context),
            dispatcher,
        }
    }
}

pub fn router<V: Validator + 'static>(state: Arc<HttpState<V>>) -> Router {
    Router::new()
        .route("/", post(handle_rpc::<V>))
        .with_state(state)
}

/// Bind `address` and serve until the listener fails
pub async fn serve_http<V: Validator + 'static>(
    address: &str,
    state: Arc<HttpState<V>>,
) -> Result<(), ServerError> {
    let listener = TcpListener::bind(address)
        .await
        .map_err(|source| ServerError::Bind {
            address: address.to_string(),
            source,
        })?;
    info!("Starting web server on http://{}", address);

    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn handle_rpc<V: Validator + 'static>(
    State(state): State<Arc<HttpState<V>>>,
    body: Bytes,
) -> Response {
    let mut framer = MessageFramer::new();
    let incoming = framer.feed(&body).and_then(|()| framer.take_message());

    let (outgoing, verbose) = {
        let mut context = state.context.lock().await;
        let outgoing = state.dispatcher.dispatch(&mut context, incoming).await;
        (outgoing, context.options.verbose)
    };

    let Some(outgoing) = outgoing else {
        return StatusCode::NO_CONTENT.into_response();
    };

    match outgoing.to_framed() {
        Ok(framed) => {
            if verbose {
                log_lsp_message!(Level::DEBUG, "outgoing", "http", &framed);
            }
            ([(header::CONTENT_TYPE, "text/plain")], framed).into_response()
        }
        Err(e) => {
            error!("Failed to serialize response: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}
