//! Stream transport
//!
//! Reads framed messages from a byte stream and writes replies to another,
//! one message at a time: a message is fully dispatched, and its reply
//! flushed, before the next one is read.

use futures::StreamExt;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio_util::codec::FramedRead;
use tracing::{Level, debug, info, warn};

use crate::log_lsp_message;
use crate::lsp::LspCodec;
use crate::server::context::ServerContext;
use crate::server::dispatcher::Dispatcher;
use crate::server::error::ServerError;
use crate::validator::Validator;

/// Serve one client over a reader/writer pair until EOF, `exit`, or a
/// desynchronized stream.
pub async fn run_stream<R, W, V>(
    reader: R,
    mut writer: W,
    ctx: &mut ServerContext,
    dispatcher: &Dispatcher<V>,
) -> Result<(), ServerError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
    V: Validator,
{
    let mut frames = FramedRead::new(reader, LspCodec::new());

    while let Some(frame) = frames.next().await {
        let frame = frame?;
        let desynchronized = matches!(&frame, Err(e) if e.is_desynchronized());

        if let Some(outgoing) = dispatcher.dispatch(ctx, frame).await {
            let framed = outgoing.to_framed()?;
            if ctx.options.verbose {
                log_lsp_message!(Level::DEBUG, "outgoing", "stdio", &framed);
            }
            writer.write_all(framed.as_bytes()).await?;
            writer.flush().await?;
        }

        if desynchronized {
            warn!("Message stream desynchronized, closing session");
            break;
        }
        if ctx.exit_requested() {
            info!("Client requested exit");
            break;
        }
    }

    debug!("Stream session finished");
    Ok(())
}

/// Serve on the process's stdin/stdout
pub async fn serve_stdio<V: Validator>(
    ctx: &mut ServerContext,
    dispatcher: &Dispatcher<V>,
) -> Result<(), ServerError> {
    info!("Listening for LSP messages on stdin");
    run_stream(tokio::io::stdin(), tokio::io::stdout(), ctx, dispatcher).await
}
