//! Message dispatcher
//!
//! Routes one parsed message to its handler, enforcing the initialize
//! handshake, and produces at most one outgoing message. Every protocol
//! failure is answered here; nothing below the transport sees an error.

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Instant;
use tracing::{Level, debug, error, info, warn};

use crate::diagnostics::DiagnosticTranslator;
use crate::lsp::jsonrpc_utils::{notification, null_success_response, success_response};
use crate::lsp::types::{
    DidChangeTextDocumentParams, DidCloseTextDocumentParams, DidOpenTextDocumentParams,
    JsonRpcMessage, PublishDiagnosticsParams,
};
use crate::lsp::{FramingError, OutgoingMessage, RawMessage};
use crate::server::capabilities::initialize_result;
use crate::server::context::ServerContext;
use crate::server::error::DispatchError;
use crate::validator::{Validator, ValidatorError};
use crate::{log_lsp_message, log_timing};

pub const PUBLISH_DIAGNOSTICS: &str = "textDocument/publishDiagnostics";

pub struct Dispatcher<V: Validator> {
    validator: V,
    translator: DiagnosticTranslator,
}

impl<V: Validator> Dispatcher<V> {
    pub fn new(validator: V) -> Self {
        Self {
            validator,
            translator: DiagnosticTranslator::default(),
        }
    }

    #[cfg(test)]
    pub fn validator(&self) -> &V {
        &self.validator
    }

    /// Handle the outcome of framing one message.
    ///
    /// Framing failures are answered with a parse error regardless of the
    /// initialization state.
    pub async fn dispatch(
        &self,
        ctx: &mut ServerContext,
        incoming: Result<RawMessage, FramingError>,
    ) -> Option<OutgoingMessage> {
        match incoming {
            Ok(message) => self.handle_message(ctx, &message).await,
            Err(e) => {
                warn!("Failed to parse incoming message: {}", e);
                Some(DispatchError::Parse.into_response(Value::Null))
            }
        }
    }

    pub async fn handle_message(
        &self,
        ctx: &mut ServerContext,
        message: &RawMessage,
    ) -> Option<OutgoingMessage> {
        let request: JsonRpcMessage = match serde_json::from_value(message.body.clone()) {
            Ok(request) => request,
            Err(e) => {
                warn!("Message body is not a JSON-RPC object: {}", e);
                return Some(DispatchError::Parse.into_response(Value::Null));
            }
        };
        let id = request.id.clone().unwrap_or(Value::Null);

        let Some(method) = request.method.as_deref() else {
            warn!("Message has no method");
            return Some(DispatchError::Parse.into_response(id));
        };

        info!("Received message of type '{}'", method);
        if ctx.options.verbose {
            for (name, value) in &message.headers {
                debug!("Header {}: {}", name, value);
            }
            log_lsp_message!(Level::DEBUG, "incoming", method, &message.body);
            debug!("Raw:\n{}", message.raw_text());
        }

        match self.route(ctx, &id, method, request.params).await {
            Ok(outgoing) => outgoing,
            Err(e) => {
                warn!("Rejecting '{}': {}", method, e);
                Some(e.into_response(id))
            }
        }
    }

    async fn route(
        &self,
        ctx: &mut ServerContext,
        id: &Value,
        method: &str,
        params: Option<Value>,
    ) -> Result<Option<OutgoingMessage>, DispatchError> {
        match method {
            "initialize" => {
                ctx.workspace.set_initialized(true);
                let result = serde_json::to_value(initialize_result())?;
                Ok(Some(success_response(id.clone(), result)))
            }
            "initialized" => Ok(None),
            "exit" => {
                ctx.request_exit();
                Ok(None)
            }
            _ if !ctx.workspace.is_initialized() => Err(DispatchError::NotInitialized),
            "textDocument/didOpen" => self.did_open(ctx, method, params).await.map(Some),
            "textDocument/didChange" => self.did_change(ctx, method, params).await.map(Some),
            "textDocument/didClose" => self.did_close(ctx, method, params).map(Some),
            "shutdown" => Ok(Some(null_success_response(id.clone()))),
            other => Err(DispatchError::MethodNotSupported(other.to_string())),
        }
    }

    async fn did_open(
        &self,
        ctx: &mut ServerContext,
        method: &str,
        params: Option<Value>,
    ) -> Result<OutgoingMessage, DispatchError> {
        let params: DidOpenTextDocumentParams = parse_params(method, params)?;
        let document = params.text_document;

        ctx.workspace.add_document(document.uri.clone(), document.text.clone());
        self.publish_diagnostics(ctx, &document.uri, &document.text).await
    }

    /// Full-text sync: only the first content change is used, as the whole
    /// new document.
    async fn did_change(
        &self,
        ctx: &mut ServerContext,
        method: &str,
        params: Option<Value>,
    ) -> Result<OutgoingMessage, DispatchError> {
        let params: DidChangeTextDocumentParams = parse_params(method, params)?;
        let uri = params.text_document.uri;
        let text = params
            .content_changes
            .into_iter()
            .next()
            .map(|change| change.text)
            .ok_or_else(|| DispatchError::invalid_params(method, "contentChanges is empty"))?;

        if !ctx.workspace.change_document(&uri, text.clone()) {
            warn!("Received change for document {} which is not open", uri);
        }
        self.publish_diagnostics(ctx, &uri, &text).await
    }

    fn did_close(
        &self,
        ctx: &mut ServerContext,
        method: &str,
        params: Option<Value>,
    ) -> Result<OutgoingMessage, DispatchError> {
        let params: DidCloseTextDocumentParams = parse_params(method, params)?;
        let uri = params.text_document.uri;

        match ctx.workspace.remove_document(&uri) {
            Some(document) => debug!(
                "Closed document {} ({} bytes)",
                document.uri,
                document.text.len()
            ),
            None => debug!("Document {} was not open", uri),
        }
        diagnostics_notification(&uri, Vec::new())
    }

    /// Validate a document and build the `publishDiagnostics` notification.
    ///
    /// Validator failures publish an empty set instead of failing the request.
    async fn publish_diagnostics(
        &self,
        ctx: &ServerContext,
        uri: &str,
        text: &str,
    ) -> Result<OutgoingMessage, DispatchError> {
        let started = Instant::now();
        let result = self.validator.validate(uri, text).await;
        log_timing!(Level::DEBUG, "validate", started.elapsed());

        let diagnostics = match result {
            Ok(log) => {
                if ctx.options.verbose {
                    debug!("Diagnostics raw output: {}", log);
                }
                self.translator.translate(&log, text)
            }
            Err(e @ ValidatorError::Unclassifiable { .. }) => {
                warn!("{}; publishing no diagnostics", e);
                Vec::new()
            }
            Err(e) => {
                error!("Validation of {} failed: {}", uri, e);
                Vec::new()
            }
        };

        let diagnostics: Vec<lsp_types::Diagnostic> =
            diagnostics.into_iter().map(Into::into).collect();
        if ctx.options.verbose && !diagnostics.is_empty() {
            debug!("Sending diagnostics: {:?}", diagnostics);
        }

        diagnostics_notification(uri, diagnostics)
    }
}

fn diagnostics_notification(
    uri: &str,
    diagnostics: Vec<lsp_types::Diagnostic>,
) -> Result<OutgoingMessage, DispatchError> {
    let params = PublishDiagnosticsParams {
        uri: uri.to_string(),
        diagnostics,
    };
    Ok(notification(PUBLISH_DIAGNOSTICS, serde_json::to_value(params)?))
}

fn parse_params<T: DeserializeOwned>(
    method: &str,
    params: Option<Value>,
) -> Result<T, DispatchError> {
    let params = params.ok_or_else(|| DispatchError::invalid_params(method, "missing params"))?;
    serde_json::from_value(params)
        .map_err(|e| DispatchError::invalid_params(method, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerOptions;
    use crate::lsp::MessageFramer;
    use crate::test_utils::framed;
    use crate::validator::testing::MockValidator;
    use serde_json::json;

    #[cfg(feature = "test-logging")]
    crate::setup_test_logging!();

    const UNDECLARED_LOG: &str = "ERROR: 0:5: 'foo' : undeclared identifier\n";
    const SHADER: &str = "#version 450\n\nvoid main() {\n    vec4 color;\n  foo = 1;\n}\n";

    fn raw(body: Value) -> Result<RawMessage, FramingError> {
        let mut framer = MessageFramer::new();
        framer.feed(framed(&body).as_bytes())?;
        framer.take_message()
    }

    fn setup(log: &str) -> (Dispatcher<MockValidator>, ServerContext) {
        (
            Dispatcher::new(MockValidator::new(log)),
            ServerContext::new(ServerOptions::default()),
        )
    }

    async fn send(
        dispatcher: &Dispatcher<MockValidator>,
        ctx: &mut ServerContext,
        body: Value,
    ) -> Option<Value> {
        dispatcher
            .dispatch(ctx, raw(body))
            .await
            .map(|outgoing| serde_json::to_value(outgoing).unwrap())
    }

    async fn initialize(dispatcher: &Dispatcher<MockValidator>, ctx: &mut ServerContext) {
        send(
            dispatcher,
            ctx,
            json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}),
        )
        .await;
    }

    fn did_open(uri: &str, text: &str) -> Value {
        json!({
            "jsonrpc": "2.0",
            "method": "textDocument/didOpen",
            "params": {"textDocument": {"uri": uri, "languageId": "glsl", "version": 1, "text": text}}
        })
    }

    #[tokio::test]
    async fn test_initialize_returns_capabilities_with_request_id() {
        let (dispatcher, mut ctx) = setup("");

        let response = send(
            &dispatcher,
            &mut ctx,
            json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}),
        )
        .await
        .unwrap();

        assert_eq!(response["id"], 1);
        assert_eq!(response["jsonrpc"], "2.0");
        assert_eq!(response["result"]["capabilities"]["textDocumentSync"]["change"], 1);
        assert!(ctx.workspace.is_initialized());
    }

    #[tokio::test]
    async fn test_initialize_is_accepted_twice() {
        let (dispatcher, mut ctx) = setup("");
        initialize(&dispatcher, &mut ctx).await;

        let response = send(
            &dispatcher,
            &mut ctx,
            json!({"jsonrpc": "2.0", "id": "again", "method": "initialize"}),
        )
        .await
        .unwrap();
        assert_eq!(response["id"], "again");
        assert!(response["result"].is_object());
    }

    #[tokio::test]
    async fn test_initialized_notification_has_no_response() {
        let (dispatcher, mut ctx) = setup("");

        let response = send(
            &dispatcher,
            &mut ctx,
            json!({"jsonrpc": "2.0", "method": "initialized", "params": {}}),
        )
        .await;
        assert!(response.is_none());
    }

    #[tokio::test]
    async fn test_did_open_before_initialize_is_rejected() {
        let (dispatcher, mut ctx) = setup(UNDECLARED_LOG);

        let response = send(&dispatcher, &mut ctx, did_open("file:///a.frag", SHADER))
            .await
            .unwrap();

        assert_eq!(
            response["error"],
            json!({"code": -32002, "message": "Server not yet initialized."})
        );
        assert!(ctx.workspace.documents().is_empty());
        assert!(dispatcher.validator().calls().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_method_before_initialize_is_not_initialized() {
        let (dispatcher, mut ctx) = setup("");

        let response = send(
            &dispatcher,
            &mut ctx,
            json!({"jsonrpc": "2.0", "id": 2, "method": "foo/bar"}),
        )
        .await
        .unwrap();
        assert_eq!(response["error"]["code"], -32002);
        assert_eq!(response["id"], 2);
    }

    #[tokio::test]
    async fn test_unknown_method_after_initialize() {
        let (dispatcher, mut ctx) = setup("");
        initialize(&dispatcher, &mut ctx).await;

        let response = send(
            &dispatcher,
            &mut ctx,
            json!({"jsonrpc": "2.0", "id": 5, "method": "foo/bar"}),
        )
        .await
        .unwrap();

        assert_eq!(
            response["error"],
            json!({"code": -32601, "message": "Method 'foo/bar' not supported."})
        );
    }

    #[tokio::test]
    async fn test_did_open_publishes_diagnostics() {
        let (dispatcher, mut ctx) = setup(UNDECLARED_LOG);
        initialize(&dispatcher, &mut ctx).await;

        let notification = send(&dispatcher, &mut ctx, did_open("file:///a.frag", SHADER))
            .await
            .unwrap();

        assert_eq!(notification["method"], PUBLISH_DIAGNOSTICS);
        assert!(notification.get("id").is_none());
        assert_eq!(notification["params"]["uri"], "file:///a.frag");

        let diagnostics = notification["params"]["diagnostics"].as_array().unwrap();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(
            diagnostics[0]["range"],
            json!({"start": {"line": 4, "character": 2}, "end": {"line": 4, "character": 4}})
        );
        assert_eq!(diagnostics[0]["severity"], 1);
        assert_eq!(diagnostics[0]["source"], "glslang");
        assert_eq!(diagnostics[0]["message"], "'foo' : undeclared identifier");

        assert_eq!(
            ctx.workspace.document("file:///a.frag").unwrap().text,
            SHADER
        );
        assert_eq!(
            dispatcher.validator().calls(),
            vec![("file:///a.frag".to_string(), SHADER.to_string())]
        );
    }

    #[tokio::test]
    async fn test_clean_document_publishes_empty_array() {
        let (dispatcher, mut ctx) = setup("");
        initialize(&dispatcher, &mut ctx).await;

        let notification = send(
            &dispatcher,
            &mut ctx,
            did_open("file:///a.vert", "void main() {}"),
        )
        .await
        .unwrap();
        assert_eq!(notification["params"]["diagnostics"], json!([]));
    }

    #[tokio::test]
    async fn test_unclassifiable_document_publishes_empty_array() {
        let (dispatcher, mut ctx) = setup(UNDECLARED_LOG);
        initialize(&dispatcher, &mut ctx).await;

        let notification = send(&dispatcher, &mut ctx, did_open("file:///notes.txt", SHADER))
            .await
            .unwrap();

        assert_eq!(notification["method"], PUBLISH_DIAGNOSTICS);
        assert_eq!(notification["params"]["diagnostics"], json!([]));
        assert!(ctx.workspace.document("file:///notes.txt").is_some());
    }

    #[tokio::test]
    async fn test_did_change_uses_first_change_as_full_text() {
        let (dispatcher, mut ctx) = setup("");
        initialize(&dispatcher, &mut ctx).await;
        send(&dispatcher, &mut ctx, did_open("file:///a.frag", "old")).await;

        let notification = send(
            &dispatcher,
            &mut ctx,
            json!({
                "jsonrpc": "2.0",
                "method": "textDocument/didChange",
                "params": {
                    "textDocument": {"uri": "file:///a.frag", "version": 2},
                    "contentChanges": [{"text": "new"}, {"text": "ignored"}]
                }
            }),
        )
        .await
        .unwrap();

        assert_eq!(notification["method"], PUBLISH_DIAGNOSTICS);
        assert_eq!(ctx.workspace.document("file:///a.frag").unwrap().text, "new");
        assert_eq!(dispatcher.validator().calls()[1].1, "new");
    }

    #[tokio::test]
    async fn test_did_change_unknown_document_is_validated_but_not_stored() {
        let (dispatcher, mut ctx) = setup("");
        initialize(&dispatcher, &mut ctx).await;

        let notification = send(
            &dispatcher,
            &mut ctx,
            json!({
                "jsonrpc": "2.0",
                "method": "textDocument/didChange",
                "params": {
                    "textDocument": {"uri": "file:///b.frag", "version": 2},
                    "contentChanges": [{"text": "text"}]
                }
            }),
        )
        .await
        .unwrap();

        assert_eq!(notification["params"]["uri"], "file:///b.frag");
        assert!(ctx.workspace.documents().is_empty());
        assert_eq!(dispatcher.validator().calls().len(), 1);
    }

    #[tokio::test]
    async fn test_did_change_without_changes_is_invalid_params() {
        let (dispatcher, mut ctx) = setup("");
        initialize(&dispatcher, &mut ctx).await;

        let response = send(
            &dispatcher,
            &mut ctx,
            json!({
                "jsonrpc": "2.0",
                "method": "textDocument/didChange",
                "params": {"textDocument": {"uri": "file:///a.frag"}, "contentChanges": []}
            }),
        )
        .await
        .unwrap();
        assert_eq!(response["error"]["code"], -32602);
    }

    #[tokio::test]
    async fn test_did_open_missing_text_is_invalid_params() {
        let (dispatcher, mut ctx) = setup("");
        initialize(&dispatcher, &mut ctx).await;

        let response = send(
            &dispatcher,
            &mut ctx,
            json!({
                "jsonrpc": "2.0",
                "method": "textDocument/didOpen",
                "params": {"textDocument": {"uri": "file:///a.frag"}}
            }),
        )
        .await
        .unwrap();
        assert_eq!(response["error"]["code"], -32602);
        assert!(ctx.workspace.documents().is_empty());
    }

    #[tokio::test]
    async fn test_did_close_removes_document_and_clears_diagnostics() {
        let (dispatcher, mut ctx) = setup(UNDECLARED_LOG);
        initialize(&dispatcher, &mut ctx).await;
        send(&dispatcher, &mut ctx, did_open("file:///a.frag", SHADER)).await;

        let notification = send(
            &dispatcher,
            &mut ctx,
            json!({
                "jsonrpc": "2.0",
                "method": "textDocument/didClose",
                "params": {"textDocument": {"uri": "file:///a.frag"}}
            }),
        )
        .await
        .unwrap();

        assert_eq!(notification["params"]["diagnostics"], json!([]));
        assert!(ctx.workspace.documents().is_empty());
    }

    #[tokio::test]
    async fn test_shutdown_and_exit() {
        let (dispatcher, mut ctx) = setup("");
        initialize(&dispatcher, &mut ctx).await;

        let response = send(
            &dispatcher,
            &mut ctx,
            json!({"jsonrpc": "2.0", "id": 9, "method": "shutdown"}),
        )
        .await
        .unwrap();
        assert_eq!(response["id"], 9);
        assert_eq!(response["result"], Value::Null);
        assert!(!ctx.exit_requested());

        let response = send(
            &dispatcher,
            &mut ctx,
            json!({"jsonrpc": "2.0", "method": "exit"}),
        )
        .await;
        assert!(response.is_none());
        assert!(ctx.exit_requested());
    }

    #[tokio::test]
    async fn test_framing_failure_is_parse_error_in_any_state() {
        let (dispatcher, mut ctx) = setup("");

        let mut framer = MessageFramer::new();
        framer.feed(b"Content-Length: 9\r\n\r\n{not json").unwrap();
        let response = dispatcher
            .dispatch(&mut ctx, framer.take_message())
            .await
            .unwrap();

        let value = serde_json::to_value(response).unwrap();
        assert_eq!(value["error"]["code"], -32700);
        assert_eq!(value["id"], Value::Null);
    }

    #[tokio::test]
    async fn test_body_without_method_is_parse_error() {
        let (dispatcher, mut ctx) = setup("");
        initialize(&dispatcher, &mut ctx).await;

        let response = send(&dispatcher, &mut ctx, json!({"jsonrpc": "2.0", "id": 4}))
            .await
            .unwrap();
        assert_eq!(response["error"]["code"], -32700);
        assert_eq!(response["id"], 4);

        let response = send(&dispatcher, &mut ctx, json!([1, 2, 3])).await.unwrap();
        assert_eq!(response["error"]["code"], -32700);
    }
}
