//! Fixed `initialize` result
//!
//! The server only publishes diagnostics. Everything else is advertised as
//! unsupported, and full-document sync is requested.

use lsp_types::{
    CodeActionProviderCapability, CodeLensOptions, DocumentLinkOptions, ExecuteCommandOptions,
    HoverProviderCapability, InitializeResult, OneOf, SaveOptions, ServerCapabilities, ServerInfo,
    TextDocumentSyncCapability, TextDocumentSyncKind, TextDocumentSyncOptions,
    TextDocumentSyncSaveOptions, WorkDoneProgressOptions,
};

pub const SERVER_NAME: &str = "glsl-language-server";

pub fn server_capabilities() -> ServerCapabilities {
    ServerCapabilities {
        text_document_sync: Some(TextDocumentSyncCapability::Options(
            TextDocumentSyncOptions {
                open_close: Some(true),
                change: Some(TextDocumentSyncKind::FULL),
                will_save: Some(false),
                will_save_wait_until: Some(false),
                save: Some(TextDocumentSyncSaveOptions::SaveOptions(SaveOptions {
                    include_text: Some(false),
                })),
            },
        )),
        hover_provider: Some(HoverProviderCapability::Simple(false)),
        definition_provider: Some(OneOf::Left(false)),
        references_provider: Some(OneOf::Left(false)),
        document_highlight_provider: Some(OneOf::Left(false)),
        document_symbol_provider: Some(OneOf::Left(false)),
        workspace_symbol_provider: Some(OneOf::Left(false)),
        code_action_provider: Some(CodeActionProviderCapability::Simple(false)),
        code_lens_provider: Some(CodeLensOptions {
            resolve_provider: Some(false),
        }),
        document_formatting_provider: Some(OneOf::Left(false)),
        document_range_formatting_provider: Some(OneOf::Left(false)),
        rename_provider: Some(OneOf::Left(false)),
        document_link_provider: Some(DocumentLinkOptions {
            resolve_provider: Some(false),
            work_done_progress_options: WorkDoneProgressOptions::default(),
        }),
        execute_command_provider: Some(ExecuteCommandOptions {
            commands: Vec::new(),
            work_done_progress_options: WorkDoneProgressOptions::default(),
        }),
        ..ServerCapabilities::default()
    }
}

pub fn initialize_result() -> InitializeResult {
    InitializeResult {
        capabilities: server_capabilities(),
        server_info: Some(ServerInfo {
            name: SERVER_NAME.to_string(),
            version: Some(env!("CARGO_PKG_VERSION").to_string()),
        }),
    }
}
