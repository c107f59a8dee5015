//! Test utilities and global setup
//!
//! Provides centralized test logging configuration and message helpers.

/// Test logging utilities
#[cfg(all(test, feature = "test-logging"))]
pub mod logging {
    use std::sync::Once;
    use tracing_subscriber::{EnvFilter, fmt};

    static INIT: Once = Once::new();

    /// Initialize test logging globally - safe to call multiple times
    ///
    /// Respects RUST_LOG, defaulting to debug for this crate and info for
    /// the HTTP stack. Output goes through the test writer.
    ///
    /// ```bash
    /// RUST_LOG=glslls::server=trace cargo test --features test-logging
    /// ```
    pub fn init() {
        INIT.call_once(|| {
            let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                // Default filter: debug for our crate, info for noisy dependencies
                EnvFilter::new("debug,tokio=info,hyper=info,tower=info,axum=info")
            });

            fmt()
                .with_env_filter(env_filter)
                .with_test_writer()
                .with_target(true)
                .with_thread_ids(true)
                .compact()
                .try_init()
                .ok(); // Ignore errors if already initialized by another test
        });
    }
}

/// Auto-initialize test logging for a test module
#[cfg(all(test, feature = "test-logging"))]
#[macro_export]
macro_rules! setup_test_logging {
    () => {
        #[ctor::ctor]
        fn init_test_logging() {
            $crate::test_utils::logging::init();
        }
    };
}

/// Get glslangValidator path for integration tests
#[cfg(all(test, feature = "glslang-integration-tests"))]
pub fn get_test_glslang_path() -> String {
    crate::config::resolve_glslang_path(None)
}

/// Frame a JSON body the way a client would
#[cfg(test)]
pub fn framed(body: &serde_json::Value) -> String {
    let content = body.to_string();
    format!("Content-Length: {}\r\n\r\n{}", content.len(), content)
}

/// Split a byte stream of framed server output into JSON bodies
#[cfg(test)]
pub fn parse_framed_output(output: &[u8]) -> Vec<serde_json::Value> {
    let mut framer = crate::lsp::MessageFramer::new();
    framer.feed(output).unwrap();

    let mut messages = Vec::new();
    while framer.is_message_complete() {
        let message = framer.take_message().unwrap();
        assert_eq!(
            message.header("Content-Type"),
            Some(crate::lsp::framing::CONTENT_TYPE_VALUE)
        );
        messages.push(message.body);
        framer.reset();
        framer.feed(&[]).unwrap();
    }
    assert!(!framer.has_buffered_input(), "trailing bytes in output");
    messages
}
