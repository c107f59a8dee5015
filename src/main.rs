mod config;
mod diagnostics;
mod logging;
mod lsp;
mod server;
mod validator;
mod workspace;

#[cfg(test)]
mod test_utils;

use clap::Parser;
use config::{DEFAULT_HOST, DEFAULT_PORT, ServerOptions, TransportMode, resolve_glslang_path};
use logging::{LogConfig, init_logging};
use server::{Dispatcher, HttpState, ServerContext, serve_http, serve_stdio};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use validator::GlslangValidator;

/// CLI arguments for the GLSL language server
#[derive(Parser, Debug)]
#[command(author, version, about = "GLSL Language Server", long_about = None)]
struct Args {
    /// Don't launch an HTTP server and instead accept input on stdin
    #[arg(long)]
    stdin: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Log file path (overrides GLSLLS_LOG_FILE env var)
    #[arg(short = 'l', long = "log", value_name = "FILE")]
    log_file: Option<PathBuf>,

    /// Log level (overrides RUST_LOG env var)
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<String>,

    /// Port to listen on for HTTP requests
    #[arg(short, long, default_value_t = DEFAULT_PORT, conflicts_with = "stdin")]
    port: u16,

    /// Address to bind the HTTP server to
    #[arg(long, default_value = DEFAULT_HOST, conflicts_with = "stdin")]
    host: String,

    /// Path to glslangValidator (overrides GLSLANG_VALIDATOR_PATH env var)
    #[arg(long, value_name = "PATH")]
    glslang_path: Option<String>,
}

impl Args {
    fn server_options(&self) -> ServerOptions {
        let transport = if self.stdin {
            TransportMode::Stdio
        } else {
            TransportMode::http(self.host.clone(), self.port)
        };

        ServerOptions {
            verbose: self.verbose,
            glslang_path: resolve_glslang_path(self.glslang_path.clone()),
            transport,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Initialize logging with configuration from env vars and CLI args
    let log_config = LogConfig::from_env().with_overrides(
        args.log_level.clone(),
        args.log_file.clone(),
        args.verbose,
    );

    if let Err(e) = init_logging(log_config) {
        eprintln!("Failed to initialize logging: {e}");
        std::process::exit(1);
    }

    let options = args.server_options();
    let validator = GlslangValidator::new(options.glslang_path.clone());
    info!("Using glslangValidator: {}", validator.command());

    let dispatcher = Dispatcher::new(validator);
    let mut context = ServerContext::new(options.clone());

    match options.transport.bind_address() {
        None => serve_stdio(&mut context, &dispatcher).await?,
        Some(address) => {
            let state = Arc::new(HttpState::new(context, dispatcher));
            serve_http(&address, state).await?
        }
    }

    info!("Server shutdown");
    Ok(())
}
