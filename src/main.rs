// Main entry point for the bg-relay application.
// Parses configuration, initializes logging, and either runs the relay server
// or, with the `remove` subcommand, sends local images through a running relay.

use bg_relay::{
    client::{RelayClient, UploadSession},
    provider::{DEFAULT_PROVIDER_URL, ProviderClient},
    shutdown_signal::shutdown_signal,
    upload::ImageUpload,
    web::{self, WILDCARD_HOST},
};
use clap::{Args, Parser, Subcommand};
use std::{path::PathBuf, sync::Arc};
use tracing::Level;

/// Command line arguments for bg-relay
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    server: ServerConfig,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Remove the background of local images through a running relay.
    Remove(RemoveArgs),
}

#[derive(Args, Debug)]
struct ServerConfig {
    /// Hostname/IP to bind the server to.
    /// If this option is specified without value, it will default to "*", meaning the server will listen on all interfaces.
    #[arg(long, env = "BG_RELAY_HOST", default_value = "localhost", num_args = 0..=1, default_missing_value = WILDCARD_HOST)]
    host: String,

    /// Port number to listen on.
    #[arg(short, long, env = "PORT", default_value_t = 3000)]
    port: u16,

    /// API key for the background-removal provider.
    /// Without it the server still starts, but every removal request fails.
    #[arg(long, env = "REMOVE_BG_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Provider endpoint receiving the forwarded uploads.
    #[arg(long, env = "REMOVE_BG_API_URL", default_value = DEFAULT_PROVIDER_URL)]
    provider_url: String,

    /// Directory served at the root path (index.html and client assets).
    #[arg(long, env = "BG_RELAY_PUBLIC_DIR", default_value = "public")]
    public_dir: PathBuf,
}

#[derive(Args, Debug)]
struct RemoveArgs {
    /// Images to process, in order.
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Base URL of the relay.
    #[arg(long, env = "BG_RELAY_URL", default_value = "http://localhost:3000")]
    relay: String,

    /// Directory the processed images are saved to.
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing subscriber for structured logging.
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_target(true) // Include module path in logs
        .with_file(true) // Include source file name
        .with_line_number(true) // Include line numbers
        .init();

    match cli.command {
        Some(Command::Remove(args)) => run_client(args).await,
        None => run_server(cli.server).await,
    }
}

async fn run_server(config: ServerConfig) {
    tracing::info!("Starting bg-relay...");

    let provider = ProviderClient::new(&config.provider_url, config.api_key);
    if provider.is_configured() {
        tracing::info!("Forwarding uploads to {}", provider.endpoint());
    } else {
        tracing::warn!(
            "REMOVE_BG_API_KEY is not set. Background removal requests will fail until it is configured."
        );
    }

    if !config.public_dir.is_dir() {
        tracing::warn!(
            "Public directory {} does not exist; only the API will be served.",
            config.public_dir.display()
        );
    }

    let app = web::create_app(Arc::new(provider), &config.public_dir);
    tracing::info!("Axum router configured.");

    let listener = match web::create_listener(&config.host, config.port).await {
        Ok((addr, l)) => {
            tracing::info!("Server successfully bound. Listening on {}", addr);
            l
        }
        Err(e) => {
            tracing::error!("FATAL: Failed to bind server: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!("Server run error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("bg-relay has shut down.");
}

async fn run_client(args: RemoveArgs) {
    let client = RelayClient::new(&args.relay);
    let mut session = UploadSession::new();
    let mut saved_count = 0;

    for path in &args.files {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!("Failed to read {}: {}", path.display(), e);
                continue;
            }
        };

        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.png".to_string());
        let content_type = image::guess_format(&bytes)
            .map(|format| format.to_mime_type().to_string())
            .unwrap_or_else(|_| mime::APPLICATION_OCTET_STREAM.to_string());

        if let Err(e) = session.select_file(ImageUpload::new(filename, content_type, bytes)) {
            tracing::error!("Skipping {}: {}", path.display(), e);
            continue;
        }

        if let Err(e) = session.process(&client).await {
            tracing::error!("Failed to process {}: {}", path.display(), e);
            continue;
        }

        match session.download(&args.out_dir).await {
            Ok(saved) => {
                saved_count += 1;
                tracing::info!("{} -> {}", path.display(), saved.display());
            }
            Err(e) => tracing::error!("Failed to save result for {}: {}", path.display(), e),
        }
    }

    tracing::info!(
        "Processed {} of {} file(s); {} kept in history.",
        saved_count,
        args.files.len(),
        session.history().len()
    );
}
