use clap::Parser;
use crm_relay::server::config::RelayConfig;
use crm_relay::server::core_services;
use crm_relay::web::create_axum_router;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};
use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<String>,
}

fn init_logging(log_dir: &str) {
    // Log to a file: JSON format, daily rotation
    let file_appender = rolling::daily(log_dir, "crm-relay.log");
    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .json();

    // Log to stdout: human-readable format
    let stdout_layer = fmt::layer().with_writer(std::io::stdout);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();

    // Config first: the log directory comes from it.
    let config = RelayConfig::load(args.config.as_deref())?;
    init_logging(&config.log_dir);
    info!(version = env!("CARGO_PKG_VERSION"), "Starting CRM relay");

    let client = reqwest::Client::new();

    let store = match core_services::build_client_store(&config, &client) {
        Ok(store) => store,
        Err(e) => {
            error!("Failed to initialize client store: {}", e);
            return Err(e.into());
        }
    };
    if store.is_none() {
        info!("No client table configured; only direct-mode requests are accepted");
    }

    let app_state = Arc::new(core_services::build_app_state(&config, client, store));
    let app = create_axum_router(app_state);

    let addr: SocketAddr = config.listen_addr.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(address = %addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
