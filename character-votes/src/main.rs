//! Character Votes Main Entry Point
//!
//! Serves the voting flow and the live character rankings over HTTP.

use character_votes::config::LogFormat;
use character_votes::server::{create_app, run_server};
use character_votes::{Dependencies, Settings};
use dotenv::dotenv;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing/logging.
fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(
            "character_votes=info,character_votes_flow=info,character_votes_repository=info,tower_http=info",
        )
    });

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_target(true)
                        .with_thread_ids(true),
                )
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_target(true).pretty())
                .init();
        }
    }

    info!(
        service_name = "character-votes",
        service_version = env!("CARGO_PKG_VERSION"),
        log_format = ?format,
        "Tracing initialized"
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    let settings = Settings::from_env()?;
    init_tracing(settings.log_format);

    let dependencies = Dependencies::new(&settings).await?;
    let app = create_app(dependencies.state);

    run_server(app, settings.server_addr).await
}
