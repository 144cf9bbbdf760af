use anyhow::Result;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use gcp_sledge::cli::Cli;
use gcp_sledge::commands::CommandContext;
use gcp_sledge::config::AppConfig;
use gcp_sledge::gcp::GcpClient;
use gcp_sledge::logger;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(format) = &cli.log_format {
        config.log_format = format.parse()?;
    }
    logger::init(&config.log_level, config.log_format)?;
    if let Some(path) = &config.source {
        debug!(path = %path.display(), "Using config file");
    }
    for warning in &config.warnings {
        warn!("{warning}");
    }

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted; remote operations already started keep running");
            on_signal.cancel();
        }
    });

    let client = GcpClient::new(&config.api_endpoint, config.access_token.clone())?
        .with_credentials(config.credentials.clone());
    let ctx = CommandContext::new(&client, &config, cli.dry_run).with_cancel(cancel);
    cli.run(&ctx).await
}
