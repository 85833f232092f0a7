use anyhow::Result;
use clap::Parser;
use chatrelay::{cli, logging};

/// Log files older than this are removed at startup.
const LOG_RETENTION_DAYS: u64 = 7;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file before anything else (silently ignore if missing)
    dotenvy::dotenv().ok();

    let cli_args = cli::Cli::parse();

    let config = cli::load_config(cli_args.config.as_deref())?;

    let log_config = logging::LogConfig::new()
        .with_level(config.logging.level.clone())
        .with_debug_mode(cli_args.debug)
        .with_log_dir(config.log_dir());

    let _guard = logging::init_logging(log_config)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    match logging::cleanup_old_logs(&config.log_dir(), LOG_RETENTION_DAYS) {
        Ok(removed) if removed > 0 => {
            tracing::info!("🧹 Cleaned up {} old log file(s)", removed);
        }
        Ok(_) => {}
        Err(e) => tracing::warn!("Log cleanup failed: {}", e),
    }

    tracing::debug!("chatrelay v{}", chatrelay::VERSION);

    cli::run(cli_args, config).await
}
