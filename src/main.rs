use anyhow::Result;
use dotenvy::dotenv;
use std::sync::Arc;

use tunnel::cli::{Cli, Commands};
use tunnel::core::{init_logger, log_configuration, ConfigReport, Settings};
use tunnel::server::{start_server, AppState};
use tunnel::telegram::TelegramConnector;

/// Main entry point for the upload tunnel
///
/// Parses CLI arguments and dispatches to the appropriate subcommand.
///
/// # Errors
/// Returns an error if logging cannot be initialized or the listener fails.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    std::panic::set_hook(Box::new(|panic_info| {
        log::error!("Panic caught: {:?}", panic_info);
        if let Some(location) = panic_info.location() {
            log::error!("Panic at {}:{}:{}", location.file(), location.line(), location.column());
        }
    }));

    // .env must be loaded before the settings snapshot is taken
    let _ = dotenv();
    let (mut settings, report) = Settings::from_env();

    init_logger(settings.log_level, settings.log_file.as_deref())?;

    match cli.command {
        Some(Commands::Run { host, port }) => {
            if let Some(host) = host {
                settings.host = host;
            }
            if let Some(port) = port {
                settings.port = port;
            }
            run_server(settings, report).await
        }
        Some(Commands::CheckConfig) => check_config(&settings, &report),
        None => {
            log::info!("No command specified, running upload server");
            run_server(settings, report).await
        }
    }
}

async fn run_server(settings: Settings, report: ConfigReport) -> Result<()> {
    log_configuration(&settings, &report);

    // The handler creates it again on demand; failing here is not fatal.
    if let Err(e) = fs_err::tokio::create_dir_all(&settings.upload_folder).await {
        log::warn!("Could not prepare upload folder: {}", e);
    }

    let addr = settings.listen_addr();
    let state = AppState::new(Arc::new(settings), Arc::new(TelegramConnector));
    start_server(state, &addr).await
}

fn check_config(settings: &Settings, report: &ConfigReport) -> Result<()> {
    log_configuration(settings, report);

    if !report.is_valid() {
        anyhow::bail!("configuration has {} error(s)", report.errors.len());
    }
    log::info!("✅ Configuration is valid");
    Ok(())
}
