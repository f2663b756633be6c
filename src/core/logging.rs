//! Logging initialization and startup diagnostics
//!
//! - Logger initialization (console + optional file)
//! - Configuration summary at startup

use anyhow::Result;
use fs_err::File;
use log::LevelFilter;
use secrecy::ExposeSecret;
use simplelog::{ColorChoice, CombinedLogger, Config, SharedLogger, TermLogger, TerminalMode, WriteLogger};

use crate::core::config::{ConfigReport, Settings};

/// Initialize logger for console output and, when a path is given, a log file
///
/// # Arguments
/// * `level` - Maximum level for both sinks
/// * `log_file_path` - Optional path to the log file
///
/// # Returns
/// * `Ok(())` - Logger initialized successfully
/// * `Err(anyhow::Error)` - Log file could not be created or a logger is already set
pub fn init_logger(level: LevelFilter, log_file_path: Option<&str>) -> Result<()> {
    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )];

    if let Some(path) = log_file_path {
        let log_file = File::create(path).map_err(|e| anyhow::anyhow!("Failed to create log file: {}", e))?;
        loggers.push(WriteLogger::new(level, Config::default(), log_file));
    }

    CombinedLogger::init(loggers).map_err(|e| anyhow::anyhow!("Failed to initialize logger: {}", e))?;

    Ok(())
}

/// Logs the effective configuration at application startup.
///
/// Secrets are reported as set/unset only.
pub fn log_configuration(settings: &Settings, report: &ConfigReport) {
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    log::info!("📂 Upload tunnel configuration");
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    log::info!("  listen:         {}", settings.listen_addr());
    log::info!("  bot token:      {}", set_or_unset(settings.bot_token.as_ref().map(|s| s.expose_secret())));
    match settings.chat_id {
        Some(chat_id) => log::info!("  destination:    {}", chat_id.0),
        None => log::info!("  destination:    <unset>"),
    }
    log::info!(
        "  upload secret:  {}",
        set_or_unset(settings.upload_secret.as_ref().map(|s| s.expose_secret()))
    );
    log::info!("  api id/hash:    {}", if settings.api_id.is_some() && settings.api_hash.is_some() { "set" } else { "<unset>" });
    match &settings.allowed_extensions {
        Some(exts) => log::info!("  extensions:     {}", exts.iter().cloned().collect::<Vec<_>>().join(", ")),
        None => log::info!("  extensions:     any"),
    }
    log::info!("  max file size:  {} bytes", settings.max_file_size);
    log::info!("  scratch dir:    {}", settings.upload_folder.display());
    if let Some(url) = &settings.bot_api_url {
        log::info!("  bot api url:    {}", url);
    }
    report.log();
}

fn set_or_unset(value: Option<&str>) -> &'static str {
    match value {
        Some(v) if !v.is_empty() => "set",
        _ => "<unset>",
    }
}
