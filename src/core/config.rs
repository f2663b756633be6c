//! Runtime configuration
//!
//! Settings are read once at startup into an immutable [`Settings`] snapshot.
//! Loading never fails: every problem is collected into a [`ConfigReport`] so
//! the process can start in a degraded state and surface the problem later as
//! a 503 on first use.

use std::collections::BTreeSet;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use log::LevelFilter;
use secrecy::{ExposeSecret, SecretString};
use teloxide::types::ChatId;
use url::Url;

/// Placeholder values used for local smoke testing.
pub mod defaults {
    /// Telegram Bot API document limit (50 MB)
    pub const MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;

    pub const API_ID: i32 = 123456;
    pub const API_HASH: &str = "local-dev-api-hash";
    pub const GROUP_CHAT_ID: &str = "-1000000000000";
    pub const CHAT_ID_PREFIX: &str = "-100";

    pub const UPLOAD_FOLDER: &str = "/tmp/uploads";
    pub const ALLOWED_EXTENSIONS: &[&str] = &["pdf", "jpg", "png", "txt", "mp4", "zip"];

    /// Bot API request timeout, long enough for 50 MB uploads on slow links
    pub const REQUEST_TIMEOUT_SECS: u64 = 900;

    pub const HOST: &str = "0.0.0.0";
    pub const PORT: u16 = 5000;
}

/// Environment variables that must be present for forwarding to work.
pub const REQUIRED_VARS: &[&str] = &["BOT_TOKEN", "GROUP_CHAT_ID"];

/// One configuration problem, keyed by the variable that caused it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigIssue {
    pub var: &'static str,
    pub message: String,
}

impl ConfigIssue {
    fn new(var: &'static str, message: impl Into<String>) -> Self {
        Self {
            var,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.var, self.message)
    }
}

/// Result of loading the configuration.
///
/// `errors` make forwarding impossible, `warnings` are informational.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigReport {
    pub errors: Vec<ConfigIssue>,
    pub warnings: Vec<ConfigIssue>,
}

impl ConfigReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, var: &'static str, message: impl Into<String>) {
        self.errors.push(ConfigIssue::new(var, message));
    }

    fn warn(&mut self, var: &'static str, message: impl Into<String>) {
        self.warnings.push(ConfigIssue::new(var, message));
    }

    /// Writes every issue to the log. Secret values are never part of an issue.
    pub fn log(&self) {
        for issue in &self.warnings {
            log::warn!("⚠️  {}", issue);
        }
        for issue in &self.errors {
            log::error!("❌ {}", issue);
        }
        if self.is_valid() {
            log::info!("✅ Configuration valid, forwarding enabled");
        } else {
            log::warn!(
                "Configuration incomplete ({} problem(s)); /upload will answer 503 until fixed",
                self.errors.len()
            );
        }
    }
}

/// Everything needed to construct a forwarding client.
#[derive(Debug)]
pub struct TelegramCredentials {
    pub token: SecretString,
    pub chat_id: ChatId,
    pub api_url: Option<Url>,
    pub timeout: Duration,
    pub verify_token: bool,
}

/// Immutable configuration snapshot.
#[derive(Debug)]
pub struct Settings {
    pub bot_token: Option<SecretString>,
    pub api_id: Option<i32>,
    pub api_hash: Option<String>,
    pub chat_id: Option<ChatId>,
    pub upload_secret: Option<SecretString>,
    /// `None` disables the extension check
    pub allowed_extensions: Option<BTreeSet<String>>,
    pub max_file_size: u64,
    pub upload_folder: PathBuf,
    pub bot_api_url: Option<Url>,
    pub request_timeout: Duration,
    pub verify_token: bool,
    pub host: String,
    pub port: u16,
    pub log_level: LevelFilter,
    pub log_file: Option<String>,
}

impl Settings {
    /// Loads settings from the process environment.
    pub fn from_env() -> (Self, ConfigReport) {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads settings from an arbitrary key lookup.
    ///
    /// Empty values are treated as unset, except `ALLOWED_EXTENSIONS` where an
    /// empty value explicitly disables the allow-list.
    pub fn from_lookup<F>(lookup: F) -> (Self, ConfigReport)
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw = |key: &str| lookup(key);
        let get = |key: &str| raw(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut report = ConfigReport::default();

        // Heroku sets DYNO; placeholders only make sense outside of it.
        let use_local_defaults =
            get("USE_LOCAL_DEFAULTS").map_or(true, |v| v == "1") && raw("DYNO").is_none();

        let bot_token = get("BOT_TOKEN").or_else(|| get("TELOXIDE_TOKEN"));
        if bot_token.is_none() {
            report.error("BOT_TOKEN", "not set, forwarding is disabled");
        }

        let api_id = match get("API_ID") {
            Some(value) => match value.parse::<i32>() {
                Ok(id) => Some(id),
                Err(_) => {
                    report.warn("API_ID", format!("set but not an integer: {:?}", value));
                    None
                }
            },
            None if use_local_defaults => Some(defaults::API_ID),
            None => None,
        };
        let api_hash = get("API_HASH").or_else(|| use_local_defaults.then(|| defaults::API_HASH.to_string()));
        if api_id.is_some() != api_hash.is_some() {
            report.warn("API_ID", "API_ID and API_HASH must be set together; client API features are disabled");
        }

        let chat_id_prefix = raw("CHAT_ID_PREFIX")
            .map(|v| v.trim().to_string())
            .unwrap_or_else(|| defaults::CHAT_ID_PREFIX.to_string());
        let chat_id_raw = match get("GROUP_CHAT_ID").or_else(|| get("LOG_GROUP_ID")) {
            Some(value) => Some(value),
            None if use_local_defaults => {
                report.warn("GROUP_CHAT_ID", "not set, using the local placeholder chat");
                Some(defaults::GROUP_CHAT_ID.to_string())
            }
            None => None,
        };
        let chat_id = match chat_id_raw {
            None => {
                report.error("GROUP_CHAT_ID", "not set, forwarding is disabled");
                None
            }
            Some(value) => match parse_chat_id(&value, &chat_id_prefix) {
                Ok(id) => Some(id),
                Err(message) => {
                    report.error("GROUP_CHAT_ID", message);
                    None
                }
            },
        };

        let upload_secret = get("UPLOAD_SECRET");
        if upload_secret.is_none() {
            report.warn("UPLOAD_SECRET", "not set, /upload accepts unauthenticated requests");
        }

        let allowed_extensions = match raw("ALLOWED_EXTENSIONS") {
            Some(list) => parse_extension_list(&list),
            None => Some(defaults::ALLOWED_EXTENSIONS.iter().map(|ext| ext.to_string()).collect()),
        };

        let max_file_size = parse_or_default(&get, &mut report, "MAX_FILE_SIZE", defaults::MAX_FILE_SIZE);
        if max_file_size == 0 {
            report.error("MAX_FILE_SIZE", "must be greater than zero");
        }

        let bot_api_url = get("BOT_API_URL").and_then(|value| match Url::parse(&value) {
            Ok(url) => Some(url),
            Err(e) => {
                report.warn("BOT_API_URL", format!("invalid URL ({}), using api.telegram.org", e));
                None
            }
        });

        let timeout_secs = parse_or_default(&get, &mut report, "REQUEST_TIMEOUT_SECS", defaults::REQUEST_TIMEOUT_SECS);
        let verify_token = get("VERIFY_BOT_TOKEN").map_or(true, |v| v != "0");
        let port = parse_or_default(&get, &mut report, "PORT", defaults::PORT);
        let log_level = parse_or_default(&get, &mut report, "LOG_LEVEL", LevelFilter::Info);

        let settings = Settings {
            bot_token: bot_token.map(SecretString::from),
            api_id,
            api_hash,
            chat_id,
            upload_secret: upload_secret.map(SecretString::from),
            allowed_extensions,
            max_file_size,
            upload_folder: get("UPLOAD_FOLDER")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(defaults::UPLOAD_FOLDER)),
            bot_api_url,
            request_timeout: Duration::from_secs(timeout_secs),
            verify_token,
            host: get("HOST").unwrap_or_else(|| defaults::HOST.to_string()),
            port,
            log_level,
            log_file: get("LOG_FILE_PATH"),
        };

        (settings, report)
    }

    /// Credentials for the forwarding client, or every reason they are unavailable.
    ///
    /// Pure function of the snapshot: repeated calls give identical answers.
    pub fn telegram_credentials(&self) -> Result<TelegramCredentials, Vec<String>> {
        let mut problems = Vec::new();
        if self.bot_token.is_none() {
            problems.push("BOT_TOKEN is not configured".to_string());
        }
        if self.chat_id.is_none() {
            problems.push("GROUP_CHAT_ID is missing or invalid".to_string());
        }
        if self.max_file_size == 0 {
            problems.push("MAX_FILE_SIZE must be greater than zero".to_string());
        }

        match (&self.bot_token, self.chat_id) {
            (Some(token), Some(chat_id)) if problems.is_empty() => Ok(TelegramCredentials {
                token: SecretString::from(token.expose_secret().to_owned()),
                chat_id,
                api_url: self.bot_api_url.clone(),
                timeout: self.request_timeout,
                verify_token: self.verify_token,
            }),
            _ => Err(problems),
        }
    }

    /// Names of required variables that are absent or invalid.
    pub fn missing_required(&self) -> Vec<&'static str> {
        REQUIRED_VARS
            .iter()
            .copied()
            .filter(|var| match *var {
                "BOT_TOKEN" => self.bot_token.is_none(),
                "GROUP_CHAT_ID" => self.chat_id.is_none(),
                _ => false,
            })
            .collect()
    }

    /// Listen address in `host:port` form.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Validates a destination chat id against the configured textual prefix.
///
/// An empty prefix disables the prefix rule.
pub fn parse_chat_id(value: &str, prefix: &str) -> Result<ChatId, String> {
    if !prefix.is_empty() && !value.starts_with(prefix) {
        return Err(format!("invalid format, it must start with '{}'", prefix));
    }
    value
        .parse::<i64>()
        .map(ChatId)
        .map_err(|_| format!("not a numeric chat id: {:?}", value))
}

/// Parses a comma separated extension list. An empty list disables the check.
pub fn parse_extension_list(list: &str) -> Option<BTreeSet<String>> {
    let set: BTreeSet<String> = list
        .split(',')
        .map(|ext| ext.trim().trim_start_matches('.').to_lowercase())
        .filter(|ext| !ext.is_empty())
        .collect();
    if set.is_empty() {
        None
    } else {
        Some(set)
    }
}

fn parse_or_default<T, F>(get: &F, report: &mut ConfigReport, var: &'static str, default: T) -> T
where
    T: FromStr + std::fmt::Display + Copy,
    F: Fn(&str) -> Option<String>,
{
    match get(var) {
        Some(value) => value.parse().unwrap_or_else(|_| {
            report.warn(var, format!("invalid value {:?}, using default {}", value, default));
            default
        }),
        None => default,
    }
}
