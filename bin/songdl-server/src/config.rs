//! Server configuration, loaded from environment variables at startup.

use std::path::PathBuf;
use std::time::Duration;

use songdl_core::{OrchestratorSettings, SpotDlSettings};

/// Runtime configuration for songdl-server.
///
/// Every field has a sensible default so the server works out-of-the-box
/// without any environment variables set.
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP address to bind (default: `"0.0.0.0:$PORT"`, `PORT` defaulting to 3000).
    pub bind_address: String,

    /// Directory the download tool writes artifacts into.
    pub download_dir: PathBuf,

    /// Directory holding the static frontend (`index.html` and assets).
    pub public_dir: PathBuf,

    /// Download tool executable.
    pub tool_program: String,

    /// Shell command run once when the tool is missing.
    pub tool_install_command: String,

    /// Timeout of the `--version` availability probe.
    pub check_timeout: Duration,

    /// Timeout of the install command.
    pub install_timeout: Duration,

    /// Timeout of one download run.
    pub download_timeout: Duration,

    /// Recency window for adopting an unexpectedly named artifact.
    pub fallback_window: Duration,

    /// Delay before a served artifact is deleted.
    pub cleanup_after: Duration,

    /// Comma-separated allowed CORS origins; `None` means any origin.
    pub cors_allowed_origins: Option<String>,

    /// Serve Swagger UI and the OpenAPI document.
    pub enable_swagger: bool,

    /// `tracing` filter string, e.g. `"info"` or `"debug,tower_http=warn"`.
    pub log_level: String,

    /// When `true`, emit log records as newline-delimited JSON.
    pub log_json: bool,

    /// When set, additionally write logs to a daily-rotated file here.
    pub log_dir: Option<PathBuf>,
}

impl Config {
    /// Build [`Config`] from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let port: u16 = parse_env("PORT", 3000);
        Self {
            bind_address: env_or("SONGDL_BIND", &format!("0.0.0.0:{port}")),
            download_dir: PathBuf::from(env_or("SONGDL_DOWNLOAD_DIR", "downloads")),
            public_dir: PathBuf::from(env_or("SONGDL_PUBLIC_DIR", "public")),
            tool_program: env_or("SONGDL_TOOL", "spotdl"),
            tool_install_command: env_or("SONGDL_INSTALL_CMD", "pip install spotdl"),
            check_timeout: secs_env("SONGDL_CHECK_TIMEOUT_SECS", 15),
            install_timeout: secs_env("SONGDL_INSTALL_TIMEOUT_SECS", 60),
            download_timeout: secs_env("SONGDL_DOWNLOAD_TIMEOUT_SECS", 120),
            fallback_window: secs_env("SONGDL_FALLBACK_WINDOW_SECS", 180),
            cleanup_after: secs_env("SONGDL_CLEANUP_AFTER_SECS", 3600),
            cors_allowed_origins: std::env::var("SONGDL_CORS_ORIGINS").ok(),
            enable_swagger: bool_env("SONGDL_ENABLE_SWAGGER", true),
            log_level: env_or("SONGDL_LOG", "info"),
            log_json: bool_env("SONGDL_LOG_JSON", false),
            log_dir: std::env::var("SONGDL_LOG_DIR").ok().map(PathBuf::from),
        }
    }

    pub fn orchestrator_settings(&self) -> OrchestratorSettings {
        OrchestratorSettings {
            output_dir: self.download_dir.clone(),
            download_timeout: self.download_timeout,
            fallback_window: self.fallback_window,
            cleanup_after: self.cleanup_after,
            download_route: "/downloads".to_owned(),
        }
    }

    pub fn spotdl_settings(&self) -> SpotDlSettings {
        SpotDlSettings {
            program: self.tool_program.clone(),
            install_command: self.tool_install_command.clone(),
            check_timeout: self.check_timeout,
            install_timeout: self.install_timeout,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_owned(),
            download_dir: PathBuf::from("downloads"),
            public_dir: PathBuf::from("public"),
            tool_program: "spotdl".to_owned(),
            tool_install_command: "pip install spotdl".to_owned(),
            check_timeout: Duration::from_secs(15),
            install_timeout: Duration::from_secs(60),
            download_timeout: Duration::from_secs(120),
            fallback_window: Duration::from_secs(180),
            cleanup_after: Duration::from_secs(3600),
            cors_allowed_origins: None,
            enable_swagger: true,
            log_level: "info".to_owned(),
            log_json: false,
            log_dir: None,
        }
    }
}

// ── private helpers ──────────────────────────────────────────────────────────

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn secs_env(key: &str, default: u64) -> Duration {
    Duration::from_secs(parse_env(key, default))
}

fn bool_env(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(default)
}
