//! Proxy configuration, loaded from environment variables at startup.

use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_ALLOW: &str = "echo,ls,pwd,whoami,uptime,df,date";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("CMD_PROXY_TOKEN must be set to a non-empty value")]
    MissingToken,
}

/// Runtime configuration for songdl-cmd-proxy.
#[derive(Clone)]
pub struct Config {
    /// TCP address to bind (default: `"0.0.0.0:$PORT"`, `PORT` defaulting to 8080).
    pub bind_address: String,

    /// Bearer token every command request must present.
    pub token: String,

    /// Program names allowed as the first word of a command line.
    pub allowed: BTreeSet<String>,

    /// Deadline for one command.
    pub timeout: Duration,

    pub log_level: String,
    pub log_json: bool,
}

// Keep the token out of logs.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("bind_address", &self.bind_address)
            .field("token", &"<redacted>")
            .field("allowed", &self.allowed)
            .field("timeout", &self.timeout)
            .field("log_level", &self.log_level)
            .field("log_json", &self.log_json)
            .finish()
    }
}

impl Config {
    /// Build [`Config`] from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build [`Config`] from an arbitrary variable source.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let token = var("CMD_PROXY_TOKEN")
            .filter(|t| !t.trim().is_empty())
            .ok_or(ConfigError::MissingToken)?;

        let port: u16 = var("PORT").and_then(|p| p.parse().ok()).unwrap_or(8080);
        let allow = var("CMD_PROXY_ALLOW").unwrap_or_else(|| DEFAULT_ALLOW.to_owned());
        let timeout_secs: u64 = var("CMD_PROXY_TIMEOUT_SECS")
            .and_then(|v| v.parse().ok())
            .unwrap_or(15);

        Ok(Self {
            bind_address: var("CMD_PROXY_BIND").unwrap_or_else(|| format!("0.0.0.0:{port}")),
            token,
            allowed: parse_allow_list(&allow),
            timeout: Duration::from_secs(timeout_secs),
            log_level: var("CMD_PROXY_LOG").unwrap_or_else(|| "info".to_owned()),
            log_json: var("CMD_PROXY_LOG_JSON")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
        })
    }
}

fn parse_allow_list(raw: &str) -> BTreeSet<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn token_is_required() {
        assert_eq!(Config::from_vars(vars(&[])).unwrap_err(), ConfigError::MissingToken);
        assert_eq!(
            Config::from_vars(vars(&[("CMD_PROXY_TOKEN", "  ")])).unwrap_err(),
            ConfigError::MissingToken
        );
    }

    #[test]
    fn defaults() {
        let cfg = Config::from_vars(vars(&[("CMD_PROXY_TOKEN", "s3cret")])).unwrap();
        assert_eq!(cfg.bind_address, "0.0.0.0:8080");
        assert_eq!(cfg.timeout, Duration::from_secs(15));
        assert_eq!(cfg.allowed, parse_allow_list(DEFAULT_ALLOW));
        assert!(cfg.allowed.contains("uptime"));
        assert!(!cfg.log_json);
    }

    #[test]
    fn overrides() {
        let cfg = Config::from_vars(vars(&[
            ("CMD_PROXY_TOKEN", "s3cret"),
            ("PORT", "9000"),
            ("CMD_PROXY_ALLOW", " echo , ,date"),
            ("CMD_PROXY_TIMEOUT_SECS", "3"),
            ("CMD_PROXY_LOG_JSON", "true"),
        ]))
        .unwrap();
        assert_eq!(cfg.bind_address, "0.0.0.0:9000");
        assert_eq!(cfg.allowed.iter().collect::<Vec<_>>(), ["date", "echo"]);
        assert_eq!(cfg.timeout, Duration::from_secs(3));
        assert!(cfg.log_json);
    }

    #[test]
    fn debug_hides_token() {
        let cfg = Config::from_vars(vars(&[("CMD_PROXY_TOKEN", "s3cret")])).unwrap();
        assert!(!format!("{cfg:?}").contains("s3cret"));
    }
}
