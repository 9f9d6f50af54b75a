//! Configuration types for spnego-fetch

use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

use crate::error::{Error, Result};

/// Kerberos login configuration
///
/// The login machinery is driven by two external files (the realm
/// configuration and the login-module configuration) plus the name of the
/// entry to log in as. All three are explicit here and validated when the
/// credential context is opened, instead of being smuggled in through process
/// globals.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LoginConfig {
    /// Path to the Kerberos realm configuration file (default: "krb5.ini")
    #[serde(default = "default_realm_config")]
    pub realm_config: PathBuf,

    /// Path to the login-module configuration file (default: "login.conf")
    #[serde(default = "default_login_config")]
    pub login_config: PathBuf,

    /// Named entry within the login configuration to authenticate as
    /// (default: "anotherentry")
    #[serde(default = "default_entry_name")]
    pub entry_name: String,
}

impl Default for LoginConfig {
    fn default() -> Self {
        Self {
            realm_config: default_realm_config(),
            login_config: default_login_config(),
            entry_name: default_entry_name(),
        }
    }
}

/// Target web server configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Hostname of the Kerberos-protected web server
    pub host: String,

    /// Port the server listens on (default: 81)
    #[serde(default = "default_port")]
    pub port: u16,

    /// URL scheme (default: "http")
    #[serde(default = "default_scheme")]
    pub scheme: String,
}

impl TargetConfig {
    /// Create a target for the given host with default port and scheme
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: default_port(),
            scheme: default_scheme(),
        }
    }

    /// The base URL all resource paths are appended to, e.g. `http://srv1:81`
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.scheme, self.host, self.port)
    }
}

/// Fetch behavior configuration (concurrency, queue polling, output)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Number of concurrent workers draining the queue (default: 5)
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// How long a worker waits on an empty queue before concluding it is
    /// drained, in milliseconds (default: 1000)
    #[serde(default = "default_poll_timeout", with = "duration_ms_serde")]
    pub poll_timeout: Duration,

    /// Directory fetched resources are written into (default: "files")
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Newline-delimited file listing the resources to fetch
    /// (default: "filenames.txt")
    #[serde(default = "default_file_list")]
    pub file_list: PathBuf,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            poll_timeout: default_poll_timeout(),
            output_dir: default_output_dir(),
            file_list: default_file_list(),
        }
    }
}

/// Retry configuration for transient fetch failures
///
/// Applies to the HTTP fetch step only. Negotiation errors are final: a failed
/// mechanism or token-initiation step is never retried here.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts per resource, including the first
    /// (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial delay before the first retry, in milliseconds (default: 500)
    #[serde(default = "default_initial_delay", with = "duration_ms_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries, in milliseconds (default: 10000)
    #[serde(default = "default_max_delay", with = "duration_ms_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: true,
        }
    }
}

/// Main configuration for the fetcher
///
/// Fields are organized into logical sub-configs:
/// - [`target`](TargetConfig) — the protected web server
/// - [`login`](LoginConfig) — Kerberos login inputs
/// - [`fetch`](FetchConfig) — worker pool, queue polling, output
/// - [`retry`](RetryConfig) — transient fetch retries
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// The protected web server to fetch from
    pub target: TargetConfig,

    /// Kerberos login configuration
    #[serde(default)]
    pub login: LoginConfig,

    /// Worker pool and output settings
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Transient fetch retry settings
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Config {
    /// Create a configuration for the given target host with all defaults
    pub fn for_host(host: impl Into<String>) -> Self {
        Self {
            target: TargetConfig::new(host),
            login: LoginConfig::default(),
            fetch: FetchConfig::default(),
            retry: RetryConfig::default(),
        }
    }

    /// Validate the configuration, returning the first problem found
    pub fn validate(&self) -> Result<()> {
        if self.target.host.trim().is_empty() {
            return Err(Error::Config {
                message: "target host must not be empty".into(),
                key: Some("target.host".into()),
            });
        }
        if self.target.scheme != "http" && self.target.scheme != "https" {
            return Err(Error::Config {
                message: format!("unsupported scheme '{}'", self.target.scheme),
                key: Some("target.scheme".into()),
            });
        }
        if self.fetch.workers == 0 {
            return Err(Error::Config {
                message: "worker count must be at least 1".into(),
                key: Some("fetch.workers".into()),
            });
        }
        if self.fetch.poll_timeout.is_zero() {
            return Err(Error::Config {
                message: "queue poll timeout must be non-zero".into(),
                key: Some("fetch.poll_timeout".into()),
            });
        }
        if self.login.entry_name.trim().is_empty() {
            return Err(Error::Config {
                message: "login entry name must not be empty".into(),
                key: Some("login.entry_name".into()),
            });
        }
        if self.retry.max_attempts == 0 {
            return Err(Error::Config {
                message: "retry attempts must be at least 1".into(),
                key: Some("retry.max_attempts".into()),
            });
        }
        Ok(())
    }
}

fn default_realm_config() -> PathBuf {
    PathBuf::from("krb5.ini")
}

fn default_login_config() -> PathBuf {
    PathBuf::from("login.conf")
}

fn default_entry_name() -> String {
    "anotherentry".to_string()
}

fn default_port() -> u16 {
    81
}

fn default_scheme() -> String {
    "http".to_string()
}

fn default_workers() -> usize {
    5
}

fn default_poll_timeout() -> Duration {
    Duration::from_millis(1000)
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("files")
}

fn default_file_list() -> PathBuf {
    PathBuf::from("filenames.txt")
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay() -> Duration {
    Duration::from_millis(500)
}

fn default_max_delay() -> Duration {
    Duration::from_millis(10_000)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_true() -> bool {
    true
}

// Duration serialization helper (milliseconds)
mod duration_ms_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_the_documented_values() {
        let config = Config::for_host("srv1");

        assert_eq!(config.target.base_url(), "http://srv1:81");
        assert_eq!(config.fetch.workers, 5);
        assert_eq!(config.fetch.poll_timeout, Duration::from_millis(1000));
        assert_eq!(config.fetch.output_dir, PathBuf::from("files"));
        assert_eq!(config.fetch.file_list, PathBuf::from("filenames.txt"));
        assert_eq!(config.login.entry_name, "anotherentry");
        assert_eq!(config.login.realm_config, PathBuf::from("krb5.ini"));
        assert_eq!(config.login.login_config, PathBuf::from("login.conf"));
    }

    #[test]
    fn validate_accepts_defaults() {
        assert!(Config::for_host("srv1").validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_host() {
        let config = Config::for_host("  ");
        let err = config.validate().unwrap_err();
        match err {
            Error::Config { key, .. } => assert_eq!(key.as_deref(), Some("target.host")),
            other => panic!("expected Config error, got: {other:?}"),
        }
    }

    #[test]
    fn validate_rejects_zero_workers() {
        let mut config = Config::for_host("srv1");
        config.fetch.workers = 0;
        let err = config.validate().unwrap_err();
        match err {
            Error::Config { key, .. } => assert_eq!(key.as_deref(), Some("fetch.workers")),
            other => panic!("expected Config error, got: {other:?}"),
        }
    }

    #[test]
    fn validate_rejects_unknown_scheme() {
        let mut config = Config::for_host("srv1");
        config.target.scheme = "gopher".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_empty_entry_name() {
        let mut config = Config::for_host("srv1");
        config.login.entry_name = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn config_round_trips_through_json_with_ms_durations() {
        let config = Config::for_host("srv1");
        let json = serde_json::to_string(&config).unwrap();
        let parsed: Config = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.target.host, "srv1");
        assert_eq!(parsed.fetch.poll_timeout, config.fetch.poll_timeout);
        assert_eq!(parsed.retry.initial_delay, config.retry.initial_delay);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let parsed: Config = serde_json::from_str(r#"{"target":{"host":"web1"}}"#).unwrap();
        assert_eq!(parsed.target.port, 81);
        assert_eq!(parsed.fetch.workers, 5);
        assert_eq!(parsed.login.entry_name, "anotherentry");
    }
}
