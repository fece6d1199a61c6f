//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! The access token is never part of the config; it lives in the session
//! file named by `session.token_path`.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub log_format: LogFormat,
}

/// Storefront API settings
#[derive(Debug, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_refresh_timeout")]
    pub refresh_timeout_secs: u64,
}

/// Where the session survives between runs
#[derive(Debug, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_token_path")]
    pub token_path: PathBuf,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            token_path: default_token_path(),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

fn default_timeout() -> u64 {
    30
}

fn default_refresh_timeout() -> u64 {
    15
}

fn default_token_path() -> PathBuf {
    PathBuf::from("session.json")
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn refresh_timeout(&self) -> Duration {
        Duration::from_secs(self.refresh_timeout_secs)
    }
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment variables.
    ///
    /// `STOREFRONT_BASE_URL` replaces `api.base_url`. A relative
    /// `session.token_path` is resolved against the config file's directory.
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;

        if let Ok(url) = std::env::var("STOREFRONT_BASE_URL") {
            config.api.base_url = url;
        }

        if !config.api.base_url.starts_with("http://")
            && !config.api.base_url.starts_with("https://")
        {
            return Err(common::Error::Config(format!(
                "base_url must start with http:// or https://, got: {}",
                config.api.base_url
            )));
        }

        if config.api.timeout_secs == 0 {
            return Err(common::Error::Config(
                "timeout_secs must be greater than 0".into(),
            ));
        }

        if config.api.refresh_timeout_secs == 0 {
            return Err(common::Error::Config(
                "refresh_timeout_secs must be greater than 0".into(),
            ));
        }

        if config.session.token_path.is_relative()
            && let Some(dir) = path.parent()
        {
            config.session.token_path = dir.join(&config.session.token_path);
        }

        Ok(config)
    }

    /// Resolve config file path from CLI arg or STOREFRONT_CONFIG env var.
    pub fn resolve_path(cli_path: Option<&Path>) -> PathBuf {
        if let Some(p) = cli_path {
            return p.to_path_buf();
        }
        if let Ok(p) = std::env::var("STOREFRONT_CONFIG") {
            return PathBuf::from(p);
        }
        PathBuf::from("storefront.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Serializes tests that touch environment variables.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// SAFETY: Callers must hold ENV_MUTEX to prevent concurrent env mutation.
    unsafe fn set_env(key: &str, val: &str) {
        unsafe { std::env::set_var(key, val) };
    }

    unsafe fn remove_env(key: &str) {
        unsafe { std::env::remove_var(key) };
    }

    fn valid_toml() -> &'static str {
        r#"
[api]
base_url = "https://shop.example.org"
"#
    }

    fn write_config(dir: &Path, contents: &str) -> PathBuf {
        let path = dir.join("storefront.toml");
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_load_valid_config_with_defaults() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { remove_env("STOREFRONT_BASE_URL") };
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), valid_toml());

        let config = Config::load(&path).unwrap();
        assert_eq!(config.api.base_url, "https://shop.example.org");
        assert_eq!(config.api.timeout(), Duration::from_secs(30));
        assert_eq!(config.api.refresh_timeout(), Duration::from_secs(15));
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert_eq!(config.session.token_path, dir.path().join("session.json"));
    }

    #[test]
    fn test_load_full_config() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { remove_env("STOREFRONT_BASE_URL") };
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            r#"
log_format = "json"

[api]
base_url = "http://localhost:5000"
timeout_secs = 5
refresh_timeout_secs = 3

[session]
token_path = "/var/lib/storefront/session.json"
"#,
        );

        let config = Config::load(&path).unwrap();
        assert_eq!(config.api.timeout_secs, 5);
        assert_eq!(config.api.refresh_timeout_secs, 3);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(
            config.session.token_path,
            PathBuf::from("/var/lib/storefront/session.json")
        );
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load(Path::new("/nonexistent/path/storefront.toml"));
        assert!(matches!(result, Err(common::Error::Io(_))));
    }

    #[test]
    fn test_load_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), "not valid {{{{ toml");
        assert!(matches!(Config::load(&path), Err(common::Error::Toml(_))));
    }

    #[test]
    fn test_rejects_non_http_base_url() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { remove_env("STOREFRONT_BASE_URL") };
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), "[api]\nbase_url = \"ftp://shop.example.org\"\n");

        let err = Config::load(&path).unwrap_err();
        assert!(err.to_string().contains("base_url"), "got: {err}");
    }

    #[test]
    fn test_rejects_zero_timeouts() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { remove_env("STOREFRONT_BASE_URL") };
        let dir = tempfile::tempdir().unwrap();

        let path = write_config(
            dir.path(),
            "[api]\nbase_url = \"https://x.example\"\ntimeout_secs = 0\n",
        );
        assert!(Config::load(&path).is_err());

        let path = write_config(
            dir.path(),
            "[api]\nbase_url = \"https://x.example\"\nrefresh_timeout_secs = 0\n",
        );
        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn test_rejects_unknown_log_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            "log_format = \"xml\"\n[api]\nbase_url = \"https://x.example\"\n",
        );
        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn test_base_url_from_env() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), valid_toml());

        unsafe { set_env("STOREFRONT_BASE_URL", "http://127.0.0.1:4000") };
        let config = Config::load(&path).unwrap();
        unsafe { remove_env("STOREFRONT_BASE_URL") };

        assert_eq!(config.api.base_url, "http://127.0.0.1:4000");
    }

    #[test]
    fn test_resolve_path_precedence() {
        let _lock = ENV_MUTEX.lock().unwrap();

        unsafe { set_env("STOREFRONT_CONFIG", "/etc/storefront/env.toml") };
        assert_eq!(
            Config::resolve_path(Some(Path::new("/cli.toml"))),
            PathBuf::from("/cli.toml")
        );
        assert_eq!(
            Config::resolve_path(None),
            PathBuf::from("/etc/storefront/env.toml")
        );

        unsafe { remove_env("STOREFRONT_CONFIG") };
        assert_eq!(Config::resolve_path(None), PathBuf::from("storefront.toml"));
    }
}
