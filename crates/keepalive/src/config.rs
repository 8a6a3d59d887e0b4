use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use std::{env, fmt, fs, io, path};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;

use crate::error::{ConfigError, StoreError};
use crate::probe::ProbeSettings;
use crate::registry::DomainRegistry;
use crate::runner::DomainSource;
use crate::schedule::TickSchedule;
use crate::schedule::tick::DEFAULT_SCHEDULE;
use crate::store::{KeyValueStore, LibsqlStore};

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read config file: {0}")]
    ReadFailed(#[source] io::Error),
    #[error("failed to write config file: {0}")]
    WriteFailed(#[source] io::Error),
    #[error("failed to parse config file: {0}")]
    ParseFailed(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    SerializeFailed(#[from] toml::ser::Error),
    #[error("no config directory available (set XDG_CONFIG_HOME or HOME)")]
    ConfigPathUnavailable,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: Server,
    pub store: Store,
    pub wakeup: Wakeup,
    pub schedule: Schedule,
    pub admin: Admin,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Server {
    pub bind: String,
    pub port: u16,
}

/// Key-value store connection; a remote `url` wins over a local `path`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Store {
    pub path: Option<PathBuf>,
    pub url: Option<String>,
    pub auth_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Wakeup {
    pub retry_count: u32,
    pub retry_delay_ms: u64,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    /// JSON array of domains, used when no store is configured
    pub target_domains: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Schedule {
    pub cron: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Admin {
    /// Override code that may delete any domain
    pub verification_code: Option<String>,
}

/// Used to ensure we are actually reading a toml file
fn normalize_toml_path(path: &path::Path) -> path::PathBuf {
    let mut path = path.to_path_buf();
    if path.extension().map(|ext| ext != "toml").unwrap_or(true) {
        path.set_extension("toml");
    }
    path
}

/// Get default config path ($XDG_CONFIG_HOME/keepalive/config.toml or
/// $HOME/.config/...)
fn default_config_path() -> Result<path::PathBuf, Error> {
    let path = if let Ok(config_home) = env::var("XDG_CONFIG_HOME") {
        path::PathBuf::from(config_home)
    } else if let Some(home_dir) = env::home_dir() {
        home_dir.join(".config")
    } else {
        return Err(Error::ConfigPathUnavailable);
    };

    Ok(path.join("keepalive/config.toml"))
}

impl Default for Server {
    fn default() -> Self {
        Self { bind: "0.0.0.0".into(), port: 3000 }
    }
}

impl Default for Wakeup {
    fn default() -> Self {
        let probe = ProbeSettings::default();
        Self {
            retry_count: probe.retries,
            retry_delay_ms: probe.retry_delay.as_millis() as u64,
            request_timeout_secs: 30,
            user_agent: probe.user_agent,
            target_domains: None,
        }
    }
}

impl Default for Schedule {
    fn default() -> Self {
        Self { cron: DEFAULT_SCHEDULE.into() }
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let write_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str, value: &dyn fmt::Display| {
                writeln!(f, "  {:indent$}{}: {}", "", label, value, indent = level * 2)
            }
        };
        let write_title_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str| {
                writeln!(f, "{:indent$}{}", "", label, indent = level * 2)
            }
        };

        let write_title_1 = write_title_indented(1);
        let write_1 = write_indented(1);
        let or_unset = |value: Option<String>| value.unwrap_or_else(|| "<unset>".to_string());
        let redacted = |value: &Option<String>| if value.is_some() { "<set>" } else { "<unset>" };

        writeln!(f, "Current Internal Configuration State:")?;
        write_title_1(f, "Server")?;
        write_1(f, "Bind Address", &self.server.bind)?;
        write_1(f, "Port", &self.server.port)?;
        write_title_1(f, "Store")?;
        write_1(f, "Path", &or_unset(self.store.path.as_ref().map(|p| p.display().to_string())))?;
        write_1(f, "URL", &or_unset(self.store.url.clone()))?;
        write_1(f, "Auth Token", &redacted(&self.store.auth_token))?;
        write_title_1(f, "Wakeup")?;
        write_1(f, "Retries", &self.wakeup.retry_count)?;
        write_1(f, "Retry Delay (ms)", &self.wakeup.retry_delay_ms)?;
        write_1(f, "Request Timeout (s)", &self.wakeup.request_timeout_secs)?;
        write_1(f, "User Agent", &self.wakeup.user_agent)?;
        write_1(f, "Target Domains", &or_unset(self.wakeup.target_domains.clone()))?;
        write_title_1(f, "Schedule")?;
        write_1(f, "Cron", &self.schedule.cron)?;
        write_title_1(f, "Admin")?;
        write_1(f, "Verification Code", &redacted(&self.admin.verification_code))?;

        Ok(())
    }
}

impl Config {
    /// Generate Config structure from file
    ///
    /// Creates a default config in ~/.config/keepalive/config.toml
    ///  or the specified path, with the name config.toml if one does not exist
    ///
    /// ```no_run
    /// let cfg = keepalive::Config::from_config(None::<&std::path::Path>).unwrap();
    /// println!("{}", cfg);
    /// ```
    pub fn from_config(optional_path: Option<impl AsRef<path::Path>>) -> Result<Self, Error> {
        let config_path: path::PathBuf = if let Some(path) = optional_path {
            normalize_toml_path(path.as_ref())
        } else {
            default_config_path()?
        };

        if config_path.exists() {
            let raw_string = fs::read_to_string(&config_path).map_err(Error::ReadFailed)?;
            Ok(toml::from_str(raw_string.as_str())?)
        } else {
            let config = Self::default();
            config.write_config(&config_path)?;
            Ok(config)
        }
    }

    /// Serialize and write a config to a file
    pub fn write_config(&self, path: &std::path::Path) -> Result<(), Error> {
        let config_str: String = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(Error::WriteFailed)?;
        }

        std::fs::write(path, config_str).map_err(Error::WriteFailed)
    }

    /// Apply overrides from the process environment
    pub fn with_env(mut self) -> Self {
        self.apply_env(|name| env::var(name).ok());
        self
    }

    /// Apply overrides from `lookup`.
    ///
    /// Empty values are ignored, and so are numeric values that do not parse.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let number = |name: &str| var(name).and_then(|value| value.trim().parse::<u64>().ok());

        if let Some(bind) = var("BIND") {
            self.server.bind = bind;
        }
        if let Some(port) = number("PORT").and_then(|p| u16::try_from(p).ok()) {
            self.server.port = port;
        }
        if let Some(path) = var("KEEPALIVE_DB_PATH") {
            self.store.path = Some(PathBuf::from(path));
        }
        if let Some(url) = var("LIBSQL_URL") {
            self.store.url = Some(url);
        }
        if let Some(token) = var("LIBSQL_AUTH_TOKEN") {
            self.store.auth_token = Some(token);
        }
        if let Some(domains) = var("TARGET_DOMAINS") {
            self.wakeup.target_domains = Some(domains);
        }
        if let Some(retries) = number("RETRY_COUNT").and_then(|r| u32::try_from(r).ok()) {
            self.wakeup.retry_count = retries;
        }
        if let Some(delay) = number("RETRY_DELAY") {
            self.wakeup.retry_delay_ms = delay;
        }
        if let Some(timeout) = number("REQUEST_TIMEOUT") {
            self.wakeup.request_timeout_secs = timeout;
        }
        if let Some(cron) = var("CRON_SCHEDULE") {
            self.schedule.cron = cron;
        }
        if let Some(code) = var("ADMIN_VERIFICATION_CODE") {
            self.admin.verification_code = Some(code);
        }
    }

    pub fn probe_settings(&self) -> ProbeSettings {
        ProbeSettings {
            retries: self.wakeup.retry_count,
            retry_delay: Duration::from_millis(self.wakeup.retry_delay_ms),
            user_agent: self.wakeup.user_agent.clone(),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.wakeup.request_timeout_secs.max(1))
    }

    pub fn tick_schedule(&self) -> Result<TickSchedule, ConfigError> {
        TickSchedule::parse(&self.schedule.cron)
    }

    /// Open the configured key-value store, `None` when none is configured
    pub async fn open_store(&self) -> Option<Result<Arc<dyn KeyValueStore>, StoreError>> {
        let opened = if let Some(url) = &self.store.url {
            LibsqlStore::open_remote(url, self.store.auth_token.as_deref().unwrap_or_default()).await
        } else if let Some(path) = &self.store.path {
            LibsqlStore::open_local(path).await
        } else {
            return None;
        };

        Some(opened.map(|store| Arc::new(store) as Arc<dyn KeyValueStore>))
    }

    /// Decide where domains come from: the store if one is configured,
    /// otherwise `target_domains`
    pub async fn domain_source(&self) -> DomainSource {
        match self.open_store().await {
            Some(Ok(store)) => DomainSource::Registry(Arc::new(DomainRegistry::new(
                store,
                self.admin.verification_code.clone(),
            ))),
            Some(Err(e)) => {
                error!("Failed to open key-value store: {}", e);
                DomainSource::Unavailable(ConfigError::StoreUnreachable(e.to_string()))
            }
            None => match &self.wakeup.target_domains {
                Some(raw) => DomainSource::from_target_domains(raw),
                None => DomainSource::Unavailable(ConfigError::Missing),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        let settings = config.probe_settings();

        assert_eq!(settings.retries, 2);
        assert_eq!(settings.retry_delay, Duration::from_millis(2000));
        assert_eq!(settings.user_agent, "KeepAlive-Worker/2.0");
        assert_eq!(config.tick_schedule().unwrap(), TickSchedule::every_minutes(1));
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config.apply_env(lookup(&[
            ("RETRY_COUNT", "4"),
            ("RETRY_DELAY", "500"),
            ("CRON_SCHEDULE", "*/5 * * * *"),
            ("ADMIN_VERIFICATION_CODE", "ADMIN123"),
            ("TARGET_DOMAINS", r#"["a.example"]"#),
            ("PORT", "8080"),
        ]));

        assert_eq!(config.wakeup.retry_count, 4);
        assert_eq!(config.wakeup.retry_delay_ms, 500);
        assert_eq!(config.tick_schedule().unwrap(), TickSchedule::every_minutes(5));
        assert_eq!(config.admin.verification_code.as_deref(), Some("ADMIN123"));
        assert_eq!(config.wakeup.target_domains.as_deref(), Some(r#"["a.example"]"#));
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_unparsable_numbers_are_ignored() {
        let mut config = Config::default();
        config.apply_env(lookup(&[("RETRY_COUNT", "many"), ("RETRY_DELAY", ""), ("PORT", "99999")]));

        assert_eq!(config.wakeup.retry_count, 2);
        assert_eq!(config.wakeup.retry_delay_ms, 2000);
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn test_config_file_created_and_reloaded() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("nested/config");

        let created = Config::from_config(Some(&path)).unwrap();
        assert_eq!(created, Config::default());
        assert!(temp_dir.path().join("nested/config.toml").exists());

        let mut edited = created.clone();
        edited.wakeup.retry_count = 7;
        edited.store.path = Some(PathBuf::from("/var/lib/keepalive/kv.db"));
        edited.write_config(&temp_dir.path().join("nested/config.toml")).unwrap();

        let reloaded = Config::from_config(Some(&path)).unwrap();
        assert_eq!(reloaded, edited);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = toml::from_str("[wakeup]\nretry_count = 1\n").unwrap();
        assert_eq!(config.wakeup.retry_count, 1);
        assert_eq!(config.wakeup.retry_delay_ms, 2000);
        assert_eq!(config.schedule.cron, DEFAULT_SCHEDULE);
    }

    #[test]
    fn test_display_redacts_secrets() {
        let mut config = Config::default();
        config.admin.verification_code = Some("SECRET99".to_string());
        config.store.auth_token = Some("token-value".to_string());

        let shown = config.to_string();
        assert!(!shown.contains("SECRET99"));
        assert!(!shown.contains("token-value"));
        assert!(shown.contains("Verification Code: <set>"));
    }

    #[tokio::test]
    async fn test_domain_source_resolution() {
        let config = Config::default();
        assert!(matches!(
            config.domain_source().await,
            DomainSource::Unavailable(ConfigError::Missing)
        ));

        let mut config = Config::default();
        config.wakeup.target_domains = Some("oops".to_string());
        assert!(matches!(
            config.domain_source().await,
            DomainSource::Unavailable(ConfigError::MalformedTargetDomains(_))
        ));

        let temp_dir = tempdir().unwrap();
        let mut config = Config::default();
        config.wakeup.target_domains = Some(r#"["ignored.example"]"#.to_string());
        config.store.path = Some(temp_dir.path().join("kv.db"));
        assert!(matches!(config.domain_source().await, DomainSource::Registry(_)));
    }
}
