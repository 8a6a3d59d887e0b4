//! Durable list of monitored domains and their per-domain bookkeeping.
//!
//! Layout in the key-value store:
//! - `domains` holds the ordered list of [`DomainEntry`] records
//! - `domain:<name>` holds the [`DomainConfig`] of one domain
//! - `domain:<name>:logs` holds its most recent [`LogEntry`] values, oldest first
//!
//! Every mutation is a plain get-then-set on a single key. Nothing guards
//! against two writers touching the same key at once; the last write wins.

pub mod models;
pub mod upgrade;

pub use models::{
    AddedDomain, DomainConfig, DomainEntry, DomainStatus, LogEntry, LogStatus, Removal,
    parse_minutes,
};
pub use upgrade::generate_verification_code;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{error, info, warn};

use crate::error::RegistryError;
use crate::schedule::next_check_time;
use crate::store::KeyValueStore;
use models::StoredEntry;

/// Key of the registry list
pub const REGISTRY_KEY: &str = "domains";

/// Most log entries kept per domain
pub const MAX_STORED_LOGS: usize = 50;

/// Log entries returned when the caller does not ask for a number
pub const DEFAULT_LOG_LIMIT: usize = 20;

pub fn config_key(domain: &str) -> String {
    format!("domain:{domain}")
}

pub fn logs_key(domain: &str) -> String {
    format!("domain:{domain}:logs")
}

/// Registry of monitored domains on top of a [`KeyValueStore`]
pub struct DomainRegistry {
    store: Arc<dyn KeyValueStore>,
    admin_code: Option<String>,
}

impl DomainRegistry {
    /// Create a registry; an empty admin code disables the override
    pub fn new(store: Arc<dyn KeyValueStore>, admin_code: Option<String>) -> Self {
        let admin_code = admin_code.filter(|code| !code.is_empty());
        Self { store, admin_code }
    }

    async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, RegistryError> {
        match self.store.get(key).await? {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|source| RegistryError::Corrupt { key: key.to_string(), source }),
            None => Ok(None),
        }
    }

    async fn write_json<T: Serialize>(&self, key: &str, value: &T) -> Result<(), RegistryError> {
        let raw = serde_json::to_string(value)
            .map_err(|source| RegistryError::Corrupt { key: key.to_string(), source })?;
        self.store.set(key, &raw).await?;
        Ok(())
    }

    /// Registry list in insertion order, upgrading a legacy list in place.
    ///
    /// When the stored list still contains bare domain names they are turned
    /// into full records and the upgraded list is written back before it is
    /// returned.
    pub async fn try_list(&self) -> Result<Vec<DomainEntry>, RegistryError> {
        let stored: Vec<StoredEntry> = self.read_json(REGISTRY_KEY).await?.unwrap_or_default();
        let (entries, changed) = upgrade::upgrade(stored, Utc::now(), generate_verification_code);

        if changed {
            info!("Upgrading legacy registry format ({} domains)", entries.len());
            if let Err(e) = self.write_json(REGISTRY_KEY, &entries).await {
                error!("Failed to persist upgraded registry: {}", e);
            }
        }

        Ok(entries)
    }

    /// Registry list, empty if the store cannot be read
    pub async fn list(&self) -> Vec<DomainEntry> {
        self.try_list().await.unwrap_or_else(|e| {
            error!("Failed to read domain list: {}", e);
            Vec::new()
        })
    }

    /// Domain names in registry order
    pub async fn domains(&self) -> Vec<String> {
        self.list().await.into_iter().map(|entry| entry.domain).collect()
    }

    /// Register `domain`, or update the interval of an already registered one.
    ///
    /// Re-adding a domain keeps its existing verification code.
    pub async fn add(&self, domain: &str, interval: u32) -> Result<AddedDomain, RegistryError> {
        let domain = domain.trim();
        if domain.is_empty() {
            return Err(RegistryError::Validation("domain must not be empty".to_string()));
        }
        validate_interval(interval)?;

        let mut entries = self.try_list().await?;

        let existing = entries
            .iter()
            .find(|entry| entry.domain == domain)
            .map(|entry| entry.verification_code.clone());

        let added = match existing {
            Some(verification_code) => AddedDomain { verification_code, created: false },
            None => {
                let verification_code = generate_verification_code();
                entries.push(DomainEntry {
                    domain: domain.to_string(),
                    verification_code: verification_code.clone(),
                    added_at: Utc::now(),
                });
                self.write_json(REGISTRY_KEY, &entries).await?;
                info!("Registered domain {} (interval {} min)", domain, interval);
                AddedDomain { verification_code, created: true }
            }
        };

        self.update_interval(domain, interval).await?;
        Ok(added)
    }

    /// Delete `domain` if `code` is its verification code or the admin code.
    ///
    /// The domain's config is removed too, best effort; its logs stay until
    /// cleared explicitly.
    pub async fn remove(&self, domain: &str, code: &str) -> Result<Removal, RegistryError> {
        if code.is_empty() {
            return Err(RegistryError::Validation("verification code is required".to_string()));
        }

        let mut entries = self.try_list().await?;
        let index = entries
            .iter()
            .position(|entry| entry.domain == domain)
            .ok_or_else(|| RegistryError::NotFound(domain.to_string()))?;

        let is_admin = self.admin_code.as_deref() == Some(code);
        if !is_admin && entries[index].verification_code != code {
            return Err(RegistryError::Unauthorized);
        }

        entries.remove(index);
        self.write_json(REGISTRY_KEY, &entries).await?;

        if let Err(e) = self.store.delete(&config_key(domain)).await {
            warn!("Removed {} but failed to delete its config: {}", domain, e);
        }

        info!("Removed domain {}{}", domain, if is_admin { " (admin)" } else { "" });
        Ok(Removal { is_admin })
    }

    /// Stored config of `domain`, a corrupt blob reading as the default
    pub async fn try_config(&self, domain: &str) -> Result<DomainConfig, RegistryError> {
        match self.read_json(&config_key(domain)).await {
            Ok(config) => Ok(config.unwrap_or_default()),
            Err(RegistryError::Corrupt { key, source }) => {
                warn!("Ignoring malformed config under {}: {}", key, source);
                Ok(DomainConfig::default())
            }
            Err(e) => Err(e),
        }
    }

    /// Config of `domain`, the default if the store cannot be read
    pub async fn config(&self, domain: &str) -> DomainConfig {
        self.try_config(domain).await.unwrap_or_else(|e| {
            error!("Failed to read config of {}: {}", domain, e);
            DomainConfig::default()
        })
    }

    /// Config of `domain` with its next check time derived for `now`
    pub async fn status(&self, domain: &str, now: DateTime<Utc>) -> DomainStatus {
        let config = self.config(domain).await;
        DomainStatus {
            domain: domain.to_string(),
            interval: config.interval,
            last_checked: config.last_checked,
            next_check_time: next_check_time(&config, now),
        }
    }

    /// Status of every registered domain, in registry order
    pub async fn statuses(&self, now: DateTime<Utc>) -> Vec<DomainStatus> {
        let mut statuses = Vec::new();
        for entry in self.list().await {
            statuses.push(self.status(&entry.domain, now).await);
        }
        statuses
    }

    pub async fn update_interval(&self, domain: &str, interval: u32) -> Result<(), RegistryError> {
        validate_interval(interval)?;

        let mut config = self.try_config(domain).await?;
        config.interval = interval;
        self.write_json(&config_key(domain), &config).await
    }

    /// Record that `domain` was probed at `at`
    pub async fn touch_last_checked(
        &self,
        domain: &str,
        at: DateTime<Utc>,
    ) -> Result<(), RegistryError> {
        let mut config = self.try_config(domain).await?;
        config.last_checked = Some(at);
        self.write_json(&config_key(domain), &config).await
    }

    /// Append to the domain's log, evicting the oldest beyond [`MAX_STORED_LOGS`]
    pub async fn append_log(&self, domain: &str, entry: LogEntry) -> Result<(), RegistryError> {
        let key = logs_key(domain);
        let mut logs: Vec<LogEntry> = match self.read_json(&key).await {
            Ok(logs) => logs.unwrap_or_default(),
            Err(RegistryError::Corrupt { source, .. }) => {
                warn!("Starting a fresh log for {}, stored log unreadable: {}", domain, source);
                Vec::new()
            }
            Err(e) => return Err(e),
        };

        logs.push(entry);
        if logs.len() > MAX_STORED_LOGS {
            let excess = logs.len() - MAX_STORED_LOGS;
            logs.drain(..excess);
        }

        self.write_json(&key, &logs).await
    }

    /// Up to `limit` most recent log entries, newest first
    pub async fn logs(&self, domain: &str, limit: usize) -> Vec<LogEntry> {
        let logs: Vec<LogEntry> = match self.read_json(&logs_key(domain)).await {
            Ok(logs) => logs.unwrap_or_default(),
            Err(e) => {
                error!("Failed to read logs of {}: {}", domain, e);
                return Vec::new();
            }
        };

        logs.into_iter().rev().take(limit).collect()
    }

    pub async fn clear_logs(&self, domain: &str) -> Result<(), RegistryError> {
        self.store.delete(&logs_key(domain)).await?;
        Ok(())
    }
}

fn validate_interval(interval: u32) -> Result<(), RegistryError> {
    if interval == 0 {
        return Err(RegistryError::Validation("interval must be at least 1 minute".to_string()));
    }
    Ok(())
}
