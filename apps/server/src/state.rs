use std::sync::Arc;

use keepalive::{DomainRegistry, DomainSource, TaskRunner};

use crate::error::ApiError;

/// Shared by all request handlers
pub struct AppState {
    pub runner: Arc<TaskRunner>,
}

impl AppState {
    pub fn new(runner: Arc<TaskRunner>) -> Self {
        Self { runner }
    }

    /// The registry, or the reason there is none
    pub fn registry(&self) -> Result<&Arc<DomainRegistry>, ApiError> {
        match self.runner.source() {
            DomainSource::Registry(registry) => Ok(registry),
            DomainSource::Unavailable(e) => Err(ApiError::Unavailable(e.to_string())),
            DomainSource::Static(_) => {
                Err(ApiError::Unavailable("key-value store is not configured".to_string()))
            }
        }
    }
}
