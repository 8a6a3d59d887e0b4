use actix_web::{HttpRequest, error::JsonPayloadError, web::JsonConfig};

use crate::error::ApiError;

mod domains;
mod health;
mod tasks;

// Clear-logs is part of `domains` and registered there ahead of the
// `/{domain}/{code}` delete route, which would otherwise swallow it.
macros_utils::routes! {
    configure health::routes,
    configure tasks::routes,
    configure domains::routes,
}

/// Malformed JSON bodies answer 400 with the usual error shape
pub fn json_config() -> JsonConfig {
    JsonConfig::default().error_handler(|err: JsonPayloadError, _req: &HttpRequest| {
        ApiError::Validation(format!("malformed request body: {err}")).into()
    })
}
