use actix_web::{HttpResponse, delete, get, post, web};
use chrono::Utc;
use keepalive::DEFAULT_INTERVAL_MINUTES;
use keepalive::registry::{DEFAULT_LOG_LIMIT, DomainRegistry, MAX_STORED_LOGS, parse_minutes};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::error;

use crate::error::ApiError;
use crate::state::AppState;

// `clear_domain_logs` must stay ahead of `remove_domain`
macros_utils::routes! {
    route list_domains,
    route add_domain,
    route domain_config,
    route domain_logs,
    route clear_domain_logs,
    route remove_domain,
}

#[derive(Debug, Deserialize)]
pub struct AddDomainRequest {
    domain: Option<String>,
    #[serde(default)]
    interval: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    limit: Option<String>,
}

/// Minutes requested on add. Missing, null, zero or empty means the default.
fn requested_interval(raw: Option<&Value>) -> Result<u32, ApiError> {
    let invalid = || ApiError::Validation("interval must be a positive number of minutes".to_string());

    let minutes = match raw {
        None | Some(Value::Null) => 0,
        Some(Value::Number(n)) => match (n.as_u64(), n.as_f64()) {
            (Some(whole), _) => u32::try_from(whole).map_err(|_| invalid())?,
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            (None, Some(f)) if f.is_finite() && f >= 0.0 && f < f64::from(u32::MAX) => f.trunc() as u32,
            _ => return Err(invalid()),
        },
        Some(Value::String(text)) if text.trim().is_empty() => 0,
        Some(Value::String(text)) => parse_minutes(text).ok_or_else(invalid)?,
        Some(_) => return Err(invalid()),
    };

    Ok(if minutes == 0 { DEFAULT_INTERVAL_MINUTES } else { minutes })
}

/// Requested log count, falling back to the default and capped at what is kept
fn log_limit(raw: Option<&str>) -> usize {
    let requested = raw
        .and_then(parse_minutes)
        .and_then(|limit| usize::try_from(limit).ok())
        .filter(|&limit| limit > 0)
        .unwrap_or(DEFAULT_LOG_LIMIT);

    requested.min(MAX_STORED_LOGS)
}

/// Registered domain names only, codes and timestamps withheld
async fn safe_domains(registry: &DomainRegistry) -> Vec<Value> {
    registry.domains().await.into_iter().map(|domain| json!({ "domain": domain })).collect()
}

#[get("/api/domains")]
pub async fn list_domains(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let registry = state.registry()?;
    let domains = registry.statuses(Utc::now()).await;

    Ok(HttpResponse::Ok().json(json!({ "domains": domains })))
}

#[post("/api/domains")]
pub async fn add_domain(
    state: web::Data<AppState>,
    body: web::Json<AddDomainRequest>,
) -> Result<HttpResponse, ApiError> {
    let registry = state.registry()?;

    let domain = body.domain.as_deref().map(str::trim).unwrap_or_default();
    if domain.is_empty() {
        return Err(ApiError::Validation("domain must not be empty".to_string()));
    }
    let interval = requested_interval(body.interval.as_ref())?;

    let added = registry.add(domain, interval).await?;

    // The code of an existing entry is never handed out again
    let (message, verification_code) = if added.created {
        ("Domain added", Some(added.verification_code))
    } else {
        ("Domain already registered, interval updated", None)
    };

    Ok(HttpResponse::Ok().json(json!({
        "message": message,
        "domains": safe_domains(registry).await,
        "verificationCode": verification_code,
    })))
}

#[get("/api/domains/{domain}/config")]
pub async fn domain_config(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let registry = state.registry()?;
    let status = registry.status(&path.into_inner(), Utc::now()).await;

    Ok(HttpResponse::Ok().json(status))
}

#[get("/api/domains/{domain}/logs")]
pub async fn domain_logs(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<LogsQuery>,
) -> Result<HttpResponse, ApiError> {
    let registry = state.registry()?;
    let domain = path.into_inner();
    let logs = registry.logs(&domain, log_limit(query.limit.as_deref())).await;

    Ok(HttpResponse::Ok().json(json!({
        "domain": domain,
        "count": logs.len(),
        "logs": logs,
    })))
}

#[delete("/api/domains/{domain}/logs")]
pub async fn clear_domain_logs(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let registry = state.registry()?;
    let domain = path.into_inner();

    if let Err(e) = registry.clear_logs(&domain).await {
        error!("Failed to clear logs of {}: {}", domain, e);
        return Err(ApiError::Internal("failed to clear logs".to_string()));
    }

    Ok(HttpResponse::Ok().json(json!({ "message": "Logs cleared" })))
}

#[delete("/api/domains/{domain}/{verification_code}")]
pub async fn remove_domain(
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, ApiError> {
    let registry = state.registry()?;
    let (domain, verification_code) = path.into_inner();

    let removal = registry.remove(&domain, &verification_code).await?;
    let message = if removal.is_admin { "Domain removed (admin)" } else { "Domain removed" };

    Ok(HttpResponse::Ok().json(json!({
        "message": message,
        "domains": safe_domains(registry).await,
    })))
}
