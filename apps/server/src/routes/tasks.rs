use actix_web::{HttpResponse, Responder, post, web};
use chrono::Utc;
use keepalive::runner::log_report;
use serde_json::json;

use crate::state::AppState;

macros_utils::routes! {
    route run_tasks,
}

/// Wake every configured domain up now, regardless of intervals
#[post("/run-tasks")]
pub async fn run_tasks(state: web::Data<AppState>) -> impl Responder {
    let report = state.runner.run_now().await;
    log_report(&report);

    HttpResponse::Ok().json(json!({
        "timestamp": Utc::now().to_rfc3339(),
        "summary": report.summary,
        "results": report.outcomes,
    }))
}

#[cfg(test)]
mod tests {
    use actix_web::{App, http::StatusCode, test, web};
    use keepalive::{ConfigError, DomainSource};
    use serde_json::Value;

    use crate::routes::test_support::{memory_state, state_with_source};

    #[actix_web::test]
    async fn test_run_tasks_probes_static_domains() {
        let state = state_with_source(DomainSource::Static(vec![
            "a.example".to_string(),
            "b.example".to_string(),
        ]));
        let app = test::init_service(
            App::new().app_data(web::Data::new(state)).configure(super::routes),
        )
        .await;

        let resp = test::call_service(&app, test::TestRequest::post().uri("/run-tasks").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: Value = test::read_body_json(resp).await;
        assert!(body["timestamp"].is_string());
        let results = body["results"].as_array().unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0]["domain"], "a.example");
        assert_eq!(results[0]["status"], "success");
        assert_eq!(results[1]["statusCode"], 200);
    }

    #[actix_web::test]
    async fn test_run_tasks_reports_missing_configuration() {
        let state = state_with_source(DomainSource::Unavailable(ConfigError::Missing));
        let app = test::init_service(
            App::new().app_data(web::Data::new(state)).configure(super::routes),
        )
        .await;

        let resp = test::call_service(&app, test::TestRequest::post().uri("/run-tasks").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["summary"], ConfigError::Missing.to_string());
        assert_eq!(body["results"], Value::Array(Vec::new()));
    }

    #[actix_web::test]
    async fn test_run_tasks_with_empty_registry() {
        let app = test::init_service(
            App::new().app_data(web::Data::new(memory_state())).configure(super::routes),
        )
        .await;

        let resp = test::call_service(&app, test::TestRequest::post().uri("/run-tasks").to_request()).await;
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["summary"], ConfigError::NoDomainsInStore.to_string());
    }
}
