use actix_web::{HttpResponse, Responder, get};

macros_utils::routes! {
    route health_route,
}

/// Liveness probe, the status alone is the answer
#[get("/health")]
pub async fn health_route() -> impl Responder {
    HttpResponse::Ok()
}

#[cfg(test)]
mod tests {
    use actix_web::{App, http::StatusCode, test};

    #[actix_web::test]
    async fn test_health_is_ok() {
        let app = test::init_service(App::new().configure(super::routes)).await;
        let resp = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
