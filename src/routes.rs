use crate::{
    api::{health, leave},
    auth::middleware::auth_middleware,
    config::Config,
    docs,
    error::LeaveError,
};
use actix_governor::{
    Governor, GovernorConfig, GovernorConfigBuilder, PeerIpKeyExtractor,
    governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};

pub type RateLimit = GovernorConfig<PeerIpKeyExtractor, NoOpMiddleware>;

/// Per-peer-IP limiter allowing `requests_per_min` with an equal burst.
/// Build it once and share it, so every worker draws from the same bucket.
pub fn rate_limit(requests_per_min: u32) -> RateLimit {
    let requests_per_min = requests_per_min.max(1);
    let per_ms = (60_000 / u64::from(requests_per_min)).max(1);

    GovernorConfigBuilder::default()
        .milliseconds_per_request(per_ms)
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .unwrap_or_default()
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config, limiter: &RateLimit) {
    // Extractor failures answer with the same JSON shape as handler errors
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _| {
        LeaveError::InvalidInput(format!("Invalid request data: {err}")).into()
    }))
    .app_data(web::QueryConfig::default().error_handler(|err, _| {
        LeaveError::InvalidInput(format!("Invalid query: {err}")).into()
    }))
    .app_data(web::PathConfig::default().error_handler(|err, _| {
        LeaveError::InvalidInput(format!("Invalid path: {err}")).into()
    }));

    // Public routes
    cfg.route("/health", web::get().to(health::health))
        .route("/api-doc/openapi.json", web::get().to(docs::openapi_json));

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(Governor::new(limiter)) // rate limiting
            .service(
                web::scope("/leave")
                    .service(web::resource("/types").route(web::get().to(leave::list_leave_types)))
                    .service(web::resource("/summary").route(web::get().to(leave::leave_summary)))
                    .service(web::resource("/history").route(web::get().to(leave::leave_history)))
                    .service(web::resource("/requests").route(web::get().to(leave::list_requests)))
                    .service(
                        web::resource("/request").route(web::post().to(leave::create_leave_request)),
                    )
                    // /leave/{id}/approve
                    .service(
                        web::resource("/{id}/approve").route(web::put().to(leave::approve_leave)),
                    )
                    // /leave/{id}/reject
                    .service(
                        web::resource("/{id}/reject").route(web::put().to(leave::reject_leave)),
                    ),
            ),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{App, HttpResponse, http::StatusCode, test};

    #[actix_web::test]
    async fn limiter_rejects_requests_past_the_burst() {
        let limiter = rate_limit(1);
        let app = test::init_service(
            App::new()
                .wrap(Governor::new(&limiter))
                .route("/", web::get().to(|| async { HttpResponse::Ok().finish() })),
        )
        .await;

        let mut statuses = Vec::new();
        for _ in 0..2 {
            let req = test::TestRequest::get()
                .uri("/")
                .peer_addr("127.0.0.1:9000".parse().unwrap())
                .to_request();
            let status = match test::try_call_service(&app, req).await {
                Ok(resp) => resp.status(),
                Err(err) => err.as_response_error().status_code(),
            };
            statuses.push(status);
        }

        assert_eq!(statuses, vec![StatusCode::OK, StatusCode::TOO_MANY_REQUESTS]);
    }
}
