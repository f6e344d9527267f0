use crate::ledger::Ledger;
use actix_web::{HttpResponse, Responder, web};
use serde_json::json;

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Server and database are up", body = Object, example = json!({
            "status": "ok",
            "database": "ok"
        })),
        (status = 503, description = "Database unreachable")
    ),
    tag = "Health"
)]
pub async fn health(ledger: web::Data<Ledger>) -> impl Responder {
    if ledger.is_healthy().await {
        HttpResponse::Ok().json(json!({"status": "ok", "database": "ok"}))
    } else {
        tracing::warn!("Health check failed: database unreachable");
        HttpResponse::ServiceUnavailable().json(json!({"status": "error", "database": "error"}))
    }
}
