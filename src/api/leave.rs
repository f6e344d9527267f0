use crate::auth::auth::AuthUser;
use crate::error::LeaveError;
use crate::ledger::Ledger;
use crate::model::{CreateLeave, LeaveStatus};
use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use serde_json::json;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
#[serde(rename_all = "camelCase")]
pub struct SummaryQuery {
    /// Whose summary to read; defaults to the caller. HR/Admin only for others.
    pub user_id: Option<u64>,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
#[serde(rename_all = "camelCase")]
pub struct HistoryQuery {
    /// Whose history to read; defaults to the caller. HR/Admin only for others.
    pub user_id: Option<u64>,
    /// Leave type id, or `all`
    #[serde(rename = "type")]
    #[param(example = "sick")]
    pub leave_type: Option<String>,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RequestsQuery {
    /// `pending` (default), `approved`, `rejected` or `all`
    #[param(example = "pending")]
    pub status: Option<String>,
    /// Leave type id, or `all`
    #[serde(rename = "type")]
    #[param(example = "sick")]
    pub leave_type: Option<String>,
}

/// Optional body of approve/reject.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct DecisionBody {
    #[schema(example = "Enjoy the break", nullable = true)]
    pub comment: Option<String>,
}

/* =========================
Leave types
========================= */
#[utoipa::path(
    get,
    path = "/api/leave/types",
    responses(
        (status = 200, description = "All leave types", body = Object, example = json!({
            "success": true,
            "data": [{"id": "sick", "name": "Sick leave", "quota": 30, "color": "#ef4444"}]
        })),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn list_leave_types(
    _auth: AuthUser,
    ledger: web::Data<Ledger>,
) -> Result<impl Responder, LeaveError> {
    let types = ledger.leave_types().await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": types.as_slice(),
    })))
}

/* =========================
Quota summary
========================= */
#[utoipa::path(
    get,
    path = "/api/leave/summary",
    params(SummaryQuery),
    responses(
        (status = 200, description = "Quota, used and remaining days per leave type", body = Object, example = json!({
            "success": true,
            "data": [{"type": "sick", "name": "Sick leave", "quota": 30, "used": 20, "remaining": 10}]
        })),
        (status = 400, description = "Malformed userId"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn leave_summary(
    auth: AuthUser,
    ledger: web::Data<Ledger>,
    query: web::Query<SummaryQuery>,
) -> Result<impl Responder, LeaveError> {
    let user_id = auth.resolve_subject(query.user_id)?;
    let summary = ledger.summary(user_id).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": summary,
    })))
}

/* =========================
Leave history
========================= */
#[utoipa::path(
    get,
    path = "/api/leave/history",
    params(HistoryQuery),
    responses(
        (status = 200, description = "Leave requests, newest first", body = Object, example = json!({
            "success": true,
            "data": [{
                "id": 1,
                "userId": 1000,
                "leaveType": "sick",
                "typeName": "Sick leave",
                "startDate": "2026-01-05",
                "endDate": "2026-01-07",
                "days": 3,
                "reason": "Flu",
                "contact": null,
                "substitute": null,
                "status": "pending",
                "createdAt": "2026-01-01T00:00:00Z"
            }]
        })),
        (status = 400, description = "Malformed userId"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn leave_history(
    auth: AuthUser,
    ledger: web::Data<Ledger>,
    query: web::Query<HistoryQuery>,
) -> Result<impl Responder, LeaveError> {
    let user_id = auth.resolve_subject(query.user_id)?;
    let history = ledger
        .history(user_id, query.leave_type.as_deref())
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": history,
    })))
}

/* =========================
Submit leave request
========================= */
#[utoipa::path(
    post,
    path = "/api/leave/request",
    request_body(
        content = CreateLeave,
        description = "Leave request payload",
        content_type = "application/json"
    ),
    responses(
        (status = 201, description = "Leave request submitted", body = Object, example = json!({
            "success": true,
            "message": "Leave request submitted successfully",
            "data": {"id": 1, "leaveType": "sick", "days": 3, "status": "pending"}
        })),
        (status = 400, description = "Invalid input, unknown leave type or insufficient quota", body = Object, example = json!({
            "success": false,
            "message": "Insufficient leave quota",
            "remaining": 10
        })),
        (status = 401, description = "Unauthorized"),
        (status = 503, description = "Ledger busy, retry later")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn create_leave_request(
    auth: AuthUser,
    ledger: web::Data<Ledger>,
    payload: web::Json<CreateLeave>,
) -> Result<impl Responder, LeaveError> {
    let leave = payload.into_inner().validate()?;
    let record = ledger.submit(auth.user_id, leave).await?;

    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "message": "Leave request submitted successfully",
        "data": record,
    })))
}

/* =========================
Requests awaiting decision (HR/Admin)
========================= */
#[utoipa::path(
    get,
    path = "/api/leave/requests",
    params(RequestsQuery),
    responses(
        (status = 200, description = "Requests of all users, newest first", body = Object, example = json!({
            "success": true,
            "data": [{"id": 1, "userId": 1000, "leaveType": "sick", "days": 3, "status": "pending"}]
        })),
        (status = 400, description = "Unknown status filter"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn list_requests(
    auth: AuthUser,
    ledger: web::Data<Ledger>,
    query: web::Query<RequestsQuery>,
) -> Result<impl Responder, LeaveError> {
    auth.require_hr_or_admin()?;
    let requests = ledger
        .requests(query.status.as_deref(), query.leave_type.as_deref())
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": requests,
    })))
}

/* =========================
Approve / reject (HR/Admin)
========================= */
#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/approve",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to approve")
    ),
    request_body(
        content = DecisionBody,
        description = "Optional approver comment",
        content_type = "application/json"
    ),
    responses(
        (status = 200, description = "Leave approved", body = Object, example = json!({
            "success": true,
            "message": "Leave approved"
        })),
        (status = 400, description = "Leave request already processed"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave request not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn approve_leave(
    auth: AuthUser,
    ledger: web::Data<Ledger>,
    path: web::Path<u64>,
    body: Option<web::Json<DecisionBody>>,
) -> Result<impl Responder, LeaveError> {
    let body = body.map(web::Json::into_inner).unwrap_or_default();
    decide(auth, ledger, path.into_inner(), LeaveStatus::Approved, body).await
}

#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/reject",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to reject")
    ),
    request_body(
        content = DecisionBody,
        description = "Optional approver comment",
        content_type = "application/json"
    ),
    responses(
        (status = 200, description = "Leave rejected", body = Object, example = json!({
            "success": true,
            "message": "Leave rejected"
        })),
        (status = 400, description = "Leave request already processed"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave request not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn reject_leave(
    auth: AuthUser,
    ledger: web::Data<Ledger>,
    path: web::Path<u64>,
    body: Option<web::Json<DecisionBody>>,
) -> Result<impl Responder, LeaveError> {
    let body = body.map(web::Json::into_inner).unwrap_or_default();
    decide(auth, ledger, path.into_inner(), LeaveStatus::Rejected, body).await
}

async fn decide(
    auth: AuthUser,
    ledger: web::Data<Ledger>,
    leave_id: u64,
    status: LeaveStatus,
    body: DecisionBody,
) -> Result<HttpResponse, LeaveError> {
    auth.require_hr_or_admin()?;
    ledger
        .decide(leave_id, status, body.comment.as_deref(), &auth.username)
        .await?;

    let message = match status {
        LeaveStatus::Approved => "Leave approved",
        _ => "Leave rejected",
    };

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": message,
    })))
}
