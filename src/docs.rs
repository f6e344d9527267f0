use crate::api::leave::DecisionBody;
use crate::model::{CreateLeave, LeaveRecord, LeaveStatus, LeaveSummary, LeaveType};
use actix_web::HttpResponse;
use utoipa::Modify;
use utoipa::OpenApi;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Leave Ledger API",
        version = "1.0.0",
        description = r#"
## Employee leave management

- **Leave types** with a yearly quota in days
- **Leave requests**, checked against the remaining quota in a single locked transaction
- **Quota summary** and **leave history** per employee
- **Approval** of pending requests by HR or admins

Endpoints under `/api` require a **JWT Bearer** access token.
Responses use the envelope `{ "success": bool, "data" | "message": ... }`.
"#,
    ),
    paths(
        crate::api::leave::list_leave_types,
        crate::api::leave::leave_summary,
        crate::api::leave::leave_history,
        crate::api::leave::create_leave_request,
        crate::api::leave::list_requests,
        crate::api::leave::approve_leave,
        crate::api::leave::reject_leave,

        crate::api::health::health
    ),
    components(
        schemas(
            LeaveType,
            LeaveStatus,
            LeaveRecord,
            LeaveSummary,
            CreateLeave,
            DecisionBody
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Leave", description = "Leave quota, history and request APIs"),
        (name = "Health", description = "Liveness of the server and its database"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

pub async fn openapi_json() -> HttpResponse {
    HttpResponse::Ok().json(ApiDoc::openapi())
}
