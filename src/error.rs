use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde::Serialize;
use sqlx::mysql::MySqlDatabaseError;

/// MySQL server error numbers that mean "try again later".
const ER_LOCK_WAIT_TIMEOUT: u16 = 1205;
const ER_LOCK_DEADLOCK: u16 = 1213;

#[derive(Debug, thiserror::Error)]
pub enum LeaveError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("Invalid leave type: {0}")]
    UnknownLeaveType(String),

    #[error("Insufficient leave quota")]
    QuotaExceeded { remaining: i32 },

    #[error("{0}")]
    NotFound(String),

    #[error("Leave request {0} has already been processed")]
    AlreadyDecided(u64),

    /// Lock wait timeout, deadlock or pool exhaustion. The caller may resubmit.
    #[error("The leave ledger is busy, please retry")]
    Busy,

    #[error("Database error: {0}")]
    Persistence(sqlx::Error),
}

impl From<sqlx::Error> for LeaveError {
    fn from(err: sqlx::Error) -> Self {
        if is_retryable(&err) {
            LeaveError::Busy
        } else {
            LeaveError::Persistence(err)
        }
    }
}

fn is_retryable(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::PoolTimedOut => true,
        sqlx::Error::Database(db_err) => matches!(
            db_err
                .try_downcast_ref::<MySqlDatabaseError>()
                .map(|e| e.number()),
            Some(ER_LOCK_WAIT_TIMEOUT | ER_LOCK_DEADLOCK)
        ),
        _ => false,
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    success: bool,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    remaining: Option<i32>,
}

impl ResponseError for LeaveError {
    fn status_code(&self) -> StatusCode {
        match self {
            LeaveError::InvalidInput(_)
            | LeaveError::UnknownLeaveType(_)
            | LeaveError::QuotaExceeded { .. }
            | LeaveError::AlreadyDecided(_) => StatusCode::BAD_REQUEST,
            LeaveError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            LeaveError::Forbidden(_) => StatusCode::FORBIDDEN,
            LeaveError::NotFound(_) => StatusCode::NOT_FOUND,
            LeaveError::Busy => StatusCode::SERVICE_UNAVAILABLE,
            LeaveError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = self.to_string();
        let body = ErrorBody {
            success: false,
            message: match self {
                // detail stays in the logs
                LeaveError::Persistence(e) => {
                    tracing::error!(error = %e, "Leave persistence failure");
                    "Internal Server Error"
                }
                _ => &message,
            },
            remaining: match self {
                LeaveError::QuotaExceeded { remaining } => Some(*remaining),
                _ => None,
            },
        };

        let mut response = HttpResponse::build(self.status_code());
        if matches!(self, LeaveError::Busy) {
            response.insert_header(("Retry-After", "1"));
        }
        response.json(body)
    }
}

pub type LeaveResult<T> = Result<T, LeaveError>;

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;
    use rstest::rstest;
    use serde_json::Value;

    async fn body_of(err: LeaveError) -> (StatusCode, Value) {
        let response = err.error_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body()).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[rstest]
    #[case(LeaveError::InvalidInput("bad".into()), StatusCode::BAD_REQUEST)]
    #[case(LeaveError::UnknownLeaveType("x".into()), StatusCode::BAD_REQUEST)]
    #[case(LeaveError::QuotaExceeded { remaining: 3 }, StatusCode::BAD_REQUEST)]
    #[case(LeaveError::AlreadyDecided(7), StatusCode::BAD_REQUEST)]
    #[case(LeaveError::Unauthorized("no".into()), StatusCode::UNAUTHORIZED)]
    #[case(LeaveError::Forbidden("no".into()), StatusCode::FORBIDDEN)]
    #[case(LeaveError::NotFound("gone".into()), StatusCode::NOT_FOUND)]
    #[case(LeaveError::Busy, StatusCode::SERVICE_UNAVAILABLE)]
    #[case(LeaveError::Persistence(sqlx::Error::RowNotFound), StatusCode::INTERNAL_SERVER_ERROR)]
    fn errors_map_to_status_codes(#[case] err: LeaveError, #[case] expected: StatusCode) {
        assert_eq!(err.status_code(), expected);
    }

    #[actix_web::test]
    async fn quota_exceeded_carries_remaining_days() {
        let (status, body) = body_of(LeaveError::QuotaExceeded { remaining: 10 }).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Insufficient leave quota");
        assert_eq!(body["remaining"], 10);
    }

    #[actix_web::test]
    async fn persistence_detail_is_not_leaked() {
        let (status, body) = body_of(LeaveError::Persistence(sqlx::Error::PoolClosed)).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Internal Server Error");
        assert!(body.get("remaining").is_none());
    }

    #[test]
    fn pool_timeout_is_retryable() {
        assert!(matches!(
            LeaveError::from(sqlx::Error::PoolTimedOut),
            LeaveError::Busy
        ));
        assert!(matches!(
            LeaveError::from(sqlx::Error::RowNotFound),
            LeaveError::Persistence(_)
        ));
    }
}
