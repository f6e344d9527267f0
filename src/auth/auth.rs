use crate::error::LeaveError;
use crate::model::role::Role;
use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload};
use futures::future::{Ready, ready};

/// The caller, as established by `auth_middleware`.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: u64,
    pub username: String,
    pub role: Role,
}

impl FromRequest for AuthUser {
    type Error = LeaveError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<AuthUser>()
                .cloned()
                .ok_or_else(|| LeaveError::Unauthorized("Unauthorized".into())),
        )
    }
}

impl AuthUser {
    pub fn require_hr_or_admin(&self) -> Result<(), LeaveError> {
        if self.role.can_manage_leave() {
            Ok(())
        } else {
            Err(LeaveError::Forbidden("HR/Admin only".into()))
        }
    }

    /// Resolves whose leave a request is about: the caller by default, any
    /// user for HR and admins.
    pub fn resolve_subject(&self, requested: Option<u64>) -> Result<u64, LeaveError> {
        match requested {
            None => Ok(self.user_id),
            Some(id) if id == self.user_id => Ok(id),
            Some(id) => {
                self.require_hr_or_admin()?;
                Ok(id)
            }
        }
    }
}
