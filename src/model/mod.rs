pub mod leave_request;
pub mod leave_type;
pub mod role;
pub mod summary;

pub use leave_request::{CreateLeave, LeaveRecord, LeaveStatus, NewLeave};
pub use leave_type::LeaveType;
pub use role::Role;
pub use summary::LeaveSummary;
