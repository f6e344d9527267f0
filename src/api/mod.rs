pub mod health;
pub mod leave;
