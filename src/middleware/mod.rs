pub mod auth;
pub mod guard;
pub mod master;

pub use auth::principal_middleware;
pub use guard::{admin_guard, member_guard};
pub use master::require_master;
