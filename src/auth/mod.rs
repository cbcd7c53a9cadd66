pub mod admin;
pub mod policy;

pub use admin::{verify_admin_pin, AdminSession, AdminSessionStore};
