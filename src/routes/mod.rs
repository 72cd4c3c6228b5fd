mod admin;
pub use admin::{admin_routes, BODY_LIMIT};
