pub mod auth;
pub mod rbac;
pub mod request_id;
