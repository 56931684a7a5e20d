//! HTTP request handlers.

pub mod attendance;
pub mod companies;
pub mod contract_actions;
pub mod health;
pub mod inbox;
pub mod members;
pub mod profile;
pub mod tasks;
