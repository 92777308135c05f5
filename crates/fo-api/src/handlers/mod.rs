//! API request handlers

pub mod activity;
pub mod attachments;
pub mod auth;
pub mod clients;
pub mod dashboard;
pub mod employees;
pub mod leave;
pub mod lookups;
pub mod notifications;
pub mod resources;
pub mod roles;
pub mod templates;
pub mod users;
pub mod work_orders;
