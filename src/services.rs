pub mod analytics_service;
pub mod auth;
pub mod client_service;
pub mod identity;
pub mod interaction_service;
