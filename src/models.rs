pub mod analytics;
pub mod auth;
pub mod client;
pub mod interaction;
