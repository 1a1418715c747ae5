//! Loyalty Networking - HTTP client and the loyalty data accessors

pub mod api;
pub mod config;
pub mod http;

pub use api::LoyaltyApi;
pub use config::ClientConfig;
pub use http::{ApiTransport, LoyaltyClient};
