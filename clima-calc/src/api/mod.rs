//! HTTP API handlers for clima-calc

pub mod campaigns;
pub mod health;

pub use campaigns::{calculate_campaign, compare_campaign, verify_campaign};
pub use health::health_routes;
