//! HTTP route groups. Every path is registered both with and without a
//! trailing slash so reverse proxies that normalize either way keep working.

pub mod deals;
pub mod extract;
pub mod health;
pub mod tiktok;

pub use deals::create_deal_routes;
pub use extract::create_extract_routes;
pub use health::create_health_routes;
pub use tiktok::create_tiktok_routes;
