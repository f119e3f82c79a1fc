pub mod auth;
pub mod config;
pub mod error;
pub mod media;
pub mod publish;
pub mod routes;
pub mod server;
pub mod storage;

pub mod test_utils;

pub use config::Config;
pub use server::Server;
