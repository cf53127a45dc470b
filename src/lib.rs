pub mod config;
pub mod error;
pub mod fetch;
pub mod http_retry;
pub mod metrics;
pub mod playlist;
pub mod server;
