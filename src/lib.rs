pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod recordings;
pub mod routes;
pub mod session;
pub mod state;
pub mod websocket;
