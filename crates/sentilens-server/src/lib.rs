//! Sentilens Server
//!
//! HTTP transport over the Sentilens job query surface: submit a text
//! collection, poll its status, then search, filter, correct, validate and
//! download the classified results.

pub mod cli;
pub mod config;
pub mod export;
pub mod routes;
pub mod state;

pub use cli::{Cli, LogFormat};
pub use config::ServerConfig;
pub use routes::create_router;
pub use state::AppState;
