// src/lib.rs

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod server;
pub mod state;

pub use config::Args;
pub use error::ApiError;
pub use routes::router;
pub use state::{AppState, Repositories};
