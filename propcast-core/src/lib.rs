// src/lib.rs

pub mod db;
pub mod repositories;
pub mod auth;
pub mod http;
pub mod integrations;
pub mod services;
pub mod test_utils;

pub use db::Database;
pub use propcast_common::error::Error;
pub use propcast_common::models;
pub use http::{DefaultHttpClient, HttpClient, HttpResponse};
