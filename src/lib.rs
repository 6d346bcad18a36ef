// User Directory Library

pub mod api;
pub mod auth;
pub mod config;
pub mod directory;
pub mod domain;
pub mod errors;
pub mod observability;
pub mod rate_limit;
pub mod redis;

pub use config::Config;
pub use errors::{AppError, Result};
