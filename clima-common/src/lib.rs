//! # Clima Common Library
//!
//! Shared code for the climate-survey results tooling:
//! - Database schema initialization and row models
//! - Configuration loading (root folder, TOML, engine settings)
//! - Common error type

pub mod config;
pub mod db;
pub mod error;

pub use error::{Error, Result};
