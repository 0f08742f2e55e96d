//! # Clinic Common Library
//!
//! Shared code for the clinic services including:
//! - Database bootstrap and models
//! - Configuration loading and root folder resolution
//! - Common error type

pub mod config;
pub mod db;
pub mod error;

pub use error::{Error, Result};
