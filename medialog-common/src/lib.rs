//! # Medialog Common Library
//!
//! Shared code for the Medialog crates including:
//! - Database initialization and row models
//! - Event types (MedialogEvent enum) and the EventBus
//! - Configuration loading and root folder resolution
//! - Utility functions

pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod time;
pub mod uuid_utils;

pub use error::{Error, Result};
