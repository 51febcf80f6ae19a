//! # Roster Common Library
//!
//! Shared code for the roster services including:
//! - Error type and result alias
//! - TOML configuration loading and root folder resolution
//! - SQLite schema initialization
//! - Password hashing
//! - Timestamp helpers

pub mod config;
pub mod db;
pub mod error;
pub mod password;
pub mod time;

pub use error::{Error, Result};
