//! # kvt Common Library
//!
//! Shared code for the kvt media library server:
//! - Library entity models (songs, artists, albums, playlists, users, feeds)
//! - Error type with the failure classification used by every layer
//! - Name sanitizing for dedup and search comparisons
//! - Configuration loading
//! - Password hashing and session token generation

pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod sanitize;
pub mod time;

pub use error::{Error, ErrorKind, Result};
pub use sanitize::sanitize;
