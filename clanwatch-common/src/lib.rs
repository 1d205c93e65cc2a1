//! # clanwatch Common Library
//!
//! Shared code for the clanwatch workspace including:
//! - Error types
//! - Configuration loading and tiered resolution
//! - Clan/player tag parsing

pub mod config;
pub mod error;
pub mod tag;

pub use error::{Error, Result};
pub use tag::Tag;
