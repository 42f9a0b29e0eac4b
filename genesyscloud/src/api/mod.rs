//! Genesys Cloud platform API layer
//!
//! One shared HTTP client plus a small proxy per entity. Each proxy is a
//! trait so resources can be exercised against scripted implementations;
//! the concrete proxies all ride on the same `ApiClient`.

pub mod client;
pub mod common;
pub mod error;

pub mod languageunderstanding;
pub mod presence;
pub mod recording;
pub mod speechandtextanalytics;

pub use client::{ApiClient, RetryConfig};
pub use error::{ApiError, NameLookupError};
