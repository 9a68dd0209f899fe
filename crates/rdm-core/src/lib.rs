//! Core types and trait definitions for versioned, access-controlled records.
//!
//! No database or runtime dependencies. The store backends and the lifecycle
//! service build on it.

// Store implementations use native `async fn` against the `impl Future + Send`
// signatures of the trait.
#![allow(async_fn_in_trait)]

pub mod access;
pub mod config;
pub mod deletion;
pub mod error;
pub mod identity;
pub mod parent;
pub mod permission;
pub mod record;
pub mod store;
pub mod versions;

pub use error::{EntityKind, Error, Result};
