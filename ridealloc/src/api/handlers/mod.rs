//! HTTP request handlers.
//!
//! - [`allocations`]: ride request upload and allocation download
//!
//! Handlers return [`crate::errors::Result`], so every failure is rendered through
//! [`crate::errors::Error`]'s `IntoResponse` implementation as `{"error": "..."}`.

pub mod allocations;
