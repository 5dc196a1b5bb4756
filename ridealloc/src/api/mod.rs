//! API layer for HTTP request handling and data models.
//!
//! - **[`handlers`]**: Axum route handlers
//! - **[`models`]**: Response data structures documented in the OpenAPI schema
//!
//! # API Structure
//!
//! - `POST /allocate_rides`: upload a request CSV, download the allocation CSV
//! - `GET /healthz`: liveness
//! - `GET /api-docs/openapi.json` and `/docs`: OpenAPI document and interactive reference

pub mod handlers;
pub mod models;
