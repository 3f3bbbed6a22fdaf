//! API layer for HTTP request handling and data models.
//!
//! - **[`handlers`]**: Axum route handlers
//! - **[`models`]**: Request/response data structures, shared with the [`crate::page`] client
//!
//! # API Structure
//!
//! - **Files** (`/api/files`): list pinned files (`GET`) and upload a new one (`POST`)
//!
//! # OpenAPI Documentation
//!
//! Endpoints are documented with `utoipa`. The document is served at `/api-docs/openapi.json`
//! and rendered at `/docs`.

pub mod handlers;
pub mod models;
