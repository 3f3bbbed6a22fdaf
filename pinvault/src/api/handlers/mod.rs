//! HTTP request handlers for all API endpoints.
//!
//! - [`files`]: listing pinned files and uploading new ones
//!
//! # Error Handling
//!
//! Handlers return [`crate::errors::Error`], which converts to an HTTP status code and a
//! `{"error": "..."}` JSON body.

pub mod files;
