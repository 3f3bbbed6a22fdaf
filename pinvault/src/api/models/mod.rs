//! API request/response models.

pub mod files;
