//! # landmark-core
//!
//! Core types, traits, and abstractions for landmark.
//!
//! This crate provides the domain model (images, annotations, matches), the
//! capability traits the pipeline consumes (store and feature matcher), the
//! shared error type, and centralized defaults.

pub mod defaults;
pub mod error;
pub mod file_safety;
pub mod logging;
pub mod models;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, ErrorKind, Result};
pub use file_safety::{is_safe_stored_name, sanitize_filename, upload_extension, validate_image_upload};
pub use models::*;
pub use traits::*;
