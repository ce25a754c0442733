//! Storage module
//!
//! Provides blob storage for uploaded note files.

pub mod blob_store;

pub use blob_store::{sanitize_filename, BlobStore};
