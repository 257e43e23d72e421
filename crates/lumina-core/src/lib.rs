//! Lumina Core Library
//!
//! This crate provides the domain models, error types, configuration and
//! constants shared by every Lumina component: the media record, the
//! derivative quality tiers and their canonical cache names, and the
//! registry of supported media types.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;

// Re-export commonly used types
pub use config::LuminaConfig;
pub use error::{ErrorMetadata, LogLevel, MediaError, MediaResult};
pub use models::{
    derivative_name, CacheFileRef, Media, MediaData, MediaType, Quality, SourceFile,
};
