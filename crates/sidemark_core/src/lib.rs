#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// Block identifier markers
pub mod block_id;

/// Converter configuration
pub mod config;

/// Deserializer (plain text + sidecar to document tree)
pub mod deserializer;

/// Rich-document tree
pub mod document;

/// Error (common error types)
pub mod error;

/// Image reference indirection and stores
pub mod image;

/// Inline decoration and re-composition
pub mod inline;

/// Serializer (document tree to plain text + sidecar)
pub mod serializer;

/// Formatting overlay model
pub mod sidecar;

pub use config::ConverterConfig;
pub use deserializer::Deserializer;
pub use document::{Mark, Node, Text};
pub use error::{Result, SidemarkError};
pub use image::{ImageStore, MemoryImageStore};
pub use serializer::{Serialized, Serializer};
pub use sidecar::Sidecar;

