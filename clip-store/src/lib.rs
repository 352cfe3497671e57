//! Clip catalog and asset loading for the audio service.
//!
//! A [`ClipCatalog`] maps case-insensitive clip names to static playback
//! metadata ([`ClipDescriptor`]). A [`ClipLoader`] turns a descriptor into a
//! decoded [`ClipAsset`], either synchronously ([`ResidentLoader`]) or on a
//! worker thread with a ticketed completion ([`StreamingLoader`]).

use thiserror::Error;

mod asset;
mod catalog;
mod loader;

pub use asset::ClipAsset;
pub use catalog::{ClipCatalog, ClipDescriptor, ClipSource};
pub use loader::{ClipLoader, PendingClip, Resolution, ResidentLoader, StreamingLoader};

#[derive(Error, Debug)]
pub enum AssetError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("clip not found: {0}")]
    NotFound(String),
    #[error("duplicate clip name: {0}")]
    Duplicate(String),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("invalid manifest: {0}")]
    Manifest(String),
}

/// Case-insensitive key under which clips are cached and reference-counted.
pub fn clip_key(name: &str) -> String {
    name.to_lowercase()
}
