//! Core types and configuration for multiarch.
//!
//! This crate defines the `multiarch.toml` schema ([`MultiarchConfig`]),
//! image references ([`ImageRef`]), target platforms ([`PlatformSet`]),
//! the Python dependency manifest ([`DependencyManifest`]), the registry
//! manifest model ([`Manifest`]), and shared error types.

pub mod config;
pub mod error;
pub mod image_ref;
pub mod manifest;
pub mod platform;
pub mod requirements;

pub use config::{ImageConfig, ImageVariant, MultiarchConfig, PublishConfig};
pub use error::{Error, Result};
pub use image_ref::ImageRef;
pub use manifest::{Manifest, ManifestEntry};
pub use platform::{Platform, PlatformSet};
pub use requirements::{DependencyManifest, Requirement};
