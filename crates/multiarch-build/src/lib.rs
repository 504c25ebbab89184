//! Dockerfile generation, build-context staging, and eject for multiarch.
//!
//! # Publish pipeline
//!
//! ```text
//! multiarch publish
//!   1. Configure      ── IMG + multiarch.toml → ImageRef, PlatformSet
//!   2. Stage          ── DockerfileGenerator::render() → .multiarch-context/
//!   3. Preflight      ── docker version / docker info / docker buildx version
//!   4. Base check     ── imagetools inspect <base_image>
//!   5. Builder        ── buildx inspect || buildx create
//!   6. Login          ── docker login (interactive or --password-stdin)
//!   7. Build + push   ── buildx build --platform … --tag IMG --push
//!   8. Verify         ── imagetools inspect --raw IMG
//! ```
//!
//! # Image variants
//!
//! - **full**: `COPY requirements.txt` + `pip install` layer, then the scripts
//! - **slim**: scripts only, no dependency layer
//!
//! # Build context
//!
//! The context directory only ever contains the generated (or ejected)
//! `Dockerfile`, the dependency manifest (full variant), and the staged files.

pub mod context;
pub mod dockerfile;
pub mod eject;

pub use dockerfile::DockerfileGenerator;
