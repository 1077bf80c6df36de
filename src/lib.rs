//! Content-addressed avatar store
//!
//! Stores uploaded images under their content digest so identical uploads
//! share one file, and exposes the show/upload/clear avatar workflow over
//! a small HTTP API.

pub mod avatar;
pub mod config;
pub mod digest;
pub mod session;
pub mod store;
pub mod web;

pub use avatar::{AvatarService, AvatarView};
pub use config::Config;
pub use digest::{Digest, DigestAlgorithm};
pub use store::{AssetPath, AssetStore, StoreError, StoredAsset, Upload};
