//! Object store gateway for clip files.
//!
//! This crate provides:
//! - The `ObjectStore` trait and its GCS adapter (S3-interoperable API)
//! - Signed URL generation and `.mp4` listing by prefix
//! - The upload relay that copies a job's outputs to both run folders

pub mod client;
pub mod error;
pub mod gateway;
pub mod metrics;
pub mod relay;
pub mod store;

#[cfg(any(test, feature = "test-util"))]
pub mod memory;

pub use client::{GcsClient, GcsConfig};
pub use error::{StorageError, StorageResult};
pub use gateway::ClipGateway;
pub use relay::{UploadPair, UploadRelay};
pub use store::ObjectStore;

#[cfg(any(test, feature = "test-util"))]
pub use memory::MemoryObjectStore;
