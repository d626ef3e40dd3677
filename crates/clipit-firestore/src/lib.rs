//! Firestore REST API client.
//!
//! This crate provides:
//! - The `UserStore` trait and its Firestore-backed `UserRepository`
//! - Service account authentication via gcp_auth with token caching
//! - Upserts through masked PATCH writes, with retry and metrics

pub mod client;
pub mod error;
pub mod metrics;
pub mod retry;
pub mod token_cache;
pub mod types;
pub mod user_repo;

#[cfg(any(test, feature = "test-util"))]
pub mod memory;


pub use client::{FirestoreClient, FirestoreConfig};
pub use error::{FirestoreError, FirestoreResult};
pub use token_cache::{StaticToken, TokenCache, TokenSource};
pub use types::{Document, FromFirestoreValue, ToFirestoreValue, Value};
pub use user_repo::{UserRepository, UserStore, USERS_COLLECTION};

#[cfg(any(test, feature = "test-util"))]
pub use memory::MemoryUserStore;
