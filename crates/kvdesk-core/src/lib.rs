//! Shared types and the remote store boundary for kvdesk.
//!
//! This crate carries no session state: connection records, key listings,
//! revisions, validation rules and the [`client::RemoteStore`] trait live here
//! so that any front end can drive the same workspace.

pub mod api;
pub mod client;
pub mod error;
pub mod format;
pub mod keys;
pub mod types;

pub use client::{MemoryStore, RemoteStore, StoreFuture};
pub use error::{ErrorKind, StoreError, StoreResult};
