//! Named cache partitions holding request → response records.
//!
//! This module provides the storage capability the controller is built on:
//!
//! - Request/response model and request keys (SHA-256 of method and URL)
//! - The `CacheStorage` trait (`open`/`match`/`put`/`keys`/`delete`)
//! - An in-memory backend for tests and ephemeral runs
//! - A SQLite backend with automatic schema migrations and WAL mode

pub mod connection;
pub mod entry;
pub mod hash;
pub mod memory;
pub mod migrations;
pub mod partitions;
pub mod request;
pub mod response;
pub mod storage;

pub use crate::Error;

pub use connection::CacheDb;
pub use entry::CachedEntry;
pub use memory::MemoryStorage;
pub use request::{Destination, Request};
pub use response::{Response, ResponseType};
pub use storage::CacheStorage;
