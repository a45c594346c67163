//! Core types and shared functionality for shelf.
//!
//! This crate provides:
//! - Cache partitions with in-memory and SQLite backends
//! - The generation manager that evicts stale partitions
//! - The offline cache controller (network-first documents, cache-first assets)
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod controller;
pub mod error;
pub mod generation;
pub mod network;

#[cfg(test)]
pub(crate) mod testing;

pub use cache::{CacheDb, CacheStorage, CachedEntry, Destination, MemoryStorage, Request, Response, ResponseType};
pub use config::{AppConfig, ConfigError};
pub use controller::{ControllerChange, ControllerState, Intercept, OfflineController, Served, ServedFrom};
pub use error::Error;
pub use generation::{CurrentNames, GenerationManager};
pub use network::Network;
