//! Network client for shelf.
//!
//! This crate provides the reqwest-backed [`Network`](shelf_core::Network)
//! used by the server, plus URL helpers for resolving site paths.

pub mod fetch;

pub use fetch::{FetchClient, FetchConfig, UrlError, canonicalize, resolve, same_origin};
