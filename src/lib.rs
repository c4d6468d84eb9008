//! # Stowage
//!
//! A multi-tenant file storage server, usable both as a standalone binary and as a library.
//!
//! Users upload files inline (base64 with a SHA-256 digest) or by URL into
//! namespaces, organize them with tags and groups, and may share them under
//! a public alias served without authentication.
//!
//! ## Library Usage
//!
//! ```toml
//! [dependencies]
//! stowage = { version = "0.0", default-features = false }
//! ```
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use stowage::config::ServerConfig;
//! use stowage::server::{AppState, create_router};
//! use stowage::store::{SqliteStore, Store};
//!
//! let config = ServerConfig::default();
//! let store = SqliteStore::new(config.db_path()).unwrap();
//! store.initialize().unwrap();
//!
//! let state = Arc::new(AppState::new(Arc::new(store), &config).unwrap());
//! let router = create_router(state);
//! // Serve with axum...
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): Builds the `stowage` binary. Disable with `default-features = false`.

pub mod auth;
pub mod config;
pub mod error;
pub mod fetch;
pub mod files;
pub mod server;
pub mod storage;
pub mod store;
pub mod types;
pub mod validation;
