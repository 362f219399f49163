//! Randimg Serve - HTTP API for random wallpaper URLs
//!
//! This crate serves a single `/api` endpoint that picks random images from a
//! landscape (`pc`) or portrait (`pe`) set and returns their URLs as JSON,
//! plain text or a redirect.
//!
//! # Architecture
//!
//! - **AppState**: Shared application state (configuration, image library, history)
//! - **Library**: Cached image lists loaded from a directory or manifest
//! - **Render**: Response bodies for each output shape
//! - **Routes**: Endpoint handlers and response middleware

pub mod config;
mod error;
pub mod library;
pub mod render;
mod routes;
pub mod state;

pub use self::config::Config;
pub use self::error::ApiError;
pub use self::library::{ImageLibrary, LibrarySource};
pub use self::routes::router;
pub use self::state::AppState;
