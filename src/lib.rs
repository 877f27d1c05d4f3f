//! Imgshelf - a filesystem-backed image gallery
//!
//! This library crate exposes the store, configuration and HTTP server for
//! the binary and for integration testing.

pub mod config;
pub mod images;
pub mod server;
