//! Image storage and management module.
//!
//! This module provides the filesystem-backed image store and everything
//! around it: conflict-free naming, metadata extraction from filesystem
//! attributes, gallery ordering, and the [`ImageService`] handle shared by
//! the HTTP handlers and the CLI. Filename rules themselves live in
//! `imgshelf_common::paths`.

pub mod gallery;
pub mod metadata;
pub mod naming;
mod service;
pub mod storage;

pub use service::ImageService;
pub use storage::{ImageStore, MAX_PUBLISH_ATTEMPTS};
