//! Imgshelf-Common: filename rules, the stored-image record, and errors.
//!
//! This crate holds everything about an image store that does not need a
//! filesystem or a runtime:
//!
//! - **Path Utilities**: filename sanitizing, extension allow-lists, MIME lookup
//! - **Types**: [`StoredImage`], the metadata record returned by the store
//! - **Error Handling**: the store's error kinds and their HTTP status codes
//!
//! # Examples
//!
//! ```
//! use imgshelf_common::paths::{sanitize_filename, AllowList};
//! use imgshelf_common::{Error, Result};
//!
//! fn accept(raw: &str) -> Result<String> {
//!     let name = sanitize_filename(raw);
//!     if name.is_empty() {
//!         return Err(Error::InvalidName);
//!     }
//!     if !AllowList::default().is_allowed(&name) {
//!         return Err(Error::UnsupportedType(name));
//!     }
//!     Ok(name)
//! }
//!
//! assert_eq!(accept("../holiday pic.JPG").unwrap(), "holiday_pic.JPG");
//! assert!(matches!(accept("run.sh"), Err(Error::UnsupportedType(_))));
//! ```

pub mod error;
pub mod paths;
pub mod types;

pub use error::{Error, Result};
pub use types::*;
