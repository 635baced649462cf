//! Thumbnail generator for object storage
//!
//! Handles blob-created events: each new PNG, JPEG or GIF image is resized to
//! three configured widths and written back to a thumbnail container under
//! `small/`, `medium/` and `large/` prefixes, in the source's own format.

pub mod app;
pub mod blob;
pub mod error;
pub mod event;
pub mod image;
pub mod models;
pub mod storage;

pub use error::{Error, Result};
