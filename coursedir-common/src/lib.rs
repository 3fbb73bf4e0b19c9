//! # Coursedir Common Library
//!
//! Shared code for the coursedir catalog tools including:
//! - Record model and flag conventions
//! - Catalog schemas (column positions, tolerated historical widths)
//! - Flat-file record store (load / backup / atomic replace)
//! - Change log and run summary types
//! - Configuration loading
//! - Timestamp and surrogate-key utilities

pub mod changelog;
pub mod config;
pub mod error;
pub mod ids;
pub mod model;
pub mod schema;
pub mod store;
pub mod time;

pub use error::{Error, Result};
pub use model::Record;
