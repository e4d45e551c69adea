//! Common utilities and types shared across filebox crates.
//!
//! This module provides the error type and the small identifier types that
//! the client library and the command-line front end agree on.

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{FileId, SessionToken};
