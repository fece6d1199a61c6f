//! Shared types for the storefront client workspace
//!
//! `Secret` keeps bearer tokens out of logs; `Error` covers configuration
//! loading for every binary in the workspace.

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::Secret;
