//! Google Cloud plumbing shared by the SATQA services.
//!
//! Bearer tokens come from configuration or the instance metadata server,
//! and uploaded images go to Cloud Storage through its JSON API.

pub mod auth;
pub mod error;
pub mod storage;

pub use auth::{MetadataClient, TokenSource};
pub use error::GcpError;
pub use storage::{GcsClient, StoredObject};
