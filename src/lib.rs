pub mod config;
pub mod diagnostics;
pub mod error;
pub mod ingest;
pub mod model;
pub mod server;

pub use error::{Error, Result};
