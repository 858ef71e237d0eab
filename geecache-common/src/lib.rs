//! Shared types and error handling for the geecache crates.

mod error;
mod logging;
mod value;

pub use error::{Error, Result};
pub use logging::init_tracing;
pub use value::Value;
