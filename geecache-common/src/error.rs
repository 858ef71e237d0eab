use std::sync::Arc;

use thiserror::Error;

/// Result alias used across the geecache crates.
pub type Result<T> = std::result::Result<T, Error>;

/// Recoverable error surface for group reads and the inter-peer transport.
///
/// `Error::Peer` is always recovered internally by falling back to the
/// local loader; it is only ever observed by callers of the HTTP client
/// directly. Every other variant propagates to the original caller.
///
/// `Clone` via `Arc`-wrapped sources: single-flight followers need to
/// observe the identical error the leader produced without requiring
/// every possible loader error type to itself be `Clone`.
#[derive(Error, Debug, Clone)]
pub enum Error {
    #[error("key required")]
    KeyRequired,

    #[error("unknown group: {0}")]
    UnknownGroup(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("loader failed: {0}")]
    LoaderFailed(#[source] Arc<dyn std::error::Error + Send + Sync>),

    #[error("peer fetch failed: {0}")]
    Peer(String),
}

impl Error {
    pub fn loader(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Error::LoaderFailed(Arc::new(err))
    }

    /// Wraps an already-boxed loader error without double-boxing it.
    pub fn loader_dyn(err: Box<dyn std::error::Error + Send + Sync>) -> Self {
        Error::LoaderFailed(Arc::from(err))
    }
}
