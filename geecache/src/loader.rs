use std::future::Future;
use std::pin::Pin;

use async_trait::async_trait;

/// The authoritative source of a key's bytes when no peer has it cached.
#[async_trait]
pub trait Loader: Send + Sync {
    async fn load(&self, key: &str) -> Result<Vec<u8>, Box<dyn std::error::Error + Send + Sync>>;
}

type LoadFuture =
    Pin<Box<dyn Future<Output = Result<Vec<u8>, Box<dyn std::error::Error + Send + Sync>>> + Send>>;

/// Adapts a plain closure into a [`Loader`].
pub struct FnLoader<F>(F)
where
    F: Fn(&str) -> LoadFuture + Send + Sync;

impl<F> FnLoader<F>
where
    F: Fn(&str) -> LoadFuture + Send + Sync,
{
    pub fn new(f: F) -> Self {
        FnLoader(f)
    }
}

#[async_trait]
impl<F> Loader for FnLoader<F>
where
    F: Fn(&str) -> LoadFuture + Send + Sync,
{
    async fn load(&self, key: &str) -> Result<Vec<u8>, Box<dyn std::error::Error + Send + Sync>> {
        (self.0)(key).await
    }
}
