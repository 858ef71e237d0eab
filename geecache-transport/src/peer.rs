use std::sync::Arc;

use async_trait::async_trait;

use geecache_common::{Error, Value};

/// Maps a key to the remote peer that owns it.
///
/// Returns `None` when the key's owner is this process itself, or when
/// no peers are configured — in either case the caller should fall
/// back to its local loader.
pub trait PeerPicker: Send + Sync {
    fn pick_peer(&self, key: &str) -> Option<Arc<dyn PeerGetter>>;
}

/// Fetches a value for `(group, key)` from one specific remote peer.
/// The transport backing this is opaque to callers; `geecache-transport`
/// supplies an HTTP implementation ([`crate::client::HttpPeerGetter`]).
#[async_trait]
pub trait PeerGetter: Send + Sync {
    async fn get(&self, group: &str, key: &str) -> Result<Value, Error>;
}

/// Resolves a group name to something that can answer `get(key)`
/// locally. Implemented by the group registry in the `geecache` crate;
/// kept as a trait here so the peer server adapter doesn't need to
/// depend on the facade crate that depends on it.
#[async_trait]
pub trait GroupResolver: Send + Sync {
    async fn get(&self, group: &str, key: &str) -> Result<Value, Error>;

    fn contains(&self, group: &str) -> bool;
}
