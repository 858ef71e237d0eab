use std::sync::{Arc, OnceLock};

use tracing::{debug, warn};

use geecache_common::{Error, Value};
use geecache_memory::{Coalescer, LockedCache};
use geecache_transport::PeerPicker;

use crate::loader::Loader;

/// A named cache namespace backed by one loader and one local
/// byte-bounded cache.
pub struct Group {
    name: String,
    loader: Arc<dyn Loader>,
    main_cache: LockedCache,
    coalescer: Coalescer<Value>,
    peer_picker: OnceLock<Arc<dyn PeerPicker>>,
}

impl Group {
    pub fn new(name: impl Into<String>, cache_bytes: i64, loader: Arc<dyn Loader>) -> Arc<Self> {
        Arc::new(Group {
            name: name.into(),
            loader,
            main_cache: LockedCache::new(cache_bytes),
            coalescer: Coalescer::new(),
            peer_picker: OnceLock::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Wires a peer picker into the group. May be called at most once;
    /// a second call is a programmer error.
    pub fn register_peers(&self, picker: Arc<dyn PeerPicker>) {
        if self.peer_picker.set(picker).is_err() {
            panic!("register_peers called more than once on group {}", self.name);
        }
    }

    pub async fn get(&self, key: &str) -> Result<Value, Error> {
        if key.is_empty() {
            return Err(Error::KeyRequired);
        }

        if let Some(value) = self.main_cache.get(key) {
            debug!(group = %self.name, %key, "cache hit");
            return Ok(value);
        }

        debug!(group = %self.name, %key, "cache miss, loading");
        self.load(key).await
    }

    async fn load(&self, key: &str) -> Result<Value, Error> {
        let peer_picker = self.peer_picker.get();

        self.coalescer
            .do_call(key, || async move {
                if let Some(picker) = peer_picker {
                    if let Some(peer) = picker.pick_peer(key) {
                        match peer.get(&self.name, key).await {
                            Ok(value) => return Ok(value),
                            Err(err) => {
                                warn!(group = %self.name, %key, %err, "peer fetch failed, falling back to loader");
                            }
                        }
                    }
                }

                self.get_locally(key).await
            })
            .await
    }

    async fn get_locally(&self, key: &str) -> Result<Value, Error> {
        let bytes = self.loader.load(key).await.map_err(Error::loader_dyn)?;
        let value = Value::copy_from_slice(&bytes);
        self.populate_cache(key, value.clone());
        Ok(value)
    }

    fn populate_cache(&self, key: &str, value: Value) {
        self.main_cache.add(key, value);
    }
}
