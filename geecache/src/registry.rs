use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use geecache_common::{Error, Value};
use geecache_transport::GroupResolver;

use crate::group::Group;

/// Process-wide table of named groups.
///
/// Registration is exclusive: a name can be claimed once. There is no
/// way to unregister; entries live for the duration of the process.
#[derive(Default)]
pub struct GroupRegistry {
    groups: Mutex<HashMap<String, Arc<Group>>>,
}

impl GroupRegistry {
    pub fn new() -> Self {
        GroupRegistry {
            groups: Mutex::new(HashMap::new()),
        }
    }

    /// Registers `group` under its own name. Panics if the name is
    /// already taken.
    pub fn register(&self, group: Arc<Group>) {
        let mut guard = self.groups.lock();
        let name = group.name().to_string();
        if guard.insert(name.clone(), group).is_some() {
            panic!("group {name} already registered");
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<Group>> {
        self.groups.lock().get(name).cloned()
    }
}

#[async_trait]
impl GroupResolver for GroupRegistry {
    async fn get(&self, group: &str, key: &str) -> Result<Value, Error> {
        let group = self
            .get(group)
            .ok_or_else(|| Error::UnknownGroup(group.to_string()))?;
        group.get(key).await
    }

    fn contains(&self, group: &str) -> bool {
        self.groups.lock().contains_key(group)
    }
}
