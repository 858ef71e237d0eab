//! The read-through cache facade: a named `Group` backed by a local
//! cache and a loader, plus the process-wide registry that peer servers
//! resolve group names against.

mod group;
mod loader;
mod registry;

pub use group::Group;
pub use loader::{FnLoader, Loader};
pub use registry::GroupRegistry;

pub use geecache_common::{Error, Result, Value};
pub use geecache_transport::{
    serve, GroupResolver, HttpPeerGetter, PeerGetter, PeerPicker, PeerServerAdapter,
    DEFAULT_BASE_PATH,
};
