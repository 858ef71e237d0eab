use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use parking_lot::Mutex;
use percent_encoding::percent_decode_str;
use tokio::net::TcpListener;
use tracing::{debug, error, warn};

use geecache_hash::{Ring, DEFAULT_REPLICAS};

use crate::peer::{GroupResolver, PeerGetter, PeerPicker};

pub const DEFAULT_BASE_PATH: &str = "/_geecache/";

struct AdapterState {
    ring: Ring,
    getters: HashMap<String, Arc<dyn PeerGetter>>,
}

/// Peer server adapter: owns the consistent-hash ring and the
/// per-peer getter map, doubling as both the [`PeerPicker`] the local
/// `Group` delegates through and the HTTP server other peers call into.
pub struct PeerServerAdapter {
    self_id: String,
    prefix: String,
    replicas: usize,
    state: Mutex<AdapterState>,
    build_getter: Box<dyn Fn(&str, &str) -> Arc<dyn PeerGetter> + Send + Sync>,
}

impl PeerServerAdapter {
    /// `build_getter(base_url, prefix)` constructs the `PeerGetter` used
    /// for a given peer; production callers pass
    /// `|base, prefix| Arc::new(HttpPeerGetter::new(base, prefix))`.
    pub fn new(
        self_id: impl Into<String>,
        build_getter: impl Fn(&str, &str) -> Arc<dyn PeerGetter> + Send + Sync + 'static,
    ) -> Self {
        PeerServerAdapter {
            self_id: self_id.into(),
            prefix: DEFAULT_BASE_PATH.to_string(),
            replicas: DEFAULT_REPLICAS,
            state: Mutex::new(AdapterState {
                ring: Ring::new(DEFAULT_REPLICAS),
                getters: HashMap::new(),
            }),
            build_getter: Box::new(build_getter),
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_replicas(mut self, replicas: usize) -> Self {
        self.replicas = replicas;
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Atomically rebuilds the ring and the getter map. Exclusive with
    /// `pick_peer`: the new ring is built fully off to the side and
    /// only then swapped in under the lock, so concurrent readers never
    /// observe a torn view.
    pub fn set(&self, peers: &[String]) {
        let mut ring = Ring::new(self.replicas);
        ring.add(peers.iter().map(|p| p.as_str()));

        let mut getters = HashMap::with_capacity(peers.len());
        for peer in peers {
            let getter = (self.build_getter)(peer, &self.prefix);
            getters.insert(peer.clone(), getter);
        }

        let mut state = self.state.lock();
        state.ring = ring;
        state.getters = getters;
    }
}

impl PeerPicker for PeerServerAdapter {
    fn pick_peer(&self, key: &str) -> Option<Arc<dyn PeerGetter>> {
        let state = self.state.lock();
        let owner = state.ring.get(key)?;
        if owner == self.self_id {
            return None;
        }
        let getter = state.getters.get(owner).cloned();
        if getter.is_some() {
            debug!(peer = owner, "pick peer");
        }
        getter
    }
}

fn full(body: Vec<u8>) -> Full<Bytes> {
    Full::new(Bytes::from(body))
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .body(full(message.into().into_bytes()))
        .expect("building a response from a fixed status cannot fail")
}

async fn handle(
    req: Request<Incoming>,
    prefix: Arc<String>,
    resolver: Arc<dyn GroupResolver>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let path = req.uri().path();
    debug!(method = %req.method(), %path, "inbound peer request");

    let Some(rest) = path.strip_prefix(prefix.as_str()) else {
        return Ok(error_response(StatusCode::NOT_FOUND, "unexpected path prefix"));
    };

    let parts: Vec<&str> = rest.splitn(2, '/').collect();
    if parts.len() != 2 {
        return Ok(error_response(StatusCode::BAD_REQUEST, "bad request"));
    }

    let group_name = match percent_decode_str(parts[0]).decode_utf8() {
        Ok(s) => s.into_owned(),
        Err(_) => return Ok(error_response(StatusCode::BAD_REQUEST, "bad request")),
    };
    let key = match percent_decode_str(parts[1]).decode_utf8() {
        Ok(s) => s.into_owned(),
        Err(_) => return Ok(error_response(StatusCode::BAD_REQUEST, "bad request")),
    };

    if !resolver.contains(&group_name) {
        return Ok(error_response(
            StatusCode::NOT_FOUND,
            format!("no such group: {group_name}"),
        ));
    }

    match resolver.get(&group_name, &key).await {
        Ok(value) => {
            let body = crate::wire::encode_response(value.as_slice());
            Ok(Response::builder()
                .status(StatusCode::OK)
                .header(http::header::CONTENT_TYPE, "application/octet-stream")
                .body(full(body))
                .expect("building a 200 response from a fixed header cannot fail"))
        }
        Err(err) => {
            warn!(group = %group_name, %key, error = %err, "peer server failed to load key");
            Ok(error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()))
        }
    }
}

/// Serves the peer protocol on `listener` until the process
/// exits or the listener errors out. One task per inbound connection.
pub async fn serve(
    listener: TcpListener,
    prefix: String,
    resolver: Arc<dyn GroupResolver>,
) -> std::io::Result<()> {
    let prefix = Arc::new(prefix);
    loop {
        let (stream, _) = listener.accept().await?;
        let io = TokioIo::new(stream);
        let prefix = prefix.clone();
        let resolver = resolver.clone();
        tokio::spawn(async move {
            let service = service_fn(move |req| handle(req, prefix.clone(), resolver.clone()));
            if let Err(err) = ConnBuilder::new(TokioExecutor::new())
                .serve_connection(io, service)
                .await
            {
                error!(%err, "peer connection terminated");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::HttpPeerGetter;

    fn adapter(self_id: &str) -> PeerServerAdapter {
        PeerServerAdapter::new(self_id, |base, prefix| {
            Arc::new(HttpPeerGetter::new(base, prefix)) as Arc<dyn PeerGetter>
        })
    }

    #[test_log::test]
    fn pick_peer_returns_none_before_set() {
        let adapter = adapter("http://localhost:8001");
        assert!(adapter.pick_peer("anykey").is_none());
    }

    #[test_log::test]
    fn pick_peer_returns_none_for_self() {
        let adapter = adapter("http://localhost:8001").with_replicas(3);
        adapter.set(&["http://localhost:8001".to_string()]);
        assert!(adapter.pick_peer("anykey").is_none());
    }

    #[test_log::test]
    fn pick_peer_returns_remote_owner() {
        let adapter = adapter("http://localhost:8001").with_replicas(50);
        adapter.set(&[
            "http://localhost:8001".to_string(),
            "http://localhost:8002".to_string(),
        ]);
        // At least one of many keys must resolve to the remote peer.
        let found = (0..200).any(|i| adapter.pick_peer(&format!("key-{i}")).is_some());
        assert!(found);
    }
}
