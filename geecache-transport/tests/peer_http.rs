use std::sync::Arc;

use async_trait::async_trait;
use tokio::net::TcpListener;

use geecache_common::{Error, Value};
use geecache_transport::{serve, GroupResolver, HttpPeerGetter, PeerGetter, DEFAULT_BASE_PATH};

/// A resolver backing one group with a fixed key/value table, enough to
/// exercise the wire protocol without pulling in the facade crate.
struct FixedResolver {
    group: &'static str,
    table: Vec<(&'static str, &'static str)>,
}

#[async_trait]
impl GroupResolver for FixedResolver {
    async fn get(&self, group: &str, key: &str) -> Result<Value, Error> {
        if group != self.group {
            return Err(Error::UnknownGroup(group.to_string()));
        }
        self.table
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| Value::from(*v))
            .ok_or_else(|| Error::BadRequest(format!("{key} not exist")))
    }

    fn contains(&self, group: &str) -> bool {
        group == self.group
    }
}

async fn spawn_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let resolver: Arc<dyn GroupResolver> = Arc::new(FixedResolver {
        group: "scores",
        table: vec![("Tom", "630"), ("Jack", "589"), ("Sam", "567")],
    });
    tokio::spawn(serve(listener, DEFAULT_BASE_PATH.to_string(), resolver));
    format!("http://{addr}")
}

#[test_log::test(tokio::test)]
async fn peer_round_trip_known_key() {
    let base = spawn_server().await;
    let getter = HttpPeerGetter::new(&base, DEFAULT_BASE_PATH);
    let value = getter.get("scores", "Tom").await.unwrap();
    assert_eq!(value.as_slice(), b"630");
}

#[test_log::test(tokio::test)]
async fn peer_round_trip_unknown_key_is_peer_failed() {
    let base = spawn_server().await;
    let getter = HttpPeerGetter::new(&base, DEFAULT_BASE_PATH);
    let err = getter.get("scores", "nobody").await.unwrap_err();
    assert!(matches!(err, Error::Peer(_)));
}

#[test_log::test(tokio::test)]
async fn unknown_group_round_trip_is_peer_failed() {
    let base = spawn_server().await;
    let getter = HttpPeerGetter::new(&base, DEFAULT_BASE_PATH);
    let err = getter.get("unknown", "Tom").await.unwrap_err();
    assert!(matches!(err, Error::Peer(_)));
}

#[test_log::test(tokio::test)]
async fn raw_http_status_codes_match_the_wire_contract() {
    use http_body_util::Empty;
    use hyper_util::client::legacy::Client;
    use hyper_util::rt::TokioExecutor;

    let base = spawn_server().await;
    let client = Client::builder(TokioExecutor::new()).build_http::<Empty<bytes::Bytes>>();

    let ok: hyper::Uri = format!("{base}{DEFAULT_BASE_PATH}scores/Tom").parse().unwrap();
    let resp = client.get(ok).await.unwrap();
    assert_eq!(resp.status(), hyper::StatusCode::OK);

    let not_found: hyper::Uri = format!("{base}{DEFAULT_BASE_PATH}unknown/Tom").parse().unwrap();
    let resp = client.get(not_found).await.unwrap();
    assert_eq!(resp.status(), hyper::StatusCode::NOT_FOUND);

    let bad_request: hyper::Uri = format!("{base}{DEFAULT_BASE_PATH}scores").parse().unwrap();
    let resp = client.get(bad_request).await.unwrap();
    assert_eq!(resp.status(), hyper::StatusCode::BAD_REQUEST);
}
