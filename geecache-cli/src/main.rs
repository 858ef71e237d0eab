//! Demonstration bootstrap for a three-peer `scores` cache, mirroring
//! the reference `geecache` walkthrough: pick a port, wire the same
//! fixed peer set everywhere, optionally expose a client-facing API.

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;

use bytes::Bytes;
use clap::Parser;
use http_body_util::Full;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tracing::{error, info};

use geecache::{FnLoader, Group, GroupRegistry, HttpPeerGetter, PeerServerAdapter};

const FIXED_PEERS: [&str; 3] = [
    "http://localhost:8001",
    "http://localhost:8002",
    "http://localhost:8003",
];
const API_ADDR: &str = "http://localhost:9999";

#[derive(Parser)]
#[command(name = "geecache-cli", about = "runs one peer of the three-peer scores demo")]
struct Cli {
    /// Which of the fixed demonstration peer addresses to bind to.
    #[arg(long, default_value_t = 8001)]
    port: u16,

    /// Also start the client-facing API server on localhost:9999.
    #[arg(long)]
    api: bool,
}

fn demo_db() -> HashMap<&'static str, &'static str> {
    HashMap::from([("Tom", "630"), ("Jack", "589"), ("Sam", "567")])
}

fn create_group() -> Arc<Group> {
    let db = demo_db();
    let loader = FnLoader::new(move |key: &str| {
        let key = key.to_string();
        let value = db.get(key.as_str()).map(|v| v.to_string());
        Box::pin(async move {
            info!(%key, "slow db search");
            value
                .map(|v| v.into_bytes())
                .ok_or_else(|| format!("{key} not exist").into())
        })
    });
    Group::new("scores", 2 << 10, Arc::new(loader))
}

async fn start_cache_server(addr: &str, registry: Arc<GroupRegistry>, group: Arc<Group>) {
    let peers = Arc::new(PeerServerAdapter::new(addr, |base, prefix| {
        Arc::new(HttpPeerGetter::new(base, prefix)) as Arc<dyn geecache::PeerGetter>
    }));
    peers.set(&FIXED_PEERS.map(String::from));
    group.register_peers(peers);
    registry.register(group);

    let host_port = addr.trim_start_matches("http://");
    let listener = TcpListener::bind(host_port)
        .await
        .unwrap_or_else(|err| panic!("failed to bind {host_port}: {err}"));
    info!(%addr, "geecache is running");
    geecache::serve(listener, geecache::DEFAULT_BASE_PATH.to_string(), registry)
        .await
        .unwrap_or_else(|err| panic!("cache server stopped: {err}"));
}

async fn api_handle(
    req: Request<hyper::body::Incoming>,
    group: Arc<Group>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let query = req.uri().query().unwrap_or("");
    let key = query
        .split('&')
        .find_map(|pair| pair.strip_prefix("key="))
        .unwrap_or("");

    match group.get(key).await {
        Ok(value) => Ok(Response::builder()
            .status(StatusCode::OK)
            .header(http::header::CONTENT_TYPE, "application/octet-stream")
            .body(Full::new(Bytes::from(value.as_bytes())))
            .expect("building a 200 response from a fixed header cannot fail")),
        Err(err) => Ok(Response::builder()
            .status(StatusCode::INTERNAL_SERVER_ERROR)
            .body(Full::new(Bytes::from(err.to_string())))
            .expect("building an error response cannot fail")),
    }
}

async fn start_api_server(addr: &str, group: Arc<Group>) {
    let host_port = addr.trim_start_matches("http://");
    let listener = TcpListener::bind(host_port)
        .await
        .unwrap_or_else(|err| panic!("failed to bind {host_port}: {err}"));
    info!(%addr, "frontend server is running");

    loop {
        let (stream, _) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(err) => {
                error!(%err, "api listener accept failed");
                continue;
            }
        };
        let io = TokioIo::new(stream);
        let group = group.clone();
        tokio::spawn(async move {
            let service = service_fn(move |req| api_handle(req, group.clone()));
            if let Err(err) = ConnBuilder::new(TokioExecutor::new())
                .serve_connection(io, service)
                .await
            {
                error!(%err, "api connection terminated");
            }
        });
    }
}

#[tokio::main]
async fn main() {
    geecache_common::init_tracing();
    let cli = Cli::parse();

    let addr = *FIXED_PEERS
        .iter()
        .find(|p| p.ends_with(&cli.port.to_string()))
        .unwrap_or_else(|| panic!("{} is not one of the fixed demonstration ports", cli.port));

    let group = create_group();
    let registry = Arc::new(GroupRegistry::new());

    if cli.api {
        let group = group.clone();
        tokio::spawn(async move { start_api_server(API_ADDR, group).await });
    }

    start_cache_server(addr, registry, group).await;
}
