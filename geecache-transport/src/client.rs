use async_trait::async_trait;
use http_body_util::{BodyExt, Empty};
use hyper::Uri;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use tracing::debug;

use geecache_common::{Error, Value};

use crate::peer::PeerGetter;
use crate::wire;

/// `PeerGetter` over the HTTP wire protocol.
///
/// Fixes an error-ordering bug: the
/// request's outcome is inspected before the response body is ever
/// touched, rather than unconditionally closing the body first and
/// only then noticing a failed request.
pub struct HttpPeerGetter {
    base_url: String,
    prefix: String,
    client: Client<HttpConnector, Empty<hyper::body::Bytes>>,
}

impl HttpPeerGetter {
    pub fn new(base_url: impl Into<String>, prefix: impl Into<String>) -> Self {
        HttpPeerGetter {
            base_url: base_url.into(),
            prefix: prefix.into(),
            client: Client::builder(TokioExecutor::new()).build_http(),
        }
    }

    fn url_for(&self, group: &str, key: &str) -> Result<Uri, Error> {
        let group = utf8_percent_encode(group, NON_ALPHANUMERIC);
        let key = utf8_percent_encode(key, NON_ALPHANUMERIC);
        let url = format!("{}{}{}/{}", self.base_url, self.prefix, group, key);
        url.parse()
            .map_err(|err| Error::BadRequest(format!("invalid peer url {url}: {err}")))
    }
}

#[async_trait]
impl PeerGetter for HttpPeerGetter {
    async fn get(&self, group: &str, key: &str) -> Result<Value, Error> {
        let uri = self.url_for(group, key)?;
        debug!(%uri, "fetching from peer");

        // Check the request's own outcome before doing anything else
        // with the response - no body access happens on the error path.
        let response = self
            .client
            .get(uri)
            .await
            .map_err(|err| Error::Peer(err.to_string()))?;

        if response.status() != hyper::StatusCode::OK {
            return Err(Error::Peer(format!("peer returned status {}", response.status())));
        }

        let body = response
            .into_body()
            .collect()
            .await
            .map_err(|err| Error::Peer(format!("reading response body: {err}")))?
            .to_bytes();

        let value = wire::decode_response(&body)
            .map_err(|err| Error::Peer(format!("decoding response body: {err}")))?;
        Ok(Value::from(value))
    }
}
