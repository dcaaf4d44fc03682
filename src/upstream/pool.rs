//! Upstream connection management.
//!
//! # Responsibilities
//! - Own the pooled HTTP client for the upstream service
//! - Cap concurrent upstream requests (`upstream.max_connections`)
//! - Hand out [`Connection`]s whose slot is held until the response body is gone
//!
//! # Design Decisions
//! - hyper-util's legacy client keeps idle keep-alive connections; idle ones
//!   expire after `timeouts.idle_secs`
//! - Slots are a semaphore, never a lock held across I/O
//! - Waiting for a slot is bounded by the connect timeout

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::uri::{Authority, PathAndQuery, Scheme};
use axum::http::{HeaderValue, Request, Response, Uri};
use futures_util::StreamExt;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::{TokioExecutor, TokioTimer},
};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::config::{TimeoutConfig, UpstreamConfig};
use crate::error::ProxyError;

pub type UpstreamClient = Client<HttpConnector, Body>;

/// Pooled access to the single upstream.
#[derive(Debug)]
pub struct ConnectionManager {
    client: UpstreamClient,
    authority: Authority,
    host_header: HeaderValue,
    slots: Arc<Semaphore>,
    max_connections: usize,
    acquire_timeout: Duration,
}

impl ConnectionManager {
    /// Build the client. Fails only if `upstream.address` is not an authority.
    pub fn new(upstream: &UpstreamConfig, timeouts: &TimeoutConfig) -> Result<Self, ProxyError> {
        let authority = Authority::from_str(&upstream.address).map_err(|e| {
            ProxyError::ConfigInvalid(format!("upstream address `{}`: {}", upstream.address, e))
        })?;
        let host_header = HeaderValue::from_str(authority.as_str())
            .map_err(|e| ProxyError::ConfigInvalid(e.to_string()))?;

        let connect_timeout = Duration::from_secs(timeouts.connect_secs);
        let idle_timeout = Duration::from_secs(timeouts.idle_secs);

        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(connect_timeout));
        connector.set_keepalive(Some(idle_timeout));
        connector.set_nodelay(true);

        let mut builder = Client::builder(TokioExecutor::new());
        builder
            .pool_timer(TokioTimer::new())
            .pool_idle_timeout(idle_timeout)
            .pool_max_idle_per_host(upstream.max_idle_per_host);
        if upstream.http2_prior_knowledge {
            builder.http2_only(true);
        }
        let client = builder.build(connector);

        tracing::info!(
            upstream = %authority,
            max_connections = upstream.max_connections,
            max_idle = upstream.max_idle_per_host,
            http2 = upstream.http2_prior_knowledge,
            "Upstream connection pool ready"
        );

        Ok(Self {
            client,
            authority,
            host_header,
            slots: Arc::new(Semaphore::new(upstream.max_connections)),
            max_connections: upstream.max_connections,
            acquire_timeout: connect_timeout,
        })
    }

    /// Wait for a free upstream slot.
    pub async fn acquire(&self) -> Result<Connection, ProxyError> {
        let permit = tokio::time::timeout(self.acquire_timeout, self.slots.clone().acquire_owned())
            .await
            .map_err(|_| {
                ProxyError::ConnectFailed(format!(
                    "all {} upstream connections busy for {:?}",
                    self.max_connections, self.acquire_timeout
                ))
            })?
            .map_err(|_| ProxyError::ConnectFailed("connection pool closed".to_string()))?;

        Ok(Connection {
            client: self.client.clone(),
            permit,
        })
    }

    /// Absolute upstream URI for an inbound path and query.
    pub fn upstream_uri(&self, path_and_query: Option<&PathAndQuery>) -> Result<Uri, ProxyError> {
        Uri::builder()
            .scheme(Scheme::HTTP)
            .authority(self.authority.clone())
            .path_and_query(path_and_query.map(PathAndQuery::as_str).unwrap_or("/"))
            .build()
            .map_err(|e| ProxyError::Upstream(format!("cannot build upstream URI: {}", e)))
    }

    /// `host` header value for the upstream hop.
    pub fn host_header(&self) -> HeaderValue {
        self.host_header.clone()
    }

    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    /// Free slots right now.
    pub fn available(&self) -> usize {
        self.slots.available_permits()
    }

    pub fn max_connections(&self) -> usize {
        self.max_connections
    }
}

/// One upstream slot plus a handle on the pooled client.
#[derive(Debug)]
pub struct Connection {
    client: UpstreamClient,
    permit: OwnedSemaphorePermit,
}

impl Connection {
    /// Send `request` upstream.
    ///
    /// The slot travels with the returned response body and is released when
    /// that body is fully streamed or dropped. Dropping the returned future
    /// aborts the upstream exchange and frees the slot.
    pub async fn send(
        self,
        request: Request<Body>,
    ) -> Result<Response<Body>, hyper_util::client::legacy::Error> {
        let Connection { client, permit } = self;
        let response = client.request(request).await?;

        let (parts, body) = response.into_parts();
        let stream = Body::new(body).into_data_stream().map(move |chunk| {
            let _slot = &permit;
            chunk
        });
        Ok(Response::from_parts(parts, Body::from_stream(stream)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager(max_connections: usize) -> ConnectionManager {
        let upstream = UpstreamConfig {
            address: "127.0.0.1:10240".into(),
            max_connections,
            ..UpstreamConfig::default()
        };
        let timeouts = TimeoutConfig {
            connect_secs: 1,
            ..TimeoutConfig::default()
        };
        ConnectionManager::new(&upstream, &timeouts).unwrap()
    }

    #[tokio::test]
    async fn builds_upstream_uri() {
        let pool = manager(1);
        let pq = PathAndQuery::from_static("/v1/audio/transcriptions?debug=1");
        let uri = pool.upstream_uri(Some(&pq)).unwrap();
        assert_eq!(uri.to_string(), "http://127.0.0.1:10240/v1/audio/transcriptions?debug=1");
        assert_eq!(pool.host_header(), "127.0.0.1:10240");
    }

    #[tokio::test]
    async fn slots_are_returned_on_drop() {
        let pool = manager(2);
        let a = pool.acquire().await.unwrap();
        let _b = pool.acquire().await.unwrap();
        assert_eq!(pool.available(), 0);

        drop(a);
        assert_eq!(pool.available(), 1);
    }

    #[tokio::test]
    async fn exhausted_pool_fails_after_connect_timeout() {
        let pool = manager(1);
        let _held = pool.acquire().await.unwrap();

        let err = pool.acquire().await.unwrap_err();
        assert!(matches!(err, ProxyError::ConnectFailed(_)));
    }

    #[test]
    fn rejects_bad_authority() {
        let upstream = UpstreamConfig {
            address: "not valid".into(),
            ..UpstreamConfig::default()
        };
        let err = ConnectionManager::new(&upstream, &TimeoutConfig::default()).unwrap_err();
        assert!(matches!(err, ProxyError::ConfigInvalid(_)));
    }
}
