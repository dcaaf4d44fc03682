//! Transparent forwarding to the upstream service.
//!
//! # Responsibilities
//! - Rewrite the request target onto the upstream authority
//! - Replace connection-scoped headers for the upstream hop
//! - Bound the wait for response headers (`timeouts.read_secs`)
//! - Relay status, headers and a streaming body back unchanged
//!
//! # Design Decisions
//! - Upstream non-2xx responses are relayed as-is, never translated
//! - Connect failures map to 502, header timeouts to 504
//! - No retries: the request body may be a large upload

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, HeaderMap, Method, Request, Response};
use axum::http::uri::PathAndQuery;

use crate::error::ProxyError;
use crate::http::request::strip_hop_by_hop;
use crate::upstream::pool::ConnectionManager;

/// Sends requests through the [`ConnectionManager`].
#[derive(Debug, Clone)]
pub struct Forwarder {
    pool: Arc<ConnectionManager>,
    read_timeout: Duration,
}

impl Forwarder {
    pub fn new(pool: Arc<ConnectionManager>, read_timeout: Duration) -> Self {
        Self { pool, read_timeout }
    }

    pub fn pool(&self) -> &Arc<ConnectionManager> {
        &self.pool
    }

    /// Forward one request and return the upstream response.
    ///
    /// `headers` are the client headers, already adjusted for the body being
    /// sent. Hop-by-hop headers and `host` are replaced here.
    pub async fn forward(
        &self,
        method: Method,
        path_and_query: Option<&PathAndQuery>,
        mut headers: HeaderMap,
        body: Body,
    ) -> Result<Response<Body>, ProxyError> {
        let uri = self.pool.upstream_uri(path_and_query)?;

        strip_hop_by_hop(&mut headers);
        headers.insert(header::HOST, self.pool.host_header());

        let mut request = Request::new(body);
        *request.method_mut() = method;
        *request.uri_mut() = uri;
        *request.headers_mut() = headers;

        let connection = self.pool.acquire().await?;
        let response = match tokio::time::timeout(self.read_timeout, connection.send(request)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) if e.is_connect() => {
                return Err(ProxyError::ConnectFailed(describe(&e)));
            }
            Ok(Err(e)) => return Err(ProxyError::Upstream(describe(&e))),
            Err(_) => return Err(ProxyError::UpstreamTimeout(self.read_timeout)),
        };

        let (mut parts, body) = response.into_parts();
        strip_hop_by_hop(&mut parts.headers);
        Ok(Response::from_parts(parts, body))
    }
}

/// hyper-util errors print as "client error (Connect)"; include the cause chain.
fn describe(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{TimeoutConfig, UpstreamConfig};
    use axum::http::StatusCode;
    use axum::Router;

    async fn spawn_upstream(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr.to_string()
    }

    fn forwarder(address: String, read_secs: u64) -> Forwarder {
        let upstream = UpstreamConfig {
            address,
            ..UpstreamConfig::default()
        };
        let timeouts = TimeoutConfig {
            connect_secs: 1,
            read_secs,
            ..TimeoutConfig::default()
        };
        let pool = Arc::new(ConnectionManager::new(&upstream, &timeouts).unwrap());
        Forwarder::new(pool, Duration::from_secs(read_secs))
    }

    #[tokio::test]
    async fn relays_status_headers_and_body() {
        let app = Router::new().fallback(|req: Request<Body>| async move {
            let host = req.headers().get(header::HOST).cloned();
            let hop = req.headers().get("keep-alive").is_some();
            (
                StatusCode::IM_A_TEAPOT,
                [("x-upstream", "yes")],
                format!("{} {:?} hop={}", req.uri(), host, hop),
            )
        });
        let addr = spawn_upstream(app).await;
        let forwarder = forwarder(addr.clone(), 5);

        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, "proxy.local".parse().unwrap());
        headers.insert("keep-alive", "timeout=5".parse().unwrap());
        let pq = PathAndQuery::from_static("/v1/models?x=1");

        let response = forwarder
            .forward(Method::GET, Some(&pq), headers, Body::empty())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
        assert_eq!(response.headers().get("x-upstream").unwrap(), "yes");
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(
            std::str::from_utf8(&body).unwrap(),
            format!("/v1/models?x=1 Some({:?}) hop=false", addr)
        );
    }

    #[tokio::test]
    async fn connection_refused_is_connect_failed() {
        // Bind then drop to get a port nobody listens on.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let err = forwarder(addr, 5)
            .forward(Method::GET, None, HeaderMap::new(), Body::empty())
            .await
            .unwrap_err();
        assert!(matches!(err, ProxyError::ConnectFailed(_)), "{err:?}");
    }

    #[tokio::test]
    async fn slow_upstream_times_out() {
        let app = Router::new().fallback(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            "late"
        });
        let addr = spawn_upstream(app).await;

        let err = forwarder(addr, 1)
            .forward(Method::GET, None, HeaderMap::new(), Body::empty())
            .await
            .unwrap_err();
        assert!(matches!(err, ProxyError::UpstreamTimeout(_)));
    }

    #[tokio::test]
    async fn slot_is_released_after_body_is_consumed() {
        let app = Router::new().fallback(|| async { "ok" });
        let addr = spawn_upstream(app).await;
        let forwarder = forwarder(addr, 5);
        let capacity = forwarder.pool().max_connections();

        let response = forwarder
            .forward(Method::GET, None, HeaderMap::new(), Body::empty())
            .await
            .unwrap();
        assert_eq!(forwarder.pool().available(), capacity - 1);

        axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(forwarder.pool().available(), capacity);
    }
}
