//! Shared utilities for integration and load testing.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, Method, Request, Uri};
use axum::Router;
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use stt_proxy::config::{OverrideRules, ProxyConfig};
use stt_proxy::form::{read_form, Form, FormPart};
use stt_proxy::observability::Stats;
use stt_proxy::{HttpServer, Shutdown};

/// A request as the upstream saw it.
#[derive(Debug, Clone)]
pub struct Captured {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Captured {
    /// Parse the captured body as multipart.
    pub async fn form(&self) -> Form {
        let content_type = self
            .headers
            .get(header::CONTENT_TYPE)
            .expect("captured request has no content-type")
            .clone();
        let request = Request::builder()
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(self.body.clone()))
            .unwrap();
        read_form(request, usize::MAX).await.unwrap()
    }
}

#[derive(Clone, Default)]
pub struct Recorder {
    captured: Arc<Mutex<Vec<Captured>>>,
}

impl Recorder {
    pub fn all(&self) -> Vec<Captured> {
        self.captured.lock().unwrap().clone()
    }

    pub fn last(&self) -> Captured {
        self.all().pop().expect("upstream received nothing")
    }

    pub fn count(&self) -> usize {
        self.captured.lock().unwrap().len()
    }
}

/// Start an upstream that records every request and echoes what it received.
///
/// Multipart bodies are echoed as `{"fields": [[name, value]], "files": [...]}`,
/// anything else as `{"method", "path", "body"}`.
pub async fn start_echo_upstream() -> (SocketAddr, Recorder) {
    let recorder = Recorder::default();
    let rec = recorder.clone();

    let app = Router::new().fallback(move |request: Request<Body>| {
        let rec = rec.clone();
        async move {
            let (parts, body) = request.into_parts();
            let body = axum::body::to_bytes(body, usize::MAX).await.unwrap();
            let captured = Captured {
                method: parts.method.clone(),
                uri: parts.uri.clone(),
                headers: parts.headers.clone(),
                body: body.clone(),
            };
            rec.captured.lock().unwrap().push(captured.clone());

            let is_multipart = parts
                .headers
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .is_some_and(|v| v.starts_with("multipart/form-data"));

            let echo = if is_multipart {
                form_to_json(&captured.form().await)
            } else {
                json!({
                    "method": parts.method.as_str(),
                    "path": parts.uri.to_string(),
                    "body": String::from_utf8_lossy(&body),
                })
            };
            axum::Json(echo)
        }
    });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, recorder)
}

pub fn form_to_json(form: &Form) -> Value {
    let mut fields = Vec::new();
    let mut files = Vec::new();
    for part in form.parts() {
        match part {
            FormPart::Text { name, value, .. } => fields.push(json!([name, value])),
            FormPart::File {
                name,
                filename,
                content_type,
                data,
            } => files.push(json!({
                "name": name,
                "filename": filename,
                "content_type": content_type,
                "len": data.len(),
            })),
        }
    }
    json!({ "fields": fields, "files": files })
}

/// Start a programmable raw-TCP backend with async support.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        read_request(&mut socket).await;

                        let (status, body) = f().await;
                        let status_text = match status {
                            200 => "200 OK",
                            400 => "400 Bad Request",
                            404 => "404 Not Found",
                            422 => "422 Unprocessable Entity",
                            500 => "500 Internal Server Error",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response_str = format!(
                            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });
    addr
}

/// Consume one request (head plus `Content-Length` body) from `socket`.
async fn read_request(socket: &mut tokio::net::TcpStream) {
    let mut received = Vec::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = match socket.read(&mut buf).await {
            Ok(0) | Err(_) => return,
            Ok(n) => n,
        };
        received.extend_from_slice(&buf[..n]);

        let Some(head_end) = received.windows(4).position(|w| w == b"\r\n\r\n") else {
            continue;
        };
        let head = String::from_utf8_lossy(&received[..head_end]).to_ascii_lowercase();
        let body_len = head
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(0);
        if received.len() >= head_end + 4 + body_len {
            return;
        }
    }
}

/// A running proxy.
pub struct Proxy {
    pub addr: SocketAddr,
    pub stats: Arc<Stats>,
    shutdown: Shutdown,
}

impl Proxy {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for Proxy {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start the proxy in front of `upstream` with the given JSON rules.
pub async fn start_proxy(upstream: SocketAddr, rules: &str) -> Proxy {
    start_proxy_with(upstream, rules, |_| {}).await
}

pub async fn start_proxy_with(
    upstream: SocketAddr,
    rules: &str,
    configure: impl FnOnce(&mut ProxyConfig),
) -> Proxy {
    let mut config = ProxyConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.upstream.address = upstream.to_string();
    configure(&mut config);

    let rules = OverrideRules::from_json_str(rules).unwrap();
    let server = HttpServer::new(config, rules).unwrap();
    let stats = server.stats();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    // Give the accept loop a moment to start.
    tokio::time::sleep(Duration::from_millis(50)).await;

    Proxy {
        addr,
        stats,
        shutdown,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

/// A deterministic binary payload with every byte value.
pub fn audio_fixture(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 % 256) as u8).collect()
}
