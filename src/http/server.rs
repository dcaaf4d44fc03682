//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with local endpoints and the proxy fallback
//! - Wire up middleware (tracing, timeouts, body limit, request ID)
//! - Bind server to listener
//! - Classify requests and rewrite transcription uploads
//! - Forward requests to the upstream STT service
//! - Account every proxied request in Stats and metrics

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, DefaultBodyLimit, State},
    http::{Request, Response, StatusCode},
    response::IntoResponse,
    Router,
};
use tokio::net::TcpListener;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::admin::admin_routes;
use crate::config::{ListEncoding, OverrideRules, ProxyConfig};
use crate::error::ProxyError;
use crate::form::{encode_form, read_form};
use crate::http::request::{
    append_forwarded_for, propagate_request_id_layer, request_id, set_form_headers,
    set_request_id_layer,
};
use crate::lifecycle::ShutdownSignal;
use crate::observability::{metrics, RequestRecord, Stats};
use crate::rewrite::apply_overrides;
use crate::routing::{Classifier, RequestKind};
use crate::upstream::{ConnectionManager, Forwarder};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub rules: Arc<OverrideRules>,
    pub list_encoding: ListEncoding,
    pub classifier: Arc<Classifier>,
    pub forwarder: Forwarder,
    pub stats: Arc<Stats>,
    pub max_body_bytes: usize,
}

/// HTTP server for the STT proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
    stats: Arc<Stats>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration and rules.
    pub fn new(config: ProxyConfig, rules: OverrideRules) -> Result<Self, ProxyError> {
        let pool = Arc::new(ConnectionManager::new(&config.upstream, &config.timeouts)?);
        let forwarder = Forwarder::new(pool, Duration::from_secs(config.timeouts.read_secs));
        let stats = Arc::new(Stats::new());

        tracing::info!(
            rules = rules.len(),
            fields = ?rules.field_names(),
            list_encoding = ?config.rules.list_encoding,
            "Override rules loaded"
        );

        let state = AppState {
            rules: Arc::new(rules),
            list_encoding: config.rules.list_encoding,
            classifier: Arc::new(Classifier::new(config.routing.transcription_suffix.clone())),
            forwarder,
            stats: stats.clone(),
            max_body_bytes: config.limits.max_body_bytes,
        };

        let router = Self::build_router(&config, state);
        Ok(Self {
            router,
            config,
            stats,
        })
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// The whole-request ceiling answers 504, same as an upstream that
    /// never produced headers.
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        admin_routes()
            .fallback(proxy_handler)
            .with_state(state)
            .layer(DefaultBodyLimit::max(config.limits.max_body_bytes))
            .layer(TimeoutLayer::with_status_code(
                StatusCode::GATEWAY_TIMEOUT,
                Duration::from_secs(config.timeouts.request_secs),
            ))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http())
            .layer(set_request_id_layer())
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: ShutdownSignal,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            upstream = %self.config.upstream.address,
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Router with all layers, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Shared counters, same instance served on `/stats`.
    pub fn stats(&self) -> Arc<Stats> {
        self.stats.clone()
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }
}

/// Main proxy handler.
/// Classifies the request, rewrites transcription forms, and forwards.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response<Body> {
    let start_time = Instant::now();
    let request_id = request_id(request.headers()).to_string();
    let kind = state.classifier.classify(request.method(), request.uri().path());

    tracing::debug!(
        request_id = %request_id,
        method = %request.method(),
        path = %request.uri().path(),
        kind = %kind,
        "Proxying request"
    );

    let mut record = state.stats.begin(kind);
    let result = match kind {
        RequestKind::Stt => forward_transcription(&state, request, &mut record, &request_id).await,
        RequestKind::Passthrough => forward_passthrough(&state, request).await,
    };

    let response = match result {
        Ok(response) => {
            let status = response.status();
            if !status.is_success() {
                tracing::warn!(
                    request_id = %request_id,
                    status = %status,
                    "Upstream rejected request, relaying response"
                );
            }
            record.relayed(status);
            response
        }
        Err(e) => {
            tracing::error!(
                request_id = %request_id,
                kind = %kind,
                error = %e,
                "Request failed"
            );
            metrics::record_error(e.kind());
            record.failed();
            e.into_response()
        }
    };

    metrics::record_request(kind, response.status().as_u16(), start_time);
    response
}

async fn forward_passthrough(
    state: &AppState,
    request: Request<Body>,
) -> Result<Response<Body>, ProxyError> {
    let client = client_addr(&request);
    let (parts, body) = request.into_parts();

    let mut headers = parts.headers;
    if let Some(addr) = client {
        append_forwarded_for(&mut headers, addr.ip());
    }

    state
        .forwarder
        .forward(parts.method, parts.uri.path_and_query(), headers, body)
        .await
}

async fn forward_transcription(
    state: &AppState,
    request: Request<Body>,
    record: &mut RequestRecord<'_>,
    request_id: &str,
) -> Result<Response<Body>, ProxyError> {
    let client = client_addr(&request);
    let method = request.method().clone();
    let uri = request.uri().clone();
    let mut headers = request.headers().clone();

    let inbound = read_form(request, state.max_body_bytes).await?;
    let rewrite = apply_overrides(&inbound, &state.rules, state.list_encoding);

    for event in &rewrite.events {
        tracing::info!(
            request_id = %request_id,
            field = %event.field,
            previous = event.previous.as_deref().unwrap_or("<absent>"),
            applied = %event.applied,
            "Override applied"
        );
        metrics::record_override(&event.field);
    }
    record.add_overrides(rewrite.events.len());

    let client_fields: Vec<&str> = rewrite
        .form
        .parts()
        .iter()
        .filter(|p| !p.is_file() && state.rules.get(p.name()).is_none())
        .map(|p| p.name())
        .collect();
    tracing::debug!(
        request_id = %request_id,
        inbound_parts = inbound.len(),
        outbound_parts = rewrite.form.len(),
        files = rewrite.form.files().count(),
        client_fields = ?client_fields,
        "Transcription form rewritten"
    );

    let encoded = encode_form(&rewrite.form);
    set_form_headers(&mut headers, &encoded)?;
    if let Some(addr) = client {
        append_forwarded_for(&mut headers, addr.ip());
    }

    state
        .forwarder
        .forward(method, uri.path_and_query(), headers, Body::from(encoded.into_body()))
        .await
}

fn client_addr(request: &Request<Body>) -> Option<SocketAddr> {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr)
}
