//! Request handling and transformation.
//!
//! # Responsibilities
//! - Request ID generation and propagation (`x-request-id`)
//! - Strip hop-by-hop headers before forwarding
//! - Add `x-forwarded-for` for the client address
//! - Regenerate framing headers for a re-encoded multipart body
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - Only connection-scoped headers are touched; everything else is forwarded as-is

use std::net::IpAddr;

use axum::http::header::{self, HeaderMap, HeaderValue};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};

use crate::error::ProxyError;
use crate::form::EncodedForm;

pub const X_REQUEST_ID: &str = "x-request-id";

const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Headers that describe a single transport hop (RFC 9110 §7.6.1).
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-connection",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Layer assigning a UUID `x-request-id` to requests that lack one.
pub fn set_request_id_layer() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::x_request_id(MakeRequestUuid)
}

/// Layer copying `x-request-id` onto the response.
pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::x_request_id()
}

/// The request ID, or `"unknown"` when the layer did not run.
pub fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

/// Remove hop-by-hop headers, including any listed in `Connection`.
/// `Upgrade` is removed as well: upgrades are not proxied.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<String> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(|token| token.trim().to_ascii_lowercase())
        .filter(|token| !token.is_empty())
        .collect();
    for name in listed {
        headers.remove(name.as_str());
    }

    for name in HOP_BY_HOP {
        headers.remove(*name);
    }
}

/// Append the client address to `x-forwarded-for`.
pub fn append_forwarded_for(headers: &mut HeaderMap, client: IpAddr) {
    let value = match headers.get(X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
        Some(existing) if !existing.is_empty() => format!("{}, {}", existing, client),
        _ => client.to_string(),
    };
    if let Ok(value) = HeaderValue::from_str(&value) {
        headers.insert(X_FORWARDED_FOR, value);
    }
}

/// Replace body framing headers with the ones for `form`.
pub fn set_form_headers(headers: &mut HeaderMap, form: &EncodedForm) -> Result<(), ProxyError> {
    let content_type = HeaderValue::from_str(&form.content_type())
        .map_err(|e| ProxyError::Upstream(format!("invalid multipart content type: {}", e)))?;
    headers.insert(header::CONTENT_TYPE, content_type);
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(form.content_length()));
    headers.remove(header::TRANSFER_ENCODING);
    headers.remove(header::CONTENT_ENCODING);
    Ok(())
}
