//! Pass-through of all other traffic to the homeserver.

use crate::api::AppState;
use crate::error::GatewayError;
use axum::{
    body::{Body, Bytes},
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::Response,
};
use futures::StreamExt;
use reqwest::{redirect::Policy, Client};
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, warn};

/// Headers that describe a single connection and are not forwarded.
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Forwards requests to the homeserver unchanged.
#[derive(Clone)]
pub struct Passthrough {
    client: Client,
    base_url: String,
}

impl Passthrough {
    /// Create a pass-through client for `base_url`.
    ///
    /// Only connecting is bounded; long-polling requests may take as long as they need.
    pub fn new(base_url: impl Into<String>, connect_timeout: Duration) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .redirect(Policy::none())
            .build()
            .map_err(|e| GatewayError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        let base_url: String = base_url.into();
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Send `request` to the homeserver and stream back its response.
    pub async fn forward(
        &self,
        request: Request,
        client_addr: Option<SocketAddr>,
    ) -> Result<Response, GatewayError> {
        let (parts, body) = request.into_parts();

        let path = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        let url = format!("{}{}", self.base_url, path);

        let method = reqwest::Method::from_bytes(parts.method.as_str().as_bytes())
            .map_err(|e| GatewayError::Internal(format!("Unsupported method: {}", e)))?;

        let mut headers = to_reqwest_headers(&parts.headers);
        if let Some(addr) = client_addr {
            append_forwarded_for(&mut headers, addr);
        }

        debug!(%method, path = %parts.uri.path(), "Forwarding to homeserver");

        let mut upstream = self.client.request(method, url).headers(headers);
        if has_body(&parts.headers) {
            upstream = upstream.body(reqwest::Body::wrap_stream(body_stream(body)));
        }

        let upstream = upstream.send().await.map_err(|e| {
            warn!(error = %e, path = %parts.uri.path(), "Failed to forward request");
            GatewayError::from(e)
        })?;

        let status = StatusCode::from_u16(upstream.status().as_u16())
            .map_err(|e| GatewayError::Internal(format!("Invalid upstream status: {}", e)))?;
        let headers = from_reqwest_headers(upstream.headers());

        let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        Ok(response)
    }
}

/// Router fallback: forward the request to the homeserver.
pub async fn forward(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: Request,
) -> Result<Response, GatewayError> {
    state
        .passthrough
        .forward(request, connect_info.map(|ConnectInfo(addr)| addr))
        .await
}

fn is_hop_by_hop(name: &str) -> bool {
    HOP_BY_HOP.iter().any(|h| name.eq_ignore_ascii_case(h))
}

/// Whether an inbound request carries a body worth streaming.
fn has_body(headers: &HeaderMap) -> bool {
    if headers.contains_key(header::TRANSFER_ENCODING) {
        return true;
    }
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .is_some_and(|len| len > 0)
}

fn to_reqwest_headers(headers: &HeaderMap) -> reqwest::header::HeaderMap {
    let mut out = reqwest::header::HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        if is_hop_by_hop(name.as_str()) {
            continue;
        }
        if let (Ok(name), Ok(value)) = (
            reqwest::header::HeaderName::from_bytes(name.as_str().as_bytes()),
            reqwest::header::HeaderValue::from_bytes(value.as_bytes()),
        ) {
            out.append(name, value);
        }
    }
    out
}

fn from_reqwest_headers(headers: &reqwest::header::HeaderMap) -> HeaderMap {
    let mut out = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        if is_hop_by_hop(name.as_str()) {
            continue;
        }
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_str().as_bytes()),
            HeaderValue::from_bytes(value.as_bytes()),
        ) {
            out.append(name, value);
        }
    }
    out
}

/// Append the client IP to any `X-Forwarded-For` chain already present.
fn append_forwarded_for(headers: &mut reqwest::header::HeaderMap, addr: SocketAddr) {
    let ip = addr.ip().to_string();
    let chain = match headers.get(X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
        Some(prior) if !prior.is_empty() => format!("{}, {}", prior, ip),
        _ => ip,
    };

    if let Ok(value) = reqwest::header::HeaderValue::from_str(&chain) {
        headers.insert(X_FORWARDED_FOR, value);
    }
}

/// Relay the inbound body through a channel so the outbound client gets a `Sync` stream.
fn body_stream(body: Body) -> ReceiverStream<Result<Bytes, io::Error>> {
    let (tx, rx) = mpsc::channel(8);

    tokio::spawn(async move {
        let mut stream = body.into_data_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(io::Error::other);
            let failed = chunk.is_err();
            if tx.send(chunk).await.is_err() || failed {
                break;
            }
        }
    });

    ReceiverStream::new(rx)
}
