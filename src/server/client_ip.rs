//! Uploader IP extraction
//!
//! Order of preference: first valid entry of `X-Forwarded-For`, then the
//! transport peer address, then the literal `unknown`.

use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;
use axum::http::HeaderMap;

pub const UNKNOWN_IP: &str = "unknown";

/// Uploader address as shown in captions. Extraction never fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub String);

impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        Ok(ClientIp(extract_client_ip(&parts.headers, peer.as_ref())))
    }
}

/// Extract the uploader IP from request headers with a socket fallback
///
/// # Arguments
/// * `headers` - HTTP request headers
/// * `socket_addr` - Direct peer address, if the server recorded one
pub fn extract_client_ip(headers: &HeaderMap, socket_addr: Option<&SocketAddr>) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .and_then(|candidate| candidate.parse::<IpAddr>().ok());

    if let Some(ip) = forwarded {
        return ip.to_string();
    }

    socket_addr
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_IP.to_string())
}
