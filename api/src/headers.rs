//! Header and path helpers shared by the gate middleware and the downstream
//! authorization helper.

use std::borrow::Cow;

use axum::http::{HeaderMap, HeaderValue, Uri};

pub const AUTH_TOKEN: &str = "x-auth-token";
pub const STORAGE_TOKEN: &str = "x-storage-token";
pub const CONTAINER_SYNC_KEY: &str = "x-container-sync-key";
pub const TIMESTAMP: &str = "x-timestamp";
pub const CLUSTER_CLIENT_IP: &str = "x-cluster-client-ip";
pub const FORWARDED_FOR: &str = "x-forwarded-for";

/// A header value as text. Missing and non-UTF-8 values are both `None`.
pub fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// The bearer token, preferring `X-Auth-Token` over `X-Storage-Token`.
///
/// `X-Storage-Token` is only consulted when `X-Auth-Token` is absent; an
/// unreadable `X-Auth-Token` yields no token.
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    let name = if headers.contains_key(AUTH_TOKEN) {
        AUTH_TOKEN
    } else {
        STORAGE_TOKEN
    };
    header_str(headers, name).map(str::to_string)
}

/// Copies `X-Storage-Token` into `X-Auth-Token` when only the former was
/// sent, so downstream code reads a single header.
pub fn canonicalize_token(headers: &mut HeaderMap) {
    if headers.contains_key(AUTH_TOKEN) {
        return;
    }
    if let Some(value) = headers.get(STORAGE_TOKEN).cloned() {
        headers.insert(AUTH_TOKEN, value);
    }
}

/// Client address reported by a load balancer: `X-Cluster-Client-IP`, else
/// the first hop of `X-Forwarded-For`.
pub fn forwarded_client(headers: &HeaderMap) -> Option<String> {
    if let Some(ip) = header_str(headers, CLUSTER_CLIENT_IP).filter(|ip| !ip.is_empty()) {
        return Some(ip.to_string());
    }
    header_str(headers, FORWARDED_FOR)
        .and_then(|list| list.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(str::to_string)
}

/// Percent-decodes the request path. A path that does not decode to UTF-8 is
/// kept verbatim.
pub fn decoded_path(uri: &Uri) -> String {
    let raw = uri.path();
    urlencoding::decode(raw)
        .map(Cow::into_owned)
        .unwrap_or_else(|_| raw.to_string())
}

pub(crate) fn location(url: &str) -> Option<HeaderValue> {
    HeaderValue::from_str(url).ok()
}
