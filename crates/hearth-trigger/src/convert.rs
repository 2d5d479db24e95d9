//! Conversions between hyper/http types and the gateway's request and
//! response types.

use std::net::SocketAddr;

use bytes::Bytes;
use hearth_environ::codec;
use hearth_environ::{HeaderMap as EnvHeaderMap, HttpRequest};
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode, Uri, Version};

/// Addresses of one accepted connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnInfo {
    pub peer: SocketAddr,
    pub local: SocketAddr,
}

/// Where the application is mounted and how it is reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mount {
    pub script_name: String,
    pub scheme: String,
}

/// Convert a status code from u16.
pub fn status_from_u16(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

/// Convert headers from a list of (name, value) tuples, skipping invalid ones.
pub fn headers_from_tuples(tuples: &[(String, String)]) -> HeaderMap {
    let mut map = HeaderMap::new();
    for (name, value) in tuples {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                map.append(name, value);
            }
            _ => tracing::warn!(header = %name, "dropping invalid response header"),
        }
    }
    map
}

/// Copy request headers in native form: UTF-8 values are decoded, anything
/// else is read byte-for-byte.
pub fn headers_to_env(headers: &HeaderMap) -> EnvHeaderMap {
    headers
        .iter()
        .map(|(name, value)| {
            let raw = codec::widen(value.as_bytes());
            (canonical_name(name.as_str()), codec::decode(&raw).into_owned())
        })
        .collect()
}

/// Extract the path and query from a URI.
pub fn uri_path_and_query(uri: &Uri) -> String {
    uri.path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string())
}

pub fn protocol_string(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "HTTP/0.9",
        Version::HTTP_10 => "HTTP/1.0",
        Version::HTTP_2 => "HTTP/2.0",
        Version::HTTP_3 => "HTTP/3.0",
        _ => "HTTP/1.1",
    }
}

/// Decode `%XX` escapes. Invalid escapes are kept literally. The result is
/// read as UTF-8 when possible, otherwise one char per byte.
pub fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(hi), Some(lo)) = (hex(bytes[i + 1]), hex(bytes[i + 2])) {
                out.push(hi << 4 | lo);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8(out).unwrap_or_else(|e| codec::widen(e.as_bytes()))
}

fn hex(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// `content-type` → `Content-Type`. hyper lowercases header names.
fn canonical_name(name: &str) -> String {
    name.split('-')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(c) => c.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}

/// Build the gateway's view of an inbound request.
pub fn to_http_request(
    parts: &http::request::Parts,
    body: Bytes,
    conn: ConnInfo,
    mount: &Mount,
) -> HttpRequest {
    let target = uri_path_and_query(&parts.uri);
    let (path, query) = match target.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (target.as_str(), None),
    };
    let path = percent_decode(path);
    let path_info = path
        .strip_prefix(mount.script_name.as_str())
        .unwrap_or(&path)
        .to_string();

    let headers = headers_to_env(&parts.headers);
    let server_name = headers
        .get("Host")
        .map(|host| host.rsplit_once(':').map_or(host, |(name, _)| name).to_string())
        .unwrap_or_else(|| conn.local.ip().to_string());

    let mut request = HttpRequest::new(parts.method.as_str(), mount.script_name.clone())
        .with_remote(conn.peer.ip().to_string(), conn.peer.port())
        .with_server(server_name, conn.local.port())
        .with_protocol(protocol_string(parts.version))
        .with_scheme(mount.scheme.clone())
        .with_headers(headers);
    if !path_info.is_empty() {
        request = request.with_path_info(path_info);
    }
    if let Some(query) = query {
        request = request.with_query_string(query);
    }
    if !body.is_empty() {
        request = request.with_body(body);
    }
    request
}
