use std::borrow::Cow;

use bytes::Bytes;

use crate::header::HeaderMap;

/// Sentinel for an unknown content length.
pub const UNKNOWN_LENGTH: i64 = -1;

/// Sentinel for an unknown port.
pub const UNKNOWN_PORT: i32 = -1;

/// Getter-shaped view of an inbound request.
///
/// This is the shape the environment is computed from, and also the shape
/// [`RequestFacade`](crate::RequestFacade) presents back to collaborators, so
/// a facade can stand in anywhere a source is expected. String getters return
/// `None` when the value is not provided; integer getters use `-1`.
///
/// All getters are expected to be synchronous and cheap.
pub trait RequestSource: Send + Sync {
    fn method(&self) -> Option<Cow<'_, str>>;

    /// The mount point of the application (`SCRIPT_NAME`).
    fn script_name(&self) -> Option<Cow<'_, str>>;

    /// Path below the mount point, `None` when the request hits the mount itself.
    fn path_info(&self) -> Option<Cow<'_, str>>;

    fn query_string(&self) -> Option<Cow<'_, str>>;

    fn content_type(&self) -> Option<Cow<'_, str>>;

    /// Body length in bytes, or [`UNKNOWN_LENGTH`].
    fn content_length(&self) -> i64;

    fn remote_addr(&self) -> Option<Cow<'_, str>>;

    fn remote_host(&self) -> Option<Cow<'_, str>>;

    fn remote_port(&self) -> i32;

    fn server_name(&self) -> Option<Cow<'_, str>>;

    fn server_port(&self) -> i32;

    /// Protocol string, e.g. `HTTP/1.1`.
    fn protocol(&self) -> Option<Cow<'_, str>>;

    fn scheme(&self) -> Option<Cow<'_, str>>;

    /// Distinct header names in arrival order.
    fn header_names(&self) -> Vec<Cow<'_, str>>;

    /// All values of the named header (case-insensitive) in arrival order.
    /// `None` means the source cannot report headers for this name.
    fn headers(&self, name: &str) -> Option<Vec<Cow<'_, str>>>;
}

/// An in-memory request.
///
/// Used by the HTTP trigger after the inbound request has been read, and by
/// tests. `CONTENT_TYPE` and `CONTENT_LENGTH` fall back to the corresponding
/// headers when not set explicitly.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    method: String,
    script_name: String,
    path_info: Option<String>,
    query_string: Option<String>,
    content_type: Option<String>,
    content_length: Option<u64>,
    remote_addr: Option<String>,
    remote_host: Option<String>,
    remote_port: i32,
    server_name: Option<String>,
    server_port: i32,
    protocol: String,
    scheme: String,
    headers: HeaderMap,
    body: Bytes,
}

impl HttpRequest {
    /// Create a request for `method` against the application mounted at `script_name`.
    pub fn new(method: impl Into<String>, script_name: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            script_name: script_name.into(),
            path_info: None,
            query_string: None,
            content_type: None,
            content_length: None,
            remote_addr: None,
            remote_host: None,
            remote_port: UNKNOWN_PORT,
            server_name: None,
            server_port: UNKNOWN_PORT,
            protocol: "HTTP/1.1".to_string(),
            scheme: "http".to_string(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// Create a request from a request-target (`/app/users?page=1`), splitting
    /// it into path info and query string relative to `script_name`.
    pub fn from_target(
        method: impl Into<String>,
        target: &str,
        script_name: impl Into<String>,
    ) -> Self {
        let script_name = script_name.into();
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, Some(query.to_string())),
            None => (target, None),
        };
        let path_info = path.strip_prefix(script_name.as_str()).unwrap_or(path);
        let path_info = (!path_info.is_empty()).then(|| path_info.to_string());

        Self {
            path_info,
            query_string: query,
            ..Self::new(method, script_name)
        }
    }

    pub fn with_path_info(self, path_info: impl Into<String>) -> Self {
        Self {
            path_info: Some(path_info.into()),
            ..self
        }
    }

    pub fn with_query_string(self, query: impl Into<String>) -> Self {
        Self {
            query_string: Some(query.into()),
            ..self
        }
    }

    pub fn with_content_type(self, content_type: impl Into<String>) -> Self {
        Self {
            content_type: Some(content_type.into()),
            ..self
        }
    }

    pub fn with_remote(self, addr: impl Into<String>, port: u16) -> Self {
        Self {
            remote_addr: Some(addr.into()),
            remote_port: i32::from(port),
            ..self
        }
    }

    pub fn with_remote_host(self, host: impl Into<String>) -> Self {
        Self {
            remote_host: Some(host.into()),
            ..self
        }
    }

    pub fn with_server(self, name: impl Into<String>, port: u16) -> Self {
        Self {
            server_name: Some(name.into()),
            server_port: i32::from(port),
            ..self
        }
    }

    pub fn with_protocol(self, protocol: impl Into<String>) -> Self {
        Self {
            protocol: protocol.into(),
            ..self
        }
    }

    pub fn with_scheme(self, scheme: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            ..self
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_headers(self, headers: HeaderMap) -> Self {
        Self { headers, ..self }
    }

    /// Attach a body. The content length is set to the body size.
    pub fn with_body(self, body: impl Into<Bytes>) -> Self {
        let body = body.into();
        Self {
            content_length: Some(body.len() as u64),
            body,
            ..self
        }
    }

    pub fn http_headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Direct access to the body buffer.
    pub fn body(&self) -> &Bytes {
        &self.body
    }
}

impl RequestSource for HttpRequest {
    fn method(&self) -> Option<Cow<'_, str>> {
        Some(Cow::Borrowed(&self.method))
    }

    fn script_name(&self) -> Option<Cow<'_, str>> {
        Some(Cow::Borrowed(&self.script_name))
    }

    fn path_info(&self) -> Option<Cow<'_, str>> {
        self.path_info.as_deref().map(Cow::Borrowed)
    }

    fn query_string(&self) -> Option<Cow<'_, str>> {
        self.query_string.as_deref().map(Cow::Borrowed)
    }

    fn content_type(&self) -> Option<Cow<'_, str>> {
        self.content_type
            .as_deref()
            .or_else(|| self.headers.get("Content-Type"))
            .map(Cow::Borrowed)
    }

    fn content_length(&self) -> i64 {
        self.content_length
            .or_else(|| {
                self.headers
                    .get("Content-Length")
                    .and_then(|v| v.trim().parse().ok())
            })
            .and_then(|len| i64::try_from(len).ok())
            .unwrap_or(UNKNOWN_LENGTH)
    }

    fn remote_addr(&self) -> Option<Cow<'_, str>> {
        self.remote_addr.as_deref().map(Cow::Borrowed)
    }

    fn remote_host(&self) -> Option<Cow<'_, str>> {
        // Without reverse lookup the host is reported as the address.
        self.remote_host
            .as_deref()
            .or(self.remote_addr.as_deref())
            .map(Cow::Borrowed)
    }

    fn remote_port(&self) -> i32 {
        self.remote_port
    }

    fn server_name(&self) -> Option<Cow<'_, str>> {
        self.server_name.as_deref().map(Cow::Borrowed)
    }

    fn server_port(&self) -> i32 {
        self.server_port
    }

    fn protocol(&self) -> Option<Cow<'_, str>> {
        Some(Cow::Borrowed(&self.protocol))
    }

    fn scheme(&self) -> Option<Cow<'_, str>> {
        Some(Cow::Borrowed(&self.scheme))
    }

    fn header_names(&self) -> Vec<Cow<'_, str>> {
        self.headers.names().into_iter().map(Cow::Borrowed).collect()
    }

    fn headers(&self, name: &str) -> Option<Vec<Cow<'_, str>>> {
        Some(
            self.headers
                .get_all(name)
                .into_iter()
                .map(Cow::Borrowed)
                .collect(),
        )
    }
}
