//! The set of keys an environment can expose.
//!
//! A [`KeyCatalog`] is built once per request. It lists the fixed gateway and
//! protocol keys followed by one derived key per distinct header name, and
//! resolves every listed key to the [`Resolver`] that computes its value.

use std::collections::HashMap;

use hearth_core::EnvKey;
use tracing::debug;

use crate::request::{RequestSource, UNKNOWN_LENGTH};

/// Prefix of header-derived keys.
pub const HEADER_PREFIX: &str = "HTTP_";

pub const WSGI_VERSION: &str = "wsgi.version";
pub const WSGI_MULTITHREAD: &str = "wsgi.multithread";
pub const WSGI_MULTIPROCESS: &str = "wsgi.multiprocess";
pub const WSGI_RUN_ONCE: &str = "wsgi.run_once";
pub const WSGI_ERRORS: &str = "wsgi.errors";
pub const WSGI_INPUT: &str = "wsgi.input";
pub const WSGI_URL_SCHEME: &str = "wsgi.url_scheme";
pub const REQUEST_METHOD: &str = "REQUEST_METHOD";
pub const SCRIPT_NAME: &str = "SCRIPT_NAME";
pub const PATH_INFO: &str = "PATH_INFO";
pub const QUERY_STRING: &str = "QUERY_STRING";
pub const CONTENT_TYPE: &str = "CONTENT_TYPE";
pub const CONTENT_LENGTH: &str = "CONTENT_LENGTH";
pub const REMOTE_ADDR: &str = "REMOTE_ADDR";
pub const REMOTE_HOST: &str = "REMOTE_HOST";
pub const REMOTE_PORT: &str = "REMOTE_PORT";
pub const SERVER_NAME: &str = "SERVER_NAME";
pub const SERVER_PORT: &str = "SERVER_PORT";
pub const SERVER_PROTOCOL: &str = "SERVER_PROTOCOL";

/// A fixed environment field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Version,
    Multithread,
    Multiprocess,
    RunOnce,
    Errors,
    Input,
    UrlScheme,
    RequestMethod,
    ScriptName,
    PathInfo,
    QueryString,
    ContentType,
    RemoteAddr,
    RemoteHost,
    RemotePort,
    ServerName,
    ServerPort,
    ServerProtocol,
    ContentLength,
}

impl Field {
    /// Every fixed field, in catalog order.
    pub const ALL: [Field; 19] = [
        Field::Version,
        Field::Multithread,
        Field::Multiprocess,
        Field::RunOnce,
        Field::Errors,
        Field::Input,
        Field::UrlScheme,
        Field::RequestMethod,
        Field::ScriptName,
        Field::PathInfo,
        Field::QueryString,
        Field::ContentType,
        Field::RemoteAddr,
        Field::RemoteHost,
        Field::RemotePort,
        Field::ServerName,
        Field::ServerPort,
        Field::ServerProtocol,
        Field::ContentLength,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Field::Version => WSGI_VERSION,
            Field::Multithread => WSGI_MULTITHREAD,
            Field::Multiprocess => WSGI_MULTIPROCESS,
            Field::RunOnce => WSGI_RUN_ONCE,
            Field::Errors => WSGI_ERRORS,
            Field::Input => WSGI_INPUT,
            Field::UrlScheme => WSGI_URL_SCHEME,
            Field::RequestMethod => REQUEST_METHOD,
            Field::ScriptName => SCRIPT_NAME,
            Field::PathInfo => PATH_INFO,
            Field::QueryString => QUERY_STRING,
            Field::ContentType => CONTENT_TYPE,
            Field::RemoteAddr => REMOTE_ADDR,
            Field::RemoteHost => REMOTE_HOST,
            Field::RemotePort => REMOTE_PORT,
            Field::ServerName => SERVER_NAME,
            Field::ServerPort => SERVER_PORT,
            Field::ServerProtocol => SERVER_PROTOCOL,
            Field::ContentLength => CONTENT_LENGTH,
        }
    }

    pub fn from_key(key: &str) -> Option<Field> {
        Field::ALL.into_iter().find(|f| f.key() == key)
    }
}

/// How the value of a catalogued key is computed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolver {
    Field(Field),
    /// Join the values of the named request header.
    Header(String),
}

/// Derive the environment key for a header name.
///
/// `X-Foo-Bar`, `x-foo-bar` and `X_Foo_Bar` all map to `HTTP_X_FOO_BAR`.
pub fn header_key(name: &str) -> EnvKey {
    let mut key = String::with_capacity(HEADER_PREFIX.len() + name.len());
    key.push_str(HEADER_PREFIX);
    key.extend(name.chars().map(|c| match c {
        '-' => '_',
        c => c.to_ascii_uppercase(),
    }));
    EnvKey::from(key)
}

/// Synthesize a header name from a derived key: `HTTP_X_TRACE_ID` → `X-Trace-Id`.
pub fn header_name_for_key(key: &str) -> Option<String> {
    let rest = key.strip_prefix(HEADER_PREFIX)?;
    if rest.is_empty() {
        return None;
    }
    let name = rest
        .split('_')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                None => String::new(),
                Some(c) => c.to_ascii_uppercase().to_string() + &chars.as_str().to_ascii_lowercase(),
            }
        })
        .collect::<Vec<String>>()
        .join("-");
    Some(name)
}

/// Immutable key set for one request.
#[derive(Debug, Clone)]
pub struct KeyCatalog {
    entries: Vec<(EnvKey, Resolver)>,
    index: HashMap<EnvKey, usize>,
}

impl KeyCatalog {
    /// Build the catalog from a request.
    ///
    /// `CONTENT_LENGTH` is listed only when the request reports a length.
    /// When two header names derive the same key, the key keeps the position
    /// of its first sighting and resolves to the last-seen name. Header keys
    /// all carry the `HTTP_` prefix, so they never coincide with a fixed key.
    pub fn build(source: &dyn RequestSource) -> Self {
        let mut catalog = Self {
            entries: Vec::with_capacity(Field::ALL.len()),
            index: HashMap::new(),
        };

        for field in Field::ALL {
            if field == Field::ContentLength && source.content_length() == UNKNOWN_LENGTH {
                continue;
            }
            catalog.push(EnvKey::from(field.key()), Resolver::Field(field));
        }

        for name in source.header_names() {
            let key = header_key(&name);
            match catalog.index.get(&key) {
                Some(&i) => {
                    debug!(header = %name, key = %key, "header key already catalogued; last name wins");
                    catalog.entries[i].1 = Resolver::Header(name.into_owned());
                }
                None => catalog.push(key, Resolver::Header(name.into_owned())),
            }
        }

        catalog
    }

    fn push(&mut self, key: EnvKey, resolver: Resolver) {
        self.index.insert(key.clone(), self.entries.len());
        self.entries.push((key, resolver));
    }

    /// The catalogued key and its resolver.
    pub fn entry(&self, key: &str) -> Option<(&EnvKey, &Resolver)> {
        self.index
            .get(key)
            .map(|&i| (&self.entries[i].0, &self.entries[i].1))
    }

    pub fn resolve(&self, key: &str) -> Option<&Resolver> {
        self.entry(key).map(|(_, r)| r)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// The original header name a derived key resolves to.
    pub fn header_name(&self, key: &str) -> Option<&str> {
        match self.resolve(key)? {
            Resolver::Header(name) => Some(name),
            Resolver::Field(_) => None,
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &EnvKey> {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
