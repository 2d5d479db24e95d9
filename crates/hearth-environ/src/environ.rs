//! Lazily computed, override-aware request environment.
//!
//! [`LazyEnvironment`] owns two pieces of shared state for one request:
//!
//! - the **cache**: key → value, filled on first read from the request and
//!   memoized thereafter, and
//! - the **override set**: keys an application has written, removed or
//!   cleared. Once a key is overridden the compute path never fills it again;
//!   only an explicit [`insert`](LazyEnvironment::insert) can give it a value.
//!
//! Both live in one store behind one lock, so a reader never sees override
//! membership without the matching value change (or the reverse). Computing
//! a value happens outside the lock: under a race the compute function may
//! run more than once, the first insert wins, and an override that lands in
//! between is never overwritten.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use hearth_core::config::GatewayFlags;
use hearth_core::{EnvKey, EnvValue, ErrorsHandle, InputHandle};
use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::catalog::{Field, KeyCatalog, Resolver};
use crate::codec;
use crate::request::{RequestSource, UNKNOWN_LENGTH};

/// Separator for repeated header values.
pub const HEADER_JOIN: &str = ";";

#[derive(Default)]
struct Store {
    values: HashMap<EnvKey, EnvValue>,
    overridden: HashSet<EnvKey>,
}

/// The environment of one request.
///
/// Created per request and dropped with it; nothing is shared across requests.
pub struct LazyEnvironment {
    source: Arc<dyn RequestSource>,
    catalog: KeyCatalog,
    flags: GatewayFlags,
    errors: ErrorsHandle,
    input: InputHandle,
    store: RwLock<Store>,
}

impl LazyEnvironment {
    /// Wrap a request. The key catalog is built here, once.
    pub fn new(source: Arc<dyn RequestSource>, errors: ErrorsHandle, input: InputHandle) -> Self {
        let catalog = KeyCatalog::build(source.as_ref());
        debug!(keys = catalog.len(), "environment catalog built");
        Self {
            source,
            catalog,
            flags: GatewayFlags::default(),
            errors,
            input,
            store: RwLock::new(Store::default()),
        }
    }

    /// Builder method: set the values of the fixed gateway slots.
    pub fn with_flags(self, flags: GatewayFlags) -> Self {
        Self { flags, ..self }
    }

    pub fn source(&self) -> &dyn RequestSource {
        self.source.as_ref()
    }

    pub fn catalog(&self) -> &KeyCatalog {
        &self.catalog
    }

    /// Look up a key, computing and caching it on first read.
    ///
    /// Returns `None` when the key is overridden without a value, when it is
    /// not catalogued, or when the request does not provide it.
    pub fn get(&self, key: &str) -> Option<EnvValue> {
        {
            let store = self.store.read();
            if let Some(value) = store.values.get(key) {
                return Some(value.clone());
            }
            if store.overridden.contains(key) {
                return None;
            }
        }

        let (key, resolver) = self.catalog.entry(key)?;
        let value = self.compute(resolver)?;

        let mut store = self.store.write();
        if store.overridden.contains(key) {
            // Overridden while we were computing.
            return store.values.get(key).cloned();
        }
        trace!(key = %key, "environment value loaded");
        Some(
            store
                .values
                .entry(key.clone())
                .or_insert(value)
                .clone(),
        )
    }

    /// Store a value, overriding the request for this key from now on.
    ///
    /// Returns the previously stored value without computing one.
    pub fn insert(&self, key: impl Into<EnvKey>, value: EnvValue) -> Option<EnvValue> {
        let key = key.into();
        debug!(key = %key, "environment key overridden");
        let mut store = self.store.write();
        store.overridden.insert(key.clone());
        store.values.insert(key, value)
    }

    /// Remove a key. Later reads return `None` until a new insert.
    pub fn remove(&self, key: &str) -> Option<EnvValue> {
        debug!(key, "environment key removed");
        let mut store = self.store.write();
        store.overridden.insert(EnvKey::from(key));
        store.values.remove(key)
    }

    /// Remove every key.
    ///
    /// All catalogued keys join the override set before the cache is emptied,
    /// so nothing computes back in.
    pub fn clear(&self) {
        let mut store = self.store.write();
        let Store { values, overridden } = &mut *store;
        overridden.extend(self.catalog.keys().cloned());
        overridden.extend(values.keys().cloned());
        values.clear();
        debug!(overridden = overridden.len(), "environment cleared");
    }

    /// Compute every catalogued key that is not overridden.
    ///
    /// Keys without a value are skipped.
    pub fn load_all(&self) {
        let mut absent = 0usize;
        for key in self.catalog.keys() {
            if self.is_overridden(key.as_str()) {
                continue;
            }
            if self.get(key.as_str()).is_none() {
                absent += 1;
            }
        }
        trace!(absent, "environment loaded");
    }

    pub fn is_overridden(&self, key: &str) -> bool {
        self.store.read().overridden.contains(key)
    }

    /// Keys an application has written, removed or cleared.
    pub fn overridden_keys(&self) -> Vec<EnvKey> {
        let mut keys: Vec<EnvKey> = self.store.read().overridden.iter().cloned().collect();
        keys.sort();
        keys
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Keys currently exposed, without computing any value.
    ///
    /// Catalogued keys come first in catalog order, minus removed ones,
    /// followed by application-added keys in sorted order. A catalogued key
    /// whose request field turns out to be missing (an unknown port, no
    /// remote address) is still listed, while [`entries`](Self::entries)
    /// leaves it out.
    pub fn keys(&self) -> Vec<EnvKey> {
        let store = self.store.read();
        let mut keys: Vec<EnvKey> = self
            .catalog
            .keys()
            .filter(|k| !store.overridden.contains(*k) || store.values.contains_key(*k))
            .cloned()
            .collect();
        let mut added: Vec<EnvKey> = store
            .values
            .keys()
            .filter(|k| !self.catalog.contains(k.as_str()))
            .cloned()
            .collect();
        added.sort();
        keys.extend(added);
        keys
    }

    /// Whether [`keys`](Self::keys) would list `key`, without computing it.
    pub fn lists_key(&self, key: &str) -> bool {
        let store = self.store.read();
        store.values.contains_key(key)
            || (self.catalog.contains(key) && !store.overridden.contains(key))
    }

    /// Every key with its value, computing whatever is missing.
    pub fn entries(&self) -> Vec<(EnvKey, EnvValue)> {
        self.load_all();
        let store = self.store.read();
        let mut entries: Vec<(EnvKey, EnvValue)> = self
            .catalog
            .keys()
            .filter_map(|k| store.values.get(k).map(|v| (k.clone(), v.clone())))
            .collect();
        let mut added: Vec<(EnvKey, EnvValue)> = store
            .values
            .iter()
            .filter(|(k, _)| !self.catalog.contains(k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        added.sort_by(|a, b| a.0.cmp(&b.0));
        entries.extend(added);
        entries
    }

    fn compute(&self, resolver: &Resolver) -> Option<EnvValue> {
        let src = self.source.as_ref();
        match resolver {
            Resolver::Field(field) => match field {
                Field::Version => Some(EnvValue::Version(self.flags.version.0, self.flags.version.1)),
                Field::Multithread => Some(EnvValue::Bool(self.flags.multithread)),
                Field::Multiprocess => Some(EnvValue::Bool(self.flags.multiprocess)),
                Field::RunOnce => Some(EnvValue::Bool(self.flags.run_once)),
                Field::Errors => Some(EnvValue::Errors(self.errors.clone())),
                Field::Input => Some(EnvValue::Input(self.input.clone())),
                Field::UrlScheme => text(src.scheme().as_deref()),
                Field::RequestMethod => text(src.method().as_deref()),
                Field::ScriptName => text(src.script_name().as_deref()),
                Field::PathInfo => Some(text_or_empty(src.path_info().as_deref())),
                Field::QueryString => Some(text_or_empty(src.query_string().as_deref())),
                Field::ContentType => Some(text_or_empty(src.content_type().as_deref())),
                Field::RemoteAddr => text(src.remote_addr().as_deref()),
                Field::RemoteHost => text(src.remote_host().as_deref()),
                Field::RemotePort => port(src.remote_port()),
                Field::ServerName => text(src.server_name().as_deref()),
                Field::ServerPort => port(src.server_port()),
                Field::ServerProtocol => text(src.protocol().as_deref()),
                Field::ContentLength => match src.content_length() {
                    UNKNOWN_LENGTH => None,
                    len if len < 0 => None,
                    len => Some(EnvValue::Str(codec::encode_int(len))),
                },
            },
            Resolver::Header(name) => {
                let values = src.headers(name)?;
                if values.is_empty() {
                    return None;
                }
                let joined = values
                    .iter()
                    .map(|v| codec::encode(v))
                    .collect::<Vec<_>>()
                    .join(HEADER_JOIN);
                Some(EnvValue::Str(joined))
            }
        }
    }
}

fn text(s: Option<&str>) -> Option<EnvValue> {
    s.map(|s| EnvValue::Str(codec::encode(s).into_owned()))
}

fn text_or_empty(s: Option<&str>) -> EnvValue {
    text(s).unwrap_or_else(|| EnvValue::Str(String::new()))
}

fn port(port: i32) -> Option<EnvValue> {
    (port >= 0).then(|| EnvValue::Str(codec::encode_int(i64::from(port))))
}
