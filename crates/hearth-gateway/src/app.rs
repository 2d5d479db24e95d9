//! Applications and the registry that names them.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use hearth_environ::EnvironmentMap;

use crate::call::GatewayCall;
use crate::error::{GatewayError, Result};

/// The body an application returns: an iterator of byte chunks.
///
/// Dropping it closes it, whether or not it was exhausted.
pub type ResponseBody = Box<dyn Iterator<Item = anyhow::Result<Bytes>> + Send>;

/// A mounted application.
///
/// Called once per request with the environment and the call it must answer
/// through (`start_response`, optionally `write`), returning the body.
pub trait Application: Send + Sync {
    fn call(&self, environ: &EnvironmentMap, call: &GatewayCall) -> anyhow::Result<ResponseBody>;
}

impl<F> Application for F
where
    F: Fn(&EnvironmentMap, &GatewayCall) -> anyhow::Result<ResponseBody> + Send + Sync,
{
    fn call(&self, environ: &EnvironmentMap, call: &GatewayCall) -> anyhow::Result<ResponseBody> {
        self(environ, call)
    }
}

/// Constructors for [`ResponseBody`].
pub mod body {
    use bytes::Bytes;

    use super::ResponseBody;

    pub fn empty() -> ResponseBody {
        Box::new(std::iter::empty())
    }

    pub fn once(data: impl Into<Bytes>) -> ResponseBody {
        Box::new(std::iter::once(Ok(data.into())))
    }

    pub fn chunks<I>(chunks: I) -> ResponseBody
    where
        I: IntoIterator,
        I::Item: Into<Bytes>,
        I::IntoIter: Send + 'static,
    {
        Box::new(chunks.into_iter().map(|c| Ok(c.into())))
    }
}

/// Applications by handler name.
#[derive(Clone, Default)]
pub struct AppRegistry {
    apps: HashMap<String, Arc<dyn Application>>,
}

impl AppRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry pre-loaded with the built-in applications.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        crate::builtin::register_all(&mut registry);
        registry
    }

    pub fn register(&mut self, name: impl Into<String>, app: impl Application + 'static) {
        self.apps.insert(name.into(), Arc::new(app));
    }

    /// Look up a handler. Names are dotted paths with at least two
    /// non-empty segments, e.g. `hearth.hello`.
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Application>> {
        let parts: Vec<&str> = name.split('.').collect();
        if parts.len() < 2 || parts.iter().any(|p| p.is_empty()) {
            return Err(GatewayError::InvalidHandler(name.to_string()));
        }
        self.apps
            .get(name)
            .cloned()
            .ok_or_else(|| GatewayError::UnknownHandler(name.to_string()))
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.apps.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
