//! Request-shaped view of an environment.

use std::borrow::Cow;
use std::sync::Arc;

use hearth_core::EnvValue;

use crate::catalog::{Field, header_key, header_name_for_key};
use crate::codec;
use crate::environ::LazyEnvironment;
use crate::request::RequestSource;

/// The environment presented back through the request getters.
///
/// For a key the application never touched, each getter goes straight to the
/// underlying request. Once a key is overridden the getter reads the
/// environment instead and decodes the value to its native form: `None` for
/// a missing string, `-1` for a missing integer. A caller cannot tell a field
/// the request never had from one the application removed.
#[derive(Clone)]
pub struct RequestFacade {
    env: Arc<LazyEnvironment>,
}

impl RequestFacade {
    pub fn new(env: Arc<LazyEnvironment>) -> Self {
        Self { env }
    }

    pub fn environment(&self) -> &Arc<LazyEnvironment> {
        &self.env
    }

    fn text<'a>(
        &'a self,
        field: Field,
        read: impl FnOnce(&'a dyn RequestSource) -> Option<Cow<'a, str>>,
    ) -> Option<Cow<'a, str>> {
        if !self.env.is_overridden(field.key()) {
            return read(self.env.source());
        }
        self.intercept(field.key()).map(Cow::Owned)
    }

    fn int(&self, field: Field, read: impl FnOnce(&dyn RequestSource) -> i64) -> i64 {
        if !self.env.is_overridden(field.key()) {
            return read(self.env.source());
        }
        self.intercept(field.key())
            .and_then(|s| codec::decode_int(&s))
            .unwrap_or(-1)
    }

    fn intercept(&self, key: &str) -> Option<String> {
        match self.env.get(key)? {
            EnvValue::None => None,
            EnvValue::Str(s) => Some(codec::decode(&s).into_owned()),
            other => Some(other.to_string()),
        }
    }
}

impl RequestSource for RequestFacade {
    fn method(&self) -> Option<Cow<'_, str>> {
        self.text(Field::RequestMethod, |s| s.method())
    }

    fn script_name(&self) -> Option<Cow<'_, str>> {
        self.text(Field::ScriptName, |s| s.script_name())
    }

    fn path_info(&self) -> Option<Cow<'_, str>> {
        self.text(Field::PathInfo, |s| s.path_info())
    }

    fn query_string(&self) -> Option<Cow<'_, str>> {
        self.text(Field::QueryString, |s| s.query_string())
    }

    fn content_type(&self) -> Option<Cow<'_, str>> {
        self.text(Field::ContentType, |s| s.content_type())
    }

    fn content_length(&self) -> i64 {
        self.int(Field::ContentLength, |s| s.content_length())
    }

    fn remote_addr(&self) -> Option<Cow<'_, str>> {
        self.text(Field::RemoteAddr, |s| s.remote_addr())
    }

    fn remote_host(&self) -> Option<Cow<'_, str>> {
        self.text(Field::RemoteHost, |s| s.remote_host())
    }

    fn remote_port(&self) -> i32 {
        let port = self.int(Field::RemotePort, |s| i64::from(s.remote_port()));
        i32::try_from(port).unwrap_or(-1)
    }

    fn server_name(&self) -> Option<Cow<'_, str>> {
        self.text(Field::ServerName, |s| s.server_name())
    }

    fn server_port(&self) -> i32 {
        let port = self.int(Field::ServerPort, |s| i64::from(s.server_port()));
        i32::try_from(port).unwrap_or(-1)
    }

    fn protocol(&self) -> Option<Cow<'_, str>> {
        self.text(Field::ServerProtocol, |s| s.protocol())
    }

    fn scheme(&self) -> Option<Cow<'_, str>> {
        self.text(Field::UrlScheme, |s| s.scheme())
    }

    /// Request header names minus removed ones, followed by names derived
    /// from header keys the application added.
    fn header_names(&self) -> Vec<Cow<'_, str>> {
        let mut names: Vec<Cow<'_, str>> = self
            .env
            .source()
            .header_names()
            .into_iter()
            .filter(|name| {
                let key = header_key(name);
                !self.env.is_overridden(key.as_str()) || self.env.get(key.as_str()).is_some()
            })
            .collect();

        for key in self.env.overridden_keys() {
            if self.env.catalog().contains(key.as_str()) || self.env.get(key.as_str()).is_none() {
                continue;
            }
            if let Some(name) = header_name_for_key(key.as_str()) {
                names.push(Cow::Owned(name));
            }
        }
        names
    }

    /// An overridden header reads back as a single (already joined) value.
    fn headers(&self, name: &str) -> Option<Vec<Cow<'_, str>>> {
        let key = header_key(name);
        if !self.env.is_overridden(key.as_str()) {
            return self.env.source().headers(name);
        }
        Some(
            self.intercept(key.as_str())
                .map(|v| vec![Cow::Owned(v)])
                .unwrap_or_default(),
        )
    }
}
