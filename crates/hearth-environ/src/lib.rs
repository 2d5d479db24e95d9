//! Lazy, override-aware request environment.
//!
//! A [`RequestBridge`] wraps one inbound request and hands out two views of
//! the same state:
//!
//! - [`EnvironmentMap`]: a key-value mapping an application reads and writes
//!   (`REQUEST_METHOD`, `PATH_INFO`, `HTTP_*`, `wsgi.*`, ...), and
//! - [`RequestFacade`]: the request getters, for collaborators further down a
//!   filter chain that expect the original request shape.
//!
//! # Laziness
//!
//! Nothing is computed when the bridge is created except the
//! [`KeyCatalog`]. Each value is computed from the request on first read and
//! memoized. Enumerating keys computes nothing; enumerating entries computes
//! everything.
//!
//! # Overrides
//!
//! Writing, removing or clearing a key through the mapping overrides the
//! request for that key permanently. Later reads through either view observe
//! the override, never the request.
//!
//! ```text
//! RequestSource ──► KeyCatalog
//!       │                │
//!       ▼                ▼
//!   LazyEnvironment (cache + override set)
//!       │                │
//!       ▼                ▼
//! EnvironmentMap    RequestFacade
//! ```

pub mod bridge;
pub mod catalog;
pub mod codec;
pub mod environ;
pub mod facade;
mod header;
pub mod mapping;
pub mod request;

pub use bridge::RequestBridge;
pub use catalog::{Field, KeyCatalog, Resolver};
pub use environ::LazyEnvironment;
pub use facade::RequestFacade;
pub use header::{Header, HeaderMap};
pub use mapping::{EnvironmentMap, KeySet};
pub use request::{HttpRequest, RequestSource, UNKNOWN_LENGTH, UNKNOWN_PORT};
