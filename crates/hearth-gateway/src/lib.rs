//! Application gateway for Hearth.
//!
//! Drives one application call per request: the application receives the
//! request environment and a [`GatewayCall`], answers through
//! `start_response`/`write`, and returns an iterator of body chunks that
//! [`driver::run`] forwards to a [`ResponseSink`].
//!
//! [`Gateway::serve`] runs an application as the endpoint (servlet mode);
//! [`Gateway::filter`] runs it in front of a [`FilterChain`], handing the
//! chain a [`RequestFacade`](hearth_environ::RequestFacade) that reflects the
//! application's edits to the environment.

pub mod app;
pub mod builtin;
pub mod call;
pub mod driver;
pub mod error;
pub mod errors;
pub mod filter;
pub mod input;
pub mod servlet;
pub mod sink;
pub mod status;

pub use app::{AppRegistry, Application, ResponseBody, body};
pub use call::GatewayCall;
pub use error::{GatewayError, Result};
pub use errors::ErrorLog;
pub use filter::FilterChain;
pub use input::InputStream;
pub use servlet::Gateway;
pub use sink::ResponseSink;
pub use status::Status;
