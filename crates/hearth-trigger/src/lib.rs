//! hearth-trigger: HTTP trigger for Hearth.
//!
//! Bridges inbound HTTP requests to a mounted application. Each request is
//! read in full, turned into an [`HttpRequest`](hearth_environ::HttpRequest),
//! and served on a blocking thread against a
//! [`CaptureResponse`](hearth_capture::CaptureResponse) whose body is drained
//! back into the HTTP response.
//!
//! # Architecture
//!
//! ```text
//! HTTP client
//!   │
//!   ▼
//! hyper server
//!   │
//!   ├── Convert hyper::Request → HttpRequest (+ body as wsgi.input)
//!   ├── Gateway::serve on a blocking thread → CaptureResponse
//!   ├── Drain the capture stream, convert the head → hyper::Response
//!   │
//!   ▼
//! HTTP response
//! ```

pub mod convert;
pub mod handler;

pub use convert::{ConnInfo, Mount};
pub use handler::{HandlerOptions, HttpTrigger, RequestHandler, gateway_handler};
