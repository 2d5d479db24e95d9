//! Push-to-pull capture of response bodies.
//!
//! A [`CaptureStream`] accepts byte writes from any number of producer
//! threads and hands them back to a single consumer as [`Chunk`]s through a
//! non-blocking pull ([`Pull::Chunk`], [`Pull::Empty`], [`Pull::End`]).
//! [`ChunkStream`] adapts the same queue to an async `Stream`, and
//! [`CaptureResponse`] pairs a stream with a status line and headers.

pub mod chunk;
pub mod error;
pub mod response;
pub mod stream;
pub mod stream_adapter;

pub use chunk::Chunk;
pub use error::{BoxError, CaptureError, Result};
pub use response::{CaptureResponse, ResponseHead};
pub use stream::{CaptureStream, Pull, WriteListener, WriteObserver};
pub use stream_adapter::{ByteStream, ChunkStream};
