//! Async adapter over a [`CaptureStream`].
//!
//! [`ChunkStream`] turns the pull protocol into a `futures_core::Stream`:
//! `Chunk` yields its bytes, `Empty` parks the task until the next write or
//! close, `End` finishes the stream.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures_core::Stream;

use crate::stream::{CaptureStream, Pull};

/// A type-erased stream of captured body bytes.
pub type ByteStream = Pin<Box<dyn Stream<Item = Bytes> + Send>>;

/// Yields the bytes of each captured chunk until the stream is closed and
/// drained.
///
/// Only one `ChunkStream` should drain a given capture stream; chunks are
/// removed as they are yielded.
pub struct ChunkStream {
    inner: Arc<CaptureStream>,
    done: bool,
}

impl ChunkStream {
    pub fn new(inner: Arc<CaptureStream>) -> Self {
        Self { inner, done: false }
    }

    pub fn boxed(self) -> ByteStream {
        Box::pin(self)
    }
}

impl Stream for ChunkStream {
    type Item = Bytes;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.done {
            return Poll::Ready(None);
        }
        match this.inner.next() {
            Pull::Chunk(chunk) => return Poll::Ready(Some(chunk.to_bytes())),
            Pull::End => {
                this.done = true;
                return Poll::Ready(None);
            }
            Pull::Empty => {}
        }

        this.inner.register_waker(cx.waker());
        // Re-check: a write may have landed before the waker was stored.
        match this.inner.next() {
            Pull::Chunk(chunk) => Poll::Ready(Some(chunk.to_bytes())),
            Pull::End => {
                this.done = true;
                Poll::Ready(None)
            }
            Pull::Empty => Poll::Pending,
        }
    }
}
