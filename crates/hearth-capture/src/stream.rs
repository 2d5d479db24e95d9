//! Push-to-pull capture stream.
//!
//! Producers push byte ranges with [`CaptureStream::write`]; a single
//! consumer pulls them back one [`Chunk`] at a time with
//! [`CaptureStream::next`]. The pull side never blocks:
//!
//! | queue     | state  | `next()`       |
//! |-----------|--------|----------------|
//! | non-empty | any    | `Pull::Chunk`  |
//! | empty     | open   | `Pull::Empty`  |
//! | empty     | closed | `Pull::End`    |
//!
//! Closing is one-way and keeps queued chunks; they drain before `End`.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::Waker;

use crossbeam_queue::SegQueue;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, trace};

use crate::chunk::Chunk;
use crate::error::{BoxError, CaptureError, Result};

/// Result of one pull.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pull {
    Chunk(Chunk),
    /// Nothing queued yet; poll again.
    Empty,
    /// Closed and drained. Terminal.
    End,
}

impl Pull {
    pub fn into_chunk(self) -> Option<Chunk> {
        match self {
            Pull::Chunk(chunk) => Some(chunk),
            Pull::Empty | Pull::End => None,
        }
    }

    pub fn is_end(&self) -> bool {
        matches!(self, Pull::End)
    }
}

/// Called synchronously once per write with the chunk just enqueued.
pub trait WriteObserver: Send + Sync {
    fn on_write(&self, chunk: &Chunk) -> std::result::Result<(), BoxError>;
}

impl<F> WriteObserver for F
where
    F: Fn(&Chunk) -> std::result::Result<(), BoxError> + Send + Sync,
{
    fn on_write(&self, chunk: &Chunk) -> std::result::Result<(), BoxError> {
        self(chunk)
    }
}

/// Write-readiness listener.
pub trait WriteListener: Send + Sync {
    fn on_write_possible(&self) -> std::result::Result<(), BoxError>;

    /// Receives the error returned by [`on_write_possible`](Self::on_write_possible).
    fn on_error(&self, _err: &BoxError) {}
}

impl<F> WriteListener for F
where
    F: Fn() -> std::result::Result<(), BoxError> + Send + Sync,
{
    fn on_write_possible(&self) -> std::result::Result<(), BoxError> {
        self()
    }
}

/// An unbounded, thread-safe chunk queue with an open/closed state.
///
/// Writers check the state and enqueue under a shared guard; `close` flips
/// it under the exclusive guard. Once `close` returns no enqueue is in
/// flight, so `End` is final.
#[derive(Default)]
pub struct CaptureStream {
    queue: SegQueue<Chunk>,
    closed: RwLock<bool>,
    bytes_written: AtomicU64,
    observer: RwLock<Option<Arc<dyn WriteObserver>>>,
    waker: Mutex<Option<Waker>>,
}

impl CaptureStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a stream with an observer already registered.
    pub fn with_observer(observer: impl WriteObserver + 'static) -> Self {
        let stream = Self::new();
        stream.set_observer(observer);
        stream
    }

    /// Replace the write observer.
    pub fn set_observer(&self, observer: impl WriteObserver + 'static) {
        *self.observer.write() = Some(Arc::new(observer));
    }

    pub fn clear_observer(&self) {
        *self.observer.write() = None;
    }

    /// Enqueue `data` as one chunk, then notify the observer.
    ///
    /// Fails with [`CaptureError::Closed`] once the stream is closed, in which
    /// case nothing is enqueued. An observer failure is returned as
    /// [`CaptureError::Observer`]; the chunk stays enqueued.
    pub fn write(&self, data: &[u8]) -> Result<()> {
        if self.is_closed() {
            return Err(CaptureError::Closed);
        }

        let chunk = Chunk::from_bytes(data);
        {
            let closed = self.closed.read();
            if *closed {
                return Err(CaptureError::Closed);
            }
            self.queue.push(chunk.clone());
        }
        self.bytes_written
            .fetch_add(data.len() as u64, Ordering::Relaxed);
        trace!(len = data.len(), queued = self.queue.len(), "chunk captured");
        self.wake();

        // Clone out so the observer runs without holding the lock.
        let observer = self.observer.read().clone();
        if let Some(observer) = observer {
            observer.on_write(&chunk).map_err(CaptureError::Observer)?;
        }
        Ok(())
    }

    pub fn write_byte(&self, byte: u8) -> Result<()> {
        self.write(&[byte])
    }

    /// Pop the oldest chunk, or report why there is none.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&self) -> Pull {
        if let Some(chunk) = self.queue.pop() {
            return Pull::Chunk(chunk);
        }
        if !self.is_closed() {
            return Pull::Empty;
        }
        // A write that landed just before close is still delivered.
        match self.queue.pop() {
            Some(chunk) => Pull::Chunk(chunk),
            None => Pull::End,
        }
    }

    /// Close the stream. Idempotent; queued chunks remain pullable.
    pub fn close(&self) {
        let was_closed = std::mem::replace(&mut *self.closed.write(), true);
        if !was_closed {
            debug!(
                queued = self.queue.len(),
                bytes = self.bytes_written.load(Ordering::Relaxed),
                "capture stream closed"
            );
            self.wake();
        }
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.read()
    }

    /// Always true: the queue is unbounded.
    pub fn is_ready(&self) -> bool {
        true
    }

    /// Register a readiness listener. It is notified immediately, since the
    /// stream is always ready. A listener error is handed back to the
    /// listener's `on_error` and not raised.
    pub fn set_write_listener(&self, listener: impl WriteListener) {
        if let Err(err) = listener.on_write_possible() {
            debug!(error = %err, "write listener failed");
            listener.on_error(&err);
        }
    }

    /// Chunks queued and not yet pulled.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Total bytes accepted since creation.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written.load(Ordering::Relaxed)
    }

    /// Store the waker to be woken by the next write or close.
    pub(crate) fn register_waker(&self, waker: &Waker) {
        let mut slot = self.waker.lock();
        match slot.as_ref() {
            Some(existing) if existing.will_wake(waker) => {}
            _ => *slot = Some(waker.clone()),
        }
    }

    fn wake(&self) {
        if let Some(waker) = self.waker.lock().take() {
            waker.wake();
        }
    }
}

impl std::fmt::Debug for CaptureStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureStream")
            .field("queued", &self.queue.len())
            .field("closed", &self.is_closed())
            .field("bytes_written", &self.bytes_written())
            .finish()
    }
}

impl io::Write for &CaptureStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        CaptureStream::write(*self, buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl io::Write for CaptureStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::Write::write(&mut &*self, buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
