//! Response head recording plus a captured body.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::error::{CaptureError, Result};
use crate::stream::{CaptureStream, WriteObserver};
use crate::stream_adapter::ChunkStream;

/// Status and headers of a captured response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHead {
    pub status: u16,
    pub reason: String,
    pub headers: Vec<(String, String)>,
}

impl Default for ResponseHead {
    fn default() -> Self {
        Self {
            status: 200,
            reason: "OK".to_string(),
            headers: Vec::new(),
        }
    }
}

type CommitHook = Box<dyn FnOnce(&ResponseHead) + Send>;

#[derive(Default)]
struct State {
    head: ResponseHead,
    committed: bool,
    on_commit: Option<CommitHook>,
}

/// A response whose body lands in a [`CaptureStream`].
///
/// Status and headers may change until the response is committed. The first
/// body write commits implicitly; the commit hook, if any, runs exactly once
/// with the head as it stood at that point.
pub struct CaptureResponse {
    state: Mutex<State>,
    body: Arc<CaptureStream>,
}

impl CaptureResponse {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            body: Arc::new(CaptureStream::new()),
        }
    }

    pub fn with_observer(observer: impl WriteObserver + 'static) -> Self {
        Self {
            state: Mutex::new(State::default()),
            body: Arc::new(CaptureStream::with_observer(observer)),
        }
    }

    /// Run `hook` when the response commits. Runs immediately if it already has.
    pub fn on_commit(&self, hook: impl FnOnce(&ResponseHead) + Send + 'static) {
        let mut state = self.state.lock();
        if state.committed {
            let head = state.head.clone();
            drop(state);
            hook(&head);
            return;
        }
        state.on_commit = Some(Box::new(hook));
    }

    /// Returns `false` (and changes nothing) once committed.
    pub fn set_status(&self, status: u16, reason: impl Into<String>) -> bool {
        let mut state = self.state.lock();
        if state.committed {
            return false;
        }
        state.head.status = status;
        state.head.reason = reason.into();
        true
    }

    /// Append a header. Returns `false` once committed.
    pub fn add_header(&self, name: impl Into<String>, value: impl Into<String>) -> bool {
        let mut state = self.state.lock();
        if state.committed {
            return false;
        }
        state.head.headers.push((name.into(), value.into()));
        true
    }

    pub fn head(&self) -> ResponseHead {
        self.state.lock().head.clone()
    }

    pub fn is_committed(&self) -> bool {
        self.state.lock().committed
    }

    /// Freeze status and headers and fire the commit hook.
    pub fn commit(&self) {
        let mut state = self.state.lock();
        if state.committed {
            return;
        }
        state.committed = true;
        let hook = state.on_commit.take();
        let head = state.head.clone();
        drop(state);

        debug!(status = head.status, headers = head.headers.len(), "response committed");
        if let Some(hook) = hook {
            hook(&head);
        }
    }

    /// Write body bytes, committing first if needed.
    pub fn write(&self, data: &[u8]) -> Result<()> {
        if self.body.is_closed() {
            return Err(CaptureError::Closed);
        }
        self.commit();
        self.body.write(data)
    }

    /// Write text as UTF-8.
    pub fn write_text(&self, text: &str) -> Result<()> {
        self.write(text.as_bytes())
    }

    /// Commit if needed and close the body.
    pub fn finish(&self) {
        self.commit();
        self.body.close();
    }

    pub fn body(&self) -> &Arc<CaptureStream> {
        &self.body
    }

    /// Async view of the body. Drain it from a single consumer.
    pub fn body_stream(&self) -> ChunkStream {
        ChunkStream::new(self.body.clone())
    }
}

impl Default for CaptureResponse {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CaptureResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("CaptureResponse")
            .field("head", &state.head)
            .field("committed", &state.committed)
            .field("body", &self.body)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::Pull;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn head_is_mutable_until_commit() {
        let response = CaptureResponse::new();
        assert!(response.set_status(404, "Not Found"));
        assert!(response.add_header("Content-Type", "text/plain"));

        response.commit();
        assert!(!response.set_status(500, "Internal Server Error"));
        assert!(!response.add_header("X-Late", "1"));

        let head = response.head();
        assert_eq!(head.status, 404);
        assert_eq!(head.reason, "Not Found");
        assert_eq!(head.headers, vec![("Content-Type".into(), "text/plain".into())]);
    }

    #[test]
    fn first_write_commits_and_fires_hook_once() {
        let response = CaptureResponse::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        response.on_commit(move |head| {
            assert_eq!(head.status, 201);
            counter.fetch_add(1, Ordering::SeqCst);
        });
        response.set_status(201, "Created");

        response.write_text("héllo").unwrap();
        response.write(b" world").unwrap();
        response.finish();

        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(response.is_committed());

        let first = response.body().next().into_chunk().unwrap();
        assert_eq!(first.to_bytes().as_ref(), "héllo".as_bytes());
        assert_eq!(response.body().next().into_chunk().unwrap(), " world");
        assert_eq!(response.body().next(), Pull::End);
    }

    #[test]
    fn hook_registered_after_commit_runs_immediately() {
        let response = CaptureResponse::new();
        response.finish();

        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        response.on_commit(move |head| {
            assert_eq!(head.status, 200);
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn write_after_finish_fails() {
        let response = CaptureResponse::new();
        response.finish();
        assert!(matches!(response.write(b"x"), Err(CaptureError::Closed)));
    }
}
