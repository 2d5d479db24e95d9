//! One application call: `start_response` and `write`.

use std::sync::Arc;

use hearth_environ::EnvironmentMap;
use hearth_environ::codec;
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::error::{GatewayError, Result};
use crate::sink::ResponseSink;
use crate::status::Status;

/// Runs once, when the application first calls `start_response`. It may
/// already write body bytes through the call it is given.
pub type BeforeWrite = Box<dyn FnOnce(&GatewayCall) -> anyhow::Result<()> + Send>;

#[derive(Default)]
struct CallState {
    headers_set: Option<(Status, Vec<(String, String)>)>,
    headers_sent: bool,
    before_write: Option<BeforeWrite>,
}

/// Response-side state of one call.
///
/// Status and headers given to [`start_response`](Self::start_response) are
/// held back until the first [`write`](Self::write), so an application can
/// replace them (with an error) right up to its first body byte.
pub struct GatewayCall {
    environ: EnvironmentMap,
    sink: Arc<dyn ResponseSink>,
    state: Mutex<CallState>,
}

impl GatewayCall {
    pub fn new(environ: EnvironmentMap, sink: Arc<dyn ResponseSink>) -> Self {
        Self {
            environ,
            sink,
            state: Mutex::new(CallState::default()),
        }
    }

    /// Builder method: run `hook` on the first `start_response`.
    pub fn with_before_write(
        self,
        hook: impl FnOnce(&GatewayCall) -> anyhow::Result<()> + Send + 'static,
    ) -> Self {
        self.state.lock().before_write = Some(Box::new(hook));
        self
    }

    pub fn environ(&self) -> &EnvironmentMap {
        &self.environ
    }

    /// Record the status and headers to send.
    ///
    /// Calling it a second time is an error unless `exc_info` is given. With
    /// `exc_info`, the headers are replaced if nothing has been sent yet;
    /// otherwise the error is handed straight back as
    /// [`GatewayError::Application`].
    pub fn start_response(
        &self,
        status: &str,
        headers: Vec<(String, String)>,
        exc_info: Option<anyhow::Error>,
    ) -> Result<()> {
        let hook = {
            let mut state = self.state.lock();
            match exc_info {
                Some(err) if state.headers_sent => return Err(GatewayError::Application(err)),
                Some(err) => debug!(error = %err, "start_response replacing headers after error"),
                None if state.headers_set.is_some() => return Err(GatewayError::HeadersAlreadySet),
                None => {}
            }
            let status: Status = status.parse()?;
            trace!(status = %status, headers = headers.len(), "start_response");
            state.headers_set = Some((status, headers));
            state.before_write.take()
        };

        if let Some(hook) = hook {
            hook(self).map_err(GatewayError::Filter)?;
        }
        Ok(())
    }

    /// Send body bytes, emitting status and headers before the first write.
    ///
    /// An empty `data` only forces the head out.
    pub fn write(&self, data: &[u8]) -> Result<()> {
        {
            let mut state = self.state.lock();
            if !state.headers_sent {
                let (status, headers) = state
                    .headers_set
                    .as_ref()
                    .ok_or(GatewayError::WriteBeforeStart)?;
                let headers: Vec<(String, String)> = headers
                    .iter()
                    .map(|(name, value)| (name.clone(), codec::decode(value).into_owned()))
                    .collect();
                self.sink.send_head(status, &headers)?;
                debug!(status = %status, "response head sent");
                state.headers_sent = true;
            }
        }
        if !data.is_empty() {
            self.sink.send_body(data)?;
        }
        Ok(())
    }

    pub fn headers_sent(&self) -> bool {
        self.state.lock().headers_sent
    }

    /// The status recorded by `start_response`, if any.
    pub fn status(&self) -> Option<Status> {
        self.state.lock().headers_set.as_ref().map(|(s, _)| s.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hearth_capture::CaptureResponse;
    use hearth_core::config::GatewayFlags;
    use hearth_core::{EmptyInput, NullErrors};
    use hearth_environ::{HttpRequest, RequestBridge};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn call() -> (GatewayCall, Arc<CaptureResponse>) {
        let bridge = RequestBridge::new(
            Arc::new(HttpRequest::new("GET", "")),
            GatewayFlags::default(),
            Arc::new(NullErrors),
            Arc::new(EmptyInput),
        );
        let response = Arc::new(CaptureResponse::new());
        (GatewayCall::new(bridge.as_map(), response.clone()), response)
    }

    fn headers(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs.iter().map(|(n, v)| (n.to_string(), v.to_string())).collect()
    }

    #[test]
    fn write_before_start_fails() {
        let (call, _) = call();
        assert!(matches!(call.write(b"x"), Err(GatewayError::WriteBeforeStart)));
    }

    #[test]
    fn head_is_deferred_until_first_write() {
        let (call, response) = call();
        call.start_response("404 Not Found", headers(&[("Content-Type", "text/plain")]), None)
            .unwrap();
        assert!(!response.is_committed());
        assert_eq!(call.status(), Some(Status::new(404, "Not Found")));

        call.write(b"gone").unwrap();
        assert!(call.headers_sent());
        let head = response.head();
        assert_eq!(head.status, 404);
        assert_eq!(head.reason, "Not Found");
        assert_eq!(head.headers, headers(&[("Content-Type", "text/plain")]));
    }

    #[test]
    fn second_start_without_error_fails() {
        let (call, _) = call();
        call.start_response("200 OK", vec![], None).unwrap();
        assert!(matches!(
            call.start_response("500 Oops", vec![], None),
            Err(GatewayError::HeadersAlreadySet)
        ));
    }

    #[test]
    fn start_with_error_replaces_unsent_headers() {
        let (call, response) = call();
        call.start_response("200 OK", headers(&[("X-A", "1")]), None).unwrap();
        call.start_response(
            "500 Internal Server Error",
            headers(&[("X-B", "2")]),
            Some(anyhow::anyhow!("boom")),
        )
        .unwrap();
        call.write(b"").unwrap();

        let head = response.head();
        assert_eq!(head.status, 500);
        assert_eq!(head.headers, headers(&[("X-B", "2")]));
    }

    #[test]
    fn start_with_error_after_send_reraises() {
        let (call, _) = call();
        call.start_response("200 OK", vec![], None).unwrap();
        call.write(b"partial").unwrap();

        let err = call
            .start_response("500 Oops", vec![], Some(anyhow::anyhow!("late failure")))
            .unwrap_err();
        assert!(matches!(err, GatewayError::Application(_)));
        assert!(err.to_string().contains("late failure"));
    }

    #[test]
    fn invalid_status_is_rejected() {
        let (call, _) = call();
        assert!(matches!(
            call.start_response("OK", vec![], None),
            Err(GatewayError::InvalidStatus(_))
        ));
    }

    #[test]
    fn header_values_are_decoded_to_text() {
        let (call, response) = call();
        let encoded = codec::encode("naïve €").into_owned();
        call.start_response("200 OK", vec![("X-Name".into(), encoded)], None)
            .unwrap();
        call.write(b"").unwrap();
        assert_eq!(response.head().headers[0].1, "naïve €");
    }

    #[test]
    fn before_write_runs_once() {
        let (call, _) = call();
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = runs.clone();
        let call = call.with_before_write(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        call.start_response("200 OK", vec![], None).unwrap();
        call.start_response("200 OK", vec![], Some(anyhow::anyhow!("retry")))
            .unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn before_write_output_follows_the_head() {
        let (call, response) = call();
        let call = call.with_before_write(|call| {
            call.write(b"from hook")?;
            Ok(())
        });
        call.start_response("201 Created", vec![], None).unwrap();

        assert!(call.headers_sent());
        assert_eq!(response.head().status, 201);
        assert_eq!(response.body().next().into_chunk().unwrap(), "from hook");
    }

    #[test]
    fn before_write_failure_surfaces() {
        let (call, _) = call();
        let call = call.with_before_write(|_| anyhow::bail!("chain broke"));
        assert!(matches!(
            call.start_response("200 OK", vec![], None),
            Err(GatewayError::Filter(_))
        ));
    }
}
