use tracing::{debug, warn};

use crate::app::Application;
use crate::call::GatewayCall;
use crate::error::{GatewayError, Result};

/// Run `app` to completion against `call`.
///
/// Non-empty body chunks are written in order; empty ones are skipped so the
/// head waits for real output. If the body produced nothing, the head is sent
/// anyway. The body is dropped on every path, including errors.
pub fn run(app: &dyn Application, call: &GatewayCall) -> Result<()> {
    let body = app
        .call(call.environ(), call)
        .map_err(GatewayError::Application)?;

    let mut chunks = 0usize;
    let mut bytes = 0usize;
    for item in body {
        let data = item.map_err(|err| {
            warn!(error = %err, "application body failed");
            GatewayError::Application(err)
        })?;
        if data.is_empty() {
            continue;
        }
        call.write(&data)?;
        chunks += 1;
        bytes += data.len();
    }
    if !call.headers_sent() {
        call.write(&[])?;
    }
    debug!(chunks, bytes, "application call finished");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{ResponseBody, body};
    use bytes::Bytes;
    use hearth_capture::{CaptureResponse, Pull};
    use hearth_core::config::GatewayFlags;
    use hearth_core::{EmptyInput, NullErrors};
    use hearth_environ::{EnvironmentMap, HttpRequest, RequestBridge};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

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

    fn drain(response: &CaptureResponse) -> Vec<String> {
        let mut out = Vec::new();
        while let Pull::Chunk(chunk) = response.body().next() {
            out.push(chunk.to_string());
        }
        out
    }

    /// Sets a flag when dropped, standing in for a body's close.
    struct Tracked {
        items: std::vec::IntoIter<anyhow::Result<Bytes>>,
        closed: Arc<AtomicBool>,
    }

    impl Iterator for Tracked {
        type Item = anyhow::Result<Bytes>;

        fn next(&mut self) -> Option<Self::Item> {
            self.items.next()
        }
    }

    impl Drop for Tracked {
        fn drop(&mut self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }

    #[test]
    fn empty_chunks_are_skipped() {
        let (call, response) = call();
        let app = |_: &EnvironmentMap, call: &GatewayCall| -> anyhow::Result<ResponseBody> {
            call.start_response("200 OK", vec![], None)?;
            Ok(body::chunks(["", "a", "", "b"]))
        };
        run(&app, &call).unwrap();
        assert_eq!(drain(&response), vec!["a", "b"]);
    }

    #[test]
    fn head_is_sent_for_empty_body() {
        let (call, response) = call();
        let app = |_: &EnvironmentMap, call: &GatewayCall| -> anyhow::Result<ResponseBody> {
            call.start_response("204 No Content", vec![], None)?;
            Ok(body::empty())
        };
        run(&app, &call).unwrap();
        assert!(response.is_committed());
        assert_eq!(response.head().status, 204);
    }

    #[test]
    fn missing_start_response_is_an_error() {
        let (call, _) = call();
        let app = |_: &EnvironmentMap, _: &GatewayCall| -> anyhow::Result<ResponseBody> {
            Ok(body::once("orphan"))
        };
        assert!(matches!(run(&app, &call), Err(GatewayError::WriteBeforeStart)));
    }

    #[test]
    fn body_is_closed_on_success_and_failure() {
        for fail in [false, true] {
            let (call, _) = call();
            let closed = Arc::new(AtomicBool::new(false));
            let flag = closed.clone();
            let app = move |_: &EnvironmentMap, call: &GatewayCall| -> anyhow::Result<ResponseBody> {
                call.start_response("200 OK", vec![], None)?;
                let mut items = vec![Ok(Bytes::from("one"))];
                if fail {
                    items.push(Err(anyhow::anyhow!("generator failed")));
                }
                items.push(Ok(Bytes::from("two")));
                Ok(Box::new(Tracked {
                    items: items.into_iter(),
                    closed: flag.clone(),
                }))
            };

            let result = run(&app, &call);
            assert_eq!(result.is_err(), fail);
            assert!(closed.load(Ordering::SeqCst), "body not closed (fail = {fail})");
        }
    }

    #[test]
    fn application_error_is_wrapped() {
        let (call, _) = call();
        let app = |_: &EnvironmentMap, _: &GatewayCall| -> anyhow::Result<ResponseBody> {
            anyhow::bail!("refused")
        };
        assert!(matches!(run(&app, &call), Err(GatewayError::Application(_))));
    }
}
