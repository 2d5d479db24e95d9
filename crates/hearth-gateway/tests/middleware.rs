//! Applications composed from middleware, run in servlet and filter mode.

use std::sync::{Arc, Mutex};

use bytes::Bytes;
use hearth_capture::{CaptureResponse, Pull};
use hearth_core::config::GatewayFlags;
use hearth_core::{EmptyInput, EnvValue};
use hearth_environ::{EnvironmentMap, HttpRequest, RequestFacade, RequestSource};
use hearth_gateway::{Application, Gateway, GatewayCall, ResponseBody, body};

/// Rewrites the response head and uppercases every body chunk.
struct Shouting<A> {
    inner: A,
}

impl<A: Application> Application for Shouting<A> {
    fn call(&self, environ: &EnvironmentMap, call: &GatewayCall) -> anyhow::Result<ResponseBody> {
        // Mark the request so downstream links can see the edit.
        environ.insert("HTTP_X_SHOUTED", "yes");
        environ.remove("HTTP_COOKIE");

        let inner = self.inner.call(environ, call)?;
        Ok(Box::new(inner.map(|chunk| {
            chunk.map(|data| Bytes::from(data.to_ascii_uppercase()))
        })))
    }
}

fn greeting(_: &EnvironmentMap, call: &GatewayCall) -> anyhow::Result<ResponseBody> {
    call.start_response(
        "203 Cannot say I know",
        vec![("Content-type".into(), "text/foobar".into())],
        None,
    )?;
    Ok(body::chunks(["hello, ", "world\n"]))
}

fn gateway() -> Gateway {
    Gateway::new(
        "test.shouting",
        Arc::new(Shouting { inner: greeting }),
        GatewayFlags::default(),
    )
}

fn request() -> Arc<HttpRequest> {
    Arc::new(
        HttpRequest::new("GET", "/app")
            .with_path_info("/greet")
            .with_header("Cookie", "secret")
            .with_header("Accept", "text/plain"),
    )
}

fn drain(response: &CaptureResponse) -> String {
    let mut out = String::new();
    loop {
        match response.body().next() {
            Pull::Chunk(chunk) => out.push_str(chunk.as_str()),
            Pull::Empty | Pull::End => return out,
        }
    }
}

#[test]
fn servlet_mode_applies_middleware() {
    let response = Arc::new(CaptureResponse::new());
    gateway()
        .serve(request(), Arc::new(EmptyInput), response.clone())
        .unwrap();

    let head = response.head();
    assert_eq!(head.status, 203);
    assert_eq!(head.reason, "Cannot say I know");
    assert_eq!(
        head.headers,
        vec![("Content-type".to_string(), "text/foobar".to_string())]
    );
    assert_eq!(drain(&response), "HELLO, WORLD\n");
}

#[test]
fn filter_mode_hands_edited_request_downstream() {
    let response = Arc::new(CaptureResponse::new());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let record = seen.clone();

    let chain = move |req: &RequestFacade, call: &GatewayCall| -> anyhow::Result<()> {
        let names: Vec<String> = req.header_names().into_iter().map(|n| n.into_owned()).collect();
        *record.lock().unwrap() = names;
        assert_eq!(req.path_info().as_deref(), Some("/greet"));

        // The downstream environment is the same one the filter edited.
        let environ = EnvironmentMap::new(req.environment().clone());
        assert_eq!(environ.get("HTTP_X_SHOUTED"), Some(EnvValue::from("yes")));

        call.write(b"hi, ")?;
        call.write(b"there!\n")?;
        Ok(())
    };

    gateway()
        .filter(request(), Arc::new(EmptyInput), response.clone(), Arc::new(chain))
        .unwrap();

    assert_eq!(response.head().status, 203);
    assert_eq!(drain(&response), "hi, there!\nHELLO, WORLD\n");
    assert_eq!(*seen.lock().unwrap(), vec!["Accept", "X-Shouted"]);
}

#[test]
fn filter_chain_failure_is_reported() {
    let response = Arc::new(CaptureResponse::new());
    let chain = |_: &RequestFacade, _: &GatewayCall| -> anyhow::Result<()> {
        anyhow::bail!("downstream unavailable")
    };

    let err = gateway()
        .filter(request(), Arc::new(EmptyInput), response, Arc::new(chain))
        .unwrap_err();
    assert!(err.to_string().contains("downstream unavailable"));
}
