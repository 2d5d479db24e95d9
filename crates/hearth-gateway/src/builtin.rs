//! Built-in applications, mountable by name.

use hearth_core::EnvValue;
use hearth_environ::EnvironmentMap;
use hearth_environ::codec;

use crate::app::{AppRegistry, ResponseBody, body};
use crate::call::GatewayCall;

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

pub const HELLO: &str = "hearth.hello";
pub const ENVIRON: &str = "hearth.environ";
pub const ECHO: &str = "hearth.echo";

pub(crate) fn register_all(registry: &mut AppRegistry) {
    registry.register(HELLO, hello);
    registry.register(ENVIRON, environ);
    registry.register(ECHO, echo);
}

/// Greets the caller with the request path.
pub fn hello(environ: &EnvironmentMap, call: &GatewayCall) -> anyhow::Result<ResponseBody> {
    let path = environ.get_str("PATH_INFO").unwrap_or_default();
    call.start_response(
        "200 OK",
        vec![("Content-Type".into(), TEXT_PLAIN.into())],
        None,
    )?;
    let path = if path.is_empty() {
        "/".to_string()
    } else {
        codec::decode(&path).into_owned()
    };
    Ok(body::once(format!("Hello from hearth at {path}\n")))
}

/// Lists the environment, one `KEY=value` per line.
pub fn environ(environ: &EnvironmentMap, call: &GatewayCall) -> anyhow::Result<ResponseBody> {
    call.start_response(
        "200 OK",
        vec![("Content-Type".into(), TEXT_PLAIN.into())],
        None,
    )?;
    Ok(body::once(render_environ(environ)))
}

/// Returns the request body with the request's content type.
pub fn echo(environ: &EnvironmentMap, call: &GatewayCall) -> anyhow::Result<ResponseBody> {
    let input = match environ.get("wsgi.input") {
        Some(EnvValue::Input(input)) => input,
        _ => anyhow::bail!("wsgi.input is not available"),
    };
    let data = input.read(None)?;
    let content_type = environ
        .get_str("CONTENT_TYPE")
        .filter(|ct| !ct.is_empty())
        .unwrap_or_else(|| "application/octet-stream".to_string());

    call.start_response(
        "200 OK",
        vec![
            ("Content-Type".into(), content_type),
            ("Content-Length".into(), data.len().to_string()),
        ],
        None,
    )?;
    Ok(body::once(data))
}

/// Text rendering of an environment: entries in listing order, text values
/// decoded, other values by their display form.
pub fn render_environ(environ: &EnvironmentMap) -> String {
    let mut out = String::new();
    for (key, value) in environ.entries() {
        let value = match &value {
            EnvValue::Str(s) => codec::decode(s).into_owned(),
            other => other.to_string(),
        };
        out.push_str(key.as_str());
        out.push('=');
        out.push_str(&value);
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::run;
    use bytes::Bytes;
    use hearth_capture::{CaptureResponse, Pull};
    use hearth_core::config::GatewayFlags;
    use hearth_core::NullErrors;
    use hearth_environ::{HttpRequest, RequestBridge};
    use std::io::Cursor;
    use std::sync::Arc;

    use crate::input::InputStream;

    type AppFn = fn(&EnvironmentMap, &GatewayCall) -> anyhow::Result<ResponseBody>;

    fn serve(req: HttpRequest, app: AppFn) -> (Arc<CaptureResponse>, Vec<u8>) {
        let body = req.body().clone();
        let bridge = RequestBridge::new(
            Arc::new(req),
            GatewayFlags::default(),
            Arc::new(NullErrors),
            Arc::new(InputStream::new(Cursor::new(body))),
        );
        let response = Arc::new(CaptureResponse::new());
        let call = GatewayCall::new(bridge.as_map(), response.clone());
        run(&app, &call).unwrap();

        let mut out = Vec::new();
        while let Pull::Chunk(chunk) = response.body().next() {
            out.extend_from_slice(&chunk.to_bytes());
        }
        (response, out)
    }

    #[test]
    fn hello_mentions_path() {
        let (response, body) = serve(HttpRequest::new("GET", "/app").with_path_info("/x"), hello);
        assert_eq!(response.head().status, 200);
        assert_eq!(body, b"Hello from hearth at /x\n");
    }

    #[test]
    fn environ_lists_keys() {
        let (_, body) = serve(
            HttpRequest::new("GET", "/app").with_header("X-Trace", "t1"),
            environ,
        );
        let text = String::from_utf8(body).unwrap();
        assert!(text.starts_with("wsgi.version=(1, 0)\n"));
        assert!(text.contains("REQUEST_METHOD=GET\n"));
        assert!(text.contains("HTTP_X_TRACE=t1\n"));
        assert!(text.contains("wsgi.errors=<errors>\n"));
    }

    #[test]
    fn echo_returns_the_body() {
        let req = HttpRequest::new("POST", "")
            .with_content_type("application/json")
            .with_body(Bytes::from_static(br#"{"a":1}"#));
        let (response, body) = serve(req, echo);

        assert_eq!(body, br#"{"a":1}"#);
        let head = response.head();
        assert!(head.headers.contains(&("Content-Type".into(), "application/json".into())));
        assert!(head.headers.contains(&("Content-Length".into(), "7".into())));
    }
}
