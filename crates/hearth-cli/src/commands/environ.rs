//! `hearth environ`: show the environment built for a synthetic request.

use std::io::Cursor;
use std::sync::Arc;

use anyhow::{Context, bail};
use hearth_core::NullErrors;
use hearth_core::config::GatewayFlags;
use hearth_environ::{HttpRequest, RequestBridge, codec};
use hearth_gateway::InputStream;
use hearth_gateway::builtin::render_environ;
use serde_json::json;

/// Build a request from command-line pieces. Headers are `Name: value`.
pub fn build_request(
    method: &str,
    target: &str,
    script_name: &str,
    headers: &[String],
    body: Option<&str>,
) -> anyhow::Result<HttpRequest> {
    let mut request = HttpRequest::from_target(method, target, script_name)
        .with_remote("127.0.0.1", 0)
        .with_server("localhost", 80);
    for header in headers {
        let (name, value) = header
            .split_once(':')
            .with_context(|| format!("header must be `Name: value`, got {header:?}"))?;
        let name = name.trim();
        if name.is_empty() {
            bail!("header name is empty in {header:?}");
        }
        request = request.with_header(name, value.trim());
    }
    if let Some(body) = body {
        request = request.with_body(body.to_string());
    }
    Ok(request)
}

pub fn render(request: HttpRequest, format: &str) -> anyhow::Result<String> {
    let body = request.body().clone();
    let bridge = RequestBridge::new(
        Arc::new(request),
        GatewayFlags::default(),
        Arc::new(NullErrors),
        Arc::new(InputStream::new(Cursor::new(body))),
    );
    let map = bridge.as_map();

    match format {
        "json" => {
            let entries: Vec<_> = map
                .entries()
                .into_iter()
                .map(|(key, value)| {
                    let text = match value.as_str() {
                        Some(s) => codec::decode(s).into_owned(),
                        None => value.to_string(),
                    };
                    json!({ "key": key.as_str(), "kind": value.kind(), "value": text })
                })
                .collect();
            Ok(serde_json::to_string_pretty(&entries)?)
        }
        "text" => Ok(render_environ(&map).trim_end().to_string()),
        other => bail!("unknown format: {other} (expected text or json)"),
    }
}
