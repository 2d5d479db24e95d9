//! HTTP trigger handler.
//!
//! `HttpTrigger` manages a hyper HTTP server that forwards requests to a
//! mounted application through the gateway.

use std::io::Cursor;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;
use hearth_capture::CaptureResponse;
use hearth_core::HearthConfig;
use hearth_gateway::{Gateway, InputStream};
use http_body_util::{BodyExt, Full, Limited};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::convert::{self, ConnInfo, Mount};

/// Callback type for handling HTTP requests.
pub type RequestHandler = Arc<dyn Fn(Request<Incoming>, ConnInfo) -> BoxFuture + Send + Sync>;

type BoxFuture = std::pin::Pin<
    Box<dyn std::future::Future<Output = anyhow::Result<Response<Full<Bytes>>>> + Send>,
>;

/// HTTP trigger server.
///
/// Binds to a TCP port and forwards incoming HTTP requests to a
/// handler callback.
pub struct HttpTrigger {
    bind_addr: SocketAddr,
    handler: RequestHandler,
}

impl HttpTrigger {
    /// Create a new HTTP trigger bound to the given address.
    pub fn new(bind_addr: SocketAddr, handler: RequestHandler) -> Self {
        Self { bind_addr, handler }
    }

    /// Start the HTTP server.
    ///
    /// This runs until the shutdown signal is received. Spawns a
    /// tokio task per connection using HTTP/1.1.
    pub async fn serve(self, shutdown: tokio::sync::watch::Receiver<bool>) -> anyhow::Result<()> {
        let listener = TcpListener::bind(self.bind_addr)
            .await
            .context("failed to bind HTTP trigger")?;
        self.serve_listener(listener, shutdown).await
    }

    /// Serve on an already bound listener.
    pub async fn serve_listener(
        self,
        listener: TcpListener,
        mut shutdown: tokio::sync::watch::Receiver<bool>,
    ) -> anyhow::Result<()> {
        let local = listener.local_addr().context("listener has no local address")?;
        info!(addr = %local, "HTTP trigger listening");

        loop {
            tokio::select! {
                accept_result = listener.accept() => {
                    let (stream, peer_addr) = accept_result.context("accept failed")?;
                    let handler = self.handler.clone();
                    let conn = ConnInfo { peer: peer_addr, local };

                    tokio::spawn(async move {
                        let io = TokioIo::new(stream);
                        let svc = service_fn(move |req: Request<Incoming>| {
                            let handler = handler.clone();
                            async move {
                                match handler(req, conn).await {
                                    Ok(resp) => Ok::<_, hyper::Error>(resp),
                                    Err(e) => {
                                        error!(%peer_addr, error = %e, "request handler failed");
                                        Ok(plain(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error"))
                                    }
                                }
                            }
                        });

                        if let Err(e) = http1::Builder::new()
                            .serve_connection(io, svc)
                            .await
                        {
                            error!(%peer_addr, error = %e, "connection error");
                        }
                    });
                }
                _ = shutdown.changed() => {
                    info!("HTTP trigger shutting down");
                    break;
                }
            }
        }

        Ok(())
    }
}

/// Per-request settings of a gateway handler.
#[derive(Debug, Clone)]
pub struct HandlerOptions {
    pub mount: Mount,
    /// Cap on both the request body read and the response body collected.
    pub max_body_bytes: usize,
}

impl HandlerOptions {
    pub fn from_config(config: &HearthConfig) -> Self {
        Self {
            mount: Mount {
                script_name: config.script_name().to_string(),
                scheme: config.scheme().to_string(),
            },
            max_body_bytes: config.max_body_bytes(),
        }
    }
}

/// Route every request to `gateway`.
pub fn gateway_handler(gateway: Gateway, options: HandlerOptions) -> RequestHandler {
    let gateway = Arc::new(gateway);
    let options = Arc::new(options);
    Arc::new(move |req: Request<Incoming>, conn: ConnInfo| {
        let gateway = gateway.clone();
        let options = options.clone();
        Box::pin(async move { handle(gateway, options, req, conn).await })
    })
}

/// Closes the response body even if the application panics, so the
/// draining side always finishes.
struct FinishOnDrop(Arc<CaptureResponse>);

impl Drop for FinishOnDrop {
    fn drop(&mut self) {
        self.0.finish();
    }
}

async fn handle(
    gateway: Arc<Gateway>,
    options: Arc<HandlerOptions>,
    req: Request<Incoming>,
    conn: ConnInfo,
) -> anyhow::Result<Response<Full<Bytes>>> {
    let (parts, body) = req.into_parts();
    let body = match Limited::new(body, options.max_body_bytes).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(err) if err.downcast_ref::<http_body_util::LengthLimitError>().is_some() => {
            warn!(limit = options.max_body_bytes, "request body too large");
            return Ok(plain(StatusCode::PAYLOAD_TOO_LARGE, "Payload Too Large"));
        }
        Err(err) => return Err(anyhow::anyhow!(err).context("failed to read request body")),
    };

    let request = convert::to_http_request(&parts, body.clone(), conn, &options.mount);
    debug!(method = %parts.method, uri = %parts.uri, "dispatching request");

    let response = Arc::new(CaptureResponse::new());
    let task = {
        let response = response.clone();
        tokio::task::spawn_blocking(move || {
            let _finish = FinishOnDrop(response.clone());
            let input = Arc::new(InputStream::new(Cursor::new(body)));
            let result = gateway.serve(Arc::new(request), input, response.clone());
            (result, response.is_committed())
        })
    };

    let mut chunks = response.body_stream();
    let mut collected = BytesMut::new();
    let mut overflow = false;
    while let Some(chunk) = chunks.next().await {
        if collected.len() + chunk.len() > options.max_body_bytes {
            overflow = true;
            response.body().close();
            break;
        }
        collected.extend_from_slice(&chunk);
    }

    let (result, committed) = task.await.context("application task panicked")?;
    if overflow {
        error!(limit = options.max_body_bytes, "response body too large");
        return Ok(plain(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error"));
    }
    if let Err(err) = result {
        if !committed {
            return Err(anyhow::Error::new(err).context("application failed before responding"));
        }
        // The head is out; send what was produced.
        error!(error = %err, "application failed mid-response");
    }

    let head = response.head();
    let status = convert::status_from_u16(head.status);
    let mut builder = Response::builder().status(status);
    if let Some(headers) = builder.headers_mut() {
        *headers = convert::headers_from_tuples(&head.headers);
    }
    if status.canonical_reason() != Some(head.reason.as_str()) && !head.reason.is_empty() {
        if let Ok(reason) = hyper::ext::ReasonPhrase::try_from(head.reason.clone()) {
            builder = builder.extension(reason);
        }
    }
    Ok(builder.body(Full::new(collected.freeze()))?)
}

fn plain(status: StatusCode, text: &'static str) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from_static(text.as_bytes())));
    *response.status_mut() = status;
    response.headers_mut().insert(
        http::header::CONTENT_TYPE,
        http::HeaderValue::from_static("text/plain"),
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use hearth_core::config::GatewayFlags;
    use hearth_gateway::AppRegistry;

    fn handler() -> RequestHandler {
        let registry = AppRegistry::with_builtins();
        let app = registry.resolve("hearth.hello").unwrap();
        let gateway = Gateway::new("hearth.hello", app, GatewayFlags::default());
        gateway_handler(gateway, HandlerOptions::from_config(&HearthConfig::default()))
    }

    #[test]
    fn http_trigger_creation() {
        let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
        let trigger = HttpTrigger::new(addr, handler());
        assert_eq!(trigger.bind_addr, addr);
    }

    #[test]
    fn options_follow_config_defaults() {
        let options = HandlerOptions::from_config(&HearthConfig::default());
        assert_eq!(options.mount.script_name, "");
        assert_eq!(options.mount.scheme, "http");
        assert_eq!(options.max_body_bytes, hearth_core::config::DEFAULT_MAX_BODY_BYTES);
    }

    #[test]
    fn plain_responses() {
        let response = plain(StatusCode::PAYLOAD_TOO_LARGE, "too big");
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(response.headers()[http::header::CONTENT_TYPE], "text/plain");
    }

    #[tokio::test]
    async fn http_trigger_serves_and_shuts_down() {
        let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
        let trigger = HttpTrigger::new(addr, handler());

        let (tx, rx) = tokio::sync::watch::channel(false);

        let server = tokio::spawn(async move {
            trigger.serve(rx).await
        });

        // Give it a moment to bind.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        // Signal shutdown.
        tx.send(true).unwrap();

        let result = server.await.unwrap();
        assert!(result.is_ok());
    }
}
