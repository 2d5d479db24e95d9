//! Servlet mode: the application answers the request itself.

use std::sync::Arc;

use hearth_core::config::GatewayFlags;
use hearth_core::{HearthConfig, InputHandle};
use hearth_environ::{RequestBridge, RequestSource};
use tracing::{debug, info_span};

use crate::app::{AppRegistry, Application};
use crate::call::GatewayCall;
use crate::driver;
use crate::error::{GatewayError, Result};
use crate::errors::ErrorLog;
use crate::sink::ResponseSink;

/// A mounted application plus the gateway settings it runs under.
#[derive(Clone)]
pub struct Gateway {
    handler: String,
    app: Arc<dyn Application>,
    flags: GatewayFlags,
}

impl Gateway {
    pub fn new(handler: impl Into<String>, app: Arc<dyn Application>, flags: GatewayFlags) -> Self {
        Self {
            handler: handler.into(),
            app,
            flags,
        }
    }

    /// Mount the handler named in `config`.
    pub fn from_config(config: &HearthConfig, registry: &AppRegistry) -> Result<Self> {
        let handler = config.handler().ok_or(GatewayError::NoHandler)?;
        let app = registry.resolve(handler)?;
        Ok(Self::new(handler, app, config.gateway_flags()))
    }

    pub fn handler(&self) -> &str {
        &self.handler
    }

    pub fn flags(&self) -> GatewayFlags {
        self.flags
    }

    pub(crate) fn app_ref(&self) -> &dyn Application {
        self.app.as_ref()
    }

    /// Bridge a request into a fresh environment for this gateway.
    pub fn bridge(&self, request: Arc<dyn RequestSource>, input: InputHandle) -> RequestBridge {
        RequestBridge::new(
            request,
            self.flags,
            Arc::new(ErrorLog::new(self.handler.clone())),
            input,
        )
    }

    /// Run the application for one request, sending its response to `sink`.
    pub fn serve(
        &self,
        request: Arc<dyn RequestSource>,
        input: InputHandle,
        sink: Arc<dyn ResponseSink>,
    ) -> Result<()> {
        let bridge = self.bridge(request, input);
        let span = info_span!("serve", handler = %self.handler);
        let _guard = span.enter();
        debug!("servlet call");
        let call = GatewayCall::new(bridge.as_map(), sink);
        driver::run(self.app_ref(), &call)
    }
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("handler", &self.handler)
            .field("flags", &self.flags)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hearth_capture::CaptureResponse;
    use hearth_core::EmptyInput;
    use hearth_environ::HttpRequest;

    fn config(handler: Option<&str>) -> HearthConfig {
        let mut config = HearthConfig::default();
        config.gateway.handler = handler.map(str::to_string);
        config
    }

    #[test]
    fn from_config_resolves_handler() {
        let registry = AppRegistry::with_builtins();
        let gateway = Gateway::from_config(&config(Some("hearth.hello")), &registry).unwrap();
        assert_eq!(gateway.handler(), "hearth.hello");
        assert!(gateway.flags().multithread);
    }

    #[test]
    fn from_config_requires_handler() {
        let registry = AppRegistry::with_builtins();
        assert!(matches!(
            Gateway::from_config(&config(None), &registry),
            Err(GatewayError::NoHandler)
        ));
        assert!(matches!(
            Gateway::from_config(&config(Some("hearth.nope")), &registry),
            Err(GatewayError::UnknownHandler(_))
        ));
    }

    #[test]
    fn serve_runs_the_application() {
        let registry = AppRegistry::with_builtins();
        let gateway = Gateway::from_config(&config(Some("hearth.hello")), &registry).unwrap();
        let response = Arc::new(CaptureResponse::new());

        gateway
            .serve(
                Arc::new(HttpRequest::new("GET", "").with_path_info("/hi")),
                Arc::new(EmptyInput),
                response.clone(),
            )
            .unwrap();

        assert_eq!(response.head().status, 200);
        let chunk = response.body().next().into_chunk().unwrap();
        assert_eq!(chunk, "Hello from hearth at /hi\n");
    }
}
