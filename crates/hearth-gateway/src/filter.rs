//! Filter mode: the application wraps the rest of a chain.
//!
//! The downstream link receives the request as the application left it,
//! through a [`RequestFacade`], once the application calls
//! `start_response`. Anything the link writes lands after the head the
//! application chose and before the application's own body.

use std::sync::Arc;

use hearth_core::InputHandle;
use hearth_environ::{RequestFacade, RequestSource};
use tracing::{debug, info_span};

use crate::call::GatewayCall;
use crate::driver;
use crate::error::Result;
use crate::servlet::Gateway;
use crate::sink::ResponseSink;

/// The rest of a filter chain.
pub trait FilterChain: Send + Sync {
    fn do_filter(&self, request: &RequestFacade, response: &GatewayCall) -> anyhow::Result<()>;
}

impl<F> FilterChain for F
where
    F: Fn(&RequestFacade, &GatewayCall) -> anyhow::Result<()> + Send + Sync,
{
    fn do_filter(&self, request: &RequestFacade, response: &GatewayCall) -> anyhow::Result<()> {
        self(request, response)
    }
}

impl Gateway {
    /// Run the application as a filter in front of `chain`.
    pub fn filter(
        &self,
        request: Arc<dyn RequestSource>,
        input: InputHandle,
        sink: Arc<dyn ResponseSink>,
        chain: Arc<dyn FilterChain>,
    ) -> Result<()> {
        let bridge = self.bridge(request, input);
        let span = info_span!("filter", handler = %self.handler());
        let _guard = span.enter();

        let facade = bridge.as_facade();
        let call = GatewayCall::new(bridge.as_map(), sink).with_before_write(move |call| {
            debug!("calling next filter");
            chain.do_filter(&facade, call)
        });
        driver::run(self.app_ref(), &call)
    }
}
