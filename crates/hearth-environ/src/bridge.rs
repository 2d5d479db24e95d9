//! Entry point tying the environment and its two views together.

use std::sync::Arc;

use hearth_core::config::GatewayFlags;
use hearth_core::{ErrorsHandle, InputHandle};

use crate::environ::LazyEnvironment;
use crate::facade::RequestFacade;
use crate::mapping::EnvironmentMap;
use crate::request::RequestSource;

/// One request's environment, handed out as a mapping and as a request.
///
/// Both views share a single [`LazyEnvironment`], so they never disagree.
#[derive(Clone)]
pub struct RequestBridge {
    env: Arc<LazyEnvironment>,
}

impl RequestBridge {
    pub fn new(
        source: Arc<dyn RequestSource>,
        flags: GatewayFlags,
        errors: ErrorsHandle,
        input: InputHandle,
    ) -> Self {
        let env = LazyEnvironment::new(source, errors, input).with_flags(flags);
        Self { env: Arc::new(env) }
    }

    pub fn environment(&self) -> &Arc<LazyEnvironment> {
        &self.env
    }

    pub fn as_map(&self) -> EnvironmentMap {
        EnvironmentMap::new(self.env.clone())
    }

    pub fn as_facade(&self) -> RequestFacade {
        RequestFacade::new(self.env.clone())
    }

    /// Compute every value up front.
    pub fn load_all(&self) {
        self.env.load_all();
    }
}
