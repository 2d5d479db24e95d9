//! hearth.toml configuration parser.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Default bind address for the HTTP trigger.
pub const DEFAULT_BIND: &str = "127.0.0.1:8080";

/// Default cap on a collected response body (16 MB).
pub const DEFAULT_MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HearthConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    pub server: Option<ServerConfig>,
    pub capture: Option<CaptureConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Name of the application to mount.
    pub handler: Option<String>,
    pub multithread: Option<bool>,
    pub multiprocess: Option<bool>,
    pub run_once: Option<bool>,
    pub version: Option<(u32, u32)>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind: Option<String>,
    /// Mount point reported as `SCRIPT_NAME`; the rest of the path becomes `PATH_INFO`.
    pub script_name: Option<String>,
    pub scheme: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    pub max_body_bytes: Option<usize>,
}

/// Values of the fixed gateway slots (`wsgi.version`, `wsgi.multithread`,
/// `wsgi.multiprocess`, `wsgi.run_once`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GatewayFlags {
    pub version: (u32, u32),
    pub multithread: bool,
    pub multiprocess: bool,
    pub run_once: bool,
}

impl Default for GatewayFlags {
    fn default() -> Self {
        Self {
            version: (1, 0),
            multithread: true,
            multiprocess: false,
            run_once: false,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("unsupported gateway version {0}.{1}")]
    UnsupportedVersion(u32, u32),

    #[error("script_name must be empty or start with '/' and not end with '/': {0:?}")]
    InvalidScriptName(String),

    #[error("unsupported scheme: {0}")]
    InvalidScheme(String),

    #[error("handler name must not be empty")]
    EmptyHandler,
}

impl HearthConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: HearthConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Scaffold a hearth.toml mounting the given handler.
    pub fn scaffold(handler: &str) -> Self {
        let flags = GatewayFlags::default();
        HearthConfig {
            gateway: GatewayConfig {
                handler: Some(handler.to_string()),
                multithread: Some(flags.multithread),
                multiprocess: Some(flags.multiprocess),
                run_once: Some(flags.run_once),
                version: Some(flags.version),
            },
            server: Some(ServerConfig {
                bind: Some(DEFAULT_BIND.to_string()),
                script_name: Some(String::new()),
                scheme: Some("http".to_string()),
            }),
            capture: Some(CaptureConfig {
                max_body_bytes: Some(DEFAULT_MAX_BODY_BYTES),
            }),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let (major, minor) = self.gateway_flags().version;
        if major != 1 {
            return Err(ConfigError::UnsupportedVersion(major, minor));
        }
        if matches!(self.gateway.handler.as_deref(), Some(h) if h.trim().is_empty()) {
            return Err(ConfigError::EmptyHandler);
        }
        let script_name = self.script_name();
        if !script_name.is_empty() && (!script_name.starts_with('/') || script_name.ends_with('/'))
        {
            return Err(ConfigError::InvalidScriptName(script_name.to_string()));
        }
        match self.scheme() {
            "http" | "https" => Ok(()),
            other => Err(ConfigError::InvalidScheme(other.to_string())),
        }
    }

    pub fn gateway_flags(&self) -> GatewayFlags {
        let defaults = GatewayFlags::default();
        GatewayFlags {
            version: self.gateway.version.unwrap_or(defaults.version),
            multithread: self.gateway.multithread.unwrap_or(defaults.multithread),
            multiprocess: self.gateway.multiprocess.unwrap_or(defaults.multiprocess),
            run_once: self.gateway.run_once.unwrap_or(defaults.run_once),
        }
    }

    pub fn handler(&self) -> Option<&str> {
        self.gateway.handler.as_deref()
    }

    pub fn bind(&self) -> &str {
        self.server
            .as_ref()
            .and_then(|s| s.bind.as_deref())
            .unwrap_or(DEFAULT_BIND)
    }

    pub fn script_name(&self) -> &str {
        self.server
            .as_ref()
            .and_then(|s| s.script_name.as_deref())
            .unwrap_or("")
    }

    pub fn scheme(&self) -> &str {
        self.server
            .as_ref()
            .and_then(|s| s.scheme.as_deref())
            .unwrap_or("http")
    }

    pub fn max_body_bytes(&self) -> usize {
        self.capture
            .as_ref()
            .and_then(|c| c.max_body_bytes)
            .unwrap_or(DEFAULT_MAX_BODY_BYTES)
    }
}
