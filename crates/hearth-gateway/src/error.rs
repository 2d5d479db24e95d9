use hearth_capture::CaptureError;

/// Errors raised while driving an application call.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("write() before start_response()")]
    WriteBeforeStart,

    #[error("headers already set")]
    HeadersAlreadySet,

    #[error("invalid status line: {0:?}")]
    InvalidStatus(String),

    #[error("handler {0:?} must look like `package.name`")]
    InvalidHandler(String),

    #[error("unknown handler: {0}")]
    UnknownHandler(String),

    #[error("no handler configured")]
    NoHandler,

    /// Raised by the application, or re-raised through `start_response`.
    #[error("application error: {0:#}")]
    Application(anyhow::Error),

    #[error("filter chain failed: {0:#}")]
    Filter(anyhow::Error),

    #[error("response sink failed: {0}")]
    Sink(#[from] CaptureError),
}

pub type Result<T> = std::result::Result<T, GatewayError>;
