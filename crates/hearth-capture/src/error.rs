/// Boxed error returned by observers and listeners.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors surfaced to a writer of a capture stream.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("stream closed")]
    Closed,

    /// The write observer failed. The chunk had already been enqueued.
    #[error("write observer failed: {0}")]
    Observer(#[source] BoxError),
}

pub type Result<T> = std::result::Result<T, CaptureError>;

impl From<CaptureError> for std::io::Error {
    fn from(err: CaptureError) -> Self {
        match err {
            CaptureError::Closed => std::io::Error::new(std::io::ErrorKind::BrokenPipe, err),
            CaptureError::Observer(_) => std::io::Error::other(err),
        }
    }
}
