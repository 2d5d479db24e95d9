use hearth_core::ErrorSink;
use tracing::warn;

/// The `wsgi.errors` adapter: forwards application diagnostics to tracing
/// under the `hearth::errors` target.
#[derive(Debug, Clone)]
pub struct ErrorLog {
    handler: String,
}

impl ErrorLog {
    pub fn new(handler: impl Into<String>) -> Self {
        Self {
            handler: handler.into(),
        }
    }

    pub fn handler(&self) -> &str {
        &self.handler
    }
}

impl ErrorSink for ErrorLog {
    fn write(&self, msg: &str) {
        let msg = msg.trim_end_matches(['\r', '\n']);
        if msg.is_empty() {
            return;
        }
        warn!(target: "hearth::errors", handler = %self.handler, "{msg}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_do_not_panic_without_subscriber() {
        let log = ErrorLog::new("hearth.hello");
        log.write("something odd\n");
        log.writelines(&["a\n", "", "b"]);
        log.flush();
        assert_eq!(log.handler(), "hearth.hello");
    }
}
