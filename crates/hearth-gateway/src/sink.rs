//! Where a call's response goes.

use hearth_capture::{CaptureError, CaptureResponse};

use crate::error::Result;
use crate::status::Status;

/// Receives a response: the head once, then body bytes.
pub trait ResponseSink: Send + Sync {
    fn send_head(&self, status: &Status, headers: &[(String, String)]) -> Result<()>;

    fn send_body(&self, data: &[u8]) -> Result<()>;
}

impl ResponseSink for CaptureResponse {
    fn send_head(&self, status: &Status, headers: &[(String, String)]) -> Result<()> {
        if self.is_committed() {
            return Err(CaptureError::Closed.into());
        }
        self.set_status(status.code, status.reason.clone());
        for (name, value) in headers {
            self.add_header(name.clone(), value.clone());
        }
        self.commit();
        Ok(())
    }

    fn send_body(&self, data: &[u8]) -> Result<()> {
        Ok(self.write(data)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_response_records_head_then_body() {
        let response = CaptureResponse::new();
        response
            .send_head(
                &Status::new(404, "Not Found"),
                &[("Content-Type".into(), "text/plain".into())],
            )
            .unwrap();
        response.send_body(b"missing").unwrap();

        let head = response.head();
        assert_eq!(head.status, 404);
        assert_eq!(head.reason, "Not Found");
        assert_eq!(head.headers.len(), 1);
        assert_eq!(response.body().next().into_chunk().unwrap(), "missing");
    }

    #[test]
    fn second_head_is_rejected() {
        let response = CaptureResponse::new();
        response.send_head(&Status::new(200, "OK"), &[]).unwrap();
        assert!(response.send_head(&Status::new(500, "Oops"), &[]).is_err());
        assert_eq!(response.head().status, 200);
    }
}
