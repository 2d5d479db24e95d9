use std::fmt;
use std::str::FromStr;

use crate::error::GatewayError;

/// A parsed status line such as `404 Not Found`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub code: u16,
    pub reason: String,
}

impl Status {
    pub fn new(code: u16, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }
}

impl FromStr for Status {
    type Err = GatewayError;

    /// The code is the text before the first space and must be three digits;
    /// the rest, trimmed, is the reason phrase (possibly empty).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (code, reason) = s.split_once(' ').unwrap_or((s, ""));
        if code.len() != 3 || !code.bytes().all(|b| b.is_ascii_digit()) {
            return Err(GatewayError::InvalidStatus(s.to_string()));
        }
        let code: u16 = code
            .parse()
            .map_err(|_| GatewayError::InvalidStatus(s.to_string()))?;
        if code < 100 {
            return Err(GatewayError::InvalidStatus(s.to_string()));
        }
        Ok(Status::new(code, reason.trim()))
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.reason.is_empty() {
            write!(f, "{}", self.code)
        } else {
            write!(f, "{} {}", self.code, self.reason)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_code_and_reason() {
        let status: Status = "404 Not Found".parse().unwrap();
        assert_eq!(status, Status::new(404, "Not Found"));

        let status: Status = "203 Cannot say I know".parse().unwrap();
        assert_eq!(status.code, 203);
        assert_eq!(status.reason, "Cannot say I know");
    }

    #[test]
    fn reason_is_optional() {
        let status: Status = "204".parse().unwrap();
        assert_eq!(status, Status::new(204, ""));
        assert_eq!(status.to_string(), "204");
    }

    #[test]
    fn rejects_malformed_codes() {
        for bad in ["", "OK", "20 OK", "2000 OK", "abc Nope", "099 Low", " 200 OK"] {
            assert!(bad.parse::<Status>().is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn display_round_trips() {
        let status: Status = "500 Internal Server Error".parse().unwrap();
        assert_eq!(status.to_string(), "500 Internal Server Error");
    }
}
