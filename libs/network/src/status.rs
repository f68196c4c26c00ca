//! Status values returned across the control surface
//!
//! Expected failures (a port already in use, a missing destination) are reported as a
//! success flag plus a message; the caller decides whether to retry or give up.

use crate::error::TransportError;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransportStatus {
    pub ok: bool,
    pub message: String,
}

impl TransportStatus {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.ok
    }

    /// Status of a fallible control operation
    pub fn from_result<T>(result: crate::Result<T>, success: impl FnOnce(&T) -> String) -> Self {
        match result {
            Ok(value) => Self::success(success(&value)),
            Err(error) => error.into(),
        }
    }
}

impl From<TransportError> for TransportStatus {
    fn from(error: TransportError) -> Self {
        Self::failure(error.to_string())
    }
}

impl fmt::Display for TransportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.ok { "ok" } else { "failed" };
        write!(f, "{state}: {}", self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_from_result() {
        let ok = TransportStatus::from_result(Ok(12usize), |n| format!("sent {n} bytes"));
        assert!(ok.is_ok());
        assert_eq!(ok.to_string(), "ok: sent 12 bytes");

        let failed = TransportStatus::from_result::<usize>(Err(TransportError::Closed), |_| {
            unreachable!()
        });
        assert!(!failed.is_ok());
        assert_eq!(failed.message, "Listener closed");
    }
}
