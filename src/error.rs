//! Exchange error type

use thiserror::Error;

/// Message shown when the server gives no detail of its own
pub const GENERIC_FAILURE: &str = "Failed to get response";

/// A request/response exchange that did not succeed.
///
/// Network failures, non-success statuses and malformed bodies all collapse
/// into this one kind; only the server-supplied detail survives.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExchangeError {
    #[error("{}", .detail.as_deref().unwrap_or(GENERIC_FAILURE))]
    Failed { detail: Option<String> },
}

impl ExchangeError {
    /// Failure carrying the server's detail message
    pub fn with_detail(detail: impl Into<String>) -> Self {
        Self::from_detail(Some(detail.into()))
    }

    /// Failure with no usable detail
    pub fn generic() -> Self {
        ExchangeError::Failed { detail: None }
    }

    /// Blank details are treated as absent
    pub fn from_detail(detail: Option<String>) -> Self {
        let detail = detail.filter(|d| !d.trim().is_empty());
        ExchangeError::Failed { detail }
    }

    pub fn detail(&self) -> Option<&str> {
        match self {
            ExchangeError::Failed { detail } => detail.as_deref(),
        }
    }

    /// Human-readable message for the error notice
    pub fn user_message(&self) -> String {
        self.to_string()
    }
}
