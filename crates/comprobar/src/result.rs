//! Result and error types for Comprobar.

use thiserror::Error;

/// Result type for Comprobar operations
pub type ComprobarResult<T> = Result<T, ComprobarError>;

/// Errors that can occur in Comprobar
#[derive(Debug, Error)]
pub enum ComprobarError {
    /// A wait condition never became true within its budget
    #[error("Timed out after {ms}ms waiting for {condition} on {locator}")]
    Timeout {
        /// Locator the wait was evaluated against
        locator: String,
        /// Description of the condition that never held
        condition: String,
        /// Timeout budget in milliseconds
        ms: u64,
    },

    /// No element matched the locator
    #[error("No element found for {locator}")]
    ElementNotFound {
        /// Locator that matched nothing
        locator: String,
    },

    /// An element handle outlived the DOM node it referred to
    #[error("Stale element reference: {message}")]
    StaleElement {
        /// Error message
        message: String,
    },

    /// The element exists but refused the interaction (occluded, disabled,
    /// mid-animation)
    #[error("Element not interactable: {message}")]
    NotInteractable {
        /// Error message
        message: String,
    },

    /// Caller supplied an unrecognized mode or malformed setting
    #[error("Configuration error: {message}")]
    Configuration {
        /// Error message
        message: String,
    },

    /// Session/driver-level communication fault
    #[error("Infrastructure failure: {message}")]
    Infrastructure {
        /// Error message
        message: String,
    },

    /// A verification mismatch reported by the caller's assertions
    #[error("Assertion failed: {message}")]
    AssertionFailed {
        /// Error message
        message: String,
    },

    /// A sleep was interrupted; the in-flight operation must be abandoned
    #[error("Interrupted: {message}")]
    Interrupted {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ComprobarError {
    /// True for errors the wait engine treats as "element not there yet"
    /// rather than a hard fault during a poll tick.
    #[must_use]
    pub const fn is_absence(&self) -> bool {
        matches!(
            self,
            Self::ElementNotFound { .. } | Self::StaleElement { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_display_carries_diagnostics() {
        let err = ComprobarError::Timeout {
            locator: "css=.spinner".to_string(),
            condition: "invisible".to_string(),
            ms: 5000,
        };
        let text = err.to_string();
        assert!(text.contains("5000ms"));
        assert!(text.contains("css=.spinner"));
        assert!(text.contains("invisible"));
    }

    #[test]
    fn test_absence_classification() {
        let not_found = ComprobarError::ElementNotFound {
            locator: "id=missing".to_string(),
        };
        let stale = ComprobarError::StaleElement {
            message: "node replaced".to_string(),
        };
        let infra = ComprobarError::Infrastructure {
            message: "connection reset".to_string(),
        };
        assert!(not_found.is_absence());
        assert!(stale.is_absence());
        assert!(!infra.is_absence());
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: ComprobarError = io.into();
        assert!(matches!(err, ComprobarError::Io(_)));
    }
}
