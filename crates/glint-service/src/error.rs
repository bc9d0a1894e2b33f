//! Failures of the analysis pipeline itself.
//!
//! Syntax and type errors are diagnostics, not failures. A
//! [`CheckerFailure`] means the front end could not produce a result at all;
//! the file is treated as untyped until the next request retries it.

use thiserror::Error;

/// The front end faulted while analyzing a file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckerFailure {
    /// The front end panicked.
    #[error("checker panicked: {message}")]
    Panicked {
        /// The panic payload, when it was a string.
        message: String,
    },

    /// The front end reported an internal fault.
    #[error("checker failed: {message}")]
    Internal {
        /// Description of the fault.
        message: String,
    },
}

impl CheckerFailure {
    /// Build a failure from a caught panic payload.
    pub(crate) fn from_panic(payload: &(dyn std::any::Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(ToString::to_string)
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic payload".to_string());
        Self::Panicked { message }
    }

    /// Build an internal failure.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_panic_payloads() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("boom");
        assert_eq!(
            CheckerFailure::from_panic(payload.as_ref()),
            CheckerFailure::Panicked {
                message: "boom".to_string()
            }
        );

        let payload: Box<dyn std::any::Any + Send> = Box::new(String::from("index out of range"));
        assert_eq!(
            CheckerFailure::from_panic(payload.as_ref()).to_string(),
            "checker panicked: index out of range"
        );

        let payload: Box<dyn std::any::Any + Send> = Box::new(7_u32);
        assert_eq!(
            CheckerFailure::from_panic(payload.as_ref()).to_string(),
            "checker panicked: unknown panic payload"
        );
    }
}
