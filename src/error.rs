//! Core error types and result handling
//!
//! The adapter classifies failures into the categories that drive its
//! recovery policy:
//!
//! | Category | Recovery |
//! |----------|----------|
//! | Evaluation | skip the single event, log a warning |
//! | Configuration | rejected at configure time |
//! | Transport | reconnect and retry once |
//! | Exception | drop the event, no retry (request-content error) |
//! | Unexpected | drop the event, no retry |
//!
//! No error in this crate terminates the adapter; failures surface only as
//! missing output events plus log entries.

use thiserror::Error;

/// Result type alias for adapter operations.
pub type AdapterResult<T> = Result<T, AdapterError>;

/// Errors produced by the Modbus bridge.
#[derive(Error, Debug)]
pub enum AdapterError {
    /// Address or value expression failed to evaluate or produced the
    /// wrong type.
    #[error("Evaluation error: {message}")]
    Evaluation {
        /// What failed to evaluate
        message: String,
    },

    /// Invalid adapter configuration (bad host address, serial settings,
    /// zero read count).
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration problem
        message: String,
    },

    /// Transport-level I/O failure: connection dropped, timeout, malformed
    /// frame. These are assumed to be connection-state errors and are
    /// eligible for the one-shot reconnect-and-retry policy.
    #[error("Transport I/O error: {message}")]
    Transport {
        /// Underlying I/O failure description
        message: String,
    },

    /// The device answered with a Modbus exception response. The request
    /// reached the device, so reconnecting will not help; never retried.
    #[error("Modbus exception response for function {function:#04X}: {code}")]
    Exception {
        /// Function code of the rejected request
        function: u8,
        /// Exception description reported by the device
        code: String,
    },

    /// Any other failure during execution.
    #[error("Unexpected error: {message}")]
    Unexpected {
        /// Description of the failure
        message: String,
    },
}

impl AdapterError {
    /// Create an evaluation error.
    pub fn evaluation<S: Into<String>>(message: S) -> Self {
        AdapterError::Evaluation {
            message: message.into(),
        }
    }

    /// Create a configuration error.
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        AdapterError::Configuration {
            message: message.into(),
        }
    }

    /// Create a transport I/O error.
    pub fn transport<S: Into<String>>(message: S) -> Self {
        AdapterError::Transport {
            message: message.into(),
        }
    }

    /// Create an unexpected error.
    pub fn unexpected<S: Into<String>>(message: S) -> Self {
        AdapterError::Unexpected {
            message: message.into(),
        }
    }

    /// Whether this error is a transport I/O failure and therefore eligible
    /// for the reconnect-and-retry policy.
    #[inline]
    pub fn is_transport_io(&self) -> bool {
        matches!(self, AdapterError::Transport { .. })
    }
}

impl From<tokio_modbus::Error> for AdapterError {
    fn from(err: tokio_modbus::Error) -> Self {
        AdapterError::transport(err.to_string())
    }
}

impl From<std::io::Error> for AdapterError {
    fn from(err: std::io::Error) -> Self {
        AdapterError::transport(err.to_string())
    }
}

impl From<serde_json::Error> for AdapterError {
    fn from(err: serde_json::Error) -> Self {
        AdapterError::configuration(err.to_string())
    }
}
