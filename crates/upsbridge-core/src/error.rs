//! Unified error handling for upsbridge.
//!
//! Every stage of a polling round reports failures through [`Error`]. All
//! variants except [`Error::DateParse`] abort the run before anything is
//! published; a date failure only degrades the affected field.

/// Unified error type for upsbridge.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// The TCP session to the status daemon could not be established.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The length-prefixed stream was malformed or ended early.
    #[error("Framing error: {0}")]
    Framing(String),

    /// A status line did not have the `NAME: value` shape.
    #[error("Parse error in line {line:?}: {message}")]
    Parse { line: String, message: String },

    /// A timestamp field did not match the daemon's date layout.
    #[error("Date parse error for {field}: {value:?}")]
    DateParse { field: String, value: String },

    /// The message broker rejected or failed to acknowledge a publish.
    #[error("Publish error: {0}")]
    Publish(String),

    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization errors.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

/// Result type alias for convenience.
pub type Result<T> = std::result::Result<T, Error>;

/// Convenience macros for creating errors.
#[macro_export]
macro_rules! framing_err {
    ($msg:expr) => {
        $crate::error::Error::Framing($msg.into())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::Error::Framing(format!($fmt, $($arg)*))
    };
}

#[macro_export]
macro_rules! config_err {
    ($msg:expr) => {
        $crate::error::Error::Config($msg.into())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::Error::Config(format!($fmt, $($arg)*))
    };
}

#[macro_export]
macro_rules! publish_err {
    ($msg:expr) => {
        $crate::error::Error::Publish($msg.into())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::Error::Publish(format!($fmt, $($arg)*))
    };
}
