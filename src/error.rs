//! Error type shared by the alert engine.
//!
//! Variants follow how the engine reacts to them: upstream and store
//! failures are transient and simply retried on the next tick, while
//! missing instruments and malformed alerts are skipped for good.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    /// Symbol (or user, or record) is unknown everywhere we looked.
    #[error("not found: {0}")]
    NotFound(String),

    #[error("upstream error: {source_name} - {message}")]
    Upstream { source_name: String, message: String },

    #[error("timed out: {0}")]
    Timeout(String),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("notification error: {0}")]
    Notification(String),

    #[error("unsupported alert kind: {0}")]
    UnsupportedKind(String),

    /// Alert is missing the parameter its kind requires.
    #[error("invalid alert {id}: {reason}")]
    InvalidAlert { id: String, reason: String },
}

impl EngineError {
    pub fn upstream(source_name: &str, message: impl Into<String>) -> Self {
        Self::Upstream {
            source_name: source_name.to_string(),
            message: message.into(),
        }
    }

    /// True when the same call may succeed on a later tick.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Upstream { .. }
                | Self::Timeout(_)
                | Self::Decode(_)
                | Self::Store(_)
                | Self::Notification(_)
        )
    }
}

impl From<mongodb::error::Error> for EngineError {
    fn from(e: mongodb::error::Error) -> Self {
        Self::Store(e.to_string())
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(e: serde_json::Error) -> Self {
        Self::Decode(e.to_string())
    }
}
