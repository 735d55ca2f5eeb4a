/// Convenience result type used across lyrisync.
pub type LyrisyncResult<T> = Result<T, LyrisyncError>;

/// Top-level error taxonomy used by engine APIs.
///
/// User cancellation is not represented here; it is a successful
/// [`RenderOutcome::Cancelled`](crate::RenderOutcome::Cancelled).
#[derive(thiserror::Error, Debug)]
pub enum LyrisyncError {
    /// Invalid user-provided data (config, words, lyrics).
    #[error("validation error: {0}")]
    Validation(String),

    /// Errors while drawing or scheduling a frame.
    #[error("evaluation error: {0}")]
    Evaluation(String),

    /// Audio source could not be fetched or decoded.
    #[error("audio decode error: {0}")]
    Decode(String),

    /// Encoder construction or encode worker failure.
    #[error("encode error: {0}")]
    Encode(String),

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl LyrisyncError {
    /// Build a [`LyrisyncError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`LyrisyncError::Evaluation`] value.
    pub fn evaluation(msg: impl Into<String>) -> Self {
        Self::Evaluation(msg.into())
    }

    /// Build a [`LyrisyncError::Decode`] value.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Build a [`LyrisyncError::Encode`] value.
    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    /// Build a [`LyrisyncError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
