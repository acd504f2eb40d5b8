/// Convenience result type used across the crate.
pub type RotoResult<T> = Result<T, RotoError>;

/// Top-level error taxonomy used by the roto APIs.
#[derive(thiserror::Error, Debug)]
pub enum RotoError {
    /// An indexed shape operation received an index past the point list.
    #[error("control point index {index} out of range (shape has {len} points)")]
    IndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Current point count.
        len: usize,
    },

    /// A scalar curve was sampled while holding no keyframes.
    #[error("animated curve has no keyframes")]
    NoKeyframes,

    /// An item outlived the context that owns it.
    #[error("roto context was dropped while an item was still in use")]
    ContextDropped,

    /// Invalid user-provided or record data.
    #[error("validation error: {0}")]
    Validation(String),

    /// Errors when serializing or deserializing persisted records.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RotoError {
    /// Build a [`RotoError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`RotoError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}
