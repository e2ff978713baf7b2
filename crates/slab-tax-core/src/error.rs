use thiserror::Error;

#[derive(Debug, Error)]
pub enum SlabTaxError {
    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Invalid slab schedule at index {index}: {reason}")]
    InvalidSchedule { index: usize, reason: String },

    #[error("Dimension mismatch: expected {expected} coordinates, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Capacity exceeded: {0}")]
    CapacityExceeded(String),

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for SlabTaxError {
    fn from(e: serde_json::Error) -> Self {
        SlabTaxError::SerializationError(e.to_string())
    }
}
