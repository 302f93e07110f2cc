//! Error types for terrain streaming

use thiserror::Error;

/// Main error type for the crate
#[derive(Debug, Error)]
pub enum Error {
    /// Missing or invalid setup; the subsystem must not run half-configured.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// No free segment and the pool is at capacity. Recoverable: retry next tick.
    #[error("Segment pool exhausted ({capacity} segments in use)")]
    PoolExhausted { capacity: usize },

    /// Geometry could not be built for a segment (e.g. degenerate point count).
    #[error("Invalid configuration for segment build: {0}")]
    InvalidConfiguration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Whether the caller can simply try again on a later tick.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::PoolExhausted { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_exhaustion_is_recoverable() {
        assert!(Error::PoolExhausted { capacity: 2 }.is_recoverable());
        assert!(!Error::Configuration("x".into()).is_recoverable());
        assert!(!Error::InvalidConfiguration("x".into()).is_recoverable());
    }

    #[test]
    fn test_display_names_capacity() {
        let msg = Error::PoolExhausted { capacity: 7 }.to_string();
        assert!(msg.contains('7'));
    }
}
