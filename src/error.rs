use thiserror::Error;

/// Errors raised by the sampling and distribution layer.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum VitalsError {
    /// A rendering-method tag outside SSR / SSG / ISR / CSR / Streaming.
    #[error("unknown rendering method \"{0}\"")]
    UnknownMethod(String),

    /// The measurement backend does not exist in this environment.
    #[error("measurement backend unavailable: {0}")]
    ResourceUnavailable(&'static str),

    /// The measurement backend produced no usable data this tick.
    #[error("measurement failed: {0}")]
    Measurement(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl VitalsError {
    /// `true` when the caller should fall back to an all-empty sample.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::ResourceUnavailable(_))
    }
}
