#![forbid(unsafe_code)]

use obsbind_core::{EmissionError, SourceProtocolError};
use thiserror::Error;

/// Raised from a render pass for the nearest [`ErrorBoundary`](crate::ErrorBoundary).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RenderError {
    /// A source reported an error; the generation is over.
    #[error("source error: {0}")]
    Emission(#[from] EmissionError),

    /// A source had no recognized shape.
    #[error(transparent)]
    Protocol(#[from] SourceProtocolError),
}

impl RenderError {
    #[must_use]
    pub fn as_emission(&self) -> Option<&EmissionError> {
        match self {
            Self::Emission(err) => Some(err),
            Self::Protocol(_) => None,
        }
    }
}
