//! Metric Error Types

use thiserror::Error;

/// Errors while computing geometry metrics
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MetricError {
    /// Landmark set does not have the shape a metric needs
    #[error("Invalid landmark input: expected {expected} points, got {actual}")]
    InvalidInput { expected: usize, actual: usize },

    /// Points are well-formed but collapse so the ratio is undefined
    #[error("Degenerate landmark geometry")]
    Degenerate,
}
