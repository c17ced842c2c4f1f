//! Error taxonomy for the sensitivity layer.

use thiserror::Error;

use basket_engine::EngineError;

/// Errors raised while assembling a sensitivity table.
#[derive(Debug, Error)]
pub enum RiskError {
    /// An input slice does not match the basket size.
    #[error("expected {expected} entries for '{name}', got {got}")]
    LengthMismatch {
        /// Which input was malformed.
        name: &'static str,
        /// Required length.
        expected: usize,
        /// Provided length.
        got: usize,
    },

    /// The engine failed outside any specific table row.
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),

    /// An evaluator failed while pricing a specific table row.
    #[error("evaluation failed on row {row}: {source}")]
    EvaluationFailed {
        /// Zero-based table row (0 is the base row).
        row: usize,
        /// The underlying failure.
        #[source]
        source: Box<RiskError>,
    },
}
