//! Engine error taxonomy.

use basket_core::market_data::MarketDataError;
use basket_models::ModelError;
use thiserror::Error;

/// Errors surfaced by the basket engine.
///
/// # Variants
///
/// - `Validation`: malformed construction input; raised at construction
///   or first use, never retried
/// - `Unsupported`: an engine or kernel invoked for an operation it does
///   not implement; always surfaced, never swallowed
/// - `InvalidState`: an operation requiring prior resolved state invoked
///   out of order
/// - `Numerical`: a numerical routine failed to set up or converge
/// - `MarketData` / `Model`: wrapped lower-layer errors
///
/// Arithmetic degeneracies (near-zero remaining basket, zero recovery
/// denominators) are handled locally with clamped results and never
/// reach this taxonomy.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// Malformed construction input.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Operation not implemented by this engine or kernel variant.
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// Operation invoked out of order.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Numerical routine failure.
    #[error("Numerical error: {0}")]
    Numerical(String),

    /// Wrapped market data error.
    #[error("Market data error: {0}")]
    MarketData(#[from] MarketDataError),

    /// Wrapped model error.
    #[error("Model error: {0}")]
    Model(#[from] ModelError),
}
