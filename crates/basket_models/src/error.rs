//! Model-layer error types.

use basket_core::market_data::MarketDataError;
use thiserror::Error;

/// Errors from pool and correlation model construction.
///
/// # Variants
///
/// - `Validation`: Malformed construction input (length mismatches,
///   out-of-range parameters, empty pools)
/// - `MarketData`: Wrapped curve error
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    /// Malformed construction input.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Wrapped market data error.
    #[error("Market data error: {0}")]
    MarketData(#[from] MarketDataError),
}
