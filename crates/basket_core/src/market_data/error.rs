//! Market data error types.

use crate::types::InterpolationError;
use thiserror::Error;

/// Market data operation errors.
///
/// Structured error handling for survival and recovery curve
/// construction and lookups.
///
/// # Variants
///
/// - `InvalidMaturity`: Negative curve time
/// - `InvalidRate`: A hazard or recovery value outside its valid range
/// - `Interpolation`: Wrapped interpolation error
/// - `InsufficientData`: Not enough pillar points for construction
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MarketDataError {
    /// Invalid maturity (negative time).
    #[error("Invalid maturity: t = {t}")]
    InvalidMaturity {
        /// The invalid maturity value
        t: f64,
    },

    /// A rate outside its valid range.
    #[error("Invalid rate: {name} = {value}")]
    InvalidRate {
        /// Which rate was invalid ("hazard", "recovery", "dispersion")
        name: &'static str,
        /// The invalid value
        value: f64,
    },

    /// Interpolation error.
    #[error("Interpolation error: {0}")]
    Interpolation(#[from] InterpolationError),

    /// Insufficient data for construction.
    #[error("Insufficient data: got {got}, need {need}")]
    InsufficientData {
        /// Number of points provided
        got: usize,
        /// Minimum number of points required
        need: usize,
    },
}
