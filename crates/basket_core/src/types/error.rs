//! Error types for the foundation layer.
//!
//! This module provides:
//! - `DateError`: Errors from date construction and parsing
//! - `InterpolationError`: Errors from interpolation operations

use thiserror::Error;

/// Date-related errors.
///
/// # Variants
/// - `InvalidDate`: Invalid date components (e.g., February 30th)
/// - `ParseError`: Failed to parse a date string
///
/// # Examples
/// ```
/// use basket_core::types::DateError;
///
/// let err = DateError::InvalidDate { year: 2026, month: 2, day: 30 };
/// assert_eq!(format!("{}", err), "Invalid date: 2026-2-30");
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DateError {
    /// Invalid date components (e.g., February 30th).
    #[error("Invalid date: {year}-{month}-{day}")]
    InvalidDate {
        /// Year component
        year: i32,
        /// Month component (1-12)
        month: u32,
        /// Day component (1-31)
        day: u32,
    },

    /// Failed to parse a date string.
    #[error("Date parse error: {0}")]
    ParseError(String),
}

/// Interpolation errors.
///
/// # Variants
/// - `OutOfBounds`: Query point outside the pillar domain
/// - `InsufficientData`: Too few pillar points for construction
/// - `InvalidInput`: Malformed pillar data (mismatched lengths, unsorted axes)
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InterpolationError {
    /// Query point outside valid domain.
    #[error("Out of bounds: {x} not in [{min}, {max}]")]
    OutOfBounds {
        /// The query point that was out of bounds
        x: f64,
        /// Minimum valid value
        min: f64,
        /// Maximum valid value
        max: f64,
    },

    /// Insufficient data for construction.
    #[error("Insufficient data: got {got}, need {need}")]
    InsufficientData {
        /// Number of points provided
        got: usize,
        /// Minimum number of points required
        need: usize,
    },

    /// Malformed input data.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
