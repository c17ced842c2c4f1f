//! Interpolation primitives.
//!
//! This module provides:
//! - [`Interpolator`]: one-dimensional interpolation contract
//! - [`LinearInterpolator`]: piecewise linear with optional flat extrapolation
//! - [`BilinearInterpolator`]: 2-D grid interpolation

mod bilinear;
mod linear;

pub use bilinear::BilinearInterpolator;
pub use linear::LinearInterpolator;

use crate::types::InterpolationError;
use num_traits::Float;

/// One-dimensional interpolation contract.
///
/// # Type Parameters
///
/// * `T` - Floating-point type (e.g., `f64`, `f32`)
pub trait Interpolator<T: Float> {
    /// Interpolate a value at point `x`.
    ///
    /// # Returns
    ///
    /// * `Ok(y)` - The interpolated value
    /// * `Err(InterpolationError::OutOfBounds)` - `x` outside the domain
    ///   and extrapolation is not permitted
    fn interpolate(&self, x: T) -> Result<T, InterpolationError>;
}
