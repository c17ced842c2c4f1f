//! Piecewise linear interpolation.

use super::Interpolator;
use crate::types::InterpolationError;
use num_traits::Float;

/// Piecewise linear interpolator over sorted pillars.
///
/// Used for hazard-rate term structures, recovery term structures, and
/// the base-correlation strike curve. Pillars must be strictly
/// increasing; flat extrapolation beyond the first/last pillar is
/// opt-in at construction.
///
/// # Example
///
/// ```
/// use basket_core::math::interpolators::{Interpolator, LinearInterpolator};
///
/// let interp = LinearInterpolator::<f64>::new(&[1.0, 3.0], &[0.01, 0.02], false).unwrap();
/// let y = interp.interpolate(2.0).unwrap();
/// assert!((y - 0.015).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct LinearInterpolator<T: Float> {
    /// Strictly increasing x-coordinates
    xs: Vec<T>,
    /// Corresponding y-values
    ys: Vec<T>,
    /// Whether queries beyond the pillar range extrapolate flat
    flat_extrapolation: bool,
}

impl<T: Float> LinearInterpolator<T> {
    /// Construct a linear interpolator from pillar data.
    ///
    /// # Arguments
    ///
    /// * `xs` - Strictly increasing x-coordinates (length >= 2)
    /// * `ys` - Corresponding y-values
    /// * `flat_extrapolation` - Clamp queries outside the pillar range
    ///   to the boundary value instead of erroring
    ///
    /// # Returns
    ///
    /// * `Ok(LinearInterpolator)` - Successfully constructed
    /// * `Err(InterpolationError::InsufficientData)` - Fewer than 2 pillars
    /// * `Err(InterpolationError::InvalidInput)` - Mismatched lengths or
    ///   non-increasing x-coordinates
    pub fn new(xs: &[T], ys: &[T], flat_extrapolation: bool) -> Result<Self, InterpolationError> {
        if xs.len() != ys.len() {
            return Err(InterpolationError::InvalidInput(format!(
                "xs and ys must have same length: got {} and {}",
                xs.len(),
                ys.len()
            )));
        }
        if xs.len() < 2 {
            return Err(InterpolationError::InsufficientData {
                got: xs.len(),
                need: 2,
            });
        }
        for w in xs.windows(2) {
            if w[1] <= w[0] {
                return Err(InterpolationError::InvalidInput(
                    "x-coordinates must be strictly increasing".to_string(),
                ));
            }
        }

        Ok(Self {
            xs: xs.to_vec(),
            ys: ys.to_vec(),
            flat_extrapolation,
        })
    }

    /// Pillar x-coordinates.
    #[inline]
    pub fn xs(&self) -> &[T] {
        &self.xs
    }

    /// Pillar y-values.
    #[inline]
    pub fn ys(&self) -> &[T] {
        &self.ys
    }

    /// The valid interpolation domain `(x_min, x_max)`.
    #[inline]
    pub fn domain(&self) -> (T, T) {
        (self.xs[0], self.xs[self.xs.len() - 1])
    }

    /// Find the segment index `i` with `xs[i] <= x < xs[i+1]`, clamped
    /// to `[0, n-2]`.
    #[inline]
    fn find_segment(&self, x: T) -> usize {
        let pos = self.xs.partition_point(|&xi| xi <= x);
        if pos == 0 {
            0
        } else if pos >= self.xs.len() {
            self.xs.len() - 2
        } else {
            pos - 1
        }
    }
}

impl<T: Float> Interpolator<T> for LinearInterpolator<T> {
    fn interpolate(&self, x: T) -> Result<T, InterpolationError> {
        let (x_min, x_max) = self.domain();

        if x < x_min || x > x_max {
            if self.flat_extrapolation {
                let clamped = if x < x_min { self.ys[0] } else { self.ys[self.ys.len() - 1] };
                return Ok(clamped);
            }
            return Err(InterpolationError::OutOfBounds {
                x: x.to_f64().unwrap_or(f64::NAN),
                min: x_min.to_f64().unwrap_or(f64::NAN),
                max: x_max.to_f64().unwrap_or(f64::NAN),
            });
        }

        let i = self.find_segment(x);
        let (x0, x1) = (self.xs[i], self.xs[i + 1]);
        let (y0, y1) = (self.ys[i], self.ys[i + 1]);

        Ok(y0 + (y1 - y0) * (x - x0) / (x1 - x0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interpolate_at_pillars() {
        let interp = LinearInterpolator::new(&[0.0, 1.0, 2.0], &[0.0, 2.0, 4.0], false).unwrap();
        assert!((interp.interpolate(0.0).unwrap() - 0.0).abs() < 1e-12);
        assert!((interp.interpolate(1.0).unwrap() - 2.0).abs() < 1e-12);
        assert!((interp.interpolate(2.0).unwrap() - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_interpolate_midpoint() {
        let interp = LinearInterpolator::new(&[0.0, 2.0], &[1.0, 3.0], false).unwrap();
        assert!((interp.interpolate(1.0).unwrap() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_out_of_bounds_without_extrapolation() {
        let interp = LinearInterpolator::new(&[0.0, 1.0], &[0.0, 1.0], false).unwrap();
        assert!(interp.interpolate(-0.5).is_err());
        assert!(interp.interpolate(1.5).is_err());
    }

    #[test]
    fn test_flat_extrapolation() {
        let interp = LinearInterpolator::new(&[1.0, 2.0], &[10.0, 20.0], true).unwrap();
        assert!((interp.interpolate(0.0).unwrap() - 10.0).abs() < 1e-12);
        assert!((interp.interpolate(5.0).unwrap() - 20.0).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_unsorted_pillars() {
        let result = LinearInterpolator::new(&[1.0, 1.0, 2.0], &[0.0, 1.0, 2.0], false);
        assert!(matches!(
            result,
            Err(InterpolationError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_rejects_single_pillar() {
        let result = LinearInterpolator::new(&[1.0], &[0.0], false);
        assert!(matches!(
            result,
            Err(InterpolationError::InsufficientData { got: 1, need: 2 })
        ));
    }

    #[test]
    fn test_rejects_mismatched_lengths() {
        let result = LinearInterpolator::new(&[1.0, 2.0], &[0.0], false);
        assert!(result.is_err());
    }

    mod properties {
        use proptest::prelude::*;

        use super::super::*;

        fn pillar_strategy() -> impl Strategy<Value = (Vec<f64>, Vec<f64>)> {
            proptest::collection::vec((0.01f64..10.0, -100.0f64..100.0), 2..12).prop_map(
                |pairs| {
                    let mut x = 0.0;
                    let mut xs = Vec::with_capacity(pairs.len());
                    let mut ys = Vec::with_capacity(pairs.len());
                    for (dx, y) in pairs {
                        x += dx;
                        xs.push(x);
                        ys.push(y);
                    }
                    (xs, ys)
                },
            )
        }

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(500))]

            #[test]
            fn test_interpolation_stays_inside_value_hull(
                (xs, ys) in pillar_strategy(),
                frac in 0.0f64..1.0,
            ) {
                let interp = LinearInterpolator::new(&xs, &ys, true).unwrap();
                let lo = xs[0];
                let hi = xs[xs.len() - 1];
                let x = lo + frac * (hi - lo);
                let y = interp.interpolate(x).unwrap();
                let min = ys.iter().cloned().fold(f64::INFINITY, f64::min);
                let max = ys.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
                prop_assert!(y >= min - 1e-9 && y <= max + 1e-9);
            }

            #[test]
            fn test_pillars_reproduce_exactly(
                (xs, ys) in pillar_strategy(),
            ) {
                let interp = LinearInterpolator::new(&xs, &ys, false).unwrap();
                for (&x, &y) in xs.iter().zip(&ys) {
                    prop_assert!((interp.interpolate(x).unwrap() - y).abs() < 1e-9);
                }
            }
        }
    }
}
