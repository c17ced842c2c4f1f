//! Bilinear 2D interpolation for surfaces.

use crate::types::InterpolationError;
use num_traits::Float;

/// Bilinear interpolator for 2D grid data.
///
/// Stores a dense grid `zs[i][j] = z(xs[i], ys[j])` and interpolates at
/// arbitrary points inside the grid. Used for base-correlation
/// strike/tenor surfaces; the distribution surface in `basket_engine`
/// carries its own inlined variant with clamping semantics.
///
/// # Example
///
/// ```
/// use basket_core::math::interpolators::BilinearInterpolator;
///
/// let xs = [0.0, 1.0];
/// let ys = [0.0, 1.0];
/// let zs = vec![vec![0.0_f64, 1.0], vec![2.0, 3.0]];
///
/// let interp = BilinearInterpolator::new(&xs, &ys, zs).unwrap();
/// let z = interp.interpolate(0.5, 0.5).unwrap();
/// assert!((z - 1.5).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct BilinearInterpolator<T: Float> {
    /// X-axis coordinates (strictly increasing)
    xs: Vec<T>,
    /// Y-axis coordinates (strictly increasing)
    ys: Vec<T>,
    /// Grid values: zs[i][j] = z(xs[i], ys[j])
    zs: Vec<Vec<T>>,
}

impl<T: Float> BilinearInterpolator<T> {
    /// Construct a bilinear interpolator from grid data.
    ///
    /// # Arguments
    ///
    /// * `xs` - X-axis coordinates (strictly increasing, length >= 2)
    /// * `ys` - Y-axis coordinates (strictly increasing, length >= 2)
    /// * `zs` - Grid values, one row per x-coordinate
    ///
    /// # Returns
    ///
    /// * `Ok(BilinearInterpolator)` - Successfully constructed
    /// * `Err(InterpolationError::InsufficientData)` - An axis has fewer
    ///   than 2 points
    /// * `Err(InterpolationError::InvalidInput)` - Grid dimensions do not
    ///   match the axes, or an axis is not strictly increasing
    pub fn new(xs: &[T], ys: &[T], zs: Vec<Vec<T>>) -> Result<Self, InterpolationError> {
        if xs.len() < 2 {
            return Err(InterpolationError::InsufficientData {
                got: xs.len(),
                need: 2,
            });
        }
        if ys.len() < 2 {
            return Err(InterpolationError::InsufficientData {
                got: ys.len(),
                need: 2,
            });
        }
        if zs.len() != xs.len() {
            return Err(InterpolationError::InvalidInput(format!(
                "grid rows ({}) must match x-axis length ({})",
                zs.len(),
                xs.len()
            )));
        }
        for (i, row) in zs.iter().enumerate() {
            if row.len() != ys.len() {
                return Err(InterpolationError::InvalidInput(format!(
                    "grid row {} length ({}) must match y-axis length ({})",
                    i,
                    row.len(),
                    ys.len()
                )));
            }
        }
        for axis in [xs, ys] {
            for w in axis.windows(2) {
                if w[1] <= w[0] {
                    return Err(InterpolationError::InvalidInput(
                        "axis coordinates must be strictly increasing".to_string(),
                    ));
                }
            }
        }

        Ok(Self {
            xs: xs.to_vec(),
            ys: ys.to_vec(),
            zs,
        })
    }

    /// The valid interpolation domain for x.
    #[inline]
    pub fn domain_x(&self) -> (T, T) {
        (self.xs[0], self.xs[self.xs.len() - 1])
    }

    /// The valid interpolation domain for y.
    #[inline]
    pub fn domain_y(&self) -> (T, T) {
        (self.ys[0], self.ys[self.ys.len() - 1])
    }

    /// Interpolate value at point (x, y).
    ///
    /// # Formula
    ///
    /// ```text
    /// z = (1-u)(1-v)*z00 + u*(1-v)*z10 + (1-u)*v*z01 + u*v*z11
    /// ```
    ///
    /// where `u`, `v` are the normalised coordinates within the
    /// enclosing grid cell.
    pub fn interpolate(&self, x: T, y: T) -> Result<T, InterpolationError> {
        let (x_min, x_max) = self.domain_x();
        let (y_min, y_max) = self.domain_y();

        if x < x_min || x > x_max {
            return Err(InterpolationError::OutOfBounds {
                x: x.to_f64().unwrap_or(f64::NAN),
                min: x_min.to_f64().unwrap_or(f64::NAN),
                max: x_max.to_f64().unwrap_or(f64::NAN),
            });
        }
        if y < y_min || y > y_max {
            return Err(InterpolationError::OutOfBounds {
                x: y.to_f64().unwrap_or(f64::NAN),
                min: y_min.to_f64().unwrap_or(f64::NAN),
                max: y_max.to_f64().unwrap_or(f64::NAN),
            });
        }

        let i = Self::cell_index(&self.xs, x);
        let j = Self::cell_index(&self.ys, y);

        let (x0, x1) = (self.xs[i], self.xs[i + 1]);
        let (y0, y1) = (self.ys[j], self.ys[j + 1]);

        let z00 = self.zs[i][j];
        let z10 = self.zs[i + 1][j];
        let z01 = self.zs[i][j + 1];
        let z11 = self.zs[i + 1][j + 1];

        let u = (x - x0) / (x1 - x0);
        let v = (y - y0) / (y1 - y0);

        let one = T::one();
        Ok((one - u) * (one - v) * z00 + u * (one - v) * z10 + (one - u) * v * z01 + u * v * z11)
    }

    /// Find the cell index on an axis using binary search, clamped to
    /// `[0, n-2]`.
    #[inline]
    fn cell_index(axis: &[T], v: T) -> usize {
        let pos = axis.partition_point(|&a| a <= v);
        if pos == 0 {
            0
        } else if pos >= axis.len() {
            axis.len() - 2
        } else {
            pos - 1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_grid() -> BilinearInterpolator<f64> {
        BilinearInterpolator::new(
            &[0.0, 1.0],
            &[0.0, 1.0],
            vec![vec![0.0, 1.0], vec![2.0, 3.0]],
        )
        .unwrap()
    }

    #[test]
    fn test_corners_reproduced() {
        let interp = unit_grid();
        assert!((interp.interpolate(0.0, 0.0).unwrap() - 0.0).abs() < 1e-12);
        assert!((interp.interpolate(0.0, 1.0).unwrap() - 1.0).abs() < 1e-12);
        assert!((interp.interpolate(1.0, 0.0).unwrap() - 2.0).abs() < 1e-12);
        assert!((interp.interpolate(1.0, 1.0).unwrap() - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_center() {
        let interp = unit_grid();
        assert!((interp.interpolate(0.5, 0.5).unwrap() - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_out_of_bounds() {
        let interp = unit_grid();
        assert!(interp.interpolate(-0.1, 0.5).is_err());
        assert!(interp.interpolate(0.5, 1.1).is_err());
    }

    #[test]
    fn test_dimension_mismatch_rejected() {
        let result = BilinearInterpolator::new(
            &[0.0, 1.0],
            &[0.0, 1.0],
            vec![vec![0.0, 1.0]],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_unsorted_axis_rejected() {
        let result = BilinearInterpolator::new(
            &[1.0, 0.0],
            &[0.0, 1.0],
            vec![vec![0.0, 1.0], vec![2.0, 3.0]],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_three_by_two_grid() {
        let interp = BilinearInterpolator::new(
            &[0.0, 1.0, 2.0],
            &[0.0, 1.0],
            vec![vec![0.0, 1.0], vec![2.0, 3.0], vec![4.0, 5.0]],
        )
        .unwrap();
        assert!((interp.interpolate(1.5, 0.5).unwrap() - 3.5).abs() < 1e-12);
    }
}
