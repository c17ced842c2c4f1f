//! Base-correlation surface contract.
//!
//! A base-correlation surface maps a strike (detachment level) to the
//! single-factor correlation implied by market tranche quotes at that
//! strike. The composer in `basket_engine` consumes it to resolve
//! independent attachment- and detachment-point correlations.

use crate::error::ModelError;
use basket_core::math::interpolators::{BilinearInterpolator, Interpolator, LinearInterpolator};
use serde::{Deserialize, Serialize};

/// How the composer maps a tranche level onto a surface strike.
///
/// # Variants
///
/// - `Unadjusted`: the strike is the tranche level itself
/// - `ExpectedLossRatio`: the level is rescaled by the ratio of the
///   basket's expected loss to a reference expected loss before lookup
///   ("rescale strikes" mode)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum StrikeMethod {
    /// Use the tranche level directly.
    Unadjusted,
    /// Rescale the level by an expected-loss ratio.
    ExpectedLossRatio,
}

/// Strike → correlation interpolator contract.
///
/// Implementations must be deterministic and return correlations in
/// [0, 1).
pub trait BaseCorrelationSurface: Send + Sync + std::fmt::Debug {
    /// The implied single-factor pairwise correlation at `strike` for
    /// curve time `t` (years).
    fn correlation_at(&self, strike: f64, t: f64) -> Result<f64, ModelError>;
}

/// Linear strike-curve base correlation with flat extrapolation,
/// constant in time.
///
/// # Example
///
/// ```
/// use basket_models::basecorr::{BaseCorrelationSurface, InterpolatedBaseCorrelation};
///
/// let surface = InterpolatedBaseCorrelation::new(
///     &[0.03, 0.07, 0.10],
///     &[0.15, 0.25, 0.35],
/// ).unwrap();
/// let rho = surface.correlation_at(0.05, 5.0).unwrap();
/// assert!(rho > 0.15 && rho < 0.25);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct InterpolatedBaseCorrelation {
    interp: LinearInterpolator<f64>,
}

impl InterpolatedBaseCorrelation {
    /// Construct from strike pillars and their implied correlations.
    ///
    /// # Returns
    ///
    /// * `Err(ModelError::Validation)` - Correlations outside [0, 1) or
    ///   strikes outside (0, 1]
    pub fn new(strikes: &[f64], correlations: &[f64]) -> Result<Self, ModelError> {
        for &k in strikes {
            if !(0.0..=1.0).contains(&k) || k == 0.0 {
                return Err(ModelError::Validation(format!(
                    "strike must lie in (0, 1], got {}",
                    k
                )));
            }
        }
        for &rho in correlations {
            if !rho.is_finite() || !(0.0..1.0).contains(&rho) {
                return Err(ModelError::Validation(format!(
                    "base correlation must lie in [0, 1), got {}",
                    rho
                )));
            }
        }
        let interp = LinearInterpolator::new(strikes, correlations, true)
            .map_err(|e| ModelError::Validation(e.to_string()))?;
        Ok(Self { interp })
    }
}

impl BaseCorrelationSurface for InterpolatedBaseCorrelation {
    fn correlation_at(&self, strike: f64, _t: f64) -> Result<f64, ModelError> {
        if !strike.is_finite() || strike < 0.0 {
            return Err(ModelError::Validation(format!(
                "strike must be non-negative, got {}",
                strike
            )));
        }
        Ok(self.interp.interpolate(strike).map_err(|e| ModelError::Validation(e.to_string()))?)
    }
}

/// Base correlation on a strike/tenor grid with flat extrapolation on
/// both axes.
///
/// Quotes at different maturities rarely imply the same strike curve,
/// so multi-tenor calibrations store one correlation per (strike,
/// tenor) pillar and interpolate bilinearly between them.
#[derive(Debug, Clone, PartialEq)]
pub struct TermBaseCorrelation {
    interp: BilinearInterpolator<f64>,
}

impl TermBaseCorrelation {
    /// Construct from strike and tenor pillars and the correlation grid
    /// `correlations[i][j]` quoted at `(strikes[i], tenors[j])`.
    ///
    /// # Returns
    ///
    /// * `Err(ModelError::Validation)` - Correlations outside [0, 1),
    ///   strikes outside (0, 1], non-positive tenors, or grid dimensions
    ///   not matching the axes
    pub fn new(
        strikes: &[f64],
        tenors: &[f64],
        correlations: Vec<Vec<f64>>,
    ) -> Result<Self, ModelError> {
        for &k in strikes {
            if !(0.0..=1.0).contains(&k) || k == 0.0 {
                return Err(ModelError::Validation(format!(
                    "strike must lie in (0, 1], got {}",
                    k
                )));
            }
        }
        for &t in tenors {
            if !t.is_finite() || t <= 0.0 {
                return Err(ModelError::Validation(format!(
                    "tenor must be positive, got {}",
                    t
                )));
            }
        }
        for row in &correlations {
            for &rho in row {
                if !rho.is_finite() || !(0.0..1.0).contains(&rho) {
                    return Err(ModelError::Validation(format!(
                        "base correlation must lie in [0, 1), got {}",
                        rho
                    )));
                }
            }
        }
        let interp = BilinearInterpolator::new(strikes, tenors, correlations)
            .map_err(|e| ModelError::Validation(e.to_string()))?;
        Ok(Self { interp })
    }
}

impl BaseCorrelationSurface for TermBaseCorrelation {
    fn correlation_at(&self, strike: f64, t: f64) -> Result<f64, ModelError> {
        if !strike.is_finite() || strike < 0.0 {
            return Err(ModelError::Validation(format!(
                "strike must be non-negative, got {}",
                strike
            )));
        }
        if !t.is_finite() {
            return Err(ModelError::Validation(format!(
                "curve time must be finite, got {}",
                t
            )));
        }
        let (k_min, k_max) = self.interp.domain_x();
        let (t_min, t_max) = self.interp.domain_y();
        let k = strike.clamp(k_min, k_max);
        let t = t.clamp(t_min, t_max);
        Ok(self
            .interp
            .interpolate(k, t)
            .map_err(|e| ModelError::Validation(e.to_string()))?)
    }
}
