//! Survival probability term structures.

use crate::market_data::error::MarketDataError;
use crate::math::interpolators::{Interpolator, LinearInterpolator};

/// Contract for survival probability term structures.
///
/// # Contract
///
/// - `survival(t)` returns P(τ > t) = exp(-∫₀ᵗ λ(s)ds)
/// - `default_probability(t)` returns P(τ ≤ t) = 1 - P(τ > t)
///
/// # Invariants
///
/// - P(τ > 0) = 1
/// - P(τ > t) is non-increasing in t and lies in (0, 1]
pub trait SurvivalCurve {
    /// Survival probability P(τ > t) at curve time `t` (years).
    ///
    /// # Returns
    ///
    /// * `Ok(P(τ > t))` - Survival probability
    /// * `Err(MarketDataError::InvalidMaturity)` - If t < 0
    fn survival(&self, t: f64) -> Result<f64, MarketDataError>;

    /// Default probability P(τ ≤ t) at curve time `t`.
    fn default_probability(&self, t: f64) -> Result<f64, MarketDataError> {
        Ok(1.0 - self.survival(t)?)
    }

    /// Forward survival probability P(τ > t2 | τ > t1).
    ///
    /// # Returns
    ///
    /// * `Ok(P(τ > t2 | τ > t1))` - Conditional survival probability
    /// * `Err(MarketDataError::InvalidMaturity)` - If t2 < t1
    fn forward_survival(&self, t1: f64, t2: f64) -> Result<f64, MarketDataError> {
        if t2 < t1 {
            return Err(MarketDataError::InvalidMaturity { t: t2 - t1 });
        }
        let s1 = self.survival(t1)?;
        let s2 = self.survival(t2)?;
        if s1 <= 0.0 {
            // Fully defaulted by t1; conditional survival is degenerate.
            return Ok(0.0);
        }
        Ok(s2 / s1)
    }
}

/// A flat (constant) hazard rate curve.
///
/// # Mathematical Model
///
/// ```text
/// P(τ > t) = exp(-λ * t)
/// ```
///
/// # Example
///
/// ```
/// use basket_core::market_data::curves::{FlatHazardCurve, SurvivalCurve};
///
/// let curve = FlatHazardCurve::new(0.02).unwrap();
/// let surv = curve.survival(5.0).unwrap();
/// assert!((surv - (-0.02_f64 * 5.0).exp()).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlatHazardCurve {
    hazard_rate: f64,
}

impl FlatHazardCurve {
    /// Construct a flat hazard curve. The hazard rate must be finite
    /// and non-negative.
    pub fn new(hazard_rate: f64) -> Result<Self, MarketDataError> {
        if !hazard_rate.is_finite() || hazard_rate < 0.0 {
            return Err(MarketDataError::InvalidRate {
                name: "hazard",
                value: hazard_rate,
            });
        }
        Ok(Self { hazard_rate })
    }

    /// The constant hazard rate.
    #[inline]
    pub fn rate(&self) -> f64 {
        self.hazard_rate
    }
}

impl SurvivalCurve for FlatHazardCurve {
    fn survival(&self, t: f64) -> Result<f64, MarketDataError> {
        if t < 0.0 {
            return Err(MarketDataError::InvalidMaturity { t });
        }
        Ok((-self.hazard_rate * t).exp())
    }
}

/// A piecewise linear hazard rate curve over sorted tenor pillars.
///
/// Hazard rates are interpolated linearly between pillars with flat
/// extrapolation beyond them; the survival probability integrates the
/// hazard segment by segment (trapezoidal on interior segments).
#[derive(Debug, Clone, PartialEq)]
pub struct PiecewiseHazardCurve {
    tenors: Vec<f64>,
    hazard_rates: Vec<f64>,
    interp: LinearInterpolator<f64>,
}

impl PiecewiseHazardCurve {
    /// Construct a piecewise hazard curve from pillar points.
    ///
    /// # Arguments
    ///
    /// * `tenors` - Strictly increasing positive tenor points, years (>= 2)
    /// * `hazard_rates` - Corresponding non-negative hazard rates
    ///
    /// # Returns
    ///
    /// * `Ok(PiecewiseHazardCurve)` - Successfully constructed
    /// * `Err(MarketDataError)` - Invalid pillar data
    pub fn new(tenors: &[f64], hazard_rates: &[f64]) -> Result<Self, MarketDataError> {
        if tenors.len() < 2 {
            return Err(MarketDataError::InsufficientData {
                got: tenors.len(),
                need: 2,
            });
        }
        if tenors[0] <= 0.0 {
            return Err(MarketDataError::InvalidMaturity { t: tenors[0] });
        }
        for &h in hazard_rates {
            if !h.is_finite() || h < 0.0 {
                return Err(MarketDataError::InvalidRate {
                    name: "hazard",
                    value: h,
                });
            }
        }
        let interp = LinearInterpolator::new(tenors, hazard_rates, true)?;

        Ok(Self {
            tenors: tenors.to_vec(),
            hazard_rates: hazard_rates.to_vec(),
            interp,
        })
    }

    /// Interpolated hazard rate at time `t` (flat beyond the pillars).
    pub fn hazard_rate(&self, t: f64) -> Result<f64, MarketDataError> {
        if t < 0.0 {
            return Err(MarketDataError::InvalidMaturity { t });
        }
        Ok(self.interp.interpolate(t)?)
    }

    /// Integrated hazard ∫₀ᵗ λ(s)ds.
    fn integrated_hazard(&self, t: f64) -> Result<f64, MarketDataError> {
        if t <= 0.0 {
            return Ok(0.0);
        }
        let t_min = self.tenors[0];
        let t_max = self.tenors[self.tenors.len() - 1];

        // Constant hazard from 0 to the first pillar.
        if t <= t_min {
            return Ok(self.hazard_rates[0] * t);
        }
        let mut integral = self.hazard_rates[0] * t_min;
        let mut prev = t_min;

        for i in 1..self.tenors.len() {
            if prev >= t {
                break;
            }
            let end = t.min(self.tenors[i]);
            let h0 = self.interp.interpolate(prev)?;
            let h1 = self.interp.interpolate(end)?;
            integral += 0.5 * (h0 + h1) * (end - prev);
            prev = self.tenors[i];
        }

        if t > t_max {
            integral += self.hazard_rates[self.hazard_rates.len() - 1] * (t - t_max);
        }

        Ok(integral)
    }
}

impl SurvivalCurve for PiecewiseHazardCurve {
    fn survival(&self, t: f64) -> Result<f64, MarketDataError> {
        if t < 0.0 {
            return Err(MarketDataError::InvalidMaturity { t });
        }
        if t == 0.0 {
            return Ok(1.0);
        }
        Ok((-self.integrated_hazard(t)?).exp())
    }
}

/// Static dispatch enum wrapping concrete survival curve implementations.
///
/// Credit names hold `Arc<SurvivalCurveEnum>` so bump-and-reprice
/// sensitivity code can test reference identity of an alternative curve
/// against the original.
///
/// # Variants
///
/// - `Flat`: Constant hazard rate
/// - `Piecewise`: Pillar-based hazard term structure
#[derive(Debug, Clone, PartialEq)]
pub enum SurvivalCurveEnum {
    /// Constant hazard rate curve.
    Flat(FlatHazardCurve),
    /// Pillar-based hazard rate curve.
    Piecewise(PiecewiseHazardCurve),
}

impl SurvivalCurve for SurvivalCurveEnum {
    fn survival(&self, t: f64) -> Result<f64, MarketDataError> {
        match self {
            SurvivalCurveEnum::Flat(c) => c.survival(t),
            SurvivalCurveEnum::Piecewise(c) => c.survival(t),
        }
    }
}

impl From<FlatHazardCurve> for SurvivalCurveEnum {
    fn from(c: FlatHazardCurve) -> Self {
        SurvivalCurveEnum::Flat(c)
    }
}

impl From<PiecewiseHazardCurve> for SurvivalCurveEnum {
    fn from(c: PiecewiseHazardCurve) -> Self {
        SurvivalCurveEnum::Piecewise(c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_curve_rejects_negative_hazard() {
        assert!(FlatHazardCurve::new(-0.01).is_err());
        assert!(FlatHazardCurve::new(f64::NAN).is_err());
    }

    #[test]
    fn test_flat_curve_survival_at_zero() {
        let curve = FlatHazardCurve::new(0.02).unwrap();
        assert!((curve.survival(0.0).unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_flat_curve_survival_plus_default() {
        let curve = FlatHazardCurve::new(0.015).unwrap();
        let s = curve.survival(3.0).unwrap();
        let d = curve.default_probability(3.0).unwrap();
        assert!((s + d - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_flat_curve_negative_maturity() {
        let curve = FlatHazardCurve::new(0.02).unwrap();
        assert!(curve.survival(-1.0).is_err());
    }

    #[test]
    fn test_forward_survival_flat() {
        let curve = FlatHazardCurve::new(0.02).unwrap();
        let fwd = curve.forward_survival(1.0, 3.0).unwrap();
        assert!((fwd - (-0.02_f64 * 2.0).exp()).abs() < 1e-12);
    }

    #[test]
    fn test_forward_survival_reversed_dates() {
        let curve = FlatHazardCurve::new(0.02).unwrap();
        assert!(curve.forward_survival(3.0, 1.0).is_err());
    }

    #[test]
    fn test_piecewise_matches_flat_on_constant_pillars() {
        let pw = PiecewiseHazardCurve::new(&[1.0, 5.0, 10.0], &[0.02, 0.02, 0.02]).unwrap();
        let flat = FlatHazardCurve::new(0.02).unwrap();
        for t in [0.5, 1.0, 3.0, 7.5, 12.0] {
            let a = pw.survival(t).unwrap();
            let b = flat.survival(t).unwrap();
            assert!((a - b).abs() < 1e-12, "mismatch at t={}", t);
        }
    }

    #[test]
    fn test_piecewise_survival_monotone_decreasing() {
        let curve = PiecewiseHazardCurve::new(&[1.0, 3.0, 5.0], &[0.01, 0.02, 0.03]).unwrap();
        let mut prev = 1.0;
        for t in [0.5, 1.0, 2.0, 3.0, 4.0, 5.0, 8.0] {
            let s = curve.survival(t).unwrap();
            assert!(s <= prev + 1e-14);
            assert!(s > 0.0 && s <= 1.0);
            prev = s;
        }
    }

    #[test]
    fn test_piecewise_rejects_bad_pillars() {
        assert!(PiecewiseHazardCurve::new(&[1.0], &[0.01]).is_err());
        assert!(PiecewiseHazardCurve::new(&[0.0, 1.0], &[0.01, 0.02]).is_err());
        assert!(PiecewiseHazardCurve::new(&[1.0, 2.0], &[0.01, -0.02]).is_err());
    }

    #[test]
    fn test_enum_dispatch() {
        let curve: SurvivalCurveEnum = FlatHazardCurve::new(0.02).unwrap().into();
        let s = curve.survival(1.0).unwrap();
        assert!((s - (-0.02_f64).exp()).abs() < 1e-12);
    }
}
