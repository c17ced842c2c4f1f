//! Recovery rate term structures.

use crate::market_data::error::MarketDataError;
use crate::math::interpolators::{Interpolator, LinearInterpolator};

/// Recovery rate term structure with optional stochastic dispersion.
///
/// Recovery is the fraction of principal recovered on default, in
/// [0, 1]. A positive dispersion marks the recovery as stochastic with
/// the given standard deviation; kernels that support stochastic
/// recovery fold it into the loss unit, others ignore it.
///
/// # Variants
///
/// - `Flat`: Constant recovery rate
/// - `Piecewise`: Pillar-based recovery term structure
///
/// # Example
///
/// ```
/// use basket_core::market_data::curves::RecoveryCurve;
///
/// let rec = RecoveryCurve::flat(0.4, 0.0).unwrap();
/// assert!((rec.recovery(5.0).unwrap() - 0.4).abs() < 1e-12);
/// assert_eq!(rec.dispersion(), 0.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum RecoveryCurve {
    /// Constant recovery rate.
    Flat {
        /// Recovery rate in [0, 1]
        rate: f64,
        /// Recovery standard deviation, >= 0
        dispersion: f64,
    },
    /// Pillar-based recovery term structure.
    Piecewise {
        /// Interpolated recovery pillars (flat extrapolation)
        interp: LinearInterpolator<f64>,
        /// Recovery standard deviation, >= 0
        dispersion: f64,
    },
}

impl RecoveryCurve {
    /// Construct a flat recovery curve.
    ///
    /// # Returns
    ///
    /// * `Ok(RecoveryCurve)` - Valid rate and dispersion
    /// * `Err(MarketDataError::InvalidRate)` - Rate outside [0, 1] or
    ///   negative dispersion
    pub fn flat(rate: f64, dispersion: f64) -> Result<Self, MarketDataError> {
        Self::validate_rate(rate)?;
        Self::validate_dispersion(dispersion)?;
        Ok(RecoveryCurve::Flat { rate, dispersion })
    }

    /// Construct a pillar-based recovery curve.
    ///
    /// # Arguments
    ///
    /// * `tenors` - Strictly increasing tenor points, years (>= 2)
    /// * `rates` - Corresponding recovery rates in [0, 1]
    /// * `dispersion` - Recovery standard deviation, >= 0
    pub fn piecewise(tenors: &[f64], rates: &[f64], dispersion: f64) -> Result<Self, MarketDataError> {
        for &r in rates {
            Self::validate_rate(r)?;
        }
        Self::validate_dispersion(dispersion)?;
        let interp = LinearInterpolator::new(tenors, rates, true)?;
        Ok(RecoveryCurve::Piecewise { interp, dispersion })
    }

    /// Expected recovery rate at curve time `t`.
    pub fn recovery(&self, t: f64) -> Result<f64, MarketDataError> {
        if t < 0.0 {
            return Err(MarketDataError::InvalidMaturity { t });
        }
        match self {
            RecoveryCurve::Flat { rate, .. } => Ok(*rate),
            RecoveryCurve::Piecewise { interp, .. } => Ok(interp.interpolate(t)?),
        }
    }

    /// Recovery standard deviation (0 for deterministic recovery).
    #[inline]
    pub fn dispersion(&self) -> f64 {
        match self {
            RecoveryCurve::Flat { dispersion, .. } => *dispersion,
            RecoveryCurve::Piecewise { dispersion, .. } => *dispersion,
        }
    }

    fn validate_rate(rate: f64) -> Result<(), MarketDataError> {
        if !rate.is_finite() || !(0.0..=1.0).contains(&rate) {
            return Err(MarketDataError::InvalidRate {
                name: "recovery",
                value: rate,
            });
        }
        Ok(())
    }

    fn validate_dispersion(dispersion: f64) -> Result<(), MarketDataError> {
        if !dispersion.is_finite() || dispersion < 0.0 {
            return Err(MarketDataError::InvalidRate {
                name: "dispersion",
                value: dispersion,
            });
        }
        Ok(())
    }
}
