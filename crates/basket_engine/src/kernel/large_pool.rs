//! Vasicek large-homogeneous-pool approximation kernel.

use gauss_quad::GaussLegendre;
use statrs::distribution::{Continuous, ContinuousCDF, Normal};

use basket_core::market_data::curves::SurvivalCurve;
use basket_models::copula::CopulaSpec;

use crate::error::EngineError;
use crate::kernel::{DistributionKernel, KernelRequest};
use crate::surface::{DistributionSurface, SurfaceMeasure};

/// Integration bound for the systemic factor, in standard deviations.
const FACTOR_BOUND: f64 = 8.0;

/// Semi-analytic kernel in the infinitely-granular pool limit.
///
/// The pool is collapsed to principal-weighted average default
/// probability, recovery, and factor loading, and the conditional loss
/// fraction becomes deterministic given the systemic factor. Much
/// cheaper than the recursion and accurate for large, homogeneous
/// baskets; name-level granularity (small pools, lumpy principals) is
/// lost by construction.
#[derive(Debug, Clone)]
pub struct LargePoolKernel {
    quadrature_order: usize,
}

impl Default for LargePoolKernel {
    fn default() -> Self {
        Self {
            quadrature_order: 64,
        }
    }
}

impl LargePoolKernel {
    /// Build a kernel with the given Gauss-Legendre order for the
    /// factor integral.
    pub fn new(quadrature_order: usize) -> Result<Self, EngineError> {
        if quadrature_order < 2 {
            return Err(EngineError::Validation(format!(
                "quadrature order must be at least 2, got {}",
                quadrature_order
            )));
        }
        Ok(Self { quadrature_order })
    }

    /// Vasicek CDF of the pool loss fraction.
    fn loss_cdf(loss_fraction: f64, q: f64, lgd: f64, rho: f64, normal: &Normal) -> f64 {
        if loss_fraction <= 0.0 && q > 0.0 {
            return 0.0;
        }
        if lgd <= 0.0 || loss_fraction >= lgd {
            return 1.0;
        }
        let q = q.clamp(1.0e-12, 1.0 - 1.0e-12);
        let rho = rho.clamp(0.0, 0.999_999);
        if rho <= 1.0e-12 {
            return if loss_fraction < lgd * q { 0.0 } else { 1.0 };
        }
        let x = normal.inverse_cdf((loss_fraction / lgd).clamp(1.0e-12, 1.0 - 1.0e-12));
        let k = normal.inverse_cdf(q);
        normal
            .cdf(((1.0 - rho).sqrt() * x - k) / rho.sqrt())
            .clamp(0.0, 1.0)
    }
}

impl DistributionKernel for LargePoolKernel {
    fn compute(
        &self,
        request: &KernelRequest<'_>,
        surface: &mut DistributionSurface,
    ) -> Result<(), EngineError> {
        request.validate(surface)?;
        match request.copula {
            CopulaSpec::Gaussian => {}
            CopulaSpec::StudentT { dof } => {
                return Err(EngineError::Unsupported(format!(
                    "large-pool kernel supports the Gaussian copula only, got Student-t (dof = {})",
                    dof
                )));
            }
        }

        let total: f64 = request.principals.iter().sum();
        if total <= 0.0 {
            return Err(EngineError::Validation(
                "kernel requires positive total principal".to_string(),
            ));
        }

        let normal = Normal::new(0.0, 1.0).expect("standard normal must be valid");
        let quad = GaussLegendre::new(self.quadrature_order)
            .map_err(|e| EngineError::Numerical(format!("Gauss-Legendre setup failed: {}", e)))?;

        for time_idx in request.start_index..request.stop_index {
            let t = request.times[time_idx];
            let loadings = request.factors.loadings(time_idx);

            // Principal-weighted pool averages.
            let mut avg_p = 0.0;
            let mut avg_recovery = 0.0;
            let mut avg_loading = 0.0;
            for (k, name) in request.pool.names().iter().enumerate() {
                let w = request.principals[k] / total;
                avg_p += w * name.survival().default_probability(t)?;
                avg_recovery += w * name.recovery().recovery(t)?;
                avg_loading += w * loadings[k];
            }
            let lgd = (1.0 - avg_recovery).clamp(0.0, 1.0);
            let rho = (avg_loading * avg_loading).clamp(0.0, 0.999_999);

            let levels = surface.levels().to_vec();
            for (level_idx, &level) in levels.iter().enumerate() {
                let value = match request.measure {
                    SurfaceMeasure::Probability => {
                        if avg_p <= 0.0 {
                            1.0
                        } else {
                            Self::loss_cdf(level, avg_p, lgd, rho, &normal)
                        }
                    }
                    SurfaceMeasure::ExpectedLoss | SurfaceMeasure::ExpectedRecovery => {
                        let severity = match request.measure {
                            SurfaceMeasure::ExpectedRecovery => avg_recovery,
                            _ => lgd,
                        };
                        if avg_p <= 0.0 || severity <= 0.0 {
                            0.0
                        } else if rho <= 1.0e-12 {
                            (severity * avg_p).min(level)
                        } else {
                            let k = normal.inverse_cdf(avg_p.clamp(1.0e-12, 1.0 - 1.0e-12));
                            let sqrt_rho = rho.sqrt();
                            let sqrt_complement = (1.0 - rho).sqrt();
                            quad.integrate(-FACTOR_BOUND, FACTOR_BOUND, |m| {
                                let cond = normal.cdf((k - sqrt_rho * m) / sqrt_complement);
                                (severity * cond).min(level) * normal.pdf(m)
                            })
                        }
                    }
                };
                surface.set(0, time_idx, level_idx, value);
            }
        }
        Ok(())
    }
}

// ============================================================
// Tests
// ============================================================

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use approx::assert_relative_eq;

    use basket_core::market_data::curves::{FlatHazardCurve, RecoveryCurve, SurvivalCurveEnum};
    use basket_models::correlation::{CorrelationModel, FactorTermStructure};
    use basket_models::pool::{CreditName, CreditPool};

    use super::*;

    fn homogeneous_pool(n: usize, hazard: f64, recovery: f64) -> CreditPool {
        let curve = Arc::new(SurvivalCurveEnum::from(
            FlatHazardCurve::new(hazard).unwrap(),
        ));
        let names = (0..n)
            .map(|i| {
                CreditName::new(
                    format!("NAME{}", i),
                    Arc::clone(&curve),
                    RecoveryCurve::flat(recovery, 0.0).unwrap(),
                    10.0,
                )
                .unwrap()
            })
            .collect();
        CreditPool::new(names).unwrap()
    }

    fn fill(
        measure: SurfaceMeasure,
        pool: &CreditPool,
        rho: f64,
        times: &[f64],
        levels: &[f64],
    ) -> DistributionSurface {
        let model = CorrelationModel::single_factor_correlation(rho).unwrap();
        let factors = FactorTermStructure::resolve(&model, times, pool.len()).unwrap();
        let principals: Vec<f64> = pool.names().iter().map(|n| n.principal().abs()).collect();
        let mut surface =
            DistributionSurface::new(measure, times.to_vec(), levels.to_vec(), 1).unwrap();
        let request = KernelRequest {
            measure,
            start_index: 0,
            stop_index: times.len(),
            copula: CopulaSpec::Gaussian,
            factors: &factors,
            pool,
            principals: &principals,
            times,
            grid_size: 0.0,
        };
        LargePoolKernel::default()
            .compute(&request, &mut surface)
            .unwrap();
        surface
    }

    #[test]
    fn test_zero_correlation_is_deterministic() {
        let pool = homogeneous_pool(50, 0.05, 0.4);
        let t = 2.0;
        let p = 1.0 - (-0.05f64 * t).exp();
        let s = fill(
            SurfaceMeasure::ExpectedLoss,
            &pool,
            0.0,
            &[0.0, t],
            &[0.0, 0.5, 1.0],
        );
        assert_relative_eq!(s.value(0, 1, 2), 0.6 * p, epsilon = 1e-10);
    }

    #[test]
    fn test_loss_cdf_saturates_at_lgd() {
        let pool = homogeneous_pool(50, 0.05, 0.4);
        let s = fill(
            SurfaceMeasure::Probability,
            &pool,
            0.3,
            &[0.0, 5.0],
            &[0.0, 0.3, 0.6, 1.0],
        );
        // The loss fraction can never exceed 1 - R = 0.6.
        assert_relative_eq!(s.value(0, 1, 2), 1.0, epsilon = 1e-12);
        assert_relative_eq!(s.value(0, 1, 3), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_expected_loss_monotone_in_level_and_time() {
        let pool = homogeneous_pool(100, 0.03, 0.4);
        let s = fill(
            SurfaceMeasure::ExpectedLoss,
            &pool,
            0.3,
            &[0.0, 1.0, 5.0],
            &[0.0, 0.05, 0.2, 1.0],
        );
        for i in 0..3 {
            for j in 1..4 {
                assert!(s.value(0, i, j) >= s.value(0, i, j - 1) - 1e-12);
            }
        }
        for j in 0..4 {
            assert!(s.value(0, 2, j) >= s.value(0, 1, j) - 1e-12);
        }
    }

    #[test]
    fn test_loss_and_recovery_sum_to_default_probability() {
        let pool = homogeneous_pool(80, 0.04, 0.35);
        let t = 3.0;
        let p = 1.0 - (-0.04f64 * t).exp();
        let loss = fill(
            SurfaceMeasure::ExpectedLoss,
            &pool,
            0.25,
            &[0.0, t],
            &[0.0, 1.0],
        );
        let rec = fill(
            SurfaceMeasure::ExpectedRecovery,
            &pool,
            0.25,
            &[0.0, t],
            &[0.0, 1.0],
        );
        assert_relative_eq!(
            loss.value(0, 1, 1) + rec.value(0, 1, 1),
            p,
            epsilon = 1e-6
        );
    }

    #[test]
    fn test_matches_recursion_for_large_homogeneous_pool() {
        use crate::kernel::RecursiveGaussianKernel;

        let pool = homogeneous_pool(200, 0.03, 0.4);
        let times = [0.0, 5.0];
        let levels = [0.0, 0.03, 0.1, 1.0];
        let lhp = fill(SurfaceMeasure::ExpectedLoss, &pool, 0.3, &times, &levels);

        let model = CorrelationModel::single_factor_correlation(0.3).unwrap();
        let factors = FactorTermStructure::resolve(&model, &times, pool.len()).unwrap();
        let principals: Vec<f64> = pool.names().iter().map(|n| n.principal().abs()).collect();
        let mut exact = DistributionSurface::new(
            SurfaceMeasure::ExpectedLoss,
            times.to_vec(),
            levels.to_vec(),
            1,
        )
        .unwrap();
        let request = KernelRequest {
            measure: SurfaceMeasure::ExpectedLoss,
            start_index: 0,
            stop_index: 2,
            copula: CopulaSpec::Gaussian,
            factors: &factors,
            pool: &pool,
            principals: &principals,
            times: &times,
            grid_size: 0.002,
        };
        RecursiveGaussianKernel::default()
            .compute(&request, &mut exact)
            .unwrap();

        for j in 1..4 {
            assert_relative_eq!(
                lhp.value(0, 1, j),
                exact.value(0, 1, j),
                epsilon = 5e-3
            );
        }
    }
}
