//! Exact bucket-recursion kernel under a Gaussian one-factor copula.

use gauss_quad::GaussHermite;
use statrs::distribution::{ContinuousCDF, Normal};

use basket_core::market_data::curves::SurvivalCurve;
use basket_models::copula::CopulaSpec;

use crate::error::EngineError;
use crate::kernel::{DistributionKernel, KernelRequest};
use crate::surface::{DistributionSurface, SurfaceMeasure};

/// Conditional variance floor guarding the |loading| -> 1 limit.
const MIN_COND_VARIANCE: f64 = 1e-12;

/// Exact loss distribution by conditional-independence recursion.
///
/// Conditional on the systemic factor the names default independently,
/// so the portfolio loss distribution is a convolution of per-name
/// two-point (or, with recovery dispersion, three-point) distributions.
/// The convolution runs on a fixed loss bucket grid and is integrated
/// over the factor with Gauss-Hermite quadrature.
///
/// Complexity is O(nodes × names × buckets) per time column.
#[derive(Debug, Clone)]
pub struct RecursiveGaussianKernel {
    quadrature_order: usize,
}

impl Default for RecursiveGaussianKernel {
    fn default() -> Self {
        Self {
            quadrature_order: 32,
        }
    }
}

impl RecursiveGaussianKernel {
    /// Build a kernel with the given Gauss-Hermite order.
    ///
    /// # Arguments
    ///
    /// * `quadrature_order` - Node count for the factor integral, at
    ///   least 2
    pub fn new(quadrature_order: usize) -> Result<Self, EngineError> {
        if quadrature_order < 2 {
            return Err(EngineError::Validation(format!(
                "quadrature order must be at least 2, got {}",
                quadrature_order
            )));
        }
        Ok(Self { quadrature_order })
    }

    /// Bucket width used when the request leaves the grid to the kernel.
    fn default_grid_size(request: &KernelRequest<'_>) -> f64 {
        let total: f64 = request.principals.iter().sum();
        if total <= 0.0 || request.principals.is_empty() {
            return 0.01;
        }
        let avg_unit = total / request.principals.len() as f64 / total;
        (avg_unit / 2.0).clamp(1e-4, 0.5)
    }
}

/// One conditional default event: probability weight scale and bucket
/// shift.
struct LossEvent {
    /// Fraction of the name's conditional default probability.
    weight: f64,
    /// Bucket shift on default.
    shift: usize,
}

impl DistributionKernel for RecursiveGaussianKernel {
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
                    "recursive kernel supports the Gaussian copula only, got Student-t (dof = {})",
                    dof
                )));
            }
        }

        let n = request.pool.len();
        let total: f64 = request.principals.iter().sum();
        if total <= 0.0 {
            return Err(EngineError::Validation(
                "kernel requires positive total principal".to_string(),
            ));
        }

        let unit = if request.grid_size > 0.0 {
            request.grid_size
        } else {
            Self::default_grid_size(request)
        };
        let n_buckets = (1.0 / unit).ceil() as usize + 1;

        let normal = Normal::new(0.0, 1.0).expect("standard normal must be valid");
        let quad = GaussHermite::new(self.quadrature_order)
            .map_err(|e| EngineError::Numerical(format!("Gauss-Hermite setup failed: {}", e)))?;
        let nodes: Vec<(f64, f64)> = quad
            .as_node_weight_pairs()
            .iter()
            .map(|&(x, w)| (std::f64::consts::SQRT_2 * x, w / std::f64::consts::PI.sqrt()))
            .collect();

        let mut dist = vec![0.0; n_buckets];
        let mut cond = vec![0.0; n_buckets];
        let mut events: Vec<Vec<LossEvent>> = Vec::with_capacity(n);
        let mut thresholds = vec![0.0; n];

        for time_idx in request.start_index..request.stop_index {
            let t = request.times[time_idx];
            let loadings = request.factors.loadings(time_idx);

            // Per-name default probabilities and bucketed severity events.
            events.clear();
            for (k, name) in request.pool.names().iter().enumerate() {
                let p = name.survival().default_probability(t)?;
                thresholds[k] = if p <= 0.0 {
                    f64::NEG_INFINITY
                } else if p >= 1.0 {
                    f64::INFINITY
                } else {
                    normal.inverse_cdf(p)
                };

                let recovery = name.recovery().recovery(t)?;
                let dispersion = name.recovery().dispersion();
                let weight = request.principals[k] / total;
                let amount = |r: f64| match request.measure {
                    SurfaceMeasure::Probability | SurfaceMeasure::ExpectedLoss => {
                        (1.0 - r) * weight
                    }
                    SurfaceMeasure::ExpectedRecovery => r * weight,
                };
                let shift = |a: f64| ((a / unit).round() as usize).min(n_buckets - 1);
                if dispersion > 0.0 {
                    let lo = (recovery - dispersion).clamp(0.0, 1.0);
                    let hi = (recovery + dispersion).clamp(0.0, 1.0);
                    events.push(vec![
                        LossEvent {
                            weight: 0.5,
                            shift: shift(amount(lo)),
                        },
                        LossEvent {
                            weight: 0.5,
                            shift: shift(amount(hi)),
                        },
                    ]);
                } else {
                    events.push(vec![LossEvent {
                        weight: 1.0,
                        shift: shift(amount(recovery)),
                    }]);
                }
            }

            dist.iter_mut().for_each(|v| *v = 0.0);
            for &(m, node_weight) in &nodes {
                cond.iter_mut().for_each(|v| *v = 0.0);
                cond[0] = 1.0;
                let mut top = 0usize;
                for k in 0..n {
                    let a = loadings[k];
                    let q = if thresholds[k] == f64::NEG_INFINITY {
                        0.0
                    } else if thresholds[k] == f64::INFINITY {
                        1.0
                    } else {
                        let denom = (1.0 - a * a).max(MIN_COND_VARIANCE).sqrt();
                        normal.cdf((thresholds[k] - a * m) / denom)
                    };
                    if q == 0.0 {
                        continue;
                    }
                    let max_shift = events[k].iter().map(|e| e.shift).max().unwrap_or(0);
                    let new_top = (top + max_shift).min(n_buckets - 1);
                    for j in (0..=top).rev() {
                        let mass = cond[j];
                        if mass == 0.0 {
                            continue;
                        }
                        cond[j] = mass * (1.0 - q);
                        for event in &events[k] {
                            let target = (j + event.shift).min(n_buckets - 1);
                            cond[target] += mass * q * event.weight;
                        }
                    }
                    top = new_top;
                }
                for (d, c) in dist.iter_mut().zip(cond.iter()) {
                    *d += node_weight * c;
                }
            }

            let levels = surface.levels().to_vec();
            for (level_idx, &level) in levels.iter().enumerate() {
                let value = match request.measure {
                    SurfaceMeasure::Probability => dist
                        .iter()
                        .enumerate()
                        .filter(|&(j, _)| j as f64 * unit <= level + 0.5 * unit)
                        .map(|(_, &p)| p)
                        .sum::<f64>()
                        .min(1.0),
                    SurfaceMeasure::ExpectedLoss | SurfaceMeasure::ExpectedRecovery => dist
                        .iter()
                        .enumerate()
                        .map(|(j, &p)| p * (j as f64 * unit).min(level))
                        .sum::<f64>(),
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

    fn pool(n: usize, hazard: f64, recovery: f64) -> CreditPool {
        let curve = Arc::new(SurvivalCurveEnum::from(
            FlatHazardCurve::new(hazard).unwrap(),
        ));
        let names = (0..n)
            .map(|i| {
                CreditName::new(
                    format!("NAME{}", i),
                    Arc::clone(&curve),
                    RecoveryCurve::flat(recovery, 0.0).unwrap(),
                    100.0,
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
        grid_size: f64,
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
            grid_size,
        };
        RecursiveGaussianKernel::default()
            .compute(&request, &mut surface)
            .unwrap();
        surface
    }

    #[test]
    fn test_zero_time_column_is_trivial() {
        let pool = pool(5, 0.02, 0.4);
        let s = fill(
            SurfaceMeasure::Probability,
            &pool,
            0.3,
            &[0.0, 5.0],
            &[0.0, 0.5, 1.0],
            0.01,
        );
        // No defaults at time zero.
        assert_relative_eq!(s.value(0, 0, 0), 1.0, epsilon = 1e-12);
        assert_relative_eq!(s.value(0, 0, 2), 1.0, epsilon = 1e-12);

        let s = fill(
            SurfaceMeasure::ExpectedLoss,
            &pool,
            0.3,
            &[0.0, 5.0],
            &[0.0, 0.5, 1.0],
            0.01,
        );
        assert_relative_eq!(s.value(0, 0, 2), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_independent_single_name_matches_closed_form() {
        // One name, no correlation: E[min(L, 1)] = p * (1 - R).
        let pool = pool(1, 0.05, 0.4);
        let t = 3.0;
        let p = 1.0 - (-0.05f64 * t).exp();
        let s = fill(
            SurfaceMeasure::ExpectedLoss,
            &pool,
            0.0,
            &[0.0, t],
            &[0.0, 0.3, 1.0],
            0.001,
        );
        assert_relative_eq!(s.value(0, 1, 2), p * 0.6, epsilon = 1e-6);
        // Capped at 0.3 the expectation truncates to p * 0.3.
        assert_relative_eq!(s.value(0, 1, 1), p * 0.3, epsilon = 1e-6);
    }

    #[test]
    fn test_expected_loss_increases_with_time() {
        let pool = pool(5, 0.02, 0.4);
        let s = fill(
            SurfaceMeasure::ExpectedLoss,
            &pool,
            0.3,
            &[0.0, 1.0, 3.0, 5.0],
            &[0.0, 0.1, 0.3, 1.0],
            0.005,
        );
        for level_idx in 1..4 {
            for i in 1..4 {
                assert!(
                    s.value(0, i, level_idx) >= s.value(0, i - 1, level_idx) - 1e-12,
                    "expected loss must grow with horizon"
                );
            }
        }
    }

    #[test]
    fn test_probability_masses_sum_to_one() {
        let pool = pool(5, 0.02, 0.4);
        let s = fill(
            SurfaceMeasure::Probability,
            &pool,
            0.3,
            &[0.0, 5.0],
            &[0.0, 0.5, 1.0],
            0.01,
        );
        assert_relative_eq!(s.value(0, 1, 2), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_correlation_fattens_the_tail() {
        // Senior expected tranche loss E[min(L,1)] - E[min(L,0.3)] grows
        // with correlation.
        let pool = pool(10, 0.03, 0.4);
        let times = [0.0, 5.0];
        let levels = [0.0, 0.3, 1.0];
        let low = fill(
            SurfaceMeasure::ExpectedLoss,
            &pool,
            0.05,
            &times,
            &levels,
            0.005,
        );
        let high = fill(
            SurfaceMeasure::ExpectedLoss,
            &pool,
            0.7,
            &times,
            &levels,
            0.005,
        );
        let senior_low = low.value(0, 1, 2) - low.value(0, 1, 1);
        let senior_high = high.value(0, 1, 2) - high.value(0, 1, 1);
        assert!(
            senior_high > senior_low,
            "higher correlation must load the senior tranche"
        );
    }

    #[test]
    fn test_recovery_surface_complements_loss() {
        // With deterministic recoveries, E[L] + E[A] = p at full level.
        let pool = pool(4, 0.04, 0.35);
        let t = 2.0;
        let p = 1.0 - (-0.04f64 * t).exp();
        let loss = fill(
            SurfaceMeasure::ExpectedLoss,
            &pool,
            0.3,
            &[0.0, t],
            &[0.0, 1.0],
            0.001,
        );
        let rec = fill(
            SurfaceMeasure::ExpectedRecovery,
            &pool,
            0.3,
            &[0.0, t],
            &[0.0, 1.0],
            0.001,
        );
        assert_relative_eq!(
            loss.value(0, 1, 1) + rec.value(0, 1, 1),
            p,
            epsilon = 1e-4
        );
    }

    #[test]
    fn test_recovery_dispersion_preserves_the_mean() {
        let base = pool(1, 0.05, 0.4);
        let curve = Arc::clone(base.name(0).survival());
        let dispersed = CreditPool::new(vec![CreditName::new(
            "NAME0",
            curve,
            RecoveryCurve::flat(0.4, 0.2).unwrap(),
            100.0,
        )
        .unwrap()])
        .unwrap();
        let t = 3.0;
        let flat = fill(
            SurfaceMeasure::ExpectedLoss,
            &base,
            0.0,
            &[0.0, t],
            &[0.0, 1.0],
            0.001,
        );
        let split = fill(
            SurfaceMeasure::ExpectedLoss,
            &dispersed,
            0.0,
            &[0.0, t],
            &[0.0, 1.0],
            0.001,
        );
        assert_relative_eq!(
            flat.value(0, 1, 1),
            split.value(0, 1, 1),
            epsilon = 1e-6
        );
    }

    #[test]
    fn test_student_t_is_unsupported() {
        let pool = pool(2, 0.02, 0.4);
        let model = CorrelationModel::single_factor_correlation(0.3).unwrap();
        let times = [0.0, 1.0];
        let factors = FactorTermStructure::resolve(&model, &times, 2).unwrap();
        let principals = [100.0, 100.0];
        let mut surface = DistributionSurface::new(
            SurfaceMeasure::ExpectedLoss,
            times.to_vec(),
            vec![0.0, 1.0],
            1,
        )
        .unwrap();
        let request = KernelRequest {
            measure: SurfaceMeasure::ExpectedLoss,
            start_index: 0,
            stop_index: 2,
            copula: CopulaSpec::StudentT { dof: 4.0 },
            factors: &factors,
            pool: &pool,
            principals: &principals,
            times: &times,
            grid_size: 0.01,
        };
        let err = RecursiveGaussianKernel::default()
            .compute(&request, &mut surface)
            .unwrap_err();
        assert!(matches!(err, EngineError::Unsupported(_)));
    }
}
