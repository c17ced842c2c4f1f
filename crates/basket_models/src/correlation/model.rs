//! Correlation model kinds and mutation operations.

use crate::error::ModelError;

/// The supported factor-correlation model kinds.
///
/// Loadings are factor loadings `a ∈ [-1, 1]`; the pairwise default
/// correlation between two names with loadings `a_i`, `a_j` is
/// `a_i * a_j`.
///
/// # Variants
///
/// - `SingleFactor`: one loading shared by every name
/// - `MultiFactor`: one loading per name
/// - `TermStructured`: loading as a step function of tenor
/// - `Mixed`: convex blend of two models on the pairwise correlation
///   scale
#[derive(Debug, Clone, PartialEq)]
pub enum CorrelationStructure {
    /// One loading shared by every name.
    SingleFactor {
        /// Factor loading in [-1, 1]
        loading: f64,
    },
    /// One loading per name.
    MultiFactor {
        /// Per-name factor loadings, each in [-1, 1]
        loadings: Vec<f64>,
    },
    /// Loading as a right-continuous step function of tenor.
    TermStructured {
        /// Strictly increasing positive tenors (years)
        tenors: Vec<f64>,
        /// Loading applying up to and including each tenor
        loadings: Vec<f64>,
    },
    /// Convex blend of two models on the pairwise correlation scale.
    Mixed {
        /// Weight of the first model in [0, 1]
        weight: f64,
        /// First component
        first: Box<CorrelationStructure>,
        /// Second component
        second: Box<CorrelationStructure>,
    },
}

impl CorrelationStructure {
    fn validate(&self) -> Result<(), ModelError> {
        let check_loading = |a: f64| -> Result<(), ModelError> {
            if !a.is_finite() || !(-1.0..=1.0).contains(&a) {
                return Err(ModelError::Validation(format!(
                    "factor loading must lie in [-1, 1], got {}",
                    a
                )));
            }
            Ok(())
        };
        match self {
            CorrelationStructure::SingleFactor { loading } => check_loading(*loading),
            CorrelationStructure::MultiFactor { loadings } => {
                if loadings.is_empty() {
                    return Err(ModelError::Validation(
                        "multi-factor model needs at least one loading".to_string(),
                    ));
                }
                loadings.iter().try_for_each(|&a| check_loading(a))
            }
            CorrelationStructure::TermStructured { tenors, loadings } => {
                if tenors.is_empty() || tenors.len() != loadings.len() {
                    return Err(ModelError::Validation(format!(
                        "term structure needs matching non-empty tenors/loadings, got {}/{}",
                        tenors.len(),
                        loadings.len()
                    )));
                }
                if tenors[0] <= 0.0 {
                    return Err(ModelError::Validation(format!(
                        "tenors must be positive, got {}",
                        tenors[0]
                    )));
                }
                for w in tenors.windows(2) {
                    if w[1] <= w[0] {
                        return Err(ModelError::Validation(
                            "tenors must be strictly increasing".to_string(),
                        ));
                    }
                }
                loadings.iter().try_for_each(|&a| check_loading(a))
            }
            CorrelationStructure::Mixed {
                weight,
                first,
                second,
            } => {
                if !weight.is_finite() || !(0.0..=1.0).contains(weight) {
                    return Err(ModelError::Validation(format!(
                        "mixture weight must lie in [0, 1], got {}",
                        weight
                    )));
                }
                first.validate()?;
                second.validate()
            }
        }
    }

    /// Per-name loadings at tenor `t` for a basket of `n_names`.
    fn loadings_at(&self, t: f64, n_names: usize) -> Result<Vec<f64>, ModelError> {
        match self {
            CorrelationStructure::SingleFactor { loading } => Ok(vec![*loading; n_names]),
            CorrelationStructure::MultiFactor { loadings } => {
                if loadings.len() != n_names {
                    return Err(ModelError::Validation(format!(
                        "multi-factor model has {} loadings for a basket of {}",
                        loadings.len(),
                        n_names
                    )));
                }
                Ok(loadings.clone())
            }
            CorrelationStructure::TermStructured { tenors, loadings } => {
                let idx = tenors.partition_point(|&tenor| tenor < t);
                let a = loadings[idx.min(loadings.len() - 1)];
                Ok(vec![a; n_names])
            }
            CorrelationStructure::Mixed {
                weight,
                first,
                second,
            } => {
                let a1 = first.loadings_at(t, n_names)?;
                let a2 = second.loadings_at(t, n_names)?;
                // Blend on the pairwise correlation scale, keep the sign
                // of the dominant component.
                Ok(a1
                    .iter()
                    .zip(&a2)
                    .map(|(&x, &y)| {
                        let rho = weight * x * x + (1.0 - weight) * y * y;
                        let sign = if *weight >= 0.5 { x.signum() } else { y.signum() };
                        sign * rho.sqrt()
                    })
                    .collect())
            }
        }
    }

    /// Apply `f` to every pairwise correlation (loading²), returning the
    /// accumulated (sum, count) of realized changes.
    fn map_correlations<F: Fn(f64) -> f64 + Copy>(&mut self, f: F) -> (f64, usize) {
        let bump = |a: &mut f64| -> f64 {
            let rho = *a * *a;
            let bumped = f(rho).clamp(0.0, 1.0);
            *a = a.signum() * bumped.sqrt();
            bumped - rho
        };
        match self {
            CorrelationStructure::SingleFactor { loading } => (bump(loading), 1),
            CorrelationStructure::MultiFactor { loadings }
            | CorrelationStructure::TermStructured { loadings, .. } => {
                let mut sum = 0.0;
                for a in loadings.iter_mut() {
                    sum += bump(a);
                }
                (sum, loadings.len())
            }
            CorrelationStructure::Mixed { first, second, .. } => {
                let (s1, c1) = first.map_correlations(f);
                let (s2, c2) = second.map_correlations(f);
                (s1 + s2, c1 + c2)
            }
        }
    }

    fn subset(&self, picks: &[bool]) -> Self {
        match self {
            CorrelationStructure::MultiFactor { loadings } => CorrelationStructure::MultiFactor {
                loadings: loadings
                    .iter()
                    .zip(picks)
                    .filter(|(_, &keep)| keep)
                    .map(|(&a, _)| a)
                    .collect(),
            },
            CorrelationStructure::Mixed {
                weight,
                first,
                second,
            } => CorrelationStructure::Mixed {
                weight: *weight,
                first: Box::new(first.subset(picks)),
                second: Box::new(second.subset(picks)),
            },
            other => other.clone(),
        }
    }
}

/// Versioned factor-correlation model.
///
/// The version counter replaces the original engine family's "Modified"
/// side-channel flag: every mutation increments it, and consumers cache
/// derived term structures keyed by the version they resolved.
///
/// # Example
///
/// ```
/// use basket_models::correlation::{CorrelationModel, CorrelationStructure};
///
/// let mut model = CorrelationModel::new(
///     CorrelationStructure::SingleFactor { loading: 0.5 },
/// ).unwrap();
/// let v0 = model.version();
/// model.set_factor(5.0, 0.6).unwrap();
/// assert!(model.version() > v0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationModel {
    structure: CorrelationStructure,
    version: u64,
}

impl CorrelationModel {
    /// Construct a validated correlation model.
    pub fn new(structure: CorrelationStructure) -> Result<Self, ModelError> {
        structure.validate()?;
        Ok(Self {
            structure,
            version: 0,
        })
    }

    /// Convenience constructor for a uniform single-factor model with
    /// pairwise correlation `rho` (loading = √rho).
    pub fn single_factor_correlation(rho: f64) -> Result<Self, ModelError> {
        if !rho.is_finite() || !(0.0..=1.0).contains(&rho) {
            return Err(ModelError::Validation(format!(
                "pairwise correlation must lie in [0, 1], got {}",
                rho
            )));
        }
        Self::new(CorrelationStructure::SingleFactor {
            loading: rho.sqrt(),
        })
    }

    /// The model structure.
    #[inline]
    pub fn structure(&self) -> &CorrelationStructure {
        &self.structure
    }

    /// The mutation version counter.
    #[inline]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Per-name factor loadings at tenor `t` for a basket of `n_names`.
    pub fn loadings_at(&self, t: f64, n_names: usize) -> Result<Vec<f64>, ModelError> {
        self.structure.loadings_at(t, n_names)
    }

    /// Force a uniform pairwise correlation of `value²` for every pair
    /// and tenor at or beyond `maturity`.
    ///
    /// All model kinds collapse to a single-factor model with loading
    /// `value`; the maturity must be non-negative.
    pub fn set_factor(&mut self, maturity: f64, value: f64) -> Result<(), ModelError> {
        if !maturity.is_finite() || maturity < 0.0 {
            return Err(ModelError::Validation(format!(
                "set_factor maturity must be non-negative, got {}",
                maturity
            )));
        }
        let forced = CorrelationStructure::SingleFactor { loading: value };
        forced.validate()?;
        self.structure = forced;
        self.version += 1;
        Ok(())
    }

    /// Bump every pairwise correlation by `size` (relative or absolute),
    /// clamping into [0, 1].
    ///
    /// # Returns
    ///
    /// The realized average correlation change, which may be smaller
    /// than requested at the clamp boundaries.
    pub fn bump_correlations(&mut self, size: f64, relative: bool) -> f64 {
        let (sum, count) = if relative {
            self.structure.map_correlations(|rho| rho * (1.0 + size))
        } else {
            self.structure.map_correlations(|rho| rho + size)
        };
        let realized = if count == 0 { 0.0 } else { sum / count as f64 };
        if realized != 0.0 {
            self.version += 1;
        }
        realized
    }

    /// Restrict the model to the active name subset.
    ///
    /// Only multi-factor loadings are filtered; uniform models are
    /// unchanged. The restricted model starts a fresh version history.
    pub fn subset(&self, picks: &[bool]) -> Result<Self, ModelError> {
        Self::new(self.structure.subset(picks))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_factor_validation() {
        assert!(CorrelationModel::new(CorrelationStructure::SingleFactor { loading: 0.5 }).is_ok());
        assert!(
            CorrelationModel::new(CorrelationStructure::SingleFactor { loading: 1.5 }).is_err()
        );
    }

    #[test]
    fn test_single_factor_correlation_constructor() {
        let model = CorrelationModel::single_factor_correlation(0.3).unwrap();
        let loadings = model.loadings_at(1.0, 3).unwrap();
        assert_eq!(loadings.len(), 3);
        assert!((loadings[0] * loadings[1] - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_multi_factor_size_check() {
        let model = CorrelationModel::new(CorrelationStructure::MultiFactor {
            loadings: vec![0.3, 0.4],
        })
        .unwrap();
        assert!(model.loadings_at(1.0, 3).is_err());
        assert_eq!(model.loadings_at(1.0, 2).unwrap(), vec![0.3, 0.4]);
    }

    #[test]
    fn test_term_structured_step_lookup() {
        let model = CorrelationModel::new(CorrelationStructure::TermStructured {
            tenors: vec![1.0, 5.0],
            loadings: vec![0.3, 0.6],
        })
        .unwrap();
        assert_eq!(model.loadings_at(0.5, 1).unwrap(), vec![0.3]);
        assert_eq!(model.loadings_at(1.0, 1).unwrap(), vec![0.3]);
        assert_eq!(model.loadings_at(3.0, 1).unwrap(), vec![0.6]);
        // Flat beyond the last tenor.
        assert_eq!(model.loadings_at(10.0, 1).unwrap(), vec![0.6]);
    }

    #[test]
    fn test_term_structured_rejects_unsorted() {
        assert!(CorrelationModel::new(CorrelationStructure::TermStructured {
            tenors: vec![5.0, 1.0],
            loadings: vec![0.3, 0.6],
        })
        .is_err());
    }

    #[test]
    fn test_mixed_blends_pairwise_correlation() {
        let model = CorrelationModel::new(CorrelationStructure::Mixed {
            weight: 0.5,
            first: Box::new(CorrelationStructure::SingleFactor { loading: 0.6 }),
            second: Box::new(CorrelationStructure::SingleFactor { loading: 0.8 }),
        })
        .unwrap();
        let a = model.loadings_at(1.0, 1).unwrap()[0];
        // rho = 0.5*0.36 + 0.5*0.64 = 0.5
        assert!((a * a - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_set_factor_forces_uniform_and_bumps_version() {
        let mut model = CorrelationModel::new(CorrelationStructure::MultiFactor {
            loadings: vec![0.2, 0.7],
        })
        .unwrap();
        let v0 = model.version();
        model.set_factor(5.0, 0.5).unwrap();
        assert_eq!(model.version(), v0 + 1);
        let loadings = model.loadings_at(1.0, 4).unwrap();
        assert!(loadings.iter().all(|&a| (a - 0.5).abs() < 1e-12));
        // Pairwise correlation is value².
        assert!((loadings[0] * loadings[1] - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_set_factor_rejects_bad_inputs() {
        let mut model = CorrelationModel::single_factor_correlation(0.3).unwrap();
        assert!(model.set_factor(-1.0, 0.5).is_err());
        assert!(model.set_factor(1.0, 1.5).is_err());
    }

    #[test]
    fn test_bump_correlations_absolute() {
        let mut model = CorrelationModel::single_factor_correlation(0.25).unwrap();
        let realized = model.bump_correlations(0.1, false);
        assert!((realized - 0.1).abs() < 1e-12);
        let a = model.loadings_at(1.0, 1).unwrap()[0];
        assert!((a * a - 0.35).abs() < 1e-12);
    }

    #[test]
    fn test_bump_correlations_clamped_at_one() {
        let mut model = CorrelationModel::single_factor_correlation(0.95).unwrap();
        let realized = model.bump_correlations(0.2, false);
        assert!((realized - 0.05).abs() < 1e-12);
    }

    #[test]
    fn test_bump_correlations_relative() {
        let mut model = CorrelationModel::single_factor_correlation(0.2).unwrap();
        let realized = model.bump_correlations(0.5, true);
        assert!((realized - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_zero_bump_keeps_version() {
        let mut model = CorrelationModel::single_factor_correlation(0.2).unwrap();
        let v0 = model.version();
        let realized = model.bump_correlations(0.0, false);
        assert_eq!(realized, 0.0);
        assert_eq!(model.version(), v0);
    }

    #[test]
    fn test_subset_filters_multi_factor() {
        let model = CorrelationModel::new(CorrelationStructure::MultiFactor {
            loadings: vec![0.1, 0.2, 0.3],
        })
        .unwrap();
        let sub = model.subset(&[true, false, true]).unwrap();
        assert_eq!(sub.loadings_at(1.0, 2).unwrap(), vec![0.1, 0.3]);
    }

    #[test]
    fn test_subset_uniform_unchanged() {
        let model = CorrelationModel::single_factor_correlation(0.3).unwrap();
        let sub = model.subset(&[true, false]).unwrap();
        assert_eq!(sub.structure(), model.structure());
    }

    mod properties {
        use proptest::prelude::*;

        use super::super::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(500))]

            #[test]
            fn test_bumps_keep_loadings_in_range(
                rho in 0.0f64..1.0,
                size in -2.0f64..2.0,
                relative in proptest::bool::ANY,
            ) {
                let mut model = CorrelationModel::single_factor_correlation(rho).unwrap();
                model.bump_correlations(size, relative);
                for a in model.loadings_at(1.0, 3).unwrap() {
                    prop_assert!((-1.0..=1.0).contains(&a));
                }
            }

            #[test]
            fn test_set_factor_forces_uniform_loading(
                rho in 0.0f64..1.0,
                value in -1.0f64..1.0,
            ) {
                let mut model = CorrelationModel::new(CorrelationStructure::MultiFactor {
                    loadings: vec![0.1, rho.sqrt(), 0.3],
                })
                .unwrap();
                let before = model.version();
                model.set_factor(5.0, value).unwrap();
                prop_assert!(model.version() > before);
                for a in model.loadings_at(2.0, 3).unwrap() {
                    prop_assert!((a - value).abs() < 1e-12);
                }
            }
        }
    }
}
