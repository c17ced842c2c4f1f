//! The direct heterogeneous-pool loss engine.

use std::sync::Arc;

use tracing::debug;

use basket_core::market_data::curves::{RecoveryCurve, SurvivalCurveEnum};
use basket_core::settings::EngineSettings;
use basket_core::types::{Date, DayCountConvention, TimeStep, TimeUnit};
use basket_models::copula::CopulaSpec;
use basket_models::correlation::{CorrelationModel, FactorTermStructure};
use basket_models::pool::CreditPool;

use crate::engine::LossEngine;
use crate::error::EngineError;
use crate::kernel::{DistributionKernel, KernelRequest, RecursiveGaussianKernel};
use crate::surface::{DistributionSurface, SurfaceMeasure};

/// Remaining-basket fractions below this are treated as fully resolved.
const MIN_BASKET_FACTOR: f64 = 1e-12;

/// Tolerance handed to surface monotonicity enforcement.
const MONOTONICITY_TOL: f64 = 1e-9;

/// Everything needed to build a [`HeterogeneousBasket`].
///
/// Construction inputs are bundled here so the engine constructor stays
/// a single fallible call; optional pieces have `with_*` setters.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use basket_core::market_data::curves::{FlatHazardCurve, RecoveryCurve, SurvivalCurveEnum};
/// use basket_core::types::Date;
/// use basket_engine::engine::{BasketDefinition, HeterogeneousBasket, LossEngine};
/// use basket_models::correlation::CorrelationModel;
/// use basket_models::pool::CreditPool;
///
/// let curve: Arc<SurvivalCurveEnum> =
///     Arc::new(FlatHazardCurve::new(0.02).unwrap().into());
/// let pool = CreditPool::from_curves(
///     vec![Arc::clone(&curve); 5],
///     vec![RecoveryCurve::flat(0.4, 0.0).unwrap(); 5],
///     vec![100.0; 5],
/// )
/// .unwrap();
/// let definition = BasketDefinition::new(
///     Date::from_ymd(2024, 1, 2).unwrap(),
///     Date::from_ymd(2024, 1, 4).unwrap(),
///     Date::from_ymd(2029, 1, 4).unwrap(),
///     pool,
///     CorrelationModel::single_factor_correlation(0.3).unwrap(),
/// )
/// .with_levels(vec![0.1]);
/// let engine = HeterogeneousBasket::new(definition).unwrap();
/// assert_eq!(engine.pool().len(), 5);
/// ```
#[derive(Debug, Clone)]
pub struct BasketDefinition {
    /// Valuation date.
    pub as_of: Date,
    /// Settlement date; default cutoff for removing settled defaults.
    pub settlement: Date,
    /// Basket maturity.
    pub maturity: Date,
    /// The credit pool.
    pub pool: CreditPool,
    /// Correlation model shared by all surface builds.
    pub correlation: CorrelationModel,
    /// Dependence family handed to the kernel.
    pub copula: CopulaSpec,
    /// Day count for the time axis.
    pub day_count: DayCountConvention,
    /// Date grid step.
    pub step: TimeStep,
    /// Tranche levels of interest, as fractions of total principal.
    pub levels: Vec<f64>,
    /// Engine configuration.
    pub settings: EngineSettings,
    /// Distribution kernel back-end.
    pub kernel: Arc<dyn DistributionKernel>,
}

impl BasketDefinition {
    /// Start a definition with defaults for copula (Gaussian), day
    /// count (Act/365F), step (3 months), levels (none), settings, and
    /// kernel (recursive Gaussian).
    pub fn new(
        as_of: Date,
        settlement: Date,
        maturity: Date,
        pool: CreditPool,
        correlation: CorrelationModel,
    ) -> Self {
        Self {
            as_of,
            settlement,
            maturity,
            pool,
            correlation,
            copula: CopulaSpec::Gaussian,
            day_count: DayCountConvention::default(),
            step: TimeStep::new(3, TimeUnit::Months).expect("static step size is positive"),
            levels: Vec::new(),
            settings: EngineSettings::default(),
            kernel: Arc::new(RecursiveGaussianKernel::default()),
        }
    }

    /// Set the copula specification.
    pub fn with_copula(mut self, copula: CopulaSpec) -> Self {
        self.copula = copula;
        self
    }

    /// Set the day count convention.
    pub fn with_day_count(mut self, day_count: DayCountConvention) -> Self {
        self.day_count = day_count;
        self
    }

    /// Set the date grid step.
    pub fn with_step(mut self, step: TimeStep) -> Self {
        self.step = step;
        self
    }

    /// Set the tranche levels of interest.
    pub fn with_levels(mut self, levels: Vec<f64>) -> Self {
        self.levels = levels;
        self
    }

    /// Set the engine configuration.
    pub fn with_settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Set the distribution kernel.
    pub fn with_kernel(mut self, kernel: Arc<dyn DistributionKernel>) -> Self {
        self.kernel = kernel;
        self
    }
}

/// Cached lazily-built state, dropped by [`HeterogeneousBasket::reset`].
#[derive(Debug, Clone, Default)]
struct SurfaceCache {
    /// Resolved loadings keyed by the correlation model version.
    term_structure: Option<(u64, FactorTermStructure)>,
    loss: Option<DistributionSurface>,
    probability: Option<DistributionSurface>,
    recovery: Option<DistributionSurface>,
}

/// State derived from the pool and dates at (re)build time.
#[derive(Debug, Clone)]
struct DerivedState {
    /// Active sub-pool; `None` when every name has been removed.
    active: Option<CreditPool>,
    /// Active-name mask over the original pool.
    picks: Vec<bool>,
    /// Scaled absolute principals aligned with the active pool.
    scaled_principals: Vec<f64>,
    /// Realized loss as a fraction of total principal.
    previous_loss: f64,
    /// Realized amortization as a fraction of total principal.
    previous_amortization: f64,
    /// Absolute short principal as a fraction of total principal.
    shorted_fraction: f64,
    /// Total basket principal in currency units.
    total_principal: f64,
    /// Date grid from the calculation start to maturity.
    dates: Vec<Date>,
    /// Year fractions of `dates`; first entry 0.
    times: Vec<f64>,
    /// Effective surface level axis.
    levels: Vec<f64>,
}

/// Direct loss engine over a heterogeneous credit pool.
///
/// Surfaces of cumulative loss statistics are built lazily by the
/// configured [`DistributionKernel`] and cached until [`reset`]. The
/// engine keeps the original pool immutable and prices on a filtered
/// active copy, folding already-settled defaults into realized loss and
/// amortization fractions.
///
/// [`reset`]: LossEngine::reset
#[derive(Debug, Clone)]
pub struct HeterogeneousBasket {
    definition: BasketDefinition,
    derived: DerivedState,
    cache: SurfaceCache,
}

impl HeterogeneousBasket {
    /// Build the engine, validating the definition and deriving the
    /// active pool, realized fractions, and surface axes.
    ///
    /// # Returns
    ///
    /// * `Err(EngineError::Validation)` - Inconsistent dates, levels
    ///   outside `[0, 1]`, or grid size outside `[0, 0.5]`
    pub fn new(definition: BasketDefinition) -> Result<Self, EngineError> {
        if definition.as_of > definition.settlement {
            return Err(EngineError::Validation(format!(
                "as-of date {} is after settlement {}",
                definition.as_of, definition.settlement
            )));
        }
        if definition.settlement >= definition.maturity {
            return Err(EngineError::Validation(format!(
                "settlement {} is not before maturity {}",
                definition.settlement, definition.maturity
            )));
        }
        for &level in &definition.levels {
            if !level.is_finite() || !(0.0..=1.0).contains(&level) {
                return Err(EngineError::Validation(format!(
                    "tranche level {} outside [0, 1]",
                    level
                )));
            }
        }
        let grid = definition.settings.grid_size;
        if !grid.is_finite() || !(0.0..=0.5).contains(&grid) {
            return Err(EngineError::Validation(format!(
                "grid size {} outside [0, 0.5]",
                grid
            )));
        }

        let derived = Self::derive(&definition)?;
        Ok(Self {
            definition,
            derived,
            cache: SurfaceCache::default(),
        })
    }

    /// Recompute everything that depends on the pool and dates.
    fn derive(definition: &BasketDefinition) -> Result<DerivedState, EngineError> {
        let settings = &definition.settings;
        let total_principal = definition
            .pool
            .total_principal(settings.subtract_shorted_from_principal);
        if total_principal <= 0.0 {
            return Err(EngineError::Validation(
                "total principal must be positive".to_string(),
            ));
        }

        let cutoff = if settings.use_natural_settlement_date {
            definition.settlement
        } else {
            definition.as_of
        };
        let adjustment = definition
            .pool
            .default_adjustment(cutoff, settings.exact_jump_to_default)?;
        let previous_loss = adjustment.loss_amount / total_principal;
        let previous_amortization = adjustment.amortized_amount / total_principal;
        let shorted_fraction = if settings.subtract_shorted_from_principal {
            0.0
        } else {
            definition.pool.shorted_principal() / total_principal
        };

        let any_active = adjustment.picks.iter().any(|&p| p);
        let active = if any_active {
            Some(definition.pool.subset(&adjustment.picks)?)
        } else {
            None
        };

        // Scale principals so the average weight is at least one; loss
        // bucket rounding misbehaves on tiny absolute notionals.
        let scaled_principals = match &active {
            Some(pool) => {
                let abs: Vec<f64> = pool.names().iter().map(|n| n.principal().abs()).collect();
                let avg = abs.iter().sum::<f64>() / abs.len() as f64;
                if avg > 0.0 && avg < 1.0 {
                    abs.iter().map(|p| p / avg).collect()
                } else {
                    abs
                }
            }
            None => Vec::new(),
        };

        let start = cutoff;
        let dates = definition.step.grid(start, definition.maturity);
        let times: Vec<f64> = dates
            .iter()
            .map(|&d| definition.day_count.year_fraction(start, d))
            .collect();

        let remaining = 1.0 - previous_loss - previous_amortization;
        let basket_factor = Self::basket_factor_of(remaining, shorted_fraction, settings);
        let levels = Self::effective_levels(
            &definition.levels,
            previous_loss,
            previous_amortization,
            basket_factor,
            settings,
        );

        Ok(DerivedState {
            active,
            picks: adjustment.picks,
            scaled_principals,
            previous_loss,
            previous_amortization,
            shorted_fraction,
            total_principal,
            dates,
            times,
            levels,
        })
    }

    fn basket_factor_of(remaining: f64, shorted_fraction: f64, settings: &EngineSettings) -> f64 {
        if settings.subtract_shorted_from_principal {
            remaining
        } else {
            remaining - shorted_fraction
        }
    }

    /// Fraction of total principal still exposed to future defaults.
    fn basket_factor(&self) -> f64 {
        Self::basket_factor_of(
            1.0 - self.derived.previous_loss - self.derived.previous_amortization,
            self.derived.shorted_fraction,
            &self.definition.settings,
        )
    }

    /// Build the effective surface level axis from the user levels.
    ///
    /// Each user level is shifted past the realized loss and rescaled
    /// onto the remaining basket; the complements feed amortization
    /// queries. The axis always contains 0 and 1, is sorted, and is
    /// deduplicated at the configured rounding precision.
    fn effective_levels(
        user_levels: &[f64],
        previous_loss: f64,
        previous_amortization: f64,
        basket_factor: f64,
        settings: &EngineSettings,
    ) -> Vec<f64> {
        let mut levels = vec![0.0, 1.0];
        if basket_factor > MIN_BASKET_FACTOR {
            for &l in user_levels {
                let adjusted = ((l - previous_loss) / basket_factor).clamp(0.0, 1.0);
                levels.push(settings.round_level(adjusted));
                let complement =
                    (((1.0 - l) - previous_amortization) / basket_factor).clamp(0.0, 1.0);
                levels.push(settings.round_level(complement));
            }
        }
        levels.sort_by(|a, b| a.partial_cmp(b).expect("levels are finite"));
        levels.dedup_by(|a, b| settings.round_level(*a) == settings.round_level(*b));
        levels
    }

    fn time_of(&self, date: Date) -> f64 {
        let start = self.derived.dates[0];
        self.definition.day_count.year_fraction(start, date)
    }

    /// Resolve (or reuse) the factor term structure for the active pool.
    fn ensure_term_structure(&mut self) -> Result<(), EngineError> {
        let version = self.definition.correlation.version();
        if let Some((cached, _)) = &self.cache.term_structure {
            if *cached == version {
                return Ok(());
            }
        }
        let active = self
            .derived
            .active
            .as_ref()
            .ok_or_else(|| EngineError::InvalidState("no active names remain".to_string()))?;
        let active_model = self.definition.correlation.subset(&self.derived.picks)?;
        let resolved =
            FactorTermStructure::resolve(&active_model, &self.derived.times, active.len())?;
        debug!(
            version,
            tenors = self.derived.times.len(),
            names = active.len(),
            "resolved factor term structure"
        );
        self.cache.term_structure = Some((version, resolved));
        Ok(())
    }

    /// Build (or reuse) the surface for a measure and return it.
    fn ensure_surface(
        &mut self,
        measure: SurfaceMeasure,
    ) -> Result<&DistributionSurface, EngineError> {
        let built = match measure {
            SurfaceMeasure::Probability => self.cache.probability.is_some(),
            SurfaceMeasure::ExpectedLoss => self.cache.loss.is_some(),
            SurfaceMeasure::ExpectedRecovery => self.cache.recovery.is_some(),
        };
        if !built {
            self.ensure_term_structure()?;
            let active = self
                .derived
                .active
                .as_ref()
                .ok_or_else(|| EngineError::InvalidState("no active names remain".to_string()))?;
            let (_, factors) = self
                .cache
                .term_structure
                .as_ref()
                .expect("term structure resolved above");

            let mut surface = DistributionSurface::new(
                measure,
                self.derived.times.clone(),
                self.derived.levels.clone(),
                1,
            )?;
            let request = KernelRequest {
                measure,
                start_index: 0,
                stop_index: self.derived.times.len(),
                copula: self.definition.copula,
                factors,
                pool: active,
                principals: &self.derived.scaled_principals,
                times: &self.derived.times,
                grid_size: self.definition.settings.grid_size,
            };
            self.definition.kernel.compute(&request, &mut surface)?;
            surface.enforce_level_monotonicity(MONOTONICITY_TOL)?;
            debug!(
                ?measure,
                times = self.derived.times.len(),
                levels = self.derived.levels.len(),
                "built distribution surface"
            );
            match measure {
                SurfaceMeasure::Probability => self.cache.probability = Some(surface),
                SurfaceMeasure::ExpectedLoss => self.cache.loss = Some(surface),
                SurfaceMeasure::ExpectedRecovery => self.cache.recovery = Some(surface),
            }
        }
        Ok(match measure {
            SurfaceMeasure::Probability => self.cache.probability.as_ref(),
            SurfaceMeasure::ExpectedLoss => self.cache.loss.as_ref(),
            SurfaceMeasure::ExpectedRecovery => self.cache.recovery.as_ref(),
        }
        .expect("surface built above"))
    }

    /// Force a uniform pairwise correlation, used by the
    /// base-correlation composer. Pairwise correlation becomes
    /// `value * value`.
    pub fn set_factor(&mut self, maturity: f64, value: f64) -> Result<(), EngineError> {
        self.definition.correlation.set_factor(maturity, value)?;
        Ok(())
    }

    /// Bump every pairwise correlation, returning the realized average
    /// change on the correlation scale.
    pub fn bump_correlations(&mut self, size: f64, relative: bool) -> f64 {
        self.definition.correlation.bump_correlations(size, relative)
    }

    /// The correlation model driving the surfaces.
    pub fn correlation(&self) -> &CorrelationModel {
        &self.definition.correlation
    }

    /// The engine configuration.
    pub fn settings(&self) -> &EngineSettings {
        &self.definition.settings
    }

    /// The definition this engine was built from.
    pub fn definition(&self) -> &BasketDefinition {
        &self.definition
    }

    fn validate_tranche(begin: f64, end: f64) -> Result<(), EngineError> {
        if !begin.is_finite() || !end.is_finite() || begin < 0.0 || end > 1.0 || begin > end {
            return Err(EngineError::Validation(format!(
                "tranche [{}, {}] outside [0, 1] or inverted",
                begin, end
            )));
        }
        Ok(())
    }
}

impl LossEngine for HeterogeneousBasket {
    fn accumulated_loss(&mut self, date: Date, begin: f64, end: f64) -> Result<f64, EngineError> {
        Self::validate_tranche(begin, end)?;
        let previous_loss = self.derived.previous_loss;
        let total = self.derived.total_principal;

        // Losses eat the tranche from the attachment side; the part of
        // the tranche below the realized loss is already gone.
        let realized = (end.min(previous_loss) - begin.min(previous_loss)).max(0.0);

        let basket_factor = self.basket_factor();
        if basket_factor <= MIN_BASKET_FACTOR || self.derived.active.is_none() {
            return Ok(realized * total);
        }

        let settings = &self.definition.settings;
        let a = settings.round_level(((begin - previous_loss).max(0.0) / basket_factor).min(1.0));
        let d = settings.round_level(((end - previous_loss).max(0.0) / basket_factor).min(1.0));
        if d <= a {
            return Ok(realized * total);
        }

        let t = self.time_of(date);
        let surface = self.ensure_surface(SurfaceMeasure::ExpectedLoss)?;
        let expected = (surface.interpolate(0, t, d)? - surface.interpolate(0, t, a)?)
            .max(0.0)
            * basket_factor;
        Ok((expected + realized) * total)
    }

    fn amortized_amount(&mut self, date: Date, begin: f64, end: f64) -> Result<f64, EngineError> {
        Self::validate_tranche(begin, end)?;
        let previous_amortization = self.derived.previous_amortization;
        let total = self.derived.total_principal;

        // Amortization erodes the tranche from the detachment side, so
        // everything works on the complement axis.
        let realized = ((1.0 - begin).min(previous_amortization)
            - (1.0 - end).min(previous_amortization))
        .max(0.0);

        let basket_factor = self.basket_factor();
        if basket_factor <= MIN_BASKET_FACTOR || self.derived.active.is_none() {
            return Ok(realized * total);
        }

        let settings = &self.definition.settings;
        let a = settings.round_level(
            (((1.0 - end) - previous_amortization).max(0.0) / basket_factor).min(1.0),
        );
        let d = settings.round_level(
            (((1.0 - begin) - previous_amortization).max(0.0) / basket_factor).min(1.0),
        );
        if d <= a {
            return Ok(realized * total);
        }

        let t = self.time_of(date);
        let surface = self.ensure_surface(SurfaceMeasure::ExpectedRecovery)?;
        let expected = (surface.interpolate(0, t, d)? - surface.interpolate(0, t, a)?)
            .max(0.0)
            * basket_factor;
        Ok((expected + realized) * total)
    }

    fn reset(&mut self) {
        self.cache.loss = None;
        self.cache.probability = None;
        self.cache.recovery = None;
        let version = self.definition.correlation.version();
        if let Some((cached, _)) = &self.cache.term_structure {
            if *cached != version {
                self.cache.term_structure = None;
            }
        }
    }

    fn calc_loss_distribution(
        &mut self,
        want_probability: bool,
        date: Date,
        levels: &[f64],
    ) -> Result<Vec<(f64, f64)>, EngineError> {
        let t = self.time_of(date);
        let measure = if want_probability {
            SurfaceMeasure::Probability
        } else {
            SurfaceMeasure::ExpectedLoss
        };
        let rounded: Vec<f64> = {
            let settings = &self.definition.settings;
            levels
                .iter()
                .map(|&l| {
                    if !l.is_finite() || l < 0.0 {
                        Err(EngineError::Validation(format!(
                            "loss level {} is negative or non-finite",
                            l
                        )))
                    } else {
                        Ok(settings.round_level(l.min(1.0)))
                    }
                })
                .collect::<Result<_, _>>()?
        };

        let surface = self.ensure_surface(measure)?;
        let mut out: Vec<(f64, f64)> = Vec::with_capacity(rounded.len());
        for level in rounded {
            if out.iter().any(|&(l, _)| l == level) {
                continue;
            }
            out.push((level, surface.interpolate(0, t, level)?));
        }
        Ok(out)
    }

    fn settlement(&self) -> Date {
        self.definition.settlement
    }

    fn maturity(&self) -> Date {
        self.definition.maturity
    }

    fn pool(&self) -> &CreditPool {
        &self.definition.pool
    }

    fn previous_loss(&self) -> f64 {
        self.derived.previous_loss
    }

    fn previous_amortization(&self) -> f64 {
        self.derived.previous_amortization
    }

    fn total_principal(&self) -> f64 {
        self.derived.total_principal
    }

    fn settings(&self) -> &EngineSettings {
        &self.definition.settings
    }

    fn substitute_survival_curve(
        &mut self,
        index: usize,
        curve: Arc<SurvivalCurveEnum>,
    ) -> Result<(), EngineError> {
        self.definition.pool = self.definition.pool.with_survival_curve(index, curve)?;
        self.derived = Self::derive(&self.definition)?;
        self.reset();
        Ok(())
    }

    fn substitute_recovery_curve(
        &mut self,
        index: usize,
        recovery: RecoveryCurve,
    ) -> Result<(), EngineError> {
        self.definition.pool = self.definition.pool.with_recovery_curve(index, recovery)?;
        self.derived = Self::derive(&self.definition)?;
        self.reset();
        Ok(())
    }
}

// ============================================================
// Tests
// ============================================================
