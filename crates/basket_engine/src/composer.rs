//! Base-correlation tranche composer.
//!
//! A tranche `[A, D]` under the base-correlation convention is priced
//! as the difference of two equity tranches `[0, D]` and `[0, A]`, each
//! valued with the single-factor correlation implied at its own strike.
//! The composer owns one sub-engine per strike and forces the resolved
//! correlation into it with `set_factor` before pricing.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use tracing::debug;

use basket_core::market_data::curves::{RecoveryCurve, SurvivalCurveEnum};
use basket_core::settings::EngineSettings;
use basket_core::types::Date;
use basket_models::basecorr::{BaseCorrelationSurface, StrikeMethod};
use basket_models::pool::CreditPool;

use crate::engine::{BasketDefinition, HeterogeneousBasket, LossEngine};
use crate::error::EngineError;

/// Two resolved correlations are treated as equal below this.
const CORRELATION_EQ_TOL: f64 = 1e-12;

/// Expected-loss denominators below this fall back to raw strikes.
const MIN_EXPECTED_LOSS: f64 = 1e-12;

/// Tranche engine pricing under a base-correlation surface.
///
/// Correlation resolution is lazy: the first query after construction
/// or [`reset`] runs [`update_correlations`], which resolves the
/// attachment and detachment strikes against the surface, forces the
/// implied correlations into the sub-engines, and resets them. Further
/// queries reuse the resolved state until the next reset or parameter
/// change.
///
/// [`reset`]: LossEngine::reset
/// [`update_correlations`]: BaseCorrelationBasket::update_correlations
#[derive(Debug, Clone)]
pub struct BaseCorrelationBasket {
    definition: BasketDefinition,
    attachment: f64,
    detachment: f64,
    strike_method: StrikeMethod,
    rescale_strikes: bool,
    base_correlation: Option<Arc<dyn BaseCorrelationSurface>>,
    detach_basket: Box<HeterogeneousBasket>,
    /// `None` while aliased to the detachment engine (zero attachment
    /// or numerically equal correlations).
    attach_basket: Option<Box<HeterogeneousBasket>>,
    /// Resolved (attachment, detachment) strikes; dropped on reset when
    /// strikes rescale.
    strikes: Option<(f64, f64)>,
    correlations_ready: bool,
    locked: bool,
}

impl BaseCorrelationBasket {
    /// Build the composer and its detachment sub-engine.
    ///
    /// # Arguments
    ///
    /// * `definition` - Template for the sub-engines; its correlation
    ///   model seeds strike resolution and is then overridden
    /// * `attachment` / `detachment` - Tranche bounds as fractions of
    ///   total principal, `0 <= attachment < detachment <= 1`
    /// * `strike_method` - How tranche bounds map to surface strikes
    /// * `rescale_strikes` - Re-resolve strikes after every reset
    ///   instead of freezing them at first resolution
    pub fn new(
        definition: BasketDefinition,
        attachment: f64,
        detachment: f64,
        strike_method: StrikeMethod,
        rescale_strikes: bool,
    ) -> Result<Self, EngineError> {
        if !attachment.is_finite()
            || !detachment.is_finite()
            || attachment < 0.0
            || detachment > 1.0
            || attachment >= detachment
        {
            return Err(EngineError::Validation(format!(
                "tranche [{}, {}] must satisfy 0 <= attachment < detachment <= 1",
                attachment, detachment
            )));
        }
        let detach_basket = Box::new(HeterogeneousBasket::new(Self::sub_definition(
            &definition,
            detachment,
        )?)?);
        let attach_basket = if attachment > 0.0 {
            Some(Box::new(HeterogeneousBasket::new(Self::sub_definition(
                &definition,
                attachment,
            )?)?))
        } else {
            None
        };
        Ok(Self {
            definition,
            attachment,
            detachment,
            strike_method,
            rescale_strikes,
            base_correlation: None,
            detach_basket,
            attach_basket,
            strikes: None,
            correlations_ready: false,
            locked: false,
        })
    }

    /// Attach the base-correlation surface.
    pub fn with_base_correlation(mut self, surface: Arc<dyn BaseCorrelationSurface>) -> Self {
        self.set_base_correlation(surface);
        self
    }

    /// Replace the base-correlation surface, invalidating resolved
    /// correlations.
    pub fn set_base_correlation(&mut self, surface: Arc<dyn BaseCorrelationSurface>) {
        self.base_correlation = Some(surface);
        if !self.locked {
            self.correlations_ready = false;
            self.strikes = None;
        }
    }

    /// Tranche attachment.
    pub fn attachment(&self) -> f64 {
        self.attachment
    }

    /// Tranche detachment.
    pub fn detachment(&self) -> f64 {
        self.detachment
    }

    /// Whether resolved correlations are current.
    pub fn correlations_ready(&self) -> bool {
        self.correlations_ready
    }

    /// Sub-engine template at one strike level.
    ///
    /// When `use_curve_recovery_for_base_correlation` is off, each
    /// name's recovery is frozen at its maturity value with zero
    /// dispersion, so the sub-engines price under deterministic
    /// recovery while strike resolution keeps the live curves.
    fn sub_definition(
        definition: &BasketDefinition,
        level: f64,
    ) -> Result<BasketDefinition, EngineError> {
        let mut sub = definition.clone().with_levels(vec![level]);
        if !definition.settings.use_curve_recovery_for_base_correlation {
            let tenor = definition
                .day_count
                .year_fraction(definition.settlement, definition.maturity);
            for index in 0..sub.pool.len() {
                let rate = sub.pool.name(index).recovery().recovery(tenor)?;
                sub.pool = sub
                    .pool
                    .with_recovery_curve(index, RecoveryCurve::flat(rate, 0.0)?)?;
            }
        }
        Ok(sub)
    }

    /// Year fraction from the calculation start to maturity, the tenor
    /// at which strikes are quoted.
    fn maturity_tenor(&self) -> f64 {
        self.definition
            .day_count
            .year_fraction(self.definition.settlement, self.definition.maturity)
    }

    /// Map a tranche bound to a surface strike.
    fn resolve_strike(&self, level: f64) -> Result<f64, EngineError> {
        match self.strike_method {
            StrikeMethod::Unadjusted => Ok(level),
            StrikeMethod::ExpectedLossRatio => {
                // Ratio of the equity tranche's expected loss to the
                // whole basket's, both at maturity under the template
                // correlation.
                let mut scratch =
                    HeterogeneousBasket::new(self.definition.clone().with_levels(vec![level]))?;
                let maturity = self.definition.maturity;
                let equity = scratch.accumulated_loss(maturity, 0.0, level)?;
                let full = scratch.accumulated_loss(maturity, 0.0, 1.0)?;
                if full <= MIN_EXPECTED_LOSS {
                    Ok(level)
                } else {
                    Ok((equity / full).clamp(0.0, 1.0))
                }
            }
        }
    }

    /// Resolve strikes and force the implied correlations into the
    /// sub-engines. Idempotent until the next reset or parameter
    /// change.
    ///
    /// # Returns
    ///
    /// * `Err(EngineError::InvalidState)` - No base-correlation surface
    ///   is attached
    pub fn update_correlations(&mut self) -> Result<(), EngineError> {
        if self.correlations_ready {
            return Ok(());
        }
        let surface = self.base_correlation.as_ref().ok_or_else(|| {
            EngineError::InvalidState("no base-correlation surface attached".to_string())
        })?;

        let (strike_a, strike_d) = match self.strikes {
            Some(pair) => pair,
            None => {
                let pair = (
                    self.resolve_strike(self.attachment)?,
                    self.resolve_strike(self.detachment)?,
                );
                self.strikes = Some(pair);
                pair
            }
        };

        let tenor = self.maturity_tenor();
        let rho_d = surface.correlation_at(strike_d, tenor)?;
        self.detach_basket.set_factor(tenor, rho_d.sqrt())?;
        self.detach_basket.reset();

        if self.attachment > 0.0 {
            let rho_a = surface.correlation_at(strike_a, tenor)?;
            if (rho_a - rho_d).abs() <= CORRELATION_EQ_TOL {
                // Same correlation on both strikes: one engine serves
                // both queries.
                self.attach_basket = None;
            } else {
                if self.attach_basket.is_none() {
                    self.attach_basket = Some(Box::new(HeterogeneousBasket::new(
                        Self::sub_definition(&self.definition, self.attachment)?,
                    )?));
                }
                let attach = self.attach_basket.as_mut().expect("attach engine built above");
                attach.set_factor(tenor, rho_a.sqrt())?;
                attach.reset();
            }
            debug!(
                strike_a,
                strike_d,
                rho_a,
                rho_d,
                aliased = self.attach_basket.is_none(),
                "resolved base correlations"
            );
        } else {
            self.attach_basket = None;
            debug!(strike_d, rho_d, "resolved base correlation (equity tranche)");
        }

        self.correlations_ready = true;
        Ok(())
    }

    /// Freeze the resolved correlations for the lifetime of the guard.
    ///
    /// Resolution runs first if needed. While the guard lives, resets
    /// keep the resolved correlations; when it drops (including on
    /// unwind) the freeze lifts and the next query re-resolves.
    pub fn lock_correlations(&mut self) -> Result<CorrelationLock<'_>, EngineError> {
        self.update_correlations()?;
        self.locked = true;
        Ok(CorrelationLock { basket: self })
    }

    /// Expected loss of the `[0, level]` equity tranche on the engine
    /// carrying the attachment-strike correlation.
    fn attach_value(&mut self, date: Date, level: f64) -> Result<f64, EngineError> {
        match self.attach_basket.as_mut() {
            Some(engine) => engine.accumulated_loss(date, 0.0, level),
            None => self.detach_basket.accumulated_loss(date, 0.0, level),
        }
    }

    fn attach_amortized(&mut self, date: Date, level: f64) -> Result<f64, EngineError> {
        match self.attach_basket.as_mut() {
            Some(engine) => engine.amortized_amount(date, level, 1.0),
            None => self.detach_basket.amortized_amount(date, level, 1.0),
        }
    }
}

impl LossEngine for BaseCorrelationBasket {
    fn accumulated_loss(&mut self, date: Date, begin: f64, end: f64) -> Result<f64, EngineError> {
        self.update_correlations()?;
        let upper = self.detach_basket.accumulated_loss(date, 0.0, end)?;
        let lower = if begin > 0.0 {
            self.attach_value(date, begin)?
        } else {
            0.0
        };
        Ok((upper - lower).max(0.0))
    }

    fn amortized_amount(&mut self, date: Date, begin: f64, end: f64) -> Result<f64, EngineError> {
        self.update_correlations()?;
        let upper = self.detach_basket.amortized_amount(date, end, 1.0)?;
        let lower = self.attach_amortized(date, begin)?;
        Ok((lower - upper).max(0.0))
    }

    fn reset(&mut self) {
        self.detach_basket.reset();
        if let Some(engine) = self.attach_basket.as_mut() {
            engine.reset();
        }
        if !self.locked {
            self.correlations_ready = false;
            if self.rescale_strikes {
                self.strikes = None;
            }
        }
    }

    fn calc_loss_distribution(
        &mut self,
        want_probability: bool,
        date: Date,
        levels: &[f64],
    ) -> Result<Vec<(f64, f64)>, EngineError> {
        self.update_correlations()?;
        self.detach_basket
            .calc_loss_distribution(want_probability, date, levels)
    }

    fn settlement(&self) -> Date {
        self.detach_basket.settlement()
    }

    fn maturity(&self) -> Date {
        self.detach_basket.maturity()
    }

    fn pool(&self) -> &CreditPool {
        self.detach_basket.pool()
    }

    fn previous_loss(&self) -> f64 {
        self.detach_basket.previous_loss()
    }

    fn previous_amortization(&self) -> f64 {
        self.detach_basket.previous_amortization()
    }

    fn total_principal(&self) -> f64 {
        self.detach_basket.total_principal()
    }

    fn settings(&self) -> &EngineSettings {
        &self.definition.settings
    }

    fn substitute_survival_curve(
        &mut self,
        index: usize,
        curve: Arc<SurvivalCurveEnum>,
    ) -> Result<(), EngineError> {
        self.definition.pool = self.definition.pool.with_survival_curve(index, curve.clone())?;
        self.detach_basket
            .substitute_survival_curve(index, Arc::clone(&curve))?;
        if let Some(engine) = self.attach_basket.as_mut() {
            engine.substitute_survival_curve(index, curve)?;
        }
        if !self.locked {
            self.correlations_ready = false;
            if self.rescale_strikes {
                self.strikes = None;
            }
        }
        Ok(())
    }

    fn substitute_recovery_curve(
        &mut self,
        index: usize,
        recovery: RecoveryCurve,
    ) -> Result<(), EngineError> {
        self.definition.pool = self
            .definition
            .pool
            .with_recovery_curve(index, recovery.clone())?;
        let sub_recovery = if self.definition.settings.use_curve_recovery_for_base_correlation {
            recovery
        } else {
            RecoveryCurve::flat(recovery.recovery(self.maturity_tenor())?, 0.0)?
        };
        self.detach_basket
            .substitute_recovery_curve(index, sub_recovery.clone())?;
        if let Some(engine) = self.attach_basket.as_mut() {
            engine.substitute_recovery_curve(index, sub_recovery)?;
        }
        if !self.locked {
            self.correlations_ready = false;
            if self.rescale_strikes {
                self.strikes = None;
            }
        }
        Ok(())
    }
}

/// Drop guard freezing a composer's resolved correlations.
///
/// Created by [`BaseCorrelationBasket::lock_correlations`]. Dereferences
/// to the composer; dropping lifts the freeze and forces the next query
/// to re-resolve, including when the guard is dropped during unwinding.
#[derive(Debug)]
pub struct CorrelationLock<'a> {
    basket: &'a mut BaseCorrelationBasket,
}

impl Deref for CorrelationLock<'_> {
    type Target = BaseCorrelationBasket;

    fn deref(&self) -> &Self::Target {
        self.basket
    }
}

impl DerefMut for CorrelationLock<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.basket
    }
}

impl Drop for CorrelationLock<'_> {
    fn drop(&mut self) {
        self.basket.locked = false;
        self.basket.correlations_ready = false;
    }
}

// ============================================================
// Tests
// ============================================================
