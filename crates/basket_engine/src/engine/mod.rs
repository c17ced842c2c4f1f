//! The loss engine contract and its static-dispatch wrapper.

mod heterogeneous;

pub use heterogeneous::{BasketDefinition, HeterogeneousBasket};

use std::sync::Arc;

use basket_core::market_data::curves::{RecoveryCurve, SurvivalCurveEnum};
use basket_core::settings::EngineSettings;
use basket_core::types::Date;
use basket_models::pool::CreditPool;

use crate::composer::BaseCorrelationBasket;
use crate::error::EngineError;

/// A pricing engine producing expected tranche losses and loss
/// distributions for a correlated credit basket.
///
/// Methods take `&mut self` because results are computed lazily and
/// cached; every call returns with the engine fully resolved. Tranche
/// bounds `begin`/`end` are fractions of the original total principal.
pub trait LossEngine {
    /// Expected cumulative loss eaten by the tranche `[begin, end]` up
    /// to `date`, in currency units. Realized losses from already
    /// defaulted names are included.
    fn accumulated_loss(&mut self, date: Date, begin: f64, end: f64) -> Result<f64, EngineError>;

    /// Expected principal amortized (recovered) out of the tranche
    /// `[begin, end]` up to `date`, in currency units. Amortization
    /// erodes the tranche from the detachment side.
    fn amortized_amount(&mut self, date: Date, begin: f64, end: f64) -> Result<f64, EngineError>;

    /// Invalidate cached surfaces. Idempotent and O(1); the next query
    /// recomputes.
    fn reset(&mut self);

    /// Loss distribution table at `date` for the given levels.
    ///
    /// Levels above 1 clamp to 1 and are rounded per the engine
    /// settings before lookup; duplicates after rounding are dropped,
    /// keeping first occurrences. Returns `(level, value)` pairs where
    /// the value is P(L <= level) when `want_probability`, otherwise
    /// E[min(L, level)] as a fraction of remaining principal.
    fn calc_loss_distribution(
        &mut self,
        want_probability: bool,
        date: Date,
        levels: &[f64],
    ) -> Result<Vec<(f64, f64)>, EngineError>;

    /// Expected full-basket loss accrued between two dates.
    fn basket_loss(&mut self, from: Date, to: Date) -> Result<f64, EngineError> {
        Ok(self.accumulated_loss(to, 0.0, 1.0)? - self.accumulated_loss(from, 0.0, 1.0)?)
    }

    /// Settlement date.
    fn settlement(&self) -> Date;

    /// Basket maturity.
    fn maturity(&self) -> Date;

    /// The original (pre default-removal) pool.
    fn pool(&self) -> &CreditPool;

    /// Realized loss fraction from settled and removed defaults.
    fn previous_loss(&self) -> f64;

    /// Realized amortization fraction from settled and removed defaults.
    fn previous_amortization(&self) -> f64;

    /// Total basket principal in currency units.
    fn total_principal(&self) -> f64;

    /// The engine configuration. The sensitivity layer reads its
    /// parallelism knobs from here.
    fn settings(&self) -> &EngineSettings;

    /// Replace the survival curve of name `index` in the original pool
    /// and rebuild derived state. Used by the sensitivity layer.
    fn substitute_survival_curve(
        &mut self,
        index: usize,
        curve: Arc<SurvivalCurveEnum>,
    ) -> Result<(), EngineError>;

    /// Replace the recovery curve of name `index` in the original pool
    /// and rebuild derived state.
    fn substitute_recovery_curve(
        &mut self,
        index: usize,
        recovery: RecoveryCurve,
    ) -> Result<(), EngineError>;
}

/// Static dispatch over the concrete engines.
///
/// Worker threads in the sensitivity layer clone this wholesale, so it
/// is `Clone` and self-contained.
#[derive(Debug, Clone)]
pub enum BasketPricer {
    /// Direct heterogeneous-pool engine.
    Heterogeneous(HeterogeneousBasket),
    /// Base-correlation tranche composer.
    BaseCorrelation(BaseCorrelationBasket),
}

impl LossEngine for BasketPricer {
    fn accumulated_loss(&mut self, date: Date, begin: f64, end: f64) -> Result<f64, EngineError> {
        match self {
            BasketPricer::Heterogeneous(e) => e.accumulated_loss(date, begin, end),
            BasketPricer::BaseCorrelation(e) => e.accumulated_loss(date, begin, end),
        }
    }

    fn amortized_amount(&mut self, date: Date, begin: f64, end: f64) -> Result<f64, EngineError> {
        match self {
            BasketPricer::Heterogeneous(e) => e.amortized_amount(date, begin, end),
            BasketPricer::BaseCorrelation(e) => e.amortized_amount(date, begin, end),
        }
    }

    fn reset(&mut self) {
        match self {
            BasketPricer::Heterogeneous(e) => e.reset(),
            BasketPricer::BaseCorrelation(e) => e.reset(),
        }
    }

    fn calc_loss_distribution(
        &mut self,
        want_probability: bool,
        date: Date,
        levels: &[f64],
    ) -> Result<Vec<(f64, f64)>, EngineError> {
        match self {
            BasketPricer::Heterogeneous(e) => {
                e.calc_loss_distribution(want_probability, date, levels)
            }
            BasketPricer::BaseCorrelation(e) => {
                e.calc_loss_distribution(want_probability, date, levels)
            }
        }
    }

    fn settlement(&self) -> Date {
        match self {
            BasketPricer::Heterogeneous(e) => e.settlement(),
            BasketPricer::BaseCorrelation(e) => e.settlement(),
        }
    }

    fn maturity(&self) -> Date {
        match self {
            BasketPricer::Heterogeneous(e) => e.maturity(),
            BasketPricer::BaseCorrelation(e) => e.maturity(),
        }
    }

    fn pool(&self) -> &CreditPool {
        match self {
            BasketPricer::Heterogeneous(e) => e.pool(),
            BasketPricer::BaseCorrelation(e) => e.pool(),
        }
    }

    fn previous_loss(&self) -> f64 {
        match self {
            BasketPricer::Heterogeneous(e) => e.previous_loss(),
            BasketPricer::BaseCorrelation(e) => e.previous_loss(),
        }
    }

    fn previous_amortization(&self) -> f64 {
        match self {
            BasketPricer::Heterogeneous(e) => e.previous_amortization(),
            BasketPricer::BaseCorrelation(e) => e.previous_amortization(),
        }
    }

    fn total_principal(&self) -> f64 {
        match self {
            BasketPricer::Heterogeneous(e) => e.total_principal(),
            BasketPricer::BaseCorrelation(e) => e.total_principal(),
        }
    }

    fn settings(&self) -> &EngineSettings {
        match self {
            BasketPricer::Heterogeneous(e) => LossEngine::settings(e),
            BasketPricer::BaseCorrelation(e) => LossEngine::settings(e),
        }
    }

    fn substitute_survival_curve(
        &mut self,
        index: usize,
        curve: Arc<SurvivalCurveEnum>,
    ) -> Result<(), EngineError> {
        match self {
            BasketPricer::Heterogeneous(e) => e.substitute_survival_curve(index, curve),
            BasketPricer::BaseCorrelation(e) => e.substitute_survival_curve(index, curve),
        }
    }

    fn substitute_recovery_curve(
        &mut self,
        index: usize,
        recovery: RecoveryCurve,
    ) -> Result<(), EngineError> {
        match self {
            BasketPricer::Heterogeneous(e) => e.substitute_recovery_curve(index, recovery),
            BasketPricer::BaseCorrelation(e) => e.substitute_recovery_curve(index, recovery),
        }
    }
}

impl From<HeterogeneousBasket> for BasketPricer {
    fn from(engine: HeterogeneousBasket) -> Self {
        BasketPricer::Heterogeneous(engine)
    }
}

impl From<BaseCorrelationBasket> for BasketPricer {
    fn from(engine: BaseCorrelationBasket) -> Self {
        BasketPricer::BaseCorrelation(engine)
    }
}
