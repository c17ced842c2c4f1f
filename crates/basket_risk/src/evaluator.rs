//! The pricing-measure contract the sensitivity loop is generic over.

use basket_core::types::Date;
use basket_engine::engine::{BasketPricer, LossEngine};

use crate::error::RiskError;

/// A scalar measure extracted from a (possibly bumped) basket engine.
///
/// Implementations must be pure with respect to the engine state they
/// are handed: the sensitivity loop evaluates them on worker-local deep
/// copies, sequentially within a row.
pub trait TrancheEvaluator: Sync {
    /// Price the measure on the given engine. The engine arrives reset,
    /// so lazy caches rebuild against the bumped market data.
    fn evaluate(&self, pricer: &mut BasketPricer) -> Result<f64, RiskError>;

    /// Whether the measure is additive across names, allowing the loop
    /// to reuse the base row for bumps that provably change nothing.
    fn is_additive(&self) -> bool {
        true
    }
}

/// Expected tranche loss at a horizon date, the canonical evaluator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExpectedLossEvaluator {
    /// Horizon date.
    pub date: Date,
    /// Tranche attachment as a fraction of total principal.
    pub attachment: f64,
    /// Tranche detachment as a fraction of total principal.
    pub detachment: f64,
}

impl ExpectedLossEvaluator {
    /// Build the evaluator; bounds are validated by the engine at
    /// pricing time.
    pub fn new(date: Date, attachment: f64, detachment: f64) -> Self {
        Self {
            date,
            attachment,
            detachment,
        }
    }
}

impl TrancheEvaluator for ExpectedLossEvaluator {
    fn evaluate(&self, pricer: &mut BasketPricer) -> Result<f64, RiskError> {
        Ok(pricer.accumulated_loss(self.date, self.attachment, self.detachment)?)
    }
}
