//! A single credit name in the basket.

use crate::error::ModelError;
use basket_core::market_data::curves::{RecoveryCurve, SurvivalCurveEnum};
use basket_core::types::Date;
use std::sync::Arc;

/// Default status of a credit name.
///
/// # Variants
///
/// - `NotDefaulted`: Alive and part of the active computation set
/// - `HasDefaulted`: Defaulted and settled; removed from the active set
///   and folded into previous loss/amortization
/// - `WillDefault`: Provisionally defaulted (announced but unsettled);
///   removed only when exact jump-to-default handling is enabled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultStatus {
    /// Alive.
    NotDefaulted,
    /// Defaulted and settled.
    HasDefaulted,
    /// Provisional (unsettled) default.
    WillDefault,
}

/// Immutable snapshot of one credit name.
///
/// Constructed once from market curves; defaulted names keep their
/// record for settlement-value bookkeeping but leave the active
/// computation set.
///
/// The survival curve is held behind an `Arc` so sensitivity code can
/// detect an unchanged alternative curve by reference identity.
#[derive(Debug, Clone)]
pub struct CreditName {
    id: String,
    survival: Arc<SurvivalCurveEnum>,
    recovery: RecoveryCurve,
    principal: f64,
    status: DefaultStatus,
    default_date: Option<Date>,
    settled_recovery: Option<f64>,
    early_maturity: Option<Date>,
    refinance: Option<Arc<SurvivalCurveEnum>>,
    refinance_correlation: f64,
}

impl CreditName {
    /// Construct an alive credit name.
    ///
    /// # Arguments
    ///
    /// * `id` - Name identifier
    /// * `survival` - Survival curve
    /// * `recovery` - Recovery curve
    /// * `principal` - Signed principal; negative marks a short position
    ///
    /// # Returns
    ///
    /// * `Ok(CreditName)` - Valid name
    /// * `Err(ModelError::Validation)` - Non-finite or zero principal
    pub fn new(
        id: impl Into<String>,
        survival: Arc<SurvivalCurveEnum>,
        recovery: RecoveryCurve,
        principal: f64,
    ) -> Result<Self, ModelError> {
        if !principal.is_finite() || principal == 0.0 {
            return Err(ModelError::Validation(format!(
                "principal must be finite and non-zero, got {}",
                principal
            )));
        }
        Ok(Self {
            id: id.into(),
            survival,
            recovery,
            principal,
            status: DefaultStatus::NotDefaulted,
            default_date: None,
            settled_recovery: None,
            early_maturity: None,
            refinance: None,
            refinance_correlation: 0.0,
        })
    }

    /// Mark the name defaulted (or provisionally defaulted).
    ///
    /// # Arguments
    ///
    /// * `status` - `HasDefaulted` or `WillDefault`
    /// * `default_date` - Date the default occurred or was announced
    /// * `settled_recovery` - Realized recovery rate where settled;
    ///   `None` falls back to the recovery curve at time 0
    pub fn with_default(
        mut self,
        status: DefaultStatus,
        default_date: Date,
        settled_recovery: Option<f64>,
    ) -> Result<Self, ModelError> {
        if status == DefaultStatus::NotDefaulted {
            return Err(ModelError::Validation(
                "with_default requires a defaulted status".to_string(),
            ));
        }
        if let Some(r) = settled_recovery {
            if !r.is_finite() || !(0.0..=1.0).contains(&r) {
                return Err(ModelError::Validation(format!(
                    "settled recovery must lie in [0, 1], got {}",
                    r
                )));
            }
        }
        self.status = status;
        self.default_date = Some(default_date);
        self.settled_recovery = settled_recovery;
        Ok(self)
    }

    /// Attach an early-maturity date.
    pub fn with_early_maturity(mut self, date: Date) -> Self {
        self.early_maturity = Some(date);
        self
    }

    /// Attach a refinance (prepayment) curve with its default/refinance
    /// correlation.
    pub fn with_refinance(
        mut self,
        curve: Arc<SurvivalCurveEnum>,
        correlation: f64,
    ) -> Result<Self, ModelError> {
        if !correlation.is_finite() || !(-1.0..=1.0).contains(&correlation) {
            return Err(ModelError::Validation(format!(
                "refinance correlation must lie in [-1, 1], got {}",
                correlation
            )));
        }
        self.refinance = Some(curve);
        self.refinance_correlation = correlation;
        Ok(self)
    }

    /// Name identifier.
    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Survival curve.
    #[inline]
    pub fn survival(&self) -> &Arc<SurvivalCurveEnum> {
        &self.survival
    }

    /// Recovery curve.
    #[inline]
    pub fn recovery(&self) -> &RecoveryCurve {
        &self.recovery
    }

    /// Signed principal.
    #[inline]
    pub fn principal(&self) -> f64 {
        self.principal
    }

    /// Whether this is a short position (negative principal).
    #[inline]
    pub fn is_short(&self) -> bool {
        self.principal < 0.0
    }

    /// Default status.
    #[inline]
    pub fn status(&self) -> DefaultStatus {
        self.status
    }

    /// Default date, where defaulted.
    #[inline]
    pub fn default_date(&self) -> Option<Date> {
        self.default_date
    }

    /// Realized recovery for a settled default.
    #[inline]
    pub fn settled_recovery(&self) -> Option<f64> {
        self.settled_recovery
    }

    /// Whether the default is announced but not yet settled.
    #[inline]
    pub fn has_unsettled_default(&self) -> bool {
        self.status == DefaultStatus::WillDefault
            || (self.status == DefaultStatus::HasDefaulted && self.settled_recovery.is_none())
    }

    /// Early-maturity date, if any.
    #[inline]
    pub fn early_maturity(&self) -> Option<Date> {
        self.early_maturity
    }

    /// Refinance curve, if any.
    #[inline]
    pub fn refinance(&self) -> Option<&Arc<SurvivalCurveEnum>> {
        self.refinance.as_ref()
    }

    /// Default/refinance correlation (0 when no refinance curve is set).
    #[inline]
    pub fn refinance_correlation(&self) -> f64 {
        self.refinance_correlation
    }

    /// Replace the survival curve, returning the updated name.
    ///
    /// Used by the sensitivity layer when building bumped pool variants.
    pub fn with_survival(mut self, survival: Arc<SurvivalCurveEnum>) -> Self {
        self.survival = survival;
        self
    }

    /// Replace the recovery curve, returning the updated name.
    pub fn with_recovery(mut self, recovery: RecoveryCurve) -> Self {
        self.recovery = recovery;
        self
    }
}
