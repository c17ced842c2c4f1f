//! Ordered, immutable set of credit names.

use super::name::{CreditName, DefaultStatus};
use crate::error::ModelError;
use basket_core::market_data::curves::{RecoveryCurve, SurvivalCurveEnum};
use basket_core::types::Date;
use std::sync::Arc;

/// Result of filtering defaulted names out of a pool.
///
/// Amounts are in principal (currency) units; the engine divides by its
/// total principal to obtain previous-loss/amortization fractions.
#[derive(Debug, Clone, PartialEq)]
pub struct DefaultAdjustment {
    /// Which original names remain active.
    pub picks: Vec<bool>,
    /// Principal lost to defaults settled at or before the cutoff.
    pub loss_amount: f64,
    /// Principal recovered (amortized) from those defaults.
    pub amortized_amount: f64,
}

/// Ordered set of credit names, immutable once built.
///
/// # Example
///
/// ```
/// use basket_models::pool::{CreditName, CreditPool};
/// use basket_core::market_data::curves::{FlatHazardCurve, RecoveryCurve};
/// use std::sync::Arc;
///
/// let names: Vec<_> = (0..3)
///     .map(|i| {
///         CreditName::new(
///             format!("NAME{}", i),
///             Arc::new(FlatHazardCurve::new(0.02).unwrap().into()),
///             RecoveryCurve::flat(0.4, 0.0).unwrap(),
///             100.0,
///         )
///         .unwrap()
///     })
///     .collect();
/// let pool = CreditPool::new(names).unwrap();
/// assert_eq!(pool.len(), 3);
/// assert_eq!(pool.total_principal(false), 300.0);
/// ```
#[derive(Debug, Clone)]
pub struct CreditPool {
    names: Vec<CreditName>,
}

impl CreditPool {
    /// Construct a pool from an ordered set of names.
    ///
    /// # Returns
    ///
    /// * `Ok(CreditPool)` - Non-empty pool with positive long principal
    /// * `Err(ModelError::Validation)` - Empty pool or no long principal
    pub fn new(names: Vec<CreditName>) -> Result<Self, ModelError> {
        if names.is_empty() {
            return Err(ModelError::Validation("pool must not be empty".to_string()));
        }
        let long: f64 = names
            .iter()
            .map(|n| n.principal().max(0.0))
            .sum();
        if long <= 0.0 {
            return Err(ModelError::Validation(
                "pool must contain positive principal".to_string(),
            ));
        }
        Ok(Self { names })
    }

    /// Construct a pool by zipping parallel arrays of curves and
    /// principals, the shape the engine construction contract takes.
    ///
    /// # Arguments
    ///
    /// * `survival` - One survival curve per name
    /// * `recovery` - One recovery curve per name
    /// * `principals` - Signed principals, parallel to the curves
    ///
    /// # Returns
    ///
    /// * `Err(ModelError::Validation)` - Mismatched array lengths
    pub fn from_curves(
        survival: Vec<Arc<SurvivalCurveEnum>>,
        recovery: Vec<RecoveryCurve>,
        principals: Vec<f64>,
    ) -> Result<Self, ModelError> {
        if survival.len() != principals.len() || recovery.len() != principals.len() {
            return Err(ModelError::Validation(format!(
                "mismatched array lengths: {} survival curves, {} recovery curves, {} principals",
                survival.len(),
                recovery.len(),
                principals.len()
            )));
        }
        let names = survival
            .into_iter()
            .zip(recovery)
            .zip(principals)
            .enumerate()
            .map(|(i, ((s, r), p))| CreditName::new(format!("NAME{}", i), s, r, p))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(names)
    }

    /// Number of names.
    #[inline]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the pool is empty. Never true for a constructed pool.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// All names in order.
    #[inline]
    pub fn names(&self) -> &[CreditName] {
        &self.names
    }

    /// The name at `index`.
    #[inline]
    pub fn name(&self, index: usize) -> &CreditName {
        &self.names[index]
    }

    /// Total principal: the sum of positive principals, minus the
    /// absolute short principal when `subtract_shorted` is set.
    pub fn total_principal(&self, subtract_shorted: bool) -> f64 {
        let long: f64 = self.names.iter().map(|n| n.principal().max(0.0)).sum();
        if subtract_shorted {
            long - self.shorted_principal()
        } else {
            long
        }
    }

    /// Absolute sum of short (negative) principals.
    pub fn shorted_principal(&self) -> f64 {
        self.names
            .iter()
            .map(|n| (-n.principal()).max(0.0))
            .sum()
    }

    /// Filter defaulted names out of the active computation set.
    ///
    /// A name leaves the active set when it `HasDefaulted` at or before
    /// `cutoff`, or when it `WillDefault` and `exact_jump_to_default` is
    /// enabled. The realized loss uses the settled recovery where
    /// available, falling back to the name's recovery curve at time 0.
    pub fn default_adjustment(
        &self,
        cutoff: Date,
        exact_jump_to_default: bool,
    ) -> Result<DefaultAdjustment, ModelError> {
        let mut picks = vec![true; self.names.len()];
        let mut loss_amount = 0.0;
        let mut amortized_amount = 0.0;

        for (i, name) in self.names.iter().enumerate() {
            let removed = match name.status() {
                DefaultStatus::NotDefaulted => false,
                DefaultStatus::HasDefaulted => {
                    name.default_date().map_or(true, |d| d <= cutoff)
                }
                DefaultStatus::WillDefault => exact_jump_to_default,
            };
            if removed {
                picks[i] = false;
                let recovery = match name.settled_recovery() {
                    Some(r) => r,
                    None => name.recovery().recovery(0.0)?,
                };
                loss_amount += name.principal() * (1.0 - recovery);
                amortized_amount += name.principal() * recovery;
            }
        }

        Ok(DefaultAdjustment {
            picks,
            loss_amount,
            amortized_amount,
        })
    }

    /// Build the sub-pool of names flagged in `picks`.
    ///
    /// # Returns
    ///
    /// * `Err(ModelError::Validation)` - Mask length mismatch or no
    ///   active names remain
    pub fn subset(&self, picks: &[bool]) -> Result<Self, ModelError> {
        if picks.len() != self.names.len() {
            return Err(ModelError::Validation(format!(
                "picks mask length {} does not match pool size {}",
                picks.len(),
                self.names.len()
            )));
        }
        let names: Vec<CreditName> = self
            .names
            .iter()
            .zip(picks)
            .filter(|(_, &keep)| keep)
            .map(|(n, _)| n.clone())
            .collect();
        Self::new(names)
    }

    /// Indices of names with an announced but unsettled default.
    pub fn unsettled_default_indices(&self) -> Vec<usize> {
        self.names
            .iter()
            .enumerate()
            .filter(|(_, n)| n.has_unsettled_default())
            .map(|(i, _)| i)
            .collect()
    }

    /// Replace the survival curve of the name at `index`, returning a
    /// new pool. Used by sensitivity bumping on deep-copied state.
    pub fn with_survival_curve(
        &self,
        index: usize,
        curve: Arc<SurvivalCurveEnum>,
    ) -> Result<Self, ModelError> {
        if index >= self.names.len() {
            return Err(ModelError::Validation(format!(
                "name index {} out of range for pool of {}",
                index,
                self.names.len()
            )));
        }
        let mut names = self.names.clone();
        names[index] = names[index].clone().with_survival(curve);
        Ok(Self { names })
    }

    /// Replace the recovery curve of the name at `index`, returning a
    /// new pool.
    pub fn with_recovery_curve(
        &self,
        index: usize,
        recovery: RecoveryCurve,
    ) -> Result<Self, ModelError> {
        if index >= self.names.len() {
            return Err(ModelError::Validation(format!(
                "name index {} out of range for pool of {}",
                index,
                self.names.len()
            )));
        }
        let mut names = self.names.clone();
        names[index] = names[index].clone().with_recovery(recovery);
        Ok(Self { names })
    }
}
