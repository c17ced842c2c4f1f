//! The bump-and-reprice sensitivity table.

use std::sync::Arc;

use rayon::prelude::*;
use tracing::debug;

use basket_core::market_data::curves::{FlatHazardCurve, RecoveryCurve, SurvivalCurveEnum};
use basket_core::settings::EngineSettings;
use basket_engine::engine::{BasketPricer, LossEngine};

use crate::error::RiskError;
use crate::evaluator::TrancheEvaluator;

/// Hazard rate standing in for a certain, immediate default in the
/// jump-to-default scenario rows.
const JUMP_TO_DEFAULT_HAZARD: f64 = 1.0e4;

/// Per-call overrides for [`bumped_pvs`].
///
/// The dispatch threshold and the deep-cloning policy come from the
/// pricer's [`EngineSettings`] (`parallel_threshold`,
/// `deep_cloning_in_parallel_sensitivity`); this struct only carries
/// what varies per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SensitivityConfig {
    /// Force the sequential path regardless of size.
    pub force_sequential: bool,
}

impl SensitivityConfig {
    /// Force the sequential path.
    pub fn with_force_sequential(mut self, force: bool) -> Self {
        self.force_sequential = force;
        self
    }

    /// Whether the row loop dispatches to rayon. Disabling deep cloning
    /// in the engine settings also disables the parallel path, as
    /// workers cannot share one engine.
    fn should_parallelise(&self, settings: &EngineSettings, rows: usize) -> bool {
        settings.deep_cloning_in_parallel_sensitivity
            && !self.force_sequential
            && rows > settings.parallel_threshold
    }
}

/// The work order for one bumped table row.
enum RowScenario {
    /// Replace name `index`'s survival curve (and recovery, when
    /// recovery bumps are supplied).
    Bump {
        /// Name index in the original pool.
        index: usize,
    },
    /// Default name `index` immediately, realizing its recovery.
    JumpToDefault {
        /// Name index in the original pool.
        index: usize,
    },
}

/// Build the (M + J + 1) × N table of evaluator values under per-name
/// bumps.
///
/// Row 0 holds the base values. Rows `1..=M` (M = pool size) reprice
/// with name `i-1`'s survival curve replaced by `alt_survival[i-1]`
/// (and, when `alt_recovery` is non-empty, its recovery curve by
/// `alt_recovery[i-1]`). One further row follows per name carrying an
/// announced but unsettled default: its jump-to-default scenario.
///
/// When every evaluator is additive, a row whose alternative curve is
/// reference-identical (`Arc::ptr_eq`) to the live curve, with no
/// recovery bump, copies row 0 instead of repricing. Rows run in
/// parallel via rayon when their count exceeds the engine settings'
/// `parallel_threshold`; each worker prices a deep copy, so the
/// parallel and sequential tables are bit-identical.
///
/// # Arguments
///
/// * `pricer` - The base engine; never mutated
/// * `evaluators` - The N measures forming the table columns
/// * `alt_survival` - One alternative survival curve per name
/// * `alt_recovery` - Empty, or one alternative recovery curve per name
/// * `config` - Per-call overrides on top of the pricer's settings
///
/// # Returns
///
/// * `Err(RiskError::LengthMismatch)` - Input slice sizes off
/// * `Err(RiskError::EvaluationFailed)` - First failing row
pub fn bumped_pvs(
    pricer: &BasketPricer,
    evaluators: &[&dyn TrancheEvaluator],
    alt_survival: &[Arc<SurvivalCurveEnum>],
    alt_recovery: &[RecoveryCurve],
    config: &SensitivityConfig,
) -> Result<Vec<Vec<f64>>, RiskError> {
    let n_names = pricer.pool().len();
    if alt_survival.len() != n_names {
        return Err(RiskError::LengthMismatch {
            name: "alt_survival",
            expected: n_names,
            got: alt_survival.len(),
        });
    }
    if !alt_recovery.is_empty() && alt_recovery.len() != n_names {
        return Err(RiskError::LengthMismatch {
            name: "alt_recovery",
            expected: n_names,
            got: alt_recovery.len(),
        });
    }

    let base_row = evaluate_row(pricer.clone(), evaluators, 0)?;

    let mut scenarios: Vec<RowScenario> = (0..n_names)
        .map(|index| RowScenario::Bump { index })
        .collect();
    for index in pricer.pool().unsettled_default_indices() {
        scenarios.push(RowScenario::JumpToDefault { index });
    }

    let all_additive = evaluators.iter().all(|e| e.is_additive());
    let run_row = |(offset, scenario): (usize, &RowScenario)| -> Result<Vec<f64>, RiskError> {
        let row = offset + 1;
        match scenario {
            RowScenario::Bump { index } => {
                let unchanged = all_additive
                    && alt_recovery.is_empty()
                    && Arc::ptr_eq(&alt_survival[*index], pricer.pool().name(*index).survival());
                if unchanged {
                    return Ok(base_row.clone());
                }
                let mut worker = pricer.clone();
                worker
                    .substitute_survival_curve(*index, Arc::clone(&alt_survival[*index]))
                    .map_err(|e| row_error(row, e.into()))?;
                if let Some(recovery) = alt_recovery.get(*index) {
                    worker
                        .substitute_recovery_curve(*index, recovery.clone())
                        .map_err(|e| row_error(row, e.into()))?;
                }
                worker.reset();
                evaluate_row(worker, evaluators, row)
            }
            RowScenario::JumpToDefault { index } => {
                jump_to_default_row(pricer, evaluators, *index, alt_recovery, row)
            }
        }
    };

    let rows = scenarios.len();
    let settings = pricer.settings();
    let bumped: Vec<Vec<f64>> = if config.should_parallelise(settings, rows) {
        debug!(rows, threshold = settings.parallel_threshold, "parallel sensitivity dispatch");
        scenarios
            .par_iter()
            .enumerate()
            .map(run_row)
            .collect::<Result<Vec<_>, _>>()?
    } else {
        scenarios
            .iter()
            .enumerate()
            .map(run_row)
            .collect::<Result<Vec<_>, _>>()?
    };

    let mut table = Vec::with_capacity(rows + 1);
    table.push(base_row);
    table.extend(bumped);
    Ok(table)
}

/// Price one jump-to-default scenario on a deep copy.
///
/// The name's survival curve is replaced by a near-certain immediate
/// default; its recovery comes from `alt_recovery` when supplied,
/// otherwise the name's own curve applies.
fn jump_to_default_row(
    pricer: &BasketPricer,
    evaluators: &[&dyn TrancheEvaluator],
    index: usize,
    alt_recovery: &[RecoveryCurve],
    row: usize,
) -> Result<Vec<f64>, RiskError> {
    let jump_curve: Arc<SurvivalCurveEnum> = Arc::new(
        FlatHazardCurve::new(JUMP_TO_DEFAULT_HAZARD)
            .map_err(|e| row_error(row, basket_engine::EngineError::from(e).into()))?
            .into(),
    );
    let mut worker = pricer.clone();
    worker
        .substitute_survival_curve(index, jump_curve)
        .map_err(|e| row_error(row, e.into()))?;
    if let Some(recovery) = alt_recovery.get(index) {
        worker
            .substitute_recovery_curve(index, recovery.clone())
            .map_err(|e| row_error(row, e.into()))?;
    }
    worker.reset();
    evaluate_row(worker, evaluators, row)
}

fn evaluate_row(
    mut worker: BasketPricer,
    evaluators: &[&dyn TrancheEvaluator],
    row: usize,
) -> Result<Vec<f64>, RiskError> {
    evaluators
        .iter()
        .map(|evaluator| evaluator.evaluate(&mut worker).map_err(|e| row_error(row, e)))
        .collect()
}

fn row_error(row: usize, source: RiskError) -> RiskError {
    RiskError::EvaluationFailed {
        row,
        source: Box::new(source),
    }
}

// ============================================================
// Tests
// ============================================================
