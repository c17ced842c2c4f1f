//! Cross-module scenario tests exercising the full engine stack.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use approx::assert_relative_eq;

use basket_core::market_data::curves::{FlatHazardCurve, RecoveryCurve, SurvivalCurveEnum};
use basket_core::settings::EngineSettings;
use basket_core::types::Date;
use basket_models::basecorr::{InterpolatedBaseCorrelation, StrikeMethod};
use basket_models::correlation::CorrelationModel;
use basket_models::pool::{CreditName, CreditPool, DefaultStatus};

use crate::composer::BaseCorrelationBasket;
use crate::engine::{BasketDefinition, HeterogeneousBasket, LossEngine};
use crate::error::EngineError;
use crate::kernel::{DistributionKernel, KernelRequest, LargePoolKernel, RecursiveGaussianKernel};
use crate::surface::DistributionSurface;

/// Counts kernel invocations while delegating to the real recursion.
#[derive(Debug)]
struct SpyKernel {
    calls: Arc<AtomicUsize>,
    inner: RecursiveGaussianKernel,
}

impl DistributionKernel for SpyKernel {
    fn compute(
        &self,
        request: &KernelRequest<'_>,
        surface: &mut DistributionSurface,
    ) -> Result<(), EngineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.compute(request, surface)
    }
}

fn flat_curve(h: f64) -> Arc<SurvivalCurveEnum> {
    Arc::new(FlatHazardCurve::new(h).unwrap().into())
}

fn five_name_pool() -> CreditPool {
    CreditPool::from_curves(
        vec![flat_curve(0.02); 5],
        vec![RecoveryCurve::flat(0.4, 0.0).unwrap(); 5],
        vec![100.0; 5],
    )
    .unwrap()
}

fn definition(pool: CreditPool) -> BasketDefinition {
    BasketDefinition::new(
        Date::from_ymd(2024, 1, 2).unwrap(),
        Date::from_ymd(2024, 1, 4).unwrap(),
        Date::from_ymd(2034, 1, 4).unwrap(),
        pool,
        CorrelationModel::single_factor_correlation(0.3).unwrap(),
    )
}

#[test]
fn test_five_name_junior_tranche_scenario() {
    // Five names, 2% hazard, 40% recovery, rho = 0.3, [0, 10%] tranche:
    // expected loss is positive, monotone in date, and bounded by the
    // tranche notional.
    let def = definition(five_name_pool()).with_levels(vec![0.1]);
    let mut engine = HeterogeneousBasket::new(def).unwrap();

    let mut previous = 0.0;
    for year in [2025, 2027, 2029, 2031, 2033] {
        let date = Date::from_ymd(year, 1, 4).unwrap();
        let loss = engine.accumulated_loss(date, 0.0, 0.1).unwrap();
        assert!(loss >= previous - 1e-9);
        assert!(loss <= 0.1 * 500.0 + 1e-9);
        previous = loss;
    }
    assert!(previous > 0.0);
}

#[test]
fn test_surface_is_cached_between_queries() {
    let calls = Arc::new(AtomicUsize::new(0));
    let spy = Arc::new(SpyKernel {
        calls: Arc::clone(&calls),
        inner: RecursiveGaussianKernel::default(),
    });
    let def = definition(five_name_pool())
        .with_levels(vec![0.1])
        .with_kernel(spy);
    let mut engine = HeterogeneousBasket::new(def).unwrap();

    let d1 = Date::from_ymd(2026, 1, 4).unwrap();
    let d2 = Date::from_ymd(2030, 1, 4).unwrap();
    engine.accumulated_loss(d1, 0.0, 0.1).unwrap();
    engine.accumulated_loss(d2, 0.0, 0.1).unwrap();
    engine.accumulated_loss(d2, 0.1, 0.3).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1, "one surface build serves all loss queries");

    engine.amortized_amount(d2, 0.0, 0.1).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2, "recovery surface built on demand");

    engine.reset();
    engine.accumulated_loss(d1, 0.0, 0.1).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 3, "reset drops the cache");
}

#[test]
fn test_kernel_results_are_deterministic() {
    let def = definition(five_name_pool()).with_levels(vec![0.1, 0.3]);
    let date = Date::from_ymd(2029, 1, 4).unwrap();

    let mut first = HeterogeneousBasket::new(def.clone()).unwrap();
    let mut second = HeterogeneousBasket::new(def).unwrap();
    let a = first.accumulated_loss(date, 0.1, 0.3).unwrap();
    let b = second.accumulated_loss(date, 0.1, 0.3).unwrap();
    assert_eq!(a, b, "identical inputs must price identically");
}

#[test]
fn test_defaulted_name_scenario_through_the_stack() {
    // A settled default shifts the realized fractions and the junior
    // tranche query window.
    let curve = flat_curve(0.02);
    let recovery = RecoveryCurve::flat(0.4, 0.0).unwrap();
    let mut names: Vec<CreditName> = (0..4)
        .map(|i| {
            CreditName::new(format!("NAME{}", i), Arc::clone(&curve), recovery.clone(), 100.0)
                .unwrap()
        })
        .collect();
    names.push(
        CreditName::new("GONE", Arc::clone(&curve), recovery, 100.0)
            .unwrap()
            .with_default(
                DefaultStatus::HasDefaulted,
                Date::from_ymd(2023, 6, 1).unwrap(),
                Some(0.4),
            )
            .unwrap(),
    );
    let pool = CreditPool::new(names).unwrap();
    let def = definition(pool).with_levels(vec![0.1, 0.3]);
    let mut engine = HeterogeneousBasket::new(def).unwrap();

    assert_relative_eq!(engine.previous_loss(), 0.12, epsilon = 1e-12);
    assert_relative_eq!(engine.previous_amortization(), 0.08, epsilon = 1e-12);

    let date = Date::from_ymd(2029, 1, 4).unwrap();
    // The [0, 10%] tranche sits entirely below the 12% realized loss.
    let junior = engine.accumulated_loss(date, 0.0, 0.1).unwrap();
    assert_relative_eq!(junior, 50.0, epsilon = 1e-9);

    // The [10%, 30%] tranche is partially eaten and keeps accruing.
    let mezz = engine.accumulated_loss(date, 0.1, 0.3).unwrap();
    assert!(mezz > 0.02 * 500.0, "2% of notional is already realized");

    // Additivity still holds across the realized boundary.
    let full = engine.accumulated_loss(date, 0.0, 1.0).unwrap();
    let senior = engine.accumulated_loss(date, 0.3, 1.0).unwrap();
    assert_relative_eq!(junior + mezz + senior, full, epsilon = 1e-8);
}

#[test]
fn test_basket_loss_between_dates() {
    let def = definition(five_name_pool());
    let mut engine = HeterogeneousBasket::new(def).unwrap();
    let from = Date::from_ymd(2026, 1, 4).unwrap();
    let to = Date::from_ymd(2030, 1, 4).unwrap();
    let window = engine.basket_loss(from, to).unwrap();
    let direct = engine.accumulated_loss(to, 0.0, 1.0).unwrap()
        - engine.accumulated_loss(from, 0.0, 1.0).unwrap();
    assert_relative_eq!(window, direct, epsilon = 1e-12);
    assert!(window > 0.0);
}

#[test]
fn test_large_pool_kernel_plugs_into_the_engine() {
    let pool = CreditPool::from_curves(
        vec![flat_curve(0.02); 100],
        vec![RecoveryCurve::flat(0.4, 0.0).unwrap(); 100],
        vec![10.0; 100],
    )
    .unwrap();
    let date = Date::from_ymd(2030, 1, 4).unwrap();

    let mut lhp = HeterogeneousBasket::new(
        definition(pool.clone())
            .with_levels(vec![0.1])
            .with_kernel(Arc::new(LargePoolKernel::default())),
    )
    .unwrap();
    let mut exact = HeterogeneousBasket::new(
        definition(pool)
            .with_levels(vec![0.1])
            .with_settings(EngineSettings::default().with_grid_size(0.002)),
    )
    .unwrap();

    let approx_loss = lhp.accumulated_loss(date, 0.0, 1.0).unwrap();
    let exact_loss = exact.accumulated_loss(date, 0.0, 1.0).unwrap();
    assert_relative_eq!(approx_loss, exact_loss, max_relative = 0.02);
}

#[test]
fn test_base_correlation_round_trip_through_pricer_enum() {
    use crate::engine::BasketPricer;

    let surface = Arc::new(
        InterpolatedBaseCorrelation::new(&[0.1, 0.3, 1.0], &[0.25, 0.4, 0.55]).unwrap(),
    );
    let composer = BaseCorrelationBasket::new(
        definition(five_name_pool()),
        0.1,
        0.3,
        StrikeMethod::Unadjusted,
        false,
    )
    .unwrap()
    .with_base_correlation(surface);

    let mut pricer = BasketPricer::from(composer);
    let date = Date::from_ymd(2029, 1, 4).unwrap();
    let loss = pricer.accumulated_loss(date, 0.1, 0.3).unwrap();
    assert!(loss > 0.0 && loss < 0.2 * 500.0);

    // Cloning the pricer clones resolved state wholesale.
    let mut clone = pricer.clone();
    let cloned_loss = clone.accumulated_loss(date, 0.1, 0.3).unwrap();
    assert_eq!(loss, cloned_loss);
}
