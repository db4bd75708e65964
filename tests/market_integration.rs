mod common;

use merit_sim::config::ScenarioConfig;
use merit_sim::empirical::SeriesMap;
use merit_sim::equilibrium::{ClampPolicy, ClearingStatus};
use merit_sim::sim::{Engine, simulate};
use merit_sim::supply::Technology;
use merit_sim::SimError;

use common::{at, gas_only, set_const, toy_market};

#[test]
fn single_step_block_clears_at_its_bid() {
    let records = simulate(&toy_market(), SeriesMap::new()).unwrap();
    assert_eq!(records.len(), 24);
    for r in &records {
        // Supply steps from 0 to 10 MW at P = 0; demand at P = 0 is 5 MW.
        assert_eq!(r.price, 0.0);
        assert_eq!(r.quantity, 5.0);
        assert_eq!(r.status, ClearingStatus::Cleared);
        assert_eq!(r.dispatch_of(Technology::Nuclear), 5.0);
        assert_eq!(r.total_dispatch(), 5.0);
    }
}

#[test]
fn short_supply_clamps_high_when_lenient() {
    let mut cfg = toy_market();
    cfg.demand.inelastic = true;
    cfg.demand.base_intercept = 25.0;

    let records = simulate(&cfg, SeriesMap::new()).unwrap();
    for r in &records {
        assert_eq!(r.status, ClearingStatus::ClampedHigh);
        assert_eq!(r.price, 100.0);
        assert_eq!(r.quantity, 10.0);
        assert_eq!(r.total_dispatch(), 10.0);
    }
}

#[test]
fn short_supply_fails_when_strict() {
    let mut cfg = toy_market();
    cfg.demand.inelastic = true;
    cfg.demand.base_intercept = 25.0;
    cfg.market.clamp_policy = ClampPolicy::Strict;

    let err = simulate(&cfg, SeriesMap::new()).unwrap_err();
    match err {
        SimError::EquilibriumNotFound { timestamp, .. } => {
            assert_eq!(timestamp, at(2025, 1, 1, 0));
        }
        other => panic!("expected EquilibriumNotFound, got {other:?}"),
    }
}

#[test]
fn inelastic_demand_within_capacity_clears_exactly() {
    let mut cfg = toy_market();
    cfg.demand.inelastic = true;
    cfg.demand.base_intercept = 7.0;

    let records = simulate(&cfg, SeriesMap::new()).unwrap();
    assert!(records.iter().all(|r| r.status == ClearingStatus::Cleared));
    assert!(records.iter().all(|r| r.quantity == 7.0 && r.price == 0.0));
}

#[test]
fn summer_outage_derates_coal() {
    let mut cfg = toy_market();
    cfg.simulation.start = at(2025, 7, 1, 0);
    cfg.outages.enabled = true;
    cfg.outages.months = vec![6, 7, 8];
    cfg.outages.coal_reduction = 0.10;
    set_const(&mut cfg, "cap.coal", 100.0);
    set_const(&mut cfg, "avail.coal", 0.9);
    set_const(&mut cfg, "eta_lb.coal", 0.33);
    set_const(&mut cfg, "eta_ub.coal", 0.38);

    let july = simulate(&cfg, SeriesMap::new()).unwrap();
    let coal = july[0].available[&Technology::Coal];
    assert!((coal - 81.0).abs() < 1e-9, "july coal available {coal}");
    // The raw variable is reported before derating.
    assert_eq!(july[0].values["avail.coal"], 0.9);

    cfg.simulation.start = at(2025, 1, 1, 0);
    let january = simulate(&cfg, SeriesMap::new()).unwrap();
    let coal = january[0].available[&Technology::Coal];
    assert!((coal - 90.0).abs() < 1e-9, "january coal available {coal}");
}

#[test]
fn higher_gas_price_never_lowers_clearing_price() {
    let mut last = f64::NEG_INFINITY;
    for fuel in [20.0, 25.0, 30.0, 40.0, 50.0, 60.0] {
        let records = simulate(&gas_only(fuel), SeriesMap::new()).unwrap();
        let r = &records[0];
        assert_eq!(r.status, ClearingStatus::Cleared);
        assert!(r.dispatch_of(Technology::Gas) > 0.0);
        assert!(
            r.price >= last,
            "fuel {fuel}: price {} dropped below {last}",
            r.price
        );
        last = r.price;
    }
}

#[test]
fn gas_price_inside_efficiency_band() {
    let records = simulate(&gas_only(30.0), SeriesMap::new()).unwrap();
    let r = &records[0];
    // Band is [30 / 0.55, 30 / 0.45].
    assert!(r.price >= 30.0 / 0.55 - 1e-9);
    assert!(r.price <= 30.0 / 0.45 + 1e-9);
    // Demand and dispatch agree at the cleared price.
    assert!((r.quantity - (150.0 - r.price) / 0.1).abs() < 1e-6);
    assert!((r.total_dispatch() - r.quantity).abs() < 1e-6);
}

#[test]
fn dispatch_respects_available_capacity() {
    let mut cfg = ScenarioConfig::baseline();
    cfg.simulation.days = 7;
    let records = simulate(&cfg, SeriesMap::new()).unwrap();
    for r in &records {
        for tech in Technology::ALL {
            let d = r.dispatch_of(tech);
            let avail = r.available.get(&tech).copied().unwrap_or(0.0);
            assert!(d >= 0.0, "{tech} dispatch negative at {}", r.timestamp);
            assert!(d <= avail + 1e-6, "{tech} over capacity at {}", r.timestamp);
        }
        assert!(r.total_dispatch() <= r.total_available() + 1e-6);
    }
}

#[test]
fn both_seasonal_compositions_run() {
    use merit_sim::demand::SeasonalComposition;

    let mut prices = Vec::new();
    for composition in [SeasonalComposition::Multiplicative, SeasonalComposition::Additive] {
        let mut cfg = ScenarioConfig::baseline();
        cfg.simulation.days = 2;
        cfg.demand.composition = composition;
        let records = simulate(&cfg, SeriesMap::new()).unwrap();
        prices.push(records.iter().map(|r| r.price).collect::<Vec<_>>());
    }
    assert_ne!(prices[0], prices[1]);
}

#[test]
fn engine_steps_match_full_run() {
    let cfg = toy_market();
    let full = simulate(&cfg, SeriesMap::new()).unwrap();
    let mut engine = Engine::new(&cfg, SeriesMap::new()).unwrap();
    let first = engine.step(at(2025, 1, 1, 0)).unwrap();
    assert_eq!(first, full[0]);
}
