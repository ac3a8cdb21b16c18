use budget_analytics::allocation::{
    share_of, total_budget, AllocationMode, AllocationPlan, AllocationState, ReferenceAllocations,
};
use budget_analytics::channels::{Channel, ChannelCatalog, ChannelId};
use budget_analytics::error::EngineError;
use budget_analytics::kpi::{percent_change, percent_change_or_none};
use budget_analytics::model::ResponseCurve;
use budget_analytics::store::{load_store, DataOrigin, DirectorySource};

fn id(name: &str) -> ChannelId {
    name.parse().unwrap()
}

fn channel_a() -> Channel {
    Channel::new("A", "A", "#000000", 2.0, 100_000.0).unwrap()
}

#[test]
fn zero_budget_predicts_zero_revenue() {
    let curve = ResponseCurve::default();
    assert_eq!(curve.predicted_revenue(&channel_a(), 0.0).unwrap(), 0.0);
}

#[test]
fn budget_at_saturation_yields_half_the_asymptote() {
    let curve = ResponseCurve::new(100_000.0, 100.0).unwrap();
    let channel = channel_a();
    let revenue = curve.predicted_revenue(&channel, 100_000.0).unwrap();
    assert_eq!(revenue, 10_000_000_000.0);
    assert_eq!(revenue * 2.0, curve.asymptote(&channel));
}

#[test]
fn predicted_revenue_is_monotone_and_bounded() {
    let curve = ResponseCurve::default();
    let channel = channel_a();
    let ceiling = curve.asymptote(&channel);
    let mut last = 0.0;
    for step in 0..=50 {
        let budget = step as f64 * 25_000.0;
        let revenue = curve.predicted_revenue(&channel, budget).unwrap();
        assert!(revenue >= 0.0);
        assert!(revenue >= last);
        assert!(revenue < ceiling);
        last = revenue;
    }
    assert!(curve.predicted_revenue(&channel, -1.0).is_err());
}

#[test]
fn shares_of_a_two_channel_plan() {
    let plan = AllocationPlan::new(
        AllocationMode::Custom,
        [(id("TV"), 180_000.0), (id("Digital"), 85_000.0)],
    );
    assert_eq!(total_budget(&plan), 265_000.0);
    let tv = share_of(&plan, &id("TV")).unwrap();
    assert!((tv - 0.679).abs() < 1e-3);

    let rebuilt: f64 = plan
        .channels()
        .map(|c| share_of(&plan, c).unwrap() * total_budget(&plan))
        .sum();
    assert!((rebuilt - total_budget(&plan)).abs() < 1e-6);
}

#[test]
fn edits_are_clamped_to_twice_the_optimal_reference() {
    let mut state = AllocationState::new(
        ReferenceAllocations::with_defaults(),
        &ChannelCatalog::with_defaults(),
    )
    .unwrap();
    assert_eq!(state.plan().amount(&id("TV")), 180_000.0);

    state.handle_budget_change(&id("TV"), 200_000.0).unwrap();
    assert_eq!(state.plan().amount(&id("TV")), 200_000.0);
    assert_eq!(state.mode(), AllocationMode::Custom);

    state.handle_budget_change(&id("TV"), 400_000.0).unwrap();
    assert_eq!(state.plan().amount(&id("TV")), 360_000.0);

    state.handle_optimal_allocation().unwrap();
    assert_eq!(state.plan().amount(&id("TV")), 180_000.0);
}

#[test]
fn percent_change_against_zero_is_a_sentinel() {
    for value in [0.0, 1.0, -42.5, 1e12] {
        assert_eq!(
            percent_change(value, 0.0),
            Err(EngineError::DivisionUndefined("previous value"))
        );
        assert_eq!(percent_change_or_none(value, 0.0), None);
    }
}

#[tokio::test]
async fn failed_load_exposes_complete_fallback() {
    let source = DirectorySource::new("/nonexistent/budget-analytics-data");
    let outcome = load_store(&source, ChannelCatalog::with_defaults()).await;
    assert_eq!(outcome.origin, DataOrigin::Fallback);
    assert!(outcome.warning.is_some());

    let store = &outcome.store;
    assert_eq!(store.monthly().len(), 12);
    assert!(!store.categories().is_empty());
    assert!(!store.budget_shifts().is_empty());
    assert!(!store.channel_responses().is_empty());
    assert!(!store.top_channels().is_empty());
    assert!(store.summary().ytd_revenue > 0.0);
    for record in store.monthly() {
        assert!(record.revenue.is_finite() && record.revenue > 0.0);
        assert!(record.total_marketing_spend > 0.0);
        assert!(!record.channel_spend.is_empty());
        assert!(!record.channel_roi.is_empty());
    }
}
