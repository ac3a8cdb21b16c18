//! Derived KPIs: percent changes, expected revenue and ROI of a plan, and
//! month-over-month growth.

pub mod channel;
pub mod growth;
pub mod summary;

use tracing::debug;

use crate::allocation::{total_budget, AllocationPlan};
use crate::channels::ChannelCatalog;
use crate::error::{EngineError, EngineResult};
use crate::model::ResponseCurve;

pub use growth::{growth_by, month_over_month_growth, GrowthPoint, GrowthSeries};

/// `(current / previous - 1) * 100`.
pub fn percent_change(current: f64, previous: f64) -> EngineResult<f64> {
    if !current.is_finite() || !previous.is_finite() {
        return Err(EngineError::invalid(format!(
            "percent change needs finite inputs, got {current} and {previous}"
        )));
    }
    if previous == 0.0 {
        return Err(EngineError::DivisionUndefined("previous value"));
    }
    Ok((current / previous - 1.0) * 100.0)
}

/// [`percent_change`] with every failure mapped to `None`.
pub fn percent_change_or_none(current: f64, previous: f64) -> Option<f64> {
    percent_change(current, previous).ok()
}

/// Sum of predicted revenue over the plan. Channels missing from the catalog
/// contribute nothing.
pub fn expected_revenue(
    plan: &AllocationPlan,
    catalog: &ChannelCatalog,
    curve: &ResponseCurve,
) -> EngineResult<f64> {
    let mut total = 0.0;
    for (id, budget) in plan.budgets() {
        let Some(channel) = catalog.get(id) else {
            debug!(channel = %id, "channel not in catalog, no predicted revenue");
            continue;
        };
        total += curve.predicted_revenue(channel, *budget)?;
    }
    Ok(total)
}

/// `(expected - total) / total * 100`.
pub fn projected_roi(
    plan: &AllocationPlan,
    catalog: &ChannelCatalog,
    curve: &ResponseCurve,
) -> EngineResult<f64> {
    let total = total_budget(plan);
    if total == 0.0 {
        return Err(EngineError::DivisionUndefined("total budget"));
    }
    let expected = expected_revenue(plan, catalog, curve)?;
    Ok((expected - total) / total * 100.0)
}
