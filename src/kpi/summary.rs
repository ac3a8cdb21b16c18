use serde::Serialize;

use crate::kpi::percent_change_or_none;
use crate::store::{MetricsStore, MonthlyRecord, Period};

/// Headline figures for the overview cards. Changes are `None` when the
/// baseline is zero or missing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryKpis {
    pub ytd_revenue: f64,
    pub ytd_revenue_change: Option<f64>,
    pub marketing_spend: f64,
    pub marketing_spend_change: Option<f64>,
    pub overall_roi: f64,
    /// Difference in ROI points against the previous year.
    pub roi_change: f64,
    /// Latest month's reported ROI against the month before, in percent.
    pub roi_trend: Option<f64>,
}

pub fn summary_kpis(store: &MetricsStore) -> SummaryKpis {
    let stats = store.summary();
    SummaryKpis {
        ytd_revenue: stats.ytd_revenue,
        ytd_revenue_change: percent_change_or_none(stats.ytd_revenue, stats.previous_ytd_revenue),
        marketing_spend: stats.marketing_spend,
        marketing_spend_change: percent_change_or_none(
            stats.marketing_spend,
            stats.previous_marketing_spend,
        ),
        overall_roi: stats.overall_roi,
        roi_change: stats.overall_roi - stats.previous_overall_roi,
        roi_trend: roi_trend(store),
    }
}

pub fn roi_trend(store: &MetricsStore) -> Option<f64> {
    let latest = store.latest()?;
    let previous = store.previous()?;
    percent_change_or_none(latest.mroi, previous.mroi)
}

/// Latest month against the one before it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthSnapshot {
    pub period: Period,
    pub revenue: f64,
    pub revenue_change: Option<f64>,
    pub units_sold: f64,
    pub units_change: Option<f64>,
    pub marketing_spend: f64,
    pub spend_change: Option<f64>,
    pub nps_score: f64,
    pub nps_change: Option<f64>,
}

pub fn latest_snapshot(store: &MetricsStore) -> Option<MonthSnapshot> {
    let latest = store.latest()?;
    Some(snapshot(latest, store.previous()))
}

fn snapshot(current: &MonthlyRecord, previous: Option<&MonthlyRecord>) -> MonthSnapshot {
    let change = |pick: fn(&MonthlyRecord) -> f64| {
        previous.and_then(|previous| percent_change_or_none(pick(current), pick(previous)))
    };
    MonthSnapshot {
        period: current.period,
        revenue: current.revenue,
        revenue_change: change(|r| r.revenue),
        units_sold: current.units_sold,
        units_change: change(|r| r.units_sold),
        marketing_spend: current.total_marketing_spend,
        spend_change: change(|r| r.total_marketing_spend),
        nps_score: current.nps_score,
        nps_change: change(|r| r.nps_score),
    }
}
