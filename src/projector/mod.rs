//! Reshapes engine results into flat chart rows.
//!
//! Every function here is pure. Field names match what the dashboard charts
//! bind to (`previousBudget`, `deltaPercent`, ...).

use std::collections::BTreeSet;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::allocation::{compare, AllocationPlan, ReferenceAllocations};
use crate::channels::{ChannelCatalog, ChannelId};
use crate::error::{EngineError, EngineResult};
use crate::kpi::channel::ChannelRoi;
use crate::kpi::summary::SummaryKpis;
use crate::kpi::GrowthPoint;
use crate::model::{CurvePoint, ResponseCurve};
use crate::store::{CategoryRecord, MonthlyRecord};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationRow {
    pub channel: String,
    pub budget: f64,
    pub previous_budget: f64,
    pub optimal_budget: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonRow {
    pub channel: String,
    pub amount_a: f64,
    pub amount_b: f64,
    pub delta_absolute: f64,
    pub delta_percent: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendRow {
    pub month: String,
    pub revenue: f64,
    pub spend: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoiRow {
    pub channel: String,
    pub roi: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionRow {
    pub name: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrowthRow {
    pub month: String,
    pub growth: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentRow {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiCard {
    pub label: String,
    pub value: f64,
    pub change: Option<f64>,
}

/// One row per channel in the plan, alongside both reference amounts.
pub fn allocation_rows(
    plan: &AllocationPlan,
    references: &ReferenceAllocations,
    catalog: &ChannelCatalog,
) -> Vec<AllocationRow> {
    plan.budgets()
        .iter()
        .map(|(channel, budget)| AllocationRow {
            channel: catalog.display_name_for(channel).to_string(),
            budget: *budget,
            previous_budget: references.previous_amount(channel).unwrap_or(0.0),
            optimal_budget: references.optimal_amount(channel).unwrap_or(0.0),
        })
        .collect()
}

pub fn comparison_rows(
    plan_a: &AllocationPlan,
    plan_b: &AllocationPlan,
    catalog: &ChannelCatalog,
) -> Vec<ComparisonRow> {
    compare(plan_a, plan_b)
        .into_iter()
        .map(|(channel, delta)| ComparisonRow {
            channel: catalog.display_name_for(&channel).to_string(),
            amount_a: delta.amount_a,
            amount_b: delta.amount_b,
            delta_absolute: delta.delta_absolute,
            delta_percent: delta.delta_percent,
        })
        .collect()
}

pub fn revenue_trend(records: &[MonthlyRecord]) -> Vec<TrendRow> {
    records
        .iter()
        .map(|record| TrendRow {
            month: record.period.label(),
            revenue: record.revenue,
            spend: record.total_marketing_spend,
        })
        .collect()
}

/// `{month, <channel>: spend, ...}` rows restricted to the selected channels.
/// Keys use the catalog's canonical ids so chart series line up with colors.
pub fn channel_spend_rows(
    records: &[MonthlyRecord],
    selected: &BTreeSet<ChannelId>,
) -> Vec<Map<String, Value>> {
    records
        .iter()
        .map(|record| {
            let mut row = Map::new();
            row.insert("month".to_string(), Value::from(record.period.label()));
            for channel in selected {
                row.insert(
                    channel.as_str().to_string(),
                    Value::from(record.spend_for(channel)),
                );
            }
            row
        })
        .collect()
}

pub fn roi_rows(ranking: &[ChannelRoi], catalog: &ChannelCatalog) -> Vec<RoiRow> {
    ranking
        .iter()
        .map(|entry| RoiRow {
            channel: catalog.display_name_for(&entry.channel).to_string(),
            roi: entry.roi,
        })
        .collect()
}

pub fn category_distribution(categories: &[CategoryRecord]) -> Vec<DistributionRow> {
    categories
        .iter()
        .map(|category| DistributionRow {
            name: category.category.clone(),
            value: category.revenue_share,
        })
        .collect()
}

pub fn response_curve_rows(
    curve: &ResponseCurve,
    catalog: &ChannelCatalog,
    channel: &ChannelId,
    max_budget: f64,
    steps: usize,
) -> EngineResult<Vec<CurvePoint>> {
    let Some(entry) = catalog.get(channel) else {
        return Err(EngineError::invalid(format!("unknown channel: {channel}")));
    };
    curve.sample(entry, max_budget, steps)
}

pub fn growth_rows(points: impl IntoIterator<Item = GrowthPoint>) -> Vec<GrowthRow> {
    points
        .into_iter()
        .map(|point| GrowthRow {
            month: point.period.label(),
            growth: point.growth_percent,
        })
        .collect()
}

/// COD and prepaid shares of one month, as percentages.
pub fn payment_split_rows(record: &MonthlyRecord) -> Vec<PaymentRow> {
    vec![
        PaymentRow {
            kind: "COD".to_string(),
            value: record.payment_split.cod * 100.0,
        },
        PaymentRow {
            kind: "Prepaid".to_string(),
            value: record.payment_split.prepaid * 100.0,
        },
    ]
}

pub fn kpi_cards(kpis: &SummaryKpis) -> Vec<KpiCard> {
    vec![
        KpiCard {
            label: "YTD Revenue".to_string(),
            value: kpis.ytd_revenue,
            change: kpis.ytd_revenue_change,
        },
        KpiCard {
            label: "Marketing Spend".to_string(),
            value: kpis.marketing_spend,
            change: kpis.marketing_spend_change,
        },
        KpiCard {
            label: "Overall ROI".to_string(),
            value: kpis.overall_roi,
            change: Some(kpis.roi_change),
        },
    ]
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use serde_json::json;

    use crate::allocation::{AllocationMode, AllocationPlan, ReferenceAllocations};
    use crate::channels::{ChannelCatalog, ChannelId};
    use crate::kpi::channel::channel_roi_ranking;
    use crate::kpi::month_over_month_growth;
    use crate::kpi::summary::summary_kpis;
    use crate::model::ResponseCurve;
    use crate::store::fallback::fallback_store;
    use crate::store::ingest::{ingest, RawBundle};

    use super::{
        allocation_rows, category_distribution, channel_spend_rows, comparison_rows, growth_rows,
        kpi_cards, payment_split_rows, response_curve_rows, revenue_trend, roi_rows,
    };

    fn id(name: &str) -> ChannelId {
        name.parse().unwrap()
    }

    #[test]
    fn allocation_rows_carry_reference_amounts() {
        let references = ReferenceAllocations::with_defaults();
        let plan = references.plan(AllocationMode::Optimal).unwrap();
        let rows = allocation_rows(&plan, &references, &ChannelCatalog::with_defaults());
        let tv = rows.iter().find(|r| r.channel == "TV").unwrap();
        assert_eq!(tv.budget, 180_000.0);
        assert_eq!(tv.previous_budget, 156_000.0);
        assert_eq!(tv.optimal_budget, 180_000.0);
        let value = serde_json::to_value(tv).unwrap();
        assert_eq!(value["previousBudget"], json!(156_000.0));
        assert!(rows.iter().any(|r| r.channel == "Content Marketing"));
    }

    #[test]
    fn comparison_rows_serialize_null_percent() {
        let references = ReferenceAllocations::with_defaults();
        let optimal = references.plan(AllocationMode::Optimal).unwrap();
        let empty = AllocationPlan::new(AllocationMode::Custom, [(id("TV"), 0.0)]);
        let rows = comparison_rows(&optimal, &empty, &ChannelCatalog::with_defaults());
        assert_eq!(rows.len(), 9);
        let tv = rows.iter().find(|r| r.channel == "TV").unwrap();
        let value = serde_json::to_value(tv).unwrap();
        assert_eq!(value["deltaPercent"], serde_json::Value::Null);
        assert_eq!(value["deltaAbsolute"], json!(180_000.0));
    }

    #[test]
    fn trend_and_spend_rows_follow_months() {
        let store = fallback_store(ChannelCatalog::with_defaults());
        let trend = revenue_trend(store.monthly());
        assert_eq!(trend.len(), 12);
        assert_eq!(trend[0].month, "Jul 23");
        assert_eq!(trend[0].spend, 29_000.0);

        let selected: BTreeSet<ChannelId> = [id("TV"), id("Radio")].into_iter().collect();
        let rows = channel_spend_rows(store.monthly(), &selected);
        assert_eq!(rows[0].len(), 3);
        assert_eq!(rows[0]["TV"], json!(12_000.0));
        assert_eq!(rows[0]["month"], json!("Jul 23"));
    }

    #[test]
    fn roi_rows_use_display_names_best_first() {
        let bundle = RawBundle {
            monthly_data: json!([
                { "month": "Jul 23", "TV_ROI": 2.9, "ContentMarketing_ROI": 4.6,
                  "Podcast_ROI": 3.3, "Overall_ROI": 12.5 }
            ]),
            ..RawBundle::default()
        };
        let catalog = ChannelCatalog::with_defaults();
        let store = ingest(&bundle, catalog.clone());
        let ranking = channel_roi_ranking(store.latest().unwrap());
        let rows = roi_rows(&ranking, &catalog);
        let names: Vec<&str> = rows.iter().map(|r| r.channel.as_str()).collect();
        assert_eq!(names, ["Content Marketing", "Podcast", "TV"]);
        assert_eq!(rows[0].roi, 4.6);
        assert!(rows.windows(2).all(|w| w[0].roi >= w[1].roi));
    }

    #[test]
    fn growth_rows_leave_zero_baseline_undefined() {
        let bundle = RawBundle {
            monthly_data: json!([
                { "month": "Jul 23", "gmv": 0 },
                { "month": "Aug 23", "gmv": 100 },
                { "month": "Sep 23", "gmv": 150 }
            ]),
            ..RawBundle::default()
        };
        let store = ingest(&bundle, ChannelCatalog::with_defaults());
        let rows = growth_rows(month_over_month_growth(store.monthly()));
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].growth, None);
        assert_eq!(rows[1].growth, None);
        assert_eq!(rows[2].growth, Some(50.0));
        let value = serde_json::to_value(&rows[1]).unwrap();
        assert_eq!(value["growth"], serde_json::Value::Null);
    }

    #[test]
    fn distribution_growth_and_payment_rows() {
        let store = fallback_store(ChannelCatalog::with_defaults());
        let distribution = category_distribution(store.categories());
        let total: f64 = distribution.iter().map(|r| r.value).sum();
        assert!((total - 100.0).abs() < 1e-9);

        let growth = growth_rows(month_over_month_growth(store.monthly()));
        assert_eq!(growth[0].growth, None);
        assert_eq!(growth.len(), 12);

        let payment = serde_json::to_value(payment_split_rows(store.latest().unwrap())).unwrap();
        assert_eq!(payment[0]["type"], json!("COD"));
    }

    #[test]
    fn curve_rows_need_known_channel() {
        let catalog = ChannelCatalog::with_defaults();
        let curve = ResponseCurve::default();
        assert!(response_curve_rows(&curve, &catalog, &id("Podcast"), 1_000.0, 4).is_err());
        let rows = response_curve_rows(&curve, &catalog, &id("TV"), 400_000.0, 4).unwrap();
        assert_eq!(rows.len(), 5);
    }

    #[test]
    fn kpi_cards_cover_headline_figures() {
        let store = fallback_store(ChannelCatalog::with_defaults());
        let cards = kpi_cards(&summary_kpis(&store));
        assert_eq!(cards.len(), 3);
        assert_eq!(cards[0].label, "YTD Revenue");
        assert!(cards.iter().all(|c| c.change.is_some()));
    }
}
