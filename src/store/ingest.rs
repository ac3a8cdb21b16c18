//! Turns the six parsed JSON resources into a [`MetricsStore`].
//!
//! Ingestion never fails: rows without a usable key (period, category,
//! channel) are skipped with a warning and missing numbers count as zero.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::channels::{ChannelCatalog, ChannelId};
use crate::store::normalize::{
    get_case_insensitive, non_negative, normalize_percent, number_from_keys, number_or_zero,
    object_rows, ratio_from_maybe_percent, text_from_keys, to_f64,
};
use crate::store::{
    BudgetShift, CategoryRecord, ChannelResponse, MetricsStore, MonthlyRecord, PaymentSplit,
    Period, SummaryStats, TopChannel,
};

const PERIOD_KEYS: &[&str] = &["period", "month", "Date", "date"];
const REVENUE_KEYS: &[&str] = &["revenue", "gmv", "Total_Revenue", "totalRevenue"];
const UNITS_KEYS: &[&str] = &["unitsSold", "units", "units_sold"];
const TOTAL_SPEND_KEYS: &[&str] = &[
    "totalMarketingSpend",
    "Total_Spend",
    "totalInvestment",
    "total_investment",
    "marketing_spend",
];
const NPS_KEYS: &[&str] = &["npsScore", "nps"];
const DPI_KEYS: &[&str] = &["deliveryPerformanceIndex", "dpi"];
const CAC_KEYS: &[&str] = &["customerAcquisitionCost", "cac", "cpa"];
const COD_KEYS: &[&str] = &["cod", "spt_cod"];
const PREPAID_KEYS: &[&str] = &["prepaid", "spt_prepaid"];
const MROI_KEYS: &[&str] = &["mroi", "Overall_ROI", "overallRoi"];
const SDPI_KEYS: &[&str] = &["specialDayIndex", "sdpi"];
const NESTED_SPEND_KEYS: &[&str] = &["channelSpend", "perChannelSpend"];

const CATEGORY_KEYS: &[&str] = &["category", "product_analytic_category", "name"];
const CATEGORY_SHARE_KEYS: &[&str] = &["revenueShare", "Revenue_Percentage", "revenue_percentage"];
const AVERAGE_PRICE_KEYS: &[&str] = &["averagePrice", "average_price", "avgPrice"];
const RECOMMENDED_KEYS: &[&str] = &["recommendedBudget", "optimalBudget", "recommended_budget"];

const CHANNEL_KEYS: &[&str] = &["channel", "Channel"];

/// The six resources, already parsed. Missing resources are `Value::Null`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawBundle {
    pub monthly_data: Value,
    pub budget_optimization: Value,
    pub category_revenue: Value,
    pub channel_response: Value,
    pub top_channels: Value,
    pub summary_stats: Value,
}

pub fn ingest(bundle: &RawBundle, catalog: ChannelCatalog) -> MetricsStore {
    let monthly = object_rows(&bundle.monthly_data)
        .into_iter()
        .filter_map(|row| monthly_record(row, &catalog))
        .collect();
    let categories = category_records(&bundle.category_revenue);
    let shifts = budget_shifts(&bundle.budget_optimization);
    let responses = channel_responses(&bundle.channel_response);
    let top = top_channels(&bundle.top_channels);
    let summary = summary_stats(&bundle.summary_stats);

    MetricsStore::new(monthly, categories, catalog)
        .with_budget_shifts(shifts)
        .with_channel_responses(responses)
        .with_top_channels(top)
        .with_summary(summary)
}

fn monthly_record(row: &Map<String, Value>, catalog: &ChannelCatalog) -> Option<MonthlyRecord> {
    let raw_period = text_from_keys(row, PERIOD_KEYS);
    let period = match raw_period.as_deref().map(str::parse::<Period>) {
        Some(Ok(period)) => period,
        Some(Err(e)) => {
            warn!(error = %e, "skipping monthly record");
            return None;
        }
        None => {
            warn!("skipping monthly record without a period");
            return None;
        }
    };

    let channel_spend = channel_spend(row, catalog);
    let channel_roi = channel_roi(row);
    let total_marketing_spend = number_from_keys(row, TOTAL_SPEND_KEYS)
        .map(non_negative)
        .unwrap_or_else(|| channel_spend.values().sum());

    Some(MonthlyRecord {
        period,
        revenue: number_or_zero(row, REVENUE_KEYS),
        units_sold: number_or_zero(row, UNITS_KEYS),
        total_marketing_spend,
        channel_spend,
        channel_roi,
        nps_score: number_or_zero(row, NPS_KEYS),
        delivery_performance_index: number_or_zero(row, DPI_KEYS),
        customer_acquisition_cost: number_or_zero(row, CAC_KEYS),
        payment_split: payment_split(row),
        mroi: number_or_zero(row, MROI_KEYS),
        special_day_index: number_or_zero(row, SDPI_KEYS),
    })
}

/// Spend comes from `<Channel>_Spend` columns, columns named after a catalog
/// channel, or a nested `channelSpend` object.
fn channel_spend(row: &Map<String, Value>, catalog: &ChannelCatalog) -> BTreeMap<ChannelId, f64> {
    let mut spend = BTreeMap::new();
    for (key, value) in row {
        if let Some(id) = spend_column(key, catalog) {
            let amount = non_negative(to_f64(value).unwrap_or(0.0));
            *spend.entry(id).or_insert(0.0) += amount;
        }
    }
    for key in NESTED_SPEND_KEYS {
        let Some(Value::Object(nested)) = get_case_insensitive(row, key) else {
            continue;
        };
        for (name, value) in nested {
            let Ok(id) = name.parse::<ChannelId>() else {
                continue;
            };
            spend.insert(id, non_negative(to_f64(value).unwrap_or(0.0)));
        }
    }
    spend
}

/// `<Channel>_ROI` columns; `Overall_ROI` is the monthly MROI instead.
fn channel_roi(row: &Map<String, Value>) -> BTreeMap<ChannelId, f64> {
    row.iter()
        .filter_map(|(key, value)| {
            let lowered = key.to_ascii_lowercase();
            let prefix = lowered.strip_suffix("_roi")?;
            if prefix == "overall" || prefix == "total" {
                return None;
            }
            let id = key.get(..prefix.len())?.parse::<ChannelId>().ok()?;
            Some((id, to_f64(value)?))
        })
        .collect()
}

fn spend_column(key: &str, catalog: &ChannelCatalog) -> Option<ChannelId> {
    if TOTAL_SPEND_KEYS
        .iter()
        .any(|total| total.eq_ignore_ascii_case(key))
    {
        return None;
    }
    let lowered = key.to_ascii_lowercase();
    if lowered.ends_with("_spend") {
        if lowered.starts_with("total") {
            return None;
        }
        return key.parse().ok();
    }
    catalog.resolve(key).map(|channel| channel.id.clone())
}

fn payment_split(row: &Map<String, Value>) -> PaymentSplit {
    let nested = match get_case_insensitive(row, "paymentSplit") {
        Some(Value::Object(nested)) => nested,
        _ => row,
    };
    let cod = number_from_keys(nested, COD_KEYS).map(ratio_from_maybe_percent);
    let prepaid = number_from_keys(nested, PREPAID_KEYS).map(ratio_from_maybe_percent);
    match (cod, prepaid) {
        (Some(cod), Some(prepaid)) => PaymentSplit { cod, prepaid },
        (Some(cod), None) => PaymentSplit { cod, prepaid: 1.0 - cod },
        (None, Some(prepaid)) => PaymentSplit { cod: 1.0 - prepaid, prepaid },
        (None, None) => PaymentSplit::default(),
    }
}

fn category_records(value: &Value) -> Vec<CategoryRecord> {
    let mut records: Vec<(CategoryRecord, bool)> = Vec::new();
    for row in object_rows(value) {
        let Some(category) = text_from_keys(row, CATEGORY_KEYS) else {
            warn!("skipping category row without a name");
            continue;
        };
        let revenue = non_negative(number_or_zero(row, REVENUE_KEYS));
        let units = non_negative(number_or_zero(row, UNITS_KEYS));
        let average_price = number_from_keys(row, AVERAGE_PRICE_KEYS)
            .unwrap_or(if units > 0.0 { revenue / units } else { 0.0 });
        let share = number_from_keys(row, CATEGORY_SHARE_KEYS);
        records.push((
            CategoryRecord {
                category,
                revenue,
                units,
                average_price,
                recommended_budget: non_negative(number_or_zero(row, RECOMMENDED_KEYS)),
                revenue_share: share.map(normalize_percent).unwrap_or(0.0),
            },
            share.is_some(),
        ));
    }

    let total: f64 = records.iter().map(|(record, _)| record.revenue).sum();
    records
        .into_iter()
        .map(|(mut record, has_share)| {
            if !has_share && total > 0.0 {
                record.revenue_share = record.revenue / total * 100.0;
            }
            record
        })
        .collect()
}

fn row_channel(row: &Map<String, Value>) -> Option<ChannelId> {
    let raw = text_from_keys(row, CHANNEL_KEYS)?;
    match raw.parse() {
        Ok(id) => Some(id),
        Err(e) => {
            debug!(error = %e, "ignoring row with unusable channel");
            None
        }
    }
}

fn budget_shifts(value: &Value) -> Vec<BudgetShift> {
    object_rows(value)
        .into_iter()
        .filter_map(|row| {
            let channel = row_channel(row)?;
            let current = normalize_percent(number_or_zero(
                row,
                &["currentPercentage", "Current_Percentage"],
            ));
            let optimized = normalize_percent(number_or_zero(
                row,
                &["optimizedPercentage", "Optimized_Percentage"],
            ));
            let change = number_from_keys(row, &["changePercentage", "Change_Percentage"])
                .unwrap_or(optimized - current);
            Some(BudgetShift {
                channel,
                current_percentage: current,
                optimized_percentage: optimized,
                change_percentage: change,
            })
        })
        .collect()
}

fn channel_responses(value: &Value) -> Vec<ChannelResponse> {
    object_rows(value)
        .into_iter()
        .filter_map(|row| {
            Some(ChannelResponse {
                category: text_from_keys(row, CATEGORY_KEYS)?,
                channel: row_channel(row)?,
                response_factor: non_negative(number_or_zero(
                    row,
                    &["responseFactor", "Response_Factor"],
                )),
            })
        })
        .collect()
}

fn top_channels(value: &Value) -> Vec<TopChannel> {
    object_rows(value)
        .into_iter()
        .filter_map(|row| {
            Some(TopChannel {
                category: text_from_keys(row, CATEGORY_KEYS)?,
                channel: row_channel(row)?,
                effectiveness_score: number_or_zero(
                    row,
                    &["effectivenessScore", "Effectiveness_Score"],
                ),
            })
        })
        .collect()
}

fn summary_stats(value: &Value) -> SummaryStats {
    let object = match value {
        Value::Object(object) => Some(object),
        Value::Array(_) => object_rows(value).into_iter().next(),
        _ => None,
    };
    let Some(row) = object else {
        return SummaryStats::default();
    };
    SummaryStats {
        ytd_revenue: number_or_zero(row, &["ytdRevenue", "ytd_revenue"]),
        marketing_spend: number_or_zero(row, &["marketingSpend", "marketing_spend"]),
        overall_roi: number_or_zero(row, &["overallRoi", "overall_roi"]),
        previous_ytd_revenue: number_or_zero(row, &["previousYtdRevenue", "previous_ytd_revenue"]),
        previous_marketing_spend: number_or_zero(
            row,
            &["previousMarketingSpend", "previous_marketing_spend"],
        ),
        previous_overall_roi: number_or_zero(row, &["previousOverallRoi", "previous_overall_roi"]),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::channels::{ChannelCatalog, ChannelId};

    use super::{ingest, RawBundle};

    fn id(name: &str) -> ChannelId {
        name.parse().unwrap()
    }

    #[test]
    fn reads_dashboard_style_monthly_rows() {
        let bundle = RawBundle {
            monthly_data: json!([
                { "month": "Jul 23", "gmv": 384000, "units": 3840, "totalInvestment": 29000,
                  "TV": 12000, "ContentMarketing": 2000, "nps": 75, "dpi": 94, "cpa": 8500,
                  "spt_cod": 0.42, "spt_prepaid": 0.58, "mroi": 12.5, "sdpi": 450 }
            ]),
            ..RawBundle::default()
        };
        let store = ingest(&bundle, ChannelCatalog::with_defaults());
        let record = &store.monthly()[0];
        assert_eq!(record.revenue, 384_000.0);
        assert_eq!(record.total_marketing_spend, 29_000.0);
        assert_eq!(record.spend_for(&id("TV")), 12_000.0);
        assert_eq!(record.spend_for(&id("Content Marketing")), 2_000.0);
        assert_eq!(record.payment_split.cod, 0.42);
        assert_eq!(record.special_day_index, 450.0);
        assert_eq!(record.channel_spend.len(), 2);
    }

    #[test]
    fn reads_spend_suffixed_columns_and_derives_total() {
        let bundle = RawBundle {
            monthly_data: json!([
                { "Date": "2024-01-01", "Revenue": "1,000", "TV_Spend": 100, "Social_Spend": "50",
                  "TV_ROI": 4.1, "Overall_ROI": 5.0 }
            ]),
            ..RawBundle::default()
        };
        let store = ingest(&bundle, ChannelCatalog::with_defaults());
        let record = &store.monthly()[0];
        assert_eq!(record.revenue, 1_000.0);
        assert_eq!(record.total_marketing_spend, 150.0);
        assert_eq!(record.mroi, 5.0);
        assert_eq!(record.channel_roi.len(), 1);
        assert_eq!(record.spend_for(&id("Social")), 50.0);
        assert_eq!(record.units_sold, 0.0);
        assert_eq!(record.nps_score, 0.0);
        assert_eq!(record.roi_for(&id("TV")), Some(4.1));
        assert_eq!(record.roi_for(&id("Social")), None);
    }

    #[test]
    fn total_spend_column_is_not_a_channel() {
        let bundle = RawBundle {
            monthly_data: json!([
                { "month": "Jul 23", "marketing_spend": 29000, "TV_Spend": 12000 }
            ]),
            ..RawBundle::default()
        };
        let store = ingest(&bundle, ChannelCatalog::with_defaults());
        let record = &store.monthly()[0];
        assert_eq!(record.total_marketing_spend, 29_000.0);
        assert_eq!(record.channel_spend.len(), 1);
        assert_eq!(record.spend_for(&id("TV")), 12_000.0);
        assert_eq!(store.channel_spend_totals().len(), 1);
    }

    #[test]
    fn drops_rows_without_period_and_sorts() {
        let bundle = RawBundle {
            monthly_data: json!([
                { "month": "Sep 23", "gmv": 3 },
                { "gmv": 99 },
                { "month": "Smarch 23", "gmv": 98 },
                { "month": "Jul 23", "gmv": 1 }
            ]),
            ..RawBundle::default()
        };
        let store = ingest(&bundle, ChannelCatalog::with_defaults());
        let revenues: Vec<f64> = store.monthly().iter().map(|r| r.revenue).collect();
        assert_eq!(revenues, [1.0, 3.0]);
    }

    #[test]
    fn category_share_is_computed_when_absent() {
        let bundle = RawBundle {
            category_revenue: json!([
                { "category": "Camera", "revenue": 300, "units": 3, "optimalBudget": 10 },
                { "category": "Audio", "revenue": 100, "units": 0 },
                { "revenue": 50 }
            ]),
            ..RawBundle::default()
        };
        let store = ingest(&bundle, ChannelCatalog::with_defaults());
        let camera = store.category("camera").unwrap();
        assert_eq!(camera.revenue_share, 75.0);
        assert_eq!(camera.average_price, 100.0);
        assert_eq!(camera.recommended_budget, 10.0);
        assert_eq!(store.category("audio").unwrap().average_price, 0.0);
        assert_eq!(store.categories().len(), 2);
    }

    #[test]
    fn reads_supplementary_tables() {
        let bundle = RawBundle {
            budget_optimization: json!([
                { "Channel": "Digital", "Current_Percentage": 25, "Optimized_Percentage": 35 }
            ]),
            channel_response: json!([
                { "Category": "Audio", "Channel": "Radio", "Response_Factor": 0.75 }
            ]),
            top_channels: json!([
                { "Category": "Audio", "Channel": "Radio", "Effectiveness_Score": 750000 }
            ]),
            summary_stats: json!({ "ytd_revenue": 16200000, "overall_roi": "5.2" }),
            ..RawBundle::default()
        };
        let store = ingest(&bundle, ChannelCatalog::with_defaults());
        assert_eq!(store.budget_shifts()[0].change_percentage, 10.0);
        assert_eq!(store.channel_responses()[0].channel, id("Radio"));
        assert_eq!(store.top_channels()[0].effectiveness_score, 750_000.0);
        assert_eq!(store.summary().ytd_revenue, 16_200_000.0);
        assert_eq!(store.summary().overall_roi, 5.2);
        assert_eq!(store.summary().previous_overall_roi, 0.0);
    }

    #[test]
    fn empty_bundle_yields_empty_store() {
        let store = ingest(&RawBundle::default(), ChannelCatalog::with_defaults());
        assert!(store.monthly().is_empty());
        assert!(store.categories().is_empty());
    }
}
