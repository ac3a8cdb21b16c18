//! Built-in dataset substituted when the six resources cannot be loaded.
//!
//! Everything here is deterministic so that two fallback loads always
//! render the same dashboards.

use serde_json::{json, Map, Value};

use crate::allocation::{shares, AllocationMode, ReferenceAllocations};
use crate::channels::ChannelCatalog;
use crate::store::ingest::{ingest, RawBundle};
use crate::store::MetricsStore;

/// Channel columns in the order the monthly rows list them.
const MONTHLY_CHANNELS: [&str; 9] = [
    "TV",
    "Digital",
    "Sponsorship",
    "ContentMarketing",
    "OnlineMarketing",
    "Affiliates",
    "SEM",
    "Radio",
    "Other",
];

struct Month {
    label: &'static str,
    gmv: f64,
    units: f64,
    investment: f64,
    spend: [f64; 9],
    nps: f64,
    mroi: f64,
    dpi: f64,
    cpa: f64,
    cod: f64,
    sdpi: f64,
}

#[rustfmt::skip]
const MONTHS: [Month; 12] = [
    Month { label: "Jul 23", gmv: 384_000.0, units: 3840.0, investment: 29_000.0, spend: [12000.0, 5000.0, 3000.0, 2000.0, 3500.0, 1500.0, 1000.0, 500.0, 500.0], nps: 75.0, mroi: 12.5, dpi: 94.0, cpa: 8500.0, cod: 0.42, sdpi: 450.0 },
    Month { label: "Aug 23", gmv: 368_000.0, units: 3680.0, investment: 27_500.0, spend: [11000.0, 4800.0, 3200.0, 1800.0, 3200.0, 1600.0, 1100.0, 400.0, 400.0], nps: 72.0, mroi: 13.2, dpi: 92.0, cpa: 8200.0, cod: 0.46, sdpi: 380.0 },
    Month { label: "Sep 23", gmv: 402_000.0, units: 4020.0, investment: 30_000.0, spend: [12500.0, 5200.0, 3100.0, 2100.0, 3600.0, 1500.0, 1200.0, 400.0, 400.0], nps: 76.0, mroi: 14.0, dpi: 93.0, cpa: 8300.0, cod: 0.44, sdpi: 420.0 },
    Month { label: "Oct 23", gmv: 493_000.0, units: 4930.0, investment: 32_000.0, spend: [13000.0, 5500.0, 3300.0, 2300.0, 3800.0, 1700.0, 1400.0, 500.0, 500.0], nps: 78.0, mroi: 15.4, dpi: 95.0, cpa: 7200.0, cod: 0.41, sdpi: 780.0 },
    Month { label: "Nov 23", gmv: 475_000.0, units: 4750.0, investment: 33_500.0, spend: [13500.0, 5700.0, 3400.0, 2400.0, 4000.0, 1800.0, 1500.0, 600.0, 600.0], nps: 77.0, mroi: 14.2, dpi: 94.0, cpa: 7800.0, cod: 0.38, sdpi: 680.0 },
    Month { label: "Dec 23", gmv: 528_000.0, units: 5280.0, investment: 35_000.0, spend: [14000.0, 6000.0, 3500.0, 2500.0, 4200.0, 1900.0, 1600.0, 600.0, 700.0], nps: 79.0, mroi: 15.1, dpi: 96.0, cpa: 7000.0, cod: 0.35, sdpi: 820.0 },
    Month { label: "Jan 24", gmv: 412_000.0, units: 4120.0, investment: 31_000.0, spend: [12500.0, 5300.0, 3200.0, 2200.0, 3700.0, 1600.0, 1300.0, 500.0, 600.0], nps: 74.0, mroi: 13.3, dpi: 92.0, cpa: 8400.0, cod: 0.40, sdpi: 550.0 },
    Month { label: "Feb 24", gmv: 426_000.0, units: 4260.0, investment: 32_000.0, spend: [13000.0, 5400.0, 3300.0, 2200.0, 3800.0, 1700.0, 1300.0, 600.0, 600.0], nps: 76.0, mroi: 13.3, dpi: 93.0, cpa: 8200.0, cod: 0.42, sdpi: 620.0 },
    Month { label: "Mar 24", gmv: 438_000.0, units: 4380.0, investment: 32_500.0, spend: [13200.0, 5500.0, 3300.0, 2300.0, 3900.0, 1700.0, 1400.0, 600.0, 600.0], nps: 77.0, mroi: 13.5, dpi: 94.0, cpa: 8100.0, cod: 0.41, sdpi: 480.0 },
    Month { label: "Apr 24", gmv: 455_000.0, units: 4550.0, investment: 33_000.0, spend: [13300.0, 5600.0, 3400.0, 2400.0, 4000.0, 1800.0, 1500.0, 500.0, 500.0], nps: 78.0, mroi: 13.8, dpi: 95.0, cpa: 7900.0, cod: 0.39, sdpi: 520.0 },
    Month { label: "May 24", gmv: 468_000.0, units: 4680.0, investment: 33_500.0, spend: [13500.0, 5700.0, 3500.0, 2500.0, 4100.0, 1800.0, 1600.0, 500.0, 500.0], nps: 79.0, mroi: 14.0, dpi: 95.0, cpa: 7800.0, cod: 0.38, sdpi: 650.0 },
    Month { label: "Jun 24", gmv: 482_000.0, units: 4820.0, investment: 34_000.0, spend: [13700.0, 5800.0, 3600.0, 2600.0, 4200.0, 1900.0, 1700.0, 500.0, 500.0], nps: 80.0, mroi: 14.2, dpi: 96.0, cpa: 7700.0, cod: 0.37, sdpi: 580.0 },
];

/// category, revenue, units, average price, recommended budget
const CATEGORIES: [(&str, f64, f64, f64, f64); 5] = [
    ("EntertainmentSmall", 180_000.0, 2400.0, 75.0, 120_000.0),
    ("Camera", 135_000.0, 450.0, 300.0, 90_000.0),
    ("CameraAccessory", 95_000.0, 1900.0, 50.0, 65_000.0),
    ("GamingHardware", 110_000.0, 550.0, 200.0, 75_000.0),
    ("GameCDDVD", 110_000.0, 2200.0, 50.0, 28_000.0),
];

const DEFAULT_RESPONSE_FACTOR: f64 = 0.4;

/// (category, channel, factor) pairs that respond better than the default.
const STRONG_RESPONSES: [(&str, &str, f64); 4] = [
    ("Camera", "Digital", 0.8),
    ("Camera", "TV", 0.8),
    ("GamingHardware", "Digital", 0.85),
    ("GamingHardware", "OnlineMarketing", 0.85),
];

pub fn fallback_bundle() -> RawBundle {
    RawBundle {
        monthly_data: monthly_rows(),
        budget_optimization: budget_rows(),
        category_revenue: category_rows(),
        channel_response: response_rows(),
        top_channels: top_channel_rows(),
        summary_stats: json!({
            "ytd_revenue": 16_200_000.0,
            "marketing_spend": 3_100_000.0,
            "overall_roi": 5.2,
            "previous_ytd_revenue": 14_900_000.0,
            "previous_marketing_spend": 2_950_000.0,
            "previous_overall_roi": 4.9,
        }),
    }
}

pub fn fallback_store(catalog: ChannelCatalog) -> MetricsStore {
    ingest(&fallback_bundle(), catalog)
}

/// Per-channel ROI columns follow the default catalog coefficients, scaled by
/// how the month's MROI compares with the year's mean.
fn monthly_rows() -> Value {
    let catalog = ChannelCatalog::with_defaults();
    let mean_mroi = MONTHS.iter().map(|m| m.mroi).sum::<f64>() / MONTHS.len() as f64;
    let rows = MONTHS
        .iter()
        .map(|m| {
            let mut row = Map::new();
            row.insert("month".into(), json!(m.label));
            row.insert("gmv".into(), json!(m.gmv));
            row.insert("units".into(), json!(m.units));
            row.insert("totalInvestment".into(), json!(m.investment));
            for (channel, amount) in MONTHLY_CHANNELS.iter().zip(m.spend) {
                row.insert(format!("{channel}_Spend"), json!(amount));
                if let Some(roi) = catalog.resolve(channel).map(|c| c.roi_coefficient) {
                    row.insert(format!("{channel}_ROI"), json!(roi * m.mroi / mean_mroi));
                }
            }
            row.insert("nps".into(), json!(m.nps));
            row.insert("mroi".into(), json!(m.mroi));
            row.insert("dpi".into(), json!(m.dpi));
            row.insert("cpa".into(), json!(m.cpa));
            row.insert("spt_cod".into(), json!(m.cod));
            row.insert("spt_prepaid".into(), json!(1.0 - m.cod));
            row.insert("sdpi".into(), json!(m.sdpi));
            Value::Object(row)
        })
        .collect();
    Value::Array(rows)
}

/// Current and optimized shares mirror the previous and optimal reference
/// allocations.
fn budget_rows() -> Value {
    let references = ReferenceAllocations::with_defaults();
    let (Ok(previous), Ok(optimal)) = (
        references.plan(AllocationMode::Previous),
        references.plan(AllocationMode::Optimal),
    ) else {
        return Value::Array(Vec::new());
    };
    let current = shares(&previous);
    let optimized = shares(&optimal);
    let rows = optimized
        .iter()
        .map(|(channel, optimized)| {
            let current = current.get(channel).copied().unwrap_or(0.0) * 100.0;
            let optimized = optimized * 100.0;
            json!({
                "Channel": channel.as_str(),
                "Current_Percentage": current,
                "Optimized_Percentage": optimized,
                "Change_Percentage": optimized - current,
            })
        })
        .collect();
    Value::Array(rows)
}

fn category_rows() -> Value {
    let total: f64 = CATEGORIES.iter().map(|c| c.1).sum();
    let rows = CATEGORIES
        .iter()
        .map(|(category, revenue, units, price, budget)| {
            json!({
                "category": category,
                "revenue": revenue,
                "units": units,
                "averagePrice": price,
                "optimalBudget": budget,
                "Revenue_Percentage": revenue / total * 100.0,
            })
        })
        .collect();
    Value::Array(rows)
}

fn response_factor(category: &str, channel: &str) -> f64 {
    STRONG_RESPONSES
        .iter()
        .find(|(c, ch, _)| *c == category && *ch == channel)
        .map(|(_, _, factor)| *factor)
        .unwrap_or(DEFAULT_RESPONSE_FACTOR)
}

fn response_rows() -> Value {
    let rows = CATEGORIES
        .iter()
        .flat_map(|(category, ..)| {
            MONTHLY_CHANNELS.iter().map(move |channel| {
                json!({
                    "Category": category,
                    "Channel": channel,
                    "Response_Factor": response_factor(category, channel),
                })
            })
        })
        .collect();
    Value::Array(rows)
}

/// Best-responding channel per category, scored as revenue times factor.
fn top_channel_rows() -> Value {
    let rows = CATEGORIES
        .iter()
        .map(|(category, revenue, ..)| {
            let (channel, factor) = MONTHLY_CHANNELS
                .iter()
                .map(|channel| (*channel, response_factor(category, channel)))
                .fold(("TV", f64::MIN), |best, candidate| {
                    if candidate.1 > best.1 {
                        candidate
                    } else {
                        best
                    }
                });
            json!({
                "Category": category,
                "Channel": channel,
                "Effectiveness_Score": revenue * factor,
            })
        })
        .collect();
    Value::Array(rows)
}

#[cfg(test)]
mod tests {
    use crate::channels::{Channel, ChannelCatalog, ChannelId};

    use super::{fallback_bundle, fallback_store};

    #[test]
    fn fallback_is_fully_populated() {
        let store = fallback_store(ChannelCatalog::with_defaults());
        assert_eq!(store.monthly().len(), 12);
        assert_eq!(store.monthly()[0].period.label(), "Jul 23");
        assert_eq!(store.latest().unwrap().period.label(), "Jun 24");
        for record in store.monthly() {
            assert!(record.revenue > 0.0);
            assert!(record.units_sold > 0.0);
            assert!(record.total_marketing_spend > 0.0);
            assert_eq!(record.channel_spend.len(), 9);
            assert_eq!(record.channel_roi.len(), 9);
            assert!(record.nps_score > 0.0);
            assert!(record.delivery_performance_index > 0.0);
            assert!(record.customer_acquisition_cost > 0.0);
            assert!((record.payment_split.cod + record.payment_split.prepaid - 1.0).abs() < 1e-9);
        }
        assert_eq!(store.categories().len(), 5);
        assert!(store.categories().iter().all(|c| c.revenue_share > 0.0));
        assert_eq!(store.budget_shifts().len(), 9);
        assert_eq!(store.channel_responses().len(), 45);
        assert_eq!(store.top_channels().len(), 5);
        assert_eq!(store.summary().ytd_revenue, 16_200_000.0);
        assert_eq!(store.summary().previous_overall_roi, 4.9);
    }

    #[test]
    fn fallback_is_deterministic() {
        assert_eq!(fallback_bundle(), fallback_bundle());
    }

    #[test]
    fn monthly_spend_matches_investment() {
        let store = fallback_store(ChannelCatalog::with_defaults());
        let jul = &store.monthly()[0];
        let channel_total: f64 = jul.channel_spend.values().sum();
        assert_eq!(channel_total, jul.total_marketing_spend);
    }

    #[test]
    fn spend_survives_a_narrow_catalog() {
        let tv = Channel::new("TV", "TV", "#1f77b4", 4.2, 200_000.0).unwrap();
        let store = fallback_store(ChannelCatalog::new(vec![tv]).unwrap());
        let jul = &store.monthly()[0];
        assert_eq!(jul.channel_spend.len(), 9);
        let channel_total: f64 = jul.channel_spend.values().sum();
        assert_eq!(channel_total, jul.total_marketing_spend);
    }

    #[test]
    fn top_channel_picks_strongest_response() {
        let store = fallback_store(ChannelCatalog::with_defaults());
        let gaming = store
            .top_channels()
            .iter()
            .find(|t| t.category == "GamingHardware")
            .unwrap();
        assert_eq!(gaming.channel, "Digital".parse::<ChannelId>().unwrap());
        assert!((gaming.effectiveness_score - 93_500.0).abs() < 1e-6);
    }
}
