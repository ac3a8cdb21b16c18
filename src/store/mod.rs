//! Read-only metrics store populated once at startup.

pub mod fallback;
pub mod ingest;
pub mod loader;
pub mod normalize;
pub mod period;

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::channels::{ChannelCatalog, ChannelId};
use crate::error::EngineError;

pub use ingest::RawBundle;
pub use loader::{
    load_store, DataOrigin, DataSource, DirectorySource, HttpSource, LoadOutcome, Resource,
};
pub use period::Period;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct PaymentSplit {
    pub cod: f64,
    pub prepaid: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyRecord {
    pub period: Period,
    pub revenue: f64,
    pub units_sold: f64,
    pub total_marketing_spend: f64,
    pub channel_spend: BTreeMap<ChannelId, f64>,
    /// Reported return per channel (`TV_ROI` columns), as a multiple of spend.
    pub channel_roi: BTreeMap<ChannelId, f64>,
    pub nps_score: f64,
    pub delivery_performance_index: f64,
    pub customer_acquisition_cost: f64,
    pub payment_split: PaymentSplit,
    /// Reported marketing ROI, as a percentage.
    pub mroi: f64,
    pub special_day_index: f64,
}

impl MonthlyRecord {
    pub fn spend_for(&self, channel: &ChannelId) -> f64 {
        self.channel_spend.get(channel).copied().unwrap_or(0.0)
    }

    pub fn roi_for(&self, channel: &ChannelId) -> Option<f64> {
        self.channel_roi.get(channel).copied()
    }

    pub fn metric(&self, metric: MonthlyMetric) -> f64 {
        match metric {
            MonthlyMetric::Revenue => self.revenue,
            MonthlyMetric::UnitsSold => self.units_sold,
            MonthlyMetric::MarketingSpend => self.total_marketing_spend,
            MonthlyMetric::NpsScore => self.nps_score,
            MonthlyMetric::DeliveryPerformanceIndex => self.delivery_performance_index,
            MonthlyMetric::CustomerAcquisitionCost => self.customer_acquisition_cost,
            MonthlyMetric::Mroi => self.mroi,
            MonthlyMetric::SpecialDayIndex => self.special_day_index,
        }
    }
}

/// Numeric monthly series that growth can be computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonthlyMetric {
    Revenue,
    UnitsSold,
    MarketingSpend,
    NpsScore,
    DeliveryPerformanceIndex,
    CustomerAcquisitionCost,
    Mroi,
    SpecialDayIndex,
}

impl Display for MonthlyMetric {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Revenue => "revenue",
            Self::UnitsSold => "units",
            Self::MarketingSpend => "spend",
            Self::NpsScore => "nps",
            Self::DeliveryPerformanceIndex => "dpi",
            Self::CustomerAcquisitionCost => "cac",
            Self::Mroi => "mroi",
            Self::SpecialDayIndex => "sdpi",
        };
        write!(f, "{label}")
    }
}

impl FromStr for MonthlyMetric {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "revenue" | "gmv" => Ok(Self::Revenue),
            "units" | "units_sold" => Ok(Self::UnitsSold),
            "spend" | "marketing_spend" | "investment" => Ok(Self::MarketingSpend),
            "nps" => Ok(Self::NpsScore),
            "dpi" => Ok(Self::DeliveryPerformanceIndex),
            "cac" | "cpa" => Ok(Self::CustomerAcquisitionCost),
            "mroi" => Ok(Self::Mroi),
            "sdpi" => Ok(Self::SpecialDayIndex),
            other => Err(EngineError::invalid(format!("unknown monthly metric: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CategoryRecord {
    pub category: String,
    pub revenue: f64,
    pub units: f64,
    pub average_price: f64,
    pub recommended_budget: f64,
    /// Percentage of total category revenue.
    pub revenue_share: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BudgetShift {
    pub channel: ChannelId,
    pub current_percentage: f64,
    pub optimized_percentage: f64,
    pub change_percentage: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChannelResponse {
    pub category: String,
    pub channel: ChannelId,
    pub response_factor: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TopChannel {
    pub category: String,
    pub channel: ChannelId,
    pub effectiveness_score: f64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SummaryStats {
    pub ytd_revenue: f64,
    pub marketing_spend: f64,
    pub overall_roi: f64,
    pub previous_ytd_revenue: f64,
    pub previous_marketing_spend: f64,
    pub previous_overall_roi: f64,
}

/// Canonical ingested arrays plus lookups. Monthly records are unique per
/// period and kept in chronological order.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsStore {
    monthly: Vec<MonthlyRecord>,
    categories: Vec<CategoryRecord>,
    #[serde(skip)]
    catalog: ChannelCatalog,
    budget_shifts: Vec<BudgetShift>,
    channel_responses: Vec<ChannelResponse>,
    top_channels: Vec<TopChannel>,
    summary: SummaryStats,
}

impl MetricsStore {
    /// Sorts monthly records by period; a repeated period keeps its first
    /// occurrence.
    pub fn new(
        mut monthly: Vec<MonthlyRecord>,
        categories: Vec<CategoryRecord>,
        catalog: ChannelCatalog,
    ) -> Self {
        monthly.sort_by_key(|record| record.period);
        let before = monthly.len();
        monthly.dedup_by_key(|record| record.period);
        if monthly.len() != before {
            warn!(
                dropped = before - monthly.len(),
                "duplicate monthly periods ignored"
            );
        }
        Self {
            monthly,
            categories,
            catalog,
            budget_shifts: Vec::new(),
            channel_responses: Vec::new(),
            top_channels: Vec::new(),
            summary: SummaryStats::default(),
        }
    }

    pub fn with_budget_shifts(mut self, shifts: Vec<BudgetShift>) -> Self {
        self.budget_shifts = shifts;
        self
    }

    pub fn with_channel_responses(mut self, responses: Vec<ChannelResponse>) -> Self {
        self.channel_responses = responses;
        self
    }

    pub fn with_top_channels(mut self, top: Vec<TopChannel>) -> Self {
        self.top_channels = top;
        self
    }

    pub fn with_summary(mut self, summary: SummaryStats) -> Self {
        self.summary = summary;
        self
    }

    pub fn monthly(&self) -> &[MonthlyRecord] {
        &self.monthly
    }

    pub fn categories(&self) -> &[CategoryRecord] {
        &self.categories
    }

    pub fn catalog(&self) -> &ChannelCatalog {
        &self.catalog
    }

    pub fn budget_shifts(&self) -> &[BudgetShift] {
        &self.budget_shifts
    }

    pub fn channel_responses(&self) -> &[ChannelResponse] {
        &self.channel_responses
    }

    pub fn top_channels(&self) -> &[TopChannel] {
        &self.top_channels
    }

    pub fn summary(&self) -> &SummaryStats {
        &self.summary
    }

    pub fn by_period(&self, period: Period) -> Option<&MonthlyRecord> {
        self.monthly
            .binary_search_by_key(&period, |record| record.period)
            .ok()
            .map(|idx| &self.monthly[idx])
    }

    pub fn category(&self, name: &str) -> Option<&CategoryRecord> {
        let name = name.trim();
        self.categories
            .iter()
            .find(|record| record.category.eq_ignore_ascii_case(name))
    }

    pub fn channel(&self, id: &ChannelId) -> Option<&crate::channels::Channel> {
        self.catalog.get(id)
    }

    pub fn latest(&self) -> Option<&MonthlyRecord> {
        self.monthly.last()
    }

    pub fn previous(&self) -> Option<&MonthlyRecord> {
        self.monthly.len().checked_sub(2).map(|idx| &self.monthly[idx])
    }

    /// Spend per channel summed across every month.
    pub fn channel_spend_totals(&self) -> BTreeMap<ChannelId, f64> {
        let mut totals = BTreeMap::new();
        for record in &self.monthly {
            for (channel, amount) in &record.channel_spend {
                *totals.entry(channel.clone()).or_insert(0.0) += amount;
            }
        }
        totals
    }
}
