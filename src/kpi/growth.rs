use serde::Serialize;

use crate::kpi::percent_change_or_none;
use crate::store::{MonthlyMetric, MonthlyRecord, Period};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GrowthPoint {
    pub period: Period,
    /// `None` for the first record and wherever the prior value is zero.
    pub growth_percent: Option<f64>,
}

/// Lazy month-over-month growth of one metric, one point per record. A clone
/// is an independent cursor that regenerates the same points.
#[derive(Debug, Clone)]
pub struct GrowthSeries<'a> {
    records: &'a [MonthlyRecord],
    metric: MonthlyMetric,
    next: usize,
}

impl<'a> GrowthSeries<'a> {
    pub fn new(records: &'a [MonthlyRecord], metric: MonthlyMetric) -> Self {
        Self {
            records,
            metric,
            next: 0,
        }
    }

    pub fn metric(&self) -> MonthlyMetric {
        self.metric
    }
}

impl Iterator for GrowthSeries<'_> {
    type Item = GrowthPoint;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.records.get(self.next)?;
        let growth_percent = self
            .next
            .checked_sub(1)
            .and_then(|prev| self.records.get(prev))
            .and_then(|previous| {
                percent_change_or_none(current.metric(self.metric), previous.metric(self.metric))
            });
        self.next += 1;
        Some(GrowthPoint {
            period: current.period,
            growth_percent,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.records.len().saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for GrowthSeries<'_> {}

/// Revenue growth, record `i` against record `i - 1`.
pub fn month_over_month_growth(records: &[MonthlyRecord]) -> GrowthSeries<'_> {
    GrowthSeries::new(records, MonthlyMetric::Revenue)
}

pub fn growth_by(records: &[MonthlyRecord], metric: MonthlyMetric) -> GrowthSeries<'_> {
    GrowthSeries::new(records, metric)
}
