//! Channel and category rankings.

use std::cmp::Ordering;

use serde::Serialize;

use crate::channels::ChannelId;
use crate::store::{BudgetShift, CategoryRecord, ChannelResponse, MetricsStore, MonthlyRecord};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelRoi {
    pub channel: ChannelId,
    pub roi: f64,
}

/// Reported channel ROI for one month, best first.
pub fn channel_roi_ranking(record: &MonthlyRecord) -> Vec<ChannelRoi> {
    let mut ranking: Vec<ChannelRoi> = record
        .channel_roi
        .iter()
        .map(|(channel, roi)| ChannelRoi {
            channel: channel.clone(),
            roi: *roi,
        })
        .collect();
    ranking.sort_by(|a, b| descending(a.roi, b.roi));
    ranking
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelPerformance {
    pub channel: ChannelId,
    pub latest_roi: f64,
    pub average_roi: f64,
    /// `latest_roi - average_roi`.
    pub difference: f64,
}

/// Latest ROI of every channel that reports one, against its average over
/// all months. Months without a figure for the channel count as zero.
pub fn channel_performance(store: &MetricsStore) -> Vec<ChannelPerformance> {
    let Some(latest) = store.latest() else {
        return Vec::new();
    };
    let months = store.monthly().len() as f64;
    latest
        .channel_roi
        .iter()
        .map(|(channel, latest_roi)| {
            let sum: f64 = store
                .monthly()
                .iter()
                .map(|record| record.roi_for(channel).unwrap_or(0.0))
                .sum();
            let average_roi = sum / months;
            ChannelPerformance {
                channel: channel.clone(),
                latest_roi: *latest_roi,
                average_roi,
                difference: latest_roi - average_roi,
            }
        })
        .collect()
}

/// The strongest-responding channel per category, in order of first
/// appearance. Ties keep the earlier row.
pub fn best_channel_by_category(responses: &[ChannelResponse]) -> Vec<&ChannelResponse> {
    let mut best: Vec<&ChannelResponse> = Vec::new();
    for response in responses {
        match best.iter().position(|b| b.category == response.category) {
            Some(idx) if response.response_factor > best[idx].response_factor => {
                best[idx] = response;
            }
            Some(_) => {}
            None => best.push(response),
        }
    }
    best
}

/// Categories with the largest revenue share, largest first.
pub fn top_categories(categories: &[CategoryRecord], limit: usize) -> Vec<&CategoryRecord> {
    let mut ranked: Vec<&CategoryRecord> = categories.iter().collect();
    ranked.sort_by(|a, b| descending(a.revenue_share, b.revenue_share));
    ranked.truncate(limit);
    ranked
}

/// Non-zero budget shifts, largest move first.
pub fn recommended_shifts(shifts: &[BudgetShift]) -> Vec<&BudgetShift> {
    let mut ranked: Vec<&BudgetShift> = shifts
        .iter()
        .filter(|shift| shift.change_percentage != 0.0)
        .collect();
    ranked.sort_by(|a, b| descending(a.change_percentage.abs(), b.change_percentage.abs()));
    ranked
}

fn descending(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}
