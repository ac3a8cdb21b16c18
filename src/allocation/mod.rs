pub mod state;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::channels::ChannelId;
use crate::error::{EngineError, EngineResult};

pub use state::AllocationState;

pub const DEFAULT_MAX_MULTIPLIER: f64 = 2.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AllocationMode {
    Optimal,
    Previous,
    Custom,
}

impl Display for AllocationMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Optimal => "optimal",
            Self::Previous => "previous",
            Self::Custom => "custom",
        };
        write!(f, "{label}")
    }
}

impl FromStr for AllocationMode {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "optimal" | "optimized" | "recommended" => Ok(Self::Optimal),
            "previous" | "current" | "last-year" => Ok(Self::Previous),
            "custom" => Ok(Self::Custom),
            other => Err(EngineError::invalid(format!("unknown allocation mode: {other}"))),
        }
    }
}

/// A per-channel budget split. Plans are values: every change produces a new
/// plan and the old one stays intact until the caller swaps it out.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AllocationPlan {
    pub mode: AllocationMode,
    budgets: BTreeMap<ChannelId, f64>,
}

impl AllocationPlan {
    /// Negative or non-finite amounts are stored as zero.
    pub fn new(
        mode: AllocationMode,
        budgets: impl IntoIterator<Item = (ChannelId, f64)>,
    ) -> Self {
        let budgets = budgets
            .into_iter()
            .map(|(channel, amount)| (channel, sanitize_amount(amount)))
            .collect();
        Self { mode, budgets }
    }

    pub fn budgets(&self) -> &BTreeMap<ChannelId, f64> {
        &self.budgets
    }

    pub fn channels(&self) -> impl Iterator<Item = &ChannelId> {
        self.budgets.keys()
    }

    pub fn amount(&self, channel: &ChannelId) -> f64 {
        self.budgets.get(channel).copied().unwrap_or(0.0)
    }

    /// Copy of this plan with one channel changed, clamped to
    /// `0..=max_multiplier * optimal(channel)`, and the mode set to custom.
    pub fn with_channel_budget(
        &self,
        references: &ReferenceAllocations,
        channel: &ChannelId,
        amount: f64,
    ) -> EngineResult<Self> {
        if amount.is_nan() {
            return Err(EngineError::invalid(format!(
                "budget for {channel} is not a number"
            )));
        }
        let ceiling = references.max_for(channel).ok_or_else(|| {
            EngineError::invalid(format!("no optimal reference for channel {channel}"))
        })?;
        let clamped = amount.clamp(0.0, ceiling);
        if clamped != amount {
            debug!(%channel, requested = amount, clamped, "budget edit clamped to allowed range");
        }

        let mut budgets = self.budgets.clone();
        budgets.insert(channel.clone(), clamped);
        Ok(Self {
            mode: AllocationMode::Custom,
            budgets,
        })
    }
}

/// Canonical optimal and previous-period tables. Plans handed out by
/// [`ReferenceAllocations::plan`] are deep copies.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ReferenceAllocations {
    optimal: BTreeMap<ChannelId, f64>,
    previous: BTreeMap<ChannelId, f64>,
    max_multiplier: f64,
}

impl ReferenceAllocations {
    pub fn new(
        optimal: BTreeMap<ChannelId, f64>,
        previous: BTreeMap<ChannelId, f64>,
        max_multiplier: f64,
    ) -> EngineResult<Self> {
        if !max_multiplier.is_finite() || max_multiplier < 1.0 {
            return Err(EngineError::invalid(format!(
                "max multiplier must be at least 1, got {max_multiplier}"
            )));
        }
        for (channel, amount) in optimal.iter().chain(previous.iter()) {
            if !amount.is_finite() || *amount < 0.0 {
                return Err(EngineError::invalid(format!(
                    "reference budget for {channel} must be non-negative, got {amount}"
                )));
            }
        }
        Ok(Self {
            optimal,
            previous,
            max_multiplier,
        })
    }

    pub fn with_defaults() -> Self {
        let optimal = [
            ("TV", 180_000.0),
            ("Digital", 85_000.0),
            ("Sponsorship", 45_000.0),
            ("Content Marketing", 32_000.0),
            ("Online Marketing", 48_000.0),
            ("Affiliates", 18_000.0),
            ("SEM", 20_000.0),
            ("Radio", 4_000.0),
            ("Other", 3_000.0),
        ];
        let previous = [
            ("TV", 156_000.0),
            ("Digital", 65_000.0),
            ("Sponsorship", 39_000.0),
            ("Content Marketing", 27_000.0),
            ("Online Marketing", 43_000.0),
            ("Affiliates", 20_000.0),
            ("SEM", 16_000.0),
            ("Radio", 6_000.0),
            ("Other", 6_000.0),
        ];
        Self {
            optimal: table(&optimal),
            previous: table(&previous),
            max_multiplier: DEFAULT_MAX_MULTIPLIER,
        }
    }

    pub fn with_max_multiplier(mut self, max_multiplier: f64) -> EngineResult<Self> {
        if !max_multiplier.is_finite() || max_multiplier < 1.0 {
            return Err(EngineError::invalid(format!(
                "max multiplier must be at least 1, got {max_multiplier}"
            )));
        }
        self.max_multiplier = max_multiplier;
        Ok(self)
    }

    pub fn plan(&self, mode: AllocationMode) -> EngineResult<AllocationPlan> {
        let source = match mode {
            AllocationMode::Optimal => &self.optimal,
            AllocationMode::Previous => &self.previous,
            AllocationMode::Custom => {
                return Err(EngineError::invalid(
                    "custom plans are derived from edits, there is no reference table",
                ))
            }
        };
        Ok(AllocationPlan {
            mode,
            budgets: source.clone(),
        })
    }

    pub fn optimal_amount(&self, channel: &ChannelId) -> Option<f64> {
        self.optimal.get(channel).copied()
    }

    pub fn previous_amount(&self, channel: &ChannelId) -> Option<f64> {
        self.previous.get(channel).copied()
    }

    pub fn max_for(&self, channel: &ChannelId) -> Option<f64> {
        self.optimal_amount(channel).map(|v| v * self.max_multiplier)
    }

    pub fn max_multiplier(&self) -> f64 {
        self.max_multiplier
    }
}

impl Default for ReferenceAllocations {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct AllocationDelta {
    pub amount_a: f64,
    pub amount_b: f64,
    pub delta_absolute: f64,
    /// `None` when the baseline amount is zero.
    pub delta_percent: Option<f64>,
}

pub fn total_budget(plan: &AllocationPlan) -> f64 {
    plan.budgets.values().sum()
}

pub fn share_of(plan: &AllocationPlan, channel: &ChannelId) -> EngineResult<f64> {
    let total = total_budget(plan);
    if total == 0.0 {
        return Err(EngineError::DivisionUndefined("total budget"));
    }
    Ok(plan.amount(channel) / total)
}

/// Share of the channel, reported as 0 when the plan has no budget at all.
pub fn share_or_zero(plan: &AllocationPlan, channel: &ChannelId) -> f64 {
    share_of(plan, channel).unwrap_or(0.0)
}

pub fn shares(plan: &AllocationPlan) -> BTreeMap<ChannelId, f64> {
    plan.channels()
        .map(|channel| (channel.clone(), share_or_zero(plan, channel)))
        .collect()
}

/// Per-channel diff of `plan_a` against the baseline `plan_b`, over the union
/// of both plans' channels.
pub fn compare(
    plan_a: &AllocationPlan,
    plan_b: &AllocationPlan,
) -> BTreeMap<ChannelId, AllocationDelta> {
    let channels: BTreeSet<&ChannelId> = plan_a.channels().chain(plan_b.channels()).collect();
    channels
        .into_iter()
        .map(|channel| {
            let amount_a = plan_a.amount(channel);
            let amount_b = plan_b.amount(channel);
            let delta_absolute = amount_a - amount_b;
            let delta_percent = if amount_b == 0.0 {
                None
            } else {
                Some(delta_absolute / amount_b * 100.0)
            };
            (
                channel.clone(),
                AllocationDelta {
                    amount_a,
                    amount_b,
                    delta_absolute,
                    delta_percent,
                },
            )
        })
        .collect()
}

fn sanitize_amount(amount: f64) -> f64 {
    if amount.is_finite() {
        amount.max(0.0)
    } else {
        0.0
    }
}

fn table(rows: &[(&str, f64)]) -> BTreeMap<ChannelId, f64> {
    rows.iter()
        .filter_map(|(name, amount)| Some((name.parse::<ChannelId>().ok()?, *amount)))
        .collect()
}
