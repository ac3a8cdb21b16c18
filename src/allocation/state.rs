use std::collections::BTreeSet;

use serde::Serialize;

use crate::allocation::{AllocationMode, AllocationPlan, ReferenceAllocations};
use crate::channels::{ChannelCatalog, ChannelId};
use crate::error::EngineResult;

/// Caller-owned view state for the budget planner: the active plan, the
/// channel filter, and the reference tables edits are validated against.
#[derive(Debug, Clone, Serialize)]
pub struct AllocationState {
    plan: AllocationPlan,
    selected_channels: BTreeSet<ChannelId>,
    #[serde(skip)]
    references: ReferenceAllocations,
    #[serde(skip)]
    all_channels: BTreeSet<ChannelId>,
}

impl AllocationState {
    /// Starts on the optimal plan with every catalog channel selected.
    pub fn new(references: ReferenceAllocations, catalog: &ChannelCatalog) -> EngineResult<Self> {
        let plan = references.plan(AllocationMode::Optimal)?;
        let all_channels: BTreeSet<ChannelId> = catalog.ids().cloned().collect();
        Ok(Self {
            plan,
            selected_channels: all_channels.clone(),
            references,
            all_channels,
        })
    }

    pub fn plan(&self) -> &AllocationPlan {
        &self.plan
    }

    pub fn mode(&self) -> AllocationMode {
        self.plan.mode
    }

    pub fn references(&self) -> &ReferenceAllocations {
        &self.references
    }

    pub fn show_custom_tag(&self) -> bool {
        self.plan.mode == AllocationMode::Custom
    }

    pub fn handle_optimal_allocation(&mut self) -> EngineResult<&AllocationPlan> {
        self.switch_mode(AllocationMode::Optimal)
    }

    pub fn handle_previous_allocation(&mut self) -> EngineResult<&AllocationPlan> {
        self.switch_mode(AllocationMode::Previous)
    }

    pub fn switch_mode(&mut self, mode: AllocationMode) -> EngineResult<&AllocationPlan> {
        let next = self.references.plan(mode)?;
        self.plan = next;
        Ok(&self.plan)
    }

    /// Replaces the plan with a copy where one channel's budget changed. On
    /// error the current plan is left untouched.
    pub fn handle_budget_change(
        &mut self,
        channel: &ChannelId,
        amount: f64,
    ) -> EngineResult<&AllocationPlan> {
        let next = self
            .plan
            .with_channel_budget(&self.references, channel, amount)?;
        self.plan = next;
        Ok(&self.plan)
    }

    pub fn selected_channels(&self) -> &BTreeSet<ChannelId> {
        &self.selected_channels
    }

    pub fn is_selected(&self, channel: &ChannelId) -> bool {
        self.selected_channels.contains(channel)
    }

    /// Returns whether the channel is selected after the toggle.
    pub fn toggle_channel(&mut self, channel: &ChannelId) -> bool {
        if self.selected_channels.remove(channel) {
            false
        } else {
            self.selected_channels.insert(channel.clone());
            true
        }
    }

    pub fn select_all_channels(&mut self) {
        self.selected_channels = self.all_channels.clone();
    }

    pub fn clear_channels(&mut self) {
        self.selected_channels.clear();
    }
}
