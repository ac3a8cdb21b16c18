//! Saturating response curve relating channel spend to predicted revenue.
//!
//! The curve is the Michaelis-Menten form used by the dashboards:
//!
//! ```text
//! revenue(budget) = alpha * budget / (1 + budget / saturation)
//! alpha           = roi_coefficient * scale_factor
//! ```
//!
//! It is zero at zero spend, concave, and approaches `alpha * saturation`
//! as spend grows without bound.

use serde::{Deserialize, Serialize};

use crate::channels::Channel;
use crate::error::{EngineError, EngineResult};

/// Calibration constant shared by every channel.
pub const DEFAULT_SCALE_FACTOR: f64 = 100_000.0;

/// Revenue per predicted unit sold, taken from the dashboards' response
/// curve table where units track revenue at a fixed ratio of 100.
pub const DEFAULT_REVENUE_PER_UNIT: f64 = 100.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ResponseCurve {
    pub scale_factor: f64,
    pub revenue_per_unit: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CurvePoint {
    pub investment: f64,
    pub revenue: f64,
    pub units: f64,
}

impl Default for ResponseCurve {
    fn default() -> Self {
        Self {
            scale_factor: DEFAULT_SCALE_FACTOR,
            revenue_per_unit: DEFAULT_REVENUE_PER_UNIT,
        }
    }
}

impl ResponseCurve {
    pub fn new(scale_factor: f64, revenue_per_unit: f64) -> EngineResult<Self> {
        if !scale_factor.is_finite() || scale_factor <= 0.0 {
            return Err(EngineError::invalid(format!(
                "scale factor must be positive, got {scale_factor}"
            )));
        }
        if !revenue_per_unit.is_finite() || revenue_per_unit <= 0.0 {
            return Err(EngineError::invalid(format!(
                "revenue per unit must be positive, got {revenue_per_unit}"
            )));
        }
        Ok(Self {
            scale_factor,
            revenue_per_unit,
        })
    }

    pub fn alpha(&self, channel: &Channel) -> f64 {
        channel.roi_coefficient * self.scale_factor
    }

    pub fn predicted_revenue(&self, channel: &Channel, budget: f64) -> EngineResult<f64> {
        check_budget(channel, budget)?;
        // Bounded form of alpha * b / (1 + b / sat); stays finite for huge b.
        let saturation = channel.saturation_constant;
        Ok(self.asymptote(channel) * (budget / (saturation + budget)))
    }

    pub fn asymptote(&self, channel: &Channel) -> f64 {
        self.alpha(channel) * channel.saturation_constant
    }

    /// First derivative of the curve: revenue gained per extra unit of spend.
    pub fn marginal_revenue(&self, channel: &Channel, budget: f64) -> EngineResult<f64> {
        check_budget(channel, budget)?;
        let denom = 1.0 + budget / channel.saturation_constant;
        Ok(self.alpha(channel) / (denom * denom))
    }

    pub fn predicted_units(&self, channel: &Channel, budget: f64) -> EngineResult<f64> {
        Ok(self.predicted_revenue(channel, budget)? / self.revenue_per_unit)
    }

    /// `steps + 1` evenly spaced points from zero spend to `max_budget`.
    pub fn sample(
        &self,
        channel: &Channel,
        max_budget: f64,
        steps: usize,
    ) -> EngineResult<Vec<CurvePoint>> {
        check_budget(channel, max_budget)?;
        if steps == 0 {
            return Err(EngineError::invalid("curve sample needs at least one step"));
        }
        let step = max_budget / steps as f64;
        (0..=steps)
            .map(|i| {
                let investment = step * i as f64;
                let revenue = self.predicted_revenue(channel, investment)?;
                Ok(CurvePoint {
                    investment,
                    revenue,
                    units: revenue / self.revenue_per_unit,
                })
            })
            .collect()
    }
}

fn check_budget(channel: &Channel, budget: f64) -> EngineResult<()> {
    if !budget.is_finite() || budget < 0.0 {
        return Err(EngineError::invalid(format!(
            "budget for {} must be a non-negative number, got {budget}",
            channel.id
        )));
    }
    Ok(())
}
