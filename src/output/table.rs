use std::collections::BTreeSet;

use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color, ContentArrangement, Row, Table};
use serde_json::{Map, Value};

use crate::channels::{ChannelCatalog, ChannelId};
use crate::kpi::channel::ChannelPerformance;
use crate::kpi::summary::MonthSnapshot;
use crate::model::CurvePoint;
use crate::projector::{AllocationRow, ComparisonRow, GrowthRow, KpiCard, TrendRow};
use crate::store::{BudgetShift, CategoryRecord, ChannelResponse};

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn change_cell(change: Option<f64>, suffix: &str) -> Cell {
    match change {
        Some(v) if v >= 0.0 => Cell::new(format!("{v:+.1}{suffix}")).fg(Color::Green),
        Some(v) => Cell::new(format!("{v:+.1}{suffix}")).fg(Color::Red),
        None => Cell::new("-"),
    }
}

pub fn render_summary_table(cards: &[KpiCard], snapshot: Option<&MonthSnapshot>) -> String {
    let mut table = new_table();
    table.set_header(vec!["Metric", "Value", "Change"]);
    for card in cards {
        // ROI change is a difference of ratios, not a relative change.
        let suffix = if card.label.contains("ROI") { " pts" } else { "%" };
        table.add_row(Row::from(vec![
            Cell::new(&card.label),
            Cell::new(format!("{:.2}", card.value)),
            change_cell(card.change, suffix),
        ]));
    }

    let mut out = table.to_string();
    if let Some(s) = snapshot {
        let mut month = new_table();
        month.set_header(vec![
            format!("{} vs prior month", s.period),
            "Value".to_string(),
            "Change".to_string(),
        ]);
        let rows = [
            ("Revenue", s.revenue, s.revenue_change),
            ("Units sold", s.units_sold, s.units_change),
            ("Marketing spend", s.marketing_spend, s.spend_change),
            ("NPS", s.nps_score, s.nps_change),
        ];
        for (label, value, change) in rows {
            month.add_row(Row::from(vec![
                Cell::new(label),
                Cell::new(format!("{value:.0}")),
                change_cell(change, "%"),
            ]));
        }
        out.push('\n');
        out.push_str(&month.to_string());
    }
    out
}

pub fn render_allocation_table(
    rows: &[AllocationRow],
    mode_label: &str,
    expected_revenue: Option<f64>,
    projected_roi: Option<f64>,
) -> String {
    let mut table = new_table();
    table.set_header(vec!["Channel", "Budget", "Previous", "Optimal"]);
    for row in rows {
        let budget_cell = if row.budget > row.optimal_budget {
            Cell::new(format!("{:.0}", row.budget)).fg(Color::Yellow)
        } else {
            Cell::new(format!("{:.0}", row.budget))
        };
        table.add_row(Row::from(vec![
            Cell::new(&row.channel),
            budget_cell,
            Cell::new(format!("{:.0}", row.previous_budget)),
            Cell::new(format!("{:.0}", row.optimal_budget)),
        ]));
    }

    let total: f64 = rows.iter().map(|r| r.budget).sum();
    let mut out = table.to_string();
    out.push_str(&format!("\nMode: {mode_label}\nTotal budget: {total:.0}"));
    if let Some(revenue) = expected_revenue {
        out.push_str(&format!("\nExpected revenue: {revenue:.0}"));
    }
    match projected_roi {
        Some(roi) => out.push_str(&format!("\nProjected ROI: {roi:.1}%")),
        None => out.push_str("\nProjected ROI: -"),
    }
    out
}

pub fn render_comparison_table(rows: &[ComparisonRow], label_a: &str, label_b: &str) -> String {
    let mut table = new_table();
    table.set_header(vec!["Channel", label_a, label_b, "Delta", "Delta %"]);
    for row in rows {
        table.add_row(Row::from(vec![
            Cell::new(&row.channel),
            Cell::new(format!("{:.0}", row.amount_a)),
            Cell::new(format!("{:.0}", row.amount_b)),
            Cell::new(format!("{:+.0}", row.delta_absolute)),
            change_cell(row.delta_percent, "%"),
        ]));
    }
    table.to_string()
}

pub fn render_growth_table(rows: &[GrowthRow], metric: &str) -> String {
    let mut table = new_table();
    table.set_header(vec!["Month".to_string(), format!("{metric} growth")]);
    for row in rows {
        table.add_row(Row::from(vec![
            Cell::new(&row.month),
            change_cell(row.growth, "%"),
        ]));
    }
    table.to_string()
}

/// Monthly revenue and total spend, followed by one column per selected
/// channel. `spend` rows are matched to `trend` rows by position.
pub fn render_trend_table(
    trend: &[TrendRow],
    spend: &[Map<String, Value>],
    catalog: &ChannelCatalog,
    selected: &BTreeSet<ChannelId>,
) -> String {
    let mut table = new_table();
    let mut header = vec![
        "Month".to_string(),
        "Revenue".to_string(),
        "Spend".to_string(),
    ];
    header.extend(
        selected
            .iter()
            .map(|id| catalog.display_name_for(id).to_string()),
    );
    table.set_header(header);

    for (index, row) in trend.iter().enumerate() {
        let mut cells = vec![
            row.month.clone(),
            format!("{:.0}", row.revenue),
            format!("{:.0}", row.spend),
        ];
        for id in selected {
            let amount = spend
                .get(index)
                .and_then(|r| r.get(id.as_str()))
                .and_then(Value::as_f64);
            cells.push(
                amount
                    .map(|v| format!("{v:.0}"))
                    .unwrap_or_else(|| "-".to_string()),
            );
        }
        table.add_row(cells);
    }
    table.to_string()
}

pub fn render_curve_table(channel: &str, points: &[CurvePoint]) -> String {
    let mut table = new_table();
    table.set_header(vec!["Investment", "Revenue", "Units"]);
    for point in points {
        table.add_row(vec![
            format!("{:.0}", point.investment),
            format!("{:.0}", point.revenue),
            format!("{:.0}", point.units),
        ]);
    }
    format!("Response curve: {channel}\n{table}")
}

pub fn render_channel_table(
    catalog: &ChannelCatalog,
    performance: &[ChannelPerformance],
) -> String {
    let mut table = new_table();
    table.set_header(vec![
        "Channel",
        "Color",
        "ROI coeff",
        "Saturation",
        "Latest ROI",
        "Avg ROI",
        "vs Avg",
    ]);
    for channel in catalog.channels() {
        let perf = performance.iter().find(|p| p.channel == channel.id);
        table.add_row(Row::from(vec![
            Cell::new(&channel.display_name),
            Cell::new(&channel.color_tag),
            Cell::new(format!("{:.1}", channel.roi_coefficient)),
            Cell::new(format!("{:.0}", channel.saturation_constant)),
            Cell::new(
                perf.map(|p| format!("{:.2}x", p.latest_roi))
                    .unwrap_or_else(|| "-".to_string()),
            ),
            Cell::new(
                perf.map(|p| format!("{:.2}x", p.average_roi))
                    .unwrap_or_else(|| "-".to_string()),
            ),
            change_cell(perf.map(|p| p.difference), "x"),
        ]));
    }
    table.to_string()
}

pub fn render_category_table(categories: &[CategoryRecord], best: &[&ChannelResponse]) -> String {
    let mut table = new_table();
    table.set_header(vec![
        "Category",
        "Revenue",
        "Share",
        "Units",
        "Avg Price",
        "Recommended Budget",
        "Best Channel",
    ]);
    for category in categories {
        let best_channel = best
            .iter()
            .find(|b| b.category.eq_ignore_ascii_case(&category.category))
            .map(|b| format!("{} ({:.2})", b.channel, b.response_factor))
            .unwrap_or_else(|| "-".to_string());
        table.add_row(vec![
            category.category.clone(),
            format!("{:.0}", category.revenue),
            format!("{:.1}%", category.revenue_share),
            format!("{:.0}", category.units),
            format!("{:.2}", category.average_price),
            format!("{:.0}", category.recommended_budget),
            best_channel,
        ]);
    }
    table.to_string()
}

pub fn render_shift_table(shifts: &[&BudgetShift]) -> String {
    let mut table = new_table();
    table.set_header(vec!["Channel", "Current %", "Optimized %", "Shift"]);
    for shift in shifts {
        table.add_row(Row::from(vec![
            Cell::new(shift.channel.to_string()),
            Cell::new(format!("{:.1}", shift.current_percentage)),
            Cell::new(format!("{:.1}", shift.optimized_percentage)),
            change_cell(Some(shift.change_percentage), " pts"),
        ]));
    }
    table.to_string()
}

#[cfg(test)]
mod tests {
    use crate::projector::{ComparisonRow, GrowthRow, KpiCard};

    use super::{render_comparison_table, render_growth_table, render_summary_table};

    #[test]
    fn missing_percent_renders_dash() {
        let rows = vec![ComparisonRow {
            channel: "Radio".to_string(),
            amount_a: 4_000.0,
            amount_b: 0.0,
            delta_absolute: 4_000.0,
            delta_percent: None,
        }];
        let rendered = render_comparison_table(&rows, "Optimal", "Custom");
        assert!(rendered.contains("Radio"));
        assert!(rendered.contains("+4000"));
        assert!(rendered.contains('-'));
    }

    #[test]
    fn growth_table_signs_values() {
        let rows = vec![
            GrowthRow {
                month: "Jul 23".to_string(),
                growth: None,
            },
            GrowthRow {
                month: "Aug 23".to_string(),
                growth: Some(-4.166),
            },
        ];
        let rendered = render_growth_table(&rows, "revenue");
        assert!(rendered.contains("-4.2%"));
        assert!(rendered.contains("revenue growth"));
    }

    #[test]
    fn roi_change_renders_in_points() {
        let cards = vec![
            KpiCard {
                label: "Marketing Spend".to_string(),
                value: 56_500.0,
                change: Some(12.5),
            },
            KpiCard {
                label: "Overall ROI".to_string(),
                value: 12.8,
                change: Some(0.3),
            },
        ];
        let rendered = render_summary_table(&cards, None);
        assert!(rendered.contains("+0.3 pts"));
        assert!(rendered.contains("+12.5%"));
        assert!(!rendered.contains("0.3x"));
    }
}
