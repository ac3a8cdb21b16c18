use anyhow::Result;

use crate::model::CurvePoint;
use crate::projector::{AllocationRow, ComparisonRow, GrowthRow};
use crate::store::CategoryRecord;

fn finish(writer: csv::Writer<Vec<u8>>) -> Result<String> {
    let data = writer.into_inner()?;
    Ok(String::from_utf8_lossy(&data).to_string())
}

fn optional(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.4}")).unwrap_or_default()
}

pub fn allocation_to_csv(rows: &[AllocationRow]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record(["channel", "budget", "previous_budget", "optimal_budget"])?;
    for row in rows {
        writer.write_record([
            row.channel.clone(),
            format!("{:.2}", row.budget),
            format!("{:.2}", row.previous_budget),
            format!("{:.2}", row.optimal_budget),
        ])?;
    }
    finish(writer)
}

pub fn comparison_to_csv(rows: &[ComparisonRow]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record([
        "channel",
        "amount_a",
        "amount_b",
        "delta_absolute",
        "delta_percent",
    ])?;
    for row in rows {
        writer.write_record([
            row.channel.clone(),
            format!("{:.2}", row.amount_a),
            format!("{:.2}", row.amount_b),
            format!("{:.2}", row.delta_absolute),
            optional(row.delta_percent),
        ])?;
    }
    finish(writer)
}

pub fn growth_to_csv(rows: &[GrowthRow]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record(["month", "growth_percent"])?;
    for row in rows {
        writer.write_record([row.month.clone(), optional(row.growth)])?;
    }
    finish(writer)
}

pub fn curve_to_csv(points: &[CurvePoint]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record(["investment", "revenue", "units"])?;
    for point in points {
        writer.write_record([
            format!("{:.2}", point.investment),
            format!("{:.2}", point.revenue),
            format!("{:.2}", point.units),
        ])?;
    }
    finish(writer)
}

pub fn categories_to_csv(categories: &[CategoryRecord]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record([
        "category",
        "revenue",
        "units",
        "average_price",
        "recommended_budget",
        "revenue_share",
    ])?;
    for category in categories {
        writer.write_record([
            category.category.clone(),
            format!("{:.2}", category.revenue),
            format!("{:.0}", category.units),
            format!("{:.2}", category.average_price),
            format!("{:.2}", category.recommended_budget),
            format!("{:.4}", category.revenue_share),
        ])?;
    }
    finish(writer)
}

#[cfg(test)]
mod tests {
    use crate::projector::GrowthRow;

    use super::growth_to_csv;

    #[test]
    fn undefined_growth_is_an_empty_field() {
        let rows = vec![
            GrowthRow {
                month: "Jul 23".to_string(),
                growth: None,
            },
            GrowthRow {
                month: "Aug 23".to_string(),
                growth: Some(-4.5),
            },
        ];
        let csv = growth_to_csv(&rows).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines, ["month,growth_percent", "Jul 23,", "Aug 23,-4.5000"]);
    }
}
