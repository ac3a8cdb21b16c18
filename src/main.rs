use std::collections::BTreeSet;
use std::path::PathBuf;

use anyhow::{anyhow, Result};
use budget_analytics::allocation::{
    shares, total_budget, AllocationMode, AllocationPlan, AllocationState,
};
use budget_analytics::channels::{ChannelCatalog, ChannelId, DEFAULT_SATURATION};
use budget_analytics::config::{Config, ConfigOverrides};
use budget_analytics::kpi::channel::{
    best_channel_by_category, channel_performance, channel_roi_ranking, recommended_shifts,
    top_categories,
};
use budget_analytics::kpi::summary::{latest_snapshot, summary_kpis};
use budget_analytics::kpi::{expected_revenue, growth_by, projected_roi};
use budget_analytics::output::csv::{
    allocation_to_csv, categories_to_csv, comparison_to_csv, curve_to_csv, growth_to_csv,
};
use budget_analytics::output::json::{render_json, render_json_with_origin};
use budget_analytics::output::table::{
    render_allocation_table, render_category_table, render_channel_table,
    render_comparison_table, render_curve_table, render_growth_table, render_shift_table,
    render_summary_table, render_trend_table,
};
use budget_analytics::projector::{
    allocation_rows, category_distribution, channel_spend_rows, comparison_rows, growth_rows,
    kpi_cards, payment_split_rows, response_curve_rows, revenue_trend, roi_rows,
};
use budget_analytics::store::{load_store, LoadOutcome, MonthlyMetric};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::json;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_LEVEL: &str = "warn";

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

#[derive(Debug, Parser)]
#[command(
    name = "budget-analytics",
    about = "Marketing budget analytics: KPIs, allocation plans and response curves"
)]
struct Cli {
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Directory holding the six JSON resources.
    #[arg(short, long = "data-dir")]
    data_dir: Option<String>,
    /// Base URL serving the six JSON resources.
    #[arg(short, long = "base-url")]
    base_url: Option<String>,
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone)]
struct BudgetEdit {
    channel: ChannelId,
    amount: f64,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Headline KPIs and the latest month against the one before.
    Summary,
    /// Revenue and spend per month, with per-channel spend columns.
    Trend {
        #[arg(long)]
        channels: Option<String>,
    },
    Allocation {
        #[arg(long)]
        mode: Option<AllocationMode>,
        /// CHANNEL=AMOUNT, repeatable. Any edit switches the plan to custom.
        #[arg(long = "set", value_parser = parse_budget_edit)]
        edits: Vec<BudgetEdit>,
        #[arg(long)]
        channels: Option<String>,
    },
    Compare {
        #[arg(long, default_value_t = AllocationMode::Optimal)]
        a: AllocationMode,
        #[arg(long, default_value_t = AllocationMode::Previous)]
        b: AllocationMode,
        /// Edits applied to plan A.
        #[arg(long = "set", value_parser = parse_budget_edit)]
        edits: Vec<BudgetEdit>,
    },
    Growth {
        #[arg(long, default_value_t = MonthlyMetric::Revenue)]
        metric: MonthlyMetric,
    },
    Curve {
        #[arg(long)]
        channel: ChannelId,
        #[arg(long)]
        max: Option<f64>,
        #[arg(long, default_value_t = 20)]
        steps: usize,
    },
    Channels,
    Categories {
        #[arg(long)]
        top: Option<usize>,
    },
    Config {
        #[arg(long)]
        init: bool,
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(DEFAULT_LOG_LEVEL))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load(Some(&config_path))?;
    config.apply_overrides(ConfigOverrides {
        data_dir: cli.data_dir.clone(),
        base_url: cli.base_url.clone(),
    });

    if matches!(cli.command, Commands::Config { .. }) {
        return handle_config_command(&cli.command, &config, &config_path);
    }

    let curve = config.response_curve()?;
    let references = config.reference_allocations()?;

    // Curves depend only on the catalog and model settings.
    if let Commands::Curve {
        channel,
        max,
        steps,
    } = &cli.command
    {
        let catalog = ChannelCatalog::with_defaults();
        let max_budget = max
            .or_else(|| references.max_for(channel))
            .unwrap_or(DEFAULT_SATURATION * 2.0);
        let points = response_curve_rows(&curve, &catalog, channel, max_budget, *steps)?;
        let label = catalog.display_name_for(channel);
        match cli.output {
            OutputFormat::Table => println!("{}", render_curve_table(label, &points)),
            OutputFormat::Json => println!("{}", render_json(&points)?),
            OutputFormat::Csv => print!("{}", curve_to_csv(&points)?),
        }
        return Ok(());
    }

    let source = config.data_source();
    info!(source = %source.describe(), "loading dashboard data");
    let outcome = load_store(source.as_ref(), ChannelCatalog::with_defaults()).await;
    if let Some(warning) = &outcome.warning {
        warn!("{warning}");
    }
    if matches!(cli.output, OutputFormat::Table) {
        if let Some(banner) = fallback_banner(&outcome) {
            println!("{banner}");
        }
    }
    let store = &outcome.store;
    let catalog = store.catalog();

    match &cli.command {
        Commands::Summary => {
            let kpis = summary_kpis(store);
            let cards = kpi_cards(&kpis);
            let snapshot = latest_snapshot(store);
            match cli.output {
                OutputFormat::Table => {
                    println!("{}", render_summary_table(&cards, snapshot.as_ref()));
                    if let Some(trend) = kpis.roi_trend {
                        println!("ROI trend (latest month): {trend:+.1}%");
                    }
                }
                OutputFormat::Json => {
                    let payment = store.latest().map(payment_split_rows).unwrap_or_default();
                    let payload = json!({
                        "kpis": kpis,
                        "cards": cards,
                        "latestMonth": snapshot,
                        "revenueTrend": revenue_trend(store.monthly()),
                        "paymentSplit": payment,
                    });
                    print_json(&payload, &outcome)?;
                }
                OutputFormat::Csv => {
                    warn!("CSV output for summary not implemented, using JSON");
                    print_json(&json!({ "kpis": kpis, "cards": cards }), &outcome)?;
                }
            }
        }
        Commands::Trend { channels } => {
            let selected = match channels {
                Some(raw) => parse_channel_list(raw)?,
                None => catalog.ids().cloned().collect(),
            };
            let trend = revenue_trend(store.monthly());
            let spend = channel_spend_rows(store.monthly(), &selected);
            match cli.output {
                OutputFormat::Table => {
                    println!("{}", render_trend_table(&trend, &spend, catalog, &selected))
                }
                OutputFormat::Json => {
                    print_json(&json!({ "trend": trend, "channelSpend": spend }), &outcome)?
                }
                OutputFormat::Csv => {
                    warn!("CSV output for trend not implemented, using JSON");
                    print_json(&json!({ "trend": trend, "channelSpend": spend }), &outcome)?;
                }
            }
        }
        Commands::Allocation {
            mode,
            edits,
            channels,
        } => {
            let mut state = AllocationState::new(references.clone(), catalog)?;
            match mode.unwrap_or(config.allocation.default_mode) {
                AllocationMode::Custom if edits.is_empty() => {
                    return Err(anyhow!("custom mode needs at least one --set CHANNEL=AMOUNT"));
                }
                AllocationMode::Custom => {}
                other => {
                    state.switch_mode(other)?;
                }
            }
            for edit in edits {
                state.handle_budget_change(&edit.channel, edit.amount)?;
            }
            if let Some(raw) = channels {
                state.clear_channels();
                for channel in parse_channel_list(raw)? {
                    state.toggle_channel(&channel);
                }
            }

            let plan = state.plan();
            let visible = AllocationPlan::new(
                plan.mode,
                plan.budgets()
                    .iter()
                    .filter(|(channel, _)| state.is_selected(channel))
                    .map(|(channel, amount)| (channel.clone(), *amount)),
            );
            let rows = allocation_rows(&visible, state.references(), catalog);
            let expected = expected_revenue(plan, catalog, &curve).ok();
            let roi = projected_roi(plan, catalog, &curve).ok();
            match cli.output {
                OutputFormat::Table => {
                    let mut label = state.mode().to_string();
                    if state.show_custom_tag() {
                        label.push_str(" (edited)");
                    }
                    println!("{}", render_allocation_table(&rows, &label, expected, roi));
                }
                OutputFormat::Json => {
                    let payload = json!({
                        "mode": state.mode(),
                        "rows": rows,
                        "totalBudget": total_budget(plan),
                        "shares": shares(plan),
                        "expectedRevenue": expected,
                        "projectedRoi": roi,
                    });
                    println!("{}", render_json(&payload)?);
                }
                OutputFormat::Csv => print!("{}", allocation_to_csv(&rows)?),
            }
        }
        Commands::Compare { a, b, edits } => {
            let mut state = AllocationState::new(references.clone(), catalog)?;
            if *a != AllocationMode::Custom {
                state.switch_mode(*a)?;
            }
            for edit in edits {
                state.handle_budget_change(&edit.channel, edit.amount)?;
            }
            let plan_b = references.plan(*b)?;
            let rows = comparison_rows(state.plan(), &plan_b, catalog);
            let label_a = state.mode().to_string();
            let label_b = b.to_string();
            match cli.output {
                OutputFormat::Table => {
                    println!("{}", render_comparison_table(&rows, &label_a, &label_b))
                }
                OutputFormat::Json => println!("{}", render_json(&rows)?),
                OutputFormat::Csv => print!("{}", comparison_to_csv(&rows)?),
            }
        }
        Commands::Growth { metric } => {
            let rows = growth_rows(growth_by(store.monthly(), *metric));
            match cli.output {
                OutputFormat::Table => {
                    println!("{}", render_growth_table(&rows, &metric.to_string()))
                }
                OutputFormat::Json => print_json(&rows, &outcome)?,
                OutputFormat::Csv => print!("{}", growth_to_csv(&rows)?),
            }
        }
        Commands::Channels => {
            let performance = channel_performance(store);
            let ranking = store
                .latest()
                .map(|record| roi_rows(&channel_roi_ranking(record), catalog))
                .unwrap_or_default();
            match cli.output {
                OutputFormat::Table => {
                    println!("{}", render_channel_table(catalog, &performance))
                }
                OutputFormat::Json => {
                    let payload = json!({
                        "catalog": catalog.channels(),
                        "performance": performance,
                        "latestRoiRanking": ranking,
                        "spendTotals": store.channel_spend_totals(),
                    });
                    print_json(&payload, &outcome)?;
                }
                OutputFormat::Csv => {
                    warn!("CSV output for channels not implemented, using JSON");
                    print_json(&json!({ "performance": performance }), &outcome)?;
                }
            }
        }
        Commands::Categories { top } => {
            let categories: Vec<_> = match top {
                Some(limit) => top_categories(store.categories(), *limit)
                    .into_iter()
                    .cloned()
                    .collect(),
                None => store.categories().to_vec(),
            };
            let best = best_channel_by_category(store.channel_responses());
            let shifts = recommended_shifts(store.budget_shifts());
            match cli.output {
                OutputFormat::Table => {
                    println!("{}", render_category_table(&categories, &best));
                    if !shifts.is_empty() {
                        println!("{}", render_shift_table(&shifts));
                    }
                }
                OutputFormat::Json => {
                    let payload = json!({
                        "categories": categories,
                        "distribution": category_distribution(store.categories()),
                        "bestChannels": best,
                        "topChannels": store.top_channels(),
                        "recommendedShifts": shifts,
                    });
                    print_json(&payload, &outcome)?;
                }
                OutputFormat::Csv => print!("{}", categories_to_csv(&categories)?),
            }
        }
        Commands::Curve { .. } | Commands::Config { .. } => {}
    }

    Ok(())
}

fn handle_config_command(command: &Commands, config: &Config, config_path: &PathBuf) -> Result<()> {
    let Commands::Config { init, show } = command else {
        return Ok(());
    };
    if *init {
        Config::write_template(config_path)?;
        println!("Wrote config template to {}", config_path.display());
    }
    if *show || !*init {
        println!("{}", render_json(config)?);
    }
    Ok(())
}

/// Table output has no envelope, so fallback figures get a header line.
fn fallback_banner(outcome: &LoadOutcome) -> Option<String> {
    if !outcome.is_fallback() {
        return None;
    }
    let reason = outcome.warning.as_deref().unwrap_or("data unavailable");
    Some(format!("SAMPLE DATA ({reason})"))
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T, outcome: &LoadOutcome) -> Result<()> {
    println!(
        "{}",
        render_json_with_origin(value, outcome.origin, outcome.warning.as_deref())?
    );
    Ok(())
}

fn parse_budget_edit(raw: &str) -> std::result::Result<BudgetEdit, String> {
    let (channel, amount) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected CHANNEL=AMOUNT, got {raw:?}"))?;
    let channel: ChannelId = channel.trim().parse().map_err(|e| format!("{e}"))?;
    let amount: f64 = amount
        .trim()
        .parse()
        .map_err(|e| format!("invalid amount {amount:?}: {e}"))?;
    Ok(BudgetEdit { channel, amount })
}

fn parse_channel_list(raw: &str) -> Result<BTreeSet<ChannelId>> {
    let mut out = BTreeSet::new();
    for piece in raw.split(',') {
        let trimmed = piece.trim();
        if trimmed.is_empty() {
            continue;
        }
        out.insert(trimmed.parse::<ChannelId>()?);
    }
    if out.is_empty() {
        return Err(anyhow!("channel filter is empty"));
    }
    Ok(out)
}
