use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};

use registration_stats::analytics::PerformerLevel;
use registration_stats::config::{AppConfig, load_config_path};
use registration_stats::db::migrate;
use registration_stats::filters::FilterSelection;
use registration_stats::models::RegistrationRecord;
use registration_stats::period::Granularity;
use registration_stats::service::AnalyticsService;

#[derive(Parser)]
#[command(version, about = "Vehicle registration statistics CLI")]
struct Cli {
    /// TOML configuration file.
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,
    /// Database URL; overrides the config file and DATABASE_URL.
    #[arg(long, value_name = "URL", global = true)]
    database_url: Option<String>,
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Args, Debug, Default)]
struct FilterArgs {
    /// Inclusive start date.
    #[arg(long, value_name = "YYYY-MM-DD")]
    start: Option<String>,
    /// Inclusive end date.
    #[arg(long, value_name = "YYYY-MM-DD")]
    end: Option<String>,
    /// Vehicle category (repeatable).
    #[arg(long = "category", value_name = "NAME")]
    categories: Vec<String>,
    /// Manufacturer (repeatable).
    #[arg(long = "manufacturer", value_name = "NAME")]
    manufacturers: Vec<String>,
    /// Region display name (repeatable).
    #[arg(long = "region", value_name = "NAME")]
    regions: Vec<String>,
}

impl From<FilterArgs> for FilterSelection {
    fn from(args: FilterArgs) -> Self {
        FilterSelection {
            start_date: args.start,
            end_date: args.end,
            categories: args.categories.into_iter().collect(),
            manufacturers: args.manufacturers.into_iter().collect(),
            regions: args.regions.into_iter().collect(),
        }
    }
}

#[derive(Subcommand)]
enum Cmd {
    /// Create or upgrade the database schema.
    Migrate,
    #[command(flatten)]
    Query(QueryCmd),
}

#[derive(Subcommand)]
enum QueryCmd {
    /// Record count, total registrations, distinct manufacturers and regions.
    Summary,
    /// Values available for filtering, plus the stored date range.
    Options,
    /// Sum/count/mean grouped by columns.
    Aggregate {
        /// Comma-separated column names.
        #[arg(long, value_delimiter = ',', required = true)]
        by: Vec<String>,
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Matching records.
    Records {
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Year-over-year growth.
    Yoy {
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Quarter-over-quarter growth.
    Qoq {
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Monthly manufacturer share within each category.
    Share {
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Monthly trend for one category and/or manufacturer.
    Trend {
        /// Narrow the trend to this category.
        #[arg(long, value_name = "NAME")]
        trend_category: Option<String>,
        /// Narrow the trend to this manufacturer.
        #[arg(long, value_name = "NAME")]
        trend_manufacturer: Option<String>,
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Per-period category or manufacturer summary.
    SummaryBy {
        /// `category` or `manufacturer`.
        #[arg(long, default_value = "category")]
        level: PerformerLevel,
        /// `monthly`, `quarterly` or `yearly`.
        #[arg(long, default_value = "monthly")]
        period: Granularity,
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Top performers in the latest period.
    Top {
        /// `manufacturer` or `category`.
        #[arg(long, default_value = "manufacturer")]
        by: PerformerLevel,
        /// `monthly`, `quarterly` or `yearly`.
        #[arg(long, default_value = "yearly")]
        period: Granularity,
        /// Number of rows; defaults to `[analytics] top_n`.
        #[arg(long)]
        limit: Option<usize>,
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Replace all stored records with the contents of a JSON file.
    Load {
        /// JSON array of `{date, region_code, region_name, vehicle_category, manufacturer, registrations}`.
        #[arg(long, value_name = "FILE")]
        from: PathBuf,
    },
    /// Write a consistent copy of the database.
    Backup {
        /// Destination file; must not exist yet.
        #[arg(long, value_name = "PATH")]
        to: PathBuf,
    },
}

/// Input row of `load`; calendar fields are derived from `date`.
#[derive(Debug, Deserialize)]
struct LoadRow {
    date: NaiveDate,
    region_code: String,
    region_name: String,
    vehicle_category: String,
    manufacturer: String,
    registrations: u32,
}

#[derive(Serialize)]
struct LoadReport {
    inserted: usize,
}

fn init_tracing(cfg: &AppConfig) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cfg.logging.filter)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn emit<T: Serialize>(value: &T) -> Result<()> {
    let mut out = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut out, value).context("write JSON output")?;
    writeln!(out)?;
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let cfg = match &cli.config {
        Some(path) => load_config_path(path)?,
        None => AppConfig::default(),
    }
    .with_env_overrides()
    .with_database_url(cli.database_url.clone());
    init_tracing(&cfg);
    let url = cfg.database.url.as_str();
    tracing::debug!(url, "starting");

    match cli.cmd {
        Cmd::Migrate => {
            migrate::run_all(url)?;
            emit(&serde_json::json!({ "migrated": url }))
        }
        Cmd::Query(cmd) => {
            let mut svc = AnalyticsService::open(url)?;
            run_query(&mut svc, cmd, cfg.analytics.top_n)
        }
    }
}

fn run_query(svc: &mut AnalyticsService, cmd: QueryCmd, top_n: usize) -> Result<()> {
    match cmd {
        QueryCmd::Summary => emit(&svc.try_summary_stats()?),
        QueryCmd::Options => emit(&svc.try_filter_options()?),
        QueryCmd::Aggregate { by, filter } => {
            let by: Vec<&str> = by.iter().map(|c| c.trim()).collect();
            emit(&svc.try_aggregated(&by, &filter.into())?)
        }
        QueryCmd::Records { filter } => emit(&svc.try_records(&filter.into())?),
        QueryCmd::Yoy { filter } => emit(&svc.try_yoy(&filter.into())?),
        QueryCmd::Qoq { filter } => emit(&svc.try_qoq(&filter.into())?),
        QueryCmd::Share { filter } => emit(&svc.try_market_share(&filter.into())?),
        QueryCmd::Trend {
            trend_category,
            trend_manufacturer,
            filter,
        } => emit(&svc.try_trend(
            &filter.into(),
            trend_category.as_deref(),
            trend_manufacturer.as_deref(),
        )?),
        QueryCmd::SummaryBy {
            level,
            period,
            filter,
        } => {
            let selection: FilterSelection = filter.into();
            let rows = match level {
                PerformerLevel::Category => svc.try_category_summary(&selection, period)?,
                PerformerLevel::Manufacturer => svc.try_manufacturer_summary(&selection, period)?,
            };
            emit(&rows)
        }
        QueryCmd::Top {
            by,
            period,
            limit,
            filter,
        } => {
            let n = limit.unwrap_or(top_n);
            emit(&svc.try_top_performers(&filter.into(), by, period, n)?)
        }
        QueryCmd::Load { from } => {
            let text = std::fs::read_to_string(&from)
                .with_context(|| format!("read {}", from.display()))?;
            let rows: Vec<LoadRow> = serde_json::from_str(&text)
                .with_context(|| format!("parse {}", from.display()))?;
            let records: Vec<RegistrationRecord> = rows
                .into_iter()
                .map(|r| {
                    RegistrationRecord::new(
                        r.date,
                        r.region_code,
                        r.region_name,
                        r.vehicle_category,
                        r.manufacturer,
                        r.registrations,
                    )
                })
                .collect();
            let inserted = svc.try_refresh(&records)?;
            emit(&LoadReport { inserted })
        }
        QueryCmd::Backup { to } => {
            svc.try_backup(&to)?;
            emit(&serde_json::json!({ "backup": to.display().to_string() }))
        }
    }
}
