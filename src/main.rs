//! CLI entry point for the MTA bus dashboards.
//!
//! Each dashboard subcommand loads its dataset (portal download or local
//! CSV), runs the filter/aggregate/chart pipeline for the given selection,
//! prints a preview of the filtered table and optionally exports it.

use std::ffi::OsStr;
use std::path::Path;

use anyhow::{Context, Result};
use bus_dashboards::catalog::DatasetId;
use bus_dashboards::config::AppConfig;
use bus_dashboards::dashboards::{DashboardView, bus_speeds, customer_journey};
use bus_dashboards::dataset::Dataset;
use bus_dashboards::fetch::auth::AppToken;
use bus_dashboards::fetch::{BasicClient, DatasetSource, FileSource, HttpClient, HttpSource};
use bus_dashboards::output::{preview, print_pretty, to_json, write_csv};
use bus_dashboards::parser::parse_month;
use bus_dashboards::pipeline::chart::Reduction;
use bus_dashboards::writetos3::{export_key, write_csv_to_s3};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

const PREVIEW_ROWS: usize = 20;

#[derive(Parser)]
#[command(name = "bus_dashboards")]
#[command(about = "Filter, aggregate and chart MTA bus datasets", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Average bus speed per month for one borough
    BusSpeeds {
        #[command(flatten)]
        common: CommonArgs,

        /// Borough to show (defaults to the first one in the data)
        #[arg(short, long)]
        borough: Option<String>,
    },
    /// Customer journey metrics by route and borough
    Journey {
        #[command(flatten)]
        common: CommonArgs,

        /// Trip type (defaults to the first one in the data)
        #[arg(long)]
        trip_type: Option<String>,

        /// Period (defaults to the second one in the data)
        #[arg(long)]
        period: Option<String>,

        /// Boroughs to include; repeat for several
        #[arg(short, long = "borough")]
        boroughs: Vec<String>,

        /// Routes to include; repeat for several
        #[arg(short, long = "route")]
        routes: Vec<String>,

        /// Metric column (defaults to the first numeric column)
        #[arg(short, long)]
        metric: Option<String>,

        /// Lower bound for the metric
        #[arg(long)]
        metric_min: Option<f64>,

        /// Upper bound for the metric
        #[arg(long)]
        metric_max: Option<f64>,

        /// Title for the borough comparison chart
        #[arg(long, default_value = customer_journey::DEFAULT_BAR_TITLE)]
        bar_title: String,

        /// How routes in the same borough are combined in the bar chart
        #[arg(long, value_enum, default_value_t = BarReduction::Sum)]
        bar_reduction: BarReduction,
    },
    /// List the datasets the dashboards can load
    ListDatasets,
}

#[derive(Args)]
struct CommonArgs {
    /// Local CSV file or URL to load instead of the portal download
    #[arg(long, value_name = "FILE_OR_URL")]
    source: Option<String>,

    /// First month to include (YYYY-MM or YYYY-MM-DD)
    #[arg(long, value_parser = month_arg)]
    start: Option<NaiveDate>,

    /// Last month to include (YYYY-MM or YYYY-MM-DD)
    #[arg(long, value_parser = month_arg)]
    end: Option<NaiveDate>,

    /// Write the filtered table to this CSV file
    #[arg(short, long)]
    export: Option<String>,

    /// Optional: S3 bucket to upload the filtered CSV to (e.g., "my-bucket")
    #[arg(long)]
    s3_bucket: Option<String>,

    /// Print the full dashboard view as JSON on stdout
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum BarReduction {
    Sum,
    Mean,
}

impl From<BarReduction> for Reduction {
    fn from(r: BarReduction) -> Self {
        match r {
            BarReduction::Sum => Reduction::Sum,
            BarReduction::Mean => Reduction::Mean,
        }
    }
}

fn month_arg(s: &str) -> Result<NaiveDate, String> {
    parse_month(s)
        .ok_or_else(|| format!("'{s}' is not a month (expected YYYY-MM)"))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    let config = AppConfig::from_env()?;

    // Logging setup: colored stderr + JSON rolling log file
    let log_dir = Path::new(&config.log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&config.log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("bus_dashboards.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::BusSpeeds { common, borough } => {
            let source = common.source.as_deref();
            let dataset = load(&config, source, DatasetId::BusSpeeds).await?;
            let selection = bus_speeds::BusSpeedsSelection {
                borough,
                start: common.start,
                end: common.end,
            };
            let view = bus_speeds::run(&dataset, &selection);
            present(&view, &common).await?;
        }
        Commands::Journey {
            common,
            trip_type,
            period,
            boroughs,
            routes,
            metric,
            metric_min,
            metric_max,
            bar_title,
            bar_reduction,
        } => {
            let source = common.source.as_deref();
            let dataset = load(&config, source, DatasetId::CustomerJourney).await?;
            let selection = customer_journey::JourneySelection {
                start: common.start,
                end: common.end,
                trip_type,
                period,
                boroughs: (!boroughs.is_empty()).then_some(boroughs),
                routes: (!routes.is_empty()).then_some(routes),
                metric,
                metric_min,
                metric_max,
                bar_title,
                bar_reduction: bar_reduction.into(),
            };
            let view = customer_journey::run(&dataset, &selection);
            present(&view, &common).await?;
        }
        Commands::ListDatasets => {
            for id in DatasetId::ALL {
                let info = id.info();
                println!("{:<18} {}  {}", id.slug(), info.socrata_id, info.name);
                println!("{:<18} {}", "", id.download_url(&config.base_url));
            }
            info!(total = DatasetId::ALL.len(), "Dataset list printed");
        }
    }

    Ok(())
}

/// Loads a dataset from a local file, an explicit URL, or the portal.
#[tracing::instrument(skip(config), fields(dataset = %id))]
async fn load(config: &AppConfig, source: Option<&str>, id: DatasetId) -> Result<Dataset> {
    let source: Box<dyn DatasetSource> = match source {
        Some(path) if !path.starts_with("http") => Box::new(FileSource::new(path)),
        url => {
            let client = BasicClient::with_timeout(config.fetch_timeout)
                .context("Failed to build HTTP client")?;
            match &config.app_token {
                Some(token) => {
                    let client = AppToken::new(client, token)
                        .context("SOCRATA_APP_TOKEN is not a valid header value")?;
                    http_source(HttpSource::new(client, &config.base_url), url)
                }
                None => {
                    warn!("SOCRATA_APP_TOKEN not set, requests may be throttled");
                    http_source(HttpSource::new(client, &config.base_url), url)
                }
            }
        }
    };

    Ok(source.fetch(id).await?)
}

fn http_source<C>(source: HttpSource<C>, url: Option<&str>) -> Box<dyn DatasetSource>
where
    C: HttpClient + 'static,
{
    match url {
        Some(url) => Box::new(source.with_url(url)),
        None => Box::new(source),
    }
}

/// Prints the preview, notices and optional JSON, then runs the exports.
async fn present(view: &DashboardView, common: &CommonArgs) -> Result<()> {
    print_pretty(&view.stages);

    for notice in &view.notices {
        warn!(?notice, "Dashboard notice");
    }

    if common.json {
        println!("{}", to_json(view)?);
    } else {
        print!("{}", preview(&view.table, PREVIEW_ROWS));
    }

    if let Some(path) = &common.export {
        write_csv(path, &view.table)?;
    }

    if let Some(bucket) = &common.s3_bucket {
        let config = aws_config::load_from_env().await;
        let client = aws_sdk_s3::Client::new(&config);
        let file_name = common
            .export
            .as_deref()
            .and_then(|p| Path::new(p).file_name())
            .and_then(OsStr::to_str)
            .unwrap_or("filtered.csv");
        let key = export_key(&view.dataset, file_name);
        write_csv_to_s3(&client, bucket, &key, &view.table).await?;
    }

    Ok(())
}
