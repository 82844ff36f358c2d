use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use retail_etl::{
    config::{DashboardOverrides, EtlOverrides, FileConfig},
    dashboard::{export_filtered, render_text, run_dashboard, Filters},
    etl::run_etl,
};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "retail-etl")]
#[command(about = "Clean a retail sales extract and summarize it")]
struct Cli {
    /// Optional YAML config; flags override its values
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Normalize a raw CSV (or zipped CSV) and write the cleaned outputs
    Etl(EtlArgs),
    /// Filtered KPIs and series over the cleaned data
    Dashboard(DashboardArgs),
}

#[derive(Args)]
struct DbArgs {
    /// DuckDB database file
    #[arg(long, env = "RETAIL_DB_PATH")]
    db_path: Option<PathBuf>,

    /// Table holding the cleaned rows
    #[arg(long, env = "RETAIL_DB_TABLE")]
    table: Option<String>,
}

#[derive(Args)]
struct EtlArgs {
    /// Raw extract (.csv or .zip)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Clean CSV output (default: clean_<input>.csv next to the input)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Also write a Parquet snapshot here
    #[arg(long)]
    parquet: Option<PathBuf>,

    #[command(flatten)]
    db: DbArgs,
}

#[derive(Args)]
struct DashboardArgs {
    /// Clean CSV, used directly or as fallback when the database fails
    #[arg(long)]
    csv: Option<PathBuf>,

    #[command(flatten)]
    db: DbArgs,

    /// Load at most this many rows
    #[arg(long)]
    limit: Option<usize>,

    /// Earliest order date (inclusive)
    #[arg(long)]
    from: Option<NaiveDate>,

    /// Latest order date (inclusive)
    #[arg(long)]
    to: Option<NaiveDate>,

    #[arg(long = "region")]
    regions: Vec<String>,

    #[arg(long = "category")]
    categories: Vec<String>,

    #[arg(long = "segment")]
    segments: Vec<String>,

    /// Rows shown in the sample table
    #[arg(long)]
    sample: Option<usize>,

    /// Write the filtered rows to this CSV
    #[arg(long)]
    export: Option<PathBuf>,

    /// Print JSON instead of the text report
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .init();

    // ─── 2) config file, if any ──────────────────────────────────────
    let cli = Cli::parse();
    let file = match &cli.config {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };

    // ─── 3) run ──────────────────────────────────────────────────────
    match cli.command {
        Command::Etl(args) => {
            let cfg = file.etl(EtlOverrides {
                input_path: args.input,
                clean_output_path: args.output,
                parquet_output_path: args.parquet,
                db_path: args.db.db_path,
                table: args.db.table,
            })?;
            let summary = run_etl(&cfg)?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::Dashboard(args) => {
            let cfg = file.dashboard(DashboardOverrides {
                csv_path: args.csv,
                db_path: args.db.db_path,
                table: args.db.table,
                limit: args.limit,
                sample_rows: args.sample,
            })?;
            let filters = Filters {
                from: args.from,
                to: args.to,
                regions: args.regions,
                categories: args.categories,
                segments: args.segments,
            };

            let (frame, dashboard) = run_dashboard(&cfg, &filters)?;
            if let Some(path) = &args.export {
                let rows = export_filtered(&frame, &filters, path)
                    .with_context(|| format!("exporting to {}", path.display()))?;
                info!(rows, path = %path.display(), "export done");
            }

            if args.json {
                println!("{}", serde_json::to_string_pretty(&dashboard)?);
            } else {
                print!("{}", render_text(&dashboard));
            }
        }
    }
    Ok(())
}
