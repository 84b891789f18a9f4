//! CLI entry point for the Result Analyser tool.
//!
//! Loads a spreadsheet export of student-unit results and provides
//! subcommands for headline statistics, programme and subject listings,
//! chart data, and workbook export.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use result_analyser::analyzers::aggregate::aggregate;
use result_analyser::analyzers::catalog::{programme_counts, subjects_for};
use result_analyser::analyzers::types::{Aggregation, AggregationResult, Filter};
use result_analyser::config::ReportConfig;
use result_analyser::normalize::normalize;
use result_analyser::output::{write_json, write_workbook, write_xlsx};
use result_analyser::parser::read_rows;
use result_analyser::record::StudentRecord;
use result_analyser::report::{ChartData, chart_data, workbook};
use serde::Serialize;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "result_analyser")]
#[command(about = "Analyze student result spreadsheets by programme and subject", long_about = None)]
struct Cli {
    /// Optional JSON file overriding report colours, label budgets and withdrawal codes
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct FilterArgs {
    /// Restrict to one programme (exact "course desc" value)
    #[arg(short, long)]
    programme: Option<String>,

    /// Restrict to one subject (unit offer description, or unit code when blank)
    #[arg(short, long)]
    subject: Option<String>,
}

impl FilterArgs {
    fn filter(&self) -> Filter {
        Filter {
            programme: self.programme.clone(),
            subject: self.subject.clone(),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Log headline statistics and the grade distribution
    Summary {
        /// Spreadsheet export (.xlsx, .xls, .ods, .csv, .tsv or .json)
        #[arg(value_name = "FILE")]
        input: PathBuf,

        #[command(flatten)]
        filter: FilterArgs,
    },
    /// List programmes with their record counts
    Programmes {
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },
    /// List the subjects taught in a programme
    Subjects {
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Programme to list subjects for
        #[arg(short, long)]
        programme: String,
    },
    /// Write chart series as JSON
    Chart {
        #[arg(value_name = "FILE")]
        input: PathBuf,

        #[command(flatten)]
        filter: FilterArgs,

        /// JSON file to write
        #[arg(short, long, default_value = "chart.json")]
        output: PathBuf,
    },
    /// Write the analysis workbook
    Export {
        #[arg(value_name = "FILE")]
        input: PathBuf,

        #[command(flatten)]
        filter: FilterArgs,

        /// Directory to create the workbook in
        #[arg(short = 'd', long, default_value = "reports")]
        output_dir: PathBuf,

        /// Workbook format
        #[arg(short, long, value_enum, default_value_t = ExportFormat::Xlsx)]
        format: ExportFormat,
    },
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum ExportFormat {
    /// One .xlsx file with a worksheet per sheet
    Xlsx,
    /// A directory with one .csv file per sheet
    Csv,
}

/// Chart data stamped with its generation time.
#[derive(Serialize)]
struct ChartExport<'a> {
    generated_at: DateTime<Utc>,
    chart: &'a ChartData,
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok(); // Load .env file

    // Must outlive the final error! below.
    let _file_guard = match init_logging() {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("error: could not initialise logging: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %format!("{e:#}"), "Result analysis failed");
            ExitCode::FAILURE
        }
    }
}

/// Logging setup: colored stderr + JSON rolling log file.
fn init_logging() -> Result<WorkerGuard> {
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/result_analyser.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("result_analyser.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

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
        .try_init()?;

    Ok(file_guard)
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => ReportConfig::load(path)?,
        None => ReportConfig::default(),
    };

    match cli.command {
        Commands::Summary { input, filter } => {
            let records = load_records(&input)?;
            summarize(&records, &filter.filter());
        }
        Commands::Programmes { input } => {
            let records = load_records(&input)?;
            let programmes = programme_counts(&records);
            info!(total = programmes.len(), "Programme list");
            for entry in &programmes {
                info!(programme = %entry.programme, records = entry.count, "Programme");
            }
        }
        Commands::Subjects { input, programme } => {
            let records = load_records(&input)?;
            let subjects = subjects_for(&records, &programme);
            info!(programme = %programme, available = subjects.len(), "Subject list");
            for subject in &subjects {
                info!(subject = %subject, "Subject");
            }
        }
        Commands::Chart {
            input,
            filter,
            output,
        } => {
            let records = load_records(&input)?;
            export_chart(&records, &filter.filter(), &config, &output)?;
        }
        Commands::Export {
            input,
            filter,
            output_dir,
            format,
        } => {
            let records = load_records(&input)?;
            export_workbook(&records, &filter.filter(), &config, &output_dir, format)?;
        }
    }

    Ok(())
}

/// Reads and normalizes the spreadsheet at `path`.
#[tracing::instrument(skip_all, fields(path = %path.display()))]
fn load_records(path: &Path) -> Result<Vec<StudentRecord>> {
    let rows = read_rows(path).with_context(|| {
        format!(
            "could not process {}; check that the file has the expected column names",
            path.display()
        )
    })?;
    let normalized = normalize(rows);

    if normalized.rejected > 0 {
        warn!(
            rejected = normalized.rejected,
            "Skipped rows missing a programme, unit code or result code"
        );
    }
    info!(
        records = normalized.records.len(),
        "Loaded valid student records"
    );
    Ok(normalized.records)
}

fn analyze(records: &[StudentRecord], filter: &Filter) -> Option<AggregationResult> {
    match aggregate(records, filter) {
        Aggregation::Summary(result) => Some(*result),
        Aggregation::NoData => {
            warn!(
                programme = filter.programme.as_deref().unwrap_or("all"),
                subject = filter.subject.as_deref().unwrap_or("all"),
                "No data available for analysis"
            );
            None
        }
    }
}

#[tracing::instrument(skip_all, fields(records = records.len(), filter = ?filter))]
fn summarize(records: &[StudentRecord], filter: &Filter) {
    let Some(result) = analyze(records, filter) else {
        return;
    };

    info!(
        total_records = result.total_records,
        unique_programmes = result.unique_programmes,
        unique_students = result.unique_students,
        subjects = result.subjects.len(),
        total_efts = %result.total_efts_display(),
        pass_rate = %result.pass_rate,
        excellence_rate = %result.excellence_rate,
        failure_rate = %result.failure_rate,
        "Result summary"
    );

    for (grade, count) in result.grades.iter() {
        info!(grade, count, percentage = %result.grade_share(count), "Grade");
    }

    match &result.ethnicity {
        Some(slices) => {
            for slice in slices {
                info!(
                    ethnicity = %slice.ethnicity,
                    count = slice.count,
                    percentage = %slice.percentage,
                    "Ethnicity"
                );
            }
        }
        None => info!("Ethnicity data not available in uploaded file"),
    }
}

#[tracing::instrument(skip_all, fields(filter = ?filter, output = %output.display()))]
fn export_chart(
    records: &[StudentRecord],
    filter: &Filter,
    config: &ReportConfig,
    output: &Path,
) -> Result<()> {
    let Some(result) = analyze(records, filter) else {
        return Ok(());
    };

    let chart = chart_data(&result, config);
    let export = ChartExport {
        generated_at: Utc::now(),
        chart: &chart,
    };
    write_json(output, &export)?;

    info!(
        programmes = chart.programmes.len(),
        top_subjects = chart.top_subjects.len(),
        has_ethnicity_data = chart.has_ethnicity_data(),
        "Chart data written"
    );
    Ok(())
}

#[tracing::instrument(skip_all, fields(filter = ?filter, output_dir = %output_dir.display(), format = ?format))]
fn export_workbook(
    records: &[StudentRecord],
    filter: &Filter,
    config: &ReportConfig,
    output_dir: &Path,
    format: ExportFormat,
) -> Result<()> {
    let Some(result) = analyze(records, filter) else {
        return Ok(());
    };

    let book = workbook(&result, records, config);
    let path = match format {
        ExportFormat::Xlsx => write_xlsx(output_dir, &book)?,
        ExportFormat::Csv => write_workbook(output_dir, &book)?,
    };
    info!(path = %path.display(), "Analysis report exported");
    Ok(())
}
