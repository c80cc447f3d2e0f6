//! `tabrecon run` and `tabrecon validate`: reconcile two CSV files.

use std::io::Write;
use std::path::{Path, PathBuf};

use clap::Args;

use tabrecon_core::engine::{load_csv_pair, reconcile_tables};
use tabrecon_core::{render_as, ReconConfig, RenderedReport, ReportFormat, TableConfig};

use crate::exit_codes::{EXIT_DIFFS, EXIT_IO, EXIT_USAGE};
use crate::html::render_page;
use crate::CliError;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Source CSV file
    #[arg(long, short = 's')]
    pub source: Option<PathBuf>,

    /// Target CSV file
    #[arg(long, short = 't')]
    pub target: Option<PathBuf>,

    /// Run config (.recon.toml); --source/--target are read from it
    #[arg(long, short = 'c', conflicts_with_all = ["source", "target"])]
    pub config: Option<PathBuf>,

    /// Report format: json, csv or html [default: json]
    #[arg(long, short = 'f')]
    pub format: Option<String>,

    /// Write the report to a file instead of stdout
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Treat a column as a date even if its name lacks "date". Repeatable.
    #[arg(long = "date-column", value_name = "NAME")]
    pub date_columns: Vec<String>,

    /// CSV delimiter for both inputs
    #[arg(long, default_value = ",")]
    pub delimiter: char,

    /// Exit 1 when any row is missing or any discrepancy is found
    #[arg(long)]
    pub fail_on_diff: bool,
}

/// Everything needed to execute one run, whether it came from flags or a
/// config file.
struct RunPlan {
    name: String,
    source_path: PathBuf,
    target_path: PathBuf,
    source: TableConfig,
    target: TableConfig,
    format: ReportFormat,
    output: Option<PathBuf>,
}

fn plan_from_config(config_path: &Path, args: &RunArgs) -> Result<RunPlan, CliError> {
    let config_str = std::fs::read_to_string(config_path).map_err(|e| {
        CliError::new(EXIT_IO, format!("cannot read config {}: {e}", config_path.display()))
    })?;
    let config = ReconConfig::from_toml(&config_str)?;

    // Resolve file paths relative to the config file's directory
    let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));

    let format = match &args.format {
        Some(f) => f.parse::<ReportFormat>()?,
        None => config.output.report_format()?,
    };
    let output = args
        .output
        .clone()
        .or_else(|| config.output.path.as_ref().map(|p| base_dir.join(p)));

    Ok(RunPlan {
        name: config.name.clone(),
        source_path: base_dir.join(&config.source.file),
        target_path: base_dir.join(&config.target.file),
        source: config.source,
        target: config.target,
        format,
        output,
    })
}

fn plan_from_args(args: &RunArgs) -> Result<RunPlan, CliError> {
    let format = match &args.format {
        Some(f) => f.parse::<ReportFormat>()?,
        None => ReportFormat::default(),
    };

    let (Some(source), Some(target)) = (&args.source, &args.target) else {
        return Err(CliError::new(EXIT_USAGE, "both --source and --target are required")
            .with_hint("or pass --config <file.recon.toml>"));
    };

    let table = |path: &Path| TableConfig {
        file: path.display().to_string(),
        delimiter: args.delimiter,
        date_columns: args.date_columns.clone(),
    };

    Ok(RunPlan {
        name: "reconciliation".into(),
        source_path: source.clone(),
        target_path: target.clone(),
        source: table(source),
        target: table(target),
        format,
        output: args.output.clone(),
    })
}

fn read_input(path: &Path) -> Result<String, CliError> {
    std::fs::read_to_string(path)
        .map_err(|e| CliError::new(EXIT_IO, format!("cannot read {}: {e}", path.display())))
}

pub fn cmd_run(args: RunArgs) -> Result<(), CliError> {
    let plan = match &args.config {
        Some(path) => plan_from_config(path, &args)?,
        None => plan_from_args(&args)?,
    };

    log::info!(
        "reconciling {} against {} ({})",
        plan.source_path.display(),
        plan.target_path.display(),
        plan.format
    );

    // Per-side date columns from flags apply on top of a config file too.
    let mut source_cfg = plan.source;
    let mut target_cfg = plan.target;
    if args.config.is_some() {
        source_cfg.date_columns.extend(args.date_columns.iter().cloned());
        target_cfg.date_columns.extend(args.date_columns.iter().cloned());
    }

    let source_csv = read_input(&plan.source_path)?;
    let target_csv = read_input(&plan.target_path)?;
    let (source, target) = load_csv_pair(&source_csv, &source_cfg, &target_csv, &target_cfg)?;

    let outcome = reconcile_tables(&source, &target)?;
    let rendered = render_as(&outcome, plan.format)?;

    let body = match rendered {
        RenderedReport::Structured(value) => {
            let mut s = serde_json::to_string_pretty(&value)
                .map_err(|e| CliError::new(EXIT_IO, format!("JSON serialization error: {e}")))?;
            s.push('\n');
            s
        }
        RenderedReport::Delimited(text) => text,
        RenderedReport::DisplayMarkup(ctx) => render_page(&plan.name, &ctx),
    };

    match &plan.output {
        Some(path) => {
            std::fs::write(path, &body).map_err(|e| {
                CliError::new(EXIT_IO, format!("cannot write {}: {e}", path.display()))
            })?;
            eprintln!("wrote {}", path.display());
        }
        None => {
            let stdout = std::io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(body.as_bytes())
                .and_then(|_| handle.flush())
                .map_err(|e| CliError::new(EXIT_IO, format!("cannot write report: {e}")))?;
        }
    }

    // Human summary to stderr
    let s = &outcome.summary;
    eprintln!(
        "{} source / {} target row(s) over {} common column(s): \
         {} missing in target, {} missing in source, {} discrepancies",
        s.source_rows,
        s.target_rows,
        s.common_columns,
        s.missing_in_target,
        s.missing_in_source,
        s.discrepancies,
    );

    if args.fail_on_diff && !s.is_reconciled() {
        return Err(CliError::new(EXIT_DIFFS, "differences found"));
    }

    Ok(())
}

pub fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config_str = std::fs::read_to_string(&config_path).map_err(|e| {
        CliError::new(EXIT_IO, format!("cannot read config {}: {e}", config_path.display()))
    })?;
    let config = ReconConfig::from_toml(&config_str)?;
    eprintln!(
        "valid: '{}' compares {} against {}, format {}",
        config.name,
        config.source.file,
        config.target.file,
        config.output.format,
    );
    Ok(())
}
