mod flight_log;
mod inputs;
mod kml;

use std::fs;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand, ValueHint};
use igc_log::{analyze_igc, AnalysisParams, FlightReport, FlightSummary};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crate::kml::{KmlOptions, KPH_TO_MPH};

#[derive(Parser, Debug)]
#[command(author, version, about = "IGC flight log and KML track generator", long_about = None)]
struct Cli {
    /// Verbose logging
    #[arg(long, global = true, action = ArgAction::SetTrue)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a CSV flight log with one line per IGC file
    Log(LogArgs),
    /// Write a KML document with the fixes and flight path of each IGC file
    Kml(KmlArgs),
    /// Print one JSON flight summary per IGC file
    Summary(SummaryArgs),
}

#[derive(Parser, Debug)]
struct LogArgs {
    /// IGC files or directories containing IGC files
    #[arg(required = true, value_hint = ValueHint::AnyPath)]
    inputs: Vec<PathBuf>,

    /// Output CSV path (`-` for stdout)
    #[arg(short, long, default_value = "flightlog.csv", value_hint = ValueHint::FilePath)]
    output: PathBuf,

    #[command(flatten)]
    analysis: AnalysisArgs,
}

#[derive(Parser, Debug)]
struct KmlArgs {
    /// IGC files or directories containing IGC files
    #[arg(required = true, value_hint = ValueHint::AnyPath)]
    inputs: Vec<PathBuf>,

    /// Output KML path (defaults to the first input file path plus `.kml`)
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    output: Option<PathBuf>,

    /// Factor applied to the recorded speed before display
    #[arg(long, default_value_t = KPH_TO_MPH)]
    speed_factor: f64,

    /// Unit label for the converted speed
    #[arg(long, default_value = "mph")]
    speed_unit: String,

    #[command(flatten)]
    analysis: AnalysisArgs,
}

#[derive(Parser, Debug)]
struct SummaryArgs {
    /// IGC files or directories containing IGC files
    #[arg(required = true, value_hint = ValueHint::AnyPath)]
    inputs: Vec<PathBuf>,

    #[command(flatten)]
    analysis: AnalysisArgs,
}

#[derive(Args, Debug)]
struct AnalysisArgs {
    /// Climb-rate look-ahead intervals (comma separated seconds)
    #[arg(long)]
    intervals: Option<String>,

    /// Only consider fixes after the start fix when measuring climbs
    #[arg(long, action = ArgAction::SetTrue)]
    forward_scan: bool,

    /// Report exact flight minutes instead of rounding up by one
    #[arg(long, action = ArgAction::SetTrue)]
    no_round_up: bool,

    /// Analysis parameters JSON (flags above override it)
    #[arg(long, value_hint = ValueHint::FilePath)]
    params: Option<PathBuf>,
}

pub struct AnalyzedFile {
    pub path: PathBuf,
    pub report: FlightReport,
}

impl AnalyzedFile {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    match cli.command {
        Command::Log(args) => handle_log(args),
        Command::Kml(args) => handle_kml(args),
        Command::Summary(args) => handle_summary(args),
    }
}

fn handle_log(args: LogArgs) -> Result<()> {
    let params = build_params(&args.analysis)?;
    let Some(files) = load_inputs(&args.inputs, &params)? else {
        return Ok(());
    };

    let written = if args.output.as_os_str() == "-" {
        flight_log::write_flight_log(&files, &params, io::stdout().lock())?
    } else {
        let file = File::create(&args.output)
            .with_context(|| format!("failed to create {}", args.output.display()))?;
        flight_log::write_flight_log(&files, &params, BufWriter::new(file))
            .with_context(|| format!("failed to write {}", args.output.display()))?
    };
    info!("Wrote flight log: {} ({} flights)", args.output.display(), written);
    Ok(())
}

fn handle_kml(args: KmlArgs) -> Result<()> {
    let params = build_params(&args.analysis)?;
    let Some(files) = load_inputs(&args.inputs, &params)? else {
        return Ok(());
    };

    let output = match args.output {
        Some(path) => path,
        None => kml::default_output_path(&files[0].path)?,
    };
    let opts = KmlOptions {
        speed_factor: args.speed_factor,
        speed_unit: args.speed_unit,
    };
    let document = kml::kml_document(&files, &opts);
    fs::write(&output, document)
        .with_context(|| format!("failed to write {}", output.display()))?;
    info!("Wrote KML: {} ({} flights)", output.display(), files.len());
    Ok(())
}

#[derive(Serialize)]
struct SummaryLine<'a> {
    file: String,
    summary: &'a FlightSummary,
}

fn handle_summary(args: SummaryArgs) -> Result<()> {
    let params = build_params(&args.analysis)?;
    let Some(files) = load_inputs(&args.inputs, &params)? else {
        return Ok(());
    };

    write_summaries(&files, io::stdout().lock())
}

fn write_summaries<W: Write>(files: &[AnalyzedFile], mut out: W) -> Result<()> {
    for file in files {
        let line = SummaryLine {
            file: file.file_name(),
            summary: &file.report.summary,
        };
        serde_json::to_writer(&mut out, &line)?;
        writeln!(out)?;
    }
    out.flush()?;
    Ok(())
}

/// `None` when nothing could be analysed, which ends the run without output.
fn load_inputs(inputs: &[PathBuf], params: &AnalysisParams) -> Result<Option<Vec<AnalyzedFile>>> {
    let paths = inputs::collect_igc_files(inputs)?;
    if paths.is_empty() {
        warn!("No IGC files on the paths specified");
        return Ok(None);
    }
    let files = analyze_files(&paths, params);
    if files.is_empty() {
        warn!("None of the {} IGC files could be analysed", paths.len());
        return Ok(None);
    }
    Ok(Some(files))
}

/// Analyse files in parallel. A file that cannot be read or parsed is logged
/// and left out; the remaining files keep their input order.
fn analyze_files(paths: &[PathBuf], params: &AnalysisParams) -> Vec<AnalyzedFile> {
    let t_analyze = Instant::now();
    let results: Vec<(PathBuf, Result<FlightReport>)> = paths
        .par_iter()
        .map(|path| (path.clone(), analyze_file(path, params)))
        .collect();

    let mut files = Vec::with_capacity(results.len());
    for (path, result) in results {
        match result {
            Ok(report) => {
                let summary = &report.summary;
                if !summary.is_complete() {
                    warn!(
                        "{}: incomplete flight ({:?} at end of track)",
                        path.display(),
                        summary.phase
                    );
                }
                debug!("{}: max speed {}", path.display(), summary.max_speed);
                files.push(AnalyzedFile { path, report });
            }
            Err(err) => {
                warn!("The file {} could not be analysed: {:#}", path.display(), err);
            }
        }
    }
    info!(
        "Analysed {} of {} IGC files in {:.1} ms",
        files.len(),
        paths.len(),
        t_analyze.elapsed().as_secs_f64() * 1000.0
    );
    files
}

fn analyze_file(path: &Path, params: &AnalysisParams) -> Result<FlightReport> {
    let data = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let report =
        analyze_igc(&data, params).with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(report)
}

fn build_params(args: &AnalysisArgs) -> Result<AnalysisParams> {
    let mut params = match args.params.as_ref() {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read parameters {}", path.display()))?;
            AnalysisParams::from_json(&text)
                .with_context(|| format!("invalid parameters in {}", path.display()))?
        }
        None => AnalysisParams::default(),
    };

    if let Some(list) = args.intervals.as_ref() {
        let intervals = parse_interval_list(list)?;
        if intervals.is_empty() {
            return Err(anyhow!("--intervals list was empty"));
        }
        params.climb_intervals_s = intervals;
    }
    if args.forward_scan {
        params.legacy_full_scan = false;
    }
    if args.no_round_up {
        params.duration_round_up_minutes = 0;
    }
    params.validate()?;
    Ok(params)
}

fn parse_interval_list(input: &str) -> Result<Vec<u32>> {
    let mut out = Vec::new();
    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            continue;
        }
        let value: u32 = trimmed
            .parse()
            .with_context(|| format!("invalid interval '{}': expected integer seconds", trimmed))?;
        if value == 0 {
            return Err(anyhow!("interval tokens must be > 0"));
        }
        out.push(value);
    }
    Ok(out)
}
