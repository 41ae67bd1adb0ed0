//! Evaluate a branch predictor against a RISC-V commit trace.
//!
//! Each line of the trace is expected to look like the commit log of an ISA
//! simulator (`0x<pc> (0x<inst>) ...`). A trace of "-" is read from stdin,
//! so the simulator can be piped in directly.

use std::io::{ self, BufRead, Write };
use std::path::PathBuf;
use std::process;

use clap::Parser;
use serde::Serialize;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use pythia::*;

/// Branches executed fewer times than this are left out of `--worst`.
const WORST_MIN_OCC: usize = 64;

/// Length of the outcome history shown for each branch in `--worst`.
const WORST_PATTERN_LEN: usize = 32;

#[derive(Parser, Debug)]
#[command(
    name = "pythia",
    version,
    about = "Evaluate front-end branch predictors against a RISC-V commit trace"
)]
struct Cli {
    /// Commit trace to evaluate ("-" reads from stdin)
    trace: PathBuf,

    /// Prediction policy (rocket, superscalar)
    #[arg(short, long)]
    predictor: Option<PredictorKind>,

    /// Fetch width in instructions
    #[arg(short, long)]
    width: Option<usize>,

    /// Number of BTB entries (the BHT has twice as many)
    #[arg(short, long)]
    btb_entries: Option<usize>,

    /// Number of RAS entries
    #[arg(short, long)]
    ras_entries: Option<usize>,

    /// Bits of global history used to index the BHT
    #[arg(long)]
    history_bits: Option<usize>,

    /// JSON predictor configuration (flags override its values)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print every trace event
    #[arg(short, long)]
    debug: bool,

    /// Emit the results as JSON
    #[arg(long)]
    json: bool,

    /// List the N most poorly predicted frequent branches
    #[arg(long, value_name = "N")]
    worst: Option<usize>,
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error("failed to serialize results: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
}

#[derive(Serialize)]
struct WorstBranch {
    pc: u64,
    occ: usize,
    hits: usize,
    taken: usize,
}

#[derive(Serialize)]
struct Report<'a> {
    trace: &'a str,
    predictor: &'static str,
    config: &'a PredictorConfig,
    records: usize,
    ras_overflows: usize,
    stats: EvalStats,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    worst: Vec<WorstBranch>,
}

/// Build the predictor configuration from the config file and any flags.
fn load_config(cli: &Cli) -> Result<PredictorConfig, ConfigError> {
    let mut cfg = match &cli.config {
        Some(path) => PredictorConfig::from_file(path)?,
        None => PredictorConfig::default(),
    };
    if let Some(kind) = cli.predictor { cfg.kind = kind; }
    if let Some(w) = cli.width { cfg.fetch_width = w; }
    if let Some(n) = cli.btb_entries { cfg.btb_entries = n; }
    if let Some(n) = cli.ras_entries { cfg.ras_entries = n; }
    if let Some(n) = cli.history_bits { cfg.history_bits = n; }
    cfg.validate()?;
    Ok(cfg)
}

/// Write the event log. In JSON mode stdout only carries the report, so
/// events go to 'err' instead of 'out'.
fn dump_events(events: &[TraceEvent], json: bool, out: &mut impl Write,
    err: &mut impl Write) -> io::Result<()>
{
    let sink: &mut dyn Write = if json { err } else { out };
    for event in events {
        writeln!(sink, "{}", event)?;
    }
    Ok(())
}

fn evaluate_trace<R: BufRead>(cli: &Cli, cfg: &PredictorConfig,
    trace: TraceReader<R>) -> Result<(), CliError>
{
    let trace_name = trace.name().to_string();
    let predictor = cfg.build().map_err(EvalError::from)?;
    let mut eval = Evaluator::new(predictor);
    if cli.debug {
        eval = eval.with_event_log();
    }

    // Dump whatever was recorded, even if the run failed part-way
    let res = eval.run(trace);
    dump_events(eval.events(), cli.json, &mut io::stdout().lock(),
        &mut io::stderr().lock())?;
    let stats = res?;

    let worst: Vec<WorstBranch> = cli.worst.map(|n| {
        eval.branch_stats().get_low_rate_branches(n, WORST_MIN_OCC)
            .into_iter()
            .map(|(pc, d)| WorstBranch {
                pc, occ: d.occ, hits: d.hits, taken: d.times_taken()
            })
            .collect()
    }).unwrap_or_default();

    let p = eval.predictor();
    if cli.json {
        let report = Report {
            trace: &trace_name,
            predictor: p.name(),
            config: cfg,
            records: eval.num_records(),
            ras_overflows: p.ras().overflows(),
            stats,
            worst,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("[*] {} ({} records)", trace_name, eval.num_records());
    println!("  {:16}: {}", "Predictor", p.name());
    println!("  {:16}: {}", "Fetch width", cfg.fetch_width);
    println!("  {:16}: {}", "BTB entries", p.btb().size());
    println!("  {:16}: {} ({}-bit counters)", "BHT entries",
        p.bht().size(), p.bht().counter_config().bits);
    println!("  {:16}: {} ({} overflows)", "RAS entries",
        p.ras().capacity(), p.ras().overflows());
    println!();
    println!("{}", stats);

    if cli.worst.is_some() {
        println!();
        println!("[*] Poorly predicted branches (> {} executions):",
            WORST_MIN_OCC);
        for b in worst.iter() {
            let pat = eval.branch_stats().get(b.pc)
                .map(|d| d.recent_pattern(WORST_PATTERN_LEN))
                .unwrap_or_default();
            println!("  0x{:016x}: {:8} executions, {:6.2}% hit, {:6.2}% taken [{}]",
                b.pc, b.occ,
                100.0 * b.hits as f64 / b.occ as f64,
                100.0 * b.taken as f64 / b.occ as f64,
                pat,
            );
        }
    }
    Ok(())
}

fn run(cli: &Cli) -> Result<(), CliError> {
    let cfg = load_config(cli).map_err(EvalError::from)?;
    if cli.trace.as_os_str() == "-" {
        let trace = TraceReader::new("stdin", io::stdin().lock());
        evaluate_trace(cli, &cfg, trace)
    } else {
        let trace = TraceReader::from_file(&cli.trace)
            .map_err(EvalError::from)?;
        evaluate_trace(cli, &cfg, trace)
    }
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    if let Err(e) = run(&cli) {
        eprintln!("pythia: {}", e);
        process::exit(1);
    }
}
