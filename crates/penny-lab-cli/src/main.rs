use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use penny_lab_abstract::{AnalysisConfig, AnalysisProfile, TraceConfig};
use penny_lab_stats::{AccuracyReport, Evaluator, GroupEcdf, SampleGroup, aggregate};
use penny_lab_trace::{
    CompletionSamples, FlowReconstructor, FlowTable, IngestSummary, check_config,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Flow reconstruction and drop classification for ns-3 traces")]
struct Args {
    /// Analysis profile (TOML) with threshold overrides and group rules.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Rebuild per-flow ACK timelines from ASCII traces.
    Extract {
        #[arg(required = true)]
        traces: Vec<PathBuf>,
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Classify every drop event in snapshot documents.
    Classify {
        /// Snapshot files or directories of them.
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Completion-time distributions per experiment group.
    Fct {
        /// Directory of flow record files.
        dir: PathBuf,
        /// Number of full segments a flow must have acknowledged.
        #[arg(long, short)]
        packet: u32,
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

#[derive(Debug, Serialize)]
struct FctReport {
    packets: u32,
    ack: u32,
    incomplete_flows: usize,
    groups: Vec<GroupEcdf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging();
    info!("penny-lab starting…");

    let profile = match &args.config {
        Some(path) => load_profile(path)?,
        None => AnalysisProfile::default(),
    };
    let config = profile.resolve();

    match args.command {
        Command::Extract { traces, output } => {
            let table = extract(&traces, &config.trace).await?;
            emit(output.as_deref(), &table.to_records_string()?)
        }
        Command::Classify { inputs, output } => {
            let report = classify(&inputs, &config)?;
            emit(output.as_deref(), &to_json(&report)?)
        }
        Command::Fct {
            dir,
            packet,
            output,
        } => {
            let report = completion_report(&dir, packet, &profile, &config)?;
            emit(output.as_deref(), &to_json(&report)?)
        }
    }
}

fn init_logging() {
    tracing_subscriber::fmt().with_writer(io::stderr).init();
}

/// One reconstructor per trace on the blocking pool, merged in argument order.
async fn extract(traces: &[PathBuf], config: &TraceConfig) -> Result<FlowTable> {
    check_config(config).context("Invalid [config] control port range")?;
    let handles: Vec<_> = traces
        .iter()
        .cloned()
        .map(|path| {
            let config = config.clone();
            tokio::task::spawn_blocking(move || reconstruct_file(&path, config))
        })
        .collect();

    let mut merged = FlowTable::new();
    for (handle, path) in handles.into_iter().zip(traces) {
        let (table, summary) = handle
            .await
            .with_context(|| format!("Reconstruction task for {} panicked", path.display()))??;
        log_summary(path, &summary);
        merged.merge(table);
    }
    Ok(merged)
}

fn reconstruct_file(path: &Path, config: TraceConfig) -> Result<(FlowTable, IngestSummary)> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read trace file {}", path.display()))?;
    let mut reconstructor = FlowReconstructor::new(config);
    reconstructor.ingest_lines(content.lines());
    Ok(reconstructor.finish())
}

fn log_summary(path: &Path, summary: &IngestSummary) {
    info!(
        "{}: {} flows opened | {} acks | {} control lines | {} malformed",
        path.display(),
        summary.flows_opened,
        summary.acks_recorded,
        summary.control,
        summary.malformed
    );
    if !summary.unmatched.is_empty() {
        warn!(
            "{}: {} acks arrived for flows without a recorded SYN",
            path.display(),
            summary.unmatched.len()
        );
    }
}

fn classify(inputs: &[PathBuf], config: &AnalysisConfig) -> Result<AccuracyReport> {
    let evaluator =
        Evaluator::new(config.verdict.clone()).context("Invalid verdict configuration")?;
    let mut report = AccuracyReport::default();

    for input in inputs {
        if input.is_dir() {
            for path in list_files(input)? {
                match classify_file(&evaluator, &path) {
                    Ok(part) => report.extend(part),
                    Err(err) => warn!("Couldn't process '{}': {:#}", path.display(), err),
                }
            }
        } else {
            report.extend(classify_file(&evaluator, input)?);
        }
    }

    let t = &report.tallies;
    info!(
        "Classified {} drop events: {} closed-loop | {} spoofed | {} duplicates exceeded | {} undecided",
        t.total(),
        t.closed_loop,
        t.spoofed,
        t.duplicate_exceeded,
        t.no_decision
    );
    Ok(report)
}

fn classify_file(evaluator: &Evaluator, path: &Path) -> Result<AccuracyReport> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read snapshot file {}", path.display()))?;
    let snapshots = penny_lab_stats::parse_snapshots(&content)
        .with_context(|| format!("Failed to parse snapshot file {}", path.display()))?;
    Ok(penny_lab_stats::assess_snapshots(evaluator, &snapshots))
}

fn completion_report(
    dir: &Path,
    packets: u32,
    profile: &AnalysisProfile,
    config: &AnalysisConfig,
) -> Result<FctReport> {
    if profile.groups.is_empty() {
        anyhow::bail!("fct needs [[groups]] rules in the --config profile");
    }
    let ack = config
        .completion
        .completion_ack(packets)
        .with_context(|| format!("Packet count {packets} overflows the ack space"))?;

    let mut groups: Vec<SampleGroup> = Vec::new();
    for rule in &profile.groups {
        if !groups.iter().any(|g| g.label == rule.label) {
            groups.push(SampleGroup::new(rule.label.clone()));
        }
    }

    let mut incomplete_flows = 0;
    for path in list_files(dir)? {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        let Some(label) = profile.group_for(name) else {
            warn!("File '{}' matches no group rule", name);
            continue;
        };

        match file_completion_times(&path, config, packets) {
            Ok(times) => {
                incomplete_flows += times.incomplete.len();
                if let Some(group) = groups.iter_mut().find(|g| g.label == label) {
                    group.samples.extend(times.samples);
                }
            }
            Err(err) => warn!("Couldn't process '{}': {:#}", path.display(), err),
        }
    }

    let groups = aggregate(&groups).context("Cannot build completion-time distributions")?;
    Ok(FctReport {
        packets,
        ack,
        incomplete_flows,
        groups,
    })
}

fn file_completion_times(
    path: &Path,
    config: &AnalysisConfig,
    packets: u32,
) -> Result<CompletionSamples> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read flow record file {}", path.display()))?;
    let table = penny_lab_trace::read_flow_records(&content)?;
    Ok(penny_lab_trace::completion_times(
        &table,
        &config.completion,
        packets,
    )?)
}

/// Regular files directly inside `dir`, sorted by name.
fn list_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)
        .with_context(|| format!("Failed to list directory {}", dir.display()))?
    {
        let path = entry
            .with_context(|| format!("Failed to list directory {}", dir.display()))?
            .path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn load_profile(path: &Path) -> Result<AnalysisProfile> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read profile {}", path.display()))?;
    let profile: AnalysisProfile =
        toml::from_str(&content).context("Failed to parse analysis profile")?;
    Ok(profile)
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    let mut json = serde_json::to_string_pretty(value).context("Failed to serialize report")?;
    json.push('\n');
    Ok(json)
}

fn emit(output: Option<&Path>, data: &str) -> Result<()> {
    match output {
        Some(path) => fs::write(path, data)
            .with_context(|| format!("Failed to write output file {}", path.display())),
        None => io::stdout()
            .lock()
            .write_all(data.as_bytes())
            .context("Failed to write to stdout"),
    }
}
