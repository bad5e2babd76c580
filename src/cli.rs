use crate::model::{
    DashboardEvent, GenerationMode, LogEntry, RunConfig, RunRequest, Severity,
};
use crate::orchestrator::{self, UiCommand};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::io::Write;
use std::time::Duration;
use tokio::sync::mpsc;

/// Output line routing for stdout/stderr writer.
enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = std::io::LineWriter::new(stdout.lock());
        let mut err = std::io::LineWriter::new(stderr.lock());

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(out, "{}", msg);
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(err, "{}", msg);
                }
            }
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Procedural,
    Visual,
}

impl From<ModeArg> for GenerationMode {
    fn from(m: ModeArg) -> Self {
        match m {
            ModeArg::Procedural => GenerationMode::Procedural,
            ModeArg::Visual => GenerationMode::Visual,
        }
    }
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "asset-forge-cli",
    version,
    about = "Simulated asset-generation pipeline dashboard with optional TUI"
)]
pub struct Cli {
    /// Generation mode for scripted runs (and the initial TUI selection)
    #[arg(long, value_enum, default_value = "procedural")]
    pub mode: ModeArg,

    /// Free-text prompt describing the asset to generate
    #[arg(long)]
    pub prompt: Option<String>,

    /// Attach a reference file by name (repeatable); content is never read
    #[arg(long = "attach")]
    pub attachments: Vec<String>,

    /// Run one scripted pipeline and print the final report as JSON (no TUI)
    #[arg(long)]
    pub json: bool,

    /// Run one scripted pipeline and print streamed log lines (no TUI)
    #[arg(long)]
    pub text: bool,

    /// Ingestion stage duration
    #[arg(long, default_value = "2s")]
    pub ingestion_dwell: humantime::Duration,

    /// Extraction stage duration
    #[arg(long, default_value = "2500ms")]
    pub extraction_dwell: humantime::Duration,

    /// Generation stage duration
    #[arg(long, default_value = "3s")]
    pub generation_dwell: humantime::Duration,

    /// Dispatch stage duration
    #[arg(long, default_value = "2500ms")]
    pub dispatch_dwell: humantime::Duration,

    /// Resource monitor cadence
    #[arg(long, default_value = "2s")]
    pub monitor_interval: humantime::Duration,

    /// Operator-configured VRAM ceiling in GB
    #[arg(long, default_value_t = 24.0)]
    pub vram_total: f64,

    /// Use --queue-link true or --queue-link false to override
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub queue_link: bool,

    /// Use --editor-link true or --editor-link false to override
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub editor_link: bool,
}

/// Build a `RunConfig` from CLI arguments.
pub fn build_config(args: &Cli) -> RunConfig {
    RunConfig {
        vram_total_gb: args.vram_total,
        queue_connected: args.queue_link,
        editor_connected: args.editor_link,
        ingestion_dwell: Duration::from(args.ingestion_dwell),
        extraction_dwell: Duration::from(args.extraction_dwell),
        generation_dwell: Duration::from(args.generation_dwell),
        dispatch_dwell: Duration::from(args.dispatch_dwell),
        monitor_interval: Duration::from(args.monitor_interval),
    }
}

/// Build the run input from CLI arguments.
pub fn build_request(args: &Cli) -> RunRequest {
    RunRequest {
        prompt: args.prompt.clone().unwrap_or_default(),
        attachments: args.attachments.clone(),
    }
}

pub async fn run(args: Cli) -> Result<()> {
    if !args.json && !args.text {
        #[cfg(feature = "tui")]
        {
            return crate::tui::run(args).await;
        }
        #[cfg(not(feature = "tui"))]
        {
            // Fallback when built without TUI support.
            return run_scripted(args).await;
        }
    }

    run_scripted(args).await
}

fn severity_tag(severity: Severity) -> &'static str {
    match severity {
        Severity::Info => "INFO",
        Severity::Success => "OK",
        Severity::Warning => "WARN",
        Severity::Error => "ERROR",
    }
}

fn format_entry(entry: &LogEntry) -> String {
    format!(
        "{:>7.2}s {:<5} [{}] {}",
        entry.timestamp_ms as f64 / 1000.0,
        severity_tag(entry.severity),
        entry.stage,
        entry.message
    )
}

/// Run one pipeline to completion without a TUI, streaming log lines to
/// stderr and the final output (JSON report or text summary) to stdout.
async fn run_scripted(args: Cli) -> Result<()> {
    let request = build_request(&args);
    if request.is_empty() {
        return Err(anyhow::anyhow!(
            "nothing to process: pass --prompt and/or --attach"
        ));
    }

    let cfg = build_config(&args);
    let (out_tx, out_handle) = spawn_output_writer();
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<DashboardEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    let controller = tokio::spawn(orchestrator::run_controller(cfg, event_tx, cmd_rx));

    cmd_tx
        .send(UiCommand::Start {
            mode: args.mode.into(),
            request,
        })
        .context("controller task closed before start")?;

    let mut report = None;
    let mut last_metrics = None;
    while let Some(ev) = event_rx.recv().await {
        match ev {
            DashboardEvent::StageChanged { stage } => {
                if !args.json {
                    let _ = out_tx.send(OutputLine::Stderr(format!("== {stage} ==")));
                }
            }
            DashboardEvent::LogAppended { entry } => {
                if !args.json {
                    let _ = out_tx.send(OutputLine::Stderr(format_entry(&entry)));
                }
            }
            DashboardEvent::MetricsUpdated { metrics } => {
                last_metrics = Some(metrics);
            }
            DashboardEvent::RunCompleted { report: r } => {
                report = Some(*r);
                break;
            }
            DashboardEvent::MetadataReady { .. } => {}
        }
    }
    let _ = cmd_tx.send(UiCommand::Quit);

    controller
        .await
        .context("controller task failed")?
        .context("pipeline run failed")?;

    let report = report.context("controller closed before the run completed")?;
    if args.json {
        let out = serde_json::to_string_pretty(&report)?;
        let _ = out_tx.send(OutputLine::Stdout(out));
    } else {
        let _ = out_tx.send(OutputLine::Stdout(format!(
            "Run finished: mode={} stage={} logs={}",
            report.mode,
            report.stage,
            report.logs.len()
        )));
        if let Some(meta) = &report.metadata {
            let _ = out_tx.send(OutputLine::Stdout(format!(
                "Asset: {} ({:?}, collider {:?})",
                meta.name, meta.category, meta.physics.collider
            )));
        }
        if let Some(m) = &last_metrics {
            let _ = out_tx.send(OutputLine::Stdout(format!(
                "GPU VRAM: {:.1} / {:.0} GB [{}]",
                m.vram_usage_gb,
                m.vram_total_gb,
                crate::status::vram_status(m.vram_usage_gb, m.vram_total_gb).label()
            )));
        }
    }

    drop(out_tx);
    let _ = out_handle.await;
    Ok(())
}
