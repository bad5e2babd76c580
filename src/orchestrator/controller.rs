//! Run lifecycle controller.
//!
//! Owns the pipeline state machine and emits events for presentation layers.
//! One run at a time: the state machine itself rejects overlapping starts.

use crate::engine::PipelineController;
use crate::model::{DashboardEvent, GenerationMode, RunConfig, RunRequest, Stage, StartError};
use anyhow::Result;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::time::Instant;

/// Commands emitted by UI layers to control the pipeline.
#[derive(Debug, Clone)]
pub(crate) enum UiCommand {
    Start {
        mode: GenerationMode,
        request: RunRequest,
    },
    Cancel,
    ToggleQueueLink,
    ToggleEditorLink,
    SetVramTotal(f64),
    Quit,
}

/// Forward log entries appended since the last flush, in stream order.
fn flush_new_entries(
    pipeline: &PipelineController,
    seen: &mut usize,
    event_tx: &UnboundedSender<DashboardEvent>,
) {
    for entry in &pipeline.entries()[*seen..] {
        let _ = event_tx.send(DashboardEvent::LogAppended {
            entry: entry.clone(),
        });
    }
    *seen = pipeline.entries().len();
}

fn send_metrics(pipeline: &PipelineController, event_tx: &UnboundedSender<DashboardEvent>) {
    let _ = event_tx.send(DashboardEvent::MetricsUpdated {
        metrics: pipeline.metrics().clone(),
    });
}

/// Orchestrate pipeline runs based on UI commands and emit events back to
/// presentation layers. Single task; stage transitions, monitor ticks and
/// command handling interleave cooperatively in one `select!` loop, so the
/// run state never needs locking.
pub(crate) async fn run_controller(
    cfg: RunConfig,
    event_tx: UnboundedSender<DashboardEvent>,
    mut cmd_rx: UnboundedReceiver<UiCommand>,
) -> Result<()> {
    let mut pipeline = PipelineController::new(cfg.clone());
    let mut rng = StdRng::from_entropy();
    let mut monitor = tokio::time::interval(cfg.monitor_interval);
    monitor.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    // Entries already forwarded; reset whenever the stream itself resets.
    let mut seen_logs = 0usize;
    let mut metadata_emitted = false;
    let mut deadline: Option<Instant> = None;

    // Initial snapshot so presentation layers render gauges before any run.
    send_metrics(&pipeline, &event_tx);

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(UiCommand::Start { mode, request }) => {
                        match pipeline.start(mode, &request) {
                            Ok(()) => {
                                // The stream started cold; nothing sent so far
                                // belongs to this run.
                                seen_logs = 0;
                                metadata_emitted = false;
                                deadline = pipeline
                                    .current_dwell()
                                    .map(|d| Instant::now() + d);
                                let _ = event_tx.send(DashboardEvent::StageChanged {
                                    stage: pipeline.stage(),
                                });
                                send_metrics(&pipeline, &event_tx);
                            }
                            // Empty input appended a rejection entry, flushed
                            // below; a busy rejection had no side effects.
                            Err(StartError::EmptyInput | StartError::AlreadyRunning(_)) => {}
                        }
                        flush_new_entries(&pipeline, &mut seen_logs, &event_tx);
                    }
                    Some(UiCommand::Cancel) => {
                        if pipeline.cancel() {
                            deadline = None;
                            flush_new_entries(&pipeline, &mut seen_logs, &event_tx);
                            let _ = event_tx.send(DashboardEvent::StageChanged {
                                stage: pipeline.stage(),
                            });
                            send_metrics(&pipeline, &event_tx);
                        }
                    }
                    Some(UiCommand::ToggleQueueLink) => {
                        pipeline.set_queue_connected(!pipeline.metrics().queue_connected);
                        send_metrics(&pipeline, &event_tx);
                    }
                    Some(UiCommand::ToggleEditorLink) => {
                        pipeline.set_editor_connected(!pipeline.metrics().editor_connected);
                        send_metrics(&pipeline, &event_tx);
                    }
                    Some(UiCommand::SetVramTotal(total_gb)) => {
                        pipeline.set_vram_total(total_gb);
                        send_metrics(&pipeline, &event_tx);
                    }
                    Some(UiCommand::Quit) | None => break,
                }
            }
            // Independent of run lifecycle: the gauge keeps moving while idle.
            _ = monitor.tick() => {
                pipeline.tick_metrics(&mut rng);
                send_metrics(&pipeline, &event_tx);
            }
            // Pending stage transition. Disabled while no run is in flight.
            _ = async {
                match deadline {
                    Some(d) => tokio::time::sleep_until(d).await,
                    None => futures::future::pending().await,
                }
            } => {
                deadline = pipeline.advance().map(|d| Instant::now() + d);
                flush_new_entries(&pipeline, &mut seen_logs, &event_tx);
                let _ = event_tx.send(DashboardEvent::StageChanged {
                    stage: pipeline.stage(),
                });
                if !metadata_emitted {
                    if let Some(meta) = pipeline.metadata() {
                        metadata_emitted = true;
                        let _ = event_tx.send(DashboardEvent::MetadataReady {
                            metadata: Box::new(meta.clone()),
                        });
                    }
                }
                if pipeline.stage() == Stage::Completed {
                    send_metrics(&pipeline, &event_tx);
                    if let Some(report) = pipeline.report() {
                        let _ = event_tx.send(DashboardEvent::RunCompleted {
                            report: Box::new(report),
                        });
                    }
                }
            }
        }
    }

    Ok(())
}
