//! Pipeline state machine.
//!
//! `PipelineController` owns the run state end to end: current stage, the log
//! stream, the metadata slot, and the system gauges. Presentation layers
//! never mutate it directly; the orchestrator drives it with `start`,
//! `advance` and `cancel` and forwards the observable changes as events.

mod extract;
mod stages;

pub use extract::extract;

use crate::logstream::LogStream;
use crate::model::{
    AssetMetadata, GenerationMode, RunConfig, RunReport, RunRequest, Severity, Stage, StartError,
    SystemMetrics,
};
use crate::monitor;
use rand::Rng;
use std::time::Duration;

pub struct PipelineController {
    cfg: RunConfig,
    stage: Stage,
    mode: Option<GenerationMode>,
    log: LogStream,
    metadata: Option<AssetMetadata>,
    metrics: SystemMetrics,
}

impl PipelineController {
    pub fn new(cfg: RunConfig) -> Self {
        // A ceiling below the floor would make the gauge range empty.
        let vram_total_gb = cfg.vram_total_gb.max(monitor::VRAM_FLOOR_GB);
        let metrics = SystemMetrics {
            vram_usage_gb: monitor::VRAM_USAGE_START_GB.min(vram_total_gb),
            vram_total_gb,
            queue_connected: cfg.queue_connected,
            editor_connected: cfg.editor_connected,
            active_workers: 0,
        };
        Self {
            cfg,
            stage: Stage::Idle,
            mode: None,
            log: LogStream::new(),
            metadata: None,
            metrics,
        }
    }

    /// Begin a run. Only allowed from a resting stage; rejects empty input
    /// with a single error entry and otherwise starts cold: the log stream
    /// and the metadata slot from the previous run are discarded.
    ///
    /// A second call while a run is in flight is rejected with zero side
    /// effects.
    pub fn start(&mut self, mode: GenerationMode, request: &RunRequest) -> Result<(), StartError> {
        if !self.stage.is_resting() {
            return Err(StartError::AlreadyRunning(self.stage));
        }
        if request.is_empty() {
            self.log.append(
                self.stage,
                "Error: enter a prompt or attach a file.",
                Severity::Error,
            );
            return Err(StartError::EmptyInput);
        }

        self.log.reset();
        self.metadata = None;
        self.stage = Stage::Ingestion;
        self.mode = Some(mode);
        self.metrics.active_workers = 1;

        for (message, severity) in stages::acceptance_script(mode, request) {
            self.log.append(Stage::Ingestion, message, severity);
        }
        Ok(())
    }

    /// Complete the current stage's simulated work and move to the next
    /// stage. Returns the dwell to wait before calling again, or `None` once
    /// the pipeline rests. Each call appends that stage's full script before
    /// the transition, so entries of stage N always precede entries of
    /// stage N+1.
    pub fn advance(&mut self) -> Option<Duration> {
        let mode = self.mode?;
        match self.stage {
            Stage::Ingestion => {
                for (message, severity) in stages::ingestion_script() {
                    self.log.append(Stage::Ingestion, message, severity);
                }
                self.stage = Stage::Extraction;
            }
            Stage::Extraction => {
                for (message, severity) in stages::extraction_script(self.metrics.vram_usage_gb) {
                    self.log.append(Stage::Extraction, message, severity);
                }
                // Synthesized eagerly, exactly once per run, at the
                // Extraction→Generation boundary.
                self.metadata = Some(extract::extract(mode));
                self.stage = Stage::Generation;
            }
            Stage::Generation => {
                for (message, severity) in stages::generation_script(mode) {
                    self.log.append(Stage::Generation, message, severity);
                }
                self.stage = Stage::Dispatch;
            }
            Stage::Dispatch => {
                let name = self
                    .metadata
                    .as_ref()
                    .map(|m| m.name.clone())
                    .unwrap_or_default();
                for (message, severity) in stages::dispatch_script(&name) {
                    self.log.append(Stage::Dispatch, message, severity);
                }
                self.stage = Stage::Completed;
                self.metrics.active_workers = 0;
                self.log.append(
                    Stage::Completed,
                    "Pipeline finished. Awaiting next task.",
                    Severity::Info,
                );
            }
            Stage::Idle | Stage::Completed | Stage::Error => {}
        }
        self.current_dwell()
    }

    /// Abort an in-flight run. The only transition into `Error`; a new run
    /// may start from there. Returns `false` when nothing was running.
    pub fn cancel(&mut self) -> bool {
        if self.stage.is_resting() {
            return false;
        }
        self.log
            .append(self.stage, "Run cancelled by operator.", Severity::Warning);
        self.stage = Stage::Error;
        self.metrics.active_workers = 0;
        true
    }

    /// Dwell of the stage currently doing simulated work, if any.
    pub fn current_dwell(&self) -> Option<Duration> {
        stages::dwell(self.stage, &self.cfg)
    }

    /// One resource-monitor tick: perturb the VRAM gauge. Independent of run
    /// lifecycle.
    pub fn tick_metrics<R: Rng>(&mut self, rng: &mut R) {
        monitor::perturb(&mut self.metrics, rng);
    }

    pub fn set_queue_connected(&mut self, connected: bool) {
        self.metrics.queue_connected = connected;
    }

    pub fn set_editor_connected(&mut self, connected: bool) {
        self.metrics.editor_connected = connected;
    }

    /// Operator-configured VRAM ceiling; the gauge is re-clamped to it.
    pub fn set_vram_total(&mut self, total_gb: f64) {
        self.metrics.vram_total_gb = total_gb.max(monitor::VRAM_FLOOR_GB);
        self.metrics.vram_usage_gb = self
            .metrics
            .vram_usage_gb
            .clamp(monitor::VRAM_FLOOR_GB, self.metrics.vram_total_gb);
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn is_running(&self) -> bool {
        !self.stage.is_resting()
    }

    pub fn entries(&self) -> &[crate::model::LogEntry] {
        self.log.entries()
    }

    pub fn metadata(&self) -> Option<&AssetMetadata> {
        self.metadata.as_ref()
    }

    pub fn metrics(&self) -> &SystemMetrics {
        &self.metrics
    }

    /// Snapshot of the current/last run, if one was ever started.
    pub fn report(&self) -> Option<RunReport> {
        let mode = self.mode?;
        Some(RunReport {
            timestamp_utc: time::OffsetDateTime::now_utc()
                .format(&time::format_description::well_known::Rfc3339)
                .unwrap_or_else(|_| "now".into()),
            mode,
            stage: self.stage,
            metadata: self.metadata.clone(),
            logs: self.log.entries().to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AssetCategory;

    fn controller() -> PipelineController {
        PipelineController::new(RunConfig::default())
    }

    fn prompt(text: &str) -> RunRequest {
        RunRequest {
            prompt: text.into(),
            attachments: Vec::new(),
        }
    }

    fn run_to_rest(ctrl: &mut PipelineController) -> Vec<Stage> {
        let mut observed = vec![ctrl.stage()];
        while ctrl.is_running() {
            ctrl.advance();
            observed.push(ctrl.stage());
        }
        observed
    }

    #[test]
    fn full_run_walks_the_linear_order() {
        let mut ctrl = controller();
        ctrl.start(GenerationMode::Procedural, &prompt("a crate"))
            .unwrap();
        let observed = run_to_rest(&mut ctrl);
        assert_eq!(
            observed,
            vec![
                Stage::Ingestion,
                Stage::Extraction,
                Stage::Generation,
                Stage::Dispatch,
                Stage::Completed,
            ]
        );
    }

    #[test]
    fn log_stages_never_regress_within_a_run() {
        let mut ctrl = controller();
        ctrl.start(GenerationMode::Visual, &prompt("an alien tree"))
            .unwrap();
        run_to_rest(&mut ctrl);

        let positions: Vec<usize> = ctrl
            .entries()
            .iter()
            .map(|e| e.stage.position().expect("no Error entries in a clean run"))
            .collect();
        assert!(positions.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn completed_run_holds_exactly_one_matching_metadata() {
        let mut ctrl = controller();
        ctrl.start(GenerationMode::Procedural, &prompt("a crate"))
            .unwrap();
        run_to_rest(&mut ctrl);

        let meta = ctrl.metadata().expect("metadata set by extraction");
        assert_eq!(meta.generation_method, GenerationMode::Procedural);
        assert_eq!(meta.name, "SciFi_Crate_01");
        assert_eq!(meta.category, AssetCategory::Prop);
        assert_eq!(ctrl.metrics().active_workers, 0);
    }

    #[test]
    fn empty_input_appends_one_error_entry_and_keeps_stage() {
        let mut ctrl = controller();
        let err = ctrl
            .start(GenerationMode::Procedural, &RunRequest::default())
            .unwrap_err();
        assert_eq!(err, StartError::EmptyInput);
        assert_eq!(ctrl.stage(), Stage::Idle);
        assert_eq!(ctrl.entries().len(), 1);
        assert_eq!(ctrl.entries()[0].severity, Severity::Error);
        assert_eq!(ctrl.metrics().active_workers, 0);
    }

    #[test]
    fn blank_prompt_counts_as_empty() {
        let mut ctrl = controller();
        assert_eq!(
            ctrl.start(GenerationMode::Visual, &prompt("   ")),
            Err(StartError::EmptyInput)
        );
    }

    #[test]
    fn second_start_while_running_has_zero_side_effects() {
        let mut ctrl = controller();
        ctrl.start(GenerationMode::Procedural, &prompt("a crate"))
            .unwrap();
        ctrl.advance();
        assert_eq!(ctrl.stage(), Stage::Extraction);

        let logs_before = ctrl.entries().len();
        let err = ctrl
            .start(GenerationMode::Visual, &prompt("another"))
            .unwrap_err();
        assert_eq!(err, StartError::AlreadyRunning(Stage::Extraction));
        assert_eq!(ctrl.entries().len(), logs_before);
        assert_eq!(ctrl.stage(), Stage::Extraction);
        assert!(ctrl.metadata().is_none());
    }

    #[test]
    fn accepted_start_discards_previous_run_state() {
        let mut ctrl = controller();
        ctrl.start(GenerationMode::Procedural, &prompt("a crate"))
            .unwrap();
        run_to_rest(&mut ctrl);
        assert!(ctrl.metadata().is_some());
        let first_run_len = ctrl.entries().len();
        assert!(first_run_len > 1);

        ctrl.start(GenerationMode::Visual, &prompt("a tree")).unwrap();
        assert!(ctrl.metadata().is_none());
        assert!(ctrl.entries().len() < first_run_len);
        assert!(ctrl.entries().iter().all(|e| e.stage == Stage::Ingestion));
        assert_eq!(ctrl.metrics().active_workers, 1);
    }

    #[test]
    fn attachment_run_logs_one_read_per_file() {
        let mut ctrl = controller();
        let request = RunRequest {
            prompt: String::new(),
            attachments: vec!["a.pdf".into()],
        };
        ctrl.start(GenerationMode::Visual, &request).unwrap();
        run_to_rest(&mut ctrl);

        let reads = ctrl
            .entries()
            .iter()
            .filter(|e| e.message.starts_with("Reading:"))
            .count();
        assert_eq!(reads, 1);
        assert_eq!(ctrl.metadata().unwrap().name, "Alien_Tree_Organic");
    }

    #[test]
    fn dispatch_echoes_the_extracted_asset_name() {
        let mut ctrl = controller();
        ctrl.start(GenerationMode::Procedural, &prompt("a crate"))
            .unwrap();
        run_to_rest(&mut ctrl);
        assert!(ctrl
            .entries()
            .iter()
            .any(|e| e.stage == Stage::Dispatch && e.message.contains("SciFi_Crate_01")));
    }

    #[test]
    fn cancel_moves_to_error_and_allows_restart() {
        let mut ctrl = controller();
        assert!(!ctrl.cancel());

        ctrl.start(GenerationMode::Visual, &prompt("a tree")).unwrap();
        ctrl.advance();
        assert!(ctrl.cancel());
        assert_eq!(ctrl.stage(), Stage::Error);
        assert_eq!(ctrl.metrics().active_workers, 0);
        let last = ctrl.entries().last().unwrap();
        assert_eq!(last.severity, Severity::Warning);

        ctrl.start(GenerationMode::Procedural, &prompt("again"))
            .unwrap();
        assert_eq!(ctrl.stage(), Stage::Ingestion);
    }

    #[test]
    fn dwell_follows_the_configured_stage_table() {
        let cfg = RunConfig::default();
        let mut ctrl = PipelineController::new(cfg.clone());
        assert_eq!(ctrl.current_dwell(), None);

        ctrl.start(GenerationMode::Procedural, &prompt("a crate"))
            .unwrap();
        assert_eq!(ctrl.current_dwell(), Some(cfg.ingestion_dwell));
        assert_eq!(ctrl.advance(), Some(cfg.extraction_dwell));
        assert_eq!(ctrl.advance(), Some(cfg.generation_dwell));
        assert_eq!(ctrl.advance(), Some(cfg.dispatch_dwell));
        assert_eq!(ctrl.advance(), None);
    }

    #[test]
    fn report_snapshots_the_finished_run() {
        let mut ctrl = controller();
        assert!(ctrl.report().is_none());

        ctrl.start(GenerationMode::Visual, &prompt("a tree")).unwrap();
        run_to_rest(&mut ctrl);
        let report = ctrl.report().unwrap();
        assert_eq!(report.mode, GenerationMode::Visual);
        assert_eq!(report.stage, Stage::Completed);
        assert_eq!(report.logs.len(), ctrl.entries().len());
        assert!(report.metadata.is_some());
    }
}
