use crate::model::{
    AssetMetadata, DashboardEvent, GenerationMode, LogEntry, Stage, SystemMetrics,
};

/// UI-thread-owned view state; updated only by draining dashboard events.
pub(crate) struct UiState {
    pub stage: Stage,
    pub selected_mode: GenerationMode,
    pub info: String,
    pub logs: Vec<LogEntry>,
    pub metadata: Option<AssetMetadata>,
    pub metrics: SystemMetrics,
    pub runs_completed: u64,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            stage: Stage::Idle,
            selected_mode: GenerationMode::Procedural,
            info: String::new(),
            logs: Vec::new(),
            metadata: None,
            metrics: SystemMetrics {
                vram_usage_gb: crate::monitor::VRAM_USAGE_START_GB,
                vram_total_gb: 24.0,
                queue_connected: true,
                editor_connected: true,
                active_workers: 0,
            },
            runs_completed: 0,
        }
    }
}

impl UiState {
    fn push_log(&mut self, entry: LogEntry) {
        const MAX: usize = 500;
        self.logs.push(entry);
        if self.logs.len() > MAX {
            let _ = self.logs.drain(0..(self.logs.len() - MAX));
        }
    }

    pub fn apply_event(&mut self, ev: DashboardEvent) {
        match ev {
            DashboardEvent::StageChanged { stage } => {
                // An accepted start resets the stream; mirror it in the view.
                if stage == Stage::Ingestion {
                    self.logs.clear();
                    self.metadata = None;
                }
                self.stage = stage;
            }
            DashboardEvent::LogAppended { entry } => self.push_log(entry),
            DashboardEvent::MetadataReady { metadata } => self.metadata = Some(*metadata),
            DashboardEvent::MetricsUpdated { metrics } => self.metrics = metrics,
            DashboardEvent::RunCompleted { .. } => {
                self.runs_completed += 1;
                self.info = "Run completed".into();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Severity;

    fn entry(id: u64, stage: Stage) -> LogEntry {
        LogEntry {
            id,
            timestamp_ms: id,
            stage,
            message: format!("line {id}"),
            severity: Severity::Info,
        }
    }

    #[test]
    fn accepted_start_clears_the_view() {
        let mut state = UiState::default();
        state.apply_event(DashboardEvent::LogAppended {
            entry: entry(0, Stage::Idle),
        });
        state.apply_event(DashboardEvent::MetadataReady {
            metadata: Box::new(crate::engine::extract(GenerationMode::Visual)),
        });

        state.apply_event(DashboardEvent::StageChanged {
            stage: Stage::Ingestion,
        });
        assert!(state.logs.is_empty());
        assert!(state.metadata.is_none());
        assert_eq!(state.stage, Stage::Ingestion);
    }

    #[test]
    fn log_buffer_is_capped() {
        let mut state = UiState::default();
        for i in 0..600 {
            state.apply_event(DashboardEvent::LogAppended {
                entry: entry(i, Stage::Extraction),
            });
        }
        assert_eq!(state.logs.len(), 500);
        assert_eq!(state.logs[0].id, 100);
    }
}
