use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// One phase of the simulated asset-generation pipeline.
///
/// Runs walk the linear order `Idle → Ingestion → Extraction → Generation →
/// Dispatch → Completed`; `Error` is the cancellation branch and can be
/// entered from any non-resting stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    Idle,
    Ingestion,
    Extraction,
    Generation,
    Dispatch,
    Completed,
    Error,
}

/// The linear stage order, used by the visualizer and by ordering checks.
pub const STAGE_SEQUENCE: [Stage; 6] = [
    Stage::Idle,
    Stage::Ingestion,
    Stage::Extraction,
    Stage::Generation,
    Stage::Dispatch,
    Stage::Completed,
];

impl Stage {
    /// A run may only start while the pipeline rests in one of these stages.
    pub fn is_resting(self) -> bool {
        matches!(self, Stage::Idle | Stage::Completed | Stage::Error)
    }

    /// Position within the linear order; `Error` sits outside it.
    pub fn position(self) -> Option<usize> {
        STAGE_SEQUENCE.iter().position(|s| *s == self)
    }

    pub fn label(self) -> &'static str {
        match self {
            Stage::Idle => "Idle",
            Stage::Ingestion => "Ingestion",
            Stage::Extraction => "Extraction",
            Stage::Generation => "Generation",
            Stage::Dispatch => "Dispatch",
            Stage::Completed => "Completed",
            Stage::Error => "Error",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Which simulated generation strategy a run uses. Fixed for the lifetime of
/// the run; selected at start time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GenerationMode {
    /// Code-LLM route: emits script artifacts for technical objects.
    Procedural,
    /// Text-to-3D route: emits mesh/texture artifacts for organic objects.
    Visual,
}

impl fmt::Display for GenerationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationMode::Procedural => f.write_str("Procedural"),
            GenerationMode::Visual => f.write_str("Visual"),
        }
    }
}

/// Log entry classification, used only for presentation filtering/coloring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

/// One immutable line in the run log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// Unique within a run; sequential from 0.
    pub id: u64,
    /// Milliseconds since the log stream epoch; non-decreasing within a run.
    pub timestamp_ms: u64,
    /// The stage that was active when the entry was created.
    pub stage: Stage,
    pub message: String,
    pub severity: Severity,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub const fn splat(v: f64) -> Self {
        Self { x: v, y: v, z: v }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AssetTransform {
    pub position: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssetCategory {
    Prop,
    Structure,
    Character,
    Vehicle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColliderShape {
    Box,
    Sphere,
    Mesh,
    Capsule,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhysicsSpec {
    pub mass: f64,
    pub is_kinematic: bool,
    pub collider: ColliderShape,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialSpec {
    pub color: String,
    pub metallic: f64,
    pub smoothness: f64,
}

/// The metadata record synthesized once per run at the Extraction→Generation
/// boundary. Immutable after creation; cleared when a new run starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetMetadata {
    pub name: String,
    pub category: AssetCategory,
    pub transform: AssetTransform,
    pub physics: PhysicsSpec,
    pub material: MaterialSpec,
    pub generation_method: GenerationMode,
}

/// Caller input for one run: free-text prompt and/or attached file names.
/// Attachment content is never read; only the names are echoed in log text.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunRequest {
    pub prompt: String,
    #[serde(default)]
    pub attachments: Vec<String>,
}

impl RunRequest {
    /// A request is empty when the prompt is blank and nothing is attached.
    pub fn is_empty(&self) -> bool {
        self.prompt.trim().is_empty() && self.attachments.is_empty()
    }
}

/// Point-in-time system gauges, shown as status badges and perturbed by the
/// resource monitor independently of run lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemMetrics {
    pub vram_usage_gb: f64,
    pub vram_total_gb: f64,
    pub queue_connected: bool,
    pub editor_connected: bool,
    pub active_workers: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub vram_total_gb: f64,
    pub queue_connected: bool,
    pub editor_connected: bool,
    #[serde(with = "humantime_serde")]
    pub ingestion_dwell: Duration,
    #[serde(with = "humantime_serde")]
    pub extraction_dwell: Duration,
    #[serde(with = "humantime_serde")]
    pub generation_dwell: Duration,
    #[serde(with = "humantime_serde")]
    pub dispatch_dwell: Duration,
    #[serde(with = "humantime_serde")]
    pub monitor_interval: Duration,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            vram_total_gb: 24.0,
            queue_connected: true,
            editor_connected: true,
            ingestion_dwell: Duration::from_millis(2000),
            extraction_dwell: Duration::from_millis(2500),
            generation_dwell: Duration::from_millis(3000),
            dispatch_dwell: Duration::from_millis(2500),
            monitor_interval: Duration::from_secs(2),
        }
    }
}

/// Final snapshot of one run, printed by `--json` mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    #[serde(default)]
    pub timestamp_utc: String,
    pub mode: GenerationMode,
    pub stage: Stage,
    pub metadata: Option<AssetMetadata>,
    pub logs: Vec<LogEntry>,
}

/// Events streamed from the orchestrator to presentation layers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DashboardEvent {
    StageChanged {
        stage: Stage,
    },
    LogAppended {
        entry: LogEntry,
    },
    MetadataReady {
        // Box to keep DashboardEvent size small.
        metadata: Box<AssetMetadata>,
    },
    MetricsUpdated {
        metrics: SystemMetrics,
    },
    RunCompleted {
        report: Box<RunReport>,
    },
}

/// Why a `start` call was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StartError {
    /// Both the prompt and the attachment list were empty.
    #[error("empty input: enter a prompt or attach a file")]
    EmptyInput,
    /// A run is already in flight; one run at a time.
    #[error("pipeline busy (stage: {0})")]
    AlreadyRunning(Stage),
}
