//! Stage table: per-stage dwell times and the fixed log scripts each stage
//! emits. All simulated-work copy lives here; the state machine in `mod.rs`
//! only sequences it.

use crate::model::{GenerationMode, RunConfig, RunRequest, Severity, Stage};
use std::time::Duration;

/// Prompt previews in the log are cut at this many characters.
const PREVIEW_CHARS: usize = 40;

type Script = Vec<(String, Severity)>;

/// How long the given stage's simulated work takes before the next
/// transition. Resting stages have no dwell.
pub(crate) fn dwell(stage: Stage, cfg: &RunConfig) -> Option<Duration> {
    match stage {
        Stage::Ingestion => Some(cfg.ingestion_dwell),
        Stage::Extraction => Some(cfg.extraction_dwell),
        Stage::Generation => Some(cfg.generation_dwell),
        Stage::Dispatch => Some(cfg.dispatch_dwell),
        Stage::Idle | Stage::Completed | Stage::Error => None,
    }
}

/// Entries announcing an accepted run: mode banner, one line per attachment
/// plus a count, and a truncated prompt preview when free text is present.
pub(crate) fn acceptance_script(mode: GenerationMode, request: &RunRequest) -> Script {
    let mut out: Script = vec![(
        format!("Pipeline started for mode: {mode}."),
        Severity::Success,
    )];

    if !request.attachments.is_empty() {
        out.push((
            format!(
                "Ingesting {} attached file(s)...",
                request.attachments.len()
            ),
            Severity::Info,
        ));
        for name in &request.attachments {
            out.push((format!("Reading: {name}"), Severity::Info));
        }
    }

    if !request.prompt.trim().is_empty() {
        out.push(("Ingesting user prompt...".into(), Severity::Info));
        out.push((
            format!("Content: \"{}\"", preview(&request.prompt)),
            Severity::Info,
        ));
    }

    out
}

fn preview(prompt: &str) -> String {
    let mut head: String = prompt.chars().take(PREVIEW_CHARS).collect();
    if prompt.chars().count() > PREVIEW_CHARS {
        head.push_str("...");
    }
    head
}

pub(crate) fn ingestion_script() -> Script {
    vec![
        ("'unstructured' parser library online.".into(), Severity::Info),
        (
            "Cleaning data & running semantic parsing.".into(),
            Severity::Info,
        ),
    ]
}

/// `vram_usage_gb` is the point-in-time gauge reading; the simulated model
/// load reports a spike above it.
pub(crate) fn extraction_script(vram_usage_gb: f64) -> Script {
    vec![
        (
            "Loading Llama 3 8B context (local vLLM)...".into(),
            Severity::Warning,
        ),
        (
            format!("VRAM spike detected: {:.1} GB", vram_usage_gb + 4.0),
            Severity::Warning,
        ),
        (
            "Named-entity extraction (NER) in progress...".into(),
            Severity::Info,
        ),
        (
            "Validating 'AssetMetadata' schema...".into(),
            Severity::Info,
        ),
        ("JSON metadata generated.".into(), Severity::Success),
    ]
}

/// The only branch point in the linear order: procedural runs report code
/// artifacts, visual runs report mesh/texture artifacts.
pub(crate) fn generation_script(mode: GenerationMode) -> Script {
    match mode {
        GenerationMode::Procedural => vec![
            (
                "Procedural mode selected (technical objects).".into(),
                Severity::Info,
            ),
            ("Calling Qwen 2.5 Coder...".into(), Severity::Info),
            (
                "Generating script 'RuntimeSpawner.cs'...".into(),
                Severity::Info,
            ),
            ("Script syntax check OK.".into(), Severity::Success),
        ],
        GenerationMode::Visual => vec![
            (
                "Visual mode selected (organic objects).".into(),
                Severity::Info,
            ),
            ("Calling TripoSR text-to-3D...".into(), Severity::Info),
            (
                "Generating .GLB mesh (worker 4)...".into(),
                Severity::Info,
            ),
            ("Texture baking finished.".into(), Severity::Success),
        ],
    }
}

pub(crate) fn dispatch_script(asset_name: &str) -> Script {
    vec![
        (
            "Connecting dispatch client -> editor bridge.".into(),
            Severity::Warning,
        ),
        (
            format!("Sending command: call_tool(\"SpawnAsset\", {{ name: \"{asset_name}\" }})"),
            Severity::Info,
        ),
        ("Editor acknowledged receipt.".into(), Severity::Success),
        (
            "Object instantiated in the active scene.".into(),
            Severity::Success,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_truncates_long_prompts() {
        let long = "x".repeat(60);
        let p = preview(&long);
        assert_eq!(p.chars().count(), PREVIEW_CHARS + 3);
        assert!(p.ends_with("..."));

        assert_eq!(preview("a crate"), "a crate");
    }

    #[test]
    fn acceptance_script_lists_each_attachment_once() {
        let request = RunRequest {
            prompt: String::new(),
            attachments: vec!["a.pdf".into(), "b.xml".into()],
        };
        let script = acceptance_script(GenerationMode::Visual, &request);
        let reads = script
            .iter()
            .filter(|(m, _)| m.starts_with("Reading:"))
            .count();
        assert_eq!(reads, 2);
        assert!(script[1].0.contains("2 attached file(s)"));
    }

    #[test]
    fn generation_script_branches_on_mode() {
        let code = generation_script(GenerationMode::Procedural);
        let mesh = generation_script(GenerationMode::Visual);
        assert!(code.iter().any(|(m, _)| m.contains("RuntimeSpawner.cs")));
        assert!(mesh.iter().any(|(m, _)| m.contains(".GLB")));
        assert_eq!(code.len(), mesh.len());
    }
}
