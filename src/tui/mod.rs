mod state;

use crate::cli::Cli;
use crate::model::{DashboardEvent, Severity, Stage, STAGE_SEQUENCE};
use crate::orchestrator::{self, UiCommand};
use crate::status::{link_status, vram_status, ServiceStatus};
use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Terminal,
};
use state::UiState;
use std::{io, time::Duration, time::Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

pub async fn run(args: Cli) -> Result<()> {
    // Unbounded channels avoid backpressure and task switching in the hot path.
    let (event_tx, event_rx) = mpsc::unbounded_channel::<DashboardEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    let cfg = crate::cli::build_config(&args);

    // TUI runs in a dedicated thread to keep all blocking I/O out of the Tokio runtime.
    let ui_args = args.clone();
    let ui_handle = std::thread::spawn(move || run_threaded(ui_args, event_rx, cmd_tx));

    let res = orchestrator::run_controller(cfg, event_tx, cmd_rx).await;

    let join_res = tokio::task::spawn_blocking(move || ui_handle.join()).await;
    if let Ok(joined) = join_res {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(anyhow::anyhow!("TUI thread panicked")),
        }
    }

    res
}

/// Run the TUI loop on a dedicated thread.
fn run_threaded(
    args: Cli,
    mut event_rx: UnboundedReceiver<DashboardEvent>,
    cmd_tx: UnboundedSender<UiCommand>,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    // UiState is owned by the UI thread only; no cross-thread mutation.
    let mut state = UiState {
        selected_mode: args.mode.into(),
        ..Default::default()
    };

    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();

    let res = loop {
        // Drain events without blocking to keep UI responsive.
        while let Ok(ev) = event_rx.try_recv() {
            state.apply_event(ev);
        }

        if last_tick.elapsed() >= tick_rate {
            terminal.draw(|f| draw(f.area(), f, &state)).ok();
            last_tick = Instant::now();
        }

        // Poll input with a short timeout to avoid blocking the render loop.
        if event::poll(Duration::from_millis(10)).unwrap_or(false) {
            if let Ok(Event::Key(k)) = event::read() {
                if k.kind != KeyEventKind::Press {
                    continue;
                }
                match (k.modifiers, k.code) {
                    (_, KeyCode::Char('q')) | (KeyModifiers::CONTROL, KeyCode::Char('c')) => {
                        let _ = cmd_tx.send(UiCommand::Quit);
                        break Ok(());
                    }
                    (_, KeyCode::Char('p')) => {
                        state.selected_mode = crate::model::GenerationMode::Procedural;
                        state.info = "Starting procedural run…".into();
                        let _ = cmd_tx.send(UiCommand::Start {
                            mode: state.selected_mode,
                            request: crate::cli::build_request(&args),
                        });
                    }
                    (_, KeyCode::Char('v')) => {
                        state.selected_mode = crate::model::GenerationMode::Visual;
                        state.info = "Starting visual run…".into();
                        let _ = cmd_tx.send(UiCommand::Start {
                            mode: state.selected_mode,
                            request: crate::cli::build_request(&args),
                        });
                    }
                    (_, KeyCode::Char('c')) => {
                        state.info = "Cancelling…".into();
                        let _ = cmd_tx.send(UiCommand::Cancel);
                    }
                    (_, KeyCode::Char('r')) => {
                        let _ = cmd_tx.send(UiCommand::ToggleQueueLink);
                    }
                    (_, KeyCode::Char('u')) => {
                        let _ = cmd_tx.send(UiCommand::ToggleEditorLink);
                    }
                    (_, KeyCode::Char('+') | KeyCode::Char('=')) => {
                        let total = (state.metrics.vram_total_gb + 4.0).min(48.0);
                        let _ = cmd_tx.send(UiCommand::SetVramTotal(total));
                    }
                    (_, KeyCode::Char('-')) => {
                        let total = (state.metrics.vram_total_gb - 4.0).max(8.0);
                        let _ = cmd_tx.send(UiCommand::SetVramTotal(total));
                    }
                    _ => {}
                }
            }
        }
    };

    disable_raw_mode().ok();
    execute!(terminal.backend_mut(), LeaveAlternateScreen).ok();
    terminal.show_cursor().ok();

    res
}

fn status_color(status: ServiceStatus) -> Color {
    match status {
        ServiceStatus::Online => Color::Green,
        ServiceStatus::Busy => Color::Yellow,
        ServiceStatus::Offline => Color::Red,
    }
}

fn severity_color(severity: Severity) -> Color {
    match severity {
        Severity::Info => Color::Gray,
        Severity::Success => Color::Green,
        Severity::Warning => Color::Yellow,
        Severity::Error => Color::Red,
    }
}

fn badge(label: &str, status: ServiceStatus, value: Option<String>) -> Vec<Span<'static>> {
    let mut spans = vec![
        Span::styled(format!(" {label} "), Style::default().fg(Color::DarkGray)),
        Span::styled(
            format!("[{}]", status.label()),
            Style::default().fg(status_color(status)),
        ),
    ];
    if let Some(v) = value {
        spans.push(Span::raw(format!(" {v}")));
    }
    spans
}

fn draw(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(3),
        ])
        .split(area);

    draw_header(rows[0], f, state);

    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(22),
            Constraint::Min(30),
            Constraint::Length(42),
        ])
        .split(rows[1]);

    draw_stage_rail(cols[0], f, state);
    draw_terminal(cols[1], f, state);
    draw_metadata(cols[2], f, state);

    draw_footer(rows[2], f, state);
}

fn draw_header(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let m = &state.metrics;
    let mut spans = badge(
        "GPU VRAM",
        vram_status(m.vram_usage_gb, m.vram_total_gb),
        Some(format!("{:.1} / {:.0} GB", m.vram_usage_gb, m.vram_total_gb)),
    );
    spans.extend(badge("Task Queue", link_status(m.queue_connected), None));
    spans.extend(badge("Editor Bridge", link_status(m.editor_connected), None));
    spans.push(Span::styled(
        format!("  workers: {}", m.active_workers),
        Style::default().fg(Color::DarkGray),
    ));

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" asset-forge ");
    f.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}

fn draw_stage_rail(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let current = state.stage.position();
    let mut lines: Vec<Line> = Vec::new();
    for stage in STAGE_SEQUENCE.iter().skip(1) {
        let pos = stage.position().unwrap_or(usize::MAX);
        let (marker, style) = match current {
            Some(cur) if pos < cur => ("✔", Style::default().fg(Color::Green)),
            Some(cur) if pos == cur => (
                "▶",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
            _ => ("·", Style::default().fg(Color::DarkGray)),
        };
        lines.push(Line::from(Span::styled(
            format!(" {marker} {}", stage.label()),
            style,
        )));
    }
    if state.stage == Stage::Error {
        lines.push(Line::from(Span::styled(
            " ✖ Error",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )));
    }

    let title = if state.stage.is_resting() {
        " Pipeline ".to_string()
    } else {
        format!(" Pipeline · {} ", state.selected_mode)
    };
    let block = Block::default().borders(Borders::ALL).title(title);
    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn draw_terminal(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let visible = area.height.saturating_sub(2) as usize;
    let skip = state.logs.len().saturating_sub(visible);
    let lines: Vec<Line> = state.logs[skip..]
        .iter()
        .map(|e| {
            Line::from(vec![
                Span::styled(
                    format!("{:>7.2}s ", e.timestamp_ms as f64 / 1000.0),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::styled(e.message.clone(), Style::default().fg(severity_color(e.severity))),
            ])
        })
        .collect();

    let block = Block::default().borders(Borders::ALL).title(" Process Log ");
    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn draw_metadata(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let lines: Vec<Line> = match &state.metadata {
        Some(meta) => serde_json::to_string_pretty(meta)
            .unwrap_or_else(|_| "<unserializable>".into())
            .lines()
            .map(|l| Line::from(Span::raw(l.to_string())))
            .collect(),
        None => vec![
            Line::from(Span::styled(
                "No metadata extracted yet.",
                Style::default().fg(Color::DarkGray),
            )),
            Line::from(Span::styled(
                "Waiting for the extraction stage…",
                Style::default().fg(Color::DarkGray),
            )),
        ],
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Extracted Metadata ");
    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn draw_footer(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let mut spans = vec![Span::styled(
        " p procedural · v visual · c cancel · r queue · u editor · +/- vram · q quit ",
        Style::default().fg(Color::DarkGray),
    )];
    if !state.info.is_empty() {
        spans.push(Span::styled(
            format!("│ {}", state.info),
            Style::default().fg(Color::Cyan),
        ));
    }
    if state.runs_completed > 0 {
        spans.push(Span::styled(
            format!(" ({} run(s) completed)", state.runs_completed),
            Style::default().fg(Color::DarkGray),
        ));
    }
    let block = Block::default().borders(Borders::ALL);
    f.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}
