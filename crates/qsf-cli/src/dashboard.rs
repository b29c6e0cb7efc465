//! The live status dashboard: the same snapshot the one-shot renderer
//! uses, refreshed every second in an alternate-screen TUI. `q` or Esc
//! quits.

use std::io;
use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Row, Table};
use ratatui::Terminal;

use crate::snapshot::{self, FactorySnapshot};

const REFRESH: Duration = Duration::from_secs(1);

pub async fn run(root: &Path) -> Result<()> {
    enable_raw_mode()?;
    io::stdout().execute(EnterAlternateScreen)?;
    let backend = ratatui::backend::CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)?;

    let result = event_loop(&mut terminal, root);

    disable_raw_mode()?;
    io::stdout().execute(LeaveAlternateScreen)?;
    result
}

fn event_loop(
    terminal: &mut Terminal<ratatui::backend::CrosstermBackend<io::Stdout>>,
    root: &Path,
) -> Result<()> {
    let mut last_refresh = Instant::now() - REFRESH;
    let mut snap: Option<FactorySnapshot> = None;
    let mut error: Option<String> = None;

    loop {
        if last_refresh.elapsed() >= REFRESH {
            match snapshot::capture(root) {
                Ok(s) => {
                    snap = Some(s);
                    error = None;
                }
                Err(e) => error = Some(format!("{e:#}")),
            }
            last_refresh = Instant::now();
        }

        terminal.draw(|frame| draw(frame, snap.as_ref(), error.as_deref()))?;

        if event::poll(Duration::from_millis(200))? {
            if let Event::Key(key) = event::read()? {
                if matches!(key.code, KeyCode::Char('q') | KeyCode::Esc) {
                    return Ok(());
                }
            }
        }
    }
}

fn draw(frame: &mut ratatui::Frame<'_>, snap: Option<&FactorySnapshot>, error: Option<&str>) {
    let areas = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(6),
            Constraint::Length(8),
            Constraint::Length(1),
        ])
        .split(frame.area());

    let header_text = match (snap, error) {
        (_, Some(e)) => Line::from(Span::styled(e, Style::default().fg(Color::Red))),
        (Some(s), None) => Line::from(vec![
            Span::styled(
                format!(" {} ", s.active_profile),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw(format!("({})  ", s.mode)),
            if s.session_active {
                Span::styled("SWARM ACTIVE", Style::default().fg(Color::Green))
            } else {
                Span::styled("swarm inactive", Style::default().fg(Color::DarkGray))
            },
            Span::raw(format!(
                "  cfg {}  est ${:.2}",
                &s.config_hash[..12.min(s.config_hash.len())],
                s.lifetime_cost_usd
            )),
        ]),
        (None, None) => Line::from("loading..."),
    };
    frame.render_widget(
        Paragraph::new(header_text).block(Block::default().borders(Borders::ALL).title("qsf")),
        areas[0],
    );

    if let Some(s) = snap {
        let worker_rows: Vec<Row> = s
            .workers
            .iter()
            .map(|w| {
                let health_style = match w.health.as_str() {
                    "running" => Style::default().fg(Color::Green),
                    "quiet" => Style::default().fg(Color::Yellow),
                    "stale" => Style::default().fg(Color::Red),
                    _ => Style::default().fg(Color::DarkGray),
                };
                Row::new(vec![
                    format!("{}", w.pane),
                    w.role.clone(),
                    w.health.clone(),
                    format!("{}", w.tasks_completed),
                    format!("{}", w.consecutive_failures),
                    w.last_error_kind.clone().unwrap_or_default(),
                ])
                .style(health_style)
            })
            .collect();
        let workers = Table::new(
            worker_rows,
            [
                Constraint::Length(4),
                Constraint::Length(12),
                Constraint::Length(8),
                Constraint::Length(6),
                Constraint::Length(6),
                Constraint::Min(10),
            ],
        )
        .header(
            Row::new(["pane", "role", "health", "tasks", "fails", "last error"])
                .style(Style::default().add_modifier(Modifier::BOLD)),
        )
        .block(Block::default().borders(Borders::ALL).title("workers"));
        frame.render_widget(workers, areas[1]);

        let mut lines: Vec<Line> = s
            .queues
            .iter()
            .map(|q| {
                Line::from(format!(
                    "{:<12} {:>4} pending  {:>3} in progress",
                    q.name, q.pending, q.in_progress
                ))
            })
            .collect();
        lines.push(Line::from(format!(
            "{:<12} {:>4} completed {:>4} failed",
            "archive", s.archived_completed, s.archived_failed
        )));
        lines.push(Line::from(
            s.buckets
                .iter()
                .map(|b| format!("{}: {}", b.name, b.count))
                .collect::<Vec<_>>()
                .join("   "),
        ));
        frame.render_widget(
            Paragraph::new(lines)
                .block(Block::default().borders(Borders::ALL).title("queues / buckets")),
            areas[2],
        );
    }

    frame.render_widget(
        Paragraph::new(Line::from(Span::styled(
            " q to quit",
            Style::default().fg(Color::DarkGray),
        ))),
        areas[3],
    );
}
