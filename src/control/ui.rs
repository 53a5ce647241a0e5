use std::error::Error;
use std::io::stdout;
use std::time::{Duration, Instant};

use crossterm::ExecutableCommand;
use crossterm::event::{self, Event as CEvent, KeyCode, KeyEvent};
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Frame;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table};

use crate::control::api;
use crate::{Clip, Engine, EngineStatus, Voice};

const TICK_RATE: Duration = Duration::from_millis(100);

/// A voice with a clip the console can trigger.
pub struct ConsoleVoice {
    /// Label shown in the voice table.
    pub label: String,
    /// The voice handle.
    pub voice: Voice,
    /// Clip replayed when the voice is triggered.
    pub clip: Clip,
}

struct AppState {
    status: Option<EngineStatus>,
    message: Option<String>,
    last_update: Option<Instant>,
}

/// Run the ratatui-based developer console over a running engine.
///
/// Number keys replay the matching console voice, `s` stops every voice,
/// `q` or `Esc` quits.
pub fn run(engine: &Engine, voices: &[ConsoleVoice]) -> Result<(), Box<dyn Error>> {
    setup_terminal()?;

    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    terminal.clear()?;

    let mut app = AppState {
        status: None,
        message: None,
        last_update: None,
    };

    loop {
        if app
            .last_update
            .map_or(true, |at| at.elapsed() >= TICK_RATE)
        {
            app.status = Some(api::status(engine));
            app.last_update = Some(Instant::now());
        }

        terminal.draw(|frame| draw(frame, &app, voices))?;

        if event::poll(Duration::from_millis(10))? {
            if let CEvent::Key(key) = event::read()? {
                if handle_key(&mut app, voices, key) {
                    break;
                }
            }
        }
    }

    restore_terminal()?;
    Ok(())
}

fn setup_terminal() -> Result<(), Box<dyn Error>> {
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    Ok(())
}

fn restore_terminal() -> Result<(), Box<dyn Error>> {
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;
    Ok(())
}

fn handle_key(app: &mut AppState, voices: &[ConsoleVoice], key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => return true,
        KeyCode::Char('s') => {
            for entry in voices {
                entry.voice.stop();
            }
            app.message = Some("stopped all voices".into());
        }
        KeyCode::Char(c) => {
            if let Some(digit) = c.to_digit(10) {
                let index = (digit as usize).wrapping_sub(1);
                if let Some(entry) = voices.get(index) {
                    entry.voice.play(&entry.clip);
                    app.message = Some(format!("triggered {}", entry.label));
                }
            }
        }
        _ => {}
    }
    false
}

fn draw(frame: &mut Frame, app: &AppState, voices: &[ConsoleVoice]) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(7),
            Constraint::Min(4),
            Constraint::Length(3),
        ])
        .split(frame.size());

    draw_summary(frame, app, chunks[0]);
    draw_voices(frame, app, voices, chunks[1]);
    draw_footer(frame, app, chunks[2]);
}

fn draw_summary(frame: &mut Frame, app: &AppState, area: ratatui::layout::Rect) {
    let lines = match &app.status {
        Some(status) => vec![
            Line::from(format!("Sample Rate : {} Hz", status.sample_rate)),
            Line::from(format!("Output Rate : {} Hz", status.output_rate)),
            Line::from(format!(
                "Block       : {} frames ({:.2} ms), {} lanes",
                status.block_frames, status.block_ms, status.output_lanes
            )),
            Line::from(format!("Blocks Sent : {}", status.blocks_written)),
            Line::from(format!(
                "Voices      : {} registered, {} active",
                status.voices.len(),
                status.voices.iter().filter(|v| v.active).count()
            )),
        ],
        None => vec![Line::from("waiting for engine status...")],
    };

    let paragraph = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(Span::styled(
                " engine ",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            )),
    );
    frame.render_widget(paragraph, area);
}

fn draw_voices(
    frame: &mut Frame,
    app: &AppState,
    voices: &[ConsoleVoice],
    area: ratatui::layout::Rect,
) {
    let sample_rate = app.status.as_ref().map_or(0, |s| s.sample_rate);
    let header = Row::new(vec!["Key", "Label", "State", "Remaining"]).style(
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
    );

    let rows: Vec<Row> = voices
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            let row_status = app
                .status
                .as_ref()
                .and_then(|s| s.voices.iter().find(|v| v.id == entry.voice.id()));
            let (state, remaining_ms) = match row_status {
                Some(v) if v.active => {
                    let ms = if sample_rate == 0 {
                        0.0
                    } else {
                        v.remaining as f32 / sample_rate as f32 * 1_000.0
                    };
                    ("playing", ms)
                }
                Some(_) => ("idle", 0.0),
                None => ("gone", 0.0),
            };
            Row::new(vec![
                Cell::from(format!("{}", index + 1)),
                Cell::from(entry.label.clone()),
                Cell::from(state),
                Cell::from(format!("{remaining_ms:.0} ms")),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(5),
            Constraint::Min(16),
            Constraint::Length(9),
            Constraint::Length(12),
        ],
    )
    .header(header)
    .block(Block::default().borders(Borders::ALL).title(" voices "));
    frame.render_widget(table, area);
}

fn draw_footer(frame: &mut Frame, app: &AppState, area: ratatui::layout::Rect) {
    let help = match &app.message {
        Some(message) => format!("1-9 trigger | s stop all | q quit — {message}"),
        None => "1-9 trigger | s stop all | q quit".to_string(),
    };
    let paragraph =
        Paragraph::new(Line::from(help)).block(Block::default().borders(Borders::ALL));
    frame.render_widget(paragraph, area);
}
