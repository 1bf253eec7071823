//! Full-screen dataset editor with live validation.

use std::error::Error;
use std::path::{Path, PathBuf};

use ratatui::crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph};
use ratatui::Frame;
use tracing::{info, warn};

use super::dsv_editor::DsvEditor;
use super::terminal::{restore_terminal, setup_terminal, spawn_event_reader};
use super::theme::Theme;
use crate::core::dataset::{validate_dataset, Dataset};

const HELP: &str = "Ctrl+S save · Esc quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Valid { rows: usize, columns: Vec<String> },
    Invalid { code: &'static str, message: &'static str },
}

impl Status {
    pub fn of(dataset: &Dataset) -> Self {
        match validate_dataset(dataset) {
            Ok(()) => Status::Valid {
                rows: dataset.rows.len(),
                columns: dataset.value_columns().to_vec(),
            },
            Err(err) => Status::Invalid {
                code: err.code(),
                message: err.describe(),
            },
        }
    }

    fn line(&self, theme: &Theme) -> Line<'static> {
        match self {
            Status::Valid { rows, columns } => Line::from(Span::styled(
                format!("✓ {rows} rows · objectives: {}", columns.join(", ")),
                theme.text_style,
            )),
            Status::Invalid { code, message } => Line::from(Span::styled(
                format!("✗ {code}: {message}"),
                theme.error_style,
            )),
        }
    }
}

pub enum Action {
    Continue,
    Save,
    Quit,
}

pub struct EditorState {
    pub path: PathBuf,
    pub editor: DsvEditor,
    pub status: Status,
    pub notice: Option<String>,
    pub dirty: bool,
}

impl EditorState {
    pub fn new(path: PathBuf, text: &str) -> Self {
        let editor = DsvEditor::new(text);
        let status = Status::of(editor.dataset());
        Self {
            path,
            editor,
            status,
            notice: None,
            dirty: false,
        }
    }

    pub fn handle_event(&mut self, event: Event) -> Action {
        let changed = match event {
            Event::Key(KeyEvent {
                kind: KeyEventKind::Release,
                ..
            }) => false,
            Event::Key(key) => match (key.code, key.modifiers) {
                (KeyCode::Esc, _) => return Action::Quit,
                (KeyCode::Char('c') | KeyCode::Char('q'), KeyModifiers::CONTROL) => {
                    return Action::Quit
                }
                (KeyCode::Char('s'), KeyModifiers::CONTROL) => return Action::Save,
                _ => self.editor.input(key),
            },
            Event::Paste(text) => self.editor.paste(&text),
            _ => false,
        };

        if changed {
            self.status = Status::of(self.editor.dataset());
            self.dirty = true;
            self.notice = None;
        }
        Action::Continue
    }

    fn render(&mut self, frame: &mut Frame, theme: &Theme) {
        frame.render_widget(
            Block::default().style(Style::default().bg(theme.background_color)),
            frame.area(),
        );
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(3),
                Constraint::Length(1),
                Constraint::Length(1),
            ])
            .split(frame.area());

        let title = format!(
            "{}{}",
            self.path.display(),
            if self.dirty { " *" } else { "" }
        );
        self.editor.render(frame, chunks[0], theme, &title);

        frame.render_widget(Paragraph::new(self.status.line(theme)), chunks[1]);
        let footer = match &self.notice {
            Some(notice) => Line::from(Span::styled(notice.clone(), theme.notice_style)),
            None => Line::from(Span::styled(HELP, theme.title_style)),
        };
        frame.render_widget(Paragraph::new(footer), chunks[2]);
    }
}

async fn load_text(path: &Path) -> Result<String, Box<dyn Error>> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => Ok(text),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
        Err(err) => Err(err.into()),
    }
}

pub async fn run_editor(path: &Path, theme_name: &str) -> Result<(), Box<dyn Error>> {
    let text = load_text(path).await?;
    let theme = Theme::from_name(theme_name);
    let mut state = EditorState::new(path.to_path_buf(), &text);

    let mut terminal = setup_terminal()?;
    let (mut events, reader) = spawn_event_reader();

    let result: Result<(), Box<dyn Error>> = async {
        loop {
            terminal.draw(|frame| state.render(frame, &theme))?;
            let Some(event) = events.recv().await else {
                return Ok(());
            };
            match state.handle_event(event) {
                Action::Continue => {}
                Action::Quit => return Ok(()),
                Action::Save => match tokio::fs::write(&state.path, state.editor.text()).await {
                    Ok(()) => {
                        info!(path = %state.path.display(), "dataset saved");
                        state.dirty = false;
                        state.notice = Some("Saved".to_string());
                    }
                    Err(err) => {
                        warn!(path = %state.path.display(), error = %err, "dataset save failed");
                        state.notice = Some(format!("Save failed: {err}"));
                    }
                },
            }
        }
    }
    .await;

    drop(events);
    reader.abort();
    restore_terminal(&mut terminal)?;
    result
}
