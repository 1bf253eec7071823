//! Plays a typewriter reveal of a markdown document in the terminal.

use std::error::Error;

use ratatui::crossterm::event::{Event, KeyCode, KeyEventKind};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::Frame;
use tracing::debug;

use super::markdown::{rich_nodes, segment, tree_lines, tree_lines_fading};
use super::terminal::{restore_terminal, setup_terminal, spawn_event_reader};
use super::theme::Theme;
use super::typewriter::{
    BlockTypewriter, ReadReceipt, Reveal, RevealFrame, TreeTypewriter, TypewriterOptions,
    TypewriterService,
};
use crate::core::config::TypewriterSettings;

/// Glyphs at the tip of a tree reveal that are still drawn dimmed.
const FADE_GLYPHS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum RevealMode {
    /// Reveal the markdown source block by block, re-rendering as it grows
    Blocks,
    /// Reveal the rendered document glyph by glyph
    Tree,
}

pub fn build_reveal(
    markdown: &str,
    mode: RevealMode,
    settings: &TypewriterSettings,
) -> Box<dyn Reveal> {
    match mode {
        RevealMode::Blocks => Box::new(BlockTypewriter::new(
            segment(markdown),
            TypewriterOptions::block_from(settings),
        )),
        RevealMode::Tree => Box::new(TreeTypewriter::new(
            rich_nodes(markdown),
            TypewriterOptions::tree_from(settings),
        )),
    }
}

/// Lines for one frame, with the cursor appended to the last line.
pub fn frame_lines(frame: &RevealFrame, theme: &Theme) -> Vec<Line<'static>> {
    let (mut lines, cursor) = match frame {
        RevealFrame::Text { text, cursor } => (tree_lines(&rich_nodes(text), theme), cursor),
        RevealFrame::Tree {
            nodes,
            revealed,
            cursor,
        } => (
            tree_lines_fading(nodes, theme, Some(revealed.saturating_sub(FADE_GLYPHS))),
            cursor,
        ),
        RevealFrame::Done => return Vec::new(),
    };

    if !cursor.is_empty() {
        let span = Span::styled(cursor.clone(), theme.cursor_style);
        match lines.last_mut() {
            Some(line) => line.spans.push(span),
            None => lines.push(Line::from(span)),
        }
    }
    lines
}

/// Rows `lines` take up once wrapped to `width` columns.
fn wrapped_height(lines: &[Line<'_>], width: u16) -> usize {
    let width = usize::from(width.max(1));
    lines
        .iter()
        .map(|line| line.width().max(1).div_ceil(width))
        .sum()
}

#[derive(Default)]
pub struct RevealState {
    current: u64,
    lines: Vec<Line<'static>>,
    done: bool,
}

impl RevealState {
    pub fn restart(&mut self, reveal_id: u64) {
        self.current = reveal_id;
        self.lines.clear();
        self.done = false;
    }

    /// Apply a frame from the service; frames of superseded reveals are
    /// dropped.
    pub fn apply(&mut self, frame: RevealFrame, reveal_id: u64, theme: &Theme) -> bool {
        if reveal_id != self.current {
            return false;
        }
        match frame {
            RevealFrame::Done => self.done = true,
            frame => self.lines = frame_lines(&frame, theme),
        }
        true
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    fn render(&self, frame: &mut Frame, theme: &Theme, title: &str) {
        frame.render_widget(
            Block::default().style(Style::default().bg(theme.background_color)),
            frame.area(),
        );
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(3), Constraint::Length(1)])
            .split(frame.area());

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(theme.border_style)
            .title(Span::styled(title.to_string(), theme.title_style));
        let inner: Rect = block.inner(chunks[0]);
        let height = wrapped_height(&self.lines, inner.width);
        let top = height.saturating_sub(usize::from(inner.height));
        let top = u16::try_from(top).unwrap_or(u16::MAX);

        let body = Paragraph::new(self.lines.clone())
            .style(theme.text_style)
            .block(block)
            .wrap(Wrap { trim: false })
            .scroll((top, 0));
        frame.render_widget(body, chunks[0]);

        let status = if self.done {
            "done · r replay · q quit"
        } else {
            "revealing · q quit"
        };
        frame.render_widget(
            Paragraph::new(Line::from(Span::styled(status, theme.title_style))),
            chunks[1],
        );
    }
}

pub async fn run_reveal(
    markdown: &str,
    mode: RevealMode,
    settings: &TypewriterSettings,
    receipt: Option<ReadReceipt>,
    theme_name: &str,
) -> Result<(), Box<dyn Error>> {
    let theme = Theme::from_name(theme_name);
    let title = match mode {
        RevealMode::Blocks => "Reveal (blocks)",
        RevealMode::Tree => "Reveal (tree)",
    };

    let (mut service, mut frames) = TypewriterService::new();
    let mut state = RevealState::default();
    state.restart(service.start(build_reveal(markdown, mode, settings), receipt));

    let mut terminal = setup_terminal()?;
    let (mut events, reader) = spawn_event_reader();

    let result: Result<(), Box<dyn Error>> = async {
        loop {
            terminal.draw(|frame| state.render(frame, &theme, title))?;
            tokio::select! {
                Some((frame, reveal_id)) = frames.recv() => {
                    state.apply(frame, reveal_id, &theme);
                }
                event = events.recv() => {
                    let key = match event {
                        None => return Ok(()),
                        Some(Event::Key(key)) if key.kind == KeyEventKind::Press => key,
                        Some(_) => continue,
                    };
                    match key.code {
                        KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                        KeyCode::Char('r') => {
                            debug!("replaying reveal");
                            // the receipt went out with the first run
                            let id = service.start(build_reveal(markdown, mode, settings), None);
                            state.restart(id);
                        }
                        _ => {}
                    }
                }
            }
        }
    }
    .await;

    service.cancel();
    drop(events);
    reader.abort();
    restore_terminal(&mut terminal)?;
    result
}
