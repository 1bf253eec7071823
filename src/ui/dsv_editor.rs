//! Dataset editor: a `tui-textarea` holds the editable text, and a
//! colorized overlay of the parsed records is drawn in its place.

use std::borrow::Cow;

use crate::core::dataset::{parse, quote_cell, Dataset};
use crate::ui::theme::Theme;
use ratatui::layout::Rect;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;
use tui_textarea::{CursorMove, Input, TextArea};

/// Records drawn with their cells quoted back the way they are written,
/// headers first. A quoted cell holding line breaks continues on the next
/// lines so rows stay level with the text area. Cells alternate styles and
/// each delimiter takes the style of the cell before it.
pub fn highlight_lines(dataset: &Dataset, theme: &Theme) -> Vec<Line<'static>> {
    let delimiter = match dataset.delimiter {
        '\t' => "\\t".to_string(),
        other => other.to_string(),
    };
    let has_headers = !dataset.headers.is_empty();
    let records = has_headers
        .then_some(&dataset.headers)
        .into_iter()
        .chain(dataset.rows.iter());

    let mut lines = Vec::new();
    for (i, record) in records.enumerate() {
        let cells: Vec<Cow<'_, str>> = record
            .iter()
            .map(|cell| quote_cell(cell, dataset.delimiter))
            .collect();

        if record.first().is_some_and(|cell| cell.is_empty()) {
            let breaks: usize = cells.iter().map(|cell| cell.matches('\n').count()).sum();
            lines.extend(std::iter::repeat_with(Line::default).take(breaks + 1));
            continue;
        }

        let header = has_headers && i == 0;
        let mut spans = Vec::with_capacity(cells.len() * 2);
        for (j, cell) in cells.iter().enumerate() {
            let style = theme.dsv_cell(j, header);
            let mut parts = cell.split('\n');
            if let Some(first) = parts.next() {
                spans.push(Span::styled(first.to_string(), style));
            }
            for part in parts {
                lines.push(Line::from(std::mem::take(&mut spans)));
                spans.push(Span::styled(part.to_string(), style));
            }
            if j + 1 < cells.len() {
                spans.push(Span::styled(delimiter.clone(), style));
            }
        }
        lines.push(Line::from(spans));
    }
    lines
}

/// Scroll offset that keeps `cursor` inside a viewport of `len` cells,
/// moving as little as possible. Same rule the text area applies to itself.
pub fn next_scroll_top(prev_top: u16, cursor: u16, len: u16) -> u16 {
    if cursor < prev_top {
        cursor
    } else if prev_top.saturating_add(len) <= cursor {
        cursor - len.saturating_sub(1)
    } else {
        prev_top
    }
}

/// Overlay scroll state; follows whatever the editable layer reports.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScrollSync {
    top: u16,
    left: u16,
}

impl ScrollSync {
    pub fn on_editable_scroll(&mut self, top: u16, left: u16) {
        self.top = top;
        self.left = left;
    }

    pub fn offsets(&self) -> (u16, u16) {
        (self.top, self.left)
    }
}

pub struct DsvEditor {
    textarea: TextArea<'static>,
    dataset: Dataset,
    viewport: (u16, u16),
    overlay: ScrollSync,
}

impl DsvEditor {
    pub fn new(text: &str) -> Self {
        let mut editor = Self {
            textarea: TextArea::default(),
            dataset: Dataset::default(),
            viewport: (0, 0),
            overlay: ScrollSync::default(),
        };
        editor.set_text(text);
        editor
    }

    pub fn set_text(&mut self, text: &str) {
        let lines: Vec<String> = text.split('\n').map(str::to_string).collect();
        self.textarea = TextArea::from(lines);
        self.textarea.move_cursor(CursorMove::Top);
        self.viewport = (0, 0);
        self.overlay = ScrollSync::default();
        self.reparse();
    }

    pub fn text(&self) -> String {
        self.textarea.lines().join("\n")
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn cursor(&self) -> (usize, usize) {
        self.textarea.cursor()
    }

    pub fn overlay_offsets(&self) -> (u16, u16) {
        self.overlay.offsets()
    }

    /// Feed a key to the text area; returns whether the text changed.
    pub fn input(&mut self, input: impl Into<Input>) -> bool {
        let modified = self.textarea.input(input);
        if modified {
            self.reparse();
        }
        modified
    }

    pub fn paste(&mut self, text: &str) -> bool {
        let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
        let modified = self.textarea.insert_str(normalized);
        if modified {
            self.reparse();
        }
        modified
    }

    /// Cursor position clamped to terminal coordinates.
    fn cursor_cell(&self) -> (u16, u16) {
        let (row, col) = self.textarea.cursor();
        (
            u16::try_from(row).unwrap_or(u16::MAX),
            u16::try_from(col).unwrap_or(u16::MAX),
        )
    }

    fn reparse(&mut self) {
        self.dataset = parse(&self.text());
    }

    /// Scroll the editable layer so the cursor stays visible in a
    /// `height` x `width` viewport, then sync the overlay.
    pub fn follow_cursor(&mut self, height: u16, width: u16) {
        let (row, col) = self.cursor_cell();
        let top = next_scroll_top(self.viewport.0, row, height.max(1));
        let left = next_scroll_top(self.viewport.1, col, width.max(1));
        self.viewport = (top, left);
        self.overlay.on_editable_scroll(top, left);
    }

    pub fn render(&mut self, frame: &mut Frame, area: Rect, theme: &Theme, title: &str) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(theme.border_style)
            .title(Span::styled(title.to_string(), theme.title_style));
        let inner = block.inner(area);
        self.follow_cursor(inner.height, inner.width);

        let overlay = Paragraph::new(highlight_lines(&self.dataset, theme))
            .style(theme.text_style)
            .block(block)
            .scroll(self.overlay.offsets());
        frame.render_widget(overlay, area);

        let (row, col) = self.cursor_cell();
        let (top, left) = self.overlay.offsets();
        let x = inner.x.saturating_add(col.saturating_sub(left));
        let y = inner.y.saturating_add(row.saturating_sub(top));
        frame.set_cursor_position((x, y));
    }
}
