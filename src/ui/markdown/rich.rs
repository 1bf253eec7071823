use super::code::{detab, language_hint};
use super::parser::markdown_options;
use crate::ui::theme::Theme;
use pulldown_cmark::{Event, Parser, Tag};
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

const RULE_WIDTH: usize = 24;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ElementKind {
    Paragraph,
    Heading(u8),
    BlockQuote,
    CodeBlock { lang: String },
    List { start: Option<u64> },
    Item,
    Emphasis,
    Strong,
    Strikethrough,
    InlineCode,
    Link { url: String },
    Table,
    TableRow,
    TableCell,
}

/// Elements that never contain text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VoidKind {
    LineBreak,
    Rule,
}

/// A rendered markdown tree. `Glyph` only appears in partially revealed
/// trees: one revealed grapheme plus its position in reveal order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RichNode {
    Text(String),
    Element {
        kind: ElementKind,
        children: Vec<RichNode>,
    },
    Void(VoidKind),
    Glyph {
        text: String,
        ordinal: usize,
    },
}

impl RichNode {
    pub fn element(kind: ElementKind, children: Vec<RichNode>) -> Self {
        RichNode::Element { kind, children }
    }

    /// Number of graphemes in the text leaves below this node.
    pub fn text_len(&self) -> usize {
        match self {
            RichNode::Text(text) | RichNode::Glyph { text, .. } => text.graphemes(true).count(),
            RichNode::Element { children, .. } => text_len(children),
            RichNode::Void(_) => 0,
        }
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            RichNode::Text(text) | RichNode::Glyph { text, .. } => out.push_str(text),
            RichNode::Element { children, .. } => {
                for child in children {
                    child.collect_text(out);
                }
            }
            RichNode::Void(_) => {}
        }
    }
}

pub fn text_len(nodes: &[RichNode]) -> usize {
    nodes.iter().map(RichNode::text_len).sum()
}

/// Concatenated text leaves, in document order.
pub fn plain_text(nodes: &[RichNode]) -> String {
    let mut out = String::new();
    for node in nodes {
        node.collect_text(&mut out);
    }
    out
}

fn element_for(tag: Tag<'_>) -> ElementKind {
    match tag {
        Tag::Paragraph => ElementKind::Paragraph,
        Tag::Heading { level, .. } => ElementKind::Heading(level as u8),
        Tag::BlockQuote(_) => ElementKind::BlockQuote,
        Tag::CodeBlock(kind) => ElementKind::CodeBlock {
            lang: language_hint(&kind),
        },
        Tag::List(start) => ElementKind::List { start },
        Tag::Item => ElementKind::Item,
        Tag::Emphasis => ElementKind::Emphasis,
        Tag::Strong => ElementKind::Strong,
        Tag::Strikethrough => ElementKind::Strikethrough,
        Tag::Link { dest_url, .. } | Tag::Image { dest_url, .. } => ElementKind::Link {
            url: dest_url.to_string(),
        },
        Tag::Table(_) => ElementKind::Table,
        Tag::TableHead | Tag::TableRow => ElementKind::TableRow,
        Tag::TableCell => ElementKind::TableCell,
        // HTML blocks, footnote definitions and the rest render as plain blocks
        _ => ElementKind::Paragraph,
    }
}

fn append(stack: &mut [(ElementKind, Vec<RichNode>)], root: &mut Vec<RichNode>, node: RichNode) {
    let target = match stack.last_mut() {
        Some((_, children)) => children,
        None => root,
    };
    if let (Some(RichNode::Text(prev)), RichNode::Text(next)) = (target.last_mut(), &node) {
        prev.push_str(next);
        return;
    }
    target.push(node);
}

/// Parse `markdown` into the nested element tree the tree-mode reveal walks.
pub fn rich_nodes(markdown: &str) -> Vec<RichNode> {
    let mut root = Vec::new();
    let mut stack: Vec<(ElementKind, Vec<RichNode>)> = Vec::new();

    for event in Parser::new_ext(markdown, markdown_options()) {
        let node = match event {
            Event::Start(tag) => {
                stack.push((element_for(tag), Vec::new()));
                continue;
            }
            Event::End(_) => match stack.pop() {
                Some((kind, children)) => RichNode::element(kind, children),
                None => continue,
            },
            Event::Text(text) | Event::Html(text) | Event::InlineHtml(text) => {
                RichNode::Text(text.into_string())
            }
            Event::Code(code) => RichNode::element(
                ElementKind::InlineCode,
                vec![RichNode::Text(code.into_string())],
            ),
            Event::SoftBreak => RichNode::Text(" ".to_string()),
            Event::HardBreak => RichNode::Void(VoidKind::LineBreak),
            Event::Rule => RichNode::Void(VoidKind::Rule),
            Event::TaskListMarker(checked) => {
                RichNode::Text(if checked { "[x] " } else { "[ ] " }.to_string())
            }
            Event::FootnoteReference(label) => RichNode::Text(format!("[^{label}]")),
            _ => continue,
        };
        append(&mut stack, &mut root, node);
    }

    root
}

#[derive(Clone, Copy)]
enum Prefix {
    Quote,
    Code,
    Indent(usize),
}

struct LineBuilder<'t> {
    theme: &'t Theme,
    fresh_from: Option<usize>,
    lines: Vec<Line<'static>>,
    current: Vec<Span<'static>>,
    prefixes: Vec<Prefix>,
    marker: Option<String>,
    lists: Vec<Option<u64>>,
    cell: usize,
    needs_gap: bool,
}

impl<'t> LineBuilder<'t> {
    fn new(theme: &'t Theme, fresh_from: Option<usize>) -> Self {
        Self {
            theme,
            fresh_from,
            lines: Vec::new(),
            current: Vec::new(),
            prefixes: Vec::new(),
            marker: None,
            lists: Vec::new(),
            cell: 0,
            needs_gap: false,
        }
    }

    fn prefix_spans(&mut self, quotes_only: bool) -> Vec<Span<'static>> {
        let marker_at = if self.marker.is_some() && !quotes_only {
            self.prefixes
                .iter()
                .rposition(|p| matches!(p, Prefix::Indent(_)))
        } else {
            None
        };
        let mut spans = Vec::new();
        for i in 0..self.prefixes.len() {
            match self.prefixes[i] {
                Prefix::Quote => spans.push(Span::styled("│ ", self.theme.md_quote)),
                _ if quotes_only => {}
                Prefix::Code => spans.push(Span::raw("  ")),
                Prefix::Indent(width) => {
                    let marker = if marker_at == Some(i) {
                        self.marker.take()
                    } else {
                        None
                    };
                    match marker {
                        Some(marker) => spans.push(Span::styled(marker, self.theme.text_style)),
                        None => spans.push(Span::raw(" ".repeat(width))),
                    }
                }
            }
        }
        spans
    }

    fn finish_line(&mut self) {
        let mut spans = self.prefix_spans(false);
        spans.append(&mut self.current);
        self.lines.push(Line::from(spans));
    }

    fn break_line(&mut self) {
        if !self.current.is_empty() {
            self.finish_line();
        }
    }

    fn start_block(&mut self) {
        self.break_line();
        if self.needs_gap && !self.lines.is_empty() {
            let spans = self.prefix_spans(true);
            self.lines.push(Line::from(spans));
        }
        self.needs_gap = false;
    }

    fn end_block(&mut self) {
        self.break_line();
        self.needs_gap = true;
    }

    fn push_text(&mut self, text: &str, style: Style) {
        let mut parts = text.split('\n');
        if let Some(first) = parts.next() {
            self.push_segment(first, style);
        }
        for part in parts {
            self.finish_line();
            self.push_segment(part, style);
        }
    }

    fn push_segment(&mut self, segment: &str, style: Style) {
        if !segment.is_empty() {
            self.current.push(Span::styled(detab(segment), style));
        }
    }

    fn walk(&mut self, nodes: &[RichNode], style: Style) {
        for node in nodes {
            self.node(node, style);
        }
    }

    fn node(&mut self, node: &RichNode, style: Style) {
        match node {
            RichNode::Text(text) => self.push_text(text, style),
            RichNode::Glyph { text, ordinal } => {
                let style = match self.fresh_from {
                    Some(from) if *ordinal >= from => style.patch(self.theme.glyph_fresh),
                    _ => style,
                };
                self.push_text(text, style);
            }
            RichNode::Void(VoidKind::LineBreak) => self.finish_line(),
            RichNode::Void(VoidKind::Rule) => {
                self.start_block();
                self.current
                    .push(Span::styled("─".repeat(RULE_WIDTH), self.theme.md_rule));
                self.end_block();
            }
            RichNode::Element { kind, children } => self.element(kind, children, style),
        }
    }

    fn element(&mut self, kind: &ElementKind, children: &[RichNode], style: Style) {
        let theme = self.theme;
        match kind {
            ElementKind::Paragraph | ElementKind::Table => {
                self.start_block();
                self.walk(children, style);
                self.end_block();
            }
            ElementKind::Heading(_) => {
                self.start_block();
                self.walk(children, style.patch(theme.md_heading));
                self.end_block();
            }
            ElementKind::BlockQuote => {
                self.start_block();
                self.prefixes.push(Prefix::Quote);
                self.walk(children, style.patch(theme.md_quote));
                self.break_line();
                self.prefixes.pop();
                self.needs_gap = true;
            }
            ElementKind::CodeBlock { .. } => {
                self.start_block();
                self.prefixes.push(Prefix::Code);
                self.walk(children, style.patch(theme.md_code));
                self.break_line();
                self.prefixes.pop();
                self.needs_gap = true;
            }
            ElementKind::List { start } => {
                self.start_block();
                self.lists.push(*start);
                self.walk(children, style);
                self.lists.pop();
                self.end_block();
            }
            ElementKind::Item => {
                self.break_line();
                self.needs_gap = false;
                let marker = match self.lists.last_mut() {
                    Some(Some(n)) => {
                        let marker = format!("{n}. ");
                        *n += 1;
                        marker
                    }
                    _ => "- ".to_string(),
                };
                self.prefixes.push(Prefix::Indent(marker.width()));
                self.marker = Some(marker);
                self.walk(children, style);
                if self.marker.is_some() {
                    self.finish_line();
                } else {
                    self.break_line();
                }
                self.prefixes.pop();
                self.needs_gap = false;
            }
            ElementKind::TableRow => {
                self.break_line();
                self.cell = 0;
                self.walk(children, style);
                self.break_line();
            }
            ElementKind::TableCell => {
                if self.cell > 0 {
                    self.current.push(Span::styled(" │ ", theme.border_style));
                }
                self.cell += 1;
                self.walk(children, style);
            }
            ElementKind::Emphasis => self.walk(children, style.patch(theme.md_emphasis)),
            ElementKind::Strong => self.walk(children, style.patch(theme.md_strong)),
            ElementKind::Strikethrough => {
                self.walk(children, style.patch(theme.md_strikethrough))
            }
            ElementKind::InlineCode => self.walk(children, style.patch(theme.md_code)),
            ElementKind::Link { .. } => self.walk(children, style.patch(theme.md_link)),
        }
    }
}

/// Render a (possibly partially revealed) tree to terminal lines.
pub fn tree_lines(nodes: &[RichNode], theme: &Theme) -> Vec<Line<'static>> {
    tree_lines_fading(nodes, theme, None)
}

/// Like [`tree_lines`], but glyphs revealed at or after `fresh_from` get the
/// theme's fade-in style.
pub fn tree_lines_fading(
    nodes: &[RichNode],
    theme: &Theme,
    fresh_from: Option<usize>,
) -> Vec<Line<'static>> {
    let mut builder = LineBuilder::new(theme, fresh_from);
    builder.walk(nodes, theme.text_style);
    builder.break_line();
    builder.lines
}
