use super::code::language_hint;
use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};
use std::ops::Range;

/// Extensions enabled for every parse: the GitHub-flavored subset the
/// assistant replies are written in.
pub fn markdown_options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    options.insert(Options::ENABLE_FOOTNOTES);
    options
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BlockKind {
    Paragraph,
    Heading(u8),
    List { ordered: bool },
    BlockQuote,
    Code { lang: String, value: String },
    ThematicBreak,
    Table,
    Html,
    Footnote,
    Other,
}

/// One top-level markdown node together with the literal text it was parsed from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    pub kind: BlockKind,
    pub source: String,
    pub span: Range<usize>,
}

impl Block {
    pub fn is_code(&self) -> bool {
        matches!(self.kind, BlockKind::Code { .. })
    }
}

fn kind_for(tag: &Tag<'_>) -> BlockKind {
    match tag {
        Tag::Paragraph => BlockKind::Paragraph,
        Tag::Heading { level, .. } => BlockKind::Heading(*level as u8),
        Tag::List(start) => BlockKind::List {
            ordered: start.is_some(),
        },
        Tag::BlockQuote(_) => BlockKind::BlockQuote,
        Tag::CodeBlock(kind) => BlockKind::Code {
            lang: language_hint(kind),
            value: String::new(),
        },
        Tag::Table(_) => BlockKind::Table,
        Tag::HtmlBlock => BlockKind::Html,
        Tag::FootnoteDefinition(_) => BlockKind::Footnote,
        _ => BlockKind::Other,
    }
}

fn trimmed_span(markdown: &str, range: Range<usize>) -> Range<usize> {
    let end = range.start
        + markdown[range.clone()]
            .trim_end_matches(['\n', '\r'])
            .len();
    range.start..end
}

/// Split `markdown` into its top-level blocks, in document order.
///
/// Each block's `source` is the exact input slice for that node, minus
/// trailing line terminators, so a reveal can replay the author's text as-is.
pub fn segment(markdown: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut depth = 0usize;
    let mut code_body: Option<String> = None;

    let push = |blocks: &mut Vec<Block>, kind: BlockKind, range: Range<usize>| {
        let span = trimmed_span(markdown, range);
        blocks.push(Block {
            kind,
            source: markdown[span.clone()].to_string(),
            span,
        });
    };

    for (event, range) in Parser::new_ext(markdown, markdown_options()).into_offset_iter() {
        match event {
            Event::Start(tag) => {
                if depth == 0 {
                    if matches!(tag, Tag::CodeBlock(_)) {
                        code_body = Some(String::new());
                    }
                    push(&mut blocks, kind_for(&tag), range);
                }
                depth += 1;
            }
            Event::End(end) => {
                depth = depth.saturating_sub(1);
                if depth == 0 && matches!(end, TagEnd::CodeBlock) {
                    let body = code_body.take().unwrap_or_default();
                    if let Some(Block {
                        kind: BlockKind::Code { value, .. },
                        ..
                    }) = blocks.last_mut()
                    {
                        *value = body.strip_suffix('\n').unwrap_or(&body).to_string();
                    }
                }
            }
            Event::Text(text) if depth == 1 => {
                if let Some(body) = code_body.as_mut() {
                    body.push_str(&text);
                }
            }
            Event::Rule if depth == 0 => push(&mut blocks, BlockKind::ThematicBreak, range),
            _ => {}
        }
    }

    blocks
}
