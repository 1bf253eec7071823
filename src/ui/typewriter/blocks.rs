use super::{Reveal, RevealFrame, TypewriterOptions};
use crate::ui::markdown::{Block, BlockKind};
use std::time::Duration;
use unicode_segmentation::UnicodeSegmentation;

/// The first `count` graphemes of `s`.
pub(super) fn grapheme_prefix(s: &str, count: usize) -> &str {
    match s.grapheme_indices(true).nth(count) {
        Some((offset, _)) => &s[..offset],
        None => s,
    }
}

fn fence_open(lang: &str) -> String {
    format!("```{lang}\n")
}

const FENCE_CLOSE: &str = "\n```";

/// Number of graphemes a block reveals before it is complete: the body for
/// code blocks, the literal source otherwise.
fn reveal_len(block: &Block) -> usize {
    match &block.kind {
        BlockKind::Code { value, .. } => value.graphemes(true).count(),
        _ => block.source.graphemes(true).count(),
    }
}

/// Reveals a block sequence one grapheme at a time, pausing between blocks.
#[derive(Debug, Clone)]
pub struct BlockTypewriter {
    blocks: Vec<Block>,
    position: usize,
    index: usize,
    accumulated: String,
    text: String,
    options: TypewriterOptions,
}

impl BlockTypewriter {
    pub fn new(blocks: Vec<Block>, options: TypewriterOptions) -> Self {
        let mut typewriter = Self {
            blocks: Vec::new(),
            position: 0,
            index: 0,
            accumulated: String::new(),
            text: String::new(),
            options,
        };
        typewriter.reset(blocks);
        typewriter
    }

    /// Start over with new content.
    pub fn reset(&mut self, blocks: Vec<Block>) {
        self.blocks = blocks;
        self.position = 0;
        self.index = 0;
        self.accumulated.clear();
        self.text.clear();
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn index(&self) -> usize {
        self.index
    }

    fn current(&self) -> Option<&Block> {
        self.blocks.get(self.position)
    }

    /// Reveal one more grapheme of the current block.
    pub fn tick(&mut self) {
        let Some(block) = self.blocks.get(self.position) else {
            return;
        };
        let mut text = self.accumulated.clone();
        match &block.kind {
            BlockKind::Code { lang, value } => {
                text.push_str(&fence_open(lang));
                text.push_str(grapheme_prefix(value, self.index + 1));
                text.push_str(FENCE_CLOSE);
            }
            _ => text.push_str(grapheme_prefix(&block.source, self.index + 1)),
        }
        self.text = text;
        self.index += 1;
    }

    /// Commit the current block's literal source and move to the next one.
    /// An upcoming code block shows its empty fences right away.
    pub fn next(&mut self) {
        let Some(block) = self.blocks.get(self.position) else {
            return;
        };
        self.accumulated.push_str(&block.source);
        if self.position + 1 < self.blocks.len() {
            self.accumulated.push_str("\n\n");
        }
        self.position += 1;
        self.index = 0;

        self.text = self.accumulated.clone();
        if let Some(Block {
            kind: BlockKind::Code { lang, .. },
            ..
        }) = self.blocks.get(self.position)
        {
            self.text.push_str(&fence_open(lang));
            self.text.push_str("```");
        }
    }

    pub fn is_done(&self) -> bool {
        match self.current() {
            None => true,
            Some(block) => {
                self.position + 1 == self.blocks.len() && self.index >= reveal_len(block)
            }
        }
    }

    /// Delay before the next step, or `None` once the last block has been flushed.
    pub fn next_delay(&self) -> Option<Duration> {
        let block = self.current()?;
        if self.index < reveal_len(block) {
            Some(self.options.speed)
        } else {
            Some(self.options.interval)
        }
    }
}

impl Reveal for BlockTypewriter {
    fn next_delay(&self) -> Option<Duration> {
        BlockTypewriter::next_delay(self)
    }

    fn advance(&mut self) {
        match self.current() {
            Some(block) if self.index < reveal_len(block) => self.tick(),
            Some(_) => self.next(),
            None => {}
        }
    }

    fn is_done(&self) -> bool {
        BlockTypewriter::is_done(self)
    }

    fn cursor(&self) -> &str {
        if self.is_done() {
            ""
        } else {
            &self.options.cursor
        }
    }

    fn frame(&self) -> RevealFrame {
        RevealFrame::Text {
            text: self.text.clone(),
            cursor: self.cursor().to_string(),
        }
    }
}
