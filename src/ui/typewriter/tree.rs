use super::{Reveal, RevealFrame, TypewriterOptions};
use crate::ui::markdown::{text_len, RichNode};
use std::time::Duration;
use unicode_segmentation::UnicodeSegmentation;

/// Reveals an already rendered tree one grapheme at a time.
#[derive(Debug, Clone)]
pub struct TreeTypewriter {
    nodes: Vec<RichNode>,
    total: usize,
    count: usize,
    options: TypewriterOptions,
}

impl TreeTypewriter {
    pub fn new(nodes: Vec<RichNode>, options: TypewriterOptions) -> Self {
        let total = text_len(&nodes);
        Self {
            nodes,
            total,
            count: 0,
            options,
        }
    }

    pub fn reset(&mut self, nodes: Vec<RichNode>) {
        self.total = text_len(&nodes);
        self.nodes = nodes;
        self.count = 0;
    }

    pub fn revealed_count(&self) -> usize {
        self.count
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn is_done(&self) -> bool {
        self.count >= self.total
    }

    pub fn tick(&mut self) {
        self.count = (self.count + 1).min(self.total);
    }

    /// The tree as it should be shown now: the original once complete,
    /// otherwise a copy cut off after `revealed_count` graphemes.
    pub fn revealed(&self) -> Vec<RichNode> {
        if self.is_done() {
            return self.nodes.clone();
        }
        let mut budget = self.count;
        let mut ordinal = 0;
        let mut out = Vec::new();
        for node in &self.nodes {
            reveal_into(node, &mut budget, &mut ordinal, &mut out);
        }
        out
    }
}

fn push_space(out: &mut Vec<RichNode>) {
    match out.last_mut() {
        Some(RichNode::Text(text)) => text.push(' '),
        _ => out.push(RichNode::Text(" ".to_string())),
    }
}

fn reveal_into(node: &RichNode, budget: &mut usize, ordinal: &mut usize, out: &mut Vec<RichNode>) {
    if *budget == 0 {
        return;
    }
    match node {
        RichNode::Text(text) | RichNode::Glyph { text, .. } => {
            for grapheme in text.graphemes(true).take(*budget) {
                *budget -= 1;
                if grapheme == " " {
                    push_space(out);
                } else {
                    out.push(RichNode::Glyph {
                        text: grapheme.to_string(),
                        ordinal: *ordinal,
                    });
                }
                *ordinal += 1;
            }
        }
        RichNode::Void(_) => out.push(node.clone()),
        RichNode::Element { kind, children } => {
            let mut revealed = Vec::new();
            for child in children {
                reveal_into(child, budget, ordinal, &mut revealed);
            }
            out.push(RichNode::element(kind.clone(), revealed));
        }
    }
}

impl Reveal for TreeTypewriter {
    fn next_delay(&self) -> Option<Duration> {
        (!self.is_done()).then_some(self.options.speed)
    }

    fn advance(&mut self) {
        self.tick();
    }

    fn is_done(&self) -> bool {
        TreeTypewriter::is_done(self)
    }

    fn cursor(&self) -> &str {
        if self.is_done() {
            ""
        } else {
            &self.options.cursor
        }
    }

    fn frame(&self) -> RevealFrame {
        RevealFrame::Tree {
            nodes: self.revealed(),
            revealed: self.count,
            cursor: self.cursor().to_string(),
        }
    }
}
