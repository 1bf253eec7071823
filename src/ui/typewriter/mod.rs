//! Character-by-character reveal of assistant replies.
//!
//! Two engines share the [`Reveal`] interface: [`BlockTypewriter`] replays
//! the literal markdown source block by block, [`TreeTypewriter`] reveals an
//! already rendered element tree. [`drive`] and [`TypewriterService`] run
//! either one on tokio timers.

mod blocks;
mod driver;
mod tree;

pub use blocks::BlockTypewriter;
pub use driver::{drive, DoneLatch, ReadReceipt, TypewriterService};
pub use tree::TreeTypewriter;

use crate::core::config::TypewriterSettings;
use crate::ui::markdown::RichNode;
use std::time::Duration;

const BLOCK_SPEED_MS: u64 = 20;
const BLOCK_INTERVAL_MS: u64 = 300;
const BLOCK_CURSOR: &str = "|";
const TREE_SPEED_MS: u64 = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypewriterOptions {
    /// Delay between revealed graphemes.
    pub speed: Duration,
    /// Pause before moving on to the next block. Unused in tree mode.
    pub interval: Duration,
    pub cursor: String,
}

impl TypewriterOptions {
    pub fn block() -> Self {
        Self {
            speed: Duration::from_millis(BLOCK_SPEED_MS),
            interval: Duration::from_millis(BLOCK_INTERVAL_MS),
            cursor: BLOCK_CURSOR.to_string(),
        }
    }

    pub fn tree() -> Self {
        Self {
            speed: Duration::from_millis(TREE_SPEED_MS),
            interval: Duration::ZERO,
            cursor: String::new(),
        }
    }

    pub fn block_from(settings: &TypewriterSettings) -> Self {
        let defaults = Self::block();
        Self {
            speed: settings
                .speed_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.speed),
            interval: settings
                .interval_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.interval),
            cursor: settings.cursor.clone().unwrap_or(defaults.cursor),
        }
    }

    pub fn tree_from(settings: &TypewriterSettings) -> Self {
        let defaults = Self::tree();
        Self {
            speed: settings
                .tree_speed_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.speed),
            cursor: settings.cursor.clone().unwrap_or(defaults.cursor),
            ..defaults
        }
    }
}

/// What a reveal currently shows.
#[derive(Debug, Clone, PartialEq)]
pub enum RevealFrame {
    Text {
        text: String,
        cursor: String,
    },
    Tree {
        nodes: Vec<RichNode>,
        revealed: usize,
        cursor: String,
    },
    /// Sent once after the last frame of a reveal that ran to completion.
    Done,
}

/// A restartable reveal that advances on a timer.
pub trait Reveal: Send {
    /// How long to wait before the next [`Reveal::advance`], or `None` when
    /// there is nothing left to do.
    fn next_delay(&self) -> Option<Duration>;
    fn advance(&mut self);
    fn is_done(&self) -> bool;
    /// Cursor marker: the configured string while revealing, empty when done.
    fn cursor(&self) -> &str;
    fn frame(&self) -> RevealFrame;
}
