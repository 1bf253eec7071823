//! Terminal presentation layer.
//!
//! - [`dsv_editor`]: the dataset text area with its colorized overlay.
//! - [`edit_view`]: the full-screen editor built on it.
//! - [`markdown`]: block segmentation and the rendered tree for replies.
//! - [`typewriter`]: timed reveal of replies in block or tree mode.
//! - [`reveal_view`]: plays a reveal in the terminal.
//! - [`theme`]: styles shared by all of the above.
//!
//! [`crate::core`] owns the form state; this layer only draws it and feeds
//! key input back.

pub mod dsv_editor;
pub mod edit_view;
pub mod markdown;
pub mod reveal_view;
pub mod terminal;
pub mod theme;
pub mod typewriter;
