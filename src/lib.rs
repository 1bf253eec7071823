//! seqopt prepares bio-sequence optimization projects and follows the tasks
//! that run them.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns the dataset rules, the pipeline and confirmation forms,
//!   attachments, configuration, and the project session that submits tasks.
//! - [`api`] defines the task and blob payloads and the HTTP clients behind
//!   the [`api::TaskApi`] and [`api::BlobStore`] traits.
//! - [`ui`] draws the dataset editor and the typewriter reveal of markdown
//!   replies in the terminal.
//! - [`utils`] holds URL handling and logging setup.
//!
//! The binary (`src/main.rs`) routes through [`crate::cli::main`].

pub mod api;
pub mod cli;
pub mod core;
pub mod ui;
pub mod utils;
