//! Domain state and rules, independent of the terminal.

pub mod attachments;
pub mod columns;
pub mod config;
pub mod dataset;
pub mod forms;
pub mod issues;
pub mod pipeline;
pub mod project;
pub mod task_watch;
