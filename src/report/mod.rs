//! Summary persistence and report rendering.

pub mod generator;
pub mod persist;

pub use generator::{generate_json_report, generate_markdown_report};
pub use persist::{load_section, write_summaries};
