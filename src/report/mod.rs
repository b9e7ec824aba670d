//! Report rendering (Markdown slide deck / JSON).

pub mod generator;

pub use generator::{generate_deck, generate_json_report, write_report};
