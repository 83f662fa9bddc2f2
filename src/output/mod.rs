//! Terminal rendering and JSON export

pub mod json_export;
pub mod table;

pub use json_export::{JsonExporter, Report};
pub use table::{render_banner, render_results, render_summary};
