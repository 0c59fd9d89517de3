//! SafetyLens Common Library
//!
//! CLIと将来のフロントエンドで共有される型とユーティリティ

pub mod types;
pub mod error;
pub mod prompts;
pub mod parser;
pub mod export;

pub use types::{Answer, IncidentReport, ReportField, ReportFields};
pub use error::{Error, Result};
pub use prompts::{response_schema, DEFAULT_MODEL, EXTRACTION_PROMPT, SYSTEM_INSTRUCTION};
pub use parser::{extract_json, parse_extraction_response};
pub use export::{csv_file_name, to_clipboard_text, to_csv, CSV_BOM};
