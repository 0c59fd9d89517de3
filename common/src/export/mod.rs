//! Export core modules shared across CLI and future front-ends.

pub mod csv_core;

pub use csv_core::{csv_file_name, to_clipboard_text, to_csv, CSV_BOM};
