//! Plan directives and the command log.
//!
//! CREATE does not touch the dataset itself; it writes a `.do` file of
//! directives the user runs inside Stata to materialize, format and label
//! the variables. The log is written in the Windows-1252 code page the
//! consuming Stata installations expect, so every line is transcoded from
//! the internal UTF-8 representation before it hits the file.

use crate::column::DwColumn;
use crate::error::Result;
use encoding_rs::WINDOWS_1252;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Fixed name of the command log, created in the working directory.
pub const COMMAND_LOG_FILE: &str = "dwcommands.do";

/// Line-oriented writer for the plan directives.
pub struct CommandLog {
    file: File,
}

impl CommandLog {
    /// Create (truncate) the command log at the given path.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self { file })
    }

    /// Transcode one directive to Windows-1252 and append it to the log.
    pub fn write_line(&mut self, line: &str) -> Result<()> {
        let (encoded, _, _) = WINDOWS_1252.encode(line);
        self.file.write_all(&encoded)?;
        self.file.write_all(b"\n")?;
        Ok(())
    }
}

/// Generate the CREATE plan: one directive per line.
///
/// `with_data` is false under `nulldata`, which suppresses the dataset
/// sizing and variable generation directives and keeps only the labeling
/// ones (the dataset is assumed to exist already).
pub fn plan_directives(
    table: &str,
    columns: &[DwColumn],
    row_count: i64,
    with_data: bool,
) -> Vec<String> {
    let mut lines = Vec::new();
    lines.push(format!(
        "* use the following commands to create the {} dataset in Stata: ",
        table
    ));
    lines.push(String::new());

    if with_data {
        lines.push(format!("set obs {}", row_count));
        lines.push(String::new());
    }

    for column in columns {
        let name = column.variable_name();

        if with_data {
            let initial = if column.is_numeric() { "." } else { "\"\"" };
            lines.push(format!(
                "qui gen {} {} = {}",
                column.stata_type(),
                name,
                initial
            ));
            lines.push(format!("format {} {}", name, column.format()));
        }

        if column.is_label_variable() {
            lines.push(format!(
                "label variable {} \"{}\" ",
                name,
                column.column_label()
            ));
        }

        if column.is_label_values() {
            let mut define = format!("label define {}_label ", name);
            if let Some(labels) = column.value_labels() {
                for (code, label) in labels {
                    define.push_str(&format!("{} \"{}\" ", code, label));
                }
            }
            let values = format!("label values {} {}_label", name, name);
            // Stata cannot label string variables; keep the directives as
            // comments so they do not stop the do-file
            let toggle = if column.is_numeric() { "" } else { "* " };
            lines.push(format!("{}{}", toggle, define));
            lines.push(format!("{}{}", toggle, values));
        }

        lines.push(String::new());
    }

    lines
}
