//! CSV/JSON to markdown table converter.

use super::{extension, require_exists};
use crate::template::{Context, Script};
use crate::{Error, Outcome, Result};
use clap::Parser;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Convert CSV/JSON to markdown tables.
#[derive(Debug, Parser)]
#[command(name = "mdtable", version)]
pub struct MarkdownTable {
    /// Input file (CSV or JSON)
    pub input: PathBuf,
    /// Column alignment, one of l/c/r per column (e.g. `lcr`)
    #[arg(short, long)]
    pub alignment: Option<String>,
    /// Output markdown file (prints to the console when omitted)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
    Right,
}

impl Align {
    /// Unknown letters fall back to left alignment.
    pub fn from_char(ch: char) -> Self {
        match ch.to_ascii_lowercase() {
            'c' => Align::Center,
            'r' => Align::Right,
            _ => Align::Left,
        }
    }
}

pub fn parse_alignment(spec: &str) -> Vec<Align> {
    spec.chars().map(Align::from_char).collect()
}

/// A header row plus data rows, all cells already rendered as text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Render as GitHub-flavoured markdown. Rows are padded or cut to the
    /// header width; missing alignments default to left.
    pub fn to_markdown(&self, alignment: &[Align]) -> String {
        let columns = self.headers.len();
        let rows: Vec<Vec<&str>> = self
            .rows
            .iter()
            .map(|row| {
                (0..columns)
                    .map(|i| row.get(i).map(String::as_str).unwrap_or(""))
                    .collect()
            })
            .collect();

        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.chars().count()).collect();
        for row in &rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.chars().count());
            }
        }

        let mut lines = Vec::with_capacity(rows.len() + 2);
        let headers: Vec<&str> = self.headers.iter().map(String::as_str).collect();
        lines.push(render_row(&headers, &widths));

        let separators: Vec<String> = widths
            .iter()
            .enumerate()
            .map(|(i, &width)| match alignment.get(i).copied().unwrap_or(Align::Left) {
                Align::Center => format!(":{}:", "-".repeat(width)),
                Align::Right => format!("{}:", "-".repeat(width + 1)),
                Align::Left => format!(":{}", "-".repeat(width + 1)),
            })
            .collect();
        lines.push(format!("|{}|", separators.join("|")));

        for row in &rows {
            lines.push(render_row(row, &widths));
        }
        lines.join("\n")
    }
}

fn render_row(cells: &[&str], widths: &[usize]) -> String {
    let cells: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, &width)| format!(" {cell:<width$} "))
        .collect();
    format!("|{}|", cells.join("|"))
}

/// First record is the header row.
pub fn read_csv(path: &Path) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|err| match err.kind() {
            csv::ErrorKind::Io(io) if io.kind() == std::io::ErrorKind::NotFound => {
                Error::NotFound(path.to_path_buf())
            }
            _ => Error::from(err),
        })?;

    let mut records = reader.records();
    let headers = match records.next() {
        Some(record) => record?.iter().map(str::to_string).collect(),
        None => return Err(Error::malformed("CSV file is empty")),
    };
    let rows = records
        .map(|record| record.map(|r| r.iter().map(str::to_string).collect()))
        .collect::<std::result::Result<Vec<Vec<String>>, _>>()?;
    Ok(Table { headers, rows })
}

/// The document must be a non-empty array of objects; the first object's
/// keys become the headers.
pub fn parse_json(text: &str) -> Result<Table> {
    let value: Value = serde_json::from_str(text)?;
    let items = match value {
        Value::Array(items) => items,
        _ => return Err(Error::malformed("JSON must be an array of objects")),
    };
    let first = match items.first() {
        Some(Value::Object(first)) => first,
        Some(_) => return Err(Error::malformed("JSON must be an array of objects")),
        None => return Err(Error::malformed("JSON array is empty")),
    };
    let headers: Vec<String> = first.keys().cloned().collect();

    let rows = items
        .iter()
        .map(|item| match item {
            Value::Object(object) => Ok(headers
                .iter()
                .map(|key| object.get(key).map(cell_text).unwrap_or_default())
                .collect()),
            _ => Err(Error::malformed("JSON must be an array of objects")),
        })
        .collect::<Result<Vec<Vec<String>>>>()?;
    Ok(Table { headers, rows })
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

impl Script for MarkdownTable {
    fn validate(&self, _ctx: &Context) -> Result<()> {
        match extension(&self.input).as_str() {
            "csv" | "json" => Ok(()),
            _ => Err(Error::invocation("File must be .csv or .json")),
        }
    }

    fn run(self, ctx: &mut Context) -> Result<Outcome> {
        require_exists(&self.input)?;
        tracing::debug!(input = %self.input.display(), "converting table");

        let table = if extension(&self.input) == "csv" {
            read_csv(&self.input)?
        } else {
            parse_json(&std::fs::read_to_string(&self.input)?)?
        };
        let alignment = self.alignment.as_deref().map(parse_alignment).unwrap_or_default();
        let markdown = table.to_markdown(&alignment);

        match self.output {
            Some(output) => {
                std::fs::write(&output, format!("{markdown}\n"))?;
                Ok(Outcome::ok(format!(
                    "Markdown table saved to {}",
                    output.display()
                )))
            }
            None => {
                ctx.reporter.raw(&markdown);
                Ok(Outcome::ok(format!(
                    "Rendered {} row(s) x {} column(s)",
                    table.rows.len(),
                    table.headers.len()
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::Tag;
    use crate::template::run_with;
    use crate::{Config, RecordingRunner};

    fn table() -> Table {
        Table {
            headers: vec!["Name".into(), "Qty".into()],
            rows: vec![
                vec!["apple".into(), "3".into()],
                vec!["kiwi".into()],
            ],
        }
    }

    #[test]
    fn renders_left_aligned_by_default() {
        let md = table().to_markdown(&[]);
        assert_eq!(
            md,
            "| Name  | Qty |\n|:------|:----|\n| apple | 3   |\n| kiwi  |     |"
        );
    }

    #[test]
    fn renders_center_and_right_separators() {
        let md = table().to_markdown(&parse_alignment("cr"));
        let separator = md.lines().nth(1).unwrap();
        assert_eq!(separator, "|:-----:|----:|");
    }

    #[test]
    fn unknown_alignment_letters_are_left() {
        assert_eq!(parse_alignment("xC"), [Align::Left, Align::Center]);
    }

    #[test]
    fn json_uses_first_object_keys_in_order() {
        let table = parse_json(r#"[{"b": 1, "a": "x"}, {"a": null, "c": true}]"#).unwrap();
        assert_eq!(table.headers, ["b", "a"]);
        assert_eq!(table.rows, [vec!["1", "x"], vec!["", ""]]);
    }

    #[test]
    fn json_shape_errors_are_malformed_input() {
        for doc in ["{}", "[]", "[1, 2]", "not json"] {
            let err = parse_json(doc).unwrap_err();
            assert!(matches!(err, Error::Malformed(_)), "{doc}: {err}");
        }
    }

    #[test]
    fn empty_csv_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        std::fs::write(&path, "").unwrap();
        assert!(matches!(read_csv(&path), Err(Error::Malformed(_))));
    }

    #[test]
    fn prints_table_then_one_ok_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fruit.csv");
        std::fs::write(&path, "fruit,count\npear,2\nfig,10\n").unwrap();

        let mut ctx = Context::capture(Config::default(), RecordingRunner::new());
        let code = run_with::<MarkdownTable, _, _>(
            ["mdtable".into(), path.into_os_string(), "-a".into(), "lr".into()],
            &mut ctx,
        );

        assert_eq!(code, 0);
        let lines = ctx.reporter.lines();
        assert_eq!(lines[0], "| fruit | count |");
        assert_eq!(lines[1], "|:------|------:|");
        assert_eq!(ctx.reporter.tagged(Tag::Ok).len(), 1);
    }

    #[test]
    fn writes_output_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("rows.json");
        let output = dir.path().join("rows.md");
        std::fs::write(&input, r#"[{"k": "v"}]"#).unwrap();

        let mut ctx = Context::capture(Config::default(), RecordingRunner::new());
        let code = run_with::<MarkdownTable, _, _>(
            [
                "mdtable".into(),
                input.into_os_string(),
                "-o".into(),
                output.clone().into_os_string(),
            ],
            &mut ctx,
        );

        assert_eq!(code, 0);
        let written = std::fs::read_to_string(output).unwrap();
        assert!(written.starts_with("| k |"));
    }

    #[test]
    fn wrong_extension_is_an_invocation_error() {
        let mut ctx = Context::capture(Config::default(), RecordingRunner::new());
        let code = run_with::<MarkdownTable, _, _>(["mdtable", "notes.txt"], &mut ctx);
        assert_eq!(code, 2);
    }

    #[test]
    fn missing_file_is_an_operation_error() {
        let mut ctx = Context::capture(Config::default(), RecordingRunner::new());
        let code = run_with::<MarkdownTable, _, _>(["mdtable", "/no/such/file.csv"], &mut ctx);
        assert_eq!(code, 1);
        assert_eq!(
            ctx.reporter.tagged(Tag::Error),
            ["File not found: /no/such/file.csv"]
        );
    }
}
