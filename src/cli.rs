//! Minimal CLI: annotations → (inspect | unwrap | nested | base)
use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use rayon::prelude::*;
use serde::Serialize;
use serde_json::{Value, json};

use crate::introspect::{base_element_type, inspect, is_nested_list, unwrap_optional};
use crate::parse::parse_annotation;
use crate::source::{self, Entry};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// inspect Python-style type annotations: strip optionals, detect nested lists,
/// find list element types
#[derive(Parser, Debug)]
#[command(name = "annotype", version)]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// answer every question for each annotation
    Inspect(QueryOut),
    /// strip an `Optional[X]` / `X | None` wrapper
    Unwrap(QueryOut),
    /// report whether each annotation is a list of lists
    Nested(QueryOut),
    /// innermost element type of each (possibly nested) list
    Base(QueryOut),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Query {
    Inspect,
    Unwrap,
    Nested,
    Base,
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// annotations given directly, e.g. 'Optional[list[int]]'
    #[arg(required_unless_present = "input")]
    annotations: Vec<String>,

    /// file with one annotation per line, or a `.json` manifest of
    /// `{"field": "annotation"}`. Literal path or quoted glob pattern;
    /// repeat `-i` for more
    #[arg(long, short, action = clap::ArgAction::Append)]
    input: Vec<String>,

    /// stop at the first annotation that fails to parse, writing nothing
    #[arg(long, default_value_t = false)]
    fail_fast: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Format {
    #[default]
    Text,
    Json,
}

#[derive(clap::Parser, Debug)]
struct QueryOut {
    #[command(flatten)]
    input_settings: InputSettings,

    /// output format
    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// output file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// debugging
    #[arg(long)]
    no_op: bool,
}

/// One line of output.
#[derive(Debug, Clone, Serialize)]
struct Record {
    label: String,
    annotation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip)]
    summary: String,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl InputSettings {
    fn load_entries(&self) -> Result<Vec<Entry>> {
        let mut entries = source::from_literals(&self.annotations);
        if !self.input.is_empty() {
            entries.extend(source::load_inputs(&self.input).context("failed to load inputs")?);
        }
        Ok(entries)
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    /// Returns how many annotations failed to parse.
    pub fn run(&self) -> Result<usize> {
        let (query, target) = match &self.cmd {
            Command::Inspect(t) => (Query::Inspect, t),
            Command::Unwrap(t) => (Query::Unwrap, t),
            Command::Nested(t) => (Query::Nested, t),
            Command::Base(t) => (Query::Base, t),
        };

        // debug path
        if target.no_op {
            eprintln!("{self:#?}");
            return Ok(0);
        }

        // 1) collect
        let entries = target.input_settings.load_entries()?;

        // 2) evaluate (order preserved)
        let records: Vec<Record> = entries.par_iter().map(|e| evaluate(query, e)).collect();
        let failed = records.iter().filter(|r| r.error.is_some()).count();
        tracing::info!(?query, total = records.len(), failed, "annotations evaluated");

        if target.input_settings.fail_fast {
            if let Some(r) = records.iter().find(|r| r.error.is_some()) {
                bail!(
                    "{}: cannot parse {:?}: {}",
                    r.label,
                    r.annotation,
                    r.error.as_deref().unwrap_or_default()
                );
            }
        }

        // 3) render & write
        let colorize = target.out.is_none() && std::io::stdout().is_terminal();
        colored::control::set_override(colorize);
        let rendered = match target.format {
            Format::Json => serde_json::to_string_pretty(&records).context("failed to serialize report")?,
            Format::Text => render_text(&records),
        };
        if let Some(out) = target.out.as_ref() {
            if let Some(parent) = out.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
            std::fs::write(out, &rendered).with_context(|| format!("failed to write {}", out.display()))?;
        } else {
            println!("{rendered}");
        }

        Ok(failed)
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn evaluate(query: Query, entry: &Entry) -> Record {
    let mut record = Record {
        label: entry.label.clone(),
        annotation: entry.annotation.clone(),
        result: None,
        error: None,
        summary: String::new(),
    };
    let ty = match parse_annotation(&entry.annotation) {
        Ok(ty) => ty,
        Err(error) => {
            tracing::warn!(label = %entry.label, %error, "unparseable annotation");
            record.error = Some(error.to_string());
            return record;
        }
    };
    tracing::debug!(label = %entry.label, ty = %ty, "parsed");

    let (result, summary) = match query {
        Query::Inspect => {
            let r = inspect(&ty);
            let summary = format!(
                "{}  optional={} inner={} nested={} base={}",
                r.canonical, r.optional, r.inner, r.nested_list, r.base_type
            );
            (serde_json::to_value(&r).unwrap_or(Value::Null), summary)
        }
        Query::Unwrap => {
            let inner = unwrap_optional(&ty);
            (json!({ "canonical": inner.to_string(), "descriptor": inner }), inner.to_string())
        }
        Query::Nested => {
            let nested = is_nested_list(&ty);
            (Value::Bool(nested), nested.to_string())
        }
        Query::Base => {
            let base = base_element_type(&ty);
            (json!({ "canonical": base.to_string(), "descriptor": base }), base.to_string())
        }
    };
    record.result = Some(result);
    record.summary = summary;
    record
}

fn render_text(records: &[Record]) -> String {
    let label_w = records.iter().map(|r| r.label.len()).max().unwrap_or(0);
    let ann_w = records.iter().map(|r| r.annotation.len()).max().unwrap_or(0);
    records
        .iter()
        .map(|r| {
            let answer = match &r.error {
                Some(e) => format!("error: {e}").red().to_string(),
                None => r.summary.green().to_string(),
            };
            format!(
                "{}  {:<ann_w$}  → {answer}",
                format!("{:<label_w$}", r.label).dimmed(),
                r.annotation,
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(annotation: &str) -> Entry {
        Entry { label: "arg:1".into(), annotation: annotation.into() }
    }

    #[test]
    fn parses_subcommands() {
        let cli = CommandLineInterface::try_parse_from([
            "annotype", "base", "list[list[str]]", "--format", "json",
        ])
        .unwrap();
        match cli.cmd {
            Command::Base(q) => {
                assert_eq!(q.input_settings.annotations, ["list[list[str]]"]);
                assert_eq!(q.format, Format::Json);
                assert!(q.out.is_none());
            }
            other => panic!("wrong command: {other:?}"),
        }
    }

    #[test]
    fn input_flag_takes_one_value() {
        let cli = CommandLineInterface::try_parse_from([
            "annotype", "base", "-i", "a.txt", "list[int]", "-i", "b.json",
        ])
        .unwrap();
        match cli.cmd {
            Command::Base(q) => {
                assert_eq!(q.input_settings.input, ["a.txt", "b.json"]);
                assert_eq!(q.input_settings.annotations, ["list[int]"]);
            }
            other => panic!("wrong command: {other:?}"),
        }
    }

    #[test]
    fn requires_annotations_or_inputs() {
        assert!(CommandLineInterface::try_parse_from(["annotype", "inspect"]).is_err());
        assert!(CommandLineInterface::try_parse_from(["annotype", "inspect", "-i", "fields.txt"]).is_ok());
    }

    #[test]
    fn evaluate_each_query() {
        let r = evaluate(Query::Unwrap, &entry("Optional[int]"));
        assert_eq!(r.summary, "int");
        assert_eq!(r.result.unwrap()["canonical"], "int");

        let r = evaluate(Query::Nested, &entry("List[List[str]]"));
        assert_eq!(r.result, Some(Value::Bool(true)));

        let r = evaluate(Query::Base, &entry("list"));
        assert_eq!(r.summary, "list");

        let r = evaluate(Query::Inspect, &entry("int | None"));
        let v = r.result.unwrap();
        assert_eq!(v["optional"], true);
        assert_eq!(v["canonical"], "int | None");
    }

    #[test]
    fn evaluate_reports_parse_errors() {
        let r = evaluate(Query::Base, &entry("list[int"));
        assert!(r.result.is_none());
        assert_eq!(r.error.as_deref(), Some("unexpected end of annotation"));
    }

    #[test]
    fn json_records_skip_empty_fields() {
        let r = evaluate(Query::Nested, &entry("list[int]"));
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v, json!({ "label": "arg:1", "annotation": "list[int]", "result": false }));
    }

    #[test]
    fn writes_report_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested/report.json");
        let cli = CommandLineInterface::try_parse_from([
            "annotype", "unwrap", "Optional[str]", "--format", "json",
            "-o", out.to_str().unwrap(),
        ])
        .unwrap();
        assert_eq!(cli.run().unwrap(), 0);

        let written: Value = serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(written[0]["result"]["canonical"], "str");
    }

    #[test]
    fn parse_failures_set_exit_status() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("report.txt");
        let out = out.to_str().unwrap();

        let cli = CommandLineInterface::try_parse_from(["annotype", "base", "int", "list[", "-o", out]).unwrap();
        assert_eq!(cli.run().unwrap(), 1);

        let cli = CommandLineInterface::try_parse_from([
            "annotype", "base", "int", "list[", "--fail-fast", "-o", out,
        ])
        .unwrap();
        assert!(cli.run().is_err());
    }
}
