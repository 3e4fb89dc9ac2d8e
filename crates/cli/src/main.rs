use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use histree::timestamp::{format_timestamp, TimestampFormat};
use histree::{HistoryTree, Timelike, TracingReporter, Value};
use serde_json::{json, Value as JsonValue};
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "histree", version, about = "Query value histories loaded from CSV/YAML sources")]
struct Cli {
    /// Directory scanned recursively for .csv, .yaml and .yml sources.
    #[arg(long, env = "HISTREE_DATA_DIR", default_value = "./data")]
    data_dir: PathBuf,

    /// Print JSON instead of text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Every value live at TIMESTAMP under PATH, keyed relative to PATH.
    Get {
        path: String,
        /// Epoch seconds, or a UTC string such as "2022-03-01 08:00".
        timestamp: String,
    },
    /// The chronological history of exactly PATH.
    History { path: String },
    /// Immediate children of PATH (the root when omitted).
    Browse {
        #[arg(default_value = "")]
        path: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let tree = histree_loader::build_db(&cli.data_dir, &TracingReporter).with_context(|| {
        format!("failed to build history from {}", cli.data_dir.display())
    })?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    run(&tree, &cli.command, cli.json, &mut out)
}

fn run<W: Write>(tree: &HistoryTree, command: &Command, as_json: bool, out: &mut W) -> Result<()> {
    debug!(?command, "running command");
    match command {
        Command::Get { path, timestamp } => {
            let values = tree
                .get(path, parse_timelike(timestamp))
                .with_context(|| format!("bad timestamp {timestamp:?}"))?;
            if as_json {
                let map: serde_json::Map<String, JsonValue> =
                    values.iter().map(|(k, v)| (k.clone(), to_json(v))).collect();
                writeln!(out, "{}", JsonValue::Object(map))?;
            } else {
                for (key, value) in &values {
                    writeln!(out, "{key} = {value}")?;
                }
            }
        }
        Command::History { path } => {
            let history = tree.get_history(path);
            if as_json {
                let entries: Vec<JsonValue> = history
                    .iter()
                    .map(|(value, range)| {
                        json!({ "value": to_json(value), "start": range.start, "end": range.end })
                    })
                    .collect();
                writeln!(out, "{}", JsonValue::Array(entries))?;
            } else {
                for (value, range) in &history {
                    writeln!(
                        out,
                        "[{}, {})  {value}",
                        render_time(range.start),
                        render_time(range.end)
                    )?;
                }
            }
        }
        Command::Browse { path } => {
            let browser = tree
                .browse_at(path)
                .with_context(|| format!("unknown path {path:?}"))?;
            if as_json {
                let body = json!({
                    "path": browser.current_path(),
                    "children": browser.children(),
                    "records": browser.history().len(),
                });
                writeln!(out, "{body}")?;
            } else {
                for child in browser.children() {
                    writeln!(out, "{child}")?;
                }
                if !browser.history().is_empty() {
                    writeln!(out, "({} record(s) at {browser})", browser.history().len())?;
                }
            }
        }
    }
    out.flush()?;
    Ok(())
}

fn parse_timelike(text: &str) -> Timelike {
    text.parse::<f64>()
        .map(Timelike::Seconds)
        .unwrap_or_else(|_| Timelike::from(text))
}

fn render_time(seconds: f64) -> String {
    format_timestamp(seconds, TimestampFormat::IsoZulu).unwrap_or_else(|_| seconds.to_string())
}

fn to_json(value: &Value) -> JsonValue {
    match value {
        Value::Null => JsonValue::Null,
        Value::Boolean(b) => json!(b),
        Value::Integer(n) => json!(n),
        Value::Number(n) => json!(n),
        Value::Text(s) => json!(s),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> HistoryTree {
        let mut tree = HistoryTree::new();
        tree.add("sensor.temp", 5.0, (1000, 2000)).unwrap();
        tree.add("sensor.humid", 60, (1500, 2500)).unwrap();
        tree
    }

    fn output(command: Command, as_json: bool) -> String {
        let mut out = Vec::new();
        run(&tree(), &command, as_json, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn get_prints_keys_relative_to_path() {
        let text = output(
            Command::Get {
                path: "sensor".into(),
                timestamp: "1600".into(),
            },
            false,
        );
        assert_eq!(text, "humid = 60\ntemp = 5.0\n");
    }

    #[test]
    fn history_renders_utc_bounds() {
        let text = output(
            Command::History {
                path: "sensor.temp".into(),
            },
            false,
        );
        assert_eq!(text, "[1970-01-01T00:16:40Z, 1970-01-01T00:33:20Z)  5.0\n");
    }

    #[test]
    fn browse_json_lists_children() {
        let text = output(Command::Browse { path: "sensor".into() }, true);
        let body: JsonValue = serde_json::from_str(&text).unwrap();
        assert_eq!(body["path"], "sensor");
        assert_eq!(body["children"], json!(["humid", "temp"]));
        assert_eq!(body["records"], 0);
    }

    #[test]
    fn browse_unknown_path_fails() {
        let mut out = Vec::new();
        let err = run(
            &tree(),
            &Command::Browse { path: "nope".into() },
            false,
            &mut out,
        )
        .unwrap_err();
        assert!(err.to_string().contains("unknown path"));
    }

    #[test]
    fn timestamps_parse_as_seconds_or_strings() {
        assert_eq!(parse_timelike("1645142400.1"), Timelike::Seconds(1645142400.1));
        assert_eq!(
            parse_timelike("2022-03-01 08:00"),
            Timelike::Text("2022-03-01 08:00".into())
        );
    }
}
