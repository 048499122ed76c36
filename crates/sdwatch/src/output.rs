//! Output formatting: text, JSON, YAML, plain.
//!
//! Renders snapshots in the format selected by `--output`. Text is the
//! indicator view, structured formats serialize a `StatusView`, plain
//! emits the severity alone.

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use serde::Serialize;

use sdwatch_core::{HealthSnapshot, Severity};

use crate::cli::{ColorMode, OutputFormat};
use crate::error::CliError;
use crate::present::StatusView;

// ── Color helpers ────────────────────────────────────────────────────

/// Determine whether color output should be enabled.
pub fn should_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

fn indicator(severity: Severity, color: bool) -> String {
    const DOT: &str = "●";
    if !color {
        return DOT.into();
    }
    match severity {
        Severity::Green => DOT.green().to_string(),
        Severity::Yellow => DOT.yellow().to_string(),
        Severity::Red => DOT.red().to_string(),
    }
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render one snapshot in the chosen format.
pub fn render_snapshot(
    format: OutputFormat,
    snapshot: &HealthSnapshot,
    color: bool,
) -> Result<String, CliError> {
    let view = StatusView::new(snapshot);
    match format {
        OutputFormat::Text => Ok(render_text(&view, color)),
        OutputFormat::Json => render_json_pretty(&view),
        OutputFormat::JsonCompact => render_json_compact(&view),
        OutputFormat::Yaml => render_yaml(&view),
        OutputFormat::Plain => Ok(snapshot.severity.to_string()),
    }
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
    let _ = stdout.flush();
}

// ── Format-specific renderers ────────────────────────────────────────

fn render_text(view: &StatusView<'_>, color: bool) -> String {
    let dot = indicator(view.snapshot.severity, color);
    let label = if color {
        view.label.bold().to_string()
    } else {
        view.label.clone()
    };

    let summary = if color && !view.snapshot.failed_units.is_empty() {
        view.summary.red().to_string()
    } else {
        view.summary.clone()
    };

    format!("{dot} {label}\n{summary}")
}

/// Pretty-printed JSON.
pub(crate) fn render_json_pretty<T: Serialize + ?Sized>(data: &T) -> Result<String, CliError> {
    serde_json::to_string_pretty(data).map_err(|e| CliError::Render {
        format: "json",
        reason: e.to_string(),
    })
}

/// Compact single-line JSON.
pub(crate) fn render_json_compact<T: Serialize + ?Sized>(data: &T) -> Result<String, CliError> {
    serde_json::to_string(data).map_err(|e| CliError::Render {
        format: "json",
        reason: e.to_string(),
    })
}

/// YAML output.
pub(crate) fn render_yaml<T: Serialize + ?Sized>(data: &T) -> Result<String, CliError> {
    serde_yaml::to_string(data).map_err(|e| CliError::Render {
        format: "yaml",
        reason: e.to_string(),
    })
}
