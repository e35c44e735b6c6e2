//! Shared utilities for CLI commands

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use qa_core::{EntityKind, ValidationResult};
use qa_gen::GenerationOutcome;
use serde::Serialize;
use std::fmt;

use crate::context::Workspace;

/// Error type representing a non-zero process exit code.
///
/// Use `return Err(ExitCode(N).into())` instead of `std::process::exit(N)`
/// so that the workspace is dropped and the database closed first.
#[derive(Debug)]
pub(crate) struct ExitCode(pub(crate) i32);

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Control flow only; the command already reported the failure.
        write!(f, "")
    }
}

impl std::error::Error for ExitCode {}

/// Print `value` as pretty JSON on stdout
pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize JSON output")?;
    println!("{json}");
    Ok(())
}

/// Calculate column widths for a table given headers and row data.
pub(crate) fn calculate_column_widths(headers: &[&str], rows: &[Vec<String>]) -> Vec<usize> {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (w, cell) in widths.iter_mut().zip(row.iter()) {
            *w = (*w).max(cell.chars().count());
        }
    }
    widths
}

/// Print a left-aligned table with a dashed separator under the header.
pub(crate) fn print_table(headers: &[&str], rows: &[Vec<String>]) {
    let widths = calculate_column_widths(headers, rows);
    let line = |cells: Vec<String>| {
        let parts: Vec<String> = cells
            .iter()
            .zip(&widths)
            .map(|(cell, &w)| format!("{:<width$}", cell, width = w))
            .collect();
        println!("{}", parts.join("  ").trim_end());
    };
    line(headers.iter().map(|h| h.to_string()).collect());
    line(widths.iter().map(|&w| "-".repeat(w)).collect());
    for row in rows {
        line(row.clone());
    }
}

/// `83.3%`, or `-` when there is nothing to measure
pub(crate) fn fmt_percent(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.1}%"))
}

pub(crate) fn fmt_time(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S").to_string()
}

pub(crate) fn fmt_list(items: &[String]) -> String {
    if items.is_empty() {
        "-".to_string()
    } else {
        items.join("; ")
    }
}

/// Entity kind encoded in an identifier's prefix
pub(crate) fn entity_kind_for(id: &str) -> Option<EntityKind> {
    let prefix = id.split_once('-').map(|(p, _)| p)?;
    match prefix.to_ascii_uppercase().as_str() {
        "PROJ" => Some(EntityKind::Project),
        "REQ" => Some(EntityKind::Requirement),
        "SCN" => Some(EntityKind::Scenario),
        "TC" => Some(EntityKind::TestCase),
        "SCR" => Some(EntityKind::Script),
        "EXE" => Some(EntityKind::Execution),
        _ => None,
    }
}

/// Report a generation request
pub(crate) fn print_outcome(ws: &Workspace, what: &str, outcome: &GenerationOutcome) -> Result<()> {
    if ws.json() {
        return print_json(&serde_json::json!({
            "token": outcome.token,
            "produced": outcome.produced,
            "tokens_used": outcome.tokens_used,
            "replayed": outcome.replayed,
        }));
    }
    if outcome.replayed {
        println!(
            "Request '{}' already completed; returning its recorded result",
            outcome.token
        );
    }
    println!(
        "{what}: {} ({} tokens, request {})",
        fmt_list(&outcome.produced),
        outcome.tokens_used,
        outcome.token
    );
    Ok(())
}

/// Print validation results as a table
pub(crate) fn print_validation(results: &[ValidationResult]) {
    let rows: Vec<Vec<String>> = results
        .iter()
        .map(|r| vec![r.rule.clone(), r.status.to_string(), r.message.clone()])
        .collect();
    print_table(&["RULE", "STATUS", "MESSAGE"], &rows);
}

/// Print a one-line confirmation in text mode, or `value` in JSON mode
pub(crate) fn confirm<T: Serialize + ?Sized>(ws: &Workspace, message: &str, value: &T) -> Result<()> {
    if ws.json() {
        print_json(value)
    } else {
        println!("{message}");
        Ok(())
    }
}

#[cfg(test)]
#[path = "common_test.rs"]
mod tests;
