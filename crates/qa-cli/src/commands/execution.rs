//! Execution commands

use anyhow::{Context, Result};
use chrono::Utc;
use qa_core::{Execution, ExecutionId, ProjectId, ResultInput};

use crate::cli::{ExecArgs, ExecCommands, ExecRecordArgs, ExecStartArgs, GlobalArgs};
use crate::commands::common::{fmt_time, print_json, print_table};
use crate::context::Workspace;

/// Execute an exec subcommand
pub(crate) async fn execute(args: &ExecArgs, global: &GlobalArgs) -> Result<()> {
    let mut ws = Workspace::open(global)?;
    match &args.command {
        ExecCommands::Start(start) => start_execution(&mut ws, start)?,
        ExecCommands::Record(record) => record_results(&mut ws, record)?,
        ExecCommands::Finish(finish) => {
            let status = ws.ledger.finish_execution(&finish.id, Utc::now())?;
            report_execution(&ws, &finish.id, &format!("Finished {} as {status}", finish.id))?;
        }
        ExecCommands::Cancel(cancel) => {
            ws.ledger.cancel_execution(&cancel.id, Utc::now())?;
            report_execution(&ws, &cancel.id, &format!("Cancelled {}", cancel.id))?;
        }
        ExecCommands::Show(show) => show_execution(&ws, &show.id)?,
        ExecCommands::List(list) => list_executions(&ws, list.project.as_ref())?,
    }
    ws.save()
}

fn start_execution(ws: &mut Workspace, args: &ExecStartArgs) -> Result<()> {
    let selection = (!args.scripts.is_empty()).then_some(args.scripts.as_slice());
    let triggered_by = args.triggered_by.clone().unwrap_or_default();
    let id = ws
        .ledger
        .start_execution(&args.project, selection, &triggered_by, Utc::now())?;
    let execution = ws.ledger.execution(&id)?;
    if ws.json() {
        return print_json(execution);
    }
    println!(
        "Started {id} in {} with {} planned run(s)",
        args.project,
        execution.plan.len()
    );
    let rows: Vec<Vec<String>> = execution
        .plan
        .iter()
        .map(|p| {
            vec![
                p.test_case_id.to_string(),
                p.script_id.to_string(),
                p.script_version.to_string(),
            ]
        })
        .collect();
    print_table(&["TEST CASE", "SCRIPT", "VERSION"], &rows);
    Ok(())
}

fn read_results(ws: &Workspace, args: &ExecRecordArgs) -> Result<Vec<ResultInput>> {
    if let Some(file) = &args.file {
        let path = ws.resolve(file);
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        // YAML is a superset of JSON, so one parser reads both
        return serde_yaml::from_str(&text)
            .with_context(|| format!("Failed to parse results in {}", path.display()));
    }
    let (Some(case), Some(status)) = (&args.case, args.status) else {
        anyhow::bail!("--case and --status are required when no --file is given");
    };
    let mut input = ResultInput::new(case.clone(), status);
    input.duration_ms = args.duration_ms;
    input.retry_count = args.retries;
    input.failure_category = args.category;
    input.logs = args.logs.clone();
    input.screenshots = args.screenshots.clone();
    input.stack_trace = args.stack_trace.clone();
    Ok(vec![input])
}

fn record_results(ws: &mut Workspace, args: &ExecRecordArgs) -> Result<()> {
    let inputs = read_results(ws, args)?;
    let mut recorded = Vec::with_capacity(inputs.len());
    for input in inputs {
        let case = input.test_case_id.clone();
        let result = ws
            .ledger
            .record_result(&args.id, input, Utc::now())
            .with_context(|| format!("Failed to record the result for {case}"))?;
        recorded.push(result);
    }
    let execution = ws.ledger.execution(&args.id)?;
    let summary = execution.summary();
    if ws.json() {
        return print_json(&serde_json::json!({
            "recorded": recorded,
            "status": execution.status,
            "summary": summary,
        }));
    }
    println!(
        "Recorded {} result(s) on {}: {} passed, {} failed, {} skipped of {} planned; status {}",
        recorded.len(),
        args.id,
        summary.passed,
        summary.failed,
        summary.skipped,
        execution.plan.len(),
        execution.status
    );
    Ok(())
}

fn report_execution(ws: &Workspace, id: &ExecutionId, message: &str) -> Result<()> {
    let execution = ws.ledger.execution(id)?;
    if ws.json() {
        return print_json(&serde_json::json!({
            "execution": execution,
            "summary": execution.summary(),
        }));
    }
    println!("{message}");
    Ok(())
}

fn show_execution(ws: &Workspace, id: &ExecutionId) -> Result<()> {
    let execution = ws.ledger.execution(id)?;
    let summary = execution.summary();
    if ws.json() {
        return print_json(&serde_json::json!({
            "execution": execution,
            "summary": summary,
            "pending": execution.pending_runs(),
        }));
    }

    println!("{}  {} ({})", execution.id, execution.project_id, execution.status);
    println!("  triggered by: {}", execution.triggered_by);
    println!("  started:      {}", fmt_time(execution.start_time));
    if let Some(end) = execution.end_time {
        println!("  ended:        {}", fmt_time(end));
    }
    println!(
        "  results:      {} passed, {} failed, {} skipped ({} total, {} ms)",
        summary.passed, summary.failed, summary.skipped, summary.total, summary.duration_ms
    );
    let pending = execution.pending_runs();
    if !pending.is_empty() {
        println!("  pending:      {}", pending.len());
    }
    println!();

    let rows: Vec<Vec<String>> = execution
        .results()
        .iter()
        .map(|r| {
            vec![
                r.id.to_string(),
                r.test_case_id.to_string(),
                r.script_id.to_string(),
                r.status.to_string(),
                r.duration_ms.to_string(),
                r.retry_count.to_string(),
                r.failure_category
                    .map_or_else(|| "-".to_string(), |c| c.to_string()),
            ]
        })
        .collect();
    if rows.is_empty() {
        println!("No results recorded yet.");
    } else {
        print_table(
            &["RESULT", "TEST CASE", "SCRIPT", "STATUS", "MS", "RETRIES", "CATEGORY"],
            &rows,
        );
    }
    Ok(())
}

fn list_executions(ws: &Workspace, project: Option<&ProjectId>) -> Result<()> {
    let executions: Vec<&Execution> = ws.ledger.executions(project).collect();
    if ws.json() {
        return print_json(&executions);
    }
    if executions.is_empty() {
        println!("No executions found.");
        return Ok(());
    }
    let rows: Vec<Vec<String>> = executions
        .iter()
        .map(|e| {
            let s = e.summary();
            vec![
                e.id.to_string(),
                e.project_id.to_string(),
                e.status.to_string(),
                format!("{}/{}", s.total, e.plan.len()),
                s.passed.to_string(),
                s.failed.to_string(),
                s.skipped.to_string(),
                fmt_time(e.start_time),
            ]
        })
        .collect();
    print_table(
        &["ID", "PROJECT", "STATUS", "REPORTED", "PASSED", "FAILED", "SKIPPED", "STARTED"],
        &rows,
    );
    Ok(())
}
