//! Read-only reporting commands: dashboard, trace, check, audit and jobs

use anyhow::Result;
use qa_core::{
    AuditEvent, CoreError, EntityKind, ExecutionId, Ledger, ProjectId, RequirementId, ScenarioId,
    ScriptId, TestCaseId, TraceNode,
};

use crate::cli::{AuditArgs, DashboardArgs, GlobalArgs, JobsArgs, TraceArgs};
use crate::commands::common::{
    entity_kind_for, fmt_list, fmt_percent, fmt_time, print_json, print_table, ExitCode,
};
use crate::context::Workspace;

/// Show dashboard metrics
pub(crate) async fn dashboard(args: &DashboardArgs, global: &GlobalArgs) -> Result<()> {
    let ws = Workspace::open(global)?;
    if let Some(project) = &args.project {
        ws.ledger.project(project)?;
    }
    let metrics = ws
        .ledger
        .dashboard(args.project.as_ref(), ws.config.metrics.flaky_window);
    if ws.json() {
        return print_json(&metrics);
    }

    match &metrics.project_id {
        Some(id) => println!("Dashboard for {id}"),
        None => println!("Dashboard for all projects"),
    }
    println!("  automation rate:   {}", fmt_percent(metrics.automation_rate));
    println!("  pass rate:         {}", fmt_percent(metrics.pass_rate));
    println!(
        "  pending approvals: {} ({} scenarios, {} test cases, {} scripts)",
        metrics.pending_approvals.total(),
        metrics.pending_approvals.scenarios,
        metrics.pending_approvals.test_cases,
        metrics.pending_approvals.scripts
    );
    let flaky: Vec<String> = metrics.flaky_tests.iter().map(|t| t.to_string()).collect();
    println!("  flaky tests:       {}", fmt_list(&flaky));
    println!("  token usage:       {}", metrics.token_usage);
    Ok(())
}

/// Current status of a traced entity, for display
fn status_of(ledger: &Ledger, node: &TraceNode) -> String {
    let id = node.id.as_str();
    let status = match node.kind {
        EntityKind::Project => ledger
            .project(&ProjectId::new(id))
            .map(|p| p.status.to_string()),
        EntityKind::Requirement => ledger
            .requirement(&RequirementId::new(id))
            .map(|r| format!("{} {}, coverage {}", r.version, r.status, r.coverage_status)),
        EntityKind::Scenario => ledger
            .scenario(&ScenarioId::new(id))
            .map(|s| s.status.to_string()),
        EntityKind::TestCase => ledger
            .test_case(&TestCaseId::new(id))
            .map(|c| format!("{} {}", c.version, c.status)),
        EntityKind::Script => ledger
            .script(&ScriptId::new(id))
            .map(|s| format!("{} {}", s.version, s.status)),
        EntityKind::Execution => ledger
            .execution(&ExecutionId::new(id))
            .map(|e| e.status.to_string()),
    };
    status.unwrap_or_default()
}

/// Show the traceability chain above an entity and everything below it
pub(crate) async fn trace(args: &TraceArgs, global: &GlobalArgs) -> Result<()> {
    let ws = Workspace::open(global)?;
    let id = args.id.trim().to_ascii_uppercase();
    let Some(kind) = entity_kind_for(&id) else {
        anyhow::bail!(
            "Cannot trace '{}': expected an id starting with PROJ-, REQ-, SCN-, TC-, SCR- or EXE-",
            args.id
        );
    };
    let graph = ws.ledger.trace_graph();
    let root = TraceNode::new(kind, id.as_str());
    if !graph.contains(&root) {
        return Err(CoreError::NotFound {
            entity: kind.to_string(),
            id,
        }
        .into());
    }

    // an execution has one parent per planned script; follow the first
    let mut upstream = Vec::new();
    let mut cursor = &root;
    while let Some(parent) = graph.parents(cursor).into_iter().next() {
        upstream.push(parent);
        cursor = parent;
    }
    upstream.reverse();
    let tree = graph.tree(&root);

    if ws.json() {
        let below: Vec<serde_json::Value> = tree
            .iter()
            .map(|(depth, node)| {
                serde_json::json!({
                    "depth": depth,
                    "kind": node.kind,
                    "id": node.id,
                    "status": status_of(&ws.ledger, node),
                })
            })
            .collect();
        return print_json(&serde_json::json!({ "upstream": upstream, "tree": below }));
    }

    if !upstream.is_empty() {
        let chain: Vec<String> = upstream.iter().map(|n| n.id.clone()).collect();
        println!("{} >", chain.join(" > "));
    }
    for (depth, node) in tree {
        let status = status_of(&ws.ledger, node);
        let indent = "  ".repeat(depth);
        if status.is_empty() {
            println!("{indent}{node}");
        } else {
            println!("{indent}{node}  [{status}]");
        }
    }
    Ok(())
}

/// Verify cached values and references; exits non-zero on drift
pub(crate) async fn check(global: &GlobalArgs) -> Result<()> {
    let ws = Workspace::open(global)?;
    let issues = ws.ledger.check_integrity();
    let graph_error = ws.ledger.trace_graph().validate().err();

    if ws.json() {
        print_json(&serde_json::json!({
            "revision": ws.ledger.revision(),
            "issues": issues,
            "graph": graph_error.as_ref().map(|e| e.to_string()),
        }))?;
    } else if issues.is_empty() && graph_error.is_none() {
        println!(
            "Ledger revision {} is consistent ({} audit events)",
            ws.ledger.revision(),
            ws.ledger.audit_log().len()
        );
    } else {
        for issue in &issues {
            println!("  {issue}");
        }
        if let Some(err) = &graph_error {
            println!("  {err}");
        }
        let count = issues.len() + usize::from(graph_error.is_some());
        println!("\n{count} integrity issue(s) found");
    }

    if issues.is_empty() && graph_error.is_none() {
        Ok(())
    } else {
        Err(ExitCode(1).into())
    }
}

/// Show the audit log
pub(crate) async fn audit(args: &AuditArgs, global: &GlobalArgs) -> Result<()> {
    let ws = Workspace::open(global)?;
    let mut events: Vec<&AuditEvent> = match &args.entity {
        Some(id) => ws.ledger.audit_for(id.trim()).collect(),
        None => ws.ledger.audit_log().iter().collect(),
    };
    if let Some(limit) = args.limit {
        let skip = events.len().saturating_sub(limit);
        events.drain(..skip);
    }
    if ws.json() {
        return print_json(&events);
    }
    if events.is_empty() {
        println!("No audit events.");
        return Ok(());
    }
    let rows: Vec<Vec<String>> = events
        .iter()
        .map(|e| {
            vec![
                e.seq.to_string(),
                fmt_time(e.at),
                e.actor.clone(),
                e.entity.to_string(),
                e.entity_id.clone(),
                e.action.clone(),
                e.transition(),
                e.version.map_or_else(String::new, |v| v.to_string()),
            ]
        })
        .collect();
    print_table(
        &["SEQ", "AT", "ACTOR", "ENTITY", "ID", "ACTION", "STATUS", "VERSION"],
        &rows,
    );
    Ok(())
}

/// List generation receipts
pub(crate) async fn jobs(args: &JobsArgs, global: &GlobalArgs) -> Result<()> {
    let ws = Workspace::open(global)?;
    if let Some(token) = &args.token {
        let receipt = ws.ledger.receipt(token)?;
        if ws.json() {
            return print_json(receipt);
        }
        println!("{}  {} {} ({})", receipt.token, receipt.operation, receipt.target, receipt.state);
        println!("  project:  {}", receipt.project_id);
        println!("  produced: {}", fmt_list(&receipt.produced));
        println!("  tokens:   {}", receipt.tokens_used);
        println!("  created:  {}", fmt_time(receipt.created_at));
        println!("  updated:  {}", fmt_time(receipt.updated_at));
        if let Some(error) = &receipt.error {
            println!("  error:    {error}");
        }
        return Ok(());
    }

    let receipts = ws.ledger.receipts(args.project.as_ref());
    if ws.json() {
        return print_json(&receipts);
    }
    if receipts.is_empty() {
        println!("No generation requests recorded.");
        return Ok(());
    }
    let rows: Vec<Vec<String>> = receipts
        .iter()
        .map(|r| {
            vec![
                r.token.to_string(),
                r.operation.to_string(),
                r.target.clone(),
                r.state.to_string(),
                r.tokens_used.to_string(),
                r.produced.len().to_string(),
                r.error.clone().unwrap_or_default(),
            ]
        })
        .collect();
    print_table(
        &["TOKEN", "OPERATION", "TARGET", "STATE", "TOKENS", "PRODUCED", "ERROR"],
        &rows,
    );
    println!(
        "\nTotal token usage: {}",
        ws.ledger.token_usage(args.project.as_ref())
    );
    Ok(())
}
