//! Requirement commands

use anyhow::{Context, Result};
use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use qa_core::lifecycle::requirement_next_actions;
use qa_core::{NewRequirement, ProjectId, Requirement, RequirementId, RequirementRevision};
use qa_gen::Workflow;
use serde::Deserialize;
use std::path::PathBuf;

use crate::cli::{
    GlobalArgs, ReqArgs, ReqClarifyArgs, ReqCommands, ReqGenerateArgs, ReqImportArgs,
    ReqIngestArgs, ReqReviseArgs,
};
use crate::commands::common::{
    confirm, fmt_list, fmt_time, print_json, print_outcome, print_table,
};
use crate::context::Workspace;

/// Execute a requirement subcommand
pub(crate) async fn execute(args: &ReqArgs, global: &GlobalArgs) -> Result<()> {
    let mut ws = Workspace::open(global)?;
    match &args.command {
        ReqCommands::Ingest(ingest) => ingest_requirement(&mut ws, ingest)?,
        ReqCommands::Import(import) => import_requirements(&mut ws, import)?,
        ReqCommands::List(list) => list_requirements(&ws, list.project.as_ref())?,
        ReqCommands::Show(show) => show_requirement(&ws, &show.id)?,
        ReqCommands::History(history) => show_history(&ws, &history.id)?,
        ReqCommands::Analyze(analyze) => return analyze_requirement(&mut ws, analyze).await,
        ReqCommands::Clarify(clarify) => clarify_requirement(&mut ws, clarify)?,
        ReqCommands::Revise(revise) => revise_requirement(&mut ws, revise)?,
        ReqCommands::Approve(approve) => {
            ws.ledger
                .approve_requirement(&approve.id, approve.expected, Utc::now())?;
            let requirement = ws.ledger.requirement(&approve.id)?;
            confirm(&ws, &format!("Approved requirement {}", approve.id), requirement)?;
        }
        ReqCommands::Archive(archive) => {
            ws.ledger.archive_requirement(&archive.id, Utc::now())?;
            let requirement = ws.ledger.requirement(&archive.id)?;
            confirm(&ws, &format!("Archived requirement {}", archive.id), requirement)?;
        }
    }
    ws.save()
}

fn ingest_requirement(ws: &mut Workspace, args: &ReqIngestArgs) -> Result<()> {
    let input = NewRequirement {
        title: args.title.clone(),
        description: args.description.clone(),
        acceptance_criteria: args.criteria.clone(),
        release: args.release.clone(),
        owner: args.owner.clone(),
    };
    let id = ws.ledger.ingest_requirement(&args.project, input, Utc::now())?;
    let requirement = ws.ledger.requirement(&id)?;
    confirm(
        ws,
        &format!("Ingested requirement {id} ({}) as {}", requirement.title, requirement.status),
        requirement,
    )
}

/// An import file holds either a bare list or a `requirements:` key
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ImportFile {
    List(Vec<NewRequirement>),
    Keyed { requirements: Vec<NewRequirement> },
}

impl ImportFile {
    fn into_requirements(self) -> Vec<NewRequirement> {
        match self {
            ImportFile::List(items) | ImportFile::Keyed { requirements: items } => items,
        }
    }
}

fn expand_patterns(ws: &Workspace, patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for pattern in patterns {
        let full = ws.resolve(std::path::Path::new(pattern));
        let full = full.to_string_lossy();
        let mut matched = false;
        for entry in glob::glob(&full).with_context(|| format!("Invalid glob pattern: {pattern}"))? {
            let path = entry.with_context(|| format!("Failed to read match for {pattern}"))?;
            if path.is_file() {
                matched = true;
                files.push(path);
            }
        }
        if !matched {
            anyhow::bail!("No requirement files match '{pattern}'");
        }
    }
    files.sort();
    files.dedup();
    Ok(files)
}

fn import_requirements(ws: &mut Workspace, args: &ReqImportArgs) -> Result<()> {
    let files = expand_patterns(ws, &args.patterns)?;

    // Parse everything first so a bad file imports nothing
    let mut batches = Vec::with_capacity(files.len());
    for path in &files {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let file: ImportFile = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse requirements in {}", path.display()))?;
        batches.push((path, file.into_requirements()));
    }
    let total: usize = batches.iter().map(|(_, items)| items.len()).sum();

    let progress = if ws.json() {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new(total as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        pb
    };

    let mut imported: Vec<RequirementId> = Vec::with_capacity(total);
    for (path, items) in batches {
        for (index, input) in items.into_iter().enumerate() {
            progress.set_message(input.title.clone());
            let id = ws
                .ledger
                .ingest_requirement(&args.project, input, Utc::now())
                .with_context(|| {
                    format!("Requirement #{} in {} was rejected", index + 1, path.display())
                })?;
            imported.push(id);
            progress.inc(1);
        }
    }
    progress.finish_and_clear();

    if ws.json() {
        return print_json(&imported);
    }
    println!(
        "Imported {} requirement(s) from {} file(s) into {}",
        imported.len(),
        files.len(),
        args.project
    );
    for id in &imported {
        let requirement = ws.ledger.requirement(id)?;
        println!("  {id}  {}", requirement.title);
    }
    Ok(())
}

fn list_requirements(ws: &Workspace, project: Option<&ProjectId>) -> Result<()> {
    let requirements: Vec<&Requirement> = ws.ledger.requirements(project).collect();
    if ws.json() {
        return print_json(&requirements);
    }
    if requirements.is_empty() {
        println!("No requirements found.");
        return Ok(());
    }
    let rows: Vec<Vec<String>> = requirements
        .iter()
        .map(|r| {
            vec![
                r.id.to_string(),
                r.project_id.to_string(),
                r.title.clone(),
                r.status.to_string(),
                r.version.to_string(),
                r.coverage_status.to_string(),
                r.linked_test_cases.to_string(),
            ]
        })
        .collect();
    print_table(
        &["ID", "PROJECT", "TITLE", "STATUS", "VERSION", "COVERAGE", "CASES"],
        &rows,
    );
    Ok(())
}

fn show_requirement(ws: &Workspace, id: &RequirementId) -> Result<()> {
    let requirement = ws.ledger.requirement(id)?;
    let coverage = ws.ledger.compute_coverage(id);
    let next = requirement_next_actions(requirement.status);
    if ws.json() {
        return print_json(&serde_json::json!({
            "requirement": requirement,
            "coverage": coverage,
            "next_actions": next,
        }));
    }

    println!("{}  {} ({})", requirement.id, requirement.title, requirement.version);
    println!("  project:   {}", requirement.project_id);
    println!("  status:    {}", requirement.status);
    println!("  owner:     {}", requirement.owner);
    println!("  release:   {}", requirement.release);
    println!(
        "  coverage:  {} ({}/{} scenarios with an approved test case)",
        coverage.status, coverage.covered_scenarios, coverage.scenarios
    );
    println!("  modified:  {}", fmt_time(requirement.last_modified));
    println!(
        "  next:      {}",
        if next.is_empty() { "-".to_string() } else { next.join(", ") }
    );
    println!("\n{}", requirement.description);
    if !requirement.acceptance_criteria.is_empty() {
        println!("\nAcceptance criteria:");
        for criterion in &requirement.acceptance_criteria {
            println!("  - {criterion}");
        }
    }
    if let Some(analysis) = &requirement.analysis {
        println!("\nAnalysis:");
        for (label, items) in [
            ("functional flows", &analysis.functional_flows),
            ("preconditions", &analysis.preconditions),
            ("postconditions", &analysis.postconditions),
            ("business rules", &analysis.business_rules),
            ("dependencies", &analysis.dependencies),
            ("authentication", &analysis.authentication_requirements),
            ("validation rules", &analysis.validation_rules),
            ("constraints", &analysis.constraints),
        ] {
            if !items.is_empty() {
                println!("  {label}: {}", fmt_list(items));
            }
        }
    }
    if !requirement.issues.is_empty() {
        println!("\nDetected issues:");
        let rows: Vec<Vec<String>> = requirement
            .issues
            .iter()
            .map(|i| {
                vec![
                    i.kind.to_string(),
                    i.severity.to_string(),
                    i.description.clone(),
                    i.suggestion.clone(),
                ]
            })
            .collect();
        print_table(&["KIND", "SEVERITY", "DESCRIPTION", "SUGGESTION"], &rows);
    }
    if !requirement.clarifications.is_empty() {
        println!("\nClarifications:");
        for note in &requirement.clarifications {
            println!("  - {note}");
        }
    }
    let scenarios: Vec<Vec<String>> = ws
        .ledger
        .scenarios_for(id)
        .map(|s| {
            vec![
                s.id.to_string(),
                s.title.clone(),
                s.status.to_string(),
                ws.ledger.live_cases_for(&s.id).to_string(),
            ]
        })
        .collect();
    if !scenarios.is_empty() {
        println!("\nScenarios:");
        print_table(&["ID", "TITLE", "STATUS", "CASES"], &scenarios);
    }
    Ok(())
}

fn show_history(ws: &Workspace, id: &RequirementId) -> Result<()> {
    let history = ws.ledger.requirement_history(id)?;
    if ws.json() {
        return print_json(history.versions());
    }
    let rows: Vec<Vec<String>> = history
        .versions()
        .iter()
        .map(|r| {
            let checksum = r.content_checksum();
            vec![
                r.version.to_string(),
                r.status.to_string(),
                r.title.clone(),
                fmt_time(r.last_modified),
                checksum.chars().take(12).collect(),
            ]
        })
        .collect();
    print_table(&["VERSION", "STATUS", "TITLE", "MODIFIED", "CHECKSUM"], &rows);
    Ok(())
}

async fn analyze_requirement(ws: &mut Workspace, args: &ReqGenerateArgs) -> Result<()> {
    let backend = ws.backend()?;
    let validator = ws.validator();
    let result = Workflow::new(&mut ws.ledger, &backend, &validator)
        .analyze(&args.id, args.expected, args.token.clone(), Utc::now())
        .await;
    // The receipt is kept even when the request failed
    ws.save()?;
    let outcome = result?;

    let requirement = ws.ledger.requirement(&args.id)?;
    if ws.json() {
        return print_json(&serde_json::json!({
            "token": outcome.token,
            "replayed": outcome.replayed,
            "tokens_used": outcome.tokens_used,
            "requirement": requirement,
        }));
    }
    print_outcome(ws, "Analyzed", &outcome)?;
    println!("{} is now {}", requirement.id, requirement.status);
    for issue in &requirement.issues {
        println!("  [{}] {}: {}", issue.severity, issue.kind, issue.description);
    }
    Ok(())
}

fn clarify_requirement(ws: &mut Workspace, args: &ReqClarifyArgs) -> Result<()> {
    let status = ws
        .ledger
        .clarify_requirement(&args.id, args.expected, &args.note, Utc::now())?;
    let requirement = ws.ledger.requirement(&args.id)?;
    confirm(
        ws,
        &format!("Recorded clarification on {}; status is {status}", args.id),
        requirement,
    )
}

fn revise_requirement(ws: &mut Workspace, args: &ReqReviseArgs) -> Result<()> {
    let revision = RequirementRevision {
        title: args.title.clone(),
        description: args.description.clone(),
        acceptance_criteria: (!args.criteria.is_empty()).then(|| args.criteria.clone()),
        release: args.release.clone(),
    };
    if revision.is_empty() {
        anyhow::bail!("Nothing to revise: pass at least one of --title, --description, --criterion, --release");
    }
    let version = ws
        .ledger
        .revise_requirement(&args.id, args.expected, revision, Utc::now())?;
    let requirement = ws.ledger.requirement(&args.id)?;
    confirm(
        ws,
        &format!(
            "Revised {} to {version}; status is {}",
            args.id, requirement.status
        ),
        requirement,
    )
}
