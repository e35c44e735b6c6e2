//! Test case commands

use anyhow::{Context, Result};
use chrono::Utc;
use qa_core::{Priority, StepDraft, TestCase, TestCaseDraft, TestCaseId, TestType};
use qa_gen::Workflow;

use crate::cli::{
    CaseArgs, CaseCommands, CaseContentArgs, CaseGenerateArgs, CaseListArgs, CaseShowArgs,
    GlobalArgs,
};
use crate::commands::common::{confirm, fmt_list, fmt_time, print_json, print_outcome, print_table};
use crate::context::Workspace;

const SNAPSHOT_MARKER: &str = "[snapshot]";

/// Execute a test case subcommand
pub(crate) async fn execute(args: &CaseArgs, global: &GlobalArgs) -> Result<()> {
    let mut ws = Workspace::open(global)?;
    match &args.command {
        CaseCommands::Generate(generate) => return generate_test_cases(&mut ws, generate).await,
        CaseCommands::Add(add) => {
            let draft = build_draft(&ws, &add.content, None)?;
            let id = ws
                .ledger
                .add_manual_test_case(&add.scenario, draft, Utc::now())?;
            let case = ws.ledger.test_case(&id)?;
            confirm(&ws, &format!("Added test case {id} to {}", add.scenario), case)?;
        }
        CaseCommands::Edit(edit) => {
            let base = TestCaseDraft::from(ws.ledger.test_case(&edit.id)?);
            let draft = build_draft(&ws, &edit.content, Some(base))?;
            let version = ws
                .ledger
                .edit_test_case(&edit.id, edit.expected, draft, Utc::now())?;
            let case = ws.ledger.test_case(&edit.id)?;
            confirm(&ws, &format!("Edited {} to {version}", edit.id), case)?;
        }
        CaseCommands::Approve(approve) => {
            ws.ledger
                .approve_test_case(&approve.id, approve.expected, Utc::now())?;
            let case = ws.ledger.test_case(&approve.id)?;
            let requirement = ws.ledger.requirement(&case.requirement_id)?;
            confirm(
                &ws,
                &format!(
                    "Approved test case {} ({}); {} coverage is {}",
                    approve.id, case.version, requirement.id, requirement.coverage_status
                ),
                case,
            )?;
        }
        CaseCommands::Reject(reject) => {
            ws.ledger
                .reject_test_case(&reject.id, reject.expected, Utc::now())?;
            let case = ws.ledger.test_case(&reject.id)?;
            confirm(&ws, &format!("Rejected test case {}", reject.id), case)?;
        }
        CaseCommands::Show(show) => show_test_case(&ws, show)?,
        CaseCommands::History(history) => show_history(&ws, &history.id)?,
        CaseCommands::List(list) => list_test_cases(&ws, list)?,
    }
    ws.save()
}

async fn generate_test_cases(ws: &mut Workspace, args: &CaseGenerateArgs) -> Result<()> {
    let backend = ws.backend()?;
    let validator = ws.validator();
    let result = Workflow::new(&mut ws.ledger, &backend, &validator)
        .generate_test_cases(&args.requirement, args.token.clone(), Utc::now())
        .await;
    ws.save()?;
    let outcome = result?;
    print_outcome(ws, "Generated test cases", &outcome)?;
    if !ws.json() {
        let requirement = ws.ledger.requirement(&args.requirement)?;
        println!("{} is now {}", requirement.id, requirement.status);
    }
    Ok(())
}

/// Parse `action`, `action => expected` and a trailing `[snapshot]` marker
pub(crate) fn parse_step(text: &str) -> StepDraft {
    let mut text = text.trim();
    let take_snapshot = text.ends_with(SNAPSHOT_MARKER);
    if take_snapshot {
        text = text[..text.len() - SNAPSHOT_MARKER.len()].trim_end();
    }
    let (action, expected_result) = match text.split_once("=>") {
        Some((action, expected)) => (action.trim(), expected.trim()),
        None => (text, ""),
    };
    StepDraft {
        action: action.to_string(),
        expected_result: expected_result.to_string(),
        take_snapshot,
    }
}

/// Merge content flags over a file or an existing test case.
///
/// List flags replace the whole list when given at least once.
pub(crate) fn build_draft(
    ws: &Workspace,
    content: &CaseContentArgs,
    base: Option<TestCaseDraft>,
) -> Result<TestCaseDraft> {
    let base = match &content.file {
        Some(file) => {
            let path = ws.resolve(file);
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            Some(
                serde_yaml::from_str::<TestCaseDraft>(&text)
                    .with_context(|| format!("Failed to parse test case in {}", path.display()))?,
            )
        }
        None => base,
    };
    merge_draft(content, base)
}

pub(crate) fn merge_draft(
    content: &CaseContentArgs,
    base: Option<TestCaseDraft>,
) -> Result<TestCaseDraft> {
    let mut draft = match base {
        Some(draft) => draft,
        None => TestCaseDraft {
            title: content
                .title
                .clone()
                .context("--title is required when no --file is given")?,
            priority: Priority::Medium,
            test_type: TestType::Ui,
            preconditions: Vec::new(),
            steps: Vec::new(),
            expected_results: Vec::new(),
            postconditions: Vec::new(),
            tags: Vec::new(),
        },
    };
    if let Some(title) = &content.title {
        draft.title = title.clone();
    }
    if let Some(priority) = content.priority {
        draft.priority = priority;
    }
    if let Some(test_type) = content.test_type {
        draft.test_type = test_type;
    }
    replace_if_given(&mut draft.preconditions, &content.preconditions);
    replace_if_given(&mut draft.expected_results, &content.expected_results);
    replace_if_given(&mut draft.postconditions, &content.postconditions);
    replace_if_given(&mut draft.tags, &content.tags);
    if !content.steps.is_empty() {
        draft.steps = content.steps.iter().map(|s| parse_step(s)).collect();
    }
    Ok(draft)
}

fn replace_if_given(target: &mut Vec<String>, given: &[String]) {
    if !given.is_empty() {
        *target = given.to_vec();
    }
}

fn show_test_case(ws: &Workspace, args: &CaseShowArgs) -> Result<()> {
    let case = match args.version {
        Some(version) => ws
            .ledger
            .test_case_history(&args.id)?
            .get(version)
            .with_context(|| format!("{} has no version {version}", args.id))?,
        None => ws.ledger.test_case(&args.id)?,
    };
    if ws.json() {
        return print_json(case);
    }

    println!("{}  {} ({})", case.id, case.title, case.version);
    println!("  scenario:    {} ({})", case.scenario_id, case.requirement_id);
    println!("  status:      {}", case.status);
    println!("  priority:    {}", case.priority);
    println!("  type:        {}", case.test_type);
    println!("  tags:        {}", fmt_list(&case.tags));
    println!("  updated:     {}", fmt_time(case.updated_at));
    println!("  preconditions:  {}", fmt_list(&case.preconditions));
    println!();
    let rows: Vec<Vec<String>> = case
        .steps
        .iter()
        .map(|s| {
            vec![
                s.step_number.to_string(),
                s.action.clone(),
                s.expected_result.clone(),
                if s.take_snapshot { "yes" } else { "" }.to_string(),
            ]
        })
        .collect();
    print_table(&["STEP", "ACTION", "EXPECTED", "SNAPSHOT"], &rows);
    println!();
    println!("  expected results: {}", fmt_list(&case.expected_results));
    println!("  postconditions:   {}", fmt_list(&case.postconditions));
    Ok(())
}

fn show_history(ws: &Workspace, id: &TestCaseId) -> Result<()> {
    let history = ws.ledger.test_case_history(id)?;
    if ws.json() {
        return print_json(history.versions());
    }
    let rows: Vec<Vec<String>> = history
        .versions()
        .iter()
        .map(|c| {
            vec![
                c.version.to_string(),
                c.status.to_string(),
                c.title.clone(),
                c.steps.len().to_string(),
                fmt_time(c.updated_at),
            ]
        })
        .collect();
    print_table(&["VERSION", "STATUS", "TITLE", "STEPS", "UPDATED"], &rows);
    Ok(())
}

fn list_test_cases(ws: &Workspace, args: &CaseListArgs) -> Result<()> {
    let cases: Vec<&TestCase> = match &args.scenario {
        Some(scenario) => ws.ledger.test_cases_for_scenario(scenario).collect(),
        None => ws.ledger.test_cases(args.requirement.as_ref()).collect(),
    };
    let cases: Vec<&TestCase> = cases
        .into_iter()
        .filter(|c| {
            args.requirement
                .as_ref()
                .map_or(true, |r| &c.requirement_id == r)
        })
        .collect();
    if ws.json() {
        return print_json(&cases);
    }
    if cases.is_empty() {
        println!("No test cases found.");
        return Ok(());
    }
    let rows: Vec<Vec<String>> = cases
        .iter()
        .map(|c| {
            vec![
                c.id.to_string(),
                c.scenario_id.to_string(),
                c.title.clone(),
                c.priority.to_string(),
                c.test_type.to_string(),
                c.status.to_string(),
                c.version.to_string(),
            ]
        })
        .collect();
    print_table(
        &["ID", "SCENARIO", "TITLE", "PRIORITY", "TYPE", "STATUS", "VERSION"],
        &rows,
    );
    Ok(())
}

#[cfg(test)]
#[path = "test_case_test.rs"]
mod tests;
