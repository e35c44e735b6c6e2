//! Scenario commands

use anyhow::Result;
use chrono::Utc;
use qa_core::{RequirementId, ScenarioDraft, TestScenario};
use qa_gen::Workflow;

use crate::cli::{
    GlobalArgs, ScenarioAddArgs, ScenarioArgs, ScenarioCommands, ScenarioEditArgs,
    ScenarioGenerateArgs,
};
use crate::commands::common::{confirm, print_json, print_outcome, print_table};
use crate::context::Workspace;

/// Execute a scenario subcommand
pub(crate) async fn execute(args: &ScenarioArgs, global: &GlobalArgs) -> Result<()> {
    let mut ws = Workspace::open(global)?;
    match &args.command {
        ScenarioCommands::Generate(generate) => return generate_scenarios(&mut ws, generate).await,
        ScenarioCommands::Add(add) => add_scenario(&mut ws, add)?,
        ScenarioCommands::Edit(edit) => edit_scenario(&mut ws, edit)?,
        ScenarioCommands::Approve(approve) => {
            ws.ledger.approve_scenario(&approve.id, Utc::now())?;
            let scenario = ws.ledger.scenario(&approve.id)?;
            confirm(&ws, &format!("Approved scenario {}", approve.id), scenario)?;
        }
        ScenarioCommands::List(list) => list_scenarios(&ws, &list.requirement)?,
    }
    ws.save()
}

async fn generate_scenarios(ws: &mut Workspace, args: &ScenarioGenerateArgs) -> Result<()> {
    let backend = ws.backend()?;
    let validator = ws.validator();
    let result = Workflow::new(&mut ws.ledger, &backend, &validator)
        .generate_scenarios(&args.requirement, args.token.clone(), Utc::now())
        .await;
    ws.save()?;
    let outcome = result?;
    print_outcome(ws, "Generated scenarios", &outcome)?;
    if !ws.json() {
        let requirement = ws.ledger.requirement(&args.requirement)?;
        println!("{} is now {}", requirement.id, requirement.status);
    }
    Ok(())
}

fn add_scenario(ws: &mut Workspace, args: &ScenarioAddArgs) -> Result<()> {
    let draft = ScenarioDraft {
        title: args.title.clone(),
        scenario_type: args.scenario_type,
        description: args.description.clone(),
        preconditions: args.preconditions.clone(),
        expected_outcome: args.expected_outcome.clone(),
    };
    let id = ws
        .ledger
        .add_manual_scenario(&args.requirement, draft, Utc::now())?;
    let scenario = ws.ledger.scenario(&id)?;
    confirm(
        ws,
        &format!("Added scenario {id} to {}", args.requirement),
        scenario,
    )
}

fn edit_scenario(ws: &mut Workspace, args: &ScenarioEditArgs) -> Result<()> {
    let current = ws.ledger.scenario(&args.id)?;
    let draft = ScenarioDraft {
        title: args.title.clone().unwrap_or_else(|| current.title.clone()),
        scenario_type: args.scenario_type.unwrap_or(current.scenario_type),
        description: args
            .description
            .clone()
            .unwrap_or_else(|| current.description.clone()),
        preconditions: if args.preconditions.is_empty() {
            current.preconditions.clone()
        } else {
            args.preconditions.clone()
        },
        expected_outcome: args
            .expected_outcome
            .clone()
            .unwrap_or_else(|| current.expected_outcome.clone()),
    };
    ws.ledger.edit_scenario(&args.id, draft, Utc::now())?;
    let scenario = ws.ledger.scenario(&args.id)?;
    confirm(ws, &format!("Updated scenario {}", args.id), scenario)
}

fn list_scenarios(ws: &Workspace, requirement: &RequirementId) -> Result<()> {
    ws.ledger.requirement(requirement)?;
    let scenarios: Vec<&TestScenario> = ws.ledger.scenarios_for(requirement).collect();
    if ws.json() {
        return print_json(&scenarios);
    }
    if scenarios.is_empty() {
        println!("No scenarios for {requirement}.");
        return Ok(());
    }
    let rows: Vec<Vec<String>> = scenarios
        .iter()
        .map(|s| {
            vec![
                s.id.to_string(),
                s.title.clone(),
                s.scenario_type.to_string(),
                s.origin.to_string(),
                s.status.to_string(),
                s.requirement_version.to_string(),
                ws.ledger.live_cases_for(&s.id).to_string(),
            ]
        })
        .collect();
    print_table(
        &["ID", "TITLE", "TYPE", "ORIGIN", "STATUS", "REQ VERSION", "CASES"],
        &rows,
    );
    Ok(())
}
