//! Automation script commands

use anyhow::{Context, Result};
use chrono::Utc;
use qa_core::{ScriptDraft, ScriptId};
use qa_gen::Workflow;

use crate::cli::{
    GlobalArgs, ScriptArgs, ScriptCommands, ScriptGenerateArgs, ScriptReviseArgs, ScriptShowArgs,
};
use crate::commands::common::{confirm, fmt_time, print_json, print_outcome, print_validation};
use crate::context::Workspace;

/// Execute a script subcommand
pub(crate) async fn execute(args: &ScriptArgs, global: &GlobalArgs) -> Result<()> {
    let mut ws = Workspace::open(global)?;
    match &args.command {
        ScriptCommands::Generate(generate) => return generate_script(&mut ws, generate).await,
        ScriptCommands::Revise(revise) => revise_script(&mut ws, revise)?,
        ScriptCommands::Approve(approve) => {
            let warnings = ws
                .ledger
                .approve_script(&approve.id, approve.expected, Utc::now())?;
            let script = ws.ledger.script(&approve.id)?;
            confirm(&ws, &format!("Approved script {}", approve.id), script)?;
            if !ws.json() {
                for warning in &warnings {
                    println!("  warning [{}]: {}", warning.rule, warning.message);
                }
            }
        }
        ScriptCommands::Reject(reject) => {
            ws.ledger
                .reject_script(&reject.id, reject.expected, Utc::now())?;
            let script = ws.ledger.script(&reject.id)?;
            confirm(&ws, &format!("Rejected script {}", reject.id), script)?;
        }
        ScriptCommands::Show(show) => show_script(&ws, show)?,
    }
    ws.save()
}

async fn generate_script(ws: &mut Workspace, args: &ScriptGenerateArgs) -> Result<()> {
    let backend = ws.backend()?;
    let validator = ws.validator();
    let result = Workflow::new(&mut ws.ledger, &backend, &validator)
        .generate_script(
            &args.test_case,
            args.framework,
            args.language,
            args.token.clone(),
            Utc::now(),
        )
        .await;
    ws.save()?;
    let outcome = result?;
    print_outcome(ws, "Generated script", &outcome)?;
    if !ws.json() {
        for id in &outcome.produced {
            let script = ws.ledger.script(&ScriptId::new(id.as_str()))?;
            println!(
                "{} {} ({} / {}) is {}",
                script.id, script.version, script.framework, script.language, script.status
            );
            print_validation(&script.validation_results);
        }
    }
    Ok(())
}

fn revise_script(ws: &mut Workspace, args: &ScriptReviseArgs) -> Result<()> {
    let path = ws.resolve(&args.file);
    let code = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let current = ws.ledger.script(&args.id)?;
    let framework = args.framework.unwrap_or(current.framework);
    let language = args.language.unwrap_or(current.language);
    let case = ws.ledger.test_case(&current.test_case_id)?;
    let validation_results = ws.validator().validate(&code, framework, language, case);

    let draft = ScriptDraft {
        framework,
        language,
        code,
        validation_results,
    };
    let version = ws
        .ledger
        .revise_script(&args.id, args.expected, draft, Utc::now())?;
    let script = ws.ledger.script(&args.id)?;
    if ws.json() {
        return print_json(script);
    }
    println!("Revised {} to {version}; status is {}", args.id, script.status);
    print_validation(&script.validation_results);
    Ok(())
}

fn show_script(ws: &Workspace, args: &ScriptShowArgs) -> Result<()> {
    let script = ws.ledger.script(&args.id)?;
    if let Some(target) = &args.write_to {
        let path = ws.resolve(target);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        std::fs::write(&path, &script.code)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("Wrote {} {} to {}", script.id, script.version, path.display());
        return Ok(());
    }
    if args.code {
        print!("{}", script.code);
        if !script.code.ends_with('\n') {
            println!();
        }
        return Ok(());
    }
    if ws.json() {
        return print_json(script);
    }

    println!("{}  {} ({})", script.id, script.test_case_id, script.version);
    println!("  test case version: {}", script.test_case_version);
    println!("  framework:         {} / {}", script.framework, script.language);
    println!("  status:            {}", script.status);
    println!("  created:           {}", fmt_time(script.created_at));
    if let Some(approved) = script.approved_at {
        println!("  approved:          {}", fmt_time(approved));
    }
    println!();
    print_validation(&script.validation_results);
    println!("\n{}", script.code);
    Ok(())
}
