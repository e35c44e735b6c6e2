//! Project commands

use anyhow::Result;
use chrono::Utc;
use qa_core::{Member, NewProject};

use crate::cli::{GlobalArgs, ProjectArgs, ProjectCommands, ProjectCreateArgs, ProjectMemberArgs};
use crate::commands::common::{confirm, fmt_percent, fmt_time, print_json, print_table};
use crate::context::Workspace;

/// Execute a project subcommand
pub(crate) async fn execute(args: &ProjectArgs, global: &GlobalArgs) -> Result<()> {
    let mut ws = Workspace::open(global)?;
    match &args.command {
        ProjectCommands::Create(create) => create_project(&mut ws, create)?,
        ProjectCommands::List => list_projects(&ws)?,
        ProjectCommands::Show(show) => show_project(&ws, &show.id)?,
        ProjectCommands::Archive(archive) => {
            ws.ledger.archive_project(&archive.id, Utc::now())?;
            let project = ws.ledger.project(&archive.id)?;
            confirm(&ws, &format!("Archived project {}", archive.id), project)?;
        }
        ProjectCommands::AddMember(member) => add_member(&mut ws, member)?,
    }
    ws.save()
}

fn create_project(ws: &mut Workspace, args: &ProjectCreateArgs) -> Result<()> {
    let overridden =
        args.framework.is_some() || args.language.is_some() || args.token_limit.is_some();
    let settings = overridden.then(|| {
        let mut settings = ws.config.generation.clone();
        if let Some(framework) = args.framework {
            settings.default_framework = framework;
        }
        if let Some(language) = args.language {
            settings.default_language = language;
        }
        if let Some(limit) = args.token_limit {
            settings.token_limit = limit;
        }
        settings
    });

    let input = NewProject {
        name: args.name.clone(),
        description: args.description.clone(),
        product: args.product.clone(),
        release: args.release.clone(),
        owner: args.owner.clone(),
        members: Vec::new(),
        settings,
    };
    let defaults = ws.config.generation.clone();
    let id = ws.ledger.create_project(input, &defaults, Utc::now())?;
    let project = ws.ledger.project(&id)?;
    confirm(ws, &format!("Created project {id} ({})", project.name), project)
}

fn list_projects(ws: &Workspace) -> Result<()> {
    let mut summaries = Vec::new();
    for project in ws.ledger.projects() {
        summaries.push((project, ws.ledger.project_summary(&project.id)?));
    }

    if ws.json() {
        let items: Vec<serde_json::Value> = summaries
            .iter()
            .map(|(project, summary)| serde_json::json!({ "project": project, "summary": summary }))
            .collect();
        return print_json(&items);
    }

    if summaries.is_empty() {
        println!("No projects found.");
        return Ok(());
    }
    let rows: Vec<Vec<String>> = summaries
        .iter()
        .map(|(p, s)| {
            vec![
                p.id.to_string(),
                p.name.clone(),
                p.owner.clone(),
                p.release.clone(),
                p.status.to_string(),
                s.requirements.to_string(),
                fmt_percent(s.coverage_percent),
                fmt_percent(s.pass_rate),
                s.last_execution.map_or_else(|| "-".to_string(), fmt_time),
            ]
        })
        .collect();
    print_table(
        &[
            "ID", "NAME", "OWNER", "RELEASE", "STATUS", "REQS", "COVERAGE", "PASS RATE",
            "LAST RUN",
        ],
        &rows,
    );
    Ok(())
}

fn show_project(ws: &Workspace, id: &qa_core::ProjectId) -> Result<()> {
    let project = ws.ledger.project(id)?;
    let summary = ws.ledger.project_summary(id)?;
    if ws.json() {
        return print_json(&serde_json::json!({ "project": project, "summary": summary }));
    }

    println!("{}  {}", project.id, project.name);
    println!("  status:       {}", project.status);
    println!("  owner:        {}", project.owner);
    if !project.product.is_empty() {
        println!("  product:      {}", project.product);
    }
    if !project.release.is_empty() {
        println!("  release:      {}", project.release);
    }
    if !project.description.is_empty() {
        println!("  description:  {}", project.description);
    }
    println!(
        "  generation:   {} / {} ({}, {} token limit)",
        project.settings.default_framework,
        project.settings.default_language,
        project.settings.model_version,
        project.settings.token_limit
    );
    println!("  requirements: {}", summary.requirements);
    println!("  coverage:     {}", fmt_percent(summary.coverage_percent));
    println!("  pass rate:    {}", fmt_percent(summary.pass_rate));
    println!("  token usage:  {}", ws.ledger.token_usage(Some(id)));
    if !project.members.is_empty() {
        println!("\nMembers:");
        let rows: Vec<Vec<String>> = project
            .members
            .iter()
            .map(|m| vec![m.email.clone(), m.role.to_string()])
            .collect();
        print_table(&["EMAIL", "ROLE"], &rows);
    }
    Ok(())
}

fn add_member(ws: &mut Workspace, args: &ProjectMemberArgs) -> Result<()> {
    let member = Member {
        email: args.email.clone(),
        role: args.role,
    };
    ws.ledger.add_member(&args.id, member, Utc::now())?;
    let project = ws.ledger.project(&args.id)?;
    confirm(
        ws,
        &format!("Added {} to {} as {}", args.email, args.id, args.role),
        project,
    )
}
