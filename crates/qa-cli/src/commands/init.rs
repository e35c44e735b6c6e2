//! Init command implementation - creates a qa.yml workspace

use anyhow::{Context, Result};
use qa_core::Config;
use qa_meta::MetaDb;
use std::fs;

use crate::cli::{GlobalArgs, InitArgs, OutputFormat};
use crate::commands::common::print_json;

/// Execute the init command
pub(crate) async fn execute(args: &InitArgs, global: &GlobalArgs) -> Result<()> {
    let root = &global.project_dir;
    fs::create_dir_all(root)
        .with_context(|| format!("Failed to create directory: {}", root.display()))?;

    if Config::exists_in(root) && !args.force {
        anyhow::bail!(
            "'{}' already holds a qa.yml. Use --force to overwrite it.",
            root.display()
        );
    }

    let name = match &args.name {
        Some(name) => name.clone(),
        None => root
            .canonicalize()
            .ok()
            .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .unwrap_or_else(|| "qa-workspace".to_string()),
    };

    let mut config = Config::new(name);
    config.actor = args.default_actor.clone();
    let config_path = config
        .write_to_dir(root)
        .context("Failed to write qa.yml")?;

    let db_path = config.meta_db_path(root);
    MetaDb::open(&db_path)
        .with_context(|| format!("Failed to create metadata database {}", db_path.display()))?;
    log::info!("initialised metadata database at {}", db_path.display());

    if global.output == OutputFormat::Json {
        return print_json(&serde_json::json!({
            "name": config.name,
            "config": config_path.display().to_string(),
            "database": db_path.display().to_string(),
        }));
    }

    println!("Initialised QA workspace '{}'", config.name);
    println!("  config:   {}", config_path.display());
    println!("  database: {}", db_path.display());
    println!("\nNext: qa project create --name <name> --owner <email>");
    Ok(())
}
