//! Runtime context for CLI commands

use anyhow::{Context, Result};
use qa_core::{Config, Ledger};
use qa_gen::{ScriptValidator, TemplateBackend};
use qa_meta::MetaDb;
use std::path::{Path, PathBuf};

use crate::cli::{GlobalArgs, OutputFormat};

/// Loaded workspace: configuration, metadata database and the ledger read
/// from it
pub(crate) struct Workspace {
    /// Directory holding qa.yml
    pub root: PathBuf,

    pub config: Config,

    pub db: MetaDb,

    pub ledger: Ledger,

    pub output: OutputFormat,

    /// Verbose output enabled
    pub verbose: bool,
}

impl Workspace {
    /// Load the workspace named by the global arguments
    pub fn open(args: &GlobalArgs) -> Result<Self> {
        let root = args.project_dir.clone();
        let config = match &args.config {
            Some(path) => Config::load(path).context("Failed to load configuration file")?,
            None => Config::load_from_dir(&root)
                .context("Failed to load workspace configuration (run `qa init` first)")?,
        };

        let db_path = config.meta_db_path(&root);
        let db = MetaDb::open(&db_path)
            .with_context(|| format!("Failed to open metadata database {}", db_path.display()))?;
        let mut ledger = db.load_ledger().context("Failed to load ledger")?;

        let actor = args
            .actor
            .clone()
            .or_else(|| config.actor.clone())
            .filter(|a| !a.trim().is_empty());
        if let Some(actor) = actor {
            ledger.set_actor(actor);
        }
        log::debug!(
            "loaded ledger revision {} from {}",
            ledger.revision(),
            db_path.display()
        );

        Ok(Self {
            root,
            config,
            db,
            ledger,
            output: args.output,
            verbose: args.verbose,
        })
    }

    /// Persist ledger changes, if any
    pub fn save(&mut self) -> Result<()> {
        let before = self.ledger.revision();
        let revision = self
            .db
            .save_ledger(&mut self.ledger)
            .context("Failed to save ledger")?;
        if revision != before {
            self.verbose(&format!("saved ledger revision {revision}"));
        }
        Ok(())
    }

    /// Script validator honouring `validation.disabled_rules`
    pub fn validator(&self) -> ScriptValidator {
        ScriptValidator::new(&self.config.validation.disabled_rules)
    }

    /// Backend used for generation requests
    pub fn backend(&self) -> Result<TemplateBackend> {
        TemplateBackend::new().context("Failed to initialise generation backend")
    }

    /// Resolve `path` against the workspace root
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    pub fn json(&self) -> bool {
        self.output == OutputFormat::Json
    }

    /// Print verbose output if enabled
    pub fn verbose(&self, msg: &str) {
        if self.verbose {
            eprintln!("[verbose] {}", msg);
        }
    }
}
