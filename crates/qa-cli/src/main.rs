//! qa - requirement to test asset traceability and lifecycle management

use anyhow::Result;
use clap::Parser;
use qa_core::{CoreError, ErrorKind};
use qa_meta::MetaError;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod context;

use cli::{Cli, Commands};
use commands::common::ExitCode;
use commands::{execution, init, meta, project, report, requirement, scenario, script, test_case};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.global.verbose);

    if let Err(err) = run(&cli).await {
        let code = match err.downcast_ref::<ExitCode>() {
            Some(exit) => exit.0,
            None => {
                eprintln!("Error: {err:#}");
                exit_code_for(&err)
            }
        };
        std::process::exit(code);
    }
}

async fn run(cli: &Cli) -> Result<()> {
    let global = &cli.global;
    match &cli.command {
        Commands::Init(args) => init::execute(args, global).await,
        Commands::Project(args) => project::execute(args, global).await,
        Commands::Req(args) => requirement::execute(args, global).await,
        Commands::Scenario(args) => scenario::execute(args, global).await,
        Commands::Case(args) => test_case::execute(args, global).await,
        Commands::Script(args) => script::execute(args, global).await,
        Commands::Exec(args) => execution::execute(args, global).await,
        Commands::Dashboard(args) => report::dashboard(args, global).await,
        Commands::Trace(args) => report::trace(args, global).await,
        Commands::Check => report::check(global).await,
        Commands::Audit(args) => report::audit(args, global).await,
        Commands::Jobs(args) => report::jobs(args, global).await,
        Commands::Meta(args) => meta::execute(args, global).await,
    }
}

/// Route `log` records from the library crates to stderr.
///
/// `QA_LOG` takes an env-filter directive; without it the level is `warn`,
/// or `info` with `--verbose`.
fn init_logging(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_env("QA_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Exit status by error class, so scripts can tell a conflict from a bad
/// transition without parsing messages.
fn exit_code_for(err: &anyhow::Error) -> i32 {
    let core = err.chain().find_map(|cause| {
        cause.downcast_ref::<CoreError>().or_else(|| match cause.downcast_ref::<MetaError>() {
            Some(MetaError::Core(core)) => Some(core),
            _ => None,
        })
    });
    match core.map(CoreError::kind) {
        Some(ErrorKind::Validation) => 2,
        Some(ErrorKind::PreconditionNotMet) => 3,
        Some(ErrorKind::Conflict) => 4,
        Some(ErrorKind::NotFound) => 5,
        Some(ErrorKind::DependencyFailure) => 6,
        Some(ErrorKind::Environment) | None => 1,
    }
}
