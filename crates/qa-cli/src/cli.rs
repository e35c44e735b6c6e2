//! CLI argument definitions using clap derive API

use clap::{Args, Parser, Subcommand, ValueEnum};
use qa_core::{
    ExecutionId, FailureCategory, Framework, Language, MemberRole, Priority, ProjectId,
    RequestToken, RequirementId, ResultStatus, ScenarioId, ScenarioType, ScriptId, TestCaseId,
    TestType, Version,
};
use std::path::PathBuf;

/// qa - requirement to test asset traceability and lifecycle management
#[derive(Parser, Debug)]
#[command(name = "qa")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all commands
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to the workspace directory
    #[arg(short = 'p', long, global = true, default_value = ".")]
    pub project_dir: PathBuf,

    /// Override config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Actor recorded in the audit log
    #[arg(long, global = true, env = "QA_ACTOR")]
    pub actor: Option<String>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "text")]
    pub output: OutputFormat,
}

/// Output formats shared by every command
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable tables and messages
    Text,
    /// Pretty-printed JSON on stdout
    Json,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a qa.yml workspace in the project directory
    Init(InitArgs),

    /// Manage projects
    Project(ProjectArgs),

    /// Manage requirements
    Req(ReqArgs),

    /// Manage test scenarios
    Scenario(ScenarioArgs),

    /// Manage test cases
    Case(CaseArgs),

    /// Manage automation scripts
    Script(ScriptArgs),

    /// Manage execution batches and results
    Exec(ExecArgs),

    /// Show dashboard metrics
    Dashboard(DashboardArgs),

    /// Show the traceability tree below an entity
    Trace(TraceArgs),

    /// Verify derived values and cross-references
    Check,

    /// Show the audit log
    Audit(AuditArgs),

    /// List generation requests and their receipts
    Jobs(JobsArgs),

    /// Query the metadata database
    Meta(MetaArgs),
}

// ── init ───────────────────────────────────────────────────────────────

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Workspace name (defaults to the directory name)
    #[arg(long)]
    pub name: Option<String>,

    /// Default actor written to qa.yml
    #[arg(long = "default-actor")]
    pub default_actor: Option<String>,

    /// Overwrite an existing qa.yml
    #[arg(long)]
    pub force: bool,
}

// ── project ────────────────────────────────────────────────────────────

#[derive(Args, Debug)]
pub struct ProjectArgs {
    #[command(subcommand)]
    pub command: ProjectCommands,
}

#[derive(Subcommand, Debug)]
pub enum ProjectCommands {
    /// Create a project
    Create(ProjectCreateArgs),
    /// List projects with derived summaries
    List,
    /// Show one project
    Show(ProjectIdArgs),
    /// Archive a project
    Archive(ProjectIdArgs),
    /// Add a member to a project
    AddMember(ProjectMemberArgs),
}

#[derive(Args, Debug)]
pub struct ProjectCreateArgs {
    #[arg(long)]
    pub name: String,

    /// Owner email
    #[arg(long)]
    pub owner: String,

    #[arg(long, default_value = "")]
    pub description: String,

    #[arg(long, default_value = "")]
    pub product: String,

    /// Target release, e.g. R2.1
    #[arg(long, default_value = "")]
    pub release: String,

    /// Default script framework (overrides qa.yml)
    #[arg(long)]
    pub framework: Option<Framework>,

    /// Default script language (overrides qa.yml)
    #[arg(long)]
    pub language: Option<Language>,

    /// Per-request token limit (overrides qa.yml)
    #[arg(long)]
    pub token_limit: Option<u32>,
}

#[derive(Args, Debug)]
pub struct ProjectIdArgs {
    pub id: ProjectId,
}

#[derive(Args, Debug)]
pub struct ProjectMemberArgs {
    pub id: ProjectId,

    #[arg(long)]
    pub email: String,

    #[arg(long, default_value = "contributor")]
    pub role: MemberRole,
}

// ── req ────────────────────────────────────────────────────────────────

#[derive(Args, Debug)]
pub struct ReqArgs {
    #[command(subcommand)]
    pub command: ReqCommands,
}

#[derive(Subcommand, Debug)]
pub enum ReqCommands {
    /// Ingest one requirement
    Ingest(ReqIngestArgs),
    /// Ingest every requirement in YAML files matching glob patterns
    Import(ReqImportArgs),
    /// List requirements
    List(ReqListArgs),
    /// Show one requirement with coverage and next actions
    Show(ReqIdArgs),
    /// Show every stored version of a requirement
    History(ReqIdArgs),
    /// Analyze a draft requirement
    Analyze(ReqGenerateArgs),
    /// Answer a clarification request
    Clarify(ReqClarifyArgs),
    /// Edit requirement content, creating a new version
    Revise(ReqReviseArgs),
    /// Approve a requirement with generated test cases
    Approve(ReqExpectArgs),
    /// Archive a requirement
    Archive(ReqIdArgs),
}

#[derive(Args, Debug)]
pub struct ReqIngestArgs {
    /// Owning project
    #[arg(long)]
    pub project: ProjectId,

    #[arg(long)]
    pub title: String,

    #[arg(long)]
    pub description: String,

    /// Acceptance criterion (repeatable)
    #[arg(long = "criterion")]
    pub criteria: Vec<String>,

    /// Release (defaults to the project's)
    #[arg(long, default_value = "")]
    pub release: String,

    /// Owner (defaults to the project's)
    #[arg(long, default_value = "")]
    pub owner: String,
}

#[derive(Args, Debug)]
pub struct ReqImportArgs {
    /// Owning project
    #[arg(long)]
    pub project: ProjectId,

    /// File paths or glob patterns, relative to the project directory
    #[arg(required = true)]
    pub patterns: Vec<String>,
}

#[derive(Args, Debug)]
pub struct ReqListArgs {
    /// Only requirements of this project
    #[arg(long)]
    pub project: Option<ProjectId>,
}

#[derive(Args, Debug)]
pub struct ReqIdArgs {
    pub id: RequirementId,
}

#[derive(Args, Debug)]
pub struct ReqExpectArgs {
    pub id: RequirementId,

    /// Fail with a conflict unless the requirement is at this version
    #[arg(long = "expect-version")]
    pub expected: Option<Version>,
}

#[derive(Args, Debug)]
pub struct ReqGenerateArgs {
    pub id: RequirementId,

    #[arg(long = "expect-version")]
    pub expected: Option<Version>,

    /// Idempotency token; a retried request with the same token is not re-run
    #[arg(long)]
    pub token: Option<RequestToken>,
}

#[derive(Args, Debug)]
pub struct ReqClarifyArgs {
    pub id: RequirementId,

    /// Clarification text
    #[arg(long)]
    pub note: String,

    #[arg(long = "expect-version")]
    pub expected: Option<Version>,
}

#[derive(Args, Debug)]
pub struct ReqReviseArgs {
    pub id: RequirementId,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(long)]
    pub description: Option<String>,

    /// Replacement acceptance criteria (repeatable)
    #[arg(long = "criterion")]
    pub criteria: Vec<String>,

    #[arg(long)]
    pub release: Option<String>,

    #[arg(long = "expect-version")]
    pub expected: Option<Version>,
}

// ── scenario ───────────────────────────────────────────────────────────

#[derive(Args, Debug)]
pub struct ScenarioArgs {
    #[command(subcommand)]
    pub command: ScenarioCommands,
}

#[derive(Subcommand, Debug)]
pub enum ScenarioCommands {
    /// Generate scenarios for a ready requirement
    Generate(ScenarioGenerateArgs),
    /// Add a scenario by hand
    Add(ScenarioAddArgs),
    /// Edit a scenario
    Edit(ScenarioEditArgs),
    /// Approve a scenario
    Approve(ScenarioIdArgs),
    /// List the scenarios of a requirement
    List(ScenarioListArgs),
}

#[derive(Args, Debug)]
pub struct ScenarioGenerateArgs {
    pub requirement: RequirementId,

    #[arg(long)]
    pub token: Option<RequestToken>,
}

#[derive(Args, Debug)]
pub struct ScenarioAddArgs {
    pub requirement: RequirementId,

    #[arg(long)]
    pub title: String,

    #[arg(long = "type", default_value = "happy")]
    pub scenario_type: ScenarioType,

    #[arg(long)]
    pub description: String,

    /// Precondition (repeatable)
    #[arg(long = "precondition")]
    pub preconditions: Vec<String>,

    #[arg(long = "expected-outcome", default_value = "")]
    pub expected_outcome: String,
}

#[derive(Args, Debug)]
pub struct ScenarioEditArgs {
    pub id: ScenarioId,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(long = "type")]
    pub scenario_type: Option<ScenarioType>,

    #[arg(long)]
    pub description: Option<String>,

    /// Replacement preconditions (repeatable)
    #[arg(long = "precondition")]
    pub preconditions: Vec<String>,

    #[arg(long = "expected-outcome")]
    pub expected_outcome: Option<String>,
}

#[derive(Args, Debug)]
pub struct ScenarioIdArgs {
    pub id: ScenarioId,
}

#[derive(Args, Debug)]
pub struct ScenarioListArgs {
    pub requirement: RequirementId,
}

// ── case ───────────────────────────────────────────────────────────────

#[derive(Args, Debug)]
pub struct CaseArgs {
    #[command(subcommand)]
    pub command: CaseCommands,
}

#[derive(Subcommand, Debug)]
pub enum CaseCommands {
    /// Generate test cases for every scenario of a requirement that has none
    Generate(CaseGenerateArgs),
    /// Add a test case to a scenario by hand
    Add(CaseAddArgs),
    /// Edit a test case, creating a new version
    Edit(CaseEditArgs),
    /// Approve a test case
    Approve(CaseExpectArgs),
    /// Reject a test case
    Reject(CaseExpectArgs),
    /// Show a test case with its steps
    Show(CaseShowArgs),
    /// Show every stored version of a test case
    History(CaseIdArgs),
    /// List test cases
    List(CaseListArgs),
}

#[derive(Args, Debug)]
pub struct CaseGenerateArgs {
    pub requirement: RequirementId,

    #[arg(long)]
    pub token: Option<RequestToken>,
}

/// Test case content given on the command line or in a YAML file
#[derive(Args, Debug, Default)]
pub struct CaseContentArgs {
    /// YAML file holding the whole test case
    #[arg(long)]
    pub file: Option<PathBuf>,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(long)]
    pub priority: Option<Priority>,

    #[arg(long = "type")]
    pub test_type: Option<TestType>,

    /// Precondition (repeatable)
    #[arg(long = "precondition")]
    pub preconditions: Vec<String>,

    /// Step as `action` or `action => expected result`; append ` [snapshot]`
    /// to capture a screenshot (repeatable)
    #[arg(long = "step")]
    pub steps: Vec<String>,

    /// Expected result (repeatable)
    #[arg(long = "expect")]
    pub expected_results: Vec<String>,

    /// Postcondition (repeatable)
    #[arg(long = "postcondition")]
    pub postconditions: Vec<String>,

    /// Tag (repeatable)
    #[arg(long = "tag")]
    pub tags: Vec<String>,
}

#[derive(Args, Debug)]
pub struct CaseAddArgs {
    pub scenario: ScenarioId,

    #[command(flatten)]
    pub content: CaseContentArgs,
}

#[derive(Args, Debug)]
pub struct CaseEditArgs {
    pub id: TestCaseId,

    #[arg(long = "expect-version")]
    pub expected: Option<Version>,

    #[command(flatten)]
    pub content: CaseContentArgs,
}

#[derive(Args, Debug)]
pub struct CaseExpectArgs {
    pub id: TestCaseId,

    #[arg(long = "expect-version")]
    pub expected: Option<Version>,
}

#[derive(Args, Debug)]
pub struct CaseShowArgs {
    pub id: TestCaseId,

    /// Show this version instead of the current one
    #[arg(long)]
    pub version: Option<Version>,
}

#[derive(Args, Debug)]
pub struct CaseIdArgs {
    pub id: TestCaseId,
}

#[derive(Args, Debug)]
pub struct CaseListArgs {
    /// Only test cases of this requirement
    #[arg(long)]
    pub requirement: Option<RequirementId>,

    /// Only test cases of this scenario
    #[arg(long)]
    pub scenario: Option<ScenarioId>,
}

// ── script ─────────────────────────────────────────────────────────────

#[derive(Args, Debug)]
pub struct ScriptArgs {
    #[command(subcommand)]
    pub command: ScriptCommands,
}

#[derive(Subcommand, Debug)]
pub enum ScriptCommands {
    /// Generate an automation script for an approved test case
    Generate(ScriptGenerateArgs),
    /// Replace a script's code, creating a new version
    Revise(ScriptReviseArgs),
    /// Approve a script that passed validation
    Approve(ScriptExpectArgs),
    /// Reject a script
    Reject(ScriptExpectArgs),
    /// Show a script with its validation results
    Show(ScriptShowArgs),
}

#[derive(Args, Debug)]
pub struct ScriptGenerateArgs {
    pub test_case: TestCaseId,

    /// Framework (defaults to the project's)
    #[arg(long)]
    pub framework: Option<Framework>,

    /// Language (defaults to the project's)
    #[arg(long)]
    pub language: Option<Language>,

    #[arg(long)]
    pub token: Option<RequestToken>,
}

#[derive(Args, Debug)]
pub struct ScriptReviseArgs {
    pub id: ScriptId,

    /// File holding the new code
    #[arg(long)]
    pub file: PathBuf,

    #[arg(long)]
    pub framework: Option<Framework>,

    #[arg(long)]
    pub language: Option<Language>,

    #[arg(long = "expect-version")]
    pub expected: Option<Version>,
}

#[derive(Args, Debug)]
pub struct ScriptExpectArgs {
    pub id: ScriptId,

    #[arg(long = "expect-version")]
    pub expected: Option<Version>,
}

#[derive(Args, Debug)]
pub struct ScriptShowArgs {
    pub id: ScriptId,

    /// Print only the code
    #[arg(long)]
    pub code: bool,

    /// Write the code to this file
    #[arg(long = "write-to")]
    pub write_to: Option<PathBuf>,
}

// ── exec ───────────────────────────────────────────────────────────────

#[derive(Args, Debug)]
pub struct ExecArgs {
    #[command(subcommand)]
    pub command: ExecCommands,
}

#[derive(Subcommand, Debug)]
pub enum ExecCommands {
    /// Start an execution over approved scripts
    Start(ExecStartArgs),
    /// Record one result, or every result in a YAML/JSON file
    Record(ExecRecordArgs),
    /// Finish an execution, deriving its status from the results
    Finish(ExecIdArgs),
    /// Cancel a running execution
    Cancel(ExecIdArgs),
    /// Show an execution with its results
    Show(ExecIdArgs),
    /// List executions
    List(ExecListArgs),
}

#[derive(Args, Debug)]
pub struct ExecStartArgs {
    pub project: ProjectId,

    /// Only run these scripts (repeatable; default: every approved script)
    #[arg(long = "script")]
    pub scripts: Vec<ScriptId>,

    /// Who or what started the run
    #[arg(long = "triggered-by")]
    pub triggered_by: Option<String>,
}

#[derive(Args, Debug)]
pub struct ExecRecordArgs {
    pub id: ExecutionId,

    /// YAML or JSON list of results
    #[arg(long, conflicts_with_all = ["case", "status"])]
    pub file: Option<PathBuf>,

    #[arg(long = "case", required_unless_present = "file")]
    pub case: Option<TestCaseId>,

    #[arg(long, required_unless_present = "file")]
    pub status: Option<ResultStatus>,

    #[arg(long = "duration-ms", default_value_t = 0)]
    pub duration_ms: u64,

    #[arg(long, default_value_t = 0)]
    pub retries: u32,

    /// Failure category (failed results only)
    #[arg(long)]
    pub category: Option<FailureCategory>,

    /// Log line (repeatable)
    #[arg(long = "log")]
    pub logs: Vec<String>,

    /// Screenshot path (repeatable)
    #[arg(long = "screenshot")]
    pub screenshots: Vec<String>,

    #[arg(long = "stack-trace")]
    pub stack_trace: Option<String>,
}

#[derive(Args, Debug)]
pub struct ExecIdArgs {
    pub id: ExecutionId,
}

#[derive(Args, Debug)]
pub struct ExecListArgs {
    #[arg(long)]
    pub project: Option<ProjectId>,
}

// ── reports ────────────────────────────────────────────────────────────

#[derive(Args, Debug)]
pub struct DashboardArgs {
    /// Project dashboard (default: every project)
    #[arg(long)]
    pub project: Option<ProjectId>,
}

#[derive(Args, Debug)]
pub struct TraceArgs {
    /// Any entity id, e.g. PROJ-001, REQ-001, TC-003
    pub id: String,
}

#[derive(Args, Debug)]
pub struct AuditArgs {
    /// Only events for this entity id
    #[arg(long)]
    pub entity: Option<String>,

    /// Show only the most recent N events
    #[arg(long)]
    pub limit: Option<usize>,
}

#[derive(Args, Debug)]
pub struct JobsArgs {
    #[arg(long)]
    pub project: Option<ProjectId>,

    /// Show one receipt
    #[arg(long)]
    pub token: Option<RequestToken>,
}

// ── meta ───────────────────────────────────────────────────────────────

#[derive(Args, Debug)]
pub struct MetaArgs {
    #[command(subcommand)]
    pub command: MetaCommands,
}

#[derive(Subcommand, Debug)]
pub enum MetaCommands {
    /// Run a read-only SQL query
    Query(MetaQueryArgs),
    /// List tables and views with row counts
    Tables,
}

#[derive(Args, Debug)]
pub struct MetaQueryArgs {
    /// SQL statement
    pub sql: String,
}

#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;
