use super::*;
use clap::CommandFactory;

#[test]
fn verify_cli_args() {
    // Validates the entire command tree: short flag conflicts,
    // duplicate args, and other clap definition errors.
    Cli::command().debug_assert();
}

#[test]
fn global_args_parse_after_subcommand() {
    let cli = Cli::try_parse_from([
        "qa", "req", "list", "--output", "json", "--actor", "ana@company.com", "-p", "/tmp/ws",
    ])
    .unwrap();
    assert_eq!(cli.global.output, OutputFormat::Json);
    assert_eq!(cli.global.actor.as_deref(), Some("ana@company.com"));
    assert_eq!(cli.global.project_dir, PathBuf::from("/tmp/ws"));
}

#[test]
fn typed_arguments_parse() {
    let cli = Cli::try_parse_from([
        "qa",
        "case",
        "approve",
        "TC-004",
        "--expect-version",
        "v2",
    ])
    .unwrap();
    match cli.command {
        Commands::Case(CaseArgs {
            command: CaseCommands::Approve(args),
        }) => {
            assert_eq!(args.id.as_str(), "TC-004");
            assert_eq!(args.expected, Version::new(2));
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn invalid_enum_value_is_rejected() {
    let err = Cli::try_parse_from([
        "qa", "script", "generate", "TC-001", "--framework", "selenium",
    ])
    .unwrap_err();
    assert!(err.to_string().contains("selenium"), "{err}");
}

#[test]
fn record_requires_case_and_status_without_file() {
    assert!(Cli::try_parse_from(["qa", "exec", "record", "EXE-001"]).is_err());
    assert!(Cli::try_parse_from([
        "qa", "exec", "record", "EXE-001", "--case", "TC-001", "--status", "passed"
    ])
    .is_ok());
    assert!(
        Cli::try_parse_from(["qa", "exec", "record", "EXE-001", "--file", "results.yml"]).is_ok()
    );
}
