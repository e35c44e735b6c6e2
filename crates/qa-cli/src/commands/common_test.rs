use super::*;

#[test]
fn test_column_widths_cover_header_and_cells() {
    let rows = vec![
        vec!["REQ-001".to_string(), "scenarios-generated".to_string()],
        vec!["REQ-010".to_string(), "ready".to_string()],
    ];
    assert_eq!(calculate_column_widths(&["ID", "STATUS"], &rows), vec![7, 19]);
}

#[test]
fn test_column_widths_count_characters() {
    let rows = vec![vec!["é".repeat(4)]];
    assert_eq!(calculate_column_widths(&["AB"], &rows), vec![4]);
}

#[test]
fn test_fmt_percent() {
    assert_eq!(fmt_percent(None), "-");
    assert_eq!(fmt_percent(Some(50.0)), "50.0%");
    assert_eq!(fmt_percent(Some(200.0 / 3.0)), "66.7%");
}

#[test]
fn test_entity_kind_for() {
    assert_eq!(entity_kind_for("PROJ-001"), Some(EntityKind::Project));
    assert_eq!(entity_kind_for("req-002"), Some(EntityKind::Requirement));
    assert_eq!(entity_kind_for("TC-010"), Some(EntityKind::TestCase));
    assert_eq!(entity_kind_for("SCR-001"), Some(EntityKind::Script));
    assert_eq!(entity_kind_for("EXE-003"), Some(EntityKind::Execution));
    assert_eq!(entity_kind_for("SCN-004"), Some(EntityKind::Scenario));
    assert_eq!(entity_kind_for("RES-001"), None);
    assert_eq!(entity_kind_for("TC001"), None);
}

#[test]
fn test_exit_code_has_no_message() {
    let err: anyhow::Error = ExitCode(3).into();
    assert_eq!(err.to_string(), "");
    assert_eq!(err.downcast_ref::<ExitCode>().map(|e| e.0), Some(3));
}
