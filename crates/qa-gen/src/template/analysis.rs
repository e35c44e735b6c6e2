//! Keyword heuristics that stand in for a model when analyzing requirements
//! and deriving scenarios and test cases.

use qa_core::{
    AnalysisOutcome, DetectedIssue, IssueKind, IssueSeverity, Priority, Requirement,
    RequirementAnalysis, ScenarioDraft, ScenarioType, StepDraft, TestCaseDraft, TestScenario,
    TestType,
};
use regex::Regex;
use std::sync::OnceLock;

fn regex(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("valid regex literal"))
}

const MIN_DESCRIPTION_WORDS: usize = 5;

/// Term pairs that contradict each other when both appear
const CONFLICTING_TERMS: &[(&str, &str)] = &[
    ("immediate", "batch"),
    ("real-time", "overnight"),
    ("synchronous", "asynchronous"),
    ("always", "never"),
];

pub(crate) fn sentences(text: &str) -> Vec<String> {
    static SPLIT: OnceLock<Regex> = OnceLock::new();
    regex(&SPLIT, r"[.!?]+(\s+|$)|\n+")
        .split(text)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn matching(sentences: &[String], re: &Regex) -> Vec<String> {
    sentences.iter().filter(|s| re.is_match(s)).cloned().collect()
}

pub(crate) fn analyze(requirement: &Requirement) -> AnalysisOutcome {
    static AUTH: OnceLock<Regex> = OnceLock::new();
    static VALIDATION: OnceLock<Regex> = OnceLock::new();
    static CONSTRAINT: OnceLock<Regex> = OnceLock::new();
    static RULE: OnceLock<Regex> = OnceLock::new();
    static ACTOR: OnceLock<Regex> = OnceLock::new();
    static DEPENDENCY: OnceLock<Regex> = OnceLock::new();

    let mut text = requirement.description.clone();
    for clarification in &requirement.clarifications {
        text.push('\n');
        text.push_str(clarification);
    }
    let all = sentences(&text);

    let auth = regex(
        &AUTH,
        r"(?i)\b(log(ged)?[ -]?in|sign(ed)?[ -]?in|authenticat\w*|session|permission\w*|authori[sz]\w*)\b",
    );
    let validation = regex(&VALIDATION, r"(?i)\b(valid\w*|invalid|required|format|in stock)\b");
    let constraint = regex(
        &CONSTRAINT,
        r"(?i)\b(within|timeout|maximum|minimum|at most|at least|no more than|limit)\b|\d+\s*(seconds?|minutes?|hours?|items?|characters?)",
    );
    let rule = regex(&RULE, r"(?i)\b(must|shall|only|never|always)\b");
    let actor = regex(&ACTOR, r"(?i)^(the\s+)?(user|users|customer|customers|system|admin)\b");
    let dependency = regex(
        &DEPENDENCY,
        r"\b((?:[A-Z][A-Za-z]*\s+)*[A-Z][A-Za-z]*\s+(?:Service|API|System|Gateway)(?:\s+API)?)\b",
    );

    let authentication_requirements = matching(&all, auth);
    let mut dependencies: Vec<String> = dependency
        .captures_iter(&text)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().trim_start_matches("The ").to_string())
        .collect();
    dependencies.dedup();

    let analysis = RequirementAnalysis {
        functional_flows: all
            .iter()
            .filter(|s| actor.is_match(s) && !auth.is_match(s))
            .cloned()
            .collect(),
        preconditions: authentication_requirements.clone(),
        postconditions: requirement.acceptance_criteria.clone(),
        business_rules: matching(&all, rule),
        dependencies,
        authentication_requirements,
        validation_rules: matching(&all, validation),
        constraints: matching(&all, constraint),
    };

    AnalysisOutcome {
        analysis,
        issues: detect_issues(requirement, &text),
    }
}

fn detect_issues(requirement: &Requirement, text: &str) -> Vec<DetectedIssue> {
    static VAGUE: OnceLock<Regex> = OnceLock::new();
    let vague = regex(
        &VAGUE,
        r"(?i)\b(fast|quickly|easy|easily|user[- ]friendly|appropriate|adequate|as needed|etc|and/or|several|various|flexible|robust|seamless(ly)?)\b",
    );
    let mut issues = Vec::new();

    if requirement.description.split_whitespace().count() < MIN_DESCRIPTION_WORDS
        && requirement.clarifications.is_empty()
    {
        issues.push(DetectedIssue {
            kind: IssueKind::AmbiguousLanguage,
            severity: IssueSeverity::Error,
            description: "The description is too short to derive test scenarios.".to_string(),
            suggestion: "Describe the user flow, its inputs and the expected outcome.".to_string(),
        });
    }

    if requirement.acceptance_criteria.is_empty() {
        issues.push(DetectedIssue {
            kind: IssueKind::MissingAcceptanceCriteria,
            severity: IssueSeverity::Error,
            description: "No acceptance criteria defined.".to_string(),
            suggestion: "Add acceptance criteria for the expected outcome and for failure, timeout and invalid input cases.".to_string(),
        });
    }

    let mut seen: Vec<String> = Vec::new();
    for m in vague.find_iter(text) {
        let term = m.as_str().to_lowercase();
        if seen.contains(&term) {
            continue;
        }
        issues.push(DetectedIssue {
            kind: IssueKind::AmbiguousLanguage,
            severity: IssueSeverity::Warning,
            description: format!("The term \"{term}\" is not clearly defined."),
            suggestion: format!("Replace \"{term}\" with a measurable criterion."),
        });
        seen.push(term);
    }

    let lower = text.to_lowercase();
    for (a, b) in CONFLICTING_TERMS {
        if lower.contains(a) && lower.contains(b) {
            issues.push(DetectedIssue {
                kind: IssueKind::LogicalConflict,
                severity: IssueSeverity::Warning,
                description: format!("The requirement mentions both \"{a}\" and \"{b}\"."),
                suggestion: "Clarify which behavior applies and when.".to_string(),
            });
        }
    }
    issues
}

fn lower_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn upper_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Scenarios derived from the requirement's analysis, happy path first
pub(crate) fn scenarios(requirement: &Requirement) -> Vec<ScenarioDraft> {
    let analysis = requirement
        .analysis
        .clone()
        .unwrap_or_else(|| analyze(requirement).analysis);
    let subject = requirement.title.to_lowercase();
    let outcome = if requirement.acceptance_criteria.is_empty() {
        format!("{} completes as described", requirement.title)
    } else {
        requirement.acceptance_criteria.join(", ")
    };

    let mut drafts = vec![ScenarioDraft {
        title: format!("Successful {subject}"),
        scenario_type: ScenarioType::Happy,
        description: format!("User completes the {subject} with valid data"),
        preconditions: analysis.preconditions.clone(),
        expected_outcome: outcome,
    }];

    drafts.push(match analysis.dependencies.first() {
        Some(dependency) => ScenarioDraft {
            title: format!("{} fails when {dependency} is unavailable", requirement.title),
            scenario_type: ScenarioType::Negative,
            description: format!("{dependency} does not respond during the {subject}"),
            preconditions: analysis.preconditions.clone(),
            expected_outcome: "Error message displayed and no partial changes are saved"
                .to_string(),
        },
        None => ScenarioDraft {
            title: format!("{} with missing required data", requirement.title),
            scenario_type: ScenarioType::Negative,
            description: format!("User submits the {subject} without required input"),
            preconditions: analysis.preconditions.clone(),
            expected_outcome: "Error message displayed and the request is blocked".to_string(),
        },
    });

    for constraint in analysis.constraints.iter().take(2) {
        let lower = constraint.to_lowercase();
        let boundary = ["maximum", "minimum", "at most", "at least", "no more than"]
            .iter()
            .any(|w| lower.contains(w));
        drafts.push(ScenarioDraft {
            title: format!("{} at the limit: {}", requirement.title, lower_first(constraint)),
            scenario_type: if boundary {
                ScenarioType::Boundary
            } else {
                ScenarioType::Edge
            },
            description: format!("Exercise the constraint \"{constraint}\""),
            preconditions: analysis.preconditions.clone(),
            expected_outcome: format!("The constraint holds: {constraint}"),
        });
    }

    if !analysis.authentication_requirements.is_empty() {
        drafts.push(ScenarioDraft {
            title: format!("Unauthorized access to {subject}"),
            scenario_type: ScenarioType::Authorization,
            description: format!("Anonymous user attempts the {subject}"),
            preconditions: vec!["User is not logged in".to_string()],
            expected_outcome: "User redirected to login page".to_string(),
        });
    }

    for rule in analysis.validation_rules.iter().take(2) {
        drafts.push(ScenarioDraft {
            title: format!("{} rejects input violating: {}", requirement.title, lower_first(rule)),
            scenario_type: ScenarioType::Validation,
            description: format!("User submits data that breaks the rule \"{rule}\""),
            preconditions: analysis.preconditions.clone(),
            expected_outcome: "Validation error displayed and the request is blocked".to_string(),
        });
    }
    drafts
}

fn priority_for(scenario_type: ScenarioType) -> Priority {
    match scenario_type {
        ScenarioType::Authorization => Priority::Critical,
        ScenarioType::Happy => Priority::High,
        ScenarioType::Negative | ScenarioType::Validation => Priority::Medium,
        ScenarioType::Edge | ScenarioType::Boundary => Priority::Low,
    }
}

/// Strip a leading actor so a flow sentence reads as an instruction
fn imperative(sentence: &str) -> String {
    static SUBJECT: OnceLock<Regex> = OnceLock::new();
    let subject = regex(&SUBJECT, r"(?i)^(the\s+)?(user|users|customer|customers)\s+");
    let stripped = subject.replace(sentence, "");
    upper_first(stripped.trim())
}

/// One test case for a scenario
pub(crate) fn test_cases(requirement: &Requirement, scenario: &TestScenario) -> Vec<TestCaseDraft> {
    let page = requirement.title.to_lowercase();
    let flows: Vec<String> = requirement
        .analysis
        .as_ref()
        .map(|a| a.functional_flows.clone())
        .unwrap_or_default();

    let mut steps = Vec::new();
    if scenario.scenario_type == ScenarioType::Authorization {
        steps.push(StepDraft::new("Log out of the application"));
    }
    steps.push(StepDraft::new(format!("Navigate to {page}")));
    match scenario.scenario_type {
        ScenarioType::Happy | ScenarioType::Edge | ScenarioType::Boundary => {
            steps.extend(flows.iter().map(|f| StepDraft::new(imperative(f))));
        }
        ScenarioType::Validation => {
            steps.push(StepDraft::new(format!(
                "Enter invalid data for: {}",
                scenario.description
            )));
        }
        ScenarioType::Negative | ScenarioType::Authorization => {}
    }
    steps.push(StepDraft {
        action: format!("Submit the {page}"),
        expected_result: scenario.expected_outcome.clone(),
        take_snapshot: true,
    });

    vec![TestCaseDraft {
        title: scenario.title.clone(),
        priority: priority_for(scenario.scenario_type),
        test_type: if scenario.scenario_type == ScenarioType::Authorization {
            TestType::Security
        } else {
            TestType::Ui
        },
        preconditions: scenario.preconditions.clone(),
        steps,
        expected_results: if scenario.expected_outcome.trim().is_empty() {
            Vec::new()
        } else {
            vec![scenario.expected_outcome.clone()]
        },
        postconditions: Vec::new(),
        tags: vec![scenario.scenario_type.to_string(), requirement.id.to_string()],
    }]
}

#[cfg(test)]
#[path = "analysis_test.rs"]
mod tests;
