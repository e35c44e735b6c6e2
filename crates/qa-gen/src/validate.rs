//! Static validation of generated automation scripts
//!
//! Every enabled rule produces one [`ValidationResult`]. Rules at
//! [`RuleLevel::Error`] fail the script; [`RuleLevel::Warn`] rules only
//! warn the reviewer.

use qa_core::{Framework, Language, TestCase, ValidationResult};
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;

/// Whether a rule failure blocks approval
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleLevel {
    Error,
    Warn,
}

/// A validation rule known to the validator
#[derive(Debug, Clone, Copy)]
pub struct RuleInfo {
    pub name: &'static str,
    pub level: RuleLevel,
    pub description: &'static str,
}

pub const RULES: &[RuleInfo] = &[
    RuleInfo {
        name: "test-block",
        level: RuleLevel::Error,
        description: "script declares a test for its framework",
    },
    RuleInfo {
        name: "assertions",
        level: RuleLevel::Error,
        description: "script asserts at least one expected result",
    },
    RuleInfo {
        name: "balanced-delimiters",
        level: RuleLevel::Error,
        description: "brackets, braces and parentheses are balanced",
    },
    RuleInfo {
        name: "language-syntax",
        level: RuleLevel::Error,
        description: "no constructs from another language",
    },
    RuleInfo {
        name: "hardcoded-credentials",
        level: RuleLevel::Error,
        description: "no literal passwords, secrets or tokens",
    },
    RuleInfo {
        name: "hard-waits",
        level: RuleLevel::Warn,
        description: "no fixed sleeps",
    },
    RuleInfo {
        name: "step-coverage",
        level: RuleLevel::Warn,
        description: "every test case step has a `Step N` marker",
    },
];

/// Runs the enabled rules against generated code
#[derive(Debug, Clone, Default)]
pub struct ScriptValidator {
    disabled: BTreeSet<&'static str>,
}

impl ScriptValidator {
    /// Build a validator with some rules switched off. Unknown rule names
    /// are ignored with a warning.
    pub fn new(disabled_rules: &[String]) -> Self {
        let mut disabled = BTreeSet::new();
        for name in disabled_rules {
            match RULES.iter().find(|r| r.name == name.trim()) {
                Some(rule) => {
                    disabled.insert(rule.name);
                }
                None => log::warn!("Ignoring unknown validation rule '{name}'"),
            }
        }
        Self { disabled }
    }

    pub fn is_enabled(&self, rule: &str) -> bool {
        !self.disabled.contains(rule)
    }

    /// Validate `code` written for `case`
    pub fn validate(
        &self,
        code: &str,
        framework: Framework,
        language: Language,
        case: &TestCase,
    ) -> Vec<ValidationResult> {
        let masked = mask_literals(code, language);
        let mut results = Vec::new();
        for rule in RULES.iter().filter(|r| self.is_enabled(r.name)) {
            let problem = match rule.name {
                "test-block" => check_test_block(&masked, framework, language),
                "assertions" => check_assertions(&masked, framework, language),
                "balanced-delimiters" => check_delimiters(&masked),
                "language-syntax" => check_language_syntax(&masked, language),
                "hardcoded-credentials" => check_credentials(code),
                "hard-waits" => check_hard_waits(code),
                "step-coverage" => check_step_coverage(code, case),
                _ => None,
            };
            results.push(match (problem, rule.level) {
                (None, _) => ValidationResult::passed(rule.name, rule.description),
                (Some(message), RuleLevel::Error) => ValidationResult::failed(rule.name, message),
                (Some(message), RuleLevel::Warn) => ValidationResult::warning(rule.name, message),
            });
        }
        results
    }
}

fn regex(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("valid regex literal"))
}

fn check_test_block(code: &str, framework: Framework, language: Language) -> Option<String> {
    static PW_JS: OnceLock<Regex> = OnceLock::new();
    static PW_PY: OnceLock<Regex> = OnceLock::new();
    static CY: OnceLock<Regex> = OnceLock::new();
    let (re, expected) = match (framework, language) {
        (Framework::Playwright, Language::Python) => (
            regex(&PW_PY, r"(?m)^\s*(async\s+)?def\s+test_\w+\s*\("),
            "a `def test_...` function",
        ),
        (Framework::Playwright, _) => (regex(&PW_JS, r"\btest\s*\("), "a `test(...)` block"),
        (Framework::Cypress, _) => (regex(&CY, r"\bit\s*\("), "an `it(...)` block"),
    };
    (!re.is_match(code)).then(|| format!("no {expected} found for {framework}"))
}

fn check_assertions(code: &str, framework: Framework, language: Language) -> Option<String> {
    static JS: OnceLock<Regex> = OnceLock::new();
    static PY: OnceLock<Regex> = OnceLock::new();
    static CY: OnceLock<Regex> = OnceLock::new();
    let re = match (framework, language) {
        (Framework::Cypress, _) => regex(&CY, r"\.should\s*\(|\bexpect\s*\("),
        (Framework::Playwright, Language::Python) => {
            regex(&PY, r"(?m)\bexpect\s*\(|^\s*assert\b")
        }
        (Framework::Playwright, _) => regex(&JS, r"\bexpect\s*\("),
    };
    (!re.is_match(code)).then(|| "no assertions found".to_string())
}

fn check_delimiters(code: &str) -> Option<String> {
    let mut stack: Vec<(char, usize)> = Vec::new();
    for (line_no, line) in code.lines().enumerate() {
        for c in line.chars() {
            match c {
                '(' | '[' | '{' => stack.push((c, line_no + 1)),
                ')' | ']' | '}' => {
                    let open = match c {
                        ')' => '(',
                        ']' => '[',
                        _ => '{',
                    };
                    match stack.pop() {
                        Some((o, _)) if o == open => {}
                        Some((o, at)) => {
                            return Some(format!(
                                "'{c}' on line {} closes '{o}' opened on line {at}",
                                line_no + 1
                            ))
                        }
                        None => return Some(format!("unmatched '{c}' on line {}", line_no + 1)),
                    }
                }
                _ => {}
            }
        }
    }
    stack
        .last()
        .map(|(o, at)| format!("'{o}' opened on line {at} is never closed"))
}

fn check_language_syntax(code: &str, language: Language) -> Option<String> {
    static PY_DEF: OnceLock<Regex> = OnceLock::new();
    static TS_ONLY: OnceLock<Regex> = OnceLock::new();
    static JS_DECL: OnceLock<Regex> = OnceLock::new();
    let python_def = regex(&PY_DEF, r"(?m)^\s*def\s+\w+\s*\(.*\)\s*(->\s*\w+\s*)?:\s*$");
    match language {
        Language::TypeScript | Language::JavaScript => {
            if python_def.is_match(code) {
                return Some(format!("python function definition in {language} code"));
            }
            let ts_only = regex(
                &TS_ONLY,
                r"(?m)^\s*(export\s+)?(interface|type)\s+\w+\s*[={<]|\)\s*:\s*(string|number|boolean|void|Promise)\b|\bimport\s+type\b",
            );
            if language == Language::JavaScript && ts_only.is_match(code) {
                return Some("type annotations in javascript code".to_string());
            }
            None
        }
        Language::Python => {
            let js_decl = regex(
                &JS_DECL,
                r"(?m)\b(const|let|var)\s+\w+\s*=|=>|\bfunction\s*\w*\s*\(|;\s*$",
            );
            js_decl
                .find(code)
                .map(|m| format!("javascript construct '{}' in python code", m.as_str().trim()))
        }
    }
}

fn check_credentials(code: &str) -> Option<String> {
    static ASSIGN: OnceLock<Regex> = OnceLock::new();
    static FILL: OnceLock<Regex> = OnceLock::new();
    let assign = regex(
        &ASSIGN,
        r#"(?i)\b(password|passwd|pwd|secret|api[_-]?key|access[_-]?token)\w*["']?\s*[:=]\s*["'`][^"'`\s]{3,}["'`]"#,
    );
    let fill = regex(
        &FILL,
        r#"(?i)(password|secret)[^\n]*?\.(fill|type)\s*\(\s*["'][^"']{3,}["']|\b(fill|type)\s*\(\s*["'][^"']*(password|secret)[^"']*["']\s*,\s*["'][^"']{3,}["']"#,
    );
    assign
        .find(code)
        .or_else(|| fill.find(code))
        .map(|m| {
            let line = code[..m.start()].matches('\n').count() + 1;
            format!("literal credential on line {line}; read it from the environment")
        })
}

fn check_hard_waits(code: &str) -> Option<String> {
    static WAITS: OnceLock<Regex> = OnceLock::new();
    let re = regex(
        &WAITS,
        r"waitForTimeout\s*\(|wait_for_timeout\s*\(|cy\.wait\s*\(\s*\d|time\.sleep\s*\(|\bsetTimeout\s*\(",
    );
    let count = re.find_iter(code).count();
    (count > 0).then(|| format!("{count} fixed wait(s); wait for a condition instead"))
}

fn check_step_coverage(code: &str, case: &TestCase) -> Option<String> {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    let re = regex(&MARKER, r"(?m)(//|#)\s*Step\s+(\d+)\b");
    let marked: BTreeSet<u32> = re
        .captures_iter(code)
        .filter_map(|c| c.get(2)?.as_str().parse().ok())
        .collect();
    let missing: Vec<String> = case
        .steps
        .iter()
        .filter(|s| !marked.contains(&s.step_number))
        .map(|s| s.step_number.to_string())
        .collect();
    (!missing.is_empty()).then(|| {
        format!(
            "step(s) {} of {} have no `Step N` marker",
            missing.join(", "),
            case.id
        )
    })
}

/// Blank out string literals and comments, keeping line structure, so the
/// structural rules only see code.
fn mask_literals(code: &str, language: Language) -> String {
    let python = language == Language::Python;
    let mut out = String::with_capacity(code.len());
    let mut chars = code.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' | '\'' | '`' => {
                out.push(c);
                let quote = c;
                let mut escaped = false;
                for n in chars.by_ref() {
                    if n == '\n' && quote != '`' {
                        out.push('\n');
                        break;
                    }
                    if escaped {
                        escaped = false;
                    } else if n == '\\' {
                        escaped = true;
                    } else if n == quote {
                        out.push(quote);
                        break;
                    }
                    out.push(if n == '\n' { '\n' } else { ' ' });
                }
            }
            '#' if python => {
                while chars.peek().is_some_and(|&n| n != '\n') {
                    chars.next();
                }
            }
            '/' if !python && chars.peek() == Some(&'/') => {
                while chars.peek().is_some_and(|&n| n != '\n') {
                    chars.next();
                }
            }
            '/' if !python && chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = ' ';
                for n in chars.by_ref() {
                    if n == '\n' {
                        out.push('\n');
                    }
                    if prev == '*' && n == '/' {
                        break;
                    }
                    prev = n;
                }
            }
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
#[path = "validate_test.rs"]
mod tests;
