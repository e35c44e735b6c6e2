//! Script templates per framework and language

use crate::error::GenResult;
use minijinja::{context, Environment};
use qa_core::{Framework, Language, TestCase};
use serde::Serialize;

const PLAYWRIGHT_JS: &str = r#"{% if language == "typescript" %}import { test, expect } from '@playwright/test';{% else %}const { test, expect } = require('@playwright/test');{% endif %}

// {{ case.id }} {{ case.version }}, scenario {{ case.scenario_id }}
test.describe({{ case.id | quote }}, () => {
  test({{ case.title | quote }}, async ({ page }) => {
{%- for step in steps %}
    // Step {{ step.number }}: {{ step.action }}
{%- if step.kind == "navigate" %}
    await page.goto({{ step.target | quote }});
{%- elif step.kind == "click" %}
    await page.getByText({{ step.target | quote }}).click();
{%- elif step.kind == "fill" %}
    await page.getByLabel({{ step.target | quote }}).fill(process.env.{{ step.env }} ?? '');
{%- endif %}
{%- if step.snapshot %}
    await page.screenshot({ path: {{ step.screenshot | quote }} });
{%- endif %}
{%- endfor %}
{%- for expected in case.expected_results %}
    await expect(page.getByText({{ expected | quote }})).toBeVisible();
{%- endfor %}
  });
});
"#;

const PLAYWRIGHT_PY: &str = r#"import os

from playwright.sync_api import Page, expect


# {{ case.id }} {{ case.version }}, scenario {{ case.scenario_id }}
def test_{{ case.id | lower | replace("-", "_") }}(page: Page):
{%- for step in steps %}
    # Step {{ step.number }}: {{ step.action }}
{%- if step.kind == "navigate" %}
    page.goto({{ step.target | quote }})
{%- elif step.kind == "click" %}
    page.get_by_text({{ step.target | quote }}).click()
{%- elif step.kind == "fill" %}
    page.get_by_label({{ step.target | quote }}).fill(os.environ.get({{ step.env | quote }}, ""))
{%- endif %}
{%- if step.snapshot %}
    page.screenshot(path={{ step.screenshot | quote }})
{%- endif %}
{%- endfor %}
{%- for expected in case.expected_results %}
    expect(page.get_by_text({{ expected | quote }})).to_be_visible()
{%- endfor %}
"#;

const CYPRESS: &str = r#"// {{ case.id }} {{ case.version }}, scenario {{ case.scenario_id }}
describe({{ case.id | quote }}, () => {
  it({{ case.title | quote }}, () => {
{%- for step in steps %}
    // Step {{ step.number }}: {{ step.action }}
{%- if step.kind == "navigate" %}
    cy.visit({{ step.target | quote }});
{%- elif step.kind == "click" %}
    cy.contains({{ step.target | quote }}).click();
{%- elif step.kind == "fill" %}
    cy.contains('label', {{ step.target | quote }}).parent().find('input').type(Cypress.env({{ step.env | quote }}));
{%- endif %}
{%- if step.snapshot %}
    cy.screenshot({{ step.screenshot | quote }});
{%- endif %}
{%- endfor %}
{%- for expected in case.expected_results %}
    cy.contains({{ expected | quote }}).should('be.visible');
{%- endfor %}
  });
});
"#;

/// What a step does in the browser
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum StepKind {
    Navigate,
    Click,
    Fill,
    /// Described in a comment only
    Note,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct StepView {
    pub number: u32,
    pub action: String,
    pub kind: StepKind,
    pub target: String,
    /// Environment variable holding the value typed by a fill step
    pub env: String,
    pub snapshot: bool,
    pub screenshot: String,
}

const NAVIGATE_VERBS: &[&str] = &["navigate to", "go to", "open", "visit"];
const CLICK_VERBS: &[&str] = &["click", "select", "selects", "press", "tap", "choose", "submit"];
const FILL_VERBS: &[&str] = &["enter", "enters", "type", "fill in", "fill", "input"];

fn strip_verb<'a>(action: &'a str, verbs: &[&str]) -> Option<&'a str> {
    let lower = action.to_lowercase();
    verbs.iter().find_map(|verb| {
        let rest = lower.strip_prefix(verb)?;
        if !(rest.is_empty() || rest.starts_with(' ') || rest.starts_with(':')) {
            return None;
        }
        action
            .get(verb.len()..)
            .map(|r| r.trim_start_matches([' ', ':']))
    })
}

fn strip_article(s: &str) -> &str {
    for article in ["the ", "a ", "an ", "on "] {
        let head = s.get(..article.len());
        if s.len() > article.len() && head.is_some_and(|h| h.eq_ignore_ascii_case(article)) {
            return &s[article.len()..];
        }
    }
    s
}

fn quoted(action: &str) -> Option<&str> {
    let start = action.find('"')? + 1;
    let len = action[start..].find('"')?;
    Some(&action[start..start + len])
}

fn slug(s: &str, sep: char) -> String {
    s.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(&sep.to_string())
}

/// Map a natural-language step onto a browser action
pub(crate) fn classify_step(case: &TestCase, number: u32, action: &str, snapshot: bool) -> StepView {
    let (kind, target) = if let Some(rest) = strip_verb(action, NAVIGATE_VERBS) {
        let page = strip_article(rest).to_lowercase();
        let path = if page.is_empty() || page.contains("home") || page.contains("application") {
            "/".to_string()
        } else {
            format!("/{}", slug(&page, '-'))
        };
        (StepKind::Navigate, path)
    } else if let Some(rest) = strip_verb(action, CLICK_VERBS) {
        let label = quoted(rest).unwrap_or_else(|| {
            strip_article(rest)
                .trim_end_matches(" button")
                .trim_end_matches(" link")
        });
        (StepKind::Click, label.to_string())
    } else if let Some(rest) = strip_verb(action, FILL_VERBS) {
        (StepKind::Fill, strip_article(rest).to_string())
    } else {
        (StepKind::Note, String::new())
    };
    let env = if kind == StepKind::Fill {
        format!("QA_{}", slug(&target, '_').to_uppercase())
    } else {
        String::new()
    };
    StepView {
        number,
        action: action.replace('\n', " "),
        kind,
        target,
        env,
        snapshot,
        screenshot: format!("{}-step-{number}.png", case.id),
    }
}

/// Render automation code for `case`
pub(crate) struct ScriptTemplates {
    env: Environment<'static>,
}

impl ScriptTemplates {
    pub fn new() -> GenResult<Self> {
        let mut env = Environment::new();
        env.add_filter("quote", quote);
        env.add_template("playwright_js", PLAYWRIGHT_JS)?;
        env.add_template("playwright_py", PLAYWRIGHT_PY)?;
        env.add_template("cypress", CYPRESS)?;
        Ok(Self { env })
    }

    pub fn render(&self, case: &TestCase, framework: Framework, language: Language) -> GenResult<String> {
        let name = match (framework, language) {
            (Framework::Playwright, Language::Python) => "playwright_py",
            (Framework::Playwright, _) => "playwright_js",
            (Framework::Cypress, _) => "cypress",
        };
        let steps: Vec<StepView> = case
            .steps
            .iter()
            .map(|s| classify_step(case, s.step_number, &s.action, s.take_snapshot))
            .collect();
        let template = self.env.get_template(name)?;
        Ok(template.render(context! {
            case => case,
            steps => steps,
            language => language.as_str(),
        })?)
    }
}

/// Single-quoted string literal valid in JavaScript, TypeScript and Python
fn quote(value: String) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            _ => out.push(c),
        }
    }
    out.push('\'');
    out
}

#[cfg(test)]
#[path = "scripts_test.rs"]
mod tests;
