use super::*;
use crate::test_utils::checkout_case;

#[test]
fn test_classify_step() {
    let case = checkout_case();
    let nav = classify_step(&case, 1, "Navigate to shopping cart", false);
    assert_eq!(nav.kind, StepKind::Navigate);
    assert_eq!(nav.target, "/shopping-cart");

    let click = classify_step(&case, 2, "Click \"Proceed to Checkout\" button", false);
    assert_eq!(click.kind, StepKind::Click);
    assert_eq!(click.target, "Proceed to Checkout");

    let fill = classify_step(&case, 3, "Enter credit card details", false);
    assert_eq!(fill.kind, StepKind::Fill);
    assert_eq!(fill.target, "credit card details");
    assert_eq!(fill.env, "QA_CREDIT_CARD_DETAILS");

    let note = classify_step(&case, 4, "Wait for session timeout (>15 minutes)", true);
    assert_eq!(note.kind, StepKind::Note);
    assert_eq!(note.screenshot, "TC-001-step-4.png");
}

#[test]
fn test_verbs_need_a_word_boundary() {
    let case = checkout_case();
    assert_eq!(
        classify_step(&case, 1, "Openly discuss the cart", false).kind,
        StepKind::Note
    );
    let step = classify_step(&case, 1, "Selects a payment method", false);
    assert_eq!(step.kind, StepKind::Click);
    assert_eq!(step.target, "payment method");
    assert_eq!(
        classify_step(&case, 1, "Open the application", false).target,
        "/"
    );
}

#[test]
fn test_quote_filter_escapes() {
    assert_eq!(quote("it's".to_string()), r"'it\'s'");
    assert_eq!(quote("a\\b".to_string()), r"'a\\b'");
}

#[test]
fn test_render_playwright_typescript() {
    let templates = ScriptTemplates::new().unwrap();
    let code = templates
        .render(&checkout_case(), Framework::Playwright, Language::TypeScript)
        .unwrap();
    assert!(code.starts_with("import { test, expect } from '@playwright/test';"));
    assert!(code.contains("test('Successful checkout with valid credit card', async ({ page }) => {"));
    assert!(code.contains("    // Step 1: Navigate to shopping cart\n    await page.goto('/shopping-cart');"));
    assert!(code.contains("await page.getByText('Proceed to Checkout').click();"));
    assert!(code.contains("fill(process.env.QA_CREDIT_CARD_DETAILS ?? '');"));
    assert!(code.contains("await page.screenshot({ path: 'TC-001-step-4.png' });"));
    assert!(code.contains("await expect(page.getByText('Order confirmation displayed')).toBeVisible();"));
}

#[test]
fn test_render_playwright_javascript_uses_require() {
    let templates = ScriptTemplates::new().unwrap();
    let code = templates
        .render(&checkout_case(), Framework::Playwright, Language::JavaScript)
        .unwrap();
    assert!(code.starts_with("const { test, expect } = require('@playwright/test');"));
}

#[test]
fn test_render_playwright_python() {
    let templates = ScriptTemplates::new().unwrap();
    let code = templates
        .render(&checkout_case(), Framework::Playwright, Language::Python)
        .unwrap();
    assert!(code.contains("def test_tc_001(page: Page):"));
    assert!(code.contains("    # Step 1: Navigate to shopping cart\n    page.goto('/shopping-cart')"));
    assert!(code.contains("fill(os.environ.get('QA_CREDIT_CARD_DETAILS', \"\"))"));
    assert!(code.contains("expect(page.get_by_text('Order confirmation displayed')).to_be_visible()"));
}

#[test]
fn test_render_cypress() {
    let templates = ScriptTemplates::new().unwrap();
    let code = templates
        .render(&checkout_case(), Framework::Cypress, Language::TypeScript)
        .unwrap();
    assert!(code.contains("describe('TC-001', () => {"));
    assert!(code.contains("cy.visit('/shopping-cart');"));
    assert!(code.contains("cy.screenshot('TC-001-step-4.png');"));
    assert!(code.contains("cy.contains('Order confirmation displayed').should('be.visible');"));
}
