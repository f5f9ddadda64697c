/// Remediation guidance per rule, with a minimal before/after where one
/// helps. Resolved by rule id at render time.
#[derive(Debug)]
pub struct FixSuggestion {
    pub advice: &'static str,
    pub before: Option<&'static str>,
    pub after: Option<&'static str>,
}

static FIXES: &[(&str, FixSuggestion)] = &[
    (
        "engine-mix",
        FixSuggestion {
            advice: "split the file so each engine lives in its own module; their waiting and session models are incompatible",
            before: Some("from selenium import webdriver\nfrom playwright.sync_api import sync_playwright"),
            after: Some("# test_cart_selenium.py\nfrom selenium import webdriver\n\n# test_cart_playwright.py\nfrom playwright.sync_api import sync_playwright"),
        },
    ),
    (
        "missing-engine-marker",
        FixSuggestion {
            advice: "declare the engine the test targets with a pytest marker",
            before: Some("class TestCart:"),
            after: Some("@pytest.mark.playwright\nclass TestCart:"),
        },
    ),
    (
        "marker-engine-mismatch",
        FixSuggestion {
            advice: "make the marker match the imported engine, or finish the migration before re-marking",
            before: None,
            after: None,
        },
    ),
    (
        "folder-engine-mismatch",
        FixSuggestion {
            advice: "move the file into the subtree of the engine it imports",
            before: None,
            after: None,
        },
    ),
    (
        "pom-compliance/test-framework-import",
        FixSuggestion {
            advice: "components must not know their runner; move fixtures and marks into the test layer",
            before: Some("import pytest\n\nclass CartPage:"),
            after: Some("class CartPage:"),
        },
    ),
    (
        "pom-compliance/assertion-in-component",
        FixSuggestion {
            advice: "return state from the component and assert in the test",
            before: Some("def verify_total(self, expected):\n    assert self.total() == expected"),
            after: Some("def total(self):\n    return self._read_total()  # test asserts"),
        },
    ),
    (
        "pom-compliance/blocking-delay",
        FixSuggestion {
            advice: "replace fixed sleeps with the engine's explicit wait",
            before: Some("time.sleep(3)"),
            after: Some("WebDriverWait(driver, 3).until(visibility_of(element))"),
        },
    ),
    (
        "pom-compliance/io-client-import",
        FixSuggestion {
            advice: "move network/database setup behind a fixture; components only drive the UI",
            before: None,
            after: None,
        },
    ),
    (
        "direct-locator-in-test",
        FixSuggestion {
            advice: "wrap the lookup in a page component method and call that from the test",
            before: Some("driver.find_element(By.ID, 'q').send_keys('rust')"),
            after: Some("search_page.search('rust')"),
        },
    ),
    (
        "misplaced-component",
        FixSuggestion {
            advice: "move the page class under the components root",
            before: None,
            after: None,
        },
    ),
    (
        "misplaced-test",
        FixSuggestion {
            advice: "move the test file under the tests root so the runner and the gates see it",
            before: None,
            after: None,
        },
    ),
    (
        "script-entrypoint-in-test",
        FixSuggestion {
            advice: "delete the __main__ block; tests run through the test runner only",
            before: Some("if __name__ == \"__main__\":\n    test_debug()"),
            after: Some(""),
        },
    ),
    (
        "protected-flow-touched",
        FixSuggestion {
            advice: "no change needed; request a review from the flow's owners",
            before: None,
            after: None,
        },
    ),
    (
        "parse-error",
        FixSuggestion {
            advice: "fix the syntax error; an unanalyzable file cannot be audited",
            before: None,
            after: None,
        },
    ),
    (
        "expired-suppression",
        FixSuggestion {
            advice: "fix the suppressed violation, or renew the baseline entry with a new expiry and owner sign-off",
            before: None,
            after: None,
        },
    ),
    (
        "detector-failure",
        FixSuggestion {
            advice: "a rule crashed on this file; report it with the file attached",
            before: None,
            after: None,
        },
    ),
];

pub fn fix_for(rule_id: &str) -> Option<&'static FixSuggestion> {
    FIXES.iter().find(|(id, _)| *id == rule_id).map(|(_, f)| f)
}
