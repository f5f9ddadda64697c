use std::fs;

use archaudit::{
    parse_markdown_counts, render, render_comment, AuditConfig, AuditOptions, AuditResult,
    Auditor, ReportFormat,
};
use tempfile::TempDir;

fn write_tree(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for (path, content) in files {
        let full = dir.path().join(path);
        fs::create_dir_all(full.parent().unwrap()).unwrap();
        fs::write(full, content).unwrap();
    }
    dir
}

async fn audit_messy_tree() -> AuditResult {
    let dir = write_tree(&[
        (
            "tests/test_mixed.py",
            "from selenium import webdriver\nfrom playwright.sync_api import expect\n\ndef test_mixed():\n    pass\n",
        ),
        (
            "pages/cart_page.py",
            "import time\n\nclass CartPage:\n    def settle(self):\n        time.sleep(2)\n        assert True\n",
        ),
        (
            "tests/test_lookup.py",
            "import pytest\n\n@pytest.mark.selenium\ndef test_lookup(driver):\n    driver.find_element(By.ID, 'q')\n",
        ),
    ]);
    let auditor = Auditor::new(AuditConfig::default(), dir.path()).unwrap();
    auditor.audit(&AuditOptions::default()).await.unwrap()
}

#[tokio::test]
async fn markdown_round_trip_recovers_category_counts() {
    let result = audit_messy_tree().await;
    assert!(!result.category_counts.is_empty());

    let markdown = render(&result, ReportFormat::Markdown).unwrap();
    let recovered = parse_markdown_counts(&markdown);

    assert_eq!(recovered, result.category_counts);
}

#[tokio::test]
async fn all_three_formats_agree_on_the_same_result() {
    let result = audit_messy_tree().await;

    let terminal = render(&result, ReportFormat::Terminal).unwrap();
    let markdown = render(&result, ReportFormat::Markdown).unwrap();
    let json = render(&result, ReportFormat::Json).unwrap();

    let from_json: AuditResult = serde_json::from_str(&json).unwrap();
    assert_eq!(from_json.category_counts, result.category_counts);
    assert_eq!(from_json.passed, result.passed);

    // Every active rule id shows up in every textual form.
    for finding in &result.active {
        assert!(terminal.contains(&finding.rule_id), "terminal missing {}", finding.rule_id);
        assert!(markdown.contains(&finding.rule_id), "markdown missing {}", finding.rule_id);
    }

    assert!(terminal.contains("FAILED"));
    assert!(markdown.contains("❌ FAILED"));
}

#[tokio::test]
async fn review_comment_shows_blocking_findings_with_fixes() {
    let result = audit_messy_tree().await;
    let config = AuditConfig::default();
    let comment = render_comment(&result, &config.blocking_set(false));

    assert!(comment.contains("❌ architecture audit failed"));
    assert!(comment.contains("engine-mix"));
    assert!(comment.contains("fix:"));
    // Warnings are reported in the counts but not listed as blocking.
    assert!(!comment.contains("direct-locator-in-test"));
}

#[tokio::test]
async fn saved_json_result_reloads_for_comment_rendering() {
    let result = audit_messy_tree().await;
    let json = render(&result, ReportFormat::Json).unwrap();

    let reloaded: AuditResult = serde_json::from_str(&json).unwrap();
    let config = AuditConfig::default();
    let a = render_comment(&result, &config.blocking_set(false));
    let b = render_comment(&reloaded, &config.blocking_set(false));
    assert_eq!(a, b);
}
