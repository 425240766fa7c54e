//! Tests for rule-file loading and validation.

use std::path::PathBuf;
use tempfile::TempDir;

use doctree::config::{load_rules, parse_rules};
use doctree::errors::DocError;
use doctree::rules::Verb;
use doctree::util::testing::init_test_setup;

fn write_rule_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).expect("write rule file");
    path
}

#[test]
fn given_valid_rule_file_when_loading_then_rules_are_compiled() {
    init_test_setup();
    let temp = TempDir::new().unwrap();
    let path = write_rule_file(
        &temp,
        "rules.toml",
        r#"
        scope = "reflection/apis"

        [[rule]]
        selector = "apis/api[apidata/@group='namespace']"
        verb = "DeleteSelf"
        condition = "count(elements/element) = 0"

        [[rule]]
        selector = "apis/api/containers/library"
        verb = "SetValue"
        attribute = "assembly"
        value = "Merged"
        use_root_scope = true
        "#,
    );

    let rule_set = load_rules(&path).unwrap();

    assert!(rule_set.scope.is_some());
    assert_eq!(rule_set.rules.len(), 2);
    assert_eq!(rule_set.rules[0].verb(), Some(Verb::DeleteSelf));
    assert_eq!(rule_set.rules[1].verb(), Some(Verb::SetValue));
    assert_eq!(rule_set.rules[1].attribute(), Some("assembly"));
    assert!(rule_set.rules[1].use_root_scope());
    assert!(rule_set.rules.iter().all(|r| !r.is_empty()));
}

#[test]
fn given_expected_result_when_parsing_then_tagged_union_is_decoded() {
    let rule_set = parse_rules(
        r#"
        [[rule]]
        selector = "//api"
        verb = "DeleteSelf"
        condition = "count(e)"
        expected = { kind = "number", value = 2.0 }

        [[rule]]
        selector = "//api"
        verb = "DeleteSelf"
        condition = "string(@group)"
        expected = { kind = "text", value = "namespace" }

        [[rule]]
        selector = "//api"
        verb = "DeleteSelf"
        condition = "count(e) = 0"
        expected = { kind = "boolean", value = false }
        "#,
    )
    .unwrap();

    assert_eq!(rule_set.rules.len(), 3);
    assert!(rule_set.rules.iter().all(|r| r.expected().is_some()));
}

#[test]
fn given_scalar_selector_when_parsing_then_fails_with_rule_index() {
    let err = parse_rules(
        r#"
        [[rule]]
        selector = "//api"
        verb = "DeleteSelf"

        [[rule]]
        selector = "count(//api)"
        verb = "DeleteSelf"
        "#,
    )
    .unwrap_err();

    match err {
        DocError::InvalidRule { index, reason } => {
            assert_eq!(index, 1);
            assert!(reason.contains("node-set"));
        }
        other => panic!("expected InvalidRule, got {other:?}"),
    }
}

#[test]
fn given_unknown_verb_when_parsing_then_fails() {
    let err = parse_rules(
        r#"
        [[rule]]
        selector = "//api"
        verb = "Rename"
        "#,
    )
    .unwrap_err();

    assert!(matches!(err, DocError::InvalidRule { index: 0, .. }));
}

#[test]
fn given_set_value_without_value_when_parsing_then_fails() {
    let err = parse_rules(
        r#"
        [[rule]]
        selector = "//api"
        verb = "SetValue"
        "#,
    )
    .unwrap_err();

    match err {
        DocError::InvalidRule { index, reason } => {
            assert_eq!(index, 0);
            assert!(reason.contains("value"));
        }
        other => panic!("expected InvalidRule, got {other:?}"),
    }
}

#[test]
fn given_malformed_condition_when_parsing_then_fails() {
    let err = parse_rules(
        r#"
        [[rule]]
        selector = "//api"
        verb = "DeleteSelf"
        condition = "count("
        "#,
    )
    .unwrap_err();

    assert!(matches!(err, DocError::InvalidRule { index: 0, .. }));
}

#[test]
fn given_unknown_field_when_parsing_then_fails() {
    let err = parse_rules(
        r#"
        [[rule]]
        selector = "//api"
        verb = "DeleteSelf"
        frobnicate = true
        "#,
    )
    .unwrap_err();

    assert!(matches!(err, DocError::InvalidRuleFile { .. }));
}

#[test]
fn given_missing_file_when_loading_then_file_not_found() {
    let err = load_rules(std::path::Path::new("/nonexistent/rules.toml")).unwrap_err();
    assert!(matches!(err, DocError::FileNotFound(_)));
}

#[test]
fn given_empty_rule_file_when_parsing_then_empty_set() {
    let rule_set = parse_rules("").unwrap();
    assert!(rule_set.scope.is_none());
    assert!(rule_set.rules.is_empty());
}
