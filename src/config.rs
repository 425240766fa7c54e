//! Rule-file loading: TOML in, validated [`RuleItem`]s out.
//!
//! Invalid configuration fails the load with the offending rule's index
//! instead of being silently dropped — a malformed query must never reach
//! the engine.
//!
//! Format:
//!
//! ```toml
//! scope = "reflection/apis"          # optional scoped root for use_root_scope rules
//!
//! [[rule]]
//! selector = "apis/api[apidata/@group='namespace']"
//! verb = "DeleteSelf"
//! condition = "count(elements/element) = 0"   # optional
//! expected = { kind = "boolean", value = true }  # optional
//!
//! [[rule]]
//! selector = "apis/api/containers/library"
//! verb = "SetValue"
//! attribute = "assembly"
//! value = "Merged"
//! use_root_scope = true
//! ```

use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::instrument;

use crate::errors::{DocError, DocResult};
use crate::query::Query;
use crate::rules::{Expected, RuleItem, Verb};

/// Raw rule record as written in the TOML file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleSpec {
    pub selector: String,
    pub verb: String,
    pub condition: Option<String>,
    pub expected: Option<ExpectedSpec>,
    pub attribute: Option<String>,
    pub value: Option<String>,
    #[serde(default)]
    pub use_root_scope: bool,
}

/// Raw expected-result record: `{ kind = "number" | "text" | "boolean", value = … }`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum ExpectedSpec {
    Number(f64),
    Text(String),
    Boolean(bool),
}

impl From<ExpectedSpec> for Expected {
    fn from(spec: ExpectedSpec) -> Self {
        match spec {
            ExpectedSpec::Number(n) => Expected::Number(n),
            ExpectedSpec::Text(s) => Expected::Text(s),
            ExpectedSpec::Boolean(b) => Expected::Boolean(b),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct RuleFile {
    scope: Option<String>,
    #[serde(default, rename = "rule")]
    rules: Vec<RuleSpec>,
}

/// A loaded, fully validated rule list.
#[derive(Debug, Default)]
pub struct RuleSet {
    /// Scoped-root query for rules with `use_root_scope`
    pub scope: Option<Query>,
    pub rules: Vec<RuleItem>,
}

/// Loads and validates a TOML rule file.
#[instrument(level = "debug")]
pub fn load_rules(path: &Path) -> DocResult<RuleSet> {
    if !path.exists() {
        return Err(DocError::FileNotFound(path.to_path_buf()));
    }
    let content = fs::read_to_string(path)?;
    parse_rules(&content).map_err(|e| match e {
        DocError::InvalidRuleFile { reason, .. } => DocError::InvalidRuleFile {
            path: path.to_path_buf(),
            reason,
        },
        other => other,
    })
}

/// Parses rule-file content; exposed separately for in-memory callers.
pub fn parse_rules(content: &str) -> DocResult<RuleSet> {
    let file: RuleFile = toml::from_str(content).map_err(|e| DocError::InvalidRuleFile {
        path: Default::default(),
        reason: e.to_string(),
    })?;

    let scope = match file.scope.as_deref() {
        Some(expr) => Some(Query::compile_selector(expr)?),
        None => None,
    };

    let mut rules = Vec::with_capacity(file.rules.len());
    for (index, spec) in file.rules.into_iter().enumerate() {
        rules.push(build_rule(spec, index)?);
    }

    Ok(RuleSet { scope, rules })
}

fn build_rule(spec: RuleSpec, index: usize) -> DocResult<RuleItem> {
    let invalid = |reason: String| DocError::InvalidRule { index, reason };

    let mut rule = RuleItem::new();
    rule.set_selector(&spec.selector)
        .map_err(|e| invalid(e.to_string()))?;

    let verb: Verb = spec.verb.parse().map_err(|e: crate::rules::RuleError| {
        invalid(e.to_string())
    })?;
    rule.set_verb(verb);

    if let Some(condition) = &spec.condition {
        rule.set_condition(condition)
            .map_err(|e| invalid(e.to_string()))?;
    }
    if let Some(expected) = spec.expected {
        rule.set_expected(expected.into());
    }
    if let Some(attribute) = spec.attribute {
        rule.set_attribute(attribute);
    }
    match spec.value {
        Some(value) => rule.set_value(value),
        None if verb == Verb::SetValue => {
            return Err(invalid("SetValue requires a value".to_string()));
        }
        None => {}
    }
    rule.set_use_root_scope(spec.use_root_scope);

    Ok(rule)
}
