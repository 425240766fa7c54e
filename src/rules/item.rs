//! Declarative description of one tree transformation.

use std::str::FromStr;

use thiserror::Error;

use crate::query::{Query, QueryError};

#[derive(Error, Debug)]
pub enum RuleError {
    #[error("unrecognized verb: {0}")]
    UnknownVerb(String),
}

/// Mutation applied to matched nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    DeleteSelf,
    SetValue,
}

impl FromStr for Verb {
    type Err = RuleError;

    // Case-insensitive, matching the rule files in the wild
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("deleteself") {
            Ok(Verb::DeleteSelf)
        } else if s.eq_ignore_ascii_case("setvalue") {
            Ok(Verb::SetValue)
        } else {
            Err(RuleError::UnknownVerb(s.to_string()))
        }
    }
}

/// Expected condition result, fixed at rule-authoring time.
#[derive(Debug, Clone, PartialEq)]
pub enum Expected {
    Number(f64),
    Text(String),
    Boolean(bool),
}

/// One validated transformation rule: selector, optional condition, verb and
/// verb parameters.
///
/// Selector and condition are validated by their setters; an invalid
/// assignment returns the error and leaves the previous value untouched, so
/// a constructed `RuleItem` never carries a malformed query into the engine.
#[derive(Debug, Clone, Default)]
pub struct RuleItem {
    selector: Option<Query>,
    verb: Option<Verb>,
    condition: Option<Query>,
    expected: Option<Expected>,
    attribute: Option<String>,
    value: Option<String>,
    use_root_scope: bool,
}

impl RuleItem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the selector. Fails unless the expression compiles to a
    /// node-set; the prior selector is retained on failure.
    pub fn set_selector(&mut self, expr: &str) -> Result<(), QueryError> {
        let query = Query::compile_selector(expr)?;
        self.selector = Some(query);
        Ok(())
    }

    pub fn selector(&self) -> Option<&Query> {
        self.selector.as_ref()
    }

    pub fn set_verb(&mut self, verb: Verb) {
        self.verb = Some(verb);
    }

    pub fn verb(&self) -> Option<Verb> {
        self.verb
    }

    /// Sets the condition; any result type is allowed. The prior condition
    /// is retained on failure.
    pub fn set_condition(&mut self, expr: &str) -> Result<(), QueryError> {
        let query = Query::compile(expr)?;
        self.condition = Some(query);
        Ok(())
    }

    pub fn condition(&self) -> Option<&Query> {
        self.condition.as_ref()
    }

    pub fn set_expected(&mut self, expected: Expected) {
        self.expected = Some(expected);
    }

    pub fn expected(&self) -> Option<&Expected> {
        self.expected.as_ref()
    }

    /// Attribute targeted by `SetValue`; empty/None targets element text.
    pub fn set_attribute(&mut self, attribute: impl Into<String>) {
        let attribute = attribute.into();
        self.attribute = if attribute.is_empty() {
            None
        } else {
            Some(attribute)
        };
    }

    pub fn attribute(&self) -> Option<&str> {
        self.attribute.as_deref()
    }

    /// Replacement value for `SetValue`.
    pub fn set_value(&mut self, value: impl Into<String>) {
        self.value = Some(value.into());
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    /// Evaluate selectors against the scoped root instead of the document.
    pub fn set_use_root_scope(&mut self, use_root_scope: bool) {
        self.use_root_scope = use_root_scope;
    }

    pub fn use_root_scope(&self) -> bool {
        self.use_root_scope
    }

    /// An inert rule: no selector or no verb. The engine skips these
    /// silently.
    pub fn is_empty(&self) -> bool {
        self.selector.is_none() || self.verb.is_none()
    }
}
