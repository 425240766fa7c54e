//! Ordered application of transformation rules to a document tree.

use tracing::{debug, info, instrument};

use crate::arena::{DocTree, NodeId};
use crate::query::{ContextNode, ReturnType, Value};

use super::item::{Expected, RuleItem, Verb};

/// Per-rule application counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuleOutcome {
    /// Nodes matched by the selector
    pub matched: usize,
    /// Mutations actually performed
    pub mutated: usize,
}

impl RuleOutcome {
    pub fn is_mutated(&self) -> bool {
        self.mutated > 0
    }
}

/// Applies `rules` in order, mutating `tree` in place.
///
/// `scoped_root` is the context for rules with `use_root_scope`; all other
/// rules evaluate against the whole document. Empty matches, unmet
/// conditions and missing target attributes are ordinary non-matches, never
/// errors.
#[instrument(level = "debug", skip_all, fields(rules = rules.len()))]
pub fn apply_rules(
    rules: &[RuleItem],
    tree: &mut DocTree,
    scoped_root: Option<NodeId>,
) -> Vec<RuleOutcome> {
    let mut outcomes = Vec::with_capacity(rules.len());

    for (index, rule) in rules.iter().enumerate() {
        if rule.is_empty() {
            debug!(rule = index, "skipping inert rule");
            outcomes.push(RuleOutcome::default());
            continue;
        }
        let outcome = apply_rule(rule, tree, scoped_root);
        if outcome.matched > 0 {
            info!(
                rule = index,
                matched = outcome.matched,
                mutated = outcome.mutated,
                "applied rule"
            );
        }
        outcomes.push(outcome);
    }

    outcomes
}

fn apply_rule(rule: &RuleItem, tree: &mut DocTree, scoped_root: Option<NodeId>) -> RuleOutcome {
    let context = match (rule.use_root_scope(), scoped_root) {
        (true, Some(root)) => ContextNode::Element(root),
        _ => ContextNode::Document,
    };

    // Checked by is_empty before dispatch
    let Some(selector) = rule.selector() else {
        return RuleOutcome::default();
    };
    let Some(verb) = rule.verb() else {
        return RuleOutcome::default();
    };

    // Owned snapshot of the primary set: mutation below must never run
    // through a live cursor over the tree.
    let primary = selector.select(tree, context);
    if primary.is_empty() {
        return RuleOutcome::default();
    }
    let matched = primary.len();

    let targets = match rule.condition() {
        None => primary,
        Some(condition) => {
            let mut targets = Vec::new();
            for node in primary {
                match condition.return_type() {
                    ReturnType::Number => {
                        if let Some(Expected::Number(want)) = rule.expected() {
                            if let Value::Number(got) = condition.evaluate(tree, node.clone()) {
                                #[allow(clippy::float_cmp)]
                                if got == *want {
                                    targets.push(node);
                                }
                            }
                        }
                        // Unset expectation with a numeric condition: no action
                    }
                    ReturnType::Text => {
                        if let Some(Expected::Text(want)) = rule.expected() {
                            if let Value::Text(got) = condition.evaluate(tree, node.clone()) {
                                if got == *want {
                                    targets.push(node);
                                }
                            }
                        }
                    }
                    ReturnType::Boolean => {
                        let want = match rule.expected() {
                            Some(Expected::Boolean(b)) => *b,
                            // Unset expectation: fire on plain truth
                            None => true,
                            Some(_) => continue,
                        };
                        if let Value::Boolean(got) = condition.evaluate(tree, node.clone()) {
                            if got == want {
                                targets.push(node);
                            }
                        }
                    }
                    ReturnType::NodeSet => {
                        // Re-root the condition at the matched node; the verb
                        // applies to this secondary set instead.
                        targets.extend(condition.select(tree, node));
                    }
                }
            }
            targets
        }
    };

    let mutated = apply_verb(verb, rule, &targets, tree);
    RuleOutcome { matched, mutated }
}

fn apply_verb(verb: Verb, rule: &RuleItem, targets: &[ContextNode], tree: &mut DocTree) -> usize {
    let mut mutated = 0;

    match verb {
        Verb::DeleteSelf => {
            for target in targets {
                let deleted = match target {
                    ContextNode::Element(id) => tree.detach(*id),
                    ContextNode::Attribute(id, name) => tree.remove_attribute(*id, name),
                    ContextNode::Document => false,
                };
                if deleted {
                    mutated += 1;
                }
            }
        }
        Verb::SetValue => {
            // A SetValue rule without a replacement value is inert
            let Some(value) = rule.value() else {
                return 0;
            };
            for target in targets {
                let set = match target {
                    ContextNode::Element(id) => match rule.attribute() {
                        None => tree.set_text(*id, value),
                        // Missing attribute: silent no-op
                        Some(attribute) => tree.set_attribute(*id, attribute, value),
                    },
                    ContextNode::Attribute(id, name) => tree.set_attribute(*id, name, value),
                    ContextNode::Document => false,
                };
                if set {
                    mutated += 1;
                }
            }
        }
    }

    mutated
}
