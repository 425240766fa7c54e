//! Evaluation of compiled expressions against a [`DocTree`].
//!
//! Evaluation is infallible: malformed expressions are rejected at compile
//! time, and runtime oddities (stale handles, empty sets, NaN arithmetic)
//! degrade to the XPath-style neutral values instead of erroring.

use std::collections::{HashMap, HashSet};

use crate::arena::{DocTree, NodeId};

use super::ast::{ArithOp, Axis, CmpOp, Expr, Func, NameTest, Path, Step};

/// A node yielded by (or given to) a query. Conditions may select attribute
/// nodes, and verbs apply to them directly, so attributes are first-class
/// here.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ContextNode {
    /// The virtual document node above the root element; relative paths
    /// evaluated here behave like absolute ones.
    Document,
    Element(NodeId),
    /// Attribute of an element, identified by owner and name.
    Attribute(NodeId, String),
}

/// Typed evaluation result.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Nodes(Vec<ContextNode>),
    Number(f64),
    Text(String),
    Boolean(bool),
}

impl Value {
    pub fn into_nodes(self) -> Vec<ContextNode> {
        match self {
            Value::Nodes(nodes) => nodes,
            _ => Vec::new(),
        }
    }
}

struct EvalContext<'t> {
    tree: &'t DocTree,
    node: ContextNode,
    /// 1-based position within the current predicate's candidate list
    position: usize,
    /// Size of the current predicate's candidate list
    size: usize,
}

pub fn evaluate(expr: &Expr, tree: &DocTree, node: ContextNode) -> Value {
    let ctx = EvalContext {
        tree,
        node,
        position: 1,
        size: 1,
    };
    eval(expr, &ctx)
}

fn eval(expr: &Expr, ctx: &EvalContext) -> Value {
    match expr {
        Expr::Or(lhs, rhs) => {
            Value::Boolean(to_boolean(&eval(lhs, ctx), ctx.tree) || to_boolean(&eval(rhs, ctx), ctx.tree))
        }
        Expr::And(lhs, rhs) => {
            Value::Boolean(to_boolean(&eval(lhs, ctx), ctx.tree) && to_boolean(&eval(rhs, ctx), ctx.tree))
        }
        Expr::Compare(op, lhs, rhs) => {
            Value::Boolean(compare(*op, &eval(lhs, ctx), &eval(rhs, ctx), ctx.tree))
        }
        Expr::Arith(op, lhs, rhs) => {
            let l = to_number(&eval(lhs, ctx), ctx.tree);
            let r = to_number(&eval(rhs, ctx), ctx.tree);
            Value::Number(match op {
                ArithOp::Add => l + r,
                ArithOp::Sub => l - r,
                ArithOp::Div => l / r,
                ArithOp::Mod => l % r,
            })
        }
        Expr::Neg(inner) => Value::Number(-to_number(&eval(inner, ctx), ctx.tree)),
        Expr::Union(lhs, rhs) => {
            let mut nodes = eval(lhs, ctx).into_nodes();
            let mut seen: HashSet<ContextNode> = nodes.iter().cloned().collect();
            for node in eval(rhs, ctx).into_nodes() {
                if seen.insert(node.clone()) {
                    nodes.push(node);
                }
            }
            sort_document_order(&mut nodes, ctx.tree);
            Value::Nodes(nodes)
        }
        Expr::Call(func, args) => eval_call(*func, args, ctx),
        Expr::Path(path) => Value::Nodes(eval_path(path, ctx)),
        Expr::Number(n) => Value::Number(*n),
        Expr::Literal(s) => Value::Text(s.clone()),
    }
}

fn eval_call(func: Func, args: &[Expr], ctx: &EvalContext) -> Value {
    let arg_or_context_string = |n: usize| -> String {
        args.get(n)
            .map(|a| to_string(&eval(a, ctx), ctx.tree))
            .unwrap_or_else(|| node_string_value(&ctx.node, ctx.tree))
    };

    match func {
        Func::Count => Value::Number(eval(&args[0], ctx).into_nodes().len() as f64),
        Func::Not => Value::Boolean(!to_boolean(&eval(&args[0], ctx), ctx.tree)),
        Func::True => Value::Boolean(true),
        Func::False => Value::Boolean(false),
        Func::BooleanFn => match args.first() {
            Some(arg) => Value::Boolean(to_boolean(&eval(arg, ctx), ctx.tree)),
            None => Value::Boolean(!node_string_value(&ctx.node, ctx.tree).is_empty()),
        },
        Func::NumberFn => match args.first() {
            Some(arg) => Value::Number(to_number(&eval(arg, ctx), ctx.tree)),
            None => Value::Number(parse_number(&node_string_value(&ctx.node, ctx.tree))),
        },
        Func::StringFn => Value::Text(arg_or_context_string(0)),
        Func::Concat => {
            let mut out = String::new();
            for arg in args {
                out.push_str(&to_string(&eval(arg, ctx), ctx.tree));
            }
            Value::Text(out)
        }
        Func::StartsWith => {
            let haystack = to_string(&eval(&args[0], ctx), ctx.tree);
            let prefix = to_string(&eval(&args[1], ctx), ctx.tree);
            Value::Boolean(haystack.starts_with(&prefix))
        }
        Func::Contains => {
            let haystack = to_string(&eval(&args[0], ctx), ctx.tree);
            let needle = to_string(&eval(&args[1], ctx), ctx.tree);
            Value::Boolean(haystack.contains(&needle))
        }
        Func::StringLength => Value::Number(arg_or_context_string(0).chars().count() as f64),
        Func::NormalizeSpace => Value::Text(
            arg_or_context_string(0)
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" "),
        ),
        Func::Name => {
            let node = match args.first() {
                Some(arg) => eval(arg, ctx).into_nodes().into_iter().next(),
                None => Some(ctx.node.clone()),
            };
            Value::Text(node.map(|n| node_name(&n, ctx.tree)).unwrap_or_default())
        }
        Func::Position => Value::Number(ctx.position as f64),
        Func::Last => Value::Number(ctx.size as f64),
    }
}

fn eval_path(path: &Path, ctx: &EvalContext) -> Vec<ContextNode> {
    let mut current = if path.absolute {
        vec![ContextNode::Document]
    } else {
        vec![ctx.node.clone()]
    };
    for step in &path.steps {
        current = apply_step(&current, step, ctx.tree);
        if current.is_empty() {
            break;
        }
    }
    current
}

fn apply_step(sources: &[ContextNode], step: &Step, tree: &DocTree) -> Vec<ContextNode> {
    let mut out = Vec::new();
    let mut seen: HashSet<ContextNode> = HashSet::new();

    for source in sources {
        let mut candidates = expand_axis(source, step, tree);
        for predicate in &step.predicates {
            let size = candidates.len();
            candidates = candidates
                .into_iter()
                .enumerate()
                .filter(|(i, node)| {
                    let pred_ctx = EvalContext {
                        tree,
                        node: node.clone(),
                        position: i + 1,
                        size,
                    };
                    predicate_holds(predicate, &pred_ctx)
                })
                .map(|(_, node)| node)
                .collect();
        }
        for candidate in candidates {
            if seen.insert(candidate.clone()) {
                out.push(candidate);
            }
        }
    }
    out
}

fn predicate_holds(predicate: &Expr, ctx: &EvalContext) -> bool {
    match eval(predicate, ctx) {
        // A bare number is a position test
        Value::Number(n) => (ctx.position as f64) == n,
        Value::Boolean(b) => b,
        Value::Nodes(nodes) => !nodes.is_empty(),
        Value::Text(s) => !s.is_empty(),
    }
}

fn expand_axis(source: &ContextNode, step: &Step, tree: &DocTree) -> Vec<ContextNode> {
    match step.axis {
        Axis::Child => match source {
            ContextNode::Document => tree
                .root()
                .into_iter()
                .filter(|&id| element_matches(id, &step.test, tree))
                .map(ContextNode::Element)
                .collect(),
            ContextNode::Element(id) => tree
                .node(*id)
                .map(|n| n.children.clone())
                .unwrap_or_default()
                .into_iter()
                .filter(|&c| element_matches(c, &step.test, tree))
                .map(ContextNode::Element)
                .collect(),
            ContextNode::Attribute(..) => Vec::new(),
        },
        Axis::Attribute => match source {
            ContextNode::Element(id) => tree
                .node(*id)
                .map(|n| {
                    n.attributes
                        .iter()
                        .filter(|(k, _)| match &step.test {
                            NameTest::Name(name) => k == name,
                            NameTest::Any | NameTest::Node => true,
                        })
                        .map(|(k, _)| ContextNode::Attribute(*id, k.clone()))
                        .collect()
                })
                .unwrap_or_default(),
            _ => Vec::new(),
        },
        Axis::SelfNode => match source {
            ContextNode::Element(id) if !element_matches(*id, &step.test, tree) => Vec::new(),
            ContextNode::Document if step.test != NameTest::Node => Vec::new(),
            _ => vec![source.clone()],
        },
        Axis::Parent => match source {
            ContextNode::Element(id) => match tree.node(*id).and_then(|n| n.parent) {
                Some(parent) => vec![ContextNode::Element(parent)],
                None => vec![ContextNode::Document],
            },
            ContextNode::Attribute(id, _) => vec![ContextNode::Element(*id)],
            ContextNode::Document => Vec::new(),
        },
        Axis::DescendantOrSelf => {
            // Only produced by `//`, whose test is node()
            let mut out = Vec::new();
            match source {
                ContextNode::Document => {
                    out.push(ContextNode::Document);
                    if let Some(root) = tree.root() {
                        out.extend(tree.subtree(root).into_iter().map(ContextNode::Element));
                    }
                }
                ContextNode::Element(id) => {
                    out.extend(tree.subtree(*id).into_iter().map(ContextNode::Element));
                }
                ContextNode::Attribute(..) => out.push(source.clone()),
            }
            out
        }
    }
}

fn element_matches(id: NodeId, test: &NameTest, tree: &DocTree) -> bool {
    match test {
        NameTest::Any | NameTest::Node => tree.node(id).is_some(),
        NameTest::Name(name) => tree.node(id).is_some_and(|n| &n.name == name),
    }
}

fn node_name(node: &ContextNode, tree: &DocTree) -> String {
    match node {
        ContextNode::Document => String::new(),
        ContextNode::Element(id) => tree.node(*id).map(|n| n.name.clone()).unwrap_or_default(),
        ContextNode::Attribute(_, name) => name.clone(),
    }
}

/// XPath string-value of a node.
pub fn node_string_value(node: &ContextNode, tree: &DocTree) -> String {
    match node {
        ContextNode::Document => tree
            .root()
            .map(|root| tree.string_value(root))
            .unwrap_or_default(),
        ContextNode::Element(id) => tree.string_value(*id),
        ContextNode::Attribute(id, name) => tree
            .attribute(*id, name)
            .map(str::to_string)
            .unwrap_or_default(),
    }
}

fn sort_document_order(nodes: &mut [ContextNode], tree: &DocTree) {
    let mut order: HashMap<NodeId, usize> = HashMap::new();
    for (position, (id, _)) in tree.iter().enumerate() {
        order.insert(id, position);
    }
    let rank = |node: &ContextNode| -> (usize, usize) {
        match node {
            ContextNode::Document => (0, 0),
            // Attributes sort right after their owner element
            ContextNode::Element(id) => (order.get(id).map(|p| p + 1).unwrap_or(usize::MAX), 0),
            ContextNode::Attribute(id, _) => {
                (order.get(id).map(|p| p + 1).unwrap_or(usize::MAX), 1)
            }
        }
    };
    nodes.sort_by_key(rank);
}

pub fn to_boolean(value: &Value, _tree: &DocTree) -> bool {
    match value {
        Value::Boolean(b) => *b,
        Value::Number(n) => *n != 0.0 && !n.is_nan(),
        Value::Text(s) => !s.is_empty(),
        Value::Nodes(nodes) => !nodes.is_empty(),
    }
}

pub fn to_number(value: &Value, tree: &DocTree) -> f64 {
    match value {
        Value::Number(n) => *n,
        Value::Boolean(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        Value::Text(s) => parse_number(s),
        Value::Nodes(nodes) => match nodes.first() {
            Some(node) => parse_number(&node_string_value(node, tree)),
            None => f64::NAN,
        },
    }
}

pub fn to_string(value: &Value, tree: &DocTree) -> String {
    match value {
        Value::Text(s) => s.clone(),
        Value::Boolean(b) => b.to_string(),
        Value::Number(n) => format_number(*n),
        Value::Nodes(nodes) => match nodes.first() {
            Some(node) => node_string_value(node, tree),
            None => String::new(),
        },
    }
}

fn parse_number(s: &str) -> f64 {
    s.trim().parse::<f64>().unwrap_or(f64::NAN)
}

/// XPath number formatting: integral values print without a fraction.
fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n == n.trunc() && n.is_finite() {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

#[allow(clippy::float_cmp)]
fn compare(op: CmpOp, lhs: &Value, rhs: &Value, tree: &DocTree) -> bool {
    use Value::Nodes;

    // Node-set against node-set or scalar: exists-semantics
    match (lhs, rhs) {
        (Nodes(l), Nodes(r)) => {
            return l.iter().any(|ln| {
                let ls = node_string_value(ln, tree);
                r.iter().any(|rn| {
                    let rs = node_string_value(rn, tree);
                    compare_scalars(op, &Value::Text(ls.clone()), &Value::Text(rs))
                })
            });
        }
        (Nodes(l), scalar) => {
            return l.iter().any(|node| {
                let s = node_string_value(node, tree);
                compare_scalars(op, &Value::Text(s), scalar)
            });
        }
        (scalar, Nodes(r)) => {
            return r.iter().any(|node| {
                let s = node_string_value(node, tree);
                compare_scalars(op, scalar, &Value::Text(s))
            });
        }
        _ => {}
    }
    compare_scalars(op, lhs, rhs)
}

/// Comparison of non-node-set values. Booleans win the coercion contest,
/// then numbers, then strings; relational operators are always numeric.
#[allow(clippy::float_cmp)]
fn compare_scalars(op: CmpOp, lhs: &Value, rhs: &Value) -> bool {
    match op {
        CmpOp::Eq | CmpOp::Ne => {
            let equal = match (lhs, rhs) {
                (Value::Boolean(_), _) | (_, Value::Boolean(_)) => {
                    scalar_boolean(lhs) == scalar_boolean(rhs)
                }
                (Value::Number(_), _) | (_, Value::Number(_)) => {
                    scalar_number(lhs) == scalar_number(rhs)
                }
                _ => scalar_string(lhs) == scalar_string(rhs),
            };
            if op == CmpOp::Eq {
                equal
            } else {
                !equal
            }
        }
        CmpOp::Lt => scalar_number(lhs) < scalar_number(rhs),
        CmpOp::Le => scalar_number(lhs) <= scalar_number(rhs),
        CmpOp::Gt => scalar_number(lhs) > scalar_number(rhs),
        CmpOp::Ge => scalar_number(lhs) >= scalar_number(rhs),
    }
}

fn scalar_boolean(value: &Value) -> bool {
    match value {
        Value::Boolean(b) => *b,
        Value::Number(n) => *n != 0.0 && !n.is_nan(),
        Value::Text(s) => !s.is_empty(),
        Value::Nodes(nodes) => !nodes.is_empty(),
    }
}

fn scalar_number(value: &Value) -> f64 {
    match value {
        Value::Number(n) => *n,
        Value::Boolean(true) => 1.0,
        Value::Boolean(false) => 0.0,
        Value::Text(s) => parse_number(s),
        Value::Nodes(_) => f64::NAN,
    }
}

fn scalar_string(value: &Value) -> String {
    match value {
        Value::Text(s) => s.clone(),
        Value::Boolean(b) => b.to_string(),
        Value::Number(n) => format_number(*n),
        Value::Nodes(_) => String::new(),
    }
}
