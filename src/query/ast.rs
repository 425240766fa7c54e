//! Expression AST for the path-query language and its static typing.

use std::fmt;

/// Static result type of a compiled query. The rule engine dispatches on
/// this, so it is derived from the expression shape at compile time, never
/// from a runtime value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnType {
    NodeSet,
    Number,
    Text,
    Boolean,
}

impl fmt::Display for ReturnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReturnType::NodeSet => "node-set",
            ReturnType::Number => "number",
            ReturnType::Text => "text",
            ReturnType::Boolean => "boolean",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Child,
    Attribute,
    SelfNode,
    Parent,
    DescendantOrSelf,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NameTest {
    /// Exact element or attribute name
    Name(String),
    /// `*` — any element (or any attribute on the attribute axis)
    Any,
    /// `node()` — any node kind; produced by the `//` shorthand
    Node,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub axis: Axis,
    pub test: NameTest,
    pub predicates: Vec<Expr>,
}

impl Step {
    /// The step injected for every `//` separator.
    pub fn descendant_or_self() -> Self {
        Step {
            axis: Axis::DescendantOrSelf,
            test: NameTest::Node,
            predicates: Vec::new(),
        }
    }

    pub fn self_node() -> Self {
        Step {
            axis: Axis::SelfNode,
            test: NameTest::Node,
            predicates: Vec::new(),
        }
    }

    pub fn parent() -> Self {
        Step {
            axis: Axis::Parent,
            test: NameTest::Node,
            predicates: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    pub absolute: bool,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Div,
    Mod,
}

/// Built-in function set, resolved at parse time so unknown names and bad
/// arities fail compilation, not evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Func {
    Count,
    Not,
    True,
    False,
    BooleanFn,
    NumberFn,
    StringFn,
    Concat,
    StartsWith,
    Contains,
    StringLength,
    NormalizeSpace,
    Name,
    Position,
    Last,
}

impl Func {
    pub fn from_name(name: &str) -> Option<Func> {
        Some(match name {
            "count" => Func::Count,
            "not" => Func::Not,
            "true" => Func::True,
            "false" => Func::False,
            "boolean" => Func::BooleanFn,
            "number" => Func::NumberFn,
            "string" => Func::StringFn,
            "concat" => Func::Concat,
            "starts-with" => Func::StartsWith,
            "contains" => Func::Contains,
            "string-length" => Func::StringLength,
            "normalize-space" => Func::NormalizeSpace,
            "name" => Func::Name,
            "position" => Func::Position,
            "last" => Func::Last,
            _ => return None,
        })
    }

    /// Inclusive (min, max) argument count.
    pub fn arity(&self) -> (usize, usize) {
        match self {
            Func::Count | Func::Not => (1, 1),
            Func::True | Func::False | Func::Position | Func::Last => (0, 0),
            Func::BooleanFn | Func::NumberFn | Func::StringFn => (0, 1),
            Func::StringLength | Func::NormalizeSpace | Func::Name => (0, 1),
            Func::Concat => (2, usize::MAX),
            Func::StartsWith | Func::Contains => (2, 2),
        }
    }

    pub fn return_type(&self) -> ReturnType {
        match self {
            Func::Count
            | Func::NumberFn
            | Func::StringLength
            | Func::Position
            | Func::Last => ReturnType::Number,
            Func::Not
            | Func::True
            | Func::False
            | Func::BooleanFn
            | Func::StartsWith
            | Func::Contains => ReturnType::Boolean,
            Func::StringFn | Func::Concat | Func::NormalizeSpace | Func::Name => ReturnType::Text,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Or(Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Compare(CmpOp, Box<Expr>, Box<Expr>),
    Arith(ArithOp, Box<Expr>, Box<Expr>),
    Neg(Box<Expr>),
    Union(Box<Expr>, Box<Expr>),
    Call(Func, Vec<Expr>),
    Path(Path),
    Number(f64),
    Literal(String),
}

impl Expr {
    pub fn return_type(&self) -> ReturnType {
        match self {
            Expr::Or(..) | Expr::And(..) | Expr::Compare(..) => ReturnType::Boolean,
            Expr::Arith(..) | Expr::Neg(_) | Expr::Number(_) => ReturnType::Number,
            Expr::Literal(_) => ReturnType::Text,
            Expr::Union(..) | Expr::Path(_) => ReturnType::NodeSet,
            Expr::Call(func, _) => func.return_type(),
        }
    }

    /// Structural checks that the grammar cannot express: function arity,
    /// union operands and `count()` arguments being node-sets.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Expr::Union(lhs, rhs) => {
                for side in [lhs.as_ref(), rhs.as_ref()] {
                    if side.return_type() != ReturnType::NodeSet {
                        return Err(format!(
                            "union operand must be a node-set, found {}",
                            side.return_type()
                        ));
                    }
                    side.validate()?;
                }
                Ok(())
            }
            Expr::Call(func, args) => {
                let (min, max) = func.arity();
                if args.len() < min || args.len() > max {
                    return Err(format!(
                        "wrong number of arguments to {:?}: expected {}..{}, found {}",
                        func,
                        min,
                        if max == usize::MAX {
                            "N".to_string()
                        } else {
                            max.to_string()
                        },
                        args.len()
                    ));
                }
                if *func == Func::Count && args[0].return_type() != ReturnType::NodeSet {
                    return Err(format!(
                        "count() requires a node-set argument, found {}",
                        args[0].return_type()
                    ));
                }
                args.iter().try_for_each(Expr::validate)
            }
            Expr::Or(lhs, rhs)
            | Expr::And(lhs, rhs)
            | Expr::Compare(_, lhs, rhs)
            | Expr::Arith(_, lhs, rhs) => {
                lhs.validate()?;
                rhs.validate()
            }
            Expr::Neg(inner) => inner.validate(),
            Expr::Path(path) => path
                .steps
                .iter()
                .flat_map(|s| s.predicates.iter())
                .try_for_each(Expr::validate),
            Expr::Number(_) | Expr::Literal(_) => Ok(()),
        }
    }
}
