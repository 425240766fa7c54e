//! Path-query engine: compile once, evaluate many times.
//!
//! Queries are compiled from an XPath-like expression language and carry a
//! *static* result type the rule engine dispatches on. Selector compilation
//! additionally enforces a node-set result — a configuration-time contract.

pub mod ast;
pub mod eval;
mod parser;

use thiserror::Error;
use tracing::instrument;

use crate::arena::DocTree;

pub use ast::ReturnType;
pub use eval::{ContextNode, Value};

#[derive(Error, Debug)]
pub enum QueryError {
    #[error("invalid query expression '{expr}': {reason}")]
    InvalidExpression { expr: String, reason: String },

    #[error("selector must return a node-set, '{expr}' returns {found}")]
    NotANodeSet { expr: String, found: ReturnType },
}

/// A compiled path query.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    source: String,
    expr: ast::Expr,
    return_type: ReturnType,
}

impl Query {
    /// Compiles an expression of any result type.
    #[instrument(level = "debug")]
    pub fn compile(source: &str) -> Result<Self, QueryError> {
        let expr = parser::parse(source).map_err(|reason| QueryError::InvalidExpression {
            expr: source.to_string(),
            reason,
        })?;
        expr.validate()
            .map_err(|reason| QueryError::InvalidExpression {
                expr: source.to_string(),
                reason,
            })?;
        let return_type = expr.return_type();
        Ok(Query {
            source: source.to_string(),
            expr,
            return_type,
        })
    }

    /// Compiles a selector: like [`Query::compile`], but the static result
    /// type must be a node-set.
    #[instrument(level = "debug")]
    pub fn compile_selector(source: &str) -> Result<Self, QueryError> {
        let query = Self::compile(source)?;
        if query.return_type != ReturnType::NodeSet {
            return Err(QueryError::NotANodeSet {
                expr: source.to_string(),
                found: query.return_type,
            });
        }
        Ok(query)
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn return_type(&self) -> ReturnType {
        self.return_type
    }

    /// Evaluates against `context`. Infallible; see module docs.
    pub fn evaluate(&self, tree: &DocTree, context: ContextNode) -> Value {
        eval::evaluate(&self.expr, tree, context)
    }

    /// Evaluates and keeps only node results; scalar-typed queries yield an
    /// empty set.
    pub fn select(&self, tree: &DocTree, context: ContextNode) -> Vec<ContextNode> {
        self.evaluate(tree, context).into_nodes()
    }
}
