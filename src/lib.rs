//! doctree: declarative path-query transformations for documentation XML.
//!
//! Two engines share one arena-backed tree model:
//!
//! - the rule engine applies an ordered list of declarative rules (selector,
//!   optional typed condition, verb) to a document, mutating it in place;
//! - the TOC cascade remover drops excluded topics from a table-of-contents
//!   tree and collapses ancestors left childless, logging removed namespace
//!   ids for the downstream layout stage.
//!
//! Queries are compiled once and carry a static result type; all
//! configuration errors surface at load time, never during application.

pub mod arena;
pub mod cli;
pub mod config;
pub mod errors;
pub mod query;
pub mod rules;
pub mod toc;
pub mod util;
pub mod xml;

pub use arena::{DocTree, Element, NodeId};
pub use errors::{DocError, DocResult};
pub use query::{ContextNode, Query, QueryError, ReturnType, Value};
pub use rules::{apply_rules, Expected, RuleItem, RuleOutcome, Verb};
pub use toc::{collect_excluded_ids, remove_excluded, CascadeOutcome};
