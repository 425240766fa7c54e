//! Rule model and engine: declarative, ordered tree transformations.

pub mod engine;
pub mod item;

pub use engine::{apply_rules, RuleOutcome};
pub use item::{Expected, RuleError, RuleItem, Verb};
