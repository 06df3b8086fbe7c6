//! Domain services - pure logic over the entities

pub mod formula;
pub mod reduce;

pub use formula::{evaluate, Combatant, EvalContext, Evaluation, FormulaError};
pub use reduce::{reduce, ReduceError};
