//! Dual-execution debug mode for dataflow compiler graphs.
//!
//! Cross-checks a reference interpreter against a compiled backend on
//! every node, tracks graph rewrites through union-find equivalence
//! classes so a rewrite's before/after values can be compared, and checks
//! the aliasing/mutation declarations (`destroy_map`/`view_map`) operators
//! make against what they actually did. See `SPEC_FULL.md` for the full
//! module breakdown.

pub mod checkers;
pub mod config;
pub mod diag;
pub mod engine;
pub mod error;
pub mod event;
pub mod graph;
pub mod linker;
pub mod optimizer;
pub mod tracker;
pub mod value;

pub use config::EngineConfig;
pub use engine::evaluate;
pub use error::{DebugEngineError, OperatorError};
pub use event::{Event, EventKind};
pub use graph::{
    Client, CompiledThunk, Graph, GraphObserver, Node, NodeId, NullObserver, Operator, ReferenceThunk, VarId,
    Variable,
};
pub use linker::{run, RunOutcome};
pub use optimizer::{Optimizer, OptimizerHarness};
pub use tracker::EquivalenceTracker;
pub use value::{Value, ValueType};
