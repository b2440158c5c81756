//! The engine's error taxonomy (§7).
//!
//! Every evaluation failure is fatal and carries enough structured context
//! to reproduce it without re-running the engine, mirroring how the pack's
//! compiler-style crates keep one `thiserror` enum per subsystem rather than
//! stringly-typed errors.

use crate::diag::DivergenceTrace;
use crate::graph::{NodeId, VarId};

/// An error raised by an operator's reference or compiled routine.
///
/// The engine attaches in-flight node context before this reaches the
/// caller (see [`DebugEngineError::Operator`]).
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct OperatorError(pub String);

impl OperatorError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// All errors the engine can report.
#[derive(Debug, thiserror::Error)]
pub enum DebugEngineError {
    /// Reference and compiled backends produced non-approximately-equal
    /// values for the same variable (§4.E step 3).
    #[error(
        "compiled backend diverged from reference at node {node:?} output #{output_index}: \
         reference and compiled values are not approximately equal"
    )]
    BadCompiledOutput {
        node: NodeId,
        output_index: usize,
        reference_repr: String,
        compiled_repr: String,
    },

    /// A rewrite replaced `old_r` with `new_r` whose runtime values disagree
    /// (§4.F.3).
    #[error(
        "optimization replaced {old_var:?} with {new_var:?} under reason {reason:?}, but their \
         runtime values disagree: old={old_repr} new={new_repr}\n--- old subgraph ---\n\
         {old_subgraph}\n--- new subgraph ---\n{new_subgraph}"
    )]
    BadOptimization {
        old_var: VarId,
        new_var: VarId,
        reason: String,
        old_repr: String,
        new_repr: String,
        old_subgraph: String,
        new_subgraph: String,
    },

    /// An operator mutated an input not listed in `destroy_map` (§4.F.1).
    #[error(
        "node {node:?} mutated input #{input_index} without declaring it in destroy_map"
    )]
    BadDestroyMap { node: NodeId, input_index: usize },

    /// An operator produced an undeclared memory alias, either
    /// input-to-output or output-to-output (§4.F.2).
    #[error("node {node:?} output #{output_index} aliases {aliased_to:?} without declaring it")]
    BadViewMap {
        node: NodeId,
        output_index: usize,
        /// The other side of the undeclared alias: input indices for the
        /// input-aliasing form, or other output indices for the
        /// output-aliasing-output form.
        aliased_to: Vec<usize>,
    },

    /// Optimizer event logs differed across two runs on the same source
    /// graph (§4.D).
    #[error(
        "optimizer is not stable: run 1 and run {run} first differ at event #{index}\n{trace}"
    )]
    StochasticOrder {
        run: usize,
        index: usize,
        trace: DivergenceTrace,
    },

    /// A non-finite value was detected. Reserved for producers to raise;
    /// the engine itself never constructs this variant.
    #[error("non-finite value detected in variable {var:?}")]
    FloatAnomaly { var: VarId },

    /// A value failed its type's validity check.
    #[error("value for variable {var:?} failed its type's validity check")]
    InvalidValue { var: VarId },

    /// Both backend checks were disabled, or some other configuration
    /// contract was violated.
    #[error("configuration error: {0}")]
    Config(String),

    /// An operator-raised exception, with the node it occurred in attached.
    #[error("operator error in node {node:?}: {source}")]
    Operator {
        node: NodeId,
        #[source]
        source: OperatorError,
    },

    /// Two active nodes both claim to have destroyed the same input without
    /// an intervening producer — "failure in topological ordering" (§4.F.1).
    #[error(
        "failure in topological ordering: variable {var:?} was already destroyed by node \
         {first_node:?} before node {second_node:?} destroyed it again"
    )]
    TopologicalOrder {
        var: VarId,
        first_node: NodeId,
        second_node: NodeId,
    },
}
