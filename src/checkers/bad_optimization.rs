//! Bad-optimization check (§4.F.3).
//!
//! The spec ships three variants and mandates only the simple pairwise one;
//! the clustered "earliest broken element" variant (using
//! [`crate::tracker::classes`]) is optional and intentionally not
//! implemented here, per §4.F.3 and §9.

use rustc_hash::FxHashMap;

use crate::error::DebugEngineError;
use crate::graph::{Graph, VarId};
use crate::tracker::EquivalenceTracker;
use crate::value::Value;

/// For every variable encountered in evaluation order, and every
/// `(reason, old_r, old_graph, new_graph)` in its reason chain, asserts
/// `old_r.type == new_r.type` and `equals_approx(r_vals[old_r],
/// r_vals[new_r])`. Both halves of that assertion are reported through the
/// same [`DebugEngineError::BadOptimization`] variant, since a type
/// mismatch is itself evidence the rewrite was unsound.
pub fn check_bad_optimizations(
    graph: &Graph,
    tracker: &EquivalenceTracker,
    eval_order_vars: &[VarId],
    r_vals: &FxHashMap<VarId, Value>,
) -> Result<(), DebugEngineError> {
    for &new_r in eval_order_vars {
        for entry in tracker.reason_chain(new_r) {
            let old_r = entry.replaced_variable;
            let (Some(old_val), Some(new_val)) = (r_vals.get(&old_r), r_vals.get(&new_r)) else {
                // One side was never reached by evaluation (e.g. the
                // replacement is itself later replaced before either
                // side runs); nothing to compare yet.
                continue;
            };

            let old_ty = &graph.variable(old_r).ty;
            let new_ty = &graph.variable(new_r).ty;
            let types_match = old_ty.type_name() == new_ty.type_name();
            let values_match =
                types_match && new_ty.equals_approx(old_val.as_ref(), new_val.as_ref());

            if !types_match || !values_match {
                return Err(DebugEngineError::BadOptimization {
                    old_var: old_r,
                    new_var: new_r,
                    reason: entry.reason.clone(),
                    old_repr: old_ty.debug_repr(old_val.as_ref()),
                    new_repr: new_ty.debug_repr(new_val.as_ref()),
                    old_subgraph: entry.old_subgraph.clone(),
                    new_subgraph: entry.new_subgraph.clone(),
                });
            }
        }
    }
    Ok(())
}
