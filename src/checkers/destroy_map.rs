//! Destroy-map check (§4.F.1).

use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::DebugEngineError;
use crate::graph::{Graph, Node, NodeId};
use crate::value::Value;

/// After a thunk runs, asserts that only inputs listed (for any output) in
/// `node.destroy_map` differ from their authoritative `r_vals` entry. This
/// detection runs regardless of `is_active` — an undeclared mutation on
/// the dead side of a rewrite is exactly the kind of bug the engine exists
/// to catch (§1).
///
/// `input_cells` holds the post-run contents of each input cell, in input
/// order. `is_active` and `clobber_dr_vals` together gate only the
/// declared-destroy bookkeeping: when both are set (the node is active and
/// the reference backend ran), records the destroyed value into
/// `dr_vals`, raising [`DebugEngineError::TopologicalOrder`] if a
/// different node already claimed to have destroyed the same variable. A
/// pruned node's declared-but-undetected destruction is expected and
/// simply isn't recorded, mirroring the original's `if node in
/// active_nodes` gate around `_check_inputs`'s `dr_vals` bookkeeping only.
#[allow(clippy::too_many_arguments)]
pub fn check_destroy_map(
    graph: &Graph,
    node_id: NodeId,
    node: &Node,
    input_cells: &[Value],
    r_vals: &FxHashMap<crate::graph::VarId, Value>,
    dr_vals: &mut FxHashMap<crate::graph::VarId, (Value, NodeId)>,
    clobber_dr_vals: bool,
    is_active: bool,
) -> Result<(), DebugEngineError> {
    let destroyable: FxHashSet<usize> = node.destroy_map.values().flatten().copied().collect();

    for (i, var) in node.inputs.iter().enumerate() {
        let ty = &graph.variable(*var).ty;
        let Some(original) = r_vals.get(var) else {
            continue;
        };
        let current = &input_cells[i];
        let differs = !ty.equals_approx(original.as_ref(), current.as_ref());
        if !differs {
            continue;
        }
        if !destroyable.contains(&i) {
            return Err(DebugEngineError::BadDestroyMap {
                node: node_id,
                input_index: i,
            });
        }
        if clobber_dr_vals && is_active {
            if let Some((_, prior_node)) = dr_vals.get(var) {
                if *prior_node != node_id {
                    return Err(DebugEngineError::TopologicalOrder {
                        var: *var,
                        first_node: *prior_node,
                        second_node: node_id,
                    });
                }
            }
            let snapshot = ty.deep_copy(current.as_ref());
            dr_vals.insert(*var, (snapshot, node_id));
        }
    }
    Ok(())
}
