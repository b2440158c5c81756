//! Dual-execution linker (§4.E) — the engine's entry point. Builds
//! per-node reference and compiled thunks, drives execution in topological
//! order, and enforces the invariant checkers at the points the spec pins
//! them to.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::checkers::{check_bad_optimizations, check_destroy_map, check_view_map};
use crate::config::EngineConfig;
use crate::error::DebugEngineError;
use crate::graph::{Graph, NodeId, VarId};
use crate::tracker::EquivalenceTracker;
use crate::value::Value;

/// Final, caller-visible state of every variable the engine touched.
///
/// For most variables this is simply the reference (or compiled, if
/// reference checking was disabled) backend's computed value. For a graph
/// input an active node destroyed in place, the entry is instead the
/// post-destruction value, so the caller observes the mutation the way it
/// would against the real input container (§4.E "Result transfer").
pub type RunOutcome = FxHashMap<VarId, Value>;

/// Runs the engine once: evaluates every variable `tracker` has ever seen —
/// including the dead side of every rewrite — and checks every invariant
/// along the way.
///
/// `graph_inputs` supplies the initial value for each of `graph`'s
/// designated input variables; missing an entry for one is a caller bug
/// and panics, the same way indexing a slotmap with a stale key does.
#[tracing::instrument(level = "debug", skip_all)]
pub fn run(
    graph: &Graph,
    tracker: &mut EquivalenceTracker,
    config: &EngineConfig,
    graph_inputs: FxHashMap<VarId, Value>,
) -> Result<RunOutcome, DebugEngineError> {
    config.validate(graph)?;

    let mut r_vals: FxHashMap<VarId, Value> = FxHashMap::default();
    let mut dr_vals: FxHashMap<VarId, (Value, NodeId)> = FxHashMap::default();

    for &input in graph.graph_inputs() {
        let value = graph_inputs
            .get(&input)
            .unwrap_or_else(|| panic!("missing initial value for graph input {input:?}"));
        let ty = &graph.variable(input).ty;
        if !ty.is_valid(value.as_ref()) {
            return Err(DebugEngineError::InvalidValue { var: input });
        }
        r_vals.insert(input, ty.deep_copy(value.as_ref()));
    }

    // §4.E: order over all variables ever observed, reversed, so the
    // traversal includes pruned ("dead side of the rewrite") nodes too.
    let mut targets: Vec<VarId> = tracker.all_variables_ever().to_vec();
    targets.reverse();
    let order = graph.topo(graph.graph_inputs(), &targets);
    let active: FxHashSet<NodeId> = graph.active_order().into_iter().collect();

    for &node_id in &order {
        let node = graph.node(node_id);
        let is_active = active.contains(&node_id);

        if config.check_reference_code {
            let mut input_cells: Vec<Value> = Vec::with_capacity(node.inputs.len());
            for &v in &node.inputs {
                let ty = &graph.variable(v).ty;
                let cell = ty.deep_copy(r_vals[&v].as_ref());
                if !ty.is_valid(cell.as_ref()) {
                    return Err(DebugEngineError::InvalidValue { var: v });
                }
                input_cells.push(cell);
            }
            let mut output_cells: Vec<Option<Value>> = (0..node.outputs.len()).map(|_| None).collect();
            let mut thunk = node.operator.build_reference(node);
            thunk
                .run(&input_cells, &mut output_cells)
                .map_err(|source| DebugEngineError::Operator { node: node_id, source })?;

            check_destroy_map(graph, node_id, node, &input_cells, &r_vals, &mut dr_vals, true, is_active)?;
            let outputs = collect_outputs(graph, node_id, node, &output_cells)?;
            check_view_map(graph, node_id, node, &outputs, &input_cells, is_active)?;
            for (&v, value) in node.outputs.iter().zip(outputs) {
                r_vals.entry(v).or_insert(value);
            }
        }

        if config.check_compiled_code {
            if let Some(mut thunk) = node.operator.build_compiled(node) {
                let mut input_cells: Vec<Value> = Vec::with_capacity(node.inputs.len());
                for &v in &node.inputs {
                    let ty = &graph.variable(v).ty;
                    input_cells.push(ty.deep_copy(r_vals[&v].as_ref()));
                }
                let mut output_cells: Vec<Option<Value>> =
                    (0..node.outputs.len()).map(|_| None).collect();
                thunk
                    .run(&input_cells, &mut output_cells)
                    .map_err(|source| DebugEngineError::Operator { node: node_id, source })?;

                check_destroy_map(graph, node_id, node, &input_cells, &r_vals, &mut dr_vals, false, is_active)?;
                let outputs = collect_outputs(graph, node_id, node, &output_cells)?;
                check_view_map(graph, node_id, node, &outputs, &input_cells, is_active)?;
                for (o, (&v, value)) in node.outputs.iter().zip(outputs).enumerate() {
                    match r_vals.get(&v) {
                        Some(reference_value) => {
                            let ty = &graph.variable(v).ty;
                            if !ty.equals_approx(reference_value.as_ref(), value.as_ref()) {
                                tracing::warn!(node = ?node_id, output_index = o, "compiled backend diverged from reference");
                                return Err(DebugEngineError::BadCompiledOutput {
                                    node: node_id,
                                    output_index: o,
                                    reference_repr: ty.debug_repr(reference_value.as_ref()),
                                    compiled_repr: ty.debug_repr(value.as_ref()),
                                });
                            }
                        }
                        None => {
                            r_vals.insert(v, value);
                        }
                    }
                }
            }
        }
    }

    let mut eval_order_vars: Vec<VarId> = graph.graph_inputs().to_vec();
    for &node_id in &order {
        eval_order_vars.extend(graph.node(node_id).outputs.iter().copied());
    }
    check_bad_optimizations(graph, tracker, &eval_order_vars, &r_vals)?;

    let mut outcome: RunOutcome = r_vals;
    for &input in graph.graph_inputs() {
        if let Some((destroyed_value, _)) = dr_vals.get(&input) {
            let ty = &graph.variable(input).ty;
            outcome.insert(input, ty.deep_copy(destroyed_value.as_ref()));
        }
    }
    Ok(outcome)
}

/// Unwraps a node's freshly-produced output cells into plain values,
/// raising [`DebugEngineError::InvalidValue`] for any cell the thunk left
/// empty or that fails its type's validity check.
fn collect_outputs(
    graph: &Graph,
    node_id: NodeId,
    node: &crate::graph::Node,
    output_cells: &[Option<Value>],
) -> Result<Vec<Value>, DebugEngineError> {
    let mut outputs = Vec::with_capacity(output_cells.len());
    for (o, cell) in output_cells.iter().enumerate() {
        let var = node.outputs[o];
        let Some(value) = cell else {
            tracing::warn!(node = ?node_id, output_index = o, "thunk left output cell empty");
            return Err(DebugEngineError::InvalidValue { var });
        };
        let ty = &graph.variable(var).ty;
        if !ty.is_valid(value.as_ref()) {
            return Err(DebugEngineError::InvalidValue { var });
        }
        outputs.push(ty.deep_copy(value.as_ref()));
    }
    Ok(outputs)
}
