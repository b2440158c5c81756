//! View-map check (§4.F.2).

use crate::error::DebugEngineError;
use crate::graph::{Client, Graph, Node, NodeId};
use crate::value::Value;

fn has_downstream_client(graph: &Graph, var: crate::graph::VarId) -> bool {
    graph
        .clients(var)
        .iter()
        .any(|c| matches!(c, Client::NodeInput(..)))
}

/// Checks both forms of undeclared aliasing for one node's execution:
/// input-to-output (an output sharing memory with an input not listed in
/// that output's `view_map`/`destroy_map`), and output-to-output (two
/// outputs of the same node, both consumed downstream, sharing memory
/// without any input relationship).
///
/// Runs unconditionally regardless of `is_active` — an undeclared alias on
/// the dead side of a rewrite is still a bug in the operator, not just in
/// the optimizer's choice to prune it (§1). `is_active` is accepted for
/// call-site symmetry with [`crate::checkers::check_destroy_map`]'s
/// active-gated bookkeeping; the original's `_check_viewmap` never took an
/// `active_nodes` argument at all, because it has no active-gated logic
/// of its own to condition.
pub fn check_view_map(
    graph: &Graph,
    node_id: NodeId,
    node: &Node,
    output_cells: &[Value],
    input_cells: &[Value],
    _is_active: bool,
) -> Result<(), DebugEngineError> {
    let mut alias_free_outputs = Vec::new();

    for (o, out_val) in output_cells.iter().enumerate() {
        let out_ty = &graph.variable(node.outputs[o]).ty;
        let allowed = node.allowed_aliases(o);
        let mut undeclared = Vec::new();
        let mut aliases_any_input = false;

        for (i, in_val) in input_cells.iter().enumerate() {
            if out_ty.may_share_memory(out_val.as_ref(), in_val.as_ref()) {
                aliases_any_input = true;
                if !allowed.contains(&i) {
                    undeclared.push(i);
                }
            }
        }

        if !undeclared.is_empty() {
            return Err(DebugEngineError::BadViewMap {
                node: node_id,
                output_index: o,
                aliased_to: undeclared,
            });
        }
        if !aliases_any_input {
            alias_free_outputs.push(o);
        }
    }

    for (pos, &o) in alias_free_outputs.iter().enumerate() {
        let var_o = node.outputs[o];
        if !has_downstream_client(graph, var_o) {
            continue;
        }
        for &o2 in &alias_free_outputs[pos + 1..] {
            let var_o2 = node.outputs[o2];
            if !has_downstream_client(graph, var_o2) {
                continue;
            }
            let ty = &graph.variable(var_o).ty;
            if ty.may_share_memory(output_cells[o].as_ref(), output_cells[o2].as_ref()) {
                return Err(DebugEngineError::BadViewMap {
                    node: node_id,
                    output_index: o,
                    aliased_to: vec![o2],
                });
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::graph::{NullObserver, Operator, ReferenceThunk};
    use crate::value::test_support::{alias_of, f64_type, val};

    #[derive(Debug)]
    struct Transpose;
    impl Operator for Transpose {
        fn name(&self) -> &str {
            "transpose"
        }
        fn build_reference(&self, _node: &Node) -> Box<dyn ReferenceThunk> {
            unimplemented!()
        }
        fn build_compiled(&self, _node: &Node) -> Option<Box<dyn crate::graph::CompiledThunk>> {
            None
        }
    }

    #[test]
    fn undeclared_input_view_is_rejected() {
        let mut g = Graph::new();
        let x = g.alloc_variable(f64_type(), "x");
        g.set_graph_input(x);
        let y = g.alloc_variable(f64_type(), "y");
        let op = Rc::new(Transpose) as Rc<dyn Operator>;
        let mut obs = NullObserver;
        let n = g.insert_node(Node::new(op, vec![x], vec![y]), &mut obs);
        let node = g.node(n).clone();

        let input: Value = val(vec![9.0]);
        let output: Value = alias_of(&input); // view the operator failed to declare

        let err = check_view_map(&g, n, &node, &[output], &[input], true).unwrap_err();
        assert!(matches!(
            err,
            DebugEngineError::BadViewMap { output_index: 0, .. }
        ));
    }

    #[test]
    fn undeclared_input_view_is_rejected_even_when_pruned() {
        let mut g = Graph::new();
        let x = g.alloc_variable(f64_type(), "x");
        g.set_graph_input(x);
        let y = g.alloc_variable(f64_type(), "y");
        let op = Rc::new(Transpose) as Rc<dyn Operator>;
        let mut obs = NullObserver;
        let n = g.insert_node(Node::new(op, vec![x], vec![y]), &mut obs);
        let node = g.node(n).clone();

        let input: Value = val(vec![9.0]);
        let output: Value = alias_of(&input);

        let err = check_view_map(&g, n, &node, &[output], &[input], false).unwrap_err();
        assert!(matches!(
            err,
            DebugEngineError::BadViewMap { output_index: 0, .. }
        ));
    }

    #[test]
    fn declared_view_is_accepted() {
        let mut g = Graph::new();
        let x = g.alloc_variable(f64_type(), "x");
        g.set_graph_input(x);
        let y = g.alloc_variable(f64_type(), "y");
        let op = Rc::new(Transpose) as Rc<dyn Operator>;
        let mut obs = NullObserver;
        let n = g.insert_node(Node::new(op, vec![x], vec![y]), &mut obs);
        let mut node = g.node(n).clone();
        node.view_map.insert(0, vec![0]);

        let input: Value = val(vec![9.0]);
        let output: Value = alias_of(&input);

        check_view_map(&g, n, &node, &[output], &[input], true).unwrap();
    }
}
