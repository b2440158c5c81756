//! Diagnostic rendering (§4.G): recursive depth-limited pretty-printing of
//! a variable's producing subgraph, and the three-column event-log
//! divergence trace used by [`crate::error::DebugEngineError::StochasticOrder`].
//!
//! Grounded in `hydro_lang::graph`'s dot/mermaid renderers, simplified to
//! plain indented text since the engine has no need for a browser-facing
//! format.

use std::fmt;

use itertools::Itertools;

use crate::event::Event;
use crate::graph::{Graph, VarId};

/// Renders `var`'s producing subgraph up to `max_depth` levels of inputs,
/// e.g.:
///
/// ```text
/// z = add(x, y)
///   x = <graph input>
///   y = mul(w, 2)
///     w = <graph input>
/// ```
///
/// Rendered eagerly at rewrite time (§3 "Rendered subgraphs are captured at
/// rewrite time because later rewrites invalidate the graph").
pub fn render_subgraph(graph: &Graph, var: VarId, max_depth: usize) -> String {
    let mut out = String::new();
    render_var(graph, var, 0, max_depth, &mut out);
    out
}

fn render_var(graph: &Graph, var: VarId, depth: usize, max_depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    let label = &graph.variable(var).label;
    match graph.owner(var) {
        None => {
            out.push_str(&format!("{indent}{label} = <graph input>\n"));
        }
        Some(node_id) => {
            let node = graph.node(node_id);
            let input_labels = node.inputs.iter().map(|&i| graph.variable(i).label.as_str()).join(", ");
            out.push_str(&format!(
                "{indent}{label} = {}({}){}\n",
                node.operator.name(),
                input_labels,
                if graph.is_active(node_id) { "" } else { " [pruned]" }
            ));
            if depth < max_depth {
                for &input in &node.inputs {
                    render_var(graph, input, depth + 1, max_depth, out);
                }
            } else if !node.inputs.is_empty() {
                out.push_str(&format!("{}  ...\n", indent));
            }
        }
    }
}

/// Escapes a string for use in a DOT graph label, matching
/// `hydro_lang::graph::dot::escape_dot`.
fn escape_dot(s: &str) -> String {
    s.replace('"', "\\\"").replace('\n', "\\n")
}

/// Renders `var`'s producing subgraph as a Graphviz DOT digraph. Purely a
/// debugging aid alongside [`render_subgraph`]'s plain-text form; never
/// consulted by the invariant checkers.
pub fn render_dot(graph: &Graph, var: VarId, max_depth: usize) -> String {
    let mut nodes = Vec::new();
    let mut edges = Vec::new();
    let mut seen = std::collections::HashSet::new();
    collect_dot(graph, var, 0, max_depth, &mut nodes, &mut edges, &mut seen);

    let mut out = String::from("digraph subgraph_ {\n");
    for (id, label) in &nodes {
        out.push_str(&format!("  \"{id}\" [label=\"{}\"];\n", escape_dot(label)));
    }
    for (from, to) in &edges {
        out.push_str(&format!("  \"{from}\" -> \"{to}\";\n"));
    }
    out.push_str("}\n");
    out
}

fn collect_dot(
    graph: &Graph,
    var: VarId,
    depth: usize,
    max_depth: usize,
    nodes: &mut Vec<(String, String)>,
    edges: &mut Vec<(String, String)>,
    seen: &mut std::collections::HashSet<VarId>,
) {
    if !seen.insert(var) {
        return;
    }
    let id = format!("{var:?}");
    let label = &graph.variable(var).label;
    match graph.owner(var) {
        None => nodes.push((id, format!("{label} (input)"))),
        Some(node_id) => {
            let node = graph.node(node_id);
            nodes.push((id.clone(), format!("{label} = {}", node.operator.name())));
            if depth < max_depth {
                for &input in &node.inputs {
                    edges.push((format!("{input:?}"), id.clone()));
                    collect_dot(graph, input, depth + 1, max_depth, nodes, edges, seen);
                }
            }
        }
    }
}

/// Three-column trace of two event logs with `*` marking the first and
/// every subsequent mismatch (§4.G).
#[derive(Debug, Clone)]
pub struct DivergenceTrace {
    rows: Vec<(usize, Option<Event>, Option<Event>)>,
}

impl DivergenceTrace {
    pub fn build(run_a: &[Event], run_b: &[Event]) -> Self {
        let len = run_a.len().max(run_b.len());
        let rows = (0..len)
            .map(|i| (i, run_a.get(i).cloned(), run_b.get(i).cloned()))
            .collect();
        Self { rows }
    }

    /// The index of the first row whose columns differ, if any.
    pub fn first_mismatch(&self) -> Option<usize> {
        self.rows
            .iter()
            .find(|(_, a, b)| a != b)
            .map(|(index, _, _)| *index)
    }
}

impl DivergenceTrace {
    /// Renders the two event logs as a JSON array of `{index, run_a,
    /// run_b}` rows, for tooling that wants structured output rather than
    /// the `Display` text trace — mirrors `hydro_lang::graph::graphviz`'s
    /// use of `serde_json` to hand the graph viewer structured node/edge
    /// data instead of a hand-rolled text format.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Array(
            self.rows
                .iter()
                .map(|(index, a, b)| {
                    serde_json::json!({
                        "index": index,
                        "run_a": a,
                        "run_b": b,
                    })
                })
                .collect(),
        )
    }
}

impl fmt::Display for DivergenceTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, a, b) in &self.rows {
            let marker = if a != b { "*" } else { " " };
            let a_str = a.as_ref().map(Event::to_string).unwrap_or_else(|| "<end of log>".into());
            let b_str = b.as_ref().map(Event::to_string).unwrap_or_else(|| "<end of log>".into());
            writeln!(f, "{marker} {index:>4}  {a_str:<40}  {b_str:<40}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn divergence_trace_marks_first_mismatch() {
        use slotmap::SlotMap;
        let mut nodes: SlotMap<crate::graph::NodeId, ()> = SlotMap::with_key();
        let n = nodes.insert(());
        let run_a = vec![Event::import(n, "add"), Event::change(n, "add", 0, "a")];
        let run_b = vec![Event::import(n, "add"), Event::change(n, "add", 0, "b")];
        let trace = DivergenceTrace::build(&run_a, &run_b);
        assert_eq!(trace.first_mismatch(), Some(1));
    }

    #[test]
    fn divergence_trace_to_json_has_one_row_per_event() {
        use slotmap::SlotMap;
        let mut nodes: SlotMap<crate::graph::NodeId, ()> = SlotMap::with_key();
        let n = nodes.insert(());
        let run_a = vec![Event::import(n, "add")];
        let run_b = vec![Event::import(n, "add")];
        let trace = DivergenceTrace::build(&run_a, &run_b);
        let json = trace.to_json();
        assert_eq!(json.as_array().unwrap().len(), 1);
    }

    #[test]
    fn render_dot_includes_producer_edge() {
        use crate::graph::{NullObserver, Operator, ReferenceThunk};
        use crate::value::test_support::f64_type;
        use std::rc::Rc;

        #[derive(Debug)]
        struct NoopOp;
        impl Operator for NoopOp {
            fn name(&self) -> &str {
                "noop"
            }
            fn build_reference(&self, _node: &crate::graph::Node) -> Box<dyn ReferenceThunk> {
                unimplemented!()
            }
            fn build_compiled(&self, _node: &crate::graph::Node) -> Option<Box<dyn crate::graph::CompiledThunk>> {
                None
            }
        }

        let mut g = Graph::new();
        let x = g.alloc_variable(f64_type(), "x");
        g.set_graph_input(x);
        let y = g.alloc_variable(f64_type(), "y");
        let op = Rc::new(NoopOp) as Rc<dyn Operator>;
        let mut obs = NullObserver;
        g.insert_node(crate::graph::Node::new(op, vec![x], vec![y]), &mut obs);

        let dot = render_dot(&g, y, 6);
        assert!(dot.starts_with("digraph"));
        assert!(dot.contains("->"));
    }
}
