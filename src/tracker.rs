//! Event log & equivalence tracker (§4.C).
//!
//! Attached to a [`Graph`] as a [`GraphObserver`]; maintains union-find
//! equivalence classes over every variable ever seen (monotone — pruning
//! never removes a variable from its class) and, for each variable, an
//! append-only reason chain of the rewrites that replaced something with
//! it.
//!
//! Per §9 "Union-find over classes": an explicit disjoint-set structure
//! keyed by [`VarId`], rather than re-pointing every class member on
//! merge — correct either way at this scale, but wasteful the naive way.

use rustc_hash::FxHashMap;
use slotmap::SecondaryMap;

use crate::diag::render_subgraph;
use crate::event::Event;
use crate::graph::{Graph, GraphObserver, NodeId, VarId};

/// One entry in a variable's reason chain (§3 "Reason chain").
#[derive(Debug, Clone)]
pub struct ReasonEntry {
    pub reason: String,
    pub replaced_variable: VarId,
    pub old_subgraph: String,
    pub new_subgraph: String,
}

#[derive(Debug, Clone)]
pub struct EquivalenceTracker {
    parent: SecondaryMap<VarId, VarId>,
    rank: SecondaryMap<VarId, u32>,
    /// Grow-only log of every variable ever observed, in discovery order
    /// (§9 "Monotone variable set").
    all_variables_ever: Vec<VarId>,
    reason_chains: SecondaryMap<VarId, Vec<ReasonEntry>>,
    replaced_by: SecondaryMap<VarId, Vec<(String, VarId)>>,
    events: Vec<Event>,
    render_depth: usize,
}

impl EquivalenceTracker {
    pub fn new(render_depth: usize) -> Self {
        Self {
            parent: SecondaryMap::new(),
            rank: SecondaryMap::new(),
            all_variables_ever: Vec::new(),
            reason_chains: SecondaryMap::new(),
            replaced_by: SecondaryMap::new(),
            events: Vec::new(),
            render_depth,
        }
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// All variables ever observed, oldest first (§9).
    pub fn all_variables_ever(&self) -> &[VarId] {
        &self.all_variables_ever
    }

    pub fn reason_chain(&self, var: VarId) -> &[ReasonEntry] {
        self.reason_chains.get(var).map(Vec::as_slice).unwrap_or(&[])
    }

    fn ensure_class(&mut self, v: VarId) {
        if !self.parent.contains_key(v) {
            self.parent.insert(v, v);
            self.rank.insert(v, 0);
            self.all_variables_ever.push(v);
        }
    }

    /// Union-find `find` with path compression. Lazily allocates a
    /// singleton class for variables not yet seen (covers graph inputs,
    /// which are never `import`ed as node outputs but can still be
    /// rewired).
    pub fn find(&mut self, v: VarId) -> VarId {
        self.ensure_class(v);
        let parent = self.parent[v];
        if parent == v {
            v
        } else {
            let root = self.find(parent);
            self.parent[v] = root;
            root
        }
    }

    pub fn same_class(&mut self, a: VarId, b: VarId) -> bool {
        self.find(a) == self.find(b)
    }

    fn union(&mut self, a: VarId, b: VarId) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return;
        }
        let rank_a = self.rank[ra];
        let rank_b = self.rank[rb];
        if rank_a < rank_b {
            self.parent[ra] = rb;
        } else if rank_a > rank_b {
            self.parent[rb] = ra;
        } else {
            self.parent[rb] = ra;
            self.rank[ra] += 1;
        }
    }
}

impl GraphObserver for EquivalenceTracker {
    fn on_import(&mut self, graph: &Graph, node: NodeId, is_new: bool) {
        let node_data = graph.node(node);
        for &output in &node_data.outputs {
            if is_new {
                self.ensure_class(output);
            } else {
                assert!(
                    self.parent.contains_key(output),
                    "re-imported node {node:?} output {output:?} has no equivalence class"
                );
            }
        }
        let operator_name = node_data.operator.name().to_string();
        tracing::debug!(event = "import", node = ?node, is_new, "equivalence tracker observed import");
        self.events.push(Event::import(node, operator_name));
    }

    fn on_prune(&mut self, graph: &Graph, node: NodeId) {
        let operator_name = graph.node(node).operator.name().to_string();
        tracing::debug!(event = "prune", node = ?node, "equivalence tracker observed prune");
        self.events.push(Event::prune(node, operator_name));
    }

    fn on_rewire(
        &mut self,
        graph: &Graph,
        node: NodeId,
        input_index: usize,
        old_var: VarId,
        new_var: VarId,
        reason: &str,
    ) {
        self.union(old_var, new_var);

        if !self.reason_chains.contains_key(new_var) {
            self.reason_chains.insert(new_var, Vec::new());
        }
        let chain = self.reason_chains.get_mut(new_var).unwrap();
        let already_present = chain
            .iter()
            .any(|entry| entry.reason == reason && entry.replaced_variable == old_var);
        if !already_present {
            let old_subgraph = render_subgraph(graph, old_var, self.render_depth);
            let new_subgraph = render_subgraph(graph, new_var, self.render_depth);
            chain.push(ReasonEntry {
                reason: reason.to_string(),
                replaced_variable: old_var,
                old_subgraph,
                new_subgraph,
            });
        }

        if !self.replaced_by.contains_key(old_var) {
            self.replaced_by.insert(old_var, Vec::new());
        }
        self.replaced_by
            .get_mut(old_var)
            .unwrap()
            .push((reason.to_string(), new_var));

        let operator_name = graph.node(node).operator.name().to_string();
        tracing::debug!(event = "rewire", node = ?node, input_index, reason, "equivalence tracker observed rewire");
        self.events
            .push(Event::change(node, operator_name, input_index, reason));
    }
}

/// Convenience: group the tracker's `all_variables_ever` by representative
/// class, oldest representative first. Not used by the mandatory simple
/// bad-optimization check (§4.F.3), but available for the optional
/// clustered variant mentioned in the design notes.
pub fn classes(tracker: &mut EquivalenceTracker) -> FxHashMap<VarId, Vec<VarId>> {
    let mut out: FxHashMap<VarId, Vec<VarId>> = FxHashMap::default();
    let vars = tracker.all_variables_ever().to_vec();
    for v in vars {
        let root = tracker.find(v);
        out.entry(root).or_default().push(v);
    }
    out
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::graph::{Node, Operator};
    use crate::value::test_support::f64_type;

    #[derive(Debug)]
    struct NoopOp;
    impl Operator for NoopOp {
        fn name(&self) -> &str {
            "noop"
        }
        fn build_reference(&self, _node: &Node) -> Box<dyn crate::graph::ReferenceThunk> {
            unimplemented!()
        }
        fn build_compiled(&self, _node: &Node) -> Option<Box<dyn crate::graph::CompiledThunk>> {
            None
        }
    }

    #[test]
    fn rewire_unions_classes_and_records_reason_chain() {
        let mut g = Graph::new();
        let x = g.alloc_variable(f64_type(), "x");
        g.set_graph_input(x);
        let op = Rc::new(NoopOp) as Rc<dyn Operator>;
        let y = g.alloc_variable(f64_type(), "y");
        let mut tracker = EquivalenceTracker::new(6);
        let n = g.insert_node(Node::new(op, vec![x], vec![y]), &mut tracker);
        let z = g.alloc_variable(f64_type(), "z");
        g.rewire(n, 0, z, "strength_reduce", &mut tracker);

        assert!(tracker.same_class(x, z));
        let chain = tracker.reason_chain(z);
        assert_eq!(chain.len(), 1);
        assert_eq!(chain[0].reason, "strength_reduce");
        assert_eq!(chain[0].replaced_variable, x);

        // idempotent: repeating the identical rewire does not duplicate.
        g.rewire(n, 0, z, "strength_reduce", &mut tracker);
        assert_eq!(tracker.reason_chain(z).len(), 1);
    }

    #[test]
    fn pruned_variable_stays_in_all_variables_ever() {
        let mut g = Graph::new();
        let x = g.alloc_variable(f64_type(), "x");
        g.set_graph_input(x);
        let op = Rc::new(NoopOp) as Rc<dyn Operator>;
        let y = g.alloc_variable(f64_type(), "y");
        let mut tracker = EquivalenceTracker::new(6);
        let n = g.insert_node(Node::new(op, vec![x], vec![y]), &mut tracker);
        g.prune_node(n, &mut tracker);
        assert!(tracker.all_variables_ever().contains(&y));
    }
}
