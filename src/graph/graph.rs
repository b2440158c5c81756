//! [`Graph`]: a set of nodes plus designated input/output variables (§3),
//! and the `topo` traversal used by both the optimizer harness and the
//! linker (§4.B).

use std::collections::VecDeque;
use std::rc::Rc;

use rustc_hash::{FxHashMap, FxHashSet};
use slotmap::SlotMap;

use crate::graph::node::{Node, NodeId};
use crate::graph::variable::{VarId, Variable};
use crate::value::ValueType;

/// A (node, input-index) pair that consumes a variable, or a designated
/// graph output acting as a pseudo-client (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Client {
    NodeInput(NodeId, usize),
    GraphOutput(usize),
}

/// Capability the graph calls into on every mutation, without the graph
/// holding a back-reference to its observer — avoids the ownership cycle
/// the equivalence tracker would otherwise create (§9 "Cyclic observer
/// wiring").
pub trait GraphObserver {
    fn on_import(&mut self, graph: &Graph, node: NodeId, is_new: bool);
    fn on_prune(&mut self, graph: &Graph, node: NodeId);
    #[allow(clippy::too_many_arguments)]
    fn on_rewire(
        &mut self,
        graph: &Graph,
        node: NodeId,
        input_index: usize,
        old_var: VarId,
        new_var: VarId,
        reason: &str,
    );
}

/// An observer that does nothing; useful for building graphs in tests
/// without caring about the event log.
pub struct NullObserver;

impl GraphObserver for NullObserver {
    fn on_import(&mut self, _graph: &Graph, _node: NodeId, _is_new: bool) {}
    fn on_prune(&mut self, _graph: &Graph, _node: NodeId) {}
    fn on_rewire(
        &mut self,
        _graph: &Graph,
        _node: NodeId,
        _input_index: usize,
        _old_var: VarId,
        _new_var: VarId,
        _reason: &str,
    ) {
    }
}

#[derive(Debug, Clone)]
pub struct Graph {
    nodes: SlotMap<NodeId, Node>,
    variables: SlotMap<VarId, Variable>,
    inputs: Vec<VarId>,
    outputs: Vec<VarId>,
    owner: FxHashMap<VarId, NodeId>,
    clients: FxHashMap<VarId, Vec<Client>>,
    active: FxHashSet<NodeId>,
}

impl Graph {
    pub fn new() -> Self {
        Self {
            nodes: SlotMap::with_key(),
            variables: SlotMap::with_key(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            owner: FxHashMap::default(),
            clients: FxHashMap::default(),
            active: FxHashSet::default(),
        }
    }

    pub fn alloc_variable(&mut self, ty: Rc<dyn ValueType>, label: impl Into<String>) -> VarId {
        self.variables.insert(Variable::new(ty, label))
    }

    pub fn set_graph_input(&mut self, var: VarId) {
        self.inputs.push(var);
    }

    pub fn set_graph_output(&mut self, var: VarId) {
        let index = self.outputs.len();
        self.outputs.push(var);
        self.clients
            .entry(var)
            .or_default()
            .push(Client::GraphOutput(index));
    }

    pub fn graph_inputs(&self) -> &[VarId] {
        &self.inputs
    }

    pub fn graph_outputs(&self) -> &[VarId] {
        &self.outputs
    }

    pub fn variable(&self, var: VarId) -> &Variable {
        &self.variables[var]
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub fn is_active(&self, id: NodeId) -> bool {
        self.active.contains(&id)
    }

    pub fn owner(&self, var: VarId) -> Option<NodeId> {
        self.owner.get(&var).copied()
    }

    pub fn clients(&self, var: VarId) -> &[Client] {
        self.clients.get(&var).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys()
    }

    /// Inserts a brand-new node and activates it — the "otherwise" branch
    /// of §4.C `import(node)`.
    pub fn insert_node(&mut self, node: Node, observer: &mut dyn GraphObserver) -> NodeId {
        let outputs = node.outputs.clone();
        let inputs = node.inputs.clone();
        let id = self.nodes.insert(node);
        for &v in &outputs {
            self.owner.insert(v, id);
        }
        for (i, &v) in inputs.iter().enumerate() {
            self.clients
                .entry(v)
                .or_default()
                .push(Client::NodeInput(id, i));
        }
        self.active.insert(id);
        observer.on_import(self, id, true);
        id
    }

    /// Reactivates a previously pruned node — the "if the node was
    /// previously pruned" branch of §4.C `import(node)`.
    pub fn reimport_node(&mut self, id: NodeId, observer: &mut dyn GraphObserver) {
        assert!(
            !self.active.contains(&id),
            "reimport_node called on an already-active node"
        );
        let inputs = self.nodes[id].inputs.clone();
        for (i, &v) in inputs.iter().enumerate() {
            self.clients
                .entry(v)
                .or_default()
                .push(Client::NodeInput(id, i));
        }
        self.active.insert(id);
        observer.on_import(self, id, false);
    }

    /// Marks a node inactive. Outputs remain in their equivalence classes
    /// (§4.C `prune(node)`).
    pub fn prune_node(&mut self, id: NodeId, observer: &mut dyn GraphObserver) {
        assert!(
            self.active.remove(&id),
            "prune_node called on a node that was not active"
        );
        let inputs = self.nodes[id].inputs.clone();
        for (i, &v) in inputs.iter().enumerate() {
            if let Some(clients) = self.clients.get_mut(&v) {
                clients.retain(|c| *c != Client::NodeInput(id, i));
            }
        }
        observer.on_prune(self, id);
    }

    /// Replaces `node`'s `input_index`-th input with `new_var`, unioning
    /// the old and new variable's equivalence classes via the observer
    /// (§4.C `rewire`).
    pub fn rewire(
        &mut self,
        node_id: NodeId,
        input_index: usize,
        new_var: VarId,
        reason: &str,
        observer: &mut dyn GraphObserver,
    ) {
        let old_var = self.nodes[node_id].inputs[input_index];
        if let Some(clients) = self.clients.get_mut(&old_var) {
            clients.retain(|c| *c != Client::NodeInput(node_id, input_index));
        }
        self.nodes[node_id].inputs[input_index] = new_var;
        self.clients
            .entry(new_var)
            .or_default()
            .push(Client::NodeInput(node_id, input_index));
        observer.on_rewire(self, node_id, input_index, old_var, new_var, reason);
    }

    /// Topological order of the nodes needed to produce `to_outputs` from
    /// `from_inputs`, honoring producer-before-consumer. Traverses through
    /// pruned nodes too: membership is decided purely by the static
    /// input/output wiring recorded in `owner`, never by `active` (§4.B).
    pub fn topo(&self, from_inputs: &[VarId], to_outputs: &[VarId]) -> Vec<NodeId> {
        let boundary: FxHashSet<VarId> = from_inputs.iter().copied().collect();
        let mut needed: FxHashSet<NodeId> = FxHashSet::default();
        let mut stack: Vec<VarId> = to_outputs.to_vec();
        while let Some(v) = stack.pop() {
            if boundary.contains(&v) {
                continue;
            }
            if let Some(&owner) = self.owner.get(&v) {
                if needed.insert(owner) {
                    stack.extend(self.nodes[owner].inputs.iter().copied());
                }
            }
        }

        let mut indegree: FxHashMap<NodeId, usize> = FxHashMap::default();
        let mut consumers: FxHashMap<NodeId, Vec<NodeId>> = FxHashMap::default();
        for &n in &needed {
            let mut deg = 0;
            for &input in &self.nodes[n].inputs {
                if let Some(&producer) = self.owner.get(&input) {
                    if needed.contains(&producer) {
                        deg += 1;
                        consumers.entry(producer).or_default().push(n);
                    }
                }
            }
            indegree.insert(n, deg);
        }

        let mut queue: VecDeque<NodeId> = self
            .nodes
            .keys()
            .filter(|n| needed.contains(n) && indegree[n] == 0)
            .collect();
        let mut order = Vec::with_capacity(needed.len());
        let mut visited: FxHashSet<NodeId> = FxHashSet::default();
        while let Some(n) = queue.pop_front() {
            if !visited.insert(n) {
                continue;
            }
            order.push(n);
            if let Some(cons) = consumers.get(&n) {
                for &c in cons {
                    let deg = indegree.get_mut(&c).unwrap();
                    *deg -= 1;
                    if *deg == 0 {
                        queue.push_back(c);
                    }
                }
            }
        }
        order
    }

    /// Nodes needed to compute the graph's designated outputs, restricted
    /// to currently-active nodes — the set aliasing/destruction policy is
    /// checked against (§4.E).
    pub fn active_order(&self) -> Vec<NodeId> {
        self.topo(&self.inputs, &self.outputs)
            .into_iter()
            .filter(|n| self.active.contains(n))
            .collect()
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}
