//! [`Node`]: an operator application (§3), plus the operator contract it
//! consumes (§6).

use std::collections::BTreeMap;
use std::rc::Rc;

use slotmap::new_key_type;

use crate::error::OperatorError;
use crate::graph::VarId;
use crate::value::Value;

new_key_type! {
    /// Stable identity for a [`Node`]. Node identity is intentionally
    /// excluded from [`crate::event::Event`] equality (§3) so two
    /// independent runs over isomorphic graphs compare equal.
    pub struct NodeId;
}

/// One slot of a [`Node`]'s input or output storage, addressed by position
/// rather than by [`VarId`] so an operator's reference/compiled routine
/// doesn't need to know the graph's variable identities.
pub type Cells = [Option<Value>];

/// A bound reference-backend routine for one node (§6: `perform`).
pub trait ReferenceThunk {
    fn run(&mut self, inputs: &[Value], outputs: &mut Cells) -> Result<(), OperatorError>;
}

/// A bound compiled-backend routine for one node (§6: optional compiled
/// code builder).
pub trait CompiledThunk {
    fn run(&mut self, inputs: &[Value], outputs: &mut Cells) -> Result<(), OperatorError>;
}

/// The operator contract consumed by the engine (§6).
///
/// An operator is stateless with respect to any one node: `build_reference`
/// and `build_compiled` each produce a fresh thunk bound to that node's
/// shape. `build_compiled` returning `None` means "not implemented" for
/// this node, which the linker tolerates (§4.E).
pub trait Operator: std::fmt::Debug {
    fn name(&self) -> &str;

    fn build_reference(&self, node: &Node) -> Box<dyn ReferenceThunk>;

    /// Attempt to build a compiled thunk. `None` means not implemented;
    /// this is not an error.
    fn build_compiled(&self, node: &Node) -> Option<Box<dyn CompiledThunk>>;
}

/// An operator application: an operator handle, ordered inputs/outputs, and
/// optional destroy/view maps (§3).
#[derive(Debug, Clone)]
pub struct Node {
    pub operator: Rc<dyn Operator>,
    pub inputs: Vec<VarId>,
    pub outputs: Vec<VarId>,
    /// output index -> input indices the operator may mutate in place.
    pub destroy_map: BTreeMap<usize, Vec<usize>>,
    /// output index -> input indices the output aliases.
    pub view_map: BTreeMap<usize, Vec<usize>>,
}

impl Node {
    pub fn new(operator: Rc<dyn Operator>, inputs: Vec<VarId>, outputs: Vec<VarId>) -> Self {
        Self {
            operator,
            inputs,
            outputs,
            destroy_map: BTreeMap::new(),
            view_map: BTreeMap::new(),
        }
    }

    pub fn with_destroy_map(mut self, destroy_map: BTreeMap<usize, Vec<usize>>) -> Self {
        self.destroy_map = destroy_map;
        self
    }

    pub fn with_view_map(mut self, view_map: BTreeMap<usize, Vec<usize>>) -> Self {
        self.view_map = view_map;
        self
    }

    /// Input indices declared as destroyable when producing `output_index`.
    pub fn destroyed_inputs(&self, output_index: usize) -> &[usize] {
        self.destroy_map
            .get(&output_index)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Input indices `output_index` is declared to view.
    pub fn viewed_inputs(&self, output_index: usize) -> &[usize] {
        self.view_map
            .get(&output_index)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// All input indices any output may legitimately alias (view or
    /// destroy), used by the view-map check (§4.F.2).
    pub fn allowed_aliases(&self, output_index: usize) -> Vec<usize> {
        let mut allowed = self.viewed_inputs(output_index).to_vec();
        allowed.extend_from_slice(self.destroyed_inputs(output_index));
        allowed
    }
}
