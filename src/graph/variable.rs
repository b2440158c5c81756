//! [`Variable`]: an abstract value produced by either a graph input or a
//! node output (§3).

use std::rc::Rc;

use slotmap::new_key_type;

use crate::value::ValueType;

new_key_type! {
    /// Stable identity for a [`Variable`], used instead of pointer identity
    /// so that variables remain addressable across graph clones taken by
    /// the optimizer harness (§4.D) and stay valid after pruning (§3:
    /// "every variable ever observed ... remains in its class forever").
    pub struct VarId;
}

/// An abstract value produced by either a graph input or a node output.
///
/// Identity is by [`VarId`]; equality across optimizer runs is not defined
/// (§3) — two independent runs over isomorphic graphs never compare
/// `VarId`s directly, only the [`crate::event::Event`]s they produced.
#[derive(Debug, Clone)]
pub struct Variable {
    /// Type handle supplying validity, approximate equality, deep copy, and
    /// aliasing (§4.A).
    pub ty: Rc<dyn ValueType>,
    /// Human-readable label, purely for diagnostics (§4.G).
    pub label: String,
}

impl Variable {
    pub fn new(ty: Rc<dyn ValueType>, label: impl Into<String>) -> Self {
        Self {
            ty,
            label: label.into(),
        }
    }
}
