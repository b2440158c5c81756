//! Graph model (§4.B): [`Variable`], [`Node`], [`Graph`], and `topo`.

mod graph;
mod node;
mod variable;

pub use graph::{Client, Graph, GraphObserver, NullObserver};
pub use node::{Cells, CompiledThunk, Node, NodeId, Operator, ReferenceThunk};
pub use variable::{VarId, Variable};
