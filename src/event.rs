//! [`Event`]: a record of one thing the equivalence tracker observed during
//! optimization (§3).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::graph::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    Import,
    Prune,
    Change,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EventKind::Import => "import",
            EventKind::Prune => "prune",
            EventKind::Change => "change",
        };
        f.write_str(s)
    }
}

/// One entry in the event log.
///
/// `node` is carried for diagnostics but intentionally excluded from
/// [`PartialEq`] (§3: "node identity is intentionally excluded so two
/// independent runs over isomorphic graphs compare equal").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub kind: EventKind,
    pub node: NodeId,
    pub operator_name: String,
    pub input_index: Option<usize>,
    pub reason: Option<String>,
}

impl Event {
    pub fn import(node: NodeId, operator_name: impl Into<String>) -> Self {
        Self {
            kind: EventKind::Import,
            node,
            operator_name: operator_name.into(),
            input_index: None,
            reason: None,
        }
    }

    pub fn prune(node: NodeId, operator_name: impl Into<String>) -> Self {
        Self {
            kind: EventKind::Prune,
            node,
            operator_name: operator_name.into(),
            input_index: None,
            reason: None,
        }
    }

    pub fn change(
        node: NodeId,
        operator_name: impl Into<String>,
        input_index: usize,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            kind: EventKind::Change,
            node,
            operator_name: operator_name.into(),
            input_index: Some(input_index),
            reason: Some(reason.into()),
        }
    }
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.operator_name == other.operator_name
            && self.input_index == other.input_index
            && self.reason == other.reason
    }
}
impl Eq for Event {}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}", self.kind, self.operator_name)?;
        if let Some(i) = self.input_index {
            write!(f, ", input #{i}")?;
        }
        if let Some(r) = &self.reason {
            write!(f, ", reason={r:?}")?;
        }
        write!(f, ")")
    }
}
