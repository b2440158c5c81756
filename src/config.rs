//! Engine configuration (ambient — supplements §6).

use std::num::NonZeroUsize;

use crate::error::DebugEngineError;
use crate::graph::Graph;
use crate::optimizer::Optimizer;

/// Closed set of engine knobs (§6 "Engine configuration").
///
/// Validated at construction, the way `hydro_lang`'s builder-style graph
/// configs reject an invalid combination immediately rather than deferring
/// the failure to the first evaluation.
pub struct EngineConfig<'a> {
    pub optimizer: &'a dyn Optimizer,
    pub stability_patience: NonZeroUsize,
    pub check_compiled_code: bool,
    pub check_reference_code: bool,
    pub subgraph_render_depth: usize,
    /// Whether a node with a non-empty `destroy_map` is permitted in the
    /// graph handed to the engine (§7 `ConfigError`, mirroring the
    /// original's `accept_inplace`).
    pub accept_inplace: bool,
}

impl<'a> EngineConfig<'a> {
    /// `stability_patience` defaults to 10, both backend checks default to
    /// enabled, `subgraph_render_depth` defaults to 6 (§4.C "depth-limited,
    /// typically 6"), `accept_inplace` defaults to true — unlike the
    /// original's optimize-then-execute pipeline, where in-place ops are
    /// only ever introduced by the optimizer itself and never expected in
    /// the input graph, this engine treats `destroy_map` as a normal,
    /// directly-declared part of an operator's contract (§4.F.1), so
    /// rejecting it by default would reject the common case.
    pub fn new(optimizer: &'a dyn Optimizer) -> Self {
        Self {
            optimizer,
            stability_patience: NonZeroUsize::new(10).unwrap(),
            check_compiled_code: true,
            check_reference_code: true,
            subgraph_render_depth: 6,
            accept_inplace: true,
        }
    }

    pub fn with_stability_patience(mut self, n: NonZeroUsize) -> Self {
        self.stability_patience = n;
        self
    }

    pub fn with_check_compiled_code(mut self, enabled: bool) -> Self {
        self.check_compiled_code = enabled;
        self
    }

    pub fn with_check_reference_code(mut self, enabled: bool) -> Self {
        self.check_reference_code = enabled;
        self
    }

    pub fn with_subgraph_render_depth(mut self, depth: usize) -> Self {
        self.subgraph_render_depth = depth;
        self
    }

    pub fn with_accept_inplace(mut self, enabled: bool) -> Self {
        self.accept_inplace = enabled;
        self
    }

    /// At least one backend must be enabled, and if `accept_inplace` is
    /// false, `graph` must not contain a node with a non-empty
    /// `destroy_map` (§6, §7 `ConfigError`; mirrors the original's
    /// `_optcheck_env` rejecting any node with a `destroy_map` when
    /// `accept_inplace` is unset).
    pub fn validate(&self, graph: &Graph) -> Result<(), DebugEngineError> {
        if !self.check_compiled_code && !self.check_reference_code {
            return Err(DebugEngineError::Config(
                "at least one of check_compiled_code / check_reference_code must be true".into(),
            ));
        }
        if !self.accept_inplace {
            for node_id in graph.node_ids() {
                if !graph.node(node_id).destroy_map.is_empty() {
                    return Err(DebugEngineError::Config(format!(
                        "graph must not contain inplace operations, but node {node_id:?} declares a destroy_map \
                         (accept_inplace is false)"
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::graph::GraphObserver;
    use crate::value::test_support::f64_type;

    struct NoopOptimizer;
    impl Optimizer for NoopOptimizer {
        fn run(&self, _graph: &mut Graph, _observer: &mut dyn GraphObserver) {}
    }

    #[derive(Debug)]
    struct NegInplace;
    impl crate::graph::Operator for NegInplace {
        fn name(&self) -> &str {
            "neg_inplace"
        }
        fn build_reference(&self, _node: &crate::graph::Node) -> Box<dyn crate::graph::ReferenceThunk> {
            unimplemented!()
        }
        fn build_compiled(&self, _node: &crate::graph::Node) -> Option<Box<dyn crate::graph::CompiledThunk>> {
            None
        }
    }

    #[test]
    fn both_backends_disabled_is_rejected() {
        let opt = NoopOptimizer;
        let config = EngineConfig::new(&opt)
            .with_check_compiled_code(false)
            .with_check_reference_code(false);
        assert!(matches!(config.validate(&Graph::new()), Err(DebugEngineError::Config(_))));
    }

    #[test]
    fn default_config_validates() {
        let opt = NoopOptimizer;
        let config = EngineConfig::new(&opt);
        assert!(config.validate(&Graph::new()).is_ok());
    }

    #[test]
    fn declared_inplace_op_rejected_when_not_accepted() {
        let mut g = Graph::new();
        let x = g.alloc_variable(f64_type(), "x");
        g.set_graph_input(x);
        let y = g.alloc_variable(f64_type(), "y");
        let op = Rc::new(NegInplace) as Rc<dyn crate::graph::Operator>;
        let mut obs = crate::graph::NullObserver;
        let node = crate::graph::Node::new(op, vec![x], vec![y]).with_destroy_map(
            std::iter::once((0, vec![0])).collect(),
        );
        g.insert_node(node, &mut obs);

        let opt = NoopOptimizer;
        let config = EngineConfig::new(&opt).with_accept_inplace(false);
        assert!(matches!(config.validate(&g), Err(DebugEngineError::Config(_))));
    }

    #[test]
    fn declared_inplace_op_accepted_by_default() {
        let mut g = Graph::new();
        let x = g.alloc_variable(f64_type(), "x");
        g.set_graph_input(x);
        let y = g.alloc_variable(f64_type(), "y");
        let op = Rc::new(NegInplace) as Rc<dyn crate::graph::Operator>;
        let mut obs = crate::graph::NullObserver;
        let node = crate::graph::Node::new(op, vec![x], vec![y]).with_destroy_map(
            std::iter::once((0, vec![0])).collect(),
        );
        g.insert_node(node, &mut obs);

        let opt = NoopOptimizer;
        let config = EngineConfig::new(&opt);
        assert!(config.validate(&g).is_ok());
    }
}
