//! Single entry point composing the optimizer harness (§4.D) and the
//! dual-execution linker (§4.E) into the pipeline `EngineConfig` describes
//! as one closed set of knobs (§6).

use rustc_hash::FxHashMap;

use crate::config::EngineConfig;
use crate::error::DebugEngineError;
use crate::graph::{Graph, VarId};
use crate::linker::{self, RunOutcome};
use crate::optimizer::OptimizerHarness;
use crate::tracker::EquivalenceTracker;
use crate::value::Value;

/// Runs `config.optimizer` to stability against `(source, base_tracker)`,
/// then evaluates the resulting graph under both backends.
///
/// `base_tracker` carries whatever equivalence-class/event-log state was
/// already accumulated while building `source` (typically just the
/// `import` events from its initial nodes) — passing the same accumulated
/// tracker into every stability trial is what lets the optimizer harness's
/// event-log comparison isolate exactly the optimizer's own
/// non-determinism (§4.D), and what lets variables introduced before
/// optimization still appear in `all_variables_ever` for the linker's
/// evaluation order and bad-optimization check (§4.E, §4.F.3).
pub fn evaluate(
    source: &Graph,
    base_tracker: &EquivalenceTracker,
    config: &EngineConfig,
    graph_inputs: FxHashMap<VarId, Value>,
) -> Result<RunOutcome, DebugEngineError> {
    config.validate(source)?;

    let harness = OptimizerHarness::new(config.optimizer, config.stability_patience);
    let (optimized, mut tracker) = harness.run_stable(source, base_tracker)?;
    linker::run(&optimized, &mut tracker, config, graph_inputs)
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::graph::{CompiledThunk, GraphObserver, Node, Operator, ReferenceThunk};
    use crate::optimizer::Optimizer;
    use crate::value::test_support::{as_f64, f64_type, val};

    #[derive(Debug)]
    struct Add;
    struct AddThunk;
    impl ReferenceThunk for AddThunk {
        fn run(&mut self, inputs: &[Value], outputs: &mut [Option<Value>]) -> Result<(), crate::error::OperatorError> {
            let a = as_f64(inputs[0].as_ref());
            let b = as_f64(inputs[1].as_ref());
            outputs[0] = Some(val(a.iter().zip(b.iter()).map(|(x, y)| x + y).collect()));
            Ok(())
        }
    }
    impl Operator for Add {
        fn name(&self) -> &str {
            "add"
        }
        fn build_reference(&self, _node: &Node) -> Box<dyn ReferenceThunk> {
            Box::new(AddThunk)
        }
        fn build_compiled(&self, _node: &Node) -> Option<Box<dyn CompiledThunk>> {
            None
        }
    }

    struct NoRewrite;
    impl Optimizer for NoRewrite {
        fn run(&self, _graph: &mut Graph, _observer: &mut dyn GraphObserver) {}
    }

    #[test]
    fn evaluate_runs_optimizer_then_linker() {
        let mut g = Graph::new();
        let x = g.alloc_variable(f64_type(), "x");
        let y = g.alloc_variable(f64_type(), "y");
        g.set_graph_input(x);
        g.set_graph_input(y);
        let z = g.alloc_variable(f64_type(), "z");
        let mut tracker = EquivalenceTracker::new(6);
        g.insert_node(Node::new(Rc::new(Add), vec![x, y], vec![z]), &mut tracker);
        g.set_graph_output(z);

        let optimizer = NoRewrite;
        let config = EngineConfig::new(&optimizer);

        let mut inputs = FxHashMap::default();
        inputs.insert(x, val(vec![1.0]));
        inputs.insert(y, val(vec![2.0]));

        let outcome = evaluate(&g, &tracker, &config, inputs).unwrap();
        assert_eq!(as_f64(outcome[&z].as_ref()), vec![3.0]);
    }
}
