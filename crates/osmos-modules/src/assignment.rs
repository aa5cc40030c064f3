//! Derived-concentration assignment module.
//!
//! Recomputes a target entity's concentration from other entities'
//! current concentrations via a user-supplied expression, each accepted
//! epoch. Assignments are applied directly, outside the step-doubling
//! error estimate — a derived value has no integration error of its own.

use osmos_core::{EntityId, ModuleError, NodeId};
use osmos_graph::{AutomatonNode, CellTopology};
use osmos_module::{DeltaBuffer, ModuleKind, StateView, UpdateModule};

/// A pure expression over input concentrations, in declaration order.
pub type AssignmentExpr = Box<dyn Fn(&[f64]) -> f64 + Send + Sync>;

/// Assigns `target = expr(inputs)` at one topology's subsection.
///
/// The expression is an explicit pure function: it receives the input
/// concentrations as a slice ordered like the `inputs` list and returns
/// the new target value.
pub struct AssignmentModule {
    name: String,
    topology: CellTopology,
    target: EntityId,
    inputs: Vec<EntityId>,
    expr: AssignmentExpr,
}

impl AssignmentModule {
    /// Create an assignment module.
    pub fn new(
        name: impl Into<String>,
        topology: CellTopology,
        target: EntityId,
        inputs: Vec<EntityId>,
        expr: AssignmentExpr,
    ) -> Self {
        Self {
            name: name.into(),
            topology,
            target,
            inputs,
            expr,
        }
    }
}

impl UpdateModule for AssignmentModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ModuleKind {
        ModuleKind::DirectAssignment
    }

    fn referenced_entities(&self) -> Vec<EntityId> {
        let mut entities = self.inputs.clone();
        entities.push(self.target);
        entities
    }

    fn feature_targets(&self) -> Vec<EntityId> {
        Vec::new()
    }

    fn applies_to(&self, node: &AutomatonNode) -> bool {
        node.region().subsection(self.topology).is_some()
    }

    fn compute(
        &self,
        node: NodeId,
        view: &StateView<'_>,
        out: &mut DeltaBuffer,
    ) -> Result<(), ModuleError> {
        let subsection = match view
            .node(node)
            .and_then(|n| n.region().subsection(self.topology))
        {
            Some(s) => s.id(),
            None => return Ok(()),
        };
        let values: Vec<f64> = self
            .inputs
            .iter()
            .map(|&e| view.concentration(node, subsection, e))
            .collect();
        let value = (self.expr)(&values);
        if !value.is_finite() {
            return Err(ModuleError::NanDetected {
                node,
                entity: self.target,
            });
        }
        out.add_assignment(node, subsection, self.target, value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use osmos_core::{EntityCatalog, EntityKind, ModuleId};
    use osmos_module::StateLayer;
    use osmos_test_utils::single_node_graph;

    #[test]
    fn target_follows_expression() {
        let mut catalog = EntityCatalog::new();
        let a = catalog.register("A", EntityKind::SmallMolecule).unwrap();
        let b = catalog.register("B", EntityKind::SmallMolecule).unwrap();
        let total = catalog.register("total", EntityKind::Complex).unwrap();

        let (graph, node, subsection) = single_node_graph(&[(a, 1.5), (b, 0.25)]);
        let layer = StateLayer::capture(&graph);
        let view = StateView::new(&graph, &layer, &catalog, 0.1, 0.0, 0, 0);

        let module = AssignmentModule::new(
            "sum",
            CellTopology::Inner,
            total,
            vec![a, b],
            Box::new(|inputs| inputs.iter().sum()),
        );

        let mut out = DeltaBuffer::new(ModuleId(0));
        module.compute(node, &view, &mut out).unwrap();

        let assignment = out.assignments()[0];
        assert_eq!(assignment.entity, total);
        assert_eq!(assignment.subsection, subsection);
        assert!((assignment.value - 1.75).abs() < 1e-12);
    }

    #[test]
    fn non_finite_expression_fails_loudly() {
        let mut catalog = EntityCatalog::new();
        let a = catalog.register("A", EntityKind::SmallMolecule).unwrap();
        let ratio = catalog.register("ratio", EntityKind::Complex).unwrap();

        let (graph, node, _) = single_node_graph(&[(a, 1.0)]);
        let layer = StateLayer::capture(&graph);
        let view = StateView::new(&graph, &layer, &catalog, 0.1, 0.0, 0, 0);

        let module = AssignmentModule::new(
            "bad_ratio",
            CellTopology::Inner,
            ratio,
            vec![a],
            Box::new(|inputs| inputs[0] / 0.0),
        );

        let mut out = DeltaBuffer::new(ModuleId(0));
        assert!(matches!(
            module.compute(node, &view, &mut out),
            Err(ModuleError::NanDetected { .. })
        ));
    }
}
