//! Reachability predicates over a container's connection graph.

use super::cell::NodeId;
use super::container::GenCellContainer;

/// An undirected edge between two nodes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Edge(pub NodeId, pub NodeId);

impl Edge {
    pub fn matches(self, a: NodeId, b: NodeId) -> bool {
        (self.0 == a && self.1 == b) || (self.0 == b && self.1 == a)
    }
}

/// Work-list traversal state reused across queries.
#[derive(Debug, Default)]
pub struct ConnectivityTest {
    /// `None` marks a destroyed slot that takes no part in the query.
    reached: Vec<Option<bool>>,
    stack: Vec<NodeId>,
}

impl ConnectivityTest {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when dropping `excluded` edges would leave some live node unreachable from `node`.
    pub fn test_connections_required(
        &mut self,
        container: &GenCellContainer,
        node: NodeId,
        excluded: &[Edge],
    ) -> bool {
        self.reset(container);
        self.flood(container, node, |from, to| excluded.iter().any(|edge| edge.matches(from, to)));
        self.any_unreached(None)
    }

    /// True when the edge `a`-`b` is load-bearing. Edges touching a placed node always are.
    pub fn test_connection_required(&mut self, container: &GenCellContainer, a: NodeId, b: NodeId) -> bool {
        let placed = |id| container.cell(id).is_some_and(|cell| cell.is_placed());
        if placed(a) || placed(b) {
            return true;
        }
        self.reset(container);
        self.flood(container, a, |from, to| Edge(a, b).matches(from, to));
        self.any_unreached(None)
    }

    /// True when `node` has at least one edge and every live node is reachable from it.
    pub fn test_cell_connected(&mut self, container: &GenCellContainer, node: NodeId) -> bool {
        let Some(cell) = container.cell(node) else {
            return false;
        };
        if cell.connections.is_empty() {
            return false;
        }
        self.reset(container);
        self.flood(container, node, |_, _| false);
        !self.any_unreached(None)
    }

    /// True when removing `node` would split the remaining live nodes.
    pub fn test_cell_required(&mut self, container: &GenCellContainer, node: NodeId) -> bool {
        let Some(&first) = container.cell(node).and_then(|cell| cell.connections.first()) else {
            return false;
        };
        self.reset(container);
        self.flood(container, first, |_, to| to == node);
        self.any_unreached(Some(node))
    }

    fn reset(&mut self, container: &GenCellContainer) {
        self.reached.clear();
        self.reached.extend(container.slots().iter().map(|slot| slot.as_ref().map(|_| false)));
        self.stack.clear();
    }

    fn flood(&mut self, container: &GenCellContainer, root: NodeId, skip: impl Fn(NodeId, NodeId) -> bool) {
        let Some(Some(reached)) = self.reached.get_mut(root.index()) else {
            return;
        };
        *reached = true;
        self.stack.push(root);

        while let Some(current) = self.stack.pop() {
            let Some(cell) = container.cell(current) else {
                continue;
            };
            for &next in &cell.connections {
                if skip(current, next) {
                    continue;
                }
                if let Some(Some(reached)) = self.reached.get_mut(next.index())
                    && !*reached
                {
                    *reached = true;
                    self.stack.push(next);
                }
            }
        }
    }

    fn any_unreached(&self, ignore: Option<NodeId>) -> bool {
        self.reached
            .iter()
            .enumerate()
            .any(|(index, reached)| *reached == Some(false) && ignore != Some(NodeId::from(index)))
    }
}
