//! Node storage plus the destruction and pruning rules that keep the graph playable.

use std::collections::VecDeque;

use super::cell::{GenCell, NodeId};
use super::connectivity::{ConnectivityTest, Edge};
use crate::diagnostics::Diagnostics;
use crate::random::GenRandom;
use crate::shape::ShapeId;
use crate::types::{CellRole, Vec3};

/// What a dead-end check pretends is already gone.
#[derive(Clone, Copy, Debug)]
enum Exclusion {
    Node(NodeId),
    Edge(Edge),
}

impl Exclusion {
    fn hides(self, from: NodeId, to: NodeId) -> bool {
        match self {
            Self::Node(node) => to == node,
            Self::Edge(edge) => edge.matches(from, to),
        }
    }
}

#[derive(Clone, Debug)]
pub struct GenCellContainer {
    cells: Vec<Option<GenCell>>,
    start_cells: Vec<NodeId>,
    destination_cells: Vec<NodeId>,
    dead_end_max: i32,
    num_cells: usize,
    diagnostics: Diagnostics,
}

impl GenCellContainer {
    pub fn new(diagnostics: Diagnostics) -> Self {
        Self {
            cells: Vec::new(),
            start_cells: Vec::new(),
            destination_cells: Vec::new(),
            dead_end_max: 0,
            num_cells: 0,
            diagnostics,
        }
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Drops every node and allocates `size` empty ones whose ids match their slots.
    pub fn initialize(&mut self, size: usize) {
        self.destroy_all_cells();
        self.cells = (0..size).map(|index| Some(GenCell::new(index as u32, Vec3::ZERO, None))).collect();
        self.num_cells = size;
    }

    pub fn create_cell(&mut self, id: u32, position: Vec3, cell_ref: Option<ShapeId>) -> NodeId {
        let node = NodeId::from(self.cells.len());
        self.cells.push(Some(GenCell::new(id, position, cell_ref)));
        self.num_cells += 1;
        node
    }

    pub fn add_start_or_destination_cell(&mut self, node: NodeId, role: CellRole) -> bool {
        if self.cell(node).is_none() {
            return false;
        }
        let list = match role {
            CellRole::None => return false,
            CellRole::Start => &mut self.start_cells,
            CellRole::Destination => &mut self.destination_cells,
        };
        if !list.contains(&node) {
            list.push(node);
        }
        true
    }

    pub fn destroy_all_cells(&mut self) {
        self.cells.clear();
        self.start_cells.clear();
        self.destination_cells.clear();
        self.num_cells = 0;
    }

    /// Detaches the node from every neighbor and empties its slot.
    pub fn destroy_cell(&mut self, index: usize) -> bool {
        let Some(slot) = self.cells.get_mut(index) else {
            return false;
        };
        let Some(cell) = slot.take() else {
            return true;
        };
        let node = NodeId::from(index);
        for &other in &cell.connections {
            if let Some(other) = self.cell_mut(other) {
                other.disconnect_from(node);
            }
        }
        for &other in &cell.corners {
            if let Some(other) = self.cell_mut(other) {
                other.uncorner_from(node);
            }
        }
        self.start_cells.retain(|&id| id != node);
        self.destination_cells.retain(|&id| id != node);
        self.num_cells -= 1;
        true
    }

    pub fn cell(&self, node: NodeId) -> Option<&GenCell> {
        self.cells.get(node.index()).and_then(Option::as_ref)
    }

    pub fn cell_mut(&mut self, node: NodeId) -> Option<&mut GenCell> {
        self.cells.get_mut(node.index()).and_then(Option::as_mut)
    }

    pub fn verify_index(&self, index: usize) -> bool {
        index < self.cells.len()
    }

    pub fn slots(&self) -> &[Option<GenCell>] {
        &self.cells
    }

    /// Live nodes in slot order.
    pub fn cells(&self) -> impl Iterator<Item = (NodeId, &GenCell)> {
        self.cells
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|cell| (NodeId::from(index), cell)))
    }

    pub fn cells_mut(&mut self) -> impl Iterator<Item = &mut GenCell> {
        self.cells.iter_mut().flatten()
    }

    pub fn num_cells(&self) -> usize {
        self.num_cells
    }

    pub fn start_cells(&self) -> &[NodeId] {
        &self.start_cells
    }

    pub fn destination_cells(&self) -> &[NodeId] {
        &self.destination_cells
    }

    pub fn dead_end_max(&self) -> i32 {
        self.dead_end_max
    }

    pub fn set_dead_end_max(&mut self, dead_end_max: i32) {
        self.dead_end_max = dead_end_max;
    }

    fn pair_mut(&mut self, a: NodeId, b: NodeId) -> Option<(&mut GenCell, &mut GenCell)> {
        let (i, j) = (a.index(), b.index());
        if i == j || i >= self.cells.len() || j >= self.cells.len() {
            return None;
        }
        let (low, high) = self.cells.split_at_mut(i.max(j));
        let (first, second) = (low[i.min(j)].as_mut()?, high[0].as_mut()?);
        Some(if i < j { (first, second) } else { (second, first) })
    }

    pub fn connect(&mut self, a: NodeId, b: NodeId) {
        let Some((cell_a, cell_b)) = self.pair_mut(a, b) else {
            debug_assert!(false, "connect on missing or identical nodes {a:?} {b:?}");
            return;
        };
        cell_a.connect_to(b);
        cell_b.connect_to(a);
    }

    pub fn disconnect(&mut self, a: NodeId, b: NodeId) {
        let Some((cell_a, cell_b)) = self.pair_mut(a, b) else {
            debug_assert!(false, "disconnect on missing or identical nodes {a:?} {b:?}");
            return;
        };
        if cell_a.is_connected(b) && cell_b.is_connected(a) {
            cell_a.disconnect_from(b);
            cell_b.disconnect_from(a);
        }
    }

    pub fn corner(&mut self, a: NodeId, b: NodeId) {
        let Some((cell_a, cell_b)) = self.pair_mut(a, b) else {
            debug_assert!(false, "corner on missing or identical nodes {a:?} {b:?}");
            return;
        };
        cell_a.corner_to(b);
        cell_b.corner_to(a);
    }

    pub fn share_connection(&self, a: NodeId, b: NodeId) -> bool {
        match (self.cell(a), self.cell(b)) {
            (Some(cell_a), Some(cell_b)) => cell_a.is_connected(b) && cell_b.is_connected(a),
            _ => false,
        }
    }

    /// A node may go when it is unplaced, has no external seam, touches no
    /// placed neighbor, and removing it neither strands a dead end nor splits
    /// the graph.
    pub fn destroyable_cell(&self, node: NodeId) -> bool {
        let Some(cell) = self.cell(node) else {
            return false;
        };
        if cell.is_placed() || !cell.external_connections().is_empty() {
            return false;
        }
        if cell.connections.iter().any(|&other| self.cell(other).is_some_and(GenCell::is_placed)) {
            return false;
        }
        if !self.check_for_connectivity(Exclusion::Node(node)) {
            return false;
        }
        !ConnectivityTest::new().test_cell_required(self, node)
    }

    /// Randomly drops edges of `node` that no connectivity or dead-end rule needs.
    pub fn destroy_unrequired_connections(
        &mut self,
        node: NodeId,
        rng: &mut impl GenRandom,
        chance: i32,
    ) -> bool {
        let Some(cell) = self.cell(node) else {
            return false;
        };
        let snapshot = cell.connections.clone();
        let mut test = ConnectivityTest::new();

        for other in snapshot {
            if !self.share_connection(node, other) {
                continue;
            }
            if self.check_for_connectivity(Exclusion::Edge(Edge(node, other)))
                && !test.test_connection_required(self, node, other)
                && rng.next_pct(chance)
            {
                self.disconnect(node, other);
            }
        }
        true
    }

    fn degree_without(&self, node: NodeId, cell: &GenCell, exclusion: Exclusion) -> usize {
        cell.connections.iter().filter(|&&other| !exclusion.hides(node, other)).count()
    }

    /// Every node left with a single edge must still reach a junction or an
    /// endpoint within `dead_end_max` steps.
    fn check_for_connectivity(&self, exclusion: Exclusion) -> bool {
        if self.dead_end_max <= 0 {
            return true;
        }
        self.cells().all(|(node, cell)| {
            if matches!(exclusion, Exclusion::Node(excluded) if excluded == node) {
                return true;
            }
            self.degree_without(node, cell, exclusion) != 1 || self.dead_end_reaches_exit(node, exclusion)
        })
    }

    /// Bounded breadth-first walk from a dead end. The dead end itself sits
    /// at level 1 and each step adds one level.
    fn dead_end_reaches_exit(&self, dead_end: NodeId, exclusion: Exclusion) -> bool {
        let max_level = self.dead_end_max;
        let mut seen = vec![false; self.cells.len()];
        let mut queue = VecDeque::from([(dead_end, 1)]);
        seen[dead_end.index()] = true;

        while let Some((node, level)) = queue.pop_front() {
            if level > max_level {
                continue;
            }
            let Some(cell) = self.cell(node) else {
                continue;
            };
            if self.degree_without(node, cell, exclusion) >= 3
                || self.start_cells.contains(&node)
                || self.destination_cells.contains(&node)
            {
                return true;
            }
            for &next in &cell.connections {
                if exclusion.hides(node, next) || seen[next.index()] {
                    continue;
                }
                seen[next.index()] = true;
                queue.push_back((next, level + 1));
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::test_support::ScriptedRandom;
    use proptest::prelude::*;

    fn container(size: usize) -> GenCellContainer {
        let mut container = GenCellContainer::new(Diagnostics::quiet("t"));
        container.initialize(size);
        container
    }

    fn ring(size: usize) -> GenCellContainer {
        let mut container = container(size);
        for index in 0..size {
            container.connect(NodeId::from(index), NodeId::from((index + 1) % size));
        }
        container
    }

    #[derive(Clone, Copy, Debug)]
    enum Op {
        Connect(u32, u32),
        Disconnect(u32, u32),
        Corner(u32, u32),
        Destroy(u32),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0u32..6, 0u32..6).prop_map(|(a, b)| Op::Connect(a, b)),
            (0u32..6, 0u32..6).prop_map(|(a, b)| Op::Disconnect(a, b)),
            (0u32..6, 0u32..6).prop_map(|(a, b)| Op::Corner(a, b)),
            (0u32..6).prop_map(Op::Destroy),
        ]
    }

    fn live_pair(container: &GenCellContainer, a: u32, b: u32) -> bool {
        a != b && container.cell(NodeId(a)).is_some() && container.cell(NodeId(b)).is_some()
    }

    proptest! {
        #[test]
        fn adjacency_stays_mutual(ops in prop::collection::vec(op(), 0..60)) {
            let mut container = container(6);
            for op in ops {
                match op {
                    Op::Connect(a, b) if live_pair(&container, a, b) => container.connect(NodeId(a), NodeId(b)),
                    Op::Disconnect(a, b) if live_pair(&container, a, b) => container.disconnect(NodeId(a), NodeId(b)),
                    Op::Corner(a, b) if live_pair(&container, a, b) => container.corner(NodeId(a), NodeId(b)),
                    Op::Destroy(a) => { container.destroy_cell(a as usize); }
                    _ => {}
                }
            }

            for (a, cell_a) in container.cells() {
                for (b, cell_b) in container.cells() {
                    prop_assert_eq!(cell_a.is_connected(b), cell_b.is_connected(a));
                    prop_assert_eq!(cell_a.is_corner(b), cell_b.is_corner(a));
                }
                for &other in cell_a.connections().iter().chain(cell_a.corners()) {
                    prop_assert!(container.cell(other).is_some());
                }
            }
        }
    }

    #[test]
    fn connect_is_idempotent_and_counts_track_destruction() {
        let mut container = container(3);
        container.connect(NodeId(0), NodeId(1));
        container.connect(NodeId(1), NodeId(0));
        assert_eq!(container.cell(NodeId(0)).map(|cell| cell.connections().len()), Some(1));
        assert!(container.share_connection(NodeId(0), NodeId(1)));

        assert!(container.destroy_cell(1));
        assert!(container.destroy_cell(1));
        assert!(!container.destroy_cell(7));
        assert_eq!(container.num_cells(), 2);
        assert!(container.cell(NodeId(0)).is_some_and(|cell| cell.connections().is_empty()));
    }

    #[test]
    fn roles_register_once_and_follow_destruction() {
        let mut container = container(2);
        assert!(container.add_start_or_destination_cell(NodeId(0), CellRole::Start));
        assert!(container.add_start_or_destination_cell(NodeId(0), CellRole::Start));
        assert!(!container.add_start_or_destination_cell(NodeId(1), CellRole::None));
        assert!(!container.add_start_or_destination_cell(NodeId(9), CellRole::Destination));
        assert_eq!(container.start_cells(), [NodeId(0)]);

        container.destroy_cell(0);
        assert!(container.start_cells().is_empty());
    }

    #[test]
    fn ring_node_is_destroyable_without_dead_end_limit() {
        let container = ring(6);
        assert!(container.destroyable_cell(NodeId(2)));
    }

    #[test]
    fn dead_end_limit_blocks_long_tails() {
        // Removing a ring node leaves a five node chain whose ends are three
        // steps from nothing but each other.
        let mut container = ring(6);
        container.set_dead_end_max(2);
        assert!(!container.destroyable_cell(NodeId(2)));

        // An endpoint next to the removed node shortens one tail to its own slot.
        container.add_start_or_destination_cell(NodeId(1), CellRole::Start);
        container.add_start_or_destination_cell(NodeId(3), CellRole::Destination);
        assert!(container.destroyable_cell(NodeId(2)));
    }

    #[test]
    fn tail_that_reaches_a_junction_in_time_is_accepted() {
        // 0 - 1 - 2 - 3 plus a hub 3 connected to 4, 5, 6 and 6 - 0 closing a loop.
        let mut container = container(7);
        for (a, b) in [(0, 1), (1, 2), (2, 3), (3, 4), (3, 5), (3, 6), (6, 0), (4, 5)] {
            container.connect(NodeId(a), NodeId(b));
        }
        container.set_dead_end_max(3);
        // Dropping 6 leaves 0 - 1 - 2 - 3(hub): the tail reaches the hub at level 4.
        assert!(!container.destroyable_cell(NodeId(6)));
        container.set_dead_end_max(4);
        assert!(container.destroyable_cell(NodeId(6)));
    }

    #[test]
    fn placed_nodes_and_their_neighbors_are_protected() {
        let mut container = ring(4);
        let library = crate::shape::ShapeLibrary::new();
        if let Some(cell) = container.cell_mut(NodeId(0)) {
            cell.set_cell_ref(Some(ShapeId::default()), &library);
        }
        assert!(!container.destroyable_cell(NodeId(0)));
        assert!(!container.destroyable_cell(NodeId(1)));
        assert!(container.destroyable_cell(NodeId(2)));
    }

    #[test]
    fn pruning_keeps_bridges_and_drops_loop_edges_on_success() {
        let mut container = ring(4);
        container.create_cell(4, Vec3::ZERO, None);
        container.connect(NodeId(0), NodeId(4));

        assert!(container.destroy_unrequired_connections(NodeId(0), &mut ScriptedRandom::always(0), 100));
        let cell = container.cell(NodeId(0)).expect("node 0");
        assert!(cell.is_connected(NodeId(4)));
        assert_eq!(cell.connections().len(), 2);

        let mut test = ConnectivityTest::new();
        assert!(test.test_cell_connected(&container, NodeId(0)));
    }

    #[test]
    fn pruning_never_fires_at_zero_chance() {
        let mut container = ring(5);
        container.destroy_unrequired_connections(NodeId(0), &mut ScriptedRandom::always(0), 0);
        assert_eq!(container.cell(NodeId(0)).map(|cell| cell.connections().len()), Some(2));
    }
}
