//! Rectangular grid of nodes: full mesh wiring, shape reservation, and BFS depths.

use std::fmt;
use std::sync::Arc;

use super::cell::{GenCell, NodeId};
use super::connectivity::{ConnectivityTest, Edge};
use super::container::GenCellContainer;
use crate::catalog::{CellCatalog, effective_type};
use crate::diagnostics::{Diagnostics, IssueKind};
use crate::shape::{ShapeId, ShapeLibrary};
use crate::types::{CellRole, CellType, GridCoord};

/// Side scan order used by reservation checks.
const SIDE_ORDER: [CellType; 4] = [CellType::E, CellType::N, CellType::W, CellType::S];

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReserveError {
    NotReservable { coord: GridCoord },
    UntypedShape { coord: GridCoord },
    /// Closing unused sides cut the grid apart.
    IntegrityViolation { coord: GridCoord },
}

impl fmt::Display for ReserveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotReservable { coord } => write!(f, "cell ({}, {}) cannot take this shape", coord.x, coord.y),
            Self::UntypedShape { coord } => write!(f, "shape reserved at ({}, {}) has no open side", coord.x, coord.y),
            Self::IntegrityViolation { coord } => {
                write!(f, "reservation at ({}, {}) disconnected the grid", coord.x, coord.y)
            }
        }
    }
}

impl std::error::Error for ReserveError {}

#[derive(Clone, Debug)]
pub struct GridContainer {
    container: GenCellContainer,
    width: i32,
    height: i32,
    library: Arc<ShapeLibrary>,
}

impl GridContainer {
    pub fn new(width: i32, height: i32, catalog: &CellCatalog, dead_end_max: i32, diagnostics: Diagnostics) -> Self {
        let width = width.max(0);
        let height = height.max(0);
        let mut container = GenCellContainer::new(diagnostics);
        container.initialize(width as usize * height as usize);
        container.set_dead_end_max(dead_end_max);
        Self { container, width, height, library: Arc::clone(catalog.library()) }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn container(&self) -> &GenCellContainer {
        &self.container
    }

    pub fn container_mut(&mut self) -> &mut GenCellContainer {
        &mut self.container
    }

    pub fn library(&self) -> &ShapeLibrary {
        &self.library
    }

    pub fn index(&self, coord: GridCoord) -> usize {
        (self.width * coord.y + coord.x) as usize
    }

    pub fn coord_of(&self, node: NodeId) -> GridCoord {
        let index = node.index() as i32;
        if self.width == 0 {
            return GridCoord::new(0, 0);
        }
        GridCoord::new(index % self.width, index / self.width)
    }

    pub fn test_coord(&self, coord: GridCoord) -> bool {
        coord.x >= 0 && coord.x < self.width && coord.y >= 0 && coord.y < self.height
    }

    pub fn verify_coord(&self, coord: GridCoord) -> bool {
        self.test_coord(coord) && self.container.verify_index(self.index(coord))
    }

    /// Slot id of the live node at `coord`.
    pub fn node_at(&self, coord: GridCoord) -> Option<NodeId> {
        if !self.verify_coord(coord) {
            return None;
        }
        let node = NodeId::from(self.index(coord));
        self.container.cell(node).map(|_| node)
    }

    pub fn cell_at(&self, coord: GridCoord) -> Option<&GenCell> {
        self.node_at(coord).and_then(|node| self.container.cell(node))
    }

    pub fn cell_at_mut(&mut self, coord: GridCoord) -> Option<&mut GenCell> {
        let node = self.node_at(coord)?;
        self.container.cell_mut(node)
    }

    fn neighbor(&self, coord: GridCoord, side: CellType) -> Option<NodeId> {
        coord.step(side).and_then(|next| self.node_at(next))
    }

    /// Wires every node to its +x and +y neighbors and records both diagonals as corners.
    pub fn connect_all(&mut self) {
        for y in 0..self.height {
            for x in 0..self.width {
                let here = NodeId::from(self.index(GridCoord::new(x, y)));
                let x_next = x + 1 < self.width;
                let y_next = y + 1 < self.height;

                if x_next {
                    self.container.connect(here, NodeId::from(self.index(GridCoord::new(x + 1, y))));
                }
                if y_next {
                    self.container.connect(here, NodeId::from(self.index(GridCoord::new(x, y + 1))));
                }
                if x_next && y_next {
                    self.container.corner(here, NodeId::from(self.index(GridCoord::new(x + 1, y + 1))));
                }
                if x_next && y > 0 {
                    self.container.corner(here, NodeId::from(self.index(GridCoord::new(x + 1, y - 1))));
                }
            }
        }
    }

    /// Sides whose neighbor is still connected, plus external seams.
    pub fn determine_type(&self, coord: GridCoord) -> CellType {
        let Some(cell) = self.cell_at(coord) else {
            return CellType::NONE;
        };
        let mut cell_type = cell.external_connections();
        for side in SIDE_ORDER {
            if self.neighbor(coord, side).is_some_and(|other| cell.is_connected(other)) {
                cell_type |= side;
            }
        }
        cell_type
    }

    /// Sides that face off the grid.
    fn border_sides(&self, coord: GridCoord) -> CellType {
        let mut sides = CellType::NONE;
        for side in SIDE_ORDER {
            if coord.step(side).is_none_or(|next| !self.test_coord(next)) {
                sides |= side;
            }
        }
        sides
    }

    pub fn reservable_cell(&self, coord: GridCoord, shape: ShapeId) -> bool {
        let Some(shape) = self.library.get(shape) else {
            return false;
        };
        self.reservable_normal_cell(coord, effective_type(shape))
    }

    fn reservable_normal_cell(&self, coord: GridCoord, cell_type: CellType) -> bool {
        let Some(node) = self.node_at(coord) else {
            return false;
        };
        let Some(cell) = self.container.cell(node) else {
            return false;
        };
        if cell.is_placed() {
            return false;
        }

        let determined = self.determine_type(coord);
        let external = cell.external_connections();
        if !cell_type.contains(external) {
            return false;
        }
        let allowed = external | determined | (self.border_sides(coord) & !external);
        if !allowed.contains(cell_type) {
            return false;
        }
        if !SIDE_ORDER
            .iter()
            .all(|&side| self.test_type_connection(coord, cell, determined, cell_type, side))
        {
            return false;
        }

        let open = cell_type & !external;
        let closed_edges: Vec<Edge> = SIDE_ORDER
            .iter()
            .filter(|&&side| !open.contains(side))
            .filter_map(|&side| self.neighbor(coord, side).map(|other| Edge(node, other)))
            .collect();
        !ConnectivityTest::new().test_connections_required(&self.container, node, &closed_edges)
    }

    fn test_type_connection(
        &self,
        coord: GridCoord,
        cell: &GenCell,
        determined: CellType,
        cell_type: CellType,
        side: CellType,
    ) -> bool {
        let external = cell.external_connections();
        if !cell_type.contains(external) {
            return false;
        }
        if external.intersects(side) {
            return true;
        }
        if !determined.intersects(side) {
            return true;
        }
        let Some(other) = self.neighbor(coord, side) else {
            return false;
        };
        if cell_type.intersects(side) {
            cell.is_connected(other)
        } else {
            !(cell.is_connected(other) && self.container.cell(other).is_some_and(GenCell::is_placed))
        }
    }

    pub fn reserve_cell(
        &mut self,
        coord: GridCoord,
        shape_id: ShapeId,
        role: CellRole,
    ) -> Result<NodeId, ReserveError> {
        if !self.reservable_cell(coord, shape_id) {
            return Err(ReserveError::NotReservable { coord });
        }
        let cell_type = self.library.get(shape_id).map(effective_type).unwrap_or_default();
        if cell_type.is_empty() {
            return Err(ReserveError::UntypedShape { coord });
        }
        let node = self.modify_normal_cell(coord, cell_type)?;

        let library = Arc::clone(&self.library);
        if let Some(cell) = self.container.cell_mut(node) {
            cell.set_cell_ref(Some(shape_id), &library);
        }
        if role != CellRole::None {
            self.container.add_start_or_destination_cell(node, role);
        }
        Ok(node)
    }

    /// Cuts the edges of every side `cell_type` leaves closed, then checks the
    /// node still reaches the whole grid.
    pub fn modify_normal_cell(&mut self, coord: GridCoord, cell_type: CellType) -> Result<NodeId, ReserveError> {
        let Some(node) = self.node_at(coord) else {
            return Err(ReserveError::NotReservable { coord });
        };
        for side in SIDE_ORDER {
            if cell_type.intersects(side) {
                continue;
            }
            if let Some(other) = self.neighbor(coord, side)
                && self.container.share_connection(node, other)
            {
                self.container.disconnect(node, other);
            }
        }

        if self.container.num_cells() > 1 && !ConnectivityTest::new().test_cell_connected(&self.container, node) {
            self.container
                .diagnostics()
                .error(IssueKind::IntegrityViolation, format!("x: {} y: {}", coord.x, coord.y));
            return Err(ReserveError::IntegrityViolation { coord });
        }
        Ok(node)
    }

    pub fn destroyable_cell_at(&self, coord: GridCoord) -> bool {
        self.node_at(coord).is_some_and(|node| self.container.destroyable_cell(node))
    }

    pub fn destroy_cell_at(&mut self, coord: GridCoord) -> bool {
        self.verify_coord(coord) && self.container.destroy_cell(self.index(coord))
    }

    /// Breadth-first depths from the first start node; flags the shortest path
    /// back from the first destination and returns its depth, or `i32::MAX`.
    pub fn determine_cell_depths_and_shortest_path(&mut self) -> i32 {
        let Some(&start) = self.container.start_cells().first() else {
            return i32::MAX;
        };
        for cell in self.container.cells_mut() {
            cell.clear_depth_values();
        }
        let Some(start_cell) = self.container.cell_mut(start) else {
            return i32::MAX;
        };
        start_cell.set_depth_values(0, None);

        let mut depth = 0;
        while self.run_depth(depth) {
            depth += 1;
        }

        let Some(&destination) = self.container.destination_cells().first() else {
            return i32::MAX;
        };
        let destination_depth = self.container.cell(destination).map_or(i32::MAX, GenCell::depth);
        if destination_depth == i32::MAX {
            return i32::MAX;
        }

        let mut path = Some(destination);
        while let Some(node) = path {
            let Some(cell) = self.container.cell_mut(node) else {
                break;
            };
            cell.part_of_shortest_path = true;
            path = cell.prev();
        }
        destination_depth
    }

    /// Relaxes the neighbors of every node at `depth`; false once nothing changed.
    pub fn run_depth(&mut self, depth: i32) -> bool {
        if depth == i32::MAX {
            return false;
        }
        let layer: Vec<(NodeId, Vec<NodeId>)> = self
            .container
            .cells()
            .filter(|(_, cell)| cell.depth() == depth)
            .map(|(node, cell)| (node, cell.connections().to_vec()))
            .collect();

        let mut relaxed = false;
        for (node, connections) in layer {
            for other in connections {
                if let Some(cell) = self.container.cell_mut(other) {
                    relaxed |= cell.set_depth_values(depth + 1, Some(node));
                }
            }
            if let Some(cell) = self.container.cell_mut(node) {
                cell.visited = true;
            }
        }
        relaxed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::CellShape;
    use crate::types::{ConnectPosition, Filler, Walls};
    use proptest::prelude::*;

    fn shape(name: &str, cell_type: CellType) -> CellShape {
        CellShape {
            name: name.into(),
            cell_type,
            walls: Walls::NONE,
            filler_edges: Filler::NONE,
            width: 64.0,
            length: 64.0,
            height: 0.0,
            playable_area: 1.0,
            markers: Vec::new(),
        }
    }

    fn grid_with(width: i32, height: i32, dead_end_max: i32, shapes: Vec<CellShape>) -> (GridContainer, Vec<ShapeId>) {
        let mut library = ShapeLibrary::new();
        let ids: Vec<ShapeId> = shapes.into_iter().map(|shape| library.insert(shape)).collect();
        let mut catalog = CellCatalog::new(Arc::new(library), Diagnostics::quiet("t"));
        catalog.load_cell_set(&ids, 1, false);
        let mut grid = GridContainer::new(width, height, &catalog, dead_end_max, Diagnostics::quiet("t"));
        grid.connect_all();
        (grid, ids)
    }

    #[test]
    fn connect_all_wires_orthogonal_edges_and_diagonal_corners() {
        let (grid, _) = grid_with(3, 3, 0, Vec::new());
        let center = grid.cell_at(GridCoord::new(1, 1)).expect("center");
        assert_eq!(center.connections().len(), 4);
        assert_eq!(center.corners().len(), 4);

        let origin = grid.cell_at(GridCoord::new(0, 0)).expect("origin");
        assert_eq!(origin.connections().len(), 2);
        assert_eq!(origin.corners(), [NodeId::from(grid.index(GridCoord::new(1, 1)))]);
        assert_eq!(grid.determine_type(GridCoord::new(0, 0)), CellType::N | CellType::E);
        assert_eq!(grid.determine_type(GridCoord::new(2, 2)), CellType::S | CellType::W);
    }

    #[test]
    fn coordinates_map_row_major() {
        let (grid, _) = grid_with(4, 2, 0, Vec::new());
        assert_eq!(grid.index(GridCoord::new(3, 1)), 7);
        assert_eq!(grid.coord_of(NodeId(6)), GridCoord::new(2, 1));
        assert!(grid.verify_coord(GridCoord::new(3, 1)));
        assert!(!grid.verify_coord(GridCoord::new(4, 0)));
        assert!(!grid.test_coord(GridCoord::new(0, -1)));
    }

    #[test]
    fn reserving_a_dead_end_cuts_the_other_edges() {
        let (mut grid, ids) = grid_with(3, 3, 0, vec![shape("dead end", CellType::N)]);
        let coord = GridCoord::new(1, 0);
        assert!(grid.reservable_cell(coord, ids[0]));
        let node = grid.reserve_cell(coord, ids[0], CellRole::Start).expect("reserve");

        assert_eq!(grid.determine_type(coord), CellType::N);
        assert_eq!(grid.container().start_cells(), [node]);
        let cell = grid.cell_at(coord).expect("cell");
        assert_eq!(cell.cell_ref(), Some(ids[0]));
        assert_eq!(cell.prevent_walls(), Walls::ALL);
        assert!(!grid.reservable_cell(coord, ids[0]));
    }

    #[test]
    fn shape_opening_toward_a_cut_edge_is_rejected() {
        let (mut grid, ids) = grid_with(3, 1, 0, vec![shape("through", CellType::N | CellType::S)]);
        let middle = GridCoord::new(1, 0);
        let (a, b) = (grid.node_at(middle).expect("a"), grid.node_at(GridCoord::new(2, 0)).expect("b"));
        grid.container_mut().disconnect(a, b);
        assert!(!grid.reservable_cell(middle, ids[0]));
    }

    #[test]
    fn closing_a_bridge_is_rejected() {
        let (grid, ids) = grid_with(3, 1, 0, vec![shape("cap", CellType::S)]);
        assert!(!grid.reservable_cell(GridCoord::new(1, 0), ids[0]));
        assert!(grid.reservable_cell(GridCoord::new(2, 0), ids[0]));
    }

    #[test]
    fn single_cell_grid_accepts_any_open_shape() {
        let (mut grid, ids) = grid_with(1, 1, 0, vec![shape("room", CellType::NESW)]);
        assert!(grid.reserve_cell(GridCoord::new(0, 0), ids[0], CellRole::None).is_ok());
    }

    #[test]
    fn depth_pass_without_endpoints_reports_unreachable() {
        let (mut grid, _) = grid_with(2, 2, 0, Vec::new());
        assert_eq!(grid.determine_cell_depths_and_shortest_path(), i32::MAX);

        let start = grid.node_at(GridCoord::new(0, 0)).expect("start");
        grid.container_mut().add_start_or_destination_cell(start, CellRole::Start);
        assert_eq!(grid.determine_cell_depths_and_shortest_path(), i32::MAX);
        assert!(grid.container().cells().all(|(_, cell)| cell.visited));
    }

    #[test]
    fn depths_match_grid_distance_and_path_descends() {
        let (mut grid, _) = grid_with(4, 3, 0, Vec::new());
        let start = GridCoord::new(1, 1);
        let destination = GridCoord::new(3, 0);
        let (s, d) = (grid.node_at(start).expect("s"), grid.node_at(destination).expect("d"));
        grid.container_mut().add_start_or_destination_cell(s, CellRole::Start);
        grid.container_mut().add_start_or_destination_cell(d, CellRole::Destination);

        assert_eq!(grid.determine_cell_depths_and_shortest_path(), 3);
        for (node, cell) in grid.container().cells() {
            let coord = grid.coord_of(node);
            let distance = (coord.x - start.x).abs() + (coord.y - start.y).abs();
            assert_eq!(cell.depth(), distance);
        }

        let mut current = Some(d);
        let mut last_depth = i32::MAX;
        let mut steps = 0;
        while let Some(node) = current {
            let cell = grid.container().cell(node).expect("path node");
            assert!(cell.part_of_shortest_path);
            assert!(cell.depth() < last_depth);
            last_depth = cell.depth();
            current = cell.prev();
            steps += 1;
        }
        assert_eq!(last_depth, 0);
        assert_eq!(steps, 4);
    }

    #[test]
    fn seamed_side_must_stay_open() {
        let (mut grid, ids) =
            grid_with(2, 2, 0, vec![shape("n", CellType::N), shape("new", CellType::N | CellType::E | CellType::W)]);
        let coord = GridCoord::new(0, 0);
        let diagnostics = Diagnostics::quiet("t");
        grid.cell_at_mut(coord)
            .expect("cell")
            .set_external_connection(CellType::W, None, ConnectPosition::One, &diagnostics);

        assert!(!grid.reservable_cell(coord, ids[0]));
        assert!(grid.reservable_cell(coord, ids[1]));
    }

    proptest! {
        #[test]
        fn shapes_missing_an_external_side_are_never_reservable(external in 1u16..16, shape_bits in 1u16..16) {
            let external = CellType::from_bits_truncate(external);
            let cell_type = CellType::from_bits_truncate(shape_bits);
            prop_assume!(!cell_type.contains(external));

            let (mut grid, ids) = grid_with(3, 3, 0, vec![shape("candidate", cell_type)]);
            let diagnostics = Diagnostics::quiet("t");
            for x in 0..3 {
                for y in 0..3 {
                    let coord = GridCoord::new(x, y);
                    if let Some(cell) = grid.cell_at_mut(coord) {
                        for side in CellType::CARDINALS {
                            if external.contains(side) {
                                cell.set_external_connection(side, None, ConnectPosition::One, &diagnostics);
                            }
                        }
                    }
                }
            }

            for x in 0..3 {
                for y in 0..3 {
                    prop_assert!(!grid.reservable_cell(GridCoord::new(x, y), ids[0]));
                }
            }
        }
    }
}
