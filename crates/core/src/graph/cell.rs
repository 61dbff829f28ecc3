//! One placement slot of the generation graph.

use serde::{Deserialize, Serialize};

use crate::catalog::CellCatalog;
use crate::diagnostics::{Diagnostics, IssueKind};
use crate::shape::{ShapeId, ShapeLibrary};
use crate::types::{CellType, ConnectPosition, Vec3, Walls};

/// Slot index of a node inside its container.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl From<usize> for NodeId {
    fn from(index: usize) -> Self {
        Self(index as u32)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct GenCell {
    pub id: u32,
    pub position: Vec3,
    pub population_theme_override: Option<String>,
    pub part_of_shortest_path: bool,
    pub visited: bool,
    cell_ref: Option<ShapeId>,
    external_connections: CellType,
    required_walls: Walls,
    prevent_walls: Walls,
    depth: i32,
    prev: Option<NodeId>,
    connected_areas: [Option<String>; 4],
    pub(crate) connections: Vec<NodeId>,
    pub(crate) corners: Vec<NodeId>,
}

impl Default for GenCell {
    fn default() -> Self {
        Self::new(0, Vec3::ZERO, None)
    }
}

fn side_slot(side: CellType) -> Option<usize> {
    match side {
        CellType::N => Some(0),
        CellType::E => Some(1),
        CellType::S => Some(2),
        CellType::W => Some(3),
        _ => None,
    }
}

/// Walls that must stay open when a node joins an external area on `side`,
/// plus the corner walls opened by the begin and end seam positions.
fn seam_masks(side: CellType) -> Option<(Walls, Walls, Walls)> {
    match side {
        CellType::N => Some((
            Walls::W | Walls::SW | Walls::S | Walls::SE | Walls::E | Walls::N,
            Walls::NE,
            Walls::NW,
        )),
        CellType::E => Some((
            Walls::NW | Walls::W | Walls::SW | Walls::S | Walls::E | Walls::N,
            Walls::NE,
            Walls::SE,
        )),
        CellType::S => Some((
            Walls::NW | Walls::W | Walls::S | Walls::E | Walls::NE | Walls::N,
            Walls::SE,
            Walls::SW,
        )),
        CellType::W => Some((
            Walls::W | Walls::S | Walls::SE | Walls::E | Walls::NE | Walls::N,
            Walls::NW,
            Walls::SW,
        )),
        _ => None,
    }
}

impl GenCell {
    pub fn new(id: u32, position: Vec3, cell_ref: Option<ShapeId>) -> Self {
        Self {
            id,
            position,
            population_theme_override: None,
            part_of_shortest_path: false,
            visited: false,
            cell_ref,
            external_connections: CellType::NONE,
            required_walls: Walls::NONE,
            prevent_walls: Walls::NONE,
            depth: i32::MAX,
            prev: None,
            connected_areas: Default::default(),
            connections: Vec::new(),
            corners: Vec::new(),
        }
    }

    pub fn cell_ref(&self) -> Option<ShapeId> {
        self.cell_ref
    }

    pub fn is_placed(&self) -> bool {
        self.cell_ref.is_some()
    }

    pub fn external_connections(&self) -> CellType {
        self.external_connections
    }

    pub fn required_walls(&self) -> Walls {
        self.required_walls
    }

    pub fn prevent_walls(&self) -> Walls {
        self.prevent_walls
    }

    pub fn depth(&self) -> i32 {
        self.depth
    }

    pub fn prev(&self) -> Option<NodeId> {
        self.prev
    }

    pub fn connections(&self) -> &[NodeId] {
        &self.connections
    }

    pub fn corners(&self) -> &[NodeId] {
        &self.corners
    }

    pub fn connected_area(&self, side: CellType) -> Option<&str> {
        side_slot(side).and_then(|slot| self.connected_areas[slot].as_deref())
    }

    /// Marks `side` as joined to another area and opens the seam walls.
    pub fn set_external_connection(
        &mut self,
        side: CellType,
        connected_area: Option<String>,
        position: ConnectPosition,
        diagnostics: &Diagnostics,
    ) -> bool {
        let (Some(slot), Some((prevent, begin_corner, end_corner))) = (side_slot(side), seam_masks(side))
        else {
            diagnostics.error(
                IssueKind::InvalidDirection,
                format!("external connection requires a cardinal side, got {side:?}"),
            );
            return false;
        };

        self.external_connections |= side;
        self.connected_areas[slot] = connected_area;
        self.required_walls.remove(Walls::for_side(side));
        self.prevent_walls = prevent;

        if matches!(position, ConnectPosition::Begin | ConnectPosition::Inside) {
            self.required_walls.remove(begin_corner);
            self.prevent_walls.insert(begin_corner);
        }
        if matches!(position, ConnectPosition::End | ConnectPosition::Inside) {
            self.required_walls.remove(end_corner);
            self.prevent_walls.insert(end_corner);
        }
        self.required_walls &= !self.prevent_walls;
        true
    }

    pub fn is_connected(&self, other: NodeId) -> bool {
        self.connections.contains(&other)
    }

    pub fn is_corner(&self, other: NodeId) -> bool {
        self.corners.contains(&other)
    }

    pub(crate) fn connect_to(&mut self, other: NodeId) {
        if !self.is_connected(other) {
            self.connections.push(other);
        }
    }

    pub(crate) fn corner_to(&mut self, other: NodeId) {
        if !self.is_corner(other) {
            self.corners.push(other);
        }
    }

    pub(crate) fn disconnect_from(&mut self, other: NodeId) {
        self.connections.retain(|&id| id != other);
    }

    pub(crate) fn uncorner_from(&mut self, other: NodeId) {
        self.corners.retain(|&id| id != other);
    }

    /// Records a shorter BFS distance; returns whether the values changed.
    pub fn set_depth_values(&mut self, depth: i32, prev: Option<NodeId>) -> bool {
        if depth < self.depth {
            self.depth = depth;
            self.prev = prev;
            return true;
        }
        false
    }

    pub fn clear_depth_values(&mut self) {
        self.visited = false;
        self.part_of_shortest_path = false;
        self.depth = i32::MAX;
        self.prev = None;
    }

    /// Assigns the placed shape; its walls become both required and the
    /// complement prevented.
    pub fn set_cell_ref(&mut self, cell_ref: Option<ShapeId>, library: &ShapeLibrary) {
        if let Some(shape) = cell_ref.and_then(|id| library.get(id)) {
            self.required_walls = shape.walls;
            self.prevent_walls = !shape.walls;
        }
        self.cell_ref = cell_ref;
    }

    pub fn mask_required_walls(&mut self, walls: Walls) -> Walls {
        self.required_walls |= walls & !self.prevent_walls;
        self.required_walls
    }

    pub fn check_wall_mask(&self, walls: Walls, catalog: Option<&CellCatalog>) -> bool {
        if self.prevent_walls.intersects(walls) {
            return false;
        }
        catalog.is_none_or(|catalog| catalog.has_cell_with_walls(self.required_walls | walls))
    }
}
