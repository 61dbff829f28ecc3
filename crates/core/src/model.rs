//! Public data model for finished region layouts.

use serde::{Deserialize, Serialize};
use xxhash_rust::xxh3::xxh3_64;

use crate::shape::AreaTransition;
use crate::types::{CellType, Filler, GridCoord, Vec3};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlacedCell {
    pub id: u32,
    pub coord: GridCoord,
    pub position: Vec3,
    pub shape: String,
    pub cell_type: CellType,
    pub seed: u32,
    pub connected_cells: Vec<u32>,
    pub depth: Option<i32>,
    pub on_shortest_path: bool,
    pub population_theme: Option<String>,
    pub area_transitions: Vec<AreaTransition>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FillerPlacement {
    pub id: u32,
    pub coord: GridCoord,
    pub position: Vec3,
    pub shape: String,
    pub filler: Filler,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeneratedLayout {
    pub width: i32,
    pub height: i32,
    pub cell_size: f32,
    pub attempt: u32,
    /// Sorted by id.
    pub cells: Vec<PlacedCell>,
    pub fillers: Vec<FillerPlacement>,
    pub shortest_path_depth: Option<i32>,
}

fn push_str(bytes: &mut Vec<u8>, value: &str) {
    bytes.extend((value.len() as u32).to_le_bytes());
    bytes.extend(value.as_bytes());
}

fn push_vec3(bytes: &mut Vec<u8>, value: Vec3) {
    bytes.extend(value.x.to_le_bytes());
    bytes.extend(value.y.to_le_bytes());
    bytes.extend(value.z.to_le_bytes());
}

fn push_coord(bytes: &mut Vec<u8>, coord: GridCoord) {
    bytes.extend(coord.x.to_le_bytes());
    bytes.extend(coord.y.to_le_bytes());
}

impl GeneratedLayout {
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend(self.width.to_le_bytes());
        bytes.extend(self.height.to_le_bytes());
        bytes.extend(self.cell_size.to_le_bytes());
        bytes.extend(self.shortest_path_depth.unwrap_or(-1).to_le_bytes());

        bytes.extend((self.cells.len() as u32).to_le_bytes());
        for cell in &self.cells {
            bytes.extend(cell.id.to_le_bytes());
            push_coord(&mut bytes, cell.coord);
            push_vec3(&mut bytes, cell.position);
            push_str(&mut bytes, &cell.shape);
            bytes.extend(cell.cell_type.bits().to_le_bytes());
            bytes.extend(cell.seed.to_le_bytes());
            bytes.extend((cell.connected_cells.len() as u32).to_le_bytes());
            for id in &cell.connected_cells {
                bytes.extend(id.to_le_bytes());
            }
            bytes.extend(cell.depth.unwrap_or(-1).to_le_bytes());
            bytes.push(u8::from(cell.on_shortest_path));
            push_str(&mut bytes, cell.population_theme.as_deref().unwrap_or_default());
            bytes.extend((cell.area_transitions.len() as u32).to_le_bytes());
            for transition in &cell.area_transitions {
                push_vec3(&mut bytes, transition.position);
                push_str(&mut bytes, &transition.target);
            }
        }

        bytes.extend((self.fillers.len() as u32).to_le_bytes());
        for filler in &self.fillers {
            bytes.extend(filler.id.to_le_bytes());
            push_coord(&mut bytes, filler.coord);
            push_str(&mut bytes, &filler.shape);
            bytes.extend(filler.filler.bits().to_le_bytes());
        }

        bytes
    }

    pub fn fingerprint(&self) -> u64 {
        xxh3_64(&self.canonical_bytes())
    }

    pub fn cell_at(&self, coord: GridCoord) -> Option<&PlacedCell> {
        self.cells.iter().find(|cell| cell.coord == coord)
    }

    pub fn filler_at(&self, coord: GridCoord) -> Option<&FillerPlacement> {
        self.fillers.iter().find(|filler| filler.coord == coord)
    }

    pub fn shortest_path(&self) -> impl Iterator<Item = &PlacedCell> {
        self.cells.iter().filter(|cell| cell.on_shortest_path)
    }
}
