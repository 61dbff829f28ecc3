//! Read-only cell shape records supplied by the authoring pipeline.
//!
//! Shapes are stored in a [`ShapeLibrary`] arena and addressed by stable
//! [`ShapeId`] keys, so graph nodes can refer to a placed shape without
//! borrowing the library.

use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use slotmap::{SlotMap, new_key_type};

use crate::types::{CellType, Filler, Vec3, Walls};

new_key_type! {
    pub struct ShapeId;
}

/// A portal to another area embedded in a shape's marker set.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AreaTransition {
    pub position: Vec3,
    pub rotation: Vec3,
    pub target: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Marker {
    AreaTransition { position: Vec3, rotation: Vec3, target: String },
    Connector { position: Vec3 },
    /// Markers the generator does not interpret (props, spawn points).
    Other { position: Vec3 },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CellShape {
    pub name: String,
    /// Declared open sides; `CellType::NONE` means "derive from walls".
    #[serde(default)]
    pub cell_type: CellType,
    pub walls: Walls,
    #[serde(default)]
    pub filler_edges: Filler,
    pub width: f32,
    pub length: f32,
    #[serde(default)]
    pub height: f32,
    pub playable_area: f32,
    #[serde(default)]
    pub markers: Vec<Marker>,
}

impl CellShape {
    pub fn area_transitions(&self) -> Vec<AreaTransition> {
        self.markers
            .iter()
            .filter_map(|marker| match marker {
                Marker::AreaTransition { position, rotation, target } => Some(AreaTransition {
                    position: *position,
                    rotation: *rotation,
                    target: target.clone(),
                }),
                _ => None,
            })
            .collect()
    }
}

#[derive(Debug)]
pub enum ShapeLoadError {
    Io(io::Error),
    Parse(serde_json::Error),
    DuplicateName(String),
}

impl fmt::Display for ShapeLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "failed to read shape palette: {err}"),
            Self::Parse(err) => write!(f, "invalid shape palette: {err}"),
            Self::DuplicateName(name) => write!(f, "shape `{name}` is defined twice"),
        }
    }
}

impl std::error::Error for ShapeLoadError {}

impl From<io::Error> for ShapeLoadError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<serde_json::Error> for ShapeLoadError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err)
    }
}

#[derive(Clone, Debug, Default)]
pub struct ShapeLibrary {
    shapes: SlotMap<ShapeId, CellShape>,
}

impl ShapeLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, shape: CellShape) -> ShapeId {
        self.shapes.insert(shape)
    }

    pub fn get(&self, id: ShapeId) -> Option<&CellShape> {
        self.shapes.get(id)
    }

    pub fn find_by_name(&self, name: &str) -> Option<ShapeId> {
        self.shapes.iter().find(|(_, shape)| shape.name == name).map(|(id, _)| id)
    }

    /// Shapes in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (ShapeId, &CellShape)> {
        self.shapes.iter()
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    pub fn from_json_str(json: &str) -> Result<Self, ShapeLoadError> {
        let shapes: Vec<CellShape> = serde_json::from_str(json)?;
        let mut library = Self::new();
        for shape in shapes {
            if library.find_by_name(&shape.name).is_some() {
                return Err(ShapeLoadError::DuplicateName(shape.name));
            }
            library.insert(shape);
        }
        Ok(library)
    }

    pub fn load(path: &Path) -> Result<Self, ShapeLoadError> {
        let content = fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const PALETTE: &str = r#"[
        { "name": "hub", "cell_type": 15, "walls": 170, "width": 2048.0, "length": 2048.0,
          "playable_area": 100.0,
          "markers": [ { "kind": "connector", "position": { "x": 1024.0, "y": 0.0, "z": 0.0 } } ] },
        { "name": "rock", "walls": 511, "filler_edges": 4, "width": 2048.0, "length": 2048.0,
          "playable_area": 0.0 }
    ]"#;

    #[test]
    fn palette_json_loads_in_declaration_order() {
        let library = ShapeLibrary::from_json_str(PALETTE).expect("palette");
        let names: Vec<&str> = library.iter().map(|(_, shape)| shape.name.as_str()).collect();
        assert_eq!(names, ["hub", "rock"]);

        let rock = library.find_by_name("rock").and_then(|id| library.get(id)).expect("rock");
        assert_eq!(rock.cell_type, CellType::NONE);
        assert_eq!(rock.filler_edges, Filler::E);
        assert!(rock.markers.is_empty());
    }

    #[test]
    fn duplicate_shape_names_are_rejected() {
        let json = r#"[
            { "name": "a", "walls": 0, "width": 1.0, "length": 1.0, "playable_area": 1.0 },
            { "name": "a", "walls": 0, "width": 1.0, "length": 1.0, "playable_area": 1.0 }
        ]"#;
        assert!(matches!(
            ShapeLibrary::from_json_str(json),
            Err(ShapeLoadError::DuplicateName(name)) if name == "a"
        ));
    }

    #[test]
    fn palette_file_load_matches_in_memory_parse() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("palette.json");
        fs::write(&path, PALETTE).expect("write");

        let loaded = ShapeLibrary::load(&path).expect("load");
        assert_eq!(loaded.len(), 2);
        assert!(matches!(
            ShapeLibrary::load(&dir.path().join("missing.json")),
            Err(ShapeLoadError::Io(_))
        ));
    }
}
