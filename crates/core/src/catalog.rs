//! Weighted shape catalog indexed by open sides, wall configuration, and filler edges.
//!
//! Picks relax in four phases so a thin palette degrades to repeats instead
//! of failing outright:
//!
//! 1. skip excluded shapes, skip anything already picked;
//! 2. skip excluded shapes, allow repeats of non-unique shapes;
//! 3. skip excluded shapes, allow repeats of unique shapes;
//! 4. ignore the exclude list.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::diagnostics::{Diagnostics, IssueKind};
use crate::random::{GenRandom, Picker};
use crate::shape::{AreaTransition, CellShape, Marker, ShapeId, ShapeLibrary};
use crate::types::{CellType, Filler, Vec3, Walls, type_from_walls};

/// Tolerance when comparing a shape's width against its length.
pub const SQUARE_EPSILON: f32 = 0.000_001;
/// Squared distance under which two connector markers count as the same seam point.
pub const CONNECTOR_EPSILON_SQ: f32 = 64.0;
/// Minimum alignment between a connector's direction and a cardinal axis.
pub const CONNECTOR_DIRECTION_DOT: f32 = 0.75;

#[derive(Clone, Debug, PartialEq)]
pub struct CatalogEntry {
    pub shape: ShapeId,
    pub weight: u32,
    pub unique: bool,
    pub picked: bool,
    pub area_transitions: Vec<AreaTransition>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CellBounds {
    pub width: f32,
    pub length: f32,
    pub height: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PickPhase {
    Strict,
    AllowPicked,
    AllowUnique,
    IgnoreExcluded,
}

impl PickPhase {
    const ALL: [Self; 4] = [Self::Strict, Self::AllowPicked, Self::AllowUnique, Self::IgnoreExcluded];

    fn admits(self, entry: &CatalogEntry, excluded: &[ShapeId]) -> bool {
        if self != Self::IgnoreExcluded && excluded.contains(&entry.shape) {
            return false;
        }
        match self {
            Self::Strict => !entry.picked,
            Self::AllowPicked => !(entry.unique && entry.picked),
            Self::AllowUnique | Self::IgnoreExcluded => true,
        }
    }
}

/// Open sides a shape is bucketed and reserved under.
pub fn effective_type(shape: &CellShape) -> CellType {
    if shape.cell_type.cardinal_bits().is_empty() {
        type_from_walls(shape.walls).cardinal_bits()
    } else {
        shape.cell_type.cardinal_bits()
    }
}

/// Classifies a connector marker position to the cardinal side it sits on.
pub fn connector_side(position: Vec3) -> Option<CellType> {
    let direction = position.normalize_2d();
    let north_dot = direction.dot(Vec3::new(1.0, 0.0, 0.0));
    let east_dot = direction.dot(Vec3::new(0.0, 1.0, 0.0));

    if north_dot >= CONNECTOR_DIRECTION_DOT {
        Some(CellType::N)
    } else if north_dot <= -CONNECTOR_DIRECTION_DOT {
        Some(CellType::S)
    } else if east_dot >= CONNECTOR_DIRECTION_DOT {
        Some(CellType::E)
    } else if east_dot <= -CONNECTOR_DIRECTION_DOT {
        Some(CellType::W)
    } else {
        None
    }
}

#[derive(Clone, Debug)]
pub struct CellCatalog {
    library: Arc<ShapeLibrary>,
    diagnostics: Diagnostics,
    suppress_missing_cell_errors: bool,
    entries: Vec<CatalogEntry>,
    by_type: BTreeMap<CellType, Vec<usize>>,
    by_filler: BTreeMap<Filler, Vec<usize>>,
    by_walls: BTreeMap<Walls, Vec<usize>>,
    connections_by_type: BTreeMap<CellType, Vec3>,
    cell_bounds: Option<CellBounds>,
}

impl CellCatalog {
    pub fn new(library: Arc<ShapeLibrary>, diagnostics: Diagnostics) -> Self {
        let connections_by_type = CellType::CARDINALS.iter().map(|&side| (side, Vec3::ZERO)).collect();
        Self {
            library,
            diagnostics,
            suppress_missing_cell_errors: false,
            entries: Vec::new(),
            by_type: BTreeMap::new(),
            by_filler: BTreeMap::new(),
            by_walls: BTreeMap::new(),
            connections_by_type,
            cell_bounds: None,
        }
    }

    pub fn suppress_missing_cell_errors(mut self, suppress: bool) -> Self {
        self.suppress_missing_cell_errors = suppress;
        self
    }

    pub fn library(&self) -> &Arc<ShapeLibrary> {
        &self.library
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Routes further issues to a different sink, e.g. a per-attempt one.
    pub fn set_diagnostics(&mut self, diagnostics: Diagnostics) {
        self.diagnostics = diagnostics;
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn entry(&self, shape: ShapeId) -> Option<&CatalogEntry> {
        self.entries.iter().find(|entry| entry.shape == shape)
    }

    /// Registers every shape of a cell set with one weight and uniqueness setting.
    pub fn load_cell_set(&mut self, shapes: &[ShapeId], weight: i32, unique: bool) -> usize {
        if weight <= 0 {
            return 0;
        }
        shapes.iter().filter(|&&shape| self.register(shape, weight, unique)).count()
    }

    pub fn register(&mut self, shape_id: ShapeId, weight: i32, unique: bool) -> bool {
        let Ok(weight) = u32::try_from(weight) else {
            return false;
        };
        if weight == 0 {
            return false;
        }
        let library = Arc::clone(&self.library);
        let Some(shape) = library.get(shape_id) else {
            return false;
        };

        if (shape.length - shape.width).abs() > SQUARE_EPSILON {
            self.diagnostics.error(
                IssueKind::NonSquareCell,
                format!(
                    "grid generation requires square cells: {} (length {}, width {})",
                    shape.name, shape.length, shape.width
                ),
            );
            return false;
        }

        let filler = shape.walls == Walls::ALL && shape.playable_area <= 0.0;
        let index = self.entries.len();
        self.entries.push(CatalogEntry {
            shape: shape_id,
            weight,
            unique,
            picked: false,
            area_transitions: shape.area_transitions(),
        });

        if filler {
            self.by_filler.entry(shape.filler_edges).or_default().push(index);
        } else {
            self.by_type.entry(effective_type(shape)).or_default().push(index);
        }
        self.by_walls.entry(shape.walls).or_default().push(index);
        self.cell_bounds =
            Some(CellBounds { width: shape.width, length: shape.length, height: shape.height });

        for marker in &shape.markers {
            if let Marker::Connector { position } = marker
                && let Some(side) = connector_side(*position)
            {
                self.add_connection_entry(side, *position, &shape.name);
            }
        }

        true
    }

    fn add_connection_entry(&mut self, side: CellType, position: Vec3, shape_name: &str) -> bool {
        let Some(recorded) = self.connections_by_type.get_mut(&side) else {
            return false;
        };
        if *recorded == Vec3::ZERO || position.epsilon_sphere_test(*recorded, CONNECTOR_EPSILON_SQ) {
            *recorded = position;
            return true;
        }
        self.diagnostics.error(
            IssueKind::DuplicateConnector,
            format!(
                "cell set contains more than one edge connection of type {side:?}: {position:?} vs {:?} (adding {shape_name})",
                *recorded
            ),
        );
        false
    }

    pub fn pick_by_type(
        &mut self,
        rng: &mut impl GenRandom,
        cell_type: CellType,
        excluded: Option<&[ShapeId]>,
    ) -> Option<ShapeId> {
        let bucket = self.by_type.get(&cell_type)?.clone();
        self.pick_from(rng, &bucket, excluded, Some(&format!("type {cell_type:?}")))
    }

    pub fn pick_by_walls(
        &mut self,
        rng: &mut impl GenRandom,
        walls: Walls,
        excluded: Option<&[ShapeId]>,
    ) -> Option<ShapeId> {
        let bucket = self.by_walls.get(&walls)?.clone();
        self.pick_from(rng, &bucket, excluded, Some(&format!("walls {walls:?}")))
    }

    pub fn pick_by_filler(&mut self, rng: &mut impl GenRandom, filler: Filler) -> Option<ShapeId> {
        let bucket = self.by_filler.get(&filler)?.clone();
        self.pick_from(rng, &bucket, None, None)
    }

    fn pick_from(
        &mut self,
        rng: &mut impl GenRandom,
        bucket: &[usize],
        excluded: Option<&[ShapeId]>,
        thin_label: Option<&str>,
    ) -> Option<ShapeId> {
        if bucket.is_empty() {
            return None;
        }

        let mut picker = Picker::new();
        for phase in PickPhase::ALL {
            // An absent list has nothing to drop; an empty one still runs the last phase.
            if phase == PickPhase::IgnoreExcluded && excluded.is_none() {
                break;
            }
            for &index in bucket {
                let entry = &self.entries[index];
                if phase.admits(entry, excluded.unwrap_or_default()) {
                    picker.add(index, entry.weight);
                }
            }
            if !picker.is_empty() {
                break;
            }
        }

        let Some(&index) = picker.pick(rng) else {
            if let Some(label) = thin_label {
                self.diagnostics.warn(
                    IssueKind::ThinPalette,
                    format!(
                        "generator could not avoid a {label} cell similar to its neighbors; consider authoring more variations"
                    ),
                );
            }
            return None;
        };
        let entry = &mut self.entries[index];
        entry.picked = true;
        Some(entry.shape)
    }

    /// Clears pick history so the catalog can serve a fresh attempt.
    pub fn reset_picks(&mut self) {
        for entry in &mut self.entries {
            entry.picked = false;
        }
    }

    pub fn connection_for_type(&self, side: CellType) -> Vec3 {
        self.connections_by_type.get(&side).copied().unwrap_or(Vec3::ZERO)
    }

    pub fn cell_bounds(&self) -> Option<CellBounds> {
        self.cell_bounds
    }

    /// Reports every non-empty cardinal combination that has no registered shape.
    pub fn is_complete(&self) -> bool {
        let mut complete = true;
        for bits in 1..16 {
            let cell_type = CellType::from_bits_truncate(bits);
            if !self.has_cell_of_type(cell_type) {
                complete = false;
                if !self.suppress_missing_cell_errors {
                    self.diagnostics
                        .trace(IssueKind::MissingCellType, format!("cell set missing {cell_type:?}"));
                }
            }
        }
        complete
    }

    pub fn has_cell_of_type(&self, cell_type: CellType) -> bool {
        self.by_type.contains_key(&cell_type)
    }

    pub fn has_cell_of_filler(&self, filler: Filler) -> bool {
        self.by_filler.contains_key(&filler)
    }

    pub fn has_cell_with_walls(&self, walls: Walls) -> bool {
        self.by_walls.contains_key(&walls)
    }
}
