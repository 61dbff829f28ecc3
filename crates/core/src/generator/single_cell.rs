//! Single-cell strategy: an area that is exactly one authored shape.

use std::sync::Arc;

use crate::catalog::{CellCatalog, effective_type};
use crate::diagnostics::{Diagnostics, IssueKind};
use crate::model::{GeneratedLayout, PlacedCell};
use crate::shape::{ShapeId, ShapeLibrary};
use crate::types::{GridCoord, Vec3};

use super::GenerationError;
use super::config::SingleCellConfig;

#[derive(Clone, Debug)]
pub struct SingleCellGenerator {
    shape: ShapeId,
    library: Arc<ShapeLibrary>,
}

impl SingleCellGenerator {
    pub fn new(config: &SingleCellConfig, catalog: CellCatalog) -> Result<Self, GenerationError> {
        let library = Arc::clone(catalog.library());
        let shape = library
            .find_by_name(&config.shape)
            .ok_or_else(|| GenerationError::UnknownShape(config.shape.clone()))?;
        Ok(Self { shape, library })
    }

    pub fn shape(&self) -> ShapeId {
        self.shape
    }

    pub(super) fn attempt(&self, area_seed: u32, attempt: u32, diagnostics: &Diagnostics) -> GeneratedLayout {
        let Some(shape) = self.library.get(self.shape) else {
            diagnostics.error(IssueKind::Generation, "single-cell shape is missing from the library");
            return GeneratedLayout {
                width: 1,
                height: 1,
                cell_size: 0.0,
                attempt,
                cells: Vec::new(),
                fillers: Vec::new(),
                shortest_path_depth: None,
            };
        };

        let cell = PlacedCell {
            id: 1,
            coord: GridCoord::default(),
            position: Vec3::ZERO,
            shape: shape.name.clone(),
            cell_type: effective_type(shape),
            seed: area_seed,
            connected_cells: Vec::new(),
            depth: None,
            on_shortest_path: false,
            population_theme: None,
            area_transitions: shape.area_transitions(),
        };
        GeneratedLayout {
            width: 1,
            height: 1,
            cell_size: shape.width,
            attempt,
            cells: vec![cell],
            fillers: Vec::new(),
            shortest_path_depth: None,
        }
    }
}
