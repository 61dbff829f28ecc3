//! Grid-area strategy: carve a full mesh down to a playable layout and dress it with shapes.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::catalog::{CellCatalog, SQUARE_EPSILON};
use crate::diagnostics::{Diagnostics, IssueKind};
use crate::graph::{GridContainer, NodeId};
use crate::model::{FillerPlacement, GeneratedLayout, PlacedCell};
use crate::random::{GenRandom, Picker};
use crate::shape::ShapeId;
use crate::types::{CellRole, CellType, Filler, GridCoord, Vec3};

use super::config::{GridAreaConfig, RampConfig, RequiredCell, Side};
use super::deletion::delete_extraneous_cells;
use super::{AttemptFailure, GenerationError};

/// Neighbor offsets that make up a filler slot's occupancy mask.
const FILLER_NEIGHBORS: [(Filler, i32, i32); 8] = [
    (Filler::N, 1, 0),
    (Filler::NE, 1, 1),
    (Filler::E, 0, 1),
    (Filler::SE, -1, 1),
    (Filler::S, -1, 0),
    (Filler::SW, -1, -1),
    (Filler::W, 0, -1),
    (Filler::NW, 1, -1),
];

#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct RampIncrements {
    x: f32,
    y: f32,
    z: f32,
}

fn ramp_increments(ramp: &RampConfig, width: i32, height: i32, diagnostics: &Diagnostics) -> RampIncrements {
    let step = ramp.increment;
    match (ramp.start, ramp.end) {
        (Side::W, Side::E) => RampIncrements { x: 0.0, y: step, z: 0.0 },
        (Side::S, Side::N) => RampIncrements { x: step, y: 0.0, z: 0.0 },
        (Side::E, Side::W) => RampIncrements { x: 0.0, y: -step, z: step * (height - 1) as f32 },
        (Side::N, Side::S) => RampIncrements { x: -step, y: 0.0, z: step * (width - 1) as f32 },
        (start, end) => {
            diagnostics.error(
                IssueKind::Generation,
                format!("ramp must run between opposite edges, got {start:?} to {end:?}"),
            );
            RampIncrements::default()
        }
    }
}

#[derive(Clone, Debug)]
pub struct CellGridGenerator {
    config: GridAreaConfig,
    catalog: CellCatalog,
    required: Vec<(ShapeId, RequiredCell)>,
}

/// Per-attempt mutable state threaded through the pipeline.
struct AttemptState<'a> {
    grid: GridContainer,
    catalog: CellCatalog,
    diagnostics: &'a Diagnostics,
    next_id: u32,
    next_seed: u32,
    seeds: Vec<u32>,
    fillers: Vec<FillerPlacement>,
}

impl CellGridGenerator {
    pub fn new(config: GridAreaConfig, catalog: CellCatalog) -> Result<Self, GenerationError> {
        if config.cells_x <= 0 || config.cells_y <= 0 {
            return Err(GenerationError::InvalidConfig(format!(
                "grid must have positive dimensions, got {}x{}",
                config.cells_x, config.cells_y
            )));
        }
        if config.cells_x.checked_mul(config.cells_y).is_none() {
            return Err(GenerationError::InvalidConfig(format!(
                "grid of {}x{} cells is too large",
                config.cells_x, config.cells_y
            )));
        }
        if config.cell_size <= 0.0 {
            return Err(GenerationError::InvalidConfig(format!(
                "cell size must be positive, got {}",
                config.cell_size
            )));
        }

        let required = config
            .required_cells
            .iter()
            .map(|required| {
                catalog
                    .library()
                    .find_by_name(&required.shape)
                    .map(|id| (id, required.clone()))
                    .ok_or_else(|| GenerationError::UnknownShape(required.shape.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let catalog = catalog.suppress_missing_cell_errors(config.suppress_missing_cell_errors);
        if let Some(bounds) = catalog.cell_bounds()
            && (bounds.width - config.cell_size).abs() > SQUARE_EPSILON
        {
            catalog.diagnostics().warn(
                IssueKind::Generation,
                format!("cell size {} does not match palette cell width {}", config.cell_size, bounds.width),
            );
        }
        catalog.is_complete();

        Ok(Self { config, catalog, required })
    }

    pub fn config(&self) -> &GridAreaConfig {
        &self.config
    }

    pub fn catalog(&self) -> &CellCatalog {
        &self.catalog
    }

    pub(super) fn attempt(
        &self,
        rng: &mut impl GenRandom,
        area_seed: u32,
        attempt: u32,
        diagnostics: &Diagnostics,
    ) -> Result<GeneratedLayout, AttemptFailure> {
        let config = &self.config;
        let mut catalog = self.catalog.clone();
        catalog.reset_picks();
        catalog.set_diagnostics(diagnostics.clone());

        let mut grid =
            GridContainer::new(config.cells_x, config.cells_y, &catalog, config.dead_end_max, diagnostics.clone());
        grid.connect_all();
        self.apply_blacklist(&mut grid);
        self.establish_external_connections(&mut grid, diagnostics);
        self.create_required_cells(&mut grid, rng)?;

        delete_extraneous_cells(&mut grid, rng, config.room_kill_chance_pct, config.room_kill_method);
        for profile in &config.secondary_deletions {
            delete_extraneous_cells(&mut grid, rng, profile.room_kill_pct, profile.room_kill_method);
        }
        delete_extraneous_connections(&mut grid, rng, config.connection_kill_chance_pct);

        let depth = grid.determine_cell_depths_and_shortest_path();
        let has_endpoints =
            !grid.container().start_cells().is_empty() && !grid.container().destination_cells().is_empty();
        if has_endpoints && depth == i32::MAX {
            return Err(AttemptFailure::DestinationUnreachable);
        }

        let slots = grid.container().slots().len();
        let mut state = AttemptState {
            grid,
            catalog,
            diagnostics,
            next_id: 1,
            next_seed: area_seed,
            seeds: vec![0; slots],
            fillers: Vec::new(),
        };
        state.assign_unique_cell_ids();
        state.assign_cell_positions(config.cell_size, config.ramp.as_ref());
        state.assign_cell_types(rng, config.cell_size)?;

        Ok(state.into_layout(config, attempt, (depth != i32::MAX).then_some(depth)))
    }

    fn apply_blacklist(&self, grid: &mut GridContainer) {
        for &coord in &self.config.blacklist {
            if grid.destroyable_cell_at(coord) {
                grid.destroy_cell_at(coord);
            }
        }
    }

    fn establish_external_connections(&self, grid: &mut GridContainer, diagnostics: &Diagnostics) {
        for connection in &self.config.external_connections {
            let Some(node) = grid.node_at(connection.coord) else {
                diagnostics.trace(
                    IssueKind::Generation,
                    format!(
                        "external connection at ({}, {}) has no cell",
                        connection.coord.x, connection.coord.y
                    ),
                );
                continue;
            };
            if let Some(cell) = grid.container_mut().cell_mut(node) {
                cell.set_external_connection(
                    connection.side.cell_type(),
                    connection.area.clone(),
                    connection.connect_position,
                    diagnostics,
                );
            }
            if connection.role != CellRole::None {
                grid.container_mut().add_start_or_destination_cell(node, connection.role);
            }
        }
    }

    fn create_required_cells(&self, grid: &mut GridContainer, rng: &mut impl GenRandom) -> Result<(), AttemptFailure> {
        for (shape, required) in &self.required {
            let mut picker = Picker::new();
            for y in 0..grid.height() {
                for x in 0..grid.width() {
                    let coord = GridCoord::new(x, y);
                    let allowed = required.allowed.is_empty() || required.allowed.contains(&coord);
                    if allowed && grid.reservable_cell(coord, *shape) {
                        picker.add(coord, 1);
                    }
                }
            }

            let Some(&coord) = picker.pick(rng) else {
                return Err(AttemptFailure::RequiredCell { shape: required.shape.clone() });
            };
            grid.reserve_cell(coord, *shape, required.role).map_err(AttemptFailure::Reserve)?;
            if let Some(theme) = &required.population_theme
                && let Some(cell) = grid.cell_at_mut(coord)
            {
                cell.population_theme_override = Some(theme.clone());
            }
        }
        Ok(())
    }
}

fn delete_extraneous_connections(grid: &mut GridContainer, rng: &mut impl GenRandom, chance: i32) {
    if chance <= 0 {
        return;
    }
    let nodes: Vec<NodeId> = grid.container().cells().map(|(node, _)| node).collect();
    for node in nodes {
        grid.container_mut().destroy_unrequired_connections(node, rng, chance);
    }
}

/// Placed orthogonal neighbors of the same open-side type; picking them again
/// would put two identical rooms side by side.
fn build_excluded_list_like_cells(grid: &GridContainer, coord: GridCoord, cell_type: CellType) -> Vec<ShapeId> {
    CellType::CARDINALS
        .iter()
        .filter_map(|&side| coord.step(side))
        .filter(|&next| grid.determine_type(next) == cell_type)
        .filter_map(|next| grid.cell_at(next).and_then(|cell| cell.cell_ref()))
        .collect()
}

impl AttemptState<'_> {
    fn allocate_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn assign_unique_cell_ids(&mut self) {
        let nodes: Vec<NodeId> = self.grid.container().cells().map(|(node, _)| node).collect();
        for node in nodes {
            let id = self.allocate_id();
            if let Some(cell) = self.grid.container_mut().cell_mut(node) {
                cell.id = id;
            }
        }
    }

    fn assign_cell_positions(&mut self, cell_size: f32, ramp: Option<&RampConfig>) {
        let increments = ramp
            .map(|ramp| ramp_increments(ramp, self.grid.width(), self.grid.height(), self.diagnostics))
            .unwrap_or_default();
        for y in 0..self.grid.height() {
            for x in 0..self.grid.width() {
                if let Some(cell) = self.grid.cell_at_mut(GridCoord::new(x, y)) {
                    cell.position = Vec3::new(
                        x as f32 * cell_size,
                        y as f32 * cell_size,
                        increments.z + increments.x * x as f32 + increments.y * y as f32,
                    );
                }
            }
        }
    }

    /// Dresses every coordinate: live nodes get a shape of their open-side
    /// type, empty slots get a filler chosen by neighbor occupancy.
    fn assign_cell_types(&mut self, rng: &mut impl GenRandom, cell_size: f32) -> Result<(), AttemptFailure> {
        let mut by_type: BTreeMap<CellType, Vec<GridCoord>> = BTreeMap::new();
        for y in 0..self.grid.height() {
            for x in 0..self.grid.width() {
                let coord = GridCoord::new(x, y);
                by_type.entry(self.grid.determine_type(coord)).or_default().push(coord);
            }
        }

        for (cell_type, coords) in by_type {
            let mut picker = Picker::new();
            for coord in coords {
                picker.add(coord, 1);
            }

            while let Some(coord) = picker.pick_remove(rng) {
                let Some(node) = self.grid.node_at(coord) else {
                    let position = Vec3::new(coord.x as f32 * cell_size, coord.y as f32 * cell_size, 0.0);
                    self.place_filler_room(rng, coord, position);
                    continue;
                };

                let placed = self.grid.container().cell(node).and_then(|cell| cell.cell_ref());
                if placed.is_none() {
                    let excluded = build_excluded_list_like_cells(&self.grid, coord, cell_type);
                    let picked = if self.catalog.has_cell_of_type(cell_type) {
                        self.catalog.pick_by_type(rng, cell_type, Some(&excluded))
                    } else {
                        None
                    };
                    let Some(shape) = picked else {
                        return Err(AttemptFailure::NoShapeForType { coord, cell_type });
                    };
                    let library = Arc::clone(self.catalog.library());
                    if let Some(cell) = self.grid.cell_at_mut(coord) {
                        cell.set_cell_ref(Some(shape), &library);
                    }
                }

                self.next_seed = self.next_seed.wrapping_add(1);
                self.seeds[node.index()] = self.next_seed;
            }
        }
        Ok(())
    }

    fn place_filler_room(&mut self, rng: &mut impl GenRandom, coord: GridCoord, position: Vec3) {
        let mut filler = Filler::NONE;
        for (bit, dx, dy) in FILLER_NEIGHBORS {
            let neighbor = GridCoord::new(coord.x + dx, coord.y + dy);
            if self.grid.test_coord(neighbor) && self.grid.node_at(neighbor).is_some() {
                filler |= bit;
            }
        }

        let shape = match self.catalog.pick_by_filler(rng, filler) {
            Some(shape) => Some(shape),
            None if filler != Filler::NONE => self.catalog.pick_by_filler(rng, Filler::NONE),
            None => None,
        };
        let Some(shape) = shape else {
            return;
        };
        let name = self.catalog.library().get(shape).map(|shape| shape.name.clone()).unwrap_or_default();
        let id = self.allocate_id();
        self.fillers.push(FillerPlacement { id, coord, position, shape: name, filler });
    }

    fn into_layout(self, config: &GridAreaConfig, attempt: u32, shortest_path_depth: Option<i32>) -> GeneratedLayout {
        let container = self.grid.container();
        let library = self.catalog.library();

        let mut cells: Vec<PlacedCell> = container
            .cells()
            .map(|(node, cell)| {
                let coord = self.grid.coord_of(node);
                let shape = cell.cell_ref();
                let area_transitions = shape
                    .and_then(|id| self.catalog.entry(id).map(|entry| entry.area_transitions.clone()))
                    .or_else(|| shape.and_then(|id| library.get(id)).map(|shape| shape.area_transitions()))
                    .unwrap_or_default();
                PlacedCell {
                    id: cell.id,
                    coord,
                    position: cell.position,
                    shape: shape
                        .and_then(|id| library.get(id))
                        .map(|shape| shape.name.clone())
                        .unwrap_or_default(),
                    cell_type: self.grid.determine_type(coord),
                    seed: self.seeds[node.index()],
                    connected_cells: cell
                        .connections()
                        .iter()
                        .filter_map(|&other| container.cell(other).map(|other| other.id))
                        .collect(),
                    depth: (cell.depth() != i32::MAX).then_some(cell.depth()),
                    on_shortest_path: cell.part_of_shortest_path,
                    population_theme: cell.population_theme_override.clone(),
                    area_transitions,
                }
            })
            .collect();
        cells.sort_by_key(|cell| cell.id);

        let mut fillers = self.fillers;
        fillers.sort_by_key(|filler| filler.id);

        GeneratedLayout {
            width: config.cells_x,
            height: config.cells_y,
            cell_size: config.cell_size,
            attempt,
            cells,
            fillers,
            shortest_path_depth,
        }
    }
}
