//! Generator dispatch: resolves a declarative config to a strategy and runs bounded attempts.

mod cell_grid;
mod config;
mod deletion;
mod single_cell;

use std::fmt;

use crate::catalog::CellCatalog;
use crate::diagnostics::{Diagnostics, IssueKind};
use crate::graph::ReserveError;
use crate::model::GeneratedLayout;
use crate::random::{attempt_rng, derive_attempt_seed};
use crate::types::{CellType, GridCoord};

pub use cell_grid::CellGridGenerator;
pub use config::{
    CellSetEntry, DEFAULT_MAX_ATTEMPTS, DeletionProfile, ExternalConnection, GeneratorConfig, GridAreaConfig,
    RampConfig, RequiredCell, RoomKillMethod, Side, SingleCellConfig,
};
pub use single_cell::SingleCellGenerator;

/// Why a single attempt was abandoned. The dispatcher retries with a new seed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttemptFailure {
    RequiredCell { shape: String },
    Reserve(ReserveError),
    DestinationUnreachable,
    NoShapeForType { coord: GridCoord, cell_type: CellType },
}

impl fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RequiredCell { shape } => write!(f, "failed to place required cell `{shape}`"),
            Self::Reserve(err) => write!(f, "{err}"),
            Self::DestinationUnreachable => f.write_str("destination is unreachable from the start"),
            Self::NoShapeForType { coord, cell_type } => write!(
                f,
                "no shape of type {cell_type:?} was available for ({}, {})",
                coord.x, coord.y
            ),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GenerationError {
    InvalidConfig(String),
    UnknownShape(String),
    AttemptsExhausted { attempts: u32, last: Option<AttemptFailure> },
}

impl fmt::Display for GenerationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig(reason) => write!(f, "invalid generator config: {reason}"),
            Self::UnknownShape(name) => write!(f, "generator references unknown shape `{name}`"),
            Self::AttemptsExhausted { attempts, last: Some(last) } => {
                write!(f, "generation failed after {attempts} attempts; last failure: {last}")
            }
            Self::AttemptsExhausted { attempts, last: None } => {
                write!(f, "generation failed after {attempts} attempts")
            }
        }
    }
}

impl std::error::Error for GenerationError {}

/// Registers named shape batches from a config into the catalog.
pub fn load_cell_sets(catalog: &mut CellCatalog, entries: &[CellSetEntry]) -> Result<usize, GenerationError> {
    let mut registered = 0;
    for entry in entries {
        let library = catalog.library().clone();
        let ids = entry
            .shapes
            .iter()
            .map(|name| library.find_by_name(name).ok_or_else(|| GenerationError::UnknownShape(name.clone())))
            .collect::<Result<Vec<_>, _>>()?;
        registered += catalog.load_cell_set(&ids, entry.weight, entry.unique);
    }
    Ok(registered)
}

#[derive(Clone, Debug)]
pub enum Generator {
    CellGrid(CellGridGenerator),
    SingleCell(SingleCellGenerator),
}

/// Picks the strategy for `config`, loading any cell sets it names into `catalog` first.
pub fn link_generator(config: &GeneratorConfig, mut catalog: CellCatalog) -> Result<Generator, GenerationError> {
    load_cell_sets(&mut catalog, config.cell_sets())?;
    match config {
        GeneratorConfig::CellGrid(grid) => Ok(Generator::CellGrid(CellGridGenerator::new(grid.clone(), catalog)?)),
        GeneratorConfig::SingleCell(single) => {
            Ok(Generator::SingleCell(SingleCellGenerator::new(single, catalog)?))
        }
    }
}

impl Generator {
    pub fn max_attempts(&self) -> u32 {
        match self {
            Self::CellGrid(generator) => generator.config().max_attempts.max(1),
            Self::SingleCell(_) => 1,
        }
    }

    /// Runs attempts until one succeeds. Each attempt gets its own seed and a
    /// catalog with fresh pick history.
    pub fn generate(&self, seed: u64, diagnostics: &Diagnostics) -> Result<GeneratedLayout, GenerationError> {
        let attempts = self.max_attempts();
        let mut last = None;

        for attempt in 0..attempts {
            let mut rng = attempt_rng(seed, attempt);
            let area_seed = derive_attempt_seed(seed, attempt) as u32;
            let result = match self {
                Self::CellGrid(generator) => generator.attempt(&mut rng, area_seed, attempt, diagnostics),
                Self::SingleCell(generator) => Ok(generator.attempt(area_seed, attempt, diagnostics)),
            };
            match result {
                Ok(layout) => {
                    log::debug!(
                        target: "regiongen",
                        "[{}] seed {seed} generated on attempt {attempt} with {} cells",
                        diagnostics.scope(),
                        layout.cells.len()
                    );
                    return Ok(layout);
                }
                Err(failure) => {
                    diagnostics.warn(IssueKind::Generation, format!("attempt {attempt} failed: {failure}"));
                    last = Some(failure);
                }
            }
        }

        let err = GenerationError::AttemptsExhausted { attempts, last };
        diagnostics.error(IssueKind::Generation, err.to_string());
        Err(err)
    }
}
