pub mod catalog;
pub mod diagnostics;
pub mod generator;
pub mod graph;
pub mod model;
pub mod random;
pub mod shape;
pub mod types;

pub use catalog::{CatalogEntry, CellBounds, CellCatalog};
pub use diagnostics::{Diagnostics, Issue, IssueKind, Severity};
pub use generator::{
    AttemptFailure, CellGridGenerator, GenerationError, Generator, GeneratorConfig, GridAreaConfig,
    SingleCellConfig, SingleCellGenerator, link_generator, load_cell_sets,
};
pub use graph::{GenCell, GenCellContainer, GridContainer, NodeId, ReserveError};
pub use model::{FillerPlacement, GeneratedLayout, PlacedCell};
pub use shape::{CellShape, ShapeId, ShapeLibrary, ShapeLoadError};
pub use types::*;
