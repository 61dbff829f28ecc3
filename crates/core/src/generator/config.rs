//! Declarative generator configurations, deserialized from TOML or JSON.

use serde::{Deserialize, Serialize};

use crate::types::{CellRole, CellType, ConnectPosition, GridCoord};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

fn default_weight() -> i32 {
    1
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GeneratorConfig {
    CellGrid(GridAreaConfig),
    SingleCell(SingleCellConfig),
}

impl GeneratorConfig {
    pub fn max_attempts(&self) -> u32 {
        match self {
            Self::CellGrid(config) => config.max_attempts,
            Self::SingleCell(_) => 1,
        }
    }

    pub fn cell_sets(&self) -> &[CellSetEntry] {
        match self {
            Self::CellGrid(config) => &config.cell_sets,
            Self::SingleCell(_) => &[],
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    N,
    E,
    S,
    W,
}

impl Side {
    pub fn cell_type(self) -> CellType {
        match self {
            Self::N => CellType::N,
            Self::E => CellType::E,
            Self::S => CellType::S,
            Self::W => CellType::W,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomKillMethod {
    /// Guess-and-check over every destroyable node.
    #[default]
    Random,
    /// Eat inward from the border ring by ring.
    Edge,
    /// Eat inward from the four corners.
    Corner,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionProfile {
    pub room_kill_pct: i32,
    #[serde(default)]
    pub room_kill_method: RoomKillMethod,
}

/// A batch of palette shapes registered with one weight.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellSetEntry {
    pub shapes: Vec<String>,
    #[serde(default = "default_weight")]
    pub weight: i32,
    #[serde(default)]
    pub unique: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalConnection {
    pub side: Side,
    pub coord: GridCoord,
    #[serde(default)]
    pub connect_position: ConnectPosition,
    #[serde(default)]
    pub role: CellRole,
    #[serde(default)]
    pub area: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequiredCell {
    pub shape: String,
    #[serde(default)]
    pub role: CellRole,
    /// Coordinates the cell may land on; empty means anywhere.
    #[serde(default)]
    pub allowed: Vec<GridCoord>,
    #[serde(default)]
    pub population_theme: Option<String>,
}

/// Tilts the grid so it climbs from one edge to the opposite one.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RampConfig {
    pub start: Side,
    pub end: Side,
    pub increment: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridAreaConfig {
    pub cells_x: i32,
    pub cells_y: i32,
    pub cell_size: f32,
    #[serde(default)]
    pub dead_end_max: i32,
    #[serde(default)]
    pub room_kill_chance_pct: i32,
    #[serde(default)]
    pub room_kill_method: RoomKillMethod,
    #[serde(default)]
    pub secondary_deletions: Vec<DeletionProfile>,
    #[serde(default)]
    pub connection_kill_chance_pct: i32,
    #[serde(default)]
    pub blacklist: Vec<GridCoord>,
    #[serde(default)]
    pub external_connections: Vec<ExternalConnection>,
    #[serde(default)]
    pub required_cells: Vec<RequiredCell>,
    #[serde(default)]
    pub ramp: Option<RampConfig>,
    #[serde(default)]
    pub cell_sets: Vec<CellSetEntry>,
    #[serde(default)]
    pub suppress_missing_cell_errors: bool,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl GridAreaConfig {
    pub fn new(cells_x: i32, cells_y: i32, cell_size: f32) -> Self {
        Self {
            cells_x,
            cells_y,
            cell_size,
            dead_end_max: 0,
            room_kill_chance_pct: 0,
            room_kill_method: RoomKillMethod::Random,
            secondary_deletions: Vec::new(),
            connection_kill_chance_pct: 0,
            blacklist: Vec::new(),
            external_connections: Vec::new(),
            required_cells: Vec::new(),
            ramp: None,
            cell_sets: Vec::new(),
            suppress_missing_cell_errors: false,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SingleCellConfig {
    pub shape: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_config_parses_from_toml_with_defaults() {
        let source = r#"
            kind = "cell_grid"
            cells_x = 4
            cells_y = 3
            cell_size = 2048.0
            dead_end_max = 2
            room_kill_chance_pct = 25
            room_kill_method = "edge"

            [[external_connections]]
            side = "W"
            coord = { x = 0, y = 0 }
            connect_position = "Begin"
            role = "Start"

            [[required_cells]]
            shape = "boss room"
            role = "Destination"

            [[cell_sets]]
            shapes = ["hub", "corridor"]
            weight = 3
        "#;

        let config: GeneratorConfig = toml::from_str(source).expect("config");
        let GeneratorConfig::CellGrid(grid) = config else {
            panic!("expected a cell grid config");
        };
        assert_eq!((grid.cells_x, grid.cells_y), (4, 3));
        assert_eq!(grid.room_kill_method, RoomKillMethod::Edge);
        assert_eq!(grid.max_attempts, DEFAULT_MAX_ATTEMPTS);
        assert_eq!(grid.external_connections[0].side.cell_type(), CellType::W);
        assert_eq!(grid.external_connections[0].connect_position, ConnectPosition::Begin);
        assert_eq!(grid.required_cells[0].role, CellRole::Destination);
        assert!(grid.required_cells[0].allowed.is_empty());
        assert_eq!(grid.cell_sets[0].weight, 3);
        assert!(!grid.cell_sets[0].unique);
    }

    #[test]
    fn single_cell_config_round_trips_through_json() {
        let config = GeneratorConfig::SingleCell(SingleCellConfig { shape: "vault".into() });
        let json = serde_json::to_string(&config).expect("json");
        assert_eq!(json, r#"{"kind":"single_cell","shape":"vault"}"#);
        assert_eq!(serde_json::from_str::<GeneratorConfig>(&json).expect("parse"), config);
        assert_eq!(config.max_attempts(), 1);
    }
}
