//! Room-kill passes that delete extraneous nodes before cell types are assigned.

use crate::graph::GridContainer;
use crate::random::{GenRandom, Picker};
use crate::types::GridCoord;

use super::config::RoomKillMethod;

/// Deletes `chance` percent of the live nodes with the given method.
/// Returns how many were actually removed.
pub(super) fn delete_extraneous_cells(
    grid: &mut GridContainer,
    rng: &mut impl GenRandom,
    chance: i32,
    method: RoomKillMethod,
) -> usize {
    let Ok(chance) = usize::try_from(chance) else {
        return 0;
    };
    let cells = chance * grid.container().num_cells() / 100;
    if cells == 0 {
        return 0;
    }
    match method {
        RoomKillMethod::Random => delete_guess_and_check(grid, rng, cells),
        RoomKillMethod::Edge => {
            let rings = (grid.width() / 2).min(grid.height() / 2);
            delete_creep(grid, rng, cells, rings, edge_ring)
        }
        RoomKillMethod::Corner => {
            let rings = (grid.width() / 2).max(grid.height() / 2);
            delete_creep(grid, rng, cells, rings, corner_ring)
        }
    }
}

fn border_distances(grid: &GridContainer, coord: GridCoord) -> (i32, i32) {
    let dx = coord.x.min(grid.width() - 1 - coord.x);
    let dy = coord.y.min(grid.height() - 1 - coord.y);
    (dx, dy)
}

/// Ring index counted inward from the nearest border.
fn edge_ring(grid: &GridContainer, coord: GridCoord) -> i32 {
    let (dx, dy) = border_distances(grid, coord);
    dx.min(dy)
}

/// Chebyshev distance to the nearest grid corner.
fn corner_ring(grid: &GridContainer, coord: GridCoord) -> i32 {
    let (dx, dy) = border_distances(grid, coord);
    dx.max(dy)
}

fn destroyable_coords(grid: &GridContainer, filter: impl Fn(GridCoord) -> bool) -> Vec<GridCoord> {
    let mut coords = Vec::new();
    for y in 0..grid.height() {
        for x in 0..grid.width() {
            let coord = GridCoord::new(x, y);
            if filter(coord) && grid.destroyable_cell_at(coord) {
                coords.push(coord);
            }
        }
    }
    coords
}

fn delete_guess_and_check(grid: &mut GridContainer, rng: &mut impl GenRandom, mut cells: usize) -> usize {
    let mut picker = Picker::new();
    for coord in destroyable_coords(grid, |_| true) {
        picker.add(coord, 1);
    }

    let mut removed = 0;
    while cells > 0 {
        let Some(coord) = picker.pick_remove(rng) else {
            break;
        };
        // Earlier deletions can make a candidate load-bearing.
        if grid.destroyable_cell_at(coord) && grid.destroy_cell_at(coord) {
            cells -= 1;
            removed += 1;
        }
    }
    removed
}

fn delete_creep(
    grid: &mut GridContainer,
    rng: &mut impl GenRandom,
    mut cells: usize,
    rings: i32,
    ring_of: fn(&GridContainer, GridCoord) -> i32,
) -> usize {
    let mut removed = 0;
    for radius in 0..rings {
        while cells > 0 {
            let view: &GridContainer = grid;
            let candidates = destroyable_coords(view, |coord| ring_of(view, coord) == radius);
            let mut picker = Picker::new();
            for coord in candidates {
                picker.add(coord, 1);
            }
            let Some(coord) = picker.pick_remove(rng) else {
                break;
            };
            if grid.destroy_cell_at(coord) {
                cells -= 1;
                removed += 1;
            }
        }
        if cells == 0 {
            break;
        }
    }
    removed
}
