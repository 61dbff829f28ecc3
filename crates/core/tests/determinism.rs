use std::collections::{BTreeSet, VecDeque};
use std::sync::Arc;

use proptest::{
    arbitrary::any,
    test_runner::{Config as ProptestConfig, TestCaseError, TestRunner},
};
use regiongen::generator::{CellSetEntry, DeletionProfile, ExternalConnection, RequiredCell, RoomKillMethod, Side};
use regiongen::{
    CellCatalog, CellRole, CellShape, CellType, ConnectPosition, Diagnostics, Filler, GeneratedLayout, Generator,
    GeneratorConfig, GridAreaConfig, GridCoord, ShapeLibrary, Walls, link_generator,
};

const DEAD_END_MAX: i32 = 2;

fn palette() -> Arc<ShapeLibrary> {
    let mut library = ShapeLibrary::new();
    for bits in 1..16u16 {
        let open = CellType::from_bits_truncate(bits);
        for variant in ["a", "b"] {
            let mut walls = Walls::ALL;
            for side in CellType::CARDINALS {
                if open.contains(side) {
                    walls.remove(Walls::for_side(side));
                }
            }
            library.insert(CellShape {
                name: format!("room {bits:02}{variant}"),
                cell_type: open,
                walls,
                filler_edges: Filler::NONE,
                width: 512.0,
                length: 512.0,
                height: 0.0,
                playable_area: 1.0,
                markers: Vec::new(),
            });
        }
    }
    library.insert(CellShape {
        name: "cliff".into(),
        cell_type: CellType::NONE,
        walls: Walls::ALL,
        filler_edges: Filler::NONE,
        width: 512.0,
        length: 512.0,
        height: 0.0,
        playable_area: 0.0,
        markers: Vec::new(),
    });
    Arc::new(library)
}

fn generator(method: RoomKillMethod) -> Generator {
    let library = palette();
    let mut config = GridAreaConfig::new(6, 5, 512.0);
    config.dead_end_max = DEAD_END_MAX;
    config.room_kill_chance_pct = 30;
    config.room_kill_method = method;
    config.secondary_deletions.push(DeletionProfile { room_kill_pct: 10, room_kill_method: RoomKillMethod::Random });
    config.connection_kill_chance_pct = 35;
    config.external_connections.push(ExternalConnection {
        side: Side::S,
        coord: GridCoord::new(0, 2),
        connect_position: ConnectPosition::One,
        role: CellRole::Start,
        area: None,
    });
    config.required_cells.push(RequiredCell {
        shape: "room 04a".into(),
        role: CellRole::Destination,
        allowed: (0..5).map(|y| GridCoord::new(5, y)).collect(),
        population_theme: Some("elites".into()),
    });
    config.cell_sets.push(CellSetEntry {
        shapes: library.iter().map(|(_, shape)| shape.name.clone()).collect(),
        weight: 1,
        unique: false,
    });
    let catalog = CellCatalog::new(library, Diagnostics::quiet("palette"));
    link_generator(&GeneratorConfig::CellGrid(config), catalog).expect("link")
}

fn generate(generator: &Generator, seed: u64) -> GeneratedLayout {
    generator.generate(seed, &Diagnostics::quiet("determinism")).expect("layout")
}

fn check_layout(layout: &GeneratedLayout) -> Result<(), String> {
    let by_id = |id: u32| layout.cells.get(id as usize - 1).filter(|cell| cell.id == id);

    for (index, cell) in layout.cells.iter().enumerate() {
        if cell.id as usize != index + 1 {
            return Err(format!("cell ids are not sequential at {index}"));
        }
        let open = CellType::from_bits_truncate(cell.shape[5..7].parse::<u16>().map_err(|e| e.to_string())?);
        if open != cell.cell_type {
            return Err(format!("cell {} has shape {} for type {:?}", cell.id, cell.shape, cell.cell_type));
        }
        for &other in &cell.connected_cells {
            let Some(other) = by_id(other) else {
                return Err(format!("cell {} links to a missing id {other}", cell.id));
            };
            if !other.connected_cells.contains(&cell.id) {
                return Err(format!("link {} -> {} is one-way", cell.id, other.id));
            }
        }
    }

    let mut reached = BTreeSet::from([1u32]);
    let mut queue = VecDeque::from([1u32]);
    while let Some(id) = queue.pop_front() {
        for &next in &by_id(id).map(|cell| cell.connected_cells.clone()).unwrap_or_default() {
            if reached.insert(next) {
                queue.push_back(next);
            }
        }
    }
    if reached.len() != layout.cells.len() {
        return Err(format!("only {} of {} cells are connected", reached.len(), layout.cells.len()));
    }

    let endpoints: BTreeSet<u32> = [
        layout.cell_at(GridCoord::new(0, 2)).map(|cell| cell.id),
        layout.shortest_path().max_by_key(|cell| cell.depth).map(|cell| cell.id),
    ]
    .into_iter()
    .flatten()
    .collect();
    for cell in layout.cells.iter().filter(|cell| cell.connected_cells.len() == 1) {
        if !dead_end_reaches_exit(layout, cell.id, &endpoints) {
            return Err(format!("dead end {} runs longer than {DEAD_END_MAX}", cell.id));
        }
    }

    if layout.cells.len() + layout.fillers.len() != 30 {
        return Err("grid slots were lost".into());
    }
    Ok(())
}

fn dead_end_reaches_exit(layout: &GeneratedLayout, dead_end: u32, endpoints: &BTreeSet<u32>) -> bool {
    let mut seen = BTreeSet::from([dead_end]);
    let mut queue = VecDeque::from([(dead_end, 1)]);
    while let Some((id, level)) = queue.pop_front() {
        if level > DEAD_END_MAX {
            continue;
        }
        let cell = &layout.cells[id as usize - 1];
        if cell.connected_cells.len() >= 3 || endpoints.contains(&id) {
            return true;
        }
        for &next in &cell.connected_cells {
            if seen.insert(next) {
                queue.push_back((next, level + 1));
            }
        }
    }
    false
}

#[test]
fn identical_seeds_produce_identical_layouts() {
    let generator = generator(RoomKillMethod::Edge);
    let first = generate(&generator, 12345);
    let second = generate(&generator, 12345);
    assert_eq!(first.fingerprint(), second.fingerprint(), "Identical seeds must produce identical fingerprints");
    assert_eq!(first, second);
}

#[test]
fn different_seeds_vary_the_layout() {
    let generator = generator(RoomKillMethod::Random);
    let fingerprints: BTreeSet<u64> = (0..16).map(|seed| generate(&generator, seed).fingerprint()).collect();
    assert!(fingerprints.len() > 1, "sixteen seeds should not all collapse to one layout");
}

#[test]
fn generated_layouts_hold_their_invariants_across_seeds() {
    let mut runner = TestRunner::new(ProptestConfig { cases: 48, ..ProptestConfig::default() });
    for method in [RoomKillMethod::Random, RoomKillMethod::Edge, RoomKillMethod::Corner] {
        let generator = generator(method);
        runner
            .run(&any::<u64>(), |seed| {
                let layout = generator
                    .generate(seed, &Diagnostics::quiet("fuzz"))
                    .map_err(|err| TestCaseError::fail(err.to_string()))?;
                check_layout(&layout).map_err(|reason| TestCaseError::fail(format!("seed {seed}: {reason}")))
            })
            .expect("invariants hold");
    }
}
