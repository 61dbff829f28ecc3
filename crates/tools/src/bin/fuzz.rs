use anyhow::{Context, Result, bail};
use clap::Parser;
use rand_chacha::{
    ChaCha8Rng,
    rand_core::{Rng, SeedableRng},
};
use regiongen::{CellCatalog, Diagnostics, GeneratedLayout, GeneratorConfig, ShapeLibrary, link_generator};
use std::collections::{BTreeSet, VecDeque};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Palette JSON with the shapes the generator may use
    #[arg(short, long)]
    palette: PathBuf,
    /// Generator TOML
    #[arg(short, long)]
    config: PathBuf,
    #[arg(short, long, default_value_t = 42)]
    seed: u64,
    #[arg(short, long, default_value_t = 1000)]
    runs: u32,
}

fn check_invariants(layout: &GeneratedLayout) -> Result<()> {
    let ids: BTreeSet<u32> = layout.cells.iter().map(|cell| cell.id).collect();
    if ids.len() != layout.cells.len() {
        bail!("Invariant failed: duplicate cell ids");
    }
    let mut coords = BTreeSet::new();
    for coord in layout.cells.iter().map(|cell| cell.coord).chain(layout.fillers.iter().map(|filler| filler.coord)) {
        if !coords.insert(coord) {
            bail!("Invariant failed: two placements at ({}, {})", coord.x, coord.y);
        }
    }

    for cell in &layout.cells {
        for other in &cell.connected_cells {
            let Some(other) = layout.cells.iter().find(|candidate| candidate.id == *other) else {
                bail!("Invariant failed: cell {} links to missing cell {other}", cell.id);
            };
            if !other.connected_cells.contains(&cell.id) {
                bail!("Invariant failed: link {} -> {} is one-way", cell.id, other.id);
            }
        }
    }

    let Some(first) = layout.cells.first() else {
        return Ok(());
    };
    let mut reached = BTreeSet::from([first.id]);
    let mut queue = VecDeque::from([first]);
    while let Some(cell) = queue.pop_front() {
        for next in &cell.connected_cells {
            if reached.insert(*next)
                && let Some(next) = layout.cells.iter().find(|candidate| candidate.id == *next)
            {
                queue.push_back(next);
            }
        }
    }
    if reached.len() != layout.cells.len() {
        bail!("Invariant failed: {} of {} cells reachable", reached.len(), layout.cells.len());
    }

    if let Some(depth) = layout.shortest_path_depth
        && layout.shortest_path().count() as i32 != depth + 1
    {
        bail!("Invariant failed: shortest path length does not match depth {depth}");
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    let library = ShapeLibrary::load(&args.palette)
        .with_context(|| format!("Failed to load palette: {}", args.palette.display()))?;
    let config_text = fs::read_to_string(&args.config)
        .with_context(|| format!("Failed to read generator config: {}", args.config.display()))?;
    let config: GeneratorConfig = toml::from_str(&config_text).context("Failed to parse generator config")?;
    let catalog = CellCatalog::new(Arc::new(library), Diagnostics::quiet("palette"));
    let generator = link_generator(&config, catalog).context("Failed to link generator")?;

    println!("Starting fuzz harness on seed {} for {} runs...", args.seed, args.runs);
    let mut rng = ChaCha8Rng::seed_from_u64(args.seed);
    let mut failed_generations = 0;
    let mut retried = 0;

    for _ in 0..args.runs {
        let seed = rng.next_u64();
        let diagnostics = Diagnostics::quiet("fuzz");
        let layout = match generator.generate(seed, &diagnostics) {
            Ok(layout) => layout,
            Err(err) => {
                failed_generations += 1;
                println!("seed {seed}: {err}");
                continue;
            }
        };
        if layout.attempt > 0 {
            retried += 1;
        }
        check_invariants(&layout).with_context(|| format!("seed {seed}"))?;

        let replay = generator.generate(seed, &Diagnostics::quiet("replay")).context("Replay failed")?;
        if replay.fingerprint() != layout.fingerprint() {
            bail!("Invariant failed: seed {seed} is not deterministic");
        }
    }

    println!("Fuzzing completed: {retried} runs needed retries, {failed_generations} exhausted their attempts.");
    Ok(())
}
