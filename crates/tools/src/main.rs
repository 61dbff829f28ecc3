use anyhow::{Context, Result};
use clap::Parser;
use regiongen::{
    CellCatalog, Diagnostics, GeneratedLayout, GeneratorConfig, GridCoord, ShapeLibrary, link_generator,
};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the region TOML file (palette path, default seed, generator settings)
    #[arg(short, long)]
    region: PathBuf,
    /// Overrides the seed stored in the region file
    #[arg(short, long)]
    seed: Option<u64>,
    /// Writes the generated layout as JSON to this path
    #[arg(short, long)]
    json: Option<PathBuf>,
}

#[derive(Deserialize)]
struct RegionFile {
    /// Resolved relative to the region file.
    palette: PathBuf,
    #[serde(default)]
    seed: u64,
    generator: GeneratorConfig,
}

fn load_region(path: &Path) -> Result<RegionFile> {
    let text =
        fs::read_to_string(path).with_context(|| format!("Failed to read region file: {}", path.display()))?;
    let mut region: RegionFile =
        toml::from_str(&text).with_context(|| format!("Failed to parse region file: {}", path.display()))?;
    if region.palette.is_relative()
        && let Some(parent) = path.parent()
    {
        region.palette = parent.join(&region.palette);
    }
    Ok(region)
}

fn cell_glyph(layout: &GeneratedLayout, coord: GridCoord) -> char {
    if let Some(cell) = layout.cell_at(coord) {
        match (cell.depth, cell.on_shortest_path) {
            (Some(0), _) => 'S',
            (depth, true) if depth == layout.shortest_path_depth => 'D',
            (_, true) => '*',
            _ => 'o',
        }
    } else if layout.filler_at(coord).is_some() {
        '#'
    } else {
        ' '
    }
}

fn linked(layout: &GeneratedLayout, a: GridCoord, b: GridCoord) -> bool {
    match (layout.cell_at(a), layout.cell_at(b)) {
        (Some(a), Some(b)) => a.connected_cells.contains(&b.id),
        _ => false,
    }
}

/// North (+x) at the top, east (+y) to the right.
fn render_map(layout: &GeneratedLayout) -> String {
    let mut out = String::new();
    for x in (0..layout.width).rev() {
        for y in 0..layout.height {
            let coord = GridCoord::new(x, y);
            out.push(cell_glyph(layout, coord));
            if y + 1 < layout.height {
                out.push(if linked(layout, coord, GridCoord::new(x, y + 1)) { '-' } else { ' ' });
            }
        }
        out.push('\n');
        if x > 0 {
            for y in 0..layout.height {
                out.push(if linked(layout, GridCoord::new(x, y), GridCoord::new(x - 1, y)) { '|' } else { ' ' });
                if y + 1 < layout.height {
                    out.push(' ');
                }
            }
            out.push('\n');
        }
    }
    out
}

fn main() -> Result<()> {
    let args = Args::parse();

    let region = load_region(&args.region)?;
    let library = ShapeLibrary::load(&region.palette)
        .with_context(|| format!("Failed to load palette: {}", region.palette.display()))?;
    let diagnostics = Diagnostics::new("regiongen");
    let catalog = CellCatalog::new(Arc::new(library), diagnostics.clone());
    let generator = link_generator(&region.generator, catalog).context("Failed to link generator")?;

    let seed = args.seed.unwrap_or(region.seed);
    let layout = generator.generate(seed, &diagnostics).context("Generation failed")?;

    print!("{}", render_map(&layout));
    println!("Seed: {seed}");
    println!("Attempt: {}", layout.attempt);
    println!("Cells: {} Fillers: {}", layout.cells.len(), layout.fillers.len());
    match layout.shortest_path_depth {
        Some(depth) => println!("Shortest path depth: {depth}"),
        None => println!("Shortest path depth: n/a"),
    }
    println!("Fingerprint: {:016x}", layout.fingerprint());
    for issue in diagnostics.issues() {
        println!("{issue}");
    }

    if let Some(path) = args.json {
        let json = serde_json::to_string_pretty(&layout).context("Failed to serialize layout")?;
        fs::write(&path, json).with_context(|| format!("Failed to write layout: {}", path.display()))?;
    }

    Ok(())
}
