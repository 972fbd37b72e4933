use std::error::Error;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use mcvox_anvil::{decode_chunk, region_files, Chunk, GlobalPalette, Region, VoxelWriter};
use mcvox_grid::SparseGrid;
use mcvox_nbt::Nbt;
use mcvox_util::{slot_to_chunk, REGION_SLOTS};

use crate::config::{Config, Emission};

pub const GRID_EXTENSION: &str = "mvx";

// Worker threads can hand their errors across the join.
type DriverError = Box<dyn Error + Send + Sync>;

/// Convert every world under the configured saves directory. Worlds are the
/// subdirectories; their names become the grid name prefix.
pub fn convert_saves(config: &Config) -> Result<(), DriverError> {
    let palette = GlobalPalette::load(&config.block_list)?;
    log::info!(
        "loaded global palette of {} blocks from {}",
        palette.len(),
        config.block_list.display()
    );

    for entry in std::fs::read_dir(&config.saves)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let world_name = entry.file_name().to_string_lossy().into_owned();
        convert_world(&palette, &world_name, &entry.path(), config)?;
    }
    Ok(())
}

/// Convert one world directory: every `r.<X>.<Z>.mca` under its `region/`
/// subdirectory, split across the configured worker threads. Regions are
/// independent of each other (each worker owns its reader and grids, the
/// palette is shared read-only), so the split is a plain partition.
pub fn convert_world(
    palette: &GlobalPalette,
    world_name: &str,
    world_dir: &Path,
    config: &Config,
) -> Result<(), DriverError> {
    let region_dir = world_dir.join("region");
    if !region_dir.is_dir() {
        log::warn!("world {} has no region directory, skipping", world_name);
        return Ok(());
    }

    let regions = region_files(&region_dir)?;
    let workers = config.workers.clamp(1, regions.len().max(1));
    if workers == 1 {
        for (path, region_x, region_z) in &regions {
            convert_one_region(palette, world_name, path, *region_x, *region_z, config)?;
        }
        return Ok(());
    }

    std::thread::scope(|scope| {
        let mut handles = Vec::new();
        for slice in regions.chunks(regions.len().div_ceil(workers)) {
            handles.push(scope.spawn(move || {
                slice.iter().try_for_each(|(path, region_x, region_z)| {
                    convert_one_region(palette, world_name, path, *region_x, *region_z, config)
                })
            }));
        }
        handles
            .into_iter()
            .try_for_each(|handle| handle.join().expect("region worker panicked"))
    })
}

/// Regions that fail to open are logged and skipped; everything else defers
/// to the emission mode.
fn convert_one_region(
    palette: &GlobalPalette,
    world_name: &str,
    path: &Path,
    region_x: i32,
    region_z: i32,
    config: &Config,
) -> Result<(), DriverError> {
    let mut region = match Region::open(path) {
        Ok(region) => region,
        Err(err) => {
            log::warn!("skipping region {}: {}", path.display(), err);
            return Ok(());
        }
    };
    log::info!(
        "world {}: region ({}, {}), {} occupied slots",
        world_name,
        region_x,
        region_z,
        region.occupied_slots().count()
    );
    match config.emission {
        Emission::Chunks => {
            convert_region_chunks(palette, world_name, &mut region, region_x, region_z, config)
        }
        Emission::Regions => {
            convert_region(palette, world_name, &mut region, region_x, region_z, config)
        }
    }
}

/// Read, parse, and decode one slot into the given grid. `Ok(false)` means
/// the chunk was vacant or spoiled in a way that only affects itself
/// (already logged); configuration and corruption errors propagate.
fn decode_slot<R: std::io::Read + std::io::Seek>(
    palette: &GlobalPalette,
    region: &mut Region<R>,
    slot: usize,
    region_x: i32,
    region_z: i32,
    minimum_section_y: i8,
    grid: &mut SparseGrid,
) -> Result<bool, DriverError> {
    let (chunk_x, chunk_z) = slot_to_chunk(slot, region_x, region_z);
    let data = match region.read(slot) {
        Ok(Some(data)) => data,
        Ok(None) => return Ok(false),
        Err(err) if err.is_chunk_local() => {
            log::warn!("chunk ({}, {}): {}", chunk_x, chunk_z, err);
            return Ok(false);
        }
        Err(err) => return Err(err.into()),
    };

    let chunk = match Chunk::parse(&data, chunk_x, chunk_z) {
        Ok(chunk) => chunk,
        Err(err) if err.is_chunk_local() => {
            log::warn!("chunk ({}, {}): {}", chunk_x, chunk_z, err);
            return Ok(false);
        }
        Err(err) => return Err(err.into()),
    };
    if chunk.sections.is_empty() {
        return Ok(false);
    }
    if log::log_enabled!(log::Level::Trace) {
        match Nbt::parse_document(&data) {
            Ok(tree) => log::trace!("chunk ({}, {}):\n{}", chunk_x, chunk_z, tree.dump()),
            Err(err) => log::trace!("chunk ({}, {}): undumpable: {}", chunk_x, chunk_z, err),
        }
    }

    let mut accessor = grid.accessor();
    let mut writer = VoxelWriter::new(&mut accessor);
    match decode_chunk(palette, &chunk, minimum_section_y, &mut writer) {
        Ok(()) => {
            log::debug!(
                "chunk ({}, {}): {} sections, {} voxels",
                chunk_x,
                chunk_z,
                chunk.sections.len(),
                writer.written()
            );
            Ok(true)
        }
        Err(err) if err.is_chunk_local() => {
            log::warn!("chunk ({}, {}): {}", chunk_x, chunk_z, err);
            Ok(false)
        }
        Err(err) => Err(err.into()),
    }
}

fn write_grid(grid: &SparseGrid, dir: &Path) -> Result<(), DriverError> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!("{}.{}", grid.name(), GRID_EXTENSION));
    let mut out = BufWriter::new(File::create(&path)?);
    grid.write_to(&mut out)?;
    log::debug!("wrote {}", path.display());
    Ok(())
}

/// Per-chunk emission: a fresh grid per occupied slot, pruned, skipped when
/// empty, written as `<world>.<chunkX>.<chunkZ>.mvx`.
fn convert_region_chunks<R: std::io::Read + std::io::Seek>(
    palette: &GlobalPalette,
    world_name: &str,
    region: &mut Region<R>,
    region_x: i32,
    region_z: i32,
    config: &Config,
) -> Result<(), DriverError> {
    let out_dir = config.output.join("chunks");
    for slot in 0..REGION_SLOTS {
        let mut grid = SparseGrid::new(0);
        if !decode_slot(
            palette,
            region,
            slot,
            region_x,
            region_z,
            config.minimum_section_y,
            &mut grid,
        )? {
            continue;
        }
        grid.prune();
        if grid.active_voxel_count() == 0 {
            continue;
        }
        let (chunk_x, chunk_z) = slot_to_chunk(slot, region_x, region_z);
        grid.set_name(format!("{}.{}.{}", world_name, chunk_x, chunk_z));
        write_grid(&grid, &out_dir)?;
    }
    Ok(())
}

/// Per-region emission: one accumulator grid over all 1024 slots, written as
/// `<world>.<regionX>.<regionZ>.mvx` unless it pruned down to nothing.
fn convert_region<R: std::io::Read + std::io::Seek>(
    palette: &GlobalPalette,
    world_name: &str,
    region: &mut Region<R>,
    region_x: i32,
    region_z: i32,
    config: &Config,
) -> Result<(), DriverError> {
    let mut grid = SparseGrid::new(0);
    for slot in 0..REGION_SLOTS {
        decode_slot(
            palette,
            region,
            slot,
            region_x,
            region_z,
            config.minimum_section_y,
            &mut grid,
        )?;
    }
    grid.prune();
    if grid.active_voxel_count() == 0 {
        return Ok(());
    }
    grid.set_name(format!("{}.{}.{}", world_name, region_x, region_z));
    write_grid(&grid, &config.output.join("regions"))
}
