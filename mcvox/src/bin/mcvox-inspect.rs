//! Resolve one block coordinate against a world save: which region file,
//! slot, section, and data index it lives at, and which block is stored
//! there. Mostly useful for eyeballing a save while debugging the pipeline;
//! `--dump` prints the chunk's whole NBT structure.

use std::error::Error;
use std::path::PathBuf;

use clap::Parser;

use mcvox_anvil::{Chunk, GlobalPalette, Region};
use mcvox_nbt::Nbt;
use mcvox_util::{
    bits_for, block_in_chunk, block_to_chunk, chunk_to_region, chunk_to_slot, section_index,
    PackedIndices, SECTION_VOLUME,
};

#[derive(Parser)]
#[command(
    name = "mcvox-inspect",
    about = "Look up one block of a world save, optionally dumping its chunk NBT"
)]
struct Args {
    /// World directory (the one containing region/)
    #[arg(short, long)]
    world: PathBuf,

    /// Global palette file; when given, the block's global id is printed too
    #[arg(long = "block-list")]
    block_list: Option<PathBuf>,

    /// Print the chunk's full NBT structure
    #[arg(long)]
    dump: bool,

    #[arg(allow_negative_numbers = true)]
    x: i32,
    #[arg(allow_negative_numbers = true)]
    y: i32,
    #[arg(allow_negative_numbers = true)]
    z: i32,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let args = Args::parse();

    let chunk_x = block_to_chunk(args.x);
    let chunk_z = block_to_chunk(args.z);
    let section_y = block_to_chunk(args.y) as i8;
    let region_x = chunk_to_region(chunk_x);
    let region_z = chunk_to_region(chunk_z);
    println!(
        "chunk ({}, {}), section {}, region ({}, {})",
        chunk_x, chunk_z, section_y, region_x, region_z
    );

    let path = args
        .world
        .join("region")
        .join(format!("r.{}.{}.mca", region_x, region_z));
    let mut region = Region::open(&path)?;
    let slot = chunk_to_slot(chunk_x, chunk_z);
    let Some(data) = region.read(slot)? else {
        println!("slot {} of {} is vacant", slot, path.display());
        return Ok(());
    };

    if args.dump {
        println!("{}", Nbt::parse_document(&data)?.dump());
    }

    let chunk = Chunk::parse(&data, chunk_x, chunk_z)?;
    let Some(section) = chunk.section_at(section_y) else {
        println!("chunk has no section at y index {}", section_y);
        return Ok(());
    };

    let local_x = block_in_chunk(args.x) as u32;
    let local_y = block_in_chunk(args.y) as u32;
    let local_z = block_in_chunk(args.z) as u32;
    let index = section_index(local_x, local_y, local_z);
    println!(
        "local ({}, {}, {}), data index {}",
        local_x, local_y, local_z, index
    );

    let name = match section.palette.as_slice() {
        [] => return Err("section has an empty palette".into()),
        [only] => &only.name,
        entries => {
            let packed =
                PackedIndices::new(&section.data, bits_for(entries.len()), SECTION_VOLUME)?;
            let palette_index = packed.get(index).unwrap_or_default() as usize;
            &entries
                .get(palette_index)
                .ok_or("decoded palette index out of range")?
                .name
        }
    };
    println!("block: {}", name);

    if let Some(block_list) = &args.block_list {
        let palette = GlobalPalette::load(block_list)?;
        match palette.id(name) {
            Some(id) => println!("global id: {}", id),
            None => println!("global id: not in {}", block_list.display()),
        }
    }
    Ok(())
}
