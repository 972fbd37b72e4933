use mcvox_grid::VoxelAccessor;
use mcvox_util::{bits_for, section_coords, PackedIndices, SECTION_VOLUME};

use super::{AnvilError, Chunk, GlobalPalette, Section, VoxelWriter};

/// Emit the 4096 voxels of one section in canonical raster order (data
/// index 0..4096, i.e. y-major, then z, then x), mapped through the global
/// palette.
///
/// With a unary palette the words are ignored (vanilla omits them) and the
/// single id fills the cube; otherwise indices are unpacked LSB-first at
/// `max(4, ceil(log2(P)))` bits per index.
pub fn decode_section<A: VoxelAccessor>(
    palette: &GlobalPalette,
    section: &Section,
    x_offset: i32,
    z_offset: i32,
    writer: &mut VoxelWriter<'_, A>,
) -> Result<(), AnvilError> {
    let y_offset = section.y_offset();
    let global: Vec<u32> = section
        .palette
        .iter()
        .map(|entry| {
            palette
                .id(&entry.name)
                .ok_or_else(|| AnvilError::UnknownBlock(entry.name.clone()))
        })
        .collect::<Result<_, _>>()?;

    match global.as_slice() {
        [] => Err(AnvilError::EmptyPalette),
        [only] => {
            for index in 0..SECTION_VOLUME {
                let (x, y, z) = section_coords(index);
                writer.write(
                    x_offset + x as i32,
                    y_offset + y as i32,
                    z_offset + z as i32,
                    *only as i32,
                );
            }
            Ok(())
        }
        ids => {
            let packed = PackedIndices::new(&section.data, bits_for(ids.len()), SECTION_VOLUME)?;
            for (index, palette_index) in packed.iter().enumerate() {
                // Masking bounds the index to 2^bits, not to the palette
                // length, so a corrupt stream can still land past the end.
                let Some(id) = ids.get(palette_index as usize) else {
                    return Err(AnvilError::PaletteIndexOutOfRange {
                        index: palette_index as usize,
                        len: ids.len(),
                    });
                };
                let (x, y, z) = section_coords(index);
                writer.write(
                    x_offset + x as i32,
                    y_offset + y as i32,
                    z_offset + z as i32,
                    *id as i32,
                );
            }
            Ok(())
        }
    }
}

/// Decode every section of a chunk at or above the vertical cutoff, in file
/// order.
pub fn decode_chunk<A: VoxelAccessor>(
    palette: &GlobalPalette,
    chunk: &Chunk,
    minimum_section_y: i8,
    writer: &mut VoxelWriter<'_, A>,
) -> Result<(), AnvilError> {
    let x_offset = chunk.x_offset();
    let z_offset = chunk.z_offset();
    for section in &chunk.sections {
        if section.y < minimum_section_y {
            continue;
        }
        decode_section(palette, section, x_offset, z_offset, writer)?;
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use std::collections::HashMap;

    use rand::rngs::StdRng;
    use rand::{Rng as _, SeedableRng as _};

    use mcvox_util::{bits_for, pack_indices, section_index, PackedIndices, SECTION_VOLUME};

    use crate::{AnvilError, Chunk, GlobalPalette, PaletteEntry, Section, VoxelWriter};

    use super::{decode_chunk, decode_section};

    fn test_palette() -> GlobalPalette {
        let names: Vec<String> = std::iter::once("minecraft:air".to_owned())
            .chain((1..4096).map(|i| format!("minecraft:block_{}", i)))
            .collect();
        GlobalPalette::parse(&names.join("\n"), "test").unwrap()
    }

    fn stone_17_palette() -> GlobalPalette {
        // 18 lines; "minecraft:stone" lands on id 17.
        let mut names: Vec<String> = (0..17).map(|i| format!("filler_{}", i)).collect();
        names[0] = "minecraft:air".to_owned();
        names.push("minecraft:stone".to_owned());
        GlobalPalette::parse(&names.join("\n"), "test").unwrap()
    }

    fn section(y: i8, palette: &[&str], data: Vec<i64>) -> Section {
        Section {
            y,
            palette: palette
                .iter()
                .map(|name| PaletteEntry {
                    name: (*name).to_owned(),
                })
                .collect(),
            data,
        }
    }

    #[test]
    fn unary_section_fills_the_cube() {
        let palette = stone_17_palette();
        let mut sink: HashMap<(i32, i32, i32), i32> = HashMap::new();
        let mut writer = VoxelWriter::new(&mut sink);
        decode_section(
            &palette,
            &section(0, &["minecraft:stone"], vec![]),
            0,
            0,
            &mut writer,
        )
        .unwrap();
        assert_eq!(writer.written(), 4096);
        assert_eq!(sink.len(), 4096);
        assert!(sink.values().all(|v| *v == 17));
        assert!(sink
            .keys()
            .all(|(x, y, z)| (0..16).contains(x) && (0..16).contains(y) && (0..16).contains(z)));
    }

    #[test]
    fn unary_air_section_emits_nothing() {
        let palette = test_palette();
        let mut sink: HashMap<(i32, i32, i32), i32> = HashMap::new();
        let mut writer = VoxelWriter::new(&mut sink);
        decode_section(
            &palette,
            &section(0, &["minecraft:air"], vec![]),
            0,
            0,
            &mut writer,
        )
        .unwrap();
        assert!(sink.is_empty());
    }

    #[test]
    fn binary_palette_four_bit_packing() {
        let palette = test_palette();
        // 16 indices per word, all pointing at palette entry 1.
        let data = vec![0x1111_1111_1111_1111u64 as i64; 256];
        let mut sink: HashMap<(i32, i32, i32), i32> = HashMap::new();
        let mut writer = VoxelWriter::new(&mut sink);
        decode_section(
            &palette,
            &section(0, &["minecraft:air", "minecraft:block_1"], data),
            0,
            0,
            &mut writer,
        )
        .unwrap();
        assert_eq!(writer.written(), 4096);
        assert!(sink.values().all(|v| *v == 1));
    }

    #[test]
    fn section_offsets_place_voxels_in_the_world() {
        let palette = test_palette();
        let mut sink: HashMap<(i32, i32, i32), i32> = HashMap::new();
        let mut writer = VoxelWriter::new(&mut sink);
        decode_section(
            &palette,
            &section(6, &["minecraft:block_2"], vec![]),
            -48,
            48,
            &mut writer,
        )
        .unwrap();
        // Section y=6 covers block y 96..112; all voxels inside it.
        assert!(sink
            .keys()
            .all(|(x, y, z)| (-48..-32).contains(x) && (96..112).contains(y) && (48..64).contains(z)));
        assert_eq!(sink.get(&(-41, 104, 62)), Some(&2));
    }

    #[test]
    fn five_bit_packing_recovers_designed_indices() {
        let palette = test_palette();
        let names: Vec<String> = (0..20)
            .map(|i| {
                if i == 0 {
                    "minecraft:air".to_owned()
                } else {
                    format!("minecraft:block_{}", i)
                }
            })
            .collect();
        let name_refs: Vec<&str> = names.iter().map(|s| s.as_str()).collect();

        // P = 20 -> 5 bits, 12 per word, 341 full words + 4 in the tail.
        let indices: Vec<u64> = (0..SECTION_VOLUME as u64).map(|d| (d * 7) % 20).collect();
        let data = pack_indices(indices.iter().copied(), 5);
        assert_eq!(data.len(), 342);

        let mut sink: HashMap<(i32, i32, i32), i32> = HashMap::new();
        let mut writer = VoxelWriter::new(&mut sink);
        decode_section(&palette, &section(0, &name_refs, data), 0, 0, &mut writer).unwrap();
        for (d, expected) in indices.iter().enumerate() {
            let (x, y, z) = mcvox_util::section_coords(d);
            let got = sink.get(&(x as i32, y as i32, z as i32)).copied().unwrap_or(0);
            assert_eq!(got as u64, *expected, "data index {}", d);
        }
    }

    #[test]
    fn eight_entry_palette_splits_exactly() {
        // P = 8 -> 4 bits, 16 per word: 255 full words and a full tail of 16.
        let indices: Vec<u64> = (0..SECTION_VOLUME as u64).map(|d| d % 8).collect();
        let data = pack_indices(indices.iter().copied(), 4);
        assert_eq!(data.len(), 256);

        let palette = test_palette();
        let names: Vec<String> = (0..8)
            .map(|i| {
                if i == 0 {
                    "minecraft:air".to_owned()
                } else {
                    format!("minecraft:block_{}", i)
                }
            })
            .collect();
        let name_refs: Vec<&str> = names.iter().map(|s| s.as_str()).collect();
        let mut sink: HashMap<(i32, i32, i32), i32> = HashMap::new();
        let mut writer = VoxelWriter::new(&mut sink);
        decode_section(&palette, &section(0, &name_refs, data), 0, 0, &mut writer).unwrap();
        // One eighth of the indices are air.
        assert_eq!(writer.written(), 4096 - 512);
        assert_eq!(sink.get(&(7, 0, 0)), Some(&7));
    }

    #[test]
    fn empty_palette_is_fatal() {
        let palette = test_palette();
        let mut sink: HashMap<(i32, i32, i32), i32> = HashMap::new();
        let mut writer = VoxelWriter::new(&mut sink);
        assert!(matches!(
            decode_section(&palette, &section(0, &[], vec![]), 0, 0, &mut writer),
            Err(AnvilError::EmptyPalette)
        ));
    }

    #[test]
    fn unknown_block_name_is_fatal() {
        let palette = test_palette();
        let mut sink: HashMap<(i32, i32, i32), i32> = HashMap::new();
        let mut writer = VoxelWriter::new(&mut sink);
        let err = decode_section(
            &palette,
            &section(0, &["minecraft:not_in_the_list"], vec![]),
            0,
            0,
            &mut writer,
        )
        .unwrap_err();
        assert!(matches!(err, AnvilError::UnknownBlock(name) if name == "minecraft:not_in_the_list"));
    }

    #[test]
    fn out_of_range_index_is_fatal() {
        let palette = test_palette();
        // Three palette entries need 4 bits; an index of 5 fits the mask
        // but not the palette.
        let data = pack_indices((0..SECTION_VOLUME as u64).map(|_| 5), 4);
        let mut sink: HashMap<(i32, i32, i32), i32> = HashMap::new();
        let mut writer = VoxelWriter::new(&mut sink);
        assert!(matches!(
            decode_section(
                &palette,
                &section(
                    0,
                    &["minecraft:air", "minecraft:block_1", "minecraft:block_2"],
                    data
                ),
                0,
                0,
                &mut writer,
            ),
            Err(AnvilError::PaletteIndexOutOfRange { index: 5, len: 3 })
        ));
    }

    #[test]
    fn missing_data_for_plural_palette_is_fatal() {
        let palette = test_palette();
        let mut sink: HashMap<(i32, i32, i32), i32> = HashMap::new();
        let mut writer = VoxelWriter::new(&mut sink);
        assert!(decode_section(
            &palette,
            &section(0, &["minecraft:air", "minecraft:block_1"], vec![]),
            0,
            0,
            &mut writer,
        )
        .is_err());
    }

    #[test]
    fn chunk_filter_drops_sections_below_the_cutoff() {
        let palette = test_palette();
        let chunk = Chunk {
            chunk_x: 0,
            chunk_z: 0,
            sections: vec![
                section(-1, &["minecraft:block_1"], vec![]),
                section(0, &["minecraft:block_2"], vec![]),
                section(2, &["minecraft:block_3"], vec![]),
            ],
        };
        let mut sink: HashMap<(i32, i32, i32), i32> = HashMap::new();
        let mut writer = VoxelWriter::new(&mut sink);
        decode_chunk(&palette, &chunk, 0, &mut writer).unwrap();
        assert_eq!(writer.written(), 2 * 4096);
        assert!(sink.keys().all(|(_, y, _)| *y >= 0));
        assert_eq!(sink.get(&(0, -1, 0)), None);
        assert_eq!(sink.get(&(0, 0, 0)), Some(&2));
        assert_eq!(sink.get(&(0, 32, 0)), Some(&3));
    }

    /// Random palettes and data: decode must emit 4096 voxels worth of
    /// indices, never exceed the palette, and repack to the original words.
    #[test]
    fn random_sections_repack_to_the_same_words() {
        let mut rng = StdRng::seed_from_u64(0x6d63766f78);
        let global = test_palette();
        for _ in 0..50 {
            let len: usize = rng.gen_range(2..=4096);
            let bits = bits_for(len);
            let indices: Vec<u64> = (0..SECTION_VOLUME)
                .map(|_| rng.gen_range(0..len as u64))
                .collect();
            let data = pack_indices(indices.iter().copied(), bits);

            let names: Vec<String> = (0..len)
                .map(|i| {
                    if i == 0 {
                        "minecraft:air".to_owned()
                    } else {
                        format!("minecraft:block_{}", i)
                    }
                })
                .collect();
            let name_refs: Vec<&str> = names.iter().map(|s| s.as_str()).collect();

            let mut sink: HashMap<(i32, i32, i32), i32> = HashMap::new();
            let mut writer = VoxelWriter::new(&mut sink);
            decode_section(&global, &section(0, &name_refs, data.clone()), 0, 0, &mut writer)
                .unwrap();

            // Reconstruct the per-voxel indices from the sink (missing
            // entries are air, index 0 by construction of the palette).
            let decoded: Vec<u64> = (0..SECTION_VOLUME)
                .map(|d| {
                    let (x, y, z) = mcvox_util::section_coords(d);
                    sink.get(&(x as i32, y as i32, z as i32))
                        .map(|v| *v as u64)
                        .unwrap_or(0)
                })
                .collect();
            assert!(decoded.iter().all(|v| (*v as usize) < len));
            assert_eq!(pack_indices(decoded.into_iter(), bits), data);

            // And the packed view itself reads back the designed indices.
            let packed = PackedIndices::new(&data, bits, SECTION_VOLUME).unwrap();
            assert_eq!(packed.get(section_index(0, 0, 0)), Some(indices[0]));
        }
    }
}
