use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use mcvox_util::{ReadBe, REGION_SLOTS};

use super::{inflate, AnvilError};

const SECTOR_BYTES: u64 = 4096;

/// One `.mca` region file: a 1024-entry location table in the first sector,
/// then 4 KiB-aligned chunk frames.
#[derive(Debug)]
pub struct Region<R> {
    source: R,
    // (sector offset, sector count) straight from the table; a zero entry
    // means the slot holds no chunk.
    locations: [(u32, u32); REGION_SLOTS],
}

impl Region<File> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AnvilError> {
        Region::load(File::open(path)?)
    }
}

impl<R: Read + Seek> Region<R> {
    pub fn load(mut source: R) -> Result<Self, AnvilError> {
        source.rewind()?;
        let raw: [u8; 4 * REGION_SLOTS] = source.array()?;
        Ok(Self {
            source,
            locations: std::array::from_fn(|i| {
                let offset = ((raw[i * 4] as u32) << 16)
                    | ((raw[i * 4 + 1] as u32) << 8)
                    | (raw[i * 4 + 2] as u32);
                (offset, raw[i * 4 + 3] as u32)
            }),
        })
    }

    /// Read and inflate the chunk frame in the given slot. `Ok(None)` means
    /// the slot is vacant; a frame compressed with anything but zlib is an
    /// error the caller is expected to contain per chunk.
    pub fn read(&mut self, slot: usize) -> Result<Option<Vec<u8>>, AnvilError> {
        let (offset, sectors) = self.locations[slot];
        if offset == 0 && sectors == 0 {
            return Ok(None);
        }
        self.source
            .seek(SeekFrom::Start(offset as u64 * SECTOR_BYTES))?;
        // Frame header: length counts the compression byte plus the payload.
        let length = self.source.be_u32()?;
        if length <= 1 {
            return Ok(None);
        }
        let compression = self.source.be_u8()?;
        let compressed = ReadBe::bytes(&mut self.source, length as usize - 1)?;
        match compression {
            2 => Ok(Some(inflate(&compressed)?)),
            1 => Err(AnvilError::RegionUnsupportedCompression("GZip".to_owned())),
            3 => Err(AnvilError::RegionUnsupportedCompression(
                "Uncompressed".to_owned(),
            )),
            4 => Err(AnvilError::RegionUnsupportedCompression("LZ4".to_owned())),
            127 => Err(AnvilError::RegionUnsupportedCompression(
                "Custom".to_owned(),
            )),
            other => Err(AnvilError::RegionUnknownCompression(other)),
        }
    }

    /// Slots whose location entry is non-zero, cheap to compute up front.
    pub fn occupied_slots(&self) -> impl Iterator<Item = usize> + '_ {
        (0..REGION_SLOTS).filter(|slot| self.locations[*slot] != (0, 0))
    }
}

/// Region coordinates from a `r.<X>.<Z>.mca` filename; anything else is
/// not a region file.
pub fn parse_region_filename(name: &str) -> Option<(i32, i32)> {
    let rest = name.strip_prefix("r.")?.strip_suffix(".mca")?;
    let (x, z) = rest.split_once('.')?;
    Some((x.parse().ok()?, z.parse().ok()?))
}

/// The region files of a world's `region/` directory, with their parsed
/// coordinates. Non-region files are ignored.
pub fn region_files(dir: &Path) -> Result<Vec<(PathBuf, i32, i32)>, AnvilError> {
    let mut found = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some((region_x, region_z)) = name.to_str().and_then(parse_region_filename) else {
            continue;
        };
        found.push((entry.path(), region_x, region_z));
    }
    found.sort();
    Ok(found)
}

#[cfg(test)]
mod test {
    use std::io::Cursor;

    use super::{parse_region_filename, Region};
    use crate::AnvilError;

    /// Assemble an in-memory `.mca`: location/timestamp tables followed by
    /// one frame per chunk, each padded to whole sectors.
    pub(crate) fn build_region(chunks: &[(usize, u8, Vec<u8>)]) -> Vec<u8> {
        let mut file = vec![0u8; 8192];
        let mut next_sector = 2u32;
        for (slot, compression, payload) in chunks {
            let frame_len = 4 + 1 + payload.len();
            let sectors = frame_len.div_ceil(4096) as u32;
            let entry = &mut file[slot * 4..slot * 4 + 4];
            entry[0] = (next_sector >> 16) as u8;
            entry[1] = (next_sector >> 8) as u8;
            entry[2] = next_sector as u8;
            entry[3] = sectors as u8;

            let mut frame = Vec::with_capacity(frame_len);
            frame.extend_from_slice(&(payload.len() as u32 + 1).to_be_bytes());
            frame.push(*compression);
            frame.extend_from_slice(payload);
            frame.resize(sectors as usize * 4096, 0);
            file.extend_from_slice(&frame);
            next_sector += sectors;
        }
        file
    }

    fn deflate(data: &[u8]) -> Vec<u8> {
        use std::io::Write as _;
        let mut encoder =
            flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn vacant_slots_read_as_none() {
        let file = build_region(&[]);
        let mut region = Region::load(Cursor::new(file)).unwrap();
        assert_eq!(region.occupied_slots().count(), 0);
        for slot in [0, 31, 512, 1023] {
            assert!(region.read(slot).unwrap().is_none());
        }
    }

    #[test]
    fn zlib_frame_round_trips() {
        let payload = b"not actually nbt, but faithful bytes".to_vec();
        let file = build_region(&[(37, 2, deflate(&payload))]);
        let mut region = Region::load(Cursor::new(file)).unwrap();
        assert_eq!(region.occupied_slots().collect::<Vec<_>>(), vec![37]);
        assert_eq!(region.read(37).unwrap().unwrap(), payload);
    }

    #[test]
    fn gzip_frame_is_unsupported() {
        let file = build_region(&[(0, 1, b"gzip bytes".to_vec())]);
        let mut region = Region::load(Cursor::new(file)).unwrap();
        assert!(matches!(
            region.read(0),
            Err(AnvilError::RegionUnsupportedCompression(_))
        ));
    }

    #[test]
    fn unknown_compression_is_an_error() {
        let file = build_region(&[(5, 9, b"???".to_vec())]);
        let mut region = Region::load(Cursor::new(file)).unwrap();
        assert!(matches!(
            region.read(5),
            Err(AnvilError::RegionUnknownCompression(9))
        ));
    }

    #[test]
    fn truncated_table_is_an_error() {
        assert!(Region::load(Cursor::new(vec![0u8; 100])).is_err());
    }

    #[test]
    fn filename_parsing() {
        assert_eq!(parse_region_filename("r.0.0.mca"), Some((0, 0)));
        assert_eq!(parse_region_filename("r.-1.0.mca"), Some((-1, 0)));
        assert_eq!(parse_region_filename("r.12.-34.mca"), Some((12, -34)));
        assert_eq!(parse_region_filename("r.1.2.mcc"), None);
        assert_eq!(parse_region_filename("level.dat"), None);
        assert_eq!(parse_region_filename("r.a.b.mca"), None);
    }
}
