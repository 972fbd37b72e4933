use flate2::{Decompress, FlushDecompress, Status};

use super::AnvilError;

/// Inflate one zlib-compressed chunk frame.
///
/// The output buffer starts at ten times the compressed size; if that turns
/// out too small the buffer is doubled and inflation restarts from the
/// beginning. The loop has no iteration cap: region chunks have a bounded
/// inflation ratio, so it terminates within a few doublings.
pub fn inflate(compressed: &[u8]) -> Result<Vec<u8>, AnvilError> {
    let mut capacity = compressed.len().saturating_mul(10).max(64);
    loop {
        let mut output = vec![0u8; capacity];
        let mut zlib = Decompress::new(true);
        match zlib.decompress(compressed, &mut output, FlushDecompress::Finish)? {
            Status::StreamEnd => {
                output.truncate(zlib.total_out() as usize);
                return Ok(output);
            }
            Status::Ok | Status::BufError => {
                if (zlib.total_out() as usize) < output.len() {
                    // Stalled with output space left: out of input, not
                    // out of room. Growing would never terminate.
                    return Err(AnvilError::InflateTruncated);
                }
                capacity *= 2;
            }
        }
    }
}

#[cfg(test)]
mod test {
    use std::io::Write as _;

    use flate2::{write::ZlibEncoder, Compression};

    use super::inflate;
    use crate::AnvilError;

    fn deflate(data: &[u8]) -> Vec<u8> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn round_trip() {
        let data = b"the quick brown fox jumps over the lazy dog".repeat(50);
        assert_eq!(inflate(&deflate(&data)).unwrap(), data);
    }

    #[test]
    fn grows_past_the_initial_estimate() {
        // A megabyte of zeros deflates to well under a kilobyte, so the
        // 10x initial buffer is forced through several doublings.
        let data = vec![0u8; 1 << 20];
        let compressed = deflate(&data);
        assert!(compressed.len() * 10 < data.len());
        assert_eq!(inflate(&compressed).unwrap(), data);
    }

    #[test]
    fn malformed_stream_is_an_error() {
        let mut compressed = deflate(b"payload");
        compressed[2] ^= 0xFF;
        assert!(matches!(
            inflate(&compressed),
            Err(AnvilError::InflateFailed(_))
        ));
    }

    #[test]
    fn empty_input_is_an_error() {
        assert!(inflate(&[]).is_err());
    }
}
