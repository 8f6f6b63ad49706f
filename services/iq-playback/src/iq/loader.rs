//! sc16 file loader
//!
//! Converts interleaved i16 pairs to `Complex<f32>` without scaling, so a
//! raw value of 100 stays 100.0.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

use num_complex::Complex;
use thiserror::Error;
use tracing::{debug, warn};

/// Bytes per complex sample: one i16 for I, one for Q
const BYTES_PER_SAMPLE: usize = 4;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read I/Q data")]
    Read(#[from] io::Error),

    #[error("no complete I/Q sample in {bytes} bytes of input")]
    NoSamples { bytes: usize },
}

/// Decode interleaved little-endian i16 (I, Q) pairs.
///
/// A trailing incomplete pair is ignored.
pub fn decode_cs16(bytes: &[u8]) -> Vec<Complex<f32>> {
    bytes
        .chunks_exact(BYTES_PER_SAMPLE)
        .map(|c| {
            let re = i16::from_le_bytes([c[0], c[1]]);
            let im = i16::from_le_bytes([c[2], c[3]]);
            Complex::new(f32::from(re), f32::from(im))
        })
        .collect()
}

/// Read every sample from `reader`.
pub fn read_cs16<R: Read>(mut reader: R) -> Result<Vec<Complex<f32>>, LoadError> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;

    let trailing = bytes.len() % BYTES_PER_SAMPLE;
    if trailing != 0 {
        warn!(
            "Ignoring {} trailing byte(s): input is not a whole number of I/Q pairs",
            trailing
        );
    }

    let samples = decode_cs16(&bytes);
    if samples.is_empty() {
        return Err(LoadError::NoSamples { bytes: bytes.len() });
    }

    debug!("Decoded {} samples from {} bytes", samples.len(), bytes.len());
    Ok(samples)
}

/// Load a recorded sc16 file.
pub fn load_cs16<P: AsRef<Path>>(path: P) -> Result<Vec<Complex<f32>>, LoadError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| LoadError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    read_cs16(BufReader::new(file))
}
