//! Opacity array blob encoding
//!
//! Opacity curves and the wavenumber grid are stored as BLOB columns holding
//! the little-endian IEEE-754 bytes of each `f64`, back to back. Decoding is
//! bit-exact, so a curve read back compares equal bit for bit.

use anyhow::{anyhow, Result};

/// Size in bytes of one encoded sample
pub const SAMPLE_SIZE: usize = std::mem::size_of::<f64>();

/// Encode a slice of samples into blob bytes
pub fn encode_f64s(values: &[f64]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(values.len() * SAMPLE_SIZE);
    for value in values {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Decode blob bytes back into samples
///
/// Fails if the blob length is not a multiple of the sample size.
pub fn decode_f64s(bytes: &[u8]) -> Result<Vec<f64>> {
    if bytes.len() % SAMPLE_SIZE != 0 {
        return Err(anyhow!(
            "Malformed opacity blob: {} bytes is not a multiple of {}",
            bytes.len(),
            SAMPLE_SIZE
        ));
    }

    Ok(bytes
        .chunks_exact(SAMPLE_SIZE)
        .map(|chunk| {
            let mut buf = [0u8; SAMPLE_SIZE];
            buf.copy_from_slice(chunk);
            f64::from_le_bytes(buf)
        })
        .collect())
}

/// Number of samples held by an encoded blob, without decoding it
pub fn sample_count(bytes: &[u8]) -> Result<usize> {
    if bytes.len() % SAMPLE_SIZE != 0 {
        return Err(anyhow!(
            "Malformed opacity blob: {} bytes is not a multiple of {}",
            bytes.len(),
            SAMPLE_SIZE
        ));
    }
    Ok(bytes.len() / SAMPLE_SIZE)
}
