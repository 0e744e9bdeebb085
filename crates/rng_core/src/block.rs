//! Block sentinel helpers.
//!
//! A block with no valid data has every slot set to NaN. Validity is decided
//! on the first element only.
//!
//! Blocks are persisted as flat arrays of native-endian `f64` with no header;
//! [`encode`] and [`decode_into`] convert between the two representations.

use crate::VALUE_SIZE;

/// Marker value written into every slot of an invalid block.
pub const SENTINEL: f64 = f64::NAN;

/// Overwrites the whole block with the sentinel.
#[inline]
pub fn invalidate(block: &mut [f64]) {
    block.fill(SENTINEL);
}

/// Returns `true` if the block holds data.
///
/// Empty blocks are considered invalid.
#[inline]
pub fn is_valid(block: &[f64]) -> bool {
    block.first().is_some_and(|value| !value.is_nan())
}

/// Allocates a block of `len` values already marked invalid.
#[inline]
pub fn invalid_block(len: usize) -> Vec<f64> {
    vec![SENTINEL; len]
}

/// Serialises `values` as native-endian bytes.
pub fn encode(values: &[f64]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(values.len() * VALUE_SIZE);
    for value in values {
        bytes.extend_from_slice(&value.to_ne_bytes());
    }
    bytes
}

/// Decodes native-endian values from `bytes` into `out`, returning how many
/// whole values were written. A trailing partial value is ignored.
pub fn decode_into(bytes: &[u8], out: &mut [f64]) -> usize {
    let mut count = 0;
    for (slot, chunk) in out.iter_mut().zip(bytes.chunks_exact(VALUE_SIZE)) {
        let mut raw = [0u8; VALUE_SIZE];
        raw.copy_from_slice(chunk);
        *slot = f64::from_ne_bytes(raw);
        count += 1;
    }
    count
}
