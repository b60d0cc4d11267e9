//! Lossless int <-> float bit reinterpretation and byte encoding.
//!
//! Integer headers (node masks, offsets, grid dimensions) share float
//! buffers with geometric payloads. These helpers are the only place the
//! reinterpretation happens; higher layers use named encode/decode pairs
//! built on top of them.

/// Reinterpret the bits of a signed integer as an `f32`.
#[inline]
pub fn int_as_float(value: i32) -> f32 {
    f32::from_bits(value as u32)
}

/// Reinterpret the bits of an `f32` as a signed integer.
#[inline]
pub fn float_as_int(value: f32) -> i32 {
    value.to_bits() as i32
}

/// Reinterpret the bits of an unsigned integer as an `f32`.
#[inline]
pub fn uint_as_float(value: u32) -> f32 {
    f32::from_bits(value)
}

/// Reinterpret the bits of an `f32` as an unsigned integer.
#[inline]
pub fn float_as_uint(value: f32) -> u32 {
    value.to_bits()
}

/// Serialize floats as little-endian bytes, bit patterns preserved.
pub fn f32s_to_le_bytes(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Parse little-endian floats; `None` when the length is not a multiple of 4.
pub fn f32s_from_le_bytes(bytes: &[u8]) -> Option<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return None;
    }
    Some(
        bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect(),
    )
}
