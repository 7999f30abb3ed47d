//! Generic clone and rotate helpers on raw slot data.
//!
//! These work on any `Copy` element with an explicit padding value, so the
//! same code builds `f64` slot vectors and `0/1` masks.

use crate::error::{Error, Result};

/// Tile `values` end-to-end until `num_slots` entries are filled
///
/// If `num_slots` is not a multiple of `values.len()` the tail is filled
/// with `pad`.
pub fn tile<T: Copy>(values: &[T], num_slots: usize, pad: T) -> Result<Vec<T>> {
    let n = values.len();
    if n > num_slots {
        return Err(Error::CapacityExceeded {
            what: "tiled vector",
            len: n,
            capacity: num_slots,
        });
    }
    if n == 0 {
        return Ok(vec![pad; num_slots]);
    }

    let mut out = Vec::with_capacity(num_slots);
    for _ in 0..num_slots / n {
        out.extend_from_slice(values);
    }
    out.resize(num_slots, pad);
    Ok(out)
}

/// Repeat each element of `values` `num_slots / values.len()` times in place
pub fn repeat_each<T: Copy>(values: &[T], num_slots: usize, pad: T) -> Result<Vec<T>> {
    let n = values.len();
    if n > num_slots {
        return Err(Error::CapacityExceeded {
            what: "replicated vector",
            len: n,
            capacity: num_slots,
        });
    }
    if n == 0 {
        return Ok(vec![pad; num_slots]);
    }

    let clones = num_slots / n;
    let mut out = Vec::with_capacity(num_slots);
    for &v in values {
        out.extend(std::iter::repeat(v).take(clones));
    }
    out.resize(num_slots, pad);
    Ok(out)
}

/// Zero-pad (with `pad`) `values` to exactly `len` entries
pub fn pad_to<T: Copy>(values: &[T], len: usize, pad: T, what: &'static str) -> Result<Vec<T>> {
    if values.len() > len {
        return Err(Error::CapacityExceeded {
            what,
            len: values.len(),
            capacity: len,
        });
    }
    let mut out = values.to_vec();
    out.resize(len, pad);
    Ok(out)
}

/// Cyclic left rotation: `out[i] = values[(i + offset) mod n]`
///
/// Negative offsets rotate right.
pub fn rotate_slots<T: Copy>(values: &[T], offset: i64) -> Vec<T> {
    let n = values.len();
    if n == 0 {
        return Vec::new();
    }
    let shift = offset.rem_euclid(n as i64) as usize;
    let mut out = Vec::with_capacity(n);
    out.extend_from_slice(&values[shift..]);
    out.extend_from_slice(&values[..shift]);
    out
}
