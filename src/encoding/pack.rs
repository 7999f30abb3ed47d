//! Slot-layout encoder
//!
//! Maps plaintext matrices and vectors onto fixed-width slot vectors and
//! back. All layouts share a block width `row_size` (a power of two) and a
//! block count `col_size = num_slots / row_size`.
//!
//! | layout | slot `i` holds |
//! |--------|----------------|
//! | `MatRowMajor` | `M[i / row_size][i % row_size]` |
//! | `VecRowCloned` | `v[i % row_size]` |
//! | `VecColCloned` | `v[i / row_size]` |
//! | `DualPacked` | `a[i % row_size]` in even blocks, `b[i % row_size]` in odd blocks |
//!
//! Entries past the logical size are padding.

use crate::encoding::clone::{pad_to, repeat_each, rotate_slots, tile};
use crate::encoding::layout::{SlotLayout, SlotVector};
use crate::error::{config_err, Error, Result};
use crate::math::{next_pow2, PlainMatrix};

/// Check `row_size * col_size == num_slots` and return `col_size`
fn block_count(row_size: usize, num_slots: usize) -> Result<usize> {
    if !num_slots.is_power_of_two() {
        return Err(config_err!(
            "slot count {} is not a power of two",
            num_slots
        ));
    }
    if !row_size.is_power_of_two() {
        return Err(config_err!("row size {} is not a power of two", row_size));
    }
    if row_size > num_slots {
        return Err(Error::CapacityExceeded {
            what: "row block",
            len: row_size,
            capacity: num_slots,
        });
    }
    Ok(num_slots / row_size)
}

/// Padded `(col_size, row_size)` for a `num_rows x num_cols` matrix in `num_slots` slots
///
/// `row_size` is the smallest power of two `>= num_cols` and
/// `col_size = num_slots / row_size`. Fails if the matrix is empty or does
/// not fit.
pub fn compute_padded_dimensions(
    num_rows: usize,
    num_cols: usize,
    num_slots: usize,
) -> Result<(usize, usize)> {
    if num_rows == 0 || num_cols == 0 {
        return Err(config_err!(
            "empty input matrix ({} x {})",
            num_rows,
            num_cols
        ));
    }
    if num_cols > num_slots {
        return Err(Error::CapacityExceeded {
            what: "matrix row",
            len: num_cols,
            capacity: num_slots,
        });
    }
    let row_size = next_pow2(num_cols);
    let col_size = block_count(row_size, num_slots)?;
    if num_rows > col_size {
        return Err(Error::CapacityExceeded {
            what: "matrix row count",
            len: num_rows,
            capacity: col_size,
        });
    }
    Ok((col_size, row_size))
}

/// Encode a matrix row by row, each row padded to `row_size`
pub fn encode_matrix_row_major(
    matrix: &PlainMatrix,
    row_size: usize,
    num_slots: usize,
) -> Result<SlotVector<f64>> {
    let col_size = block_count(row_size, num_slots)?;
    if matrix.cols() > row_size {
        return Err(Error::CapacityExceeded {
            what: "matrix row",
            len: matrix.cols(),
            capacity: row_size,
        });
    }
    if matrix.rows() > col_size {
        return Err(Error::CapacityExceeded {
            what: "matrix row count",
            len: matrix.rows(),
            capacity: col_size,
        });
    }

    let mut slots = vec![0.0; num_slots];
    for (r, row) in matrix.iter_rows().enumerate() {
        let start = r * row_size;
        slots[start..start + row.len()].copy_from_slice(row);
    }
    Ok(SlotVector::new(
        slots,
        SlotLayout::MatRowMajor { row_size, col_size },
    ))
}

/// Pad `vector` to `row_size` and tile it over all slots
pub fn encode_vector_row_cloned<T: Copy>(
    vector: &[T],
    row_size: usize,
    num_slots: usize,
    pad: T,
) -> Result<SlotVector<T>> {
    block_count(row_size, num_slots)?;
    let padded = pad_to(vector, row_size, pad, "row-cloned vector")?;
    let slots = tile(&padded, num_slots, pad)?;
    Ok(SlotVector::new(slots, SlotLayout::VecRowCloned { row_size }))
}

/// Pad `vector` to `num_slots / row_size` and repeat each entry `row_size` times
pub fn encode_vector_column_cloned<T: Copy>(
    vector: &[T],
    row_size: usize,
    num_slots: usize,
    pad: T,
) -> Result<SlotVector<T>> {
    let col_size = block_count(row_size, num_slots)?;
    let padded = pad_to(vector, col_size, pad, "column-cloned vector")?;
    let slots = repeat_each(&padded, num_slots, pad)?;
    Ok(SlotVector::new(slots, SlotLayout::VecColCloned { row_size }))
}

/// Row-clone `a` and `b`, keep `a` in even blocks and `b` in odd blocks
///
/// Needs at least two blocks so both vectors are present.
pub fn encode_dual_packed<T: Copy>(
    a: &[T],
    b: &[T],
    row_size: usize,
    num_slots: usize,
    pad: T,
) -> Result<SlotVector<T>> {
    if a.len() != b.len() {
        return Err(config_err!(
            "dual-packed vectors differ in length ({} vs {})",
            a.len(),
            b.len()
        ));
    }
    let col_size = block_count(row_size, num_slots)?;
    if col_size < 2 {
        return Err(config_err!(
            "dual packing needs at least two blocks of {} slots, have {} slots",
            row_size,
            num_slots
        ));
    }

    let a = encode_vector_row_cloned(a, row_size, num_slots, pad)?.into_values();
    let b = encode_vector_row_cloned(b, row_size, num_slots, pad)?.into_values();
    let slots = a
        .into_iter()
        .zip(b)
        .enumerate()
        .map(|(i, (x, y))| if (i / row_size) % 2 == 0 { x } else { y })
        .collect();
    Ok(SlotVector::new(slots, SlotLayout::DualPacked { row_size }))
}

/// Complementary 0/1 masks selecting the even (`theta`) and odd (`phi`) blocks
#[derive(Clone, Debug)]
pub struct ExtractionMasks {
    theta: SlotVector<f64>,
    phi: SlotVector<f64>,
}

impl ExtractionMasks {
    /// Mask over the even blocks
    pub fn theta(&self) -> &SlotVector<f64> {
        &self.theta
    }

    /// Mask over the odd blocks
    pub fn phi(&self) -> &SlotVector<f64> {
        &self.phi
    }

    /// Block width
    pub fn row_size(&self) -> usize {
        self.theta.layout().row_size()
    }
}

/// Build the extraction masks for dual-packed operands
pub fn build_extraction_masks(row_size: usize, num_slots: usize) -> Result<ExtractionMasks> {
    let ones = vec![1.0; row_size];
    let zeros = vec![0.0; row_size];
    Ok(ExtractionMasks {
        theta: encode_dual_packed(&ones, &zeros, row_size, num_slots, 0.0)?,
        phi: encode_dual_packed(&zeros, &ones, row_size, num_slots, 0.0)?,
    })
}

/// Plaintext dual extraction: mask, then add the copy rotated by `±row_size`
///
/// Same steps the encrypted optimizer performs; both outputs are row-cloned.
pub fn extract_duals_plain(
    packed: &SlotVector<f64>,
    masks: &ExtractionMasks,
) -> Result<(SlotVector<f64>, SlotVector<f64>)> {
    let row_size = masks.row_size();
    packed
        .layout()
        .expect(SlotLayout::DualPacked { row_size })?;
    if packed.len() != masks.theta().len() {
        return Err(Error::CapacityExceeded {
            what: "dual-packed vector",
            len: packed.len(),
            capacity: masks.theta().len(),
        });
    }

    let recover = |mask: &SlotVector<f64>, offset: i64| {
        let masked: Vec<f64> = packed
            .values()
            .iter()
            .zip(mask.values())
            .map(|(v, m)| v * m)
            .collect();
        let rotated = rotate_slots(&masked, offset);
        let values = masked.iter().zip(&rotated).map(|(a, b)| a + b).collect();
        SlotVector::new(values, SlotLayout::VecRowCloned { row_size })
    };

    Ok((
        recover(masks.theta(), row_size as i64),
        recover(masks.phi(), -(row_size as i64)),
    ))
}

/// First slot whose value differs from `reference(i)` by more than `tolerance`
fn clone_mismatch(
    values: &[f64],
    tolerance: f64,
    reference: impl Fn(usize) -> usize,
) -> Option<(usize, f64)> {
    values.iter().enumerate().find_map(|(i, &v)| {
        let diff = (v - values[reference(i)]).abs();
        (diff > tolerance).then_some((i, diff))
    })
}

fn disagreeing_clones(layout: SlotLayout, slot: usize, diff: f64) -> Error {
    Error::LayoutMismatch {
        expected: format!("{} with agreeing clones (slot {} is off by {:e})", layout.name(), slot, diff),
        found: layout,
    }
}

/// Recover the first `len` entries of a row-cloned vector
///
/// Every block must agree with the first one within `tolerance`.
pub fn decode_row_cloned(
    slots: &SlotVector<f64>,
    len: usize,
    tolerance: f64,
) -> Result<Vec<f64>> {
    let layout = slots.layout();
    let row_size = layout.row_size();
    layout.expect(SlotLayout::VecRowCloned { row_size })?;
    if len > row_size {
        return Err(Error::CapacityExceeded {
            what: "row-cloned vector",
            len,
            capacity: row_size,
        });
    }
    if let Some((slot, diff)) = clone_mismatch(slots.values(), tolerance, |i| i % row_size) {
        return Err(disagreeing_clones(layout, slot, diff));
    }
    Ok(slots.values()[..len].to_vec())
}

/// Recover the first `len` entries of a column-cloned vector
pub fn decode_column_cloned(
    slots: &SlotVector<f64>,
    len: usize,
    tolerance: f64,
) -> Result<Vec<f64>> {
    let layout = slots.layout();
    let row_size = layout.row_size();
    layout.expect(SlotLayout::VecColCloned { row_size })?;
    let col_size = slots.len() / row_size;
    if len > col_size {
        return Err(Error::CapacityExceeded {
            what: "column-cloned vector",
            len,
            capacity: col_size,
        });
    }
    if let Some((slot, diff)) = clone_mismatch(slots.values(), tolerance, |i| i - i % row_size)
    {
        return Err(disagreeing_clones(layout, slot, diff));
    }
    Ok((0..len).map(|i| slots.values()[i * row_size]).collect())
}

/// Recover the top-left `rows x cols` corner of a row-major matrix
pub fn decode_matrix_row_major(
    slots: &SlotVector<f64>,
    rows: usize,
    cols: usize,
) -> Result<PlainMatrix> {
    let (row_size, col_size) = match slots.layout() {
        SlotLayout::MatRowMajor { row_size, col_size } => (row_size, col_size),
        other => {
            return Err(Error::LayoutMismatch {
                expected: "MAT_ROW_MAJOR".to_string(),
                found: other,
            })
        }
    };
    if rows > col_size || cols > row_size {
        return Err(Error::CapacityExceeded {
            what: "decoded matrix",
            len: rows * cols,
            capacity: row_size * col_size,
        });
    }

    let mut matrix = PlainMatrix::zeros(rows, cols);
    for r in 0..rows {
        for c in 0..cols {
            matrix.set(r, c, slots.values()[r * row_size + c]);
        }
    }
    Ok(matrix)
}

/// Recover both vectors of a dual-packed slot vector
///
/// Even blocks must agree with block 0 and odd blocks with block 1.
pub fn decode_dual_packed(
    slots: &SlotVector<f64>,
    len: usize,
    tolerance: f64,
) -> Result<(Vec<f64>, Vec<f64>)> {
    let layout = slots.layout();
    let row_size = layout.row_size();
    layout.expect(SlotLayout::DualPacked { row_size })?;
    if len > row_size {
        return Err(Error::CapacityExceeded {
            what: "dual-packed vector",
            len,
            capacity: row_size,
        });
    }
    if slots.len() < 2 * row_size {
        return Err(config_err!(
            "dual-packed vector of {} slots holds fewer than two blocks of {}",
            slots.len(),
            row_size
        ));
    }
    let period = 2 * row_size;
    if let Some((slot, diff)) = clone_mismatch(slots.values(), tolerance, |i| i % period) {
        return Err(disagreeing_clones(layout, slot, diff));
    }

    let values = slots.values();
    Ok((
        values[..len].to_vec(),
        values[row_size..row_size + len].to_vec(),
    ))
}
