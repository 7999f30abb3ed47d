//! Slot-layout encoding
//!
//! Plaintext matrices and vectors are packed into fixed-width slot vectors
//! before encryption. Each slot vector carries a [`SlotLayout`] tag so that
//! protocol steps can reject operands packed the wrong way.
//!
//! # Example
//!
//! ```
//! use nesterov_he::encoding::{compute_padded_dimensions, encode_vector_row_cloned};
//!
//! let (col_size, row_size) = compute_padded_dimensions(4, 3, 16).unwrap();
//! assert_eq!((col_size, row_size), (4, 4));
//!
//! let theta = encode_vector_row_cloned(&[0.5, -1.0, 2.0], row_size, 16, 0.0).unwrap();
//! assert_eq!(&theta.values()[4..8], &[0.5, -1.0, 2.0, 0.0]);
//! ```

pub mod clone;
mod layout;
mod pack;

pub use layout::{SlotLayout, SlotVector};
pub use pack::{
    build_extraction_masks, compute_padded_dimensions, decode_column_cloned,
    decode_dual_packed, decode_matrix_row_major, decode_row_cloned, encode_dual_packed,
    encode_matrix_row_major, encode_vector_column_cloned, encode_vector_row_cloned,
    extract_duals_plain, ExtractionMasks,
};
