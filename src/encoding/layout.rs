//! Slot layout tags and tagged slot vectors.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// How logical data is arranged inside a slot vector
///
/// `row_size` is always a power of two and divides the slot count;
/// `num_slots / row_size` is the column size (number of `row_size` blocks).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SlotLayout {
    /// Matrix rows concatenated, each zero-padded to `row_size`, rows zero-padded to `col_size`
    MatRowMajor {
        /// Padded row width
        row_size: usize,
        /// Padded row count
        col_size: usize,
    },
    /// Vector padded to `row_size` and tiled over all slots
    VecRowCloned {
        /// Padded vector width
        row_size: usize,
    },
    /// Vector padded to `num_slots / row_size`, each element repeated `row_size` times
    VecColCloned {
        /// Replication factor of each element
        row_size: usize,
    },
    /// Two row-cloned vectors interleaved: even blocks first, odd blocks second
    DualPacked {
        /// Block width
        row_size: usize,
    },
}

impl SlotLayout {
    /// Block width shared by every layout
    pub fn row_size(&self) -> usize {
        match *self {
            SlotLayout::MatRowMajor { row_size, .. }
            | SlotLayout::VecRowCloned { row_size }
            | SlotLayout::VecColCloned { row_size }
            | SlotLayout::DualPacked { row_size } => row_size,
        }
    }

    /// Short layout name, without parameters
    pub fn name(&self) -> &'static str {
        match self {
            SlotLayout::MatRowMajor { .. } => "MAT_ROW_MAJOR",
            SlotLayout::VecRowCloned { .. } => "VEC_ROW_CLONED",
            SlotLayout::VecColCloned { .. } => "VEC_COL_CLONED",
            SlotLayout::DualPacked { .. } => "DUAL_PACKED",
        }
    }

    /// Fail with `LayoutMismatch` unless `self == expected`
    pub fn expect(&self, expected: SlotLayout) -> Result<()> {
        if *self == expected {
            Ok(())
        } else {
            Err(Error::LayoutMismatch {
                expected: expected.to_string(),
                found: *self,
            })
        }
    }
}

impl fmt::Display for SlotLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            SlotLayout::MatRowMajor { row_size, col_size } => {
                write!(f, "MAT_ROW_MAJOR({}, {})", row_size, col_size)
            }
            SlotLayout::VecRowCloned { row_size } => write!(f, "VEC_ROW_CLONED({})", row_size),
            SlotLayout::VecColCloned { row_size } => write!(f, "VEC_COL_CLONED({})", row_size),
            SlotLayout::DualPacked { row_size } => write!(f, "DUAL_PACKED({})", row_size),
        }
    }
}

/// Slot vector tagged with its layout
///
/// The length always equals the slot capacity it was encoded for.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SlotVector<T> {
    values: Vec<T>,
    layout: SlotLayout,
}

impl<T> SlotVector<T> {
    pub(crate) fn new(values: Vec<T>, layout: SlotLayout) -> Self {
        Self { values, layout }
    }

    /// Layout tag
    pub fn layout(&self) -> SlotLayout {
        self.layout
    }

    /// Slot values
    pub fn values(&self) -> &[T] {
        &self.values
    }

    /// Consume into the raw slot values
    pub fn into_values(self) -> Vec<T> {
        self.values
    }

    /// Slot count
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if there are no slots
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
