//! Dual-packed weight handling
//!
//! `θ` and `φ` share one ciphertext: `θ` in the even `row_size` blocks and
//! `φ` in the odd ones. Extraction masks one half and fills the zeroed
//! blocks with a copy rotated by one block; repacking masks each vector and
//! adds the two. Each direction costs one level.

use crate::encoding::{ExtractionMasks, SlotLayout};
use crate::engine::{EncryptedOperand, HomomorphicEngine};
use crate::error::Result;

/// Split a dual-packed operand into row-cloned `(θ, φ)`
pub fn extract_duals<E: HomomorphicEngine>(
    engine: &E,
    packed: &EncryptedOperand<E::Ciphertext>,
    masks: &ExtractionMasks,
) -> Result<(
    EncryptedOperand<E::Ciphertext>,
    EncryptedOperand<E::Ciphertext>,
)> {
    let row_size = masks.row_size();
    let ct = packed.expect(SlotLayout::DualPacked { row_size })?;
    let offset = row_size as i32;

    let masked_theta = engine.mul_plain(ct, masks.theta().values())?;
    let theta = engine.add(&engine.rotate(&masked_theta, offset)?, &masked_theta)?;

    let masked_phi = engine.mul_plain(ct, masks.phi().values())?;
    let phi = engine.add(&engine.rotate(&masked_phi, -offset)?, &masked_phi)?;

    let layout = SlotLayout::VecRowCloned { row_size };
    Ok((
        EncryptedOperand::new(theta, layout),
        EncryptedOperand::new(phi, layout),
    ))
}

/// Combine row-cloned `θ` and `φ` into one dual-packed operand
pub fn repack_duals<E: HomomorphicEngine>(
    engine: &E,
    theta: &EncryptedOperand<E::Ciphertext>,
    phi: &EncryptedOperand<E::Ciphertext>,
    masks: &ExtractionMasks,
) -> Result<EncryptedOperand<E::Ciphertext>> {
    let row_size = masks.row_size();
    let layout = SlotLayout::VecRowCloned { row_size };
    let theta = engine.mul_plain(theta.expect(layout)?, masks.theta().values())?;
    let phi = engine.mul_plain(phi.expect(layout)?, masks.phi().values())?;

    Ok(EncryptedOperand::new(
        engine.add(&theta, &phi)?,
        SlotLayout::DualPacked { row_size },
    ))
}
