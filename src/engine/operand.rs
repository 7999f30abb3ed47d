//! Layout-tagged ciphertexts

use crate::encoding::{SlotLayout, SlotVector};
use crate::engine::HomomorphicEngine;
use crate::error::{Error, Result};

/// Ciphertext bound to the layout of the slot vector it encrypts
#[derive(Clone, Debug)]
pub struct EncryptedOperand<C> {
    ciphertext: C,
    layout: SlotLayout,
}

impl<C> EncryptedOperand<C> {
    /// Tag a ciphertext with a layout
    pub fn new(ciphertext: C, layout: SlotLayout) -> Self {
        Self { ciphertext, layout }
    }

    /// Layout tag
    pub fn layout(&self) -> SlotLayout {
        self.layout
    }

    /// Underlying ciphertext
    pub fn ciphertext(&self) -> &C {
        &self.ciphertext
    }

    /// Ciphertext if the layout is `expected`
    pub fn expect(&self, expected: SlotLayout) -> Result<&C> {
        self.layout.expect(expected)?;
        Ok(&self.ciphertext)
    }
}

/// Encrypt a slot vector, keeping its layout tag
pub fn encrypt_slots<E: HomomorphicEngine>(
    engine: &E,
    pk: &E::PublicKey,
    slots: &SlotVector<f64>,
) -> Result<EncryptedOperand<E::Ciphertext>> {
    if slots.len() != engine.num_slots() {
        return Err(Error::CapacityExceeded {
            what: "slot vector",
            len: slots.len(),
            capacity: engine.num_slots(),
        });
    }
    let ct = engine.encrypt(pk, slots.values())?;
    Ok(EncryptedOperand::new(ct, slots.layout()))
}

/// Decrypt an operand back into a tagged slot vector
pub fn decrypt_operand<E: HomomorphicEngine>(
    engine: &E,
    sk: &E::SecretKey,
    operand: &EncryptedOperand<E::Ciphertext>,
) -> Result<SlotVector<f64>> {
    let values = engine.decrypt(sk, operand.ciphertext())?;
    Ok(SlotVector::new(values, operand.layout()))
}
