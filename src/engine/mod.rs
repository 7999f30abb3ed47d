//! Homomorphic arithmetic engine interface
//!
//! The training core never touches ciphertext internals. It drives an engine
//! through this trait: elementwise arithmetic on slot vectors, rotations,
//! structured row/column reductions, a Chebyshev sigmoid evaluator and a
//! depth refresh.
//!
//! Evaluation keys are generated once through `&mut self` and then shared
//! read-only; every evaluation method takes `&self`.
//!
//! ## Reduction semantics
//!
//! With `n` slots and block width `r`:
//!
//! - `sum_rows(ct, r)`: `out[i] = Σ_k in[k·r + (i mod r)]` (sum over blocks,
//!   result is row-cloned)
//! - `sum_cols(ct, r)`: `out[i] = Σ_j in[⌊i/r⌋·r + j]` (sum within a block,
//!   result is column-cloned)
//! - `rotate(ct, k)`: `out[i] = in[(i + k) mod n]`

mod operand;
mod simulated;

pub use operand::{decrypt_operand, encrypt_slots, EncryptedOperand};
pub use simulated::{SimCiphertext, SimPublicKey, SimSecretKey, SimulatedEngine};

use crate::error::Result;

/// Encryption/decryption key pair
#[derive(Clone, Debug)]
pub struct KeyPair<P, S> {
    /// Encryption key
    pub public: P,
    /// Decryption key
    pub secret: S,
}

/// Capability set of an approximate homomorphic arithmetic engine
pub trait HomomorphicEngine {
    /// Opaque ciphertext handle
    type Ciphertext: Clone;
    /// Encryption key
    type PublicKey;
    /// Decryption key, also used to derive evaluation keys
    type SecretKey;

    /// Slots per ciphertext
    fn num_slots(&self) -> usize;

    /// Multiplicative levels available between refreshes
    fn max_depth(&self) -> usize;

    /// Levels consumed by `ct` since encryption or the last refresh
    fn depth(&self, ct: &Self::Ciphertext) -> usize;

    /// Levels consumed by `approximate_sigmoid` at `degree`
    fn sigmoid_depth(&self, degree: u32) -> Result<usize>;

    /// Generate a fresh key pair
    fn key_gen(&mut self) -> KeyPair<Self::PublicKey, Self::SecretKey>;

    /// Relinearization key for ciphertext-ciphertext multiply
    fn gen_mult_key(&mut self, sk: &Self::SecretKey) -> Result<()>;

    /// Keys for `sum_rows` with block width `row_size`
    fn gen_sum_rows_keys(&mut self, sk: &Self::SecretKey, row_size: usize) -> Result<()>;

    /// Keys for `sum_cols`
    fn gen_sum_cols_keys(&mut self, sk: &Self::SecretKey) -> Result<()>;

    /// Rotation keys for each offset in `offsets`
    fn gen_rotation_keys(&mut self, sk: &Self::SecretKey, offsets: &[i32]) -> Result<()>;

    /// Bootstrap keys for ciphertexts with `active_slots` active slots
    fn gen_bootstrap_keys(&mut self, sk: &Self::SecretKey, active_slots: usize) -> Result<()>;

    /// Encrypt a full slot vector
    fn encrypt(&self, pk: &Self::PublicKey, values: &[f64]) -> Result<Self::Ciphertext>;

    /// Decrypt to the full slot vector
    fn decrypt(&self, sk: &Self::SecretKey, ct: &Self::Ciphertext) -> Result<Vec<f64>>;

    /// Slotwise `a + b`
    fn add(&self, a: &Self::Ciphertext, b: &Self::Ciphertext) -> Result<Self::Ciphertext>;

    /// Slotwise `a - b`
    fn sub(&self, a: &Self::Ciphertext, b: &Self::Ciphertext) -> Result<Self::Ciphertext>;

    /// Slotwise `a * b`
    fn mul(&self, a: &Self::Ciphertext, b: &Self::Ciphertext) -> Result<Self::Ciphertext>;

    /// Slotwise product with a plaintext slot vector
    fn mul_plain(&self, a: &Self::Ciphertext, plain: &[f64]) -> Result<Self::Ciphertext>;

    /// Multiply every slot by `scalar`
    fn mul_scalar(&self, a: &Self::Ciphertext, scalar: f64) -> Result<Self::Ciphertext>;

    /// Cyclic left rotation by `offset` (negative rotates right)
    fn rotate(&self, a: &Self::Ciphertext, offset: i32) -> Result<Self::Ciphertext>;

    /// Sum across blocks of width `row_size`
    fn sum_rows(&self, a: &Self::Ciphertext, row_size: usize) -> Result<Self::Ciphertext>;

    /// Sum within each block of width `row_size`
    fn sum_cols(&self, a: &Self::Ciphertext, row_size: usize) -> Result<Self::Ciphertext>;

    /// Chebyshev approximation of the logistic function on `[low, high]`
    ///
    /// Inputs outside the interval produce unreliable outputs without an
    /// error.
    fn approximate_sigmoid(
        &self,
        a: &Self::Ciphertext,
        low: f64,
        high: f64,
        degree: u32,
    ) -> Result<Self::Ciphertext>;

    /// Restore the depth budget of `a`
    ///
    /// Only the active slots survive; they are repeated over the full slot
    /// vector. `precision` requests a second pass at that many bits.
    fn refresh_depth(&self, a: &Self::Ciphertext, precision: Option<u32>)
        -> Result<Self::Ciphertext>;

    /// Restrict `a` to its first `n` slots ahead of a refresh
    fn set_active_slots(&self, a: &mut Self::Ciphertext, n: usize) -> Result<()>;
}
