//! Depth refresh of the packed weights
//!
//! Runs at the start of every iteration after the first. Either strategy
//! must leave enough levels for a full iteration; anything less is a
//! configuration error, since the strategy is fixed before the run.

use tracing::debug;

use crate::engine::{EncryptedOperand, HomomorphicEngine, KeyPair};
use crate::error::{config_err, Result};
use crate::params::RefreshStrategy;

/// Slots kept by sparse bootstrapping: eight blocks, capped at the slot count
pub fn bootstrap_slots(row_size: usize, num_slots: usize) -> usize {
    (8 * row_size).min(num_slots)
}

/// Refresh the packed weights with `strategy`
///
/// # Arguments
/// * `active_slots` - sparse width handed to the bootstrap
/// * `required_depth` - levels the next iteration will consume
pub fn refresh_weights<E: HomomorphicEngine>(
    engine: &E,
    keys: &KeyPair<E::PublicKey, E::SecretKey>,
    weights: &EncryptedOperand<E::Ciphertext>,
    strategy: RefreshStrategy,
    active_slots: usize,
    required_depth: usize,
) -> Result<EncryptedOperand<E::Ciphertext>> {
    let before = engine.depth(weights.ciphertext());
    let fresh = match strategy {
        RefreshStrategy::Bootstrap { precision } => {
            let mut ct = weights.ciphertext().clone();
            engine.set_active_slots(&mut ct, active_slots)?;
            engine.refresh_depth(&ct, precision)?
        }
        RefreshStrategy::Interactive => {
            let values = engine.decrypt(&keys.secret, weights.ciphertext())?;
            engine.encrypt(&keys.public, &values)?
        }
    };

    let after = engine.depth(&fresh);
    debug!(
        "refresh ({}): depth {} -> {}",
        strategy.label(),
        before,
        after
    );

    let available = engine.max_depth().saturating_sub(after);
    if available < required_depth {
        return Err(config_err!(
            "{} refresh leaves {} levels, iteration needs {}",
            strategy.label(),
            available,
            required_depth
        ));
    }
    Ok(EncryptedOperand::new(fresh, weights.layout()))
}
