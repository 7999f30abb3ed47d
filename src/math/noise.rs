//! Gaussian noise for simulated approximate arithmetic

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

/// Continuous Gaussian sampler used to model approximate-arithmetic error
pub struct NoiseSampler {
    rng: ChaCha20Rng,
}

impl NoiseSampler {
    /// Create a seeded sampler for reproducibility
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
        }
    }

    /// Sample N(0, sigma²) using the Box-Muller transform
    pub fn sample(&mut self, sigma: f64) -> f64 {
        if sigma == 0.0 {
            return 0.0;
        }
        let u1: f64 = self.rng.gen_range(f64::MIN_POSITIVE..1.0);
        let u2: f64 = self.rng.gen_range(0.0..1.0);

        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        z * sigma
    }

    /// Add independent noise of standard deviation `sigma` to every value
    pub fn perturb(&mut self, values: &mut [f64], sigma: f64) {
        if sigma == 0.0 {
            return;
        }
        for v in values.iter_mut() {
            *v += self.sample(sigma);
        }
    }
}

impl std::fmt::Debug for NoiseSampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NoiseSampler").finish_non_exhaustive()
    }
}
