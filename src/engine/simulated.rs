//! Plaintext-simulating engine
//!
//! Executes every engine primitive on cleartext slot vectors while enforcing
//! the constraints a real approximate-arithmetic engine imposes: a fixed slot
//! count, a multiplicative depth budget, scoped evaluation keys and sparse
//! refresh. Optional Gaussian noise models approximation error.
//!
//! This is not encryption. It exists so the packing protocol and the
//! optimizer run unchanged against a deterministic backend.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use rayon::prelude::*;

use crate::encoding::clone::{rotate_slots, tile};
use crate::engine::{HomomorphicEngine, KeyPair};
use crate::error::{config_err, Error, Result};
use crate::math::{chebyshev_depth, ChebyshevSeries, NoiseSampler};
use crate::params::EngineParams;

/// Simulated ciphertext: slot values plus engine bookkeeping
#[derive(Clone, Debug)]
pub struct SimCiphertext {
    values: Vec<f64>,
    depth: usize,
    active_slots: usize,
    key_id: u64,
}

impl SimCiphertext {
    /// Levels consumed since encryption or the last refresh
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Slots that survive the next refresh
    pub fn active_slots(&self) -> usize {
        self.active_slots
    }
}

/// Simulated encryption key
#[derive(Clone, Debug)]
pub struct SimPublicKey {
    key_id: u64,
}

/// Simulated decryption key
#[derive(Clone, Debug)]
pub struct SimSecretKey {
    key_id: u64,
}

#[derive(Debug, Default)]
struct EvalKeys {
    mult: bool,
    sum_rows: HashSet<usize>,
    sum_cols: bool,
    rotations: HashSet<i32>,
    bootstrap: HashSet<usize>,
}

/// Plaintext-backed [`HomomorphicEngine`]
#[derive(Debug)]
pub struct SimulatedEngine {
    params: EngineParams,
    next_key_id: u64,
    keys: HashMap<u64, EvalKeys>,
    noise: Mutex<NoiseSampler>,
}

impl SimulatedEngine {
    /// Create an engine with `params.num_slots()` slots
    pub fn new(params: EngineParams) -> Result<Self> {
        params.validate()?;
        let noise = NoiseSampler::with_seed(params.seed);
        Ok(Self {
            params,
            next_key_id: 0,
            keys: HashMap::new(),
            noise: Mutex::new(noise),
        })
    }

    /// Engine parameters
    pub fn params(&self) -> &EngineParams {
        &self.params
    }

    fn eval_keys(&self, key_id: u64) -> Result<&EvalKeys> {
        self.keys
            .get(&key_id)
            .ok_or_else(|| config_err!("no evaluation keys for key pair {}", key_id))
    }

    fn eval_keys_mut(&mut self, sk: &SimSecretKey) -> Result<&mut EvalKeys> {
        self.keys
            .get_mut(&sk.key_id)
            .ok_or_else(|| config_err!("unknown secret key {}", sk.key_id))
    }

    fn check_block(&self, row_size: usize) -> Result<()> {
        if !row_size.is_power_of_two() || row_size > self.num_slots() {
            return Err(config_err!(
                "block width {} must be a power of two no larger than {}",
                row_size,
                self.num_slots()
            ));
        }
        Ok(())
    }

    fn check_depth(&self, depth: usize) -> Result<usize> {
        if depth > self.params.max_depth {
            return Err(Error::DepthExhausted {
                required: depth,
                available: self.params.max_depth,
            });
        }
        Ok(depth)
    }

    fn perturb(&self, values: &mut [f64], sigma: f64) -> Result<()> {
        let mut sampler = self
            .noise
            .lock()
            .map_err(|_| config_err!("noise sampler lock poisoned"))?;
        sampler.perturb(values, sigma);
        Ok(())
    }

    fn binary(
        &self,
        a: &SimCiphertext,
        b: &SimCiphertext,
        cost: usize,
        op: impl Fn(f64, f64) -> f64 + Sync + Send,
    ) -> Result<SimCiphertext> {
        if a.key_id != b.key_id {
            return Err(config_err!(
                "operands belong to different key pairs ({} and {})",
                a.key_id,
                b.key_id
            ));
        }
        let depth = self.check_depth(a.depth.max(b.depth) + cost)?;
        let values = a
            .values
            .par_iter()
            .zip(b.values.par_iter())
            .map(|(&x, &y)| op(x, y))
            .collect();
        Ok(SimCiphertext {
            values,
            depth,
            active_slots: a.active_slots.max(b.active_slots),
            key_id: a.key_id,
        })
    }

    fn unary(
        &self,
        a: &SimCiphertext,
        cost: usize,
        op: impl Fn(f64) -> f64 + Sync + Send,
    ) -> Result<SimCiphertext> {
        let depth = self.check_depth(a.depth + cost)?;
        let values = a.values.par_iter().map(|&x| op(x)).collect();
        Ok(SimCiphertext {
            values,
            depth,
            active_slots: a.active_slots,
            key_id: a.key_id,
        })
    }
}

impl HomomorphicEngine for SimulatedEngine {
    type Ciphertext = SimCiphertext;
    type PublicKey = SimPublicKey;
    type SecretKey = SimSecretKey;

    fn num_slots(&self) -> usize {
        self.params.num_slots()
    }

    fn max_depth(&self) -> usize {
        self.params.max_depth
    }

    fn depth(&self, ct: &SimCiphertext) -> usize {
        ct.depth
    }

    fn sigmoid_depth(&self, degree: u32) -> Result<usize> {
        chebyshev_depth(degree)
    }

    fn key_gen(&mut self) -> KeyPair<SimPublicKey, SimSecretKey> {
        let key_id = self.next_key_id;
        self.next_key_id += 1;
        self.keys.insert(key_id, EvalKeys::default());
        KeyPair {
            public: SimPublicKey { key_id },
            secret: SimSecretKey { key_id },
        }
    }

    fn gen_mult_key(&mut self, sk: &SimSecretKey) -> Result<()> {
        self.eval_keys_mut(sk)?.mult = true;
        Ok(())
    }

    fn gen_sum_rows_keys(&mut self, sk: &SimSecretKey, row_size: usize) -> Result<()> {
        self.check_block(row_size)?;
        self.eval_keys_mut(sk)?.sum_rows.insert(row_size);
        Ok(())
    }

    fn gen_sum_cols_keys(&mut self, sk: &SimSecretKey) -> Result<()> {
        self.eval_keys_mut(sk)?.sum_cols = true;
        Ok(())
    }

    fn gen_rotation_keys(&mut self, sk: &SimSecretKey, offsets: &[i32]) -> Result<()> {
        self.eval_keys_mut(sk)?
            .rotations
            .extend(offsets.iter().copied());
        Ok(())
    }

    fn gen_bootstrap_keys(&mut self, sk: &SimSecretKey, active_slots: usize) -> Result<()> {
        self.check_block(active_slots)?;
        self.eval_keys_mut(sk)?.bootstrap.insert(active_slots);
        Ok(())
    }

    fn encrypt(&self, pk: &SimPublicKey, values: &[f64]) -> Result<SimCiphertext> {
        let n = self.num_slots();
        if values.len() > n {
            return Err(Error::CapacityExceeded {
                what: "plaintext",
                len: values.len(),
                capacity: n,
            });
        }
        self.eval_keys(pk.key_id)?;

        let mut values = values.to_vec();
        values.resize(n, 0.0);
        self.perturb(&mut values, self.params.encryption_noise)?;
        Ok(SimCiphertext {
            values,
            depth: 0,
            active_slots: n,
            key_id: pk.key_id,
        })
    }

    fn decrypt(&self, sk: &SimSecretKey, ct: &SimCiphertext) -> Result<Vec<f64>> {
        if sk.key_id != ct.key_id {
            return Err(config_err!(
                "ciphertext was encrypted under key pair {}, not {}",
                ct.key_id,
                sk.key_id
            ));
        }
        Ok(ct.values.clone())
    }

    fn add(&self, a: &SimCiphertext, b: &SimCiphertext) -> Result<SimCiphertext> {
        self.binary(a, b, 0, |x, y| x + y)
    }

    fn sub(&self, a: &SimCiphertext, b: &SimCiphertext) -> Result<SimCiphertext> {
        self.binary(a, b, 0, |x, y| x - y)
    }

    fn mul(&self, a: &SimCiphertext, b: &SimCiphertext) -> Result<SimCiphertext> {
        if !self.eval_keys(a.key_id)?.mult {
            return Err(config_err!("multiplication key not generated"));
        }
        self.binary(a, b, 1, |x, y| x * y)
    }

    fn mul_plain(&self, a: &SimCiphertext, plain: &[f64]) -> Result<SimCiphertext> {
        if plain.len() != a.values.len() {
            return Err(Error::CapacityExceeded {
                what: "plaintext operand",
                len: plain.len(),
                capacity: a.values.len(),
            });
        }
        let depth = self.check_depth(a.depth + 1)?;
        let values = a
            .values
            .par_iter()
            .zip(plain.par_iter())
            .map(|(&x, &p)| x * p)
            .collect();
        Ok(SimCiphertext {
            values,
            depth,
            active_slots: a.active_slots,
            key_id: a.key_id,
        })
    }

    fn mul_scalar(&self, a: &SimCiphertext, scalar: f64) -> Result<SimCiphertext> {
        self.unary(a, 1, |x| x * scalar)
    }

    fn rotate(&self, a: &SimCiphertext, offset: i32) -> Result<SimCiphertext> {
        if offset != 0 && !self.eval_keys(a.key_id)?.rotations.contains(&offset) {
            return Err(config_err!("no rotation key for offset {}", offset));
        }
        Ok(SimCiphertext {
            values: rotate_slots(&a.values, offset as i64),
            ..a.clone()
        })
    }

    fn sum_rows(&self, a: &SimCiphertext, row_size: usize) -> Result<SimCiphertext> {
        self.check_block(row_size)?;
        if !self.eval_keys(a.key_id)?.sum_rows.contains(&row_size) {
            return Err(config_err!("no sum-rows keys for row size {}", row_size));
        }
        let mut sums = vec![0.0; row_size];
        for block in a.values.chunks_exact(row_size) {
            for (s, v) in sums.iter_mut().zip(block) {
                *s += v;
            }
        }
        Ok(SimCiphertext {
            values: tile(&sums, a.values.len(), 0.0)?,
            ..a.clone()
        })
    }

    fn sum_cols(&self, a: &SimCiphertext, row_size: usize) -> Result<SimCiphertext> {
        self.check_block(row_size)?;
        if !self.eval_keys(a.key_id)?.sum_cols {
            return Err(config_err!("sum-cols keys not generated"));
        }
        let depth = self.check_depth(a.depth + 1)?;
        let values = a
            .values
            .par_chunks(row_size)
            .flat_map_iter(|block| {
                let s: f64 = block.iter().sum();
                std::iter::repeat(s).take(block.len())
            })
            .collect();
        Ok(SimCiphertext {
            values,
            depth,
            ..a.clone()
        })
    }

    fn approximate_sigmoid(
        &self,
        a: &SimCiphertext,
        low: f64,
        high: f64,
        degree: u32,
    ) -> Result<SimCiphertext> {
        if !self.eval_keys(a.key_id)?.mult {
            return Err(config_err!("multiplication key not generated"));
        }
        let cost = chebyshev_depth(degree)?;
        let series = ChebyshevSeries::logistic(low, high, degree)?;
        self.unary(a, cost, |x| series.eval(x))
    }

    fn refresh_depth(
        &self,
        a: &SimCiphertext,
        precision: Option<u32>,
    ) -> Result<SimCiphertext> {
        if !self.eval_keys(a.key_id)?.bootstrap.contains(&a.active_slots) {
            return Err(config_err!(
                "no bootstrap keys for {} active slots",
                a.active_slots
            ));
        }
        let n = a.values.len();
        let mut values = tile(&a.values[..a.active_slots], n, 0.0)?;

        let sigma = match precision {
            Some(bits) => self.params.bootstrap_noise.min((-(bits as f64)).exp2()),
            None => self.params.bootstrap_noise,
        };
        self.perturb(&mut values, sigma)?;

        Ok(SimCiphertext {
            values,
            depth: 0,
            active_slots: n,
            key_id: a.key_id,
        })
    }

    fn set_active_slots(&self, a: &mut SimCiphertext, n: usize) -> Result<()> {
        if n == 0 || !n.is_power_of_two() || n > a.values.len() {
            return Err(config_err!(
                "active slot count {} must be a power of two in 1..={}",
                n,
                a.values.len()
            ));
        }
        a.active_slots = n;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::sigmoid;

    fn engine_with_keys(num_slots: usize, max_depth: usize) -> (SimulatedEngine, KeyPair<SimPublicKey, SimSecretKey>) {
        let mut params = EngineParams::interactive(2 * num_slots);
        params.max_depth = max_depth;
        let mut engine = SimulatedEngine::new(params).unwrap();
        let keys = engine.key_gen();
        engine.gen_mult_key(&keys.secret).unwrap();
        engine.gen_sum_cols_keys(&keys.secret).unwrap();
        engine.gen_sum_rows_keys(&keys.secret, 4).unwrap();
        engine.gen_rotation_keys(&keys.secret, &[4, -4]).unwrap();
        engine.gen_bootstrap_keys(&keys.secret, 8).unwrap();
        (engine, keys)
    }

    fn iota(n: usize) -> Vec<f64> {
        (0..n).map(|i| i as f64).collect()
    }

    #[test]
    fn test_encrypt_decrypt() {
        let (engine, keys) = engine_with_keys(16, 4);
        let ct = engine.encrypt(&keys.public, &[1.0, 2.0]).unwrap();
        let out = engine.decrypt(&keys.secret, &ct).unwrap();
        assert_eq!(out.len(), 16);
        assert_eq!(&out[..3], &[1.0, 2.0, 0.0]);
        assert_eq!(ct.depth(), 0);
    }

    #[test]
    fn test_rotate_left() {
        let (engine, keys) = engine_with_keys(16, 4);
        let ct = engine.encrypt(&keys.public, &iota(16)).unwrap();
        let out = engine.decrypt(&keys.secret, &engine.rotate(&ct, 4).unwrap()).unwrap();
        assert_eq!(out[0], 4.0);
        assert_eq!(out[15], 3.0);

        let out = engine.decrypt(&keys.secret, &engine.rotate(&ct, -4).unwrap()).unwrap();
        assert_eq!(out[0], 12.0);
    }

    #[test]
    fn test_rotate_without_key() {
        let (engine, keys) = engine_with_keys(16, 4);
        let ct = engine.encrypt(&keys.public, &iota(16)).unwrap();
        assert!(engine.rotate(&ct, 1).unwrap_err().is_configuration());
    }

    #[test]
    fn test_sum_rows_and_cols() {
        let (engine, keys) = engine_with_keys(16, 4);
        let ct = engine.encrypt(&keys.public, &iota(16)).unwrap();

        let rows = engine.sum_rows(&ct, 4).unwrap();
        let out = engine.decrypt(&keys.secret, &rows).unwrap();
        assert_eq!(&out[..4], &[24.0, 28.0, 32.0, 36.0]);
        assert_eq!(&out[12..], &[24.0, 28.0, 32.0, 36.0]);
        assert_eq!(rows.depth(), 0);

        let cols = engine.sum_cols(&ct, 4).unwrap();
        let out = engine.decrypt(&keys.secret, &cols).unwrap();
        assert_eq!(&out[..5], &[6.0, 6.0, 6.0, 6.0, 22.0]);
        assert_eq!(cols.depth(), 1);
    }

    #[test]
    fn test_depth_exhaustion() {
        let (engine, keys) = engine_with_keys(16, 2);
        let ct = engine.encrypt(&keys.public, &[1.0; 16]).unwrap();
        let ct = engine.mul(&ct, &ct).unwrap();
        let ct = engine.mul_scalar(&ct, 2.0).unwrap();
        assert_eq!(ct.depth(), 2);

        let err = engine.mul_scalar(&ct, 2.0).unwrap_err();
        assert!(matches!(
            err,
            Error::DepthExhausted {
                required: 3,
                available: 2
            }
        ));
    }

    #[test]
    fn test_sigmoid_charges_table_depth() {
        let (engine, keys) = engine_with_keys(16, 8);
        let ct = engine.encrypt(&keys.public, &[-2.0, 0.0, 3.0]).unwrap();
        let out = engine.approximate_sigmoid(&ct, -8.0, 8.0, 27).unwrap();
        assert_eq!(out.depth(), 5);

        let values = engine.decrypt(&keys.secret, &out).unwrap();
        for (x, y) in [-2.0, 0.0, 3.0].iter().zip(&values) {
            assert!((y - sigmoid(*x)).abs() < 1e-3);
        }
    }

    #[test]
    fn test_sparse_refresh_tiles_active_slots() {
        let (engine, keys) = engine_with_keys(16, 4);
        let mut ct = engine.encrypt(&keys.public, &iota(16)).unwrap();
        ct = engine.mul_scalar(&ct, 1.0).unwrap();

        assert!(engine.refresh_depth(&ct, None).is_err());

        engine.set_active_slots(&mut ct, 8).unwrap();
        let fresh = engine.refresh_depth(&ct, None).unwrap();
        assert_eq!(fresh.depth(), 0);
        assert_eq!(fresh.active_slots(), 16);

        let out = engine.decrypt(&keys.secret, &fresh).unwrap();
        assert_eq!(&out[8..], &iota(8)[..]);
    }

    #[test]
    fn test_invalid_active_slots() {
        let (engine, keys) = engine_with_keys(16, 4);
        let mut ct = engine.encrypt(&keys.public, &[0.0]).unwrap();
        assert!(engine.set_active_slots(&mut ct, 6).is_err());
        assert!(engine.set_active_slots(&mut ct, 32).is_err());
    }

    #[test]
    fn test_foreign_key_rejected() {
        let (mut engine, keys) = engine_with_keys(16, 4);
        let other = engine.key_gen();
        let ct = engine.encrypt(&keys.public, &[1.0]).unwrap();
        assert!(engine.decrypt(&other.secret, &ct).is_err());

        let ct2 = engine.encrypt(&other.public, &[1.0]).unwrap();
        assert!(engine.add(&ct, &ct2).is_err());
    }

    #[test]
    fn test_encryption_noise_is_seeded() {
        let mut params = EngineParams::interactive(32);
        params.encryption_noise = 1e-3;
        params.seed = 5;

        let run = || {
            let mut engine = SimulatedEngine::new(params.clone()).unwrap();
            let keys = engine.key_gen();
            let ct = engine.encrypt(&keys.public, &[1.0; 16]).unwrap();
            engine.decrypt(&keys.secret, &ct).unwrap()
        };
        let a = run();
        assert_eq!(a, run());
        assert!(a.iter().any(|&v| v != 1.0));
        assert!(a.iter().all(|&v| (v - 1.0).abs() < 1e-2));
    }
}
