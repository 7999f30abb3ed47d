//! Numeric primitives for encrypted training.
//!
//! - **Plaintext matrices** for data preparation and verification
//! - **Chebyshev series** used to approximate the logistic function, and the
//!   degree to multiplicative-depth table that comes with it
//! - **Gaussian noise** for simulating approximate homomorphic arithmetic
//!
//! # Example
//!
//! ```
//! use nesterov_he::math::{ChebyshevSeries, PlainMatrix};
//!
//! let x = PlainMatrix::column(&[0.0, 1.0]);
//! let approx = ChebyshevSeries::logistic(-8.0, 8.0, 27).unwrap();
//! assert!((approx.eval(x.get(0, 0)) - 0.5).abs() < 1e-6);
//! ```

pub mod chebyshev;
pub mod matrix;
pub mod noise;

pub use chebyshev::{chebyshev_depth, ChebyshevSeries, MAX_CHEBYSHEV_DEGREE};
pub use matrix::{sigmoid, PlainMatrix};
pub use noise::NoiseSampler;

/// Smallest power of two `>= x` (1 for `x == 0`)
pub fn next_pow2(x: usize) -> usize {
    x.max(1).next_power_of_two()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_pow2() {
        assert_eq!(next_pow2(0), 1);
        assert_eq!(next_pow2(1), 1);
        assert_eq!(next_pow2(3), 4);
        assert_eq!(next_pow2(8), 8);
        assert_eq!(next_pow2(9), 16);
    }
}
