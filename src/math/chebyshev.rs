//! Chebyshev series approximation
//!
//! Fits a Chebyshev interpolant of a scalar function on `[low, high]` and
//! evaluates it with the Clenshaw recurrence. Homomorphic engines evaluate
//! non-polynomial functions (here the logistic function) this way; the
//! polynomial is only meaningful inside the fitted interval.

use std::f64::consts::PI;

use crate::error::{config_err, Result};

/// Largest degree covered by the depth table
pub const MAX_CHEBYSHEV_DEGREE: u32 = 2031;

/// Multiplicative depth consumed by evaluating a Chebyshev series of `degree`
///
/// | degree | depth |
/// |--------|-------|
/// | 1-5 | 3 |
/// | 6-13 | 4 |
/// | 14-27 | 5 |
/// | 28-59 | 6 |
/// | 60-119 | 7 |
/// | 120-247 | 8 |
/// | 248-495 | 9 |
/// | 496-1007 | 10 |
/// | 1008-2031 | 11 |
pub fn chebyshev_depth(degree: u32) -> Result<usize> {
    let depth = match degree {
        1..=5 => 3,
        6..=13 => 4,
        14..=27 => 5,
        28..=59 => 6,
        60..=119 => 7,
        120..=247 => 8,
        248..=495 => 9,
        496..=1007 => 10,
        1008..=MAX_CHEBYSHEV_DEGREE => 11,
        _ => {
            return Err(config_err!(
                "Chebyshev degree {} outside supported range 1..={}",
                degree,
                MAX_CHEBYSHEV_DEGREE
            ))
        }
    };
    Ok(depth)
}

/// Chebyshev series `c_0/2 + Σ c_k T_k(t)` with `t` the affine image of `x` in `[-1, 1]`
#[derive(Clone, Debug)]
pub struct ChebyshevSeries {
    low: f64,
    high: f64,
    coeffs: Vec<f64>,
}

impl ChebyshevSeries {
    /// Interpolate `f` at the `degree + 1` Chebyshev nodes of `[low, high]`
    pub fn fit(f: impl Fn(f64) -> f64, low: f64, high: f64, degree: u32) -> Result<Self> {
        if !(low < high) {
            return Err(config_err!("empty Chebyshev interval [{}, {}]", low, high));
        }
        let n = degree as usize + 1;
        let mid = 0.5 * (high + low);
        let half = 0.5 * (high - low);

        let samples: Vec<f64> = (0..n)
            .map(|j| {
                let t = (PI * (j as f64 + 0.5) / n as f64).cos();
                f(mid + half * t)
            })
            .collect();

        let coeffs = (0..n)
            .map(|k| {
                let sum: f64 = samples
                    .iter()
                    .enumerate()
                    .map(|(j, &fx)| fx * (PI * k as f64 * (j as f64 + 0.5) / n as f64).cos())
                    .sum();
                2.0 * sum / n as f64
            })
            .collect();

        Ok(Self { low, high, coeffs })
    }

    /// Logistic function approximation used by the engine's sigmoid evaluator
    pub fn logistic(low: f64, high: f64, degree: u32) -> Result<Self> {
        Self::fit(crate::math::matrix::sigmoid, low, high, degree)
    }

    /// Evaluate with the Clenshaw recurrence
    ///
    /// Inputs outside `[low, high]` are evaluated as-is; the result grows
    /// quickly and is not an approximation of the fitted function there.
    pub fn eval(&self, x: f64) -> f64 {
        let t = (2.0 * x - self.low - self.high) / (self.high - self.low);
        let mut b1 = 0.0;
        let mut b2 = 0.0;
        for &c in self.coeffs[1..].iter().rev() {
            let b0 = 2.0 * t * b1 - b2 + c;
            b2 = b1;
            b1 = b0;
        }
        t * b1 - b2 + 0.5 * self.coeffs[0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::matrix::sigmoid;

    #[test]
    fn test_depth_table_boundaries() {
        assert_eq!(chebyshev_depth(5).unwrap(), 3);
        assert_eq!(chebyshev_depth(6).unwrap(), 4);
        assert_eq!(chebyshev_depth(59).unwrap(), 6);
        assert_eq!(chebyshev_depth(60).unwrap(), 7);
        assert_eq!(chebyshev_depth(128).unwrap(), 8);
        assert_eq!(chebyshev_depth(2031).unwrap(), 11);
        assert!(chebyshev_depth(0).is_err());
        assert!(chebyshev_depth(2032).is_err());
    }

    #[test]
    fn test_fits_polynomial_exactly() {
        let series = ChebyshevSeries::fit(|x| 3.0 * x * x - x + 2.0, -2.0, 5.0, 4).unwrap();
        for x in [-2.0, -1.0, 0.0, 0.3, 2.5, 5.0] {
            let expected = 3.0 * x * x - x + 2.0;
            assert!((series.eval(x) - expected).abs() < 1e-9, "x = {}", x);
        }
    }

    #[test]
    fn test_logistic_accuracy_in_range() {
        let series = ChebyshevSeries::logistic(-16.0, 16.0, 59).unwrap();
        let mut max_err: f64 = 0.0;
        let mut x = -15.9;
        while x < 15.9 {
            max_err = max_err.max((series.eval(x) - sigmoid(x)).abs());
            x += 0.01;
        }
        assert!(max_err < 1e-3, "max error {}", max_err);
        assert!((series.eval(0.0) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_logistic_diverges_out_of_range() {
        let series = ChebyshevSeries::logistic(-4.0, 4.0, 27).unwrap();
        let outside = series.eval(12.0);
        assert!((outside - sigmoid(12.0)).abs() > 1.0);
    }

    #[test]
    fn test_empty_interval_rejected() {
        assert!(ChebyshevSeries::logistic(1.0, 1.0, 5).is_err());
    }
}
