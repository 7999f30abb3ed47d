//! Encrypted matrix-vector products and the logistic-regression gradient
//!
//! The design matrix `X` (`n x d`) is packed row-major with block width
//! `row_size >= d`. Two products are built from one elementwise multiply and
//! one reduction:
//!
//! - `product_row(X, θ)` multiplies by a row-cloned `θ` and sums within each
//!   block, giving `X·θ` column-cloned (one value per sample).
//! - `product_col(M, r)` multiplies by a column-cloned `r` and sums across
//!   blocks, giving `Mᵀ·r` row-cloned (one value per feature).
//!
//! The second form computes a transposed product without ever packing `Xᵀ`.

use crate::encoding::{
    encode_matrix_row_major, encode_vector_column_cloned, SlotLayout,
};
use crate::engine::{encrypt_slots, EncryptedOperand, HomomorphicEngine};
use crate::error::{config_err, Result};
use crate::math::PlainMatrix;
use crate::params::SigmoidApprox;

/// `-(γ / n) · X`, packed in place of `Xᵀ` for the column product
///
/// Folding the learning rate and the sample count into the matrix saves one
/// multiplicative level per iteration.
pub fn initialize_neg_xt(x: &PlainMatrix, learning_rate: f64) -> Result<PlainMatrix> {
    if x.is_empty() {
        return Err(config_err!("empty input matrix"));
    }
    Ok(x.scaled(-learning_rate / x.rows() as f64))
}

/// Row product: `X·θ`, one value per matrix row, column-cloned
///
/// # Arguments
/// * `matrix` - row-major matrix operand
/// * `vector` - row-cloned vector operand with the same block width
///
/// # Returns
/// Column-cloned operand. Costs the multiply plus the reduction's mask level.
pub fn product_row<E: HomomorphicEngine>(
    engine: &E,
    matrix: &EncryptedOperand<E::Ciphertext>,
    vector: &EncryptedOperand<E::Ciphertext>,
    row_size: usize,
) -> Result<EncryptedOperand<E::Ciphertext>> {
    let m = expect_matrix(matrix, row_size)?;
    let v = vector.expect(SlotLayout::VecRowCloned { row_size })?;

    let prod = engine.mul(m, v)?;
    let sum = engine.sum_cols(&prod, row_size)?;
    Ok(EncryptedOperand::new(
        sum,
        SlotLayout::VecColCloned { row_size },
    ))
}

/// Column product: `Mᵀ·r`, one value per matrix column, row-cloned
///
/// # Arguments
/// * `matrix` - row-major matrix operand
/// * `vector` - column-cloned vector operand with the same block width
///
/// # Returns
/// Row-cloned operand. Costs one level.
pub fn product_col<E: HomomorphicEngine>(
    engine: &E,
    matrix: &EncryptedOperand<E::Ciphertext>,
    vector: &EncryptedOperand<E::Ciphertext>,
    row_size: usize,
) -> Result<EncryptedOperand<E::Ciphertext>> {
    let m = expect_matrix(matrix, row_size)?;
    let v = vector.expect(SlotLayout::VecColCloned { row_size })?;

    let prod = engine.mul(m, v)?;
    let sum = engine.sum_rows(&prod, row_size)?;
    Ok(EncryptedOperand::new(
        sum,
        SlotLayout::VecRowCloned { row_size },
    ))
}

fn expect_matrix<C>(operand: &EncryptedOperand<C>, row_size: usize) -> Result<&C> {
    match operand.layout() {
        SlotLayout::MatRowMajor { row_size: r, .. } if r == row_size => Ok(operand.ciphertext()),
        found => Err(crate::error::Error::LayoutMismatch {
            expected: format!("MAT_ROW_MAJOR({}, _)", row_size),
            found,
        }),
    }
}

/// Encrypted training inputs, packed once and reused every iteration
#[derive(Clone, Debug)]
pub struct EncryptedDataset<C> {
    /// `X`, row-major
    pub x: EncryptedOperand<C>,
    /// `-(γ/n)·X`, row-major
    pub neg_xt: EncryptedOperand<C>,
    /// Labels, column-cloned
    pub y: EncryptedOperand<C>,
    /// Block width
    pub row_size: usize,
}

impl<C> EncryptedDataset<C> {
    /// Pack and encrypt `X`, `-(γ/n)·X` and `y`
    pub fn encrypt<E>(
        engine: &E,
        pk: &E::PublicKey,
        x: &PlainMatrix,
        y: &[f64],
        row_size: usize,
        learning_rate: f64,
    ) -> Result<Self>
    where
        E: HomomorphicEngine<Ciphertext = C>,
    {
        if x.rows() != y.len() {
            return Err(config_err!(
                "X has {} rows but y has {} labels",
                x.rows(),
                y.len()
            ));
        }
        let num_slots = engine.num_slots();
        let neg_xt = initialize_neg_xt(x, learning_rate)?;

        Ok(Self {
            x: encrypt_slots(engine, pk, &encode_matrix_row_major(x, row_size, num_slots)?)?,
            neg_xt: encrypt_slots(
                engine,
                pk,
                &encode_matrix_row_major(&neg_xt, row_size, num_slots)?,
            )?,
            y: encrypt_slots(
                engine,
                pk,
                &encode_vector_column_cloned(y, row_size, num_slots, 0.0)?,
            )?,
            row_size,
        })
    }
}

/// Scaled gradient `-(γ/n)·Xᵀ·(y - σ(X·θ))`, row-cloned
///
/// `θ` must be row-cloned. Logits must stay inside the sigmoid range; the
/// approximation degrades silently outside it.
pub fn compute_gradient<E: HomomorphicEngine>(
    engine: &E,
    data: &EncryptedDataset<E::Ciphertext>,
    theta: &EncryptedOperand<E::Ciphertext>,
    sigmoid: &SigmoidApprox,
) -> Result<EncryptedOperand<E::Ciphertext>> {
    let row_size = data.row_size;
    let logits = product_row(engine, &data.x, theta, row_size)?;

    let predictions = engine.approximate_sigmoid(
        logits.ciphertext(),
        sigmoid.low,
        sigmoid.high,
        sigmoid.degree,
    )?;
    let y = data.y.expect(SlotLayout::VecColCloned { row_size })?;
    let residual = EncryptedOperand::new(
        engine.sub(y, &predictions)?,
        SlotLayout::VecColCloned { row_size },
    );

    product_col(engine, &data.neg_xt, &residual, row_size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::{decode_column_cloned, decode_row_cloned, encode_vector_row_cloned};
    use crate::engine::{decrypt_operand, KeyPair, SimPublicKey, SimSecretKey, SimulatedEngine};
    use crate::error::Error;
    use crate::params::EngineParams;

    fn setup(num_slots: usize, row_size: usize) -> (SimulatedEngine, KeyPair<SimPublicKey, SimSecretKey>) {
        let mut engine = SimulatedEngine::new(EngineParams::interactive(2 * num_slots)).unwrap();
        let keys = engine.key_gen();
        engine.gen_mult_key(&keys.secret).unwrap();
        engine.gen_sum_cols_keys(&keys.secret).unwrap();
        engine.gen_sum_rows_keys(&keys.secret, row_size).unwrap();
        (engine, keys)
    }

    #[test]
    fn test_product_row() {
        let (engine, keys) = setup(16, 4);
        let x = PlainMatrix::from_rows(vec![vec![1.0, 2.0, 3.0], vec![-1.0, 0.5, 0.0]]).unwrap();
        let xe = encrypt_slots(&engine, &keys.public, &encode_matrix_row_major(&x, 4, 16).unwrap()).unwrap();
        let th = encrypt_slots(
            &engine,
            &keys.public,
            &encode_vector_row_cloned(&[1.0, 1.0, 2.0], 4, 16, 0.0).unwrap(),
        )
        .unwrap();

        let out = product_row(&engine, &xe, &th, 4).unwrap();
        assert_eq!(out.layout(), SlotLayout::VecColCloned { row_size: 4 });
        assert_eq!(engine.depth(out.ciphertext()), 2);

        let slots = decrypt_operand(&engine, &keys.secret, &out).unwrap();
        assert_eq!(decode_column_cloned(&slots, 2, 0.0).unwrap(), vec![9.0, -0.5]);
    }

    #[test]
    fn test_product_col_is_transposed() {
        let (engine, keys) = setup(16, 4);
        let x = PlainMatrix::from_rows(vec![vec![1.0, 2.0, 3.0], vec![-1.0, 0.5, 0.0]]).unwrap();
        let xe = encrypt_slots(&engine, &keys.public, &encode_matrix_row_major(&x, 4, 16).unwrap()).unwrap();
        let r = encrypt_slots(
            &engine,
            &keys.public,
            &encode_vector_column_cloned(&[2.0, 4.0], 4, 16, 0.0).unwrap(),
        )
        .unwrap();

        let out = product_col(&engine, &xe, &r, 4).unwrap();
        assert_eq!(engine.depth(out.ciphertext()), 1);
        let slots = decrypt_operand(&engine, &keys.secret, &out).unwrap();
        assert_eq!(
            decode_row_cloned(&slots, 3, 0.0).unwrap(),
            vec![-2.0, 6.0, 6.0]
        );
    }

    #[test]
    fn test_product_rejects_wrong_layout() {
        let (engine, keys) = setup(16, 4);
        let v = encrypt_slots(
            &engine,
            &keys.public,
            &encode_vector_row_cloned(&[1.0], 4, 16, 0.0).unwrap(),
        )
        .unwrap();
        let err = product_row(&engine, &v, &v, 4).unwrap_err();
        assert!(matches!(err, Error::LayoutMismatch { .. }));
    }

    #[test]
    fn test_neg_xt_scaling() {
        let x = PlainMatrix::from_rows(vec![vec![2.0], vec![4.0]]).unwrap();
        let m = initialize_neg_xt(&x, 0.5).unwrap();
        assert_eq!(m.as_slice(), &[-0.5, -1.0]);
        assert!(initialize_neg_xt(&PlainMatrix::zeros(0, 0), 0.1).is_err());
    }

    #[test]
    fn test_dataset_label_mismatch() {
        let (engine, keys) = setup(16, 4);
        let x = PlainMatrix::zeros(3, 2);
        let err = EncryptedDataset::encrypt(&engine, &keys.public, &x, &[1.0, 0.0], 4, 0.1)
            .unwrap_err();
        assert!(err.is_configuration());
    }
}
