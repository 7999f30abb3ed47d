//! Slot-layout laws over randomized shapes
//!
//! Tiling, replication, dual-packing round trip and capacity checks.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

use nesterov_he::encoding::{
    build_extraction_masks, compute_padded_dimensions, encode_dual_packed,
    encode_vector_column_cloned, encode_vector_row_cloned, extract_duals_plain,
    decode_row_cloned, SlotLayout,
};
use nesterov_he::Error;

fn random_vec(rng: &mut ChaCha20Rng, len: usize) -> Vec<f64> {
    (0..len).map(|_| rng.gen_range(-10.0..10.0)).collect()
}

/// `(row_size, num_slots)` pairs of powers of two with `row_size <= num_slots`
fn geometries() -> Vec<(usize, usize)> {
    let mut out = Vec::new();
    for slots_log in 1..=10 {
        for row_log in 0..=slots_log {
            out.push((1 << row_log, 1 << slots_log));
        }
    }
    out
}

#[test]
fn test_row_cloned_tiling_law() {
    let mut rng = ChaCha20Rng::seed_from_u64(1);
    for (row_size, num_slots) in geometries() {
        let len = rng.gen_range(0..=row_size);
        let v = random_vec(&mut rng, len);
        let sv = encode_vector_row_cloned(&v, row_size, num_slots, 0.0).unwrap();

        assert_eq!(sv.len(), num_slots);
        assert_eq!(sv.layout(), SlotLayout::VecRowCloned { row_size });

        let mut padded = v.clone();
        padded.resize(row_size, 0.0);
        for block in sv.values().chunks(row_size) {
            assert_eq!(block, &padded[..]);
        }
    }
}

#[test]
fn test_column_cloned_replication_law() {
    let mut rng = ChaCha20Rng::seed_from_u64(2);
    for (row_size, num_slots) in geometries() {
        let col_size = num_slots / row_size;
        let len = rng.gen_range(0..=col_size);
        let v = random_vec(&mut rng, len);
        let sv = encode_vector_column_cloned(&v, row_size, num_slots, 0.0).unwrap();

        assert_eq!(sv.len(), num_slots);
        for (i, &value) in sv.values().iter().enumerate() {
            let expected = v.get(i / row_size).copied().unwrap_or(0.0);
            assert_eq!(value, expected, "slot {} (row {}, slots {})", i, row_size, num_slots);
        }
    }
}

#[test]
fn test_dual_packed_round_trip() {
    let mut rng = ChaCha20Rng::seed_from_u64(3);
    for (row_size, num_slots) in geometries() {
        if num_slots < 2 * row_size {
            continue;
        }
        let len = rng.gen_range(1..=row_size);
        let a = random_vec(&mut rng, len);
        let b = random_vec(&mut rng, len);

        let packed = encode_dual_packed(&a, &b, row_size, num_slots, 0.0).unwrap();
        let masks = build_extraction_masks(row_size, num_slots).unwrap();
        let (theta, phi) = extract_duals_plain(&packed, &masks).unwrap();

        assert_eq!(decode_row_cloned(&theta, len, 0.0).unwrap(), a);
        assert_eq!(decode_row_cloned(&phi, len, 0.0).unwrap(), b);
    }
}

#[test]
fn test_padded_dimensions_law() {
    let mut rng = ChaCha20Rng::seed_from_u64(4);
    for slots_log in 1..=12 {
        let num_slots = 1usize << slots_log;
        for _ in 0..8 {
            let num_cols = rng.gen_range(1..=num_slots);
            let row_size = num_cols.next_power_of_two();
            let max_rows = num_slots / row_size;
            let num_rows = rng.gen_range(1..=max_rows);

            let (col_size, rs) = compute_padded_dimensions(num_rows, num_cols, num_slots).unwrap();
            assert_eq!(rs, row_size);
            assert!(rs >= num_cols && (rs == 1 || rs / 2 < num_cols));
            assert_eq!(rs * col_size, num_slots);
        }
    }
}

#[test]
fn test_padded_dimensions_no_fit() {
    assert!(compute_padded_dimensions(1, 1025, 1024).is_err());
    assert!(compute_padded_dimensions(300, 5, 1024).is_err());
}

#[test]
fn test_capacity_exceeded_produces_no_operand() {
    let v = vec![1.0; 5];
    match encode_vector_row_cloned(&v, 4, 16, 0.0) {
        Err(Error::CapacityExceeded { len, capacity, .. }) => {
            assert_eq!((len, capacity), (5, 4));
        }
        other => panic!("expected capacity error, got {:?}", other),
    }

    let v = vec![1.0; 9];
    let err = encode_vector_column_cloned(&v, 2, 16, 0.0).unwrap_err();
    assert!(err.is_configuration());
}
