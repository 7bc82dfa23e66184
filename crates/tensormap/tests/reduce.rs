mod common;

use approx::assert_relative_eq;
use common::{all_keys, gradient_marker, tensor};
use tensormap::TensorMapError;

#[test]
fn test_sum_over_samples_per_structure() {
    let keys = all_keys(&[0], &[1], &[1, 6]);
    let t = tensor(23, &keys, 3, 4, 2);
    let summed = t.sum_over_samples(&["atom"]).unwrap();

    assert_eq!(summed.keys(), t.keys());
    for ((_, block), (_, original)) in summed.iter().zip(t.iter()) {
        assert_eq!(block.samples().entries(), &[vec![0], vec![1], vec![2]]);
        for (row, structure) in block.samples().iter().enumerate() {
            let rows = original.samples().rows_where("structure", structure[0]).unwrap();
            for (k, &v) in block.values().row(row).iter().enumerate() {
                let expected: f64 = rows.iter().map(|&r| original.values().row(r)[k]).sum();
                assert_relative_eq!(v, expected, epsilon = 1e-12);
            }
        }

        // one gradient row per (structure, atom) with the atom contributions summed
        let gradient = block.gradient("positions").unwrap();
        assert_eq!(gradient.samples().len(), 12);
        for (row, entry) in gradient.samples().iter().enumerate() {
            assert_eq!(block.samples().entry(entry[0] as usize)[0], entry[1]);
            let marker_sum: f64 = (0..4).map(|a| gradient_marker(entry[1], a, 1)).sum();
            assert_relative_eq!(gradient.data().row(row)[0], marker_sum);
        }
    }
}

#[test]
fn test_sum_over_every_sample_variable_fails() {
    let t = tensor(24, &all_keys(&[0], &[1], &[1]), 2, 2, 1);
    assert!(matches!(
        t.sum_over_samples(&["structure", "atom"]),
        Err(TensorMapError::InvalidLabels(_))
    ));
    assert!(matches!(
        t.sum_over_samples(&["center"]),
        Err(TensorMapError::UnknownVariable { .. })
    ));
}
