//! Synthetic per-atom tensor maps shared by the integration tests.

#![allow(dead_code)]

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use tensormap::{DenseArray, Gradient, Labels, TensorBlock, TensorMap};

pub const KEY_NAMES: [&str; 3] = ["l", "center", "neighbor"];

/// Value stored in every `positions` gradient element of a row, encoding the
/// block sample the row was computed against.
pub fn gradient_marker(structure: i32, atom: i32, center: i32) -> f64 {
    f64::from(10_000 * center + 100 * structure + atom)
}

/// Sample entries `(structure, atom)`, structures in descending order.
pub fn samples(n_structures: i32, n_atoms: i32) -> Labels {
    let entries = (0..n_structures)
        .rev()
        .flat_map(|s| (0..n_atoms).map(move |a| vec![s, a]))
        .collect();
    Labels::new(["structure", "atom"], entries).unwrap()
}

/// One block for key `(l, center, neighbor)` with `2l+1` components and
/// `positions` gradients with respect to every atom of the same structure.
pub fn block(
    rng: &mut ChaCha8Rng,
    key: [i32; 3],
    n_structures: i32,
    n_atoms: i32,
    n_properties: usize,
) -> TensorBlock<f64> {
    let [l, center, _] = key;
    let samples = samples(n_structures, n_atoms);
    let m = Labels::range("m", (2 * l + 1) as usize).unwrap();
    let properties = Labels::range("n", n_properties).unwrap();
    let shape = vec![samples.len(), m.len(), n_properties];
    let values = DenseArray::from_fn(shape, |_| rng.random::<f64>()).unwrap();

    let mut gradient_entries = Vec::new();
    let mut markers = Vec::new();
    for (row, sample) in samples.iter().enumerate() {
        for atom in 0..n_atoms {
            gradient_entries.push(vec![row as i32, sample[0], atom]);
            markers.push(gradient_marker(sample[0], sample[1], center));
        }
    }
    let per_row = 3 * m.len() * n_properties;
    let gradient_data = DenseArray::from_fn(
        vec![gradient_entries.len(), 3, m.len(), n_properties],
        |i| markers[i / per_row],
    )
    .unwrap();
    let gradient = Gradient::new(
        gradient_data,
        Labels::new(["sample", "structure", "atom"], gradient_entries).unwrap(),
        vec![Labels::range("xyz", 3).unwrap(), m.clone()],
    )
    .unwrap();

    let mut block = TensorBlock::new(values, samples, vec![m], properties).unwrap();
    block.add_gradient("positions", gradient).unwrap();
    block
}

/// Tensor map with one block per key in `keys`.
pub fn tensor(seed: u64, keys: &[[i32; 3]], n_structures: i32, n_atoms: i32, n_properties: usize) -> TensorMap<f64> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let pairs = keys
        .iter()
        .map(|&key| (key.to_vec(), block(&mut rng, key, n_structures, n_atoms, n_properties)))
        .collect();
    TensorMap::from_pairs(KEY_NAMES, pairs).unwrap()
}

/// Every combination of the given key values.
pub fn all_keys(ls: &[i32], centers: &[i32], neighbors: &[i32]) -> Vec<[i32; 3]> {
    let mut keys = Vec::new();
    for &l in ls {
        for &c in centers {
            for &n in neighbors {
                keys.push([l, c, n]);
            }
        }
    }
    keys
}

pub fn total_samples(tensor: &TensorMap<f64>) -> usize {
    tensor.blocks().iter().map(|b| b.samples().len()).sum()
}

pub fn total_values(tensor: &TensorMap<f64>) -> usize {
    tensor.blocks().iter().map(|b| b.values().len()).sum()
}
