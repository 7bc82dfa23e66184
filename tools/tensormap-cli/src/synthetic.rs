//! Synthetic per-atom tensor maps.
//!
//! Stands in for a representation calculator: every structure holds the
//! same number of atoms with pseudo-random species, and each block carries
//! `positions` gradients with respect to every atom of its structure.

use anyhow::Result;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use tensormap::{DenseArray, Gradient, Labels, TensorBlock, TensorMap};

/// Chemical species drawn for the atoms.
pub const SPECIES: [i32; 3] = [1, 6, 8];

/// Shape of a synthetic tensor map.
#[derive(Debug, Clone)]
pub struct SyntheticOptions {
    pub seed: u64,
    pub n_structures: usize,
    pub atoms_per_structure: usize,
    pub max_l: i32,
    pub n_properties: usize,
}

impl Default for SyntheticOptions {
    fn default() -> Self {
        Self {
            seed: 0,
            n_structures: 4,
            atoms_per_structure: 3,
            max_l: 2,
            n_properties: 4,
        }
    }
}

/// Build a tensor map with keys `(l, center, neighbor)` and samples
/// `(structure, atom)`.
///
/// A block exists for every `l` and every pair of species present in the
/// generated structures; it holds one row per atom of species `center`.
pub fn generate(options: &SyntheticOptions) -> Result<TensorMap<f64>> {
    let mut rng = ChaCha8Rng::seed_from_u64(options.seed);
    let species: Vec<Vec<i32>> = (0..options.n_structures)
        .map(|_| {
            (0..options.atoms_per_structure)
                .map(|_| SPECIES[rng.random_range(0..SPECIES.len())])
                .collect()
        })
        .collect();
    let mut present: Vec<i32> = species.iter().flatten().copied().collect();
    present.sort_unstable();
    present.dedup();

    let mut pairs = Vec::new();
    for l in 0..=options.max_l {
        for &center in &present {
            for &neighbor in &present {
                let block = make_block(&mut rng, &species, l, center, options.n_properties)?;
                pairs.push((vec![l, center, neighbor], block));
            }
        }
    }
    Ok(TensorMap::from_pairs(["l", "center", "neighbor"], pairs)?)
}

fn make_block(
    rng: &mut ChaCha8Rng,
    species: &[Vec<i32>],
    l: i32,
    center: i32,
    n_properties: usize,
) -> Result<TensorBlock<f64>> {
    let mut sample_entries = Vec::new();
    let mut gradient_entries = Vec::new();
    for (structure, atoms) in species.iter().enumerate() {
        for (atom, &s) in atoms.iter().enumerate() {
            if s != center {
                continue;
            }
            let row = sample_entries.len() as i32;
            sample_entries.push(vec![structure as i32, atom as i32]);
            for other in 0..atoms.len() {
                gradient_entries.push(vec![row, structure as i32, other as i32]);
            }
        }
    }

    let samples = Labels::new(["structure", "atom"], sample_entries)?;
    let m = Labels::range("m", (2 * l + 1) as usize)?;
    let properties = Labels::range("n", n_properties)?;

    let values = DenseArray::from_fn(vec![samples.len(), m.len(), n_properties], |_| {
        rng.random::<f64>()
    })?;
    let data = DenseArray::from_fn(
        vec![gradient_entries.len(), 3, m.len(), n_properties],
        |_| rng.random::<f64>() - 0.5,
    )?;
    let gradient = Gradient::new(
        data,
        Labels::new(["sample", "structure", "atom"], gradient_entries)?,
        vec![Labels::range("xyz", 3)?, m.clone()],
    )?;

    let mut block = TensorBlock::new(values, samples, vec![m], properties)?;
    block.add_gradient("positions", gradient)?;
    Ok(block)
}
