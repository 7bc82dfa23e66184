//! Summing block rows over sample variables.

use std::collections::HashSet;

use tracing::debug;

use crate::block::{Gradient, TensorBlock};
use crate::error::{Result, TensorMapError};
use crate::labels::Labels;
use crate::scalar::Scalar;
use crate::tensor::TensorMap;

/// Sorted distinct entries and, for each input entry, its row in them.
fn unique_sorted(projected: Vec<Vec<i32>>) -> (Vec<Vec<i32>>, Vec<usize>) {
    let mut unique = projected.clone();
    unique.sort_unstable();
    unique.dedup();
    let targets = projected
        .iter()
        .map(|e| unique.binary_search(e).unwrap_or_default())
        .collect();
    (unique, targets)
}

fn sum_block<T: Scalar>(block: &TensorBlock<T>, removed: &HashSet<usize>) -> Result<TensorBlock<T>> {
    let kept: Vec<usize> = (0..block.samples.size())
        .filter(|i| !removed.contains(i))
        .collect();
    let names: Vec<String> = kept.iter().map(|&i| block.samples.names()[i].clone()).collect();

    let projected: Vec<Vec<i32>> = block
        .samples
        .iter()
        .map(|e| kept.iter().map(|&i| e[i]).collect())
        .collect();
    let (entries, targets) = unique_sorted(projected);
    let n_rows = entries.len();

    let mut summed = TensorBlock::new(
        block.values.sum_rows(&targets, n_rows),
        Labels::new(names, entries)?,
        block.components.clone(),
        block.properties.clone(),
    )?;

    for (parameter, gradient) in block.gradients() {
        let projected: Vec<Vec<i32>> = gradient
            .samples
            .iter()
            .map(|e| {
                let mut entry = e.to_vec();
                entry[0] = targets[e[0] as usize] as i32;
                entry
            })
            .collect();
        let (entries, gradient_targets) = unique_sorted(projected);
        let n_gradient_rows = entries.len();
        summed.add_gradient(
            parameter,
            Gradient::new(
                gradient.data.sum_rows(&gradient_targets, n_gradient_rows),
                Labels::new(gradient.samples.names().iter().cloned(), entries)?,
                gradient.components.clone(),
            )?,
        )?;
    }

    Ok(summed)
}

impl<T: Scalar> TensorMap<T> {
    /// Sum every block over the named sample variables.
    ///
    /// The named variables are removed from the samples and rows sharing the
    /// remaining sample values are summed; remaining entries come out sorted.
    /// Gradients are re-pointed to the summed rows and summed likewise. This
    /// turns, for example, a per-atom representation with samples
    /// `(structure, center)` into a per-structure one by summing over
    /// `center`.
    ///
    /// # Errors
    /// - `UnknownVariable` if a name is not a sample variable
    /// - `InvalidLabels` if every sample variable would be removed
    pub fn sum_over_samples(&self, names: &[&str]) -> Result<TensorMap<T>> {
        let mut blocks = Vec::with_capacity(self.blocks.len());
        for block in &self.blocks {
            let removed = names
                .iter()
                .map(|n| block.samples.variable_index(n))
                .collect::<Result<HashSet<_>>>()?;
            if removed.len() == block.samples.size() {
                return Err(TensorMapError::InvalidLabels(
                    "cannot sum over every sample variable".to_string(),
                ));
            }
            blocks.push(sum_block(block, &removed)?);
        }
        debug!(?names, n_blocks = blocks.len(), "summed over sample variables");
        TensorMap::new(self.keys.clone(), blocks)
    }
}
