//! Keyed collections of blocks.

use serde::{Deserialize, Serialize};

use crate::block::TensorBlock;
use crate::error::{shape_mismatch, Result, TensorMapError};
use crate::labels::Labels;
use crate::scalar::Scalar;

/// A collection of blocks indexed by key entries.
///
/// Keys and blocks are stored as parallel arrays: `blocks[i]` belongs to
/// `keys.entry(i)`. Key lookup goes through the position index of `keys`,
/// which is rebuilt whenever the keys are replaced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    try_from = "RawTensorMap<T>",
    bound(serialize = "T: Scalar", deserialize = "T: Scalar")
)]
pub struct TensorMap<T> {
    pub(crate) keys: Labels,
    pub(crate) blocks: Vec<TensorBlock<T>>,
}

#[derive(Deserialize)]
#[serde(bound(deserialize = "T: Scalar"))]
struct RawTensorMap<T> {
    keys: Labels,
    blocks: Vec<TensorBlock<T>>,
}

impl<T: Scalar> TryFrom<RawTensorMap<T>> for TensorMap<T> {
    type Error = TensorMapError;

    fn try_from(raw: RawTensorMap<T>) -> Result<Self> {
        Self::new(raw.keys, raw.blocks)
    }
}

/// Result of [`TensorMap::select`].
#[derive(Debug)]
pub enum Selected<'a, T> {
    /// Every key variable was constrained and one block matched.
    Block(&'a TensorBlock<T>),
    /// Only some key variables were constrained; all matching blocks.
    Blocks(BlockSelection<'a, T>),
}

/// A view over the blocks of a tensor map matching a partial key.
#[derive(Debug)]
pub struct BlockSelection<'a, T> {
    tensor: &'a TensorMap<T>,
    positions: Vec<usize>,
}

impl<'a, T: Scalar> BlockSelection<'a, T> {
    /// Number of selected blocks.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Whether no block was selected.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Positions of the selected blocks in the tensor map.
    pub fn positions(&self) -> &[usize] {
        &self.positions
    }

    /// Iterate over `(key entry, block)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&'a [i32], &'a TensorBlock<T>)> + '_ {
        let tensor = self.tensor;
        self.positions
            .iter()
            .map(move |&i| (tensor.keys.entry(i), &tensor.blocks[i]))
    }

    /// Key entries of the selected blocks.
    pub fn keys(&self) -> Labels {
        self.tensor.keys.select_rows(&self.positions)
    }

    /// Copy the selected blocks into a new tensor map.
    pub fn to_tensor_map(&self) -> TensorMap<T> {
        TensorMap {
            keys: self.keys(),
            blocks: self
                .positions
                .iter()
                .map(|&i| self.tensor.blocks[i].clone())
                .collect(),
        }
    }
}

impl<T: Scalar> TensorMap<T> {
    /// Create a tensor map.
    ///
    /// # Errors
    /// - `ShapeMismatch` if there is not exactly one block per key, or the
    ///   blocks disagree on sample or property variable names
    pub fn new(keys: Labels, blocks: Vec<TensorBlock<T>>) -> Result<Self> {
        if keys.len() != blocks.len() {
            return Err(shape_mismatch(format!(
                "{} keys for {} blocks",
                keys.len(),
                blocks.len()
            )));
        }
        if let Some(first) = blocks.first() {
            for block in &blocks[1..] {
                if block.samples.names() != first.samples.names() {
                    return Err(shape_mismatch(format!(
                        "blocks have different sample names: {:?} and {:?}",
                        first.samples.names(),
                        block.samples.names()
                    )));
                }
                if block.properties.names() != first.properties.names() {
                    return Err(shape_mismatch(format!(
                        "blocks have different property names: {:?} and {:?}",
                        first.properties.names(),
                        block.properties.names()
                    )));
                }
            }
        }
        Ok(Self { keys, blocks })
    }

    /// Create a tensor map from `(key entry, block)` pairs.
    ///
    /// # Errors
    /// `DuplicateKey` if two blocks share a key entry, plus the errors of
    /// [`TensorMap::new`].
    pub fn from_pairs<S: Into<String>>(
        key_names: impl IntoIterator<Item = S>,
        pairs: Vec<(Vec<i32>, TensorBlock<T>)>,
    ) -> Result<Self> {
        let (entries, blocks): (Vec<_>, Vec<_>) = pairs.into_iter().unzip();
        Self::new(Labels::new(key_names, entries)?, blocks)
    }

    /// Key entries, one per block.
    pub fn keys(&self) -> &Labels {
        &self.keys
    }

    /// Blocks, in key order.
    pub fn blocks(&self) -> &[TensorBlock<T>] {
        &self.blocks
    }

    /// Number of blocks.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Whether the tensor map holds no blocks.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Iterate over `(key entry, block)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&[i32], &TensorBlock<T>)> + '_ {
        self.keys.iter().zip(&self.blocks)
    }

    /// Block at arena position `i`.
    pub fn block_by_id(&self, i: usize) -> Option<&TensorBlock<T>> {
        self.blocks.get(i)
    }

    /// Block with exactly this key entry.
    pub fn block_by_key(&self, entry: &[i32]) -> Option<&TensorBlock<T>> {
        self.keys.position(entry).map(|i| &self.blocks[i])
    }

    /// Sample variable names shared by all blocks (`None` if empty).
    pub fn sample_names(&self) -> Option<&[String]> {
        self.blocks.first().map(|b| b.samples.names())
    }

    /// Property variable names shared by all blocks (`None` if empty).
    pub fn property_names(&self) -> Option<&[String]> {
        self.blocks.first().map(|b| b.properties.names())
    }

    /// Positions of the blocks whose keys satisfy every constraint.
    ///
    /// # Errors
    /// `UnknownVariable` if a constrained variable is not a key variable.
    pub fn blocks_matching(&self, selection: &[(&str, i32)]) -> Result<Vec<usize>> {
        let constraints = selection
            .iter()
            .map(|&(name, value)| -> Result<(usize, i32)> {
                Ok((self.keys.variable_index(name)?, value))
            })
            .collect::<Result<Vec<_>>>()?;
        if constraints.len() == self.keys.size() {
            let mut entry = vec![0; constraints.len()];
            for &(var, value) in &constraints {
                entry[var] = value;
            }
            let distinct = {
                let mut vars: Vec<_> = constraints.iter().map(|c| c.0).collect();
                vars.sort_unstable();
                vars.dedup();
                vars.len() == constraints.len()
            };
            if distinct {
                return Ok(self.keys.position(&entry).into_iter().collect());
            }
        }
        Ok(self
            .keys
            .iter()
            .enumerate()
            .filter(|(_, key)| constraints.iter().all(|&(var, value)| key[var] == value))
            .map(|(i, _)| i)
            .collect())
    }

    /// Select blocks by a partial or complete key.
    ///
    /// A complete key yields [`Selected::Block`]; a partial key yields
    /// [`Selected::Blocks`], even when a single block matches.
    ///
    /// # Errors
    /// - `UnknownVariable` for a constraint on an unknown key variable
    /// - `NotFound` if no block matches
    ///
    /// # Examples
    ///
    /// ```
    /// use tensormap::{DenseArray, Labels, Selected, TensorBlock, TensorMap};
    ///
    /// let block = |v: f64| {
    ///     let values = DenseArray::from_vec(vec![1, 1], vec![v]).unwrap();
    ///     TensorBlock::new(values, Labels::single(), vec![], Labels::single()).unwrap()
    /// };
    /// let tensor = TensorMap::from_pairs(
    ///     ["l", "center"],
    ///     vec![(vec![3, 1], block(1.0)), (vec![3, 6], block(2.0)), (vec![2, 1], block(3.0))],
    /// )
    /// .unwrap();
    ///
    /// match tensor.select(&[("l", 3)]).unwrap() {
    ///     Selected::Blocks(selection) => assert_eq!(selection.len(), 2),
    ///     Selected::Block(_) => unreachable!(),
    /// }
    /// assert!(tensor.select(&[("l", 5)]).is_err());
    /// ```
    pub fn select(&self, selection: &[(&str, i32)]) -> Result<Selected<'_, T>> {
        let positions = self.blocks_matching(selection)?;
        if positions.is_empty() {
            return Err(TensorMapError::NotFound(describe(selection)));
        }
        let complete = self
            .keys
            .names()
            .iter()
            .all(|name| selection.iter().any(|(n, _)| n == name));
        if complete && positions.len() == 1 {
            Ok(Selected::Block(&self.blocks[positions[0]]))
        } else {
            Ok(Selected::Blocks(BlockSelection {
                tensor: self,
                positions,
            }))
        }
    }

    /// The single block matching the selection.
    ///
    /// # Errors
    /// - `NotFound` if no block matches
    /// - `AmbiguousSelection` if several blocks match
    pub fn block(&self, selection: &[(&str, i32)]) -> Result<&TensorBlock<T>> {
        let positions = self.blocks_matching(selection)?;
        match positions.as_slice() {
            [] => Err(TensorMapError::NotFound(describe(selection))),
            [i] => Ok(&self.blocks[*i]),
            _ => Err(TensorMapError::AmbiguousSelection {
                count: positions.len(),
            }),
        }
    }

    /// Replace keys and blocks as a whole.
    pub(crate) fn replace(&mut self, other: TensorMap<T>) {
        *self = other;
    }
}

fn describe(selection: &[(&str, i32)]) -> String {
    let parts: Vec<String> = selection
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect();
    format!("{{{}}}", parts.join(", "))
}
