//! N-dimensional dense storage for block values and gradient data.

use mdarray::{DynRank, Shape, Tensor};
use serde::{Deserialize, Serialize, Serializer};

use crate::error::{shape_mismatch, Result, TensorMapError};
use crate::scalar::Scalar;

/// Row-major dense array wrapping `mdarray::Tensor<T>` with dynamic rank.
///
/// The first axis is the sample axis and the last axis the property axis
/// when the array belongs to a block. Rank 0 arrays are not allowed.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "RawDenseArray<T>", bound(deserialize = "T: Scalar"))]
pub struct DenseArray<T> {
    tensor: Tensor<T, DynRank>,
}

#[derive(Deserialize)]
#[serde(bound(deserialize = "T: Scalar"))]
struct RawDenseArray<T> {
    shape: Vec<usize>,
    data: Vec<T>,
}

#[derive(Serialize)]
#[serde(bound(serialize = "T: Scalar"))]
struct RawDenseArrayRef<'a, T> {
    shape: Vec<usize>,
    data: &'a [T],
}

impl<T: Scalar> TryFrom<RawDenseArray<T>> for DenseArray<T> {
    type Error = TensorMapError;

    fn try_from(raw: RawDenseArray<T>) -> Result<Self> {
        Self::from_vec(raw.shape, raw.data)
    }
}

impl<T: Scalar> Serialize for DenseArray<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        RawDenseArrayRef {
            shape: self.shape(),
            data: self.as_slice(),
        }
        .serialize(serializer)
    }
}

impl<T: PartialEq> PartialEq for DenseArray<T> {
    fn eq(&self, other: &Self) -> bool {
        let same_shape = self
            .tensor
            .shape()
            .with_dims(|a| other.tensor.shape().with_dims(|b| a == b));
        same_shape && self.tensor[..] == other.tensor[..]
    }
}

/// Number of elements of an array with this shape.
///
/// # Errors
/// `ShapeMismatch` if the shape is empty or the product overflows.
fn element_count(shape: &[usize]) -> Result<usize> {
    if shape.is_empty() {
        return Err(shape_mismatch("dense arrays need at least one axis"));
    }
    shape
        .iter()
        .try_fold(1usize, |acc, &dim| acc.checked_mul(dim))
        .ok_or_else(|| shape_mismatch(format!("shape {shape:?} is too large")))
}

impl<T: Scalar> DenseArray<T> {
    fn from_parts(shape: &[usize], data: Vec<T>) -> Self {
        Self {
            tensor: Tensor::from(data).into_shape(DynRank::from_dims(shape)),
        }
    }

    /// Wrap row-major data with the given shape.
    ///
    /// # Errors
    /// `ShapeMismatch` if the shape is empty, its product overflows or
    /// differs from `data.len()`.
    pub fn from_vec(shape: Vec<usize>, data: Vec<T>) -> Result<Self> {
        let expected = element_count(&shape)?;
        if expected != data.len() {
            return Err(shape_mismatch(format!(
                "shape {:?} holds {} elements, got {}",
                shape,
                expected,
                data.len()
            )));
        }
        Ok(Self::from_parts(&shape, data))
    }

    /// Create a zero-filled array.
    pub fn zeros(shape: Vec<usize>) -> Result<Self> {
        let len = element_count(&shape)?;
        Ok(Self::from_parts(&shape, vec![T::zero(); len]))
    }

    /// Create an array by evaluating `f` at every linear (row-major) position.
    pub fn from_fn(shape: Vec<usize>, f: impl FnMut(usize) -> T) -> Result<Self> {
        let len = element_count(&shape)?;
        Ok(Self::from_parts(&shape, (0..len).map(f).collect()))
    }

    /// Get the shape.
    pub fn shape(&self) -> Vec<usize> {
        self.tensor.shape().with_dims(|d| d.to_vec())
    }

    /// Get the rank (number of axes).
    pub fn rank(&self) -> usize {
        self.tensor.rank()
    }

    /// Get the total number of elements.
    pub fn len(&self) -> usize {
        self.tensor.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.tensor.is_empty()
    }

    /// Underlying data in row-major order.
    pub fn as_slice(&self) -> &[T] {
        &self.tensor[..]
    }

    /// Mutable underlying data in row-major order.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.tensor[..]
    }

    /// Convert to a Vec, consuming the array.
    pub fn into_vec(self) -> Vec<T> {
        self.tensor.into_vec()
    }

    /// Get a reference to the underlying tensor.
    pub fn tensor(&self) -> &Tensor<T, DynRank> {
        &self.tensor
    }

    /// Element at a multi-dimensional index, `None` when out of bounds.
    pub fn get(&self, index: &[usize]) -> Option<T> {
        let shape = self.shape();
        if index.len() != shape.len() {
            return None;
        }
        let mut linear = 0;
        for (&i, &dim) in index.iter().zip(&shape) {
            if i >= dim {
                return None;
            }
            linear = linear * dim + i;
        }
        self.as_slice().get(linear).copied()
    }

    /// Number of elements in one slice along the first axis.
    pub fn row_len(&self) -> usize {
        self.shape()[1..].iter().product()
    }

    /// Borrow one slice along the first axis.
    pub fn row(&self, i: usize) -> &[T] {
        let len = self.row_len();
        &self.as_slice()[i * len..(i + 1) * len]
    }

    /// Concatenate arrays along the last axis.
    ///
    /// All arrays must share every axis but the last. Each array is
    /// permuted so that its last axis leads, the contiguous slabs are
    /// stacked, and the result is permuted back.
    pub fn concat_last(arrays: &[&Self]) -> Result<Self> {
        let first = arrays
            .first()
            .ok_or_else(|| shape_mismatch("cannot concatenate zero arrays"))?;
        let first_shape = first.shape();
        let rank = first_shape.len();
        let leading = &first_shape[..rank - 1];
        for array in arrays {
            let shape = array.shape();
            if shape.len() != rank || &shape[..rank - 1] != leading {
                return Err(shape_mismatch(format!(
                    "cannot concatenate {first_shape:?} with {shape:?} along the last axis"
                )));
            }
        }

        // last axis first, then the leading axes in order
        let to_front: Vec<usize> = std::iter::once(rank - 1).chain(0..rank - 1).collect();
        let to_back: Vec<usize> = (1..rank).chain(std::iter::once(0)).collect();

        let mut total_last = 0;
        let mut data = Vec::new();
        for array in arrays {
            let permuted = array.tensor.permute(&to_front[..]).to_tensor();
            total_last += array.shape()[rank - 1];
            data.extend_from_slice(&permuted[..]);
        }

        let mut stacked_shape = vec![total_last];
        stacked_shape.extend_from_slice(leading);
        let stacked = Self::from_vec(stacked_shape, data)?;
        Ok(Self {
            tensor: stacked.tensor.permute(&to_back[..]).to_tensor(),
        })
    }

    /// Concatenate arrays along the first axis.
    ///
    /// All arrays must share every axis but the first.
    pub fn concat_first(arrays: &[&Self]) -> Result<Self> {
        let first = arrays
            .first()
            .ok_or_else(|| shape_mismatch("cannot concatenate zero arrays"))?;
        let first_shape = first.shape();
        let trailing = &first_shape[1..];
        let mut rows = 0;
        for array in arrays {
            let shape = array.shape();
            if &shape[1..] != trailing {
                return Err(shape_mismatch(format!(
                    "cannot concatenate {first_shape:?} with {shape:?} along the first axis"
                )));
            }
            rows += shape[0];
        }

        let mut data = Vec::with_capacity(arrays.iter().map(|a| a.len()).sum());
        for array in arrays {
            data.extend_from_slice(array.as_slice());
        }

        let mut shape = vec![rows];
        shape.extend_from_slice(trailing);
        Self::from_vec(shape, data)
    }

    /// Gather rows along the first axis; `rows[i]` is the source of row `i`.
    pub fn select_rows(&self, rows: &[usize]) -> Self {
        let len = self.row_len();
        let mut data = Vec::with_capacity(rows.len() * len);
        for &r in rows {
            data.extend_from_slice(self.row(r));
        }
        let mut shape = self.shape();
        shape[0] = rows.len();
        Self::from_parts(&shape, data)
    }

    /// Scatter-add rows: row `i` is added into output row `targets[i]`.
    ///
    /// # Panics
    /// If `targets.len()` differs from the number of rows or a target is not
    /// below `n_rows`.
    pub fn sum_rows(&self, targets: &[usize], n_rows: usize) -> Self {
        let mut shape = self.shape();
        assert_eq!(targets.len(), shape[0], "one target per row");
        let len = self.row_len();
        let mut data = vec![T::zero(); n_rows * len];
        for (i, &t) in targets.iter().enumerate() {
            assert!(t < n_rows, "target row {t} out of bounds");
            for (dst, &v) in data[t * len..(t + 1) * len].iter_mut().zip(self.row(i)) {
                *dst += v;
            }
        }
        shape[0] = n_rows;
        Self::from_parts(&shape, data)
    }
}
