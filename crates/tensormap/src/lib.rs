//! Labeled block-sparse tensor collections.
//!
//! A [`TensorMap`] stores dense blocks indexed by integer key tuples. Each
//! [`TensorBlock`] carries named metadata ([`Labels`]) for its samples (rows),
//! components (interior axes) and properties (last axis), plus optional
//! [`Gradient`] data with respect to named parameters.
//!
//! # Design
//!
//! - Keys and blocks are parallel arrays; lookup by key goes through the
//!   position index each [`Labels`] builds at construction
//! - Values are row-major [`DenseArray`]s generic over the scalar type `T`
//!   (f64, f32, Complex64)
//! - Merge operations build a complete new tensor map before replacing the
//!   old one, so a failed merge leaves the input untouched
//!
//! # Core operations
//!
//! - [`TensorMap::keys_to_properties`]: fold a key variable into the property
//!   axis, merging blocks that agree on the remaining keys
//! - [`TensorMap::keys_to_samples`]: fold a key variable into the sample axis
//! - [`TensorMap::select`]: select blocks by a partial or complete key
//! - [`TensorMap::sum_over_samples`]: sum rows over some sample variables
//!
//! # Example
//!
//! ```
//! use tensormap::{DenseArray, Labels, MergeOptions, TensorBlock, TensorMap};
//!
//! let block = |fill: f64| {
//!     let samples = Labels::new(["structure"], vec![vec![0], vec![1]]).unwrap();
//!     let values = DenseArray::from_vec(vec![2, 1], vec![fill, fill]).unwrap();
//!     TensorBlock::new(values, samples, vec![], Labels::range("n", 1).unwrap()).unwrap()
//! };
//!
//! let mut tensor = TensorMap::from_pairs(
//!     ["center", "neighbor"],
//!     vec![(vec![1, 1], block(1.0)), (vec![1, 8], block(2.0))],
//! )
//! .unwrap();
//!
//! tensor.keys_to_properties("neighbor", &MergeOptions::default()).unwrap();
//! assert_eq!(tensor.len(), 1);
//! assert_eq!(tensor.blocks()[0].values().shape(), &[2, 2]);
//! ```

mod block;
mod dense;
mod error;
mod labels;
pub mod merge;
mod options;
mod reduce;
mod scalar;
mod tensor;

pub use block::{Gradient, TensorBlock, GRADIENT_SAMPLE};
pub use dense::DenseArray;
pub use error::{Result, TensorMapError};
pub use labels::Labels;
pub use options::MergeOptions;
pub use scalar::Scalar;
pub use tensor::{BlockSelection, Selected, TensorMap};
