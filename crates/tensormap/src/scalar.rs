//! Element types of block values and gradients.

use std::fmt::Debug;
use std::ops::{Add, AddAssign};

use num_complex::Complex64;
use num_traits::Zero;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Scalar types a [`TensorBlock`](crate::TensorBlock) can store.
///
/// Merges only move data and fill absent slabs with `zero()`; reductions
/// need addition.
pub trait Scalar:
    Copy
    + Debug
    + Default
    + PartialEq
    + Zero
    + Add<Output = Self>
    + AddAssign
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
    /// Type name used in diagnostics.
    const NAME: &'static str;

    /// Convert a real value.
    fn from_f64(val: f64) -> Self;
}

impl Scalar for f64 {
    const NAME: &'static str = "f64";

    fn from_f64(val: f64) -> Self {
        val
    }
}

impl Scalar for f32 {
    const NAME: &'static str = "f32";

    fn from_f64(val: f64) -> Self {
        val as f32
    }
}

impl Scalar for Complex64 {
    const NAME: &'static str = "Complex64";

    fn from_f64(val: f64) -> Self {
        Complex64::new(val, 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accumulate<T: Scalar>(values: &[f64]) -> T {
        let mut total = T::zero();
        for &v in values {
            total += T::from_f64(v);
        }
        total
    }

    #[test]
    fn test_accumulate() {
        assert_eq!(accumulate::<f64>(&[1.0, 2.5]), 3.5);
        assert_eq!(accumulate::<f32>(&[1.0, 2.5]), 3.5);
        assert_eq!(accumulate::<Complex64>(&[1.0, 2.5]), Complex64::new(3.5, 0.0));
    }

    #[test]
    fn test_names() {
        assert_eq!(f64::NAME, "f64");
        assert_eq!(<Complex64 as Scalar>::NAME, "Complex64");
        assert!(Complex64::default().is_zero());
    }
}
