//! Blocks of dense values with sample, component and property labels.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::dense::DenseArray;
use crate::error::{shape_mismatch, Result, TensorMapError};
use crate::labels::Labels;
use crate::scalar::Scalar;

/// Name of the gradient sample variable pointing at a row of the owning block.
pub const GRADIENT_SAMPLE: &str = "sample";

/// Derivative data of a block with respect to one parameter.
///
/// The data shape is `[samples, components..., properties]`. The sample
/// labels start with a [`GRADIENT_SAMPLE`] column holding a row index of the
/// owning block; the component list is the gradient's own components
/// followed by the block's components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    try_from = "RawGradient<T>",
    bound(serialize = "T: Scalar", deserialize = "T: Scalar")
)]
pub struct Gradient<T> {
    pub(crate) samples: Labels,
    pub(crate) components: Vec<Labels>,
    pub(crate) data: DenseArray<T>,
}

#[derive(Deserialize)]
#[serde(bound(deserialize = "T: Scalar"))]
struct RawGradient<T> {
    samples: Labels,
    components: Vec<Labels>,
    data: DenseArray<T>,
}

impl<T: Scalar> TryFrom<RawGradient<T>> for Gradient<T> {
    type Error = TensorMapError;

    fn try_from(raw: RawGradient<T>) -> Result<Self> {
        Self::new(raw.data, raw.samples, raw.components)
    }
}

impl<T: Scalar> Gradient<T> {
    /// Create gradient data.
    ///
    /// Checks the gradient on its own; the relation to the owning block is
    /// checked by [`TensorBlock::add_gradient`].
    pub fn new(data: DenseArray<T>, samples: Labels, components: Vec<Labels>) -> Result<Self> {
        if samples.names().first().map(String::as_str) != Some(GRADIENT_SAMPLE) {
            return Err(TensorMapError::InvalidGradient(format!(
                "first gradient sample variable must be '{GRADIENT_SAMPLE}', got {:?}",
                samples.names()
            )));
        }
        if samples.iter().any(|e| e[0] < 0) {
            return Err(TensorMapError::InvalidGradient(
                "negative sample reference".to_string(),
            ));
        }
        check_axes(&data, &samples, &components, None)?;
        Ok(Self {
            samples,
            components,
            data,
        })
    }

    /// Gradient sample labels, starting with the `sample` column.
    pub fn samples(&self) -> &Labels {
        &self.samples
    }

    /// Gradient components followed by the block components.
    pub fn components(&self) -> &[Labels] {
        &self.components
    }

    /// Gradient data, `[samples, components..., properties]`.
    pub fn data(&self) -> &DenseArray<T> {
        &self.data
    }

    /// Rows of the owning block referenced by each gradient sample.
    pub fn sample_references(&self) -> Vec<usize> {
        self.samples.iter().map(|e| e[0] as usize).collect()
    }
}

/// One dense block of a [`TensorMap`](crate::TensorMap).
///
/// Values have shape `[samples, components..., properties]`.
///
/// # Examples
///
/// ```
/// use tensormap::{DenseArray, Labels, TensorBlock};
///
/// let samples = Labels::new(["structure"], vec![vec![0], vec![1]]).unwrap();
/// let properties = Labels::new(["n"], vec![vec![0], vec![1], vec![2]]).unwrap();
/// let values = DenseArray::from_fn(vec![2, 3], |i| i as f64).unwrap();
///
/// let block = TensorBlock::new(values, samples, vec![], properties).unwrap();
/// assert_eq!(block.values().shape(), &[2, 3]);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    try_from = "RawBlock<T>",
    bound(serialize = "T: Scalar", deserialize = "T: Scalar")
)]
pub struct TensorBlock<T> {
    pub(crate) samples: Labels,
    pub(crate) components: Vec<Labels>,
    pub(crate) properties: Labels,
    pub(crate) values: DenseArray<T>,
    pub(crate) gradients: BTreeMap<String, Gradient<T>>,
}

#[derive(Deserialize)]
#[serde(bound(deserialize = "T: Scalar"))]
struct RawBlock<T> {
    samples: Labels,
    components: Vec<Labels>,
    properties: Labels,
    values: DenseArray<T>,
    gradients: BTreeMap<String, Gradient<T>>,
}

impl<T: Scalar> TryFrom<RawBlock<T>> for TensorBlock<T> {
    type Error = TensorMapError;

    fn try_from(raw: RawBlock<T>) -> Result<Self> {
        let mut block = Self::new(raw.values, raw.samples, raw.components, raw.properties)?;
        for (parameter, gradient) in raw.gradients {
            block.add_gradient(&parameter, gradient)?;
        }
        Ok(block)
    }
}

fn check_axes<T: Scalar>(
    data: &DenseArray<T>,
    samples: &Labels,
    components: &[Labels],
    properties: Option<&Labels>,
) -> Result<()> {
    let mut expected = Vec::with_capacity(components.len() + 2);
    expected.push(samples.len());
    expected.extend(components.iter().map(Labels::len));
    if data.rank() != expected.len() + 1 {
        return Err(shape_mismatch(format!(
            "array of rank {} cannot hold samples, {} components and properties",
            data.rank(),
            components.len()
        )));
    }
    if let Some(properties) = properties {
        expected.push(properties.len());
    } else {
        expected.push(data.shape()[data.rank() - 1]);
    }
    if data.shape() != expected {
        return Err(shape_mismatch(format!(
            "array shape {:?} does not match labels shape {:?}",
            data.shape(),
            expected
        )));
    }
    Ok(())
}

impl<T: Scalar> TensorBlock<T> {
    /// Create a block without gradients.
    ///
    /// # Errors
    /// `ShapeMismatch` if an axis length disagrees with its labels.
    pub fn new(
        values: DenseArray<T>,
        samples: Labels,
        components: Vec<Labels>,
        properties: Labels,
    ) -> Result<Self> {
        check_axes(&values, &samples, &components, Some(&properties))?;
        Ok(Self {
            samples,
            components,
            properties,
            values,
            gradients: BTreeMap::new(),
        })
    }

    /// Labels of the rows.
    pub fn samples(&self) -> &Labels {
        &self.samples
    }

    /// Labels of the interior axes, in order.
    pub fn components(&self) -> &[Labels] {
        &self.components
    }

    /// Labels of the last axis.
    pub fn properties(&self) -> &Labels {
        &self.properties
    }

    /// Block values, `[samples, components..., properties]`.
    pub fn values(&self) -> &DenseArray<T> {
        &self.values
    }

    /// Attach gradient data with respect to `parameter`.
    ///
    /// # Errors
    /// - `InvalidGradient` if the parameter is already present or a sample
    ///   reference is not a row of this block
    /// - `ShapeMismatch` if the trailing components or the property axis
    ///   disagree with this block
    pub fn add_gradient(&mut self, parameter: &str, gradient: Gradient<T>) -> Result<()> {
        if self.gradients.contains_key(parameter) {
            return Err(TensorMapError::InvalidGradient(format!(
                "gradient with respect to '{parameter}' already exists"
            )));
        }

        let n_samples = self.samples.len();
        if let Some(bad) = gradient.sample_references().into_iter().find(|&s| s >= n_samples) {
            return Err(TensorMapError::InvalidGradient(format!(
                "gradient sample {bad} out of range for a block with {n_samples} samples"
            )));
        }

        let n_own = gradient
            .components
            .len()
            .checked_sub(self.components.len())
            .ok_or_else(|| shape_mismatch("gradient has fewer components than its block"))?;
        if gradient.components[n_own..] != self.components[..] {
            return Err(shape_mismatch(
                "gradient components must end with the block components",
            ));
        }
        check_axes(
            &gradient.data,
            &gradient.samples,
            &gradient.components,
            Some(&self.properties),
        )?;

        self.gradients.insert(parameter.to_string(), gradient);
        Ok(())
    }

    /// Gradient with respect to `parameter`, if present.
    pub fn gradient(&self, parameter: &str) -> Option<&Gradient<T>> {
        self.gradients.get(parameter)
    }

    /// Whether a gradient with respect to `parameter` is attached.
    pub fn has_gradient(&self, parameter: &str) -> bool {
        self.gradients.contains_key(parameter)
    }

    /// Gradient parameter names, sorted.
    pub fn gradient_parameters(&self) -> impl Iterator<Item = &str> + '_ {
        self.gradients.keys().map(String::as_str)
    }

    /// Iterate over `(parameter, gradient)` pairs, sorted by parameter.
    pub fn gradients(&self) -> impl Iterator<Item = (&str, &Gradient<T>)> + '_ {
        self.gradients.iter().map(|(k, g)| (k.as_str(), g))
    }
}
