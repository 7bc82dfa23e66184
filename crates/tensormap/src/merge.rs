//! Moving a key variable into the property or sample axis of the blocks.
//!
//! Both operations group the keys that agree on every variable but the moved
//! one, and merge each group into a single block:
//!
//! - [`keys_to_properties`] concatenates the group's blocks along the
//!   property axis, prefixing every property entry with the moved value.
//!   Values of the moved variable missing from a group give zero slabs.
//! - [`keys_to_samples`] concatenates them along the sample axis, adding the
//!   moved value as a trailing sample column. Missing values give no rows.
//!
//! Gradients follow their blocks. With
//! [`MergeOptions::sort_samples`], merged rows are sorted and gradient
//! `sample` references remapped.

use std::borrow::Cow;
use std::collections::HashMap;

use tracing::{debug, trace};

use crate::block::{Gradient, TensorBlock};
use crate::dense::DenseArray;
use crate::error::{shape_mismatch, Result};
use crate::labels::Labels;
use crate::options::MergeOptions;
use crate::scalar::Scalar;
use crate::tensor::TensorMap;

/// Keys grouped by every variable except one.
struct KeyGroups {
    names: Vec<String>,
    entries: Vec<Vec<i32>>,
    /// `(moved value, block position)`, sorted by moved value.
    members: Vec<Vec<(i32, usize)>>,
}

fn group_keys(keys: &Labels, variable: usize) -> KeyGroups {
    let names = keys
        .names()
        .iter()
        .enumerate()
        .filter(|&(i, _)| i != variable)
        .map(|(_, n)| n.clone())
        .collect();

    let mut index: HashMap<Vec<i32>, usize> = HashMap::new();
    let mut entries = Vec::new();
    let mut members: Vec<Vec<(i32, usize)>> = Vec::new();
    for (position, key) in keys.iter().enumerate() {
        let mut rest = key.to_vec();
        let moved = rest.remove(variable);
        let group = *index.entry(rest.clone()).or_insert_with(|| {
            entries.push(rest);
            members.push(Vec::new());
            members.len() - 1
        });
        members[group].push((moved, position));
    }
    for group in &mut members {
        group.sort_unstable_by_key(|&(value, _)| value);
    }

    KeyGroups {
        names,
        entries,
        members,
    }
}

/// Fail unless every block of a group carries gradients with respect to the
/// same parameters.
fn check_gradient_parameters<T: Scalar>(first: &TensorBlock<T>, block: &TensorBlock<T>) -> Result<()> {
    if !first.gradient_parameters().eq(block.gradient_parameters()) {
        return Err(shape_mismatch(format!(
            "blocks have gradients with respect to {:?} and {:?}",
            first.gradient_parameters().collect::<Vec<_>>(),
            block.gradient_parameters().collect::<Vec<_>>()
        )));
    }
    Ok(())
}

fn zero_slab<T: Scalar>(like: &DenseArray<T>, last: usize) -> Result<DenseArray<T>> {
    let mut shape = like.shape();
    if let Some(l) = shape.last_mut() {
        *l = last;
    }
    DenseArray::zeros(shape)
}

/// Move `variable` from the keys to the property axis.
///
/// Returns a new tensor map; `tensor` is left untouched.
///
/// # Errors
/// - `UnknownVariable` if `variable` is not a key variable
/// - `ShapeMismatch` if blocks of a group differ in samples, components,
///   property names or gradients
pub fn keys_to_properties<T: Scalar>(
    tensor: &TensorMap<T>,
    variable: &str,
    options: &MergeOptions,
) -> Result<TensorMap<T>> {
    let var = tensor.keys.variable_index(variable)?;
    let moved_values = tensor.keys.unique_values(variable)?;
    let groups = group_keys(&tensor.keys, var);

    let mut blocks = Vec::with_capacity(groups.entries.len());
    for (entry, members) in groups.entries.iter().zip(&groups.members) {
        trace!(?entry, n_blocks = members.len(), "merging group along properties");
        let members: Vec<(i32, &TensorBlock<T>)> = members
            .iter()
            .map(|&(value, i)| (value, &tensor.blocks[i]))
            .collect();
        let block = merge_properties(variable, &moved_values, &members)?;
        blocks.push(if options.sort_samples {
            sort_samples(block)?
        } else {
            block
        });
    }

    debug!(
        variable,
        input_blocks = tensor.len(),
        output_blocks = blocks.len(),
        "moved key variable to properties"
    );
    TensorMap::new(Labels::new(groups.names, groups.entries)?, blocks)
}

fn merge_properties<T: Scalar>(
    variable: &str,
    moved_values: &[i32],
    members: &[(i32, &TensorBlock<T>)],
) -> Result<TensorBlock<T>> {
    let first = members[0].1;
    for &(value, block) in &members[1..] {
        if block.samples != first.samples {
            return Err(shape_mismatch(format!(
                "cannot move '{variable}' to properties: block with {variable}={value} has \
                 different samples than block with {variable}={}",
                members[0].0
            )));
        }
        if block.components != first.components {
            return Err(shape_mismatch(format!(
                "cannot move '{variable}' to properties: blocks have different components"
            )));
        }
        if block.properties.names() != first.properties.names() {
            return Err(shape_mismatch(format!(
                "cannot move '{variable}' to properties: blocks have different property names"
            )));
        }
        check_gradient_parameters(first, block)?;
        for (parameter, gradient) in first.gradients() {
            let other = &block.gradients[parameter];
            if other.samples != gradient.samples || other.components != gradient.components {
                return Err(shape_mismatch(format!(
                    "cannot move '{variable}' to properties: '{parameter}' gradients differ \
                     in samples or components"
                )));
            }
        }
    }

    let present: HashMap<i32, &TensorBlock<T>> = members.iter().copied().collect();
    // property entries of each slab, in the order of `moved_values`
    let slab_properties: Vec<&Labels> = moved_values
        .iter()
        .map(|value| present.get(value).map_or(&first.properties, |b| &b.properties))
        .collect();

    let mut names = vec![variable.to_string()];
    names.extend(first.properties.names().iter().cloned());
    let mut entries = Vec::new();
    let mut slabs: Vec<Cow<'_, DenseArray<T>>> = Vec::with_capacity(moved_values.len());
    for (&value, properties) in moved_values.iter().zip(&slab_properties) {
        for property in properties.iter() {
            let mut entry = Vec::with_capacity(property.len() + 1);
            entry.push(value);
            entry.extend_from_slice(property);
            entries.push(entry);
        }
        slabs.push(match present.get(&value) {
            Some(block) => Cow::Borrowed(&block.values),
            None => Cow::Owned(zero_slab(&first.values, properties.len())?),
        });
    }
    let slab_refs: Vec<&DenseArray<T>> = slabs.iter().map(|s| s.as_ref()).collect();

    let mut merged = TensorBlock::new(
        DenseArray::concat_last(&slab_refs)?,
        first.samples.clone(),
        first.components.clone(),
        Labels::new(names, entries)?,
    )?;

    for (parameter, gradient) in first.gradients() {
        let mut slabs: Vec<Cow<'_, DenseArray<T>>> = Vec::with_capacity(moved_values.len());
        for (value, properties) in moved_values.iter().zip(&slab_properties) {
            slabs.push(match present.get(value) {
                Some(block) => Cow::Borrowed(&block.gradients[parameter].data),
                None => Cow::Owned(zero_slab(&gradient.data, properties.len())?),
            });
        }
        let slab_refs: Vec<&DenseArray<T>> = slabs.iter().map(|s| s.as_ref()).collect();
        let data = DenseArray::concat_last(&slab_refs)?;
        merged.add_gradient(
            parameter,
            Gradient::new(data, gradient.samples.clone(), gradient.components.clone())?,
        )?;
    }

    Ok(merged)
}

/// Move `variable` from the keys to a trailing sample column.
///
/// Returns a new tensor map; `tensor` is left untouched.
///
/// # Errors
/// - `UnknownVariable` if `variable` is not a key variable
/// - `ShapeMismatch` if blocks of a group differ in properties, components
///   or gradient layout
/// - `DuplicateVariable` if `variable` is already a sample variable
pub fn keys_to_samples<T: Scalar>(
    tensor: &TensorMap<T>,
    variable: &str,
    options: &MergeOptions,
) -> Result<TensorMap<T>> {
    let var = tensor.keys.variable_index(variable)?;
    let groups = group_keys(&tensor.keys, var);

    let mut blocks = Vec::with_capacity(groups.entries.len());
    for (entry, members) in groups.entries.iter().zip(&groups.members) {
        trace!(?entry, n_blocks = members.len(), "merging group along samples");
        let members: Vec<(i32, &TensorBlock<T>)> = members
            .iter()
            .map(|&(value, i)| (value, &tensor.blocks[i]))
            .collect();
        let block = merge_samples(variable, &members)?;
        blocks.push(if options.sort_samples {
            sort_samples(block)?
        } else {
            block
        });
    }

    debug!(
        variable,
        input_blocks = tensor.len(),
        output_blocks = blocks.len(),
        "moved key variable to samples"
    );
    TensorMap::new(Labels::new(groups.names, groups.entries)?, blocks)
}

fn merge_samples<T: Scalar>(
    variable: &str,
    members: &[(i32, &TensorBlock<T>)],
) -> Result<TensorBlock<T>> {
    let first = members[0].1;
    for &(value, block) in &members[1..] {
        if block.properties != first.properties {
            return Err(shape_mismatch(format!(
                "cannot move '{variable}' to samples: block with {variable}={value} has \
                 different properties than block with {variable}={}",
                members[0].0
            )));
        }
        if block.components != first.components {
            return Err(shape_mismatch(format!(
                "cannot move '{variable}' to samples: blocks have different components"
            )));
        }
        check_gradient_parameters(first, block)?;
        for (parameter, gradient) in first.gradients() {
            let other = &block.gradients[parameter];
            if other.samples.names() != gradient.samples.names()
                || other.components != gradient.components
            {
                return Err(shape_mismatch(format!(
                    "cannot move '{variable}' to samples: '{parameter}' gradients differ \
                     in sample names or components"
                )));
            }
        }
    }

    let mut names = first.samples.names().to_vec();
    names.push(variable.to_string());
    let mut entries = Vec::new();
    let mut offsets = Vec::with_capacity(members.len());
    for &(value, block) in members {
        offsets.push(entries.len() as i32);
        for sample in block.samples.iter() {
            let mut entry = sample.to_vec();
            entry.push(value);
            entries.push(entry);
        }
    }
    let slabs: Vec<&DenseArray<T>> = members.iter().map(|(_, b)| &b.values).collect();

    let mut merged = TensorBlock::new(
        DenseArray::concat_first(&slabs)?,
        Labels::new(names, entries)?,
        first.components.clone(),
        first.properties.clone(),
    )?;

    for (parameter, gradient) in first.gradients() {
        let mut entries = Vec::new();
        let mut slabs = Vec::with_capacity(members.len());
        for (&(_, block), &offset) in members.iter().zip(&offsets) {
            let own = &block.gradients[parameter];
            for sample in own.samples.iter() {
                let mut entry = sample.to_vec();
                entry[0] += offset;
                entries.push(entry);
            }
            slabs.push(&own.data);
        }
        let samples = Labels::new(gradient.samples.names().iter().cloned(), entries)?;
        let data = DenseArray::concat_first(&slabs)?;
        merged.add_gradient(
            parameter,
            Gradient::new(data, samples, gradient.components.clone())?,
        )?;
    }

    Ok(merged)
}

/// Sort the rows of a block ascending and remap its gradients accordingly.
pub(crate) fn sort_samples<T: Scalar>(block: TensorBlock<T>) -> Result<TensorBlock<T>> {
    let order = block.samples.sorting_permutation();
    let mut new_row = vec![0; order.len()];
    for (new, &old) in order.iter().enumerate() {
        new_row[old] = new as i32;
    }

    let TensorBlock {
        samples,
        components,
        properties,
        values,
        gradients,
    } = block;
    let mut sorted = TensorBlock::new(
        values.select_rows(&order),
        samples.select_rows(&order),
        components,
        properties,
    )?;

    for (parameter, gradient) in gradients {
        let remapped = gradient
            .samples
            .iter()
            .map(|sample| {
                let mut entry = sample.to_vec();
                entry[0] = new_row[entry[0] as usize];
                entry
            })
            .collect();
        let samples = Labels::new(gradient.samples.names().iter().cloned(), remapped)?;
        let gradient_order = samples.sorting_permutation();
        sorted.add_gradient(
            &parameter,
            Gradient::new(
                gradient.data.select_rows(&gradient_order),
                samples.select_rows(&gradient_order),
                gradient.components,
            )?,
        )?;
    }

    Ok(sorted)
}

impl<T: Scalar> TensorMap<T> {
    /// Move a key variable into the property axis, in place.
    ///
    /// On error the tensor map is left unchanged. See [`keys_to_properties`].
    pub fn keys_to_properties(&mut self, variable: &str, options: &MergeOptions) -> Result<()> {
        let merged = keys_to_properties(self, variable, options)?;
        self.replace(merged);
        Ok(())
    }

    /// Move a key variable into the sample axis, in place.
    ///
    /// On error the tensor map is left unchanged. See [`keys_to_samples`].
    pub fn keys_to_samples(&mut self, variable: &str, options: &MergeOptions) -> Result<()> {
        let merged = keys_to_samples(self, variable, options)?;
        self.replace(merged);
        Ok(())
    }
}
