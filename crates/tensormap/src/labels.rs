//! Named integer metadata for keys, samples, components and properties.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TensorMapError};

/// An ordered set of unique integer tuples under named variables.
///
/// Each entry labels one row (or one key, component, property). A position
/// index from entry to row is built at construction; labels are immutable,
/// so the index never goes stale.
///
/// # Examples
///
/// ```
/// use tensormap::Labels;
///
/// let samples = Labels::new(
///     ["structure", "center"],
///     vec![vec![0, 0], vec![0, 1], vec![1, 0]],
/// )
/// .unwrap();
///
/// assert_eq!(samples.len(), 3);
/// assert_eq!(samples.position(&[0, 1]), Some(1));
/// assert_eq!(samples.column("structure").unwrap(), vec![0, 0, 1]);
/// assert_eq!(samples.rows_where("structure", 0).unwrap(), vec![0, 1]);
/// ```
#[derive(Clone, Serialize, Deserialize)]
#[serde(try_from = "RawLabels")]
pub struct Labels {
    names: Vec<String>,
    entries: Vec<Vec<i32>>,
    #[serde(skip)]
    positions: HashMap<Vec<i32>, usize>,
}

#[derive(Deserialize)]
struct RawLabels {
    names: Vec<String>,
    entries: Vec<Vec<i32>>,
}

impl TryFrom<RawLabels> for Labels {
    type Error = TensorMapError;

    fn try_from(raw: RawLabels) -> Result<Self> {
        Self::from_parts(raw.names, raw.entries)
    }
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl Labels {
    /// Create labels from variable names and entries.
    ///
    /// # Errors
    /// - `InvalidLabels` if a name is not an identifier or an entry has the
    ///   wrong arity
    /// - `DuplicateVariable` if a name is repeated
    /// - `DuplicateKey` if an entry is repeated
    pub fn new<S: Into<String>>(
        names: impl IntoIterator<Item = S>,
        entries: Vec<Vec<i32>>,
    ) -> Result<Self> {
        Self::from_parts(names.into_iter().map(Into::into).collect(), entries)
    }

    fn from_parts(names: Vec<String>, entries: Vec<Vec<i32>>) -> Result<Self> {
        for (i, name) in names.iter().enumerate() {
            if !is_valid_name(name) {
                return Err(TensorMapError::InvalidLabels(format!(
                    "'{name}' is not a valid variable name"
                )));
            }
            if names[..i].contains(name) {
                return Err(TensorMapError::DuplicateVariable { name: name.clone() });
            }
        }
        let mut positions = HashMap::with_capacity(entries.len());
        for (row, entry) in entries.iter().enumerate() {
            if entry.len() != names.len() {
                return Err(TensorMapError::InvalidLabels(format!(
                    "entry {:?} has {} values, expected {} for {:?}",
                    entry,
                    entry.len(),
                    names.len(),
                    names
                )));
            }
            if positions.insert(entry.clone(), row).is_some() {
                return Err(TensorMapError::DuplicateKey {
                    entry: entry.clone(),
                });
            }
        }

        Ok(Self {
            names,
            entries,
            positions,
        })
    }

    /// Labels with the given names and no entries.
    pub fn empty<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Result<Self> {
        Self::new(names, Vec::new())
    }

    /// Placeholder labels: a single `_` variable with the single entry `[0]`.
    pub fn single() -> Self {
        Self {
            names: vec!["_".to_string()],
            entries: vec![vec![0]],
            positions: HashMap::from([(vec![0], 0)]),
        }
    }

    /// Labels with one variable and entries `0..count`.
    ///
    /// # Errors
    /// `InvalidLabels` if `count` does not fit in an `i32` or `name` is not
    /// a valid variable name.
    pub fn range(name: &str, count: usize) -> Result<Self> {
        let count = i32::try_from(count).map_err(|_| {
            TensorMapError::InvalidLabels(format!("{count} entries do not fit in i32 values"))
        })?;
        Self::new([name], (0..count).map(|i| vec![i]).collect())
    }

    /// Variable names, in order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Number of variables (arity of every entry).
    pub fn size(&self) -> usize {
        self.names.len()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry at row `i`.
    ///
    /// # Panics
    /// If `i` is out of bounds.
    pub fn entry(&self, i: usize) -> &[i32] {
        &self.entries[i]
    }

    /// Iterate over entries in order.
    pub fn iter(&self) -> impl Iterator<Item = &[i32]> + '_ {
        self.entries.iter().map(Vec::as_slice)
    }

    /// All entries, in order.
    pub fn entries(&self) -> &[Vec<i32>] {
        &self.entries
    }

    /// Row of an entry, if present.
    pub fn position(&self, entry: &[i32]) -> Option<usize> {
        self.positions.get(entry).copied()
    }

    /// Whether `entry` is one of the entries.
    pub fn contains(&self, entry: &[i32]) -> bool {
        self.positions.contains_key(entry)
    }

    /// Position of a variable among the names.
    ///
    /// # Errors
    /// `UnknownVariable` if no variable has this name.
    pub fn variable_index(&self, name: &str) -> Result<usize> {
        self.names
            .iter()
            .position(|n| n == name)
            .ok_or_else(|| TensorMapError::UnknownVariable {
                name: name.to_string(),
            })
    }

    /// Values of one variable, one per entry.
    pub fn column(&self, name: &str) -> Result<Vec<i32>> {
        let var = self.variable_index(name)?;
        Ok(self.entries.iter().map(|e| e[var]).collect())
    }

    /// Rows whose `name` column equals `value`.
    pub fn rows_where(&self, name: &str, value: i32) -> Result<Vec<usize>> {
        let var = self.variable_index(name)?;
        Ok(self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e[var] == value)
            .map(|(row, _)| row)
            .collect())
    }

    /// Distinct values of one variable, ascending.
    pub fn unique_values(&self, name: &str) -> Result<Vec<i32>> {
        let mut values = self.column(name)?;
        values.sort_unstable();
        values.dedup();
        Ok(values)
    }

    /// Distinct entries restricted to `names`, in order of first appearance.
    pub fn project(&self, names: &[&str]) -> Result<Labels> {
        let vars = names
            .iter()
            .map(|n| self.variable_index(n))
            .collect::<Result<Vec<_>>>()?;
        let mut seen = HashMap::new();
        let mut entries = Vec::new();
        for entry in &self.entries {
            let projected: Vec<i32> = vars.iter().map(|&v| entry[v]).collect();
            if !seen.contains_key(&projected) {
                seen.insert(projected.clone(), entries.len());
                entries.push(projected);
            }
        }
        Labels::new(names.iter().copied(), entries)
    }

    /// Row permutation that sorts the entries ascending (lexicographically).
    pub fn sorting_permutation(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.entries.len()).collect();
        order.sort_by(|&a, &b| self.entries[a].cmp(&self.entries[b]));
        order
    }

    /// Labels made of the given rows; new row `i` is old row `rows[i]`.
    ///
    /// `rows` must not repeat a row.
    pub(crate) fn select_rows(&self, rows: &[usize]) -> Labels {
        let entries: Vec<Vec<i32>> = rows.iter().map(|&i| self.entries[i].clone()).collect();
        let positions = entries
            .iter()
            .enumerate()
            .map(|(row, e)| (e.clone(), row))
            .collect();
        Labels {
            names: self.names.clone(),
            entries,
            positions,
        }
    }
}

impl PartialEq for Labels {
    fn eq(&self, other: &Self) -> bool {
        self.names == other.names && self.entries == other.entries
    }
}

impl Eq for Labels {}

impl fmt::Debug for Labels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Labels")
            .field("names", &self.names)
            .field("entries", &self.entries)
            .finish()
    }
}

impl fmt::Display for Labels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Labels({})", self.names.join(", "))?;
        for entry in &self.entries {
            write!(f, "\n  {entry:?}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_labels() -> Labels {
        Labels::new(
            ["structure", "center"],
            vec![vec![0, 0], vec![0, 1], vec![1, 0], vec![1, 2]],
        )
        .unwrap()
    }

    #[test]
    fn test_new_and_lookup() {
        let labels = sample_labels();
        assert_eq!(labels.size(), 2);
        assert_eq!(labels.len(), 4);
        assert_eq!(labels.entry(3), &[1, 2]);
        assert_eq!(labels.position(&[1, 0]), Some(2));
        assert_eq!(labels.position(&[5, 5]), None);
        assert!(labels.contains(&[0, 1]));
    }

    #[test]
    fn test_duplicate_entry() {
        let err = Labels::new(["a"], vec![vec![1], vec![1]]).unwrap_err();
        assert_eq!(err, TensorMapError::DuplicateKey { entry: vec![1] });
    }

    #[test]
    fn test_duplicate_name() {
        let err = Labels::new(["a", "a"], vec![]).unwrap_err();
        assert!(matches!(err, TensorMapError::DuplicateVariable { .. }));
    }

    #[test]
    fn test_wrong_arity() {
        let err = Labels::new(["a", "b"], vec![vec![1]]).unwrap_err();
        assert!(matches!(err, TensorMapError::InvalidLabels(_)));
    }

    #[test]
    fn test_invalid_name() {
        assert!(Labels::new(["not valid"], vec![]).is_err());
        assert!(Labels::new([""], vec![]).is_err());
    }

    #[test]
    fn test_zero_variables() {
        let labels = Labels::new(Vec::<String>::new(), vec![vec![]]).unwrap();
        assert_eq!(labels.len(), 1);
        assert_eq!(labels.size(), 0);
        assert!(Labels::new(Vec::<String>::new(), vec![vec![], vec![]]).is_err());
    }

    #[test]
    fn test_columns() {
        let labels = sample_labels();
        assert_eq!(labels.column("center").unwrap(), vec![0, 1, 0, 2]);
        assert_eq!(labels.unique_values("center").unwrap(), vec![0, 1, 2]);
        assert_eq!(labels.rows_where("center", 0).unwrap(), vec![0, 2]);
        assert_eq!(
            labels.column("missing"),
            Err(TensorMapError::UnknownVariable {
                name: "missing".to_string()
            })
        );
    }

    #[test]
    fn test_project() {
        let labels = sample_labels();
        let structures = labels.project(&["structure"]).unwrap();
        assert_eq!(structures.names(), &["structure".to_string()]);
        assert_eq!(structures.entries(), &[vec![0], vec![1]]);
    }

    #[test]
    fn test_sorting_permutation() {
        let labels = Labels::new(["a", "b"], vec![vec![1, 0], vec![0, 2], vec![0, 1]]).unwrap();
        let order = labels.sorting_permutation();
        assert_eq!(order, vec![2, 1, 0]);
        let sorted = labels.select_rows(&order);
        assert_eq!(sorted.entries(), &[vec![0, 1], vec![0, 2], vec![1, 0]]);
        assert_eq!(sorted.position(&[1, 0]), Some(2));
    }

    #[test]
    fn test_single_and_range() {
        let single = Labels::single();
        assert_eq!(single.names(), &["_".to_string()]);
        assert_eq!(single.position(&[0]), Some(0));

        let range = Labels::range("xyz", 3).unwrap();
        assert_eq!(range.entries(), &[vec![0], vec![1], vec![2]]);
    }

    #[test]
    fn test_range_too_large() {
        let count = i32::MAX as usize + 1;
        assert!(matches!(
            Labels::range("n", count),
            Err(TensorMapError::InvalidLabels(_))
        ));
    }
}
