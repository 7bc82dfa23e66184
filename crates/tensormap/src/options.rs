//! Configuration options for key merging.

/// Options for [`TensorMap::keys_to_properties`](crate::TensorMap::keys_to_properties)
/// and [`TensorMap::keys_to_samples`](crate::TensorMap::keys_to_samples).
///
/// # Example
///
/// ```
/// use tensormap::MergeOptions;
///
/// let opts = MergeOptions::default();
/// assert!(!opts.sort_samples);
///
/// let opts = MergeOptions::default().with_sort_samples(true);
/// assert!(opts.sort_samples);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MergeOptions {
    /// Sort the rows of every merged block ascending over all sample
    /// variables.
    ///
    /// Gradient `sample` references are remapped to follow their rows and
    /// gradient rows are sorted as well.
    pub sort_samples: bool,
}

impl MergeOptions {
    /// Set whether merged samples are sorted.
    pub fn with_sort_samples(mut self, sort_samples: bool) -> Self {
        self.sort_samples = sort_samples;
        self
    }
}
