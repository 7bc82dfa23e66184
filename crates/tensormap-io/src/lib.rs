//! Lossless persistence for [`TensorMap`]s.
//!
//! A stored tensor map is a small header followed by the `bincode` encoding
//! of the map:
//!
//! - magic bytes `TMAP`
//! - format version (`u32`)
//! - scalar type tag (`u8`), checked against the requested type on load
//!
//! Decoding re-runs every constructor check of labels, blocks, gradients and
//! tensor maps, so a loaded map satisfies the same invariants as one built in
//! memory. Values are stored bit for bit.
//!
//! # Example
//!
//! ```
//! use tensormap::{DenseArray, Labels, TensorBlock, TensorMap};
//!
//! let values = DenseArray::from_vec(vec![1, 2], vec![0.5, -1.0]).unwrap();
//! let block = TensorBlock::new(values, Labels::single(), vec![], Labels::range("n", 2).unwrap())
//!     .unwrap();
//! let tensor = TensorMap::from_pairs(["l"], vec![(vec![0], block)]).unwrap();
//!
//! let bytes = tensormap_io::to_bytes(&tensor).unwrap();
//! let restored: TensorMap<f64> = tensormap_io::from_bytes(&bytes).unwrap();
//! assert_eq!(restored, tensor);
//! ```

mod error;

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tensormap::{Scalar, TensorMap};
use tracing::debug;

pub use error::{IoError, Result};

/// Magic bytes identifying a stored tensor map.
const MAGIC: [u8; 4] = *b"TMAP";

/// Current format version.
const CURRENT_VERSION: u32 = 1;

/// Scalar types that can be persisted, with their on-disk tag.
pub trait StoredScalar: Scalar {
    const TAG: u8;
}

impl StoredScalar for f64 {
    const TAG: u8 = 0;
}

impl StoredScalar for f32 {
    const TAG: u8 = 1;
}

impl StoredScalar for Complex64 {
    const TAG: u8 = 2;
}

fn tag_name(tag: u8) -> &'static str {
    match tag {
        f64::TAG => f64::NAME,
        f32::TAG => f32::NAME,
        Complex64::TAG => <Complex64 as Scalar>::NAME,
        _ => "unknown",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct Header {
    magic: [u8; 4],
    version: u32,
    scalar: u8,
}

impl Header {
    fn new<T: StoredScalar>() -> Self {
        Self {
            magic: MAGIC,
            version: CURRENT_VERSION,
            scalar: T::TAG,
        }
    }

    fn validate<T: StoredScalar>(&self) -> Result<()> {
        if self.magic != MAGIC {
            return Err(IoError::InvalidMagic);
        }
        if self.version != CURRENT_VERSION {
            return Err(IoError::UnsupportedVersion(self.version));
        }
        if self.scalar != T::TAG {
            return Err(IoError::ScalarMismatch {
                stored: tag_name(self.scalar),
                requested: T::NAME,
            });
        }
        Ok(())
    }
}

/// Write a tensor map to any writer.
///
/// # Errors
/// Returns an error if writing or encoding fails.
pub fn write<T: StoredScalar, W: Write>(mut writer: W, tensor: &TensorMap<T>) -> Result<()> {
    bincode::serialize_into(&mut writer, &Header::new::<T>())?;
    bincode::serialize_into(&mut writer, tensor)?;
    writer.flush()?;
    Ok(())
}

/// Read a tensor map from any reader.
///
/// # Errors
/// Returns an error if the header is invalid, the stored scalar type is not
/// `T`, or the data does not decode to a valid tensor map.
pub fn read<T: StoredScalar, R: Read>(mut reader: R) -> Result<TensorMap<T>> {
    let header: Header = bincode::deserialize_from(&mut reader)?;
    header.validate::<T>()?;
    Ok(bincode::deserialize_from(reader)?)
}

/// Encode a tensor map to bytes.
pub fn to_bytes<T: StoredScalar>(tensor: &TensorMap<T>) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    write(&mut bytes, tensor)?;
    debug!(n_blocks = tensor.len(), n_bytes = bytes.len(), "encoded tensor map");
    Ok(bytes)
}

/// Decode a tensor map from bytes.
pub fn from_bytes<T: StoredScalar>(bytes: &[u8]) -> Result<TensorMap<T>> {
    read(bytes)
}

/// Save a tensor map to a file.
///
/// The data is written to a fresh temporary file in the same directory which
/// then replaces `path`, so an interrupted save never leaves a truncated file
/// behind and never touches other files. The temporary file is removed if
/// writing fails.
///
/// # Errors
/// Returns an error if the file cannot be written or encoding fails.
pub fn save<T: StoredScalar, P: AsRef<Path>>(path: P, tensor: &TensorMap<T>) -> Result<()> {
    let path = path.as_ref();
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = NamedTempFile::new_in(dir)?;
    write(BufWriter::new(temp.as_file_mut()), tensor)?;
    temp.persist(path).map_err(|e| e.error)?;

    debug!(path = %path.display(), n_blocks = tensor.len(), "saved tensor map");
    Ok(())
}

/// Load a tensor map from a file.
///
/// # Errors
/// Returns an error if the file cannot be read or does not hold a valid
/// tensor map of scalar type `T`.
pub fn load<T: StoredScalar, P: AsRef<Path>>(path: P) -> Result<TensorMap<T>> {
    let path = path.as_ref();
    let tensor = read(BufReader::new(File::open(path)?))?;
    debug!(path = %path.display(), n_blocks = tensor.len(), "loaded tensor map");
    Ok(tensor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tensormap::{DenseArray, Labels, TensorBlock};

    fn tensor() -> TensorMap<f64> {
        let values = DenseArray::from_vec(vec![1, 1], vec![1.5]).unwrap();
        let block = TensorBlock::new(values, Labels::single(), vec![], Labels::single()).unwrap();
        TensorMap::from_pairs(["l"], vec![(vec![0], block)]).unwrap()
    }

    #[test]
    fn test_header_validate() {
        assert!(Header::new::<f64>().validate::<f64>().is_ok());

        let mut header = Header::new::<f64>();
        header.magic = *b"XXXX";
        assert!(matches!(header.validate::<f64>(), Err(IoError::InvalidMagic)));

        let mut header = Header::new::<f64>();
        header.version = 99;
        assert!(matches!(
            header.validate::<f64>(),
            Err(IoError::UnsupportedVersion(99))
        ));
    }

    #[test]
    fn test_scalar_mismatch() {
        let bytes = to_bytes(&tensor()).unwrap();
        let err = from_bytes::<f32>(&bytes).unwrap_err();
        assert!(matches!(
            err,
            IoError::ScalarMismatch {
                stored: "f64",
                requested: "f32"
            }
        ));
    }

    #[test]
    fn test_bytes_roundtrip() {
        let t = tensor();
        let restored: TensorMap<f64> = from_bytes(&to_bytes(&t).unwrap()).unwrap();
        assert_eq!(restored, t);
    }

    #[test]
    fn test_truncated_data() {
        let bytes = to_bytes(&tensor()).unwrap();
        assert!(matches!(
            from_bytes::<f64>(&bytes[..bytes.len() - 3]),
            Err(IoError::Serialization(_))
        ));
    }

    #[test]
    fn test_error_display() {
        assert_eq!(IoError::InvalidMagic.to_string(), "invalid magic bytes");
        assert_eq!(
            IoError::UnsupportedVersion(7).to_string(),
            "unsupported format version 7"
        );
    }
}
