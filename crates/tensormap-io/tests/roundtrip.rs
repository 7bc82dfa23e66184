use num_complex::Complex64;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use tempfile::tempdir;
use tensormap::{DenseArray, Gradient, Labels, MergeOptions, Scalar, TensorBlock, TensorMap};
use tensormap_io::{load, save, IoError};

fn block<T: Scalar>(rng: &mut ChaCha8Rng, l: i32, n_samples: usize) -> TensorBlock<T> {
    let samples = Labels::new(
        ["structure", "atom"],
        (0..n_samples as i32).map(|i| vec![i / 3, i % 3]).collect(),
    )
    .unwrap();
    let m = Labels::range("m", (2 * l + 1) as usize).unwrap();
    let properties = Labels::range("n", 4).unwrap();
    let values = DenseArray::from_fn(vec![n_samples, m.len(), 4], |_| {
        T::from_f64(rng.random::<f64>() - 0.5)
    })
    .unwrap();
    let mut block = TensorBlock::new(values, samples, vec![m.clone()], properties).unwrap();

    let gradient_samples = Labels::new(
        ["sample", "structure", "atom"],
        (0..n_samples as i32).map(|i| vec![i, i / 3, (i + 1) % 3]).collect(),
    )
    .unwrap();
    let data = DenseArray::from_fn(vec![n_samples, 3, m.len(), 4], |_| {
        T::from_f64(rng.random::<f64>())
    })
    .unwrap();
    let gradient = Gradient::new(
        data,
        gradient_samples,
        vec![Labels::range("xyz", 3).unwrap(), m],
    )
    .unwrap();
    block.add_gradient("positions", gradient).unwrap();
    block
}

fn tensor<T: Scalar>(seed: u64) -> TensorMap<T> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut pairs = Vec::new();
    for l in 0..3 {
        for center in [1, 6] {
            pairs.push((vec![l, center], block(&mut rng, l, 6)));
        }
    }
    TensorMap::from_pairs(["l", "center"], pairs).unwrap()
}

fn assert_bit_identical(a: &TensorMap<f64>, b: &TensorMap<f64>) {
    assert_eq!(a.keys(), b.keys());
    assert_eq!(a.len(), b.len());
    for ((_, x), (_, y)) in a.iter().zip(b.iter()) {
        assert_eq!(x.samples(), y.samples());
        assert_eq!(x.components(), y.components());
        assert_eq!(x.properties(), y.properties());
        let bits = |v: &[f64]| v.iter().map(|f| f.to_bits()).collect::<Vec<_>>();
        assert_eq!(bits(x.values().as_slice()), bits(y.values().as_slice()));
        for (parameter, gradient) in x.gradients() {
            let other = y.gradient(parameter).unwrap();
            assert_eq!(gradient.samples(), other.samples());
            assert_eq!(gradient.components(), other.components());
            assert_eq!(bits(gradient.data().as_slice()), bits(other.data().as_slice()));
        }
    }
}

#[test]
fn test_save_load_roundtrip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("tensor.tmap");

    let original = tensor::<f64>(1);
    save(&path, &original).unwrap();
    let restored: TensorMap<f64> = load(&path).unwrap();

    assert_bit_identical(&original, &restored);
    assert_eq!(restored, original);

    let names: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert_eq!(names, vec![std::ffi::OsString::from("tensor.tmap")]);
}

#[test]
fn test_save_leaves_sibling_files_alone() {
    let dir = tempdir().unwrap();
    let notes = dir.path().join("map.tmp");
    std::fs::write(&notes, b"user notes").unwrap();

    save(dir.path().join("map.tmap"), &tensor::<f64>(6)).unwrap();
    assert_eq!(std::fs::read(&notes).unwrap(), b"user notes");
}

#[test]
fn test_save_overwrites_existing_target() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("merged.tmp");
    save(&path, &tensor::<f64>(7)).unwrap();

    let replacement = tensor::<f64>(8);
    save(&path, &replacement).unwrap();
    assert_eq!(load::<f64, _>(&path).unwrap(), replacement);
}

#[test]
fn test_save_into_missing_directory_fails() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("missing").join("tensor.tmap");
    let err = save(&path, &tensor::<f64>(9)).unwrap_err();
    assert!(matches!(err, IoError::Io(_)));
    assert!(!path.exists());
}

#[test]
fn test_roundtrip_special_values() {
    let values = DenseArray::from_vec(
        vec![1, 4],
        vec![f64::NAN, -0.0, f64::INFINITY, f64::MIN_POSITIVE],
    )
    .unwrap();
    let block =
        TensorBlock::new(values, Labels::single(), vec![], Labels::range("n", 4).unwrap()).unwrap();
    let original = TensorMap::from_pairs(["l"], vec![(vec![0], block)]).unwrap();

    let restored: TensorMap<f64> =
        tensormap_io::from_bytes(&tensormap_io::to_bytes(&original).unwrap()).unwrap();
    assert_bit_identical(&original, &restored);
}

#[test]
fn test_roundtrip_after_merge() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("merged.tmap");

    let mut original = tensor::<f64>(2);
    original
        .keys_to_samples("center", &MergeOptions::default().with_sort_samples(true))
        .unwrap();
    save(&path, &original).unwrap();
    let restored: TensorMap<f64> = load(&path).unwrap();
    assert_bit_identical(&original, &restored);
}

#[test]
fn test_roundtrip_other_scalars() {
    let single = tensor::<f32>(3);
    let bytes = tensormap_io::to_bytes(&single).unwrap();
    assert_eq!(tensormap_io::from_bytes::<f32>(&bytes).unwrap(), single);

    let complex = tensor::<Complex64>(4);
    let bytes = tensormap_io::to_bytes(&complex).unwrap();
    assert_eq!(tensormap_io::from_bytes::<Complex64>(&bytes).unwrap(), complex);
}

#[test]
fn test_load_missing_file() {
    let dir = tempdir().unwrap();
    let err = load::<f64, _>(dir.path().join("missing.tmap")).unwrap_err();
    assert!(matches!(err, IoError::Io(_)));
}

#[test]
fn test_load_not_a_tensor_map() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("garbage.tmap");
    std::fs::write(&path, b"definitely not a tensor map").unwrap();
    let err = load::<f64, _>(&path).unwrap_err();
    assert!(matches!(err, IoError::InvalidMagic));
}

#[test]
fn test_load_rejects_invalid_contents() {
    // a header followed by labels with a duplicated entry
    let mut bytes = tensormap_io::to_bytes(&tensor::<f64>(5)).unwrap();
    let header_len = 4 + 4 + 1;
    // keys are encoded first: names (len + 2 strings), then entries; point the
    // second key entry at the first by rewriting its values
    let keys = tensor::<f64>(5).keys().clone();
    let names_len: usize = 8 + keys.names().iter().map(|n| 8 + n.len()).sum::<usize>();
    let entries_start = header_len + names_len + 8;
    let entry_len = 8 + 4 * keys.size();
    let (first, second) = (entries_start, entries_start + entry_len);
    let copy = bytes[first..first + entry_len].to_vec();
    bytes[second..second + entry_len].copy_from_slice(&copy);

    let err = tensormap_io::from_bytes::<f64>(&bytes).unwrap_err();
    assert!(matches!(err, IoError::Serialization(_)));
}
