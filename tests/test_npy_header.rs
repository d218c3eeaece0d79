// tests/test_npy_header.rs
//
// Header probing against files from our writer and from ndarray-npy.

mod common;

use anyhow::Result;
use common::print_test_header;
use ndarray::{Array, Array1, Array2, Array3, ArrayD, IxDyn};
use npyshard::constants::NPY_HEADER_ALIGNMENT;
use npyshard::{
    read_data_offset, read_header, read_shape, to_npy_bytes, write_npy, NpyError, NpyVersion,
};

/// Little-endian encoding of a C-order element sequence.
fn le_bytes<const N: usize>(elems: impl Iterator<Item = [u8; N]>) -> Vec<u8> {
    elems.flatten().collect()
}

#[test]
fn test_shape_of_our_files() -> Result<()> {
    print_test_header("shape of files written by write_npy");
    let dir = tempfile::tempdir()?;

    let cases: Vec<(ArrayD<f32>, NpyVersion)> = vec![
        (Array1::from_shape_fn(7, |i| i as f32 * 0.5).into_dyn(), NpyVersion::V1),
        (Array2::from_shape_fn((4, 5), |(r, c)| (r * 5 + c) as f32).into_dyn(), NpyVersion::V2),
        (
            Array3::from_shape_fn((2, 3, 4), |(a, b, c)| -((a * 12 + b * 4 + c) as f32)).into_dyn(),
            NpyVersion::Auto,
        ),
        (ArrayD::<f32>::zeros(IxDyn(&[0, 3])), NpyVersion::V1),
    ];
    for (i, (array, version)) in cases.iter().enumerate() {
        let path = dir.path().join(format!("a{i}.npy"));
        write_npy(&path, array, *version)?;
        let shape = read_shape(&path)?;
        println!("{:?} -> {:?}", version, shape);
        assert_eq!(shape, array.shape());

        let offset = read_data_offset(&path)?;
        assert_eq!(offset % NPY_HEADER_ALIGNMENT, 0);
        let bytes = std::fs::read(&path)?;
        assert_eq!(&bytes[offset..], le_bytes(array.iter().map(|v| v.to_le_bytes())));
    }
    Ok(())
}

#[test]
fn test_shape_of_ndarray_npy_files() -> Result<()> {
    print_test_header("shape of files written by ndarray-npy");
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("ref.npy");
    let array = Array::from_shape_fn((3, 2, 5), |(a, b, c)| (a * 100 + b * 10 + c) as i64);
    ndarray_npy::write_npy(&path, &array)?;

    let header = read_header(&path)?;
    println!("{:?}", header);
    assert_eq!(header.shape, vec![3, 2, 5]);
    assert_eq!(header.descr, "<i8");
    assert!(!header.fortran_order);
    assert_eq!(read_data_offset(&path)?, header.byte_offset);

    // The data section starts exactly at the reported offset.
    let bytes = std::fs::read(&path)?;
    assert_eq!(
        &bytes[header.byte_offset..],
        le_bytes(array.iter().map(|v| v.to_le_bytes()))
    );
    Ok(())
}

#[test]
fn test_ndarray_npy_reads_our_output() -> Result<()> {
    print_test_header("ndarray-npy reads our output");
    let dir = tempfile::tempdir()?;
    let array = Array2::from_shape_fn((6, 3), |(r, c)| r as f64 + c as f64 / 10.0);
    for version in [NpyVersion::V1, NpyVersion::V2] {
        let path = dir.path().join(format!("{version:?}.npy"));
        write_npy(&path, &array, version)?;
        let bytes = std::fs::read(&path)?;
        assert_eq!(
            &bytes[read_data_offset(&path)?..],
            le_bytes(array.iter().map(|v| v.to_le_bytes()))
        );
        let back: Array2<f64> = ndarray_npy::read_npy(&path)?;
        assert_eq!(back, array);
    }
    Ok(())
}

#[test]
fn test_version_fields() -> Result<()> {
    print_test_header("version bytes and header length field");
    let array = Array1::from(vec![1u8, 2, 3]);

    let v1 = to_npy_bytes(&array, NpyVersion::V1)?;
    assert_eq!(&v1[0..6], b"\x93NUMPY");
    assert_eq!((v1[6], v1[7]), (1, 0));
    let len = u16::from_le_bytes([v1[8], v1[9]]) as usize;
    assert_eq!(10 + len, v1.len() - 3);
    assert_eq!(v1[10 + len - 1], b'\n');

    let v2 = to_npy_bytes(&array, NpyVersion::V2)?;
    assert_eq!((v2[6], v2[7]), (2, 0));
    let len = u32::from_le_bytes([v2[8], v2[9], v2[10], v2[11]]) as usize;
    assert_eq!(12 + len, v2.len() - 3);
    assert_eq!(&v2[v2.len() - 3..], &[1, 2, 3]);
    Ok(())
}

#[test]
fn test_corrupt_files_are_rejected() -> Result<()> {
    print_test_header("corrupt headers");
    let dir = tempfile::tempdir()?;
    let good = to_npy_bytes(&Array1::<f64>::zeros(4), NpyVersion::V1)?.to_vec();

    let mut bad_magic = good.clone();
    bad_magic[1] = b'X';
    let path = dir.path().join("magic.npy");
    std::fs::write(&path, &bad_magic)?;
    assert!(matches!(read_shape(&path), Err(NpyError::InvalidFormat(_))));

    let mut bad_version = good.clone();
    bad_version[6] = 3;
    let path = dir.path().join("version.npy");
    std::fs::write(&path, &bad_version)?;
    assert!(matches!(
        read_shape(&path),
        Err(NpyError::UnsupportedVersion { major: 3, .. })
    ));
    assert!(matches!(
        read_data_offset(&path),
        Err(NpyError::UnsupportedVersion { major: 3, .. })
    ));

    let header_len = u16::from_le_bytes([good[8], good[9]]) as usize;
    let mut no_newline = good.clone();
    no_newline[10 + header_len - 1] = b' ';
    let path = dir.path().join("newline.npy");
    std::fs::write(&path, &no_newline)?;
    assert!(matches!(read_header(&path), Err(NpyError::InvalidFormat(_))));

    let path = dir.path().join("short.npy");
    std::fs::write(&path, &good[..9])?;
    assert!(matches!(read_header(&path), Err(NpyError::InvalidFormat(_))));

    let missing = dir.path().join("missing.npy");
    assert!(matches!(read_header(&missing), Err(NpyError::Io(_))));
    Ok(())
}
