use super::*;
use byteorder::{LittleEndian, WriteBytesExt};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::tempdir;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

fn sample_store() -> Result<MemoryBackend, ContainerError> {
    let mut store = MemoryBackend::new();
    store.set_attr("", "encoding-type", "anndata")?;
    store.create_group("layers/raw")?;
    store.create_dataset(
        "X",
        vec![2, 3],
        ScalarType::Float32,
        ArrayData::Float(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]),
    )?;
    store.set_attr("X", "encoding-type", "array")?;
    Ok(store)
}

fn zlib(bytes: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes).expect("compress");
    encoder.finish().expect("compress")
}

fn f8_bytes(values: &[f64]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// A Zarr directory with a chunked, compressed 3x2 float array
fn write_zarr_dir(root: &Path) -> std::io::Result<()> {
    fs::write(root.join(".zgroup"), r#"{"zarr_format":2}"#)?;
    fs::write(root.join(".zattrs"), r#"{"encoding-type":"anndata","encoding-version":"0.1.0"}"#)?;

    let x = root.join("X");
    fs::create_dir(&x)?;
    fs::write(
        x.join(".zarray"),
        r#"{"zarr_format":2,"shape":[3,2],"chunks":[2,2],"dtype":"<f8","compressor":{"id":"zlib","level":1},"fill_value":0.0,"order":"C","filters":null}"#,
    )?;
    fs::write(x.join(".zattrs"), r#"{"encoding-type":"array","encoding-version":"0.2.0"}"#)?;
    fs::write(x.join("0.0"), zlib(&f8_bytes(&[1.0, 2.0, 3.0, 4.0])))?;
    // edge chunk is stored padded to the full chunk size
    fs::write(x.join("1.0"), zlib(&f8_bytes(&[5.0, 6.0, 0.0, 0.0])))?;

    let empty = root.join("uns");
    fs::create_dir(&empty)?;
    fs::write(empty.join(".zgroup"), r#"{"zarr_format":2}"#)?;

    // directories without metadata are not nodes
    fs::create_dir(root.join("scratch"))?;
    Ok(())
}

#[test]
fn test_open_memory_container() -> Result<(), ContainerError> {
    let container = Container::from_backend(sample_store()?);
    assert!(container.is_open());
    assert_eq!(container.format_name(), "memory");

    let root = container.root()?;
    assert_eq!(root.path(), "");
    assert_eq!(root.children()?, vec!["X".to_string(), "layers".to_string()]);
    assert_eq!(
        root.attr("encoding-type")?.map(Attribute::into_value),
        Some(AttributeValue::from("anndata"))
    );
    assert!(root.attr("encoding-version")?.is_none());

    let x = container.dataset("X")?;
    assert_eq!(x.name(), "X");
    assert_eq!(x.shape()?, vec![2, 3]);
    assert_eq!(x.len()?, 6);
    assert_eq!(x.data_type()?, ScalarType::Float32);
    assert_eq!(x.read_range(3, 3)?, ArrayData::Float(vec![4.0, 5.0, 6.0]));
    Ok(())
}

#[test]
fn test_nested_paths() -> Result<(), ContainerError> {
    let container = Container::from_backend(sample_store()?);
    let layers = container.group("/layers/")?;
    assert_eq!(layers.path(), "layers");
    let raw = layers.group("raw")?;
    assert_eq!(raw.path(), "layers/raw");
    assert_eq!(raw.name(), "raw");
    assert!(container.exists("layers/raw")?);
    assert!(!container.exists("layers/missing")?);
    Ok(())
}

#[test]
fn test_kind_mismatch_and_missing_nodes() -> Result<(), ContainerError> {
    let container = Container::from_backend(sample_store()?);
    assert!(matches!(
        container.group("X"),
        Err(ContainerError::InvalidFormat { .. })
    ));
    assert!(matches!(
        container.dataset("layers"),
        Err(ContainerError::InvalidFormat { .. })
    ));
    match container.dataset("obs") {
        Err(ContainerError::NotFound { path }) => assert_eq!(path, "obs"),
        other => panic!("unexpected result: {:?}", other),
    }
    Ok(())
}

#[test]
fn test_view_handles_are_scoped() -> Result<(), ContainerError> {
    let container = Container::from_backend(sample_store()?);
    assert_eq!(container.open_handles(), 0);

    let root = container.root()?;
    let x = root.dataset("X")?;
    let copy = x.clone();
    assert_eq!(container.open_handles(), 3);

    x.close();
    assert_eq!(container.open_handles(), 2);
    assert!(container.is_open());
    assert_eq!(copy.shape()?, vec![2, 3]);

    drop(copy);
    drop(root);
    assert_eq!(container.open_handles(), 0);
    Ok(())
}

#[test]
fn test_use_after_close() -> Result<(), ContainerError> {
    let container = Container::from_backend(sample_store()?);
    let x = container.dataset("X")?;
    container.close();
    container.close();
    assert!(!container.is_open());

    match x.read() {
        Err(ContainerError::UseAfterClose { path }) => assert_eq!(path, "X"),
        other => panic!("unexpected result: {:?}", other),
    }
    assert!(matches!(
        container.group("layers"),
        Err(ContainerError::UseAfterClose { .. })
    ));
    Ok(())
}

#[test]
fn test_memory_backend_validates_datasets() {
    let mut store = MemoryBackend::new();
    let err = store
        .create_dataset("a", vec![2, 2], ScalarType::Int64, ArrayData::Int(vec![1, 2, 3]))
        .unwrap_err();
    assert!(err.to_string().contains("holds 4 elements"));

    let err = store
        .create_dataset("a", vec![1], ScalarType::Float64, ArrayData::Int(vec![1]))
        .unwrap_err();
    assert!(matches!(err, ContainerError::InvalidArgument(_)));

    assert!(matches!(
        store.set_attr("missing", "x", 1i64),
        Err(ContainerError::NotFound { .. })
    ));
}

#[test]
fn test_range_out_of_bounds() -> Result<(), ContainerError> {
    let container = Container::from_backend(sample_store()?);
    let x = container.dataset("X")?;
    assert!(matches!(
        x.read_range(4, 3),
        Err(ContainerError::IndexOutOfBounds { index: 7, len: 6 })
    ));
    Ok(())
}

#[test]
fn test_zarr_directory_store() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    write_zarr_dir(dir.path())?;

    let container = Container::open(dir.path())?;
    assert_eq!(container.format_name(), "zarr");

    let root = container.root()?;
    assert_eq!(root.children()?, vec!["X".to_string(), "uns".to_string()]);
    assert_eq!(
        root.attribute_names()?,
        vec!["encoding-type".to_string(), "encoding-version".to_string()]
    );

    let x = container.dataset("X")?;
    assert_eq!(x.shape()?, vec![3, 2]);
    assert_eq!(x.data_type()?, ScalarType::Float64);
    assert_eq!(
        x.read()?,
        ArrayData::Float(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0])
    );
    assert_eq!(
        x.attr("encoding-type")?.map(Attribute::into_value),
        Some(AttributeValue::from("array"))
    );
    assert!(container.group("uns")?.children()?.is_empty());
    Ok(())
}

#[test]
fn test_zarr_missing_chunk_uses_fill_value() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    write_zarr_dir(dir.path())?;
    fs::remove_file(dir.path().join("X").join("1.0"))?;

    let container = Container::open(dir.path())?;
    assert_eq!(
        container.dataset("X")?.read()?,
        ArrayData::Float(vec![1.0, 2.0, 3.0, 4.0, 0.0, 0.0])
    );
    Ok(())
}

/// 4x2 float array in 2x2 uncompressed chunks; chunk `1.0` is truncated
fn write_damaged_zarr(root: &Path) -> std::io::Result<()> {
    fs::write(root.join(".zgroup"), r#"{"zarr_format":2}"#)?;
    let x = root.join("X");
    fs::create_dir(&x)?;
    fs::write(
        x.join(".zarray"),
        r#"{"zarr_format":2,"shape":[4,2],"chunks":[2,2],"dtype":"<f8","compressor":null,"fill_value":0.0,"order":"C","filters":null}"#,
    )?;
    fs::write(x.join("0.0"), f8_bytes(&[1.0, 2.0, 3.0, 4.0]))?;
    fs::write(x.join("1.0"), [0u8, 1, 2])?;
    Ok(())
}

#[test]
fn test_zarr_range_reads_only_covering_chunks() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    write_damaged_zarr(dir.path())?;

    let container = Container::open(dir.path())?;
    let x = container.dataset("X")?;
    assert_eq!(x.read_range(0, 2)?, ArrayData::Float(vec![1.0, 2.0]));
    assert_eq!(x.read_range(1, 3)?, ArrayData::Float(vec![2.0, 3.0, 4.0]));
    assert!(matches!(x.read_range(3, 2), Err(ContainerError::Zarr { .. })));
    assert!(matches!(x.read(), Err(ContainerError::Zarr { .. })));
    assert!(matches!(
        x.read_range(6, 3),
        Err(ContainerError::IndexOutOfBounds { index: 9, len: 8 })
    ));
    Ok(())
}

/// Blosc frame holding `data` uncompressed (the `memcpyed` flag)
fn blosc_memcpyed(data: &[u8], typesize: u8) -> std::io::Result<Vec<u8>> {
    let mut frame = vec![2u8, 1, 0x02, typesize];
    frame.write_u32::<LittleEndian>(data.len() as u32)?;
    frame.write_u32::<LittleEndian>(data.len() as u32)?;
    frame.write_u32::<LittleEndian>(data.len() as u32 + 16)?;
    frame.extend_from_slice(data);
    Ok(frame)
}

#[test]
fn test_zarr_blosc_chunks() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let root = dir.path();
    fs::write(root.join(".zgroup"), r#"{"zarr_format":2}"#)?;
    let x = root.join("X");
    fs::create_dir(&x)?;
    fs::write(
        x.join(".zarray"),
        r#"{"zarr_format":2,"shape":[2,2],"chunks":[2,2],"dtype":"<f8","compressor":{"id":"blosc","cname":"lz4","clevel":5,"shuffle":1,"blocksize":0},"fill_value":0.0,"order":"C","filters":null}"#,
    )?;
    fs::write(x.join("0.0"), blosc_memcpyed(&f8_bytes(&[0.5, 1.5, 2.5, 3.5]), 8)?)?;

    let container = Container::open(root)?;
    assert_eq!(
        container.dataset("X")?.read()?,
        ArrayData::Float(vec![0.5, 1.5, 2.5, 3.5])
    );
    Ok(())
}

fn read_all(root: &Path, path: &str) -> Result<ArrayData, ContainerError> {
    Container::open(root)?.dataset(path)?.read()
}

#[test]
fn test_zarr_zero_width_strings_are_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let root = dir.path();
    fs::write(root.join(".zgroup"), r#"{"zarr_format":2}"#)?;
    for (name, dtype) in [("bytes", "|S0"), ("text", "<U0")] {
        let array = root.join(name);
        fs::create_dir(&array)?;
        fs::write(
            array.join(".zarray"),
            format!(
                r#"{{"zarr_format":2,"shape":[2],"chunks":[2],"dtype":"{}","compressor":null,"fill_value":null,"order":"C","filters":null}}"#,
                dtype
            ),
        )?;
        fs::write(array.join("0"), b"")?;
        assert!(read_all(root, name).is_err(), "dtype {} was accepted", dtype);
    }
    Ok(())
}

#[test]
fn test_zarr_zip_store() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("store.zip");
    let mut zip = ZipWriter::new(fs::File::create(&path)?);
    let options =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    // hierarchy nested below a top-level folder
    let entries: Vec<(&str, Vec<u8>)> = vec![
        ("data.zarr/.zgroup", br#"{"zarr_format":2}"#.to_vec()),
        ("data.zarr/.zattrs", br#"{"encoding-type":"anndata"}"#.to_vec()),
        ("data.zarr/obs/.zgroup", br#"{"zarr_format":2}"#.to_vec()),
        (
            "data.zarr/obs/n/.zarray",
            br#"{"zarr_format":2,"shape":[4],"chunks":[4],"dtype":"<i4","compressor":null,"fill_value":0,"order":"C","filters":null}"#.to_vec(),
        ),
        (
            "data.zarr/obs/n/0",
            [7i32, -1, 3, 0].iter().flat_map(|v| v.to_le_bytes()).collect(),
        ),
    ];
    for (name, bytes) in entries {
        zip.start_file(name, options)?;
        zip.write_all(&bytes)?;
    }
    zip.finish()?;

    let container = Container::open(&path)?;
    assert_eq!(container.format_name(), "zarr (zip)");
    assert_eq!(container.root()?.children()?, vec!["obs".to_string()]);

    let n = container.dataset("obs/n")?;
    assert_eq!(n.data_type()?, ScalarType::Int32);
    assert_eq!(n.read()?, ArrayData::Int(vec![7, -1, 3, 0]));
    Ok(())
}

#[test]
fn test_open_unknown_format() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("data.txt");
    fs::write(&path, "not a container")?;
    assert!(matches!(
        Container::open(&path),
        Err(ContainerError::Unsupported(_))
    ));
    assert!(matches!(
        Container::open(dir.path().join("missing.zip")),
        Err(ContainerError::Io(_))
    ));
    // a directory without .zgroup is not a Zarr store
    assert!(matches!(
        Container::open(dir.path()),
        Err(ContainerError::InvalidFormat { .. })
    ));
    Ok(())
}

#[cfg(not(feature = "hdf5"))]
#[test]
fn test_hdf5_requires_feature() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let path = dir.path().join("data.h5ad");
    fs::write(&path, b"\x89HDF\r\n\x1a\n")?;
    match Container::open(&path) {
        Err(ContainerError::Unsupported(message)) => assert!(message.contains("hdf5")),
        other => panic!("unexpected result: {:?}", other),
    }
    Ok(())
}
