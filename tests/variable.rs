mod common;

use common::Scratch;
use netcdf_async::{
    AttributeValue, ChecksumMode, Chunking, DeflateInfo, Endianness, Error, FillMode, NcType,
    StorageMode, Value, Values,
};

#[tokio::test]
async fn variable_params() {
    let d = Scratch::new();
    let path = d.flights("params.nc").await;
    let file = netcdf_async::open(&path, "r", None).await.unwrap();
    let root = file.root().unwrap();

    let vars = root.get_variables().await.unwrap();
    let var = &vars["UTC_time"];
    assert_eq!(var.inspect(), "[Variable UTC_time, type int, 1 dimension(s)]");
    assert_eq!(var.name(), "UTC_time");
    assert_eq!(var.get_name().await.unwrap(), "UTC_time");
    assert_eq!(var.get_type(), NcType::Int);
    assert_eq!(var.get_path().await.unwrap(), "/UTC_time");
    assert_eq!(var.get_endianness().await.unwrap(), Endianness::Native);
    assert_eq!(
        var.get_dimensions().await.unwrap(),
        vec![("recNum".to_owned(), 3)]
    );
    assert!(var.get_attributes().await.unwrap().is_empty());
    file.close().await.unwrap();
}

#[tokio::test]
async fn path_in_subgroup() {
    let d = Scratch::new();
    let file = d.create("path.nc", "netcdf4").await;
    let group = file.root().unwrap().add_subgroup("a").await.unwrap();
    let group = group.add_subgroup("b").await.unwrap();
    let var = group.add_variable("v", NcType::Int, &[]).await.unwrap();
    assert_eq!(var.get_path().await.unwrap(), "/a/b/v");
    file.close().await.unwrap();
}

#[tokio::test]
async fn rename_variable() {
    let d = Scratch::new();
    let path = d.flights("renamevar.nc").await;
    let file = netcdf_async::open(&path, "w", None).await.unwrap();
    let root = file.root().unwrap();

    let var = root.get_variable("UTC_time").await.unwrap();
    assert_eq!(var.set_name("UTC_timestamp").await.unwrap(), "UTC_timestamp");
    assert_eq!(var.name(), "UTC_timestamp");
    assert!(root
        .get_variables()
        .await
        .unwrap()
        .contains_key("UTC_timestamp"));
    assert_eq!(var.get_name().await.unwrap(), "UTC_timestamp");
    file.close().await.unwrap();

    let file = netcdf_async::open(&path, "r", None).await.unwrap();
    let var = file
        .root()
        .unwrap()
        .get_variable("UTC_timestamp")
        .await
        .unwrap();
    assert_eq!(var.read(2).await.unwrap(), Value::Int(30));
    file.close().await.unwrap();
}

/// Classic file with a float variable `var1` along `dim1`
async fn classic_fixture(d: &Scratch) -> std::path::PathBuf {
    let file = d.create("classic.nc", "classic").await;
    let root = file.root().unwrap();
    root.add_dimension("dim1", 10).await.unwrap();
    let var = root.add_variable("var1", NcType::Float, &["dim1"]).await.unwrap();
    file.data_mode().await.unwrap();
    var.write_slice(0, 4, vec![420.0_f32, 197.0, 391.5, 399.0])
        .await
        .unwrap();
    file.close().await.unwrap();
    d.path("classic.nc")
}

#[tokio::test]
async fn read_write_classic() {
    let d = Scratch::new();
    let path = classic_fixture(&d).await;
    let file = netcdf_async::open(&path, "w", None).await.unwrap();
    let var = file.root().unwrap().get_variable("var1").await.unwrap();

    assert_eq!(var.read(0).await.unwrap(), Value::Float(420.0));
    assert_eq!(
        var.read_slice(0, 4).await.unwrap(),
        Values::Floats(vec![420.0, 197.0, 391.5, 399.0])
    );
    assert_eq!(
        var.read_strided_slice(0, 2, 2).await.unwrap(),
        Values::Floats(vec![420.0, 391.5])
    );

    var.write(0, 42).await.unwrap();
    assert_eq!(var.read(0).await.unwrap(), Value::Float(42.0));

    var.write_strided_slice(0, 2, 2, vec![30.0_f32, 20.5])
        .await
        .unwrap();
    assert_eq!(
        var.read_strided_slice(0, 2, 2).await.unwrap(),
        Values::Floats(vec![30.0, 20.5])
    );
    assert_eq!(
        var.read_slice(0, 4).await.unwrap(),
        Values::Floats(vec![30.0, 197.0, 20.5, 399.0])
    );
    file.close().await.unwrap();

    let file = netcdf_async::open(&path, "r", None).await.unwrap();
    let var = file.root().unwrap().get_variable("var1").await.unwrap();
    assert_eq!(
        var.read_slice(0, 4).await.unwrap(),
        Values::Floats(vec![30.0, 197.0, 20.5, 399.0])
    );
    assert_eq!(
        var.get_dimensions().await.unwrap(),
        vec![("dim1".to_owned(), 10)]
    );
    file.close().await.unwrap();
}

fn samples(typ: NcType) -> Values {
    match typ {
        NcType::Byte => Values::Bytes(vec![i8::MIN, -1, 0, i8::MAX]),
        NcType::Char => Values::Chars(b"abcd".to_vec()),
        NcType::Short => Values::Shorts(vec![i16::MIN, -1, 0, i16::MAX]),
        NcType::Int => Values::Ints(vec![i32::MIN, -1, 0, i32::MAX]),
        NcType::Float => Values::Floats(vec![-1.5, 0.0, 0.25, 3.0e10]),
        NcType::Double => Values::Doubles(vec![-1.0e300, 0.1, 0.0, 2.5]),
        NcType::UByte => Values::UBytes(vec![0, 1, 128, u8::MAX]),
        NcType::UShort => Values::UShorts(vec![0, 1, 40_000, u16::MAX]),
        NcType::UInt => Values::UInts(vec![0, 1, 3_000_000_000, u32::MAX]),
        NcType::Int64 => Values::Int64s(vec![i64::MIN, -1, 0, i64::MAX]),
        NcType::UInt64 => Values::UInt64s(vec![0, 1, 1 << 63, u64::MAX]),
        NcType::String => Values::Strs(vec!["a".into(), String::new(), "ccc".into(), "dd".into()]),
    }
}

#[tokio::test]
async fn every_type_round_trips() {
    let d = Scratch::new();
    let path = d.path("types.nc");
    let file = d.create("types.nc", "netcdf4").await;
    let root = file.root().unwrap();
    root.add_dimension("n", 6).await.unwrap();

    for typ in NcType::ALL {
        let var = root
            .add_variable(&format!("v_{typ}"), typ, &["n"])
            .await
            .unwrap();
        let values = samples(typ);
        var.write_slice(0, 4, values.clone()).await.unwrap();
        assert_eq!(var.read_slice(0, 4).await.unwrap(), values, "{typ}");

        let last = values.get(3).unwrap();
        var.write(5, last.clone()).await.unwrap();
        assert_eq!(var.read(5).await.unwrap(), last, "{typ}");

        let strided = var.read_strided_slice(0, 2, 3).await.unwrap();
        assert_eq!(strided.get(0), values.get(0), "{typ}");
        assert_eq!(strided.get(1), values.get(3), "{typ}");
    }
    file.close().await.unwrap();

    let file = netcdf_async::open(&path, "r", None).await.unwrap();
    let root = file.root().unwrap();
    for typ in NcType::ALL {
        let var = root.get_variable(&format!("v_{typ}")).await.unwrap();
        assert_eq!(var.get_type(), typ);
        assert_eq!(var.read_slice(0, 4).await.unwrap(), samples(typ), "{typ}");
    }
    file.close().await.unwrap();
}

#[tokio::test]
async fn wide_integers_are_exact() {
    let d = Scratch::new();
    let file = d.create("wide.nc", "netcdf4").await;
    let root = file.root().unwrap();
    root.add_dimension("n", 2).await.unwrap();
    let signed = root.add_variable("s", NcType::Int64, &["n"]).await.unwrap();
    let unsigned = root.add_variable("u", NcType::UInt64, &["n"]).await.unwrap();

    signed.write(0, 9_007_199_254_740_993_i64).await.unwrap();
    assert_eq!(
        signed.read(0).await.unwrap(),
        Value::Int64(9_007_199_254_740_993)
    );
    unsigned.write(1, u64::MAX - 1).await.unwrap();
    assert_eq!(unsigned.read(1).await.unwrap(), Value::UInt64(u64::MAX - 1));

    // Converted when lossless, refused otherwise
    unsigned.write(0, 7_i8).await.unwrap();
    assert_eq!(unsigned.read(0).await.unwrap(), Value::UInt64(7));
    let e = unsigned.write(0, -1_i64).await.unwrap_err();
    assert!(matches!(e, Error::TypeMismatch(_)));
    let e = signed.write(0, u64::MAX).await.unwrap_err();
    assert!(matches!(e, Error::TypeMismatch(_)));
    file.close().await.unwrap();
}

#[tokio::test]
async fn multidimensional_selections() {
    let d = Scratch::new();
    let file = d.create("nd.nc", "netcdf4").await;
    let root = file.root().unwrap();
    root.add_dimension("y", 3).await.unwrap();
    root.add_dimension("x", 4).await.unwrap();
    let var = root.add_variable("grid", NcType::Int, &["y", "x"]).await.unwrap();

    let data: Vec<i32> = (0..12).collect();
    var.write_slice([0, 0], [3, 4], data).await.unwrap();
    assert_eq!(var.read([1, 2]).await.unwrap(), Value::Int(6));
    assert_eq!(
        var.read_slice([1, 1], [2, 2]).await.unwrap(),
        Values::Ints(vec![5, 6, 9, 10])
    );
    assert_eq!(
        var.read_strided_slice([0, 0], [2, 2], [2, 3]).await.unwrap(),
        Values::Ints(vec![0, 3, 8, 11])
    );

    var.write_strided_slice([0, 0], [1, 2], [1, 2], vec![-1, -2])
        .await
        .unwrap();
    assert_eq!(
        var.read_slice([0, 0], [1, 4]).await.unwrap(),
        Values::Ints(vec![-1, 1, -2, 3])
    );
    file.close().await.unwrap();
}

#[tokio::test]
async fn selection_errors() {
    let d = Scratch::new();
    let file = d.create("edges.nc", "netcdf4").await;
    let root = file.root().unwrap();
    root.add_dimension("x", 4).await.unwrap();
    let var = root.add_variable("v", NcType::Byte, &["x"]).await.unwrap();
    var.write_slice(0, 4, vec![1_i8, 2, 3, 4]).await.unwrap();

    // Length mismatch, nothing is written
    let e = var.write_slice(0, 3, vec![9_i8, 9]).await.unwrap_err();
    assert!(matches!(e, Error::Validation(_)));
    assert_eq!(
        var.read_slice(0, 4).await.unwrap(),
        Values::Bytes(vec![1, 2, 3, 4])
    );

    let e = var.read([0, 0]).await.unwrap_err();
    assert!(matches!(e, Error::Validation(_)));
    let e = var.read_strided_slice(0, 2, 0).await.unwrap_err();
    assert!(matches!(e, Error::Validation(_)));
    let e = var.read_slice(2, 5).await.unwrap_err();
    assert!(matches!(e, Error::Validation(_)), "{e:?}");
    // Refused before any buffer is allocated
    let e = var.read_slice(0, 1_usize << 40).await.unwrap_err();
    assert!(matches!(e, Error::Validation(_)), "{e:?}");
    let e = var.read_strided_slice(0, 3, 2).await.unwrap_err();
    assert!(matches!(e, Error::Validation(_)), "{e:?}");
    let e = var.read_slice(0, usize::MAX).await.unwrap_err();
    assert!(matches!(e, Error::Validation(_)), "{e:?}");

    let e = var.write(0, 300).await.unwrap_err();
    assert!(matches!(e, Error::TypeMismatch(_)));
    let e = var.write(0, "text").await.unwrap_err();
    assert!(matches!(e, Error::TypeMismatch(_)));
    let e = var.write(0, 1.5).await.unwrap_err();
    assert!(matches!(e, Error::TypeMismatch(_)));
    assert_eq!(var.read(0).await.unwrap(), Value::Byte(1));
    file.close().await.unwrap();
}

#[tokio::test]
async fn scalar_variable() {
    let d = Scratch::new();
    let file = d.create("scalar.nc", "netcdf4").await;
    let var = file
        .root()
        .unwrap()
        .add_variable("pi", NcType::Double, &[])
        .await
        .unwrap();
    var.write(0, std::f64::consts::PI).await.unwrap();
    assert_eq!(
        var.read(Vec::<usize>::new()).await.unwrap(),
        Value::Double(std::f64::consts::PI)
    );
    assert_eq!(
        var.read_slice(0, 1).await.unwrap(),
        Values::Doubles(vec![std::f64::consts::PI])
    );
    assert!(var.read(1).await.is_err());
    assert!(var.get_dimensions().await.unwrap().is_empty());
    file.close().await.unwrap();
}

#[tokio::test]
async fn string_variable() {
    let d = Scratch::new();
    let path = d.path("strings.nc");
    let file = d.create("strings.nc", "netcdf4").await;
    let root = file.root().unwrap();
    root.add_dimension("recNum", netcdf_async::DimensionLength::Unlimited)
        .await
        .unwrap();
    let var = root
        .add_variable("UTC_time", NcType::String, &["recNum"])
        .await
        .unwrap();
    var.write_slice(0, 2, vec!["2012-03-04 03:54:19", "2012-03-04 03:54:42"])
        .await
        .unwrap();
    assert_eq!(
        var.read(1).await.unwrap(),
        Value::Str("2012-03-04 03:54:42".into())
    );
    var.write(0, "2012-03-04 03:54:29").await.unwrap();
    file.close().await.unwrap();

    let file = netcdf_async::open(&path, "r", None).await.unwrap();
    let var = file.root().unwrap().get_variable("UTC_time").await.unwrap();
    assert_eq!(
        var.read(0).await.unwrap(),
        Value::Str("2012-03-04 03:54:29".into())
    );
    assert_eq!(
        var.get_dimensions().await.unwrap(),
        vec![("recNum".to_owned(), 2)]
    );
    file.close().await.unwrap();
}

#[tokio::test]
async fn test_variable_with_all_parameters() {
    let d = Scratch::new();
    let path = d.flights("allparams.nc").await;
    let file = netcdf_async::open(&path, "w", None).await.unwrap();
    let root = file.root().unwrap();

    assert!(!root
        .get_variables()
        .await
        .unwrap()
        .contains_key("test_variable"));
    let var = root
        .add_variable("test_variable", NcType::Byte, &["recNum"])
        .await
        .unwrap();
    assert_eq!(
        var.inspect(),
        "[Variable test_variable, type byte, 1 dimension(s)]"
    );

    var.set_endianness("little".parse().unwrap()).await.unwrap();
    var.set_checksum_mode(ChecksumMode::Fletcher32).await.unwrap();
    var.set_chunked(StorageMode::Chunked, &[8]).await.unwrap();
    var.set_deflate_info(true, true, 8).await.unwrap();
    var.add_attribute("len", NcType::Int, 42).await.unwrap();
    assert!(var.get_attributes().await.unwrap().contains_key("len"));
    var.set_fill_mode(5, true).await.unwrap();
    assert_eq!(var.read(0).await.unwrap(), Value::Byte(5));
    var.write(0, 8).await.unwrap();
    assert_eq!(var.read(0).await.unwrap(), Value::Byte(8));
    file.close().await.unwrap();

    let file = netcdf_async::open(&path, "r", None).await.unwrap();
    let var = file
        .root()
        .unwrap()
        .get_variable("test_variable")
        .await
        .unwrap();
    assert_eq!(var.read(0).await.unwrap(), Value::Byte(8));
    assert_eq!(var.read(1).await.unwrap(), Value::Byte(5));
    assert_eq!(var.get_endianness().await.unwrap(), Endianness::Little);
    assert_eq!(
        var.get_checksum_mode().await.unwrap(),
        ChecksumMode::Fletcher32
    );
    assert_eq!(
        var.get_chunked().await.unwrap(),
        Chunking {
            mode: StorageMode::Chunked,
            sizes: vec![8]
        }
    );
    assert_eq!(
        var.get_deflate_info().await.unwrap(),
        DeflateInfo {
            shuffle: true,
            deflate: true,
            level: 8
        }
    );
    assert_eq!(
        var.get_fill_mode().await.unwrap(),
        FillMode {
            enabled: true,
            value: Value::Byte(5)
        }
    );
    assert_eq!(var.get_fill().await.unwrap(), Value::Byte(5));
    file.close().await.unwrap();
}

#[tokio::test]
async fn storage_defaults_and_errors() {
    let d = Scratch::new();
    let file = d.create("storage.nc", "netcdf4").await;
    let root = file.root().unwrap();
    root.add_dimension("x", 16).await.unwrap();
    let var = root.add_variable("v", NcType::Int, &["x"]).await.unwrap();

    assert_eq!(var.get_checksum_mode().await.unwrap(), ChecksumMode::None);
    assert_eq!(
        var.get_deflate_info().await.unwrap(),
        DeflateInfo {
            shuffle: false,
            deflate: false,
            level: 0
        }
    );
    let fill = var.get_fill_mode().await.unwrap();
    assert!(fill.enabled);
    assert_eq!(fill.value, Value::Int(-2_147_483_647));

    var.set_chunked(StorageMode::Contiguous, &[]).await.unwrap();
    assert_eq!(
        var.get_chunked().await.unwrap(),
        Chunking {
            mode: StorageMode::Contiguous,
            sizes: vec![]
        }
    );

    let e = var.set_chunked(StorageMode::Chunked, &[4, 4]).await.unwrap_err();
    assert!(matches!(e, Error::Validation(_)));
    let e = var.set_deflate_info(false, true, 12).await.unwrap_err();
    assert!(matches!(e, Error::Validation(_)));

    var.set_fill(7).await.unwrap();
    assert_eq!(var.get_fill().await.unwrap(), Value::Int(7));
    var.set_fill_mode(-5, false).await.unwrap();
    assert_eq!(
        var.get_fill_mode().await.unwrap(),
        FillMode {
            enabled: false,
            value: Value::Int(-5)
        }
    );
    let e = var.set_fill("seven").await.unwrap_err();
    assert!(matches!(e, Error::TypeMismatch(_)));
    file.close().await.unwrap();
}

#[tokio::test]
async fn variable_attributes() {
    let d = Scratch::new();
    let path = d.flights("varattrs.nc").await;
    let file = netcdf_async::open(&path, "w", None).await.unwrap();
    let var = file.root().unwrap().get_variable("UTC_time").await.unwrap();

    var.add_attribute("name", NcType::Char, "time of day").await.unwrap();
    var.add_attribute("unit", NcType::String, "seconds").await.unwrap();
    var.add_attribute("range", NcType::Double, vec![0.0, 86_400.0])
        .await
        .unwrap();

    let attrs = var.get_attributes().await.unwrap();
    assert_eq!(attrs.len(), 3);
    assert_eq!(attrs["unit"].typ, NcType::String);
    let values = var.get_attribute_values().await.unwrap();
    assert_eq!(
        values["name"],
        AttributeValue::Scalar(Value::Str("time of day".into()))
    );
    assert_eq!(
        values["range"],
        AttributeValue::Array(Values::Doubles(vec![0.0, 86_400.0]))
    );

    let e = var.add_attribute("unit", NcType::String, "hours").await.unwrap_err();
    assert!(matches!(e, Error::Usage(_)));
    var.set_attribute("unit", NcType::String, "hours").await.unwrap();
    let unit = var.get_attribute("unit").await.unwrap();
    assert_eq!(
        unit.get_value().await.unwrap().value,
        AttributeValue::Scalar(Value::Str("hours".into()))
    );

    assert_eq!(var.rename_attribute("range", "bounds").await.unwrap(), "bounds");
    var.delete_attribute("name").await.unwrap();
    file.close().await.unwrap();

    let file = netcdf_async::open(&path, "r", None).await.unwrap();
    let var = file.root().unwrap().get_variable("UTC_time").await.unwrap();
    let mut names: Vec<_> = var.get_attributes().await.unwrap().into_keys().collect();
    names.sort();
    assert_eq!(names, ["bounds", "unit"]);
    file.close().await.unwrap();
}
