mod common;

use common::Scratch;
use netcdf_async::{CreateFormat, Error, FileFormat, Mode, NcType, Value};

#[tokio::test]
async fn create_and_reopen() {
    let d = Scratch::new();
    let path = d.path("create.nc");

    let file = netcdf_async::open(&path, "c", None).await.unwrap();
    assert_eq!(file.mode(), Mode::Create);
    assert_eq!(file.format(), FileFormat::Hdf5);
    assert!(!file.is_closed());
    assert!(file.name().ends_with("create.nc"));
    file.close().await.unwrap();

    let file = netcdf_async::open(&path, "r", None).await.unwrap();
    assert_eq!(file.mode(), Mode::Read);
    assert_eq!(file.format(), FileFormat::Hdf5);
    file.close().await.unwrap();
}

#[tokio::test]
async fn formats() {
    let d = Scratch::new();
    for (name, expected) in [
        ("classic", FileFormat::NetCdf3),
        ("classic64", FileFormat::NetCdf3),
        ("netcdf4", FileFormat::Hdf5),
        ("netcdf4classic", FileFormat::Hdf5),
    ] {
        let file = d.create(&format!("{name}.nc"), name).await;
        assert_eq!(file.format(), expected, "{name}");
        file.close().await.unwrap();
    }
}

#[tokio::test]
async fn invalid_mode_and_format() {
    let d = Scratch::new();
    let e = netcdf_async::open(d.path("x.nc"), "rw", None).await.unwrap_err();
    assert!(matches!(e, Error::Validation(_)));
    assert_eq!(e.to_string(), "Unknown file mode");

    let e = netcdf_async::open(d.path("x.nc"), "c", Some("hdf4"))
        .await
        .unwrap_err();
    assert!(matches!(e, Error::Validation(_)));
    assert_eq!(e.to_string(), "Unknown file format");
    assert!(!d.path("x.nc").exists());
}

#[tokio::test]
async fn missing_file() {
    let d = Scratch::new();
    let e = netcdf_async::open(d.path("nope.nc"), "r", None)
        .await
        .unwrap_err();
    assert!(matches!(e, Error::NotFound(_)), "{e:?}");
}

#[tokio::test]
async fn create_refuses_to_overwrite() {
    let d = Scratch::new();
    let path = d.path("twice.nc");
    let file = netcdf_async::open_with(&path, Mode::Create, CreateFormat::NetCdf4)
        .await
        .unwrap();
    file.close().await.unwrap();

    let e = netcdf_async::open_with(&path, Mode::Create, CreateFormat::NetCdf4)
        .await
        .unwrap_err();
    assert!(matches!(e, Error::Usage(_)), "{e:?}");

    netcdf_async::open_with(&path, Mode::CreateOverwrite, CreateFormat::NetCdf4)
        .await
        .unwrap()
        .close()
        .await
        .unwrap();
}

#[tokio::test]
async fn inspect() {
    let d = Scratch::new();
    let path = d.path("inspect.nc");
    let file = d.create("inspect.nc", "netcdf4").await;
    let name = path.to_string_lossy().into_owned();
    assert_eq!(file.inspect(), format!("[hdf5 file {name}]"));
    file.close().await.unwrap();
    assert_eq!(file.inspect(), format!("[Closed hdf5 file {name}]"));
    assert_eq!(file.to_string(), file.inspect());
}

#[tokio::test]
async fn close() {
    let d = Scratch::new();
    let file = d.create("close.nc", "netcdf4").await;
    let root = file.root().unwrap();

    file.close().await.unwrap();
    assert!(file.is_closed());
    assert!(file.root().is_none());

    let e = file.close().await.unwrap_err();
    assert!(matches!(e, Error::Usage(_)));
    assert_eq!(e.to_string(), "File already closed");

    let e = root.get_name().await.unwrap_err();
    assert_eq!(e.to_string(), "File already closed");
    let e = root.add_dimension("x", 1).await.unwrap_err();
    assert!(matches!(e, Error::Usage(_)));
    assert!(file.sync().await.is_err());
}

#[tokio::test]
async fn operations_queued_before_close_complete() {
    let d = Scratch::new();
    let path = d.path("queued.nc");
    let file = d.create("queued.nc", "netcdf4").await;
    let root = file.root().unwrap();

    let dim = root.add_dimension("x", 3);
    let var = root.add_variable("v", NcType::Short, &["x"]);
    let closed = file.close();
    dim.await.unwrap();
    let var = var.await.unwrap();
    closed.await.unwrap();
    assert!(var.read(0).await.is_err());

    let file = netcdf_async::open(&path, "r", None).await.unwrap();
    let var = file.root().unwrap().get_variable("v").await.unwrap();
    assert_eq!(var.get_type(), NcType::Short);
    file.close().await.unwrap();
}

#[tokio::test]
async fn dropping_the_file_invalidates_proxies() {
    let d = Scratch::new();
    let file = d.create("dropped.nc", "netcdf4").await;
    let root = file.root().unwrap();
    drop(file);

    let e = root.get_subgroups().await.unwrap_err();
    assert!(matches!(e, Error::Usage(_)));
}

#[tokio::test]
async fn classic_modes() {
    let d = Scratch::new();
    let path = d.path("classic.nc");
    let file = d.create("classic.nc", "classic").await;
    let root = file.root().unwrap();

    root.add_dimension("x", 2).await.unwrap();
    let var = root.add_variable("v", NcType::Double, &["x"]).await.unwrap();

    // Still in define mode
    let e = var.write(0, 1.5).await.unwrap_err();
    assert!(matches!(e, Error::Validation(_)), "{e:?}");

    file.data_mode().await.unwrap();
    var.write(0, 1.5).await.unwrap();
    assert_eq!(var.read(0).await.unwrap(), Value::Double(1.5));

    let e = root.add_dimension("y", 2).await.unwrap_err();
    assert!(matches!(e, Error::Validation(_)), "{e:?}");
    file.define_mode().await.unwrap();
    root.add_dimension("y", 2).await.unwrap();
    file.data_mode().await.unwrap();

    file.sync().await.unwrap();
    file.close().await.unwrap();

    let file = netcdf_async::open(&path, "w", None).await.unwrap();
    assert_eq!(file.format(), FileFormat::NetCdf3);
    let dims = file.root().unwrap().get_dimensions(false).await.unwrap();
    assert_eq!(dims.len(), 2);
    file.close().await.unwrap();
}

#[test]
fn version() {
    let v = netcdf_async::library_version();
    assert!(v.starts_with('4'), "{v}");
}
