#![allow(dead_code)]

use std::path::PathBuf;

use netcdf_async::File;

/// Scratch directory holding the files of one test
pub struct Scratch {
    dir: tempfile::TempDir,
}

impl Scratch {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Creates (or replaces) `name` in the given format
    pub async fn create(&self, name: &str, format: &str) -> File {
        netcdf_async::open(self.path(name), "c!", Some(format))
            .await
            .unwrap()
    }

    /// Builds a small flight-like file: a root attribute, two groups,
    /// a fixed and an unlimited dimension and a record variable
    pub async fn flights(&self, name: &str) -> PathBuf {
        let file = self.create(name, "netcdf4").await;
        let root = file.root().unwrap();
        root.add_attribute("history", netcdf_async::NcType::Char, "created for tests")
            .await
            .unwrap();
        root.add_dimension("recNum", netcdf_async::DimensionLength::Unlimited)
            .await
            .unwrap();
        root.add_dimension("level", 4).await.unwrap();
        root.add_subgroup("flight_ascent").await.unwrap();
        root.add_subgroup("flight_descent").await.unwrap();
        let var = root
            .add_variable("UTC_time", netcdf_async::NcType::Int, &["recNum"])
            .await
            .unwrap();
        var.write_slice(0, 3, vec![10_i32, 20, 30]).await.unwrap();
        file.close().await.unwrap();
        self.path(name)
    }
}
