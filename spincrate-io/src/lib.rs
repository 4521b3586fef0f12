//! I/O operations for point clouds and spin images
//! 
//! This crate reads and writes the point cloud formats used by the spin image
//! pipeline (PCD and XYZ text) and exports spin image matrices as CSV.

pub mod pcd;
pub mod xyz;
pub mod spin_image_csv;
pub mod error;

pub use error::*;
pub use pcd::{PcdData, PcdDataFormat, PcdReader, PcdWriteOptions, PcdWriter};
pub use xyz::{XyzData, XyzReader, XyzWriter};
pub use spin_image_csv::*;

use spincrate_core::{NormalPointCloud3f, Point3f, PointCloud, Result, Vector3f};
use std::path::Path;

/// Trait for reading point clouds from files
pub trait PointCloudReader {
    fn read_point_cloud<P: AsRef<Path>>(path: P) -> Result<PointCloud<Point3f>>;
}

/// Trait for writing point clouds to files
pub trait PointCloudWriter {
    fn write_point_cloud<P: AsRef<Path>>(cloud: &PointCloud<Point3f>, path: P) -> Result<()>;
}

/// Point cloud formats recognised by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointCloudFormat {
    Pcd,
    Xyz,
}

impl PointCloudFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_ascii_lowercase());
        match extension.as_deref() {
            Some("pcd") => Ok(PointCloudFormat::Pcd),
            Some("xyz") | Some("xyzn") | Some("txt") | Some("csv") => Ok(PointCloudFormat::Xyz),
            _ => Err(spincrate_core::Error::UnsupportedFormat(format!(
                "Unsupported point cloud format: {:?}",
                path.extension()
            ))),
        }
    }
}

/// Positions read from a file, with normals when the file stores them
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointData {
    pub positions: Vec<Point3f>,
    pub normals: Option<Vec<Vector3f>>,
}

impl PointData {
    pub fn into_point_cloud(self) -> PointCloud<Point3f> {
        PointCloud::from_points(self.positions)
    }

    /// Positions paired with normals, `None` when there are no normals.
    pub fn into_normal_point_cloud(self) -> Result<Option<NormalPointCloud3f>> {
        match self.normals {
            Some(normals) => NormalPointCloud3f::from_positions_and_normals(&self.positions, &normals).map(Some),
            None => Ok(None),
        }
    }
}

impl From<PcdData> for PointData {
    fn from(data: PcdData) -> Self {
        Self {
            positions: data.positions,
            normals: data.normals,
        }
    }
}

impl From<XyzData> for PointData {
    fn from(data: XyzData) -> Self {
        Self {
            positions: data.positions,
            normals: data.normals,
        }
    }
}

/// Auto-detect format and read positions and any stored normals in one pass
pub fn read_point_data<P: AsRef<Path>>(path: P) -> Result<PointData> {
    let path = path.as_ref();
    match PointCloudFormat::from_path(path)? {
        PointCloudFormat::Pcd => PcdReader::read_pcd_file(path).map(PointData::from),
        PointCloudFormat::Xyz => XyzReader::read_xyz_file(path).map(PointData::from),
    }
}

/// Auto-detect format and read point cloud
pub fn read_point_cloud<P: AsRef<Path>>(path: P) -> Result<PointCloud<Point3f>> {
    let path = path.as_ref();
    match PointCloudFormat::from_path(path)? {
        PointCloudFormat::Pcd => PcdReader::read_point_cloud(path),
        PointCloudFormat::Xyz => XyzReader::read_point_cloud(path),
    }
}

/// Auto-detect format and read a point cloud with its stored normals
///
/// Returns `None` when the file has no normal fields.
pub fn read_normal_point_cloud<P: AsRef<Path>>(path: P) -> Result<Option<NormalPointCloud3f>> {
    read_point_data(path)?.into_normal_point_cloud()
}

/// Auto-detect format and write point cloud
pub fn write_point_cloud<P: AsRef<Path>>(cloud: &PointCloud<Point3f>, path: P) -> Result<()> {
    let path = path.as_ref();
    match PointCloudFormat::from_path(path)? {
        PointCloudFormat::Pcd => PcdWriter::write_point_cloud(cloud, path),
        PointCloudFormat::Xyz => XyzWriter::write_point_cloud(cloud, path),
    }
}

/// Auto-detect format and write a point cloud together with its normals
pub fn write_normal_point_cloud<P: AsRef<Path>>(cloud: &NormalPointCloud3f, path: P) -> Result<()> {
    let path = path.as_ref();
    match PointCloudFormat::from_path(path)? {
        PointCloudFormat::Pcd => PcdWriter::write_normal_point_cloud(cloud, path, &PcdWriteOptions::default()),
        PointCloudFormat::Xyz => {
            XyzWriter::write_xyz_file(path, &cloud.positions(), Some(cloud.normals().as_slice()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spincrate_core::{NormalPoint3f, Vector3f};

    fn sample_cloud() -> NormalPointCloud3f {
        (0..5)
            .map(|i| NormalPoint3f::new(Point3f::new(i as f32, 0.5, -1.0), Vector3f::new(0.0, 1.0, 0.0)))
            .collect()
    }

    #[test]
    fn test_pcd_roundtrip_through_dispatch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cloud.pcd");

        write_normal_point_cloud(&sample_cloud(), &path).unwrap();
        let loaded = read_normal_point_cloud(&path).unwrap().unwrap();
        assert_eq!(loaded.positions(), sample_cloud().positions());
        assert_eq!(loaded.normals(), sample_cloud().normals());

        let positions_only = read_point_cloud(&path).unwrap();
        assert_eq!(positions_only.len(), 5);
    }

    #[test]
    fn test_xyz_without_normals() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cloud.xyz");

        let cloud = PointCloud::from_points(sample_cloud().positions());
        write_point_cloud(&cloud, &path).unwrap();
        assert!(read_normal_point_cloud(&path).unwrap().is_none());
        for (a, b) in read_point_cloud(&path).unwrap().iter().zip(cloud.iter()) {
            approx::assert_relative_eq!(a.x, b.x);
            approx::assert_relative_eq!(a.y, b.y);
            approx::assert_relative_eq!(a.z, b.z);
        }
    }

    #[test]
    fn test_read_point_data_keeps_optional_normals() {
        let dir = tempfile::tempdir().unwrap();
        let with = dir.path().join("with.pcd");
        let without = dir.path().join("without.xyz");
        write_normal_point_cloud(&sample_cloud(), &with).unwrap();
        write_point_cloud(&PointCloud::from_points(sample_cloud().positions()), &without).unwrap();

        let data = read_point_data(&with).unwrap();
        assert_eq!(data.positions, sample_cloud().positions());
        assert_eq!(data.normals, Some(sample_cloud().normals()));

        let data = read_point_data(&without).unwrap();
        assert_eq!(data.positions.len(), 5);
        assert!(data.normals.is_none());
        assert_eq!(data.into_point_cloud().len(), 5);
    }

    #[test]
    fn test_unsupported_extension() {
        assert!(matches!(
            read_point_cloud("cloud.obj"),
            Err(spincrate_core::Error::UnsupportedFormat(_))
        ));
        assert!(PointCloudFormat::from_path(Path::new("SCAN.PCD")).is_ok());
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            read_point_cloud(dir.path().join("absent.pcd")),
            Err(spincrate_core::Error::Io(_))
        ));
    }
}
