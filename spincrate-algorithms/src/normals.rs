//! Normal estimation algorithms

use crate::nearest_neighbor::KdTree;
use log::{debug, warn};
use nalgebra::{Matrix3, SymmetricEigen};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use spincrate_core::{Error, NormalPoint3f, NormalPointCloud3f, Point3f, PointCloud, Result, Vector3f};

/// Neighbourhood used to fit a local plane around each point
///
/// The search is hybrid: at most `max_nn` nearest neighbours, all within
/// `radius` of the query point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalEstimationParams {
    pub radius: f32,
    pub max_nn: usize,
}

impl Default for NormalEstimationParams {
    fn default() -> Self {
        Self {
            radius: 0.1,
            max_nn: 30,
        }
    }
}

impl NormalEstimationParams {
    pub fn validate(&self) -> Result<()> {
        if !(self.radius.is_finite() && self.radius > 0.0) {
            return Err(Error::InvalidData(format!(
                "normal estimation radius must be positive, got {}",
                self.radius
            )));
        }
        if self.max_nn < 3 {
            return Err(Error::InvalidData(format!(
                "normal estimation needs max_nn >= 3, got {}",
                self.max_nn
            )));
        }
        Ok(())
    }
}

/// Unit normal of the best-fit plane through `neighbors`.
///
/// Returns `None` for fewer than three points or a degenerate fit.
fn fit_normal(neighbors: &[Point3f]) -> Option<Vector3f> {
    if neighbors.len() < 3 {
        return None;
    }

    let count = neighbors.len() as f32;
    let centroid = neighbors
        .iter()
        .fold(Vector3f::zeros(), |acc, p| acc + p.coords)
        / count;

    let covariance = neighbors.iter().fold(Matrix3::<f32>::zeros(), |acc, p| {
        let d = p.coords - centroid;
        acc + d * d.transpose()
    }) / count;

    let eigen = SymmetricEigen::new(covariance);
    let (min_idx, _) = eigen
        .eigenvalues
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(b.1))?;

    let normal = eigen.eigenvectors.column(min_idx).into_owned();
    let length = normal.norm();
    if !length.is_finite() || length < 1e-8 {
        return None;
    }
    Some(normal / length)
}

/// Estimate normals for a point cloud with PCA over hybrid neighbourhoods
///
/// Each normal is the eigenvector of the neighbourhood covariance with the
/// smallest eigenvalue. Points with fewer than three neighbours get `+Z`.
/// Orientation is arbitrary; see [`orient_normals_towards_camera`].
///
/// # Example
/// ```rust
/// use spincrate_core::{PointCloud, Point3f};
/// use spincrate_algorithms::{estimate_normals, NormalEstimationParams};
///
/// fn main() -> spincrate_core::Result<()> {
///     let mut points = Vec::new();
///     for i in 0..5 {
///         for j in 0..5 {
///             points.push(Point3f::new(i as f32 * 0.01, j as f32 * 0.01, 0.0));
///         }
///     }
///     let cloud = PointCloud::from_points(points);
///
///     let with_normals = estimate_normals(&cloud, &NormalEstimationParams::default())?;
///     assert!(with_normals[12].normal.z.abs() > 0.99);
///     Ok(())
/// }
/// ```
pub fn estimate_normals(
    cloud: &PointCloud<Point3f>,
    params: &NormalEstimationParams,
) -> Result<NormalPointCloud3f> {
    params.validate()?;
    if cloud.is_empty() {
        return Ok(PointCloud::new());
    }

    let tree = KdTree::new(&cloud.points)?;

    let normals: Vec<Option<Vector3f>> = cloud.points
        .par_iter()
        .map(|point| {
            let neighbors: Vec<Point3f> = tree
                .find_hybrid(point, params.radius, params.max_nn)
                .into_iter()
                .map(|(idx, _)| cloud.points[idx])
                .collect();
            fit_normal(&neighbors)
        })
        .collect();

    let degenerate = normals.iter().filter(|n| n.is_none()).count();
    if degenerate > 0 {
        warn!(
            "{} of {} points had too few neighbours within radius {}, using +Z normals",
            degenerate,
            cloud.len(),
            params.radius
        );
    }
    debug!("estimated {} normals (radius {}, max_nn {})", cloud.len(), params.radius, params.max_nn);

    Ok(cloud.points
        .iter()
        .zip(normals)
        .map(|(position, normal)| NormalPoint3f::new(*position, normal.unwrap_or_else(Vector3f::z)))
        .collect())
}

/// Flip normals so each one faces the camera location
pub fn orient_normals_towards_camera(cloud: &mut NormalPointCloud3f, camera: &Point3f) {
    let mut flipped = 0usize;
    for point in cloud.iter_mut() {
        if point.normal.dot(&(camera - point.position)) < 0.0 {
            point.normal = -point.normal;
            flipped += 1;
        }
    }
    debug!("oriented normals towards {:?}, flipped {}", camera, flipped);
}
