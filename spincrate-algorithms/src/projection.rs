//! Principal component projection of 3D points onto a plane

use nalgebra::{Matrix3, SymmetricEigen};
use spincrate_core::{Point3f, Result, Vector3f};

/// Principal axes of a point set, sorted by decreasing variance
#[derive(Debug, Clone, PartialEq)]
pub struct PrincipalAxes {
    pub centroid: Point3f,
    pub axes: [Vector3f; 3],
    pub variances: [f32; 3],
}

impl PrincipalAxes {
    /// Fit principal axes to `points`; `None` for an empty slice.
    pub fn fit(points: &[Point3f]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }

        let count = points.len() as f32;
        let centroid = points.iter().fold(Vector3f::zeros(), |acc, p| acc + p.coords) / count;
        let covariance = points.iter().fold(Matrix3::<f32>::zeros(), |acc, p| {
            let d = p.coords - centroid;
            acc + d * d.transpose()
        }) / count;

        let eigen = SymmetricEigen::new(covariance);
        let mut order = [0usize, 1, 2];
        order.sort_by(|&a, &b| eigen.eigenvalues[b].total_cmp(&eigen.eigenvalues[a]));

        let axis = |k: usize| -> Vector3f {
            let v: Vector3f = eigen.eigenvectors.column(order[k]).into_owned();
            let n = v.norm();
            if n > 1e-8 { v / n } else { v }
        };

        Some(Self {
            centroid: Point3f::from(centroid),
            axes: [axis(0), axis(1), axis(2)],
            variances: [
                eigen.eigenvalues[order[0]].max(0.0),
                eigen.eigenvalues[order[1]].max(0.0),
                eigen.eigenvalues[order[2]].max(0.0),
            ],
        })
    }

    /// Coordinates of `point` along the two dominant axes.
    pub fn project(&self, point: &Point3f) -> [f32; 2] {
        let d = point - self.centroid;
        [d.dot(&self.axes[0]), d.dot(&self.axes[1])]
    }
}

/// Project points onto their two principal components
///
/// The result is centred on the centroid; the first coordinate follows the
/// direction of largest variance. An empty input gives an empty output.
pub fn pca_project_2d(points: &[Point3f]) -> Result<Vec<[f32; 2]>> {
    let Some(axes) = PrincipalAxes::fit(points) else {
        return Ok(Vec::new());
    };
    Ok(points.iter().map(|p| axes.project(p)).collect())
}
