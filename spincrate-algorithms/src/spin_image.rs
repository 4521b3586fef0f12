//! Spin image generation and matching
//!
//! Implements the oriented-point descriptor of Johnson (1997): every point of
//! the support region is mapped to cylindrical coordinates (α, β) around the
//! oriented point and splatted into a 2D grid with bilinear weights.

use log::debug;
use rayon::prelude::*;
use spincrate_core::{
    Error, NormalPointCloud3f, OrientedPoint, Result, SpinImage, SpinImageParams,
};

/// Compute the spin image of `cloud` around `oriented`
///
/// A point contributes when the angle between its normal and the oriented
/// point's normal is within the support angle, its distance is within the
/// support radius (if set), and its bilinear footprint lies fully inside the
/// image. Each contributing point adds a total weight of one.
///
/// # Example
/// ```rust
/// use spincrate_core::{NormalPoint3f, OrientedPoint, Point3f, PointCloud, SpinImageParams, Vector3f};
/// use spincrate_algorithms::compute_spin_image;
///
/// fn main() -> spincrate_core::Result<()> {
///     let cloud: PointCloud<NormalPoint3f> = (0..10)
///         .map(|i| NormalPoint3f::new(Point3f::new(i as f32 * 0.01, 0.0, 0.0), Vector3f::z()))
///         .collect();
///     let oriented = OrientedPoint::new(Point3f::origin(), Vector3f::z())?;
///
///     let params = SpinImageParams { bin_size: 0.01, resolution: 16, support_radius: None, ..Default::default() };
///     let image = compute_spin_image(&oriented, &cloud, &params)?;
///     assert_eq!(image.resolution(), 16);
///     Ok(())
/// }
/// ```
pub fn compute_spin_image(
    oriented: &OrientedPoint,
    cloud: &NormalPointCloud3f,
    params: &SpinImageParams,
) -> Result<SpinImage> {
    params.validate()?;

    let resolution = params.resolution;
    let half = resolution as f32 / 2.0;
    let cos_threshold = params.cos_support_angle();
    let mut image = SpinImage::zeros(params);
    let mut contributing = 0usize;

    for point in cloud.iter() {
        let normal_length = point.normal.norm();
        if normal_length < 1e-8 {
            continue;
        }
        if oriented.normal.dot(&point.normal) / normal_length < cos_threshold {
            continue;
        }

        if let Some(radius) = params.support_radius {
            if (point.position - oriented.position).norm() > radius {
                continue;
            }
        }

        let (alpha, beta) = oriented.spin_coordinates(&point.position);
        let u = half - beta / params.bin_size;
        let v = alpha / params.bin_size;
        if !u.is_finite() || !v.is_finite() {
            continue;
        }

        let row = u.floor();
        let col = v.floor();
        if row < 0.0 || col < 0.0 || row >= (resolution - 1) as f32 || col >= (resolution - 1) as f32 {
            continue;
        }
        let (i, j) = (row as usize, col as usize);

        let a = v - col;
        let b = u - row;
        image.data[[i, j]] += (1.0 - a) * (1.0 - b);
        image.data[[i + 1, j]] += (1.0 - a) * b;
        image.data[[i, j + 1]] += a * (1.0 - b);
        image.data[[i + 1, j + 1]] += a * b;
        contributing += 1;
    }

    debug!(
        "spin image at {:?}: {} of {} points contributed",
        oriented.position,
        contributing,
        cloud.len()
    );
    Ok(image)
}

/// Compute spin images for several points of the same cloud in parallel
///
/// Each index selects an oriented point (position and normal) from `cloud`;
/// the whole cloud is the support region for every image.
pub fn compute_spin_images(
    cloud: &NormalPointCloud3f,
    indices: &[usize],
    params: &SpinImageParams,
) -> Result<Vec<SpinImage>> {
    params.validate()?;

    let oriented: Vec<OrientedPoint> = indices
        .iter()
        .map(|&idx| {
            let point = cloud.points.get(idx).ok_or_else(|| {
                Error::InvalidData(format!(
                    "oriented point index {} out of range for {} points",
                    idx,
                    cloud.len()
                ))
            })?;
            OrientedPoint::try_from(*point)
        })
        .collect::<Result<_>>()?;

    oriented
        .par_iter()
        .map(|op| compute_spin_image(op, cloud, params))
        .collect()
}

/// Linear correlation between two spin images
///
/// Following Johnson's matching measure, only bins where at least one image
/// is non-zero are compared, so empty background does not inflate the score.
/// Returns a value in `[-1, 1]`; zero when fewer than two bins overlap or
/// either image is constant over the overlap.
pub fn spin_image_correlation(a: &SpinImage, b: &SpinImage) -> Result<f32> {
    if a.data.dim() != b.data.dim() {
        return Err(Error::InvalidData(format!(
            "cannot correlate spin images of shapes {:?} and {:?}",
            a.data.dim(),
            b.data.dim()
        )));
    }

    let pairs: Vec<(f64, f64)> = a.data
        .iter()
        .zip(b.data.iter())
        .filter(|(x, y)| **x != 0.0 || **y != 0.0)
        .map(|(x, y)| (*x as f64, *y as f64))
        .collect();

    let n = pairs.len() as f64;
    if pairs.len() < 2 {
        return Ok(0.0);
    }

    let (sum_x, sum_y, sum_xy, sum_xx, sum_yy) = pairs.iter().fold(
        (0.0, 0.0, 0.0, 0.0, 0.0),
        |(sx, sy, sxy, sxx, syy), (x, y)| (sx + x, sy + y, sxy + x * y, sxx + x * x, syy + y * y),
    );

    let numerator = n * sum_xy - sum_x * sum_y;
    let denominator = ((n * sum_xx - sum_x * sum_x) * (n * sum_yy - sum_y * sum_y)).sqrt();
    if !(denominator > 1e-12) {
        return Ok(0.0);
    }

    Ok((numerator / denominator).clamp(-1.0, 1.0) as f32)
}
