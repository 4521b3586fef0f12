//! Integration tests for spincrate-algorithms
//!
//! These tests run the full chain from raw points to spin images: normal
//! estimation, orientation, chunking, oriented point selection and matching.

use spincrate_algorithms::*;
use spincrate_core::{NormalPointCloud3f, Point3f, PointCloud, SpinImage, SpinImageParams};

/// Fibonacci sphere of `num_points` points
fn create_sphere_point_cloud(radius: f32, num_points: usize) -> PointCloud<Point3f> {
    let golden_angle = std::f32::consts::PI * (3.0 - 5.0_f32.sqrt());
    (0..num_points)
        .map(|i| {
            let y = 1.0 - 2.0 * (i as f32 + 0.5) / num_points as f32;
            let r = (1.0 - y * y).sqrt();
            let theta = golden_angle * i as f32;
            Point3f::new(radius * r * theta.cos(), radius * y, radius * r * theta.sin())
        })
        .collect()
}

/// Regular grid on the plane z = 0
fn create_plane_point_cloud(n: usize, spacing: f32) -> PointCloud<Point3f> {
    let mut points = Vec::with_capacity(n * n);
    for i in 0..n {
        for j in 0..n {
            points.push(Point3f::new(i as f32 * spacing, j as f32 * spacing, 0.0));
        }
    }
    PointCloud::from_points(points)
}

fn rows_mass(image: &SpinImage, rows: std::ops::Range<usize>) -> f32 {
    rows.map(|i| image.data.row(i).sum()).sum()
}

fn with_normals(cloud: &PointCloud<Point3f>, camera: Point3f) -> NormalPointCloud3f {
    let params = NormalEstimationParams { radius: 0.1, max_nn: 30 };
    let mut result = estimate_normals(cloud, &params).unwrap();
    orient_normals_towards_camera(&mut result, &camera);
    result
}

#[test]
fn test_sphere_mass_lies_on_normal_side() {
    let cloud = with_normals(&create_sphere_point_cloud(0.2, 6000), Point3f::origin());
    let params = SpinImageParams { support_radius: Some(0.1), ..Default::default() };
    let half = params.resolution / 2;

    let image = compute_spin_image(&OrientedPointSelector::Index(3000).select(&cloud).unwrap(), &cloud, &params).unwrap();
    let total = image.total_weight();
    assert!(total > 50.0, "too few contributions: {}", total);

    // inward normals: every other point of the sphere has β >= 0
    let below = rows_mass(&image, (half + 2)..params.resolution);
    assert!(below < 0.05 * total, "{} of {} below the tangent plane", below, total);
}

#[test]
fn test_plane_spin_image_is_a_single_row_band() {
    let cloud = with_normals(&create_plane_point_cloud(40, 0.005), Point3f::new(0.0, 0.0, 1.0));
    let params = SpinImageParams::default();
    let half = params.resolution / 2;

    let oriented = OrientedPointSelector::Centroid.select(&cloud).unwrap();
    let image = compute_spin_image(&oriented, &cloud, &params).unwrap();

    let band = rows_mass(&image, (half - 1)..(half + 2));
    assert!((band - image.total_weight()).abs() < 1e-3 * image.total_weight().max(1.0));
    assert!(image.total_weight() > 100.0);
}

#[test]
fn test_chunked_pipeline() {
    let cloud = with_normals(&create_sphere_point_cloud(0.2, 3000), Point3f::new(0.0, 1.0, 0.0));
    let chunks = ChunkSpec::Count(3).resolve(cloud.len()).unwrap();
    assert_eq!(chunks.len(), 3);

    let params = SpinImageParams::default();
    let selector = OrientedPointSelector::Index(500);
    for indices in &chunks {
        let chunk = cloud.select_by_index(indices).unwrap();
        assert_eq!(chunk.len(), 1000);
        let oriented = selector.select(&chunk).unwrap();
        let image = compute_spin_image(&oriented, &chunk, &params).unwrap();
        assert_eq!(image.resolution(), params.resolution);
        assert!(image.total_weight() >= 1.0);
    }
}

#[test]
fn test_similar_surfaces_correlate_better() {
    let sphere = with_normals(&create_sphere_point_cloud(0.2, 6000), Point3f::origin());
    let plane = with_normals(&create_plane_point_cloud(40, 0.005), Point3f::new(0.0, 0.0, 1.0));
    let params = SpinImageParams { support_radius: Some(0.08), ..Default::default() };

    let sphere_images = compute_spin_images(&sphere, &[1000, 4000], &params).unwrap();
    let plane_center = OrientedPointSelector::Centroid.select_index(&plane).unwrap();
    let plane_image = &compute_spin_images(&plane, &[plane_center], &params).unwrap()[0];

    let same = spin_image_correlation(&sphere_images[0], &sphere_images[1]).unwrap();
    let different = spin_image_correlation(&sphere_images[0], plane_image).unwrap();
    assert!(same > different, "sphere/sphere {} <= sphere/plane {}", same, different);
}

#[test]
fn test_projection_of_chunk() {
    let cloud = create_plane_point_cloud(10, 0.01);
    let projected = pca_project_2d(&cloud.points).unwrap();
    assert_eq!(projected.len(), 100);
    let spread: f32 = projected.iter().map(|p| p[0].abs() + p[1].abs()).sum();
    assert!(spread > 0.0);
}
