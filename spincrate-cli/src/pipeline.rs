//! Load, chunk, describe and render

use crate::config::PipelineConfig;
use anyhow::{Context, Result};
use log::{debug, info, warn};
use spincrate_algorithms::{
    compute_spin_image, compute_spin_images, estimate_normals, orient_normals_towards_camera, spin_image_correlation,
};
use spincrate_core::{NormalPointCloud3f, OrientedPoint, PointCloud, SpinImage};
use spincrate_visualization::{save_spin_image, ChunkFigure, Colormap};
use std::fs;
use std::path::{Path, PathBuf};

/// Outcome of one chunk
#[derive(Debug, Clone)]
pub struct ChunkSummary {
    pub chunk: usize,
    pub points: usize,
    /// Index of the oriented point within the chunk
    pub oriented_index: usize,
    pub spin_image: SpinImage,
    pub csv_path: PathBuf,
    pub png_path: PathBuf,
}

/// Read `input` and give every point a normal facing the camera
///
/// Normals stored in the file are used when the config allows it; otherwise
/// they are estimated. Either way they are flipped towards the camera.
pub fn load_oriented_cloud(input: &Path, config: &PipelineConfig) -> Result<NormalPointCloud3f> {
    let data = spincrate_io::read_point_data(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    if data.positions.is_empty() {
        anyhow::bail!("{} contains no points", input.display());
    }
    info!("loaded {} points from {}", data.positions.len(), input.display());

    let mut cloud = match data.normals {
        Some(normals) if config.use_file_normals => {
            info!("using normals stored in {}", input.display());
            NormalPointCloud3f::from_positions_and_normals(&data.positions, &normals)?
        }
        _ => estimate_normals(&PointCloud::from_points(data.positions), &config.normals)
            .context("Normal estimation failed")?,
    };
    orient_normals_towards_camera(&mut cloud, &config.camera_location());
    Ok(cloud)
}

/// Spin image correlation between two points of the cloud in `input`
pub fn compare(input: &Path, index_a: usize, index_b: usize, config: &PipelineConfig) -> Result<f32> {
    let cloud = load_oriented_cloud(input, config)?;
    let images = compute_spin_images(&cloud, &[index_a, index_b], &config.spin_image)
        .context("Failed to compute spin images")?;
    let [a, b] = images.as_slice() else {
        anyhow::bail!("expected two spin images, got {}", images.len());
    };
    let correlation = spin_image_correlation(a, b)?;
    debug!("points {} and {}: correlation {:.6}", index_a, index_b, correlation);
    Ok(correlation)
}

/// Compute and write the spin image of every chunk, then the overview figure
pub fn run_chunks(cloud: &NormalPointCloud3f, config: &PipelineConfig, output_dir: &Path) -> Result<Vec<ChunkSummary>> {
    let chunks = config
        .chunks
        .resolve(cloud.len())
        .with_context(|| format!("Cannot chunk a cloud of {} points", cloud.len()))?;
    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory {}", output_dir.display()))?;

    let mut figure = ChunkFigure::default();
    let mut summaries = Vec::with_capacity(chunks.len());

    for (k, indices) in chunks.iter().enumerate() {
        let chunk = cloud.select_by_index(indices)?;
        let oriented_index = config
            .oriented_point
            .select_index(&chunk)
            .with_context(|| format!("Chunk {} has no usable oriented point", k))?;
        let oriented = OrientedPoint::try_from(chunk[oriented_index])?;

        let spin_image = compute_spin_image(&oriented, &chunk, &config.spin_image)
            .with_context(|| format!("Spin image of chunk {} failed", k))?;
        let weight = spin_image.total_weight();
        if weight <= 1.0 {
            warn!("chunk {}: at most one point contributed to the spin image", k);
        }
        debug!(
            "chunk {}: {} points, oriented point {}, weight {:.2}, {} occupied bins",
            k,
            chunk.len(),
            oriented_index,
            weight,
            spin_image.occupied_bins()
        );

        let csv_path = output_dir.join(format!("chunk_{}_spin.csv", k));
        spincrate_io::write_spin_image_csv(&spin_image, &csv_path)
            .with_context(|| format!("Failed to write {}", csv_path.display()))?;
        let png_path = output_dir.join(format!("chunk_{}_spin.png", k));
        save_spin_image(&spin_image, Colormap::Jet, config.render_scale, &png_path)
            .with_context(|| format!("Failed to write {}", png_path.display()))?;

        figure.add_row(&chunk.positions(), spin_image.clone());
        summaries.push(ChunkSummary {
            chunk: k,
            points: chunk.len(),
            oriented_index,
            spin_image,
            csv_path,
            png_path,
        });
    }

    let figure_path = output_dir.join("figure.png");
    figure
        .save(&figure_path)
        .with_context(|| format!("Failed to write {}", figure_path.display()))?;

    Ok(summaries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use spincrate_algorithms::{ChunkSpec, OrientedPointSelector};
    use spincrate_core::{NormalPoint3f, Point3f, PointCloud, Vector3f};

    /// Near-uniform points on the unit sphere, ordered by height
    fn fibonacci_sphere(n: usize) -> PointCloud<Point3f> {
        let golden = std::f32::consts::PI * (3.0 - 5.0f32.sqrt());
        (0..n)
            .map(|i| {
                let z = 1.0 - 2.0 * (i as f32 + 0.5) / n as f32;
                let r = (1.0 - z * z).sqrt();
                let theta = golden * i as f32;
                Point3f::new(r * theta.cos(), r * theta.sin(), z)
            })
            .collect()
    }

    fn test_config() -> PipelineConfig {
        let mut config = PipelineConfig::default();
        config.spin_image.bin_size = 0.1;
        config.spin_image.resolution = 20;
        config.spin_image.support_radius = None;
        config.normals.radius = 0.4;
        config.chunks = ChunkSpec::Count(2);
        config.oriented_point = OrientedPointSelector::Centroid;
        config.render_scale = 2;
        config
    }

    #[test]
    fn test_estimated_normals_face_camera() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("sphere.xyz");
        spincrate_io::write_point_cloud(&fibonacci_sphere(400), &input).unwrap();

        let mut config = test_config();
        config.camera = [0.0, 0.0, 10.0];
        let cloud = load_oriented_cloud(&input, &config).unwrap();
        assert_eq!(cloud.len(), 400);
        for p in cloud.iter() {
            assert!(p.normal.dot(&(config.camera_location() - p.position)) >= 0.0);
        }
    }

    #[test]
    fn test_stored_normals_are_kept() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("tilted.pcd");
        // odd points face away from the default camera at (0, 1, 0)
        let cloud: NormalPointCloud3f = (0..10)
            .map(|i| {
                let normal = if i % 2 == 0 { Vector3f::y() } else { -Vector3f::y() };
                NormalPoint3f::new(Point3f::new(i as f32, 0.0, 0.0), normal)
            })
            .collect();
        spincrate_io::write_normal_point_cloud(&cloud, &input).unwrap();

        let loaded = load_oriented_cloud(&input, &test_config()).unwrap();
        assert_eq!(loaded.positions(), cloud.positions());
        assert!(loaded.iter().all(|p| p.normal == Vector3f::y()));

        let mut config = test_config();
        config.use_file_normals = false;
        config.normals.radius = 1.5;
        let estimated = load_oriented_cloud(&input, &config).unwrap();
        // fitted normals of collinear points are perpendicular to the line
        assert!(estimated.iter().all(|p| p.normal.x.abs() < 1e-3));
    }

    #[test]
    fn test_compare_identical_and_invalid_indices() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("sphere.xyz");
        spincrate_io::write_point_cloud(&fibonacci_sphere(400), &input).unwrap();

        let config = test_config();
        let same = compare(&input, 150, 150, &config).unwrap();
        assert!((same - 1.0).abs() < 1e-5, "self correlation {}", same);

        let other = compare(&input, 150, 250, &config).unwrap();
        assert!((-1.0..=1.0).contains(&other));

        assert!(compare(&input, 0, 400, &config).is_err());
        assert!(compare(&dir.path().join("absent.xyz"), 0, 1, &config).is_err());
    }

    #[test]
    fn test_run_writes_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("sphere.xyz");
        spincrate_io::write_point_cloud(&fibonacci_sphere(600), &input).unwrap();

        let config = test_config();
        let cloud = load_oriented_cloud(&input, &config).unwrap();
        let output = dir.path().join("out");
        let summaries = run_chunks(&cloud, &config, &output).unwrap();

        assert_eq!(summaries.len(), 2);
        for summary in &summaries {
            assert_eq!(summary.points, 300);
            assert!(summary.spin_image.total_weight() >= 1.0 - 1e-4);
            assert!(summary.csv_path.exists());
            assert!(summary.png_path.exists());
            let back = spincrate_io::read_spin_image_csv(&summary.csv_path, config.spin_image.bin_size).unwrap();
            assert_eq!(back.resolution(), 20);
        }
        assert!(output.join("figure.png").exists());
    }

    #[test]
    fn test_out_of_range_chunks_fail() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("sphere.xyz");
        spincrate_io::write_point_cloud(&fibonacci_sphere(100), &input).unwrap();

        // default ranges reach index 8000
        let mut config = test_config();
        config.chunks = ChunkSpec::default();
        let cloud = load_oriented_cloud(&input, &config).unwrap();
        assert!(run_chunks(&cloud, &config, &dir.path().join("out")).is_err());
    }
}
