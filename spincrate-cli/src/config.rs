use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use spincrate_algorithms::{ChunkSpec, NormalEstimationParams, OrientedPointSelector};
use spincrate_core::{Point3f, SpinImageParams};
use std::fs;
use std::path::Path;

/// Settings for a pipeline run, loadable from JSON
///
/// Every field has a default, so a config file only needs the values it
/// changes. Command line flags are applied on top.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub spin_image: SpinImageParams,
    pub normals: NormalEstimationParams,
    pub chunks: ChunkSpec,
    pub oriented_point: OrientedPointSelector,
    /// Normals are flipped to face this location
    pub camera: [f32; 3],
    /// Use normals stored in the input file instead of estimating them
    pub use_file_normals: bool,
    /// Pixels per spin image bin in the per-chunk PNGs
    pub render_scale: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            spin_image: SpinImageParams::default(),
            normals: NormalEstimationParams::default(),
            chunks: ChunkSpec::default(),
            oriented_point: OrientedPointSelector::default(),
            camera: [0.0, 1.0, 0.0],
            use_file_normals: true,
            render_scale: 4,
        }
    }
}

impl PipelineConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: PipelineConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.spin_image.validate().context("Invalid spin image parameters")?;
        self.normals.validate().context("Invalid normal estimation parameters")?;
        if self.camera.iter().any(|c| !c.is_finite()) {
            anyhow::bail!("Camera location must be finite, got {:?}", self.camera);
        }
        if self.render_scale == 0 {
            anyhow::bail!("Render scale must be positive");
        }
        Ok(())
    }

    pub fn camera_location(&self) -> Point3f {
        Point3f::new(self.camera[0], self.camera[1], self.camera[2])
    }
}
