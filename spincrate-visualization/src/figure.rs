//! Multi-panel chunk overview figure
//!
//! Each chunk gets one row of three panels:
//!
//! 1. the chunk seen from above (x, y), coloured by height
//! 2. the chunk projected onto its two principal components
//! 3. the spin image of the chunk's oriented point

use crate::colormap::Colormap;
use crate::render::{render_scatter, render_spin_image, ScatterStyle};
use image::{imageops, Rgb, RgbImage};
use log::{debug, info};
use spincrate_algorithms::pca_project_2d;
use spincrate_core::{Bounded, Error, Point3f, PointCloud, Result, SpinImage};
use std::path::Path;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);

struct FigureRow {
    cloud: PointCloud<Point3f>,
    spin_image: SpinImage,
}

/// Grid of chunk panels rendered into a single image
pub struct ChunkFigure {
    rows: Vec<FigureRow>,
    panel_size: u32,
    spacing: u32,
}

impl Default for ChunkFigure {
    fn default() -> Self {
        Self::new(320)
    }
}

impl ChunkFigure {
    /// Empty figure with square panels of `panel_size` pixels
    pub fn new(panel_size: u32) -> Self {
        Self {
            rows: Vec::new(),
            panel_size,
            spacing: 8,
        }
    }

    /// Append a chunk row
    pub fn add_row(&mut self, chunk: &[Point3f], spin_image: SpinImage) {
        self.rows.push(FigureRow {
            cloud: PointCloud::from_points(chunk.to_vec()),
            spin_image,
        });
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Pixel size of the rendered figure
    pub fn dimensions(&self) -> (u32, u32) {
        let rows = self.rows.len() as u32;
        let width = 3 * self.panel_size + 4 * self.spacing;
        let height = rows * self.panel_size + (rows + 1) * self.spacing;
        (width, height)
    }

    pub fn render(&self) -> Result<RgbImage> {
        if self.rows.is_empty() {
            return Err(Error::InvalidData("figure has no rows".to_string()));
        }
        if self.panel_size == 0 {
            return Err(Error::InvalidData("figure panel size must be positive".to_string()));
        }

        let (width, height) = self.dimensions();
        let mut canvas = RgbImage::from_pixel(width, height, BACKGROUND);
        let style = ScatterStyle {
            width: self.panel_size,
            height: self.panel_size,
            margin: (self.panel_size / 24).max(1),
            point_radius: 1,
            colormap: Colormap::Viridis,
        };

        for (k, row) in self.rows.iter().enumerate() {
            let y = (self.spacing + k as u32 * (self.panel_size + self.spacing)) as i64;
            let x = |column: u32| (self.spacing + column * (self.panel_size + self.spacing)) as i64;

            let top_view = self.render_top_view(&row.cloud, &style)?;
            imageops::replace(&mut canvas, &top_view, x(0), y);

            let projected = pca_project_2d(&row.cloud.points)?;
            let pca_view = render_scatter(&projected, None, &style)?;
            imageops::replace(&mut canvas, &pca_view, x(1), y);

            let spin_view = self.render_spin_panel(&row.spin_image)?;
            imageops::replace(&mut canvas, &spin_view, x(2), y);

            debug!("rendered figure row {} ({} points)", k, row.cloud.len());
        }

        Ok(canvas)
    }

    /// Render and write the figure; the format follows the file extension.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let canvas = self.render()?;
        canvas.save(path).map_err(|e| Error::Image(e.to_string()))?;
        info!("wrote figure with {} rows to {}", self.rows.len(), path.display());
        Ok(())
    }

    fn render_top_view(&self, cloud: &PointCloud<Point3f>, style: &ScatterStyle) -> Result<RgbImage> {
        let xy: Vec<[f32; 2]> = cloud.iter().map(|p| [p.x, p.y]).collect();
        let (min, max) = cloud.bounding_box();
        let extent = max.z - min.z;
        let heights: Vec<f32> = cloud
            .iter()
            .map(|p| if extent > 0.0 { (p.z - min.z) / extent } else { 0.5 })
            .collect();
        render_scatter(&xy, Some(heights.as_slice()), style)
    }

    fn render_spin_panel(&self, spin_image: &SpinImage) -> Result<RgbImage> {
        let resolution = spin_image.resolution().max(1) as u32;
        let scale = (self.panel_size / resolution).max(1);
        let rendered = render_spin_image(spin_image, Colormap::Jet, scale)?;

        // centre inside the panel; oversized images are cropped by replace
        let mut panel = RgbImage::from_pixel(self.panel_size, self.panel_size, BACKGROUND);
        let dx = (self.panel_size as i64 - rendered.width() as i64) / 2;
        let dy = (self.panel_size as i64 - rendered.height() as i64) / 2;
        imageops::replace(&mut panel, &rendered, dx, dy);
        Ok(panel)
    }
}
