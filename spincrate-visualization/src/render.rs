//! Rasterisation of spin images and 2D scatter plots

use crate::colormap::Colormap;
use image::{Rgb, RgbImage};
use log::debug;
use spincrate_core::{Error, Result, SpinImage};
use std::path::Path;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);

/// Render a spin image, one `scale × scale` block per bin
///
/// Bin weights are normalised by the image maximum; an empty image renders
/// as the colour map's low end.
pub fn render_spin_image(image: &SpinImage, colormap: Colormap, scale: u32) -> Result<RgbImage> {
    if scale == 0 {
        return Err(Error::InvalidData("render scale must be positive".to_string()));
    }

    let (rows, cols) = image.data.dim();
    let normalized = image.normalized();
    let mut out = RgbImage::new(cols as u32 * scale, rows as u32 * scale);
    for (x, y, pixel) in out.enumerate_pixels_mut() {
        let value = normalized.data[[(y / scale) as usize, (x / scale) as usize]];
        *pixel = Rgb(colormap.map(value));
    }
    Ok(out)
}

/// Render a spin image and write it; the format follows the file extension.
pub fn save_spin_image<P: AsRef<Path>>(image: &SpinImage, colormap: Colormap, scale: u32, path: P) -> Result<()> {
    let path = path.as_ref();
    render_spin_image(image, colormap, scale)?
        .save(path)
        .map_err(|e| Error::Image(e.to_string()))?;
    debug!("wrote {}x{} spin image to {}", image.resolution(), image.resolution(), path.display());
    Ok(())
}

/// Options for [`render_scatter`]
#[derive(Debug, Clone, Copy)]
pub struct ScatterStyle {
    pub width: u32,
    pub height: u32,
    /// Empty border in pixels
    pub margin: u32,
    /// Half edge length of the square drawn per point
    pub point_radius: u32,
    pub colormap: Colormap,
}

impl Default for ScatterStyle {
    fn default() -> Self {
        Self {
            width: 320,
            height: 320,
            margin: 12,
            point_radius: 1,
            colormap: Colormap::Viridis,
        }
    }
}

/// Render 2D points into a panel, keeping the aspect ratio
///
/// With `values`, each point is coloured through the style's colour map after
/// min-max normalisation; without, points are drawn black. Points are drawn
/// in order, so later points cover earlier ones.
pub fn render_scatter(points: &[[f32; 2]], values: Option<&[f32]>, style: &ScatterStyle) -> Result<RgbImage> {
    if let Some(values) = values {
        if values.len() != points.len() {
            return Err(Error::InvalidData(format!(
                "{} scatter points but {} colour values",
                points.len(),
                values.len()
            )));
        }
    }
    if style.width <= 2 * style.margin || style.height <= 2 * style.margin {
        return Err(Error::InvalidData(format!(
            "scatter panel {}x{} too small for margin {}",
            style.width, style.height, style.margin
        )));
    }

    let mut out = RgbImage::from_pixel(style.width, style.height, BACKGROUND);
    let finite: Vec<usize> = (0..points.len())
        .filter(|&i| points[i][0].is_finite() && points[i][1].is_finite())
        .collect();
    if finite.is_empty() {
        return Ok(out);
    }

    let (mut min_x, mut max_x) = (f32::INFINITY, f32::NEG_INFINITY);
    let (mut min_y, mut max_y) = (f32::INFINITY, f32::NEG_INFINITY);
    for &i in &finite {
        min_x = min_x.min(points[i][0]);
        max_x = max_x.max(points[i][0]);
        min_y = min_y.min(points[i][1]);
        max_y = max_y.max(points[i][1]);
    }

    // last drawable pixel offset on each axis
    let inner_w = (style.width - 2 * style.margin - 1) as f32;
    let inner_h = (style.height - 2 * style.margin - 1) as f32;
    let span = (max_x - min_x).max(max_y - min_y);
    let scale = if span > 0.0 { inner_w.min(inner_h) / span } else { 0.0 };
    // centre the data inside the drawable area
    let offset_x = style.margin as f32 + (inner_w - (max_x - min_x) * scale) / 2.0;
    let offset_y = style.margin as f32 + (inner_h - (max_y - min_y) * scale) / 2.0;

    let colour_range = values.map(|values| {
        let (lo, hi) = finite
            .iter()
            .map(|&i| values[i])
            .filter(|v| v.is_finite())
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
        (values, lo, hi)
    });

    for &i in &finite {
        let px = offset_x + (points[i][0] - min_x) * scale;
        // image rows grow downwards, flip y
        let py = style.height as f32 - 1.0 - (offset_y + (points[i][1] - min_y) * scale);

        let colour = match colour_range {
            Some((values, lo, hi)) => {
                let t = if hi > lo { (values[i] - lo) / (hi - lo) } else { 0.5 };
                Rgb(style.colormap.map(t))
            }
            None => Rgb([0, 0, 0]),
        };
        draw_square(&mut out, px.round() as i64, py.round() as i64, style.point_radius as i64, colour);
    }

    Ok(out)
}

fn draw_square(image: &mut RgbImage, cx: i64, cy: i64, radius: i64, colour: Rgb<u8>) {
    let (w, h) = (image.width() as i64, image.height() as i64);
    for y in (cy - radius).max(0)..=(cy + radius).min(h - 1) {
        for x in (cx - radius).max(0)..=(cx + radius).min(w - 1) {
            image.put_pixel(x as u32, y as u32, colour);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_render_spin_image_scales_bins() {
        let image = SpinImage {
            data: array![[0.0, 2.0], [1.0, 0.0]],
            bin_size: 0.1,
        };
        let out = render_spin_image(&image, Colormap::Gray, 3).unwrap();
        assert_eq!(out.dimensions(), (6, 6));
        assert_eq!(out.get_pixel(0, 0), &Rgb([0, 0, 0]));
        assert_eq!(out.get_pixel(5, 2), &Rgb([255, 255, 255]));
        assert_eq!(out.get_pixel(1, 4), &Rgb([128, 128, 128]));
        assert!(render_spin_image(&image, Colormap::Gray, 0).is_err());
    }

    #[test]
    fn test_save_spin_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spin.png");
        let spin = SpinImage {
            data: array![[0.0, 1.0], [1.0, 0.0]],
            bin_size: 0.1,
        };
        save_spin_image(&spin, Colormap::Jet, 4, &path).unwrap();
        assert_eq!(image::open(&path).unwrap().to_rgb8().dimensions(), (8, 8));

        let bad = dir.path().join("spin.unknown");
        assert!(matches!(save_spin_image(&spin, Colormap::Jet, 4, &bad), Err(Error::Image(_))));
    }

    #[test]
    fn test_scatter_draws_corners() {
        let style = ScatterStyle {
            width: 20,
            height: 20,
            margin: 2,
            point_radius: 0,
            colormap: Colormap::Gray,
        };
        let points = [[0.0, 0.0], [1.0, 1.0]];
        let out = render_scatter(&points, Some(&[0.0, 1.0]), &style).unwrap();

        // (0, 0) is bottom-left and dark, (1, 1) is top-right and light
        assert_eq!(out.get_pixel(2, 17), &Rgb([0, 0, 0]));
        assert_eq!(out.get_pixel(17, 2), &Rgb([255, 255, 255]));
        assert_eq!(out.get_pixel(10, 10), &BACKGROUND);
    }

    #[test]
    fn test_scatter_degenerate_inputs() {
        let style = ScatterStyle::default();
        let blank = render_scatter(&[], None, &style).unwrap();
        assert!(blank.pixels().all(|p| *p == BACKGROUND));

        let single = render_scatter(&[[3.0, 3.0]], None, &style).unwrap();
        assert!(single.pixels().any(|p| *p == Rgb([0, 0, 0])));

        assert!(render_scatter(&[[0.0, 0.0]], Some(&[]), &style).is_err());

        let tiny = ScatterStyle { width: 4, height: 4, margin: 2, ..style };
        assert!(render_scatter(&[[0.0, 0.0]], None, &tiny).is_err());
    }
}
