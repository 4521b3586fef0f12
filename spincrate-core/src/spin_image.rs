//! Spin image data types
//!
//! A spin image is a 2D accumulator indexed by the cylindrical coordinates
//! (α, β) of surface points relative to an oriented point: α is the radial
//! distance from the line through the point along its normal, β the signed
//! elevation along the normal. Rows index β (positive elevation towards row 0),
//! columns index α.

use crate::error::{Error, Result};
use crate::point::{NormalPoint3f, Point3f, Vector3f};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// A surface position with its unit normal, the basis of a spin image
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrientedPoint {
    pub position: Point3f,
    pub normal: Vector3f,
}

impl OrientedPoint {
    /// Create an oriented point, normalising the normal.
    ///
    /// A zero-length or non-finite normal is rejected.
    pub fn new(position: Point3f, normal: Vector3f) -> Result<Self> {
        let length = normal.norm();
        if !length.is_finite() || length < 1e-8 {
            return Err(Error::InvalidData(format!(
                "oriented point at {:?} has a degenerate normal {:?}",
                position, normal
            )));
        }
        Ok(Self {
            position,
            normal: normal / length,
        })
    }

    /// Cylindrical coordinates (α, β) of `point` in this point's frame.
    pub fn spin_coordinates(&self, point: &Point3f) -> (f32, f32) {
        let d = point - self.position;
        let beta = self.normal.dot(&d);
        // Rounding can push |d|² - β² slightly below zero for points on the normal line
        let alpha = (d.norm_squared() - beta * beta).max(0.0).sqrt();
        (alpha, beta)
    }
}

impl TryFrom<NormalPoint3f> for OrientedPoint {
    type Error = Error;

    fn try_from(point: NormalPoint3f) -> Result<Self> {
        Self::new(point.position, point.normal)
    }
}

/// Parameters controlling spin image generation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpinImageParams {
    /// Edge length of one bin in world units
    pub bin_size: f32,
    /// Number of bins along each axis
    pub resolution: usize,
    /// Maximum angle in degrees between the oriented point's normal and a
    /// contributing point's normal
    pub support_angle_deg: f32,
    /// Maximum Euclidean distance of a contributing point, unlimited when `None`
    pub support_radius: Option<f32>,
}

impl Default for SpinImageParams {
    fn default() -> Self {
        Self {
            bin_size: 0.007,
            resolution: 80,
            support_angle_deg: 140.0,
            support_radius: None,
        }
    }
}

impl SpinImageParams {
    /// Check that the parameters describe a usable image.
    pub fn validate(&self) -> Result<()> {
        if !(self.bin_size.is_finite() && self.bin_size > 0.0) {
            return Err(Error::InvalidData(format!(
                "bin_size must be positive, got {}",
                self.bin_size
            )));
        }
        if self.resolution < 2 {
            return Err(Error::InvalidData(format!(
                "resolution must be at least 2, got {}",
                self.resolution
            )));
        }
        if !(self.support_angle_deg > 0.0 && self.support_angle_deg <= 180.0) {
            return Err(Error::InvalidData(format!(
                "support_angle_deg must be in (0, 180], got {}",
                self.support_angle_deg
            )));
        }
        if let Some(radius) = self.support_radius {
            if !(radius.is_finite() && radius > 0.0) {
                return Err(Error::InvalidData(format!(
                    "support_radius must be positive, got {}",
                    radius
                )));
            }
        }
        Ok(())
    }

    /// Cosine of the support angle; normals with a smaller dot product are rejected.
    pub fn cos_support_angle(&self) -> f32 {
        self.support_angle_deg.to_radians().cos()
    }

    /// Width of the image in world units along α.
    pub fn image_width(&self) -> f32 {
        self.bin_size * self.resolution as f32
    }
}

/// A square spin image accumulator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpinImage {
    /// Bin weights, `data[[i, j]]` with `i` the β row and `j` the α column
    pub data: Array2<f32>,
    /// Bin size the image was built with
    pub bin_size: f32,
}

impl SpinImage {
    /// Create an empty image for the given parameters.
    pub fn zeros(params: &SpinImageParams) -> Self {
        Self {
            data: Array2::zeros((params.resolution, params.resolution)),
            bin_size: params.bin_size,
        }
    }

    /// Number of bins along each axis
    pub fn resolution(&self) -> usize {
        self.data.nrows()
    }

    /// Sum of all bin weights
    pub fn total_weight(&self) -> f32 {
        self.data.sum()
    }

    /// Largest bin weight, zero for an empty image
    pub fn max_value(&self) -> f32 {
        self.data.iter().copied().fold(0.0, f32::max)
    }

    /// Number of bins with non-zero weight
    pub fn occupied_bins(&self) -> usize {
        self.data.iter().filter(|&&v| v != 0.0).count()
    }

    /// Copy of the image scaled so the largest bin is 1.
    pub fn normalized(&self) -> Self {
        let max = self.max_value();
        let data = if max > 0.0 {
            self.data.mapv(|v| v / max)
        } else {
            self.data.clone()
        };
        Self {
            data,
            bin_size: self.bin_size,
        }
    }
}
