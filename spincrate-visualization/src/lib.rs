//! Visualization for spin images and point cloud chunks
//!
//! This crate renders to plain RGB rasters with the `image` crate:
//! - Colour maps for scalar fields
//! - Spin image and 2D scatter rasterisation
//! - The multi-row chunk overview figure

pub mod colormap;
pub mod render;
pub mod figure;

pub use colormap::*;
pub use render::*;
pub use figure::*;
