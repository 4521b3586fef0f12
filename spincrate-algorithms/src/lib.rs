//! # spincrate Algorithms
//!
//! Algorithms behind the spin image pipeline.
//!
//! This crate provides neighbour search, normal estimation and orientation,
//! chunking of point clouds, spin image generation and matching, and the
//! principal component projection used for chunk overviews.

pub mod nearest_neighbor;
pub mod normals;
pub mod chunking;
pub mod spin_image;
pub mod projection;

// Re-export commonly used items
pub use nearest_neighbor::*;
pub use normals::*;
pub use chunking::*;
pub use spin_image::*;
pub use projection::*;
