//! Core data structures and traits for spincrate
//! 
//! This crate provides the fundamental types shared by the spin image pipeline:
//! points, point clouds, oriented points, the spin image grid and its
//! parameters, and the common error type.

pub mod point;
pub mod point_cloud;
pub mod spin_image;
pub mod traits;
pub mod error;

pub use point::*;
pub use point_cloud::*;
pub use spin_image::*;
pub use traits::*;
pub use error::*;

/// Re-export commonly used types from nalgebra
pub use nalgebra::{Point3, Vector3, Matrix3};
