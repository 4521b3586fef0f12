//! Nearest neighbor search implementations

use kiddo::float::distance::SquaredEuclidean;
use kiddo::immutable::float::kdtree::ImmutableKdTree;
use spincrate_core::{Error, NearestNeighborSearch, Point3f, Result};
use std::num::NonZero;

/// KD-Tree for nearest neighbor search over a fixed set of points
///
/// Built once on kiddo's cache-friendly `ImmutableKdTree`; stored items are
/// indices into the slice the tree was built from.
pub struct KdTree {
    tree: ImmutableKdTree<f32, u32, 3, 32>,
    len: usize,
}

impl KdTree {
    pub fn new(points: &[Point3f]) -> Result<Self> {
        if points.len() > u32::MAX as usize {
            return Err(Error::Unsupported(format!(
                "KD-tree supports at most {} points, got {}",
                u32::MAX,
                points.len()
            )));
        }
        if points.iter().any(|p| !p.coords.iter().all(|v| v.is_finite())) {
            return Err(Error::InvalidData(
                "KD-tree input contains non-finite coordinates".to_string(),
            ));
        }

        let coords: Vec<[f32; 3]> = points.iter().map(|p| [p.x, p.y, p.z]).collect();
        Ok(Self {
            tree: ImmutableKdTree::new_from_slice(&coords),
            len: points.len(),
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Hybrid search: the `max_nn` nearest points that also lie within `radius`.
    ///
    /// Results are sorted by ascending distance.
    pub fn find_hybrid(&self, query: &Point3f, radius: f32, max_nn: usize) -> Vec<(usize, f32)> {
        let mut neighbors = self.find_k_nearest(query, max_nn);
        neighbors.retain(|&(_, distance)| distance <= radius);
        neighbors
    }
}

fn is_finite_query(query: &Point3f) -> bool {
    query.coords.iter().all(|v| v.is_finite())
}

impl NearestNeighborSearch for KdTree {
    fn find_k_nearest(&self, query: &Point3f, k: usize) -> Vec<(usize, f32)> {
        let Some(k) = NonZero::new(k) else {
            return Vec::new();
        };
        if self.is_empty() || !is_finite_query(query) {
            return Vec::new();
        }

        self.tree
            .nearest_n::<SquaredEuclidean>(&[query.x, query.y, query.z], k)
            .into_iter()
            .map(|nn| (nn.item as usize, nn.distance.sqrt()))
            .collect()
    }

    fn find_radius_neighbors(&self, query: &Point3f, radius: f32) -> Vec<(usize, f32)> {
        if self.is_empty() || !radius.is_finite() || radius <= 0.0 || !is_finite_query(query) {
            return Vec::new();
        }

        let radius_squared = radius * radius;
        // within_unsorted is strict, widen slightly then filter with <=
        let query_radius = radius_squared + f32::EPSILON * radius_squared.max(1.0);

        let mut neighbors: Vec<(usize, f32)> = self.tree
            .within_unsorted::<SquaredEuclidean>(&[query.x, query.y, query.z], query_radius)
            .into_iter()
            .filter(|nn| nn.distance <= radius_squared)
            .map(|nn| (nn.item as usize, nn.distance.sqrt()))
            .collect();
        neighbors.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        neighbors
    }
}

/// Simple brute force nearest neighbor search for small datasets
pub struct BruteForceSearch {
    points: Vec<Point3f>,
}

impl BruteForceSearch {
    pub fn new(points: &[Point3f]) -> Self {
        Self {
            points: points.to_vec(),
        }
    }
}

impl NearestNeighborSearch for BruteForceSearch {
    fn find_k_nearest(&self, query: &Point3f, k: usize) -> Vec<(usize, f32)> {
        let mut distances: Vec<(usize, f32)> = self.points
            .iter()
            .enumerate()
            .map(|(idx, point)| (idx, (point - query).norm()))
            .collect();

        distances.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        distances.truncate(k);
        distances
    }

    fn find_radius_neighbors(&self, query: &Point3f, radius: f32) -> Vec<(usize, f32)> {
        let radius_squared = radius * radius;
        let mut neighbors: Vec<(usize, f32)> = self.points
            .iter()
            .enumerate()
            .filter_map(|(idx, point)| {
                let distance_squared = (point - query).norm_squared();
                if distance_squared <= radius_squared {
                    Some((idx, distance_squared.sqrt()))
                } else {
                    None
                }
            })
            .collect();
        neighbors.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        neighbors
    }
}
