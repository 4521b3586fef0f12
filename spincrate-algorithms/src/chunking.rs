//! Splitting a point cloud into index chunks and picking their oriented points

use serde::{Deserialize, Serialize};
use spincrate_core::{Error, NormalPointCloud3f, OrientedPoint, Result, Vector3f};
use std::ops::Range;

/// How to split a cloud into chunks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkSpec {
    /// `n` contiguous chunks of near-equal size
    Count(usize),
    /// Explicit half-open index ranges
    Ranges(Vec<Range<usize>>),
}

impl Default for ChunkSpec {
    fn default() -> Self {
        ChunkSpec::Ranges(vec![0..2500, 2500..5000, 5000..8000])
    }
}

impl ChunkSpec {
    /// Resolve to index lists for a cloud of `len` points.
    pub fn resolve(&self, len: usize) -> Result<Vec<Vec<usize>>> {
        match self {
            ChunkSpec::Count(count) => {
                let ranges = split_even(len, *count)?;
                Ok(ranges.into_iter().map(|r| r.collect()).collect())
            }
            ChunkSpec::Ranges(ranges) => {
                if ranges.is_empty() {
                    return Err(Error::InvalidData("no chunk ranges given".to_string()));
                }
                ranges
                    .iter()
                    .map(|range| {
                        if range.is_empty() {
                            return Err(Error::InvalidData(format!(
                                "chunk range {}..{} is empty",
                                range.start, range.end
                            )));
                        }
                        if range.end > len {
                            return Err(Error::InvalidData(format!(
                                "chunk range {}..{} exceeds cloud of {} points",
                                range.start, range.end, len
                            )));
                        }
                        Ok(range.clone().collect())
                    })
                    .collect()
            }
        }
    }
}

/// Split `0..len` into `count` contiguous ranges whose sizes differ by at most one.
pub fn split_even(len: usize, count: usize) -> Result<Vec<Range<usize>>> {
    if count == 0 {
        return Err(Error::InvalidData("chunk count must be positive".to_string()));
    }
    if count > len {
        return Err(Error::InvalidData(format!(
            "cannot split {} points into {} non-empty chunks",
            len, count
        )));
    }

    let base = len / count;
    let extra = len % count;
    let mut start = 0;
    Ok((0..count)
        .map(|k| {
            let size = base + usize::from(k < extra);
            let range = start..start + size;
            start += size;
            range
        })
        .collect())
}

/// Parse ranges written as `a..b` (or `a-b`), separated by commas.
pub fn parse_ranges(text: &str) -> Result<Vec<Range<usize>>> {
    text.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            let (start, end) = part
                .split_once("..")
                .or_else(|| part.split_once('-'))
                .ok_or_else(|| Error::InvalidData(format!("invalid range '{}', expected a..b", part)))?;
            let parse = |s: &str| {
                s.trim()
                    .parse::<usize>()
                    .map_err(|_| Error::InvalidData(format!("invalid range bound '{}' in '{}'", s, part)))
            };
            Ok(parse(start)?..parse(end)?)
        })
        .collect()
}

/// How to choose the oriented point of a chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrientedPointSelector {
    /// The point at this index within the chunk
    Index(usize),
    /// The chunk point closest to the chunk centroid
    Centroid,
}

impl Default for OrientedPointSelector {
    fn default() -> Self {
        OrientedPointSelector::Index(500)
    }
}

impl OrientedPointSelector {
    /// Index within `chunk` of the selected point.
    pub fn select_index(&self, chunk: &NormalPointCloud3f) -> Result<usize> {
        if chunk.is_empty() {
            return Err(Error::InvalidData("cannot select an oriented point from an empty chunk".to_string()));
        }
        match *self {
            OrientedPointSelector::Index(idx) if idx < chunk.len() => Ok(idx),
            OrientedPointSelector::Index(idx) => Err(Error::InvalidData(format!(
                "oriented point index {} out of range for chunk of {} points",
                idx,
                chunk.len()
            ))),
            OrientedPointSelector::Centroid => {
                let centroid = chunk
                    .iter()
                    .fold(Vector3f::zeros(), |acc, p| acc + p.position.coords)
                    / chunk.len() as f32;
                chunk
                    .iter()
                    .enumerate()
                    .min_by(|a, b| {
                        let da = (a.1.position.coords - centroid).norm_squared();
                        let db = (b.1.position.coords - centroid).norm_squared();
                        da.total_cmp(&db)
                    })
                    .map(|(idx, _)| idx)
                    .ok_or_else(|| Error::Algorithm("centroid selection found no point".to_string()))
            }
        }
    }

    /// The selected oriented point of `chunk`.
    pub fn select(&self, chunk: &NormalPointCloud3f) -> Result<OrientedPoint> {
        let idx = self.select_index(chunk)?;
        OrientedPoint::try_from(chunk[idx])
    }
}
