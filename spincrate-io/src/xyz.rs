//! XYZ text point cloud support
//!
//! One point per line: `x y z` optionally followed by `nx ny nz`. Values may
//! be separated by spaces, tabs, commas or semicolons. A first line naming
//! the columns (e.g. `x,y,z,nx,ny,nz`) is accepted and used to locate them;
//! lines starting with `#` or `//` are comments.

use crate::error::IoError;
use crate::{PointCloudReader, PointCloudWriter, PointData};
use log::debug;
use spincrate_core::{NormalPointCloud3f, Point3f, PointCloud, Result, Vector3f};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Supported delimiters for XYZ files
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    Comma,
    Whitespace,
    Semicolon,
}

impl Delimiter {
    /// Detect delimiter from a line of text
    pub fn detect_from_line(line: &str) -> Self {
        if line.contains(',') {
            Delimiter::Comma
        } else if line.contains(';') {
            Delimiter::Semicolon
        } else {
            Delimiter::Whitespace
        }
    }

    fn split<'a>(&self, line: &'a str) -> Vec<&'a str> {
        match self {
            Delimiter::Comma => line.split(',').map(str::trim).collect(),
            Delimiter::Semicolon => line.split(';').map(str::trim).collect(),
            Delimiter::Whitespace => line.split_whitespace().collect(),
        }
    }
}

/// Column positions of the coordinates and optional normals
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Columns {
    position: [usize; 3],
    normal: Option<[usize; 3]>,
}

impl Columns {
    fn positional(width: usize) -> Self {
        Self {
            position: [0, 1, 2],
            normal: (width >= 6).then_some([3, 4, 5]),
        }
    }

    fn from_header(names: &[&str]) -> Option<Self> {
        let find = |aliases: &[&str]| {
            names
                .iter()
                .position(|name| aliases.contains(&name.to_lowercase().as_str()))
        };
        let position = [find(&["x", "px"])?, find(&["y", "py"])?, find(&["z", "pz"])?];
        let normal = match (
            find(&["nx", "normal_x"]),
            find(&["ny", "normal_y"]),
            find(&["nz", "normal_z"]),
        ) {
            (Some(x), Some(y), Some(z)) => Some([x, y, z]),
            _ => None,
        };
        Some(Self { position, normal })
    }
}

/// Positions and optional normals read from an XYZ file
#[derive(Debug, Clone, Default)]
pub struct XyzData {
    pub positions: Vec<Point3f>,
    pub normals: Option<Vec<Vector3f>>,
}

impl XyzData {
    /// Positions paired with normals, `None` when the file carries no normals.
    pub fn into_normal_point_cloud(self) -> Result<Option<NormalPointCloud3f>> {
        PointData::from(self).into_normal_point_cloud()
    }
}

/// XYZ reader
pub struct XyzReader;

impl XyzReader {
    pub fn read_xyz_file<P: AsRef<Path>>(path: P) -> Result<XyzData> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let data = Self::read_xyz_data(BufReader::new(file))?;
        debug!("read {} points from {}", data.positions.len(), path.display());
        Ok(data)
    }

    pub fn read_xyz_data<R: BufRead>(reader: R) -> Result<XyzData> {
        let mut layout: Option<(Delimiter, Columns)> = None;
        let mut data = XyzData::default();

        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with("//") {
                continue;
            }

            let (delimiter, columns) = match layout {
                Some(layout) => layout,
                None => {
                    let delimiter = Delimiter::detect_from_line(trimmed);
                    let parts = delimiter.split(trimmed);
                    if parts.iter().any(|p| p.parse::<f32>().is_err()) {
                        let columns = Columns::from_header(&parts).ok_or_else(|| IoError::ParseError {
                            message: format!("line {}: header does not name x, y and z columns", line_no + 1),
                        })?;
                        data.normals = columns.normal.map(|_| Vec::new());
                        layout = Some((delimiter, columns));
                        continue;
                    }
                    let columns = Columns::positional(parts.len());
                    data.normals = columns.normal.map(|_| Vec::new());
                    layout = Some((delimiter, columns));
                    (delimiter, columns)
                }
            };

            let parts = delimiter.split(trimmed);
            let value = |idx: usize| -> Result<f32> {
                let text = parts.get(idx).ok_or_else(|| IoError::ParseError {
                    message: format!("line {}: expected at least {} values, found {}", line_no + 1, idx + 1, parts.len()),
                })?;
                text.parse::<f32>().map_err(|_| {
                    IoError::ParseError {
                        message: format!("line {}: invalid number '{}'", line_no + 1, text),
                    }
                    .into()
                })
            };

            let [xi, yi, zi] = columns.position;
            data.positions.push(Point3f::new(value(xi)?, value(yi)?, value(zi)?));
            if let (Some([nx, ny, nz]), Some(normals)) = (columns.normal, data.normals.as_mut()) {
                normals.push(Vector3f::new(value(nx)?, value(ny)?, value(nz)?));
            }
        }

        Ok(data)
    }
}

/// XYZ writer, space separated without header
pub struct XyzWriter;

impl XyzWriter {
    pub fn write_xyz_data<W: Write>(writer: &mut W, positions: &[Point3f], normals: Option<&[Vector3f]>) -> Result<()> {
        if let Some(normals) = normals {
            if normals.len() != positions.len() {
                return Err(IoError::WriteError {
                    message: format!("{} positions but {} normals", positions.len(), normals.len()),
                }
                .into());
            }
        }

        for (i, p) in positions.iter().enumerate() {
            write!(writer, "{} {} {}", p.x, p.y, p.z)?;
            if let Some(normals) = normals {
                let n = normals[i];
                write!(writer, " {} {} {}", n.x, n.y, n.z)?;
            }
            writeln!(writer)?;
        }
        Ok(())
    }

    pub fn write_xyz_file<P: AsRef<Path>>(path: P, positions: &[Point3f], normals: Option<&[Vector3f]>) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        Self::write_xyz_data(&mut writer, positions, normals)?;
        writer.flush()?;
        Ok(())
    }
}

impl PointCloudReader for XyzReader {
    fn read_point_cloud<P: AsRef<Path>>(path: P) -> Result<PointCloud<Point3f>> {
        Ok(PointCloud::from_points(Self::read_xyz_file(path)?.positions))
    }
}

impl PointCloudWriter for XyzWriter {
    fn write_point_cloud<P: AsRef<Path>>(cloud: &PointCloud<Point3f>, path: P) -> Result<()> {
        Self::write_xyz_file(path, &cloud.points, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_plain_xyz() {
        let text = "# scan\n0 0 0\n1.5 2 -3\n\n";
        let data = XyzReader::read_xyz_data(Cursor::new(text)).unwrap();
        assert_eq!(data.positions, vec![Point3f::origin(), Point3f::new(1.5, 2.0, -3.0)]);
        assert!(data.normals.is_none());
    }

    #[test]
    fn test_positional_normals() {
        let text = "0\t0\t0\t0\t0\t1\n1\t0\t0\t0\t1\t0\n";
        let data = XyzReader::read_xyz_data(Cursor::new(text)).unwrap();
        assert_eq!(data.normals.unwrap(), vec![Vector3f::z(), Vector3f::y()]);
    }

    #[test]
    fn test_header_with_reordered_columns() {
        let text = "nx,ny,nz,intensity,x,y,z\n0,0,1,7,1,2,3\n";
        let data = XyzReader::read_xyz_data(Cursor::new(text)).unwrap();
        assert_eq!(data.positions, vec![Point3f::new(1.0, 2.0, 3.0)]);
        assert_eq!(data.normals.unwrap(), vec![Vector3f::z()]);
    }

    #[test]
    fn test_invalid_lines() {
        assert!(XyzReader::read_xyz_data(Cursor::new("a,b,c\n1,2,3\n")).is_err());
        assert!(XyzReader::read_xyz_data(Cursor::new("1 2 3\n4 5\n")).is_err());
        assert!(XyzReader::read_xyz_data(Cursor::new("x y z\n1 2 q\n")).is_err());
    }

    #[test]
    fn test_write_then_read() {
        let positions = vec![Point3f::new(0.5, -1.0, 2.0)];
        let normals = vec![Vector3f::x()];
        let mut buffer = Vec::new();
        XyzWriter::write_xyz_data(&mut buffer, &positions, Some(normals.as_slice())).unwrap();
        assert_eq!(String::from_utf8(buffer.clone()).unwrap(), "0.5 -1 2 1 0 0\n");

        let cloud = XyzReader::read_xyz_data(Cursor::new(buffer))
            .unwrap()
            .into_normal_point_cloud()
            .unwrap()
            .unwrap();
        assert_eq!(cloud.positions(), positions);
        assert_eq!(cloud.normals(), normals);
    }
}
