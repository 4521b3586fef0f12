//! PCD (Point Cloud Data) format support
//!
//! Reads and writes PCD v0.7 files in ASCII and binary layouts. Positions
//! come from the `x y z` fields; normals are picked up from
//! `normal_x normal_y normal_z` when present. Other fields are skipped.

use crate::error::IoError;
use crate::{PointCloudReader, PointCloudWriter, PointData};
use log::debug;
use spincrate_core::{Error, NormalPointCloud3f, Point3f, PointCloud, Result, Vector3f};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

/// PCD data format variants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PcdDataFormat {
    Ascii,
    Binary,
    BinaryCompressed,
}

/// PCD field data types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PcdFieldType {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    F32,
    F64,
}

impl PcdFieldType {
    fn from_type_and_size(type_str: &str, size: usize) -> Result<Self> {
        match (type_str, size) {
            ("I", 1) => Ok(PcdFieldType::I8),
            ("I", 2) => Ok(PcdFieldType::I16),
            ("I", 4) => Ok(PcdFieldType::I32),
            ("U", 1) => Ok(PcdFieldType::U8),
            ("U", 2) => Ok(PcdFieldType::U16),
            ("U", 4) => Ok(PcdFieldType::U32),
            ("F", 4) => Ok(PcdFieldType::F32),
            ("F", 8) => Ok(PcdFieldType::F64),
            _ => Err(IoError::InvalidFormat {
                format: format!("unknown PCD field type/size combination {}/{}", type_str, size),
            }
            .into()),
        }
    }

    /// Size in bytes of one value
    pub fn size(&self) -> usize {
        match self {
            PcdFieldType::I8 | PcdFieldType::U8 => 1,
            PcdFieldType::I16 | PcdFieldType::U16 => 2,
            PcdFieldType::I32 | PcdFieldType::U32 | PcdFieldType::F32 => 4,
            PcdFieldType::F64 => 8,
        }
    }

    fn type_char(&self) -> &'static str {
        match self {
            PcdFieldType::I8 | PcdFieldType::I16 | PcdFieldType::I32 => "I",
            PcdFieldType::U8 | PcdFieldType::U16 | PcdFieldType::U32 => "U",
            PcdFieldType::F32 | PcdFieldType::F64 => "F",
        }
    }

    fn parse_ascii(&self, text: &str) -> Option<f64> {
        match self {
            PcdFieldType::I8 => text.parse::<i8>().ok().map(f64::from),
            PcdFieldType::U8 => text.parse::<u8>().ok().map(f64::from),
            PcdFieldType::I16 => text.parse::<i16>().ok().map(f64::from),
            PcdFieldType::U16 => text.parse::<u16>().ok().map(f64::from),
            PcdFieldType::I32 => text.parse::<i32>().ok().map(f64::from),
            PcdFieldType::U32 => text.parse::<u32>().ok().map(f64::from),
            PcdFieldType::F32 => text.parse::<f32>().ok().map(f64::from),
            PcdFieldType::F64 => text.parse::<f64>().ok(),
        }
    }

    fn decode_le(&self, bytes: &[u8]) -> f64 {
        match self {
            PcdFieldType::I8 => f64::from(bytes[0] as i8),
            PcdFieldType::U8 => f64::from(bytes[0]),
            PcdFieldType::I16 => f64::from(i16::from_le_bytes([bytes[0], bytes[1]])),
            PcdFieldType::U16 => f64::from(u16::from_le_bytes([bytes[0], bytes[1]])),
            PcdFieldType::I32 => f64::from(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])),
            PcdFieldType::U32 => f64::from(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])),
            PcdFieldType::F32 => f64::from(f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])),
            PcdFieldType::F64 => f64::from_le_bytes([
                bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
            ]),
        }
    }
}

/// PCD field definition
#[derive(Debug, Clone, PartialEq)]
pub struct PcdField {
    pub name: String,
    pub field_type: PcdFieldType,
    pub count: usize,
}

/// PCD header information
#[derive(Debug, Clone)]
pub struct PcdHeader {
    pub version: String,
    pub fields: Vec<PcdField>,
    pub width: usize,
    pub height: usize,
    pub viewpoint: [f64; 7], // tx, ty, tz, qw, qx, qy, qz
    pub data_format: PcdDataFormat,
}

impl PcdHeader {
    pub fn point_count(&self) -> usize {
        self.width.saturating_mul(self.height)
    }

    /// Offset (in values, not bytes) of the first value of field `name` within a record
    fn value_offset(&self, name: &str) -> Option<usize> {
        let mut offset = 0;
        for field in &self.fields {
            if field.name == name {
                return Some(offset);
            }
            offset += field.count;
        }
        None
    }

    fn values_per_point(&self) -> usize {
        self.fields.iter().map(|f| f.count).sum()
    }

    fn has_normals(&self) -> bool {
        ["normal_x", "normal_y", "normal_z"]
            .iter()
            .all(|name| self.value_offset(name).is_some())
    }
}

/// Positions and optional normals decoded from a PCD file
#[derive(Debug, Clone)]
pub struct PcdData {
    pub header: PcdHeader,
    pub positions: Vec<Point3f>,
    pub normals: Option<Vec<Vector3f>>,
}

impl PcdData {
    pub fn into_point_cloud(self) -> PointCloud<Point3f> {
        PointCloud::from_points(self.positions)
    }

    /// Positions paired with normals, `None` when the file carries no normals.
    pub fn into_normal_point_cloud(self) -> Result<Option<NormalPointCloud3f>> {
        PointData::from(self).into_normal_point_cloud()
    }
}

/// PCD reader supporting ASCII and binary data sections
pub struct PcdReader;

impl PcdReader {
    /// Read a PCD file
    pub fn read_pcd_file<P: AsRef<Path>>(path: P) -> Result<PcdData> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::from(IoError::FileNotFound {
                path: path.display().to_string(),
            }),
            _ => Error::Io(e),
        })?;
        let mut reader = BufReader::new(file);
        let data = Self::read_pcd_data(&mut reader)?;
        debug!(
            "read {} points from {} ({:?}, normals: {})",
            data.positions.len(),
            path.display(),
            data.header.data_format,
            data.normals.is_some()
        );
        Ok(data)
    }

    /// Read PCD data from a reader
    pub fn read_pcd_data<R: BufRead>(reader: &mut R) -> Result<PcdData> {
        let header = Self::read_header(reader)?;
        let records = match header.data_format {
            PcdDataFormat::Ascii => Self::read_ascii_records(reader, &header)?,
            PcdDataFormat::Binary => Self::read_binary_records(reader, &header)?,
            PcdDataFormat::BinaryCompressed => {
                return Err(Error::Unsupported("binary_compressed PCD data is not supported".to_string()));
            }
        };
        Self::decode(header, &records)
    }

    /// Read PCD header
    pub fn read_header<R: BufRead>(reader: &mut R) -> Result<PcdHeader> {
        let mut version = None;
        let mut names: Vec<String> = Vec::new();
        let mut sizes: Vec<usize> = Vec::new();
        let mut types: Vec<String> = Vec::new();
        let mut counts: Vec<usize> = Vec::new();
        let mut width = None;
        let mut height = None;
        let mut viewpoint = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0];
        let mut points = None;
        let mut data_format = None;

        let mut line = String::new();
        while data_format.is_none() {
            line.clear();
            if reader.read_line(&mut line)? == 0 {
                return Err(parse_error("unexpected end of file in PCD header"));
            }

            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let parts: Vec<&str> = trimmed.split_whitespace().collect();
            let values = &parts[1..];
            match parts[0] {
                "VERSION" => version = values.first().map(|v| v.to_string()),
                "FIELDS" => names = values.iter().map(|v| v.to_string()).collect(),
                "SIZE" => sizes = parse_all(values, "SIZE")?,
                "TYPE" => types = values.iter().map(|v| v.to_string()).collect(),
                "COUNT" => counts = parse_all(values, "COUNT")?,
                "WIDTH" => width = Some(parse_one(values, "WIDTH")?),
                "HEIGHT" => height = Some(parse_one(values, "HEIGHT")?),
                "POINTS" => points = Some(parse_one(values, "POINTS")?),
                "VIEWPOINT" => {
                    if values.len() != 7 {
                        return Err(parse_error("VIEWPOINT needs 7 values"));
                    }
                    for (slot, value) in viewpoint.iter_mut().zip(values) {
                        *slot = value
                            .parse::<f64>()
                            .map_err(|_| parse_error(&format!("invalid VIEWPOINT value: {}", value)))?;
                    }
                }
                "DATA" => {
                    data_format = Some(match values.first().copied() {
                        Some("ascii") => PcdDataFormat::Ascii,
                        Some("binary") => PcdDataFormat::Binary,
                        Some("binary_compressed") => PcdDataFormat::BinaryCompressed,
                        other => {
                            return Err(IoError::InvalidFormat {
                                format: format!("unknown PCD DATA section {:?}", other),
                            }
                            .into())
                        }
                    });
                }
                _ => {}
            }
        }

        let version = version.ok_or_else(|| parse_error("missing VERSION in PCD header"))?;
        let width = width.ok_or_else(|| parse_error("missing WIDTH in PCD header"))?;
        let height = height.unwrap_or(1);
        let data_format = data_format.ok_or_else(|| parse_error("missing DATA in PCD header"))?;

        if names.is_empty() {
            return Err(parse_error("missing FIELDS in PCD header"));
        }
        // COUNT is optional and defaults to one value per field
        if counts.is_empty() {
            counts = vec![1; names.len()];
        }
        if sizes.len() != names.len() || types.len() != names.len() || counts.len() != names.len() {
            return Err(parse_error("mismatch between FIELDS, SIZE, TYPE and COUNT declarations"));
        }

        let fields = names
            .into_iter()
            .zip(types.iter().zip(sizes.iter()))
            .zip(counts)
            .map(|((name, (type_str, &size)), count)| {
                Ok(PcdField {
                    name,
                    field_type: PcdFieldType::from_type_and_size(type_str, size)?,
                    count,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        if let Some(field) = fields.iter().find(|f| f.count == 0) {
            return Err(parse_error(&format!("field {} has COUNT 0", field.name)));
        }
        let record_size = fields
            .iter()
            .try_fold(0usize, |acc, f| f.field_type.size().checked_mul(f.count)?.checked_add(acc))
            .filter(|&size| size <= MAX_RECORD_BYTES)
            .ok_or_else(|| parse_error(&format!("PCD record larger than {} bytes", MAX_RECORD_BYTES)))?;
        let point_count = width
            .checked_mul(height)
            .ok_or_else(|| parse_error(&format!("WIDTH * HEIGHT overflows ({} x {})", width, height)))?;
        debug!("PCD header: {} points of {} bytes", point_count, record_size);

        if let Some(points) = points {
            if points != point_count {
                return Err(parse_error(&format!(
                    "POINTS ({}) doesn't match WIDTH * HEIGHT ({})",
                    points, point_count
                )));
            }
        }

        Ok(PcdHeader {
            version,
            fields,
            width,
            height,
            viewpoint,
            data_format,
        })
    }

    /// Each record is the flat list of all values of one point
    fn read_ascii_records<R: BufRead>(reader: &mut R, header: &PcdHeader) -> Result<Vec<Vec<f64>>> {
        let expected = header.point_count();
        let per_point = header.values_per_point();
        let mut records = Vec::with_capacity(expected.min(MAX_PREALLOCATED_POINTS));
        let mut line = String::new();

        while records.len() < expected {
            line.clear();
            if reader.read_line(&mut line)? == 0 {
                return Err(parse_error(&format!(
                    "PCD data ends after {} of {} points",
                    records.len(),
                    expected
                )));
            }
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let tokens: Vec<&str> = trimmed.split_whitespace().collect();
            if tokens.len() < per_point {
                return Err(parse_error(&format!(
                    "point {} has {} values, expected {}",
                    records.len(),
                    tokens.len(),
                    per_point
                )));
            }

            let mut record = Vec::with_capacity(per_point);
            let mut tokens = tokens.into_iter();
            for field in &header.fields {
                for _ in 0..field.count {
                    let token = tokens.next().unwrap_or_default();
                    // PCL writes nan for invalid points regardless of the field type
                    let value = if token.eq_ignore_ascii_case("nan") {
                        f64::NAN
                    } else {
                        field.field_type.parse_ascii(token).ok_or_else(|| {
                            parse_error(&format!("invalid {:?} value '{}' for field {}", field.field_type, token, field.name))
                        })?
                    };
                    record.push(value);
                }
            }
            records.push(record);
        }

        Ok(records)
    }

    fn read_binary_records<R: Read>(reader: &mut R, header: &PcdHeader) -> Result<Vec<Vec<f64>>> {
        let record_size: usize = header.fields.iter().map(|f| f.field_type.size() * f.count).sum();
        let mut buffer = vec![0u8; record_size];
        let mut records = Vec::with_capacity(header.point_count().min(MAX_PREALLOCATED_POINTS));

        for _ in 0..header.point_count() {
            reader.read_exact(&mut buffer)?;
            let mut offset = 0;
            let mut record = Vec::with_capacity(header.values_per_point());
            for field in &header.fields {
                let size = field.field_type.size();
                for _ in 0..field.count {
                    record.push(field.field_type.decode_le(&buffer[offset..offset + size]));
                    offset += size;
                }
            }
            records.push(record);
        }

        Ok(records)
    }

    /// Pull positions and normals out of the raw records, dropping points
    /// with non-finite coordinates
    fn decode(header: PcdHeader, records: &[Vec<f64>]) -> Result<PcdData> {
        let offset = |name: &str| {
            header
                .value_offset(name)
                .ok_or_else(|| parse_error(&format!("missing {} field in PCD file", name)))
        };
        let (ox, oy, oz) = (offset("x")?, offset("y")?, offset("z")?);
        let normal_offsets = if header.has_normals() {
            Some((offset("normal_x")?, offset("normal_y")?, offset("normal_z")?))
        } else {
            None
        };

        let mut positions = Vec::with_capacity(records.len());
        let mut normals = normal_offsets.map(|_| Vec::with_capacity(records.len()));
        let mut skipped = 0usize;

        for record in records {
            let position = Point3f::new(record[ox] as f32, record[oy] as f32, record[oz] as f32);
            if !position.coords.iter().all(|v| v.is_finite()) {
                skipped += 1;
                continue;
            }
            positions.push(position);
            if let (Some(normals), Some((nx, ny, nz))) = (normals.as_mut(), normal_offsets) {
                normals.push(Vector3f::new(record[nx] as f32, record[ny] as f32, record[nz] as f32));
            }
        }

        if skipped > 0 {
            debug!("skipped {} PCD points with non-finite coordinates", skipped);
        }

        Ok(PcdData {
            header,
            positions,
            normals,
        })
    }
}

/// Upper bound on records reserved up front; the header count is not trusted
const MAX_PREALLOCATED_POINTS: usize = 1 << 20;
/// Largest accepted size of one binary point record
const MAX_RECORD_BYTES: usize = 1 << 20;

fn parse_error(message: &str) -> Error {
    IoError::ParseError {
        message: message.to_string(),
    }
    .into()
}

fn parse_one(values: &[&str], key: &str) -> Result<usize> {
    values
        .first()
        .and_then(|v| v.parse::<usize>().ok())
        .ok_or_else(|| parse_error(&format!("invalid {} value: {:?}", key, values.first())))
}

fn parse_all(values: &[&str], key: &str) -> Result<Vec<usize>> {
    values
        .iter()
        .map(|v| {
            v.parse::<usize>()
                .map_err(|_| parse_error(&format!("invalid {} value: {}", key, v)))
        })
        .collect()
}

/// PCD write options
#[derive(Debug, Clone)]
pub struct PcdWriteOptions {
    pub data_format: PcdDataFormat,
    pub viewpoint: Option<[f64; 7]>,
}

impl Default for PcdWriteOptions {
    fn default() -> Self {
        Self {
            data_format: PcdDataFormat::Binary,
            viewpoint: None,
        }
    }
}

/// PCD writer for positions with optional normals
pub struct PcdWriter;

impl PcdWriter {
    /// Write positions (and normals, if given) to a PCD file
    pub fn write_pcd_file<P: AsRef<Path>>(
        path: P,
        positions: &[Point3f],
        normals: Option<&[Vector3f]>,
        options: &PcdWriteOptions,
    ) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        Self::write_pcd_data(&mut writer, positions, normals, options)?;
        writer.flush()?;
        Ok(())
    }

    /// Write a cloud with normals to a PCD file
    pub fn write_normal_point_cloud<P: AsRef<Path>>(
        cloud: &NormalPointCloud3f,
        path: P,
        options: &PcdWriteOptions,
    ) -> Result<()> {
        Self::write_pcd_file(path, &cloud.positions(), Some(cloud.normals().as_slice()), options)
    }

    /// Write PCD data to a writer
    pub fn write_pcd_data<W: Write>(
        writer: &mut W,
        positions: &[Point3f],
        normals: Option<&[Vector3f]>,
        options: &PcdWriteOptions,
    ) -> Result<()> {
        if let Some(normals) = normals {
            if normals.len() != positions.len() {
                return Err(IoError::WriteError {
                    message: format!("{} positions but {} normals", positions.len(), normals.len()),
                }
                .into());
            }
        }
        if options.data_format == PcdDataFormat::BinaryCompressed {
            return Err(Error::Unsupported("binary_compressed PCD data is not supported".to_string()));
        }

        let mut names = vec!["x", "y", "z"];
        if normals.is_some() {
            names.extend(["normal_x", "normal_y", "normal_z"]);
        }
        let field = PcdFieldType::F32;
        let viewpoint = options.viewpoint.unwrap_or([0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0]);

        writeln!(writer, "# .PCD v0.7 - Point Cloud Data file format")?;
        writeln!(writer, "VERSION 0.7")?;
        writeln!(writer, "FIELDS {}", names.join(" "))?;
        writeln!(writer, "SIZE {}", vec![field.size().to_string(); names.len()].join(" "))?;
        writeln!(writer, "TYPE {}", vec![field.type_char(); names.len()].join(" "))?;
        writeln!(writer, "COUNT {}", vec!["1"; names.len()].join(" "))?;
        writeln!(writer, "WIDTH {}", positions.len())?;
        writeln!(writer, "HEIGHT 1")?;
        writeln!(
            writer,
            "VIEWPOINT {}",
            viewpoint.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(" ")
        )?;
        writeln!(writer, "POINTS {}", positions.len())?;

        match options.data_format {
            PcdDataFormat::Ascii => {
                writeln!(writer, "DATA ascii")?;
                for (i, p) in positions.iter().enumerate() {
                    write!(writer, "{} {} {}", p.x, p.y, p.z)?;
                    if let Some(normals) = normals {
                        let n = normals[i];
                        write!(writer, " {} {} {}", n.x, n.y, n.z)?;
                    }
                    writeln!(writer)?;
                }
            }
            _ => {
                writeln!(writer, "DATA binary")?;
                for (i, p) in positions.iter().enumerate() {
                    for v in [p.x, p.y, p.z] {
                        writer.write_all(&v.to_le_bytes())?;
                    }
                    if let Some(normals) = normals {
                        let n = normals[i];
                        for v in [n.x, n.y, n.z] {
                            writer.write_all(&v.to_le_bytes())?;
                        }
                    }
                }
            }
        }

        Ok(())
    }
}

impl PointCloudReader for PcdReader {
    fn read_point_cloud<P: AsRef<Path>>(path: P) -> Result<PointCloud<Point3f>> {
        Ok(Self::read_pcd_file(path)?.into_point_cloud())
    }
}

impl PointCloudWriter for PcdWriter {
    fn write_point_cloud<P: AsRef<Path>>(cloud: &PointCloud<Point3f>, path: P) -> Result<()> {
        Self::write_pcd_file(path, &cloud.points, None, &PcdWriteOptions::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::io::Cursor;

    const ASCII_PCD: &str = "# .PCD v0.7 - Point Cloud Data file format
VERSION 0.7
FIELDS x y z rgb
SIZE 4 4 4 4
TYPE F F F U
COUNT 1 1 1 1
WIDTH 3
HEIGHT 1
VIEWPOINT 0 0 0 1 0 0 0
POINTS 3
DATA ascii
0.1 0.2 0.3 4278190080
1.5 -2 3e-1 0
nan nan nan 0
";

    #[test]
    fn test_read_ascii_skips_extra_fields_and_nan() {
        let data = PcdReader::read_pcd_data(&mut Cursor::new(ASCII_PCD)).unwrap();
        assert_eq!(data.header.data_format, PcdDataFormat::Ascii);
        assert_eq!(data.header.fields.len(), 4);
        assert_eq!(data.positions.len(), 2);
        assert!(data.normals.is_none());
        assert_relative_eq!(data.positions[1].x, 1.5);
        assert_relative_eq!(data.positions[1].z, 0.3);
    }

    #[test]
    fn test_binary_roundtrip_with_normals() {
        let positions = vec![Point3f::new(1.0, 2.0, 3.0), Point3f::new(-4.0, 5.5, 0.25)];
        let normals = vec![Vector3f::z(), Vector3f::new(0.0, -1.0, 0.0)];

        let mut buffer = Vec::new();
        PcdWriter::write_pcd_data(&mut buffer, &positions, Some(normals.as_slice()), &PcdWriteOptions::default()).unwrap();

        let data = PcdReader::read_pcd_data(&mut Cursor::new(buffer)).unwrap();
        assert_eq!(data.header.data_format, PcdDataFormat::Binary);
        assert_eq!(data.positions, positions);
        assert_eq!(data.normals.as_deref(), Some(normals.as_slice()));
    }

    #[test]
    fn test_binary_with_mixed_field_types() {
        let header = "VERSION 0.7\nFIELDS intensity x y z\nSIZE 2 8 8 8\nTYPE U F F F\nCOUNT 1 1 1 1\nWIDTH 1\nHEIGHT 1\nDATA binary\n";
        let mut bytes = header.as_bytes().to_vec();
        bytes.extend_from_slice(&7u16.to_le_bytes());
        for v in [1.25f64, -2.5, 3.0] {
            bytes.extend_from_slice(&v.to_le_bytes());
        }

        let data = PcdReader::read_pcd_data(&mut Cursor::new(bytes)).unwrap();
        assert_eq!(data.positions, vec![Point3f::new(1.25, -2.5, 3.0)]);
    }

    #[test]
    fn test_header_errors() {
        let missing_fields = "VERSION 0.7\nWIDTH 1\nDATA ascii\n1 2 3\n";
        assert!(PcdReader::read_pcd_data(&mut Cursor::new(missing_fields)).is_err());

        let bad_points = "VERSION 0.7\nFIELDS x y z\nSIZE 4 4 4\nTYPE F F F\nWIDTH 2\nHEIGHT 1\nPOINTS 3\nDATA ascii\n";
        assert!(PcdReader::read_pcd_data(&mut Cursor::new(bad_points)).is_err());

        let compressed = "VERSION 0.7\nFIELDS x y z\nSIZE 4 4 4\nTYPE F F F\nWIDTH 1\nDATA binary_compressed\n";
        assert!(matches!(
            PcdReader::read_pcd_data(&mut Cursor::new(compressed)),
            Err(Error::Unsupported(_))
        ));

        let truncated = "VERSION 0.7\nFIELDS x y z\nSIZE 4 4 4\nTYPE F F F\nWIDTH 2\nDATA ascii\n1 2 3\n";
        assert!(PcdReader::read_pcd_data(&mut Cursor::new(truncated)).is_err());
    }

    #[test]
    fn test_oversized_header_counts_fail_cleanly() {
        let huge_width = "VERSION 0.7\nFIELDS x y z\nSIZE 4 4 4\nTYPE F F F\nWIDTH 4611686018427387904\nHEIGHT 1\nDATA ascii\n1 2 3\n";
        assert!(PcdReader::read_pcd_data(&mut Cursor::new(huge_width)).is_err());

        let overflowing = "VERSION 0.7\nFIELDS x y z\nSIZE 4 4 4\nTYPE F F F\nWIDTH 4294967296\nHEIGHT 4294967296\nDATA binary\n";
        assert!(matches!(
            PcdReader::read_pcd_data(&mut Cursor::new(overflowing)),
            Err(Error::InvalidData(_))
        ));

        let huge_binary = "VERSION 0.7\nFIELDS x y z\nSIZE 4 4 4\nTYPE F F F\nWIDTH 4611686018427387904\nDATA binary\n";
        assert!(PcdReader::read_pcd_data(&mut Cursor::new(huge_binary)).is_err());

        let huge_count = "VERSION 0.7\nFIELDS x y z\nSIZE 4 4 4\nTYPE F F F\nCOUNT 1 1 4611686018427387904\nWIDTH 1\nDATA binary\n";
        assert!(PcdReader::read_pcd_data(&mut Cursor::new(huge_count)).is_err());

        let zero_count = "VERSION 0.7\nFIELDS x y z\nSIZE 4 4 4\nTYPE F F F\nCOUNT 1 1 0\nWIDTH 1\nDATA ascii\n1 2\n";
        assert!(PcdReader::read_pcd_data(&mut Cursor::new(zero_count)).is_err());
    }

    #[test]
    fn test_missing_coordinate_field() {
        let no_z = "VERSION 0.7\nFIELDS x y\nSIZE 4 4\nTYPE F F\nWIDTH 1\nDATA ascii\n1 2\n";
        assert!(PcdReader::read_pcd_data(&mut Cursor::new(no_z)).is_err());
    }

    #[test]
    fn test_ascii_write_format() {
        let mut buffer = Vec::new();
        let options = PcdWriteOptions {
            data_format: PcdDataFormat::Ascii,
            viewpoint: None,
        };
        PcdWriter::write_pcd_data(&mut buffer, &[Point3f::new(1.0, 2.0, 3.0)], None, &options).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.contains("FIELDS x y z\n"));
        assert!(text.contains("DATA ascii\n1 2 3\n"));
    }

    #[test]
    fn test_normals_length_mismatch() {
        let mut buffer = Vec::new();
        let result = PcdWriter::write_pcd_data(
            &mut buffer,
            &[Point3f::origin()],
            Some(&[]),
            &PcdWriteOptions::default(),
        );
        assert!(result.is_err());
    }
}
