//! Spin image matrices as CSV
//!
//! One line per β row, comma-separated bin weights from α = 0 outwards.

use crate::error::IoError;
use spincrate_core::{Result, SpinImage};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Write the image rows as CSV
pub fn write_spin_image_csv_to<W: Write>(image: &SpinImage, writer: &mut W) -> Result<()> {
    for row in image.data.rows() {
        let line: Vec<String> = row.iter().map(|v| v.to_string()).collect();
        writeln!(writer, "{}", line.join(","))?;
    }
    Ok(())
}

/// Write the image rows as CSV to `path`
pub fn write_spin_image_csv<P: AsRef<Path>>(image: &SpinImage, path: P) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_spin_image_csv_to(image, &mut writer)?;
    writer.flush()?;
    Ok(())
}

/// Read a square CSV matrix back into a spin image with the given bin size
pub fn read_spin_image_csv_from<R: BufRead>(reader: R, bin_size: f32) -> Result<SpinImage> {
    let mut values = Vec::new();
    let mut rows = 0usize;

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let row = line
            .split(',')
            .map(|v| {
                v.trim().parse::<f32>().map_err(|_| IoError::ParseError {
                    message: format!("line {}: invalid bin value '{}'", line_no + 1, v),
                })
            })
            .collect::<std::result::Result<Vec<f32>, IoError>>()?;
        values.extend(row);
        rows += 1;
    }

    if rows == 0 || values.len() != rows * rows {
        return Err(IoError::ParseError {
            message: format!("spin image CSV must be square, got {} values in {} rows", values.len(), rows),
        }
        .into());
    }

    let data = ndarray::Array2::from_shape_vec((rows, rows), values).map_err(|e| IoError::ParseError {
        message: e.to_string(),
    })?;
    Ok(SpinImage { data, bin_size })
}

/// Read a spin image CSV file
pub fn read_spin_image_csv<P: AsRef<Path>>(path: P, bin_size: f32) -> Result<SpinImage> {
    read_spin_image_csv_from(BufReader::new(File::open(path)?), bin_size)
}
