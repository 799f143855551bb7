//! ROI_PAC-style output: a flat binary raster plus a `.rsc` text sidecar.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::types::{AttributeMap, ExportError, ExportResult, Raster};

/// Suffix of the metadata sidecar, appended to the raster path
pub const RSC_SUFFIX: &str = ".rsc";

/// Write the raster and its sanitized attributes.
///
/// Integer data types truncate towards zero; the numeric transform itself
/// never rounds.
pub fn write<P: AsRef<Path>>(data: &Raster, atr: &AttributeMap, path: P) -> ExportResult<()> {
    let path = path.as_ref();
    write_raster(data, atr, path)?;

    let mut rsc = path.as_os_str().to_os_string();
    rsc.push(RSC_SUFFIX);
    write_rsc(atr, Path::new(&rsc))?;

    Ok(())
}

fn write_raster(data: &Raster, atr: &AttributeMap, path: &Path) -> ExportResult<()> {
    let data_type = atr
        .get("DATA_TYPE")
        .map(String::as_str)
        .unwrap_or("float32");
    log::info!(
        "write {}x{} {} raster to {}",
        data.nrows(),
        data.ncols(),
        data_type,
        path.display()
    );

    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    // little-endian, row-major, single band
    match data_type {
        "float32" | "float" => {
            for value in data.iter() {
                writer.write_all(&value.to_le_bytes())?;
            }
        }
        "int16" => {
            for value in data.iter() {
                writer.write_all(&(*value as i16).to_le_bytes())?;
            }
        }
        "byte" | "bool" => {
            for value in data.iter() {
                writer.write_all(&[*value as u8])?;
            }
        }
        other => {
            return Err(ExportError::UnsupportedProduct(format!(
                "no ROI_PAC serialization for data type {}",
                other
            )))
        }
    }
    writer.flush()?;

    Ok(())
}

fn write_rsc(atr: &AttributeMap, path: &Path) -> ExportResult<()> {
    log::info!("write metadata to {}", path.display());

    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    let width = atr.keys().map(String::len).max().unwrap_or(0) + 4;
    for (key, value) in atr {
        writeln!(writer, "{:<width$}{}", key, value, width = width)?;
    }
    writer.flush()?;

    Ok(())
}
