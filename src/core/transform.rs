//! Numeric adjustments applied to rasters before export.
//!
//! Three operations, composed by the dispatcher: epoch differencing,
//! range-to-phase scaling, and reference-pixel zeroing.

use crate::types::{require_attr, AttributeMap, ExportError, ExportResult, Raster, RefPixel};

/// Range-to-phase conversion factor `-4 * pi / wavelength`.
///
/// One meter of range change corresponds to this many radians of two-way
/// phase at the container's radar wavelength.
pub fn range2phase(atr: &AttributeMap) -> ExportResult<f64> {
    let wavelength: f64 = require_attr(atr, "WAVELENGTH")?
        .parse()
        .map_err(|_| ExportError::Processing("WAVELENGTH is not numeric".to_string()))?;

    Ok(-4.0 * std::f64::consts::PI / wavelength)
}

/// Difference two epoch slices: `target - base`.
pub fn difference(base: &Raster, target: &Raster) -> ExportResult<Raster> {
    if base.dim() != target.dim() {
        return Err(ExportError::Processing(format!(
            "epoch slices differ in shape: {:?} vs {:?}",
            base.dim(),
            target.dim()
        )));
    }

    Ok(target - base)
}

/// Scale a raster in place by a conversion factor.
pub fn scale(data: &mut Raster, factor: f64) {
    data.mapv_inplace(|v| v * factor as f32);
}

/// Zero the raster at the reference pixel by subtracting its value from
/// every sample. Applying this again with the same pixel is a no-op.
pub fn apply_reference(data: &mut Raster, pixel: RefPixel) -> ExportResult<()> {
    let (rows, cols) = data.dim();
    if pixel.row >= rows || pixel.col >= cols {
        return Err(ExportError::InvalidRequest(format!(
            "reference pixel y/x ({}, {}) outside {}x{} raster",
            pixel.row, pixel.col, rows, cols
        )));
    }

    let offset = data[[pixel.row, pixel.col]];
    data.mapv_inplace(|v| v - offset);

    Ok(())
}
