//! roipac-export: convert time-series InSAR analysis products to ROI_PAC
//! rasters.
//!
//! The library reads a self-describing product container (velocity,
//! displacement time-series, HDF-EOS5 or interferogram stack), selects and
//! differences the requested raster slices, converts range measurements to
//! phase, and writes a flat binary raster with a `.rsc` text sidecar in the
//! legacy ROI_PAC layout.

pub mod types;
pub mod io;
pub mod core;

// Re-export main types and functions for easier access
pub use types::{
    AttributeMap, ExportError, ExportResult, FileType, OutputKind, Raster, RefPixel,
};

pub use crate::core::dispatch::{classify, convert, ConvertRequest, ProductDescriptor, SliceSelection};
pub use crate::io::container::{GdalContainer, ProductContainer};
