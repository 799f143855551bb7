use ndarray::Array2;
use std::collections::BTreeMap;

/// 2D real-valued raster band (rows x cols)
pub type Raster = Array2<f32>;

/// Ordered scalar attribute mapping attached to a product.
///
/// Keys are case-significant; the ROI_PAC target schema only accepts
/// all-uppercase keys (see `core::metadata::sanitize`).
pub type AttributeMap = BTreeMap<String, String>;

/// Reference pixel in (row, col) order, i.e. ROI_PAC's y/x convention
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefPixel {
    pub row: usize,
    pub col: usize,
}

/// Declared product type of an input container, from its FILE_TYPE attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileType {
    /// Linear displacement rate, single slice
    Velocity,
    /// Displacement time-series cube, one slice per acquisition date
    Timeseries,
    /// HDF-EOS5 multi-slice container
    HdfEos,
    /// Interferogram stack, one slice per date pair
    IfgramStack,
    /// Everything else: mask, coherence, geometry, ...
    Generic(String),
}

impl FileType {
    pub fn from_attr(value: &str) -> Self {
        match value {
            "velocity" => FileType::Velocity,
            "timeseries" => FileType::Timeseries,
            "HDFEOS" => FileType::HdfEos,
            "ifgramStack" => FileType::IfgramStack,
            other => FileType::Generic(other.to_string()),
        }
    }
}

impl std::fmt::Display for FileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileType::Velocity => write!(f, "velocity"),
            FileType::Timeseries => write!(f, "timeseries"),
            FileType::HdfEos => write!(f, "HDFEOS"),
            FileType::IfgramStack => write!(f, "ifgramStack"),
            FileType::Generic(name) => write!(f, "{}", name),
        }
    }
}

/// Semantic category of a converted product, driving the target file
/// extension, unit and data type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    UnwrappedPhase,
    Coherence,
    WrappedPhase,
    Elevation,
    RawHeight,
    Mask,
}

impl OutputKind {
    /// Target file-type tag, stored in the FILE_TYPE attribute
    pub fn extension(&self) -> &'static str {
        match self {
            OutputKind::UnwrappedPhase => ".unw",
            OutputKind::Coherence => ".cor",
            OutputKind::WrappedPhase => ".int",
            OutputKind::Elevation => ".dem",
            OutputKind::RawHeight => ".hgt",
            OutputKind::Mask => ".msk",
        }
    }

    /// Physical unit of the output samples, if the kind defines one
    pub fn unit(&self) -> Option<&'static str> {
        match self {
            OutputKind::UnwrappedPhase | OutputKind::WrappedPhase => Some("radian"),
            OutputKind::Coherence => Some("1"),
            OutputKind::Elevation | OutputKind::RawHeight => Some("m"),
            OutputKind::Mask => None,
        }
    }

    /// Serialization data type when the kind narrows it below float32
    pub fn data_type(&self) -> Option<&'static str> {
        match self {
            OutputKind::Elevation => Some("int16"),
            OutputKind::Mask => Some("byte"),
            _ => None,
        }
    }
}

/// Error types for product export
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("GDAL error: {0}")]
    Gdal(#[from] gdal::errors::GdalError),

    #[error("missing input: {0}")]
    MissingInput(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("unsupported product: {0}")]
    UnsupportedProduct(String),

    #[error("missing attribute: {0}")]
    MissingAttribute(String),

    #[error("dataset resolution error: {0}")]
    Resolution(String),

    #[error("invalid date: {0}")]
    InvalidDate(String),

    #[error("processing error: {0}")]
    Processing(String),
}

/// Result type for export operations
pub type ExportResult<T> = Result<T, ExportError>;

/// Fetch a required attribute from the mapping
pub fn require_attr<'a>(atr: &'a AttributeMap, key: &str) -> ExportResult<&'a str> {
    atr.get(key)
        .map(String::as_str)
        .ok_or_else(|| ExportError::MissingAttribute(key.to_string()))
}
