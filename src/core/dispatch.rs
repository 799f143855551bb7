//! Product dispatch: decide which slices to read, how to combine them and
//! what the result means.
//!
//! `classify` is the decision engine; `convert` drives one full conversion
//! against a [`ProductContainer`], producing the raster, the annotated
//! attributes and the output path for the writer.

use std::path::PathBuf;

use crate::core::{dates, metadata, transform};
use crate::io::container::{latest_epoch, resolve_slice_name, ProductContainer};
use crate::types::{
    require_attr, AttributeMap, ExportError, ExportResult, FileType, OutputKind, Raster, RefPixel,
};

/// Conversion request from the caller
#[derive(Debug, Clone, Default)]
pub struct ConvertRequest {
    /// Sub-product token: a date, a date pair, or a dataset name
    pub dset: Option<String>,
    /// Output path override
    pub outfile: Option<PathBuf>,
    /// Reference pixel override in (row, col)
    pub ref_pixel: Option<RefPixel>,
    /// Fail on generic file types without a defined output kind instead of
    /// falling back to unwrapped phase
    pub strict: bool,
}

/// Which raster slice(s) to fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SliceSelection {
    /// The container's default band
    Default,
    /// One named slice
    Single(String),
    /// Two epoch slices combined as `target - base`
    Pair { base: String, target: String },
}

/// Classified product: what to read and what the result means
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductDescriptor {
    pub kind: OutputKind,
    pub selection: SliceSelection,
    /// (base, target) epoch pair driving date-field derivation
    pub epochs: Option<(String, String)>,
    /// Apply the range-to-phase conversion factor after reading
    pub scale_to_phase: bool,
    /// Honor the reference pixel recorded in the attributes (stack
    /// unwrapped-phase slices only)
    pub use_stored_reference: bool,
}

/// Classify the request against the declared product type.
///
/// Pure over its inputs: `slices` and `epoch_catalog` are only consulted
/// for multi-slice containers and may be empty otherwise.
pub fn classify(
    file_type: &FileType,
    dset: Option<&str>,
    atr: &AttributeMap,
    slices: &[String],
    epoch_catalog: &[String],
    strict: bool,
) -> ExportResult<ProductDescriptor> {
    match file_type {
        FileType::Velocity => Ok(ProductDescriptor {
            kind: OutputKind::UnwrappedPhase,
            selection: SliceSelection::Default,
            epochs: None,
            scale_to_phase: true,
            use_stored_reference: false,
        }),

        FileType::Timeseries => {
            let token = dset.ok_or_else(|| {
                ExportError::MissingInput(
                    "a date or date1_date2 pair is required for timeseries input".to_string(),
                )
            })?;

            let (date1, date2) = if token.contains('_') {
                dates::normalize_pair(token)?
            } else {
                let ref_date = atr.get("REF_DATE").ok_or_else(|| {
                    ExportError::MissingInput(format!(
                        "no REF_DATE attribute to pair with date {}",
                        token
                    ))
                })?;
                (dates::normalize_date(ref_date)?, dates::normalize_date(token)?)
            };

            Ok(ProductDescriptor {
                kind: OutputKind::UnwrappedPhase,
                selection: SliceSelection::Pair {
                    base: date1.clone(),
                    target: date2.clone(),
                },
                epochs: Some((date1, date2)),
                scale_to_phase: true,
                use_stored_reference: false,
            })
        }

        FileType::HdfEos => classify_hdfeos(dset, atr, slices, epoch_catalog),

        FileType::IfgramStack => classify_stack(dset),

        FileType::Generic(name) => classify_generic(name, dset, atr, strict),
    }
}

fn classify_hdfeos(
    dset: Option<&str>,
    atr: &AttributeMap,
    slices: &[String],
    epoch_catalog: &[String],
) -> ExportResult<ProductDescriptor> {
    let token = dset.ok_or_else(|| {
        ExportError::MissingInput("a dataset name is required for HDFEOS input".to_string())
    })?;

    let name = match token.split_once('-') {
        Some((name, _)) => name,
        None => token,
    };

    // base/target epochs: explicit for displacement, whole-container span
    // for everything else
    let (date1, date2) = if name == "displacement" {
        let suffix = match token.split_once('-') {
            Some((_, suffix)) => suffix,
            None => {
                return Err(ExportError::InvalidRequest(format!(
                    "no '-' in dataset {}; it is required for displacement",
                    token
                )))
            }
        };
        if suffix.contains('_') {
            dates::normalize_pair(suffix)?
        } else {
            let ref_date = atr.get("REF_DATE").ok_or_else(|| {
                ExportError::MissingInput(format!(
                    "no REF_DATE attribute to pair with date {}",
                    suffix
                ))
            })?;
            (dates::normalize_date(ref_date)?, dates::normalize_date(suffix)?)
        }
    } else {
        let first = epoch_catalog.first().ok_or_else(|| {
            ExportError::MissingInput("no acquisition dates found in container".to_string())
        })?;
        let last = epoch_catalog.last().ok_or_else(|| {
            ExportError::MissingInput("no acquisition dates found in container".to_string())
        })?;
        (first.clone(), last.clone())
    };

    let kind = if name == "displacement" {
        OutputKind::UnwrappedPhase
    } else if name.to_lowercase().contains("coherence") {
        OutputKind::Coherence
    } else if name == "height" {
        OutputKind::Elevation
    } else {
        return Err(ExportError::UnsupportedProduct(format!(
            "unrecognized input dataset type: {}",
            token
        )));
    };

    let selection = if name == "displacement" {
        let base = resolve_slice_name(slices, &format!("{}-{}", name, date1))?;
        let target = resolve_slice_name(slices, &format!("{}-{}", name, date2))?;
        SliceSelection::Pair { base, target }
    } else {
        SliceSelection::Single(resolve_slice_name(slices, token)?)
    };

    Ok(ProductDescriptor {
        kind,
        selection,
        epochs: Some((date1, date2)),
        scale_to_phase: name == "displacement",
        use_stored_reference: false,
    })
}

fn classify_stack(dset: Option<&str>) -> ExportResult<ProductDescriptor> {
    let token = dset.ok_or_else(|| {
        ExportError::MissingInput(
            "a dataset-date1_date2 token is required for ifgramStack input".to_string(),
        )
    })?;

    let (name, date12) = token.split_once('-').ok_or_else(|| {
        ExportError::InvalidRequest(format!(
            "no '-' in dataset {}; expected name-date1_date2",
            token
        ))
    })?;
    let (date1, date2) = dates::normalize_pair(date12)?;

    let kind = if name.starts_with("unwrapPhase") {
        OutputKind::UnwrappedPhase
    } else if name.starts_with("coherence") {
        OutputKind::Coherence
    } else if name.starts_with("wrapPhase") {
        OutputKind::WrappedPhase
    } else {
        return Err(ExportError::UnsupportedProduct(format!(
            "unrecognized dataset type: {}",
            token
        )));
    };

    // the stack stores one slice per pair; the raw token is the slice id
    Ok(ProductDescriptor {
        kind,
        selection: SliceSelection::Single(token.to_string()),
        epochs: Some((date1, date2)),
        scale_to_phase: false,
        use_stored_reference: name.starts_with("unwrapPhase"),
    })
}

fn classify_generic(
    type_name: &str,
    dset: Option<&str>,
    atr: &AttributeMap,
    strict: bool,
) -> ExportResult<ProductDescriptor> {
    let kind = if type_name.to_lowercase().contains("coherence") {
        OutputKind::Coherence
    } else if type_name == "mask" {
        OutputKind::Mask
    } else if type_name == "geometry" && dset == Some("height") {
        if atr.contains_key("Y_FIRST") {
            OutputKind::Elevation
        } else {
            OutputKind::RawHeight
        }
    } else if strict {
        return Err(ExportError::UnsupportedProduct(format!(
            "unrecognized file type: {}",
            type_name
        )));
    } else {
        log::debug!("file type {} has no dedicated rule, writing unwrapped phase", type_name);
        OutputKind::UnwrappedPhase
    };

    let selection = match (kind, dset) {
        // single-band products are read whole
        (OutputKind::Coherence | OutputKind::Mask, _) | (_, None) => SliceSelection::Default,
        (_, Some(token)) => SliceSelection::Single(token.to_string()),
    };

    Ok(ProductDescriptor {
        kind,
        selection,
        epochs: None,
        scale_to_phase: false,
        use_stored_reference: false,
    })
}

/// Run one conversion: resolve the request, read and transform the raster,
/// annotate the attributes and derive the output path.
///
/// The returned attributes still carry the input's mixed-case keys; pass
/// them through [`metadata::sanitize`] before writing.
pub fn convert(
    container: &dyn ProductContainer,
    request: &ConvertRequest,
) -> ExportResult<(Raster, AttributeMap, PathBuf)> {
    let mut atr = container.attributes()?;
    let file_type = FileType::from_attr(require_attr(&atr, "FILE_TYPE")?);

    // time-series default: most recent stored epoch
    let dset = match (&request.dset, &file_type) {
        (Some(token), _) => Some(token.clone()),
        (None, FileType::Timeseries) => {
            let date = latest_epoch(container)?;
            log::info!("no date specified, continue with the last date: {}", date);
            Some(date)
        }
        (None, _) => None,
    };

    // a caller-supplied reference pixel always wins over the stored one
    if let Some(pixel) = request.ref_pixel {
        atr.insert("REF_Y".to_string(), pixel.row.to_string());
        atr.insert("REF_X".to_string(), pixel.col.to_string());
        log::info!("change reference point to y/x: ({}, {})", pixel.row, pixel.col);
    }

    let (slices, epoch_catalog) = match file_type {
        FileType::HdfEos => (container.slice_catalog()?, container.epoch_catalog()?),
        _ => (Vec::new(), Vec::new()),
    };

    let desc = classify(
        &file_type,
        dset.as_deref(),
        &atr,
        &slices,
        &epoch_catalog,
        request.strict,
    )?;

    log::info!(
        "read {} from file {}",
        dset.as_deref().unwrap_or("default band"),
        container.path().display()
    );

    let mut data = match &desc.selection {
        SliceSelection::Default => container.read(None)?,
        SliceSelection::Single(name) => container.read(Some(name))?,
        SliceSelection::Pair { base, target } => {
            let base = container.read(Some(base))?;
            let target = container.read(Some(target))?;
            transform::difference(&base, &target)?
        }
    };

    if desc.scale_to_phase {
        match file_type {
            FileType::Velocity => log::info!(
                "converting velocity to an interferogram with one year temporal baseline"
            ),
            _ => log::info!("converting range to phase"),
        }
        let factor = transform::range2phase(&atr)?;
        transform::scale(&mut data, factor);
    }

    if desc.use_stored_reference {
        match stored_reference(&atr)? {
            Some(pixel) => {
                log::info!("consider reference pixel in y/x: ({}, {})", pixel.row, pixel.col);
                transform::apply_reference(&mut data, pixel)?;
            }
            None => log::info!("no REF_Y/REF_X found"),
        }
    } else if let Some(pixel) = request.ref_pixel {
        transform::apply_reference(&mut data, pixel)?;
    }

    metadata::annotate(&mut atr, desc.kind, desc.epochs.as_ref());

    let outfile = match &request.outfile {
        Some(path) => path.clone(),
        None => metadata::default_outfile(
            container.path(),
            &file_type,
            desc.kind,
            desc.epochs.as_ref(),
        ),
    };

    Ok((data, atr, outfile))
}

/// Reference pixel recorded in the attributes, if any
fn stored_reference(atr: &AttributeMap) -> ExportResult<Option<RefPixel>> {
    let (row, col) = match (atr.get("REF_Y"), atr.get("REF_X")) {
        (Some(row), Some(col)) => (row, col),
        _ => return Ok(None),
    };

    let row = row.parse().map_err(|_| {
        ExportError::Processing(format!("REF_Y is not a pixel index: {}", row))
    })?;
    let col = col.parse().map_err(|_| {
        ExportError::Processing(format!("REF_X is not a pixel index: {}", col))
    })?;

    Ok(Some(RefPixel { row, col }))
}
