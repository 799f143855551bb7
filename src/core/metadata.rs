//! Target-schema metadata: annotation, default naming, sanitization.

use std::path::{Path, PathBuf};

use crate::core::dates::six_digit;
use crate::types::{AttributeMap, ExportError, ExportResult, FileType, OutputKind};

/// Processor identifier stamped into every sanitized attribute set
pub const PROCESSOR: &str = "roipac";

/// Annotate the working attributes with the target FILE_TYPE / UNIT /
/// DATA_TYPE and, for differenced products, the composite date fields.
pub fn annotate(atr: &mut AttributeMap, kind: OutputKind, epochs: Option<&(String, String)>) {
    atr.insert("FILE_TYPE".to_string(), kind.extension().to_string());
    if let Some(unit) = kind.unit() {
        atr.insert("UNIT".to_string(), unit.to_string());
    }
    if let Some(data_type) = kind.data_type() {
        atr.insert("DATA_TYPE".to_string(), data_type.to_string());
    }

    if let Some((date1, date2)) = epochs {
        atr.insert("DATE".to_string(), six_digit(date1).to_string());
        atr.insert(
            "DATE12".to_string(),
            format!("{}-{}", six_digit(date1), six_digit(date2)),
        );
    }
}

/// Default output filename when the caller did not supply one.
///
/// Velocity and generic products keep the input stem with the new
/// extension. Time-series and stack products are named `date1_date2<ext>`,
/// keeping a `geo_` prefix from the input name; multi-slice containers use
/// the same date form without the prefix.
pub fn default_outfile(
    input: &Path,
    file_type: &FileType,
    kind: OutputKind,
    epochs: Option<&(String, String)>,
) -> PathBuf {
    let ext = kind.extension();

    match (file_type, epochs) {
        (FileType::Timeseries | FileType::IfgramStack, Some((date1, date2))) => {
            let mut name = format!("{}_{}{}", date1, date2, ext);
            let input_name = input
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default();
            if input_name.starts_with("geo_") {
                name = format!("geo_{}", name);
            }
            PathBuf::from(name)
        }
        (FileType::HdfEos, Some((date1, date2))) => {
            PathBuf::from(format!("{}_{}{}", date1, date2, ext))
        }
        _ => input.with_extension(&ext[1..]),
    }
}

/// Restrict the attribute set to the ROI_PAC naming convention.
///
/// Drops the redundant lower/mixed-case geometry keys, keeps only
/// all-uppercase keys, renames LENGTH to FILE_LENGTH and stamps the
/// PROCESSOR identifier. A missing LENGTH is a fatal precondition
/// violation.
pub fn sanitize(atr: AttributeMap) -> ExportResult<AttributeMap> {
    let mut out = AttributeMap::new();
    for (key, value) in atr {
        if is_redundant_geometry_key(&key) || !is_schema_key(&key) {
            continue;
        }
        out.insert(key, value);
    }

    let length = out
        .remove("LENGTH")
        .ok_or_else(|| ExportError::MissingAttribute("LENGTH".to_string()))?;
    out.insert("FILE_LENGTH".to_string(), length);

    out.insert("PROCESSOR".to_string(), PROCESSOR.to_string());
    Ok(out)
}

/// Raster geometry is carried by WIDTH/LENGTH only; every other spelling
/// of width/length/lines/samples is redundant.
fn is_redundant_geometry_key(key: &str) -> bool {
    match key.to_ascii_lowercase().as_str() {
        "lines" | "samples" => true,
        "width" => key != "WIDTH",
        "length" => key != "LENGTH",
        _ => false,
    }
}

/// Schema keys contain at least one letter and no lower-case letters
fn is_schema_key(key: &str) -> bool {
    key.chars().any(|c| c.is_alphabetic()) && !key.chars().any(|c| c.is_lowercase())
}
