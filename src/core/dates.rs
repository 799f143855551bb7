//! Acquisition date tokens.
//!
//! Dates travel through the pipeline as 8-digit `YYYYMMDD` strings. Callers
//! may hand in 6-digit `YYMMDD` tokens; those gain a century here.

use chrono::NaiveDate;

use crate::types::{ExportError, ExportResult};

/// Normalize a date token to 8-digit YYYYMMDD form.
///
/// 6-digit tokens are expanded with a century pivot: two-digit years above
/// 70 become 19xx, everything else 20xx.
pub fn normalize_date(token: &str) -> ExportResult<String> {
    if !token.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ExportError::InvalidDate(token.to_string()));
    }

    let full = match token.len() {
        8 => token.to_string(),
        6 => {
            let yy: u32 = token[0..2]
                .parse()
                .map_err(|_| ExportError::InvalidDate(token.to_string()))?;
            if yy > 70 {
                format!("19{}", token)
            } else {
                format!("20{}", token)
            }
        }
        _ => return Err(ExportError::InvalidDate(token.to_string())),
    };

    NaiveDate::parse_from_str(&full, "%Y%m%d")
        .map_err(|_| ExportError::InvalidDate(token.to_string()))?;

    Ok(full)
}

/// Split and normalize an `epoch1_epoch2` pair token.
pub fn normalize_pair(token: &str) -> ExportResult<(String, String)> {
    match token.split_once('_') {
        Some((first, second)) => Ok((normalize_date(first)?, normalize_date(second)?)),
        None => Err(ExportError::InvalidRequest(format!(
            "expected date1_date2, got {}",
            token
        ))),
    }
}

/// Year-dropped 6-digit form used by the legacy DATE/DATE12 fields.
pub fn six_digit(date: &str) -> &str {
    if date.len() == 8 {
        &date[2..]
    } else {
        date
    }
}
