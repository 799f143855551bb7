//! Input container access.
//!
//! The core pipeline only sees the [`ProductContainer`] trait; the concrete
//! reader targets the self-describing HDF5 products as GDAL exposes them
//! (scalar attributes in the default metadata domain, one subdataset per
//! stored dataset, cubes as multi-band subdatasets).

use std::path::{Path, PathBuf};

use gdal::{Dataset, Metadata};
use ndarray::Array2;
use regex::Regex;

use crate::types::{AttributeMap, ExportError, ExportResult, Raster};

/// Read-side contract for a self-describing product container
pub trait ProductContainer {
    fn path(&self) -> &Path;

    /// Scalar attribute mapping of the container
    fn attributes(&self) -> ExportResult<AttributeMap>;

    /// Ordered identifiers of the stored 2D slices
    fn slice_catalog(&self) -> ExportResult<Vec<String>>;

    /// Ordered 8-digit acquisition dates stored in the container
    fn epoch_catalog(&self) -> ExportResult<Vec<String>>;

    /// Read one slice; `None` reads the container's default band
    fn read(&self, slice: Option<&str>) -> ExportResult<Raster>;
}

/// Most recent epoch stored in the container
pub fn latest_epoch(container: &dyn ProductContainer) -> ExportResult<String> {
    container.epoch_catalog()?.last().cloned().ok_or_else(|| {
        ExportError::MissingInput(format!(
            "no acquisition dates found in {}",
            container.path().display()
        ))
    })
}

/// Resolve a requested slice name against the catalog.
///
/// An exact match wins; otherwise the request must be a unique prefix of
/// one catalog entry.
pub fn resolve_slice_name(catalog: &[String], requested: &str) -> ExportResult<String> {
    if let Some(hit) = catalog.iter().find(|entry| entry.as_str() == requested) {
        return Ok(hit.clone());
    }

    let hits: Vec<&String> = catalog
        .iter()
        .filter(|entry| entry.starts_with(requested))
        .collect();
    match hits.len() {
        1 => Ok(hits[0].clone()),
        0 => Err(ExportError::Resolution(format!(
            "no dataset matches {}",
            requested
        ))),
        n => Err(ExportError::Resolution(format!(
            "dataset {} is ambiguous, {} candidates",
            requested, n
        ))),
    }
}

/// GDAL-backed container reader
pub struct GdalContainer {
    path: PathBuf,
}

impl GdalContainer {
    pub fn new<P: AsRef<Path>>(path: P) -> ExportResult<Self> {
        // open once up front so a bad path fails here, not mid-pipeline
        Dataset::open(path.as_ref())?;
        Ok(GdalContainer {
            path: path.as_ref().to_path_buf(),
        })
    }

    /// (GDAL connection string, leaf dataset name) per subdataset
    fn subdatasets(&self) -> ExportResult<Vec<(String, String)>> {
        let dataset = Dataset::open(&self.path)?;
        let mut subdatasets = Vec::new();

        if let Some(entries) = dataset.metadata_domain("SUBDATASETS") {
            for entry in entries {
                let (key, value) = match entry.split_once('=') {
                    Some(pair) => pair,
                    None => continue,
                };
                if !key.ends_with("_NAME") {
                    continue;
                }
                let leaf = value
                    .trim_matches('"')
                    .rsplit('/')
                    .next()
                    .unwrap_or(value)
                    .to_string();
                subdatasets.push((value.to_string(), leaf));
            }
        }

        Ok(subdatasets)
    }

    fn open_leaf(&self, leaf: &str) -> ExportResult<Dataset> {
        let subdatasets = self.subdatasets()?;
        let (name, _) = subdatasets
            .iter()
            .find(|(_, candidate)| candidate == leaf)
            .ok_or_else(|| {
                ExportError::Resolution(format!(
                    "no dataset {} in {}",
                    leaf,
                    self.path.display()
                ))
            })?;
        Ok(Dataset::open(Path::new(name))?)
    }

    /// Band index (1-based) for a date or date-pair suffix of a cube dataset
    fn band_index(&self, leaf: &str, suffix: &str, bands: isize) -> ExportResult<isize> {
        let index = if suffix.contains('_') {
            let atr = self.attributes()?;
            let list = atr.get("DATE12_LIST").ok_or_else(|| {
                ExportError::Resolution(format!(
                    "cannot locate pair {} in dataset {}",
                    suffix, leaf
                ))
            })?;
            let pos = split_list(list)
                .position(|entry| entry == suffix)
                .ok_or_else(|| {
                    ExportError::Resolution(format!("pair {} not stored in {}", suffix, leaf))
                })?;
            pos
        } else {
            self.epoch_catalog()?
                .iter()
                .position(|date| date == suffix)
                .ok_or_else(|| {
                    ExportError::Resolution(format!("date {} not stored in {}", suffix, leaf))
                })?
        };

        if index as isize >= bands {
            return Err(ExportError::Resolution(format!(
                "{}-{} points past the {} stored bands",
                leaf, suffix, bands
            )));
        }
        Ok(index as isize + 1)
    }

    fn read_band(dataset: &Dataset, band: isize) -> ExportResult<Raster> {
        let (width, height) = dataset.raster_size();
        let rasterband = dataset.rasterband(band)?;
        let buffer = rasterband.read_as::<f32>((0, 0), (width, height), (width, height), None)?;

        Array2::from_shape_vec((height, width), buffer.data).map_err(|e| {
            ExportError::Processing(format!(
                "failed to reshape {}x{} band: {}",
                height, width, e
            ))
        })
    }
}

impl ProductContainer for GdalContainer {
    fn path(&self) -> &Path {
        &self.path
    }

    fn attributes(&self) -> ExportResult<AttributeMap> {
        let dataset = Dataset::open(&self.path)?;
        let mut atr = AttributeMap::new();

        if let Some(entries) = dataset.metadata_domain("") {
            for entry in entries {
                if let Some((key, value)) = entry.split_once('=') {
                    // HDF5/netCDF drivers prefix keys with the dataset path
                    let key = key.rsplit('#').next().unwrap_or(key);
                    atr.insert(key.to_string(), value.trim().to_string());
                }
            }
        }

        log::debug!("read {} attributes from {}", atr.len(), self.path.display());
        Ok(atr)
    }

    fn slice_catalog(&self) -> ExportResult<Vec<String>> {
        let subdatasets = self.subdatasets()?;
        let epochs = self.epoch_catalog().unwrap_or_default();
        let mut catalog = Vec::new();

        for (name, leaf) in &subdatasets {
            let dataset = Dataset::open(Path::new(name))?;
            let bands = dataset.raster_count();
            if bands > 1 && epochs.len() == bands as usize {
                for epoch in &epochs {
                    catalog.push(format!("{}-{}", leaf, epoch));
                }
            } else {
                catalog.push(leaf.clone());
            }
        }

        Ok(catalog)
    }

    fn epoch_catalog(&self) -> ExportResult<Vec<String>> {
        let atr = self.attributes()?;
        if let Some(list) = atr.get("DATE_LIST") {
            return Ok(split_list(list).map(str::to_string).collect());
        }

        // fall back to the dates embedded in slice names
        let pattern = Regex::new(r"\d{8}")
            .map_err(|e| ExportError::Processing(format!("bad date pattern: {}", e)))?;
        let mut epochs: Vec<String> = Vec::new();
        for (_, leaf) in self.subdatasets()? {
            for hit in pattern.find_iter(&leaf) {
                let date = hit.as_str().to_string();
                if !epochs.contains(&date) {
                    epochs.push(date);
                }
            }
        }
        epochs.sort();

        Ok(epochs)
    }

    fn read(&self, slice: Option<&str>) -> ExportResult<Raster> {
        let subdatasets = self.subdatasets()?;

        let requested = match slice {
            Some(requested) => requested,
            None => {
                let dataset = match subdatasets.first() {
                    Some((name, _)) => Dataset::open(Path::new(name))?,
                    None => Dataset::open(&self.path)?,
                };
                return Self::read_band(&dataset, 1);
            }
        };

        // flat layout: one subdataset per slice
        if subdatasets.iter().any(|(_, leaf)| leaf == requested) {
            let dataset = self.open_leaf(requested)?;
            return Self::read_band(&dataset, 1);
        }

        // cube layout: leaf dataset plus per-epoch band
        let (leaf, suffix) = match requested.split_once('-') {
            Some((leaf, suffix)) => (leaf, suffix),
            // a bare date addresses the time-series cube
            None => ("timeseries", requested),
        };
        let dataset = self.open_leaf(leaf)?;
        let band = self.band_index(leaf, suffix, dataset.raster_count())?;
        Self::read_band(&dataset, band)
    }
}

fn split_list(list: &str) -> impl Iterator<Item = &str> {
    list.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|entry| !entry.is_empty())
}
