use std::path::{Path, PathBuf};

use approx::assert_relative_eq;
use ndarray::Array2;

use roipac_export::core::dispatch::{convert, ConvertRequest};
use roipac_export::core::metadata;
use roipac_export::io::container::ProductContainer;
use roipac_export::types::{AttributeMap, ExportError, ExportResult, Raster, RefPixel};

/// In-memory container for driving the pipeline without any file I/O
struct MockContainer {
    path: PathBuf,
    attributes: AttributeMap,
    slices: Vec<(String, Raster)>,
    epochs: Vec<String>,
}

impl ProductContainer for MockContainer {
    fn path(&self) -> &Path {
        &self.path
    }

    fn attributes(&self) -> ExportResult<AttributeMap> {
        Ok(self.attributes.clone())
    }

    fn slice_catalog(&self) -> ExportResult<Vec<String>> {
        Ok(self.slices.iter().map(|(name, _)| name.clone()).collect())
    }

    fn epoch_catalog(&self) -> ExportResult<Vec<String>> {
        Ok(self.epochs.clone())
    }

    fn read(&self, slice: Option<&str>) -> ExportResult<Raster> {
        match slice {
            None => Ok(self.slices[0].1.clone()),
            Some(name) => self
                .slices
                .iter()
                .find(|(candidate, _)| candidate == name)
                .map(|(_, data)| data.clone())
                .ok_or_else(|| ExportError::Resolution(format!("no slice {}", name))),
        }
    }
}

fn attrs(pairs: &[(&str, &str)]) -> AttributeMap {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

const WAVELENGTH: f64 = 0.0562; // C-band, meters
const RANGE2PHASE: f64 = -4.0 * std::f64::consts::PI / WAVELENGTH;

fn velocity_container() -> MockContainer {
    MockContainer {
        path: PathBuf::from("velocity.h5"),
        attributes: attrs(&[
            ("FILE_TYPE", "velocity"),
            ("WAVELENGTH", "0.0562"),
            ("WIDTH", "4"),
            ("LENGTH", "3"),
        ]),
        slices: vec![("velocity".to_string(), Array2::from_elem((3, 4), 0.01))],
        epochs: Vec::new(),
    }
}

fn timeseries_container(path: &str) -> MockContainer {
    let base = Array2::from_elem((3, 4), 0.002);
    let target = Array2::from_shape_fn((3, 4), |(i, j)| 0.002 + (i * 4 + j) as f32 * 0.001);
    MockContainer {
        path: PathBuf::from(path),
        attributes: attrs(&[
            ("FILE_TYPE", "timeseries"),
            ("WAVELENGTH", "0.0562"),
            ("REF_DATE", "20040101"),
            ("WIDTH", "4"),
            ("LENGTH", "3"),
        ]),
        slices: vec![
            ("20040101".to_string(), base),
            ("20041225".to_string(), Array2::from_elem((3, 4), 0.005)),
            ("20050601".to_string(), target),
        ],
        epochs: vec![
            "20040101".to_string(),
            "20041225".to_string(),
            "20050601".to_string(),
        ],
    }
}

fn stack_container(with_reference: bool) -> MockContainer {
    let mut pairs = vec![
        ("FILE_TYPE", "ifgramStack"),
        ("WAVELENGTH", "0.0562"),
        ("WIDTH", "820"),
        ("LENGTH", "650"),
    ];
    if with_reference {
        pairs.push(("REF_Y", "640"));
        pairs.push(("REF_X", "810"));
    }
    let phase = Array2::from_shape_fn((650, 820), |(i, j)| (i + j) as f32 * 0.1);
    MockContainer {
        path: PathBuf::from("inputs/ifgramStack.h5"),
        attributes: attrs(&pairs),
        slices: vec![
            ("unwrapPhase-20091225_20100723".to_string(), phase.clone()),
            ("coherence-20091225_20100723".to_string(), phase.mapv(|v| v.abs().min(1.0))),
            ("wrapPhase-20091225_20100723".to_string(), phase),
        ],
        epochs: Vec::new(),
    }
}

fn hdfeos_container() -> MockContainer {
    let disp1 = Array2::from_elem((3, 4), 0.010);
    let disp2 = Array2::from_elem((3, 4), 0.014);
    MockContainer {
        path: PathBuf::from("S1_IW12_128_0593_0597_20141213_20180619.he5"),
        attributes: attrs(&[
            ("FILE_TYPE", "HDFEOS"),
            ("WAVELENGTH", "0.0562"),
            ("REF_DATE", "20170904"),
            ("Y_FIRST", "33.2"),
            ("WIDTH", "4"),
            ("LENGTH", "3"),
        ]),
        slices: vec![
            ("displacement-20170904".to_string(), disp1),
            ("displacement-20170916".to_string(), disp2),
            ("temporalCoherence".to_string(), Array2::from_elem((3, 4), 0.9)),
            ("height".to_string(), Array2::from_elem((3, 4), 1204.0)),
        ],
        epochs: vec!["20141213".to_string(), "20180619".to_string()],
    }
}

#[test]
fn test_scenario_velocity_to_one_year_interferogram() {
    let container = velocity_container();
    let (data, atr, outfile) = convert(&container, &ConvertRequest::default()).unwrap();

    // 0.01 m/yr of range rate at C-band
    let expected = 0.01 * RANGE2PHASE as f32;
    assert!(expected < -2.2 && expected > -2.3);
    for value in data.iter() {
        assert_relative_eq!(*value, expected, epsilon = 1e-4);
    }

    assert_eq!(atr.get("FILE_TYPE").unwrap(), ".unw");
    assert_eq!(atr.get("UNIT").unwrap(), "radian");
    assert!(!atr.contains_key("DATE12"));
    assert_eq!(outfile, PathBuf::from("velocity.unw"));
}

#[test]
fn test_scenario_timeseries_single_date() {
    let container = timeseries_container("timeseries_ERA5_ramp_demErr.h5");
    let request = ConvertRequest {
        dset: Some("20050601".to_string()),
        ..Default::default()
    };
    let (data, atr, outfile) = convert(&container, &request).unwrap();

    // (target - base) scaled by the range-to-phase factor
    assert_relative_eq!(data[[0, 0]], 0.0, epsilon = 1e-5);
    assert_relative_eq!(
        data[[0, 1]],
        0.001 * RANGE2PHASE as f32,
        epsilon = 1e-4
    );

    assert_eq!(atr.get("DATE").unwrap(), "040101");
    assert_eq!(atr.get("DATE12").unwrap(), "040101-050601");
    assert_eq!(atr.get("FILE_TYPE").unwrap(), ".unw");
    assert_eq!(atr.get("UNIT").unwrap(), "radian");
    assert_eq!(outfile, PathBuf::from("20040101_20050601.unw"));
}

#[test]
fn test_timeseries_geo_prefix_carries_over() {
    let container = timeseries_container("geo_timeseries_ERA5_ramp_demErr.h5");
    let request = ConvertRequest {
        dset: Some("20050601".to_string()),
        ..Default::default()
    };
    let (_, _, outfile) = convert(&container, &request).unwrap();
    assert_eq!(outfile, PathBuf::from("geo_20040101_20050601.unw"));
}

#[test]
fn test_timeseries_defaults_to_last_date() {
    let container = timeseries_container("timeseries.h5");
    let (_, atr, outfile) = convert(&container, &ConvertRequest::default()).unwrap();

    assert_eq!(atr.get("DATE12").unwrap(), "040101-050601");
    assert_eq!(outfile, PathBuf::from("20040101_20050601.unw"));
}

#[test]
fn test_timeseries_differencing_is_antisymmetric() {
    let container = timeseries_container("timeseries.h5");

    let forward = ConvertRequest {
        dset: Some("20040101_20050601".to_string()),
        ..Default::default()
    };
    let backward = ConvertRequest {
        dset: Some("20050601_20040101".to_string()),
        ..Default::default()
    };

    let (data_fwd, _, _) = convert(&container, &forward).unwrap();
    let (data_bwd, _, _) = convert(&container, &backward).unwrap();

    for (a, b) in data_fwd.iter().zip(data_bwd.iter()) {
        assert_relative_eq!(*a, -*b, epsilon = 1e-5);
    }
}

#[test]
fn test_scenario_stack_zeroes_at_stored_reference() {
    let container = stack_container(true);
    let request = ConvertRequest {
        dset: Some("unwrapPhase-20091225_20100723".to_string()),
        ..Default::default()
    };
    let (data, atr, outfile) = convert(&container, &request).unwrap();

    let reference_value = (640 + 810) as f32 * 0.1;
    assert_relative_eq!(data[[640, 810]], 0.0);
    assert_relative_eq!(data[[0, 0]], -reference_value, epsilon = 1e-3);

    assert_eq!(atr.get("FILE_TYPE").unwrap(), ".unw");
    assert_eq!(atr.get("DATE").unwrap(), "091225");
    assert_eq!(atr.get("DATE12").unwrap(), "091225-100723");
    assert_eq!(outfile, PathBuf::from("20091225_20100723.unw"));
}

#[test]
fn test_stack_without_reference_passes_through() {
    let container = stack_container(false);
    let request = ConvertRequest {
        dset: Some("unwrapPhase-20091225_20100723".to_string()),
        ..Default::default()
    };
    let (data, _, _) = convert(&container, &request).unwrap();

    // reported as informational only, raster untouched
    assert_relative_eq!(data[[0, 0]], 0.0);
    assert_relative_eq!(data[[10, 10]], 2.0, epsilon = 1e-5);
}

#[test]
fn test_stack_caller_reference_wins_over_stored() {
    let container = stack_container(true);
    let request = ConvertRequest {
        dset: Some("unwrapPhase-20091225_20100723".to_string()),
        ref_pixel: Some(RefPixel { row: 10, col: 10 }),
        ..Default::default()
    };
    let (data, atr, _) = convert(&container, &request).unwrap();

    assert_eq!(atr.get("REF_Y").unwrap(), "10");
    assert_eq!(atr.get("REF_X").unwrap(), "10");
    assert_relative_eq!(data[[10, 10]], 0.0);
    assert!(data[[640, 810]] != 0.0);
}

#[test]
fn test_stack_coherence_and_wrapped_phase_kinds() {
    let container = stack_container(false);

    let request = ConvertRequest {
        dset: Some("coherence-20091225_20100723".to_string()),
        ..Default::default()
    };
    let (_, atr, outfile) = convert(&container, &request).unwrap();
    assert_eq!(atr.get("FILE_TYPE").unwrap(), ".cor");
    assert_eq!(atr.get("UNIT").unwrap(), "1");
    assert_eq!(outfile, PathBuf::from("20091225_20100723.cor"));

    let request = ConvertRequest {
        dset: Some("wrapPhase-20091225_20100723".to_string()),
        ..Default::default()
    };
    let (_, atr, outfile) = convert(&container, &request).unwrap();
    assert_eq!(atr.get("FILE_TYPE").unwrap(), ".int");
    assert_eq!(outfile, PathBuf::from("20091225_20100723.int"));
}

#[test]
fn test_stack_requires_dataset_token() {
    let container = stack_container(false);
    let result = convert(&container, &ConvertRequest::default());
    assert!(matches!(result, Err(ExportError::MissingInput(_))));
}

#[test]
fn test_scenario_hdfeos_displacement_pair() {
    let container = hdfeos_container();
    let request = ConvertRequest {
        dset: Some("displacement-20170904_20170916".to_string()),
        ..Default::default()
    };
    let (data, atr, outfile) = convert(&container, &request).unwrap();

    // 4 mm of displacement between the two epochs
    let expected = 0.004 * RANGE2PHASE as f32;
    for value in data.iter() {
        assert_relative_eq!(*value, expected, epsilon = 1e-4);
    }

    assert_eq!(atr.get("DATE12").unwrap(), "170904-170916");
    assert_eq!(outfile, PathBuf::from("20170904_20170916.unw"));
}

#[test]
fn test_hdfeos_displacement_single_date_uses_ref_date() {
    let container = hdfeos_container();
    let request = ConvertRequest {
        dset: Some("displacement-20170916".to_string()),
        ..Default::default()
    };
    let (_, atr, _) = convert(&container, &request).unwrap();
    assert_eq!(atr.get("DATE12").unwrap(), "170904-170916");
}

#[test]
fn test_scenario_hdfeos_displacement_requires_suffix() {
    let container = hdfeos_container();
    let request = ConvertRequest {
        dset: Some("displacement".to_string()),
        ..Default::default()
    };
    let result = convert(&container, &request);
    assert!(matches!(result, Err(ExportError::InvalidRequest(_))));
}

#[test]
fn test_scenario_hdfeos_height_to_dem() {
    let container = hdfeos_container();
    let request = ConvertRequest {
        dset: Some("height".to_string()),
        ..Default::default()
    };
    let (data, atr, outfile) = convert(&container, &request).unwrap();

    assert_relative_eq!(data[[0, 0]], 1204.0);
    assert_eq!(atr.get("FILE_TYPE").unwrap(), ".dem");
    assert_eq!(atr.get("DATA_TYPE").unwrap(), "int16");
    // whole-container epoch span drives the date fields
    assert_eq!(atr.get("DATE12").unwrap(), "141213-180619");
    assert_eq!(outfile, PathBuf::from("20141213_20180619.dem"));
}

#[test]
fn test_hdfeos_coherence_by_prefix() {
    let container = hdfeos_container();
    let request = ConvertRequest {
        dset: Some("temporalCoherence".to_string()),
        ..Default::default()
    };
    let (_, atr, outfile) = convert(&container, &request).unwrap();

    assert_eq!(atr.get("FILE_TYPE").unwrap(), ".cor");
    assert_eq!(atr.get("UNIT").unwrap(), "1");
    assert_eq!(outfile, PathBuf::from("20141213_20180619.cor"));
}

#[test]
fn test_hdfeos_requires_dataset_token() {
    let container = hdfeos_container();
    let result = convert(&container, &ConvertRequest::default());
    assert!(matches!(result, Err(ExportError::MissingInput(_))));
}

#[test]
fn test_scenario_generic_mask() {
    let container = MockContainer {
        path: PathBuf::from("maskTempCoh.h5"),
        attributes: attrs(&[
            ("FILE_TYPE", "mask"),
            ("WIDTH", "4"),
            ("LENGTH", "3"),
        ]),
        slices: vec![("mask".to_string(), Array2::from_elem((3, 4), 1.0))],
        epochs: Vec::new(),
    };
    let (_, atr, outfile) = convert(&container, &ConvertRequest::default()).unwrap();

    assert_eq!(atr.get("FILE_TYPE").unwrap(), ".msk");
    assert_eq!(atr.get("DATA_TYPE").unwrap(), "byte");
    assert!(!atr.contains_key("DATE"));
    assert!(!atr.contains_key("DATE12"));
    assert_eq!(outfile, PathBuf::from("maskTempCoh.msk"));
}

#[test]
fn test_generic_temporal_coherence() {
    let container = MockContainer {
        path: PathBuf::from("temporalCoherence.h5"),
        attributes: attrs(&[
            ("FILE_TYPE", "temporalCoherence"),
            ("WIDTH", "4"),
            ("LENGTH", "3"),
        ]),
        slices: vec![("temporalCoherence".to_string(), Array2::from_elem((3, 4), 0.8))],
        epochs: Vec::new(),
    };
    let (_, atr, outfile) = convert(&container, &ConvertRequest::default()).unwrap();

    assert_eq!(atr.get("FILE_TYPE").unwrap(), ".cor");
    assert_eq!(outfile, PathBuf::from("temporalCoherence.cor"));
}

#[test]
fn test_generic_radar_height_keeps_float() {
    let container = MockContainer {
        path: PathBuf::from("geometryRadar.h5"),
        attributes: attrs(&[
            ("FILE_TYPE", "geometry"),
            ("WIDTH", "4"),
            ("LENGTH", "3"),
        ]),
        slices: vec![("height".to_string(), Array2::from_elem((3, 4), 1204.0))],
        epochs: Vec::new(),
    };
    let request = ConvertRequest {
        dset: Some("height".to_string()),
        ..Default::default()
    };
    let (_, atr, outfile) = convert(&container, &request).unwrap();

    assert_eq!(atr.get("FILE_TYPE").unwrap(), ".hgt");
    assert_eq!(atr.get("UNIT").unwrap(), "m");
    assert!(!atr.contains_key("DATA_TYPE"));
    assert_eq!(outfile, PathBuf::from("geometryRadar.hgt"));
}

#[test]
fn test_generic_fallback_vs_strict() {
    let container = MockContainer {
        path: PathBuf::from("temporalDerivative.h5"),
        attributes: attrs(&[
            ("FILE_TYPE", "temporalDerivative"),
            ("WIDTH", "4"),
            ("LENGTH", "3"),
        ]),
        slices: vec![("temporalDerivative".to_string(), Array2::from_elem((3, 4), 0.5))],
        epochs: Vec::new(),
    };

    let (_, atr, _) = convert(&container, &ConvertRequest::default()).unwrap();
    assert_eq!(atr.get("FILE_TYPE").unwrap(), ".unw");

    let strict = ConvertRequest {
        strict: true,
        ..Default::default()
    };
    let result = convert(&container, &strict);
    assert!(matches!(result, Err(ExportError::UnsupportedProduct(_))));
}

#[test]
fn test_caller_reference_is_recorded_and_applied() {
    let container = velocity_container();
    let request = ConvertRequest {
        ref_pixel: Some(RefPixel { row: 1, col: 2 }),
        ..Default::default()
    };
    let (data, atr, _) = convert(&container, &request).unwrap();

    assert_eq!(atr.get("REF_Y").unwrap(), "1");
    assert_eq!(atr.get("REF_X").unwrap(), "2");
    // constant input, so referencing zeroes everything
    for value in data.iter() {
        assert_relative_eq!(*value, 0.0);
    }
}

#[test]
fn test_full_pipeline_sanitized_output() {
    let container = timeseries_container("timeseries.h5");
    let request = ConvertRequest {
        dset: Some("20050601".to_string()),
        ..Default::default()
    };
    let (_, atr, _) = convert(&container, &request).unwrap();
    let atr = metadata::sanitize(atr).unwrap();

    assert_eq!(atr.get("FILE_LENGTH").unwrap(), "3");
    assert_eq!(atr.get("WIDTH").unwrap(), "4");
    assert_eq!(atr.get("PROCESSOR").unwrap(), "roipac");
    assert!(!atr.contains_key("LENGTH"));
    for key in atr.keys() {
        assert!(!key.chars().any(|c| c.is_lowercase()));
    }
}
