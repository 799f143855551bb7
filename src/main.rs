//! Command-line entry point: convert one product file to ROI_PAC format.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use roipac_export::core::dispatch::{convert, ConvertRequest};
use roipac_export::core::metadata;
use roipac_export::io::container::GdalContainer;
use roipac_export::io::roipac;
use roipac_export::types::RefPixel;

const EXAMPLE: &str = "\
examples:
  # unwrapped phase
  save-roipac velocity.h5
  save-roipac timeseries_ERA5_ramp_demErr.h5            # use the last date
  save-roipac timeseries_ERA5_ramp_demErr.h5 20050601
  save-roipac timeseries_ERA5_ramp_demErr.h5 20040728_20050601
  save-roipac S1_IW12_128_0593_0597_20141213_20180619.he5 displacement-20170904_20170916
  save-roipac inputs/ifgramStack.h5 unwrapPhase-20091225_20100723 --ref-yx 640 810

  # coherence
  save-roipac inputs/ifgramStack.h5 coherence-20091225_20100723
  save-roipac temporalCoherence.h5

  # DEM
  save-roipac geo_geometryRadar.h5 height -o srtm1.dem
";

#[derive(Parser, Debug)]
#[command(
    name = "save-roipac",
    about = "Convert a time-series analysis product to ROI_PAC format",
    after_help = EXAMPLE
)]
struct Cli {
    /// Input product file
    file: PathBuf,

    /// date/date12 of time-series, or dataset-date12 of interferograms
    dset: Option<String>,

    /// Output file name
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Custom reference pixel in y/x
    #[arg(long = "ref-yx", num_args = 2, value_names = ["Y", "X"])]
    ref_yx: Option<Vec<usize>>,

    /// Fail on file types without a defined ROI_PAC counterpart
    #[arg(long)]
    strict: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let request = ConvertRequest {
        dset: cli.dset,
        outfile: cli.output,
        ref_pixel: cli
            .ref_yx
            .as_deref()
            .map(|yx| RefPixel { row: yx[0], col: yx[1] }),
        strict: cli.strict,
    };

    let container = GdalContainer::new(&cli.file)?;
    let (data, atr, outfile) = convert(&container, &request)?;
    let atr = metadata::sanitize(atr)?;
    roipac::write(&data, &atr, &outfile)?;

    println!("{}", outfile.display());
    Ok(())
}
