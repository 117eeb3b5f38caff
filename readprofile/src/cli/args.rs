//! CLI argument definitions

use crate::analysis::AbsoluteSymbolPolicy;
use crate::export::ReportConfig;
use crate::profiling::{DeviceWrite, LoadOptions, DEFAULT_PROFILE};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "readprofile",
    version,
    about = "Display kernel profiling information",
    after_help = "\
EXAMPLES:
    readprofile                                  Report /proc/profile against /boot/System.map
    readprofile -m System.map.gz -p profile.bin  Read a saved snapshot with a compressed map
    readprofile -s | grep __d_lookup             Per-instruction counters of one function
    sudo readprofile -r                          Reset all counters"
)]
pub struct Args {
    /// Symbol map (defaults: /boot/System.map, then /boot/System.map-<release>)
    #[arg(short, long, value_name = "MAPFILE")]
    pub mapfile: Option<PathBuf>,

    /// Profiling snapshot to read
    #[arg(short, long, value_name = "PRO-FILE", default_value = DEFAULT_PROFILE)]
    pub profile: PathBuf,

    /// Device written by --reset and --multiplier
    #[arg(long, value_name = "DEVICE", default_value = DEFAULT_PROFILE, hide = true)]
    pub device: PathBuf,

    /// Set the profiling multiplier to MULT (root only)
    #[arg(short = 'M', long, value_name = "MULT")]
    pub multiplier: Option<i32>,

    /// Print only info about the sampling step
    #[arg(short, long)]
    pub info: bool,

    /// Print verbose data
    #[arg(short, long)]
    pub verbose: bool,

    /// Print all symbols, even if count is 0
    #[arg(short, long)]
    pub all: bool,

    /// Print individual histogram-bin counts
    #[arg(short = 'b', long)]
    pub histbin: bool,

    /// Print individual counters within functions
    #[arg(short = 's', long)]
    pub counters: bool,

    /// Reset all the counters (root only)
    #[arg(short, long)]
    pub reset: bool,

    /// Disable byte order auto-detection
    #[arg(short = 'n', long)]
    pub no_auto: bool,

    /// Handling of absolute symbols found inside the kernel text
    #[arg(long, value_enum, value_name = "POLICY", default_value_t = AbsoluteSymbolPolicy::SkipLeading)]
    pub absolute_symbols: AbsoluteSymbolPolicy,

    /// Also write the attribution as JSON to FILE
    #[arg(long, value_name = "FILE")]
    pub export: Option<PathBuf>,
}

impl Args {
    /// Administrative write requested on the command line, if any
    ///
    /// A multiplier takes precedence over a plain reset.
    #[must_use]
    pub fn device_write(&self) -> Option<DeviceWrite> {
        match (self.multiplier, self.reset) {
            (Some(mult), _) => Some(DeviceWrite::Multiplier(mult)),
            (None, true) => Some(DeviceWrite::Reset),
            (None, false) => None,
        }
    }

    #[must_use]
    pub fn load_options(&self) -> LoadOptions {
        LoadOptions { detect_byte_order: !self.no_auto }
    }

    #[must_use]
    pub fn report_config(&self) -> ReportConfig {
        ReportConfig {
            verbose: self.verbose,
            all: self.all,
            histogram: self.histbin,
            sub_counters: self.counters,
        }
    }
}
