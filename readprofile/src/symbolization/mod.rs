//! # Symbol Maps and Address Ranges
//!
//! The profiling buffer only knows bin indices. Turning them into function
//! names needs the kernel's link map (`System.map`), which lists every symbol
//! as `<address> <type> <name>` in ascending address order.
//!
//! ## Map Layout
//!
//! ```text
//! c0100000 T _stext          <- base: bin 1 starts here
//! c0100000 T startup_32
//! c01000a0 t do_early_param
//! ...
//! c02ff000 T _etext          <- the kernel only profiles up to here
//! c0300000 D init_task       <- data: never profiled
//! ```
//!
//! A function's range runs from its own address to the next symbol's, so the
//! ranges are contiguous and never overlap.
//!
//! ## Locating the Map
//!
//! Without an explicit `--mapfile`, `/boot/System.map` is tried first, then
//! `/boot/System.map-<release>` for the running kernel. Maps ending in `.gz`
//! are decompressed through `zcat` on the fly.
//!
//! ## Module Structure
//!
//! - **`source`**: plain-file vs. decompressor byte source
//! - **`symbol_map`**: line parsing, sentinels, and the streaming reader

pub mod source;
pub mod symbol_map;

pub use source::{is_compressed, MapSource};
pub use symbol_map::{demangle_symbol, SymbolEntry, SymbolMapReader};

use crate::domain::ProfileError;
use crate::preflight::kernel_release;
use log::{info, warn};
use std::path::{Path, PathBuf};

/// Default symbol map location
pub const DEFAULT_MAP: &str = "/boot/System.map";

/// Prefix of the per-release fallback map
pub const BOOT_MAP_PREFIX: &str = "/boot/System.map-";

/// Per-release map path for the running kernel
#[must_use]
pub fn boot_map_for_running_kernel() -> Option<PathBuf> {
    kernel_release().map(|release| PathBuf::from(format!("{BOOT_MAP_PREFIX}{release}")))
}

/// Open the symbol map
///
/// An explicit path is used as-is. Otherwise [`DEFAULT_MAP`] is tried, then
/// the map for the running kernel release.
///
/// # Errors
/// Returns the error for the last path tried when no map could be opened
pub fn open_symbol_map(explicit: Option<&Path>) -> Result<(PathBuf, MapSource), ProfileError> {
    if let Some(path) = explicit {
        return MapSource::open(path).map(|source| (path.to_path_buf(), source));
    }

    let default = PathBuf::from(DEFAULT_MAP);
    match MapSource::open(&default) {
        Ok(source) => Ok((default, source)),
        Err(e) => {
            let Some(fallback) = boot_map_for_running_kernel() else {
                return Err(e);
            };
            warn!("{e}, trying {}", fallback.display());
            let source = MapSource::open(&fallback)?;
            info!("Using symbol map {}", fallback.display());
            Ok((fallback, source))
        }
    }
}
