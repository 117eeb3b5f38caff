//! # readprofile - Kernel Profile Attribution
//!
//! Reads a snapshot of the kernel's built-in sampling profiler
//! (`/proc/profile`, enabled with the `profile=` boot parameter) and a kernel
//! symbol map, and reports how many clock ticks landed in each kernel
//! function. Only the two files are needed: a snapshot copied off another
//! machine can be analyzed anywhere.
//!
//! ## Architecture Overview
//!
//! ```text
//!  /proc/profile                         System.map[.gz]
//!        │                                      │
//!        ▼                                      ▼
//! ┌──────────────┐                     ┌─────────────────┐
//! │  profiling   │                     │  symbolization  │
//! │ SampleBuffer │                     │ SymbolMapReader │
//! │ (byte order) │                     │ (zcat, lazily)  │
//! └──────┬───────┘                     └────────┬────────┘
//!        │ bins                         entries │
//!        └──────────────►┌──────────┐◄──────────┘
//!                        │ analysis │  bin cursor, one range per symbol
//!                        └────┬─────┘
//!                             │ closed ranges
//!                             ▼
//!                        ┌──────────┐
//!                        │  export  │  text report, JSON
//!                        └──────────┘
//! ```
//!
//! Both inputs are consumed strictly forward, one range at a time.
//!
//! ## Module Structure
//!
//! - [`profiling`]: snapshot loading, byte-order detection, device reset
//! - [`symbolization`]: symbol map sources and parsing
//! - [`analysis`]: bin-to-function attribution
//! - [`export`]: text report and JSON export
//! - [`cli`]: command-line arguments
//! - [`domain`]: shared types and errors
//! - [`preflight`]: privilege and kernel release queries
//!
//! ## Typical Usage
//!
//! ```bash
//! # Top kernel functions by ticks
//! readprofile | sort -nr | head -20
//!
//! # Analyze a saved snapshot
//! readprofile -p profile.bin -m System.map-6.1.0
//!
//! # Reset counters before a benchmark
//! sudo readprofile -r
//! ```

// Expose modules for testing
pub mod analysis;
pub mod cli;
pub mod domain;
pub mod export;
pub mod preflight;
pub mod profiling;
pub mod symbolization;
