//! Analysis logic for profiling data
//!
//! This module contains the attribution engine that turns a profiling buffer
//! and a symbol map into per-function tick counts, separated from the report
//! formatting in [`crate::export`].

pub mod attributor;

pub use attributor::{
    attribute, bin_address, AbsoluteSymbolPolicy, BinCursor, RangeSamples, RangeSink, Summary,
};
