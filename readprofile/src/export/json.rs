//! JSON export of an attribution
//!
//! The document mirrors the text report in machine-readable form:
//!
//! ```json
//! {
//!   "step": 4,
//!   "base": "0xffffffff81000000",
//!   "functions": [
//!     { "name": "foo", "address": "0xffffffff81000004", "length": 16, "ticks": 8, "rate": 0.5 }
//!   ],
//!   "unknown": 0,
//!   "total": 8,
//!   "rate": 0.4
//! }
//! ```

use crate::analysis::{RangeSamples, RangeSink, Summary};
use crate::domain::{Address, ProfileError};
use crate::symbolization::demangle_symbol;
use serde::{Deserialize, Serialize};
use std::io::Write;

/// One function line of the report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionRecord {
    pub name: String,
    /// Start address, `0x`-prefixed hex
    pub address: String,
    pub length: u64,
    pub ticks: u64,
    pub rate: f64,
}

/// Complete exported attribution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileDocument {
    pub step: u32,
    pub base: String,
    pub functions: Vec<FunctionRecord>,
    pub unknown: u32,
    pub total: u64,
    pub rate: f64,
}

fn hex(addr: Address) -> String {
    format!("{addr:#x}")
}

/// Collects function records while the attribution runs
#[derive(Debug, Default)]
pub struct JsonExporter {
    include_zero: bool,
    functions: Vec<FunctionRecord>,
}

impl JsonExporter {
    /// `include_zero` keeps functions without ticks, like `--all`
    #[must_use]
    pub fn new(include_zero: bool) -> Self {
        Self { include_zero, functions: Vec::new() }
    }

    /// Combine the collected functions with the run's totals
    #[must_use]
    pub fn into_document(self, summary: &Summary) -> ProfileDocument {
        ProfileDocument {
            step: summary.step,
            base: hex(summary.base),
            functions: self.functions,
            unknown: summary.unknown,
            total: summary.total_ticks,
            rate: summary.rate(),
        }
    }
}

impl RangeSink for JsonExporter {
    fn record(&mut self, range: &RangeSamples<'_>) -> Result<(), ProfileError> {
        if range.length() == 0 || (range.ticks == 0 && !self.include_zero) {
            return Ok(());
        }
        self.functions.push(FunctionRecord {
            name: demangle_symbol(range.name).into_owned(),
            address: hex(range.start),
            length: range.length(),
            ticks: range.ticks,
            rate: range.rate(),
        });
        Ok(())
    }
}

impl ProfileDocument {
    /// Write the document as pretty-printed JSON
    ///
    /// # Errors
    /// Returns an error if serialization or writing fails
    pub fn export<W: Write>(&self, mut writer: W) -> Result<(), ProfileError> {
        serde_json::to_writer_pretty(&mut writer, self)?;
        writeln!(writer)?;
        writer.flush()?;
        Ok(())
    }
}
