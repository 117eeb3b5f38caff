//! Report output
//!
//! This module renders an attribution in the supported formats:
//! - `report`: the plain-text table written to stdout
//! - `json`: a machine-readable document for `--export`

pub mod json;
pub mod report;

pub use json::{FunctionRecord, JsonExporter, ProfileDocument};
pub use report::{ReportConfig, TextReport};
