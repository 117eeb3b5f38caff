//! Text report in the classic `readprofile` layout
//!
//! ```text
//!      8 foo                                        0.5000
//!      0 *unknown*
//!      8 total                                      0.4000
//! ```
//!
//! Columns are ticks, function name, and ticks per byte of the function.

use crate::analysis::{RangeSamples, RangeSink, Summary};
use crate::domain::{Address, ProfileError};
use crate::symbolization::demangle_symbol;
use std::io::Write;

const UNKNOWN_LABEL: &str = "*unknown*";
const TOTAL_LABEL: &str = "total";

/// Output switches, fixed for the whole run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReportConfig {
    /// Print start addresses and widen the layout
    pub verbose: bool,
    /// Include functions (or bins) with zero ticks
    pub all: bool,
    /// One line per histogram bin instead of per function
    pub histogram: bool,
    /// Per-bin counters under each function line
    pub sub_counters: bool,
}

/// Streams the text report into `out` as ranges close
pub struct TextReport<W> {
    out: W,
    config: ReportConfig,
}

impl<W: Write> TextReport<W> {
    pub fn new(out: W, config: ReportConfig) -> Self {
        Self { out, config }
    }

    /// Write the `*unknown*` bucket and the total line
    ///
    /// # Errors
    /// Returns an error if writing fails
    pub fn finish(&mut self, summary: &Summary) -> Result<(), ProfileError> {
        writeln!(self.out, "{:6} {UNKNOWN_LABEL}", summary.unknown)?;
        if self.config.verbose {
            writeln!(
                self.out,
                "{} {TOTAL_LABEL:<40} {:6} {:8.4}",
                Address(0),
                summary.total_ticks,
                summary.rate()
            )?;
        } else {
            writeln!(self.out, "{:6} {TOTAL_LABEL:<40} {:8.4}", summary.total_ticks, summary.rate())?;
        }
        self.out.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_histogram(&mut self, range: &RangeSamples<'_>, name: &str) -> Result<(), ProfileError> {
        let mut header_printed = false;
        for (addr, count) in range.bins() {
            if count == 0 && !self.config.all {
                continue;
            }
            if !header_printed {
                writeln!(self.out, "{name}:")?;
                header_printed = true;
            }
            writeln!(self.out, "\t{addr:x}\t{count}")?;
        }
        if self.config.verbose || range.ticks > 0 {
            writeln!(self.out, "  total\t\t\t\t{}", range.ticks)?;
        }
        Ok(())
    }

    fn write_function(&mut self, range: &RangeSamples<'_>, name: &str) -> Result<(), ProfileError> {
        if self.config.verbose {
            writeln!(self.out, "{} {name:<40} {:6} {:8.4}", range.start, range.ticks, range.rate())?;
        } else {
            writeln!(self.out, "{:6} {name:<40} {:8.4}", range.ticks, range.rate())?;
        }

        if self.config.sub_counters {
            for (addr, count) in range.bins() {
                writeln!(self.out, "\t{addr:#x}\t{name}{}\t{count}", signed_offset(addr, range.start))?;
            }
        }
        Ok(())
    }
}

/// `+0x10` / `-0x4` label of `addr` relative to `start`
fn signed_offset(addr: Address, start: Address) -> String {
    if addr >= start {
        format!("+{:#x}", addr.0 - start.0)
    } else {
        format!("-{:#x}", start.0 - addr.0)
    }
}

impl<W: Write> RangeSink for TextReport<W> {
    fn record(&mut self, range: &RangeSamples<'_>) -> Result<(), ProfileError> {
        let name = demangle_symbol(range.name);
        if self.config.histogram {
            return self.write_histogram(range, &name);
        }
        if (range.ticks > 0 || self.config.all) && range.length() > 0 {
            self.write_function(range, &name)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{attribute, AbsoluteSymbolPolicy};
    use crate::profiling::{LoadOptions, SampleBuffer};
    use crate::symbolization::SymbolMapReader;
    use std::io::Cursor;

    const MAP: &str = "00001000 T _stext\n00001004 T foo\n00001014 T _etext\n00001020 D data\n";

    fn render(elements: &[u32], map: &str, config: ReportConfig) -> String {
        let buffer =
            SampleBuffer::from_elements(elements.to_vec(), LoadOptions::default()).unwrap();
        let mut symbols = SymbolMapReader::new(Cursor::new(map.as_bytes().to_vec()), "map");
        let start = symbols.find_text_start().unwrap();
        let mut report = TextReport::new(Vec::new(), config);
        let summary =
            attribute(&buffer, start, &mut symbols, AbsoluteSymbolPolicy::default(), &mut report)
                .unwrap();
        report.finish(&summary).unwrap();
        String::from_utf8(report.into_inner()).unwrap()
    }

    #[test]
    fn test_default_report() {
        let out = render(&[4, 0, 0, 5, 3, 0], MAP, ReportConfig::default());
        let expected = format!(
            "{:6} {:<40} {:8.4}\n{:6} *unknown*\n{:6} {:<40} {:8.4}\n",
            8, "foo", 0.5, 0, 8, "total", 0.4
        );
        assert_eq!(out, expected);
    }

    #[test]
    fn test_all_includes_zero_tick_functions() {
        let out = render(&[4, 0, 0, 5, 3, 0], MAP, ReportConfig { all: true, ..Default::default() });
        let first = out.lines().next().unwrap();
        assert_eq!(first, format!("{:6} {:<40} {:8.4}", 0, "_stext", 0.0));
    }

    #[test]
    fn test_all_still_skips_zero_length_ranges() {
        let map = "00001000 T _stext\n00001004 T alias\n00001004 T foo\n00001014 T _etext\n";
        let out = render(&[4, 0, 0, 5, 3, 0], map, ReportConfig { all: true, ..Default::default() });
        assert!(!out.contains("alias"));
        assert!(out.lines().any(|l| l == format!("{:6} {:<40} {:8.4}", 0, "_stext", 0.0)));
        assert!(out.lines().any(|l| l.starts_with(&format!("{:6} foo ", 8))));
    }

    #[test]
    fn test_verbose_report() {
        let out =
            render(&[4, 0, 0, 5, 3, 0], MAP, ReportConfig { verbose: true, ..Default::default() });
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines[0], format!("0000000000001004 {:<40} {:6} {:8.4}", "foo", 8, 0.5));
        assert_eq!(lines[2], format!("0000000000000000 {:<40} {:6} {:8.4}", "total", 8, 0.4));
    }

    #[test]
    fn test_histogram_report() {
        let out = render(
            &[4, 0, 0, 5, 3, 0],
            MAP,
            ReportConfig { histogram: true, ..Default::default() },
        );
        assert_eq!(
            out.lines().take(4).collect::<Vec<_>>(),
            vec!["foo:", "\t1008\t5", "\t100c\t3", "  total\t\t\t\t8"]
        );
    }

    #[test]
    fn test_histogram_all_prints_empty_bins() {
        let out = render(
            &[4, 0, 0, 5, 3, 0],
            MAP,
            ReportConfig { histogram: true, all: true, ..Default::default() },
        );
        assert_eq!(
            out.lines().take(6).collect::<Vec<_>>(),
            vec!["foo:", "\t1000\t0", "\t1004\t0", "\t1008\t5", "\t100c\t3", "  total\t\t\t\t8"]
        );
    }

    #[test]
    fn test_histogram_verbose_totals_silent_functions() {
        let out = render(
            &[4, 0, 0, 5, 3, 0],
            MAP,
            ReportConfig { histogram: true, verbose: true, ..Default::default() },
        );
        let lines: Vec<_> = out.lines().collect();
        // _stext owns no bins: no header, but its total is still printed
        assert!(!lines.contains(&"_stext:"));
        assert_eq!(lines[0], "  total\t\t\t\t0");
        assert_eq!(lines[1], "foo:");
        assert!(lines.contains(&"  total\t\t\t\t8"));
    }

    #[test]
    fn test_histogram_ignores_sub_counters() {
        let out = render(
            &[4, 2, 0, 5, 3, 0],
            MAP,
            ReportConfig { histogram: true, sub_counters: true, ..Default::default() },
        );
        assert!(!out.lines().any(|l| l.starts_with("\t0x")));
        assert!(out.lines().any(|l| l == "foo:"));
    }

    #[test]
    fn test_sub_counters_sum_to_function_total() {
        let out = render(
            &[4, 2, 0, 5, 3, 0],
            MAP,
            ReportConfig { sub_counters: true, ..Default::default() },
        );
        let lines: Vec<_> = out.lines().collect();
        // The first bin foo owns starts one step below foo
        assert!(lines.contains(&"\t0x1000\tfoo-0x4\t2"));
        assert!(lines.contains(&"\t0x1004\tfoo+0x0\t0"));
        assert!(lines.contains(&"\t0x1008\tfoo+0x4\t5"));

        let foo_counters: u64 = lines
            .iter()
            .filter(|l| l.starts_with('\t') && l.contains("\tfoo"))
            .map(|l| l.rsplit('\t').next().unwrap().parse::<u64>().unwrap())
            .sum();
        assert_eq!(foo_counters, 10);
        assert!(lines[0].starts_with(&format!("{:6} foo ", 10)));
    }

    #[test]
    fn test_zero_step_prints_no_sub_counters() {
        let out = render(
            &[0, 4, 4, 4],
            MAP,
            ReportConfig { sub_counters: true, all: true, ..Default::default() },
        );
        assert!(!out.lines().any(|l| l.starts_with('\t')));
        assert!(out.contains("foo"));
    }

    #[test]
    fn test_signed_offset() {
        assert_eq!(signed_offset(Address(0x1010), Address(0x1000)), "+0x10");
        assert_eq!(signed_offset(Address(0x0ffc), Address(0x1000)), "-0x4");
    }
}
