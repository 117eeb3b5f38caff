//! Sample-to-symbol attribution.
//!
//! Walks the symbol map and the profiling buffer side by side. Both only move
//! forward: each text symbol closes the range opened by the previous one, and
//! the range takes every bin between the cursor and the bin of its end
//! address.
//!
//! # Bin Addressing
//!
//! ```text
//! element:   0      1        2         3        ...   N-1
//!          step   base   base+step  base+2step        catch-all
//! ```
//!
//! Element `i` (for `i >= 1`) holds ticks for the address `base + (i-1)*step`.
//! A range `[fn, next)` owns the bins from the cursor up to, not including,
//! `(next - base) / step`. The last element is never handed to a range: it
//! collects everything the kernel could not place inside its text, and is
//! reported separately as `*unknown*`.
//!
//! # Output
//!
//! Ranges are handed to a [`RangeSink`] as soon as they close, so neither the
//! map nor the per-function results are ever collected in full here.

// Rates intentionally convert tick counts to f64
#![allow(clippy::cast_precision_loss)]

use crate::domain::{Address, ProfileError};
use crate::profiling::SampleBuffer;
use crate::symbolization::SymbolEntry;
use log::{debug, trace};

/// Symbol marking the end of init memory, placed before `.text` on some
/// architectures
const INIT_END: &str = "__init_end";

// =============================================================================
// POLICY
// =============================================================================

/// What to do with absolute (`A`) and unknown (`?`) symbols inside the text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum AbsoluteSymbolPolicy {
    /// Skip them while no ticks have been attributed yet, and always skip
    /// `__init_end`; later ones end the text like any non-text symbol
    #[default]
    SkipLeading,
    /// Never skip; any absolute symbol ends the text
    Strict,
}

impl AbsoluteSymbolPolicy {
    fn skips(self, entry: &SymbolEntry, total_ticks: u64) -> bool {
        match self {
            AbsoluteSymbolPolicy::SkipLeading => {
                entry.kind.is_absolute() && (total_ticks == 0 || entry.name == INIT_END)
            }
            AbsoluteSymbolPolicy::Strict => false,
        }
    }
}

// =============================================================================
// BIN CURSOR
// =============================================================================

/// Monotone cursor over the tick bins of a [`SampleBuffer`]
///
/// Starts at element 1 and never reaches the final catch-all element.
#[derive(Debug)]
pub struct BinCursor<'a> {
    elements: &'a [u32],
    index: usize,
}

impl<'a> BinCursor<'a> {
    #[must_use]
    pub fn new(buffer: &'a SampleBuffer) -> Self {
        Self { elements: buffer.elements(), index: 1 }
    }

    /// Next element the cursor will hand out
    #[must_use]
    pub fn position(&self) -> usize {
        self.index
    }

    /// Take every bin up to (not including) `end`
    ///
    /// Returns the index of the first bin taken and the bins themselves. An
    /// `end` at or behind the cursor takes nothing.
    ///
    /// # Errors
    /// Returns `AddressOutOfRange` if `end` lies past the final element
    pub fn advance_to(&mut self, end: usize) -> Result<(usize, &'a [u32]), ProfileError> {
        let limit = self.elements.len() - 1;
        if end > limit {
            return Err(ProfileError::AddressOutOfRange { index: end, bins: self.elements.len() });
        }
        let first = self.index;
        if end <= first {
            return Ok((first, &[]));
        }
        self.index = end;
        Ok((first, &self.elements[first..end]))
    }
}

// =============================================================================
// RANGE SAMPLES (OUTPUT TYPE)
// =============================================================================

/// One closed function range and the bins it owns
#[derive(Debug, Clone, Copy)]
pub struct RangeSamples<'a> {
    pub name: &'a str,
    /// Function address (range start)
    pub start: Address,
    /// Next symbol's address (range end, exclusive)
    pub end: Address,
    /// Buffer index of `counts[0]`
    pub first_bin: usize,
    pub counts: &'a [u32],
    pub ticks: u64,
    step: u32,
    base: Address,
}

impl RangeSamples<'_> {
    /// Bytes between this symbol and the next
    #[must_use]
    pub fn length(&self) -> u64 {
        self.end.offset_from(self.start)
    }

    /// Ticks per byte, 0 for an empty range
    #[must_use]
    pub fn rate(&self) -> f64 {
        match self.length() {
            0 => 0.0,
            len => self.ticks as f64 / len as f64,
        }
    }

    /// Owned bins as `(bin address, ticks)`
    pub fn bins(&self) -> impl Iterator<Item = (Address, u32)> + '_ {
        self.counts.iter().enumerate().map(move |(i, &count)| {
            (bin_address(self.first_bin + i, self.step, self.base), count)
        })
    }
}

/// Start address of buffer element `index` (element 1 starts at `base`)
#[must_use]
pub fn bin_address(index: usize, step: u32, base: Address) -> Address {
    let offset = (index as u64).saturating_sub(1) * u64::from(step);
    Address(base.0.wrapping_add(offset))
}

/// Bin index a range ending at `end` stops before
fn end_index(end: Address, step: u32, base: Address) -> usize {
    if step == 0 {
        return 0;
    }
    usize::try_from(end.offset_from(base) / u64::from(step)).unwrap_or(usize::MAX)
}

// =============================================================================
// SINKS
// =============================================================================

/// Consumer of closed ranges, in address order
pub trait RangeSink {
    /// Called once per closed range, zero-length ones included
    ///
    /// # Errors
    /// Returns an error if the sink cannot record the range
    fn record(&mut self, range: &RangeSamples<'_>) -> Result<(), ProfileError>;
}

impl<S: RangeSink + ?Sized> RangeSink for &mut S {
    fn record(&mut self, range: &RangeSamples<'_>) -> Result<(), ProfileError> {
        (**self).record(range)
    }
}

impl<S: RangeSink> RangeSink for Option<S> {
    fn record(&mut self, range: &RangeSamples<'_>) -> Result<(), ProfileError> {
        match self {
            Some(sink) => sink.record(range),
            None => Ok(()),
        }
    }
}

impl<A: RangeSink, B: RangeSink> RangeSink for (A, B) {
    fn record(&mut self, range: &RangeSamples<'_>) -> Result<(), ProfileError> {
        self.0.record(range)?;
        self.1.record(range)
    }
}

// =============================================================================
// SUMMARY
// =============================================================================

/// Totals over the whole attribution
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub step: u32,
    /// Address of the text start symbol
    pub base: Address,
    /// End of the last closed range (equals `base` when none closed)
    pub last_address: Address,
    pub total_ticks: u64,
    /// Value of the final catch-all element
    pub unknown: u32,
    /// Number of ranges handed to the sink
    pub ranges: usize,
    /// Buffer index the cursor stopped at
    pub next_bin: usize,
}

impl Summary {
    /// Ticks per byte over the attributed text
    #[must_use]
    pub fn rate(&self) -> f64 {
        match self.last_address.offset_from(self.base) {
            0 => 0.0,
            len => self.total_ticks as f64 / len as f64,
        }
    }
}

// =============================================================================
// ATTRIBUTION
// =============================================================================

/// Attribute the buffer's ticks to the symbols following `text_start`
///
/// `entries` continues the map right after the text start symbol. Attribution
/// ends at `_etext`/`__etext` (whose preceding range is still closed), at the
/// first non-text symbol, or at the end of the map.
///
/// # Errors
/// Returns the first map error, an `AddressOutOfRange` error when a range
/// ends past the buffer, or the sink's error
pub fn attribute<I, S>(
    buffer: &SampleBuffer,
    text_start: SymbolEntry,
    entries: I,
    policy: AbsoluteSymbolPolicy,
    sink: &mut S,
) -> Result<Summary, ProfileError>
where
    I: IntoIterator<Item = Result<SymbolEntry, ProfileError>>,
    S: RangeSink + ?Sized,
{
    let step = buffer.step();
    let base = text_start.address;
    let mut cursor = BinCursor::new(buffer);
    let mut current = text_start;
    let mut total_ticks = 0u64;
    let mut ranges = 0usize;

    for entry in entries {
        let next = entry?;
        let done = next.is_text_end();

        if !done {
            if policy.skips(&next, total_ticks) {
                trace!("Skipping {} {} at {}", next.kind, next.name, next.address);
                continue;
            }
            if !next.kind.is_text() {
                debug!("{} {} at {} ends the profiled text", next.kind, next.name, next.address);
                break;
            }
        }

        let (first_bin, counts) = cursor.advance_to(end_index(next.address, step, base))?;
        let ticks = counts.iter().map(|&c| u64::from(c)).sum::<u64>();
        total_ticks += ticks;

        sink.record(&RangeSamples {
            name: &current.name,
            start: current.address,
            end: next.address,
            first_bin,
            counts,
            ticks,
            step,
            base,
        })?;
        ranges += 1;

        current = next;
        if done {
            debug!("Reached {} at {}", current.name, current.address);
            break;
        }
    }

    Ok(Summary {
        step,
        base,
        last_address: current.address,
        total_ticks,
        unknown: buffer.unknown(),
        ranges,
        next_bin: cursor.position(),
    })
}
