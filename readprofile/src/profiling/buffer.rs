//! Profiling snapshot loading
//!
//! `/proc/profile` is a flat array of native-endian `u32`. Element 0 holds the
//! sampling step (bytes of kernel text per bin), elements `1..` hold the tick
//! counts, and the final element doubles as the catch-all for samples that
//! fell outside the profiled text (usually modules).
//!
//! Snapshots copied from another machine may have the opposite byte order.
//! Tick counts and the step are small numbers, so a buffer whose high
//! half-words are busier than its low half-words was almost certainly written
//! with reversed byte order.

use crate::domain::ProfileError;
use log::{debug, info, warn};
use std::fs;
use std::path::Path;

/// Well-known profiling pseudo-file
pub const DEFAULT_PROFILE: &str = "/proc/profile";

const ELEMENT_SIZE: usize = std::mem::size_of::<u32>();
const HALF_BITS: u32 = u32::BITS / 2;
const UPPER_HALF: u32 = !0 << HALF_BITS;
const LOWER_HALF: u32 = (1 << HALF_BITS) - 1;

/// How the loader treats byte order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    /// Guess the byte order from the data and swap if it looks reversed
    pub detect_byte_order: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self { detect_byte_order: true }
    }
}

/// Byte order the buffer ended up in after loading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    Native,
    /// Every element was byte-swapped during loading
    Swapped,
}

/// In-memory profiling snapshot, normalized to native byte order
#[derive(Debug, Clone)]
pub struct SampleBuffer {
    bins: Vec<u32>,
    byte_order: ByteOrder,
}

impl SampleBuffer {
    /// Read a whole snapshot file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, is empty, or is shorter
    /// than one element
    pub fn load(path: &Path, options: LoadOptions) -> Result<Self, ProfileError> {
        let bytes = fs::read(path).map_err(|e| ProfileError::io(path, e))?;
        if bytes.is_empty() {
            return Err(ProfileError::EmptyProfile(path.to_path_buf()));
        }
        if bytes.len() < ELEMENT_SIZE {
            return Err(ProfileError::TruncatedProfile { path: path.to_path_buf(), len: bytes.len() });
        }
        if bytes.len() % ELEMENT_SIZE != 0 {
            warn!(
                "{}: ignoring {} trailing bytes",
                path.display(),
                bytes.len() % ELEMENT_SIZE
            );
        }

        let bins = bytes
            .chunks_exact(ELEMENT_SIZE)
            .map(|chunk| u32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect::<Vec<_>>();

        info!("Loaded {} ({} elements)", path.display(), bins.len());
        Ok(Self::normalize(bins, options))
    }

    /// Build a buffer from raw elements (element 0 is the step)
    ///
    /// Returns `None` for an empty vector, which has no step.
    #[must_use]
    pub fn from_elements(bins: Vec<u32>, options: LoadOptions) -> Option<Self> {
        if bins.is_empty() {
            return None;
        }
        Some(Self::normalize(bins, options))
    }

    fn normalize(mut bins: Vec<u32>, options: LoadOptions) -> Self {
        let mut byte_order = ByteOrder::Native;
        if options.detect_byte_order && looks_byte_swapped(&bins) {
            warn!("Assuming reversed byte order");
            swap_byte_order(&mut bins);
            byte_order = ByteOrder::Swapped;
        }
        debug!("Sampling step: {} bytes per bin", bins[0]);
        Self { bins, byte_order }
    }

    /// Bytes of address space covered by one bin
    #[must_use]
    pub fn step(&self) -> u32 {
        self.bins[0]
    }

    /// Number of raw elements, step included
    #[must_use]
    pub fn len(&self) -> usize {
        self.bins.len()
    }

    /// Always false: a loaded buffer holds at least the step
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// Index of the trailing catch-all bin
    #[must_use]
    pub fn final_index(&self) -> usize {
        self.bins.len() - 1
    }

    /// Ticks recorded outside the kernel text (the final element)
    #[must_use]
    pub fn unknown(&self) -> u32 {
        self.bins[self.final_index()]
    }

    /// All raw elements, indexed as in the file
    #[must_use]
    pub fn elements(&self) -> &[u32] {
        &self.bins
    }

    #[must_use]
    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }
}

/// Byte-order heuristic over every element except the step
///
/// An element counts towards "big" when any of its upper 16 bits are set and
/// towards "small" when any of its lower 16 bits are set.
#[must_use]
pub fn looks_byte_swapped(bins: &[u32]) -> bool {
    let (big, small) = bins.iter().skip(1).fold((0usize, 0usize), |(big, small), &v| {
        (big + usize::from(v & UPPER_HALF != 0), small + usize::from(v & LOWER_HALF != 0))
    });
    debug!("Byte order votes: big={big} small={small}");
    big > small
}

/// Reverse the bytes of every element in place, step included
pub fn swap_byte_order(bins: &mut [u32]) {
    for v in bins.iter_mut() {
        *v = v.swap_bytes();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_elements(values: &[u32], reversed: bool) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
        for v in values {
            let v = if reversed { v.swap_bytes() } else { *v };
            file.write_all(&v.to_ne_bytes()).expect("Failed to write element");
        }
        file.flush().expect("Failed to flush");
        file
    }

    #[test]
    fn test_load_native_snapshot() {
        let file = write_elements(&[4, 0, 7, 3, 1], false);
        let buffer = SampleBuffer::load(file.path(), LoadOptions::default()).unwrap();

        assert_eq!(buffer.step(), 4);
        assert_eq!(buffer.len(), 5);
        assert_eq!(buffer.unknown(), 1);
        assert_eq!(buffer.byte_order(), ByteOrder::Native);
    }

    #[test]
    fn test_load_detects_reversed_snapshot() {
        let values = [4, 0, 7, 3, 1, 12];
        let file = write_elements(&values, true);

        let buffer = SampleBuffer::load(file.path(), LoadOptions::default()).unwrap();
        assert_eq!(buffer.byte_order(), ByteOrder::Swapped);
        assert_eq!(buffer.elements(), &values);

        let raw = SampleBuffer::load(file.path(), LoadOptions { detect_byte_order: false }).unwrap();
        assert_eq!(raw.byte_order(), ByteOrder::Native);
        assert_eq!(raw.step(), 4u32.swap_bytes());
    }

    #[test]
    fn test_load_empty_file_fails() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let err = SampleBuffer::load(file.path(), LoadOptions::default()).unwrap_err();
        assert!(matches!(err, ProfileError::EmptyProfile(_)));
        assert!(err.to_string().ends_with("input file is empty"));
    }

    #[test]
    fn test_load_truncated_file_fails() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[1, 2]).unwrap();
        let err = SampleBuffer::load(file.path(), LoadOptions::default()).unwrap_err();
        assert!(matches!(err, ProfileError::TruncatedProfile { len: 2, .. }));
    }

    #[test]
    fn test_load_missing_file_names_path() {
        let err = SampleBuffer::load(Path::new("/nonexistent/profile"), LoadOptions::default())
            .unwrap_err();
        assert!(matches!(err, ProfileError::Io { .. }));
        assert_eq!(err.to_string(), "/nonexistent/profile");
    }

    #[test]
    fn test_swap_twice_is_identity() {
        let original = vec![0x0102_0304, 0, u32::MAX, 0x8000_0001, 17];
        let mut bins = original.clone();
        swap_byte_order(&mut bins);
        assert_ne!(bins, original);
        swap_byte_order(&mut bins);
        assert_eq!(bins, original);
    }

    #[test]
    fn test_heuristic_ignores_step_element() {
        // A huge step alone must not trigger a swap
        assert!(!looks_byte_swapped(&[0xffff_0000, 1, 2, 0]));
        // Elements with bits in both halves vote both ways
        assert!(!looks_byte_swapped(&[4, 0x0001_0001]));
        assert!(looks_byte_swapped(&[4, 0x0100_0000, 0x0200_0000, 3]));
    }

    #[test]
    fn test_from_elements_rejects_empty() {
        assert!(SampleBuffer::from_elements(Vec::new(), LoadOptions::default()).is_none());
        let buffer = SampleBuffer::from_elements(vec![0], LoadOptions::default()).unwrap();
        assert_eq!(buffer.step(), 0);
        assert_eq!(buffer.final_index(), 0);
    }
}
