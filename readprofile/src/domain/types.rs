//! Domain types providing compile-time safety and self-documentation
//!
//! These wrappers keep raw addresses and symbol type codes from being mixed up
//! with tick counts and bin indices, which are all plain integers otherwise.

use std::fmt;

/// Kernel virtual address
///
/// Displayed as zero-padded hex, the way `System.map` lists it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address(pub u64);

impl Address {
    /// Byte distance from `base`, or 0 when this address lies below it
    #[must_use]
    pub fn offset_from(self, base: Address) -> u64 {
        self.0.saturating_sub(base.0)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl fmt::LowerHex for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

impl From<u64> for Address {
    fn from(addr: u64) -> Self {
        Address(addr)
    }
}

/// Symbol type code from the second column of a symbol map
///
/// See `man nm` for the letters. Only the classes that matter for profiling
/// are distinguished; everything else keeps its letter for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    /// `T`, `t`, `W`, `w`: code in the text section
    Text(char),
    /// `A` and `?`: absolute or unknown, carries no text range
    Absolute(char),
    /// Data, bss, read-only data, ...
    Other(char),
}

impl SymbolKind {
    /// Classify a type code by its first character
    #[must_use]
    pub fn from_code(code: char) -> Self {
        match code {
            'T' | 't' | 'W' | 'w' => SymbolKind::Text(code),
            'A' | '?' => SymbolKind::Absolute(code),
            _ => SymbolKind::Other(code),
        }
    }

    #[must_use]
    pub fn is_text(self) -> bool {
        matches!(self, SymbolKind::Text(_))
    }

    #[must_use]
    pub fn is_absolute(self) -> bool {
        matches!(self, SymbolKind::Absolute(_))
    }

    /// The original type letter
    #[must_use]
    pub fn code(self) -> char {
        match self {
            SymbolKind::Text(c) | SymbolKind::Absolute(c) | SymbolKind::Other(c) => c,
        }
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
