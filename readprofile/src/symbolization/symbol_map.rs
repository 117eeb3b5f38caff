//! Streaming `System.map` reader
//!
//! Each line is `<hex address> <type> <name>`, optionally followed by more
//! fields (a module name, for instance) which are ignored. The reader yields
//! entries one line at a time so a map never has to be held in memory.

use crate::domain::{Address, ProfileError, SymbolKind};
use log::debug;
use rustc_demangle::try_demangle;
use std::borrow::Cow;
use std::io::{BufRead, Read};

/// Longest accepted symbol name, in bytes
pub const MAX_NAME_LEN: usize = 127;

/// Longest accepted type field, in bytes
pub const MAX_KIND_LEN: usize = 7;

/// Longest accepted physical line, newline included
pub const MAX_LINE_LEN: usize = 1024;

const TEXT_START: [&str; 2] = ["_stext", "__stext"];
const TEXT_END: [&str; 2] = ["_etext", "__etext"];

/// One parsed map line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolEntry {
    pub address: Address,
    pub kind: SymbolKind,
    pub name: String,
}

impl SymbolEntry {
    /// Parse one map line
    ///
    /// Returns `None` when the line does not have the three leading fields,
    /// the address is not hex, or a field exceeds its length limit.
    #[must_use]
    pub fn parse(line: &str) -> Option<Self> {
        let mut fields = line.split_whitespace();
        let address = parse_hex(fields.next()?)?;
        let kind = fields.next().filter(|k| k.len() <= MAX_KIND_LEN)?;
        let name = fields.next().filter(|n| n.len() <= MAX_NAME_LEN)?;

        Some(Self {
            address: Address(address),
            kind: SymbolKind::from_code(kind.chars().next()?),
            name: name.to_string(),
        })
    }

    /// `_stext` or `__stext`
    #[must_use]
    pub fn is_text_start(&self) -> bool {
        TEXT_START.contains(&self.name.as_str())
    }

    /// `_etext` or `__etext`
    #[must_use]
    pub fn is_text_end(&self) -> bool {
        TEXT_END.contains(&self.name.as_str())
    }
}

fn parse_hex(field: &str) -> Option<u64> {
    let digits = field
        .strip_prefix("0x")
        .or_else(|| field.strip_prefix("0X"))
        .unwrap_or(field);
    u64::from_str_radix(digits, 16).ok()
}

/// Demangle a Rust symbol name; other names are returned untouched
#[must_use]
pub fn demangle_symbol(name: &str) -> Cow<'_, str> {
    match try_demangle(name) {
        Ok(demangled) => Cow::Owned(format!("{demangled:#}")),
        Err(_) => Cow::Borrowed(name),
    }
}

/// Forward-only iterator over the entries of a symbol map
pub struct SymbolMapReader<R> {
    reader: R,
    file: String,
    line_no: usize,
    line: Vec<u8>,
}

impl<R: BufRead> SymbolMapReader<R> {
    /// `file` names the map in error messages
    pub fn new(reader: R, file: impl Into<String>) -> Self {
        Self { reader, file: file.into(), line_no: 0, line: Vec::new() }
    }

    /// Skip forward to the first `_stext` / `__stext` entry and return it
    ///
    /// # Errors
    /// Returns an error on a malformed line, an I/O failure, or if the map
    /// ends without a text start symbol
    pub fn find_text_start(&mut self) -> Result<SymbolEntry, ProfileError> {
        while let Some(entry) = self.next() {
            let entry = entry?;
            if entry.is_text_start() {
                debug!("Text starts at {} (line {})", entry.address, self.line_no);
                return Ok(entry);
            }
        }
        Err(ProfileError::MissingTextStart(self.file.clone()))
    }

    /// Physical line number of the last entry read (1-based)
    #[must_use]
    pub fn line_no(&self) -> usize {
        self.line_no
    }

    #[must_use]
    pub fn file(&self) -> &str {
        &self.file
    }

    /// Give back the underlying reader, e.g. to close a decompressor
    pub fn into_inner(self) -> R {
        self.reader
    }

    fn wrong_line(&self) -> ProfileError {
        ProfileError::WrongMapLine { file: self.file.clone(), line: self.line_no }
    }
}

impl<R: BufRead> Iterator for SymbolMapReader<R> {
    type Item = Result<SymbolEntry, ProfileError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.line.clear();
        let limit = MAX_LINE_LEN as u64;
        match self.reader.by_ref().take(limit).read_until(b'\n', &mut self.line) {
            Ok(0) => return None,
            Ok(_) => self.line_no += 1,
            Err(e) => return Some(Err(ProfileError::io(self.file.clone(), e))),
        }

        if self.line.len() == MAX_LINE_LEN && self.line.last() != Some(&b'\n') {
            let truncated = match self.reader.fill_buf() {
                Ok(rest) => !rest.is_empty(),
                Err(e) => return Some(Err(ProfileError::io(self.file.clone(), e))),
            };
            if truncated {
                return Some(Err(self.wrong_line()));
            }
        }

        let entry = std::str::from_utf8(&self.line).ok().and_then(SymbolEntry::parse);
        Some(entry.ok_or_else(|| self.wrong_line()))
    }
}
