//! Byte source for symbol maps
//!
//! A map is either a plain file or a gzip-compressed one. Compressed maps are
//! streamed through a `zcat` child process; the caller only sees `BufRead`.
//! The child is always reaped: [`MapSource::close`] waits for it and reports
//! a failed decompression, and dropping an unclosed source kills it first.

use crate::domain::ProfileError;
use log::{debug, warn};
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};

/// External decompressor, looked up in `PATH`
pub const DECOMPRESSOR: &str = "zcat";

const COMPRESSED_SUFFIX: &str = ".gz";

enum Reader {
    File(BufReader<File>),
    Pipe(BufReader<ChildStdout>),
    Closed,
}

/// Readable symbol map, plain or decompressed on the fly
pub struct MapSource {
    path: PathBuf,
    reader: Reader,
    child: Option<Child>,
}

/// Whether `path` names a compressed map
#[must_use]
pub fn is_compressed(path: &Path) -> bool {
    path.to_str().is_some_and(|p| p.len() > COMPRESSED_SUFFIX.len() && p.ends_with(COMPRESSED_SUFFIX))
}

impl MapSource {
    /// Open `path`, spawning the decompressor for `.gz` maps
    ///
    /// # Errors
    /// Returns an error if the file does not exist or cannot be opened, or if
    /// the decompressor cannot be started
    pub fn open(path: &Path) -> Result<Self, ProfileError> {
        if !is_compressed(path) {
            let file = File::open(path).map_err(|e| ProfileError::io(path, e))?;
            return Ok(Self {
                path: path.to_path_buf(),
                reader: Reader::File(BufReader::new(file)),
                child: None,
            });
        }

        // zcat would only complain on its own stderr, so surface missing files here
        fs::metadata(path).map_err(|e| ProfileError::io(path, e))?;

        debug!("Decompressing {} with {DECOMPRESSOR}", path.display());
        let mut child = Command::new(DECOMPRESSOR)
            .arg("--")
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .spawn()
            .map_err(|e| ProfileError::io(path, e))?;

        let Some(stdout) = child.stdout.take() else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(ProfileError::io(
                path,
                io::Error::new(io::ErrorKind::BrokenPipe, "decompressor has no stdout"),
            ));
        };

        Ok(Self {
            path: path.to_path_buf(),
            reader: Reader::Pipe(BufReader::new(stdout)),
            child: Some(child),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the data comes from a decompressor child
    #[must_use]
    pub fn is_piped(&self) -> bool {
        self.child.is_some()
    }

    /// Release the source, waiting for the decompressor if there is one
    ///
    /// Whatever the caller left unread (everything after `_etext`, usually) is
    /// drained first so the decompressor runs to completion instead of dying
    /// on a closed pipe.
    ///
    /// # Errors
    /// Returns an error if draining or waiting fails, or the decompressor
    /// exited unsuccessfully
    pub fn close(mut self) -> Result<(), ProfileError> {
        if self.child.is_none() {
            self.reader = Reader::Closed;
            return Ok(());
        }
        let drained =
            io::copy(&mut self, &mut io::sink()).map_err(|e| ProfileError::io(&self.path, e))?;
        debug!("Drained {drained} unread bytes from {DECOMPRESSOR}");
        self.reader = Reader::Closed;
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };
        let status = child.wait().map_err(|e| ProfileError::io(&self.path, e))?;
        if !status.success() {
            return Err(ProfileError::Decompressor { path: self.path.clone(), status });
        }
        Ok(())
    }
}

impl Drop for MapSource {
    fn drop(&mut self) {
        // Close our pipe end before reaping so a blocked writer can exit
        self.reader = Reader::Closed;
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            if let Err(e) = child.wait() {
                warn!("Failed to reap {DECOMPRESSOR} for {}: {e}", self.path.display());
            }
        }
    }
}

impl Read for MapSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match &mut self.reader {
            Reader::File(r) => r.read(buf),
            Reader::Pipe(r) => r.read(buf),
            Reader::Closed => Ok(0),
        }
    }
}

impl BufRead for MapSource {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        match &mut self.reader {
            Reader::File(r) => r.fill_buf(),
            Reader::Pipe(r) => r.fill_buf(),
            Reader::Closed => Ok(&[]),
        }
    }

    fn consume(&mut self, amt: usize) {
        match &mut self.reader {
            Reader::File(r) => r.consume(amt),
            Reader::Pipe(r) => r.consume(amt),
            Reader::Closed => {}
        }
    }
}
