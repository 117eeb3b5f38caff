//! Administrative writes to the profiling device
//!
//! Writing to `/proc/profile` resets the counters. The kernel only accepts a
//! new multiplier when the write is exactly `sizeof(int)` bytes, so a reset
//! writes a single byte instead.

use crate::domain::ProfileError;
use log::info;
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::Path;

/// Operation to perform on the profiling device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceWrite {
    /// Zero all counters
    Reset,
    /// Zero all counters and set the profiling multiplier
    Multiplier(i32),
}

impl DeviceWrite {
    /// Bytes handed to the kernel in a single `write(2)`
    #[must_use]
    pub fn payload(self) -> Vec<u8> {
        match self {
            DeviceWrite::Reset => vec![0],
            DeviceWrite::Multiplier(mult) => mult.to_ne_bytes().to_vec(),
        }
    }

    /// What the write does, for diagnostics
    #[must_use]
    pub fn action(self) -> &'static str {
        match self {
            DeviceWrite::Reset => "resetting the profiling counters",
            DeviceWrite::Multiplier(_) => "setting the profiling multiplier",
        }
    }

    /// Command line that requests this write
    #[must_use]
    pub fn command_line(self) -> String {
        match self {
            DeviceWrite::Reset => "readprofile -r".to_string(),
            DeviceWrite::Multiplier(mult) => format!("readprofile -M {mult}"),
        }
    }
}

/// Perform `op` on the device at `path`
///
/// # Errors
/// Returns `PermissionDenied` if the device refuses to open for writing, an
/// I/O error for any other open or write failure, or `ShortWrite` if the
/// kernel accepts fewer bytes than requested
pub fn write_profile_device(path: &Path, op: DeviceWrite) -> Result<(), ProfileError> {
    let payload = op.payload();
    let mut device = OpenOptions::new().write(true).open(path).map_err(|e| {
        if e.kind() == ErrorKind::PermissionDenied {
            ProfileError::PermissionDenied(format!(
                "{}: {} requires root privileges",
                path.display(),
                op.action()
            ))
        } else {
            ProfileError::io(path, e)
        }
    })?;

    // One write call: the payload length is what selects the operation
    let written = device.write(&payload).map_err(|e| ProfileError::io(path, e))?;
    if written != payload.len() {
        return Err(ProfileError::ShortWrite {
            path: path.to_path_buf(),
            written,
            expected: payload.len(),
        });
    }

    info!("{op:?} written to {}", path.display());
    Ok(())
}
