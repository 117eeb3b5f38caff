//! Pre-flight checks for readprofile
//!
//! Validates system requirements before touching the profiling device.
//! Provides clear, actionable error messages when requirements aren't met.

#![allow(unsafe_code)] // geteuid() and uname() require unsafe

use crate::domain::ProfileError;
use crate::profiling::DeviceWrite;
use std::ffi::CStr;
use std::mem::MaybeUninit;

/// Check if running with sufficient privileges to perform `op` on the device
///
/// # Errors
/// Returns `PermissionDenied` when not running as root
pub fn check_privileges(op: DeviceWrite) -> Result<(), ProfileError> {
    if is_root() {
        return Ok(());
    }
    Err(privilege_error(op))
}

/// Whether the effective user is root
#[must_use]
pub fn is_root() -> bool {
    (unsafe { libc::geteuid() }) == 0
}

fn privilege_error(op: DeviceWrite) -> ProfileError {
    ProfileError::PermissionDenied(format!(
        "{} requires root privileges.\n\n\
         Run with: sudo {}",
        op.action(),
        op.command_line()
    ))
}

/// Release string of the running kernel (`uname -r`)
#[must_use]
pub fn kernel_release() -> Option<String> {
    let mut info = MaybeUninit::<libc::utsname>::zeroed();
    // SAFETY: uname() fills the struct we own; on failure it is not read
    if unsafe { libc::uname(info.as_mut_ptr()) } != 0 {
        return None;
    }
    // SAFETY: uname() succeeded, so the struct is initialized
    let info = unsafe { info.assume_init() };
    // SAFETY: the kernel NUL-terminates every utsname field
    let release = unsafe { CStr::from_ptr(info.release.as_ptr()) };
    let release = release.to_string_lossy().into_owned();
    if release.is_empty() {
        None
    } else {
        Some(release)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kernel_release_matches_proc() {
        let Ok(proc_release) = std::fs::read_to_string("/proc/sys/kernel/osrelease") else {
            return;
        };
        assert_eq!(kernel_release().as_deref(), Some(proc_release.trim()));
    }

    #[test]
    fn test_check_privileges_matches_euid() {
        let is_root = unsafe { libc::geteuid() } == 0;
        assert_eq!(check_privileges(DeviceWrite::Reset).is_ok(), is_root);
    }

    #[test]
    fn test_privilege_error_follows_operation() {
        let reset = privilege_error(DeviceWrite::Reset).to_string();
        assert!(reset.starts_with("Permission denied: resetting the profiling counters"));
        assert!(reset.ends_with("sudo readprofile -r"));

        let mult = privilege_error(DeviceWrite::Multiplier(4)).to_string();
        assert!(mult.starts_with("Permission denied: setting the profiling multiplier"));
        assert!(mult.ends_with("sudo readprofile -M 4"));
        assert!(!mult.contains("-r"));
    }
}
