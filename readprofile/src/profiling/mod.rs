//! Profiling snapshot modules
//!
//! - Loading `/proc/profile` snapshots with byte-order normalization
//! - Resetting counters and setting the multiplier on the live device

pub mod buffer;
pub mod device;

// Re-export common types
pub use buffer::{
    looks_byte_swapped, swap_byte_order, ByteOrder, LoadOptions, SampleBuffer, DEFAULT_PROFILE,
};
pub use device::{write_profile_device, DeviceWrite};
