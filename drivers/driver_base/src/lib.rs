//! Common traits and types for device drivers.
//!
//! Use this crate together with the crate for the corresponding device type:
//!
//! - [`net`][1]: Ethernet MAC drivers and network buffers.
//! - [`sensor`][2]: Sample-window sensor drivers.
//!
//! Driver operations report failures as [`kerrno::KError`].
//!
//! [1]: ../net/index.html
//! [2]: ../sensor/index.html

#![no_std]

/// All supported device kinds.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum DeviceKind {
    /// Network device (e.g., ethernet MAC).
    Net,
    /// Sampling sensor with a memory-mapped sample window.
    Sensor,
}

impl DeviceKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            DeviceKind::Net => "net",
            DeviceKind::Sensor => "sensor",
        }
    }
}

impl core::fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Common operations that require all device drivers to implement.
pub trait DriverOps: Send + Sync {
    /// The name of the device.
    fn name(&self) -> &str;

    /// The kind of the device.
    fn device_kind(&self) -> DeviceKind;
}
