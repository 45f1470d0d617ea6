//! Sensors that expose their latest sample through a memory window and raise
//! an interrupt whenever a new sample is ready.

#![cfg_attr(not(test), no_std)]

#[macro_use]
extern crate log;

use core::ptr::NonNull;

#[doc(no_inline)]
pub use driver_base::{DeviceKind, DriverOps};

/// Bytes in one sample frame.
pub const SAMPLE_LEN: usize = 64;

/// Physical base address of the sensor on the virtual prototype.
pub const SENSOR_BASE_PADDR: usize = 0x5000_0000;

/// Interrupt line the sensor raises on the virtual prototype.
pub const SENSOR_IRQ_LINE: usize = 2;

const SCALER: usize = 0x80;
const FILTER: usize = 0x84;

/// One sample frame.
pub type Sample = [u8; SAMPLE_LEN];

/// Sampling parameters programmed at bring-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorConfig {
    /// Interrupt line the sensor is wired to.
    pub irq_line: usize,
    /// Sampling period divider.
    pub scaler: u32,
    /// Filter mode.
    pub filter: u32,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            irq_line: SENSOR_IRQ_LINE,
            scaler: 5,
            filter: 2,
        }
    }
}

/// Operations a sample-window sensor driver implements.
pub trait SensorOps: DriverOps {
    /// Programs the sampling parameters.
    fn configure(&self, config: &SensorConfig);

    /// Copies the current sample frame into `out`.
    fn read_sample(&self, out: &mut Sample);
}

/// A sensor mapped as a 64-byte sample window followed by its control
/// registers.
pub struct MmioSensor {
    base: NonNull<u8>,
}

unsafe impl Send for MmioSensor {}
unsafe impl Sync for MmioSensor {}

impl MmioSensor {
    /// # Safety
    ///
    /// `base` must point to the mapped sensor window (at least 0x88 bytes)
    /// for the lifetime of the driver.
    pub const unsafe fn new(base: NonNull<u8>) -> Self {
        Self { base }
    }

    fn write_reg(&self, offset: usize, value: u32) {
        unsafe { (self.base.as_ptr().add(offset) as *mut u32).write_volatile(value) }
    }
}

impl DriverOps for MmioSensor {
    fn name(&self) -> &str {
        "riscv-vp,sensor"
    }

    fn device_kind(&self) -> DeviceKind {
        DeviceKind::Sensor
    }
}

impl SensorOps for MmioSensor {
    fn configure(&self, config: &SensorConfig) {
        debug!(
            "sensor: scaler {} filter {} on line {}",
            config.scaler, config.filter, config.irq_line
        );
        self.write_reg(SCALER, config.scaler);
        self.write_reg(FILTER, config.filter);
    }

    fn read_sample(&self, out: &mut Sample) {
        for (i, byte) in out.iter_mut().enumerate() {
            *byte = unsafe { self.base.as_ptr().add(i).read_volatile() };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[repr(C, align(4))]
    struct Window([u8; 0x88]);

    #[test]
    fn configure_writes_control_registers() {
        let mut window = Box::new(Window([0; 0x88]));
        let sensor = unsafe { MmioSensor::new(NonNull::from(&mut window.0).cast()) };
        sensor.configure(&SensorConfig {
            irq_line: 2,
            scaler: 10,
            filter: 3,
        });
        let regs = unsafe { &*(sensor.base.as_ptr().add(SCALER) as *const [u32; 2]) };
        assert_eq!(*regs, [10, 3]);
    }

    #[test]
    fn read_sample_copies_window() {
        let mut window = Box::new(Window([0; 0x88]));
        for (i, b) in window.0[..SAMPLE_LEN].iter_mut().enumerate() {
            *b = i as u8;
        }
        let sensor = unsafe { MmioSensor::new(NonNull::from(&mut window.0).cast()) };
        let mut sample = [0u8; SAMPLE_LEN];
        sensor.read_sample(&mut sample);
        assert!(sample.iter().enumerate().all(|(i, &b)| b == i as u8));
        assert_eq!(sensor.device_kind(), DeviceKind::Sensor);
    }

    #[test]
    fn default_config_matches_board() {
        let config = SensorConfig::default();
        assert_eq!(config.irq_line, SENSOR_IRQ_LINE);
        assert_eq!((config.scaler, config.filter), (5, 2));
    }
}
