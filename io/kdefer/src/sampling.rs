//! Sensor bring-up and the "sample ready" hand-off.

use alloc::sync::Arc;

use kerrno::KResult;
use kplat::{ClaimComplete, Dispatcher};
use ksync::{TaskOps, Ticks, WakeSignal};
use sensor::{Sample, SensorConfig, SensorOps};

use crate::isr::{DeviceIsr, SensorIsr};

/// Reads one sample per "sample ready" interrupt.
pub struct SensorReader<S, T> {
    sensor: Arc<S>,
    tasks: Arc<T>,
    data_ready: Arc<WakeSignal>,
    isr: Arc<SensorIsr<T>>,
}

impl<S: SensorOps, T: TaskOps> SensorReader<S, T> {
    /// Programs the sensor and registers its interrupt on `config.irq_line`.
    pub fn attach<C: ClaimComplete, const N: usize>(
        sensor: Arc<S>,
        tasks: Arc<T>,
        dispatcher: &mut Dispatcher<DeviceIsr<T>, C, N>,
        config: &SensorConfig,
    ) -> KResult<Self> {
        let data_ready = Arc::new(WakeSignal::binary());
        let isr = Arc::new(SensorIsr::new(data_ready.clone(), tasks.clone()));
        dispatcher.register(config.irq_line, isr.clone().into())?;
        sensor.configure(config);
        info!("{}: attached on IRQ line {}", sensor.name(), config.irq_line);
        Ok(Self {
            sensor,
            tasks,
            data_ready,
            isr,
        })
    }

    /// Waits up to `timeout` ticks for a new sample and copies it into `out`.
    ///
    /// Each interrupt yields at most one sample; interrupts that arrive
    /// before the previous sample was read are folded into it.
    pub fn next_sample(&self, timeout: Ticks, out: &mut Sample) -> KResult {
        self.data_ready.take(&*self.tasks, timeout)?;
        self.sensor.read_sample(out);
        Ok(())
    }

    /// "Sample ready" interrupts handled so far.
    pub fn irq_count(&self) -> usize {
        self.isr.irq_count()
    }
}
