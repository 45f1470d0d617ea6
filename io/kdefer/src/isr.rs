//! Interrupt-context halves of the device drivers.
//!
//! Each ISR only counts the interrupt and gives its wake signal; everything
//! else happens in the task that takes the signal.

use alloc::sync::Arc;
use core::sync::atomic::{AtomicUsize, Ordering};

use kplat::{IrqHandler, WakeHint};
use ksync::{TaskOps, WakeSignal};

struct SignalIsr<T> {
    signal: Arc<WakeSignal>,
    tasks: Arc<T>,
    count: AtomicUsize,
}

impl<T: TaskOps> SignalIsr<T> {
    fn new(signal: Arc<WakeSignal>, tasks: Arc<T>) -> Self {
        Self {
            signal,
            tasks,
            count: AtomicUsize::new(0),
        }
    }

    fn fire(&self) -> WakeHint {
        self.count.fetch_add(1, Ordering::Relaxed);
        self.signal
            .give_from_irq(&*self.tasks)
            .into()
    }
}

/// Receive interrupt of the Ethernet MAC.
///
/// Gives a counting signal once per interrupt; bursts beyond the signal's
/// maximum are coalesced and picked up by the receive task's drain loop.
pub struct EmacIsr<T>(SignalIsr<T>);

impl<T: TaskOps> EmacIsr<T> {
    pub fn new(rx_ready: Arc<WakeSignal>, tasks: Arc<T>) -> Self {
        Self(SignalIsr::new(rx_ready, tasks))
    }

    /// Interrupts handled so far.
    pub fn irq_count(&self) -> usize {
        self.0.count.load(Ordering::Relaxed)
    }

    pub fn signal(&self) -> &Arc<WakeSignal> {
        &self.0.signal
    }
}

impl<T: TaskOps> IrqHandler for EmacIsr<T> {
    fn handle(&self) -> WakeHint {
        self.0.fire()
    }
}

/// "Sample ready" interrupt of a sensor.
///
/// Sets a binary flag: a sample that is not read before the next one arrives
/// is overwritten in the device window, so only the latest counts.
pub struct SensorIsr<T>(SignalIsr<T>);

impl<T: TaskOps> SensorIsr<T> {
    /// # Panics
    ///
    /// Panics if `data_ready` can hold more than one pending event.
    pub fn new(data_ready: Arc<WakeSignal>, tasks: Arc<T>) -> Self {
        assert_eq!(data_ready.max(), 1, "sensor ISR needs a binary signal");
        Self(SignalIsr::new(data_ready, tasks))
    }

    /// Interrupts handled so far.
    pub fn irq_count(&self) -> usize {
        self.0.count.load(Ordering::Relaxed)
    }

    pub fn signal(&self) -> &Arc<WakeSignal> {
        &self.0.signal
    }
}

impl<T: TaskOps> IrqHandler for SensorIsr<T> {
    fn handle(&self) -> WakeHint {
        self.0.fire()
    }
}

/// The handlers a [`Dispatcher`](kplat::Dispatcher) of this crate holds.
pub enum DeviceIsr<T> {
    Emac(Arc<EmacIsr<T>>),
    Sensor(Arc<SensorIsr<T>>),
}

impl<T: TaskOps> IrqHandler for DeviceIsr<T> {
    fn handle(&self) -> WakeHint {
        match self {
            DeviceIsr::Emac(isr) => isr.handle(),
            DeviceIsr::Sensor(isr) => isr.handle(),
        }
    }
}

impl<T> From<Arc<EmacIsr<T>>> for DeviceIsr<T> {
    fn from(isr: Arc<EmacIsr<T>>) -> Self {
        DeviceIsr::Emac(isr)
    }
}

impl<T> From<Arc<SensorIsr<T>>> for DeviceIsr<T> {
    fn from(isr: Arc<SensorIsr<T>>) -> Self {
        DeviceIsr::Sensor(isr)
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{Arc, Mutex},
        vec::Vec,
    };

    use kplat::{ClaimComplete, Dispatcher, IrqLine};
    use ksync::HostTasks;

    use super::*;

    #[derive(Default)]
    struct Pending(Mutex<Vec<IrqLine>>);

    impl ClaimComplete for Pending {
        fn claim(&self) -> Option<IrqLine> {
            self.0.lock().unwrap().pop()
        }

        fn complete(&self, _line: IrqLine) {}
    }

    #[test]
    fn emac_isr_counts_and_coalesces() {
        let tasks = Arc::new(HostTasks::default());
        let signal = Arc::new(WakeSignal::counting(2, 0));
        let isr = EmacIsr::new(signal.clone(), tasks);

        for _ in 0..3 {
            assert_eq!(isr.handle(), WakeHint::NONE);
        }
        assert_eq!(isr.irq_count(), 3);
        assert_eq!(signal.count(), 2);
    }

    #[test]
    fn dispatcher_routes_to_device() {
        let tasks = Arc::new(HostTasks::default());
        let rx = Arc::new(EmacIsr::new(Arc::new(WakeSignal::counting(16, 0)), tasks.clone()));
        let sensor = Arc::new(SensorIsr::new(Arc::new(WakeSignal::binary()), tasks));

        let mut table: Dispatcher<DeviceIsr<HostTasks>, Pending> = Dispatcher::new(Pending::default());
        table.register(7, rx.clone().into()).unwrap();
        table.register(2, sensor.clone().into()).unwrap();

        table.controller().0.lock().unwrap().extend([2, 7, 7, 2]);
        for _ in 0..4 {
            let _ = table.dispatch();
        }
        assert_eq!((rx.irq_count(), sensor.irq_count()), (2, 2));
        assert_eq!(rx.signal().count(), 2);
        assert_eq!(sensor.signal().count(), 1);
    }

    #[test]
    #[should_panic(expected = "binary signal")]
    fn sensor_isr_requires_binary_signal() {
        let _ = SensorIsr::new(Arc::new(WakeSignal::counting(4, 0)), Arc::new(HostTasks::default()));
    }
}
