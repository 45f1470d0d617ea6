#![allow(dead_code)]

use std::{
    collections::VecDeque,
    sync::{
        Mutex,
        atomic::{AtomicU8, AtomicU64, AtomicUsize, Ordering},
    },
};

use kerrno::{KError, KResult};
use kplat::{ClaimComplete, IrqLine};
use ksync::{EventListener, Priority, TaskId, TaskOps, Ticks, WAIT_FOREVER};
use net::{DeviceKind, DriverOps, EmacOps, MacAddress};
use sensor::{Sample, SensorConfig, SensorOps};

pub const OWN_MAC: MacAddress = MacAddress([0x02, 0x00, 0x00, 0x00, 0x00, 0x01]);
pub const PEER_MAC: MacAddress = MacAddress([0x02, 0x00, 0x00, 0x00, 0x00, 0x02]);

/// A 60-byte Ethernet frame to `dst` whose payload byte is `fill`.
pub fn frame(dst: MacAddress, fill: u8) -> Vec<u8> {
    let mut f = vec![fill; 60];
    f[..6].copy_from_slice(&dst.0);
    f[6..12].copy_from_slice(&PEER_MAC.0);
    f
}

/// Controller that hands out raised lines in order.
#[derive(Debug, Default)]
pub struct MockClaim {
    pending: Mutex<VecDeque<IrqLine>>,
    pub claims: AtomicUsize,
    pub completed: Mutex<Vec<IrqLine>>,
}

impl MockClaim {
    pub fn raise(&self, line: IrqLine) {
        self.pending.lock().unwrap().push_back(line);
    }

    pub fn completed(&self) -> Vec<IrqLine> {
        self.completed.lock().unwrap().clone()
    }
}

impl ClaimComplete for MockClaim {
    fn claim(&self) -> Option<IrqLine> {
        self.claims.fetch_add(1, Ordering::SeqCst);
        self.pending.lock().unwrap().pop_front()
    }

    fn complete(&self, line: IrqLine) {
        self.completed.lock().unwrap().push(line);
    }
}

/// A MAC with a receive FIFO and a scriptable transmitter.
pub struct MockEmac {
    mac: MacAddress,
    rx: Mutex<VecDeque<Vec<u8>>>,
    pub discarded: AtomicUsize,
    busy_for: AtomicUsize,
    tx_error: Mutex<Option<KError>>,
    pub tx_attempts: AtomicUsize,
    pub sent: Mutex<Vec<Vec<u8>>>,
}

impl MockEmac {
    pub fn new(mac: MacAddress) -> Self {
        Self {
            mac,
            rx: Mutex::new(VecDeque::new()),
            discarded: AtomicUsize::new(0),
            busy_for: AtomicUsize::new(0),
            tx_error: Mutex::new(None),
            tx_attempts: AtomicUsize::new(0),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn push_rx(&self, frame: Vec<u8>) {
        self.rx.lock().unwrap().push_back(frame);
    }

    pub fn rx_backlog(&self) -> usize {
        self.rx.lock().unwrap().len()
    }

    /// Report busy for the next `n` transmit attempts; `usize::MAX` forever.
    pub fn set_busy_for(&self, n: usize) {
        self.busy_for.store(n, Ordering::SeqCst);
    }

    pub fn fail_tx_with(&self, err: KError) {
        *self.tx_error.lock().unwrap() = Some(err);
    }

    pub fn tx_attempts(&self) -> usize {
        self.tx_attempts.load(Ordering::SeqCst)
    }
}

impl DriverOps for MockEmac {
    fn name(&self) -> &str {
        "mock-emac"
    }

    fn device_kind(&self) -> DeviceKind {
        DeviceKind::Net
    }
}

impl EmacOps for MockEmac {
    fn mac(&self) -> MacAddress {
        self.mac
    }

    fn rx_pending(&self) -> usize {
        self.rx.lock().unwrap().front().map_or(0, Vec::len)
    }

    fn receive(&self, buf: &mut [u8]) -> KResult<usize> {
        let mut rx = self.rx.lock().unwrap();
        let Some(frame) = rx.front() else {
            return Err(KError::BadState);
        };
        if frame.len() > buf.len() {
            return Err(KError::InvalidInput);
        }
        buf[..frame.len()].copy_from_slice(frame);
        Ok(rx.pop_front().map_or(0, |f| f.len()))
    }

    fn discard(&self) -> KResult {
        self.rx.lock().unwrap().pop_front();
        self.discarded.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn transmit(&self, frame: &[u8]) -> KResult {
        self.tx_attempts.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = *self.tx_error.lock().unwrap() {
            return Err(err);
        }
        let busy = self
            .busy_for
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| match n {
                0 => None,
                usize::MAX => Some(usize::MAX),
                n => Some(n - 1),
            })
            .is_ok();
        if busy {
            return Err(KError::HardwareBusy);
        }
        self.sent.lock().unwrap().push(frame.to_vec());
        Ok(())
    }
}

/// A sensor whose window holds a counter that advances on every read.
#[derive(Default)]
pub struct MockSensor {
    pub config: Mutex<Option<SensorConfig>>,
    pub reads: AtomicUsize,
}

impl DriverOps for MockSensor {
    fn name(&self) -> &str {
        "mock-sensor"
    }

    fn device_kind(&self) -> DeviceKind {
        DeviceKind::Sensor
    }
}

impl SensorOps for MockSensor {
    fn configure(&self, config: &SensorConfig) {
        *self.config.lock().unwrap() = Some(*config);
    }

    fn read_sample(&self, out: &mut Sample) {
        let n = self.reads.fetch_add(1, Ordering::SeqCst);
        out.fill(n as u8);
    }
}

/// A scheduler with a virtual tick clock for single-threaded tests.
///
/// Nothing else can run while a test blocks, so a wait simply moves the
/// clock to its deadline and times out.
#[derive(Debug, Default)]
pub struct VirtualTasks {
    now: AtomicU64,
    priority: AtomicU8,
    sleeps: Mutex<Vec<Ticks>>,
    pub wakes: AtomicUsize,
}

impl VirtualTasks {
    pub fn set_priority(&self, priority: Priority) {
        self.priority.store(priority, Ordering::SeqCst);
    }

    pub fn sleeps(&self) -> Vec<Ticks> {
        self.sleeps.lock().unwrap().clone()
    }
}

impl TaskOps for VirtualTasks {
    fn now(&self) -> Ticks {
        self.now.load(Ordering::SeqCst)
    }

    fn current_priority(&self) -> Priority {
        self.priority.load(Ordering::SeqCst)
    }

    fn wait_until(&self, _listener: EventListener, deadline: Ticks) -> bool {
        assert_ne!(deadline, WAIT_FOREVER, "single-threaded test would block forever");
        self.now.fetch_max(deadline, Ordering::SeqCst);
        false
    }

    fn current_task(&self) -> TaskId {
        TaskId::MIN
    }

    fn park_until(&self, deadline: Ticks) {
        assert_ne!(deadline, WAIT_FOREVER, "single-threaded test would block forever");
        self.now.fetch_max(deadline, Ordering::SeqCst);
    }

    fn wake_task(&self, _task: TaskId) {
        self.wakes.fetch_add(1, Ordering::SeqCst);
    }

    fn sleep(&self, ticks: Ticks) {
        self.sleeps.lock().unwrap().push(ticks);
        self.now.fetch_add(ticks, Ordering::SeqCst);
    }
}
