mod common;

use std::sync::Arc;

use common::{MockClaim, MockEmac, OWN_MAC, PEER_MAC, VirtualTasks, frame};
use kdefer::{DeviceIsr, NetIf, NetIfConfig, Transmitter};
use kerrno::KError;
use kplat::Dispatcher;
use ksync::NO_WAIT;

fn netif(emac: &Arc<MockEmac>, tasks: &Arc<VirtualTasks>) -> NetIf<MockEmac, VirtualTasks> {
    let mut table: Dispatcher<DeviceIsr<VirtualTasks>, MockClaim> =
        Dispatcher::new(MockClaim::default());
    NetIf::attach(emac.clone(), tasks.clone(), &mut table, NetIfConfig::default()).unwrap()
}

fn outgoing(netif: &NetIf<MockEmac, VirtualTasks>) -> net::NetBuf {
    let payload = frame(PEER_MAC, 0x5a);
    let mut buf = netif.tx_buffer(payload.len(), NO_WAIT).unwrap();
    buf.data_mut().copy_from_slice(&payload);
    buf
}

#[test]
fn persistent_busy_gives_up_after_five_attempts() {
    let emac = Arc::new(MockEmac::new(OWN_MAC));
    let tasks = Arc::new(VirtualTasks::default());
    let netif = netif(&emac, &tasks);
    emac.set_busy_for(usize::MAX);

    let buf = outgoing(&netif);
    assert_eq!(netif.pool().available(), netif.pool().capacity() - 1);

    assert_eq!(netif.transmitter().send(buf), Err(KError::HardwareBusy));
    assert_eq!(emac.tx_attempts(), 5);
    assert_eq!(tasks.sleeps(), [2, 2, 2, 2]);
    assert_eq!(netif.pool().available(), netif.pool().capacity());

    let stats = netif.stats();
    assert_eq!((stats.transmitted, stats.tx_failed, stats.tx_retries), (0, 1, 4));
}

#[test]
fn busy_then_free_sends_once() {
    let emac = Arc::new(MockEmac::new(OWN_MAC));
    let tasks = Arc::new(VirtualTasks::default());
    let netif = netif(&emac, &tasks);
    emac.set_busy_for(2);

    assert_eq!(netif.transmitter().send(outgoing(&netif)), Ok(()));
    assert_eq!(emac.tx_attempts(), 3);
    assert_eq!(tasks.sleeps(), [2, 2]);
    assert_eq!(*emac.sent.lock().unwrap(), [frame(PEER_MAC, 0x5a)]);
    assert_eq!(netif.pool().available(), netif.pool().capacity());
    assert_eq!(netif.stats().transmitted, 1);
}

#[test]
fn idle_mac_sends_without_sleeping() {
    let emac = Arc::new(MockEmac::new(OWN_MAC));
    let tasks = Arc::new(VirtualTasks::default());
    let netif = netif(&emac, &tasks);

    assert_eq!(netif.transmitter().send(outgoing(&netif)), Ok(()));
    assert_eq!(emac.tx_attempts(), 1);
    assert!(tasks.sleeps().is_empty());
}

#[test]
fn other_errors_are_not_retried() {
    let emac = Arc::new(MockEmac::new(OWN_MAC));
    let tasks = Arc::new(VirtualTasks::default());
    let netif = netif(&emac, &tasks);
    emac.fail_tx_with(KError::BadState);

    assert_eq!(netif.transmitter().send(outgoing(&netif)), Err(KError::BadState));
    assert_eq!(emac.tx_attempts(), 1);
    assert!(tasks.sleeps().is_empty());
    assert_eq!(netif.pool().available(), netif.pool().capacity());
}

#[test]
fn custom_retry_policy() {
    let emac = Arc::new(MockEmac::new(OWN_MAC));
    let tasks = Arc::new(VirtualTasks::default());
    let netif = netif(&emac, &tasks);
    emac.set_busy_for(usize::MAX);

    let tx = Transmitter::new(emac.clone(), tasks.clone()).with_retry(3, 7);
    assert_eq!(tx.send(outgoing(&netif)), Err(KError::HardwareBusy));
    assert_eq!(emac.tx_attempts(), 3);
    assert_eq!(tasks.sleeps(), [7, 7]);
    assert_eq!(tx.stats().snapshot().tx_failed, 1);
}

#[test]
fn tx_buffer_reports_exhaustion() {
    let emac = Arc::new(MockEmac::new(OWN_MAC));
    let tasks = Arc::new(VirtualTasks::default());
    let netif = netif(&emac, &tasks);

    let held: Vec<_> = (0..netif.pool().capacity())
        .map(|_| netif.tx_buffer(60, NO_WAIT).unwrap())
        .collect();
    assert_eq!(netif.tx_buffer(60, NO_WAIT).unwrap_err(), KError::ResourceExhausted);
    // Waiting on the virtual clock times out just the same.
    assert_eq!(netif.tx_buffer(60, 5).unwrap_err(), KError::ResourceExhausted);
    drop(held);

    let too_big = netif.pool().buffer_len() + 1;
    assert_eq!(netif.tx_buffer(too_big, NO_WAIT).unwrap_err(), KError::InvalidInput);
}
