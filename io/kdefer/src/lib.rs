// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! Deferred interrupt processing.
//!
//! Device interrupts do the minimum: the handler registered in the
//! [`Dispatcher`](kplat::Dispatcher) gives a [`WakeSignal`](ksync::WakeSignal)
//! and reports whether the woken task should preempt the interrupted one.
//! The expensive part runs in task context:
//!
//! - [`RxWorker`] drains every pending frame from the MAC into pool buffers,
//!   filters them and forwards them without ever blocking on the consumer.
//! - [`Transmitter`] sends a frame with bounded retries and always returns
//!   its buffer to the pool.
//! - [`SensorReader`] hands one sample to its caller per "sample ready"
//!   interrupt.
//!
//! [`NetIf`] wires a MAC into a dispatcher and builds the first two.
//!
//! # Features
//!
//! - `std`: Run the receive task on an OS thread (`RxWorker::spawn`,
//!   `NetIf::start_rx`).

#![cfg_attr(not(any(test, feature = "std")), no_std)]

extern crate alloc;
#[macro_use]
extern crate log;

pub mod config;
pub mod filter;
pub mod isr;
mod netif;
pub mod queue;
pub mod rx;
mod sampling;
pub mod stats;
pub mod tx;

#[cfg(feature = "std")]
mod host;

pub use self::{
    config::NetIfConfig,
    filter::{AcceptAll, FrameFilter, MacFilter},
    isr::{DeviceIsr, EmacIsr, SensorIsr},
    netif::NetIf,
    queue::{RxConsumer, RxProducer, RxSink, rx_channel},
    rx::{DrainReport, RxCycle, RxState, RxWorker},
    sampling::SensorReader,
    stats::{NetStats, NetStatsSnapshot},
    tx::Transmitter,
};
