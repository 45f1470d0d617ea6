// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! Cross-context synchronization for deferred interrupt processing.
//!
//! - [`WakeSignal`]: bounded counting signal, given from an ISR and taken by
//!   a task with a timeout
//! - [`TaskOps`]: the scheduler services the primitives are built on,
//!   including the non-blocking [`TaskOps::wake_task`] used from interrupts
//! - [`HostTasks`]: a [`TaskOps`] backed by OS threads (`std` feature)
//!
//! # Examples
//!
//! ```ignore
//! use ksync::{HostTasks, WakeSignal, WAIT_FOREVER};
//!
//! let tasks = HostTasks::default();
//! let rx_ready = WakeSignal::counting(16, 0);
//!
//! // interrupt context
//! let switch = rx_ready.give_from_irq(&tasks);
//!
//! // task context
//! rx_ready.take(&tasks, WAIT_FOREVER).unwrap();
//! ```
//!
//! # Features
//!
//! - `std`: Enable [`HostTasks`]

#![cfg_attr(not(any(test, feature = "std")), no_std)]

#[macro_use]
extern crate log;

#[cfg(feature = "std")]
mod host;
mod task;
mod wake;

pub use event_listener::EventListener;

#[cfg(feature = "std")]
pub use self::host::HostTasks;
pub use self::{
    task::{NO_WAIT, Priority, TaskId, TaskOps, Ticks, WAIT_FOREVER, deadline_after},
    wake::WakeSignal,
};
