// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! Platform interrupt plumbing.
//!
//! The trap-entry path owns a [`Dispatcher`]: on every external interrupt it
//! claims the pending line from the controller, runs the handler registered
//! for that line and completes the claim. The [`WakeHint`] the handler
//! returns tells the trap-return path whether to switch tasks.

#![cfg_attr(not(test), no_std)]
#![cfg_attr(docsrs, feature(doc_cfg))]

#[macro_use]
extern crate log;

pub mod interrupts;
pub mod plic;

pub use self::{
    interrupts::{DEFAULT_IRQ_LINES, Dispatcher, IrqHandler, IrqLine, NoopHandler, WakeHint},
    plic::{ClaimComplete, PLIC_CLAIM_COMPLETE_PADDR, PlicClaim},
};
