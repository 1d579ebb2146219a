// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! Synchronous exception handling and illegal-instruction emulation.
//!
//! This crate is the target-independent core behind the RISC-V trap vector:
//! it classifies synchronous exception causes, synthesizes the two
//! instruction families the hardware lacks (CSR accesses and AMOs), delivers
//! fault signals to user tasks, applies kernel exception-table fixups, and
//! drives the die/oops path when nothing else applies. The assembly entry
//! path and the kernel facilities it calls into (signal delivery, notifier
//! chain, crash dump, bug table) stay outside, behind [`KernelServices`].

#![cfg_attr(not(test), no_std)]

#[macro_use]
extern crate log;

mod amo;
mod cause;
mod csr;
mod ctx;
mod decode;
mod die;
mod emulate;
mod router;
mod services;
mod stack;

#[cfg(test)]
mod test_support;

pub use cause::{Cause, CauseInfo, SigCode, Signal, classify};
#[cfg(any(target_arch = "riscv32", target_arch = "riscv64"))]
pub use csr::NativeCsrExecutor;
pub use csr::{
    CSR_FIELD_LSB, CSR_SET_FORCED_BITS, CSR_SSTATUS, CsrExecutor, CsrTemplate, PATCH_WORD,
};
pub use ctx::{REG_NAMES, SSTATUS_SPP, TrapContext};
pub use decode::{
    AmoInsn, CsrInsn, DecodedInsn, EMULATED_INSN_LEN, OPCODE_AMO, OPCODE_SYSTEM, decode,
    insn_length,
};
pub use die::{DieOutcome, DieReporter};
pub use router::{
    BREAKPOINT_HOOKS, SINGLE_STEP_HOOKS, TrapConfig, TrapCore, TrapOutcome, def_trap_hook,
    register_trap_hook,
};
pub use services::{BugKind, DieEvent, KernelServices, NotifyVerdict, Taint};
pub use stack::{MAX_HARTS, OVERFLOW_STACK_SIZE, OverflowStack, sp_in_guard};
