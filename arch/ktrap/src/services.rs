// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! Boundary to the rest of the kernel.
//!
//! The trap core never reaches into task, signal, or crash machinery
//! directly; everything it needs from the embedding kernel goes through
//! [`KernelServices`], so the core stays testable off-target.

use bitflags::bitflags;

use crate::cause::{SigCode, Signal};
use crate::ctx::TrapContext;

/// Verdict of the die-notifier chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyVerdict {
    /// Keep going with default handling.
    Continue,
    /// An observer claimed the event; suppress default handling.
    Stop,
}

/// Event kinds offered to the die-notifier chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DieEvent {
    /// A kernel oops in flight.
    Oops,
    /// An unclaimed kernel-mode breakpoint.
    Trap,
}

/// Bug-table classification of a breakpoint address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BugKind {
    /// A warning entry: report and step past it.
    Warning,
    /// A real BUG entry: fatal.
    Fatal,
    /// The address is not in the bug table.
    NotABug,
}

bitflags! {
    /// Persistent kernel taint reasons.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Taint: u32 {
        /// The kernel died at least once.
        const DIE = 1 << 7;
    }
}

/// Kernel facilities consumed by the trap core.
///
/// Implementations must be callable with interrupts disabled. `system_halt`
/// and `terminate_task` do not return on a real kernel; they return here so
/// host test doubles can record the call instead.
pub trait KernelServices: Sync {
    /// Fault-tolerant instruction fetch at `pc`. `None` when the word cannot
    /// be read (unmapped or partially mapped address).
    fn fetch_insn(&self, pc: usize) -> Option<u32>;

    /// Queues a fault signal for delivery to the current task.
    fn force_sig_fault(&self, signal: Signal, code: SigCode, addr: usize);

    /// Looks up an exception-table fixup for `pc`, returning the resume
    /// address when one is registered.
    fn fixup_exception(&self, pc: usize) -> Option<usize>;

    /// Offers an event to the die-notifier chain.
    fn notify_die(
        &self,
        event: DieEvent,
        desc: &str,
        tf: &TrapContext,
        err: usize,
        signal: Signal,
    ) -> NotifyVerdict;

    /// Whether a crash dump mechanism is configured and the current task is
    /// eligible to trigger it.
    fn kexec_should_crash(&self) -> bool {
        false
    }

    /// Fires the out-of-band crash dump.
    fn crash_dump(&self, _tf: &TrapContext) {}

    /// Classifies `pc` against the kernel bug table.
    fn report_bug(&self, _pc: usize) -> BugKind {
        BugKind::NotABug
    }

    /// Marks the kernel as tainted.
    fn add_taint(&self, _taint: Taint) {}

    /// Whether the caller is already nested inside another trap or interrupt
    /// context.
    fn in_trap_context(&self) -> bool;

    /// Rate limiter for unhandled-signal diagnostics.
    fn printk_ratelimit(&self) -> bool {
        true
    }

    /// Whether the current task leaves `signal` unhandled (no handler
    /// installed), making the diagnostic worth printing.
    fn signal_unhandled(&self, _signal: Signal) -> bool {
        true
    }

    /// Short name of the current task.
    fn task_comm(&self) -> &str {
        "?"
    }

    /// Pid of the current task.
    fn task_pid(&self) -> u32 {
        0
    }

    /// Records the raw cause of the last fault in the current task for
    /// later diagnostics.
    fn set_task_bad_cause(&self, _cause: usize) {}

    /// Prints the loaded-module list into the oops dump.
    fn print_modules(&self) {}

    /// Halts the whole system. Never returns on a real kernel.
    fn system_halt(&self, reason: &str);

    /// Terminates the current task with a fatal signal. Never returns to
    /// the faulting context on a real kernel.
    fn terminate_task(&self, signal: Signal);
}
