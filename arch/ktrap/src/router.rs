// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! Synchronous trap routing.
//!
//! Every synchronous exception lands in [`TrapCore::handle_trap`] and leaves
//! through exactly one of the [`TrapOutcome`] arms: emulated and resumed,
//! fault signal queued to the user task, kernel fixup applied, or the fatal
//! path. Handlers run to completion on the faulting hart with interrupts
//! masked; nothing here suspends.

pub use linkme::{distributed_slice as def_trap_hook, distributed_slice as register_trap_hook};

use crate::cause::{Cause, CauseInfo, SigCode, Signal, classify};
use crate::csr::CsrExecutor;
use crate::ctx::TrapContext;
use crate::decode::{EMULATED_INSN_LEN, insn_length};
use crate::die::{DieOutcome, DieReporter};
use crate::emulate;
use crate::services::{BugKind, DieEvent, KernelServices, NotifyVerdict};
use crate::stack::{MAX_HARTS, OverflowStack, report_overflow};

/// Single-step hooks offered breakpoint traps before any routing.
#[def_trap_hook]
pub static SINGLE_STEP_HOOKS: [fn(&mut TrapContext) -> bool];

/// Breakpoint hooks, consulted after the single-step family.
#[def_trap_hook]
pub static BREAKPOINT_HOOKS: [fn(&mut TrapContext) -> bool];

/// Construction-time routing policy.
#[derive(Debug, Clone, Copy)]
pub struct TrapConfig {
    /// Escalate every oops to a full-system halt.
    pub panic_on_oops: bool,
    /// Emit the one-line diagnostic for unhandled user fault signals.
    pub show_unhandled_signals: bool,
}

impl Default for TrapConfig {
    fn default() -> Self {
        Self {
            panic_on_oops: false,
            show_unhandled_signals: true,
        }
    }
}

/// Terminal outcome of one trap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrapOutcome {
    /// The faulting instruction was synthesized in software; execution
    /// resumes past it.
    Emulated,
    /// A fault signal was queued to the user task.
    UserFault,
    /// Execution resumes at a registered fixup address.
    KernelFixed,
    /// A hook or notifier claimed the trap, or a warning breakpoint was
    /// stepped over; execution resumes.
    Resumed,
    /// The fatal path ran.
    Fatal(DieOutcome),
}

/// The trap-handling core: one instance per system, built at boot.
pub struct TrapCore<S: KernelServices, E: CsrExecutor> {
    services: S,
    exec: E,
    config: TrapConfig,
    die: DieReporter,
    overflow_stacks: [OverflowStack; MAX_HARTS],
}

impl<S: KernelServices, E: CsrExecutor> TrapCore<S, E> {
    pub fn new(services: S, exec: E, config: TrapConfig) -> Self {
        Self {
            services,
            exec,
            config,
            die: DieReporter::new(config.panic_on_oops),
            overflow_stacks: [const { OverflowStack::new() }; MAX_HARTS],
        }
    }

    /// The embedding kernel's service implementation.
    pub fn services(&self) -> &S {
        &self.services
    }

    /// Incidents the fatal path has reported so far.
    pub fn die_count(&self) -> u32 {
        self.die.count()
    }

    /// Initial stack pointer of `hart`'s reserve stack, for the entry path.
    pub fn overflow_stack_top(&self, hart: usize) -> usize {
        self.overflow_stacks[hart].top()
    }

    /// Entry point for every synchronous exception.
    pub fn handle_trap(&self, tf: &mut TrapContext) -> TrapOutcome {
        match Cause::from_repr(tf.scause) {
            Some(Cause::Breakpoint) => self.handle_breakpoint(tf),
            _ => self.handle_trap_error(tf, classify(tf.scause), tf.sepc),
        }
    }

    /// Entry point when trap entry found the stack pointer inside a guard
    /// region. `task_stack` is the (bottom, top) of the exhausted stack.
    pub fn handle_bad_stack(&self, hart: usize, tf: &TrapContext, task_stack: (usize, usize)) {
        report_overflow(&self.services, tf, task_stack, &self.overflow_stacks[hart]);
    }

    fn handle_trap_error(&self, tf: &mut TrapContext, info: CauseInfo, addr: usize) -> TrapOutcome {
        self.services.set_task_bad_cause(tf.scause);

        if tf.is_user() {
            self.deliver_user_fault(tf, info, addr);
            return TrapOutcome::UserFault;
        }

        // Kernel-mode illegal instructions get an emulation attempt before
        // anything else; on success the trap is invisible to the caller.
        if info.code == SigCode::IllOpc && self.try_emulate(tf) {
            tf.sepc += EMULATED_INSN_LEN;
            tf.stval += EMULATED_INSN_LEN;
            return TrapOutcome::Emulated;
        }

        if let Some(target) = self.services.fixup_exception(tf.sepc) {
            tf.sepc = target;
            return TrapOutcome::KernelFixed;
        }

        TrapOutcome::Fatal(self.die.die(&self.services, tf, info.desc))
    }

    fn deliver_user_fault(&self, tf: &TrapContext, info: CauseInfo, addr: usize) {
        if self.config.show_unhandled_signals
            && self.services.signal_unhandled(info.signal)
            && self.services.printk_ratelimit()
        {
            info!(
                "{}[{}]: unhandled signal {:?} code {:?} at 0x{:016x}",
                self.services.task_comm(),
                self.services.task_pid(),
                info.signal,
                info.code,
                addr
            );
            debug!("{tf}");
        }
        self.services.force_sig_fault(info.signal, info.code, addr);
    }

    fn handle_breakpoint(&self, tf: &mut TrapContext) -> TrapOutcome {
        // Both hook families get first refusal, single-step before
        // breakpoint; the first claimant stops routing.
        if SINGLE_STEP_HOOKS.iter().any(|hook| hook(tf))
            || BREAKPOINT_HOOKS.iter().any(|hook| hook(tf))
        {
            return TrapOutcome::Resumed;
        }

        self.services.set_task_bad_cause(tf.scause);

        if tf.is_user() {
            self.services
                .force_sig_fault(Signal::Trap, SigCode::Brkpt, tf.sepc);
            return TrapOutcome::UserFault;
        }

        if self
            .services
            .notify_die(DieEvent::Trap, "EBREAK", tf, 0, Signal::Trap)
            == NotifyVerdict::Stop
        {
            return TrapOutcome::Resumed;
        }

        match self.services.report_bug(tf.sepc) {
            BugKind::Warning => {
                tf.sepc += self.break_insn_length(tf.sepc);
                TrapOutcome::Resumed
            }
            _ => TrapOutcome::Fatal(self.die.die(&self.services, tf, "Kernel BUG")),
        }
    }

    fn try_emulate(&self, tf: &mut TrapContext) -> bool {
        // A fetch failure is an immediate decline, not an error.
        let Some(word) = self.services.fetch_insn(tf.sepc) else {
            return false;
        };
        emulate::dispatch(&self.exec, tf, word)
    }

    fn break_insn_length(&self, pc: usize) -> usize {
        self.services.fetch_insn(pc).map(insn_length).unwrap_or(0)
    }
}
