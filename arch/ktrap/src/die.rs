// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! Fatal-error reporting (the die/oops path).

use core::sync::atomic::{AtomicU32, Ordering};

use log::LevelFilter;

use crate::cause::Signal;
use crate::ctx::TrapContext;
use crate::services::{DieEvent, KernelServices, NotifyVerdict, Taint};

/// How a die invocation resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DieOutcome {
    /// The whole system was halted.
    Halted,
    /// Only the faulting task was terminated.
    TaskKilled,
    /// A notifier claimed the oops; the system keeps running.
    Survived,
}

/// Serialized oops/die reporting with a system-lifetime incident counter.
///
/// One instance exists per system, owned by the trap core. The lock keeps
/// concurrent fatal errors on different harts from interleaving their dumps;
/// trap entry already runs with interrupts masked, so holding it is safe in
/// this context.
pub struct DieReporter {
    lock: spin::Mutex<()>,
    counter: AtomicU32,
    panic_on_oops: bool,
}

impl DieReporter {
    pub const fn new(panic_on_oops: bool) -> Self {
        Self {
            lock: spin::Mutex::new(()),
            counter: AtomicU32::new(0),
            panic_on_oops,
        }
    }

    /// Incidents reported so far. Monotonic for the system lifetime.
    pub fn count(&self) -> u32 {
        self.counter.load(Ordering::Relaxed)
    }

    /// Dumps diagnostics for a fatal kernel-mode fault and resolves its
    /// terminal outcome.
    pub fn die<S: KernelServices>(
        &self,
        services: &S,
        tf: &TrapContext,
        desc: &str,
    ) -> DieOutcome {
        let guard = self.lock.lock();
        let incident = self.counter.fetch_add(1, Ordering::Relaxed) + 1;

        log::set_max_level(LevelFilter::Trace);
        error!("{desc} [#{incident}]");
        services.print_modules();
        error!("{tf}");

        let verdict = services.notify_die(DieEvent::Oops, desc, tf, 0, Signal::Segv);

        if services.kexec_should_crash() {
            services.crash_dump(tf);
        }

        services.add_taint(Taint::DIE);
        drop(guard);

        if services.in_trap_context() {
            services.system_halt("Fatal exception in interrupt");
            return DieOutcome::Halted;
        }
        if self.panic_on_oops {
            services.system_halt("Fatal exception");
            return DieOutcome::Halted;
        }
        if verdict != NotifyVerdict::Stop {
            services.terminate_task(Signal::Segv);
            return DieOutcome::TaskKilled;
        }
        DieOutcome::Survived
    }
}
