// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! Test doubles for the kernel-services boundary and the CSR executor.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::cause::{SigCode, Signal};
use crate::csr::{CsrExecutor, CsrTemplate};
use crate::ctx::TrapContext;
use crate::services::{BugKind, DieEvent, KernelServices, NotifyVerdict, Taint};

/// A recorded call into the kernel-services boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceEvent {
    ForceSig(Signal, SigCode, usize),
    TerminateTask(Signal),
    Halt(String),
    Taint(Taint),
    CrashDump,
    NotifyDie(DieEvent),
}

/// Recording kernel-services double with per-test knobs.
pub struct MockServices {
    fail_fetch: AtomicBool,
    fixup: Mutex<Option<usize>>,
    verdict: Mutex<NotifyVerdict>,
    bug_kind: Mutex<BugKind>,
    kexec_should_crash: AtomicBool,
    in_trap_context: AtomicBool,
    bad_cause: Mutex<Option<usize>>,
    events: Mutex<Vec<ServiceEvent>>,
}

impl MockServices {
    pub fn new() -> Self {
        Self {
            fail_fetch: AtomicBool::new(false),
            fixup: Mutex::new(None),
            verdict: Mutex::new(NotifyVerdict::Continue),
            bug_kind: Mutex::new(BugKind::NotABug),
            kexec_should_crash: AtomicBool::new(false),
            in_trap_context: AtomicBool::new(false),
            bad_cause: Mutex::new(None),
            events: Mutex::new(Vec::new()),
        }
    }

    pub fn set_fail_fetch(&self, fail: bool) {
        self.fail_fetch.store(fail, Ordering::Relaxed);
    }

    pub fn set_fixup(&self, target: Option<usize>) {
        *self.fixup.lock().unwrap() = target;
    }

    pub fn set_notify_verdict(&self, verdict: NotifyVerdict) {
        *self.verdict.lock().unwrap() = verdict;
    }

    pub fn set_bug_kind(&self, kind: BugKind) {
        *self.bug_kind.lock().unwrap() = kind;
    }

    pub fn set_kexec_should_crash(&self, eligible: bool) {
        self.kexec_should_crash.store(eligible, Ordering::Relaxed);
    }

    pub fn set_in_trap_context(&self, nested: bool) {
        self.in_trap_context.store(nested, Ordering::Relaxed);
    }

    pub fn bad_cause(&self) -> Option<usize> {
        *self.bad_cause.lock().unwrap()
    }

    pub fn events(&self) -> Vec<ServiceEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn saw(&self, event: &ServiceEvent) -> bool {
        self.events.lock().unwrap().contains(event)
    }

    pub fn saw_halt(&self, reason: &str) -> bool {
        self.saw(&ServiceEvent::Halt(reason.into()))
    }

    fn record(&self, event: ServiceEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl KernelServices for MockServices {
    fn fetch_insn(&self, pc: usize) -> Option<u32> {
        if self.fail_fetch.load(Ordering::Relaxed) {
            return None;
        }
        // Tests point the program counter at words they own.
        Some(unsafe { (pc as *const u32).read() })
    }

    fn force_sig_fault(&self, signal: Signal, code: SigCode, addr: usize) {
        self.record(ServiceEvent::ForceSig(signal, code, addr));
    }

    fn fixup_exception(&self, _pc: usize) -> Option<usize> {
        *self.fixup.lock().unwrap()
    }

    fn notify_die(
        &self,
        event: DieEvent,
        _desc: &str,
        _tf: &TrapContext,
        _err: usize,
        _signal: Signal,
    ) -> NotifyVerdict {
        self.record(ServiceEvent::NotifyDie(event));
        *self.verdict.lock().unwrap()
    }

    fn kexec_should_crash(&self) -> bool {
        self.kexec_should_crash.load(Ordering::Relaxed)
    }

    fn crash_dump(&self, _tf: &TrapContext) {
        self.record(ServiceEvent::CrashDump);
    }

    fn report_bug(&self, _pc: usize) -> BugKind {
        *self.bug_kind.lock().unwrap()
    }

    fn add_taint(&self, taint: Taint) {
        self.record(ServiceEvent::Taint(taint));
    }

    fn in_trap_context(&self) -> bool {
        self.in_trap_context.load(Ordering::Relaxed)
    }

    fn task_comm(&self) -> &str {
        "mocktask"
    }

    fn task_pid(&self) -> u32 {
        42
    }

    fn set_task_bad_cause(&self, cause: usize) {
        *self.bad_cause.lock().unwrap() = Some(cause);
    }

    fn system_halt(&self, reason: &str) {
        self.record(ServiceEvent::Halt(reason.into()));
    }

    fn terminate_task(&self, signal: Signal) {
        self.record(ServiceEvent::TerminateTask(signal));
    }
}

/// Simulated CSR file: runs templates by decoding their patched address
/// field instead of executing the machine words.
pub struct SimCsrExecutor {
    csrs: Mutex<BTreeMap<u16, usize>>,
    accesses: AtomicUsize,
}

impl SimCsrExecutor {
    pub fn new() -> Self {
        Self {
            csrs: Mutex::new(BTreeMap::new()),
            accesses: AtomicUsize::new(0),
        }
    }

    /// Seeds a CSR with a value.
    pub fn preset(&self, csr: u16, value: usize) {
        self.csrs.lock().unwrap().insert(csr, value);
    }

    /// Current value of a CSR (0 when never written).
    pub fn value(&self, csr: u16) -> usize {
        self.csrs.lock().unwrap().get(&csr).copied().unwrap_or(0)
    }

    /// Template executions so far.
    pub fn accesses(&self) -> usize {
        self.accesses.load(Ordering::Relaxed)
    }
}

impl CsrExecutor for SimCsrExecutor {
    fn read(&self, template: &CsrTemplate) -> usize {
        self.accesses.fetch_add(1, Ordering::Relaxed);
        self.value(template.target())
    }

    fn write(&self, template: &CsrTemplate, value: usize) {
        self.accesses.fetch_add(1, Ordering::Relaxed);
        self.csrs.lock().unwrap().insert(template.target(), value);
    }
}
