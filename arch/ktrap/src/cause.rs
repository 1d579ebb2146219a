// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! Trap cause classification.
//!
//! One data table maps each synchronous exception cause to the fault signal
//! it resolves to, so the router needs a single generic handler instead of
//! one entry point per cause.

use strum::FromRepr;

/// Synchronous exception causes, by raw `scause` value.
#[repr(usize)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRepr)]
pub enum Cause {
    InsnMisaligned = 0,
    InsnFault = 1,
    IllegalInsn = 2,
    Breakpoint = 3,
    LoadMisaligned = 4,
    LoadFault = 5,
    StoreMisaligned = 6,
    StoreFault = 7,
    EcallU = 8,
    EcallS = 9,
    EcallM = 11,
}

/// Fault signal kinds deliverable to a task.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Ill = 4,
    Trap = 5,
    Bus = 7,
    Segv = 11,
}

/// Signal sub-codes. The ABI numbering is per-signal, so the embedding
/// kernel maps these to raw `si_code` values at delivery time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SigCode {
    /// Illegal opcode.
    IllOpc,
    /// Illegal trap.
    IllTrp,
    /// Address alignment.
    AdrAln,
    /// Access error.
    AccErr,
    /// Breakpoint trap.
    Brkpt,
}

/// Resolution of a classified cause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CauseInfo {
    pub signal: Signal,
    pub code: SigCode,
    pub desc: &'static str,
}

const fn info(signal: Signal, code: SigCode, desc: &'static str) -> CauseInfo {
    CauseInfo { signal, code, desc }
}

/// Per-cause resolution table. Breakpoints take a parallel path and are not
/// listed here.
const CAUSE_TABLE: &[(Cause, CauseInfo)] = &[
    (
        Cause::InsnMisaligned,
        info(
            Signal::Bus,
            SigCode::AdrAln,
            "Oops - instruction address misaligned",
        ),
    ),
    (
        Cause::InsnFault,
        info(
            Signal::Segv,
            SigCode::AccErr,
            "Oops - instruction access fault",
        ),
    ),
    (
        Cause::IllegalInsn,
        info(Signal::Ill, SigCode::IllOpc, "Oops - illegal instruction"),
    ),
    (
        Cause::LoadMisaligned,
        info(Signal::Bus, SigCode::AdrAln, "Oops - load address misaligned"),
    ),
    (
        Cause::LoadFault,
        info(Signal::Segv, SigCode::AccErr, "Oops - load access fault"),
    ),
    (
        Cause::StoreMisaligned,
        info(
            Signal::Bus,
            SigCode::AdrAln,
            "Oops - store (or AMO) address misaligned",
        ),
    ),
    (
        Cause::StoreFault,
        info(
            Signal::Segv,
            SigCode::AccErr,
            "Oops - store (or AMO) access fault",
        ),
    ),
    (
        Cause::EcallU,
        info(
            Signal::Ill,
            SigCode::IllTrp,
            "Oops - environment call from U-mode",
        ),
    ),
    (
        Cause::EcallS,
        info(
            Signal::Ill,
            SigCode::IllTrp,
            "Oops - environment call from S-mode",
        ),
    ),
    (
        Cause::EcallM,
        info(
            Signal::Ill,
            SigCode::IllTrp,
            "Oops - environment call from M-mode",
        ),
    ),
];

/// Resolves a raw cause value. Causes outside the table fall back to the
/// unknown-exception entry.
pub fn classify(raw_cause: usize) -> CauseInfo {
    if let Some(cause) = Cause::from_repr(raw_cause) {
        for (entry, resolved) in CAUSE_TABLE {
            if *entry == cause {
                return *resolved;
            }
        }
    }
    info(Signal::Ill, SigCode::IllTrp, "Oops - unknown exception")
}
