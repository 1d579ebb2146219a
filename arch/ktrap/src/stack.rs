// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! Kernel stack-overflow guard.
//!
//! When trap entry finds the stack pointer inside a guard region, the hart
//! switches onto a reserve stack that exists purely to get the diagnostics
//! out; overflow is never recoverable and always ends in a system halt.

use core::cell::UnsafeCell;

use crate::ctx::TrapContext;
use crate::services::KernelServices;

/// Size of each per-hart reserve stack.
pub const OVERFLOW_STACK_SIZE: usize = 4096;

/// Harts the trap core reserves overflow stacks for.
pub const MAX_HARTS: usize = 8;

/// One reserve stack region, never used for normal execution.
///
/// The entry path runs on it via raw stack-pointer switching, so the bytes
/// live in an `UnsafeCell`; Rust code only ever takes its bounds.
#[repr(C, align(16))]
pub struct OverflowStack(UnsafeCell<[u8; OVERFLOW_STACK_SIZE]>);

// Bounds-only access from Rust; the region itself is per-hart.
unsafe impl Sync for OverflowStack {}

impl OverflowStack {
    pub const fn new() -> Self {
        Self(UnsafeCell::new([0; OVERFLOW_STACK_SIZE]))
    }

    /// Lowest address of the region.
    pub fn bottom(&self) -> usize {
        self.0.get() as usize
    }

    /// One past the highest address; the initial stack pointer when the
    /// entry path switches onto this region.
    pub fn top(&self) -> usize {
        self.bottom() + OVERFLOW_STACK_SIZE
    }
}

/// Whether `sp` has crossed from the task stack into the guard region of
/// `guard_size` bytes directly below `stack_bottom`.
pub fn sp_in_guard(sp: usize, stack_bottom: usize, guard_size: usize) -> bool {
    sp < stack_bottom && sp >= stack_bottom.saturating_sub(guard_size)
}

/// Prints the overflow diagnostics and halts the system.
///
/// `task_stack` is the (bottom, top) of the stack that overflowed.
pub(crate) fn report_overflow<S: KernelServices>(
    services: &S,
    tf: &TrapContext,
    task_stack: (usize, usize),
    reserve: &OverflowStack,
) {
    log::set_max_level(log::LevelFilter::Trace);
    error!("Insufficient stack space to handle exception!");
    error!(
        "Task stack:     [0x{:016x}..0x{:016x}]",
        task_stack.0, task_stack.1
    );
    error!(
        "Overflow stack: [0x{:016x}..0x{:016x}]",
        reserve.bottom(),
        reserve.top()
    );
    error!("{tf}");
    services.system_halt("Kernel stack overflow");
}
