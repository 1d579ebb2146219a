// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! Trapped register context.
//!
//! A [`TrapContext`] is the register snapshot frozen by the trap entry path.
//! It is owned exclusively by the handling call chain for the duration of the
//! trap; nothing here is shared between harts.

use core::fmt;

/// SPP bit of the mirrored `sstatus`: privilege of the interrupted context.
pub const SSTATUS_SPP: usize = 1 << 8;

/// ABI names of the general-purpose registers, indexed 0..32.
pub const REG_NAMES: [&str; 32] = [
    "zero", "ra", "sp", "gp", "tp", "t0", "t1", "t2", "s0", "s1", "a0", "a1", "a2", "a3", "a4",
    "a5", "a6", "a7", "s2", "s3", "s4", "s5", "s6", "s7", "s8", "s9", "s10", "s11", "t3", "t4",
    "t5", "t6",
];

/// Register snapshot captured at trap entry.
///
/// Layout matches the order the entry path stores registers in, so the
/// structure can be built directly over the saved area.
#[repr(C)]
#[derive(Debug, Default, Clone)]
pub struct TrapContext {
    /// General-purpose registers, indexed by architectural number.
    ///
    /// Slot 0 exists only to keep indexing trivial; it is never read or
    /// written through the accessors below.
    pub regs: [usize; 32],
    /// Faulting program counter.
    pub sepc: usize,
    /// Mirrored supervisor status register.
    pub sstatus: usize,
    /// Raw trap cause bits.
    pub scause: usize,
    /// Faulting address reported by the hardware.
    pub stval: usize,
}

static_assertions::const_assert_eq!(
    core::mem::size_of::<TrapContext>(),
    36 * core::mem::size_of::<usize>()
);

impl TrapContext {
    /// Creates an all-zero context.
    pub const fn new() -> Self {
        Self {
            regs: [0; 32],
            sepc: 0,
            sstatus: 0,
            scause: 0,
            stval: 0,
        }
    }

    /// Reads general-purpose register `index`.
    ///
    /// Register 0 always reads as zero, regardless of the backing slot.
    #[inline]
    pub fn reg(&self, index: usize) -> usize {
        if index == 0 { 0 } else { self.regs[index] }
    }

    /// Writes general-purpose register `index`.
    ///
    /// Writes to register 0 are discarded.
    #[inline]
    pub fn set_reg(&mut self, index: usize, value: usize) {
        if index != 0 {
            self.regs[index] = value;
        }
    }

    /// Whether the trap was taken from user mode.
    #[inline]
    pub fn is_user(&self) -> bool {
        self.sstatus & SSTATUS_SPP == 0
    }
}

impl fmt::Display for TrapContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "sepc: {:016x} sstatus: {:016x} scause: {:016x} stval: {:016x}",
            self.sepc, self.sstatus, self.scause, self.stval
        )?;
        for row in (1..32).step_by(3) {
            for index in row..(row + 3).min(32) {
                write!(f, " {:>4}: {:016x}", REG_NAMES[index], self.regs[index])?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
