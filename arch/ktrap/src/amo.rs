// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! AMO instruction emulation.
//!
//! Atomics the hardware cannot execute are synthesized as plain
//! read-modify-write sequences. Two documented fidelity limits:
//!
//! - nothing here is atomic: a concurrent access to the same address can
//!   interleave with the emulated sequence;
//! - store-conditional carries no reservation state and always reports
//!   success, pairing or no pairing with a preceding load-reserved.

use crate::ctx::TrapContext;
use crate::decode::AmoInsn;

pub const AMO_ADD: u32 = 0b00000;
pub const AMO_SWAP: u32 = 0b00001;
pub const AMO_LR: u32 = 0b00010;
pub const AMO_SC: u32 = 0b00011;
pub const AMO_XOR: u32 = 0b00100;
pub const AMO_OR: u32 = 0b01000;
pub const AMO_AND: u32 = 0b01100;

/// Emulates one AMO-family instruction.
///
/// The base address is taken literally from rs1, accesses are native-word
/// sized, and no alignment check is made here (a misaligned trap would have
/// fired before this point on targets that trap them).
///
/// Returns `false` for a selector outside the emulated set, in which case
/// neither memory nor the register file has been touched.
///
/// rs1 must point at readable, writable memory or the access faults exactly
/// as the real AMO would have; the trap path cannot vouch for the address
/// any more than the hardware could.
pub(crate) fn emulate_amo(tf: &mut TrapContext, insn: &AmoInsn) -> bool {
    match insn.func {
        AMO_ADD | AMO_SWAP | AMO_LR | AMO_SC | AMO_XOR | AMO_OR | AMO_AND => {}
        _ => return false,
    }

    let addr = tf.reg(insn.rs1) as *mut usize;
    let rs2 = tf.reg(insn.rs2);

    // Every variant hands back the pre-operation memory value, including
    // load-reserved (for which it is the whole effect).
    let old = unsafe { addr.read_volatile() };
    tf.set_reg(insn.rd, old);

    match insn.func {
        AMO_LR => {}
        AMO_SC => {
            // Lie and always say it's good.
            tf.set_reg(insn.rd, 0);
            unsafe { addr.write_volatile(rs2) };
        }
        AMO_SWAP => unsafe { addr.write_volatile(rs2) },
        AMO_ADD => unsafe { addr.write_volatile(old.wrapping_add(rs2)) },
        AMO_XOR => unsafe { addr.write_volatile(old ^ rs2) },
        AMO_AND => unsafe { addr.write_volatile(old & rs2) },
        AMO_OR => unsafe { addr.write_volatile(old | rs2) },
        _ => unreachable!(),
    }
    true
}
