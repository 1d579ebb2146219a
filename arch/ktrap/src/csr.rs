// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! CSR instruction emulation.
//!
//! The hardware has no working CSR file access for the trapped instruction,
//! so an arbitrary CSR is reached through a pre-encoded native template: a
//! single CSR instruction plus `ret`, whose address field is patched in
//! place before the template runs. Each emulation patches its own private
//! copy of the template, so concurrent emulations on different harts cannot
//! observe each other's target address.

use crate::ctx::TrapContext;
use crate::decode::CsrInsn;

/// The one CSR whose value is mirrored directly into the trapped context.
pub const CSR_SSTATUS: u16 = 0x300;

/// Bits forced on by every `set` sub-operation. Interrupt enable stays up
/// no matter what the guest instruction asked for.
pub const CSR_SET_FORCED_BITS: usize = 0x80;

/// Word index of the patchable CSR instruction inside a template.
pub const PATCH_WORD: usize = 0;
/// Bit position of the 12-bit CSR address field within that word.
pub const CSR_FIELD_LSB: u32 = 20;

const CSR_FIELD_MASK: u32 = 0xfff << CSR_FIELD_LSB;

/// `csrrs a0, 0x000, zero` — read the placeholder CSR into a0.
const INSN_TEMPLATE_READ: u32 = 0x0000_2573;
/// `csrrw zero, 0x000, a0` — write a0 to the placeholder CSR.
const INSN_TEMPLATE_WRITE: u32 = 0x0005_1073;
/// `ret`
const INSN_RET: u32 = 0x0000_8067;

/// A private, patchable copy of one CSR access routine.
///
/// The buffer holds real machine code; on targets that enforce W^X the
/// executor is responsible for placing it in executable memory before
/// running it.
#[repr(C, align(4))]
#[derive(Debug, Clone)]
pub struct CsrTemplate {
    code: [u32; 2],
}

impl CsrTemplate {
    /// A fresh read template, still pointing at the placeholder address.
    pub const fn read() -> Self {
        Self {
            code: [INSN_TEMPLATE_READ, INSN_RET],
        }
    }

    /// A fresh write template, still pointing at the placeholder address.
    pub const fn write() -> Self {
        Self {
            code: [INSN_TEMPLATE_WRITE, INSN_RET],
        }
    }

    /// Redirects the template's CSR instruction at `csr`.
    pub fn patch(&mut self, csr: u16) {
        let word = &mut self.code[PATCH_WORD];
        *word = (*word & !CSR_FIELD_MASK) | ((csr as u32) << CSR_FIELD_LSB);
    }

    /// The CSR address the template currently targets.
    pub fn target(&self) -> u16 {
        ((self.code[PATCH_WORD] & CSR_FIELD_MASK) >> CSR_FIELD_LSB) as u16
    }

    /// The machine words of the routine.
    pub fn words(&self) -> &[u32; 2] {
        &self.code
    }
}

/// Runs a patched [`CsrTemplate`].
///
/// The native implementation executes the buffer on the faulting hart; test
/// builds substitute a simulated CSR file keyed by [`CsrTemplate::target`].
pub trait CsrExecutor: Sync {
    /// Executes a read template, returning the CSR's value.
    fn read(&self, template: &CsrTemplate) -> usize;
    /// Executes a write template with `value` as the operand.
    fn write(&self, template: &CsrTemplate, value: usize);
}

cfg_if::cfg_if! {
    if #[cfg(any(target_arch = "riscv32", target_arch = "riscv64"))] {
        /// Executes templates directly on the current hart.
        pub struct NativeCsrExecutor;

        impl CsrExecutor for NativeCsrExecutor {
            fn read(&self, template: &CsrTemplate) -> usize {
                // The template was just written through the data cache;
                // order it against the fetch below.
                unsafe {
                    riscv::asm::fence_i();
                    let routine: extern "C" fn() -> usize =
                        core::mem::transmute(template.words().as_ptr());
                    routine()
                }
            }

            fn write(&self, template: &CsrTemplate, value: usize) {
                unsafe {
                    riscv::asm::fence_i();
                    let routine: extern "C" fn(usize) =
                        core::mem::transmute(template.words().as_ptr());
                    routine(value)
                }
            }
        }
    }
}

/// Reads the current value of `csr`, going through the context mirror for
/// the status register and a patched template for everything else.
fn csr_read<E: CsrExecutor>(exec: &E, tf: &TrapContext, csr: u16) -> usize {
    if csr == CSR_SSTATUS {
        return tf.sstatus;
    }
    let mut template = CsrTemplate::read();
    template.patch(csr);
    exec.read(&template)
}

fn csr_write<E: CsrExecutor>(exec: &E, tf: &mut TrapContext, csr: u16, value: usize) {
    if csr == CSR_SSTATUS {
        tf.sstatus = value;
        return;
    }
    let mut template = CsrTemplate::write();
    template.patch(csr);
    exec.write(&template, value);
}

/// Emulates one CSR-family instruction against the trapped context.
///
/// The destination register receives the CSR's pre-update value, matching
/// the real instruction's read-before-write contract. Returns `false` only
/// when the selector does not name a CSR operation.
pub(crate) fn emulate_csr<E: CsrExecutor>(exec: &E, tf: &mut TrapContext, insn: &CsrInsn) -> bool {
    if insn.funct3 == 0 {
        // PRIV encodings (ecall/ebreak/...), not a CSR access.
        return false;
    }

    // The `i` forms carry the operand in the rs1 field itself.
    let src = if insn.funct3 & 0b100 != 0 {
        insn.rs1
    } else {
        tf.reg(insn.rs1)
    };

    let old = csr_read(exec, tf, insn.csr);
    tf.set_reg(insn.rd, old);

    let new = match insn.funct3 & 0b11 {
        0b01 => src,
        0b10 => old | src | CSR_SET_FORCED_BITS,
        0b11 => old & !src,
        // funct3 == 0b100 decodes to no update; write the value back as is.
        _ => old,
    };
    csr_write(exec, tf, insn.csr, new);
    true
}
