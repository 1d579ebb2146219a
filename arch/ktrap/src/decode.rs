// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! Illegal-instruction decoding.
//!
//! All raw bit extraction lives here; the emulation units only ever see the
//! tagged [`DecodedInsn`] form. Decoding is pure and has no side effects.

/// AMO major opcode.
pub const OPCODE_AMO: u32 = 0b010_1111;
/// SYSTEM major opcode (the CSR instruction family).
pub const OPCODE_SYSTEM: u32 = 0b111_0011;

/// Width of every instruction eligible for emulation. Compressed forms are
/// never candidates, so this is a fixed 4 bytes.
pub const EMULATED_INSN_LEN: usize = 4;

/// A CSR-family instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsrInsn {
    /// CSR address, bits [31:20].
    pub csr: u16,
    /// Sub-operation selector, bits [14:12].
    pub funct3: u32,
    /// Destination register, bits [11:7].
    pub rd: usize,
    /// Raw source field, bits [19:15]: a register number, or the
    /// zero-extended immediate for the `i` forms.
    pub rs1: usize,
}

/// An AMO-family instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AmoInsn {
    /// Atomic-operation selector, bits [31:27].
    pub func: u32,
    /// Destination register, bits [11:7].
    pub rd: usize,
    /// Base-address register, bits [19:15].
    pub rs1: usize,
    /// Operand register, bits [24:20].
    pub rs2: usize,
}

/// An instruction the emulation path understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodedInsn {
    Csr(CsrInsn),
    Amo(AmoInsn),
}

#[inline]
fn rd(word: u32) -> usize {
    ((word >> 7) & 0x1f) as usize
}

#[inline]
fn rs1(word: u32) -> usize {
    ((word >> 15) & 0x1f) as usize
}

#[inline]
fn rs2(word: u32) -> usize {
    ((word >> 20) & 0x1f) as usize
}

/// Decodes a raw instruction word into one of the emulated families.
///
/// Returns `None` for any other opcode class; the caller treats that as
/// "emulation not applicable".
pub fn decode(word: u32) -> Option<DecodedInsn> {
    match word & 0x7f {
        OPCODE_SYSTEM => Some(DecodedInsn::Csr(CsrInsn {
            csr: ((word >> 20) & 0xfff) as u16,
            funct3: (word >> 12) & 0x7,
            rd: rd(word),
            rs1: rs1(word),
        })),
        OPCODE_AMO => Some(DecodedInsn::Amo(AmoInsn {
            func: (word >> 27) & 0x1f,
            rd: rd(word),
            rs1: rs1(word),
            rs2: rs2(word),
        })),
        _ => None,
    }
}

/// Length in bytes of the instruction starting with `word`.
///
/// Both low bits set means a full 32-bit encoding; anything else is a
/// compressed 16-bit one.
#[inline]
pub fn insn_length(word: u32) -> usize {
    if word & 0b11 == 0b11 { 4 } else { 2 }
}
