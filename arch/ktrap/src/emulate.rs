// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 KylinSoft Co., Ltd. <https://www.kylinos.cn/>
// See LICENSES for license details.

//! Illegal-instruction emulation dispatch.

use crate::amo::emulate_amo;
use crate::csr::{CsrExecutor, emulate_csr};
use crate::ctx::TrapContext;
use crate::decode::{DecodedInsn, decode};

/// Routes a fetched instruction word to the matching emulation unit.
///
/// Returns `true` when the instruction's effect has been synthesized into
/// the context; the caller is then responsible for stepping the program
/// counter past it. Declines without side effects for anything outside the
/// two emulated families.
pub(crate) fn dispatch<E: CsrExecutor>(exec: &E, tf: &mut TrapContext, word: u32) -> bool {
    match decode(word) {
        Some(DecodedInsn::Amo(insn)) => emulate_amo(tf, &insn),
        Some(DecodedInsn::Csr(insn)) => emulate_csr(exec, tf, &insn),
        None => false,
    }
}
