//! The static GCN instruction table.
//!
//! Raw per-class entries are declared in [`data`]; at first use they are
//! sorted by (mnemonic, encoding, arch-mask) and run through the fusion
//! pass that folds each VOP3A/VOP3B row into the matching VOP2/VOP1/VOPC
//! row (and VINTRP into VOP3) so that one lookup reaches both the short
//! form and its 64-bit promotion. The fused table is immutable afterwards
//! and shared by every codec instance.

use std::sync::OnceLock;

use crate::arch::{ArchMask, GcnArch};

mod data;

/// Encoding class of a table row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GcnEnc {
    Sop2,
    Sop1,
    Sopk,
    Sopc,
    Sopp,
    /// SMRD on GCN 1.0/1.1, dispatched to SMEM on GCN 1.2+.
    Smrd,
    Vop2,
    Vop1,
    Vopc,
    Vop3A,
    Vop3B,
    Vop3P,
    Vintrp,
    Ds,
    Mubuf,
    Mtbuf,
    Mimg,
    Exp,
    Flat,
}

impl GcnEnc {
    /// Display name used for `*_ill_<N>` placeholders.
    pub fn ill_prefix(self) -> &'static str {
        match self {
            GcnEnc::Sop2 => "SOP2",
            GcnEnc::Sop1 => "SOP1",
            GcnEnc::Sopk => "SOPK",
            GcnEnc::Sopc => "SOPC",
            GcnEnc::Sopp => "SOPP",
            GcnEnc::Smrd => "SMRD",
            GcnEnc::Vop2 => "VOP2",
            GcnEnc::Vop1 => "VOP1",
            GcnEnc::Vopc => "VOPC",
            GcnEnc::Vop3A | GcnEnc::Vop3B => "VOP3",
            GcnEnc::Vop3P => "VOP3P",
            GcnEnc::Vintrp => "VINTRP",
            GcnEnc::Ds => "DS",
            GcnEnc::Mubuf => "MUBUF",
            GcnEnc::Mtbuf => "MTBUF",
            GcnEnc::Mimg => "MIMG",
            GcnEnc::Exp => "EXP",
            GcnEnc::Flat => "FLAT",
        }
    }
}

/// Mode-flag namespace for table rows.
///
/// The low nibble selects the operand pattern (meaning depends on the
/// encoding class); the remaining bits are orthogonal flags. The packing
/// keeps each table row a single short line.
pub mod mode {
    /// Operand-pattern selector mask.
    pub const PATTERN_MASK: u32 = 0xf;
    pub const STD: u32 = 0;
    /// No destination operand (e.g. `s_cbranch_g_fork`, `s_setpc_b64`).
    pub const DST_NONE: u32 = 1;
    /// Destination only (e.g. `s_getpc_b64`).
    pub const SRC_NONE: u32 = 2;
    /// No operands at all.
    pub const ARG_NONE: u32 = 3;
    /// 16-bit PC-relative branch payload.
    pub const IMM_REL: u32 = 4;
    /// `s_getreg_b32 sdst, hwreg(...)`.
    pub const HWREG_DST: u32 = 5;
    /// `s_setreg_b32 hwreg(...), ssrc`.
    pub const HWREG_SRC: u32 = 6;
    /// `s_setreg_imm32_b32 hwreg(...), imm32`.
    pub const HWREG_IMM: u32 = 7;
    /// `s_waitcnt` counter clause.
    pub const WAITCNT: u32 = 8;
    /// `s_sendmsg`/`s_sendmsghalt`.
    pub const SENDMSG: u32 = 9;
    /// SOPC with an 8-bit immediate src1 (`s_setvskip`).
    pub const SRC1_IMM8: u32 = 10;
    /// SMRD/SMEM with destination only (`s_memtime`).
    pub const ONLY_DST: u32 = 11;
    /// SOPP whose imm16 defaults to zero and prints only when set.
    pub const OPT_IMM16: u32 = 12;
    /// SOPP with a required imm16 operand.
    pub const IMM16: u32 = 13;
    /// VOP2 with a constant dword after src0 (`v_madmk_*`).
    pub const ARG1_IMM: u32 = 14;
    /// VOP2 with a trailing constant dword (`v_madak_*`).
    pub const ARG2_IMM: u32 = 15;

    // FLAT rows reuse the pattern nibble as the segment selector.
    pub const SEG_FLAT: u32 = 0;
    pub const SEG_SCRATCH: u32 = 1;
    pub const SEG_GLOBAL: u32 = 2;

    pub const DST_64: u32 = 1 << 4;
    pub const SRC0_64: u32 = 1 << 5;
    pub const SRC1_64: u32 = 1 << 6;
    pub const SRC2_64: u32 = 1 << 7;

    /// Data register count minus one for memory classes (bits 8..=12).
    pub const REGCNT_SHIFT: u32 = 8;
    pub const REGCNT_MASK: u32 = 0x1f << REGCNT_SHIFT;

    pub const MLOAD: u32 = 1 << 13;
    pub const MSTORE: u32 = 1 << 14;
    pub const MATOMIC: u32 = 1 << 15;
    /// Atomic data operand is twice the nominal width (cmpswap).
    pub const MCMPSWAP: u32 = 1 << 16;

    /// Literal operands default to FP32 typing.
    pub const FLOAT: u32 = 1 << 17;
    /// Literal operands default to FP16 typing.
    pub const F16: u32 = 1 << 18;

    /// VOP2 writes VCC implicitly (printed after the destination).
    pub const VCC_OUT: u32 = 1 << 19;
    /// VOP2 reads VCC implicitly (printed after the sources).
    pub const VCC_IN: u32 = 1 << 20;
    /// Destination is an SGPR (`v_readlane`, `v_readfirstlane`).
    pub const DST_SGPR: u32 = 1 << 21;
    /// src1 is a scalar lane select (`v_readlane`, `v_writelane`).
    pub const SRC1_SGPR: u32 = 1 << 22;
    /// src0 accepts scalar sources only (`v_writelane`).
    pub const SRC0_SCALAR: u32 = 1 << 23;

    /// DS split 2x8-bit offsets (`ds_*2_*`, `ds_*2st64_*`).
    pub const TWO_OFFSETS: u32 = 1 << 24;
    /// DS second data operand present.
    pub const VDATA2: u32 = 1 << 25;
    /// SMRD/SMEM base is a 4-register resource (buffer forms).
    pub const SBASE4: u32 = 1 << 26;
    /// MIMG row takes an SSAMP descriptor.
    pub const MIMG_SAMPLE: u32 = 1 << 27;

    /// Data register count for memory rows, from the packed field.
    pub const fn regcnt(m: u32) -> u16 {
        (((m & REGCNT_MASK) >> REGCNT_SHIFT) + 1) as u16
    }

    /// Pack a data register count into mode bits.
    pub const fn cnt(n: u32) -> u32 {
        (n - 1) << REGCNT_SHIFT
    }
}

/// One row of the (fused) instruction table.
#[derive(Debug, Clone, Copy)]
pub struct InstrEntry {
    pub mnemonic: &'static str,
    pub encoding: GcnEnc,
    pub mode: u32,
    /// Primary opcode.
    pub code1: u16,
    /// Secondary (VOP3-promoted) opcode; `u16::MAX` when absent.
    pub code2: u16,
    pub arch: ArchMask,
}

pub const NO_CODE2: u16 = u16::MAX;

impl InstrEntry {
    pub fn pattern(&self) -> u32 {
        self.mode & mode::PATTERN_MASK
    }

    pub fn has(&self, flag: u32) -> bool {
        self.mode & flag != 0
    }

    /// The fused entry promotes to VOP3B rather than VOP3A.
    pub fn promotes_to_vop3b(&self) -> bool {
        matches!(self.encoding, GcnEnc::Vop3B)
            || (matches!(self.encoding, GcnEnc::Vop2) && self.has(mode::VCC_OUT))
    }
}

/// Encoding width forced by an `_e32`/`_e64` mnemonic suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EncSize {
    #[default]
    Unknown,
    Bit32,
    Bit64,
}

/// VOP sub-encoding forced by a `_dpp`/`_sdwa` mnemonic suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VopEnc {
    #[default]
    Normal,
    Dpp,
    Sdwa,
}

/// Strip an encoding suffix from a mnemonic and record the preference.
pub fn split_mnemonic(mnemonic: &str) -> (&str, EncSize, VopEnc) {
    let lower_is = |suffix: &str| {
        mnemonic.len() > suffix.len() && mnemonic[mnemonic.len() - suffix.len()..]
            .eq_ignore_ascii_case(suffix)
    };
    if lower_is("_e64") {
        (&mnemonic[..mnemonic.len() - 4], EncSize::Bit64, VopEnc::Normal)
    } else if lower_is("_e32") {
        (&mnemonic[..mnemonic.len() - 4], EncSize::Bit32, VopEnc::Normal)
    } else if mnemonic.len() > 6 && mnemonic.starts_with("v_") && lower_is("_dpp") {
        (&mnemonic[..mnemonic.len() - 4], EncSize::Unknown, VopEnc::Dpp)
    } else if mnemonic.len() > 7 && mnemonic.starts_with("v_") && lower_is("_sdwa") {
        (&mnemonic[..mnemonic.len() - 5], EncSize::Unknown, VopEnc::Sdwa)
    } else {
        (mnemonic, EncSize::Unknown, VopEnc::Normal)
    }
}

fn fused_table() -> &'static [InstrEntry] {
    static TABLE: OnceLock<Vec<InstrEntry>> = OnceLock::new();
    TABLE.get_or_init(build_fused_table)
}

fn build_fused_table() -> Vec<InstrEntry> {
    let mut raw = data::raw_entries();
    raw.sort_by(|a, b| {
        a.mnemonic
            .cmp(b.mnemonic)
            .then(a.encoding.cmp(&b.encoding))
            .then(a.arch.bits().cmp(&b.arch.bits()))
    });

    // Fusion: fold VOP3A/VOP3B rows into the earlier short-form row with a
    // covering arch mask; VINTRP rows feed their code into the VOP3A row.
    // When no earlier row covers the VOP3 row's arch mask, a fresh row is
    // appended instead of mutating one (safer than the overwrite the
    // original performed when arch masks partition a mnemonic).
    let mut fused: Vec<InstrEntry> = Vec::with_capacity(raw.len());
    let mut old_masks: Vec<ArchMask> = Vec::with_capacity(raw.len());
    for insn in raw {
        match insn.encoding {
            GcnEnc::Vop3A | GcnEnc::Vop3B => {
                let found = fused
                    .iter()
                    .enumerate()
                    .rev()
                    .take_while(|(_, e)| e.mnemonic == insn.mnemonic)
                    .find(|&(k, e)| {
                        old_masks[k].contains(insn.arch)
                            && e.code2 == NO_CODE2
                            && e.encoding != GcnEnc::Vop3A
                            && e.encoding != GcnEnc::Vop3B
                    })
                    .map(|(k, _)| k);
                if let Some(k) = found {
                    fused[k].code2 = insn.code1;
                    fused[k].arch = old_masks[k].intersection(insn.arch);
                } else {
                    old_masks.push(insn.arch);
                    fused.push(insn);
                }
            }
            GcnEnc::Vintrp => {
                // VINTRP opcode becomes the VOP3A row's secondary slot
                if let Some(k) = fused
                    .iter()
                    .enumerate()
                    .rev()
                    .take_while(|(_, e)| e.mnemonic == insn.mnemonic)
                    .find(|(_, e)| e.encoding == GcnEnc::Vop3A)
                    .map(|(k, _)| k)
                {
                    fused[k].code2 = insn.code1;
                }
                old_masks.push(insn.arch);
                fused.push(insn);
            }
            _ => {
                old_masks.push(insn.arch);
                fused.push(insn);
            }
        }
    }
    fused
}

/// Look up every table row matching `mnemonic` on `arch`.
///
/// Binary search finds the first row for the mnemonic; scanning continues
/// while the mnemonic matches, yielding rows whose arch mask includes the
/// requested architecture.
pub fn lookup(mnemonic: &str, arch: GcnArch) -> impl Iterator<Item = &'static InstrEntry> + use<'_> {
    let table = fused_table();
    let start = table.partition_point(|e| e.mnemonic < mnemonic);
    let mask = arch.mask();
    table[start..]
        .iter()
        .take_while(move |e| e.mnemonic == mnemonic)
        .filter(move |e| e.arch.intersects(mask))
}

/// Whether any row exists for `mnemonic` on any architecture.
pub fn is_known_mnemonic(mnemonic: &str) -> bool {
    let (base, _, _) = split_mnemonic(mnemonic);
    let table = fused_table();
    let start = table.partition_point(|e| e.mnemonic < base);
    table.get(start).is_some_and(|e| e.mnemonic == base)
}

/// Find the table row for a decoded opcode: `(encoding, opcode)` under
/// `arch`, preferring the primary opcode and falling back to the fused
/// secondary slot for VOP3-promoted forms.
pub fn lookup_opcode(
    encoding: GcnEnc,
    opcode: u16,
    arch: GcnArch,
) -> Option<&'static InstrEntry> {
    let mask = arch.mask();
    let table = fused_table();
    // VOP3 decoders must search the secondary slots of short-form rows.
    if matches!(encoding, GcnEnc::Vop3A | GcnEnc::Vop3B) {
        if let Some(e) = table.iter().find(|e| {
            e.arch.intersects(mask)
                && e.code2 == opcode
                && matches!(
                    e.encoding,
                    GcnEnc::Vop2 | GcnEnc::Vop1 | GcnEnc::Vopc | GcnEnc::Vop3A | GcnEnc::Vop3B
                )
        }) {
            return Some(e);
        }
        return table.iter().find(|e| {
            e.arch.intersects(mask)
                && e.code1 == opcode
                && matches!(e.encoding, GcnEnc::Vop3A | GcnEnc::Vop3B)
        });
    }
    table
        .iter()
        .find(|e| e.encoding == encoding && e.arch.intersects(mask) && e.code1 == opcode)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suffix_split() {
        assert_eq!(
            split_mnemonic("v_add_f32_e64"),
            ("v_add_f32", EncSize::Bit64, VopEnc::Normal)
        );
        assert_eq!(
            split_mnemonic("v_mov_b32_sdwa"),
            ("v_mov_b32", EncSize::Unknown, VopEnc::Sdwa)
        );
        assert_eq!(
            split_mnemonic("s_add_u32"),
            ("s_add_u32", EncSize::Unknown, VopEnc::Normal)
        );
        // scalar mnemonics never carry _dpp
        assert_eq!(split_mnemonic("s_nop").0, "s_nop");
    }

    #[test]
    fn test_lookup_basic() {
        let rows: Vec<_> = lookup("s_add_u32", GcnArch::Gcn12).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].code1, 0);
        assert_eq!(rows[0].encoding, GcnEnc::Sop2);
    }

    #[test]
    fn test_fusion_fills_code2() {
        let rows: Vec<_> = lookup("v_cndmask_b32", GcnArch::Gcn12).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].encoding, GcnEnc::Vop2);
        assert_eq!(rows[0].code1, 0);
        assert_eq!(rows[0].code2, 0x100);
    }

    #[test]
    fn test_vop3_only_row() {
        let rows: Vec<_> = lookup("v_mad_f32", GcnArch::Gcn12).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].encoding, GcnEnc::Vop3A);
        assert_eq!(rows[0].code1, 0x1c1);
    }

    #[test]
    fn test_arch_gating() {
        // rfe_restore exists only on GCN 1.2+
        assert_eq!(lookup("s_rfe_restore_b64", GcnArch::Gcn10).count(), 0);
        assert_eq!(lookup("s_rfe_restore_b64", GcnArch::Gcn12).count(), 1);
        // arch-dependent opcode numbering yields distinct rows
        let si: Vec<_> = lookup("s_and_b32", GcnArch::Gcn10).collect();
        let vi: Vec<_> = lookup("s_and_b32", GcnArch::Gcn12).collect();
        assert_eq!(si[0].code1, 14);
        assert_eq!(vi[0].code1, 12);
    }

    #[test]
    fn test_opcode_lookup() {
        let e = lookup_opcode(GcnEnc::Sop2, 0, GcnArch::Gcn12).unwrap();
        assert_eq!(e.mnemonic, "s_add_u32");
        let e = lookup_opcode(GcnEnc::Vop3B, 0x1e0, GcnArch::Gcn12).unwrap();
        assert_eq!(e.mnemonic, "v_div_scale_f32");
    }
}
