//! Core data model for the GCN codec.
//!
//! This module defines the register-range and operand representations
//! shared by every encoder and decoder, the pending expression-target
//! records handed back to the driver, and the per-session register-usage
//! accumulator.

use serde::{Deserialize, Serialize};

use crate::arch::GcnArch;

/// Operand code of the literal marker in a `SRC` field.
pub const LITERAL_CODE: u16 = 255;
/// Operand code selecting the SDWA second word (GCN 1.2+).
pub const SDWA_CODE: u16 = 249;
/// Operand code selecting the DPP second word (GCN 1.2+).
pub const DPP_CODE: u16 = 250;
/// First VGPR operand code; `v0` is 256 in the 9-bit SRC space.
pub const VGPR_BASE: u16 = 256;

bitflags::bitflags! {
    /// Per-operand VOP modifier bits recorded during parsing.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct VopMods: u8 {
        const ABS = 1;
        const NEG = 2;
        const SEXT = 4;
    }
}

/// A register range in the unified 9-bit operand code space.
///
/// `start..end` is half-open; `end == 0` marks a non-register operand
/// (inline constant or literal) whose code sits in `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RegRange {
    pub start: u16,
    pub end: u16,
}

impl RegRange {
    pub fn new(start: u16, end: u16) -> Self {
        RegRange { start, end }
    }

    /// An empty (absent) operand.
    pub fn none() -> Self {
        RegRange { start: 0, end: 0 }
    }

    pub fn is_none(self) -> bool {
        self.start == 0 && self.end == 0
    }

    pub fn is_some(self) -> bool {
        !self.is_none()
    }

    /// Single-code operand check (inline constants, sentinels).
    pub fn is_val(self, code: u16) -> bool {
        self.start == code && self.end == 0
    }

    /// Number of 32-bit registers covered.
    pub fn len(self) -> u16 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_vgpr(self) -> bool {
        self.start >= VGPR_BASE && self.end != 0
    }

    pub fn is_sgpr(self) -> bool {
        self.start < 108 && self.end != 0
    }

    /// Anything encodable in a scalar field (SGPRs, ttmp, specials).
    pub fn is_non_vgpr(self) -> bool {
        self.start < VGPR_BASE
    }

    /// VGPR index without the 256 bias; caller must know it is a VGPR.
    pub fn vgpr_index(self) -> u16 {
        self.start - VGPR_BASE
    }
}

/// One parsed operand: a register range or constant code, the literal
/// word when the range marks one, and any VOP operand modifiers.
#[derive(Debug, Clone, Default)]
pub struct Operand {
    pub range: RegRange,
    pub value: u32,
    pub mods: VopMods,
    /// Source text of an unresolved expression; the encoder zero-fills
    /// the field and records an [`ExprTarget`].
    pub deferred: Option<String>,
}

impl Operand {
    pub fn reg(range: RegRange) -> Self {
        Operand {
            range,
            ..Operand::default()
        }
    }

    pub fn is_literal(&self) -> bool {
        self.range.is_val(LITERAL_CODE)
    }
}

/// How a later-resolved value must be spliced into already emitted bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    /// 32-bit literal dword following the instruction word.
    LiteralDword,
    /// SOPK 16-bit immediate.
    SopkImm16,
    /// SOPK/SOPP 16-bit branch displacement, `(target - pc - 4) >> 2`.
    SopJump,
    /// SOPC 8-bit immediate in src1.
    SopcImm8,
    /// SMRD 8-bit unsigned offset byte.
    SmrdOffset,
    /// SMEM 20-bit unsigned offset (GCN 1.2).
    SmemOffset,
    /// SMEM 21-bit signed offset (GCN 1.4).
    SmemOffsetVega,
    /// SMEM 7-bit store-data immediate.
    SmemImm,
    /// DS 16-bit offset.
    DsOffset16,
    /// Low byte of a split DS offset pair.
    DsOffset8_0,
    /// High byte of a split DS offset pair.
    DsOffset8_1,
    /// MUBUF/MTBUF 12-bit offset.
    MxBufOffset,
    /// FLAT unsigned 12-bit inst_offset.
    InstOffset,
    /// GLOBAL/SCRATCH signed 13-bit inst_offset.
    InstOffsetSigned,
}

/// Pending expression target: where and how to patch when the driver
/// resolves the expression.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExprTarget {
    /// Absolute byte offset of the instruction in the output.
    pub offset: usize,
    pub kind: TargetKind,
    /// Source text of the unresolved expression.
    pub symbol: String,
}

/// Kind of control transfer recorded for a branch instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeFlowKind {
    Jump,
    CondJump,
    Call,
    Return,
    End,
}

/// One code-flow record: the branch word's offset and its resolved target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeFlowEntry {
    pub offset: usize,
    pub target: usize,
    pub kind: CodeFlowKind,
}

bitflags::bitflags! {
    /// Special-register usage flags accumulated while assembling.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    pub struct RegFlags: u8 {
        const VCC = 1;
        const FLAT_SCRATCH = 2;
        const XNACK = 4;
    }
}

/// Register-usage accumulator read by the driver after each instruction.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RegUsage {
    /// High-water SGPR count.
    pub sgprs_num: u16,
    /// High-water VGPR count.
    pub vgprs_num: u16,
    pub flags: RegFlags,
}

impl RegUsage {
    /// Record a VGPR write reaching `vgpr` (0-based index).
    pub fn update_vgprs(&mut self, vgpr: u16) {
        self.vgprs_num = self.vgprs_num.max(vgpr + 1).min(256);
    }

    /// Record an SGPR write reaching `sgpr`; codes at or above the
    /// addressable file (specials, ttmp) do not raise the count.
    pub fn update_sgprs(&mut self, sgpr: u16, arch: GcnArch) {
        let max = arch.max_sgprs();
        if sgpr < max {
            self.sgprs_num = self.sgprs_num.max(sgpr + 1).min(max - 2);
        }
    }

    /// Track VCC / flat_scratch / xnack_mask usage by operand code.
    pub fn update_flags(&mut self, reg: u16, arch: GcnArch) {
        let reg = reg & !1;
        if reg == 106 {
            self.flags |= RegFlags::VCC;
        } else if Some(reg) == arch.flat_scratch_code() {
            self.flags |= RegFlags::FLAT_SCRATCH;
        } else if arch.has_xnack() && reg == 104 {
            self.flags |= RegFlags::XNACK;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_basics() {
        let r = RegRange::new(4, 6);
        assert_eq!(r.len(), 2);
        assert!(r.is_sgpr());
        assert!(!r.is_vgpr());
        let v = RegRange::new(VGPR_BASE + 7, VGPR_BASE + 8);
        assert!(v.is_vgpr());
        assert_eq!(v.vgpr_index(), 7);
    }

    #[test]
    fn test_inline_marker() {
        let c = RegRange::new(240, 0);
        assert!(c.is_val(240));
        assert!(!c.is_none());
        assert_eq!(c.len(), 0);
    }

    #[test]
    fn test_usage_flags() {
        let mut usage = RegUsage::default();
        usage.update_flags(107, GcnArch::Gcn12);
        assert!(usage.flags.contains(RegFlags::VCC));
        usage.update_flags(102, GcnArch::Gcn12);
        assert!(usage.flags.contains(RegFlags::FLAT_SCRATCH));
        usage.update_flags(104, GcnArch::Gcn12);
        assert!(usage.flags.contains(RegFlags::XNACK));
        // on GCN 1.1 flat_scratch sits at 104
        let mut usage = RegUsage::default();
        usage.update_flags(104, GcnArch::Gcn11);
        assert_eq!(usage.flags, RegFlags::FLAT_SCRATCH);
    }

    #[test]
    fn test_sgpr_highwater() {
        let mut usage = RegUsage::default();
        usage.update_sgprs(61, GcnArch::Gcn12);
        assert_eq!(usage.sgprs_num, 62);
        // special codes do not count
        usage.update_sgprs(106, GcnArch::Gcn12);
        assert_eq!(usage.sgprs_num, 62);
    }
}
