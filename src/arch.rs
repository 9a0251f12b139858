//! Architecture model for the GCN family.
//!
//! Every encoding decision that varies between GCN revisions consults this
//! module; no other component hard-codes a GPU generation. The model is a
//! closed set of six architecture tags plus derived capability predicates
//! and the canonical inline-constant tables.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{AsmError, Result};

bitflags::bitflags! {
    /// Bit-set over architectures, used to gate instruction-table rows.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ArchMask: u16 {
        const GCN10  = 1 << 0;
        const GCN11  = 1 << 1;
        const GCN12  = 1 << 2;
        const GCN14  = 1 << 3;
        const GCN141 = 1 << 4;
        const GCN15  = 1 << 5;
    }
}

impl ArchMask {
    /// All GCN 1.1 and later revisions.
    pub const GCN11_UP: ArchMask = ArchMask::GCN11
        .union(ArchMask::GCN12)
        .union(ArchMask::GCN14)
        .union(ArchMask::GCN141)
        .union(ArchMask::GCN15);
    /// All GCN 1.2 and later revisions.
    pub const GCN12_UP: ArchMask = ArchMask::GCN12
        .union(ArchMask::GCN14)
        .union(ArchMask::GCN141)
        .union(ArchMask::GCN15);
    /// All GCN 1.4 and later revisions.
    pub const GCN14_UP: ArchMask = ArchMask::GCN14
        .union(ArchMask::GCN141)
        .union(ArchMask::GCN15);
    /// Both VEGA revisions.
    pub const VEGA: ArchMask = ArchMask::GCN14.union(ArchMask::GCN141);
}

/// GCN architecture revision.
///
/// `Gcn141` is the GFX906 (Vega 20) variant of GCN 1.4 that adds the
/// deep-learning instructions; it shares every wire format with `Gcn14`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GcnArch {
    Gcn10,
    Gcn11,
    Gcn12,
    Gcn14,
    Gcn141,
    Gcn15,
}

impl GcnArch {
    /// Returns a human-readable name for this architecture.
    pub fn name(self) -> &'static str {
        match self {
            GcnArch::Gcn10 => "GCN 1.0",
            GcnArch::Gcn11 => "GCN 1.1",
            GcnArch::Gcn12 => "GCN 1.2",
            GcnArch::Gcn14 => "GCN 1.4",
            GcnArch::Gcn141 => "GCN 1.4.1",
            GcnArch::Gcn15 => "GCN 1.5",
        }
    }

    /// The single-bit mask for this architecture.
    pub fn mask(self) -> ArchMask {
        match self {
            GcnArch::Gcn10 => ArchMask::GCN10,
            GcnArch::Gcn11 => ArchMask::GCN11,
            GcnArch::Gcn12 => ArchMask::GCN12,
            GcnArch::Gcn14 => ArchMask::GCN14,
            GcnArch::Gcn141 => ArchMask::GCN141,
            GcnArch::Gcn15 => ArchMask::GCN15,
        }
    }

    /// GCN 1.1 or later.
    pub fn is_gcn11_or_later(self) -> bool {
        ArchMask::GCN11_UP.contains(self.mask())
    }

    /// GCN 1.2 or later.
    pub fn is_gcn12_or_later(self) -> bool {
        ArchMask::GCN12_UP.contains(self.mask())
    }

    /// GCN 1.4 or later.
    pub fn is_gcn14_or_later(self) -> bool {
        ArchMask::GCN14_UP.contains(self.mask())
    }

    /// Scalar memory uses the 64-bit SMEM encoding instead of SMRD.
    pub fn has_smem(self) -> bool {
        self.is_gcn12_or_later()
    }

    /// SDWA and DPP auxiliary VOP words are available.
    pub fn has_sdwa_dpp(self) -> bool {
        self.is_gcn12_or_later()
    }

    /// The packed 16-bit VOP3P encoding is available.
    pub fn has_vop3p(self) -> bool {
        self.is_gcn14_or_later()
    }

    /// The `op_sel` half-selection modifier is available on VOP3.
    pub fn has_op_sel(self) -> bool {
        self.is_gcn14_or_later()
    }

    /// FLAT addressing (and the flat_scratch register pair) exists.
    pub fn has_flat(self) -> bool {
        self != GcnArch::Gcn10
    }

    /// GLOBAL/SCRATCH segmented FLAT sub-modes exist.
    pub fn has_flat_segments(self) -> bool {
        self.is_gcn14_or_later()
    }

    /// The XNACK_MASK register pair exists.
    pub fn has_xnack(self) -> bool {
        self.is_gcn12_or_later()
    }

    /// The 1/(2*pi) inline constant (code 248) is accepted.
    pub fn has_inline_1_2pi(self) -> bool {
        self.is_gcn12_or_later()
    }

    /// Number of trap-temporary SGPRs.
    pub fn ttmp_count(self) -> u16 {
        if self.is_gcn14_or_later() {
            16
        } else {
            12
        }
    }

    /// Operand code of ttmp0.
    pub fn ttmp_base(self) -> u16 {
        if self.is_gcn14_or_later() {
            108
        } else {
            112
        }
    }

    /// Number of addressable SGPRs.
    pub fn max_sgprs(self) -> u16 {
        // special registers above the file shrink it on GCN 1.2+
        if self.is_gcn12_or_later() {
            102
        } else {
            104
        }
    }

    /// Number of addressable VGPRs.
    pub fn max_vgprs(self) -> u16 {
        256
    }

    /// Operand code of the flat_scratch register pair, if it exists.
    pub fn flat_scratch_code(self) -> Option<u16> {
        match self {
            GcnArch::Gcn10 => None,
            GcnArch::Gcn11 => Some(104),
            _ => Some(102),
        }
    }

    /// Bit widths of the `s_waitcnt` sub-counters (vmcnt, expcnt, lgkmcnt).
    pub fn waitcnt_widths(self) -> (u32, u32, u32) {
        if self.is_gcn14_or_later() {
            (6, 3, 4)
        } else {
            (4, 3, 4)
        }
    }

    /// Default (all-ones) `s_waitcnt` payload with no counter named.
    pub fn waitcnt_mask(self) -> u16 {
        if self.is_gcn14_or_later() {
            0xcf7f
        } else {
            0x0f7f
        }
    }
}

impl fmt::Display for GcnArch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The nine canonical float inline constants as FP32 bit patterns,
/// ordered by operand code 240..=248.
pub const INLINE_FP32: [u32; 9] = [
    0x3f00_0000, // 0.5
    0xbf00_0000, // -0.5
    0x3f80_0000, // 1.0
    0xbf80_0000, // -1.0
    0x4000_0000, // 2.0
    0xc000_0000, // -2.0
    0x4080_0000, // 4.0
    0xc080_0000, // -4.0
    0x3e22_f983, // 1/(2*pi)
];

/// The canonical float inline constants as FP16 bit patterns.
pub const INLINE_FP16: [u32; 9] = [
    0x3800, 0xb800, 0x3c00, 0xbc00, 0x4000, 0xc000, 0x4400, 0xc400, 0x3118,
];

/// The canonical float inline constants as the high dword of an FP64 value.
pub const INLINE_FP64_HI: [u32; 9] = [
    0x3fe0_0000,
    0xbfe0_0000,
    0x3ff0_0000,
    0xbff0_0000,
    0x4000_0000,
    0xc000_0000,
    0x4010_0000,
    0xc010_0000,
    0x3fc4_5f30,
];

/// Recognized GPU device names, resolved to architecture tags.
///
/// The list is a closed enumeration; the assembler driver rejects unknown
/// names before the codec sees them, so resolution here is total over the
/// table and errors only on a name outside it.
const DEVICE_TABLE: &[(&str, GcnArch)] = &[
    ("capeverde", GcnArch::Gcn10),
    ("pitcairn", GcnArch::Gcn10),
    ("tahiti", GcnArch::Gcn10),
    ("oland", GcnArch::Gcn10),
    ("hainan", GcnArch::Gcn10),
    ("bonaire", GcnArch::Gcn11),
    ("hawaii", GcnArch::Gcn11),
    ("kabini", GcnArch::Gcn11),
    ("mullins", GcnArch::Gcn11),
    ("spectre", GcnArch::Gcn11),
    ("spooky", GcnArch::Gcn11),
    ("iceland", GcnArch::Gcn12),
    ("tonga", GcnArch::Gcn12),
    ("carrizo", GcnArch::Gcn12),
    ("fiji", GcnArch::Gcn12),
    ("stoney", GcnArch::Gcn12),
    ("baffin", GcnArch::Gcn12),
    ("ellesmere", GcnArch::Gcn12),
    ("polaris10", GcnArch::Gcn12),
    ("polaris11", GcnArch::Gcn12),
    ("polaris12", GcnArch::Gcn12),
    ("gfx804", GcnArch::Gcn12),
    ("gfx900", GcnArch::Gcn14),
    ("gfx901", GcnArch::Gcn14),
    ("gfx902", GcnArch::Gcn14),
    ("gfx903", GcnArch::Gcn14),
    ("gfx904", GcnArch::Gcn14),
    ("gfx905", GcnArch::Gcn14),
    ("vega10", GcnArch::Gcn14),
    ("vega11", GcnArch::Gcn14),
    ("raven", GcnArch::Gcn14),
    ("gfx906", GcnArch::Gcn141),
    ("gfx907", GcnArch::Gcn141),
    ("vega20", GcnArch::Gcn141),
    ("gfx1010", GcnArch::Gcn15),
    ("navi10", GcnArch::Gcn15),
];

/// Resolve a GPU device name to its architecture tag.
///
/// Names are matched case-insensitively.
pub fn arch_for_device(name: &str) -> Result<GcnArch> {
    let lower = name.to_ascii_lowercase();
    DEVICE_TABLE
        .iter()
        .find(|(dev, _)| *dev == lower)
        .map(|&(_, arch)| arch)
        .ok_or_else(|| AsmError::UnknownDevice {
            name: name.to_owned(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_ordering() {
        assert!(GcnArch::Gcn12.is_gcn12_or_later());
        assert!(!GcnArch::Gcn11.is_gcn12_or_later());
        assert!(GcnArch::Gcn141.is_gcn14_or_later());
        assert!(ArchMask::GCN12_UP.contains(ArchMask::GCN15));
    }

    #[test]
    fn test_ttmp_layout() {
        assert_eq!(GcnArch::Gcn12.ttmp_base(), 112);
        assert_eq!(GcnArch::Gcn12.ttmp_count(), 12);
        assert_eq!(GcnArch::Gcn14.ttmp_base(), 108);
        assert_eq!(GcnArch::Gcn14.ttmp_count(), 16);
    }

    #[test]
    fn test_flat_scratch_moves() {
        assert_eq!(GcnArch::Gcn10.flat_scratch_code(), None);
        assert_eq!(GcnArch::Gcn11.flat_scratch_code(), Some(104));
        assert_eq!(GcnArch::Gcn12.flat_scratch_code(), Some(102));
    }

    #[test]
    fn test_device_resolution() {
        assert_eq!(arch_for_device("Tonga").unwrap(), GcnArch::Gcn12);
        assert_eq!(arch_for_device("gfx900").unwrap(), GcnArch::Gcn14);
        assert_eq!(arch_for_device("navi10").unwrap(), GcnArch::Gcn15);
        assert!(arch_for_device("rtx4090").is_err());
    }

    #[test]
    fn test_waitcnt_widths() {
        assert_eq!(GcnArch::Gcn12.waitcnt_widths(), (4, 3, 4));
        assert_eq!(GcnArch::Gcn14.waitcnt_widths(), (6, 3, 4));
        assert_eq!(GcnArch::Gcn14.waitcnt_mask(), 0xcf7f);
    }
}
