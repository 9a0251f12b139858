//! Error types for the GCN codec.
//!
//! Assembly distinguishes syntax errors (the operand or modifier text could
//! not be parsed) from semantic errors (the parsed combination is illegal
//! for the selected architecture or encoding). Both carry the byte column
//! of the offending character within the instruction line. Disassembly
//! never fails; unknown bit patterns decode to `*_ill_<N>` placeholders.

use thiserror::Error;

/// Primary error type for the GCN assembler core.
#[derive(Debug, Error)]
pub enum AsmError {
    /// The operand or modifier text could not be parsed.
    #[error("syntax error at column {col}: {message}")]
    Syntax { col: usize, message: String },

    /// Parse succeeded but the combination is illegal for this
    /// architecture or encoding.
    #[error("illegal combination at column {col}: {message}")]
    Semantic { col: usize, message: String },

    /// Unknown instruction mnemonic.
    #[error("unknown instruction: {mnemonic}")]
    UnknownMnemonic { mnemonic: String },

    /// The mnemonic exists but no table row matches the architecture.
    #[error("instruction {mnemonic} is not available on {arch}")]
    WrongArch { mnemonic: String, arch: &'static str },

    /// A register number or range lies outside the register file.
    #[error("register out of range at column {col}: {message}")]
    RegisterRange { col: usize, message: String },

    /// More than one distinct literal constant in a single instruction.
    #[error("only one literal can be used in instruction (column {col})")]
    SecondLiteral { col: usize },

    /// A jump target is not word aligned or does not fit in 16 signed bits.
    #[error("bad jump target: {message}")]
    BadJump { message: String },

    /// Value does not fit the instruction field.
    #[error("value {value:#x} does not fit in {bits}-bit field (column {col})")]
    FieldRange { col: usize, value: u64, bits: u32 },

    /// Unknown GPU device name given to architecture resolution.
    #[error("unknown GPU device: {name}")]
    UnknownDevice { name: String },
}

impl AsmError {
    /// Shorthand for a syntax error at a column.
    pub fn syntax(col: usize, message: impl Into<String>) -> Self {
        AsmError::Syntax {
            col,
            message: message.into(),
        }
    }

    /// Shorthand for a semantic error at a column.
    pub fn semantic(col: usize, message: impl Into<String>) -> Self {
        AsmError::Semantic {
            col,
            message: message.into(),
        }
    }
}

/// Result type alias for codec operations.
pub type Result<T> = std::result::Result<T, AsmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AsmError::syntax(12, "expected ',' before operand");
        assert!(err.to_string().contains("column 12"));
        let err = AsmError::FieldRange {
            col: 4,
            value: 0x1fff,
            bits: 12,
        };
        assert!(err.to_string().contains("12-bit"));
    }
}
