//! Instructions of a method body.
//!
//! Every [`Instruction`] carries an [`InstructionId`] that is unique for the lifetime of
//! the process. Branches, switches and exception handler boundaries refer to other
//! instructions through these ids. An id is never shared between two instructions and
//! [`Instruction`] does not implement `Clone`; cloning a body creates fresh instructions
//! and maps the old ids onto the new ones.

use std::{
    fmt::{self, UpperHex},
    sync::atomic::{AtomicU64, Ordering},
};

use crate::metadata::{
    method::opcodes,
    references::{FieldTarget, MethodTarget, TypeDefOrRef},
    signatures::MethodSig,
};

static NEXT_INSTRUCTION_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of an [`Instruction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstructionId(u64);

impl InstructionId {
    fn fresh() -> Self {
        InstructionId(NEXT_INSTRUCTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw id value.
    #[must_use]
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for InstructionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Immediate operand value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Immediate {
    /// Signed 8-bit.
    Int8(i8),
    /// Unsigned 8-bit.
    UInt8(u8),
    /// Signed 16-bit.
    Int16(i16),
    /// Unsigned 16-bit.
    UInt16(u16),
    /// Signed 32-bit.
    Int32(i32),
    /// Unsigned 32-bit.
    UInt32(u32),
    /// Signed 64-bit.
    Int64(i64),
    /// Unsigned 64-bit.
    UInt64(u64),
    /// 32-bit float.
    Float32(f32),
    /// 64-bit float.
    Float64(f64),
}

impl Immediate {
    /// The value as `i32` if it is an integer that fits.
    #[must_use]
    pub fn as_i32(&self) -> Option<i32> {
        match *self {
            Immediate::Int8(v) => Some(i32::from(v)),
            Immediate::UInt8(v) => Some(i32::from(v)),
            Immediate::Int16(v) => Some(i32::from(v)),
            Immediate::UInt16(v) => Some(i32::from(v)),
            Immediate::Int32(v) => Some(v),
            Immediate::UInt32(v) => i32::try_from(v).ok(),
            Immediate::Int64(v) => i32::try_from(v).ok(),
            Immediate::UInt64(v) => i32::try_from(v).ok(),
            Immediate::Float32(_) | Immediate::Float64(_) => None,
        }
    }
}

impl UpperHex for Immediate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Immediate::Int8(value) => write!(f, "{value:02X}"),
            Immediate::UInt8(value) => write!(f, "{value:02X}"),
            Immediate::Int16(value) => write!(f, "{value:04X}"),
            Immediate::UInt16(value) => write!(f, "{value:04X}"),
            Immediate::Int32(value) => write!(f, "{value:08X}"),
            Immediate::UInt32(value) => write!(f, "{value:08X}"),
            Immediate::Int64(value) => write!(f, "{value:016X}"),
            Immediate::UInt64(value) => write!(f, "{value:016X}"),
            Immediate::Float32(value) => write!(f, "{:08X}", value.to_bits()),
            Immediate::Float64(value) => write!(f, "{:016X}", value.to_bits()),
        }
    }
}

/// Source location attached to an instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequencePoint {
    /// Source document path or URL.
    pub document: String,
    /// First line, 1-based.
    pub start_line: u32,
    /// First column, 1-based.
    pub start_column: u16,
    /// Last line.
    pub end_line: u32,
    /// Column after the last character.
    pub end_column: u16,
}

/// Operand of an instruction.
#[derive(Debug, Clone)]
pub enum Operand {
    /// No operand.
    None,
    /// Inline constant.
    Immediate(Immediate),
    /// String literal of `ldstr`.
    String(String),
    /// Type token.
    Type(TypeDefOrRef),
    /// Method token.
    Method(MethodTarget),
    /// Field token.
    Field(FieldTarget),
    /// Stand-alone signature of `calli`.
    Signature(MethodSig),
    /// Branch target.
    Target(InstructionId),
    /// Switch table.
    Switch(Vec<InstructionId>),
    /// Local variable slot.
    Local(u16),
    /// Argument slot, counting an implicit `this` as slot 0.
    Argument(u16),
}

/// A single CIL instruction.
#[derive(Debug)]
pub struct Instruction {
    id: InstructionId,
    /// `0` for single-byte opcodes, [`opcodes::FE_PREFIX`] for two-byte opcodes.
    pub prefix: u8,
    /// Opcode byte (second byte for two-byte opcodes).
    pub opcode: u8,
    /// Operand.
    pub operand: Operand,
    /// Source location, if debug information is present.
    pub sequence_point: Option<SequencePoint>,
}

impl Instruction {
    /// Creates a single-byte opcode instruction with a fresh identity.
    #[must_use]
    pub fn new(opcode: u8, operand: Operand) -> Self {
        Self::with_prefix(0, opcode, operand)
    }

    /// Creates an instruction with an explicit prefix byte and a fresh identity.
    #[must_use]
    pub fn with_prefix(prefix: u8, opcode: u8, operand: Operand) -> Self {
        Instruction {
            id: InstructionId::fresh(),
            prefix,
            opcode,
            operand,
            sequence_point: None,
        }
    }

    /// Identity of this instruction.
    #[must_use]
    pub fn id(&self) -> InstructionId {
        self.id
    }

    /// Textual mnemonic, `"???"` for opcodes without a known name.
    #[must_use]
    pub fn mnemonic(&self) -> &'static str {
        opcodes::mnemonic(self.prefix, self.opcode).unwrap_or("???")
    }

    /// Returns true if this is a single-target branch.
    #[must_use]
    pub fn is_branch(&self) -> bool {
        opcodes::is_branch(self.prefix, self.opcode)
    }

    /// Instructions this one may transfer control to.
    #[must_use]
    pub fn targets(&self) -> Vec<InstructionId> {
        match &self.operand {
            Operand::Target(target) => vec![*target],
            Operand::Switch(targets) => targets.clone(),
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instruction_ids_are_unique() {
        let a = Instruction::new(opcodes::NOP, Operand::None);
        let b = Instruction::new(opcodes::NOP, Operand::None);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_targets() {
        let ret = Instruction::new(opcodes::RET, Operand::None);
        let br = Instruction::new(opcodes::BR_S, Operand::Target(ret.id()));
        let switch = Instruction::new(opcodes::SWITCH, Operand::Switch(vec![ret.id(), br.id()]));

        assert!(br.is_branch());
        assert_eq!(br.targets(), vec![ret.id()]);
        assert_eq!(switch.targets(), vec![ret.id(), br.id()]);
        assert!(ret.targets().is_empty());
        assert_eq!(br.mnemonic(), "br.s");
    }

    #[test]
    fn test_immediate_as_i32() {
        assert_eq!(Immediate::Int8(-3).as_i32(), Some(-3));
        assert_eq!(Immediate::UInt32(u32::MAX).as_i32(), None);
        assert_eq!(Immediate::Float32(1.0).as_i32(), None);
        assert_eq!(format!("{:X}", Immediate::Int16(0x1F)), "001F");
    }
}
