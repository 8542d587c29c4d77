//! Exception handler regions of a method body.
//!
//! Boundaries are instruction identities rather than byte offsets, so a region keeps
//! pointing at the right instructions no matter how the body is re-encoded. The end
//! boundaries are exclusive and name the first instruction after the region.

use bitflags::bitflags;

use crate::metadata::{method::instruction::InstructionId, references::TypeDefOrRef};

bitflags! {
    /// Kind of an exception handler clause (ECMA-335 §II.25.4.6).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ExceptionHandlerFlags: u16 {
        /// A typed exception clause.
        const EXCEPTION = 0x0000;
        /// An exception filter and handler clause.
        const FILTER = 0x0001;
        /// A finally clause.
        const FINALLY = 0x0002;
        /// Fault clause (finally that is called on exception only).
        const FAULT = 0x0004;
    }
}

/// A protected region together with its handler.
#[derive(Debug, Clone)]
pub struct ExceptionHandler {
    /// Clause kind.
    pub flags: ExceptionHandlerFlags,
    /// Caught exception type, for [`ExceptionHandlerFlags::EXCEPTION`] clauses.
    pub catch_type: Option<TypeDefOrRef>,
    /// First protected instruction.
    pub try_start: InstructionId,
    /// First instruction after the protected region.
    pub try_end: InstructionId,
    /// First handler instruction.
    pub handler_start: InstructionId,
    /// First instruction after the handler.
    pub handler_end: InstructionId,
    /// First filter instruction, for [`ExceptionHandlerFlags::FILTER`] clauses.
    pub filter_start: Option<InstructionId>,
}

impl ExceptionHandler {
    /// All instruction boundaries of this clause.
    pub fn boundaries(&self) -> impl Iterator<Item = InstructionId> + '_ {
        [
            self.try_start,
            self.try_end,
            self.handler_start,
            self.handler_end,
        ]
        .into_iter()
        .chain(self.filter_start)
    }
}
