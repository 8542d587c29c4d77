//! Metadata tokens for rows of a module's reference space.
//!
//! A [`Token`] packs a table identifier into its high byte and a 1-based row index into
//! the low 24 bits, following ECMA-335 §II.22. Only the reference tables that injection
//! writes into are named here; definition rows live in the object graph directly.

use std::fmt;

/// A metadata token: table id in the high byte, row id in the low 24 bits.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Token(pub u32);

impl Token {
    /// `TypeRef` table (0x01).
    pub const TYPE_REF: u8 = 0x01;
    /// `MemberRef` table (0x0A).
    pub const MEMBER_REF: u8 = 0x0A;
    /// `ModuleRef` table (0x1A).
    pub const MODULE_REF: u8 = 0x1A;
    /// `TypeSpec` table (0x1B).
    pub const TYPE_SPEC: u8 = 0x1B;
    /// `AssemblyRef` table (0x23).
    pub const ASSEMBLY_REF: u8 = 0x23;
    /// `MethodSpec` table (0x2B).
    pub const METHOD_SPEC: u8 = 0x2B;

    /// Creates a token from its raw value.
    #[must_use]
    pub fn new(value: u32) -> Self {
        Token(value)
    }

    /// Creates a token from a table id and a row id.
    #[must_use]
    pub fn from_parts(table: u8, row: u32) -> Self {
        Token((u32::from(table) << 24) | (row & 0x00FF_FFFF))
    }

    /// Raw 32-bit value.
    #[must_use]
    pub fn value(&self) -> u32 {
        self.0
    }

    /// The table id stored in the high byte.
    #[must_use]
    pub fn table(&self) -> u8 {
        (self.0 >> 24) as u8
    }

    /// The 1-based row id stored in the low 24 bits.
    #[must_use]
    pub fn row(&self) -> u32 {
        self.0 & 0x00FF_FFFF
    }

    /// A token with row 0 refers to nothing.
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.row() == 0
    }
}

impl From<u32> for Token {
    fn from(value: u32) -> Self {
        Token(value)
    }
}

impl From<Token> for u32 {
    fn from(token: Token) -> Self {
        token.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Token(0x{:08x}, table: 0x{:02x}, row: {})",
            self.0,
            self.table(),
            self.row()
        )
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}
