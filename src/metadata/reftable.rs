//! The reference space of a module.
//!
//! Every foreign entity a module mentions (assemblies, native modules, types, members,
//! constructed types) gets a row in one of the reference tables. Rows are keyed by
//! [`Token`] in a [`SkipMap`], so iteration yields them grouped by table and in row order.
//!
//! Inserting a row that is already present returns the existing token. Assembly and
//! module references are additionally deduplicated structurally: a second reference to
//! an identical assembly identity maps onto the first row.

use std::sync::Mutex;

use crossbeam_skiplist::SkipMap;

use crate::metadata::{
    references::{
        AssemblyRefRc, MemberRefRc, MethodSpecRc, ModuleRefRc, TypeRefRc, TypeSpecRc,
    },
    token::Token,
};

/// One row of a module's reference space.
#[derive(Clone, Debug)]
pub enum ReferenceRow {
    /// `AssemblyRef` row.
    Assembly(AssemblyRefRc),
    /// `ModuleRef` row.
    Module(ModuleRefRc),
    /// `TypeRef` row.
    Type(TypeRefRc),
    /// `MemberRef` row.
    Member(MemberRefRc),
    /// `TypeSpec` row.
    TypeSpec(TypeSpecRc),
    /// `MethodSpec` row.
    MethodSpec(MethodSpecRc),
}

impl ReferenceRow {
    /// Table id of this row.
    #[must_use]
    pub fn table(&self) -> u8 {
        match self {
            ReferenceRow::Assembly(_) => Token::ASSEMBLY_REF,
            ReferenceRow::Module(_) => Token::MODULE_REF,
            ReferenceRow::Type(_) => Token::TYPE_REF,
            ReferenceRow::Member(_) => Token::MEMBER_REF,
            ReferenceRow::TypeSpec(_) => Token::TYPE_SPEC,
            ReferenceRow::MethodSpec(_) => Token::METHOD_SPEC,
        }
    }

    /// Returns true if both rows hold the very same object.
    #[must_use]
    pub fn is_same(&self, other: &ReferenceRow) -> bool {
        use std::sync::Arc;

        match (self, other) {
            (ReferenceRow::Assembly(a), ReferenceRow::Assembly(b)) => Arc::ptr_eq(a, b),
            (ReferenceRow::Module(a), ReferenceRow::Module(b)) => Arc::ptr_eq(a, b),
            (ReferenceRow::Type(a), ReferenceRow::Type(b)) => Arc::ptr_eq(a, b),
            (ReferenceRow::Member(a), ReferenceRow::Member(b)) => Arc::ptr_eq(a, b),
            (ReferenceRow::TypeSpec(a), ReferenceRow::TypeSpec(b)) => Arc::ptr_eq(a, b),
            (ReferenceRow::MethodSpec(a), ReferenceRow::MethodSpec(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    fn is_equivalent(&self, other: &ReferenceRow) -> bool {
        match (self, other) {
            (ReferenceRow::Assembly(a), ReferenceRow::Assembly(b)) => {
                a.identity.matches_exactly(&b.identity)
            }
            (ReferenceRow::Module(a), ReferenceRow::Module(b)) => {
                a.name.eq_ignore_ascii_case(&b.name)
            }
            _ => self.is_same(other),
        }
    }
}

/// Token-ordered reference rows of one module.
#[derive(Default)]
pub struct ReferenceTable {
    rows: SkipMap<Token, ReferenceRow>,
    insert_lock: Mutex<()>,
}

impl ReferenceTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `row` and returns its token, reusing an existing equivalent row.
    pub fn insert(&self, row: ReferenceRow) -> Token {
        let _guard = lock!(self.insert_lock);

        if let Some(existing) = self.find(|candidate| candidate.is_equivalent(&row)) {
            return existing;
        }

        let table = row.table();
        let next_row = u32::try_from(self.table_rows(table).len())
            .unwrap_or(u32::MAX)
            .saturating_add(1);
        let token = Token::from_parts(table, next_row);
        self.rows.insert(token, row);
        token
    }

    /// The token under which exactly this object is registered.
    #[must_use]
    pub fn token_of(&self, row: &ReferenceRow) -> Option<Token> {
        self.find(|candidate| candidate.is_same(row))
    }

    /// Returns true if exactly this object is registered.
    #[must_use]
    pub fn contains(&self, row: &ReferenceRow) -> bool {
        self.token_of(row).is_some()
    }

    /// The row registered under `token`.
    #[must_use]
    pub fn get(&self, token: Token) -> Option<ReferenceRow> {
        self.rows.get(&token).map(|entry| entry.value().clone())
    }

    /// Total number of rows across all tables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if no rows are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All rows in token order.
    #[must_use]
    pub fn rows(&self) -> Vec<(Token, ReferenceRow)> {
        self.rows
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect()
    }

    /// Registered assembly references in row order.
    #[must_use]
    pub fn assembly_refs(&self) -> Vec<AssemblyRefRc> {
        self.table_rows(Token::ASSEMBLY_REF)
            .into_iter()
            .filter_map(|row| match row {
                ReferenceRow::Assembly(assembly) => Some(assembly),
                _ => None,
            })
            .collect()
    }

    /// Registered module references in row order.
    #[must_use]
    pub fn module_refs(&self) -> Vec<ModuleRefRc> {
        self.table_rows(Token::MODULE_REF)
            .into_iter()
            .filter_map(|row| match row {
                ReferenceRow::Module(module) => Some(module),
                _ => None,
            })
            .collect()
    }

    /// Registered type references in row order.
    #[must_use]
    pub fn type_refs(&self) -> Vec<TypeRefRc> {
        self.table_rows(Token::TYPE_REF)
            .into_iter()
            .filter_map(|row| match row {
                ReferenceRow::Type(reference) => Some(reference),
                _ => None,
            })
            .collect()
    }

    /// Registered member references in row order.
    #[must_use]
    pub fn member_refs(&self) -> Vec<MemberRefRc> {
        self.table_rows(Token::MEMBER_REF)
            .into_iter()
            .filter_map(|row| match row {
                ReferenceRow::Member(member) => Some(member),
                _ => None,
            })
            .collect()
    }

    fn table_rows(&self, table: u8) -> Vec<ReferenceRow> {
        self.rows
            .range(Token::from_parts(table, 1)..=Token::from_parts(table, 0x00FF_FFFF))
            .map(|entry| entry.value().clone())
            .collect()
    }

    fn find(&self, predicate: impl Fn(&ReferenceRow) -> bool) -> Option<Token> {
        self.rows
            .iter()
            .find(|entry| predicate(entry.value()))
            .map(|entry| *entry.key())
    }
}
