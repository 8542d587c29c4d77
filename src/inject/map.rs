//! The per-operation member map.
//!
//! Keys are the addresses of the original objects. The map keeps the originals alive
//! alongside their clones, so an address cannot be reused by another allocation while
//! the map exists.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::metadata::{
    field::FieldDefRc, method::MethodDefRc, references::TypeRefRc, typedef::TypeDefRc,
};

/// A definition created by an injection.
#[derive(Debug, Clone)]
pub enum InjectedMember {
    /// Cloned type.
    Type(TypeDefRc),
    /// Cloned method.
    Method(MethodDefRc),
    /// Cloned field.
    Field(FieldDefRc),
}

impl InjectedMember {
    /// Name of the cloned definition.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            InjectedMember::Type(ty) => &ty.name,
            InjectedMember::Method(method) => &method.name,
            InjectedMember::Field(field) => &field.name,
        }
    }

    /// The cloned type, if this is one.
    #[must_use]
    pub fn as_type(&self) -> Option<&TypeDefRc> {
        match self {
            InjectedMember::Type(ty) => Some(ty),
            _ => None,
        }
    }

    /// The cloned method, if this is one.
    #[must_use]
    pub fn as_method(&self) -> Option<&MethodDefRc> {
        match self {
            InjectedMember::Method(method) => Some(method),
            _ => None,
        }
    }

    /// The cloned field, if this is one.
    #[must_use]
    pub fn as_field(&self) -> Option<&FieldDefRc> {
        match self {
            InjectedMember::Field(field) => Some(field),
            _ => None,
        }
    }

    pub(crate) fn is_same(&self, other: &InjectedMember) -> bool {
        match (self, other) {
            (InjectedMember::Type(a), InjectedMember::Type(b)) => Arc::ptr_eq(a, b),
            (InjectedMember::Method(a), InjectedMember::Method(b)) => Arc::ptr_eq(a, b),
            (InjectedMember::Field(a), InjectedMember::Field(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

fn key<T>(value: &Arc<T>) -> usize {
    Arc::as_ptr(value) as usize
}

/// Original definition to clone, plus original reference to re-anchored reference.
#[derive(Default, Clone)]
pub struct MemberMap {
    types: FxHashMap<usize, (TypeDefRc, TypeDefRc)>,
    methods: FxHashMap<usize, (MethodDefRc, MethodDefRc)>,
    fields: FxHashMap<usize, (FieldDefRc, FieldDefRc)>,
    type_refs: FxHashMap<usize, (TypeRefRc, Option<TypeRefRc>)>,
    order: Vec<InjectedMember>,
}

impl MemberMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Maps `original` to `clone` unless it is mapped already; returns the mapped clone.
    pub fn insert_type(&mut self, original: &TypeDefRc, clone: TypeDefRc) -> TypeDefRc {
        if let Some((_, existing)) = self.types.get(&key(original)) {
            return existing.clone();
        }
        self.types
            .insert(key(original), (original.clone(), clone.clone()));
        self.order.push(InjectedMember::Type(clone.clone()));
        clone
    }

    /// Maps `original` to `clone` unless it is mapped already; returns the mapped clone.
    pub fn insert_method(&mut self, original: &MethodDefRc, clone: MethodDefRc) -> MethodDefRc {
        if let Some((_, existing)) = self.methods.get(&key(original)) {
            return existing.clone();
        }
        self.methods
            .insert(key(original), (original.clone(), clone.clone()));
        self.order.push(InjectedMember::Method(clone.clone()));
        clone
    }

    /// Maps `original` to `clone` unless it is mapped already; returns the mapped clone.
    pub fn insert_field(&mut self, original: &FieldDefRc, clone: FieldDefRc) -> FieldDefRc {
        if let Some((_, existing)) = self.fields.get(&key(original)) {
            return existing.clone();
        }
        self.fields
            .insert(key(original), (original.clone(), clone.clone()));
        self.order.push(InjectedMember::Field(clone.clone()));
        clone
    }

    /// Records how a reference was re-anchored; `None` records a failure.
    pub fn insert_type_ref(&mut self, original: &TypeRefRc, mapped: Option<TypeRefRc>) {
        self.type_refs
            .insert(key(original), (original.clone(), mapped));
    }

    /// The clone of a type.
    #[must_use]
    pub fn type_of(&self, original: &TypeDefRc) -> Option<TypeDefRc> {
        self.types.get(&key(original)).map(|(_, clone)| clone.clone())
    }

    /// The clone of a method.
    #[must_use]
    pub fn method_of(&self, original: &MethodDefRc) -> Option<MethodDefRc> {
        self.methods
            .get(&key(original))
            .map(|(_, clone)| clone.clone())
    }

    /// The clone of a field.
    #[must_use]
    pub fn field_of(&self, original: &FieldDefRc) -> Option<FieldDefRc> {
        self.fields.get(&key(original)).map(|(_, clone)| clone.clone())
    }

    /// The recorded outcome for a reference: `Some(None)` is a cached failure.
    #[must_use]
    pub fn type_ref_of(&self, original: &TypeRefRc) -> Option<Option<TypeRefRc>> {
        self.type_refs
            .get(&key(original))
            .map(|(_, mapped)| mapped.clone())
    }

    /// Returns true if `original` has a cloned counterpart.
    #[must_use]
    pub fn contains_type(&self, original: &TypeDefRc) -> bool {
        self.types.contains_key(&key(original))
    }

    /// Number of mapped definitions (references excluded).
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len() + self.methods.len() + self.fields.len()
    }

    /// Returns true if no definition is mapped.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clones in the order they were mapped.
    #[must_use]
    pub fn members(&self) -> &[InjectedMember] {
        &self.order
    }

    /// Clones mapped at or after position `start`, in mapping order, leaving out `excluded`.
    #[must_use]
    pub fn members_except(&self, start: usize, excluded: &InjectedMember) -> Vec<InjectedMember> {
        self.order
            .iter()
            .skip(start)
            .filter(|member| !member.is_same(excluded))
            .cloned()
            .collect()
    }
}

impl std::fmt::Debug for MemberMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemberMap")
            .field("types", &self.types.len())
            .field("methods", &self.methods.len())
            .field("fields", &self.fields.len())
            .field("type_refs", &self.type_refs.len())
            .finish()
    }
}
