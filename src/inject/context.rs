//! Per-operation injection state.
//!
//! An [`InjectContext`] owns everything one injection operation produces: the member map,
//! the reference rows the destination will need, and the places where cloned members
//! attach to destination-owned types. None of it reaches the destination module until
//! [`InjectContext::commit`]; dropping the context instead leaves the destination as it
//! was.

use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::{
    inject::{
        clone,
        importer::Importer,
        map::{InjectedMember, MemberMap},
    },
    metadata::{
        comparer::SigComparer,
        field::FieldDefRc,
        identity::AssemblyIdentity,
        method::MethodDefRc,
        module::{Module, ModuleRc},
        references::{
            AssemblyRefRc, MemberRef, MemberRefRc, MethodTarget, ModuleRefRc, TypeRef, TypeRefRc,
        },
        reftable::ReferenceRow,
        typedef::TypeDefRc,
    },
    resolver::AssemblyResolver,
    Result,
};

enum Attachment {
    Nested(TypeDefRc, TypeDefRc),
    Method(TypeDefRc, MethodDefRc),
    Field(TypeDefRc, FieldDefRc),
}

impl Attachment {
    fn apply(self) {
        match self {
            Attachment::Nested(owner, nested) => owner.add_nested_type(nested),
            Attachment::Method(owner, method) => owner.add_method(method),
            Attachment::Field(owner, field) => owner.add_field(field),
        }
    }
}

#[derive(Clone, Copy)]
struct StagedMark {
    rows: usize,
    attachments: usize,
    top_level: usize,
}

/// Destination changes waiting for [`InjectContext::commit`].
#[derive(Default)]
pub struct StagedChanges {
    rows: Vec<ReferenceRow>,
    attachments: Vec<Attachment>,
    top_level: Vec<TypeDefRc>,
}

impl StagedChanges {
    /// Reference rows in registration order.
    #[must_use]
    pub fn rows(&self) -> &[ReferenceRow] {
        &self.rows
    }

    /// Types that become top-level types of the destination.
    #[must_use]
    pub fn top_level_types(&self) -> &[TypeDefRc] {
        &self.top_level
    }

    /// Returns true if nothing is staged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() && self.attachments.is_empty() && self.top_level.is_empty()
    }

    pub(crate) fn stage_row(&mut self, row: ReferenceRow) {
        if !self.rows.iter().any(|staged| staged.is_same(&row)) {
            self.rows.push(row);
        }
    }

    pub(crate) fn attach_nested(&mut self, owner: &TypeDefRc, nested: TypeDefRc) {
        self.attachments
            .push(Attachment::Nested(owner.clone(), nested));
    }

    pub(crate) fn attach_method(&mut self, owner: &TypeDefRc, method: MethodDefRc) {
        self.attachments
            .push(Attachment::Method(owner.clone(), method));
    }

    pub(crate) fn attach_field(&mut self, owner: &TypeDefRc, field: FieldDefRc) {
        self.attachments
            .push(Attachment::Field(owner.clone(), field));
    }

    pub(crate) fn add_top_level(&mut self, ty: TypeDefRc) {
        if !self.top_level.iter().any(|staged| Arc::ptr_eq(staged, &ty)) {
            self.top_level.push(ty);
        }
    }

    fn mark(&self) -> StagedMark {
        StagedMark {
            rows: self.rows.len(),
            attachments: self.attachments.len(),
            top_level: self.top_level.len(),
        }
    }

    fn truncate(&mut self, mark: StagedMark) {
        self.rows.truncate(mark.rows);
        self.attachments.truncate(mark.attachments);
        self.top_level.truncate(mark.top_level);
    }

    fn staged_rows<'a, T: 'a>(
        &'a self,
        select: impl Fn(&'a ReferenceRow) -> Option<&'a T> + 'a,
    ) -> impl Iterator<Item = &'a T> + 'a {
        self.rows.iter().filter_map(select)
    }

    /// An assembly reference with exactly this identity, staged or already in `target`.
    pub(crate) fn find_assembly_ref(
        &self,
        target: &Module,
        identity: &AssemblyIdentity,
    ) -> Option<AssemblyRefRc> {
        let staged = self
            .staged_rows(|row| match row {
                ReferenceRow::Assembly(assembly) => Some(assembly),
                _ => None,
            })
            .find(|assembly| assembly.identity.matches_exactly(identity))
            .cloned();

        staged.or_else(|| {
            target
                .assembly_refs()
                .into_iter()
                .find(|assembly| assembly.identity.matches_exactly(identity))
        })
    }

    /// A module reference called `name`, staged or already in `target`.
    pub(crate) fn find_module_ref(&self, target: &Module, name: &str) -> Option<ModuleRefRc> {
        let staged = self
            .staged_rows(|row| match row {
                ReferenceRow::Module(module) => Some(module),
                _ => None,
            })
            .find(|module| module.name.eq_ignore_ascii_case(name))
            .cloned();

        staged.or_else(|| target.get_module_ref(name))
    }

    /// A type reference structurally equal to `candidate`, staged or already in `target`.
    pub(crate) fn find_type_ref(&self, target: &Module, candidate: &TypeRef) -> Option<TypeRefRc> {
        let comparer = SigComparer::default();
        let staged = self
            .staged_rows(|row| match row {
                ReferenceRow::Type(reference) => Some(reference),
                _ => None,
            })
            .find(|reference| comparer.type_refs_equal(reference, candidate))
            .cloned();

        staged.or_else(|| {
            target
                .references()
                .type_refs()
                .into_iter()
                .find(|reference| comparer.type_refs_equal(reference, candidate))
        })
    }

    /// A member reference structurally equal to `candidate`, staged or already in `target`.
    pub(crate) fn find_member_ref(
        &self,
        target: &Module,
        candidate: &MemberRef,
    ) -> Option<MemberRefRc> {
        let staged = self
            .staged_rows(|row| match row {
                ReferenceRow::Member(member) => Some(member),
                _ => None,
            })
            .find(|member| member_refs_equal(member, candidate))
            .cloned();

        staged.or_else(|| {
            target
                .references()
                .member_refs()
                .into_iter()
                .find(|member| member_refs_equal(member, candidate))
        })
    }
}

fn member_refs_equal(a: &MemberRef, b: &MemberRef) -> bool {
    use crate::metadata::references::{MemberRefParent, MemberSignature};

    let comparer = SigComparer::default();
    let parents_equal = match (&a.parent, &b.parent) {
        (MemberRefParent::Type(a), MemberRefParent::Type(b)) => comparer.types_equal(a, b),
        (MemberRefParent::Module(a), MemberRefParent::Module(b)) => {
            a.name.eq_ignore_ascii_case(&b.name)
        }
        _ => false,
    };
    let signatures_equal = match (&a.signature, &b.signature) {
        (MemberSignature::Method(a), MemberSignature::Method(b)) => comparer.method_sigs_equal(a, b),
        (MemberSignature::Field(a), MemberSignature::Field(b)) => comparer.sigs_equal(a, b),
        _ => false,
    };

    a.name == b.name && parents_equal && signatures_equal
}

/// Operation state to return to when a call fails.
struct Checkpoint {
    map: MemberMap,
    well_known: FxHashMap<String, Option<AssemblyRefRc>>,
    copied: FxHashSet<usize>,
    staged: StagedMark,
}

/// State of one injection operation into one destination module.
pub struct InjectContext {
    pub(crate) resolver: Arc<AssemblyResolver>,
    pub(crate) origin: Option<ModuleRc>,
    pub(crate) target: ModuleRc,
    pub(crate) map: MemberMap,
    pub(crate) staged: StagedChanges,
    pub(crate) well_known: FxHashMap<String, Option<AssemblyRefRc>>,
    copied: FxHashSet<usize>,
}

impl InjectContext {
    /// Starts an operation cloning from `origin` into `target`.
    ///
    /// `origin` is the module the injected definitions come from; `None` treats every
    /// foreign reference as crossing base libraries.
    #[must_use]
    pub fn new(resolver: Arc<AssemblyResolver>, origin: Option<ModuleRc>, target: ModuleRc) -> Self {
        InjectContext {
            resolver,
            origin,
            target,
            map: MemberMap::new(),
            staged: StagedChanges::default(),
            well_known: FxHashMap::default(),
            copied: FxHashSet::default(),
        }
    }

    /// The destination module.
    #[must_use]
    pub fn target(&self) -> &ModuleRc {
        &self.target
    }

    /// The source module, if known.
    #[must_use]
    pub fn origin(&self) -> Option<&ModuleRc> {
        self.origin.as_ref()
    }

    /// The member map built so far.
    #[must_use]
    pub fn map(&self) -> &MemberMap {
        &self.map
    }

    /// Changes that [`commit`](Self::commit) would apply.
    #[must_use]
    pub fn staged(&self) -> &StagedChanges {
        &self.staged
    }

    /// An importer writing into this operation.
    pub fn importer(&mut self) -> Importer<'_, Self> {
        Importer::new(self.target.clone(), self)
    }

    /// Returns false if `method` was copied before in this operation.
    pub(crate) fn mark_copied(&mut self, method: &MethodDefRc) -> bool {
        self.copied.insert(Arc::as_ptr(method) as usize)
    }

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            map: self.map.clone(),
            well_known: self.well_known.clone(),
            copied: self.copied.clone(),
            staged: self.staged.mark(),
        }
    }

    fn restore(&mut self, checkpoint: Checkpoint) {
        self.map = checkpoint.map;
        self.well_known = checkpoint.well_known;
        self.copied = checkpoint.copied;
        self.staged.truncate(checkpoint.staged);
    }

    /// Runs `operation`; if it fails, everything it staged or mapped is discarded.
    fn atomically<T>(&mut self, operation: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let checkpoint = self.checkpoint();
        let result = operation(self);
        if let Err(error) = &result {
            log::debug!("rolling back failed injection into {}: {}", self.target.name, error);
            self.restore(checkpoint);
        }
        result
    }

    /// Clones `source` with everything it contains and stages it as a new top-level type
    /// of the destination.
    ///
    /// Cloning a type that this operation has already cloned returns the existing clone.
    /// A failed call leaves the context as it was before the call.
    ///
    /// # Errors
    /// Returns [`crate::Error::ImportFailure`] if a reference cannot be anchored in the
    /// destination, [`crate::Error::MissingMapping`] or [`crate::Error::Malformed`] if a
    /// body cannot be relinked.
    pub fn inject_type(&mut self, source: &TypeDefRc) -> Result<TypeDefRc> {
        self.atomically(|ctx| {
            let clone = clone::populate(ctx, source);
            ctx.staged.add_top_level(clone.clone());
            clone::copy(ctx, source, true)?;
            Ok(clone)
        })
    }

    /// Clones the members of `source` into the existing destination type `existing`.
    ///
    /// Returns the definitions created by this call, `existing` excluded.
    ///
    /// # Errors
    /// See [`inject_type`](Self::inject_type).
    pub fn inject_members(
        &mut self,
        source: &TypeDefRc,
        existing: &TypeDefRc,
    ) -> Result<Vec<InjectedMember>> {
        self.atomically(|ctx| {
            let before = ctx.map.members().len();
            ctx.map.insert_type(source, existing.clone());
            clone::populate(ctx, source);
            clone::copy(ctx, source, false)?;

            Ok(ctx
                .map
                .members_except(before, &InjectedMember::Type(existing.clone())))
        })
    }

    /// Clones a single method. The clone is not attached to any type.
    ///
    /// # Errors
    /// See [`inject_type`](Self::inject_type).
    pub fn inject_method(&mut self, source: &MethodDefRc) -> Result<MethodDefRc> {
        self.atomically(|ctx| {
            let clone = ctx.map.insert_method(source, clone::method_shell(source));
            clone::copy_method_def(ctx, source)?;
            Ok(clone)
        })
    }

    /// Imports a method reference without cloning anything.
    ///
    /// # Errors
    /// Returns [`crate::Error::ImportFailure`] if the method cannot be anchored in the
    /// destination.
    pub fn import_method(&mut self, method: &MethodTarget) -> Result<MethodTarget> {
        self.atomically(|ctx| ctx.importer().import_method(method))
    }

    /// Applies the staged changes to the destination and returns the member map.
    pub fn commit(self) -> MemberMap {
        let InjectContext {
            target,
            map,
            staged,
            ..
        } = self;
        let StagedChanges {
            rows,
            attachments,
            top_level,
        } = staged;

        let row_count = rows.len();
        for row in rows {
            target.references().insert(row);
        }
        for attachment in attachments {
            attachment.apply();
        }
        let type_count = top_level.len();
        for ty in top_level {
            target.add_type(ty);
        }

        log::debug!(
            "committed {} definitions ({} top-level types) and {} reference rows into {}",
            map.len(),
            type_count,
            row_count,
            target.name
        );
        map
    }
}

impl std::fmt::Debug for InjectContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InjectContext")
            .field("target", &self.target.name)
            .field("origin", &self.origin.as_ref().map(|module| module.name.as_str()))
            .field("map", &self.map)
            .field("staged_rows", &self.staged.rows.len())
            .finish()
    }
}
