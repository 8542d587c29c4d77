//! Rebuilding references in the destination module.
//!
//! The [`Importer`] takes anything a cloned definition points at (types, signatures,
//! methods, fields) and returns the equivalent destination-side entity:
//!
//! - definitions that were cloned in the current operation map to their clones
//! - definitions already owned by the destination stay as they are
//! - everything else becomes a reference row, reusing a structurally equal row of the
//!   destination where one exists and staging a new one otherwise
//!
//! Type references are first offered to the [`ImportMapper`], which may re-anchor them
//! across base libraries or refuse them outright.

use std::sync::Arc;

use crate::{
    inject::mapper::{ImportMapper, Mapping},
    metadata::{
        comparer::SigComparer,
        field::FieldDefRc,
        identity::AssemblyIdentity,
        method::MethodDefRc,
        module::ModuleRc,
        references::{
            AssemblyRef, AssemblyRefRc, FieldTarget, MemberRef, MemberRefParent, MemberRefRc,
            MemberSignature, MethodSpec, MethodTarget, ModuleRef, ModuleRefRc, ResolutionScope,
            TypeDefOrRef, TypeRef, TypeRefRc, TypeSpec,
        },
        reftable::ReferenceRow,
        signatures::{MethodSig, TypeSig},
        typedef::TypeDefRc,
    },
    Error, Result,
};

/// A member reference after import: a destination definition or a reference row.
enum ImportedMember {
    Method(MethodDefRc),
    Field(FieldDefRc),
    Ref(MemberRefRc),
}

/// Imports source-side entities into one destination module.
pub struct Importer<'a, M: ImportMapper> {
    target: ModuleRc,
    mapper: &'a mut M,
}

impl<'a, M: ImportMapper> Importer<'a, M> {
    /// Creates an importer writing into `target` and consulting `mapper`.
    pub fn new(target: ModuleRc, mapper: &'a mut M) -> Self {
        Importer { target, mapper }
    }

    /// The destination module.
    #[must_use]
    pub fn target(&self) -> &ModuleRc {
        &self.target
    }

    /// Imports a type operand.
    ///
    /// # Errors
    /// Returns [`Error::ImportFailure`] if the type cannot be anchored in the destination.
    pub fn import_type(&mut self, ty: &TypeDefOrRef) -> Result<TypeDefOrRef> {
        match ty {
            TypeDefOrRef::TypeDef(def) => self.import_type_def(def),
            TypeDefOrRef::TypeRef(reference) => self.import_type_ref(reference),
            TypeDefOrRef::TypeSpec(spec) => {
                let signature = self.import_sig(&spec.signature)?;
                let imported = TypeSpec::new(signature);
                self.mapper
                    .staged()
                    .stage_row(ReferenceRow::TypeSpec(imported.clone()));
                Ok(TypeDefOrRef::TypeSpec(imported))
            }
        }
    }

    /// Imports a type definition: its clone, itself, or a reference to it.
    ///
    /// # Errors
    /// Returns [`Error::ImportFailure`] if the definition is not attached to an assembly.
    pub fn import_type_def(&mut self, def: &TypeDefRc) -> Result<TypeDefOrRef> {
        if let Some(clone) = self.mapper.map_type_def(def) {
            return Ok(TypeDefOrRef::TypeDef(clone));
        }
        if self.is_target(def.module()) {
            return Ok(TypeDefOrRef::TypeDef(def.clone()));
        }

        self.reference_foreign_type(def).map(TypeDefOrRef::TypeRef)
    }

    fn reference_foreign_type(&mut self, def: &TypeDefRc) -> Result<TypeRefRc> {
        let scope = match def.declaring_type() {
            Some(outer) => ResolutionScope::Type(self.reference_foreign_type(&outer)?),
            None => {
                let assembly = def
                    .module()
                    .and_then(|module| module.assembly())
                    .ok_or_else(|| Error::ImportFailure(def.full_name()))?;
                ResolutionScope::Assembly(self.import_assembly_ref(&assembly.identity))
            }
        };

        let candidate = TypeRef::new(def.namespace.clone(), def.name.clone(), scope);
        Ok(self.intern_type_ref(candidate))
    }

    /// Imports a type reference.
    ///
    /// A reference into the destination's own assembly becomes the definition it names.
    ///
    /// # Errors
    /// Returns [`Error::ImportFailure`] if the mapper refuses the reference or a nested
    /// reference names a type missing from the destination.
    pub fn import_type_ref(&mut self, reference: &TypeRefRc) -> Result<TypeDefOrRef> {
        match self.mapper.map_type_ref(reference) {
            Mapping::Mapped(mapped) => return Ok(TypeDefOrRef::TypeRef(mapped)),
            Mapping::Unresolved => return Err(Error::ImportFailure(reference.full_name())),
            Mapping::Unchanged => {}
        }

        if let Some(local) = self.local_definition(reference) {
            return Ok(TypeDefOrRef::TypeDef(local));
        }

        let scope = match &reference.scope {
            ResolutionScope::Assembly(assembly) => {
                ResolutionScope::Assembly(self.import_assembly_ref(&assembly.identity))
            }
            ResolutionScope::Module(module) => {
                ResolutionScope::Module(self.import_module_ref(&module.name))
            }
            ResolutionScope::Type(outer) => match self.import_type_ref(outer)? {
                TypeDefOrRef::TypeRef(outer) => ResolutionScope::Type(outer),
                _ => return Err(Error::ImportFailure(reference.full_name())),
            },
        };

        let candidate = TypeRef::new(reference.namespace.clone(), reference.name.clone(), scope);
        Ok(TypeDefOrRef::TypeRef(self.intern_type_ref(candidate)))
    }

    fn local_definition(&self, reference: &TypeRef) -> Option<TypeDefRc> {
        let scope = reference.definition_assembly()?;
        let own = self.target.assembly_identity()?;
        if !own.matches_exactly(&scope.identity) {
            return None;
        }
        self.target.find_type_by_ref(reference)
    }

    fn intern_type_ref(&mut self, candidate: TypeRefRc) -> TypeRefRc {
        if let Some(existing) = self.mapper.staged().find_type_ref(&self.target, &candidate) {
            return existing;
        }
        self.mapper
            .staged()
            .stage_row(ReferenceRow::Type(candidate.clone()));
        candidate
    }

    /// Imports a type signature.
    ///
    /// # Errors
    /// Returns [`Error::ImportFailure`] if any type in the signature cannot be imported.
    pub fn import_sig(&mut self, sig: &TypeSig) -> Result<TypeSig> {
        Ok(match sig {
            TypeSig::Primitive(element) => TypeSig::Primitive(*element),
            TypeSig::Var(index) => TypeSig::Var(*index),
            TypeSig::MVar(index) => TypeSig::MVar(*index),
            TypeSig::Class(ty) => TypeSig::Class(self.import_type(ty)?),
            TypeSig::ValueType(ty) => TypeSig::ValueType(self.import_type(ty)?),
            TypeSig::GenericInst {
                generic,
                is_value_type,
                args,
            } => TypeSig::GenericInst {
                generic: self.import_type(generic)?,
                is_value_type: *is_value_type,
                args: self.import_sigs(args)?,
            },
            TypeSig::SzArray(inner) => TypeSig::SzArray(Box::new(self.import_sig(inner)?)),
            TypeSig::Ptr(inner) => TypeSig::Ptr(Box::new(self.import_sig(inner)?)),
            TypeSig::ByRef(inner) => TypeSig::ByRef(Box::new(self.import_sig(inner)?)),
            TypeSig::Pinned(inner) => TypeSig::Pinned(Box::new(self.import_sig(inner)?)),
            TypeSig::Array {
                element,
                rank,
                sizes,
                lower_bounds,
            } => TypeSig::Array {
                element: Box::new(self.import_sig(element)?),
                rank: *rank,
                sizes: sizes.clone(),
                lower_bounds: lower_bounds.clone(),
            },
            TypeSig::FnPtr(method) => TypeSig::FnPtr(Box::new(self.import_method_sig(method)?)),
            TypeSig::ModReqd { modifier, inner } => TypeSig::ModReqd {
                modifier: self.import_type(modifier)?,
                inner: Box::new(self.import_sig(inner)?),
            },
            TypeSig::ModOpt { modifier, inner } => TypeSig::ModOpt {
                modifier: self.import_type(modifier)?,
                inner: Box::new(self.import_sig(inner)?),
            },
        })
    }

    fn import_sigs(&mut self, sigs: &[TypeSig]) -> Result<Vec<TypeSig>> {
        sigs.iter().map(|sig| self.import_sig(sig)).collect()
    }

    /// Imports a method signature.
    ///
    /// # Errors
    /// Returns [`Error::ImportFailure`] if any type in the signature cannot be imported.
    pub fn import_method_sig(&mut self, sig: &MethodSig) -> Result<MethodSig> {
        Ok(MethodSig {
            has_this: sig.has_this,
            explicit_this: sig.explicit_this,
            generic_param_count: sig.generic_param_count,
            return_type: self.import_sig(&sig.return_type)?,
            params: self.import_sigs(&sig.params)?,
        })
    }

    /// A destination reference to the assembly `identity`, reusing an identical one.
    pub fn import_assembly_ref(&mut self, identity: &AssemblyIdentity) -> AssemblyRefRc {
        if let Some(existing) = self.mapper.staged().find_assembly_ref(&self.target, identity) {
            return existing;
        }
        let imported = AssemblyRef::new(identity.clone());
        self.mapper
            .staged()
            .stage_row(ReferenceRow::Assembly(imported.clone()));
        imported
    }

    /// A destination reference to the native module `name`, reusing an existing one.
    pub fn import_module_ref(&mut self, name: &str) -> ModuleRefRc {
        if let Some(existing) = self.mapper.staged().find_module_ref(&self.target, name) {
            return existing;
        }
        let imported = ModuleRef::new(name);
        self.mapper
            .staged()
            .stage_row(ReferenceRow::Module(imported.clone()));
        imported
    }

    /// Imports a method operand.
    ///
    /// # Errors
    /// Returns [`Error::ImportFailure`] if the method or its declaring type cannot be
    /// anchored in the destination, [`Error::Malformed`] for a method without signature.
    pub fn import_method(&mut self, method: &MethodTarget) -> Result<MethodTarget> {
        match method {
            MethodTarget::Def(def) => {
                if let Some(clone) = self.mapper.map_method(def) {
                    return Ok(MethodTarget::Def(clone));
                }
                if self.is_target(def.module()) {
                    return Ok(MethodTarget::Def(def.clone()));
                }

                let owner = def
                    .declaring_type()
                    .ok_or_else(|| Error::ImportFailure(def.full_name()))?;
                let signature = def.signature().ok_or_else(|| {
                    malformed_error!("Method {} has no signature", def.full_name())
                })?;
                let candidate = MemberRef::new(
                    def.name.clone(),
                    MemberRefParent::Type(self.import_type_def(&owner)?),
                    MemberSignature::Method(self.import_method_sig(&signature)?),
                );
                match self.settle_member_ref(candidate) {
                    ImportedMember::Method(local) => Ok(MethodTarget::Def(local)),
                    ImportedMember::Ref(reference) => Ok(MethodTarget::Ref(reference)),
                    ImportedMember::Field(_) => Err(Error::ImportFailure(def.full_name())),
                }
            }
            MethodTarget::Ref(reference) => match self.import_member_ref(reference)? {
                ImportedMember::Method(local) => Ok(MethodTarget::Def(local)),
                ImportedMember::Ref(reference) => Ok(MethodTarget::Ref(reference)),
                ImportedMember::Field(_) => Err(Error::ImportFailure(reference.name.clone())),
            },
            MethodTarget::Spec(spec) => {
                let generic = self.import_method(&spec.method)?;
                let instantiation = self.import_sigs(&spec.instantiation)?;
                let imported = MethodSpec::new(generic, instantiation);
                self.mapper
                    .staged()
                    .stage_row(ReferenceRow::MethodSpec(imported.clone()));
                Ok(MethodTarget::Spec(imported))
            }
        }
    }

    /// Imports a field operand.
    ///
    /// # Errors
    /// Returns [`Error::ImportFailure`] if the field or its declaring type cannot be
    /// anchored in the destination, [`Error::Malformed`] for a field without signature.
    pub fn import_field(&mut self, field: &FieldTarget) -> Result<FieldTarget> {
        match field {
            FieldTarget::Def(def) => {
                if let Some(clone) = self.mapper.map_field(def) {
                    return Ok(FieldTarget::Def(clone));
                }
                let owner = def
                    .declaring_type()
                    .ok_or_else(|| Error::ImportFailure(def.name.clone()))?;
                if self.is_target(owner.module()) {
                    return Ok(FieldTarget::Def(def.clone()));
                }

                let signature = def.signature().ok_or_else(|| {
                    malformed_error!("Field {}::{} has no signature", owner.full_name(), def.name)
                })?;
                let candidate = MemberRef::new(
                    def.name.clone(),
                    MemberRefParent::Type(self.import_type_def(&owner)?),
                    MemberSignature::Field(self.import_sig(&signature)?),
                );
                match self.settle_member_ref(candidate) {
                    ImportedMember::Field(local) => Ok(FieldTarget::Def(local)),
                    ImportedMember::Ref(reference) => Ok(FieldTarget::Ref(reference)),
                    ImportedMember::Method(_) => Err(Error::ImportFailure(def.name.clone())),
                }
            }
            FieldTarget::Ref(reference) => match self.import_member_ref(reference)? {
                ImportedMember::Field(local) => Ok(FieldTarget::Def(local)),
                ImportedMember::Ref(reference) => Ok(FieldTarget::Ref(reference)),
                ImportedMember::Method(_) => Err(Error::ImportFailure(reference.name.clone())),
            },
        }
    }

    fn import_member_ref(&mut self, reference: &MemberRef) -> Result<ImportedMember> {
        let parent = match &reference.parent {
            MemberRefParent::Type(ty) => MemberRefParent::Type(self.import_type(ty)?),
            MemberRefParent::Module(module) => {
                MemberRefParent::Module(self.import_module_ref(&module.name))
            }
        };
        let signature = match &reference.signature {
            MemberSignature::Method(sig) => MemberSignature::Method(self.import_method_sig(sig)?),
            MemberSignature::Field(sig) => MemberSignature::Field(self.import_sig(sig)?),
        };

        Ok(self.settle_member_ref(MemberRef::new(reference.name.clone(), parent, signature)))
    }

    /// Turns an imported member reference into a destination definition when its parent
    /// is one, otherwise into a reused or newly staged reference row.
    fn settle_member_ref(&mut self, candidate: MemberRefRc) -> ImportedMember {
        if let MemberRefParent::Type(TypeDefOrRef::TypeDef(owner)) = &candidate.parent {
            let comparer = SigComparer::default();
            match &candidate.signature {
                MemberSignature::Method(sig) => {
                    let local = owner.methods().into_iter().find(|method| {
                        method.name == candidate.name
                            && method
                                .signature()
                                .is_some_and(|own| comparer.method_sigs_equal(&own, sig))
                    });
                    if let Some(local) = local {
                        return ImportedMember::Method(local);
                    }
                }
                MemberSignature::Field(sig) => {
                    let local = owner.fields().into_iter().find(|field| {
                        field.name == candidate.name
                            && field
                                .signature()
                                .is_some_and(|own| comparer.sigs_equal(&own, sig))
                    });
                    if let Some(local) = local {
                        return ImportedMember::Field(local);
                    }
                }
            }
        }

        if let Some(existing) = self.mapper.staged().find_member_ref(&self.target, &candidate) {
            return ImportedMember::Ref(existing);
        }
        self.mapper
            .staged()
            .stage_row(ReferenceRow::Member(candidate.clone()));
        ImportedMember::Ref(candidate)
    }

    fn is_target(&self, module: Option<ModuleRc>) -> bool {
        module.is_some_and(|module| Arc::ptr_eq(&module, &self.target))
    }
}
