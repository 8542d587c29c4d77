//! # dotgraft Prelude
//!
//! The types most injection and resolution code needs, for glob import.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all dotgraft operations
pub use crate::Error;

/// The result type used throughout dotgraft
pub use crate::Result;

// ================================================================================================
// Metadata Model
// ================================================================================================

pub use crate::metadata::{
    assembly::{Assembly, AssemblyFlags, AssemblyRc},
    field::{FieldAttributes, FieldDef, FieldDefRc},
    identity::{AssemblyIdentity, AssemblyVersion},
    method::{
        ExceptionHandler, ExceptionHandlerFlags, Instruction, Local, MethodAttributes, MethodBody,
        MethodDef, MethodDefRc, MethodImplAttributes, Operand,
    },
    module::{Module, ModuleRc},
    references::{
        AssemblyRef, AssemblyRefRc, ExportedImplementation, ExportedType, FieldTarget, MemberRef,
        MemberRefParent, MemberSignature, MethodTarget, ModuleRef, ResolutionScope, TypeDefOrRef,
        TypeRef, TypeRefRc, TypeSpec,
    },
    signatures::{ElementType, MethodSig, TypeSig},
    typedef::{TypeAttributes, TypeDef, TypeDefRc},
};

// ================================================================================================
// Resolution
// ================================================================================================

pub use crate::resolver::{AssemblyCatalog, AssemblyLocator, AssemblyResolver, FlattenReport};

// ================================================================================================
// Injection
// ================================================================================================

pub use crate::inject::{InjectContext, InjectedMember, Injector, MemberMap};
