//! Method definitions and their bodies.
//!
//! A [`MethodDef`] is created as a bare shell (name, flags, generic parameters) and filled
//! in later: signature, native-interop mapping, custom attributes and body all live behind
//! locks so that the injection engine can build the shells of a whole type graph first and
//! wire up the cross references afterwards.
//!
//! # Key Components
//!
//! - [`MethodDef`] - the definition itself
//! - [`MethodBody`] - instructions, locals and exception handlers
//! - [`Instruction`] / [`Operand`] - instructions with identity-based branch targets
//! - [`ImplMap`] - P/Invoke mapping to a native module
//! - [`CustomAttribute`] - constructor reference plus opaque argument blob

mod body;
mod exceptions;
mod instruction;
pub mod opcodes;
mod types;

pub use body::{Local, MethodBody};
pub use exceptions::{ExceptionHandler, ExceptionHandlerFlags};
pub use instruction::{Immediate, Instruction, InstructionId, Operand, SequencePoint};
pub use types::{MethodAttributes, MethodImplAttributes, PInvokeAttributes};

use std::sync::{Arc, RwLock, RwLockReadGuard, Weak};

use crate::metadata::{
    module::ModuleRc,
    references::{MethodTarget, ModuleRefRc},
    signatures::MethodSig,
    typedef::{GenericParam, TypeDef, TypeDefRc},
};

/// A reference to a [`MethodDef`]
pub type MethodDefRc = Arc<MethodDef>;

/// P/Invoke mapping of a method (`ImplMap` table, ECMA-335 §II.22.22).
#[derive(Debug, Clone)]
pub struct ImplMap {
    /// Native module exporting the entry point.
    pub module: ModuleRefRc,
    /// Entry point name.
    pub name: String,
    /// Marshalling and calling convention flags.
    pub flags: PInvokeAttributes,
}

/// A custom attribute attached to a definition.
#[derive(Debug, Clone)]
pub struct CustomAttribute {
    /// Attribute constructor.
    pub constructor: MethodTarget,
    /// Encoded constructor arguments and named arguments (ECMA-335 §II.23.3).
    pub blob: Vec<u8>,
}

/// A method definition.
pub struct MethodDef {
    /// Method name.
    pub name: String,
    /// Visibility and vtable flags.
    pub flags: MethodAttributes,
    /// Implementation flags.
    pub impl_flags: MethodImplAttributes,
    /// Generic method parameters.
    pub generic_params: Vec<GenericParam>,
    signature: RwLock<Option<MethodSig>>,
    impl_map: RwLock<Option<ImplMap>>,
    custom_attributes: RwLock<Vec<CustomAttribute>>,
    body: RwLock<Option<MethodBody>>,
    declaring_type: RwLock<Weak<TypeDef>>,
}

impl MethodDef {
    /// Creates a method without signature or body.
    pub fn new(
        name: impl Into<String>,
        flags: MethodAttributes,
        impl_flags: MethodImplAttributes,
    ) -> Self {
        MethodDef {
            name: name.into(),
            flags,
            impl_flags,
            generic_params: Vec::new(),
            signature: RwLock::new(None),
            impl_map: RwLock::new(None),
            custom_attributes: RwLock::new(Vec::new()),
            body: RwLock::new(None),
            declaring_type: RwLock::new(Weak::new()),
        }
    }

    /// Builder helper: sets the signature.
    #[must_use]
    pub fn with_signature(self, signature: MethodSig) -> Self {
        self.set_signature(signature);
        self
    }

    /// Builder helper: sets the body.
    #[must_use]
    pub fn with_body(self, body: MethodBody) -> Self {
        self.set_body(body);
        self
    }

    /// Builder helper: appends a generic parameter.
    #[must_use]
    pub fn with_generic_param(mut self, param: GenericParam) -> Self {
        self.generic_params.push(param);
        self
    }

    /// Wraps the method into a shared handle.
    #[must_use]
    pub fn into_rc(self) -> MethodDefRc {
        Arc::new(self)
    }

    /// The signature, `None` for shells that have not been filled in yet.
    #[must_use]
    pub fn signature(&self) -> Option<MethodSig> {
        read_lock!(self.signature).clone()
    }

    /// Replaces the signature.
    pub fn set_signature(&self, signature: MethodSig) {
        *write_lock!(self.signature) = Some(signature);
    }

    /// Number of argument slots, counting an implicit `this`.
    #[must_use]
    pub fn argument_count(&self) -> usize {
        read_lock!(self.signature)
            .as_ref()
            .map_or(0, MethodSig::argument_count)
    }

    /// The P/Invoke mapping.
    #[must_use]
    pub fn impl_map(&self) -> Option<ImplMap> {
        read_lock!(self.impl_map).clone()
    }

    /// Replaces the P/Invoke mapping.
    pub fn set_impl_map(&self, impl_map: ImplMap) {
        *write_lock!(self.impl_map) = Some(impl_map);
    }

    /// Attached custom attributes.
    #[must_use]
    pub fn custom_attributes(&self) -> Vec<CustomAttribute> {
        read_lock!(self.custom_attributes).clone()
    }

    /// Attaches a custom attribute.
    pub fn add_custom_attribute(&self, attribute: CustomAttribute) {
        write_lock!(self.custom_attributes).push(attribute);
    }

    /// Returns true if the method carries a body.
    #[must_use]
    pub fn has_body(&self) -> bool {
        read_lock!(self.body).is_some()
    }

    /// Read access to the body.
    pub fn body(&self) -> RwLockReadGuard<'_, Option<MethodBody>> {
        read_lock!(self.body)
    }

    /// Replaces the body.
    pub fn set_body(&self, body: MethodBody) {
        *write_lock!(self.body) = Some(body);
    }

    /// The type declaring this method, if it is attached to one.
    #[must_use]
    pub fn declaring_type(&self) -> Option<TypeDefRc> {
        read_lock!(self.declaring_type).upgrade()
    }

    pub(crate) fn set_declaring_type(&self, owner: &TypeDefRc) {
        *write_lock!(self.declaring_type) = Arc::downgrade(owner);
    }

    /// The module owning the declaring type.
    #[must_use]
    pub fn module(&self) -> Option<ModuleRc> {
        self.declaring_type().and_then(|owner| owner.module())
    }

    /// `Type::Name` style full name.
    #[must_use]
    pub fn full_name(&self) -> String {
        match self.declaring_type() {
            Some(owner) => format!("{}::{}", owner.full_name(), self.name),
            None => self.name.clone(),
        }
    }
}

impl std::fmt::Debug for MethodDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodDef")
            .field("name", &self.full_name())
            .field("flags", &self.flags)
            .field("has_body", &self.has_body())
            .finish()
    }
}
