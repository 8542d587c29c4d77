//! Field definitions.

use std::sync::{Arc, RwLock, Weak};

use bitflags::bitflags;

use crate::metadata::{
    signatures::TypeSig,
    typedef::{TypeDef, TypeDefRc},
};

/// A reference to a [`FieldDef`]
pub type FieldDefRc = Arc<FieldDef>;

bitflags! {
    /// `FieldAttributes` (ECMA-335 §II.23.1.5).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FieldAttributes: u16 {
        /// Mask for the access bits.
        const FIELD_ACCESS_MASK = 0x0007;
        /// Accessible only by the parent type.
        const PRIVATE = 0x0001;
        /// Accessible by sub-types only in this assembly.
        const FAM_AND_ASSEM = 0x0002;
        /// Accessible by anyone in the assembly.
        const ASSEMBLY = 0x0003;
        /// Accessible only by type and sub-types.
        const FAMILY = 0x0004;
        /// Accessible by sub-types anywhere, plus anyone in the assembly.
        const FAM_OR_ASSEM = 0x0005;
        /// Accessible by anyone.
        const PUBLIC = 0x0006;
        /// Defined on the type, not per instance.
        const STATIC = 0x0010;
        /// Only assignable in a constructor.
        const INIT_ONLY = 0x0020;
        /// Compile-time constant.
        const LITERAL = 0x0040;
        /// Not serialized when the type is remoted.
        const NOT_SERIALIZED = 0x0080;
        /// Name is special.
        const SPECIAL_NAME = 0x0200;
        /// Implementation is forwarded through P/Invoke.
        const PINVOKE_IMPL = 0x2000;
        /// Name is special to the runtime.
        const RT_SPECIAL_NAME = 0x0400;
        /// Has marshalling information.
        const HAS_FIELD_MARSHAL = 0x1000;
        /// Has a default value.
        const HAS_DEFAULT = 0x8000;
        /// Has an RVA.
        const HAS_FIELD_RVA = 0x0100;
    }
}

/// A field definition.
pub struct FieldDef {
    /// Field name.
    pub name: String,
    /// Field flags.
    pub flags: FieldAttributes,
    signature: RwLock<Option<TypeSig>>,
    declaring_type: RwLock<Weak<TypeDef>>,
}

impl FieldDef {
    /// Creates a field without a signature.
    pub fn new(name: impl Into<String>, flags: FieldAttributes) -> Self {
        FieldDef {
            name: name.into(),
            flags,
            signature: RwLock::new(None),
            declaring_type: RwLock::new(Weak::new()),
        }
    }

    /// Builder helper: sets the field type.
    #[must_use]
    pub fn with_signature(self, signature: TypeSig) -> Self {
        self.set_signature(signature);
        self
    }

    /// Wraps the field into a shared handle.
    #[must_use]
    pub fn into_rc(self) -> FieldDefRc {
        Arc::new(self)
    }

    /// The field type, `None` for shells.
    #[must_use]
    pub fn signature(&self) -> Option<TypeSig> {
        read_lock!(self.signature).clone()
    }

    /// Replaces the field type.
    pub fn set_signature(&self, signature: TypeSig) {
        *write_lock!(self.signature) = Some(signature);
    }

    /// The type declaring this field.
    #[must_use]
    pub fn declaring_type(&self) -> Option<TypeDefRc> {
        read_lock!(self.declaring_type).upgrade()
    }

    pub(crate) fn set_declaring_type(&self, owner: &TypeDefRc) {
        *write_lock!(self.declaring_type) = Arc::downgrade(owner);
    }
}

impl std::fmt::Debug for FieldDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldDef")
            .field("name", &self.name)
            .field("flags", &self.flags)
            .finish()
    }
}
