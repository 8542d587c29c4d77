//! Type definitions.
//!
//! A [`TypeDef`] owns its nested types, methods and fields. Children point back at their
//! owner through [`Weak`] handles that are set when they are attached, so a type graph can
//! be built bottom-up or top-down and detached shells can be wired together before any of
//! them belongs to a module.

use std::sync::{Arc, RwLock, Weak};

use bitflags::bitflags;

use crate::metadata::{
    field::FieldDefRc,
    method::MethodDefRc,
    module::{Module, ModuleRc},
    references::{qualified, TypeDefOrRef},
};

/// A reference to a [`TypeDef`]
pub type TypeDefRc = Arc<TypeDef>;

bitflags! {
    /// `TypeAttributes` (ECMA-335 §II.23.1.15).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TypeAttributes: u32 {
        /// Mask for the visibility bits.
        const VISIBILITY_MASK = 0x0000_0007;
        /// Top-level public type.
        const PUBLIC = 0x0000_0001;
        /// Nested, public.
        const NESTED_PUBLIC = 0x0000_0002;
        /// Nested, private.
        const NESTED_PRIVATE = 0x0000_0003;
        /// Nested, family.
        const NESTED_FAMILY = 0x0000_0004;
        /// Nested, assembly.
        const NESTED_ASSEMBLY = 0x0000_0005;
        /// Nested, family and assembly.
        const NESTED_FAM_AND_ASSEM = 0x0000_0006;
        /// Nested, family or assembly.
        const NESTED_FAM_OR_ASSEM = 0x0000_0007;
        /// Fields are laid out sequentially.
        const SEQUENTIAL_LAYOUT = 0x0000_0008;
        /// Fields are laid out at explicit offsets.
        const EXPLICIT_LAYOUT = 0x0000_0010;
        /// Interface type.
        const INTERFACE = 0x0000_0020;
        /// Cannot be instantiated.
        const ABSTRACT = 0x0000_0080;
        /// Cannot be derived from.
        const SEALED = 0x0000_0100;
        /// Name is special.
        const SPECIAL_NAME = 0x0000_0400;
        /// Imported from COM.
        const IMPORT = 0x0000_1000;
        /// Serializable.
        const SERIALIZABLE = 0x0000_2000;
        /// Strings are marshalled as UTF-16.
        const UNICODE_CLASS = 0x0001_0000;
        /// Type initializer may run lazily.
        const BEFORE_FIELD_INIT = 0x0010_0000;
        /// Name is special to the runtime.
        const RT_SPECIAL_NAME = 0x0000_0800;
        /// Has security metadata.
        const HAS_SECURITY = 0x0004_0000;
    }
}

bitflags! {
    /// `GenericParamAttributes` (ECMA-335 §II.23.1.7).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct GenericParamAttributes: u16 {
        /// Covariant (`out T`).
        const COVARIANT = 0x0001;
        /// Contravariant (`in T`).
        const CONTRAVARIANT = 0x0002;
        /// Must be a reference type.
        const REFERENCE_TYPE_CONSTRAINT = 0x0004;
        /// Must be a non-nullable value type.
        const NOT_NULLABLE_VALUE_TYPE_CONSTRAINT = 0x0008;
        /// Must have a public parameterless constructor.
        const DEFAULT_CONSTRUCTOR_CONSTRAINT = 0x0010;
    }
}

/// A generic parameter of a type or method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenericParam {
    /// 0-based position.
    pub number: u16,
    /// Variance and constraint flags.
    pub flags: GenericParamAttributes,
    /// Parameter name.
    pub name: String,
}

impl GenericParam {
    /// Creates a generic parameter.
    pub fn new(number: u16, flags: GenericParamAttributes, name: impl Into<String>) -> Self {
        GenericParam {
            number,
            flags,
            name: name.into(),
        }
    }
}

/// Explicit memory layout of a type (`ClassLayout` table).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassLayout {
    /// Field alignment.
    pub packing_size: u16,
    /// Total instance size.
    pub class_size: u32,
}

/// A type definition.
pub struct TypeDef {
    /// Namespace, empty for nested types.
    pub namespace: String,
    /// Simple name.
    pub name: String,
    /// Type flags.
    pub flags: TypeAttributes,
    /// Explicit layout, if any.
    pub layout: Option<ClassLayout>,
    /// Generic type parameters.
    pub generic_params: Vec<GenericParam>,
    base: RwLock<Option<TypeDefOrRef>>,
    interfaces: RwLock<Vec<TypeDefOrRef>>,
    nested_types: RwLock<Vec<TypeDefRc>>,
    methods: RwLock<Vec<MethodDefRc>>,
    fields: RwLock<Vec<FieldDefRc>>,
    declaring_type: RwLock<Weak<TypeDef>>,
    module: RwLock<Weak<Module>>,
}

impl TypeDef {
    /// Creates an empty type.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>, flags: TypeAttributes) -> Self {
        TypeDef {
            namespace: namespace.into(),
            name: name.into(),
            flags,
            layout: None,
            generic_params: Vec::new(),
            base: RwLock::new(None),
            interfaces: RwLock::new(Vec::new()),
            nested_types: RwLock::new(Vec::new()),
            methods: RwLock::new(Vec::new()),
            fields: RwLock::new(Vec::new()),
            declaring_type: RwLock::new(Weak::new()),
            module: RwLock::new(Weak::new()),
        }
    }

    /// Builder helper: sets an explicit layout.
    #[must_use]
    pub fn with_layout(mut self, layout: ClassLayout) -> Self {
        self.layout = Some(layout);
        self
    }

    /// Builder helper: appends a generic parameter.
    #[must_use]
    pub fn with_generic_param(mut self, param: GenericParam) -> Self {
        self.generic_params.push(param);
        self
    }

    /// Builder helper: sets the base type.
    #[must_use]
    pub fn with_base(self, base: TypeDefOrRef) -> Self {
        self.set_base(Some(base));
        self
    }

    /// Wraps the type into a shared handle.
    #[must_use]
    pub fn into_rc(self) -> TypeDefRc {
        Arc::new(self)
    }

    /// `Namespace.Outer/Inner` style full name.
    #[must_use]
    pub fn full_name(&self) -> String {
        match self.declaring_type() {
            Some(outer) => format!("{}/{}", outer.full_name(), self.name),
            None => qualified(&self.namespace, &self.name),
        }
    }

    /// The base type.
    #[must_use]
    pub fn base(&self) -> Option<TypeDefOrRef> {
        read_lock!(self.base).clone()
    }

    /// Replaces the base type.
    pub fn set_base(&self, base: Option<TypeDefOrRef>) {
        *write_lock!(self.base) = base;
    }

    /// Implemented interfaces.
    #[must_use]
    pub fn interfaces(&self) -> Vec<TypeDefOrRef> {
        read_lock!(self.interfaces).clone()
    }

    /// Replaces the implemented interfaces.
    pub fn set_interfaces(&self, interfaces: Vec<TypeDefOrRef>) {
        *write_lock!(self.interfaces) = interfaces;
    }

    /// Adds an implemented interface.
    pub fn add_interface(&self, interface: TypeDefOrRef) {
        write_lock!(self.interfaces).push(interface);
    }

    /// Nested types.
    #[must_use]
    pub fn nested_types(&self) -> Vec<TypeDefRc> {
        read_lock!(self.nested_types).clone()
    }

    /// Methods.
    #[must_use]
    pub fn methods(&self) -> Vec<MethodDefRc> {
        read_lock!(self.methods).clone()
    }

    /// Fields.
    #[must_use]
    pub fn fields(&self) -> Vec<FieldDefRc> {
        read_lock!(self.fields).clone()
    }

    /// Returns true if this type is nested in another.
    #[must_use]
    pub fn is_nested(&self) -> bool {
        self.declaring_type().is_some()
    }

    /// The enclosing type of a nested type.
    #[must_use]
    pub fn declaring_type(&self) -> Option<TypeDefRc> {
        read_lock!(self.declaring_type).upgrade()
    }

    /// The owning module, found through the outermost enclosing type.
    #[must_use]
    pub fn module(&self) -> Option<ModuleRc> {
        match self.declaring_type() {
            Some(outer) => outer.module(),
            None => read_lock!(self.module).upgrade(),
        }
    }

    pub(crate) fn set_module(&self, module: Weak<Module>) {
        *write_lock!(self.module) = module;
    }

    /// Nests `nested` inside this type and points its back reference here.
    pub fn add_nested_type(self: &Arc<Self>, nested: TypeDefRc) {
        *write_lock!(nested.declaring_type) = Arc::downgrade(self);
        write_lock!(self.nested_types).push(nested);
    }

    /// Adds a method and points its back reference here.
    pub fn add_method(self: &Arc<Self>, method: MethodDefRc) {
        method.set_declaring_type(self);
        write_lock!(self.methods).push(method);
    }

    /// Adds a field and points its back reference here.
    pub fn add_field(self: &Arc<Self>, field: FieldDefRc) {
        field.set_declaring_type(self);
        write_lock!(self.fields).push(field);
    }

    /// The nested type called `name`.
    #[must_use]
    pub fn find_nested_type(&self, name: &str) -> Option<TypeDefRc> {
        read_lock!(self.nested_types)
            .iter()
            .find(|nested| nested.name == name)
            .cloned()
    }

    /// The method called `name`.
    #[must_use]
    pub fn find_method(&self, name: &str) -> Option<MethodDefRc> {
        read_lock!(self.methods)
            .iter()
            .find(|method| method.name == name)
            .cloned()
    }

    /// The field called `name`.
    #[must_use]
    pub fn find_field(&self, name: &str) -> Option<FieldDefRc> {
        read_lock!(self.fields)
            .iter()
            .find(|field| field.name == name)
            .cloned()
    }
}

impl std::fmt::Debug for TypeDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeDef")
            .field("name", &self.full_name())
            .field("flags", &self.flags)
            .field("nested_types", &read_lock!(self.nested_types).len())
            .field("methods", &read_lock!(self.methods).len())
            .field("fields", &read_lock!(self.fields).len())
            .finish()
    }
}
