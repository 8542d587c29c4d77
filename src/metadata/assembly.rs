//! Materialized assemblies.
//!
//! An [`Assembly`] is what the resolver hands out: an identity, a set of flags and the
//! modules that make it up. The first module is the manifest module, which carries the
//! exported-type table of the assembly.

use std::sync::{
    atomic::{AtomicU32, Ordering},
    Arc, RwLock,
};

use bitflags::bitflags;

use crate::metadata::{
    identity::AssemblyIdentity,
    module::ModuleRc,
    references::{AssemblyRef, AssemblyRefRc, ExportedTypeRc, TypeRef},
    typedef::TypeDefRc,
};

/// A reference to an [`Assembly`]
pub type AssemblyRc = Arc<Assembly>;

bitflags! {
    /// `AssemblyFlags` (ECMA-335 §II.23.1.2), including the processor-architecture bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AssemblyFlags: u32 {
        /// The assembly reference holds the full (unhashed) public key
        const PUBLIC_KEY = 0x0001;
        /// Architecture neutral
        const PA_MSIL = 0x0010;
        /// 32-bit x86
        const PA_X86 = 0x0020;
        /// Itanium
        const PA_IA64 = 0x0030;
        /// x64
        const PA_AMD64 = 0x0040;
        /// 32-bit ARM
        const PA_ARM = 0x0050;
        /// 64-bit ARM
        const PA_ARM64 = 0x0060;
        /// Reference assembly, not loadable for execution
        const PA_NO_PLATFORM = 0x0070;
        /// The architecture bits were set explicitly
        const PA_SPECIFIED = 0x0080;
        /// Mask for the architecture value
        const PA_MASK = 0x0070;
        /// Mask for the architecture value plus the specified bit
        const PA_FULL_MASK = 0x00F0;
        /// The implementation used at runtime is not expected to match the compile-time version
        const RETARGETABLE = 0x0100;
        /// Reserved (a conforming implementation of the CLI may ignore this setting on read)
        const DISABLE_JIT_COMPILE_OPTIMIZER = 0x4000;
        /// Reserved (a conforming implementation of the CLI may ignore this setting on read)
        const ENABLE_JIT_COMPILE_TRACKING = 0x8000;
    }
}

/// A loaded assembly.
pub struct Assembly {
    /// Identity the assembly declares for itself.
    pub identity: AssemblyIdentity,
    flags: AtomicU32,
    modules: RwLock<Vec<ModuleRc>>,
}

impl Assembly {
    /// Creates an assembly without modules.
    #[must_use]
    pub fn new(identity: AssemblyIdentity, flags: AssemblyFlags) -> AssemblyRc {
        Arc::new(Assembly {
            identity,
            flags: AtomicU32::new(flags.bits()),
            modules: RwLock::new(Vec::new()),
        })
    }

    /// Simple name of the assembly.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.identity.name
    }

    /// Current assembly flags.
    #[must_use]
    pub fn flags(&self) -> AssemblyFlags {
        AssemblyFlags::from_bits_retain(self.flags.load(Ordering::Acquire))
    }

    /// Replaces the assembly flags.
    pub fn set_flags(&self, flags: AssemblyFlags) {
        self.flags.store(flags.bits(), Ordering::Release);
    }

    /// Clears the architecture bits of a reference assembly marked "no platform".
    ///
    /// Returns true if the flags were changed.
    pub fn normalize_platform(&self) -> bool {
        let flags = self.flags();
        if flags.bits() & AssemblyFlags::PA_MASK.bits() != AssemblyFlags::PA_NO_PLATFORM.bits() {
            return false;
        }

        self.set_flags(flags.difference(AssemblyFlags::PA_FULL_MASK));
        true
    }

    /// Appends a module and points its back reference at this assembly.
    pub fn add_module(self: &Arc<Self>, module: ModuleRc) {
        module.set_assembly(Arc::downgrade(self));
        write_lock!(self.modules).push(module);
    }

    /// All modules, manifest module first.
    #[must_use]
    pub fn modules(&self) -> Vec<ModuleRc> {
        read_lock!(self.modules).clone()
    }

    /// The module carrying the assembly manifest.
    #[must_use]
    pub fn manifest_module(&self) -> Option<ModuleRc> {
        read_lock!(self.modules).first().cloned()
    }

    /// A fresh reference row naming this assembly.
    #[must_use]
    pub fn to_assembly_ref(&self) -> AssemblyRefRc {
        AssemblyRef::new(self.identity.clone())
    }

    /// The definition a reference names, looked up by name only (the scope is ignored).
    #[must_use]
    pub fn find_type(&self, reference: &TypeRef) -> Option<TypeDefRc> {
        read_lock!(self.modules)
            .iter()
            .find_map(|module| module.find_type_by_ref(reference))
    }

    /// Returns true if any module of the assembly defines the referenced type.
    #[must_use]
    pub fn type_exists(&self, reference: &TypeRef) -> bool {
        self.find_type(reference).is_some()
    }

    /// Exported types of all modules.
    #[must_use]
    pub fn exported_types(&self) -> Vec<ExportedTypeRc> {
        read_lock!(self.modules)
            .iter()
            .flat_map(|module| module.exported_types())
            .collect()
    }
}

impl std::fmt::Debug for Assembly {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Assembly")
            .field("identity", &self.identity.display_name())
            .field("flags", &self.flags())
            .field("modules", &read_lock!(self.modules).len())
            .finish()
    }
}
