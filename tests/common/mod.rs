//! Fixtures shared by the integration tests.
//!
//! Builds two small runtime worlds in memory: a .NET Framework style one where everything
//! lives in `mscorlib`, and a .NET Core style one split over `System.Runtime`,
//! `System.Runtime.Extensions` and a `netstandard` facade.

#![allow(dead_code)]

use std::sync::Arc;

use dotgraft::{
    metadata::method::opcodes::*,
    prelude::*,
};

pub const MSCORLIB: &str = "mscorlib, Version=4.0.0.0, Culture=neutral, PublicKeyToken=b77a5c561934e089";
pub const SYSTEM_RUNTIME: &str = "System.Runtime, Version=4.2.2.0, Culture=neutral, PublicKeyToken=b03f5f7f11d50a3a";
pub const SYSTEM_RUNTIME_EXTENSIONS: &str =
    "System.Runtime.Extensions, Version=4.2.2.0, Culture=neutral, PublicKeyToken=b03f5f7f11d50a3a";
pub const NETSTANDARD: &str = "netstandard, Version=2.0.0.0, Culture=neutral, PublicKeyToken=cc7b13ffcd2ddd51";

pub fn identity(display_name: &str) -> AssemblyIdentity {
    AssemblyIdentity::parse(display_name).unwrap()
}

/// An assembly with one module defining `types`.
pub fn assembly(display_name: &str, types: &[(&str, &str)]) -> AssemblyRc {
    let identity = identity(display_name);
    let module = Module::new(format!("{}.dll", identity.name)).into_rc();
    for (namespace, name) in types {
        module.add_type(TypeDef::new(*namespace, *name, TypeAttributes::PUBLIC).into_rc());
    }

    let assembly = Assembly::new(identity, AssemblyFlags::empty());
    assembly.add_module(module);
    assembly
}

/// A facade whose manifest forwards each type to the named implementation assembly.
pub fn facade(display_name: &str, forwards: &[(&str, &str, &str)]) -> AssemblyRc {
    let facade = assembly(display_name, &[]);
    facade.set_flags(AssemblyFlags::PA_NO_PLATFORM | AssemblyFlags::PA_SPECIFIED);
    let manifest = manifest(&facade);

    for (namespace, name, implementation) in forwards {
        let implementation = identity(implementation);
        let reference = manifest
            .get_assembly_ref(&implementation.name)
            .unwrap_or_else(|| {
                let reference = AssemblyRef::new(implementation);
                manifest
                    .references()
                    .insert(dotgraft::metadata::reftable::ReferenceRow::Assembly(reference.clone()));
                reference
            });
        manifest.add_exported_type(ExportedType::new(
            *namespace,
            *name,
            ExportedImplementation::Assembly(reference),
        ));
    }

    facade
}

/// A fresh assembly built against the base library `corlib`.
pub fn program(display_name: &str, corlib: &str) -> AssemblyRc {
    let program = assembly(display_name, &[]);
    manifest(&program).set_corlib_ref(AssemblyRef::new(identity(corlib)));
    program
}

pub fn manifest(assembly: &AssemblyRc) -> ModuleRc {
    assembly.manifest_module().unwrap()
}

/// Registers a .NET Framework base library.
pub fn register_framework(catalog: &AssemblyCatalog) {
    catalog.add_global("mscorlib", || {
        assembly(
            MSCORLIB,
            &[
                ("System", "Object"),
                ("System", "Exception"),
                ("System", "Environment"),
                ("System", "Int32"),
            ],
        )
    });
}

/// Registers a .NET Core style runtime. `netstandard` forwards the base types to
/// `System.Runtime` and `Environment`, which the base library lacks, to
/// `System.Runtime.Extensions`.
pub fn register_core(catalog: &AssemblyCatalog) {
    catalog.add_global("System.Runtime", || {
        assembly(
            SYSTEM_RUNTIME,
            &[("System", "Object"), ("System", "Exception"), ("System", "Int32")],
        )
    });
    catalog.add_global("System.Runtime.Extensions", || {
        assembly(SYSTEM_RUNTIME_EXTENSIONS, &[("System", "Environment")])
    });
    catalog.add_global("netstandard", || {
        facade(
            NETSTANDARD,
            &[
                ("System", "Object", SYSTEM_RUNTIME),
                ("System", "Exception", SYSTEM_RUNTIME),
                ("System", "Int32", SYSTEM_RUNTIME),
                ("System", "Environment", SYSTEM_RUNTIME_EXTENSIONS),
            ],
        )
    });
}

pub fn injector(catalog: AssemblyCatalog) -> Injector {
    Injector::new(Arc::new(AssemblyResolver::new(Arc::new(catalog))))
}

pub fn corlib_type(module: &ModuleRc, namespace: &str, name: &str) -> TypeDefOrRef {
    let corlib = module.corlib_ref().unwrap();
    TypeDefOrRef::TypeRef(TypeRef::new(namespace, name, ResolutionScope::Assembly(corlib)))
}

/// The source side of most tests.
pub struct Helper {
    pub assembly: AssemblyRc,
    pub origin: ModuleRc,
    pub helper: TypeDefRc,
    pub node: TypeDefRc,
    pub compute: MethodDefRc,
    pub twice: MethodDefRc,
    pub counter: FieldDefRc,
}

/// Builds `Helpers.Helper` in a module compiled against `mscorlib`:
///
/// ```text
/// class Helper : object {
///     class Node { int value; Node next; }
///     static int counter;
///     static int Compute(int seed) {
///         int result; Node scratch;
///         try { result = seed + Environment.TickCount; }
///         catch (Exception) { result = -1; }
///         return Twice(result + counter);
///     }
///     static int Twice(int value) => value * 2;
/// }
/// ```
pub fn helper() -> Helper {
    let assembly = program("Helpers, Version=1.0.0.0", MSCORLIB);
    let origin = manifest(&assembly);
    let int32 = || TypeSig::Primitive(ElementType::I4);

    let helper = TypeDef::new("Helpers", "Helper", TypeAttributes::PUBLIC)
        .with_base(corlib_type(&origin, "System", "Object"))
        .into_rc();
    let node = TypeDef::new("", "Node", TypeAttributes::NESTED_PRIVATE).into_rc();
    node.add_field(FieldDef::new("value", FieldAttributes::PUBLIC).with_signature(int32()).into_rc());
    node.add_field(
        FieldDef::new("next", FieldAttributes::PUBLIC)
            .with_signature(TypeSig::Class(TypeDefOrRef::TypeDef(node.clone())))
            .into_rc(),
    );
    helper.add_nested_type(node.clone());

    let counter = FieldDef::new("counter", FieldAttributes::PRIVATE | FieldAttributes::STATIC)
        .with_signature(int32())
        .into_rc();
    helper.add_field(counter.clone());

    let mut twice_body = MethodBody::new(false);
    twice_body.push(Instruction::new(LDARG_0, Operand::None));
    twice_body.push(Instruction::new(LDC_I4_2, Operand::None));
    twice_body.push(Instruction::new(MUL, Operand::None));
    twice_body.push(Instruction::new(RET, Operand::None));
    let twice = MethodDef::new(
        "Twice",
        MethodAttributes::PRIVATE | MethodAttributes::STATIC,
        MethodImplAttributes::empty(),
    )
    .with_signature(MethodSig::new_static(int32(), vec![int32()]))
    .with_body(twice_body)
    .into_rc();

    let tick_count = MemberRef::new(
        "get_TickCount",
        MemberRefParent::Type(corlib_type(&origin, "System", "Environment")),
        MemberSignature::Method(MethodSig::new_static(int32(), vec![])),
    );

    let mut body = MethodBody::new(true);
    body.locals.push(Local::new(int32()));
    body.locals.push(Local::new(TypeSig::Class(TypeDefOrRef::TypeDef(node.clone()))));

    let end = Instruction::new(LDLOC_0, Operand::None);
    let try_start = body.push(Instruction::new(LDARG_0, Operand::None));
    body.push(Instruction::new(CALL, Operand::Method(MethodTarget::Ref(tick_count))));
    body.push(Instruction::new(ADD, Operand::None));
    body.push(Instruction::new(STLOC_0, Operand::None));
    body.push(Instruction::new(LEAVE_S, Operand::Target(end.id())));
    let handler_start = body.push(Instruction::new(POP, Operand::None));
    body.push(Instruction::new(LDC_I4_M1, Operand::None));
    body.push(Instruction::new(STLOC_0, Operand::None));
    body.push(Instruction::new(LEAVE_S, Operand::Target(end.id())));
    let handler_end = body.push(end);
    body.push(Instruction::new(LDSFLD, Operand::Field(FieldTarget::Def(counter.clone()))));
    body.push(Instruction::new(ADD, Operand::None));
    body.push(Instruction::new(CALL, Operand::Method(MethodTarget::Def(twice.clone()))));
    body.push(Instruction::new(RET, Operand::None));
    body.exception_handlers.push(ExceptionHandler {
        flags: ExceptionHandlerFlags::EXCEPTION,
        catch_type: Some(corlib_type(&origin, "System", "Exception")),
        try_start,
        try_end: handler_start,
        handler_start,
        handler_end,
        filter_start: None,
    });

    let compute = MethodDef::new(
        "Compute",
        MethodAttributes::PUBLIC | MethodAttributes::STATIC,
        MethodImplAttributes::empty(),
    )
    .with_signature(MethodSig::new_static(int32(), vec![int32()]))
    .with_body(body)
    .into_rc();

    helper.add_method(compute.clone());
    helper.add_method(twice.clone());
    origin.add_type(helper.clone());

    Helper {
        assembly,
        origin,
        helper,
        node,
        compute,
        twice,
        counter,
    }
}
