//! Benchmarks for type injection.
//!
//! - Cloning a type with many small methods into a module on the same runtime
//! - Cloning the same type across runtimes, which exercises the re-anchoring chain
//! - Resolving through the exact and fuzzy strategies

extern crate dotgraft;

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use dotgraft::{metadata::method::opcodes::*, prelude::*};
use std::{hint::black_box, sync::Arc};

const MSCORLIB: &str = "mscorlib, Version=4.0.0.0, Culture=neutral, PublicKeyToken=b77a5c561934e089";
const SYSTEM_RUNTIME: &str =
    "System.Runtime, Version=4.2.2.0, Culture=neutral, PublicKeyToken=b03f5f7f11d50a3a";

fn assembly(display_name: &str, types: &[(&str, &str)]) -> AssemblyRc {
    let identity = AssemblyIdentity::parse(display_name).unwrap();
    let module = Module::new(format!("{}.dll", identity.name)).into_rc();
    for (namespace, name) in types {
        module.add_type(TypeDef::new(*namespace, *name, TypeAttributes::PUBLIC).into_rc());
    }
    let assembly = Assembly::new(identity, AssemblyFlags::empty());
    assembly.add_module(module);
    assembly
}

fn program(display_name: &str, corlib: &str) -> AssemblyRc {
    let program = assembly(display_name, &[]);
    program
        .manifest_module()
        .unwrap()
        .set_corlib_ref(AssemblyRef::new(AssemblyIdentity::parse(corlib).unwrap()));
    program
}

fn injector(runtime: &str) -> Injector {
    let catalog = AssemblyCatalog::new();
    let name = AssemblyIdentity::parse(runtime).unwrap().name;
    let runtime = runtime.to_string();
    catalog.add_global(name, move || {
        assembly(&runtime, &[("System", "Object"), ("System", "Math")])
    });
    Injector::new(Arc::new(AssemblyResolver::new(Arc::new(catalog))))
}

/// `Bench.Worker` with `methods` static methods, each calling `Math.Abs` and its predecessor.
fn worker(origin: &ModuleRc, methods: usize) -> TypeDefRc {
    let corlib = origin.corlib_ref().unwrap();
    let object = TypeRef::new("System", "Object", ResolutionScope::Assembly(corlib.clone()));
    let math = TypeRef::new("System", "Math", ResolutionScope::Assembly(corlib));
    let int32 = || TypeSig::Primitive(ElementType::I4);

    let worker = TypeDef::new("Bench", "Worker", TypeAttributes::PUBLIC)
        .with_base(TypeDefOrRef::TypeRef(object))
        .into_rc();

    let mut previous: Option<MethodDefRc> = None;
    for index in 0..methods {
        let abs = MemberRef::new(
            "Abs",
            MemberRefParent::Type(TypeDefOrRef::TypeRef(math.clone())),
            MemberSignature::Method(MethodSig::new_static(int32(), vec![int32()])),
        );

        let mut body = MethodBody::new(true);
        body.push(Instruction::new(LDARG_0, Operand::None));
        body.push(Instruction::new(CALL, Operand::Method(MethodTarget::Ref(abs))));
        if let Some(previous) = &previous {
            body.push(Instruction::new(CALL, Operand::Method(MethodTarget::Def(previous.clone()))));
        }
        body.push(Instruction::new(RET, Operand::None));

        let method = MethodDef::new(
            format!("Step{index}"),
            MethodAttributes::PUBLIC | MethodAttributes::STATIC,
            MethodImplAttributes::empty(),
        )
        .with_signature(MethodSig::new_static(int32(), vec![int32()]))
        .with_body(body)
        .into_rc();
        worker.add_method(method.clone());
        previous = Some(method);
    }

    origin.add_type(worker.clone());
    worker
}

fn bench_inject(c: &mut Criterion, name: &str, runtime: &str) {
    let injector = injector(runtime);
    let source = program("Source, Version=1.0.0.0", MSCORLIB);
    let origin = source.manifest_module().unwrap();
    let worker = worker(&origin, 64);

    c.bench_function(name, |b| {
        b.iter_batched(
            || program("Target, Version=1.0.0.0", runtime),
            |target| {
                let module = target.manifest_module().unwrap();
                let clone = injector.inject_type(black_box(&worker), &module).unwrap();
                black_box((clone, target))
            },
            BatchSize::SmallInput,
        );
    });
}

fn bench_inject_same_runtime(c: &mut Criterion) {
    bench_inject(c, "inject_type_same_runtime", MSCORLIB);
}

fn bench_inject_cross_runtime(c: &mut Criterion) {
    bench_inject(c, "inject_type_cross_runtime", SYSTEM_RUNTIME);
}

fn bench_resolve(c: &mut Criterion) {
    let catalog = AssemblyCatalog::new();
    for minor in 0..16 {
        let display_name = format!("Lib, Version=2.{minor}.0.0");
        catalog.add("/deps", "Lib", move || assembly(&display_name, &[]));
    }
    let catalog = Arc::new(catalog);
    let request = AssemblyIdentity::parse("Lib, Version=2.0.0.0").unwrap();
    let fuzzy_request = AssemblyIdentity::parse("Lib, Version=2.20.0.0").unwrap();

    c.bench_function("resolve_exact_uncached", |b| {
        b.iter(|| {
            let resolver = AssemblyResolver::new(catalog.clone()).with_pre_search_path("/deps");
            black_box(resolver.resolve(black_box(&request), None))
        });
    });

    c.bench_function("resolve_fuzzy_uncached", |b| {
        b.iter(|| {
            let resolver = AssemblyResolver::new(catalog.clone()).with_pre_search_path("/deps");
            black_box(resolver.resolve(black_box(&fuzzy_request), None))
        });
    });
}

criterion_group!(
    benches,
    bench_inject_same_runtime,
    bench_inject_cross_runtime,
    bench_resolve
);
criterion_main!(benches);
