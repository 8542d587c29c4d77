//! The two phases of cloning a type graph.
//!
//! [`populate`] creates bare shells for a type and everything it contains and registers
//! every original/clone pair in the member map. Only after the whole graph is registered
//! does [`copy`] fill in signatures, base types and bodies, so references between members
//! of the graph (including cycles) always find their clone.

use crate::{
    inject::{body::clone_body, context::InjectContext},
    metadata::{
        field::{FieldDef, FieldDefRc},
        method::{CustomAttribute, ImplMap, MethodDef, MethodDefRc},
        typedef::{GenericParam, TypeDef, TypeDefRc},
    },
    Error, Result,
};

/// Generic parameters keep number and flags; names are not carried over.
fn anonymous_params(params: &[GenericParam]) -> Vec<GenericParam> {
    params
        .iter()
        .map(|param| GenericParam::new(param.number, param.flags, "-"))
        .collect()
}

pub(crate) fn type_shell(source: &TypeDef) -> TypeDefRc {
    let mut shell = TypeDef::new(source.namespace.clone(), source.name.clone(), source.flags);
    shell.layout = source.layout;
    shell.generic_params = anonymous_params(&source.generic_params);
    shell.into_rc()
}

pub(crate) fn method_shell(source: &MethodDef) -> MethodDefRc {
    let mut shell = MethodDef::new(source.name.clone(), source.flags, source.impl_flags);
    shell.generic_params = anonymous_params(&source.generic_params);
    shell.into_rc()
}

pub(crate) fn field_shell(source: &FieldDef) -> FieldDefRc {
    FieldDef::new(source.name.clone(), source.flags).into_rc()
}

/// Registers shells for `source` and its members, returning the clone of `source`.
///
/// A type that is mapped already keeps its clone; only members without a clone get new
/// shells, and only those are attached.
pub(crate) fn populate(ctx: &mut InjectContext, source: &TypeDefRc) -> TypeDefRc {
    let clone = match ctx.map.type_of(source) {
        Some(existing) => existing,
        None => ctx.map.insert_type(source, type_shell(source)),
    };

    for nested in source.nested_types() {
        let fresh = !ctx.map.contains_type(&nested);
        let nested_clone = populate(ctx, &nested);
        if fresh {
            ctx.staged.attach_nested(&clone, nested_clone);
        }
    }

    for method in source.methods() {
        if ctx.map.method_of(&method).is_none() {
            let shell = ctx.map.insert_method(&method, method_shell(&method));
            ctx.staged.attach_method(&clone, shell);
        }
    }

    for field in source.fields() {
        if ctx.map.field_of(&field).is_none() {
            let shell = ctx.map.insert_field(&field, field_shell(&field));
            ctx.staged.attach_field(&clone, shell);
        }
    }

    clone
}

/// Fills in the shells registered by [`populate`] for `source`.
///
/// With `copy_self` unset, `source`'s own base type and interfaces are left alone and only
/// its members are copied.
pub(crate) fn copy(ctx: &mut InjectContext, source: &TypeDefRc, copy_self: bool) -> Result<()> {
    if copy_self {
        copy_type_def(ctx, source)?;
    }

    for nested in source.nested_types() {
        copy(ctx, &nested, true)?;
    }
    for method in source.methods() {
        copy_method_def(ctx, &method)?;
    }
    for field in source.fields() {
        copy_field_def(ctx, &field)?;
    }

    Ok(())
}

fn copy_type_def(ctx: &mut InjectContext, source: &TypeDefRc) -> Result<()> {
    let clone = ctx
        .map
        .type_of(source)
        .ok_or_else(|| Error::MissingMapping(source.full_name()))?;

    let mut importer = ctx.importer();
    let base = source
        .base()
        .map(|base| importer.import_type(&base))
        .transpose()?;
    let interfaces = source
        .interfaces()
        .iter()
        .map(|interface| importer.import_type(interface))
        .collect::<Result<Vec<_>>>()?;

    clone.set_base(base);
    clone.set_interfaces(interfaces);
    Ok(())
}

pub(crate) fn copy_method_def(ctx: &mut InjectContext, source: &MethodDefRc) -> Result<()> {
    let clone = ctx
        .map
        .method_of(source)
        .ok_or_else(|| Error::MissingMapping(source.full_name()))?;
    if !ctx.mark_copied(source) {
        return Ok(());
    }

    let mut importer = ctx.importer();

    let signature = source
        .signature()
        .ok_or_else(|| malformed_error!("Method {} has no signature", source.full_name()))?;
    let signature = importer.import_method_sig(&signature)?;
    let argument_count = signature.argument_count();
    clone.set_signature(signature);

    if let Some(impl_map) = source.impl_map() {
        clone.set_impl_map(ImplMap {
            module: importer.import_module_ref(&impl_map.module.name),
            name: impl_map.name,
            flags: impl_map.flags,
        });
    }

    for attribute in source.custom_attributes() {
        clone.add_custom_attribute(CustomAttribute {
            constructor: importer.import_method(&attribute.constructor)?,
            blob: attribute.blob,
        });
    }

    if let Some(body) = source.body().as_ref() {
        clone.set_body(clone_body(&mut importer, body, argument_count)?);
    }

    Ok(())
}

fn copy_field_def(ctx: &mut InjectContext, source: &FieldDefRc) -> Result<()> {
    let clone = ctx
        .map
        .field_of(source)
        .ok_or_else(|| Error::MissingMapping(source.name.clone()))?;

    if let Some(signature) = source.signature() {
        let signature = ctx.importer().import_sig(&signature)?;
        clone.set_signature(signature);
    }
    Ok(())
}
