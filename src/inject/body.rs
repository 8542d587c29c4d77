//! Cloning method bodies.
//!
//! Instructions are cloned in two passes. The first pass imports every metadata operand
//! and records which new instruction stands for which old one; the second pass rewrites
//! branch and switch targets through that record. Exception handlers are relinked last,
//! and the finished body is normalized to explicit encodings for its new signature.

use rustc_hash::FxHashMap;

use crate::{
    inject::{importer::Importer, mapper::ImportMapper},
    metadata::method::{ExceptionHandler, Instruction, InstructionId, Local, MethodBody, Operand},
    Error, Result,
};

/// Clones `source` into a body of the destination.
///
/// `argument_count` is the number of argument slots of the cloned method's signature,
/// counting an implicit `this`.
///
/// # Errors
/// Returns [`Error::MissingMapping`] if a branch target or handler boundary is not an
/// instruction of `source`, and propagates import and normalization failures.
pub fn clone_body<M: ImportMapper>(
    importer: &mut Importer<'_, M>,
    source: &MethodBody,
    argument_count: usize,
) -> Result<MethodBody> {
    let mut body = MethodBody::new(source.init_locals);
    body.max_stack = source.max_stack;

    for local in &source.locals {
        body.locals.push(Local {
            ty: importer.import_sig(&local.ty)?,
            name: local.name.clone(),
        });
    }

    let mut ids: FxHashMap<InstructionId, InstructionId> = FxHashMap::default();
    for instruction in &source.instructions {
        let operand = match &instruction.operand {
            Operand::Type(ty) => Operand::Type(importer.import_type(ty)?),
            Operand::Method(method) => Operand::Method(importer.import_method(method)?),
            Operand::Field(field) => Operand::Field(importer.import_field(field)?),
            Operand::Signature(sig) => Operand::Signature(importer.import_method_sig(sig)?),
            other => other.clone(),
        };

        let mut clone = Instruction::with_prefix(instruction.prefix, instruction.opcode, operand);
        clone.sequence_point = instruction.sequence_point.clone();
        ids.insert(instruction.id(), clone.id());
        body.push(clone);
    }

    let relink = |id: InstructionId| {
        ids.get(&id)
            .copied()
            .ok_or_else(|| Error::MissingMapping(format!("instruction {}", id)))
    };

    for instruction in &mut body.instructions {
        match &mut instruction.operand {
            Operand::Target(target) => *target = relink(*target)?,
            Operand::Switch(targets) => {
                for target in targets.iter_mut() {
                    *target = relink(*target)?;
                }
            }
            _ => {}
        }
    }

    for handler in &source.exception_handlers {
        let catch_type = handler
            .catch_type
            .as_ref()
            .map(|ty| importer.import_type(ty))
            .transpose()?;
        body.exception_handlers.push(ExceptionHandler {
            flags: handler.flags,
            catch_type,
            try_start: relink(handler.try_start)?,
            try_end: relink(handler.try_end)?,
            handler_start: relink(handler.handler_start)?,
            handler_end: relink(handler.handler_end)?,
            filter_start: handler.filter_start.map(relink).transpose()?,
        });
    }

    body.simplify_macros(argument_count)?;
    body.verify()?;
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        inject::context::InjectContext,
        metadata::{
            method::{opcodes::*, ExceptionHandlerFlags, Immediate},
            references::TypeDefOrRef,
            signatures::{ElementType, TypeSig},
        },
        test::{assembly, empty_resolver, module_of, type_ref},
    };

    fn importer_fixture() -> InjectContext {
        InjectContext::new(empty_resolver(), None, module_of(&assembly("App", &[])))
    }

    #[test]
    fn test_branches_point_into_the_clone() {
        let mut source = MethodBody::new(true);
        source.locals.push(Local::new(TypeSig::Primitive(ElementType::I4)));
        let ret = Instruction::new(RET, Operand::None);
        let ret_id = ret.id();
        let first = source.push(Instruction::new(LDC_I4_0, Operand::None));
        source.push(Instruction::new(SWITCH, Operand::Switch(vec![ret_id, first])));
        source.push(Instruction::new(BR_S, Operand::Target(ret_id)));
        source.push(ret);

        let mut ctx = importer_fixture();
        let clone = clone_body(&mut ctx.importer(), &source, 0).unwrap();

        let cloned_ret = clone.instructions[3].id();
        assert_ne!(cloned_ret, ret_id);
        assert!(matches!(&clone.instructions[1].operand, Operand::Switch(t) if t == &vec![cloned_ret, clone.instructions[0].id()]));
        assert_eq!(clone.instructions[2].opcode, BR);
        assert!(matches!(clone.instructions[2].operand, Operand::Target(t) if t == cloned_ret));
        assert!(matches!(clone.instructions[0].operand, Operand::Immediate(Immediate::Int32(0))));
        assert!(clone.init_locals);
    }

    #[test]
    fn test_handlers_are_relinked() {
        let mut source = MethodBody::new(false);
        let try_start = source.push(Instruction::new(NOP, Operand::None));
        let handler_start = source.push(Instruction::new(POP, Operand::None));
        let end = source.push(Instruction::new(RET, Operand::None));
        let exception = TypeDefOrRef::TypeRef(type_ref("mscorlib", "System", "Exception"));
        source.exception_handlers.push(ExceptionHandler {
            flags: ExceptionHandlerFlags::EXCEPTION,
            catch_type: Some(exception),
            try_start,
            try_end: handler_start,
            handler_start,
            handler_end: end,
            filter_start: None,
        });

        let mut ctx = importer_fixture();
        let clone = clone_body(&mut ctx.importer(), &source, 0).unwrap();
        let handler = &clone.exception_handlers[0];

        assert_eq!(handler.try_start, clone.instructions[0].id());
        assert_eq!(handler.handler_start, clone.instructions[1].id());
        assert_eq!(handler.handler_end, clone.instructions[2].id());
        assert_eq!(handler.catch_type.as_ref().unwrap().full_name(), "System.Exception");
    }

    #[test]
    fn test_foreign_branch_target_is_missing_mapping() {
        let stray = Instruction::new(RET, Operand::None);
        let mut source = MethodBody::new(false);
        source.push(Instruction::new(BR, Operand::Target(stray.id())));

        let mut ctx = importer_fixture();
        let err = clone_body(&mut ctx.importer(), &source, 0).unwrap_err();
        assert!(matches!(err, Error::MissingMapping(_)));
    }
}
