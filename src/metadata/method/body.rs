//! Method bodies: instructions, locals and exception handler regions.

use rustc_hash::FxHashMap;

use crate::{
    metadata::{
        method::{
            exceptions::{ExceptionHandler, ExceptionHandlerFlags},
            instruction::{Immediate, Instruction, InstructionId, Operand},
            opcodes::*,
        },
        signatures::TypeSig,
    },
    Result,
};

/// A local variable slot.
#[derive(Debug, Clone)]
pub struct Local {
    /// Variable type.
    pub ty: TypeSig,
    /// Debug name, if known.
    pub name: Option<String>,
}

impl Local {
    /// An unnamed local of type `ty`.
    #[must_use]
    pub fn new(ty: TypeSig) -> Self {
        Local { ty, name: None }
    }
}

/// The body of a method.
#[derive(Debug, Default)]
pub struct MethodBody {
    /// Zero-initialize locals on entry.
    pub init_locals: bool,
    /// Declared maximum evaluation stack depth.
    pub max_stack: u16,
    /// Instructions in execution layout order.
    pub instructions: Vec<Instruction>,
    /// Local variable slots.
    pub locals: Vec<Local>,
    /// Exception handler clauses, innermost first.
    pub exception_handlers: Vec<ExceptionHandler>,
}

impl MethodBody {
    /// Creates an empty body.
    #[must_use]
    pub fn new(init_locals: bool) -> Self {
        MethodBody {
            init_locals,
            max_stack: 8,
            ..Default::default()
        }
    }

    /// Appends an instruction and returns its identity.
    pub fn push(&mut self, instruction: Instruction) -> InstructionId {
        let id = instruction.id();
        self.instructions.push(instruction);
        id
    }

    /// Position of the instruction with identity `id`.
    #[must_use]
    pub fn index_of(&self, id: InstructionId) -> Option<usize> {
        self.instructions.iter().position(|i| i.id() == id)
    }

    /// The instruction with identity `id`.
    #[must_use]
    pub fn instruction(&self, id: InstructionId) -> Option<&Instruction> {
        self.instructions.iter().find(|i| i.id() == id)
    }

    /// Checks that the body is closed over itself.
    ///
    /// Every branch and switch target and every handler boundary must name an instruction
    /// of this body, handler regions must be non-empty and ordered, and every local slot
    /// operand must name a declared local.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] describing the first violation found.
    pub fn verify(&self) -> Result<()> {
        let positions: FxHashMap<InstructionId, usize> = self
            .instructions
            .iter()
            .enumerate()
            .map(|(index, instruction)| (instruction.id(), index))
            .collect();

        let position = |id: InstructionId| {
            positions
                .get(&id)
                .copied()
                .ok_or_else(|| malformed_error!("Instruction {} is not part of the body", id))
        };

        for (index, instruction) in self.instructions.iter().enumerate() {
            for target in instruction.targets() {
                position(target).map_err(|_| {
                    malformed_error!(
                        "{} at {} branches to {} outside of the body",
                        instruction.mnemonic(),
                        index,
                        target
                    )
                })?;
            }

            if let Operand::Local(slot) = instruction.operand {
                if usize::from(slot) >= self.locals.len() {
                    return Err(malformed_error!(
                        "Local {} at {} exceeds {} declared locals",
                        slot,
                        index,
                        self.locals.len()
                    ));
                }
            }
        }

        for handler in &self.exception_handlers {
            let try_start = position(handler.try_start)?;
            let try_end = position(handler.try_end)?;
            let handler_start = position(handler.handler_start)?;
            let handler_end = position(handler.handler_end)?;

            if try_start >= try_end || handler_start >= handler_end {
                return Err(malformed_error!(
                    "Empty or inverted handler region: try {}..{}, handler {}..{}",
                    try_start,
                    try_end,
                    handler_start,
                    handler_end
                ));
            }

            match handler.filter_start {
                Some(filter) => {
                    if position(filter)? >= handler_start {
                        return Err(malformed_error!(
                            "Filter at {} does not precede its handler at {}",
                            position(filter)?,
                            handler_start
                        ));
                    }
                }
                None if handler.flags.contains(ExceptionHandlerFlags::FILTER) => {
                    return Err(malformed_error!("Filter clause without a filter start"));
                }
                None => {}
            }
        }

        Ok(())
    }

    /// Rewrites shorthand encodings into their explicit forms.
    ///
    /// `ldarg.N`, `ldloc.N`, `stloc.N` and the `.s` argument/local forms become their
    /// two-byte `ldarg`/`ldarga`/`starg`/`ldloc`/`ldloca`/`stloc` counterparts,
    /// `ldc.i4.N` and `ldc.i4.s` become `ldc.i4`, and short branches become long ones.
    /// `argument_count` counts an implicit `this`; argument and local slots are checked
    /// against it and against the declared locals.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if a slot is out of range or a shorthand carries
    /// an operand of the wrong kind.
    pub fn simplify_macros(&mut self, argument_count: usize) -> Result<()> {
        let local_count = self.locals.len();

        for instruction in &mut self.instructions {
            if instruction.prefix == 0 {
                if let Some((prefix, opcode, operand)) = expand(instruction)? {
                    instruction.prefix = prefix;
                    instruction.opcode = opcode;
                    instruction.operand = operand;
                }
            }

            match instruction.operand {
                Operand::Argument(slot) if usize::from(slot) >= argument_count => {
                    return Err(malformed_error!(
                        "Argument {} exceeds the {} parameters of the method",
                        slot,
                        argument_count
                    ));
                }
                Operand::Local(slot) if usize::from(slot) >= local_count => {
                    return Err(malformed_error!(
                        "Local {} exceeds {} declared locals",
                        slot,
                        local_count
                    ));
                }
                _ => {}
            }
        }

        Ok(())
    }
}

fn expand(instruction: &Instruction) -> Result<Option<(u8, u8, Operand)>> {
    let opcode = instruction.opcode;
    let expanded = match opcode {
        LDARG_0..=LDARG_3 => (
            FE_PREFIX,
            FE_LDARG,
            Operand::Argument(u16::from(opcode - LDARG_0)),
        ),
        LDLOC_0..=LDLOC_3 => (
            FE_PREFIX,
            FE_LDLOC,
            Operand::Local(u16::from(opcode - LDLOC_0)),
        ),
        STLOC_0..=STLOC_3 => (
            FE_PREFIX,
            FE_STLOC,
            Operand::Local(u16::from(opcode - STLOC_0)),
        ),
        LDARG_S => (FE_PREFIX, FE_LDARG, argument_slot(instruction)?),
        LDARGA_S => (FE_PREFIX, FE_LDARGA, argument_slot(instruction)?),
        STARG_S => (FE_PREFIX, FE_STARG, argument_slot(instruction)?),
        LDLOC_S => (FE_PREFIX, FE_LDLOC, local_slot(instruction)?),
        LDLOCA_S => (FE_PREFIX, FE_LDLOCA, local_slot(instruction)?),
        STLOC_S => (FE_PREFIX, FE_STLOC, local_slot(instruction)?),
        LDC_I4_M1..=LDC_I4_8 => (
            0,
            LDC_I4,
            Operand::Immediate(Immediate::Int32(i32::from(opcode) - i32::from(LDC_I4_0))),
        ),
        LDC_I4_S => {
            let value = match instruction.operand {
                Operand::Immediate(Immediate::Int8(v)) => i32::from(v),
                Operand::Immediate(Immediate::UInt8(v)) => i32::from(v as i8),
                _ => {
                    return Err(malformed_error!(
                        "ldc.i4.s expects an 8-bit immediate, got {:?}",
                        instruction.operand
                    ))
                }
            };
            (0, LDC_I4, Operand::Immediate(Immediate::Int32(value)))
        }
        BR_S..=BLT_UN_S => (0, opcode + SHORT_BRANCH_DELTA, instruction.operand.clone()),
        LEAVE_S => (0, LEAVE, instruction.operand.clone()),
        _ => return Ok(None),
    };

    Ok(Some(expanded))
}

fn argument_slot(instruction: &Instruction) -> Result<Operand> {
    slot(instruction).map(Operand::Argument)
}

fn local_slot(instruction: &Instruction) -> Result<Operand> {
    slot(instruction).map(Operand::Local)
}

fn slot(instruction: &Instruction) -> Result<u16> {
    match instruction.operand {
        Operand::Argument(slot) | Operand::Local(slot) => Ok(slot),
        Operand::Immediate(Immediate::UInt8(slot)) => Ok(u16::from(slot)),
        Operand::Immediate(Immediate::UInt16(slot)) => Ok(slot),
        _ => Err(malformed_error!(
            "{} expects a slot operand, got {:?}",
            instruction.mnemonic(),
            instruction.operand
        )),
    }
}
