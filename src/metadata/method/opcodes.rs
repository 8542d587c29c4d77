//! CIL opcode values (ECMA-335 §III).
//!
//! Single-byte opcodes are stored as-is. Two-byte opcodes are split into the
//! [`FE_PREFIX`] byte and the second byte, which is what the `FE_*` constants hold.

#![allow(missing_docs)]

pub const NOP: u8 = 0x00;
pub const BREAK: u8 = 0x01;

// Argument and local shorthands
pub const LDARG_0: u8 = 0x02;
pub const LDARG_1: u8 = 0x03;
pub const LDARG_2: u8 = 0x04;
pub const LDARG_3: u8 = 0x05;
pub const LDLOC_0: u8 = 0x06;
pub const LDLOC_1: u8 = 0x07;
pub const LDLOC_2: u8 = 0x08;
pub const LDLOC_3: u8 = 0x09;
pub const STLOC_0: u8 = 0x0A;
pub const STLOC_1: u8 = 0x0B;
pub const STLOC_2: u8 = 0x0C;
pub const STLOC_3: u8 = 0x0D;
pub const LDARG_S: u8 = 0x0E;
pub const LDARGA_S: u8 = 0x0F;
pub const STARG_S: u8 = 0x10;
pub const LDLOC_S: u8 = 0x11;
pub const LDLOCA_S: u8 = 0x12;
pub const STLOC_S: u8 = 0x13;

// Constants
pub const LDNULL: u8 = 0x14;
pub const LDC_I4_M1: u8 = 0x15;
pub const LDC_I4_0: u8 = 0x16;
pub const LDC_I4_1: u8 = 0x17;
pub const LDC_I4_2: u8 = 0x18;
pub const LDC_I4_3: u8 = 0x19;
pub const LDC_I4_4: u8 = 0x1A;
pub const LDC_I4_5: u8 = 0x1B;
pub const LDC_I4_6: u8 = 0x1C;
pub const LDC_I4_7: u8 = 0x1D;
pub const LDC_I4_8: u8 = 0x1E;
pub const LDC_I4_S: u8 = 0x1F;
pub const LDC_I4: u8 = 0x20;
pub const LDC_I8: u8 = 0x21;
pub const LDC_R4: u8 = 0x22;
pub const LDC_R8: u8 = 0x23;

pub const DUP: u8 = 0x25;
pub const POP: u8 = 0x26;
pub const JMP: u8 = 0x27;
pub const CALL: u8 = 0x28;
pub const CALLI: u8 = 0x29;
pub const RET: u8 = 0x2A;

// Short branches
pub const BR_S: u8 = 0x2B;
pub const BRFALSE_S: u8 = 0x2C;
pub const BRTRUE_S: u8 = 0x2D;
pub const BEQ_S: u8 = 0x2E;
pub const BGE_S: u8 = 0x2F;
pub const BGT_S: u8 = 0x30;
pub const BLE_S: u8 = 0x31;
pub const BLT_S: u8 = 0x32;
pub const BNE_UN_S: u8 = 0x33;
pub const BGE_UN_S: u8 = 0x34;
pub const BGT_UN_S: u8 = 0x35;
pub const BLE_UN_S: u8 = 0x36;
pub const BLT_UN_S: u8 = 0x37;

// Long branches, each exactly 13 above its short form
pub const BR: u8 = 0x38;
pub const BRFALSE: u8 = 0x39;
pub const BRTRUE: u8 = 0x3A;
pub const BEQ: u8 = 0x3B;
pub const BGE: u8 = 0x3C;
pub const BGT: u8 = 0x3D;
pub const BLE: u8 = 0x3E;
pub const BLT: u8 = 0x3F;
pub const BNE_UN: u8 = 0x40;
pub const BGE_UN: u8 = 0x41;
pub const BGT_UN: u8 = 0x42;
pub const BLE_UN: u8 = 0x43;
pub const BLT_UN: u8 = 0x44;
pub const SWITCH: u8 = 0x45;

pub const ADD: u8 = 0x58;
pub const SUB: u8 = 0x59;
pub const MUL: u8 = 0x5A;

// Object model
pub const CALLVIRT: u8 = 0x6F;
pub const LDOBJ: u8 = 0x71;
pub const LDSTR: u8 = 0x72;
pub const NEWOBJ: u8 = 0x73;
pub const CASTCLASS: u8 = 0x74;
pub const ISINST: u8 = 0x75;
pub const UNBOX: u8 = 0x79;
pub const THROW: u8 = 0x7A;
pub const LDFLD: u8 = 0x7B;
pub const LDFLDA: u8 = 0x7C;
pub const STFLD: u8 = 0x7D;
pub const LDSFLD: u8 = 0x7E;
pub const LDSFLDA: u8 = 0x7F;
pub const STSFLD: u8 = 0x80;
pub const STOBJ: u8 = 0x81;
pub const BOX: u8 = 0x8C;
pub const NEWARR: u8 = 0x8D;
pub const LDLEN: u8 = 0x8E;
pub const LDELEMA: u8 = 0x8F;
pub const LDELEM: u8 = 0xA3;
pub const STELEM: u8 = 0xA4;
pub const UNBOX_ANY: u8 = 0xA5;
pub const LDTOKEN: u8 = 0xD0;

// Exception handling
pub const ENDFINALLY: u8 = 0xDC;
pub const LEAVE: u8 = 0xDD;
pub const LEAVE_S: u8 = 0xDE;

// Two-byte opcodes, second byte after FE_PREFIX
pub const FE_PREFIX: u8 = 0xFE;
pub const FE_ARGLIST: u8 = 0x00;
pub const FE_CEQ: u8 = 0x01;
pub const FE_CGT: u8 = 0x02;
pub const FE_CLT: u8 = 0x04;
pub const FE_LDFTN: u8 = 0x06;
pub const FE_LDVIRTFTN: u8 = 0x07;
pub const FE_LDARG: u8 = 0x09;
pub const FE_LDARGA: u8 = 0x0A;
pub const FE_STARG: u8 = 0x0B;
pub const FE_LDLOC: u8 = 0x0C;
pub const FE_LDLOCA: u8 = 0x0D;
pub const FE_STLOC: u8 = 0x0E;
pub const FE_ENDFILTER: u8 = 0x11;
pub const FE_INITOBJ: u8 = 0x15;
pub const FE_CONSTRAINED: u8 = 0x16;
pub const FE_RETHROW: u8 = 0x1A;
pub const FE_SIZEOF: u8 = 0x1C;

/// Distance between a short branch opcode and its long form.
pub const SHORT_BRANCH_DELTA: u8 = BR - BR_S;

/// Returns true for opcodes whose operand is a single branch target.
#[must_use]
pub fn is_branch(prefix: u8, opcode: u8) -> bool {
    prefix == 0 && matches!(opcode, BR_S..=BLT_UN_S | BR..=BLT_UN | LEAVE | LEAVE_S)
}

/// Mnemonic of an opcode, `None` for opcodes outside this table.
#[must_use]
pub fn mnemonic(prefix: u8, opcode: u8) -> Option<&'static str> {
    if prefix == FE_PREFIX {
        return Some(match opcode {
            FE_ARGLIST => "arglist",
            FE_CEQ => "ceq",
            FE_CGT => "cgt",
            FE_CLT => "clt",
            FE_LDFTN => "ldftn",
            FE_LDVIRTFTN => "ldvirtftn",
            FE_LDARG => "ldarg",
            FE_LDARGA => "ldarga",
            FE_STARG => "starg",
            FE_LDLOC => "ldloc",
            FE_LDLOCA => "ldloca",
            FE_STLOC => "stloc",
            FE_ENDFILTER => "endfilter",
            FE_INITOBJ => "initobj",
            FE_CONSTRAINED => "constrained.",
            FE_RETHROW => "rethrow",
            FE_SIZEOF => "sizeof",
            _ => return None,
        });
    }

    Some(match opcode {
        NOP => "nop",
        BREAK => "break",
        LDARG_0 => "ldarg.0",
        LDARG_1 => "ldarg.1",
        LDARG_2 => "ldarg.2",
        LDARG_3 => "ldarg.3",
        LDLOC_0 => "ldloc.0",
        LDLOC_1 => "ldloc.1",
        LDLOC_2 => "ldloc.2",
        LDLOC_3 => "ldloc.3",
        STLOC_0 => "stloc.0",
        STLOC_1 => "stloc.1",
        STLOC_2 => "stloc.2",
        STLOC_3 => "stloc.3",
        LDARG_S => "ldarg.s",
        LDARGA_S => "ldarga.s",
        STARG_S => "starg.s",
        LDLOC_S => "ldloc.s",
        LDLOCA_S => "ldloca.s",
        STLOC_S => "stloc.s",
        LDNULL => "ldnull",
        LDC_I4_M1 => "ldc.i4.m1",
        LDC_I4_0 => "ldc.i4.0",
        LDC_I4_1 => "ldc.i4.1",
        LDC_I4_2 => "ldc.i4.2",
        LDC_I4_3 => "ldc.i4.3",
        LDC_I4_4 => "ldc.i4.4",
        LDC_I4_5 => "ldc.i4.5",
        LDC_I4_6 => "ldc.i4.6",
        LDC_I4_7 => "ldc.i4.7",
        LDC_I4_8 => "ldc.i4.8",
        LDC_I4_S => "ldc.i4.s",
        LDC_I4 => "ldc.i4",
        LDC_I8 => "ldc.i8",
        LDC_R4 => "ldc.r4",
        LDC_R8 => "ldc.r8",
        DUP => "dup",
        POP => "pop",
        JMP => "jmp",
        CALL => "call",
        CALLI => "calli",
        RET => "ret",
        BR_S => "br.s",
        BRFALSE_S => "brfalse.s",
        BRTRUE_S => "brtrue.s",
        BEQ_S => "beq.s",
        BGE_S => "bge.s",
        BGT_S => "bgt.s",
        BLE_S => "ble.s",
        BLT_S => "blt.s",
        BNE_UN_S => "bne.un.s",
        BGE_UN_S => "bge.un.s",
        BGT_UN_S => "bgt.un.s",
        BLE_UN_S => "ble.un.s",
        BLT_UN_S => "blt.un.s",
        BR => "br",
        BRFALSE => "brfalse",
        BRTRUE => "brtrue",
        BEQ => "beq",
        BGE => "bge",
        BGT => "bgt",
        BLE => "ble",
        BLT => "blt",
        BNE_UN => "bne.un",
        BGE_UN => "bge.un",
        BGT_UN => "bgt.un",
        BLE_UN => "ble.un",
        BLT_UN => "blt.un",
        SWITCH => "switch",
        ADD => "add",
        SUB => "sub",
        MUL => "mul",
        CALLVIRT => "callvirt",
        LDOBJ => "ldobj",
        LDSTR => "ldstr",
        NEWOBJ => "newobj",
        CASTCLASS => "castclass",
        ISINST => "isinst",
        UNBOX => "unbox",
        THROW => "throw",
        LDFLD => "ldfld",
        LDFLDA => "ldflda",
        STFLD => "stfld",
        LDSFLD => "ldsfld",
        LDSFLDA => "ldsflda",
        STSFLD => "stsfld",
        STOBJ => "stobj",
        BOX => "box",
        NEWARR => "newarr",
        LDLEN => "ldlen",
        LDELEMA => "ldelema",
        LDELEM => "ldelem",
        STELEM => "stelem",
        UNBOX_ANY => "unbox.any",
        LDTOKEN => "ldtoken",
        ENDFINALLY => "endfinally",
        LEAVE => "leave",
        LEAVE_S => "leave.s",
        _ => return None,
    })
}
