//! Target operation codes.
//!
//! Numbering follows the target's instruction encoding so an emitter can write
//! `u8::from(op)` directly. Only the instructions the compiler produces are
//! listed.

use ixion_core::{PrimitiveKind, SemanticType};
use num_enum::{IntoPrimitive, TryFromPrimitive};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum Opcode {
    // =========================================================================
    // Constants
    // =========================================================================
    Nop = 0,
    AconstNull = 1,
    IconstM1 = 2,
    Iconst0 = 3,
    Iconst1 = 4,
    Iconst2 = 5,
    Iconst3 = 6,
    Iconst4 = 7,
    Iconst5 = 8,
    Lconst0 = 9,
    Lconst1 = 10,
    Fconst0 = 11,
    Fconst1 = 12,
    Fconst2 = 13,
    Dconst0 = 14,
    Dconst1 = 15,
    /// Operand: signed byte
    Bipush = 16,
    /// Operand: signed short
    Sipush = 17,
    Ldc = 18,

    // =========================================================================
    // Locals
    // =========================================================================
    Iload = 21,
    Lload = 22,
    Fload = 23,
    Dload = 24,
    Aload = 25,
    Istore = 54,
    Lstore = 55,
    Fstore = 56,
    Dstore = 57,
    Astore = 58,
    Iinc = 132,

    // =========================================================================
    // Arrays
    // =========================================================================
    Iaload = 46,
    Laload = 47,
    Faload = 48,
    Daload = 49,
    Aaload = 50,
    Baload = 51,
    Caload = 52,
    Saload = 53,
    Iastore = 79,
    Lastore = 80,
    Fastore = 81,
    Dastore = 82,
    Aastore = 83,
    Bastore = 84,
    Castore = 85,
    Sastore = 86,

    // =========================================================================
    // Stack
    // =========================================================================
    Pop = 87,
    Pop2 = 88,
    Dup = 89,
    DupX1 = 90,
    DupX2 = 91,
    Dup2 = 92,
    Dup2X1 = 93,
    Dup2X2 = 94,
    Swap = 95,

    // =========================================================================
    // Arithmetic
    // =========================================================================
    Iadd = 96,
    Ladd = 97,
    Fadd = 98,
    Dadd = 99,
    Isub = 100,
    Lsub = 101,
    Fsub = 102,
    Dsub = 103,
    Imul = 104,
    Lmul = 105,
    Fmul = 106,
    Dmul = 107,
    Idiv = 108,
    Ldiv = 109,
    Fdiv = 110,
    Ddiv = 111,
    Irem = 112,
    Lrem = 113,
    Frem = 114,
    Drem = 115,
    Ineg = 116,
    Lneg = 117,
    Fneg = 118,
    Dneg = 119,
    Ishl = 120,
    Lshl = 121,
    Ishr = 122,
    Lshr = 123,
    Iushr = 124,
    Lushr = 125,
    Iand = 126,
    Land = 127,
    Ior = 128,
    Lor = 129,
    Ixor = 130,
    Lxor = 131,

    // =========================================================================
    // Conversions
    // =========================================================================
    I2l = 133,
    I2f = 134,
    I2d = 135,
    L2i = 136,
    L2f = 137,
    L2d = 138,
    F2i = 139,
    F2l = 140,
    F2d = 141,
    D2i = 142,
    D2l = 143,
    D2f = 144,
    I2b = 145,
    I2c = 146,
    I2s = 147,

    // =========================================================================
    // Comparisons and branches
    // =========================================================================
    Lcmp = 148,
    Fcmpl = 149,
    Fcmpg = 150,
    Dcmpl = 151,
    Dcmpg = 152,
    Ifeq = 153,
    Ifne = 154,
    Iflt = 155,
    Ifge = 156,
    Ifgt = 157,
    Ifle = 158,
    IfIcmpeq = 159,
    IfIcmpne = 160,
    IfIcmplt = 161,
    IfIcmpge = 162,
    IfIcmpgt = 163,
    IfIcmple = 164,
    IfAcmpeq = 165,
    IfAcmpne = 166,
    Goto = 167,
    Ifnull = 198,
    Ifnonnull = 199,

    // =========================================================================
    // Returns
    // =========================================================================
    Ireturn = 172,
    Lreturn = 173,
    Freturn = 174,
    Dreturn = 175,
    Areturn = 176,
    Return = 177,

    // =========================================================================
    // Fields and invocation
    // =========================================================================
    Getstatic = 178,
    Putstatic = 179,
    Getfield = 180,
    Putfield = 181,
    Invokevirtual = 182,
    Invokespecial = 183,
    Invokestatic = 184,
    Invokeinterface = 185,
    Invokedynamic = 186,

    // =========================================================================
    // Objects
    // =========================================================================
    New = 187,
    /// Operand: primitive array type code
    Newarray = 188,
    Anewarray = 189,
    Arraylength = 190,
    Athrow = 191,
    Checkcast = 192,
    Instanceof = 193,
    Multianewarray = 197,
}

impl Opcode {
    /// Variant of an `I`-prefixed local/return/arithmetic opcode for `ty`.
    ///
    /// `base` must be one of `Iload`, `Istore`, `Ireturn`, `Iaload`,
    /// `Iastore`, or an int arithmetic opcode (`Iadd` .. `Ineg`). Arithmetic
    /// has no reference form; references map to the int opcode there.
    pub fn typed(self, ty: &SemanticType) -> Opcode {
        let array_op = matches!(self, Opcode::Iaload | Opcode::Iastore);
        let offset = match ty.primitive() {
            Some(PrimitiveKind::Long) => 1,
            Some(PrimitiveKind::Float) => 2,
            Some(PrimitiveKind::Double) => 3,
            Some(PrimitiveKind::Boolean | PrimitiveKind::Byte) if array_op => 5,
            Some(PrimitiveKind::Char) if array_op => 6,
            Some(PrimitiveKind::Short) if array_op => 7,
            Some(_) => 0,
            None if self.has_reference_form() => 4,
            None => 0,
        };
        Opcode::try_from(u8::from(self) + offset).unwrap_or(self)
    }

    fn has_reference_form(self) -> bool {
        matches!(
            self,
            Opcode::Iload | Opcode::Istore | Opcode::Ireturn | Opcode::Iaload | Opcode::Iastore
        )
    }

    /// Conditional jumps, including the null checks.
    pub fn is_branch(self) -> bool {
        let code = u8::from(self);
        (153..=166).contains(&code) || matches!(self, Opcode::Ifnull | Opcode::Ifnonnull)
    }

    /// Lower-case mnemonic.
    pub fn name(self) -> &'static str {
        use Opcode::*;
        match self {
            Nop => "nop",
            AconstNull => "aconst_null",
            IconstM1 => "iconst_m1",
            Iconst0 => "iconst_0",
            Iconst1 => "iconst_1",
            Iconst2 => "iconst_2",
            Iconst3 => "iconst_3",
            Iconst4 => "iconst_4",
            Iconst5 => "iconst_5",
            Lconst0 => "lconst_0",
            Lconst1 => "lconst_1",
            Fconst0 => "fconst_0",
            Fconst1 => "fconst_1",
            Fconst2 => "fconst_2",
            Dconst0 => "dconst_0",
            Dconst1 => "dconst_1",
            Bipush => "bipush",
            Sipush => "sipush",
            Ldc => "ldc",
            Iload => "iload",
            Lload => "lload",
            Fload => "fload",
            Dload => "dload",
            Aload => "aload",
            Istore => "istore",
            Lstore => "lstore",
            Fstore => "fstore",
            Dstore => "dstore",
            Astore => "astore",
            Iinc => "iinc",
            Iaload => "iaload",
            Laload => "laload",
            Faload => "faload",
            Daload => "daload",
            Aaload => "aaload",
            Baload => "baload",
            Caload => "caload",
            Saload => "saload",
            Iastore => "iastore",
            Lastore => "lastore",
            Fastore => "fastore",
            Dastore => "dastore",
            Aastore => "aastore",
            Bastore => "bastore",
            Castore => "castore",
            Sastore => "sastore",
            Pop => "pop",
            Pop2 => "pop2",
            Dup => "dup",
            DupX1 => "dup_x1",
            DupX2 => "dup_x2",
            Dup2 => "dup2",
            Dup2X1 => "dup2_x1",
            Dup2X2 => "dup2_x2",
            Swap => "swap",
            Iadd => "iadd",
            Ladd => "ladd",
            Fadd => "fadd",
            Dadd => "dadd",
            Isub => "isub",
            Lsub => "lsub",
            Fsub => "fsub",
            Dsub => "dsub",
            Imul => "imul",
            Lmul => "lmul",
            Fmul => "fmul",
            Dmul => "dmul",
            Idiv => "idiv",
            Ldiv => "ldiv",
            Fdiv => "fdiv",
            Ddiv => "ddiv",
            Irem => "irem",
            Lrem => "lrem",
            Frem => "frem",
            Drem => "drem",
            Ineg => "ineg",
            Lneg => "lneg",
            Fneg => "fneg",
            Dneg => "dneg",
            Ishl => "ishl",
            Lshl => "lshl",
            Ishr => "ishr",
            Lshr => "lshr",
            Iushr => "iushr",
            Lushr => "lushr",
            Iand => "iand",
            Land => "land",
            Ior => "ior",
            Lor => "lor",
            Ixor => "ixor",
            Lxor => "lxor",
            I2l => "i2l",
            I2f => "i2f",
            I2d => "i2d",
            L2i => "l2i",
            L2f => "l2f",
            L2d => "l2d",
            F2i => "f2i",
            F2l => "f2l",
            F2d => "f2d",
            D2i => "d2i",
            D2l => "d2l",
            D2f => "d2f",
            I2b => "i2b",
            I2c => "i2c",
            I2s => "i2s",
            Lcmp => "lcmp",
            Fcmpl => "fcmpl",
            Fcmpg => "fcmpg",
            Dcmpl => "dcmpl",
            Dcmpg => "dcmpg",
            Ifeq => "ifeq",
            Ifne => "ifne",
            Iflt => "iflt",
            Ifge => "ifge",
            Ifgt => "ifgt",
            Ifle => "ifle",
            IfIcmpeq => "if_icmpeq",
            IfIcmpne => "if_icmpne",
            IfIcmplt => "if_icmplt",
            IfIcmpge => "if_icmpge",
            IfIcmpgt => "if_icmpgt",
            IfIcmple => "if_icmple",
            IfAcmpeq => "if_acmpeq",
            IfAcmpne => "if_acmpne",
            Goto => "goto",
            Ifnull => "ifnull",
            Ifnonnull => "ifnonnull",
            Ireturn => "ireturn",
            Lreturn => "lreturn",
            Freturn => "freturn",
            Dreturn => "dreturn",
            Areturn => "areturn",
            Return => "return",
            Getstatic => "getstatic",
            Putstatic => "putstatic",
            Getfield => "getfield",
            Putfield => "putfield",
            Invokevirtual => "invokevirtual",
            Invokespecial => "invokespecial",
            Invokestatic => "invokestatic",
            Invokeinterface => "invokeinterface",
            Invokedynamic => "invokedynamic",
            New => "new",
            Newarray => "newarray",
            Anewarray => "anewarray",
            Arraylength => "arraylength",
            Athrow => "athrow",
            Checkcast => "checkcast",
            Instanceof => "instanceof",
            Multianewarray => "multianewarray",
        }
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Operand of `newarray` for a primitive element kind.
pub fn newarray_type_code(kind: PrimitiveKind) -> i32 {
    match kind {
        PrimitiveKind::Boolean => 4,
        PrimitiveKind::Char => 5,
        PrimitiveKind::Float => 6,
        PrimitiveKind::Double => 7,
        PrimitiveKind::Byte => 8,
        PrimitiveKind::Short => 9,
        PrimitiveKind::Int | PrimitiveKind::Void => 10,
        PrimitiveKind::Long => 11,
    }
}
