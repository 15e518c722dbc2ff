//! A small stack-machine evaluator for emitted instructions.
//!
//! Covers straight-line and branching code over primitives and strings:
//! constants, locals, arithmetic, conversions, comparisons, the width-aware
//! `dup`/`pop`/`swap` family, static calls within one class, boxing calls,
//! `System.out` printing, and string concatenation call sites. Objects and
//! arrays are out of reach; hitting one yields [`EvalError::Unsupported`].
//!
//! Boxed values are represented by their primitive payload, so `valueOf` and
//! `<kind>Value()` are identities here.
//!
//! Throws are routed through the method's exception table. A handler with a
//! catch type matches by name, or by subtyping when the evaluator was given
//! a resolver.

use std::fmt;

use rustc_hash::FxHashMap;
use thiserror::Error;

use ixion_core::{ConstValue, SemanticType};
use ixion_registry::HostTypeResolver;

use super::{ClassArtifact, ExceptionHandler, Instruction, Label, MethodArtifact, Opcode};

/// A runtime value on the operand stack or in a local.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Str(String),
    Null,
    /// An opaque object of the given class.
    Object(String),
}

impl Value {
    fn width(&self) -> u8 {
        match self {
            Value::Long(_) | Value::Double(_) => 2,
            _ => 1,
        }
    }

    fn from_const(value: &ConstValue) -> Value {
        match value {
            ConstValue::Int(v) => Value::Int(*v),
            ConstValue::Long(v) => Value::Long(*v),
            ConstValue::Float(v) => Value::Float(v.into_inner()),
            ConstValue::Double(v) => Value::Double(v.into_inner()),
            ConstValue::Bool(v) => Value::Int(i32::from(*v)),
            ConstValue::Char(v) => Value::Int(i32::from(*v)),
            ConstValue::String(v) => Value::Str(v.clone()),
            ConstValue::Null => Value::Null,
        }
    }

    /// Render as string conversion would, given the static descriptor code.
    fn render(&self, code: char) -> String {
        match (self, code) {
            (Value::Int(v), 'Z') => (*v != 0).to_string(),
            (Value::Int(v), 'C') => char::from_u32(*v as u32).map(String::from).unwrap_or_default(),
            (Value::Int(v), _) => v.to_string(),
            (Value::Long(v), _) => v.to_string(),
            (Value::Float(v), _) => ConstValue::float(*v).to_string(),
            (Value::Double(v), _) => ConstValue::double(*v).to_string(),
            (Value::Str(s), _) => s.clone(),
            (Value::Null, _) => "null".to_string(),
            (Value::Object(class), _) => format!("{class}@0"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("stack underflow at instruction {0}")]
    StackUnderflow(usize),
    #[error("expected {expected} on the stack, found {found:?}")]
    TypeConfusion { expected: &'static str, found: Value },
    #[error("local {0} read before it was written")]
    UnsetLocal(u16),
    #[error("jump to unmarked label {0}")]
    UndefinedLabel(Label),
    #[error("division by zero")]
    DivisionByZero,
    #[error("uncaught {0}")]
    Thrown(String),
    #[error("no method {0}")]
    UnknownMethod(String),
    #[error("unsupported instruction '{0}'")]
    Unsupported(String),
    #[error("step limit exceeded")]
    StepLimit,
}

type Result<T> = std::result::Result<T, EvalError>;

const STEP_LIMIT: usize = 1_000_000;

/// Executes method bodies of at most one class.
#[derive(Default)]
pub struct Evaluator<'c> {
    class: Option<&'c ClassArtifact>,
    resolver: Option<&'c dyn HostTypeResolver>,
    statics: FxHashMap<String, Value>,
    output: String,
    steps: usize,
}

impl fmt::Debug for Evaluator<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Evaluator")
            .field("class", &self.class.map(|c| c.name.as_str()))
            .field("statics", &self.statics)
            .field("steps", &self.steps)
            .finish_non_exhaustive()
    }
}

/// Operand stack plus locals of one activation.
struct Frame {
    stack: Vec<Value>,
    locals: Vec<Option<Value>>,
    pc: usize,
}

impl<'c> Evaluator<'c> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluator able to call the static methods and fields of `class`.
    pub fn with_class(class: &'c ClassArtifact) -> Self {
        Self {
            class: Some(class),
            ..Self::default()
        }
    }

    /// Match catch types by subtyping through `resolver`.
    pub fn with_resolver(mut self, resolver: &'c dyn HostTypeResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Everything printed through `System.out` so far.
    pub fn output(&self) -> &str {
        &self.output
    }

    /// Run a method of the loaded class.
    pub fn invoke(&mut self, name: &str, descriptor: &str, args: Vec<Value>) -> Result<Option<Value>> {
        let class = self
            .class
            .ok_or_else(|| EvalError::UnknownMethod(format!("{name}{descriptor}")))?;
        let method = class
            .method_with(name, descriptor)
            .ok_or_else(|| EvalError::UnknownMethod(format!("{}.{name}{descriptor}", class.name)))?;
        self.run_method(method, args)
    }

    /// Run a method body under its exception table.
    pub fn run_method(&mut self, method: &MethodArtifact, args: Vec<Value>) -> Result<Option<Value>> {
        self.execute(&method.instructions, &method.handlers, args)
    }

    /// Run an instruction sequence without handlers. Arguments fill the
    /// first locals, wide values taking two slots.
    pub fn run(&mut self, instructions: &[Instruction], args: Vec<Value>) -> Result<Option<Value>> {
        self.execute(instructions, &[], args)
    }

    fn execute(
        &mut self,
        instructions: &[Instruction],
        handlers: &[ExceptionHandler],
        args: Vec<Value>,
    ) -> Result<Option<Value>> {
        let mut labels: FxHashMap<Label, usize> = FxHashMap::default();
        for (index, instruction) in instructions.iter().enumerate() {
            if let Instruction::Label(label) = instruction {
                labels.insert(*label, index);
            }
        }

        let mut frame = Frame {
            stack: Vec::new(),
            locals: Vec::new(),
            pc: 0,
        };
        let mut slot = 0u16;
        for arg in args {
            let width = u16::from(arg.width());
            frame.store(slot, arg);
            slot += width;
        }

        while frame.pc < instructions.len() {
            self.steps += 1;
            if self.steps > STEP_LIMIT {
                return Err(EvalError::StepLimit);
            }
            let at = frame.pc;
            frame.pc += 1;
            match self.step(instructions, &labels, &mut frame, at) {
                Ok(Some(result)) => return Ok(result),
                Ok(None) => {}
                Err(EvalError::Thrown(class)) => {
                    let Some(target) = self.catching(handlers, &labels, at, &class) else {
                        return Err(EvalError::Thrown(class));
                    };
                    frame.stack.clear();
                    frame.stack.push(Value::Object(class));
                    frame.pc = target;
                }
                Err(error) => return Err(error),
            }
        }
        Ok(None)
    }

    /// Execute the instruction at `at`. Returns `Some` when it ends the
    /// activation.
    fn step(
        &mut self,
        instructions: &[Instruction],
        labels: &FxHashMap<Label, usize>,
        frame: &mut Frame,
        at: usize,
    ) -> Result<Option<Option<Value>>> {
        match &instructions[at] {
            Instruction::Label(_) | Instruction::LineNumber(..) => {}
            Instruction::Insn(op) => {
                if let Some(result) = self.simple(*op, frame, at)? {
                    return Ok(Some(result));
                }
            }
            Instruction::IntInsn(Opcode::Bipush | Opcode::Sipush, value) => {
                frame.stack.push(Value::Int(*value));
            }
            Instruction::Ldc(value) => frame.stack.push(Value::from_const(value)),
            Instruction::VarInsn(op, slot) => match op {
                Opcode::Iload | Opcode::Lload | Opcode::Fload | Opcode::Dload | Opcode::Aload => {
                    let value = frame.load(*slot)?;
                    frame.stack.push(value);
                }
                _ => {
                    let value = frame.pop(at)?;
                    frame.store(*slot, value);
                }
            },
            Instruction::Iinc { slot, delta } => {
                let value = frame.load(*slot)?;
                let Value::Int(v) = value else {
                    return Err(EvalError::TypeConfusion {
                        expected: "int",
                        found: value,
                    });
                };
                frame.store(*slot, Value::Int(v.wrapping_add(i32::from(*delta))));
            }
            Instruction::JumpInsn(op, label) => {
                if self.branch(*op, frame, at)? {
                    frame.pc = *labels.get(label).ok_or(EvalError::UndefinedLabel(*label))?;
                }
            }
            Instruction::FieldInsn(op, member) => match op {
                Opcode::Getstatic if member.owner == "java/lang/System" => {
                    frame.stack.push(Value::Object(
                        SemanticType::from_descriptor(&member.descriptor)
                            .map(|t| t.internal_name())
                            .unwrap_or_default(),
                    ));
                }
                Opcode::Getstatic if self.owns(&member.owner) => {
                    let value = self
                        .statics
                        .get(&member.name)
                        .cloned()
                        .unwrap_or_else(|| default_value(&member.descriptor));
                    frame.stack.push(value);
                }
                Opcode::Putstatic if self.owns(&member.owner) => {
                    let value = frame.pop(at)?;
                    self.statics.insert(member.name.clone(), value);
                }
                _ => return Err(EvalError::Unsupported(instructions[at].to_string())),
            },
            Instruction::MethodInsn(op, member, _) => {
                let codes = parameter_codes(&member.descriptor);
                let mut args = Vec::with_capacity(codes.len());
                for _ in 0..codes.len() {
                    args.push(frame.pop(at)?);
                }
                args.reverse();
                let receiver = match op {
                    Opcode::Invokestatic => None,
                    _ => Some(frame.pop(at)?),
                };
                if let Some(value) = self.call(*op, member, receiver, args, &codes)? {
                    frame.stack.push(value);
                }
            }
            Instruction::InvokeDynamic(call) if call.name == "makeConcatWithConstants" => {
                let codes = parameter_codes(&call.descriptor);
                let mut args = Vec::with_capacity(codes.len());
                for _ in 0..codes.len() {
                    args.push(frame.pop(at)?);
                }
                args.reverse();
                let recipe = match call.bootstrap_args.first() {
                    Some(super::BootstrapArg::String(recipe)) => recipe.as_str(),
                    _ => return Err(EvalError::Unsupported(instructions[at].to_string())),
                };
                let mut out = String::new();
                let mut index = 0;
                for c in recipe.chars() {
                    if c == '\u{1}' {
                        let value = args.get(index).ok_or(EvalError::StackUnderflow(at))?;
                        out.push_str(&value.render(codes[index]));
                        index += 1;
                    } else {
                        out.push(c);
                    }
                }
                frame.stack.push(Value::Str(out));
            }
            Instruction::TypeInsn(Opcode::New, class) => frame.stack.push(Value::Object(class.clone())),
            Instruction::TypeInsn(Opcode::Checkcast, _) => {}
            Instruction::TypeInsn(Opcode::Instanceof, class) => {
                let value = frame.pop(at)?;
                frame.stack.push(Value::Int(i32::from(instance_of(&value, class))));
            }
            other => return Err(EvalError::Unsupported(other.to_string())),
        }
        Ok(None)
    }

    fn owns(&self, owner: &str) -> bool {
        self.class.is_some_and(|c| c.name == owner)
    }

    /// Index of the first handler covering `at` that accepts `class`.
    fn catching(
        &self,
        handlers: &[ExceptionHandler],
        labels: &FxHashMap<Label, usize>,
        at: usize,
        class: &str,
    ) -> Option<usize> {
        handlers.iter().find_map(|handler| {
            let (start, end) = (*labels.get(&handler.start)?, *labels.get(&handler.end)?);
            let accepts = match handler.catch_type.as_deref() {
                None => true,
                Some(caught) => {
                    caught == class || self.resolver.is_some_and(|r| r.is_subclass(class, caught))
                }
            };
            (start <= at && at < end && accepts)
                .then(|| labels.get(&handler.handler).copied())
                .flatten()
        })
    }

    // ==========================================================================
    // Operand-free instructions
    // ==========================================================================

    /// Returns `Some` when the instruction ends the activation.
    fn simple(&mut self, op: Opcode, frame: &mut Frame, at: usize) -> Result<Option<Option<Value>>> {
        use Opcode::*;
        match op {
            Nop => {}
            AconstNull => frame.stack.push(Value::Null),
            IconstM1 | Iconst0 | Iconst1 | Iconst2 | Iconst3 | Iconst4 | Iconst5 => {
                frame.stack.push(Value::Int(i32::from(u8::from(op)) - i32::from(u8::from(Iconst0))));
            }
            Lconst0 | Lconst1 => frame.stack.push(Value::Long(i64::from(u8::from(op) - u8::from(Lconst0)))),
            Fconst0 | Fconst1 | Fconst2 => {
                frame.stack.push(Value::Float(f32::from(u8::from(op) - u8::from(Fconst0))));
            }
            Dconst0 | Dconst1 => frame.stack.push(Value::Double(f64::from(u8::from(op) - u8::from(Dconst0)))),

            Pop => {
                frame.take(1, at)?;
            }
            Pop2 => {
                frame.take(2, at)?;
            }
            Dup => {
                let top = frame.take(1, at)?;
                frame.push_all(&top);
                frame.push_all(&top);
            }
            Dup2 => {
                let top = frame.take(2, at)?;
                frame.push_all(&top);
                frame.push_all(&top);
            }
            DupX1 | DupX2 | Dup2X1 | Dup2X2 => {
                let (top_width, below_width) = match op {
                    DupX1 => (1, 1),
                    DupX2 => (1, 2),
                    Dup2X1 => (2, 1),
                    _ => (2, 2),
                };
                let top = frame.take(top_width, at)?;
                let below = frame.take(below_width, at)?;
                frame.push_all(&top);
                frame.push_all(&below);
                frame.push_all(&top);
            }
            Swap => {
                let top = frame.take(1, at)?;
                let below = frame.take(1, at)?;
                frame.push_all(&top);
                frame.push_all(&below);
            }

            Iadd | Isub | Imul | Idiv | Irem | Iand | Ior | Ixor | Ishl | Ishr | Iushr => {
                let b = frame.pop_int(at)?;
                let a = frame.pop_int(at)?;
                let value = match op {
                    Iadd => a.wrapping_add(b),
                    Isub => a.wrapping_sub(b),
                    Imul => a.wrapping_mul(b),
                    Idiv | Irem if b == 0 => return Err(EvalError::DivisionByZero),
                    Idiv => a.wrapping_div(b),
                    Irem => a.wrapping_rem(b),
                    Iand => a & b,
                    Ior => a | b,
                    Ixor => a ^ b,
                    Ishl => a.wrapping_shl(b as u32),
                    Ishr => a.wrapping_shr(b as u32),
                    _ => ((a as u32).wrapping_shr(b as u32)) as i32,
                };
                frame.stack.push(Value::Int(value));
            }
            Ladd | Lsub | Lmul | Ldiv | Lrem | Land | Lor | Lxor => {
                let b = frame.pop_long(at)?;
                let a = frame.pop_long(at)?;
                let value = match op {
                    Ladd => a.wrapping_add(b),
                    Lsub => a.wrapping_sub(b),
                    Lmul => a.wrapping_mul(b),
                    Ldiv | Lrem if b == 0 => return Err(EvalError::DivisionByZero),
                    Ldiv => a.wrapping_div(b),
                    Lrem => a.wrapping_rem(b),
                    Land => a & b,
                    Lor => a | b,
                    _ => a ^ b,
                };
                frame.stack.push(Value::Long(value));
            }
            Lshl | Lshr | Lushr => {
                let b = frame.pop_int(at)? as u32;
                let a = frame.pop_long(at)?;
                let value = match op {
                    Lshl => a.wrapping_shl(b),
                    Lshr => a.wrapping_shr(b),
                    _ => ((a as u64).wrapping_shr(b)) as i64,
                };
                frame.stack.push(Value::Long(value));
            }
            Fadd | Fsub | Fmul | Fdiv | Frem => {
                let b = frame.pop_float(at)?;
                let a = frame.pop_float(at)?;
                let value = match op {
                    Fadd => a + b,
                    Fsub => a - b,
                    Fmul => a * b,
                    Fdiv => a / b,
                    _ => a % b,
                };
                frame.stack.push(Value::Float(value));
            }
            Dadd | Dsub | Dmul | Ddiv | Drem => {
                let b = frame.pop_double(at)?;
                let a = frame.pop_double(at)?;
                let value = match op {
                    Dadd => a + b,
                    Dsub => a - b,
                    Dmul => a * b,
                    Ddiv => a / b,
                    _ => a % b,
                };
                frame.stack.push(Value::Double(value));
            }
            Ineg => {
                let a = frame.pop_int(at)?;
                frame.stack.push(Value::Int(a.wrapping_neg()));
            }
            Lneg => {
                let a = frame.pop_long(at)?;
                frame.stack.push(Value::Long(a.wrapping_neg()));
            }
            Fneg => {
                let a = frame.pop_float(at)?;
                frame.stack.push(Value::Float(-a));
            }
            Dneg => {
                let a = frame.pop_double(at)?;
                frame.stack.push(Value::Double(-a));
            }

            I2l | I2f | I2d | I2b | I2c | I2s => {
                let a = frame.pop_int(at)?;
                frame.stack.push(match op {
                    I2l => Value::Long(i64::from(a)),
                    I2f => Value::Float(a as f32),
                    I2d => Value::Double(f64::from(a)),
                    I2b => Value::Int(i32::from(a as i8)),
                    I2c => Value::Int(i32::from(a as u16)),
                    _ => Value::Int(i32::from(a as i16)),
                });
            }
            L2i | L2f | L2d => {
                let a = frame.pop_long(at)?;
                frame.stack.push(match op {
                    L2i => Value::Int(a as i32),
                    L2f => Value::Float(a as f32),
                    _ => Value::Double(a as f64),
                });
            }
            F2i | F2l | F2d => {
                let a = frame.pop_float(at)?;
                frame.stack.push(match op {
                    F2i => Value::Int(a as i32),
                    F2l => Value::Long(a as i64),
                    _ => Value::Double(f64::from(a)),
                });
            }
            D2i | D2l | D2f => {
                let a = frame.pop_double(at)?;
                frame.stack.push(match op {
                    D2i => Value::Int(a as i32),
                    D2l => Value::Long(a as i64),
                    _ => Value::Float(a as f32),
                });
            }

            Lcmp => {
                let b = frame.pop_long(at)?;
                let a = frame.pop_long(at)?;
                frame.stack.push(Value::Int(a.cmp(&b) as i32));
            }
            Fcmpl | Fcmpg => {
                let b = frame.pop_float(at)?;
                let a = frame.pop_float(at)?;
                let nan = if op == Fcmpl { -1 } else { 1 };
                frame.stack.push(Value::Int(a.partial_cmp(&b).map_or(nan, |o| o as i32)));
            }
            Dcmpl | Dcmpg => {
                let b = frame.pop_double(at)?;
                let a = frame.pop_double(at)?;
                let nan = if op == Dcmpl { -1 } else { 1 };
                frame.stack.push(Value::Int(a.partial_cmp(&b).map_or(nan, |o| o as i32)));
            }

            Ireturn | Lreturn | Freturn | Dreturn | Areturn => {
                let value = frame.pop(at)?;
                return Ok(Some(Some(value)));
            }
            Return => return Ok(Some(None)),
            Athrow => {
                let value = frame.pop(at)?;
                return Err(EvalError::Thrown(match value {
                    Value::Object(class) => class,
                    other => other.render('L'),
                }));
            }
            other => return Err(EvalError::Unsupported(other.name().to_string())),
        }
        Ok(None)
    }

    /// Whether a conditional jump is taken. Pops its operands.
    fn branch(&mut self, op: Opcode, frame: &mut Frame, at: usize) -> Result<bool> {
        use Opcode::*;
        Ok(match op {
            Goto => true,
            Ifeq | Ifne | Iflt | Ifge | Ifgt | Ifle => {
                let a = frame.pop_int(at)?;
                compare_with_zero(op, a)
            }
            IfIcmpeq | IfIcmpne | IfIcmplt | IfIcmpge | IfIcmpgt | IfIcmple => {
                let b = frame.pop_int(at)?;
                let a = frame.pop_int(at)?;
                let zero_form = Opcode::try_from(u8::from(op) - u8::from(IfIcmpeq) + u8::from(Ifeq))
                    .map_err(|_| EvalError::Unsupported(op.name().to_string()))?;
                compare_with_zero(zero_form, a.cmp(&b) as i32)
            }
            IfAcmpeq | IfAcmpne => {
                let b = frame.pop(at)?;
                let a = frame.pop(at)?;
                (a == b) == (op == IfAcmpeq)
            }
            Ifnull | Ifnonnull => {
                let a = frame.pop(at)?;
                (a == Value::Null) == (op == Ifnull)
            }
            other => return Err(EvalError::Unsupported(other.name().to_string())),
        })
    }

    // ==========================================================================
    // Calls
    // ==========================================================================

    fn call(
        &mut self,
        op: Opcode,
        member: &super::MemberRef,
        receiver: Option<Value>,
        args: Vec<Value>,
        codes: &[char],
    ) -> Result<Option<Value>> {
        let name = member.name.as_str();
        let owner = member.owner.as_str();

        if op == Opcode::Invokestatic && self.owns(owner) {
            return self.invoke(name, &member.descriptor, args);
        }

        match (owner, name, receiver) {
            (_, "valueOf", None) if owner.starts_with("java/lang/") && owner != "java/lang/String" => {
                Ok(args.into_iter().next())
            }
            (_, "intValue" | "longValue" | "floatValue" | "doubleValue" | "booleanValue" | "charValue"
            | "byteValue" | "shortValue", Some(value)) => Ok(Some(numeric_view(name, value))),
            ("java/lang/String", "valueOf", None) => {
                let code = codes.first().copied().unwrap_or('L');
                Ok(args.first().map(|v| Value::Str(v.render(code))))
            }
            ("java/util/Objects", "equals", None) => {
                let equal = args.first() == args.get(1);
                Ok(Some(Value::Int(i32::from(equal))))
            }
            ("java/io/PrintStream", "print" | "println", Some(_)) => {
                if let (Some(value), Some(code)) = (args.first(), codes.first()) {
                    self.output.push_str(&value.render(*code));
                }
                if name == "println" {
                    self.output.push('\n');
                }
                Ok(None)
            }
            ("java/lang/String", "repeat", Some(Value::Str(s))) => match args.first() {
                Some(Value::Int(n)) if *n >= 0 => Ok(Some(Value::Str(s.repeat(*n as usize)))),
                _ => Err(EvalError::Thrown("java/lang/IllegalArgumentException".to_string())),
            },
            ("java/lang/String", "length", Some(Value::Str(s))) => {
                Ok(Some(Value::Int(s.encode_utf16().count() as i32)))
            }
            ("java/lang/String", "concat", Some(Value::Str(s))) => match args.first() {
                Some(Value::Str(other)) => Ok(Some(Value::Str(format!("{s}{other}")))),
                _ => Err(EvalError::Thrown("java/lang/NullPointerException".to_string())),
            },
            ("java/lang/Integer", "parseInt", None) => match args.first() {
                Some(Value::Str(s)) => s
                    .trim()
                    .parse::<i32>()
                    .map(|v| Some(Value::Int(v)))
                    .map_err(|_| EvalError::Thrown("java/lang/NumberFormatException".to_string())),
                _ => Err(EvalError::Thrown("java/lang/NumberFormatException".to_string())),
            },
            (_, "<init>", Some(_)) => Ok(None),
            (_, _, Some(Value::Null)) => Err(EvalError::Thrown("java/lang/NullPointerException".to_string())),
            _ => Err(EvalError::UnknownMethod(member.to_string())),
        }
    }
}

impl Frame {
    fn pop(&mut self, at: usize) -> Result<Value> {
        self.stack.pop().ok_or(EvalError::StackUnderflow(at))
    }

    /// Pop values covering exactly `width` stack units, bottom first.
    fn take(&mut self, width: u8, at: usize) -> Result<Vec<Value>> {
        let mut taken = Vec::new();
        let mut covered = 0;
        while covered < width {
            let value = self.pop(at)?;
            covered += value.width();
            taken.push(value);
        }
        if covered != width {
            return Err(EvalError::Unsupported(format!("split wide value at instruction {at}")));
        }
        taken.reverse();
        Ok(taken)
    }

    fn push_all(&mut self, values: &[Value]) {
        self.stack.extend(values.iter().cloned());
    }

    fn pop_int(&mut self, at: usize) -> Result<i32> {
        match self.pop(at)? {
            Value::Int(v) => Ok(v),
            found => Err(EvalError::TypeConfusion { expected: "int", found }),
        }
    }

    fn pop_long(&mut self, at: usize) -> Result<i64> {
        match self.pop(at)? {
            Value::Long(v) => Ok(v),
            found => Err(EvalError::TypeConfusion { expected: "long", found }),
        }
    }

    fn pop_float(&mut self, at: usize) -> Result<f32> {
        match self.pop(at)? {
            Value::Float(v) => Ok(v),
            found => Err(EvalError::TypeConfusion { expected: "float", found }),
        }
    }

    fn pop_double(&mut self, at: usize) -> Result<f64> {
        match self.pop(at)? {
            Value::Double(v) => Ok(v),
            found => Err(EvalError::TypeConfusion { expected: "double", found }),
        }
    }

    fn load(&self, slot: u16) -> Result<Value> {
        self.locals
            .get(usize::from(slot))
            .cloned()
            .flatten()
            .ok_or(EvalError::UnsetLocal(slot))
    }

    fn store(&mut self, slot: u16, value: Value) {
        let index = usize::from(slot);
        if self.locals.len() <= index + 1 {
            self.locals.resize(index + 2, None);
        }
        self.locals[index] = Some(value);
    }
}

fn compare_with_zero(op: Opcode, value: i32) -> bool {
    match op {
        Opcode::Ifeq => value == 0,
        Opcode::Ifne => value != 0,
        Opcode::Iflt => value < 0,
        Opcode::Ifge => value >= 0,
        Opcode::Ifgt => value > 0,
        _ => value <= 0,
    }
}

fn numeric_view(method: &str, value: Value) -> Value {
    match (method, value) {
        ("longValue", Value::Int(v)) => Value::Long(i64::from(v)),
        ("doubleValue", Value::Int(v)) => Value::Double(f64::from(v)),
        ("intValue", Value::Long(v)) => Value::Int(v as i32),
        ("intValue", Value::Double(v)) => Value::Int(v as i32),
        (_, value) => value,
    }
}

fn instance_of(value: &Value, class: &str) -> bool {
    let wrapper = match value {
        Value::Null => return false,
        Value::Object(name) => return name == class || class == "java/lang/Object",
        Value::Str(_) => "java/lang/String",
        Value::Int(_) => "java/lang/Integer",
        Value::Long(_) => "java/lang/Long",
        Value::Float(_) => "java/lang/Float",
        Value::Double(_) => "java/lang/Double",
    };
    class == wrapper
        || class == "java/lang/Object"
        || (class == "java/lang/Number" && wrapper != "java/lang/String")
        || (class == "java/lang/CharSequence" && wrapper == "java/lang/String")
}

/// One code per parameter: the primitive descriptor char, or `L` for
/// references and arrays.
fn parameter_codes(descriptor: &str) -> Vec<char> {
    let mut codes = Vec::new();
    let mut chars = descriptor.chars().skip_while(|c| *c == '(');
    let mut in_array = false;
    while let Some(c) = chars.next() {
        match c {
            ')' => break,
            '[' => in_array = true,
            'L' => {
                for c in chars.by_ref() {
                    if c == ';' {
                        break;
                    }
                }
                codes.push('L');
                in_array = false;
            }
            _ if in_array => {
                codes.push('L');
                in_array = false;
            }
            primitive => codes.push(primitive),
        }
    }
    codes
}

fn default_value(descriptor: &str) -> Value {
    match descriptor {
        "J" => Value::Long(0),
        "F" => Value::Float(0.0),
        "D" => Value::Double(0.0),
        "I" | "Z" | "C" | "B" | "S" => Value::Int(0),
        _ => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::{BootstrapArg, DynamicCall, MemberRef, MethodHandle};

    fn run(instructions: Vec<Instruction>) -> Result<Option<Value>> {
        Evaluator::new().run(&instructions, Vec::new())
    }

    #[test]
    fn integer_arithmetic() {
        let result = run(vec![
            Instruction::Insn(Opcode::Iconst2),
            Instruction::IntInsn(Opcode::Bipush, 40),
            Instruction::Insn(Opcode::Iadd),
            Instruction::Insn(Opcode::Ireturn),
        ]);
        assert_eq!(result, Ok(Some(Value::Int(42))));
    }

    #[test]
    fn widening_then_double_arithmetic() {
        let result = run(vec![
            Instruction::Insn(Opcode::Iconst1),
            Instruction::Insn(Opcode::I2d),
            Instruction::Ldc(ConstValue::double(2.5)),
            Instruction::Insn(Opcode::Dadd),
            Instruction::Insn(Opcode::Dreturn),
        ]);
        assert_eq!(result, Ok(Some(Value::Double(3.5))));
    }

    #[test]
    fn int_overflow_wraps() {
        let result = run(vec![
            Instruction::Ldc(ConstValue::Int(i32::MAX)),
            Instruction::Insn(Opcode::Iconst1),
            Instruction::Insn(Opcode::Iadd),
            Instruction::Insn(Opcode::Ireturn),
        ]);
        assert_eq!(result, Ok(Some(Value::Int(i32::MIN))));
    }

    #[test]
    fn division_by_zero_is_reported() {
        let result = run(vec![
            Instruction::Insn(Opcode::Iconst1),
            Instruction::Insn(Opcode::Iconst0),
            Instruction::Insn(Opcode::Idiv),
            Instruction::Insn(Opcode::Ireturn),
        ]);
        assert_eq!(result, Err(EvalError::DivisionByZero));
    }

    #[test]
    fn wide_dup_family() {
        // long value under an int: dup2_x1 copies the long below the int.
        let result = run(vec![
            Instruction::Insn(Opcode::Iconst3),
            Instruction::Insn(Opcode::Lconst1),
            Instruction::Insn(Opcode::Dup2X1),
            Instruction::Insn(Opcode::Pop2),
            Instruction::Insn(Opcode::Pop),
            Instruction::Insn(Opcode::Lreturn),
        ]);
        assert_eq!(result, Ok(Some(Value::Long(1))));
    }

    #[test]
    fn branches_and_locals() {
        // i = 0; while (i < 5) i++; return i;
        let top = Label(0);
        let end = Label(1);
        let result = run(vec![
            Instruction::Insn(Opcode::Iconst0),
            Instruction::VarInsn(Opcode::Istore, 0),
            Instruction::Label(top),
            Instruction::VarInsn(Opcode::Iload, 0),
            Instruction::Insn(Opcode::Iconst5),
            Instruction::JumpInsn(Opcode::IfIcmpge, end),
            Instruction::Iinc { slot: 0, delta: 1 },
            Instruction::JumpInsn(Opcode::Goto, top),
            Instruction::Label(end),
            Instruction::VarInsn(Opcode::Iload, 0),
            Instruction::Insn(Opcode::Ireturn),
        ]);
        assert_eq!(result, Ok(Some(Value::Int(5))));
    }

    #[test]
    fn nan_compare_direction() {
        let result = run(vec![
            Instruction::Ldc(ConstValue::double(f64::NAN)),
            Instruction::Insn(Opcode::Dconst0),
            Instruction::Insn(Opcode::Dcmpl),
            Instruction::Insn(Opcode::Ireturn),
        ]);
        assert_eq!(result, Ok(Some(Value::Int(-1))));
    }

    #[test]
    fn concat_recipe() {
        let call = DynamicCall {
            name: "makeConcatWithConstants".to_string(),
            descriptor: "(IZLjava/lang/String;)Ljava/lang/String;".to_string(),
            bootstrap: MethodHandle {
                target: MemberRef::new("java/lang/invoke/StringConcatFactory", "makeConcatWithConstants", "()V"),
                interface: false,
            },
            bootstrap_args: vec![BootstrapArg::String("n=\u{1} \u{1}\u{1}!".to_string())],
        };
        let result = run(vec![
            Instruction::Insn(Opcode::Iconst3),
            Instruction::Insn(Opcode::Iconst1),
            Instruction::Ldc(ConstValue::String("x".to_string())),
            Instruction::InvokeDynamic(call),
            Instruction::Insn(Opcode::Areturn),
        ]);
        assert_eq!(result, Ok(Some(Value::Str("n=3 truex!".to_string()))));
    }

    #[test]
    fn printing_is_captured() {
        let mut evaluator = Evaluator::new();
        let instructions = vec![
            Instruction::FieldInsn(
                Opcode::Getstatic,
                MemberRef::new("java/lang/System", "out", "Ljava/io/PrintStream;"),
            ),
            Instruction::Insn(Opcode::Dconst1),
            Instruction::MethodInsn(
                Opcode::Invokevirtual,
                MemberRef::new("java/io/PrintStream", "println", "(D)V"),
                false,
            ),
            Instruction::Insn(Opcode::Return),
        ];
        assert_eq!(evaluator.run(&instructions, Vec::new()), Ok(None));
        assert_eq!(evaluator.output(), "1.0\n");
    }

    fn throwing_method(catch_type: Option<&str>) -> MethodArtifact {
        let (start, end, handler) = (Label(0), Label(1), Label(2));
        MethodArtifact {
            instructions: vec![
                Instruction::Label(start),
                Instruction::TypeInsn(Opcode::New, "java/lang/IllegalStateException".to_string()),
                Instruction::Insn(Opcode::Athrow),
                Instruction::Label(end),
                Instruction::Label(handler),
                Instruction::VarInsn(Opcode::Astore, 0),
                Instruction::Insn(Opcode::Iconst1),
                Instruction::Insn(Opcode::Ireturn),
            ],
            handlers: vec![ExceptionHandler {
                start,
                end,
                handler,
                catch_type: catch_type.map(str::to_string),
            }],
            ..MethodArtifact::default()
        }
    }

    #[test]
    fn exception_table_routes_throws() {
        let registry = ixion_registry::HostRegistry::with_prelude();

        let any = throwing_method(None);
        assert_eq!(Evaluator::new().run_method(&any, Vec::new()), Ok(Some(Value::Int(1))));

        let supertype = throwing_method(Some("java/lang/RuntimeException"));
        assert_eq!(
            Evaluator::new().run_method(&supertype, Vec::new()),
            Err(EvalError::Thrown("java/lang/IllegalStateException".to_string()))
        );
        assert_eq!(
            Evaluator::new()
                .with_resolver(&registry)
                .run_method(&supertype, Vec::new()),
            Ok(Some(Value::Int(1)))
        );

        let unrelated = throwing_method(Some("java/lang/IllegalArgumentException"));
        assert!(matches!(
            Evaluator::new().with_resolver(&registry).run_method(&unrelated, Vec::new()),
            Err(EvalError::Thrown(_))
        ));
        // Plain runs ignore the table.
        assert!(matches!(
            Evaluator::new().run(&any.instructions, Vec::new()),
            Err(EvalError::Thrown(_))
        ));
    }

    #[test]
    fn parameter_codes_skip_class_names() {
        assert_eq!(parameter_codes("(I[Ljava/lang/String;JLjava/lang/Object;[I)V"), vec!['I', 'L', 'J', 'L', 'L']);
    }
}
