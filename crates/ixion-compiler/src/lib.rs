//! Ixion Compiler
//!
//! Semantic resolution and code generation for Ixion units. The output is
//! stack bytecode for a JVM-style target, described by [`bytecode`]
//! artifacts rather than class files.
//!
//! ## Architecture
//!
//! - **Pass 1 (Preprocess)**: collect every declared signature, then infer
//!   the types left pending by expression bodies and untyped variables
//! - **Pass 2 (Compilation)**: type check bodies and emit instructions,
//!   one unit per worker
//!
//! ## Modules
//!
//! - [`bytecode`]: Instructions, opcodes, and the emitted artifacts
//! - [`context`]: Per-unit environment and per-method emission state
//! - [`conversion`]: Assignability and conversion costs
//! - [`emit`]: Bytecode emitter with typed helpers
//! - [`expr`]: Expression compiler
//! - [`options`]: Compiler options
//! - [`overload`]: Overload resolution for calls
//! - [`passes`]: Preprocess and compilation passes
//! - [`program`]: Multi-unit driver
//! - [`scope`]: Lexical scopes, bindings, and callables
//! - [`stmt`]: Statement compiler
//! - [`type_resolver`]: Type resolution from AST to semantic types

pub mod bytecode;
pub mod context;
pub mod conversion;
pub mod emit;
pub mod expr;
pub mod options;
pub mod overload;
pub mod passes;
pub mod program;
pub mod scope;
pub mod stmt;
pub mod type_resolver;

pub use bytecode::{ClassArtifact, CompiledUnit, FieldArtifact, Instruction, MemberRef, MethodArtifact, Opcode};
pub use context::{CompilationEnv, EmissionContext};
pub use conversion::{ConversionKind, classify};
pub use emit::BytecodeEmitter;
pub use expr::ExprCompiler;
pub use options::CompilerOptions;
pub use overload::{ArgInfo, Policy, resolve};
pub use program::{Compiler, ProgramOutput, ProgramTable, UnitError};
pub use scope::{Binding, CallableCandidate, Scope};
pub use stmt::StmtCompiler;
pub use type_resolver::TypeResolver;

// Re-export CompilationError from core for convenience
pub use ixion_core::CompilationError;
