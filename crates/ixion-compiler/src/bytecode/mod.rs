//! Bytecode types for the stack-machine target.
//!
//! - [`Opcode`]: target opcodes with their numbering
//! - [`Instruction`]: one structured instruction, label, or line marker
//! - [`MethodBuilder`]: the instruction sink of the method being emitted
//! - [`ClassArtifact`]: compiled classes handed to a [`TargetEmitter`]
//! - [`eval`]: a small evaluator used to check emitted code by running it

mod artifact;
pub mod eval;
mod instruction;
mod method;
mod opcode;

pub use artifact::{
    ClassArtifact, CompiledUnit, FieldArtifact, ListingEmitter, MethodArtifact, TargetEmitter,
};
pub use instruction::{BootstrapArg, DynamicCall, ExceptionHandler, Instruction, Label, MemberRef, MethodHandle};
pub use method::MethodBuilder;
pub use opcode::{Opcode, newarray_type_code};
