//! Ixion semantic resolution and code generation.
//!
//! Takes parsed [`ast::CompilationUnit`]s, resolves them against a host
//! universe of classes ([`registry`]) and emits stack bytecode artifacts
//! ([`compiler::bytecode`]).
//!
//! ```ignore
//! use ixion::prelude::*;
//!
//! let host = HostRegistry::with_prelude();
//! let compiler = Compiler::new(&host, CompilerOptions::default());
//! let output = compiler.compile_program(&units);
//! for error in &output.errors {
//!     eprintln!("{error}");
//! }
//! ```

pub use ixion_ast as ast;
pub use ixion_compiler as compiler;
pub use ixion_core as core;
pub use ixion_registry as registry;

// Re-export main types
pub mod prelude {
    pub use ixion_ast::{AstBuilder, CompilationUnit};
    pub use ixion_compiler::bytecode::{ClassArtifact, CompiledUnit, Instruction, MethodArtifact, Opcode};
    pub use ixion_compiler::{Compiler, CompilerOptions, ProgramOutput, UnitError};
    pub use ixion_core::{CompilationError, Modifiers, SemanticType, Span};
    pub use ixion_registry::{HostClassDescriptor, HostRegistry, HostTypeResolver, LayeredResolver};
}
