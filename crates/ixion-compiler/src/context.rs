//! Compilation state shared by the expression and statement compilers.
//!
//! [`CompilationEnv`] holds what is fixed for a whole unit: the host
//! resolver, options, and the unit's type aliases. [`EmissionContext`] is
//! the state of one method body being emitted: its scope, its emitter, the
//! enclosing loops, and the sentinel label of an open null-safe chain.

use std::mem;

use ixion_ast::TypeExpr;
use ixion_core::{CompilationError, SemanticType, Span};
use ixion_registry::HostTypeResolver;

use crate::bytecode::{Label, MethodArtifact, MethodBuilder};
use crate::emit::{BytecodeEmitter, LoopStack};
use crate::options::{CompilerOptions, OptimizationFlags};
use crate::scope::Scope;
use crate::type_resolver::TypeResolver;

type Result<T> = std::result::Result<T, CompilationError>;

// ============================================================================
// Unit environment
// ============================================================================

/// Per-unit environment.
pub struct CompilationEnv<'a> {
    pub resolver: &'a dyn HostTypeResolver,
    pub options: &'a CompilerOptions,
    pub types: TypeResolver<'a>,
    /// Internal name of the unit class holding functions and globals.
    pub unit_class: String,
    pub source_file: String,
}

impl<'a> CompilationEnv<'a> {
    pub fn optimizes(&self, flag: OptimizationFlags) -> bool {
        self.options.optimizes(flag)
    }
}

/// The class whose member is being compiled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerClass {
    pub name: String,
    pub superclass: String,
}

impl OwnerClass {
    pub fn new(name: impl Into<String>, superclass: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            superclass: superclass.into(),
        }
    }

    pub fn semantic_type(&self) -> SemanticType {
        SemanticType::reference(&self.name)
    }
}

// ============================================================================
// Method state
// ============================================================================

/// The parts of an [`EmissionContext`] that belong to one method body.
/// Lambdas swap them out while their synthetic method is compiled.
pub struct MethodState {
    pub scope: Scope,
    pub emitter: BytecodeEmitter,
    pub loops: LoopStack,
    pub null_sentinel: Option<Label>,
    pub is_static: bool,
    saved_scopes: Vec<Scope>,
}

impl MethodState {
    pub fn new(scope: Scope, emitter: BytecodeEmitter, is_static: bool) -> Self {
        Self {
            scope,
            emitter,
            loops: LoopStack::new(),
            null_sentinel: None,
            is_static,
            saved_scopes: Vec::new(),
        }
    }
}

/// Output of one compiled method: the method and the lambdas it spawned.
#[derive(Debug)]
pub struct EmittedMethod {
    pub method: MethodArtifact,
    pub lambdas: Vec<MethodArtifact>,
    /// Counter to continue lambda numbering from.
    pub next_lambda: u32,
}

// ============================================================================
// Emission context
// ============================================================================

/// State for emitting one method body.
pub struct EmissionContext<'a> {
    pub env: &'a CompilationEnv<'a>,
    pub owner: OwnerClass,
    /// Scope of the enclosing class or unit, used as the root of lambdas.
    pub class_scope: &'a Scope,
    pub scope: Scope,
    pub emitter: BytecodeEmitter,
    pub loops: LoopStack,
    /// Shared exit label of the null-safe chain whose receiver is being
    /// emitted.
    pub null_sentinel: Option<Label>,
    pub is_static: bool,
    saved_scopes: Vec<Scope>,
    lambdas: Vec<MethodArtifact>,
    next_lambda: u32,
}

impl<'a> EmissionContext<'a> {
    /// Start a method body.
    ///
    /// # Arguments
    ///
    /// * `env` - Unit environment
    /// * `owner` - Class the method belongs to
    /// * `class_scope` - Scope the body is nested in
    /// * `method` - Sink of the method's instructions
    /// * `return_type` - Declared or inferred return type
    /// * `is_static` - Static methods have no `this` in slot 0
    /// * `next_lambda` - First free `lambda$N` index in the owner
    pub fn new(
        env: &'a CompilationEnv<'a>,
        owner: OwnerClass,
        class_scope: &'a Scope,
        method: MethodBuilder,
        return_type: SemanticType,
        is_static: bool,
        next_lambda: u32,
    ) -> Self {
        let first_local = if is_static { 0 } else { 1 };
        Self {
            env,
            owner,
            class_scope,
            scope: class_scope.for_method(return_type, first_local),
            emitter: BytecodeEmitter::new(method, env.options.emit_line_numbers),
            loops: LoopStack::new(),
            null_sentinel: None,
            is_static,
            saved_scopes: Vec::new(),
            lambdas: Vec::new(),
            next_lambda,
        }
    }

    pub fn resolver(&self) -> &'a dyn HostTypeResolver {
        self.env.resolver
    }

    pub fn optimizes(&self, flag: OptimizationFlags) -> bool {
        self.env.optimizes(flag)
    }

    pub fn resolve_type(&self, ty: &TypeExpr<'_>) -> Result<SemanticType> {
        self.env.types.resolve(ty)
    }

    pub fn set_line(&mut self, span: Span) {
        self.emitter.set_line(span.line);
    }

    /// The body being emitted is a constructor.
    pub fn in_constructor(&self) -> bool {
        self.emitter.method().name == "<init>"
    }

    /// Fail unless `this` exists in the current body.
    pub fn require_instance(&self, what: &str, span: Span) -> Result<()> {
        if self.is_static {
            return Err(CompilationError::illegal_control_flow(
                format!("Cannot use '{what}' in a static context."),
                span,
            ));
        }
        Ok(())
    }

    // ==========================================================================
    // Scopes
    // ==========================================================================

    /// Enter a nested block.
    pub fn enter_scope(&mut self) {
        let child = self.scope.next_depth();
        let parent = mem::replace(&mut self.scope, child);
        self.saved_scopes.push(parent);
    }

    /// Leave the innermost block and return it, so callers can inspect its
    /// return state.
    pub fn exit_scope(&mut self) -> Scope {
        match self.saved_scopes.pop() {
            Some(parent) => {
                let child = mem::replace(&mut self.scope, parent);
                self.scope.exit_depth(&child);
                child
            }
            None => self.scope.clone(),
        }
    }

    // ==========================================================================
    // Lambdas
    // ==========================================================================

    /// Reserve the name of the next synthetic lambda method.
    pub fn reserve_lambda(&mut self) -> String {
        let name = format!("lambda${}", self.next_lambda);
        self.next_lambda += 1;
        name
    }

    pub fn push_lambda(&mut self, method: MethodArtifact) {
        self.lambdas.push(method);
    }

    /// Swap the method-local state, returning the previous one.
    pub fn swap_method(&mut self, state: MethodState) -> MethodState {
        MethodState {
            scope: mem::replace(&mut self.scope, state.scope),
            emitter: mem::replace(&mut self.emitter, state.emitter),
            loops: mem::replace(&mut self.loops, state.loops),
            null_sentinel: mem::replace(&mut self.null_sentinel, state.null_sentinel),
            is_static: mem::replace(&mut self.is_static, state.is_static),
            saved_scopes: mem::replace(&mut self.saved_scopes, state.saved_scopes),
        }
    }

    pub fn finish(self) -> EmittedMethod {
        EmittedMethod {
            method: self.emitter.finish(),
            lambdas: self.lambdas,
            next_lambda: self.next_lambda,
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Builds a context over the prelude for expression and statement tests.

    use super::*;
    use crate::type_resolver::default_aliases;
    use ixion_core::Modifiers;
    use ixion_registry::HostRegistry;

    pub struct Fixture {
        pub registry: HostRegistry,
        pub options: CompilerOptions,
    }

    impl Fixture {
        pub fn new() -> Self {
            Self::with_options(CompilerOptions::default().with_line_numbers(false))
        }

        pub fn with_options(options: CompilerOptions) -> Self {
            Self {
                registry: HostRegistry::with_prelude(),
                options,
            }
        }

        pub fn env(&self) -> CompilationEnv<'_> {
            CompilationEnv {
                resolver: &self.registry,
                options: &self.options,
                types: TypeResolver::new(&self.registry, default_aliases()),
                unit_class: "mainixc".to_string(),
                source_file: "main.ix".to_string(),
            }
        }
    }

    /// A static `()V` body in `mainixc`.
    pub fn static_context<'a>(env: &'a CompilationEnv<'a>, scope: &'a Scope) -> EmissionContext<'a> {
        EmissionContext::new(
            env,
            OwnerClass::new("mainixc", "java/lang/Object"),
            scope,
            MethodBuilder::new("test", "()V", Modifiers::PUBLIC | Modifiers::STATIC),
            SemanticType::VOID,
            true,
            0,
        )
    }
}
