//! Error types for semantic resolution and code generation.
//!
//! ## Error Hierarchy
//!
//! ```text
//! CompilationError        - everything raised while preprocessing or emitting a unit
//! UnresolvedHostType      - a host class lookup failed (no span yet)
//! ```
//!
//! Host lookups happen deep inside the registry, which has no idea where in the
//! source the lookup came from. They return [`UnresolvedHostType`], and the
//! compiler attaches the span at the call site:
//!
//! ```ignore
//! let class = resolver.resolve_host_class(name).map_err(|e| e.at(span))?;
//! ```

use thiserror::Error;

use crate::Span;

// ============================================================================
// Host lookup errors
// ============================================================================

/// A qualified class name the host universe does not know.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unresolved host type '{name}'")]
pub struct UnresolvedHostType {
    /// The attempted name, in internal form.
    pub name: String,
}

impl UnresolvedHostType {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Attach the source position of the failed lookup.
    pub fn at(self, span: Span) -> CompilationError {
        CompilationError::UnresolvedHostType {
            name: self.name.replace('/', "."),
            span,
        }
    }
}

// ============================================================================
// Compilation errors
// ============================================================================

/// Errors raised during preprocessing or emission of a compilation unit.
///
/// One error aborts the current unit. Every variant carries the span of the
/// offending token.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompilationError {
    /// A host class could not be resolved.
    #[error("at {span}: unresolved host type '{name}'")]
    UnresolvedHostType { name: String, span: Span },

    /// No overload accepts the argument types.
    #[error("at {span}: Could not resolve function '{name}' with arguments: {arguments}")]
    NoApplicableOverload {
        name: String,
        /// Rendered argument type list.
        arguments: String,
        span: Span,
    },

    /// Several overloads tie. Resolution currently keeps the first declared
    /// candidate, so this is never raised by the overload resolver.
    #[error("at {span}: ambiguous call to '{name}' with arguments: {arguments}")]
    AmbiguousOverload {
        name: String,
        arguments: String,
        span: Span,
    },

    /// A name was bound twice in one lexical block.
    #[error("at {span}: '{name}' is already defined (first defined at {original_span})")]
    DuplicateBinding {
        name: String,
        original_span: Span,
        span: Span,
    },

    /// An assignability failure at a declaration, return, or assignment site.
    #[error("at {span}: {message}")]
    TypeMismatch { message: String, span: Span },

    /// The target of an assignment or update cannot be written.
    #[error("at {span}: {message}")]
    InvalidLValue { message: String, span: Span },

    /// `break`/`continue`/`this`/`super` outside a valid enclosing construct.
    #[error("at {span}: {message}")]
    IllegalControlFlow { message: String, span: Span },

    /// An operator or construct applied to unsupported types.
    #[error("at {span}: {message}")]
    InvalidOperation { message: String, span: Span },

    #[error("at {span}: unknown variable '{name}'")]
    UnknownVariable { name: String, span: Span },

    /// A field, method, or property that the owner type does not declare.
    #[error("at {span}: Could not resolve field '{name}' in class '{owner}'")]
    UnknownMember {
        owner: String,
        name: String,
        span: Span,
    },

    /// A non-void function body can complete without returning.
    #[error("at {span}: Non-void function must return a value. ('{name}')")]
    MissingReturn { name: String, span: Span },

    /// Internal compiler error.
    #[error("at {span}: internal error: {message}")]
    Internal { message: String, span: Span },
}

impl CompilationError {
    /// Get the span where this error occurred.
    pub fn span(&self) -> Span {
        match self {
            CompilationError::UnresolvedHostType { span, .. }
            | CompilationError::NoApplicableOverload { span, .. }
            | CompilationError::AmbiguousOverload { span, .. }
            | CompilationError::DuplicateBinding { span, .. }
            | CompilationError::TypeMismatch { span, .. }
            | CompilationError::InvalidLValue { span, .. }
            | CompilationError::IllegalControlFlow { span, .. }
            | CompilationError::InvalidOperation { span, .. }
            | CompilationError::UnknownVariable { span, .. }
            | CompilationError::UnknownMember { span, .. }
            | CompilationError::MissingReturn { span, .. }
            | CompilationError::Internal { span, .. } => *span,
        }
    }

    pub fn type_mismatch(message: impl Into<String>, span: Span) -> Self {
        CompilationError::TypeMismatch {
            message: message.into(),
            span,
        }
    }

    pub fn invalid_operation(message: impl Into<String>, span: Span) -> Self {
        CompilationError::InvalidOperation {
            message: message.into(),
            span,
        }
    }

    pub fn invalid_lvalue(message: impl Into<String>, span: Span) -> Self {
        CompilationError::InvalidLValue {
            message: message.into(),
            span,
        }
    }

    pub fn illegal_control_flow(message: impl Into<String>, span: Span) -> Self {
        CompilationError::IllegalControlFlow {
            message: message.into(),
            span,
        }
    }

    pub fn internal(message: impl Into<String>, span: Span) -> Self {
        CompilationError::Internal {
            message: message.into(),
            span,
        }
    }
}
