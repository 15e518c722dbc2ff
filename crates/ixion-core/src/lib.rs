//! Core types shared by every Ixion crate.
//!
//! This crate holds the pieces with no compiler logic of their own: source
//! spans, class identities, the semantic type model, constants, modifier
//! flags, and the error taxonomy.

mod constant;
mod error;
mod modifiers;
mod span;
mod type_hash;
pub mod types;

pub use constant::ConstValue;
pub use error::{CompilationError, UnresolvedHostType};
pub use modifiers::Modifiers;
pub use span::Span;
pub use type_hash::TypeHash;
pub use types::{MAX_ARRAY_DIMENSIONS, OBJECT_CLASS, PrimitiveKind, STRING_CLASS, SemanticType, get_larger, render_types};
