//! Host type universe for the Ixion compiler.
//!
//! - [`HostTypeResolver`]: the lookup contract the compiler depends on
//! - [`HostClassDescriptor`]: fields, methods, and constructors of one class
//! - [`HostRegistry`]: an in-memory universe with a supertype graph
//! - [`LayeredResolver`]: program classes layered over host classes

mod host;
pub mod prelude;
mod registry;
mod resolver;

pub use host::{HostClassDescriptor, HostConstructor, HostField, HostMethod};
pub use prelude::{MAX_FUNCTION_ARITY, function_interface};
pub use registry::HostRegistry;
pub use resolver::{HostTypeResolver, LayeredResolver};
