//! Resolution of source type annotations to [`SemanticType`]s.
//!
//! Names resolve in order: primitive keywords, the unit's aliases (default
//! `java/lang` names, imports, classes declared in the program), then
//! dotted or internal class names known to the host.

use ixion_ast::TypeExpr;
use ixion_core::{CompilationError, MAX_ARRAY_DIMENSIONS, PrimitiveKind, SemanticType, Span};
use ixion_registry::HostTypeResolver;
use rustc_hash::FxHashMap;

type Result<T> = std::result::Result<T, CompilationError>;

/// Simple names visible in every unit without an import.
pub const DEFAULT_ALIASES: [&str; 13] = [
    "java/lang/String",
    "java/lang/Object",
    "java/lang/Boolean",
    "java/lang/Character",
    "java/lang/Byte",
    "java/lang/Short",
    "java/lang/Integer",
    "java/lang/Long",
    "java/lang/Float",
    "java/lang/Double",
    "java/lang/Throwable",
    "java/lang/Exception",
    "java/lang/RuntimeException",
];

/// The default alias table: simple name to internal name.
pub fn default_aliases() -> FxHashMap<String, String> {
    DEFAULT_ALIASES
        .iter()
        .map(|name| (simple_name(name).to_string(), name.to_string()))
        .collect()
}

/// Last segment of an internal or dotted class name.
pub fn simple_name(name: &str) -> &str {
    name.rsplit(['/', '.']).next().unwrap_or(name)
}

/// Maps type annotations to semantic types for one unit.
pub struct TypeResolver<'a> {
    resolver: &'a dyn HostTypeResolver,
    aliases: FxHashMap<String, String>,
}

impl<'a> TypeResolver<'a> {
    pub fn new(resolver: &'a dyn HostTypeResolver, aliases: FxHashMap<String, String>) -> Self {
        Self { resolver, aliases }
    }

    pub fn aliases(&self) -> &FxHashMap<String, String> {
        &self.aliases
    }

    /// Resolve an annotation.
    ///
    /// Array suffixes apply innermost first, so `int[]?[]` is a non-nullable
    /// array of nullable `int[]`.
    pub fn resolve(&self, ty: &TypeExpr<'_>) -> Result<SemanticType> {
        let mut resolved = match PrimitiveKind::from_keyword(ty.name) {
            Some(kind) => {
                if ty.nullable {
                    return Err(CompilationError::type_mismatch(
                        format!("Primitive type '{}' cannot be nullable.", ty.name),
                        ty.span,
                    ));
                }
                SemanticType::Primitive(kind)
            }
            None => {
                let name = self.resolve_class(ty.name, ty.span)?;
                let reference = SemanticType::reference(&name);
                if ty.nullable {
                    reference.as_nullable()
                } else {
                    reference
                }
            }
        };
        for nullable in ty.array_suffixes {
            if resolved.is_void() {
                return Err(CompilationError::type_mismatch("Cannot create an array of void.", ty.span));
            }
            resolved = SemanticType::try_array(resolved, 1).ok_or_else(|| {
                CompilationError::invalid_operation(
                    format!("Array types have at most {MAX_ARRAY_DIMENSIONS} dimensions"),
                    ty.span,
                )
            })?;
            if *nullable {
                resolved = resolved.as_nullable();
            }
        }
        Ok(resolved)
    }

    /// Internal name of a class written in source, validated against the
    /// resolver.
    pub fn resolve_class(&self, name: &str, span: Span) -> Result<String> {
        self.lookup_class(name).ok_or_else(|| CompilationError::UnresolvedHostType {
            name: name.to_string(),
            span,
        })
    }

    /// Like [`resolve_class`](Self::resolve_class) without failing.
    pub fn lookup_class(&self, name: &str) -> Option<String> {
        if let Some(internal) = self.aliases.get(name) {
            return Some(internal.clone());
        }
        self.resolver
            .resolve_host_class(name)
            .ok()
            .map(|class| class.name.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bumpalo::Bump;
    use ixion_ast::AstBuilder;
    use ixion_registry::HostRegistry;

    #[test]
    fn primitives_aliases_and_qualified_names() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let registry = HostRegistry::with_prelude();
        let types = TypeResolver::new(&registry, default_aliases());

        assert_eq!(types.resolve(&b.ty("long")).unwrap(), SemanticType::LONG);
        assert_eq!(types.resolve(&b.ty("String")).unwrap(), SemanticType::string());
        assert_eq!(
            types.resolve(&b.nullable_ty("java.util.ArrayList")).unwrap(),
            SemanticType::nullable_reference("java/util/ArrayList")
        );
    }

    #[test]
    fn array_suffixes_are_innermost_first() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let registry = HostRegistry::with_prelude();
        let types = TypeResolver::new(&registry, default_aliases());

        let ty = types.resolve(&b.array_ty("int", &[true, false])).unwrap();
        assert!(!ty.is_nullable());
        let inner = ty.element_type().unwrap();
        assert!(inner.is_nullable());
        assert_eq!(ty.descriptor(), "[[I");
    }

    #[test]
    fn array_suffixes_past_the_limit_fail() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let registry = HostRegistry::with_prelude();
        let types = TypeResolver::new(&registry, default_aliases());

        assert!(types.resolve(&b.array_ty("int", &[false; 32])).is_ok());
        let err = types.resolve(&b.array_ty("int", &[false; 33])).unwrap_err();
        assert_eq!(err.to_string(), "at 1:1: Array types have at most 32 dimensions");
    }

    #[test]
    fn unknown_and_nullable_primitive_fail() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let registry = HostRegistry::with_prelude();
        let types = TypeResolver::new(&registry, default_aliases());

        assert!(matches!(
            types.resolve(&b.ty("Missing")),
            Err(CompilationError::UnresolvedHostType { .. })
        ));
        assert!(matches!(
            types.resolve(&b.nullable_ty("int")),
            Err(CompilationError::TypeMismatch { .. })
        ));
    }
}
