//! Preprocess Pass (Pass 1) - Collect every declared signature.
//!
//! This pass walks a unit's AST and resolves the types of all functions,
//! globals, classes and their members without emitting any code, so that
//! bodies compiled in pass 2 can refer to declarations further down the
//! file or in other units.
//!
//! ## Responsibilities
//!
//! - Name the unit class and every declared class and interface (private
//!   ones are mangled)
//! - Resolve imports: host classes become aliases, unit names become unit imports
//! - Resolve parameter, return, field and superclass types, and the
//!   interfaces each class implements
//! - Leave expression-bodied functions without a return type, and variables
//!   without a type, pending for [`infer_pending`]
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────┐
//! │ Host universe                      │  ← HostTypeResolver
//! └────────────────────────────────────┘
//!              ▲
//!              │ (layered lookup)
//!              │
//! ┌────────────────────────────────────┐
//! │ Declared class names               │  ← every unit of the program
//! └────────────────────────────────────┘
//!              ▲
//!              │
//! ┌────────────────────────────────────┐
//! │ PreprocessPass::run()              │  → UnitSymbols (some pending)
//! │ infer_pending()                    │  → UnitSymbols (complete)
//! └────────────────────────────────────┘
//! ```

use ixion_ast::{
    ClassDecl, CompilationUnit, ConstructorDecl, Expr, FieldDecl, FunctionBody, FunctionDecl, GlobalDecl,
    Ident, ImportDecl, InterfaceDecl, Item, MethodSignature, Param, TypeExpr, Visibility,
};
use ixion_core::{CompilationError, Modifiers, OBJECT_CLASS, SemanticType, Span};
use ixion_registry::HostTypeResolver;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use super::declare_params;
use super::symbols::{
    ClassSymbol, ConstructorSymbol, FunctionSymbol, UnitExports, UnitImport, UnitSymbols, VariableSymbol,
    class_scope, default_superclass, unit_scope,
};
use crate::bytecode::MethodBuilder;
use crate::context::{CompilationEnv, EmissionContext, OwnerClass};
use crate::expr::ExprCompiler;
use crate::options::CompilerOptions;
use crate::scope::Scope;
use crate::type_resolver::{TypeResolver, default_aliases};

type Result<T> = std::result::Result<T, CompilationError>;

/// Internal name of the class holding a unit's functions and globals.
pub fn unit_class_name(unit: &str, options: &CompilerOptions) -> String {
    options.qualify(&format!("{unit}ixc"))
}

/// A class or interface name declared by some unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredClass {
    pub simple_name: String,
    pub internal_name: String,
    pub is_interface: bool,
}

/// Every class and interface a unit declares, in declaration order.
pub fn declared_classes(unit: &CompilationUnit<'_>, options: &CompilerOptions) -> Vec<DeclaredClass> {
    let unit_class = unit_class_name(unit.name, options);
    unit.items
        .iter()
        .filter_map(|item| match item {
            Item::Class(class) => Some((class.name, class.visibility, false)),
            Item::Interface(interface) => Some((interface.name, interface.visibility, true)),
            _ => None,
        })
        .map(|(name, visibility, is_interface)| {
            let internal_name = match visibility {
                Visibility::Public => options.qualify(name.name),
                Visibility::Private => format!("{unit_class}PRIV{}", name.name),
            };
            DeclaredClass {
                simple_name: name.name.to_string(),
                internal_name,
                is_interface,
            }
        })
        .collect()
}

fn access(visibility: Visibility) -> Modifiers {
    match visibility {
        Visibility::Public => Modifiers::PUBLIC,
        Visibility::Private => Modifiers::PRIVATE,
    }
}

// ============================================================================
// Pass 1a: signatures
// ============================================================================

/// Collects the signatures of one unit.
pub struct PreprocessPass<'a> {
    /// Host classes layered under the names of every declared class.
    resolver: &'a dyn HostTypeResolver,
    options: &'a CompilerOptions,
    /// Units of the program, for `import other`.
    unit_names: &'a FxHashSet<String>,
}

impl<'a> PreprocessPass<'a> {
    pub fn new(
        resolver: &'a dyn HostTypeResolver,
        options: &'a CompilerOptions,
        unit_names: &'a FxHashSet<String>,
    ) -> Self {
        Self {
            resolver,
            options,
            unit_names,
        }
    }

    /// Run the pass. The first error aborts the unit.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn run(self, unit: &CompilationUnit<'_>) -> Result<UnitSymbols> {
        debug!(unit = unit.name, items = unit.items.len(), "preprocessing unit");
        let unit_class = unit_class_name(unit.name, self.options);

        let mut aliases = default_aliases();
        let mut imports = Vec::new();
        for import in unit.imports {
            match self.resolve_import(import)? {
                ResolvedImport::Unit(name) => imports.push(UnitImport {
                    name,
                    span: import.span,
                }),
                ResolvedImport::Class(internal) => {
                    aliases.insert(import.visible_name().to_string(), internal);
                }
            }
        }
        aliases.extend(
            declared_classes(unit, self.options)
                .into_iter()
                .map(|declared| (declared.simple_name, declared.internal_name)),
        );
        let types = TypeResolver::new(self.resolver, aliases);

        let mut symbols = UnitSymbols {
            name: unit.name.to_string(),
            unit_class,
            source_file: unit.file_name.to_string(),
            aliases: FxHashMap::default(),
            imports,
            functions: Vec::new(),
            globals: Vec::new(),
            classes: Vec::new(),
            interfaces: Vec::new(),
        };
        for item in unit.items {
            self.collect_item(&types, &mut symbols, item)?;
        }
        symbols.aliases = types.aliases().clone();

        debug!(
            unit = unit.name,
            functions = symbols.functions.len(),
            classes = symbols.classes.len(),
            interfaces = symbols.interfaces.len(),
            "preprocessed unit"
        );
        Ok(symbols)
    }

    fn resolve_import(&self, import: &ImportDecl<'_>) -> Result<ResolvedImport> {
        if !import.path.contains('.') && self.unit_names.contains(import.path) {
            return Ok(ResolvedImport::Unit(import.path.to_string()));
        }
        let class = self
            .resolver
            .resolve_host_class(import.path)
            .map_err(|e| e.at(import.span))?;
        Ok(ResolvedImport::Class(class.name.clone()))
    }

    fn collect_item(&self, types: &TypeResolver<'_>, symbols: &mut UnitSymbols, item: &Item<'_>) -> Result<()> {
        match item {
            Item::Function(decl) => {
                let modifiers = access(decl.visibility) | Modifiers::STATIC | Modifiers::FINAL;
                let function = self.function(types, decl, modifiers)?;
                symbols.functions.push(function);
            }
            Item::Global(decl) => {
                let global = self.global(types, decl)?;
                symbols.globals.push(global);
            }
            Item::Class(decl) => {
                let internal = types.resolve_class(decl.name.name, decl.name.span)?;
                let class = self.class(types, decl, internal)?;
                symbols.classes.push(class);
            }
            Item::Interface(decl) => {
                let internal = types.resolve_class(decl.name.name, decl.name.span)?;
                let interface = self.interface(types, decl, internal)?;
                symbols.interfaces.push(interface);
            }
        }
        Ok(())
    }

    // ==========================================================================
    // Declarations
    // ==========================================================================

    fn function(&self, types: &TypeResolver<'_>, decl: &FunctionDecl<'_>, modifiers: Modifiers) -> Result<FunctionSymbol> {
        let params = self.params(types, decl.params)?;
        let return_type = match (&decl.return_type, &decl.body) {
            (Some(ty), _) => Some(types.resolve(ty)?),
            (None, FunctionBody::Block(_)) => Some(SemanticType::VOID),
            (None, FunctionBody::Expr(_)) => None,
        };
        let throws = decl
            .throws
            .iter()
            .map(|ty| types.resolve(ty))
            .collect::<Result<Vec<_>>>()?;

        Ok(FunctionSymbol {
            name: decl.name.name.to_string(),
            params,
            return_type,
            modifiers,
            throws,
            is_exported: decl.is_exported,
            span: decl.name.span,
        })
    }

    fn params(&self, types: &TypeResolver<'_>, params: &[Param<'_>]) -> Result<Vec<SemanticType>> {
        params
            .iter()
            .map(|param| {
                let ty = types.resolve(&param.ty)?;
                if ty.is_void() {
                    return Err(CompilationError::type_mismatch(
                        format!("Parameter '{}' cannot have type void", param.name.name),
                        param.ty.span,
                    ));
                }
                Ok(ty)
            })
            .collect()
    }

    fn global(&self, types: &TypeResolver<'_>, decl: &GlobalDecl<'_>) -> Result<VariableSymbol> {
        let mut modifiers = Modifiers::PUBLIC | Modifiers::STATIC;
        if decl.is_const {
            modifiers |= Modifiers::FINAL;
        }
        let ty = self.variable_type(types, decl.name.name, decl.ty.as_ref(), decl.init, decl.span)?;
        Ok(VariableSymbol {
            name: decl.name.name.to_string(),
            ty,
            modifiers,
            is_exported: decl.is_exported,
            span: decl.name.span,
        })
    }

    fn field(&self, types: &TypeResolver<'_>, decl: &FieldDecl<'_>) -> Result<VariableSymbol> {
        let mut modifiers = access(decl.visibility);
        if decl.is_static {
            modifiers |= Modifiers::STATIC;
        }
        if decl.is_const {
            modifiers |= Modifiers::FINAL;
        }
        let ty = self.variable_type(types, decl.name.name, decl.ty.as_ref(), decl.init, decl.span)?;
        Ok(VariableSymbol {
            name: decl.name.name.to_string(),
            ty,
            modifiers,
            is_exported: false,
            span: decl.name.span,
        })
    }

    /// The annotated type, or `None` when it is inferred from `init`.
    fn variable_type(
        &self,
        types: &TypeResolver<'_>,
        name: &str,
        annotation: Option<&TypeExpr<'_>>,
        init: Option<&Expr<'_>>,
        span: Span,
    ) -> Result<Option<SemanticType>> {
        match (annotation, init) {
            (Some(annotation), _) => {
                let ty = types.resolve(annotation)?;
                if ty.is_void() {
                    return Err(CompilationError::type_mismatch(
                        format!("Variable '{name}' cannot have type void"),
                        span,
                    ));
                }
                Ok(Some(ty))
            }
            (None, Some(_)) => Ok(None),
            (None, None) => Err(CompilationError::type_mismatch(
                format!("Variable '{name}' needs a type or an initializer"),
                span,
            )),
        }
    }

    fn class(&self, types: &TypeResolver<'_>, decl: &ClassDecl<'_>, name: String) -> Result<ClassSymbol> {
        let superclass = match &decl.superclass {
            Some(ty) => self.superclass(types, ty)?,
            None => default_superclass(),
        };
        let modifiers = match decl.visibility {
            Visibility::Public => Modifiers::PUBLIC | Modifiers::SUPER,
            Visibility::Private => Modifiers::SUPER,
        };

        let fields = decl
            .fields
            .iter()
            .map(|field| self.field(types, field))
            .collect::<Result<Vec<_>>>()?;
        let methods = decl
            .methods
            .iter()
            .map(|method| {
                let mut modifiers = access(method.visibility);
                if method.is_static {
                    modifiers |= Modifiers::STATIC;
                }
                self.function(types, method, modifiers)
            })
            .collect::<Result<Vec<_>>>()?;
        let constructors = decl
            .constructors
            .iter()
            .map(|ctor| self.constructor(types, ctor))
            .collect::<Result<Vec<_>>>()?;
        let interfaces = self.interface_list(types, decl.interfaces, &decl.name)?;

        Ok(ClassSymbol {
            simple_name: decl.name.name.to_string(),
            name,
            superclass,
            interfaces,
            modifiers,
            fields,
            methods,
            constructors,
            span: decl.name.span,
        })
    }

    fn superclass(&self, types: &TypeResolver<'_>, ty: &TypeExpr<'_>) -> Result<String> {
        let resolved = types.resolve(ty)?;
        let SemanticType::Reference { name, .. } = &resolved else {
            return Err(CompilationError::type_mismatch(
                format!("Superclass must not be a primitive (got '{resolved}')."),
                ty.span,
            ));
        };
        let class = self.resolver.resolve_host_class(name).map_err(|e| e.at(ty.span))?;
        if class.is_interface() {
            return Err(CompilationError::type_mismatch(
                format!("Cannot extend interface '{}'.", resolved.as_non_nullable()),
                ty.span,
            ));
        }
        Ok(name.clone())
    }

    fn interface(&self, types: &TypeResolver<'_>, decl: &InterfaceDecl<'_>, name: String) -> Result<ClassSymbol> {
        let modifiers = match decl.visibility {
            Visibility::Public => Modifiers::PUBLIC | Modifiers::INTERFACE | Modifiers::ABSTRACT,
            Visibility::Private => Modifiers::INTERFACE | Modifiers::ABSTRACT,
        };
        let methods = decl
            .methods
            .iter()
            .map(|signature| self.signature(types, signature))
            .collect::<Result<Vec<_>>>()?;
        let interfaces = self.interface_list(types, decl.extends, &decl.name)?;

        Ok(ClassSymbol {
            simple_name: decl.name.name.to_string(),
            name,
            superclass: default_superclass(),
            interfaces,
            modifiers,
            fields: Vec::new(),
            methods,
            constructors: Vec::new(),
            span: decl.name.span,
        })
    }

    /// An abstract interface method. No return type means `void`.
    fn signature(&self, types: &TypeResolver<'_>, decl: &MethodSignature<'_>) -> Result<FunctionSymbol> {
        let return_type = match &decl.return_type {
            Some(ty) => types.resolve(ty)?,
            None => SemanticType::VOID,
        };
        Ok(FunctionSymbol {
            name: decl.name.name.to_string(),
            params: self.params(types, decl.params)?,
            return_type: Some(return_type),
            modifiers: Modifiers::PUBLIC | Modifiers::ABSTRACT,
            throws: Vec::new(),
            is_exported: false,
            span: decl.name.span,
        })
    }

    /// Internal names of an `implements` (or interface `extends`) list.
    /// Each entry must be an interface, listed once.
    fn interface_list(&self, types: &TypeResolver<'_>, list: &[TypeExpr<'_>], owner: &Ident<'_>) -> Result<Vec<String>> {
        let mut names: Vec<String> = Vec::with_capacity(list.len());
        for ty in list {
            let resolved = types.resolve(ty)?;
            let SemanticType::Reference { name, .. } = &resolved else {
                return Err(CompilationError::type_mismatch(
                    format!("Interface type must not be a primitive (got '{resolved}')."),
                    ty.span,
                ));
            };
            let class = self.resolver.resolve_host_class(name).map_err(|e| e.at(ty.span))?;
            if !class.is_interface() {
                return Err(CompilationError::type_mismatch(
                    format!("'{}' cannot implement class '{}'.", owner.name, resolved.as_non_nullable()),
                    ty.span,
                ));
            }
            if names.contains(name) {
                return Err(CompilationError::invalid_operation(
                    format!("Interface '{}' is listed twice.", resolved.as_non_nullable()),
                    ty.span,
                ));
            }
            names.push(name.clone());
        }
        Ok(names)
    }

    fn constructor(&self, types: &TypeResolver<'_>, decl: &ConstructorDecl<'_>) -> Result<ConstructorSymbol> {
        Ok(ConstructorSymbol {
            params: self.params(types, decl.params)?,
            modifiers: access(decl.visibility),
            span: decl.span,
        })
    }
}

enum ResolvedImport {
    Unit(String),
    Class(String),
}

// ============================================================================
// Pass 1b: inferred types
// ============================================================================

/// Infer the types left pending by [`PreprocessPass`], in declaration order.
///
/// Each pending expression is typed in the scope it will be compiled in,
/// holding every member resolved so far: a body can rely on declarations
/// above it and on annotated declarations anywhere.
///
/// # Arguments
///
/// * `symbols` - Symbols of `unit`, updated in place
/// * `unit` - The unit's AST
/// * `resolver` - Host universe layered under every declared class
/// * `options` - Compiler options
/// * `imports` - Exports of the units `unit` imports
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn infer_pending(
    symbols: &mut UnitSymbols,
    unit: &CompilationUnit<'_>,
    resolver: &dyn HostTypeResolver,
    options: &CompilerOptions,
    imports: &[&UnitExports],
) -> Result<()> {
    let (mut function_index, mut global_index, mut class_index) = (0, 0, 0);
    for item in unit.items {
        match item {
            Item::Function(decl) => {
                if symbols.functions[function_index].return_type.is_none()
                    && let FunctionBody::Expr(body) = decl.body
                {
                    let root = unit_scope(symbols, imports, resolver)?;
                    let inferred = Inference::new(symbols, resolver, options).expression(
                        &root,
                        OwnerClass::new(&symbols.unit_class, OBJECT_CLASS),
                        &symbols.functions[function_index],
                        decl.params,
                        body,
                    )?;
                    symbols.functions[function_index].return_type = Some(inferred);
                }
                function_index += 1;
            }
            Item::Global(decl) => {
                if symbols.globals[global_index].ty.is_none()
                    && let Some(init) = decl.init
                {
                    let root = unit_scope(symbols, imports, resolver)?;
                    let owner = OwnerClass::new(&symbols.unit_class, OBJECT_CLASS);
                    let inferred = Inference::new(symbols, resolver, options).variable(&root, owner, true, decl.name.name, init)?;
                    symbols.globals[global_index].ty = Some(inferred);
                }
                global_index += 1;
            }
            Item::Class(decl) => {
                infer_class(symbols, class_index, decl, resolver, options, imports)?;
                class_index += 1;
            }
            // Interface signatures are always written out.
            Item::Interface(_) => {}
        }
    }
    Ok(())
}

fn infer_class(
    symbols: &mut UnitSymbols,
    index: usize,
    decl: &ClassDecl<'_>,
    resolver: &dyn HostTypeResolver,
    options: &CompilerOptions,
    imports: &[&UnitExports],
) -> Result<()> {
    for (field_index, field) in decl.fields.iter().enumerate() {
        if symbols.classes[index].fields[field_index].ty.is_some() {
            continue;
        }
        let Some(init) = field.init else { continue };
        let root = unit_scope(symbols, imports, resolver)?;
        let class = &symbols.classes[index];
        let scope = class_scope(&root, class)?;
        let owner = OwnerClass::new(&class.name, &class.superclass);
        let inferred = Inference::new(symbols, resolver, options).variable(&scope, owner, field.is_static, field.name.name, init)?;
        symbols.classes[index].fields[field_index].ty = Some(inferred);
    }

    for (method_index, method) in decl.methods.iter().enumerate() {
        if symbols.classes[index].methods[method_index].return_type.is_some() {
            continue;
        }
        let FunctionBody::Expr(body) = method.body else { continue };
        let root = unit_scope(symbols, imports, resolver)?;
        let class = &symbols.classes[index];
        let scope = class_scope(&root, class)?;
        let owner = OwnerClass::new(&class.name, &class.superclass);
        let inferred = Inference::new(symbols, resolver, options).expression(
            &scope,
            owner,
            &class.methods[method_index],
            method.params,
            body,
        )?;
        symbols.classes[index].methods[method_index].return_type = Some(inferred);
    }
    Ok(())
}

/// Types expressions in a throwaway method body.
struct Inference<'a> {
    env: CompilationEnv<'a>,
}

impl<'a> Inference<'a> {
    fn new(symbols: &UnitSymbols, resolver: &'a dyn HostTypeResolver, options: &'a CompilerOptions) -> Self {
        Self {
            env: CompilationEnv {
                resolver,
                options,
                types: TypeResolver::new(resolver, symbols.aliases.clone()),
                unit_class: symbols.unit_class.clone(),
                source_file: symbols.source_file.clone(),
            },
        }
    }

    fn context<'s>(&'s self, scope: &'s Scope, owner: OwnerClass, is_static: bool) -> EmissionContext<'s> {
        let modifiers = if is_static { Modifiers::STATIC } else { Modifiers::empty() };
        EmissionContext::new(
            &self.env,
            owner,
            scope,
            MethodBuilder::new("<infer>", "()V", modifiers),
            SemanticType::VOID,
            is_static,
            0,
        )
    }

    /// Return type of an expression body.
    fn expression(
        &self,
        scope: &Scope,
        owner: OwnerClass,
        function: &FunctionSymbol,
        params: &[Param<'_>],
        body: &Expr<'_>,
    ) -> Result<SemanticType> {
        let mut ctx = self.context(scope, owner, function.is_static());
        declare_params(&mut ctx, params, &function.params)?;
        let ty = ExprCompiler::new(&mut ctx).type_of(body)?;
        debug!(function = %function.name, inferred = %ty, "inferred return type");
        Ok(if ty.is_null() {
            SemanticType::object().as_nullable()
        } else {
            ty
        })
    }

    /// Type of a variable declared without an annotation.
    fn variable(&self, scope: &Scope, owner: OwnerClass, is_static: bool, name: &str, init: &Expr<'_>) -> Result<SemanticType> {
        let mut ctx = self.context(scope, owner, is_static);
        let ty = ExprCompiler::new(&mut ctx).type_of(init)?;
        if ty.is_void() {
            return Err(CompilationError::type_mismatch(
                format!("Cannot assign void to variable '{name}'"),
                init.span(),
            ));
        }
        Ok(if ty.is_null() {
            SemanticType::object().as_nullable()
        } else {
            ty
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bumpalo::Bump;
    use ixion_ast::{AstBuilder, BinaryOp};
    use ixion_registry::HostRegistry;

    fn preprocess(unit: &CompilationUnit<'_>, registry: &HostRegistry, options: &CompilerOptions) -> Result<UnitSymbols> {
        let names = FxHashSet::default();
        PreprocessPass::new(registry, options, &names).run(unit)
    }

    #[test]
    fn functions_become_static_members_of_the_unit_class() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let registry = HostRegistry::with_prelude();
        let options = CompilerOptions::default().with_package("com.example");

        let mut hidden = b.function("hidden", &[], None, b.block(&[]));
        hidden.visibility = Visibility::Private;
        let unit = b.unit(
            "main",
            &[],
            &[
                b.function_item(b.function(
                    "twice",
                    &[b.param("x", b.ty("int"))],
                    Some(b.ty("int")),
                    b.block(&[]),
                )),
                b.function_item(hidden),
            ],
        );
        let symbols = preprocess(&unit, &registry, &options).unwrap();

        assert_eq!(symbols.unit_class, "com/example/mainixc");
        assert_eq!(symbols.functions[0].descriptor().as_deref(), Some("(I)I"));
        assert_eq!(
            symbols.functions[0].modifiers,
            Modifiers::PUBLIC | Modifiers::STATIC | Modifiers::FINAL
        );
        assert!(symbols.functions[1].modifiers.is_private());
        assert_eq!(symbols.functions[1].return_type, Some(SemanticType::VOID));
    }

    #[test]
    fn classes_are_named_and_aliased() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let registry = HostRegistry::with_prelude();
        let options = CompilerOptions::default();

        let mut secret = b.class("Secret", None, &[], &[], &[]);
        secret.visibility = Visibility::Private;
        let unit = b.unit(
            "shapes",
            &[],
            &[
                b.class_item(b.class(
                    "Point",
                    None,
                    &[b.field("x", b.ty("double"), None)],
                    &[],
                    &[],
                )),
                b.class_item(secret),
            ],
        );
        let symbols = preprocess(&unit, &registry, &options).unwrap();

        assert_eq!(symbols.classes[0].name, "Point");
        assert_eq!(symbols.classes[0].superclass, OBJECT_CLASS);
        assert_eq!(symbols.classes[1].name, "shapesixcPRIVSecret");
        assert_eq!(symbols.aliases.get("Secret").map(String::as_str), Some("shapesixcPRIVSecret"));
        assert_eq!(symbols.classes[0].fields[0].ty, Some(SemanticType::DOUBLE));
    }

    #[test]
    fn imports_alias_host_classes() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let registry = HostRegistry::with_prelude();
        let options = CompilerOptions::default();

        let unit = b.unit("main", &[b.import("java.util.ArrayList")], &[]);
        let symbols = preprocess(&unit, &registry, &options).unwrap();
        assert_eq!(
            symbols.aliases.get("ArrayList").map(String::as_str),
            Some("java/util/ArrayList")
        );

        let unit = b.unit("main", &[b.import("java.util.Missing")], &[]);
        let err = preprocess(&unit, &registry, &options).unwrap_err();
        assert!(matches!(err, CompilationError::UnresolvedHostType { .. }));
    }

    #[test]
    fn primitive_superclass_is_rejected() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let registry = HostRegistry::with_prelude();
        let options = CompilerOptions::default();

        let unit = b.unit(
            "main",
            &[],
            &[b.class_item(b.class("Bad", Some(b.ty("int")), &[], &[], &[]))],
        );
        let err = preprocess(&unit, &registry, &options).unwrap_err();
        assert_eq!(err.to_string(), "at 1:1: Superclass must not be a primitive (got 'int').");
    }

    #[test]
    fn interfaces_are_collected_apart_from_classes() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let registry = HostRegistry::with_prelude();
        let options = CompilerOptions::default();

        let mut hidden = b.interface("Hidden", &[], &[]);
        hidden.visibility = Visibility::Private;
        let unit = b.unit(
            "tasks",
            &[b.import("java.lang.Runnable")],
            &[
                b.interface_item(b.interface(
                    "Job",
                    &[b.ty("Runnable")],
                    &[b.signature("retries", &[b.param("limit", b.ty("int"))], Some(b.ty("int")))],
                )),
                b.interface_item(hidden),
                b.class_item(b.implementing(b.class("Task", None, &[], &[], &[]), &[b.ty("Runnable")])),
            ],
        );
        let symbols = preprocess(&unit, &registry, &options).unwrap();

        assert_eq!(symbols.classes.len(), 1);
        assert_eq!(symbols.classes[0].interfaces, vec!["java/lang/Runnable".to_string()]);
        let job = &symbols.interfaces[0];
        assert!(job.is_interface());
        assert_eq!(job.modifiers, Modifiers::PUBLIC | Modifiers::INTERFACE | Modifiers::ABSTRACT);
        assert_eq!(job.interfaces, vec!["java/lang/Runnable".to_string()]);
        assert_eq!(job.methods[0].descriptor().as_deref(), Some("(I)I"));
        assert_eq!(job.methods[0].modifiers, Modifiers::PUBLIC | Modifiers::ABSTRACT);
        assert_eq!(symbols.interfaces[1].name, "tasksixcPRIVHidden");
        assert!(!symbols.interfaces[1].modifiers.is_public());
        assert!(symbols.class_named("tasksixcPRIVHidden").is_some());

        let names: Vec<_> = declared_classes(&unit, &options)
            .into_iter()
            .map(|declared| (declared.simple_name, declared.is_interface))
            .collect();
        assert_eq!(
            names,
            [("Job".to_string(), true), ("Hidden".to_string(), true), ("Task".to_string(), false)]
        );
    }

    #[test]
    fn only_interfaces_can_be_implemented() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let registry = HostRegistry::with_prelude();
        let options = CompilerOptions::default();

        let runnable = b.ty("java.lang.Runnable");
        let lists: [&[TypeExpr<'_>]; 4] = [&[b.ty("String")], &[b.ty("int")], &[runnable, runnable], &[runnable]];
        let results: Vec<_> = lists
            .iter()
            .map(|interfaces| {
                let task = b.implementing(b.class("Task", None, &[], &[], &[]), interfaces);
                let unit = b.unit("main", &[], &[b.class_item(task)]);
                preprocess(&unit, &registry, &options)
            })
            .collect();

        let err = results[0].as_ref().unwrap_err();
        assert_eq!(err.to_string(), "at 1:1: 'Task' cannot implement class 'java.lang.String'.");
        let err = results[1].as_ref().unwrap_err();
        assert_eq!(err.to_string(), "at 1:1: Interface type must not be a primitive (got 'int').");
        assert!(matches!(results[2], Err(CompilationError::InvalidOperation { .. })));
        assert!(results[3].is_ok());
    }

    #[test]
    fn expression_bodies_are_inferred_in_order() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let registry = HostRegistry::with_prelude();
        let options = CompilerOptions::default();

        let unit = b.unit(
            "main",
            &[],
            &[
                b.function_item(b.expr_function(
                    "half",
                    &[b.param("x", b.ty("int"))],
                    None,
                    b.binary(b.ident("x"), BinaryOp::Div, b.double(2.0)),
                )),
                b.function_item(b.expr_function("quarter", &[], None, b.call("half", &[b.int(1)]))),
                b.global_item(b.global("greeting", None, Some(b.str("hi")))),
            ],
        );
        let mut symbols = preprocess(&unit, &registry, &options).unwrap();
        assert_eq!(symbols.functions[0].return_type, None);
        assert_eq!(symbols.globals[0].ty, None);

        infer_pending(&mut symbols, &unit, &registry, &options, &[]).unwrap();
        assert_eq!(symbols.functions[0].return_type, Some(SemanticType::DOUBLE));
        assert_eq!(symbols.functions[1].return_type, Some(SemanticType::DOUBLE));
        assert_eq!(symbols.globals[0].ty, Some(SemanticType::string()));
    }

    #[test]
    fn untyped_uninitialized_globals_are_rejected() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let registry = HostRegistry::with_prelude();
        let options = CompilerOptions::default();

        let unit = b.unit("main", &[], &[b.global_item(b.global("g", None, None))]);
        let err = preprocess(&unit, &registry, &options).unwrap_err();
        assert_eq!(err.to_string(), "at 1:1: Variable 'g' needs a type or an initializer");
    }
}
