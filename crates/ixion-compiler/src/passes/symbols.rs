//! Declared signatures of one unit, and the scopes built from them.
//!
//! Symbols are collected by the preprocess pass in declaration order and
//! consumed twice: as [`HostClassDescriptor`]s registered in the program
//! table, so declared classes resolve like host classes, and as the
//! bindings and overload sets of the unit and class scopes.

use ixion_core::{CompilationError, Modifiers, OBJECT_CLASS, SemanticType, Span};
use ixion_registry::{HostClassDescriptor, HostConstructor, HostField, HostMethod, HostTypeResolver};
use rustc_hash::FxHashMap;

use crate::bytecode::MemberRef;
use crate::scope::{Binding, CallableCandidate, Dispatch, Scope};

type Result<T> = std::result::Result<T, CompilationError>;

const PRINT_STREAM: &str = "java/io/PrintStream";
const SYSTEM: &str = "java/lang/System";

// ============================================================================
// Members
// ============================================================================

/// A function or method signature.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionSymbol {
    pub name: String,
    pub params: Vec<SemanticType>,
    /// `None` until inferred from an expression body.
    pub return_type: Option<SemanticType>,
    pub modifiers: Modifiers,
    pub throws: Vec<SemanticType>,
    pub is_exported: bool,
    pub span: Span,
}

impl FunctionSymbol {
    pub fn is_static(&self) -> bool {
        self.modifiers.is_static()
    }

    pub fn descriptor(&self) -> Option<String> {
        let ret = self.return_type.clone()?;
        Some(SemanticType::method(self.params.clone(), ret).descriptor())
    }

    /// The overload-set entry of this function in `owner`.
    pub fn candidate(&self, owner: &str) -> Option<CallableCandidate> {
        let ret = self.return_type.clone()?;
        let dispatch = if self.is_static() {
            Dispatch::Static
        } else {
            Dispatch::Instance
        };
        Some(CallableCandidate::new(&self.name, owner, self.params.clone(), ret, dispatch).with_span(self.span))
    }

    pub fn host_method(&self) -> Option<HostMethod> {
        let ret = self.return_type.clone()?;
        Some(HostMethod::new(&self.name, self.params.clone(), ret, self.modifiers))
    }

    /// `public static void main()` gets a `main(String[])` entry point.
    pub fn needs_main_bridge(&self) -> bool {
        self.name == "main"
            && self.params.is_empty()
            && self.modifiers.contains(Modifiers::PUBLIC | Modifiers::STATIC)
            && self.return_type.as_ref().is_some_and(SemanticType::is_void)
    }
}

/// A global variable or a class field.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableSymbol {
    pub name: String,
    /// `None` until inferred from the initializer.
    pub ty: Option<SemanticType>,
    pub modifiers: Modifiers,
    pub is_exported: bool,
    pub span: Span,
}

impl VariableSymbol {
    pub fn is_static(&self) -> bool {
        self.modifiers.is_static()
    }

    pub fn is_const(&self) -> bool {
        self.modifiers.is_final()
    }

    pub fn binding(&self, owner: &str) -> Option<Binding> {
        let ty = self.ty.clone()?;
        Some(Binding::field(
            &self.name,
            owner,
            ty,
            self.is_static(),
            self.is_const(),
            self.span,
        ))
    }

    pub fn host_field(&self) -> Option<HostField> {
        Some(HostField {
            name: self.name.clone(),
            ty: self.ty.clone()?,
            modifiers: self.modifiers,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstructorSymbol {
    pub params: Vec<SemanticType>,
    pub modifiers: Modifiers,
    pub span: Span,
}

impl ConstructorSymbol {
    pub fn descriptor(&self) -> String {
        SemanticType::method(self.params.clone(), SemanticType::VOID).descriptor()
    }
}

/// A declared class or interface.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassSymbol {
    /// Name as written in source.
    pub simple_name: String,
    /// Internal name, package-qualified and mangled when private.
    pub name: String,
    /// `Object` for interfaces.
    pub superclass: String,
    /// Implemented interfaces, or extended ones for an interface.
    pub interfaces: Vec<String>,
    pub modifiers: Modifiers,
    pub fields: Vec<VariableSymbol>,
    pub methods: Vec<FunctionSymbol>,
    /// Empty when the class gets a default constructor.
    pub constructors: Vec<ConstructorSymbol>,
    pub span: Span,
}

impl ClassSymbol {
    pub fn is_interface(&self) -> bool {
        self.modifiers.contains(Modifiers::INTERFACE)
    }

    /// The class as the resolver sees it. Members whose types are still
    /// pending inference are left out.
    pub fn descriptor(&self) -> HostClassDescriptor {
        let mut class = if self.is_interface() {
            HostClassDescriptor::interface(&self.name)
        } else {
            HostClassDescriptor::class(&self.name).extends(&self.superclass)
        }
        .with_modifiers(self.modifiers);
        class.interfaces = self.interfaces.clone();
        class.fields = self.fields.iter().filter_map(VariableSymbol::host_field).collect();
        class.methods = self.methods.iter().filter_map(FunctionSymbol::host_method).collect();
        class.constructors = if self.is_interface() {
            Vec::new()
        } else if self.constructors.is_empty() {
            vec![HostConstructor {
                params: Vec::new(),
                modifiers: Modifiers::PUBLIC,
            }]
        } else {
            self.constructors
                .iter()
                .map(|c| HostConstructor {
                    params: c.params.clone(),
                    modifiers: c.modifiers,
                })
                .collect()
        };
        class
    }
}

// ============================================================================
// Units
// ============================================================================

/// Another unit named by `import`.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitImport {
    pub name: String,
    pub span: Span,
}

/// Everything one unit declares.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitSymbols {
    /// Unit name (file stem).
    pub name: String,
    /// Internal name of the class holding functions and globals.
    pub unit_class: String,
    pub source_file: String,
    /// Simple names visible in the unit: defaults, imports, own classes.
    pub aliases: FxHashMap<String, String>,
    pub imports: Vec<UnitImport>,
    pub functions: Vec<FunctionSymbol>,
    pub globals: Vec<VariableSymbol>,
    pub classes: Vec<ClassSymbol>,
    pub interfaces: Vec<ClassSymbol>,
}

impl UnitSymbols {
    /// The unit class as the resolver sees it: functions as static methods,
    /// globals as static fields.
    pub fn unit_descriptor(&self) -> HostClassDescriptor {
        let mut class = HostClassDescriptor::class(&self.unit_class)
            .with_modifiers(Modifiers::PUBLIC | Modifiers::SUPER | Modifiers::FINAL);
        class.fields = self.globals.iter().filter_map(VariableSymbol::host_field).collect();
        class.methods = self.functions.iter().filter_map(FunctionSymbol::host_method).collect();
        class
    }

    /// What an importing unit sees.
    pub fn exports(&self) -> UnitExports {
        UnitExports {
            unit_class: self.unit_class.clone(),
            functions: self
                .functions
                .iter()
                .filter(|f| f.is_exported)
                .filter_map(|f| f.candidate(&self.unit_class))
                .collect(),
            globals: self
                .globals
                .iter()
                .filter(|g| g.is_exported)
                .filter_map(|g| g.binding(&self.unit_class))
                .collect(),
        }
    }

    pub fn class_named(&self, name: &str) -> Option<&ClassSymbol> {
        self.classes.iter().chain(&self.interfaces).find(|c| c.name == name)
    }
}

/// Exported functions and globals of one unit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnitExports {
    pub unit_class: String,
    pub functions: Vec<CallableCandidate>,
    pub globals: Vec<Binding>,
}

// ============================================================================
// Scopes
// ============================================================================

/// `print`/`println` in every unit, bound to `System.out`.
pub fn builtins(resolver: &dyn HostTypeResolver) -> Vec<CallableCandidate> {
    let Ok(stream) = resolver.resolve_host_class(PRINT_STREAM) else {
        return Vec::new();
    };
    let receiver = MemberRef::new(SYSTEM, "out", &SemanticType::reference(PRINT_STREAM).descriptor());
    stream
        .methods
        .iter()
        .filter(|m| !m.is_static() && (m.name == "print" || m.name == "println"))
        .map(|m| {
            CallableCandidate::new(
                &m.name,
                PRINT_STREAM,
                m.params.clone(),
                m.return_type.clone(),
                Dispatch::HostLibraryBound {
                    receiver: receiver.clone(),
                },
            )
        })
        .collect()
}

/// Root scope of a unit: builtins, imported exports, then the unit's own
/// functions and globals. Members still pending inference are skipped.
pub fn unit_scope(
    symbols: &UnitSymbols,
    imports: &[&UnitExports],
    resolver: &dyn HostTypeResolver,
) -> Result<Scope> {
    let mut scope = Scope::new();
    for builtin in builtins(resolver) {
        scope.add_function(builtin)?;
    }
    for exports in imports {
        for function in &exports.functions {
            scope.add_function(function.clone())?;
        }
        for global in &exports.globals {
            scope.add_variable(global.clone())?;
        }
    }
    for function in &symbols.functions {
        if let Some(candidate) = function.candidate(&symbols.unit_class) {
            scope.add_function(candidate)?;
        }
    }
    for global in &symbols.globals {
        if let Some(binding) = global.binding(&symbols.unit_class) {
            scope.add_variable(binding)?;
        }
    }
    Ok(scope)
}

/// Scope of a class body, nested in its unit's scope.
pub fn class_scope(root: &Scope, class: &ClassSymbol) -> Result<Scope> {
    let mut scope = root.next_depth();
    for field in &class.fields {
        if let Some(binding) = field.binding(&class.name) {
            scope.add_variable(binding)?;
        }
    }
    for method in &class.methods {
        if let Some(candidate) = method.candidate(&class.name) {
            scope.add_function(candidate)?;
        }
    }
    Ok(scope)
}

/// `Object` unless a superclass is declared.
pub fn default_superclass() -> String {
    OBJECT_CLASS.to_string()
}
