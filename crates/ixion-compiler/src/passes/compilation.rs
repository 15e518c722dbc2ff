//! Compilation Pass (Pass 2) - Emit the classes of one unit.
//!
//! This pass walks the unit's AST a second time, with every signature
//! already known from the preprocess pass, and emits:
//!
//! - The unit class: functions as static methods, globals as static
//!   fields initialized in `<clinit>`, and a `main(String[])` bridge
//! - Each declared class: fields, methods, constructors (super call, then
//!   field initializers, then the body), and `<clinit>` for static fields
//! - Each declared interface: abstract method signatures only
//! - The synthetic `lambda$N` methods spawned by any of the above, appended
//!   to the class that owns them
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │ CompilationPass::run()                       │
//! │   ├─ compile_unit_class()                    │
//! │   │    └─ compile_function() per function    │
//! │   ├─ compile_class() per declared class      │
//! │   │    ├─ check_implemented()                │
//! │   │    ├─ compile_constructor()              │
//! │   │    ├─ compile_function() per method      │
//! │   │    └─ compile_static_init()              │
//! │   └─ compile_interface() per interface       │
//! └──────────────────────────────────────────────┘
//!                      │
//!                      ▼
//!              EmissionContext per method
//!              → StmtCompiler / ExprCompiler
//! ```

use ixion_ast::{
    ClassDecl, CompilationUnit, ConstructorDecl, Expr, FunctionBody, FunctionDecl, GlobalDecl, Item, ReturnStmt,
    Stmt,
};
use ixion_core::{CompilationError, Modifiers, OBJECT_CLASS, SemanticType, Span};
use ixion_registry::HostConstructor;
use tracing::debug;

use super::declare_params;
use super::symbols::{ClassSymbol, ConstructorSymbol, FunctionSymbol, UnitSymbols, VariableSymbol, class_scope};
use crate::bytecode::{
    ClassArtifact, CompiledUnit, FieldArtifact, Instruction, MemberRef, MethodArtifact, MethodBuilder, Opcode,
};
use crate::context::{CompilationEnv, EmissionContext, EmittedMethod, OwnerClass};
use crate::conversion::is_assignable_from;
use crate::expr::{ExprCompiler, argument_infos, emit_arguments};
use crate::overload::{Policy, no_applicable_overload, rank, resolve_exact};
use crate::scope::Scope;
use crate::stmt::{StmtCompiler, compile_body};

type Result<T> = std::result::Result<T, CompilationError>;

const THROWABLE: &str = "java/lang/Throwable";
const MAIN_BRIDGE_DESCRIPTOR: &str = "([Ljava/lang/String;)V";

// ============================================================================
// Helpers
// ============================================================================

/// A class being assembled.
struct ClassOutput {
    artifact: ClassArtifact,
    next_lambda: u32,
}

impl ClassOutput {
    fn new(artifact: ClassArtifact, source_file: &str) -> Self {
        let mut artifact = artifact;
        artifact.source_file = Some(source_file.to_string());
        Self { artifact, next_lambda: 0 }
    }

    fn push(&mut self, emitted: EmittedMethod) {
        self.next_lambda = emitted.next_lambda;
        self.artifact.methods.push(emitted.method);
        self.artifact.methods.extend(emitted.lambdas);
    }

    fn add_field(&mut self, field: &VariableSymbol) -> Result<()> {
        let ty = variable_type(field)?;
        self.artifact.fields.push(FieldArtifact {
            name: field.name.clone(),
            ty,
            modifiers: field.modifiers,
        });
        Ok(())
    }
}

/// A field and the expression it is initialized with.
struct FieldInit<'s, 'e> {
    symbol: &'s VariableSymbol,
    value: &'e Expr<'e>,
}

fn variable_type(symbol: &VariableSymbol) -> Result<SemanticType> {
    symbol.ty.clone().ok_or_else(|| {
        CompilationError::internal(format!("type of '{}' was never inferred", symbol.name), symbol.span)
    })
}

fn functions_of<'u, 'ast>(unit: &'u CompilationUnit<'ast>) -> impl Iterator<Item = &'ast FunctionDecl<'ast>> + 'u {
    unit.items.iter().filter_map(|item| match item {
        Item::Function(decl) => Some(*decl),
        _ => None,
    })
}

fn globals_of<'u, 'ast>(unit: &'u CompilationUnit<'ast>) -> impl Iterator<Item = &'ast GlobalDecl<'ast>> + 'u {
    unit.items.iter().filter_map(|item| match item {
        Item::Global(decl) => Some(*decl),
        _ => None,
    })
}

fn classes_of<'u, 'ast>(unit: &'u CompilationUnit<'ast>) -> impl Iterator<Item = &'ast ClassDecl<'ast>> + 'u {
    unit.items.iter().filter_map(|item| match item {
        Item::Class(decl) => Some(*decl),
        _ => None,
    })
}

/// `main(String[])` forwarding to `main()`.
fn main_bridge(unit_class: &str) -> MethodArtifact {
    let mut bridge = MethodBuilder::new(
        "main",
        MAIN_BRIDGE_DESCRIPTOR,
        Modifiers::PUBLIC | Modifiers::STATIC | Modifiers::SYNTHETIC,
    );
    bridge.push(Instruction::MethodInsn(
        Opcode::Invokestatic,
        MemberRef::new(unit_class, "main", "()V"),
        false,
    ));
    bridge.push(Instruction::Insn(Opcode::Return));
    bridge.finish()
}

/// Store each initializer into its field. Instance fields go through `this`.
fn emit_field_inits(ctx: &mut EmissionContext<'_>, owner: &str, inits: &[FieldInit<'_, '_>]) -> Result<()> {
    for init in inits {
        let ty = variable_type(init.symbol)?;
        ctx.set_line(init.value.span());
        if init.symbol.is_static() {
            ExprCompiler::new(ctx).check(init.value, &ty)?;
            ctx.emitter.emit_field(Opcode::Putstatic, owner, &init.symbol.name, &ty);
        } else {
            ctx.emitter.load(&SemanticType::object(), 0);
            ExprCompiler::new(ctx).check(init.value, &ty)?;
            ctx.emitter.emit_field(Opcode::Putfield, owner, &init.symbol.name, &ty);
        }
    }
    Ok(())
}

// ============================================================================
// Pass
// ============================================================================

/// Emits the classes of one unit.
pub struct CompilationPass<'a> {
    env: &'a CompilationEnv<'a>,
    symbols: &'a UnitSymbols,
    /// Root scope of the unit: builtins, imports, functions and globals.
    root: &'a Scope,
}

impl<'a> CompilationPass<'a> {
    pub fn new(env: &'a CompilationEnv<'a>, symbols: &'a UnitSymbols, root: &'a Scope) -> Self {
        Self { env, symbols, root }
    }

    /// Run the pass. The first error aborts the unit.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn run(self, unit: &CompilationUnit<'_>) -> Result<CompiledUnit> {
        debug!(unit = %self.symbols.name, "compiling unit");

        let mut classes = vec![self.compile_unit_class(unit)?];
        for (decl, class) in classes_of(unit).zip(&self.symbols.classes) {
            classes.push(self.compile_class(decl, class)?);
        }
        for interface in &self.symbols.interfaces {
            classes.push(self.compile_interface(interface)?);
        }

        debug!(unit = %self.symbols.name, classes = classes.len(), "compiled unit");
        Ok(CompiledUnit {
            name: self.symbols.name.clone(),
            classes,
        })
    }

    // ==========================================================================
    // Unit class
    // ==========================================================================

    fn compile_unit_class(&self, unit: &CompilationUnit<'_>) -> Result<ClassArtifact> {
        let symbols = self.symbols;
        let owner = OwnerClass::new(&symbols.unit_class, OBJECT_CLASS);
        let mut class = ClassOutput::new(
            ClassArtifact::new(
                &symbols.unit_class,
                OBJECT_CLASS,
                Modifiers::PUBLIC | Modifiers::SUPER | Modifiers::FINAL,
            ),
            &symbols.source_file,
        );

        let mut statics = Vec::new();
        for (decl, global) in globals_of(unit).zip(&symbols.globals) {
            class.add_field(global)?;
            match decl.init {
                Some(value) => statics.push(FieldInit { symbol: global, value }),
                None => {
                    let ty = variable_type(global)?;
                    if !ty.is_primitive() && !ty.is_nullable() {
                        return Err(CompilationError::type_mismatch(
                            format!("Cannot default initialize variable of type '{ty}'"),
                            decl.span,
                        ));
                    }
                }
            }
        }

        for (decl, function) in functions_of(unit).zip(&symbols.functions) {
            let emitted = self.compile_function(&owner, self.root, decl, function, class.next_lambda)?;
            class.push(emitted);
            if function.needs_main_bridge() {
                class.artifact.methods.push(main_bridge(&symbols.unit_class));
            }
        }

        if !statics.is_empty() {
            let emitted = self.compile_static_init(&owner, self.root, &statics, class.next_lambda)?;
            class.push(emitted);
        }
        Ok(class.artifact)
    }

    // ==========================================================================
    // Functions and methods
    // ==========================================================================

    fn compile_function(
        &self,
        owner: &OwnerClass,
        scope: &Scope,
        decl: &FunctionDecl<'_>,
        function: &FunctionSymbol,
        next_lambda: u32,
    ) -> Result<EmittedMethod> {
        let Some(return_type) = function.return_type.clone() else {
            return Err(CompilationError::internal(
                format!("return type of '{}' was never inferred", function.name),
                function.span,
            ));
        };
        let descriptor = SemanticType::method(function.params.clone(), return_type.clone()).descriptor();
        let mut method = MethodBuilder::new(&function.name, descriptor, function.modifiers);
        method.set_exceptions(self.exceptions(decl, function)?);

        let mut ctx = EmissionContext::new(
            self.env,
            owner.clone(),
            scope,
            method,
            return_type.clone(),
            function.is_static(),
            next_lambda,
        );
        ctx.set_line(decl.span);
        declare_params(&mut ctx, decl.params, &function.params)?;

        match decl.body {
            FunctionBody::Block(body) => compile_body(&mut ctx, &body, &function.name, decl.span)?,
            FunctionBody::Expr(body) if return_type.is_void() => {
                ExprCompiler::new(&mut ctx).discard(body)?;
                ctx.emitter.emit(Opcode::Return);
            }
            FunctionBody::Expr(body) => {
                let ret = Stmt::Return(ReturnStmt {
                    value: Some(body),
                    span: body.span(),
                });
                StmtCompiler::new(&mut ctx).compile(&ret)?;
            }
        }
        Ok(ctx.finish())
    }

    /// Internal names of a `throws` clause, each a `Throwable` subtype.
    fn exceptions(&self, decl: &FunctionDecl<'_>, function: &FunctionSymbol) -> Result<Vec<String>> {
        let throwable = SemanticType::reference(THROWABLE);
        decl.throws
            .iter()
            .zip(&function.throws)
            .map(|(written, ty)| {
                let ty = ty.as_non_nullable();
                if !ty.is_reference() || !is_assignable_from(self.env.resolver, &throwable, &ty) {
                    return Err(CompilationError::type_mismatch(
                        format!("Thrown type must be an extension of java.lang.Throwable (got '{ty}')."),
                        written.span,
                    ));
                }
                Ok(ty.internal_name())
            })
            .collect()
    }

    fn compile_static_init(
        &self,
        owner: &OwnerClass,
        scope: &Scope,
        inits: &[FieldInit<'_, '_>],
        next_lambda: u32,
    ) -> Result<EmittedMethod> {
        let mut ctx = EmissionContext::new(
            self.env,
            owner.clone(),
            scope,
            MethodBuilder::new("<clinit>", "()V", Modifiers::STATIC),
            SemanticType::VOID,
            true,
            next_lambda,
        );
        emit_field_inits(&mut ctx, &owner.name, inits)?;
        ctx.emitter.emit(Opcode::Return);
        Ok(ctx.finish())
    }

    // ==========================================================================
    // Classes
    // ==========================================================================

    fn compile_class(&self, decl: &ClassDecl<'_>, class: &ClassSymbol) -> Result<ClassArtifact> {
        debug!(class = %class.name, superclass = %class.superclass, "compiling class");
        self.check_implemented(class)?;
        let scope = class_scope(self.root, class)?;
        let owner = OwnerClass::new(&class.name, &class.superclass);
        let mut output = ClassOutput::new(
            ClassArtifact::new(&class.name, &class.superclass, class.modifiers),
            &self.symbols.source_file,
        );
        output.artifact.interfaces = class.interfaces.clone();

        let mut instance_inits = Vec::new();
        let mut static_inits = Vec::new();
        for (field_decl, field) in decl.fields.iter().zip(&class.fields) {
            output.add_field(field)?;
            if let Some(value) = field_decl.init {
                let init = FieldInit { symbol: field, value };
                if field.is_static() {
                    static_inits.push(init);
                } else {
                    instance_inits.push(init);
                }
            }
        }

        if decl.constructors.is_empty() {
            let emitted = self.compile_constructor(&owner, &scope, class, None, &instance_inits, output.next_lambda)?;
            output.push(emitted);
        }
        for (ctor_decl, ctor) in decl.constructors.iter().zip(&class.constructors) {
            let emitted = self.compile_constructor(
                &owner,
                &scope,
                class,
                Some((ctor_decl, ctor)),
                &instance_inits,
                output.next_lambda,
            )?;
            output.push(emitted);
        }

        for (method_decl, method) in decl.methods.iter().zip(&class.methods) {
            let emitted = self.compile_function(&owner, &scope, method_decl, method, output.next_lambda)?;
            output.push(emitted);
        }

        if !static_inits.is_empty() {
            let emitted = self.compile_static_init(&owner, &scope, &static_inits, output.next_lambda)?;
            output.push(emitted);
        }
        Ok(output.artifact)
    }

    /// Every abstract method of an interface the class lists, or of one
    /// those extend, needs a public instance method with the same
    /// descriptor in the class or one of its superclasses.
    fn check_implemented(&self, class: &ClassSymbol) -> Result<()> {
        let resolver = self.env.resolver;
        let classes: Vec<_> = resolver
            .supertypes(&class.name)
            .map_err(|e| e.at(class.span))?
            .into_iter()
            .filter(|c| !c.is_interface())
            .collect();
        for listed in &class.interfaces {
            let interfaces = resolver.supertypes(listed).map_err(|e| e.at(class.span))?;
            for (interface, required) in interfaces
                .into_iter()
                .flat_map(|interface| interface.abstract_methods().map(move |m| (interface, m)))
            {
                let descriptor = required.descriptor();
                let implemented = classes.iter().any(|c| {
                    c.declared_methods(&required.name).any(|m| {
                        !m.is_static()
                            && !m.modifiers.is_abstract()
                            && !m.modifiers.is_private()
                            && m.descriptor() == descriptor
                    })
                });
                if !implemented {
                    return Err(CompilationError::type_mismatch(
                        format!(
                            "Class '{}' must implement '{}.{}{descriptor}'.",
                            class.simple_name,
                            interface.name.replace('/', "."),
                            required.name
                        ),
                        class.span,
                    ));
                }
            }
        }
        Ok(())
    }

    fn compile_interface(&self, interface: &ClassSymbol) -> Result<ClassArtifact> {
        debug!(interface = %interface.name, methods = interface.methods.len(), "compiling interface");
        let mut output = ClassOutput::new(
            ClassArtifact::new(&interface.name, OBJECT_CLASS, interface.modifiers),
            &self.symbols.source_file,
        );
        output.artifact.interfaces = interface.interfaces.clone();
        for method in &interface.methods {
            let Some(descriptor) = method.descriptor() else {
                return Err(CompilationError::internal(
                    format!("return type of '{}' was never resolved", method.name),
                    method.span,
                ));
            };
            output
                .artifact
                .methods
                .push(MethodBuilder::new(&method.name, descriptor, method.modifiers).finish());
        }
        Ok(output.artifact)
    }

    /// Emit `<init>`: the superclass constructor call, instance field
    /// initializers, then the body. `ctor` is `None` for the default
    /// constructor.
    fn compile_constructor(
        &self,
        owner: &OwnerClass,
        scope: &Scope,
        class: &ClassSymbol,
        ctor: Option<(&ConstructorDecl<'_>, &ConstructorSymbol)>,
        inits: &[FieldInit<'_, '_>],
        next_lambda: u32,
    ) -> Result<EmittedMethod> {
        let (descriptor, modifiers, span) = match ctor {
            Some((_, symbol)) => (symbol.descriptor(), symbol.modifiers, symbol.span),
            None => ("()V".to_string(), Modifiers::PUBLIC, class.span),
        };
        let mut ctx = EmissionContext::new(
            self.env,
            owner.clone(),
            scope,
            MethodBuilder::new("<init>", descriptor, modifiers),
            SemanticType::VOID,
            false,
            next_lambda,
        );
        ctx.set_line(span);

        match ctor {
            Some((decl, symbol)) => {
                declare_params(&mut ctx, decl.params, &symbol.params)?;
                self.super_call(&mut ctx, decl.super_args, false, span)?;
                emit_field_inits(&mut ctx, &owner.name, inits)?;
                compile_body(&mut ctx, &decl.body, "<init>", decl.span)?;
            }
            None => {
                self.super_call(&mut ctx, &[], true, span)?;
                emit_field_inits(&mut ctx, &owner.name, inits)?;
                ctx.emitter.emit(Opcode::Return);
            }
        }
        Ok(ctx.finish())
    }

    /// `aload_0; args; invokespecial super.<init>`.
    ///
    /// A generated default constructor needs a no-argument superclass
    /// constructor matched exactly. An explicit one ranks the superclass
    /// constructors against its `super(...)` arguments.
    fn super_call(&self, ctx: &mut EmissionContext<'_>, args: &[Expr<'_>], implicit: bool, span: Span) -> Result<()> {
        let superclass = ctx.owner.superclass.clone();
        let resolver = ctx.resolver();
        let class = resolver.resolve_host_class(&superclass).map_err(|e| e.at(span))?;
        let dotted = superclass.replace('/', ".");
        let constructors: Vec<&HostConstructor> = class
            .constructors
            .iter()
            .filter(|c| !c.modifiers.is_private())
            .collect();

        let params = if implicit {
            let Some(constructor) = resolve_exact(resolver, &constructors, &[]) else {
                return Err(CompilationError::type_mismatch(
                    format!("Cannot create default constructor: superclass '{dotted}' has no default."),
                    span,
                ));
            };
            constructor.params.clone()
        } else {
            let infos = argument_infos(&ExprCompiler::new(ctx), args)?;
            let ranked = rank(resolver, &constructors, &infos, Policy::HOST);
            let Some(best) = ranked.first() else {
                return Err(no_applicable_overload(&dotted, &infos, span));
            };
            debug!(superclass = %superclass, cost = best.cost, "resolved super constructor");
            best.candidate.params.clone()
        };

        ctx.emitter.load(&SemanticType::object(), 0);
        emit_arguments(&mut ExprCompiler::new(ctx), args, &params)?;
        let descriptor = SemanticType::method(params, SemanticType::VOID).descriptor();
        ctx.emitter
            .emit_invoke(Opcode::Invokespecial, &superclass, "<init>", &descriptor, false);
        Ok(())
    }
}
