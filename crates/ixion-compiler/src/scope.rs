//! Lexical scopes and the symbol table.
//!
//! A [`Scope`] maps names to variable [`Binding`]s and to overload sets of
//! [`CallableCandidate`]s. Nested blocks are entered with
//! [`Scope::next_depth`], which copies the enclosing maps so that shadowing
//! in the child never touches the parent, and carries the local-slot counter
//! forward so slots never collide within one method body.

use ixion_core::{CompilationError, SemanticType, Span, render_types};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::bytecode::MemberRef;

type Result<T> = std::result::Result<T, CompilationError>;

static VOID: SemanticType = SemanticType::VOID;

// ============================================================================
// Bindings
// ============================================================================

/// Where a binding is owned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingKind {
    Local,
    InstanceField,
    StaticField,
}

/// How a binding's value is reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Storage {
    /// Local-variable slot.
    Local(u16),
    /// Field of `owner` (internal name).
    Field { owner: String, name: String },
}

/// A named variable.
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub name: String,
    pub kind: BindingKind,
    pub ty: SemanticType,
    pub is_const: bool,
    pub storage: Storage,
    /// Declared type while `ty` holds a type narrowed by an `is` check.
    pub narrowed_from: Option<SemanticType>,
    /// Declaration site.
    pub span: Span,
}

impl Binding {
    pub fn local(name: &str, ty: SemanticType, slot: u16, is_const: bool, span: Span) -> Self {
        Self {
            name: name.to_string(),
            kind: BindingKind::Local,
            ty,
            is_const,
            storage: Storage::Local(slot),
            narrowed_from: None,
            span,
        }
    }

    pub fn field(
        name: &str,
        owner: &str,
        ty: SemanticType,
        is_static: bool,
        is_const: bool,
        span: Span,
    ) -> Self {
        Self {
            name: name.to_string(),
            kind: if is_static {
                BindingKind::StaticField
            } else {
                BindingKind::InstanceField
            },
            ty,
            is_const,
            storage: Storage::Field {
                owner: owner.to_string(),
                name: name.to_string(),
            },
            narrowed_from: None,
            span,
        }
    }

    /// Type values written to the binding must conform to.
    pub fn declared_type(&self) -> &SemanticType {
        self.narrowed_from.as_ref().unwrap_or(&self.ty)
    }

    pub fn slot(&self) -> Option<u16> {
        match self.storage {
            Storage::Local(slot) => Some(slot),
            Storage::Field { .. } => None,
        }
    }
}

// ============================================================================
// Callables
// ============================================================================

/// How a callable is invoked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// `invokestatic` on the owner.
    Static,
    /// `invokevirtual` on an instance of the owner.
    Instance,
    /// A host method bound to a static receiver (`print` → `System.out.print`):
    /// the receiver field is loaded before the arguments.
    HostLibraryBound { receiver: MemberRef },
}

/// One member of an overload set.
#[derive(Debug, Clone, PartialEq)]
pub struct CallableCandidate {
    pub name: String,
    /// Internal name of the declaring class.
    pub owner: String,
    /// Always a [`SemanticType::Method`].
    pub ty: SemanticType,
    pub dispatch: Dispatch,
    pub span: Span,
}

impl CallableCandidate {
    pub fn new(name: &str, owner: &str, params: Vec<SemanticType>, ret: SemanticType, dispatch: Dispatch) -> Self {
        Self {
            name: name.to_string(),
            owner: owner.to_string(),
            ty: SemanticType::method(params, ret),
            dispatch,
            span: Span::default(),
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn params(&self) -> &[SemanticType] {
        self.ty.method_parts().map(|(params, _)| params).unwrap_or(&[])
    }

    pub fn return_type(&self) -> &SemanticType {
        self.ty
            .method_parts()
            .map(|(_, ret)| ret)
            .unwrap_or(&VOID)
    }

    pub fn descriptor(&self) -> String {
        self.ty.descriptor()
    }
}

// ============================================================================
// Scope
// ============================================================================

/// A symbol table for one lexical block.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    variables: FxHashMap<String, Binding>,
    functions: FxHashMap<String, Vec<CallableCandidate>>,
    /// Names declared in this block rather than inherited.
    declared_here: FxHashSet<String>,
    next_local: u16,
    return_type: Option<SemanticType>,
    returned: bool,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    /// A method body scope. `first_local` is 1 for instance methods, whose
    /// slot 0 holds `this`.
    pub fn for_method(&self, return_type: SemanticType, first_local: u16) -> Scope {
        let mut scope = self.next_depth();
        scope.next_local = first_local;
        scope.return_type = Some(return_type);
        scope.returned = false;
        scope
    }

    /// Enter a nested block.
    pub fn next_depth(&self) -> Scope {
        Scope {
            variables: self.variables.clone(),
            functions: self.functions.clone(),
            declared_here: FxHashSet::default(),
            next_local: self.next_local,
            return_type: self.return_type.clone(),
            returned: false,
        }
    }

    /// Leave a nested block, keeping its slot counter.
    pub fn exit_depth(&mut self, child: &Scope) {
        self.next_local = self.next_local.max(child.next_local);
    }

    // ==========================================================================
    // Variables
    // ==========================================================================

    /// Bind a variable in this block.
    ///
    /// Redefinition within the same block is a `DuplicateBinding`; shadowing
    /// an inherited binding is allowed.
    pub fn add_variable(&mut self, binding: Binding) -> Result<()> {
        if self.declared_here.contains(&binding.name)
            && let Some(existing) = self.variables.get(&binding.name)
        {
            return Err(CompilationError::DuplicateBinding {
                name: binding.name,
                original_span: existing.span,
                span: binding.span,
            });
        }
        self.declared_here.insert(binding.name.clone());
        self.variables.insert(binding.name.clone(), binding);
        Ok(())
    }

    /// Allocate slots for a local of `ty` and bind it. Returns its slot.
    pub fn declare_local(&mut self, name: &str, ty: SemanticType, is_const: bool, span: Span) -> Result<u16> {
        if self.declared_here.contains(name)
            && let Some(existing) = self.variables.get(name)
        {
            return Err(CompilationError::DuplicateBinding {
                name: name.to_string(),
                original_span: existing.span,
                span,
            });
        }
        let slot = self.allocate(&ty);
        self.add_variable(Binding::local(name, ty, slot, is_const, span))?;
        Ok(slot)
    }

    pub fn lookup_variable(&self, name: &str) -> Option<&Binding> {
        self.variables.get(name)
    }

    /// Replace the type of a visible binding for the rest of this block.
    /// Reads of a narrowed binding are checked casts of the stored value.
    pub fn narrow(&mut self, name: &str, ty: SemanticType) {
        if let Some(binding) = self.variables.get_mut(name) {
            if binding.narrowed_from.is_none() {
                binding.narrowed_from = Some(binding.ty.clone());
            }
            binding.ty = ty;
        }
    }

    /// Undo narrowing after the binding is written.
    pub fn widen(&mut self, name: &str) {
        if let Some(binding) = self.variables.get_mut(name)
            && let Some(declared) = binding.narrowed_from.take()
        {
            binding.ty = declared;
        }
    }

    // ==========================================================================
    // Functions
    // ==========================================================================

    /// Add a candidate to its overload set.
    ///
    /// Overloads must agree on the return type and differ in parameters.
    pub fn add_function(&mut self, candidate: CallableCandidate) -> Result<()> {
        let overloads = self.functions.entry(candidate.name.clone()).or_default();
        if let Some(first) = overloads.first()
            && first.return_type() != candidate.return_type()
        {
            return Err(CompilationError::type_mismatch(
                format!(
                    "IxFunction overloads may only differ in parameters, not return type. ({} =/= {})",
                    candidate.return_type(),
                    first.return_type()
                ),
                candidate.span,
            ));
        }
        if let Some(existing) = overloads.iter().find(|c| c.params() == candidate.params()) {
            return Err(CompilationError::DuplicateBinding {
                name: format!("{}({})", candidate.name, render_types(candidate.params())),
                original_span: existing.span,
                span: candidate.span,
            });
        }
        overloads.push(candidate);
        Ok(())
    }

    /// The overload set of `name`, in declaration order.
    pub fn lookup_functions(&self, name: &str) -> &[CallableCandidate] {
        self.functions.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    // ==========================================================================
    // Locals and returns
    // ==========================================================================

    /// Next free local slot.
    pub fn next_local(&mut self) -> u16 {
        let slot = self.next_local;
        self.next_local += 1;
        slot
    }

    /// Slots for a value of `ty`: two consecutive units for wide primitives.
    pub fn allocate(&mut self, ty: &SemanticType) -> u16 {
        let slot = self.next_local();
        if ty.slot_width() == 2 {
            self.next_local();
        }
        slot
    }

    pub fn local_count(&self) -> u16 {
        self.next_local
    }

    /// Return type of the enclosing method, `None` outside any method.
    pub fn return_type(&self) -> Option<&SemanticType> {
        self.return_type.as_ref()
    }

    pub fn has_returned(&self) -> bool {
        self.returned
    }

    pub fn set_returned(&mut self, returned: bool) {
        self.returned = returned;
    }
}
