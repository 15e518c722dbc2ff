//! Host class descriptors.
//!
//! A [`HostClassDescriptor`] is what the compiler knows about a class it does
//! not compile itself: its supertypes and its declared members, each with a
//! [`SemanticType`] and [`Modifiers`]. Classes declared in Ixion source are
//! described the same way once preprocessed, so both kinds resolve through
//! one interface.

use ixion_core::{Modifiers, SemanticType, TypeHash};

/// A declared field.
#[derive(Debug, Clone, PartialEq)]
pub struct HostField {
    pub name: String,
    pub ty: SemanticType,
    pub modifiers: Modifiers,
}

/// A declared method.
#[derive(Debug, Clone, PartialEq)]
pub struct HostMethod {
    pub name: String,
    pub params: Vec<SemanticType>,
    pub return_type: SemanticType,
    pub modifiers: Modifiers,
}

impl HostMethod {
    pub fn new(
        name: impl Into<String>,
        params: Vec<SemanticType>,
        return_type: SemanticType,
        modifiers: Modifiers,
    ) -> Self {
        Self {
            name: name.into(),
            params,
            return_type,
            modifiers,
        }
    }

    pub fn is_static(&self) -> bool {
        self.modifiers.is_static()
    }

    pub fn method_type(&self) -> SemanticType {
        SemanticType::method(self.params.clone(), self.return_type.clone())
    }

    pub fn descriptor(&self) -> String {
        self.method_type().descriptor()
    }
}

/// A declared constructor.
#[derive(Debug, Clone, PartialEq)]
pub struct HostConstructor {
    pub params: Vec<SemanticType>,
    pub modifiers: Modifiers,
}

impl HostConstructor {
    pub fn descriptor(&self) -> String {
        SemanticType::method(self.params.clone(), SemanticType::VOID).descriptor()
    }
}

/// Everything the compiler may ask about one class.
#[derive(Debug, Clone, PartialEq)]
pub struct HostClassDescriptor {
    /// Internal name (`java/lang/String`).
    pub name: String,
    /// `None` only for the root class.
    pub superclass: Option<String>,
    pub interfaces: Vec<String>,
    pub modifiers: Modifiers,
    pub fields: Vec<HostField>,
    pub methods: Vec<HostMethod>,
    pub constructors: Vec<HostConstructor>,
}

impl HostClassDescriptor {
    /// A public class extending `java/lang/Object`.
    pub fn class(name: &str) -> Self {
        let name = name.replace('.', "/");
        let superclass = (name != ixion_core::OBJECT_CLASS).then(|| ixion_core::OBJECT_CLASS.to_string());
        Self {
            name,
            superclass,
            interfaces: Vec::new(),
            modifiers: Modifiers::PUBLIC | Modifiers::SUPER,
            fields: Vec::new(),
            methods: Vec::new(),
            constructors: Vec::new(),
        }
    }

    /// A public interface.
    pub fn interface(name: &str) -> Self {
        Self {
            modifiers: Modifiers::PUBLIC | Modifiers::INTERFACE | Modifiers::ABSTRACT,
            ..Self::class(name)
        }
    }

    pub fn hash(&self) -> TypeHash {
        TypeHash::of(&self.name)
    }

    pub fn is_interface(&self) -> bool {
        self.modifiers.contains(Modifiers::INTERFACE)
    }

    pub fn semantic_type(&self) -> SemanticType {
        SemanticType::reference(&self.name)
    }

    // ==========================================================================
    // Builder
    // ==========================================================================

    pub fn extends(mut self, superclass: &str) -> Self {
        self.superclass = Some(superclass.replace('.', "/"));
        self
    }

    pub fn implements(mut self, interface: &str) -> Self {
        self.interfaces.push(interface.replace('.', "/"));
        self
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers |= modifiers;
        self
    }

    pub fn field(mut self, name: &str, ty: SemanticType, modifiers: Modifiers) -> Self {
        self.fields.push(HostField {
            name: name.to_string(),
            ty,
            modifiers,
        });
        self
    }

    /// Add a public method given by its descriptor (`(I)V`).
    ///
    /// Malformed descriptors are skipped; prelude tests cover every
    /// descriptor used.
    pub fn method(self, name: &str, descriptor: &str) -> Self {
        self.method_with(name, descriptor, Modifiers::PUBLIC)
    }

    pub fn static_method(self, name: &str, descriptor: &str) -> Self {
        self.method_with(name, descriptor, Modifiers::PUBLIC | Modifiers::STATIC)
    }

    pub fn abstract_method(self, name: &str, descriptor: &str) -> Self {
        self.method_with(name, descriptor, Modifiers::PUBLIC | Modifiers::ABSTRACT)
    }

    pub fn method_with(mut self, name: &str, descriptor: &str, modifiers: Modifiers) -> Self {
        if let Some(SemanticType::Method {
            arguments,
            return_type,
        }) = SemanticType::from_descriptor(descriptor)
        {
            self.methods
                .push(HostMethod::new(name, arguments, *return_type, modifiers));
        }
        self
    }

    pub fn constructor(mut self, params: Vec<SemanticType>) -> Self {
        self.constructors.push(HostConstructor {
            params,
            modifiers: Modifiers::PUBLIC,
        });
        self
    }

    // ==========================================================================
    // Queries on declared members
    // ==========================================================================

    pub fn declared_field(&self, name: &str) -> Option<&HostField> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn declared_methods<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a HostMethod> {
        self.methods.iter().filter(move |m| m.name == name)
    }

    pub fn abstract_methods(&self) -> impl Iterator<Item = &HostMethod> {
        self.methods
            .iter()
            .filter(|m| m.modifiers.is_abstract() && !m.is_static())
    }
}
