//! The host type resolver contract.
//!
//! The compiler never touches a class loader. Everything it needs to know about
//! classes it does not compile comes through [`HostTypeResolver`], which makes
//! the engine testable against a small, fake host universe.

use ixion_core::{OBJECT_CLASS, UnresolvedHostType};

use crate::host::{HostClassDescriptor, HostField, HostMethod};

/// Lookup of host classes by internal name.
///
/// Only `resolve_host_class` is required. The provided methods walk
/// supertypes through it; implementations with a faster index may override
/// them.
pub trait HostTypeResolver: Sync {
    /// Resolve a class by internal (`a/b/C`) or dotted name.
    fn resolve_host_class(&self, name: &str) -> Result<&HostClassDescriptor, UnresolvedHostType>;

    /// Whether `sub` is `sup` or one of its subtypes.
    ///
    /// Unresolvable classes are related to nothing but themselves and
    /// `java/lang/Object`.
    fn is_subclass(&self, sub: &str, sup: &str) -> bool {
        if sub == sup || sup == OBJECT_CLASS {
            return true;
        }
        let mut pending = vec![sub.to_string()];
        let mut seen: Vec<String> = Vec::new();
        while let Some(current) = pending.pop() {
            if seen.contains(&current) {
                continue;
            }
            let Ok(class) = self.resolve_host_class(&current) else {
                seen.push(current);
                continue;
            };
            for parent in class.superclass.iter().chain(class.interfaces.iter()) {
                if parent == sup {
                    return true;
                }
                pending.push(parent.clone());
            }
            seen.push(current);
        }
        false
    }

    /// Supertype chain starting at `name`: the class, its superclasses, then
    /// every interface reachable from them, without duplicates.
    fn supertypes(&self, name: &str) -> Result<Vec<&HostClassDescriptor>, UnresolvedHostType> {
        let mut classes: Vec<&HostClassDescriptor> = Vec::new();
        let mut current = Some(name.to_string());
        while let Some(next) = current {
            let class = self.resolve_host_class(&next)?;
            if classes.iter().any(|c| c.name == class.name) {
                break;
            }
            classes.push(class);
            current = class.superclass.clone();
        }
        let mut index = 0;
        while index < classes.len() {
            let interfaces = classes[index].interfaces.clone();
            for interface in interfaces {
                if let Ok(itf) = self.resolve_host_class(&interface)
                    && !classes.iter().any(|c| c.name == itf.name)
                {
                    classes.push(itf);
                }
            }
            index += 1;
        }
        Ok(classes)
    }

    /// Methods named `name` visible on `owner`, nearest declaration first,
    /// paired with their declaring class.
    fn find_methods(
        &self,
        owner: &str,
        name: &str,
    ) -> Result<Vec<(&HostClassDescriptor, &HostMethod)>, UnresolvedHostType> {
        let mut found: Vec<(&HostClassDescriptor, &HostMethod)> = Vec::new();
        for class in self.supertypes(owner)? {
            for method in class.declared_methods(name) {
                let overridden = found
                    .iter()
                    .any(|(_, m)| m.params == method.params);
                if !overridden {
                    found.push((class, method));
                }
            }
        }
        Ok(found)
    }

    /// A field visible on `owner`, with its declaring class.
    fn find_field(
        &self,
        owner: &str,
        name: &str,
    ) -> Result<Option<(&HostClassDescriptor, &HostField)>, UnresolvedHostType> {
        for class in self.supertypes(owner)? {
            if let Some(field) = class.declared_field(name) {
                return Ok(Some((class, field)));
            }
        }
        Ok(None)
    }

    /// The single abstract method of a functional interface.
    fn functional_method(&self, interface: &str) -> Option<&HostMethod> {
        let class = self.resolve_host_class(interface).ok()?;
        if !class.is_interface() {
            return None;
        }
        let supertypes = self.supertypes(interface).ok()?;
        let mut abstract_methods = supertypes
            .into_iter()
            .filter(|c| c.is_interface())
            .flat_map(|c| c.abstract_methods());
        let method = abstract_methods.next()?;
        abstract_methods.next().is_none().then_some(method)
    }
}

/// Two resolvers searched in order: `first`, then `second`.
///
/// The compiler layers the classes declared in the program over the host
/// universe so both resolve by name.
pub struct LayeredResolver<'a> {
    first: &'a dyn HostTypeResolver,
    second: &'a dyn HostTypeResolver,
}

impl<'a> LayeredResolver<'a> {
    pub fn new(first: &'a dyn HostTypeResolver, second: &'a dyn HostTypeResolver) -> Self {
        Self { first, second }
    }
}

impl HostTypeResolver for LayeredResolver<'_> {
    fn resolve_host_class(&self, name: &str) -> Result<&HostClassDescriptor, UnresolvedHostType> {
        match self.first.resolve_host_class(name) {
            Ok(class) => Ok(class),
            Err(_) => self.second.resolve_host_class(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HostRegistry;

    #[test]
    fn find_methods_prefers_nearest_override() {
        let registry = HostRegistry::with_prelude();
        let methods = registry.find_methods("java/lang/String", "equals").unwrap();
        assert_eq!(methods.len(), 1);
        assert_eq!(methods[0].0.name, "java/lang/String");
    }

    #[test]
    fn inherited_methods_are_found() {
        let registry = HostRegistry::with_prelude();
        let methods = registry.find_methods("java/lang/Integer", "hashCode").unwrap();
        assert_eq!(methods[0].0.name, "java/lang/Object");
    }

    #[test]
    fn functional_interfaces() {
        let registry = HostRegistry::with_prelude();
        assert_eq!(
            registry.functional_method("java/lang/Runnable").map(|m| m.name.as_str()),
            Some("run")
        );
        assert!(registry.functional_method("java/lang/String").is_none());
        assert!(registry.functional_method("java/lang/CharSequence").is_none());
    }

    #[test]
    fn layered_lookup_falls_through() {
        let host = HostRegistry::with_prelude();
        let mut program = HostRegistry::new();
        program.register(HostClassDescriptor::class("app/Dog").extends("app/Animal"));
        program.register(HostClassDescriptor::class("app/Animal"));
        let layered = LayeredResolver::new(&program, &host);
        assert!(layered.resolve_host_class("java/lang/String").is_ok());
        assert!(layered.is_subclass("app/Dog", "app/Animal"));
        assert!(layered.is_subclass("app/Dog", "java/lang/Object"));
        assert!(!layered.is_subclass("app/Animal", "app/Dog"));
        assert!(layered.resolve_host_class("app/Cat").is_err());
    }
}
