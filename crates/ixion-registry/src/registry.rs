//! In-memory host universe.
//!
//! Uses `petgraph::DiGraph` with:
//! - Nodes: class identities ([`TypeHash`])
//! - Edges: subtype → direct supertype (superclass and interfaces)
//!
//! A supertype may be named before it is registered: its node exists as soon
//! as something points at it.

use ixion_core::{OBJECT_CLASS, TypeHash, UnresolvedHostType};
use petgraph::algo::has_path_connecting;
use petgraph::graph::{DiGraph, NodeIndex};
use rustc_hash::FxHashMap;

use crate::host::HostClassDescriptor;
use crate::resolver::HostTypeResolver;

/// A finite set of host classes.
#[derive(Debug, Default)]
pub struct HostRegistry {
    classes: FxHashMap<TypeHash, HostClassDescriptor>,
    /// Supertype graph.
    graph: DiGraph<TypeHash, ()>,
    nodes: FxHashMap<TypeHash, NodeIndex>,
}

impl HostRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the `java/lang` prelude plus the runtime's function
    /// interfaces.
    pub fn with_prelude() -> Self {
        let mut registry = Self::new();
        crate::prelude::register_prelude(&mut registry);
        registry
    }

    fn node(&mut self, hash: TypeHash) -> NodeIndex {
        if let Some(node) = self.nodes.get(&hash) {
            return *node;
        }
        let node = self.graph.add_node(hash);
        self.nodes.insert(hash, node);
        node
    }

    /// Register a class, replacing any previous class of the same name.
    pub fn register(&mut self, class: HostClassDescriptor) {
        let hash = class.hash();
        let node = self.node(hash);
        if self.classes.contains_key(&hash) {
            let stale: Vec<_> = self.graph.neighbors(node).collect();
            for target in stale {
                if let Some(edge) = self.graph.find_edge(node, target) {
                    self.graph.remove_edge(edge);
                }
            }
        }
        for parent in class.superclass.iter().chain(class.interfaces.iter()) {
            let parent = self.node(TypeHash::of(parent));
            self.graph.update_edge(node, parent, ());
        }
        self.classes.insert(hash, class);
    }

    pub fn get(&self, hash: TypeHash) -> Option<&HostClassDescriptor> {
        self.classes.get(&hash)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(&TypeHash::of(name))
    }

    pub fn classes(&self) -> impl Iterator<Item = &HostClassDescriptor> {
        self.classes.values()
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

impl HostTypeResolver for HostRegistry {
    fn resolve_host_class(&self, name: &str) -> Result<&HostClassDescriptor, UnresolvedHostType> {
        self.classes
            .get(&TypeHash::of(name))
            .ok_or_else(|| UnresolvedHostType::new(name.replace('.', "/")))
    }

    /// Reachability in the supertype graph.
    fn is_subclass(&self, sub: &str, sup: &str) -> bool {
        let (sub, sup) = (TypeHash::of(sub), TypeHash::of(sup));
        if sub == sup || sup == TypeHash::of(OBJECT_CLASS) {
            return true;
        }
        match (self.nodes.get(&sub), self.nodes.get(&sup)) {
            (Some(from), Some(to)) => has_path_connecting(&self.graph, *from, *to, None),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_dotted_and_internal_names() {
        let registry = HostRegistry::with_prelude();
        assert!(registry.resolve_host_class("java.lang.String").is_ok());
        assert!(registry.resolve_host_class("java/lang/String").is_ok());
    }

    #[test]
    fn unresolved_carries_name() {
        let registry = HostRegistry::new();
        let err = registry.resolve_host_class("java.util.Nope").unwrap_err();
        assert_eq!(err.name, "java/util/Nope");
    }

    #[test]
    fn subtype_graph() {
        let registry = HostRegistry::with_prelude();
        assert!(registry.is_subclass("java/lang/NullPointerException", "java/lang/Throwable"));
        assert!(registry.is_subclass("java/lang/String", "java/lang/CharSequence"));
        assert!(registry.is_subclass("java/lang/Integer", "java/lang/Number"));
        assert!(!registry.is_subclass("java/lang/Throwable", "java/lang/Exception"));
        assert!(!registry.is_subclass("java/lang/String", "java/lang/Integer"));
    }

    #[test]
    fn supertype_may_be_registered_later() {
        let mut registry = HostRegistry::new();
        registry.register(HostClassDescriptor::class("a/Child").extends("a/Parent"));
        assert!(registry.is_subclass("a/Child", "a/Parent"));
        registry.register(HostClassDescriptor::class("a/Parent"));
        assert!(registry.is_subclass("a/Child", "a/Parent"));
    }

    #[test]
    fn reregistering_replaces_edges() {
        let mut registry = HostRegistry::new();
        registry.register(HostClassDescriptor::class("a/Child").extends("a/First"));
        registry.register(HostClassDescriptor::class("a/Child").extends("a/Second"));
        assert!(!registry.is_subclass("a/Child", "a/First"));
        assert!(registry.is_subclass("a/Child", "a/Second"));
    }
}
