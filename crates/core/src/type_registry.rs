//! `TypeRegistry`: namespace-scoped type declarations with anti-shadowing
//! (§3, §4.3). Grounded on
//! `original_source/compiler/src/commons/type_registry.h` — types, unlike
//! functions, do not support overloads.

use std::collections::{HashMap, HashSet};

use crate::namespace::{NamespaceHierarchy, GLOBAL_NAMESPACE};
use crate::string_table::StringIndex;

/// A declared type's metadata. Kept intentionally small: semantic
/// type-checking is a later-layer concern (spec.md §1 Non-goals); this
/// registry only needs enough to support lookup, anti-shadowing, and
/// instantiation tracking.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDescriptor {
    pub namespace: String,
}

/// A declaration attempt that violates the no-shadowing rule (§4.3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShadowingError {
    pub identifier: StringIndex,
    pub namespace: String,
    pub conflicting_namespace: String,
}

impl std::fmt::Display for ShadowingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "identifier shadows a declaration in `{}` (registering in `{}`)",
            self.conflicting_namespace, self.namespace
        )
    }
}

impl std::error::Error for ShadowingError {}

#[derive(Debug, Default)]
pub struct TypeRegistry {
    hierarchy: NamespaceHierarchy,
    namespace_types: HashMap<String, HashMap<StringIndex, TypeDescriptor>>,
    namespace_instantiations: HashMap<String, HashSet<StringIndex>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_namespace(&mut self, namespace: &str, parent: &str) {
        self.hierarchy.register_namespace(namespace, parent);
    }

    pub fn is_namespace_registered(&self, namespace: &str) -> bool {
        self.hierarchy.is_registered(namespace)
    }

    pub fn build_namespace_chain(&self, namespace: &str) -> Vec<String> {
        self.hierarchy.build_namespace_chain(namespace)
    }

    fn is_declared_in(&self, namespace: &str, identifier: StringIndex) -> bool {
        self.namespace_types
            .get(namespace)
            .map(|types| types.contains_key(&identifier))
            .unwrap_or(false)
    }

    /// Shadowing check per §4.3: ancestors, then descendants, then an
    /// explicit global check if the chain didn't already reach it.
    fn check_for_shadowing(&self, namespace: &str, identifier: StringIndex) -> Result<(), ShadowingError> {
        for ancestor in self.hierarchy.ancestors(namespace) {
            if self.is_declared_in(&ancestor, identifier) {
                return Err(self.shadowing_error(namespace, identifier, &ancestor));
            }
        }
        for descendant in self.hierarchy.descendants(namespace) {
            if self.is_declared_in(&descendant, identifier) {
                return Err(self.shadowing_error(namespace, identifier, &descendant));
            }
        }
        if namespace != GLOBAL_NAMESPACE && self.is_declared_in(GLOBAL_NAMESPACE, identifier) {
            return Err(self.shadowing_error(namespace, identifier, GLOBAL_NAMESPACE));
        }
        Ok(())
    }

    fn shadowing_error(&self, namespace: &str, identifier: StringIndex, conflicting: &str) -> ShadowingError {
        ShadowingError {
            identifier,
            namespace: namespace.to_owned(),
            conflicting_namespace: conflicting.to_owned(),
        }
    }

    pub fn register_type_declaration(
        &mut self,
        namespace: &str,
        identifier: StringIndex,
        descriptor: TypeDescriptor,
    ) -> Result<(), ShadowingError> {
        self.check_for_shadowing(namespace, identifier)?;
        self.namespace_types
            .entry(namespace.to_owned())
            .or_default()
            .insert(identifier, descriptor);
        Ok(())
    }

    pub fn mark_type_instantiated(&mut self, namespace: &str, identifier: StringIndex) {
        self.namespace_instantiations
            .entry(namespace.to_owned())
            .or_default()
            .insert(identifier);
    }

    pub fn is_type_instantiated(&self, namespace: &str, identifier: StringIndex) -> bool {
        self.namespace_instantiations
            .get(namespace)
            .map(|set| set.contains(&identifier))
            .unwrap_or(false)
    }

    /// Resolution following the namespace chain; first match wins, and
    /// because shadowing is forbidden at most one match can exist.
    pub fn resolve_type(&self, namespace: &str, identifier: StringIndex) -> Option<&TypeDescriptor> {
        for ns in self.hierarchy.build_namespace_chain(namespace) {
            if let Some(found) = self.namespace_types.get(&ns).and_then(|types| types.get(&identifier)) {
                return Some(found);
            }
        }
        None
    }

    pub fn find_type_in_namespace(&self, namespace: &str, identifier: StringIndex) -> Option<&TypeDescriptor> {
        self.namespace_types.get(namespace).and_then(|types| types.get(&identifier))
    }

    pub fn is_type_declared(&self, namespace: &str, identifier: StringIndex) -> bool {
        self.is_declared_in(namespace, identifier)
    }

    pub fn total_registered_types(&self) -> usize {
        self.namespace_types.values().map(|types| types.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn desc(ns: &str) -> TypeDescriptor {
        TypeDescriptor { namespace: ns.to_owned() }
    }

    #[test]
    fn registration_then_resolution_walks_chain() {
        let mut reg = TypeRegistry::new();
        reg.register_namespace("net", GLOBAL_NAMESPACE);
        reg.register_type_declaration(GLOBAL_NAMESPACE, StringIndex(0), desc(GLOBAL_NAMESPACE))
            .unwrap();

        assert!(reg.resolve_type("net", StringIndex(0)).is_some());
    }

    #[test]
    fn descendant_declaration_blocks_ancestor_registration() {
        let mut reg = TypeRegistry::new();
        reg.register_namespace("net", GLOBAL_NAMESPACE);
        reg.register_type_declaration("net", StringIndex(0), desc("net")).unwrap();

        let err = reg
            .register_type_declaration(GLOBAL_NAMESPACE, StringIndex(0), desc(GLOBAL_NAMESPACE))
            .unwrap_err();
        assert_eq!(err.conflicting_namespace, "net");
    }

    #[test]
    fn ancestor_declaration_blocks_descendant_registration() {
        let mut reg = TypeRegistry::new();
        reg.register_namespace("net", GLOBAL_NAMESPACE);
        reg.register_type_declaration(GLOBAL_NAMESPACE, StringIndex(0), desc(GLOBAL_NAMESPACE))
            .unwrap();

        let err = reg
            .register_type_declaration("net", StringIndex(0), desc("net"))
            .unwrap_err();
        assert_eq!(err.conflicting_namespace, GLOBAL_NAMESPACE);
    }

    #[test]
    fn sibling_namespaces_may_both_declare_the_same_identifier() {
        let mut reg = TypeRegistry::new();
        reg.register_namespace("net", GLOBAL_NAMESPACE);
        reg.register_namespace("io", GLOBAL_NAMESPACE);
        reg.register_type_declaration("net", StringIndex(0), desc("net")).unwrap();
        reg.register_type_declaration("io", StringIndex(0), desc("io")).unwrap();
        assert!(reg.is_type_declared("net", StringIndex(0)));
        assert!(reg.is_type_declared("io", StringIndex(0)));
    }
}
