//! Namespace hierarchy shared by [`crate::type_registry::TypeRegistry`] and
//! [`crate::function_registry::FunctionRegistry`] (§3, §4.3).

use std::collections::{HashMap, HashSet};

/// The root namespace every chain eventually reaches.
pub const GLOBAL_NAMESPACE: &str = "__global__";

/// Tracks `namespace -> parent_namespace` edges and answers ancestor /
/// descendant / chain queries. Namespaces not explicitly registered are
/// treated as direct children of [`GLOBAL_NAMESPACE`].
#[derive(Debug, Default)]
pub struct NamespaceHierarchy {
    parents: HashMap<String, String>,
}

impl NamespaceHierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_namespace(&mut self, namespace: &str, parent: &str) {
        if namespace == GLOBAL_NAMESPACE {
            return;
        }
        self.parents.entry(namespace.to_owned()).or_insert_with(|| parent.to_owned());
    }

    pub fn is_registered(&self, namespace: &str) -> bool {
        namespace == GLOBAL_NAMESPACE || self.parents.contains_key(namespace)
    }

    fn parent_of(&self, namespace: &str) -> &str {
        if namespace == GLOBAL_NAMESPACE {
            return GLOBAL_NAMESPACE;
        }
        self.parents
            .get(namespace)
            .map(String::as_str)
            .unwrap_or(GLOBAL_NAMESPACE)
    }

    /// `[ns, parent(ns), ..., __global__]`.
    pub fn build_namespace_chain(&self, namespace: &str) -> Vec<String> {
        let mut chain = vec![namespace.to_owned()];
        let mut current = namespace.to_owned();
        while current != GLOBAL_NAMESPACE {
            let parent = self.parent_of(&current).to_owned();
            chain.push(parent.clone());
            current = parent;
        }
        chain
    }

    /// Every namespace, direct or transitive, whose chain passes through
    /// `namespace` before reaching it — i.e. `namespace`'s descendants.
    pub fn descendants(&self, namespace: &str) -> Vec<String> {
        let mut result = Vec::new();
        let mut known: HashSet<&str> = HashSet::new();
        known.insert(namespace);
        for candidate in self.parents.keys() {
            if candidate == namespace {
                continue;
            }
            let mut current = candidate.as_str();
            loop {
                if current == namespace {
                    result.push(candidate.clone());
                    break;
                }
                if current == GLOBAL_NAMESPACE || known.contains(current) && current != candidate {
                    break;
                }
                current = self.parent_of(current);
            }
        }
        result
    }

    pub fn ancestors(&self, namespace: &str) -> Vec<String> {
        let mut chain = self.build_namespace_chain(namespace);
        chain.retain(|ns| ns != namespace);
        chain
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unregistered_namespace_chains_directly_to_global() {
        let hierarchy = NamespaceHierarchy::new();
        assert_eq!(
            hierarchy.build_namespace_chain("net"),
            vec!["net".to_owned(), GLOBAL_NAMESPACE.to_owned()]
        );
    }

    #[test]
    fn chain_walks_through_registered_parents() {
        let mut hierarchy = NamespaceHierarchy::new();
        hierarchy.register_namespace("server", "net");
        hierarchy.register_namespace("net", GLOBAL_NAMESPACE);
        assert_eq!(
            hierarchy.build_namespace_chain("server"),
            vec!["server".to_owned(), "net".to_owned(), GLOBAL_NAMESPACE.to_owned()]
        );
    }

    #[test]
    fn descendants_finds_transitive_children() {
        let mut hierarchy = NamespaceHierarchy::new();
        hierarchy.register_namespace("server", "net");
        hierarchy.register_namespace("net", GLOBAL_NAMESPACE);
        hierarchy.register_namespace("tcp", "server");

        let mut descendants = hierarchy.descendants("net");
        descendants.sort();
        assert_eq!(descendants, vec!["server".to_owned(), "tcp".to_owned()]);
    }
}
