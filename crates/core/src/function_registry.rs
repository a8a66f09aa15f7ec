//! `FunctionRegistry`: namespace-scoped function declarations with
//! anti-shadowing and overload resolution (§3, §4.3). Grounded on
//! `original_source/compiler/src/commons/function_registry.cpp`.

use std::collections::HashMap;

use crate::namespace::{NamespaceHierarchy, GLOBAL_NAMESPACE};
use crate::string_table::StringIndex;
use crate::type_registry::ShadowingError;

/// A declared function overload's metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDescriptor {
    pub namespace: String,
    /// Parameter type names, used only for arity/exact-match overload
    /// resolution (§4.3 — no conversions beyond exact match are defined).
    pub parameter_types: Vec<String>,
    pub qualified_name: String,
}

/// A recorded call site, as mentioned by `mark_function_called` (§4.3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSite {
    pub scope_index: u32,
    pub instruction_index: u32,
}

/// Why overload resolution at a call site failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverloadResolutionError {
    NoSuchFunction,
    NoViableArity,
    AmbiguousCall,
}

#[derive(Debug, Default)]
pub struct FunctionRegistry {
    hierarchy: NamespaceHierarchy,
    namespace_functions: HashMap<String, HashMap<StringIndex, Vec<FunctionDescriptor>>>,
    call_sites: HashMap<String, Vec<CallSite>>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_namespace(&mut self, namespace: &str, parent: &str) {
        self.hierarchy.register_namespace(namespace, parent);
    }

    pub fn build_namespace_chain(&self, namespace: &str) -> Vec<String> {
        self.hierarchy.build_namespace_chain(namespace)
    }

    fn has_overload_set(&self, namespace: &str, identifier: StringIndex) -> bool {
        self.namespace_functions
            .get(namespace)
            .map(|fns| fns.contains_key(&identifier))
            .unwrap_or(false)
    }

    fn check_for_shadowing(&self, namespace: &str, identifier: StringIndex) -> Result<(), ShadowingError> {
        for ancestor in self.hierarchy.ancestors(namespace) {
            if self.has_overload_set(&ancestor, identifier) {
                return Err(ShadowingError {
                    identifier,
                    namespace: namespace.to_owned(),
                    conflicting_namespace: ancestor,
                });
            }
        }
        for descendant in self.hierarchy.descendants(namespace) {
            if self.has_overload_set(&descendant, identifier) {
                return Err(ShadowingError {
                    identifier,
                    namespace: namespace.to_owned(),
                    conflicting_namespace: descendant,
                });
            }
        }
        if namespace != GLOBAL_NAMESPACE && self.has_overload_set(GLOBAL_NAMESPACE, identifier) {
            return Err(ShadowingError {
                identifier,
                namespace: namespace.to_owned(),
                conflicting_namespace: GLOBAL_NAMESPACE.to_owned(),
            });
        }
        Ok(())
    }

    /// First declaration of `identifier` in `namespace` establishes the
    /// overload set and runs the anti-shadowing check; later declarations
    /// in the same namespace are additional overloads and skip it (a
    /// namespace may not shadow itself).
    pub fn register_function_declaration(
        &mut self,
        namespace: &str,
        identifier: StringIndex,
        descriptor: FunctionDescriptor,
    ) -> Result<(), ShadowingError> {
        if !self.has_overload_set(namespace, identifier) {
            self.check_for_shadowing(namespace, identifier)?;
        }
        self.namespace_functions
            .entry(namespace.to_owned())
            .or_default()
            .entry(identifier)
            .or_default()
            .push(descriptor);
        Ok(())
    }

    fn overload_set(&self, namespace: &str, identifier: StringIndex) -> Option<&[FunctionDescriptor]> {
        for ns in self.hierarchy.build_namespace_chain(namespace) {
            if let Some(set) = self.namespace_functions.get(&ns).and_then(|fns| fns.get(&identifier)) {
                return Some(set.as_slice());
            }
        }
        None
    }

    /// Resolve a call by arity then exact parameter-type match (§4.3).
    pub fn resolve_call(
        &self,
        namespace: &str,
        identifier: StringIndex,
        argument_types: &[String],
    ) -> Result<&FunctionDescriptor, OverloadResolutionError> {
        let set = self
            .overload_set(namespace, identifier)
            .ok_or(OverloadResolutionError::NoSuchFunction)?;

        let arity_matched: Vec<&FunctionDescriptor> = set
            .iter()
            .filter(|d| d.parameter_types.len() == argument_types.len())
            .collect();
        if arity_matched.is_empty() {
            return Err(OverloadResolutionError::NoViableArity);
        }

        let exact: Vec<&FunctionDescriptor> = arity_matched
            .into_iter()
            .filter(|d| d.parameter_types.as_slice() == argument_types)
            .collect();

        match exact.as_slice() {
            [] => Err(OverloadResolutionError::NoViableArity),
            [only] => Ok(only),
            _ => Err(OverloadResolutionError::AmbiguousCall),
        }
    }

    pub fn mark_function_called(&mut self, qualified_name: &str, call_site: CallSite) {
        self.call_sites.entry(qualified_name.to_owned()).or_default().push(call_site);
    }

    pub fn call_sites(&self, qualified_name: &str) -> &[CallSite] {
        self.call_sites.get(qualified_name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn total_registered_functions(&self) -> usize {
        self.namespace_functions
            .values()
            .flat_map(|fns| fns.values())
            .map(Vec::len)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(ns: &str, params: &[&str]) -> FunctionDescriptor {
        FunctionDescriptor {
            namespace: ns.to_owned(),
            parameter_types: params.iter().map(|s| s.to_string()).collect(),
            qualified_name: format!("{ns}::fn"),
        }
    }

    #[test]
    fn overloads_in_the_same_namespace_accumulate() {
        let mut reg = FunctionRegistry::new();
        reg.register_function_declaration("net", StringIndex(0), descriptor("net", &["Int"]))
            .unwrap();
        reg.register_function_declaration("net", StringIndex(0), descriptor("net", &["Int", "Int"]))
            .unwrap();

        assert_eq!(reg.overload_set("net", StringIndex(0)).unwrap().len(), 2);
    }

    #[test]
    fn overload_resolution_picks_unique_arity_and_type_match() {
        let mut reg = FunctionRegistry::new();
        reg.register_function_declaration("net", StringIndex(0), descriptor("net", &["Int"]))
            .unwrap();
        reg.register_function_declaration("net", StringIndex(0), descriptor("net", &["Int", "Int"]))
            .unwrap();

        let resolved = reg
            .resolve_call("net", StringIndex(0), &["Int".to_owned(), "Int".to_owned()])
            .unwrap();
        assert_eq!(resolved.parameter_types.len(), 2);
    }

    #[test]
    fn overload_resolution_reports_no_viable_arity() {
        let mut reg = FunctionRegistry::new();
        reg.register_function_declaration("net", StringIndex(0), descriptor("net", &["Int"]))
            .unwrap();

        let err = reg
            .resolve_call("net", StringIndex(0), &["Int".to_owned(), "Int".to_owned()])
            .unwrap_err();
        assert_eq!(err, OverloadResolutionError::NoViableArity);
    }

    #[test]
    fn second_namespace_cannot_shadow_the_first() {
        let mut reg = FunctionRegistry::new();
        reg.register_namespace("net", GLOBAL_NAMESPACE);
        reg.register_function_declaration(GLOBAL_NAMESPACE, StringIndex(0), descriptor(GLOBAL_NAMESPACE, &[]))
            .unwrap();

        let err = reg
            .register_function_declaration("net", StringIndex(0), descriptor("net", &[]))
            .unwrap_err();
        assert_eq!(err.conflicting_namespace, GLOBAL_NAMESPACE);
    }
}
