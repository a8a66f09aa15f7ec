//! Registry for `exec` template aliases (§3, §4.2).
//!
//! Grounded on `original_source/compiler/src/commons/dirty/exec_alias_registry.h`:
//! simple vs. namespaced registration, anti-shadowing lookup, and the
//! scope<->lambda / specialisation<->parent side-tables that Layer 2A/2B/2D
//! populate and consult.

use std::collections::HashMap;

pub const INVALID_EXEC_ALIAS_INDEX: u32 = u32::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExecAliasIndex(pub u32);

impl ExecAliasIndex {
    pub const INVALID: ExecAliasIndex = ExecAliasIndex(INVALID_EXEC_ALIAS_INDEX);

    pub fn is_valid(self) -> bool {
        self.0 != INVALID_EXEC_ALIAS_INDEX
    }
}

impl Default for ExecAliasIndex {
    fn default() -> Self {
        ExecAliasIndex::INVALID
    }
}

/// Two flavours of compiled exec body, distinguished by content rather than
/// a separate tag field (matches the original's `"SPECIALIZATION:"` prefix
/// convention).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutableLambda {
    pub lua_script: String,
}

const SPECIALIZATION_PREFIX: &str = "SPECIALIZATION:";

impl ExecutableLambda {
    pub fn parent(lua_script: impl Into<String>) -> Self {
        ExecutableLambda {
            lua_script: lua_script.into(),
        }
    }

    pub fn specialization(cprime_body: impl Into<String>) -> Self {
        ExecutableLambda {
            lua_script: format!("{SPECIALIZATION_PREFIX}{}", cprime_body.into()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lua_script.is_empty()
    }

    pub fn is_specialization(&self) -> bool {
        self.lua_script.starts_with(SPECIALIZATION_PREFIX)
    }

    /// The literal CPrime body of a specialisation payload, if this is one.
    pub fn specialization_body(&self) -> Option<&str> {
        self.lua_script.strip_prefix(SPECIALIZATION_PREFIX)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecAliasStatistics {
    pub registered_aliases: usize,
    pub total_characters: usize,
    pub average_alias_length: usize,
    pub longest_alias_length: usize,
}

/// Error returned when registering an alias that would violate anti-shadowing
/// or duplicate-name rules (§4.2).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecAliasRegistrationError {
    DuplicateGlobalAlias { name: String },
    NamespacedAliasShadowsGlobal { name: String },
}

impl std::fmt::Display for ExecAliasRegistrationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecAliasRegistrationError::DuplicateGlobalAlias { name } => {
                write!(f, "duplicate exec template name: {name}")
            }
            ExecAliasRegistrationError::NamespacedAliasShadowsGlobal { name } => {
                write!(f, "namespaced exec alias `{name}` conflicts with an existing global alias")
            }
        }
    }
}

impl std::error::Error for ExecAliasRegistrationError {}

#[derive(Debug, Default)]
pub struct ExecAliasRegistry {
    aliases: Vec<String>,
    alias_to_index: HashMap<String, ExecAliasIndex>,
    namespace_paths: Vec<Vec<String>>,
    alias_reverse_map: HashMap<String, Vec<ExecAliasIndex>>,

    scope_to_lambda: HashMap<u32, ExecutableLambda>,
    alias_to_scope: HashMap<u32, u32>,
    specialization_to_parent: HashMap<u32, String>,
}

impl ExecAliasRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn alias_name_of(path: &[String]) -> &str {
        path.last().expect("namespace path must have at least one element")
    }

    fn is_global(path: &[String]) -> bool {
        path.len() == 1
    }

    /// Simple registration: a global (single-element) alias. Rejects
    /// duplicates (§4.2 mode 1).
    pub fn register_alias(&mut self, name: &str) -> Result<ExecAliasIndex, ExecAliasRegistrationError> {
        self.register_namespaced_alias(&[name.to_owned()])
    }

    pub fn contains_alias(&self, name: &str) -> bool {
        self.alias_to_index.contains_key(name)
    }

    /// Namespaced registration. `path`'s last element is the alias name; the
    /// rest is the namespace chain. A single-element path is global.
    pub fn register_namespaced_alias(
        &mut self,
        path: &[String],
    ) -> Result<ExecAliasIndex, ExecAliasRegistrationError> {
        assert!(!path.is_empty(), "exec alias namespace path must not be empty");
        let name = Self::alias_name_of(path).to_owned();

        if Self::is_global(path) {
            if self.alias_to_index.contains_key(&name) {
                return Err(ExecAliasRegistrationError::DuplicateGlobalAlias { name });
            }
        } else if self.global_registration(&name).is_some() {
            return Err(ExecAliasRegistrationError::NamespacedAliasShadowsGlobal { name });
        }

        let index = ExecAliasIndex(self.namespace_paths.len() as u32);
        self.namespace_paths.push(path.to_vec());
        self.alias_reverse_map.entry(name.clone()).or_default().push(index);

        if Self::is_global(path) {
            self.aliases.push(name.clone());
            self.alias_to_index.insert(name, index);
        }

        Ok(index)
    }

    fn global_registration(&self, name: &str) -> Option<ExecAliasIndex> {
        self.alias_reverse_map.get(name)?.iter().copied().find(|idx| {
            Self::is_global(&self.namespace_paths[idx.0 as usize])
        })
    }

    /// Namespace-aware anti-shadowing lookup (§4.2). Returns the resolved
    /// index, if any.
    pub fn lookup_alias_with_context(
        &self,
        name: &str,
        current_namespace_context: &[String],
    ) -> Option<ExecAliasIndex> {
        if let Some(global) = self.global_registration(name) {
            return Some(global);
        }
        let candidates = self.alias_reverse_map.get(name)?;
        for depth in (0..=current_namespace_context.len()).rev() {
            let prefix = &current_namespace_context[..depth];
            if let Some(found) = candidates.iter().copied().find(|idx| {
                let path = &self.namespace_paths[idx.0 as usize];
                let ns = &path[..path.len() - 1];
                ns == prefix
            }) {
                return Some(found);
            }
        }
        None
    }

    pub fn get_alias_index(&self, name: &str) -> ExecAliasIndex {
        self.alias_to_index.get(name).copied().unwrap_or(ExecAliasIndex::INVALID)
    }

    pub fn get_alias_index_with_context(
        &self,
        name: &str,
        current_namespace_context: &[String],
    ) -> ExecAliasIndex {
        self.lookup_alias_with_context(name, current_namespace_context)
            .unwrap_or(ExecAliasIndex::INVALID)
    }

    pub fn get_alias(&self, index: ExecAliasIndex) -> &str {
        Self::alias_name_of(&self.namespace_paths[index.0 as usize])
    }

    pub fn is_valid_index(&self, index: ExecAliasIndex) -> bool {
        index.is_valid() && (index.0 as usize) < self.namespace_paths.len()
    }

    pub fn size(&self) -> usize {
        self.namespace_paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.namespace_paths.is_empty()
    }

    pub fn statistics(&self) -> ExecAliasStatistics {
        let names: Vec<&str> = self.namespace_paths.iter().map(|p| Self::alias_name_of(p)).collect();
        let total_characters: usize = names.iter().map(|n| n.chars().count()).sum();
        let longest_alias_length = names.iter().map(|n| n.chars().count()).max().unwrap_or(0);
        let registered_aliases = names.len();
        let average_alias_length = if registered_aliases == 0 {
            0
        } else {
            total_characters / registered_aliases
        };
        ExecAliasStatistics {
            registered_aliases,
            total_characters,
            average_alias_length,
            longest_alias_length,
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Register a scope as an exec scope with an initially-empty lambda.
    pub fn register_scope_index(&mut self, scope_index: u32) {
        self.scope_to_lambda.entry(scope_index).or_default();
    }

    pub fn register_scope_index_to_exec_alias(&mut self, alias_idx: ExecAliasIndex, scope_index: u32) {
        self.alias_to_scope.insert(alias_idx.0, scope_index);
    }

    pub fn get_executable_lambda(&self, scope_index: u32) -> Option<&ExecutableLambda> {
        self.scope_to_lambda.get(&scope_index)
    }

    pub fn get_executable_lambda_by_alias(&self, alias_idx: ExecAliasIndex) -> Option<&ExecutableLambda> {
        let scope = self.alias_to_scope.get(&alias_idx.0)?;
        self.scope_to_lambda.get(scope)
    }

    pub fn get_exec_scope_count(&self) -> usize {
        self.scope_to_lambda.len()
    }

    pub fn update_executable_lambda(&mut self, scope_index: u32, lambda: ExecutableLambda) {
        self.scope_to_lambda.insert(scope_index, lambda);
    }

    pub fn register_specialization_to_parent(&mut self, specialization_scope_index: u32, parent_alias_name: &str) {
        self.specialization_to_parent
            .insert(specialization_scope_index, parent_alias_name.to_owned());
    }

    pub fn get_parent_alias_name(&self, specialization_scope_index: u32) -> Option<&str> {
        self.specialization_to_parent
            .get(&specialization_scope_index)
            .map(String::as_str)
    }

    /// The scope an alias was declared in, for callers (Layer 2D) that hold
    /// only the alias and need to chase a specialisation back to its parent.
    pub fn get_scope_for_alias(&self, alias_idx: ExecAliasIndex) -> Option<u32> {
        self.alias_to_scope.get(&alias_idx.0).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_registration_rejects_duplicates() {
        let mut reg = ExecAliasRegistry::new();
        reg.register_alias("greet").unwrap();
        let err = reg.register_alias("greet").unwrap_err();
        assert_eq!(err, ExecAliasRegistrationError::DuplicateGlobalAlias { name: "greet".into() });
    }

    #[test]
    fn namespaced_registration_after_global_fails() {
        let mut reg = ExecAliasRegistry::new();
        reg.register_alias("greet").unwrap();
        let err = reg
            .register_namespaced_alias(&["net".to_owned(), "greet".to_owned()])
            .unwrap_err();
        assert_eq!(
            err,
            ExecAliasRegistrationError::NamespacedAliasShadowsGlobal { name: "greet".into() }
        );
    }

    #[test]
    fn global_alias_resolves_from_any_namespace() {
        let mut reg = ExecAliasRegistry::new();
        let idx = reg.register_alias("greet").unwrap();
        assert_eq!(
            reg.lookup_alias_with_context("greet", &["net".into(), "server".into()]),
            Some(idx)
        );
    }

    #[test]
    fn namespaced_lookup_prefers_most_specific_prefix() {
        let mut reg = ExecAliasRegistry::new();
        let outer = reg
            .register_namespaced_alias(&["net".to_owned(), "greet".to_owned()])
            .unwrap();
        let inner = reg
            .register_namespaced_alias(&["net".to_owned(), "server".to_owned(), "greet".to_owned()])
            .unwrap();

        assert_eq!(
            reg.lookup_alias_with_context("greet", &["net".into(), "server".into()]),
            Some(inner)
        );
        assert_eq!(reg.lookup_alias_with_context("greet", &["net".into()]), Some(outer));
        assert_eq!(reg.lookup_alias_with_context("greet", &["other".into()]), None);
    }

    #[test]
    fn scope_and_specialization_linkage_round_trips() {
        let mut reg = ExecAliasRegistry::new();
        reg.register_scope_index(5);
        assert!(reg.get_executable_lambda(5).unwrap().is_empty());

        reg.update_executable_lambda(5, ExecutableLambda::parent("return 1"));
        assert_eq!(reg.get_executable_lambda(5).unwrap().lua_script, "return 1");

        reg.register_specialization_to_parent(9, "greet");
        assert_eq!(reg.get_parent_alias_name(9), Some("greet"));
        assert_eq!(reg.get_parent_alias_name(10), None);
    }

    #[test]
    fn scope_for_alias_round_trips() {
        let mut reg = ExecAliasRegistry::new();
        let idx = reg.register_alias("greet").unwrap();
        reg.register_scope_index_to_exec_alias(idx, 7);
        assert_eq!(reg.get_scope_for_alias(idx), Some(7));
        assert_eq!(reg.get_scope_for_alias(ExecAliasIndex(99)), None);
    }

    #[test]
    fn executable_lambda_specialization_round_trips_body() {
        let lambda = ExecutableLambda::specialization("class Foo {}");
        assert!(lambda.is_specialization());
        assert_eq!(lambda.specialization_body(), Some("class Foo {}"));

        let parent = ExecutableLambda::parent("return cprime.emit('x')");
        assert!(!parent.is_specialization());
        assert_eq!(parent.specialization_body(), None);
    }
}
