//! `Scope`, `Instruction`: the core structural entities (§3).
//!
//! Scopes live in a flat vector; parent/child references are indices, never
//! pointers (§9 design notes). The vector grows monotonically and indices
//! are stable for the lifetime of compilation.

use crate::contextual_token::{ContextMap, ContextualToken};
use crate::token::Token;

/// An ordered token run terminated by `;` or a structural boundary,
/// together with its (Layer 2D-only) contextual annotations.
#[derive(Debug, Clone, Default)]
pub struct Instruction {
    pub tokens: Vec<Token>,
    /// Populated only after Layer 2D runs; parallel to `tokens` for the
    /// subset of positions classification assigned a role to.
    pub contextual_tokens: Vec<ContextualToken>,
    pub attached_contexts: ContextMap,
}

impl Instruction {
    pub fn new(tokens: Vec<Token>) -> Self {
        Instruction {
            tokens,
            contextual_tokens: Vec::new(),
            attached_contexts: ContextMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// A scope body element: either an inline instruction or a reference to a
/// nested scope by index into the owning `CompilationUnit`'s scope vector.
#[derive(Debug, Clone)]
pub enum BodyElement {
    Instruction(Instruction),
    ScopeRef(u32),
}

/// A scope's footer: the closing-brace instruction, or — for scopes whose
/// footer is itself exec-expanded — a reference to another scope.
#[derive(Debug, Clone)]
pub enum Footer {
    Instruction(Instruction),
    ScopeRef(u32),
}

impl Default for Footer {
    fn default() -> Self {
        Footer::Instruction(Instruction::default())
    }
}

/// A brace-delimited region: header tokens, body elements, a footer, and a
/// parent index. The root scope is its own parent (index 0).
#[derive(Debug, Clone, Default)]
pub struct Scope {
    pub header: Instruction,
    pub footer: Footer,
    pub parent_index: u32,
    pub instructions: Vec<BodyElement>,
    pub namespace_context: Vec<String>,
    pub attached_contexts: ContextMap,
    /// Set by Layer 2A when the header contains `exec`/`EXEC_ALIAS`;
    /// consulted by 2B to decide which scopes to compile.
    pub is_exec_scope: bool,
}

impl Scope {
    pub fn root() -> Self {
        Scope {
            parent_index: 0,
            ..Default::default()
        }
    }
}

/// The flat, monotonically-growing vector of all scopes in a compilation
/// unit. Index 0 is always the root.
#[derive(Debug, Clone, Default)]
pub struct ScopeArena {
    scopes: Vec<Scope>,
}

impl ScopeArena {
    pub fn new() -> Self {
        let mut arena = ScopeArena { scopes: Vec::new() };
        arena.scopes.push(Scope::root());
        arena
    }

    pub const ROOT: u32 = 0;

    pub fn push(&mut self, scope: Scope) -> u32 {
        let index = self.scopes.len() as u32;
        self.scopes.push(scope);
        index
    }

    pub fn get(&self, index: u32) -> &Scope {
        &self.scopes[index as usize]
    }

    pub fn get_mut(&mut self, index: u32) -> &mut Scope {
        &mut self.scopes[index as usize]
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &Scope)> {
        self.scopes.iter().enumerate().map(|(i, s)| (i as u32, s))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (u32, &mut Scope)> {
        self.scopes.iter_mut().enumerate().map(|(i, s)| (i as u32, s))
    }

    /// Invariant 1 (§8): for every scope `s != 0`,
    /// `scopes[s.parent_index].instructions` contains the index `s` exactly
    /// once (counting both body references and a scope-ref footer).
    pub fn check_parent_links_consistent(&self) -> bool {
        for (index, scope) in self.iter() {
            if index == Self::ROOT {
                continue;
            }
            let parent = self.get(scope.parent_index);
            let body_occurrences = parent
                .instructions
                .iter()
                .filter(|e| matches!(e, BodyElement::ScopeRef(i) if *i == index))
                .count();
            let footer_occurrence = matches!(&parent.footer, Footer::ScopeRef(i) if *i == index);
            let total = body_occurrences + footer_occurrence as usize;
            if total != 1 {
                return false;
            }
        }
        true
    }
}
