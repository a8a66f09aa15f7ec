//! `ContextualToken`: Layer 2D's classification of each significant token
//! in an instruction (§3, §4.8).

use std::collections::HashMap;

/// The contextual role assigned to a token by Layer 2D's pattern-based
/// classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextualRole {
    VariableDeclaration,
    VariableReference,
    Assignment,
    FunctionCall,
    ControlFlow,
    Expression,
    TypeReference,
    Operator,
    LiteralValue,
    ScopeReference,
    Whitespace,
    Formatting,
    ResourceManagement,
    Invalid,
}

/// Opaque per-layer extension data attached to a scope, instruction, or
/// contextual token. Modelled as a tagged map rather than a downcast-based
/// base class (§9 design notes): each layer writes under its own key and
/// never needs to know about another layer's payload shape.
pub type ContextMap = HashMap<&'static str, ContextValue>;

/// A layer-specific payload. New layers add a variant here rather than
/// requiring callers to downcast an opaque pointer.
#[derive(Debug, Clone, PartialEq)]
pub enum ContextValue {
    Text(String),
    Flag(bool),
    Count(u64),
    Namespace(Vec<String>),
}

/// A single contextualised token, referencing its underlying `Token`
/// positions by index into the owning `Instruction::tokens`.
#[derive(Debug, Clone, Default)]
pub struct ContextualToken {
    pub role: Option<ContextualRole>,
    pub parent_token_indices: Vec<u32>,
    pub attached_contexts: ContextMap,
}

impl ContextualToken {
    pub fn new(role: ContextualRole, parent_token_indices: Vec<u32>) -> Self {
        ContextualToken {
            role: Some(role),
            parent_token_indices,
            attached_contexts: ContextMap::new(),
        }
    }
}
