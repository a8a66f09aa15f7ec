//! Data model for the CPrime compiler front-end.
//!
//! This crate owns every structure the pipeline passes between layers —
//! string interning, the fine-grained token kind table, raw and contextual
//! tokens, the scope arena, the exec-alias/type/function registries, and
//! the contextualisation error model — but performs no I/O and runs no
//! compilation logic itself. `cprime-compiler` drives these types through
//! the five tokenizer passes and four structuring/contextualisation passes.

pub mod contextual_token;
pub mod error;
pub mod exec_registry;
pub mod function_registry;
pub mod namespace;
pub mod raw_token;
pub mod scope;
pub mod string_table;
pub mod token;
pub mod token_kind;
pub mod type_registry;

pub use contextual_token::{ContextMap, ContextValue, ContextualRole, ContextualToken};
pub use error::{
    ContextualizationError, ErrorHandler, ErrorKind, ErrorSeverity, InstructionType, SeverityPolicyConfig,
    SourceLocation,
};
pub use exec_registry::{
    ExecAliasIndex, ExecAliasRegistrationError, ExecAliasRegistry, ExecAliasStatistics, ExecutableLambda,
};
pub use function_registry::{CallSite, FunctionDescriptor, FunctionRegistry, OverloadResolutionError};
pub use namespace::{NamespaceHierarchy, GLOBAL_NAMESPACE};
pub use raw_token::{LiteralValue, RawToken};
pub use scope::{BodyElement, Footer, Instruction, Scope, ScopeArena};
pub use string_table::{StringIndex, StringTable, StringTableStatistics};
pub use token::Token;
pub use token_kind::{keyword_lookup, RawTokenClass, TokenKind};
pub use type_registry::{ShadowingError, TypeDescriptor, TypeRegistry};
