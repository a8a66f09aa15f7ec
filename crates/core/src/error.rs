//! Contextualisation error model (§7). Grounded on
//! `original_source/compiler/src/commons/errorHandler.cpp`: a severity
//! policy map, non-fatal accumulation during Layer 2D, and post-hoc source
//! location resolution.

use std::collections::HashMap;

use serde::Deserialize;

use crate::raw_token::RawToken;

/// Error kinds Layer 2D can raise while classifying tokens (§7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    UnsupportedTokenPattern,
    AmbiguousOperatorContext,
    UnresolvedIdentifier,
    InvalidExpressionStructure,
    MissingTypeInformation,
    IncompleteStatement,
    InvalidFunctionCall,
    TypeMismatch,
    UndeclaredVariable,
}

impl ErrorKind {
    pub fn description(self) -> &'static str {
        match self {
            ErrorKind::UnsupportedTokenPattern => "unsupported token pattern",
            ErrorKind::AmbiguousOperatorContext => "ambiguous operator context",
            ErrorKind::UnresolvedIdentifier => "unresolved identifier",
            ErrorKind::InvalidExpressionStructure => "invalid expression structure",
            ErrorKind::MissingTypeInformation => "missing type information",
            ErrorKind::IncompleteStatement => "incomplete statement",
            ErrorKind::InvalidFunctionCall => "invalid function call",
            ErrorKind::TypeMismatch => "type mismatch",
            ErrorKind::UndeclaredVariable => "undeclared variable",
        }
    }
}

/// Severity a given error kind is reported at; mutable policy, not
/// intrinsic to the kind (§7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorSeverity {
    Error,
    Warning,
    Suppress,
}

/// Which instruction slot of a scope an error was raised from. Supplements
/// spec.md's `ContextualToken` model with the `InstructionType` tag the
/// original's `format_error_message` carries (SPEC_FULL.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstructionType {
    Header,
    Body,
    Footer,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SourceLocation {
    pub line: u32,
    pub column: u32,
    pub offset: u32,
}

#[derive(Debug, Clone)]
pub struct ContextualizationError {
    pub kind: ErrorKind,
    pub scope_index: u32,
    pub instruction_index: u32,
    pub instruction_type: InstructionType,
    pub token_indices: Vec<u32>,
    pub extra_info: String,
    pub source_location: SourceLocation,
}

impl ContextualizationError {
    pub fn new(
        kind: ErrorKind,
        scope_index: u32,
        instruction_index: u32,
        instruction_type: InstructionType,
        token_indices: Vec<u32>,
    ) -> Self {
        ContextualizationError {
            kind,
            scope_index,
            instruction_index,
            instruction_type,
            token_indices,
            extra_info: String::new(),
            source_location: SourceLocation::default(),
        }
    }

    pub fn with_extra_info(mut self, info: impl Into<String>) -> Self {
        self.extra_info = info.into();
        self
    }
}

/// TOML-deserialisable overlay for the severity policy (SPEC_FULL.md §2):
/// `[severity]` table mapping an `ErrorKind` name to `ErrorSeverity`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SeverityPolicyConfig {
    #[serde(default)]
    pub severity: HashMap<ErrorKind, ErrorSeverity>,
}

/// Collects contextualisation errors during Layer 2D, applying a mutable
/// severity policy, and resolves source locations once collection is done.
#[derive(Debug, Clone)]
pub struct ErrorHandler {
    severity_policies: HashMap<ErrorKind, ErrorSeverity>,
    errors: Vec<ContextualizationError>,
}

impl Default for ErrorHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorHandler {
    pub fn new() -> Self {
        let mut severity_policies = HashMap::new();
        severity_policies.insert(ErrorKind::UnsupportedTokenPattern, ErrorSeverity::Error);
        severity_policies.insert(ErrorKind::AmbiguousOperatorContext, ErrorSeverity::Warning);
        severity_policies.insert(ErrorKind::UnresolvedIdentifier, ErrorSeverity::Error);
        severity_policies.insert(ErrorKind::InvalidExpressionStructure, ErrorSeverity::Error);
        severity_policies.insert(ErrorKind::MissingTypeInformation, ErrorSeverity::Warning);
        severity_policies.insert(ErrorKind::IncompleteStatement, ErrorSeverity::Error);
        severity_policies.insert(ErrorKind::InvalidFunctionCall, ErrorSeverity::Error);
        severity_policies.insert(ErrorKind::TypeMismatch, ErrorSeverity::Error);
        severity_policies.insert(ErrorKind::UndeclaredVariable, ErrorSeverity::Error);
        ErrorHandler {
            severity_policies,
            errors: Vec::new(),
        }
    }

    /// Overlay a TOML-loaded policy on top of the defaults.
    pub fn apply_config(&mut self, config: &SeverityPolicyConfig) {
        for (kind, severity) in &config.severity {
            self.severity_policies.insert(*kind, *severity);
        }
    }

    pub fn set_severity_policy(&mut self, kind: ErrorKind, severity: ErrorSeverity) {
        self.severity_policies.insert(kind, severity);
    }

    pub fn get_severity_policy(&self, kind: ErrorKind) -> ErrorSeverity {
        self.severity_policies.get(&kind).copied().unwrap_or(ErrorSeverity::Error)
    }

    /// Register an error; suppressed kinds are dropped and never stored.
    pub fn register(&mut self, error: ContextualizationError) {
        if self.get_severity_policy(error.kind) != ErrorSeverity::Suppress {
            self.errors.push(error);
        }
    }

    pub fn errors(&self) -> &[ContextualizationError] {
        &self.errors
    }

    pub fn has_errors_at_or_above(&self, severity: ErrorSeverity) -> bool {
        self.errors.iter().any(|e| {
            let s = self.get_severity_policy(e.kind);
            matches!(
                (severity, s),
                (ErrorSeverity::Warning, ErrorSeverity::Warning | ErrorSeverity::Error)
                    | (ErrorSeverity::Error, ErrorSeverity::Error)
            )
        })
    }

    /// Walk each collected error and populate `source_location` from the
    /// first of its `token_indices`, looking up the raw token's position in
    /// `stream`.
    pub fn resolve_source_locations(&mut self, stream: &[RawToken]) {
        for error in &mut self.errors {
            if let Some(&primary) = error.token_indices.first() {
                if let Some(tok) = stream.get(primary as usize) {
                    error.source_location = SourceLocation {
                        line: tok.line,
                        column: tok.column,
                        offset: tok.position,
                    };
                }
            }
        }
    }

    pub fn format_error_message(&self, error: &ContextualizationError, file_name: &str) -> String {
        let instruction_type = match error.instruction_type {
            InstructionType::Header => "header",
            InstructionType::Body => "body",
            InstructionType::Footer => "footer",
        };
        let mut message = format!(
            "{file_name}:{}:{} {}",
            error.source_location.line,
            error.source_location.column,
            error.kind.description()
        );
        if !error.extra_info.is_empty() {
            message.push_str(": ");
            message.push_str(&error.extra_info);
        }
        message.push_str(&format!(" (in {instruction_type} instruction at scope {})", error.scope_index));
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token_kind::TokenKind;

    #[test]
    fn suppressed_errors_are_never_stored() {
        let mut handler = ErrorHandler::new();
        handler.set_severity_policy(ErrorKind::AmbiguousOperatorContext, ErrorSeverity::Suppress);
        handler.register(ContextualizationError::new(
            ErrorKind::AmbiguousOperatorContext,
            0,
            0,
            InstructionType::Body,
            vec![],
        ));
        assert!(handler.errors().is_empty());
    }

    #[test]
    fn default_policy_treats_structural_errors_as_errors() {
        let handler = ErrorHandler::new();
        assert_eq!(handler.get_severity_policy(ErrorKind::IncompleteStatement), ErrorSeverity::Error);
        assert_eq!(handler.get_severity_policy(ErrorKind::AmbiguousOperatorContext), ErrorSeverity::Warning);
    }

    #[test]
    fn source_location_resolves_from_first_token_index() {
        let mut handler = ErrorHandler::new();
        handler.register(ContextualizationError::new(
            ErrorKind::UndeclaredVariable,
            2,
            1,
            InstructionType::Body,
            vec![3],
        ));
        let stream = vec![
            RawToken::new(TokenKind::Identifier, 1, 1, 0),
            RawToken::new(TokenKind::Identifier, 1, 5, 4),
            RawToken::new(TokenKind::Identifier, 1, 9, 8),
            RawToken::new(TokenKind::Identifier, 2, 3, 12),
        ];
        handler.resolve_source_locations(&stream);
        assert_eq!(handler.errors()[0].source_location.line, 2);
        assert_eq!(handler.errors()[0].source_location.column, 3);
    }

    #[test]
    fn config_overlay_replaces_default_severity() {
        let mut handler = ErrorHandler::new();
        let mut config = SeverityPolicyConfig::default();
        config.severity.insert(ErrorKind::MissingTypeInformation, ErrorSeverity::Error);
        handler.apply_config(&config);
        assert_eq!(handler.get_severity_policy(ErrorKind::MissingTypeInformation), ErrorSeverity::Error);
    }
}
