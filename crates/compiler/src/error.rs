//! Pipeline-fatal error type. Per-token contextualisation failures are
//! recoverable and live in [`cprime_core::ErrorHandler`] instead; this type
//! is reserved for the conditions §7 calls fatal for a file: I/O failure,
//! brace underflow, duplicate alias, shadowing, and exec-expansion failure.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    Io {
        path: String,
        source: String,
    },
    InvalidUtf8 {
        path: String,
        source: String,
    },
    /// `}` with no matching `{`, or end of stream with scopes still open (§7).
    UnbalancedScopes {
        message: String,
    },
    DuplicateExecAlias {
        name: String,
    },
    Shadowing {
        message: String,
    },
    /// Lua syntax/runtime error, or a malformed structured result (§4.9).
    ExecExpansion {
        alias: String,
        message: String,
    },
    /// Generated code contained the literal keyword `exec` (§4.8 step 5).
    NestedExec {
        alias: String,
    },
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineError::Io { path, source } => write!(f, "failed to read {path}: {source}"),
            PipelineError::InvalidUtf8 { path, source } => {
                write!(f, "{path} is not valid UTF-8: {source}")
            }
            PipelineError::UnbalancedScopes { message } => write!(f, "unbalanced scopes: {message}"),
            PipelineError::DuplicateExecAlias { name } => {
                write!(f, "duplicate exec template name: {name}")
            }
            PipelineError::Shadowing { message } => write!(f, "shadowing violation: {message}"),
            PipelineError::ExecExpansion { alias, message } => {
                write!(f, "exec expansion of `{alias}` failed: {message}")
            }
            PipelineError::NestedExec { alias } => {
                write!(f, "exec expansion of `{alias}` produced nested `exec` (single pass only)")
            }
        }
    }
}

impl std::error::Error for PipelineError {}

impl From<cprime_core::ShadowingError> for PipelineError {
    fn from(e: cprime_core::ShadowingError) -> Self {
        PipelineError::Shadowing { message: e.to_string() }
    }
}

impl From<cprime_core::ExecAliasRegistrationError> for PipelineError {
    fn from(e: cprime_core::ExecAliasRegistrationError) -> Self {
        match e {
            cprime_core::ExecAliasRegistrationError::DuplicateGlobalAlias { name }
            | cprime_core::ExecAliasRegistrationError::NamespacedAliasShadowsGlobal { name } => {
                PipelineError::DuplicateExecAlias { name }
            }
        }
    }
}
