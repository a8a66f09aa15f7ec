//! Front-end compilation pipeline for CPrime (SPEC_FULL.md §1): Layer 0
//! ingestion, Layer 1 tokenisation, Layer 2A-2D structuring, and the exec/Lua
//! metaprogramming contract. `cprime-cli` is the only intended caller of
//! [`compile_file`]/[`compile_source`]; everything else is exposed for tests
//! and tooling (dump modes, lints) built on top of a [`CompilationUnit`].

pub mod detokenizer;
pub mod error;
pub mod layer0;
pub mod layer2a;
pub mod layer2b;
pub mod layer2c;
pub mod layer2d;
pub mod stream_table;
pub mod tokenizer;

use std::path::Path;

use cprime_core::{ErrorHandler, ExecAliasRegistry, FunctionRegistry, ScopeArena, SeverityPolicyConfig, StringTable, TypeRegistry};

pub use error::PipelineError;
pub use stream_table::StreamTable;

/// Everything produced by running one source file through the whole
/// pipeline: the scope tree, the interned strings and token streams behind
/// it, the populated registries, and any accumulated contextualisation
/// errors. Kept together because every later stage (dump modes, a future
/// language server) needs several of these fields at once.
pub struct CompilationUnit {
    pub arena: ScopeArena,
    pub streams: StreamTable,
    pub strings: StringTable,
    pub aliases: ExecAliasRegistry,
    pub types: TypeRegistry,
    pub functions: FunctionRegistry,
    pub errors: ErrorHandler,
}

/// Read `path` (Layer 0) and run it through [`compile_source`].
pub fn compile_file(path: &Path) -> Result<CompilationUnit, PipelineError> {
    compile_file_with_config(path, &SeverityPolicyConfig::default())
}

/// Like [`compile_file`], overlaying `config` on top of the default
/// severity policy (SPEC_FULL.md §2) before any per-token error is raised.
pub fn compile_file_with_config(path: &Path, config: &SeverityPolicyConfig) -> Result<CompilationUnit, PipelineError> {
    let _span = tracing::info_span!("compile_file", path = %path.display()).entered();
    let source = layer0::read_source(path)?;
    compile_source_with_config(&source, config)
}

/// Run `source` through Layer 1 and the four structuring passes.
pub fn compile_source(source: &str) -> Result<CompilationUnit, PipelineError> {
    compile_source_with_config(source, &SeverityPolicyConfig::default())
}

pub fn compile_source_with_config(source: &str, config: &SeverityPolicyConfig) -> Result<CompilationUnit, PipelineError> {
    let mut strings = StringTable::new();
    let mut aliases = ExecAliasRegistry::new();

    let raw = tokenizer::tokenize(source, &mut strings, &aliases);
    let mut streams = StreamTable::new();
    let stream_id = streams.push_stream(raw);
    let view = streams.as_tokens(stream_id);

    let mut arena = layer2a::build_scopes(&view, &streams, &mut aliases)?;
    layer2b::compile_exec_scopes(&arena, &streams, &strings, &mut aliases)?;
    layer2c::resolve_chunks(&mut arena, &mut streams, &strings, &aliases);

    let mut types = TypeRegistry::new();
    let mut functions = FunctionRegistry::new();
    let mut errors = layer2d::contextualize(&mut arena, &mut streams, &mut strings, &mut aliases, &mut types, &mut functions)?;

    errors.apply_config(config);
    errors.resolve_source_locations(streams.stream(0));

    tracing::info!(scopes = arena.len(), errors = errors.errors().len(), "compilation finished");
    Ok(CompilationUnit {
        arena,
        streams,
        strings,
        aliases,
        types,
        functions,
        errors,
    })
}

/// Load a severity-policy overlay from a TOML file (SPEC_FULL.md §2).
pub fn load_severity_config(path: &Path) -> Result<SeverityPolicyConfig, PipelineError> {
    let text = std::fs::read_to_string(path).map_err(|e| PipelineError::Io {
        path: path.display().to_string(),
        source: e.to_string(),
    })?;
    toml::from_str(&text).map_err(|e| PipelineError::Io {
        path: path.display().to_string(),
        source: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiling_empty_source_yields_only_the_root_scope() {
        let unit = compile_source("").unwrap();
        assert_eq!(unit.arena.len(), 1);
        assert!(unit.errors.errors().is_empty());
    }

    #[test]
    fn compiling_whitespace_and_comments_only_produces_no_instructions() {
        let unit = compile_source("   \n// just a comment\n\t\n").unwrap();
        assert_eq!(unit.arena.len(), 1);
        assert!(unit.arena.get(ScopeArena::ROOT).instructions.is_empty());
    }

    #[test]
    fn a_class_with_a_field_registers_a_type_and_an_instantiation() {
        let unit = compile_source("class Widget { int32_t id = 0; }").unwrap();
        assert!(unit.errors.errors().is_empty());
        assert_eq!(unit.types.total_registered_types(), 1);
    }

    #[test]
    fn an_exec_block_expands_its_own_call_site() {
        let unit = compile_source(
            "exec make_const<name> { return cprime.emit_line('int32_t ' .. params[0] .. ' = 0;'); } make_const<count>();",
        )
        .unwrap();
        assert!(unit.errors.errors().is_empty());
        assert!(unit.arena.len() >= 2);
    }

    #[test]
    fn unbalanced_braces_are_reported_as_a_fatal_pipeline_error() {
        let err = compile_source("class Widget {").unwrap_err();
        assert!(matches!(err, PipelineError::UnbalancedScopes { .. }));
    }
}
