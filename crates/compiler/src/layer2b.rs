//! Layer 2B: exec-block compilation into `ExecutableLambda`s (§4.6).
//! Parents are compiled before specialisations, since a specialisation's
//! execution delegates to its parent's Lua script (§4.9).

use cprime_core::{BodyElement, ExecAliasRegistry, ExecutableLambda, Footer, Scope, ScopeArena, StringTable, Token, TokenKind};

use crate::detokenizer::detokenize_refs;
use crate::error::PipelineError;
use crate::stream_table::StreamTable;

pub fn compile_exec_scopes(
    arena: &ScopeArena,
    streams: &StreamTable,
    strings: &StringTable,
    aliases: &mut ExecAliasRegistry,
) -> Result<(), PipelineError> {
    let exec_scopes: Vec<u32> = arena.iter().filter(|(_, s)| s.is_exec_scope).map(|(i, _)| i).collect();

    for &scope_index in &exec_scopes {
        let scope = arena.get(scope_index);
        let idents = identifiers_outside_brackets(&scope.header.tokens);
        if idents.len() != 1 {
            continue;
        }
        compile_parent(scope_index, scope, idents[0], arena, streams, strings, aliases)?;
    }

    for &scope_index in &exec_scopes {
        let scope = arena.get(scope_index);
        let idents = identifiers_outside_brackets(&scope.header.tokens);
        if idents.len() < 2 {
            continue;
        }
        compile_specialization(scope_index, idents[0], arena, streams, strings, aliases)?;
    }

    Ok(())
}

fn compile_parent(
    scope_index: u32,
    scope: &Scope,
    name_token: Token,
    arena: &ScopeArena,
    streams: &StreamTable,
    strings: &StringTable,
    aliases: &mut ExecAliasRegistry,
) -> Result<(), PipelineError> {
    let name = ident_text(name_token, streams, strings);
    let existing = aliases.get_alias_index_with_context(&name, &[]);
    let alias_index = if existing.is_valid() { existing } else { aliases.register_alias(&name)? };
    aliases.register_scope_index_to_exec_alias(alias_index, scope_index);

    let body = flatten_body(scope_index, arena);
    let text = body_text(&body, streams, strings);
    aliases.update_executable_lambda(scope_index, ExecutableLambda::parent(normalize_indentation(&text)));
    Ok(())
}

fn compile_specialization(
    scope_index: u32,
    parent_name_token: Token,
    arena: &ScopeArena,
    streams: &StreamTable,
    strings: &StringTable,
    aliases: &mut ExecAliasRegistry,
) -> Result<(), PipelineError> {
    let parent_name = ident_text(parent_name_token, streams, strings);
    aliases.register_specialization_to_parent(scope_index, &parent_name);

    let body = flatten_body(scope_index, arena);
    let text = body_text(&body, streams, strings);
    aliases.update_executable_lambda(scope_index, ExecutableLambda::specialization(normalize_indentation(&text)));
    Ok(())
}

/// Identifier-like tokens (`CHUNK`/`IDENTIFIER`/`EXEC_ALIAS`) in the header
/// that follow the `exec` keyword but sit outside any `< >` nesting.
fn identifiers_outside_brackets(header: &[Token]) -> Vec<Token> {
    let mut result = Vec::new();
    let mut depth = 0i32;
    let mut seen_exec = false;
    for &token in header {
        match token.fine_kind {
            TokenKind::Exec => seen_exec = true,
            TokenKind::LessThan if seen_exec => depth += 1,
            TokenKind::GreaterThan if seen_exec && depth > 0 => depth -= 1,
            TokenKind::Chunk | TokenKind::Identifier | TokenKind::ExecAlias if seen_exec && depth == 0 => {
                result.push(token);
            }
            _ => {}
        }
    }
    result
}

fn ident_text(token: Token, streams: &StreamTable, strings: &StringTable) -> String {
    streams
        .raw(token)
        .literal_value
        .as_string_index()
        .map(|idx| strings.get(idx).to_owned())
        .unwrap_or_default()
}

/// All tokens belonging to a scope's body and footer, recursing into any
/// nested scopes (a brace pair inside an exec body, e.g. a Lua table
/// literal, is itself structured by 2A and must be flattened back in).
fn flatten_body(scope_index: u32, arena: &ScopeArena) -> Vec<Token> {
    let scope = arena.get(scope_index);
    let mut out = Vec::new();
    for element in &scope.instructions {
        match element {
            BodyElement::Instruction(instr) => out.extend(instr.tokens.iter().copied()),
            BodyElement::ScopeRef(idx) => {
                out.extend(arena.get(*idx).header.tokens.iter().copied());
                out.extend(flatten_body(*idx, arena));
                if let Footer::Instruction(instr) = &arena.get(*idx).footer {
                    out.extend(instr.tokens.iter().copied());
                }
            }
        }
    }
    if let Footer::Instruction(instr) = &scope.footer {
        out.extend(instr.tokens.iter().copied());
    }
    out
}

fn body_text(tokens: &[Token], streams: &StreamTable, strings: &StringTable) -> String {
    let stripped = tokens
        .iter()
        .filter(|t| !matches!(t.fine_kind, TokenKind::LeftBrace | TokenKind::RightBrace | TokenKind::Semicolon))
        .map(|t| streams.raw(*t));
    detokenize_refs(stripped, strings)
}

fn normalize_indentation(text: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let common = lines
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);
    let stripped = lines
        .iter()
        .map(|l| if l.len() >= common { &l[common..] } else { l.trim_start() })
        .collect::<Vec<_>>()
        .join("\n");
    if text.ends_with('\n') {
        stripped + "\n"
    } else {
        stripped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer2a::build_scopes;
    use cprime_core::ExecAliasRegistry;

    fn compile(source: &str) -> (ScopeArena, ExecAliasRegistry, StreamTable, StringTable) {
        let mut strings = StringTable::new();
        let mut aliases = ExecAliasRegistry::new();
        let raw = crate::tokenizer::tokenize(source, &mut strings, &aliases);
        let mut streams = StreamTable::new();
        let id = streams.push_stream(raw);
        let view = streams.as_tokens(id);
        let arena = build_scopes(&view, &streams, &mut aliases).unwrap();
        compile_exec_scopes(&arena, &streams, &strings, &mut aliases).unwrap();
        (arena, aliases, streams, strings)
    }

    #[test]
    fn parent_exec_is_registered_and_compiled() {
        let (_, aliases, _, _) = compile("exec greet<name> { return cprime.emit(name); }");
        assert!(aliases.contains_alias("greet"));
        let idx = aliases.get_alias_index("greet");
        let lambda = aliases.get_executable_lambda_by_alias(idx).unwrap();
        assert!(!lambda.is_specialization());
        assert!(lambda.lua_script.contains("cprime.emit(name)"));
    }

    #[test]
    fn specialization_links_to_parent_and_keeps_literal_body() {
        // Scope 0 is root, scope 1 the parent exec block, scope 2 the
        // specialisation, in source order.
        let (_, aliases, _, _) =
            compile("exec greet<name> { return cprime.emit(name); } exec greet loud { x; }");
        assert_eq!(aliases.get_parent_alias_name(2), Some("greet"));
    }

    #[test]
    fn common_indentation_is_stripped() {
        assert_eq!(normalize_indentation("  a\n  b\n"), "a\nb\n");
        assert_eq!(normalize_indentation("    a\n\n    b"), "a\n\nb");
    }
}
