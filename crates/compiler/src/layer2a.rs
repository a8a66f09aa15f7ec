//! Layer 2A: the cache-and-semicolon scope builder (§4.5).

use cprime_core::{BodyElement, ExecAliasRegistry, Footer, Instruction, Scope, ScopeArena, Token, TokenKind};

use crate::error::PipelineError;
use crate::stream_table::StreamTable;

/// Build a scope tree from a flat `Token` view of one stream. `streams`
/// resolves `Token`s to their backing `RawToken` when a literal value (an
/// exec-alias index) needs inspecting.
pub fn build_scopes(
    tokens: &[Token],
    streams: &StreamTable,
    aliases: &mut ExecAliasRegistry,
) -> Result<ScopeArena, PipelineError> {
    let mut arena = ScopeArena::new();
    let mut current = ScopeArena::ROOT;
    let mut cache: Vec<Token> = Vec::new();

    for &token in tokens {
        match token.fine_kind {
            TokenKind::Semicolon => {
                cache.push(token);
                if !arena.get(current).is_exec_scope {
                    flush_instruction(&mut arena, current, &mut cache);
                }
            }
            TokenKind::LeftBrace => {
                let header = std::mem::take(&mut cache);
                let (is_exec, alias) = exec_markers(&header, streams);
                let new_scope = Scope {
                    header: Instruction::new(header),
                    parent_index: current,
                    is_exec_scope: is_exec,
                    ..Default::default()
                };
                let new_index = arena.push(new_scope);
                arena.get_mut(current).instructions.push(BodyElement::ScopeRef(new_index));
                if is_exec {
                    aliases.register_scope_index(new_index);
                    if let Some(idx) = alias {
                        aliases.register_scope_index_to_exec_alias(idx, new_index);
                    }
                }
                current = new_index;
            }
            TokenKind::RightBrace => {
                if current == ScopeArena::ROOT {
                    return Err(PipelineError::UnbalancedScopes {
                        message: "`}` with no matching `{`".to_owned(),
                    });
                }
                let trailing = std::mem::take(&mut cache);
                let is_exec_scope = arena.get(current).is_exec_scope;
                if is_exec_scope {
                    if !trailing.is_empty() {
                        arena.get_mut(current).instructions.push(BodyElement::Instruction(Instruction::new(trailing)));
                    }
                } else {
                    arena.get_mut(current).footer = Footer::Instruction(Instruction::new(trailing));
                }
                current = arena.get(current).parent_index;
            }
            _ => cache.push(token),
        }
    }

    if current != ScopeArena::ROOT {
        return Err(PipelineError::UnbalancedScopes {
            message: "end of stream with unclosed scope".to_owned(),
        });
    }
    flush_instruction(&mut arena, current, &mut cache);

    Ok(arena)
}

fn flush_instruction(arena: &mut ScopeArena, scope_index: u32, cache: &mut Vec<Token>) {
    if cache.is_empty() {
        return;
    }
    let tokens = std::mem::take(cache);
    arena.get_mut(scope_index).instructions.push(BodyElement::Instruction(Instruction::new(tokens)));
}

fn exec_markers(header: &[Token], streams: &StreamTable) -> (bool, Option<cprime_core::ExecAliasIndex>) {
    let mut is_exec = false;
    let mut alias = None;
    for token in header {
        match token.fine_kind {
            TokenKind::Exec => is_exec = true,
            TokenKind::ExecAlias => {
                is_exec = true;
                alias = streams.raw(*token).literal_value.as_exec_alias_index();
            }
            _ => {}
        }
    }
    (is_exec, alias)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cprime_core::{ExecAliasRegistry, StringTable};

    fn build(source: &str) -> (ScopeArena, StreamTable) {
        let mut strings = StringTable::new();
        let mut aliases = ExecAliasRegistry::new();
        let raw = crate::tokenizer::tokenize(source, &mut strings, &aliases);
        let mut streams = StreamTable::new();
        let id = streams.push_stream(raw);
        let view = streams.as_tokens(id);
        let arena = build_scopes(&view, &streams, &mut aliases).unwrap();
        (arena, streams)
    }

    #[test]
    fn flat_statement_becomes_root_instruction() {
        let (arena, _) = build("x;");
        assert_eq!(arena.get(ScopeArena::ROOT).instructions.len(), 1);
    }

    #[test]
    fn brace_pair_creates_a_child_scope() {
        let (arena, _) = build("function main() { x; }");
        assert_eq!(arena.len(), 2);
        let child = match &arena.get(ScopeArena::ROOT).instructions[0] {
            BodyElement::ScopeRef(idx) => *idx,
            _ => panic!("expected scope ref"),
        };
        assert_eq!(arena.get(child).parent_index, ScopeArena::ROOT);
        assert_eq!(arena.get(child).instructions.len(), 1);
    }

    #[test]
    fn unmatched_closing_brace_is_an_error() {
        let mut strings = StringTable::new();
        let mut aliases = ExecAliasRegistry::new();
        let raw = crate::tokenizer::tokenize("}", &mut strings, &aliases);
        let mut streams = StreamTable::new();
        let id = streams.push_stream(raw);
        let view = streams.as_tokens(id);
        let err = build_scopes(&view, &streams, &mut aliases).unwrap_err();
        assert!(matches!(err, PipelineError::UnbalancedScopes { .. }));
    }

    #[test]
    fn unclosed_scope_at_eof_is_an_error() {
        let mut strings = StringTable::new();
        let mut aliases = ExecAliasRegistry::new();
        let raw = crate::tokenizer::tokenize("function main() {", &mut strings, &aliases);
        let mut streams = StreamTable::new();
        let id = streams.push_stream(raw);
        let view = streams.as_tokens(id);
        let err = build_scopes(&view, &streams, &mut aliases).unwrap_err();
        assert!(matches!(err, PipelineError::UnbalancedScopes { .. }));
    }

    #[test]
    fn exec_header_marks_the_scope_and_registers_it() {
        let mut strings = StringTable::new();
        let mut aliases = ExecAliasRegistry::new();
        let raw = crate::tokenizer::tokenize("exec greet<name>(a) { x; }", &mut strings, &aliases);
        let mut streams = StreamTable::new();
        let id = streams.push_stream(raw);
        let view = streams.as_tokens(id);
        let arena = build_scopes(&view, &streams, &mut aliases).unwrap();
        let child = match &arena.get(ScopeArena::ROOT).instructions[0] {
            BodyElement::ScopeRef(idx) => *idx,
            _ => panic!("expected scope ref"),
        };
        assert!(arena.get(child).is_exec_scope);
        assert_eq!(aliases.get_exec_scope_count(), 1);
    }
}
