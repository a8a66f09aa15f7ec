//! Layer 2C: chunk disambiguation (§4.7). Every `CHUNK` token left behind
//! by Layer 1's empty-registry lookup is re-examined now that Layer 2B has
//! registered all of this file's exec aliases.
//!
//! As a side effect this pass also computes and stores each scope's
//! `namespace_context` (derived from the module/class/struct/interface/union
//! introducer in its own header and its ancestor chain), since resolving a
//! `CHUNK` needs the same namespace-aware lookup §4.3 describes, and Layer
//! 2D's registry population consumes the same field afterwards.

use cprime_core::{BodyElement, ExecAliasRegistry, Footer, LiteralValue, ScopeArena, StringTable, Token, TokenKind};

use crate::stream_table::StreamTable;

pub fn resolve_chunks(arena: &mut ScopeArena, streams: &mut StreamTable, strings: &StringTable, aliases: &ExecAliasRegistry) {
    let namespaces: Vec<Vec<String>> = (0..arena.len() as u32).map(|idx| namespace_path(idx, arena, streams, strings)).collect();

    for (scope_index, scope) in arena.iter_mut() {
        scope.namespace_context = namespaces[scope_index as usize].clone();
        let namespace = &namespaces[scope_index as usize];

        resolve_in_tokens(&mut scope.header.tokens, namespace, streams, strings, aliases);
        for element in &mut scope.instructions {
            if let BodyElement::Instruction(instr) = element {
                resolve_in_tokens(&mut instr.tokens, namespace, streams, strings, aliases);
            }
        }
        if let Footer::Instruction(instr) = &mut scope.footer {
            resolve_in_tokens(&mut instr.tokens, namespace, streams, strings, aliases);
        }
    }
}

fn resolve_in_tokens(
    tokens: &mut [Token],
    namespace: &[String],
    streams: &mut StreamTable,
    strings: &StringTable,
    aliases: &ExecAliasRegistry,
) {
    for token in tokens.iter_mut() {
        if token.fine_kind != TokenKind::Chunk {
            continue;
        }
        let name = streams
            .raw(*token)
            .literal_value
            .as_string_index()
            .map(|idx| strings.get(idx).to_owned())
            .unwrap_or_default();

        if let Some(alias_idx) = aliases.lookup_alias_with_context(&name, namespace) {
            let raw = streams.raw_mut(*token);
            raw.token = TokenKind::ExecAlias;
            raw.raw_token = TokenKind::ExecAlias.raw_class();
            raw.literal_value = LiteralValue::ExecAlias(alias_idx);
            token.fine_kind = TokenKind::ExecAlias;
        } else {
            let raw = streams.raw_mut(*token);
            raw.token = TokenKind::Identifier;
            raw.raw_token = TokenKind::Identifier.raw_class();
            token.fine_kind = TokenKind::Identifier;
        }
    }
}

fn namespace_path(scope_index: u32, arena: &ScopeArena, streams: &StreamTable, strings: &StringTable) -> Vec<String> {
    let mut chain = Vec::new();
    let mut idx = scope_index;
    loop {
        let scope = arena.get(idx);
        if let Some(name) = namespace_segment(&scope.header.tokens, streams, strings) {
            chain.push(name);
        }
        if idx == ScopeArena::ROOT {
            break;
        }
        idx = scope.parent_index;
    }
    chain.reverse();
    chain
}

fn namespace_segment(header: &[Token], streams: &StreamTable, strings: &StringTable) -> Option<String> {
    let mut iter = header.iter();
    while let Some(token) = iter.next() {
        if !matches!(
            token.fine_kind,
            TokenKind::Module | TokenKind::Class | TokenKind::Struct | TokenKind::Interface | TokenKind::Union
        ) {
            continue;
        }
        for next in iter.by_ref() {
            if next.fine_kind.is_whitespace_or_formatting() {
                continue;
            }
            if matches!(next.fine_kind, TokenKind::Chunk | TokenKind::Identifier) {
                return streams.raw(*next).literal_value.as_string_index().map(|i| strings.get(i).to_owned());
            }
            break;
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer2a::build_scopes;
    use cprime_core::TokenKind;

    #[test]
    fn chunk_resolves_to_exec_alias_once_registered() {
        let mut strings = StringTable::new();
        let mut aliases = ExecAliasRegistry::new();
        let raw = crate::tokenizer::tokenize("exec greet<name> { x; } greet<bob>();", &mut strings, &aliases);
        let mut streams = StreamTable::new();
        let id = streams.push_stream(raw);
        let view = streams.as_tokens(id);
        let mut arena = build_scopes(&view, &streams, &mut aliases).unwrap();
        crate::layer2b::compile_exec_scopes(&arena, &streams, &strings, &mut aliases).unwrap();

        resolve_chunks(&mut arena, &mut streams, &strings, &aliases);

        let root = arena.get(ScopeArena::ROOT);
        let call_instruction = root
            .instructions
            .iter()
            .filter_map(|e| match e {
                BodyElement::Instruction(instr) => Some(instr),
                _ => None,
            })
            .find(|instr| instr.tokens.iter().any(|t| t.fine_kind == TokenKind::ExecAlias))
            .expect("the call-site instruction should resolve an exec alias");
        assert!(call_instruction.tokens.iter().any(|t| t.fine_kind == TokenKind::ExecAlias));
    }

    #[test]
    fn unresolved_chunk_is_promoted_to_identifier() {
        let mut strings = StringTable::new();
        let mut aliases = ExecAliasRegistry::new();
        let raw = crate::tokenizer::tokenize("x;", &mut strings, &aliases);
        let mut streams = StreamTable::new();
        let id = streams.push_stream(raw);
        let view = streams.as_tokens(id);
        let mut arena = build_scopes(&view, &streams, &mut aliases).unwrap();

        resolve_chunks(&mut arena, &mut streams, &strings, &aliases);

        let root = arena.get(ScopeArena::ROOT);
        let instr = match &root.instructions[0] {
            BodyElement::Instruction(instr) => instr,
            _ => panic!("expected instruction"),
        };
        assert_eq!(instr.tokens[0].fine_kind, TokenKind::Identifier);
    }
}
