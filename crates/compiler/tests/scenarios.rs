//! End-to-end scenarios from spec.md §8, plus its boundary behaviours.

use cprime_compiler::{compile_source, layer2a::build_scopes, stream_table::StreamTable, tokenizer::tokenize};
use cprime_core::{BodyElement, ExecAliasRegistry, Footer, ScopeArena, StringTable, TokenKind};

fn tokenize_source(source: &str) -> (Vec<cprime_core::RawToken>, StringTable) {
    let mut strings = StringTable::new();
    let aliases = ExecAliasRegistry::new();
    let raw = tokenize(source, &mut strings, &aliases);
    (raw, strings)
}

/// S1 — Hello identifier.
#[test]
fn s1_hello_identifier() {
    // Layer 1 alone leaves "main" as a CHUNK (§4.4 1E); only Layer 2C, after
    // all exec aliases in the file are known, resolves it to IDENTIFIER.
    let (raw, _) = tokenize_source("main;");
    let kinds: Vec<TokenKind> = raw.iter().map(|t| t.token).collect();
    assert_eq!(kinds, vec![TokenKind::Chunk, TokenKind::Semicolon, TokenKind::EofToken]);

    let unit = compile_source("main;").unwrap();
    assert_eq!(unit.arena.len(), 1);
    let root = unit.arena.get(ScopeArena::ROOT);
    assert_eq!(root.instructions.len(), 1);
    match &root.instructions[0] {
        BodyElement::Instruction(instr) => assert_eq!(instr.tokens.len(), 3),
        _ => panic!("expected an instruction"),
    }
}

/// S2 — Nested scope.
#[test]
fn s2_nested_scope() {
    let mut strings = StringTable::new();
    let mut aliases = ExecAliasRegistry::new();
    let raw = tokenize("{ x; { y; } z; }", &mut strings, &aliases);
    let mut streams = StreamTable::new();
    let id = streams.push_stream(raw);
    let view = streams.as_tokens(id);
    let arena = build_scopes(&view, &streams, &mut aliases).unwrap();

    assert_eq!(arena.len(), 3);
    let outer_idx = match &arena.get(ScopeArena::ROOT).instructions[0] {
        BodyElement::ScopeRef(idx) => *idx,
        _ => panic!("expected scope ref"),
    };
    let outer = arena.get(outer_idx);
    assert_eq!(outer.instructions.len(), 3);
    assert!(matches!(outer.instructions[0], BodyElement::Instruction(_)));
    let inner_idx = match outer.instructions[1] {
        BodyElement::ScopeRef(idx) => idx,
        _ => panic!("expected scope ref in the middle slot"),
    };
    assert!(matches!(outer.instructions[2], BodyElement::Instruction(_)));
    assert_eq!(arena.get(inner_idx).instructions.len(), 1);
}

/// S3 — Integer with suffix.
#[test]
fn s3_integer_with_suffix() {
    let (raw, _) = tokenize_source("42ull;");
    let literal = raw.iter().find(|t| t.token != TokenKind::Semicolon && t.token != TokenKind::EofToken).unwrap();
    assert_eq!(literal.token, TokenKind::UlongLongLiteral);
}

/// S4 — Raw string.
#[test]
fn s4_raw_string() {
    let (raw, strings) = tokenize_source(r#"R"(abc)";"#);
    let literal = raw.iter().find(|t| t.token == TokenKind::RawStringLiteral).expect("raw string literal token");
    let text = literal.literal_value.as_string_index().map(|idx| strings.get(idx)).unwrap();
    assert_eq!(text, r#"R"(abc)""#);
}

/// S5 — Parent exec definition and call, token integration: the call site's
/// `EXEC_ALIAS` span disappears, replaced by the generated tokens.
#[test]
fn s5_parent_exec_call_token_integration() {
    let unit = compile_source(
        r#"exec greet<who> { return '"hi ' .. params[0] .. '"'; } greet<alice>();"#,
    )
    .unwrap();
    assert!(unit.errors.errors().is_empty());

    let root = unit.arena.get(ScopeArena::ROOT);
    let call_site = root
        .instructions
        .iter()
        .filter_map(|e| match e {
            BodyElement::Instruction(instr) => Some(instr),
            _ => None,
        })
        .find(|instr| !instr.tokens.iter().any(|t| t.fine_kind == TokenKind::Exec));
    let instr = call_site.expect("the call-site instruction should still exist");
    assert!(!instr.tokens.iter().any(|t| t.fine_kind == TokenKind::ExecAlias));
    assert!(instr.tokens.iter().any(|t| t.fine_kind == TokenKind::StringLiteral));
}

/// S6 — Shadowing violation halts compilation of the file.
#[test]
fn s6_shadowing_violation_is_fatal() {
    let err = compile_source("class Connection { } module net { class Connection { } }").unwrap_err();
    assert!(matches!(err, cprime_compiler::PipelineError::Shadowing { .. }));
}

/// Boundary behaviour 8: empty input yields a single empty root scope.
#[test]
fn boundary_empty_input() {
    let unit = compile_source("").unwrap();
    assert_eq!(unit.arena.len(), 1);
    let root = unit.arena.get(ScopeArena::ROOT);
    assert!(root.header.tokens.is_empty() || root.header.tokens.iter().all(|t| t.fine_kind == TokenKind::EofToken));
    assert!(root.instructions.is_empty());
    assert!(matches!(&root.footer, Footer::Instruction(instr) if instr.tokens.is_empty()));
}

/// Boundary behaviour 9: whitespace/comments only still produce the same
/// shape, with no non-whitespace instructions.
#[test]
fn boundary_whitespace_and_comments_only() {
    let unit = compile_source("   \n// a comment\n\t\n").unwrap();
    assert_eq!(unit.arena.len(), 1);
    let root = unit.arena.get(ScopeArena::ROOT);
    assert!(root.instructions.is_empty());
}

/// Boundary behaviour 10: an exec block returning the empty string leaves
/// the call site removed under token integration.
#[test]
fn boundary_exec_returning_empty_string() {
    let unit = compile_source("exec noop<x> { return ''; } noop<ignored>();").unwrap();
    assert!(unit.errors.errors().is_empty());
    let root = unit.arena.get(ScopeArena::ROOT);
    let call_instr = root
        .instructions
        .iter()
        .filter_map(|e| match e {
            BodyElement::Instruction(instr) => Some(instr),
            _ => None,
        })
        .find(|instr| !instr.tokens.iter().any(|t| t.fine_kind == TokenKind::Exec));
    let instr = call_instr.expect("call-site instruction should survive, minus the expanded call");
    assert!(!instr.tokens.iter().any(|t| t.fine_kind == TokenKind::ExecAlias));
}

/// Invariant 4: no CHUNK tokens remain after Layer 2D.
#[test]
fn invariant_no_chunk_tokens_remain() {
    let unit = compile_source("foo(); bar; class Widget { baz; }").unwrap();
    for (_, scope) in unit.arena.iter() {
        assert!(!scope.header.tokens.iter().any(|t| t.fine_kind == TokenKind::Chunk));
        for element in &scope.instructions {
            if let BodyElement::Instruction(instr) = element {
                assert!(!instr.tokens.iter().any(|t| t.fine_kind == TokenKind::Chunk));
            }
        }
    }
}

/// Invariant 1: every non-root scope is referenced exactly once by its
/// parent's instruction list or footer.
#[test]
fn invariant_parent_links_consistent() {
    let unit = compile_source("function main() { if (x) { y; } }").unwrap();
    assert!(unit.arena.check_parent_links_consistent());
}
