//! Layer 2D: contextualisation, registry population, and exec expansion
//! (§4.8). The only structuring pass that can change the shape of the scope
//! tree after Layer 2A built it — a `scope_insert`/`scope_create` exec
//! result re-enters Layer 1 and Layer 2A on the generated fragment and
//! splices the result back in.
//!
//! Grounded on `original_source/compiler/src/layer2/contextualization/exec_processing.cpp`
//! for the three call-site shapes (`ALIAS_CALL`, `DIRECT_CALL`, `NONAME_EXEC`)
//! and the backward-scope-index search a noname invocation uses to find its
//! lambda. That file's own parameter-extraction path is a placeholder
//! (hardcoded strings, a `TODO`) rather than a real implementation — see
//! DESIGN.md for the call made here instead: detokenised literal text of
//! each top-level comma-separated segment between the brackets.

use std::cell::RefCell;
use std::rc::Rc;

use cprime_core::{
    BodyElement, CallSite, ContextualRole, ContextualToken, ContextualizationError, ErrorHandler, ErrorKind,
    ExecAliasIndex, ExecAliasRegistry, ExecutableLambda, Footer, FunctionDescriptor, FunctionRegistry,
    Instruction, InstructionType, LiteralValue, RawToken, Scope, ScopeArena, StringTable, Token, TokenKind,
    TypeDescriptor, TypeRegistry, GLOBAL_NAMESPACE,
};

use crate::detokenizer::detokenize_refs;
use crate::error::PipelineError;
use crate::layer2a::build_scopes;
use crate::stream_table::StreamTable;
use crate::tokenizer::tokenize;

/// Runs Layer 2D over every scope currently in `arena`, in index order.
/// Scopes appended mid-walk by exec expansion are visited in turn, since the
/// loop re-reads `arena.len()` every iteration (§4.8 Ordering Guarantees).
pub fn contextualize(
    arena: &mut ScopeArena,
    streams: &mut StreamTable,
    strings: &mut StringTable,
    aliases: &mut ExecAliasRegistry,
    types: &mut TypeRegistry,
    functions: &mut FunctionRegistry,
) -> Result<ErrorHandler, PipelineError> {
    let _span = tracing::debug_span!("layer2d").entered();
    let mut errors = ErrorHandler::new();

    let mut scope_index = 0u32;
    while scope_index < arena.len() as u32 {
        register_namespace_and_declarations(scope_index, arena, streams, strings, types, functions)?;
        let namespace = arena.get(scope_index).namespace_context.clone();

        process_header(scope_index, &namespace, arena, streams, strings, aliases, types, functions, &mut errors)?;
        process_body(scope_index, &namespace, arena, streams, strings, aliases, types, functions, &mut errors)?;
        process_footer(scope_index, &namespace, arena, streams, strings, aliases, types, functions, &mut errors)?;

        scope_index += 1;
    }

    tracing::debug!(scopes = arena.len(), errors = errors.errors().len(), "layer2d complete");
    Ok(errors)
}

// ---------------------------------------------------------------------
// Registry population (§4.8b)
// ---------------------------------------------------------------------

enum DeclKind {
    Type,
    Function,
}

fn register_namespace_and_declarations(
    scope_index: u32,
    arena: &ScopeArena,
    streams: &StreamTable,
    strings: &StringTable,
    types: &mut TypeRegistry,
    functions: &mut FunctionRegistry,
) -> Result<(), PipelineError> {
    let scope = arena.get(scope_index);
    let namespace = scope.namespace_context.last().map(String::as_str).unwrap_or(GLOBAL_NAMESPACE).to_owned();
    let parent_namespace = if scope.namespace_context.len() >= 2 {
        scope.namespace_context[scope.namespace_context.len() - 2].clone()
    } else {
        GLOBAL_NAMESPACE.to_owned()
    };

    if namespace != GLOBAL_NAMESPACE {
        types.register_namespace(&namespace, &parent_namespace);
        functions.register_namespace(&namespace, &parent_namespace);
    }

    let Some((kind, ident_token)) = declaration_in_header(&scope.header.tokens) else {
        return Ok(());
    };
    let Some(ident_idx) = streams.raw(ident_token).literal_value.as_string_index() else {
        return Ok(());
    };

    match kind {
        // A class/struct/interface/union header's own namespace_context entry
        // *is* the type being declared (§4.7's namespace_segment), so the
        // declaration belongs one level up.
        DeclKind::Type => {
            types.register_type_declaration(&parent_namespace, ident_idx, TypeDescriptor { namespace: parent_namespace.clone() })?;
        }
        // Function headers don't introduce a namespace_context segment of
        // their own, so the declaration belongs to the enclosing namespace.
        DeclKind::Function => {
            let qualified = format!("{namespace}::{}", strings.get(ident_idx));
            functions.register_function_declaration(
                &namespace,
                ident_idx,
                FunctionDescriptor {
                    namespace: namespace.clone(),
                    parameter_types: Vec::new(),
                    qualified_name: qualified,
                },
            )?;
        }
    }
    Ok(())
}

/// Mirrors `layer2c::namespace_segment`'s keyword scan, but also recognises
/// the function-introducing keywords (which don't carry a namespace segment
/// of their own).
fn declaration_in_header(header: &[Token]) -> Option<(DeclKind, Token)> {
    let mut iter = header.iter();
    while let Some(&token) = iter.next() {
        let kind = match token.fine_kind {
            TokenKind::Class | TokenKind::Struct | TokenKind::Interface | TokenKind::Union => DeclKind::Type,
            TokenKind::Function | TokenKind::Functional | TokenKind::Func => DeclKind::Function,
            _ => continue,
        };
        for &next in iter.by_ref() {
            if next.fine_kind.is_whitespace_or_formatting() {
                continue;
            }
            if matches!(next.fine_kind, TokenKind::Identifier | TokenKind::Chunk) {
                return Some((kind, next));
            }
            break;
        }
    }
    None
}

// ---------------------------------------------------------------------
// Contextual classification (§4.8a)
// ---------------------------------------------------------------------

#[allow(clippy::too_many_arguments)]
fn classify_instruction(
    instr: &mut Instruction,
    scope_index: u32,
    instruction_index: u32,
    instruction_type: InstructionType,
    streams: &StreamTable,
    strings: &StringTable,
    namespace: &[String],
    types: &mut TypeRegistry,
    functions: &mut FunctionRegistry,
    errors: &mut ErrorHandler,
) {
    let tokens = &instr.tokens;
    let sig: Vec<usize> = (0..tokens.len()).filter(|&i| !tokens[i].fine_kind.is_whitespace_or_formatting()).collect();
    let mut roles: Vec<Option<ContextualRole>> = vec![None; tokens.len()];
    let current_namespace = namespace.last().map(String::as_str).unwrap_or(GLOBAL_NAMESPACE);

    for (pos, &i) in sig.iter().enumerate() {
        if roles[i].is_some() {
            continue;
        }
        let kind = tokens[i].fine_kind;

        if is_control_flow_kind(kind) {
            roles[i] = Some(ContextualRole::ControlFlow);
            continue;
        }
        if kind == TokenKind::Defer {
            roles[i] = Some(ContextualRole::ResourceManagement);
            continue;
        }
        if matches!(kind, TokenKind::LeftBrace | TokenKind::RightBrace) {
            roles[i] = Some(ContextualRole::ScopeReference);
            continue;
        }
        if matches!(kind, TokenKind::Identifier | TokenKind::Chunk | TokenKind::ExecAlias) {
            if let Some(&next_i) = sig.get(pos + 1) {
                if tokens[next_i].fine_kind == TokenKind::LeftParen {
                    roles[i] = Some(ContextualRole::FunctionCall);
                    let name = identifier_text(tokens[i], streams, strings);
                    let qualified = format!("{current_namespace}::{name}");
                    functions.mark_function_called(&qualified, CallSite { scope_index, instruction_index });
                    continue;
                }
            }
        }
        if is_type_introducer(kind) || matches!(kind, TokenKind::Identifier | TokenKind::Chunk) {
            if let (Some(&name_i), Some(&term_i)) = (sig.get(pos + 1), sig.get(pos + 2)) {
                if matches!(tokens[name_i].fine_kind, TokenKind::Identifier | TokenKind::Chunk)
                    && matches!(tokens[term_i].fine_kind, TokenKind::Assign | TokenKind::Semicolon)
                {
                    roles[i] = Some(ContextualRole::TypeReference);
                    roles[name_i] = Some(ContextualRole::VariableDeclaration);
                    if let Some(type_idx) = streams.raw(tokens[i]).literal_value.as_string_index() {
                        types.mark_type_instantiated(current_namespace, type_idx);
                    }
                    continue;
                }
            }
        }
        if kind == TokenKind::Assign {
            roles[i] = Some(ContextualRole::Assignment);
            continue;
        }
        if is_operator_kind(kind) {
            roles[i] = Some(ContextualRole::Operator);
            continue;
        }
        if kind.is_literal() {
            roles[i] = Some(ContextualRole::LiteralValue);
            continue;
        }
        if matches!(kind, TokenKind::Identifier | TokenKind::Chunk) {
            roles[i] = Some(ContextualRole::VariableReference);
            continue;
        }
        roles[i] = Some(ContextualRole::Expression);
    }

    for (i, token) in tokens.iter().enumerate() {
        let role = if token.fine_kind.is_whitespace_or_formatting() {
            if token.fine_kind == TokenKind::Comment {
                ContextualRole::Formatting
            } else {
                ContextualRole::Whitespace
            }
        } else {
            roles[i].unwrap_or(ContextualRole::Invalid)
        };
        if role == ContextualRole::Invalid {
            errors.register(
                ContextualizationError::new(
                    ErrorKind::UnsupportedTokenPattern,
                    scope_index,
                    instruction_index,
                    instruction_type,
                    vec![token.token_index],
                )
                .with_extra_info("token did not match any recognised contextual pattern"),
            );
        }
        instr.contextual_tokens.push(ContextualToken::new(role, vec![i as u32]));
    }
}

fn is_control_flow_kind(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::If
            | TokenKind::Else
            | TokenKind::While
            | TokenKind::For
            | TokenKind::Return
            | TokenKind::Break
            | TokenKind::Continue
            | TokenKind::Try
            | TokenKind::Catch
            | TokenKind::Recover
            | TokenKind::Finally
            | TokenKind::Signal
            | TokenKind::Except
            | TokenKind::Raise
    )
}

fn is_operator_kind(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Plus
            | TokenKind::Minus
            | TokenKind::Multiply
            | TokenKind::Divide
            | TokenKind::Modulo
            | TokenKind::Equals
            | TokenKind::NotEquals
            | TokenKind::LessThan
            | TokenKind::GreaterThan
            | TokenKind::LessEqual
            | TokenKind::GreaterEqual
            | TokenKind::LogicalAnd
            | TokenKind::LogicalOr
            | TokenKind::LogicalNot
            | TokenKind::FieldLink
            | TokenKind::BitwiseAnd
            | TokenKind::BitwiseOr
            | TokenKind::BitwiseXor
            | TokenKind::BitwiseNot
            | TokenKind::Dereference
            | TokenKind::ScopeResolution
    )
}

fn is_type_introducer(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Int8T
            | TokenKind::Int16T
            | TokenKind::Int32T
            | TokenKind::Int64T
            | TokenKind::Uint8T
            | TokenKind::Uint16T
            | TokenKind::Uint32T
            | TokenKind::Uint64T
            | TokenKind::SizeT
            | TokenKind::Float
            | TokenKind::Double
            | TokenKind::Bool
            | TokenKind::Char
            | TokenKind::Void
            | TokenKind::Auto
            | TokenKind::Const
            | TokenKind::Static
    )
}

fn identifier_text(token: Token, streams: &StreamTable, strings: &StringTable) -> String {
    streams.raw(token).literal_value.as_string_index().map(|idx| strings.get(idx).to_owned()).unwrap_or_default()
}

// ---------------------------------------------------------------------
// Exec expansion (§4.8c, §4.9)
// ---------------------------------------------------------------------

#[derive(Debug, Clone)]
struct ExecCall {
    start: usize,
    end: usize,
    kind: ExecCallKind,
    params: Vec<String>,
}

#[derive(Debug, Clone, Copy)]
enum ExecCallKind {
    /// Covers both `ALIAS_CALL` (the `CHUNK` already resolved to
    /// `EXEC_ALIAS` by Layer 2C) and `DIRECT_CALL` — post-2C they're
    /// indistinguishable, both already carry a resolved alias index.
    Alias(ExecAliasIndex),
    /// A bare `<params>` invoking the nearest enclosing exec lambda.
    Noname,
}

#[derive(Debug, Clone, Default)]
struct ExecResult {
    generated_code: String,
    integration_type: String,
    identifier: String,
    is_valid: bool,
}

/// Scans `tokens` for an exec invocation and, if one is found, executes its
/// lambda. Returns `None` when no invocation is present — the common case.
fn expand_in_tokens(
    tokens: &[Token],
    scope_index: u32,
    arena: &ScopeArena,
    streams: &StreamTable,
    strings: &StringTable,
    aliases: &ExecAliasRegistry,
) -> Result<Option<(ExecCall, ExecResult, String)>, PipelineError> {
    let Some(call) = find_exec_call(tokens, streams, strings) else {
        return Ok(None);
    };

    let (lambda, spec_body, alias_name): (ExecutableLambda, Option<String>, String) = match call.kind {
        ExecCallKind::Alias(idx) => {
            let name = aliases.get_alias(idx).to_owned();
            let (lambda, spec_body) = resolve_lambda_for_alias(idx, aliases).ok_or_else(|| PipelineError::ExecExpansion {
                alias: name.clone(),
                message: "no executable lambda registered for this alias".to_owned(),
            })?;
            (lambda, spec_body, name)
        }
        ExecCallKind::Noname => {
            let lambda = resolve_noname_lambda(scope_index, aliases).ok_or_else(|| PipelineError::ExecExpansion {
                alias: "<noname>".to_owned(),
                message: "no enclosing exec lambda found for a noname invocation".to_owned(),
            })?;
            (lambda, None, "<noname>".to_owned())
        }
    };
    let _ = arena;

    let mut lua_params = Vec::new();
    lua_params.extend(spec_body);
    lua_params.extend(call.params.clone());

    let result = execute_lua(&lambda, &lua_params, &alias_name)?;
    Ok(Some((call, result, alias_name)))
}

/// A specialisation delegates to its parent's Lua script with its own
/// literal CPrime body prepended as the first parameter (§4.9).
fn resolve_lambda_for_alias(alias_idx: ExecAliasIndex, aliases: &ExecAliasRegistry) -> Option<(ExecutableLambda, Option<String>)> {
    let lambda = aliases.get_executable_lambda_by_alias(alias_idx)?;
    if lambda.is_specialization() {
        let body = lambda.specialization_body().unwrap_or_default().to_owned();
        let scope_idx = aliases.get_scope_for_alias(alias_idx)?;
        let parent_name = aliases.get_parent_alias_name(scope_idx)?.to_owned();
        let parent_idx = aliases.get_alias_index(&parent_name);
        let parent_lambda = aliases.get_executable_lambda_by_alias(parent_idx)?;
        Some((parent_lambda.clone(), Some(body)))
    } else {
        Some((lambda.clone(), None))
    }
}

/// A noname invocation binds to the nearest lambda at or before the current
/// scope, walking strictly by decreasing scope index (grounded on
/// `exec_processing.cpp`'s `get_executable_lambda` retry loop).
fn resolve_noname_lambda(current_scope: u32, aliases: &ExecAliasRegistry) -> Option<ExecutableLambda> {
    let mut idx = current_scope as i64;
    while idx >= 0 {
        if let Some(lambda) = aliases.get_executable_lambda(idx as u32) {
            if !lambda.is_empty() {
                return Some(lambda.clone());
            }
        }
        idx -= 1;
    }
    None
}

fn find_exec_call(tokens: &[Token], streams: &StreamTable, strings: &StringTable) -> Option<ExecCall> {
    let significant: Vec<usize> = (0..tokens.len()).filter(|&i| !tokens[i].fine_kind.is_whitespace_or_formatting()).collect();
    if significant.is_empty() {
        return None;
    }

    if let Some(cursor) = significant.iter().position(|&i| tokens[i].fine_kind == TokenKind::ExecAlias) {
        let alias_pos = significant[cursor];
        let alias_idx = streams.raw(tokens[alias_pos]).literal_value.as_exec_alias_index()?;
        let mut end = alias_pos;
        let mut params = Vec::new();
        let mut next_cursor = cursor + 1;

        if let Some(&i) = significant.get(next_cursor) {
            if tokens[i].fine_kind == TokenKind::LessThan {
                let (close, segs) = scan_bracket(&significant, next_cursor, tokens, streams, strings, TokenKind::LessThan, TokenKind::GreaterThan)?;
                params.extend(segs);
                end = significant[close];
                next_cursor = close + 1;
            }
        }
        if let Some(&i) = significant.get(next_cursor) {
            if tokens[i].fine_kind == TokenKind::LeftParen {
                let (close, segs) = scan_bracket(&significant, next_cursor, tokens, streams, strings, TokenKind::LeftParen, TokenKind::RightParen)?;
                params.extend(segs);
                end = significant[close];
            }
        }

        return Some(ExecCall { start: alias_pos, end, kind: ExecCallKind::Alias(alias_idx), params });
    }

    let first = significant[0];
    if tokens[first].fine_kind == TokenKind::LessThan {
        let (close, segs) = scan_bracket(&significant, 0, tokens, streams, strings, TokenKind::LessThan, TokenKind::GreaterThan)?;
        return Some(ExecCall { start: first, end: significant[close], kind: ExecCallKind::Noname, params: segs });
    }

    None
}

/// Scans a bracketed, possibly nested span starting at `significant[open_cursor]`
/// (which must hold `open_kind`), splitting top-level commas into segments.
/// Returns the `significant` index of the matching close bracket.
#[allow(clippy::too_many_arguments)]
fn scan_bracket(
    significant: &[usize],
    open_cursor: usize,
    tokens: &[Token],
    streams: &StreamTable,
    strings: &StringTable,
    open_kind: TokenKind,
    close_kind: TokenKind,
) -> Option<(usize, Vec<String>)> {
    let mut depth = 0i32;
    let mut segments = Vec::new();
    let mut seg_start = open_cursor + 1;

    for cursor in open_cursor..significant.len() {
        let kind = tokens[significant[cursor]].fine_kind;
        if kind == open_kind {
            depth += 1;
        } else if kind == close_kind {
            depth -= 1;
            if depth == 0 {
                if cursor > seg_start {
                    segments.push(detokenize_positions(&significant[seg_start..cursor], tokens, streams, strings));
                }
                return Some((cursor, segments));
            }
        } else if depth == 1 && kind == TokenKind::Comma {
            segments.push(detokenize_positions(&significant[seg_start..cursor], tokens, streams, strings));
            seg_start = cursor + 1;
        }
    }
    None
}

fn detokenize_positions(positions: &[usize], tokens: &[Token], streams: &StreamTable, strings: &StringTable) -> String {
    let raws: Vec<&RawToken> = positions.iter().map(|&i| streams.raw(tokens[i])).collect();
    detokenize_refs(raws.into_iter(), strings).trim().to_owned()
}

/// Runs a compiled Lua lambda (§4.9): a fresh interpreter per invocation,
/// seeded with a 0-based `params` table (§8 S5: `params[0]` is the first
/// call-site argument) and a `cprime.emit`/`cprime.emit_line` API that
/// appends to a shared buffer. The script's return value — a plain string,
/// or a table of `{generated_code, integration_type, identifier, is_valid}`
/// — is appended after that buffer to form the final output.
fn execute_lua(lambda: &ExecutableLambda, params: &[String], alias_name: &str) -> Result<ExecResult, PipelineError> {
    let lua = mlua::Lua::new();
    let buffer = Rc::new(RefCell::new(String::new()));

    let params_table = lua.create_table().map_err(|e| lua_err(alias_name, e))?;
    for (i, p) in params.iter().enumerate() {
        params_table.set(i, p.clone()).map_err(|e| lua_err(alias_name, e))?;
    }
    lua.globals().set("params", params_table).map_err(|e| lua_err(alias_name, e))?;

    let cprime_table = lua.create_table().map_err(|e| lua_err(alias_name, e))?;

    let emit_buf = Rc::clone(&buffer);
    let emit = lua
        .create_function(move |_, text: String| {
            emit_buf.borrow_mut().push_str(&text);
            Ok(())
        })
        .map_err(|e| lua_err(alias_name, e))?;
    cprime_table.set("emit", emit).map_err(|e| lua_err(alias_name, e))?;

    let emit_line_buf = Rc::clone(&buffer);
    let emit_line = lua
        .create_function(move |_, text: String| {
            emit_line_buf.borrow_mut().push_str(&text);
            emit_line_buf.borrow_mut().push('\n');
            Ok(())
        })
        .map_err(|e| lua_err(alias_name, e))?;
    cprime_table.set("emit_line", emit_line).map_err(|e| lua_err(alias_name, e))?;

    lua.globals().set("cprime", cprime_table).map_err(|e| lua_err(alias_name, e))?;

    let value: mlua::Value = lua.load(&lambda.lua_script).eval().map_err(|e| lua_err(alias_name, e))?;

    let (tail, integration_type, identifier, is_valid) = match value {
        mlua::Value::String(s) => (s.to_str().map_err(|e| lua_err(alias_name, e))?.to_owned(), "token".to_owned(), String::new(), true),
        mlua::Value::Table(t) => {
            let generated: String = t.get("generated_code").unwrap_or_default();
            let integration: String = t.get("integration_type").unwrap_or_else(|_| "token".to_owned());
            let identifier: String = t.get("identifier").unwrap_or_default();
            let valid: bool = t.get("is_valid").unwrap_or(true);
            (generated, integration, identifier, valid)
        }
        mlua::Value::Nil => (String::new(), "token".to_owned(), String::new(), true),
        other => {
            return Err(PipelineError::ExecExpansion {
                alias: alias_name.to_owned(),
                message: format!("script returned unsupported Lua value type `{}`", other.type_name()),
            })
        }
    };

    Ok(ExecResult {
        generated_code: format!("{}{}", buffer.borrow(), tail),
        integration_type,
        identifier,
        is_valid,
    })
}

fn lua_err(alias: &str, e: mlua::Error) -> PipelineError {
    PipelineError::ExecExpansion { alias: alias.to_owned(), message: e.to_string() }
}

/// Tokenises `text`, rejecting it outright if it contains the literal `exec`
/// keyword (§4.8 step 5 — single-pass expansion only), and returns its
/// `Token` view with the trailing `EOF_TOKEN` dropped (the fragment is
/// spliced into a larger stream, not consumed on its own).
fn tokenize_generated(
    text: &str,
    alias_name: &str,
    streams: &mut StreamTable,
    strings: &mut StringTable,
    aliases: &ExecAliasRegistry,
) -> Result<Vec<Token>, PipelineError> {
    let raw = tokenize(text, strings, aliases);
    if raw.iter().any(|t| t.token == TokenKind::Exec) {
        return Err(PipelineError::NestedExec { alias: alias_name.to_owned() });
    }
    let id = streams.push_stream(raw);
    let mut view = streams.as_tokens(id);
    if matches!(view.last(), Some(t) if t.fine_kind == TokenKind::EofToken) {
        view.pop();
    }
    Ok(view)
}

/// Token-integration splice: replace `call`'s span in `tokens` with the
/// generated fragment, used for header/footer call sites (which, unlike a
/// body instruction list, have nowhere to host a `scope_insert`/`scope_create`
/// split — see DESIGN.md).
fn expand_call_to_tokens(
    tokens: &[Token],
    call: &ExecCall,
    result: &ExecResult,
    alias_name: &str,
    streams: &mut StreamTable,
    strings: &mut StringTable,
    aliases: &ExecAliasRegistry,
) -> Result<Vec<Token>, PipelineError> {
    let gen_tokens = tokenize_generated(&result.generated_code, alias_name, streams, strings, aliases)?;
    let mut out = tokens[..call.start].to_vec();
    out.extend(gen_tokens);
    out.extend(tokens[call.end + 1..].iter().copied());
    Ok(out)
}

/// Builds a fragment's own scope tree via Layer 2A and re-bases every index
/// it carries (`parent_index`, `ScopeRef`) into `arena`'s index space, for
/// `scope_insert`/`scope_create` integration.
fn rebase_generated(
    generated_tokens: Vec<Token>,
    arena: &mut ScopeArena,
    streams: &mut StreamTable,
    aliases: &mut ExecAliasRegistry,
    host_scope_index: u32,
) -> Result<Vec<BodyElement>, PipelineError> {
    let mut temp = build_scopes(&generated_tokens, streams, aliases)?;
    let base = arena.len() as u32;

    for idx in 1..temp.len() as u32 {
        let mut scope = std::mem::replace(temp.get_mut(idx), Scope::default());
        scope.parent_index = if scope.parent_index == ScopeArena::ROOT {
            host_scope_index
        } else {
            base + scope.parent_index - 1
        };
        rebase_body_elements(&mut scope.instructions, base);
        if let Footer::ScopeRef(r) = &mut scope.footer {
            *r = base + *r - 1;
        }
        arena.push(scope);
    }

    let root = temp.get(ScopeArena::ROOT);
    let mut elements = root.instructions.clone();
    rebase_body_elements(&mut elements, base);
    if let Footer::Instruction(instr) = &root.footer {
        if !instr.tokens.is_empty() {
            elements.push(BodyElement::Instruction(instr.clone()));
        }
    }
    Ok(elements)
}

fn rebase_body_elements(elements: &mut [BodyElement], base: u32) {
    for e in elements.iter_mut() {
        if let BodyElement::ScopeRef(idx) = e {
            *idx = base + *idx - 1;
        }
    }
}

fn synthetic_identifier(text: &str, strings: &mut StringTable, streams: &mut StreamTable) -> Token {
    let idx = strings.intern(text);
    let raw = RawToken::new(TokenKind::Identifier, 0, 0, 0).with_literal(LiteralValue::Str(idx));
    let stream_id = streams.push_stream(vec![raw]);
    streams.as_tokens(stream_id)[0]
}

// ---------------------------------------------------------------------
// Per-instruction-slot drivers
// ---------------------------------------------------------------------

#[allow(clippy::too_many_arguments)]
fn process_header(
    scope_index: u32,
    namespace: &[String],
    arena: &mut ScopeArena,
    streams: &mut StreamTable,
    strings: &mut StringTable,
    aliases: &mut ExecAliasRegistry,
    types: &mut TypeRegistry,
    functions: &mut FunctionRegistry,
    errors: &mut ErrorHandler,
) -> Result<(), PipelineError> {
    let tokens = arena.get(scope_index).header.tokens.clone();
    let expansion = expand_in_tokens(&tokens, scope_index, arena, streams, strings, aliases)?;
    let final_tokens = match expansion {
        None => tokens,
        Some((call, result, alias_name)) => {
            if !result.is_valid {
                return Err(PipelineError::ExecExpansion { alias: alias_name, message: "script reported is_valid = false".to_owned() });
            }
            expand_call_to_tokens(&tokens, &call, &result, &alias_name, streams, strings, aliases)?
        }
    };
    let mut instr = Instruction::new(final_tokens);
    classify_instruction(&mut instr, scope_index, 0, InstructionType::Header, streams, strings, namespace, types, functions, errors);
    arena.get_mut(scope_index).header = instr;
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn process_footer(
    scope_index: u32,
    namespace: &[String],
    arena: &mut ScopeArena,
    streams: &mut StreamTable,
    strings: &mut StringTable,
    aliases: &mut ExecAliasRegistry,
    types: &mut TypeRegistry,
    functions: &mut FunctionRegistry,
    errors: &mut ErrorHandler,
) -> Result<(), PipelineError> {
    let Footer::Instruction(footer_instr) = arena.get(scope_index).footer.clone() else {
        return Ok(());
    };
    let tokens = footer_instr.tokens;
    let expansion = expand_in_tokens(&tokens, scope_index, arena, streams, strings, aliases)?;
    let final_tokens = match expansion {
        None => tokens,
        Some((call, result, alias_name)) => {
            if !result.is_valid {
                return Err(PipelineError::ExecExpansion { alias: alias_name, message: "script reported is_valid = false".to_owned() });
            }
            expand_call_to_tokens(&tokens, &call, &result, &alias_name, streams, strings, aliases)?
        }
    };
    let mut instr = Instruction::new(final_tokens);
    classify_instruction(&mut instr, scope_index, 0, InstructionType::Footer, streams, strings, namespace, types, functions, errors);
    arena.get_mut(scope_index).footer = Footer::Instruction(instr);
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn process_body(
    scope_index: u32,
    namespace: &[String],
    arena: &mut ScopeArena,
    streams: &mut StreamTable,
    strings: &mut StringTable,
    aliases: &mut ExecAliasRegistry,
    types: &mut TypeRegistry,
    functions: &mut FunctionRegistry,
    errors: &mut ErrorHandler,
) -> Result<(), PipelineError> {
    let mut idx = 0usize;
    loop {
        let len = arena.get(scope_index).instructions.len();
        if idx >= len {
            break;
        }
        let element = arena.get(scope_index).instructions[idx].clone();
        let instr = match element {
            BodyElement::ScopeRef(_) => {
                idx += 1;
                continue;
            }
            BodyElement::Instruction(instr) => instr,
        };

        let expansion = expand_in_tokens(&instr.tokens, scope_index, arena, streams, strings, aliases)?;
        let Some((call, result, alias_name)) = expansion else {
            let mut new_instr = instr;
            classify_instruction(&mut new_instr, scope_index, idx as u32, InstructionType::Body, streams, strings, namespace, types, functions, errors);
            arena.get_mut(scope_index).instructions[idx] = BodyElement::Instruction(new_instr);
            idx += 1;
            continue;
        };

        if !result.is_valid {
            return Err(PipelineError::ExecExpansion { alias: alias_name, message: "script reported is_valid = false".to_owned() });
        }

        let gen_tokens = tokenize_generated(&result.generated_code, &alias_name, streams, strings, aliases)?;
        let before: Vec<Token> = instr.tokens[..call.start].to_vec();
        let after: Vec<Token> = instr.tokens[call.end + 1..].to_vec();

        match result.integration_type.as_str() {
            "scope_insert" => {
                let generated_elements = rebase_generated(gen_tokens, arena, streams, aliases, scope_index)?;
                let mut replacement = Vec::new();
                if !before.is_empty() {
                    let mut hdr = Instruction::new(before);
                    classify_instruction(&mut hdr, scope_index, idx as u32, InstructionType::Body, streams, strings, namespace, types, functions, errors);
                    replacement.push(BodyElement::Instruction(hdr));
                }
                replacement.extend(generated_elements);
                if !after.is_empty() {
                    let mut ftr = Instruction::new(after);
                    classify_instruction(&mut ftr, scope_index, idx as u32, InstructionType::Body, streams, strings, namespace, types, functions, errors);
                    replacement.push(BodyElement::Instruction(ftr));
                }
                let inserted = replacement.len().max(1);
                arena.get_mut(scope_index).instructions.splice(idx..idx + 1, replacement);
                idx += inserted;
            }
            "scope_create" => {
                let generated_elements = rebase_generated(gen_tokens, arena, streams, aliases, scope_index)?;
                let ident_text = if result.identifier.is_empty() {
                    format!("__exec_result_{scope_index}_{idx}")
                } else {
                    result.identifier.clone()
                };
                let ident_token = synthetic_identifier(&ident_text, strings, streams);

                let mut tokens = before;
                tokens.push(ident_token);
                tokens.extend(after);
                let mut new_instr = Instruction::new(tokens);
                classify_instruction(&mut new_instr, scope_index, idx as u32, InstructionType::Body, streams, strings, namespace, types, functions, errors);
                arena.get_mut(scope_index).instructions[idx] = BodyElement::Instruction(new_instr);
                arena.get_mut(scope_index).instructions.extend(generated_elements);
                idx += 1;
            }
            _ => {
                // "token", and anything unrecognised, splices inline.
                let mut tokens = before;
                tokens.extend(gen_tokens);
                tokens.extend(after);
                let mut new_instr = Instruction::new(tokens);
                classify_instruction(&mut new_instr, scope_index, idx as u32, InstructionType::Body, streams, strings, namespace, types, functions, errors);
                arena.get_mut(scope_index).instructions[idx] = BodyElement::Instruction(new_instr);
                idx += 1;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cprime_core::ContextualRole;

    fn run(source: &str) -> (ScopeArena, StreamTable, StringTable, ExecAliasRegistry, TypeRegistry, FunctionRegistry, ErrorHandler) {
        let mut strings = StringTable::new();
        let mut aliases = ExecAliasRegistry::new();
        let raw = crate::tokenizer::tokenize(source, &mut strings, &aliases);
        let mut streams = StreamTable::new();
        let id = streams.push_stream(raw);
        let view = streams.as_tokens(id);

        let mut arena = build_scopes(&view, &streams, &mut aliases).unwrap();
        crate::layer2b::compile_exec_scopes(&arena, &streams, &strings, &mut aliases).unwrap();
        crate::layer2c::resolve_chunks(&mut arena, &mut streams, &strings, &aliases);

        let mut types = TypeRegistry::new();
        let mut functions = FunctionRegistry::new();
        let errors = contextualize(&mut arena, &mut streams, &mut strings, &mut aliases, &mut types, &mut functions).unwrap();
        (arena, streams, strings, aliases, types, functions, errors)
    }

    #[test]
    fn token_integration_splices_generated_code_in_place() {
        let (arena, streams, _, _, _, _, errors) = run(
            "exec greet<name> { return cprime.emit_line('int32_t x = 1;'); } greet<bob>();",
        );
        assert!(errors.errors().is_empty());
        let root = arena.get(ScopeArena::ROOT);
        let has_generated_decl = root.instructions.iter().any(|e| match e {
            BodyElement::Instruction(instr) => instr.tokens.iter().any(|t| streams.raw(*t).token == TokenKind::Int32T),
            _ => false,
        });
        assert!(has_generated_decl, "expanded call should have spliced the generated declaration in place");
    }

    #[test]
    fn variable_declaration_is_classified_and_marks_instantiation() {
        let (arena, _, _, _, types, _, errors) = run("int32_t count = 0;");
        assert!(errors.errors().is_empty());
        let root = arena.get(ScopeArena::ROOT);
        let instr = match &root.instructions[0] {
            BodyElement::Instruction(instr) => instr,
            _ => panic!("expected instruction"),
        };
        let roles: Vec<_> = instr.contextual_tokens.iter().filter_map(|c| c.role).collect();
        assert!(roles.contains(&ContextualRole::TypeReference));
        assert!(roles.contains(&ContextualRole::VariableDeclaration));
        assert_eq!(types.total_registered_types(), 0);
    }

    #[test]
    fn function_call_marks_a_call_site() {
        let (_, _, _, _, _, functions, errors) = run("helper();");
        assert!(errors.errors().is_empty());
        assert_eq!(functions.call_sites("__global__::helper").len(), 1);
    }

    #[test]
    fn class_header_registers_a_type_declaration() {
        let (_, _, _, _, types, _, errors) = run("class Widget { int32_t id = 0; }");
        assert!(errors.errors().is_empty());
        assert_eq!(types.total_registered_types(), 1);
    }

    #[test]
    fn scope_create_integration_appends_a_new_top_level_scope() {
        let (arena, streams, strings, _, _, _, errors) = run(
            "exec make_type<name> { return { generated_code = 'class Generated { int32_t x = 0; }', integration_type = 'scope_create', identifier = 'Generated', is_valid = true }; } make_type<Foo>();",
        );
        assert!(errors.errors().is_empty());
        assert!(arena.len() > 2, "scope_create should have appended at least one new scope");
        let has_identifier = arena.get(ScopeArena::ROOT).instructions.iter().any(|e| match e {
            BodyElement::Instruction(instr) => instr.tokens.iter().any(|t| {
                streams.raw(*t).literal_value.as_string_index().map(|i| strings.get(i) == "Generated").unwrap_or(false)
            }),
            _ => false,
        });
        assert!(has_identifier, "call site should have been replaced by the result identifier");
    }
}
