//! Layer 1: the five-pass tokeniser (§4.4). Each pass consumes a vector of
//! [`ProcessingChunk`] — a tagged union of a produced [`RawToken`] or an
//! unprocessed text run with its source position — and produces another,
//! narrowing towards a flat `RawToken[]`.

use cprime_core::{keyword_lookup, ExecAliasRegistry, LiteralValue, RawToken, StringTable, TokenKind};

/// A processing unit passed between tokeniser sublayers (§4.4).
#[derive(Debug, Clone)]
pub enum ProcessingChunk {
    Token(RawToken),
    Text { text: String, line: u32, column: u32, position: u32 },
}

/// Run all five sublayers over `source`, producing a flat raw-token stream.
pub fn tokenize(source: &str, strings: &mut StringTable, aliases: &ExecAliasRegistry) -> Vec<RawToken> {
    let _span = tracing::debug_span!("layer1").entered();
    let chunks = pass_1a_unambiguous(source, strings);
    tracing::trace!(chunks = chunks.len(), "pass 1a complete");
    let chunks = pass_1b_literals(chunks, strings);
    tracing::trace!(chunks = chunks.len(), "pass 1b complete");
    let chunks = pass_1c_operators(chunks);
    tracing::trace!(chunks = chunks.len(), "pass 1c complete");
    let chunks = pass_1d_numbers(chunks);
    tracing::trace!(chunks = chunks.len(), "pass 1d complete");
    let tokens = pass_1e_keywords_and_identifiers(chunks, strings, aliases);
    tracing::debug!(tokens = tokens.len(), "layer1 complete");
    tokens
}

/// 1A: unambiguous single-character tokens, whitespace, comments, and raw
/// string/char literal spans (kept intact, structural characters inside
/// them are never mistaken for tokens).
fn pass_1a_unambiguous(source: &str, strings: &mut StringTable) -> Vec<ProcessingChunk> {
    let mut chunks = Vec::new();
    let mut buf = String::new();
    let mut buf_pos = (1u32, 1u32, 0u32);
    let mut line = 1u32;
    let mut column = 1u32;
    let mut position = 0u32;
    let chars: Vec<char> = source.chars().collect();
    let mut i = 0usize;

    fn flush(buf: &mut String, pos: (u32, u32, u32), chunks: &mut Vec<ProcessingChunk>) {
        if !buf.is_empty() {
            chunks.push(ProcessingChunk::Text {
                text: std::mem::take(buf),
                line: pos.0,
                column: pos.1,
                position: pos.2,
            });
        }
    }

    while i < chars.len() {
        let c = chars[i];
        match c {
            '{' | '}' | ';' | '(' | ')' | '[' | ']' | ',' | '#' => {
                flush(&mut buf, buf_pos, &mut chunks);
                let kind = match c {
                    '{' => TokenKind::LeftBrace,
                    '}' => TokenKind::RightBrace,
                    ';' => TokenKind::Semicolon,
                    '(' => TokenKind::LeftParen,
                    ')' => TokenKind::RightParen,
                    '[' => TokenKind::LeftBracket,
                    ']' => TokenKind::RightBracket,
                    ',' => TokenKind::Comma,
                    '#' => TokenKind::Hash,
                    _ => unreachable!(),
                };
                chunks.push(ProcessingChunk::Token(RawToken::new(kind, line, column, position)));
                i += 1;
                column += 1;
                position += 1;
                buf_pos = (line, column, position);
            }
            ' ' | '\t' | '\r' | '\u{0B}' | '\u{0C}' | '\n' => {
                flush(&mut buf, buf_pos, &mut chunks);
                let kind = match c {
                    ' ' => TokenKind::Space,
                    '\t' => TokenKind::Tab,
                    '\r' => TokenKind::CarriageReturn,
                    '\u{0B}' => TokenKind::VerticalTab,
                    '\u{0C}' => TokenKind::FormFeed,
                    '\n' => TokenKind::Newline,
                    _ => unreachable!(),
                };
                chunks.push(ProcessingChunk::Token(RawToken::new(kind, line, column, position)));
                i += 1;
                position += 1;
                if c == '\n' {
                    line += 1;
                    column = 1;
                } else {
                    column += 1;
                }
                buf_pos = (line, column, position);
            }
            '/' if chars.get(i + 1) == Some(&'/') => {
                flush(&mut buf, buf_pos, &mut chunks);
                let start = (line, column, position);
                let mut text = String::new();
                while i < chars.len() && chars[i] != '\n' {
                    text.push(chars[i]);
                    i += 1;
                    column += 1;
                    position += 1;
                }
                let idx = strings.intern(&text);
                chunks.push(ProcessingChunk::Token(
                    RawToken::new(TokenKind::Comment, start.0, start.1, start.2).with_literal(LiteralValue::Str(idx)),
                ));
                buf_pos = (line, column, position);
            }
            '/' if chars.get(i + 1) == Some(&'*') => {
                flush(&mut buf, buf_pos, &mut chunks);
                let start = (line, column, position);
                let mut text = String::new();
                text.push(c);
                text.push('*');
                i += 2;
                column += 2;
                position += 2;
                while i < chars.len() {
                    let cur = chars[i];
                    text.push(cur);
                    i += 1;
                    if cur == '\n' {
                        line += 1;
                        column = 1;
                    } else {
                        column += 1;
                    }
                    position += 1;
                    if cur == '/' && text.ends_with("*/") {
                        break;
                    }
                }
                let idx = strings.intern(&text);
                chunks.push(ProcessingChunk::Token(
                    RawToken::new(TokenKind::Comment, start.0, start.1, start.2).with_literal(LiteralValue::Str(idx)),
                ));
                buf_pos = (line, column, position);
            }
            '"' | '\'' => {
                // The prefix (if any) is already sitting at the tail of `buf`;
                // leave it there and append the whole quoted span so 1B can
                // classify prefix + literal together.
                let quote = c;
                let raw = buf.ends_with('R') || buf.ends_with("u8R") || buf.ends_with("LR") || buf.ends_with("UR") || buf.ends_with("uR");
                buf.push(c);
                i += 1;
                column += 1;
                position += 1;
                if raw {
                    while i < chars.len() {
                        let cur = chars[i];
                        buf.push(cur);
                        i += 1;
                        if cur == '\n' {
                            line += 1;
                            column = 1;
                        } else {
                            column += 1;
                        }
                        position += 1;
                        if cur == quote && buf.ends_with(")\"") {
                            break;
                        }
                    }
                } else {
                    let mut escaped = false;
                    while i < chars.len() {
                        let cur = chars[i];
                        buf.push(cur);
                        i += 1;
                        if cur == '\n' {
                            line += 1;
                            column = 1;
                        } else {
                            column += 1;
                        }
                        position += 1;
                        if escaped {
                            escaped = false;
                            continue;
                        }
                        if cur == '\\' {
                            escaped = true;
                            continue;
                        }
                        if cur == quote {
                            break;
                        }
                    }
                }
            }
            _ => {
                if buf.is_empty() {
                    buf_pos = (line, column, position);
                }
                buf.push(c);
                i += 1;
                column += 1;
                position += 1;
            }
        }
    }
    flush(&mut buf, buf_pos, &mut chunks);
    chunks.push(ProcessingChunk::Token(RawToken::new(TokenKind::EofToken, line, column, position)));
    chunks
}

const RAW_PREFIXES: &[&str] = &["u8R", "LR", "uR", "UR", "R"];
const QUOTE_PREFIXES: &[&str] = &["u8R", "LR", "uR", "UR", "u8", "L", "u", "U", "R"];

/// 1B: string/char literal prefix classification (§4.4).
fn pass_1b_literals(chunks: Vec<ProcessingChunk>, strings: &mut StringTable) -> Vec<ProcessingChunk> {
    let mut out = Vec::new();
    for chunk in chunks {
        match chunk {
            ProcessingChunk::Token(_) => out.push(chunk),
            ProcessingChunk::Text { text, line, column, position } => {
                split_literals(&text, line, column, position, strings, &mut out);
            }
        }
    }
    out
}

fn advance(line: u32, column: u32, position: u32, consumed: &str) -> (u32, u32, u32) {
    let mut l = line;
    let mut c = column;
    for ch in consumed.chars() {
        if ch == '\n' {
            l += 1;
            c = 1;
        } else {
            c += 1;
        }
    }
    (l, c, position + consumed.chars().count() as u32)
}

fn split_literals(
    text: &str,
    start_line: u32,
    start_column: u32,
    start_position: u32,
    strings: &mut StringTable,
    out: &mut Vec<ProcessingChunk>,
) {
    let chars: Vec<char> = text.chars().collect();
    let mut i = 0usize;
    let mut line = start_line;
    let mut column = start_column;
    let mut position = start_position;

    let mut buf = String::new();
    let mut buf_pos = (start_line, start_column, start_position);

    while i < chars.len() {
        let c = chars[i];
        if c == '"' || c == '\'' {
            let prefix = QUOTE_PREFIXES.iter().find(|p| buf.ends_with(**p)).copied().unwrap_or("");
            let body_len = buf.len() - prefix.len();
            let (before, _) = buf.split_at(body_len);
            if !before.is_empty() {
                out.push(ProcessingChunk::Text {
                    text: before.to_owned(),
                    line: buf_pos.0,
                    column: buf_pos.1,
                    position: buf_pos.2,
                });
            }
            let lit_pos = advance(buf_pos.0, buf_pos.1, buf_pos.2, before);
            buf.clear();

            let mut literal_text = prefix.to_owned();
            literal_text.push(c);
            let quote = c;
            let is_raw = RAW_PREFIXES.contains(&prefix);
            i += 1;
            column += 1;
            position += 1;
            if is_raw {
                while i < chars.len() {
                    let cur = chars[i];
                    literal_text.push(cur);
                    i += 1;
                    if cur == '\n' {
                        line += 1;
                        column = 1;
                    } else {
                        column += 1;
                    }
                    position += 1;
                    if cur == quote && literal_text.ends_with(")\"") {
                        break;
                    }
                }
            } else {
                let mut escaped = false;
                while i < chars.len() {
                    let cur = chars[i];
                    literal_text.push(cur);
                    i += 1;
                    if cur == '\n' {
                        line += 1;
                        column = 1;
                    } else {
                        column += 1;
                    }
                    position += 1;
                    if escaped {
                        escaped = false;
                        continue;
                    }
                    if cur == '\\' {
                        escaped = true;
                        continue;
                    }
                    if cur == quote {
                        break;
                    }
                }
            }

            let kind = classify_literal_kind(prefix, quote);
            let idx = strings.intern(&literal_text);
            out.push(ProcessingChunk::Token(
                RawToken::new(kind, lit_pos.0, lit_pos.1, lit_pos.2).with_literal(LiteralValue::Str(idx)),
            ));
            buf_pos = (line, column, position);
        } else {
            if buf.is_empty() {
                buf_pos = (line, column, position);
            }
            buf.push(c);
            i += 1;
            if c == '\n' {
                line += 1;
                column = 1;
            } else {
                column += 1;
            }
            position += 1;
        }
    }
    if !buf.is_empty() {
        out.push(ProcessingChunk::Text { text: buf, line: buf_pos.0, column: buf_pos.1, position: buf_pos.2 });
    }
}

fn classify_literal_kind(prefix: &str, quote: char) -> TokenKind {
    if quote == '\'' {
        return match prefix {
            "L" => TokenKind::WcharLiteral,
            "u" => TokenKind::Char16Literal,
            "U" => TokenKind::Char32Literal,
            _ => TokenKind::CharLiteral,
        };
    }
    match prefix {
        "L" => TokenKind::WstringLiteral,
        "u8" => TokenKind::String8Literal,
        "u" => TokenKind::String16Literal,
        "U" => TokenKind::String32Literal,
        "R" | "LR" | "uR" | "UR" | "u8R" => TokenKind::RawStringLiteral,
        _ => TokenKind::StringLiteral,
    }
}

const TWO_CHAR_OPS: &[(&str, TokenKind)] = &[
    ("==", TokenKind::Equals),
    ("!=", TokenKind::NotEquals),
    ("<=", TokenKind::LessEqual),
    (">=", TokenKind::GreaterEqual),
    ("&&", TokenKind::LogicalAnd),
    ("||", TokenKind::LogicalOr),
    ("->", TokenKind::Arrow),
    ("::", TokenKind::ScopeResolution),
    ("<-", TokenKind::FieldLink),
];

const ONE_CHAR_OPS: &[(char, TokenKind)] = &[
    ('+', TokenKind::Plus),
    ('-', TokenKind::Minus),
    ('*', TokenKind::Multiply),
    ('/', TokenKind::Divide),
    ('%', TokenKind::Modulo),
    ('=', TokenKind::Assign),
    ('<', TokenKind::LessThan),
    ('>', TokenKind::GreaterThan),
    ('!', TokenKind::LogicalNot),
    ('&', TokenKind::BitwiseAnd),
    ('|', TokenKind::BitwiseOr),
    ('^', TokenKind::BitwiseXor),
    ('~', TokenKind::BitwiseNot),
    ('.', TokenKind::Dot),
    (':', TokenKind::Colon),
];

/// 1C: longest-match operator recognition, with the `.` + digit exception
/// for the numeric pass (§4.4).
fn pass_1c_operators(chunks: Vec<ProcessingChunk>) -> Vec<ProcessingChunk> {
    let mut out = Vec::new();
    for chunk in chunks {
        match chunk {
            ProcessingChunk::Token(_) => out.push(chunk),
            ProcessingChunk::Text { text, line, column, position } => {
                split_operators(&text, line, column, position, &mut out);
            }
        }
    }
    out
}

fn split_operators(text: &str, line: u32, start_column: u32, start_position: u32, out: &mut Vec<ProcessingChunk>) {
    let chars: Vec<char> = text.chars().collect();
    let mut i = 0usize;
    let mut column = start_column;
    let mut position = start_position;
    let mut buf = String::new();
    let mut buf_column = start_column;
    let mut buf_position = start_position;

    while i < chars.len() {
        let c = chars[i];
        let two = if i + 1 < chars.len() {
            TWO_CHAR_OPS.iter().find(|(op, _)| op.chars().next() == Some(c) && op.chars().nth(1) == Some(chars[i + 1]))
        } else {
            None
        };
        let dot_before_digit = c == '.' && chars.get(i + 1).map(|d| d.is_ascii_digit()).unwrap_or(false);

        if let Some((_, kind)) = two {
            flush_operator_text(&mut buf, line, buf_column, buf_position, out);
            out.push(ProcessingChunk::Token(RawToken::new(*kind, line, column, position)));
            i += 2;
            column += 2;
            position += 2;
            buf_column = column;
            buf_position = position;
        } else if !dot_before_digit && ONE_CHAR_OPS.iter().any(|(ch, _)| *ch == c) {
            let kind = ONE_CHAR_OPS.iter().find(|(ch, _)| *ch == c).unwrap().1;
            flush_operator_text(&mut buf, line, buf_column, buf_position, out);
            out.push(ProcessingChunk::Token(RawToken::new(kind, line, column, position)));
            i += 1;
            column += 1;
            position += 1;
            buf_column = column;
            buf_position = position;
        } else {
            if buf.is_empty() {
                buf_column = column;
                buf_position = position;
            }
            buf.push(c);
            i += 1;
            column += 1;
            position += 1;
        }
    }
    flush_operator_text(&mut buf, line, buf_column, buf_position, out);
}

fn flush_operator_text(buf: &mut String, line: u32, column: u32, position: u32, out: &mut Vec<ProcessingChunk>) {
    if !buf.is_empty() {
        out.push(ProcessingChunk::Text { text: std::mem::take(buf), line, column, position });
    }
}

/// 1D: suffix-aware numeric literals (§4.4).
fn pass_1d_numbers(chunks: Vec<ProcessingChunk>) -> Vec<ProcessingChunk> {
    chunks
        .into_iter()
        .flat_map(|chunk| match chunk {
            ProcessingChunk::Token(_) => vec![chunk],
            ProcessingChunk::Text { text, line, column, position } => split_numbers(&text, line, column, position),
        })
        .collect()
}

fn split_numbers(text: &str, line: u32, start_column: u32, start_position: u32) -> Vec<ProcessingChunk> {
    let chars: Vec<char> = text.chars().collect();
    let mut out = Vec::new();
    let mut i = 0usize;
    let mut column = start_column;
    let mut position = start_position;
    let mut buf = String::new();
    let mut buf_column = start_column;
    let mut buf_position = start_position;

    while i < chars.len() {
        let c = chars[i];
        let starts_number = c.is_ascii_digit() || (c == '.' && chars.get(i + 1).map(|d| d.is_ascii_digit()).unwrap_or(false));
        if starts_number {
            if !buf.is_empty() {
                out.push(ProcessingChunk::Text { text: std::mem::take(&mut buf), line, column: buf_column, position: buf_position });
            }
            let num_column = column;
            let num_position = position;
            let mut num_text = String::new();
            let is_hex = c == '0' && matches!(chars.get(i + 1), Some('x') | Some('X'));
            if is_hex {
                num_text.push(chars[i]);
                num_text.push(chars[i + 1]);
                i += 2;
                column += 2;
                position += 2;
                while i < chars.len() && (chars[i].is_ascii_hexdigit() || chars[i] == '.') {
                    num_text.push(chars[i]);
                    i += 1;
                    column += 1;
                    position += 1;
                }
                if i < chars.len() && matches!(chars[i], 'p' | 'P') {
                    num_text.push(chars[i]);
                    i += 1;
                    column += 1;
                    position += 1;
                    if i < chars.len() && matches!(chars[i], '+' | '-') {
                        num_text.push(chars[i]);
                        i += 1;
                        column += 1;
                        position += 1;
                    }
                    while i < chars.len() && chars[i].is_ascii_digit() {
                        num_text.push(chars[i]);
                        i += 1;
                        column += 1;
                        position += 1;
                    }
                }
            } else {
                while i < chars.len() && chars[i].is_ascii_digit() {
                    num_text.push(chars[i]);
                    i += 1;
                    column += 1;
                    position += 1;
                }
                if i < chars.len() && chars[i] == '.' {
                    num_text.push(chars[i]);
                    i += 1;
                    column += 1;
                    position += 1;
                    while i < chars.len() && chars[i].is_ascii_digit() {
                        num_text.push(chars[i]);
                        i += 1;
                        column += 1;
                        position += 1;
                    }
                }
                if i < chars.len() && matches!(chars[i], 'e' | 'E') {
                    num_text.push(chars[i]);
                    i += 1;
                    column += 1;
                    position += 1;
                    if i < chars.len() && matches!(chars[i], '+' | '-') {
                        num_text.push(chars[i]);
                        i += 1;
                        column += 1;
                        position += 1;
                    }
                    while i < chars.len() && chars[i].is_ascii_digit() {
                        num_text.push(chars[i]);
                        i += 1;
                        column += 1;
                        position += 1;
                    }
                }
            }
            let mut suffix = String::new();
            while i < chars.len() && chars[i].is_ascii_alphabetic() {
                suffix.push(chars[i].to_ascii_lowercase());
                i += 1;
                column += 1;
                position += 1;
            }
            let (kind, literal) = classify_number(&num_text, &suffix, is_hex);
            out.push(ProcessingChunk::Token(RawToken::new(kind, line, num_column, num_position).with_literal(literal)));
            buf_column = column;
            buf_position = position;
        } else {
            if buf.is_empty() {
                buf_column = column;
                buf_position = position;
            }
            buf.push(c);
            i += 1;
            column += 1;
            position += 1;
        }
    }
    if !buf.is_empty() {
        out.push(ProcessingChunk::Text { text: buf, line, column: buf_column, position: buf_position });
    }
    out
}

fn classify_number(num_text: &str, suffix: &str, is_hex: bool) -> (TokenKind, LiteralValue) {
    let is_float = num_text.contains('.')
        || (!is_hex && (num_text.contains('e') || num_text.contains('E')))
        || (is_hex && (num_text.contains('p') || num_text.contains('P')));
    if is_float || suffix.contains('f') {
        let value: f64 = if is_hex { 0.0 } else { num_text.parse().unwrap_or(0.0) };
        return match suffix {
            "f" => (TokenKind::FloatLiteral, LiteralValue::F32(value as f32)),
            "l" => (TokenKind::LongDoubleLiteral, LiteralValue::F64(value)),
            _ => (TokenKind::DoubleLiteral, LiteralValue::F64(value)),
        };
    }
    let raw: u64 = if is_hex {
        let digits = num_text.trim_start_matches("0x").trim_start_matches("0X");
        u64::from_str_radix(digits, 16).unwrap_or(0)
    } else {
        num_text.parse().unwrap_or(0)
    };
    let unsigned = suffix.contains('u');
    let ls = suffix.matches('l').count();
    match (unsigned, ls) {
        (true, n) if n >= 2 => (TokenKind::UlongLongLiteral, LiteralValue::U64(raw)),
        (false, n) if n >= 2 => (TokenKind::LongLongLiteral, LiteralValue::I64(raw as i64)),
        (true, 1) => (TokenKind::UlongLiteral, LiteralValue::U64(raw)),
        (false, 1) => (TokenKind::LongLiteral, LiteralValue::I64(raw as i64)),
        (true, _) => (TokenKind::UintLiteral, LiteralValue::U32(raw as u32)),
        (false, _) => (TokenKind::IntLiteral, LiteralValue::I32(raw as i32)),
    }
}

/// 1E: keywords, identifiers, and the first exec-alias recognition attempt
/// (§4.4). Identifiers that match neither the keyword table nor an
/// already-registered global alias retain fine kind `CHUNK` for Layer 2C.
fn pass_1e_keywords_and_identifiers(
    chunks: Vec<ProcessingChunk>,
    strings: &mut StringTable,
    aliases: &ExecAliasRegistry,
) -> Vec<RawToken> {
    let mut out = Vec::new();
    for chunk in chunks {
        match chunk {
            ProcessingChunk::Token(tok) => out.push(tok),
            ProcessingChunk::Text { text, line, column, position } => {
                split_identifiers(&text, line, column, position, strings, aliases, &mut out);
            }
        }
    }
    out
}

fn split_identifiers(
    text: &str,
    line: u32,
    start_column: u32,
    start_position: u32,
    strings: &mut StringTable,
    aliases: &ExecAliasRegistry,
    out: &mut Vec<RawToken>,
) {
    let chars: Vec<char> = text.chars().collect();
    let mut i = 0usize;
    let mut column = start_column;
    let mut position = start_position;

    while i < chars.len() {
        let c = chars[i];
        if c == '_' || c.is_ascii_alphabetic() {
            let ident_column = column;
            let ident_position = position;
            let mut ident = String::new();
            while i < chars.len() && (chars[i] == '_' || chars[i].is_ascii_alphanumeric()) {
                ident.push(chars[i]);
                i += 1;
                column += 1;
                position += 1;
            }
            if let Some(kind) = keyword_lookup(&ident) {
                let literal = match kind {
                    TokenKind::TrueLiteral => LiteralValue::Bool(true),
                    TokenKind::FalseLiteral => LiteralValue::Bool(false),
                    _ => LiteralValue::None,
                };
                out.push(RawToken::new(kind, line, ident_column, ident_position).with_literal(literal));
                continue;
            }
            if let Some(idx) = aliases.lookup_alias_with_context(&ident, &[]) {
                out.push(
                    RawToken::new(TokenKind::ExecAlias, line, ident_column, ident_position)
                        .with_literal(LiteralValue::ExecAlias(idx)),
                );
                continue;
            }
            let str_idx = strings.intern(&ident);
            out.push(RawToken::new(TokenKind::Chunk, line, ident_column, ident_position).with_literal(LiteralValue::Str(str_idx)));
        } else {
            out.push(RawToken::new(TokenKind::Invalid, line, column, position));
            i += 1;
            column += 1;
            position += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cprime_core::RawTokenClass;

    fn fresh() -> (StringTable, ExecAliasRegistry) {
        (StringTable::new(), ExecAliasRegistry::new())
    }

    #[test]
    fn s1_hello_identifier() {
        let (mut strings, aliases) = fresh();
        let tokens = tokenize("main;", &mut strings, &aliases);
        let kinds: Vec<TokenKind> = tokens.iter().map(|t| t.token).collect();
        assert_eq!(kinds, vec![TokenKind::Chunk, TokenKind::Semicolon, TokenKind::EofToken]);
        assert_eq!(strings.get(tokens[0].literal_value.as_string_index().unwrap()), "main");
    }

    #[test]
    fn s3_integer_with_suffix() {
        let (mut strings, aliases) = fresh();
        let tokens = tokenize("42ull", &mut strings, &aliases);
        assert_eq!(tokens[0].token, TokenKind::UlongLongLiteral);
        assert_eq!(tokens[0].literal_value, LiteralValue::U64(42));
    }

    #[test]
    fn s4_raw_string() {
        let (mut strings, aliases) = fresh();
        let tokens = tokenize("R\"(abc)\"", &mut strings, &aliases);
        assert_eq!(tokens[0].token, TokenKind::RawStringLiteral);
        assert_eq!(strings.get(tokens[0].literal_value.as_string_index().unwrap()), "R\"(abc)\"");
    }

    #[test]
    fn structural_tokens_roll_up_to_expected_raw_classes() {
        let (mut strings, aliases) = fresh();
        let tokens = tokenize("{ x; }", &mut strings, &aliases);
        assert_eq!(tokens[0].raw_token, RawTokenClass::LeftBrace);
        assert!(tokens.iter().any(|t| t.raw_token == RawTokenClass::RightBrace));
    }

    #[test]
    fn operators_are_longest_match() {
        let (mut strings, aliases) = fresh();
        let tokens = tokenize("a <= b", &mut strings, &aliases);
        let kinds: Vec<TokenKind> = tokens.iter().map(|t| t.token).filter(|k| !k.is_whitespace_or_formatting()).collect();
        assert!(kinds.contains(&TokenKind::LessEqual));
    }

    #[test]
    fn dot_before_digit_is_left_for_the_numeric_pass() {
        let (mut strings, aliases) = fresh();
        let tokens = tokenize(".5", &mut strings, &aliases);
        assert_eq!(tokens[0].token, TokenKind::DoubleLiteral);
    }

    #[test]
    fn line_comment_is_interned_as_a_comment_token() {
        let (mut strings, aliases) = fresh();
        let tokens = tokenize("// hi\nx;", &mut strings, &aliases);
        assert_eq!(tokens[0].token, TokenKind::Comment);
        assert_eq!(strings.get(tokens[0].literal_value.as_string_index().unwrap()), "// hi");
    }

    #[test]
    fn unrecognised_character_becomes_invalid() {
        let (mut strings, aliases) = fresh();
        let tokens = tokenize("@", &mut strings, &aliases);
        assert_eq!(tokens[0].token, TokenKind::Invalid);
    }
}
