//! §4.10: reconstructs source text from a token sequence. Exact for tokens
//! produced by Layer 1 from the same source; not guaranteed bit-exact across
//! arbitrary regenerated streams (comment placement and collapsed whitespace
//! may shift).

use cprime_core::{LiteralValue, RawToken, StringTable, TokenKind};

pub fn detokenize(tokens: &[RawToken], strings: &StringTable) -> String {
    let mut out = String::new();
    for token in tokens {
        out.push_str(&lexeme(token, strings));
    }
    out
}

/// Like [`detokenize`] but over an arbitrary iterator of `RawToken`
/// references, for callers (Layer 2B/2D) resolving `Token` indirection
/// through a `StreamTable` rather than holding a contiguous slice.
pub fn detokenize_refs<'a>(tokens: impl Iterator<Item = &'a RawToken>, strings: &StringTable) -> String {
    let mut out = String::new();
    for token in tokens {
        out.push_str(&lexeme(token, strings));
    }
    out
}

fn lexeme(token: &RawToken, strings: &StringTable) -> String {
    if let Some(fixed) = fixed_spelling(token.token) {
        return fixed.to_owned();
    }
    match token.token {
        TokenKind::Chunk | TokenKind::Identifier | TokenKind::Comment => {
            token.literal_value.as_string_index().map(|idx| strings.get(idx).to_owned()).unwrap_or_default()
        }
        TokenKind::StringLiteral
        | TokenKind::WstringLiteral
        | TokenKind::String8Literal
        | TokenKind::String16Literal
        | TokenKind::String32Literal
        | TokenKind::RawStringLiteral
        | TokenKind::CharLiteral
        | TokenKind::WcharLiteral
        | TokenKind::Char16Literal
        | TokenKind::Char32Literal => {
            token.literal_value.as_string_index().map(|idx| strings.get(idx).to_owned()).unwrap_or_default()
        }
        TokenKind::IntLiteral | TokenKind::UintLiteral | TokenKind::LongLiteral | TokenKind::UlongLiteral => {
            format_integer(&token.literal_value)
        }
        TokenKind::LongLongLiteral | TokenKind::UlongLongLiteral => format_integer(&token.literal_value),
        TokenKind::FloatLiteral => match token.literal_value {
            LiteralValue::F32(v) => format!("{v}f"),
            _ => "0.0f".to_owned(),
        },
        TokenKind::DoubleLiteral | TokenKind::LongDoubleLiteral => match token.literal_value {
            LiteralValue::F64(v) => v.to_string(),
            _ => "0.0".to_owned(),
        },
        TokenKind::ExecAlias => {
            // Resolved alias tokens carry an index, not a string; the caller
            // that needs the name looks it up in the `ExecAliasRegistry`.
            String::new()
        }
        _ => String::new(),
    }
}

fn format_integer(value: &LiteralValue) -> String {
    match value {
        LiteralValue::I32(v) => v.to_string(),
        LiteralValue::U32(v) => v.to_string(),
        LiteralValue::I64(v) => v.to_string(),
        LiteralValue::U64(v) => v.to_string(),
        _ => "0".to_owned(),
    }
}

fn fixed_spelling(kind: TokenKind) -> Option<&'static str> {
    use TokenKind::*;
    Some(match kind {
        TrueLiteral => "true",
        FalseLiteral => "false",
        NullptrLiteral => "nullptr",

        Int8T => "int8_t",
        Int16T => "int16_t",
        Int32T => "int32_t",
        Int64T => "int64_t",
        Uint8T => "uint8_t",
        Uint16T => "uint16_t",
        Uint32T => "uint32_t",
        Uint64T => "uint64_t",
        SizeT => "size_t",
        Float => "float",
        Double => "double",
        Bool => "bool",
        Char => "char",
        Void => "void",

        Class => "class",
        Struct => "struct",
        Interface => "interface",
        Union => "union",
        Function => "function",
        Functional => "functional",
        Data => "data",
        Plex => "plex",

        Runtime => "runtime",
        Comptime => "comptime",
        Constexpr => "constexpr",
        Defer => "defer",
        Auto => "auto",
        Const => "const",
        Semconst => "semconst",
        Static => "static",
        Inline => "inline",
        Volatile => "volatile",
        Danger => "danger",
        Implements => "implements",
        Extern => "extern",
        Module => "module",
        Default => "default",
        Open => "open",
        Closed => "closed",
        Func => "func",

        If => "if",
        Else => "else",
        While => "while",
        For => "for",
        Return => "return",
        Break => "break",
        Continue => "continue",
        Try => "try",
        Catch => "catch",
        Recover => "recover",
        Finally => "finally",
        Signal => "signal",
        Except => "except",
        Raise => "raise",

        Cast => "cast",
        StaticCast => "static_cast",
        DynamicCast => "dynamic_cast",
        Select => "select",
        Exec => "exec",

        Plus => "+",
        Minus => "-",
        Multiply => "*",
        Divide => "/",
        Modulo => "%",
        Assign => "=",
        Equals => "==",
        NotEquals => "!=",
        LessThan => "<",
        GreaterThan => ">",
        LessEqual => "<=",
        GreaterEqual => ">=",
        LogicalAnd => "&&",
        LogicalOr => "||",
        LogicalNot => "!",
        FieldLink => "<-",
        BitwiseAnd => "&",
        BitwiseOr => "|",
        BitwiseXor => "^",
        BitwiseNot => "~",
        Dereference => "*",
        ScopeResolution => "::",

        LeftParen => "(",
        RightParen => ")",
        LeftBrace => "{",
        RightBrace => "}",
        LeftBracket => "[",
        RightBracket => "]",
        Semicolon => ";",
        Comma => ",",
        Dot => ".",
        Colon => ":",
        Arrow => "->",
        SingleQuote => "'",
        Hash => "#",

        Space => " ",
        Tab => "\t",
        CarriageReturn => "\r",
        VerticalTab => "\u{0B}",
        FormFeed => "\u{0C}",
        Newline => "\n",

        EofToken => "",

        _ => return None,
    })
}
