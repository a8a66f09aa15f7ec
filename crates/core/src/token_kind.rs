//! The stable fine-token-kind enumeration (§6) and the coarse `raw_token`
//! class every `RawToken` also carries (§3).

/// Coarse classification used by Layer 2A's brace/semicolon state machine.
/// A strict subset of [`TokenKind`] that the structurer actually branches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RawTokenClass {
    LeftBrace,
    RightBrace,
    Semicolon,
    Identifier,
    Literal,
    Keyword,
    Comment,
    Whitespace,
    Newline,
    Eof,
    Invalid,
}

/// Fine-grained token kind (~150 values). Mirrors the `EToken` enumeration
/// from the original C++ source and the inventory in spec.md §6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum TokenKind {
    Invalid,

    // --- Literal family ---
    IntLiteral,
    UintLiteral,
    LongLiteral,
    UlongLiteral,
    LongLongLiteral,
    UlongLongLiteral,
    FloatLiteral,
    DoubleLiteral,
    LongDoubleLiteral,
    CharLiteral,
    WcharLiteral,
    Char16Literal,
    Char32Literal,
    StringLiteral,
    WstringLiteral,
    String8Literal,
    String16Literal,
    String32Literal,
    RawStringLiteral,
    TrueLiteral,
    FalseLiteral,
    NullptrLiteral,

    // --- Primitive type keywords ---
    Int8T,
    Int16T,
    Int32T,
    Int64T,
    Uint8T,
    Uint16T,
    Uint32T,
    Uint64T,
    SizeT,
    Float,
    Double,
    Bool,
    Char,
    Void,

    // --- Structural keywords ---
    Class,
    Struct,
    Interface,
    Union,
    Function,
    Functional,
    Data,
    Plex,

    // --- Modifiers ---
    Runtime,
    Comptime,
    Constexpr,
    Defer,
    Auto,
    Const,
    Semconst,
    Static,
    Inline,
    Volatile,
    Danger,
    Implements,
    Extern,
    Module,
    Default,
    Open,
    Closed,
    Func,

    // --- Control flow ---
    If,
    Else,
    While,
    For,
    Return,
    Break,
    Continue,
    Try,
    Catch,
    Recover,
    Finally,
    Signal,
    Except,
    Raise,

    // --- Casting / metaprogramming ---
    Cast,
    StaticCast,
    DynamicCast,
    Select,
    Exec,
    ExecAlias,

    // --- Operators ---
    Plus,
    Minus,
    Multiply,
    Divide,
    Modulo,
    Assign,
    Equals,
    NotEquals,
    LessThan,
    GreaterThan,
    LessEqual,
    GreaterEqual,
    LogicalAnd,
    LogicalOr,
    LogicalNot,
    FieldLink,
    BitwiseAnd,
    BitwiseOr,
    BitwiseXor,
    BitwiseNot,
    Dereference,
    ScopeResolution,

    // --- Punctuation ---
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    LeftBracket,
    RightBracket,
    Semicolon,
    Comma,
    Dot,
    Colon,
    Arrow,
    SingleQuote,
    Hash,

    // --- Whitespace ---
    Space,
    Tab,
    CarriageReturn,
    VerticalTab,
    FormFeed,
    Newline,

    // --- Special ---
    Identifier,
    Chunk,
    Comment,
    EofToken,
}

impl TokenKind {
    /// The coarse class a fine kind rolls up into, used by Layer 2A.
    pub fn raw_class(self) -> RawTokenClass {
        use TokenKind::*;
        match self {
            LeftBrace => RawTokenClass::LeftBrace,
            RightBrace => RawTokenClass::RightBrace,
            Semicolon => RawTokenClass::Semicolon,
            Identifier | Chunk => RawTokenClass::Identifier,
            Comment => RawTokenClass::Comment,
            Space | Tab | CarriageReturn | VerticalTab | FormFeed => RawTokenClass::Whitespace,
            Newline => RawTokenClass::Newline,
            EofToken => RawTokenClass::Eof,
            Invalid => RawTokenClass::Invalid,
            k if k.is_literal() => RawTokenClass::Literal,
            k if k.is_keyword() => RawTokenClass::Keyword,
            _ => RawTokenClass::Keyword,
        }
    }

    pub fn is_literal(self) -> bool {
        use TokenKind::*;
        matches!(
            self,
            IntLiteral
                | UintLiteral
                | LongLiteral
                | UlongLiteral
                | LongLongLiteral
                | UlongLongLiteral
                | FloatLiteral
                | DoubleLiteral
                | LongDoubleLiteral
                | CharLiteral
                | WcharLiteral
                | Char16Literal
                | Char32Literal
                | StringLiteral
                | WstringLiteral
                | String8Literal
                | String16Literal
                | String32Literal
                | RawStringLiteral
                | TrueLiteral
                | FalseLiteral
                | NullptrLiteral
        )
    }

    pub fn is_keyword(self) -> bool {
        use TokenKind::*;
        matches!(
            self,
            Int8T
                | Int16T
                | Int32T
                | Int64T
                | Uint8T
                | Uint16T
                | Uint32T
                | Uint64T
                | SizeT
                | Float
                | Double
                | Bool
                | Char
                | Void
                | Class
                | Struct
                | Interface
                | Union
                | Function
                | Functional
                | Data
                | Plex
                | Runtime
                | Comptime
                | Constexpr
                | Defer
                | Auto
                | Const
                | Semconst
                | Static
                | Inline
                | Volatile
                | Danger
                | Implements
                | Extern
                | Module
                | Default
                | Open
                | Closed
                | Func
                | If
                | Else
                | While
                | For
                | Return
                | Break
                | Continue
                | Try
                | Catch
                | Recover
                | Finally
                | Signal
                | Except
                | Raise
                | Cast
                | StaticCast
                | DynamicCast
                | Select
                | Exec
                | ExecAlias
        )
    }

    pub fn is_whitespace_or_formatting(self) -> bool {
        use TokenKind::*;
        matches!(self, Space | Tab | CarriageReturn | VerticalTab | FormFeed | Newline | Comment)
    }
}

/// Keyword table: identifier text -> fine kind. ~90 entries per spec §4.4 1E.
pub fn keyword_lookup(ident: &str) -> Option<TokenKind> {
    use TokenKind::*;
    Some(match ident {
        "int8_t" => Int8T,
        "int16_t" => Int16T,
        "int32_t" => Int32T,
        "int64_t" => Int64T,
        "uint8_t" => Uint8T,
        "uint16_t" => Uint16T,
        "uint32_t" => Uint32T,
        "uint64_t" => Uint64T,
        "size_t" => SizeT,
        "float" => Float,
        "double" => Double,
        "bool" => Bool,
        "char" => Char,
        "void" => Void,
        "class" => Class,
        "struct" => Struct,
        "interface" => Interface,
        "union" => Union,
        "function" => Function,
        "functional" => Functional,
        "data" => Data,
        "plex" => Plex,
        "runtime" => Runtime,
        "comptime" => Comptime,
        "constexpr" => Constexpr,
        "defer" => Defer,
        "auto" => Auto,
        "const" => Const,
        "semconst" => Semconst,
        "static" => Static,
        "inline" => Inline,
        "volatile" => Volatile,
        "danger" => Danger,
        "implements" => Implements,
        "extern" => Extern,
        "module" => Module,
        "default" => Default,
        "open" => Open,
        "closed" => Closed,
        "func" => Func,
        "if" => If,
        "else" => Else,
        "while" => While,
        "for" => For,
        "return" => Return,
        "break" => Break,
        "continue" => Continue,
        "try" => Try,
        "catch" => Catch,
        "recover" => Recover,
        "finally" => Finally,
        "signal" => Signal,
        "except" => Except,
        "raise" => Raise,
        "cast" => Cast,
        "static_cast" => StaticCast,
        "dynamic_cast" => DynamicCast,
        "select" => Select,
        "exec" => Exec,
        "true" => TrueLiteral,
        "false" => FalseLiteral,
        "nullptr" => NullptrLiteral,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_lookup_resolves_exec_and_control_flow() {
        assert_eq!(keyword_lookup("exec"), Some(TokenKind::Exec));
        assert_eq!(keyword_lookup("return"), Some(TokenKind::Return));
        assert_eq!(keyword_lookup("not_a_keyword"), None);
    }

    #[test]
    fn literal_and_keyword_classification_are_disjoint() {
        assert!(TokenKind::IntLiteral.is_literal());
        assert!(!TokenKind::IntLiteral.is_keyword());
        assert!(TokenKind::Class.is_keyword());
        assert!(!TokenKind::Class.is_literal());
    }

    #[test]
    fn raw_class_roundtrips_structural_tokens() {
        assert_eq!(TokenKind::LeftBrace.raw_class(), RawTokenClass::LeftBrace);
        assert_eq!(TokenKind::Semicolon.raw_class(), RawTokenClass::Semicolon);
        assert_eq!(TokenKind::Identifier.raw_class(), RawTokenClass::Identifier);
    }
}
