//! `Token`: a lightweight reference into a `RawToken` stream (§3).

use crate::token_kind::TokenKind;

/// A reference to a position inside a named raw-token stream. Multiple
/// `Token`s may reference the same underlying `RawToken`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Token {
    pub stream_id: u32,
    pub token_index: u32,
    pub fine_kind: TokenKind,
}

impl Token {
    pub fn new(stream_id: u32, token_index: u32, fine_kind: TokenKind) -> Self {
        Token {
            stream_id,
            token_index,
            fine_kind,
        }
    }
}
