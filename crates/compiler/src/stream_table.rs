//! Backing store for `Token` indirection (§3). A `Token` only carries
//! `(stream_id, token_index)`; the actual `RawToken`s — one vector per
//! tokenisation pass, since exec expansion re-enters Layer 1 on generated
//! fragments and needs its own stream — live here.

use cprime_core::{RawToken, Token};

#[derive(Debug, Default)]
pub struct StreamTable {
    streams: Vec<Vec<RawToken>>,
}

impl StreamTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a freshly tokenised stream, returning its id.
    pub fn push_stream(&mut self, tokens: Vec<RawToken>) -> u32 {
        let id = self.streams.len() as u32;
        self.streams.push(tokens);
        id
    }

    pub fn stream(&self, stream_id: u32) -> &[RawToken] {
        &self.streams[stream_id as usize]
    }

    pub fn raw(&self, token: Token) -> &RawToken {
        &self.streams[token.stream_id as usize][token.token_index as usize]
    }

    pub fn raw_mut(&mut self, token: Token) -> &mut RawToken {
        &mut self.streams[token.stream_id as usize][token.token_index as usize]
    }

    /// Build the `Token` view of an entire stream, in order.
    pub fn as_tokens(&self, stream_id: u32) -> Vec<Token> {
        self.streams[stream_id as usize]
            .iter()
            .enumerate()
            .map(|(i, raw)| Token::new(stream_id, i as u32, raw.token))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cprime_core::TokenKind;

    #[test]
    fn stream_lookup_round_trips_raw_tokens() {
        let mut table = StreamTable::new();
        let id = table.push_stream(vec![RawToken::new(TokenKind::Semicolon, 1, 1, 0)]);
        let tokens = table.as_tokens(id);
        assert_eq!(tokens.len(), 1);
        assert_eq!(table.raw(tokens[0]).token, TokenKind::Semicolon);
    }
}
