//! Vocabulary table mapping token strings to dense integer ids.
//!
//! A vocabulary listing has one `token weight` pair per line; the line number
//! (from 0) is the token id and the weight column is ignored. Special tokens
//! are recognised by their conventional spellings.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::{info, warn};

use crate::constants::tokenizer::{
    BLANK_SPELLINGS, BOS_SPELLINGS, EOS_SPELLINGS, NO_TOKEN_ID, UNK_SPELLINGS,
};
use crate::error::{ErrorContext, Result, SioError};

/// Dense vocabulary id.
pub type TokenId = i32;

/// Ids of the distinguished vocabulary entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecialTokens {
    pub blk: TokenId,
    pub unk: TokenId,
    pub bos: TokenId,
    pub eos: TokenId,
}

impl Default for SpecialTokens {
    fn default() -> Self {
        Self {
            blk: NO_TOKEN_ID,
            unk: NO_TOKEN_ID,
            bos: NO_TOKEN_ID,
            eos: NO_TOKEN_ID,
        }
    }
}

/// Bidirectional token table.
#[derive(Debug, Clone, Default)]
pub struct Tokenizer {
    index_to_token: Vec<String>,
    token_to_index: HashMap<String, TokenId>,
    special: SpecialTokens,
}

impl Tokenizer {
    /// Load a vocabulary listing from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("opening vocabulary {:?}", path))?;
        let tokenizer = Self::from_reader(BufReader::new(file))?;
        info!(
            path = ?path,
            tokens = tokenizer.size(),
            "Loaded tokenizer vocabulary"
        );
        Ok(tokenizer)
    }

    /// Parse a vocabulary listing from any buffered reader.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut tokenizer = Tokenizer::default();
        let mut blk = None;
        let mut unk = None;
        let mut bos = None;
        let mut eos = None;

        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            let cols: Vec<&str> = line.split_whitespace().collect();
            if cols.len() != 2 {
                return Err(SioError::Vocabulary(format!(
                    "line {}: expected `token weight`, found {} columns",
                    index + 1,
                    cols.len()
                )));
            }

            let id = TokenId::try_from(index).map_err(|_| {
                SioError::Vocabulary(format!("vocabulary exceeds {} entries", TokenId::MAX))
            })?;
            let token = cols[0];
            if tokenizer.token_to_index.contains_key(token) {
                return Err(SioError::Vocabulary(format!(
                    "line {}: duplicate token {:?}",
                    index + 1,
                    token
                )));
            }

            if BLANK_SPELLINGS.contains(&token) {
                blk = Some(id);
            } else if UNK_SPELLINGS.contains(&token) {
                unk = Some(id);
            } else if BOS_SPELLINGS.contains(&token) {
                bos = Some(id);
            } else if EOS_SPELLINGS.contains(&token) {
                eos = Some(id);
            }

            tokenizer.token_to_index.insert(token.to_string(), id);
            tokenizer.index_to_token.push(token.to_string());
        }

        // Blank and unknown stand in for each other when only one is listed.
        let blk = blk.or(unk);
        let unk = unk.or(blk);

        tokenizer.special = SpecialTokens {
            blk: required(blk, "blank")?,
            unk: required(unk, "unknown")?,
            bos: required(bos, "begin-of-sequence")?,
            eos: required(eos, "end-of-sequence")?,
        };
        Ok(tokenizer)
    }

    /// Number of tokens in the vocabulary.
    pub fn size(&self) -> usize {
        self.index_to_token.len()
    }

    /// Token string of `id`.
    pub fn token(&self, id: TokenId) -> Result<&str> {
        usize::try_from(id)
            .ok()
            .and_then(|i| self.index_to_token.get(i))
            .map(String::as_str)
            .ok_or(SioError::TokenIdOutOfRange(id))
    }

    /// Id of `token`.
    pub fn index(&self, token: &str) -> Result<TokenId> {
        self.token_to_index
            .get(token)
            .copied()
            .ok_or_else(|| SioError::TokenNotFound(token.to_string()))
    }

    pub fn special(&self) -> SpecialTokens {
        self.special
    }

    pub fn blk(&self) -> TokenId {
        self.special.blk
    }

    pub fn unk(&self) -> TokenId {
        self.special.unk
    }

    pub fn bos(&self) -> TokenId {
        self.special.bos
    }

    pub fn eos(&self) -> TokenId {
        self.special.eos
    }
}

fn required(id: Option<TokenId>, what: &str) -> Result<TokenId> {
    id.ok_or_else(|| {
        warn!("vocabulary has no {} token", what);
        SioError::Vocabulary(format!("missing {} token", what))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn parse(text: &str) -> Result<Tokenizer> {
        Tokenizer::from_reader(Cursor::new(text))
    }

    #[test]
    fn test_ids_follow_line_order() {
        let t = parse("<blk> 0\n<unk> 0\n<s> 0\n</s> 0\nhello -1.5\nworld -2.0\n").unwrap();
        assert_eq!(t.size(), 6);
        assert_eq!(t.index("hello").unwrap(), 4);
        assert_eq!(t.token(5).unwrap(), "world");
        assert_eq!(
            t.special(),
            SpecialTokens {
                blk: 0,
                unk: 1,
                bos: 2,
                eos: 3
            }
        );
    }

    #[test]
    fn test_unk_stands_in_for_blank() {
        let t = parse("<unk> 0\n<s> 0\n</s> 0\na 0\n").unwrap();
        assert_eq!(t.blk(), 0);
        assert_eq!(t.unk(), 0);
    }

    #[test]
    fn test_blank_stands_in_for_unk() {
        let t = parse("<s> 0\n</s> 0\n<pad> 0\n").unwrap();
        assert_eq!(t.blk(), 2);
        assert_eq!(t.unk(), 2);
    }

    #[test]
    fn test_alternative_spellings() {
        let t = parse("<blank> 0\n<UNK> 0\n<sos> 0\n<eos> 0\n").unwrap();
        assert_eq!(t.special(), SpecialTokens { blk: 0, unk: 1, bos: 2, eos: 3 });
    }

    #[test]
    fn test_missing_bos_fails() {
        let err = parse("<blk> 0\n</s> 0\na 0\n").unwrap_err();
        assert!(matches!(err, SioError::Vocabulary(_)));
    }

    #[test]
    fn test_missing_eos_fails() {
        assert!(parse("<blk> 0\n<s> 0\n").is_err());
    }

    #[test]
    fn test_missing_blank_and_unk_fails() {
        assert!(parse("<s> 0\n</s> 0\n").is_err());
    }

    #[test]
    fn test_malformed_line_fails() {
        assert!(parse("<blk> 0\n<s>\n</s> 0\n").is_err());
        assert!(parse("<blk> 0 extra\n").is_err());
    }

    #[test]
    fn test_duplicate_token_fails() {
        assert!(parse("<blk> 0\n<s> 0\n</s> 0\na 0\na 0\n").is_err());
    }

    #[test]
    fn test_unknown_lookups_fail() {
        let t = parse("<blk> 0\n<s> 0\n</s> 0\n").unwrap();
        assert!(matches!(t.index("zzz"), Err(SioError::TokenNotFound(_))));
        assert!(matches!(t.token(3), Err(SioError::TokenIdOutOfRange(3))));
        assert!(matches!(t.token(-1), Err(SioError::TokenIdOutOfRange(-1))));
    }
}
