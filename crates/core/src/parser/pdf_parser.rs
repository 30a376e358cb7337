//! Object parser - converts tokens to PDF objects.

use crate::error::{PdfError, Result};
use crate::model::{Dict, ObjRef, PdfObject};
use crate::parser::lexer::{Keyword, Lexer, Token};

/// Parses PDF object syntax.
///
/// Drives [`Lexer`] and builds [`PdfObject`] values recursively. The one
/// grammar ambiguity of the format lives here: a bare `int int R` sequence
/// is an indirect reference, so two tokens of lookahead (with pushback)
/// decide between a reference and plain integers. References are never
/// resolved by the parser; they come out as [`PdfObject::Ref`] and the
/// document layer resolves them on demand.
pub struct ObjectParser<'a> {
    lexer: Lexer<'a>,
    /// Pushback buffer for lookahead tokens
    lookahead: Vec<Token>,
}

impl<'a> ObjectParser<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            lexer: Lexer::new(data),
            lookahead: Vec::new(),
        }
    }

    /// Create a parser positioned at an arbitrary offset.
    pub fn at(data: &'a [u8], pos: usize) -> Self {
        Self {
            lexer: Lexer::at(data, pos),
            lookahead: Vec::new(),
        }
    }

    /// Current position in the buffer.
    ///
    /// Only meaningful when the pushback buffer is empty (i.e. after a
    /// complete object has been parsed).
    pub fn tell(&self) -> usize {
        self.lexer.tell()
    }

    /// Get remaining unparsed data.
    pub fn remaining(&self) -> &'a [u8] {
        self.lexer.remaining()
    }

    fn next_token(&mut self) -> Result<Option<Token>> {
        if let Some(tok) = self.lookahead.pop() {
            return Ok(Some(tok));
        }
        match self.lexer.next_token() {
            Some(Ok((_, tok))) => Ok(Some(tok)),
            Some(Err(e)) => Err(e),
            None => Ok(None),
        }
    }

    fn push_back(&mut self, tok: Token) {
        self.lookahead.push(tok);
    }

    /// Parse the next PDF object.
    pub fn parse_object(&mut self) -> Result<PdfObject> {
        let token = self.next_token()?.ok_or(PdfError::UnexpectedEof)?;
        self.token_to_object(token)
    }

    fn token_to_object(&mut self, token: Token) -> Result<PdfObject> {
        match token {
            Token::Int(n) => {
                // Could be the start of an indirect reference: objid genno R
                if let Ok(Some(tok2)) = self.next_token() {
                    if let Token::Int(m) = tok2 {
                        if let Ok(Some(tok3)) = self.next_token() {
                            if tok3 == Token::Keyword(Keyword::R)
                                && n >= 0
                                && m >= 0
                                && n <= u32::MAX as i64
                                && m <= u32::MAX as i64
                            {
                                return Ok(PdfObject::Ref(ObjRef::new(n as u32, m as u32)));
                            }
                            // Not R, push back both
                            self.push_back(tok3);
                        }
                        self.push_back(Token::Int(m));
                    } else {
                        self.push_back(tok2);
                    }
                }
                Ok(PdfObject::Int(n))
            }
            Token::Real(n) => Ok(PdfObject::Real(n)),
            Token::Bool(b) => Ok(PdfObject::Bool(b)),
            Token::Name(s) => Ok(PdfObject::Name(s)),
            Token::String(s) | Token::HexString(s) => Ok(PdfObject::String(s)),
            Token::Keyword(kw) => match kw {
                Keyword::Null => Ok(PdfObject::Null),
                Keyword::True => Ok(PdfObject::Bool(true)),
                Keyword::False => Ok(PdfObject::Bool(false)),
                Keyword::ArrayStart => self.parse_array(),
                Keyword::DictStart => self.parse_dict(),
                other => Err(PdfError::SyntaxError(format!(
                    "unexpected keyword in object context: {}",
                    String::from_utf8_lossy(other.as_bytes())
                ))),
            },
        }
    }

    /// Parse array contents until ]
    fn parse_array(&mut self) -> Result<PdfObject> {
        let mut arr = Vec::new();

        loop {
            let token = self.next_token()?.ok_or(PdfError::UnexpectedEof)?;
            if token == Token::Keyword(Keyword::ArrayEnd) {
                break;
            }
            arr.push(self.token_to_object(token)?);
        }

        Ok(PdfObject::Array(arr))
    }

    /// Parse dict contents until >>
    fn parse_dict(&mut self) -> Result<PdfObject> {
        let mut dict = Dict::new();

        loop {
            let token = self.next_token()?.ok_or(PdfError::UnexpectedEof)?;
            if token == Token::Keyword(Keyword::DictEnd) {
                break;
            }

            // Keys must be names; a re-declared key overwrites the earlier
            // value, matching the format's own resolution rule
            let key = match token {
                Token::Name(name) => name,
                _ => {
                    return Err(PdfError::SyntaxError(
                        "expected name as dict key".into(),
                    ));
                }
            };

            let value = self.parse_object()?;
            dict.insert(key, value);
        }

        Ok(PdfObject::Dict(dict))
    }
}
