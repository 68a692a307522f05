//! Tokenizer for expression text

use super::error::ParseError;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Identifier(String),
    Integer(i64),
    Real(f64),
    Str(String),
    /// `@N` positional parameter
    Parameter(usize),
    LParen,
    RParen,
    Comma,
    Dot,
    Question,
    Colon,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Amp,
    AndAnd,
    OrOr,
    Bang,
    /// `==` or `=`
    Eq,
    /// `!=` or `<>`
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub position: usize,
}

pub struct Lexer<'a> {
    text: &'a str,
    chars: Vec<(usize, char)>,
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            text,
            chars: text.char_indices().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).map(|(_, c)| *c)
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).map(|(_, c)| *c)
    }

    fn offset(&self) -> usize {
        self.chars
            .get(self.pos)
            .map(|(i, _)| *i)
            .unwrap_or(self.text.len())
    }

    /// Tokenize the whole text; the last token is always `Eof`
    pub fn tokenize(mut self) -> Result<Vec<Token>, ParseError> {
        let mut tokens = Vec::new();
        loop {
            while self.peek().is_some_and(char::is_whitespace) {
                self.pos += 1;
            }
            let position = self.offset();
            let Some(c) = self.peek() else {
                tokens.push(Token {
                    kind: TokenKind::Eof,
                    position,
                });
                return Ok(tokens);
            };

            let kind = match c {
                '(' => self.single(TokenKind::LParen),
                ')' => self.single(TokenKind::RParen),
                ',' => self.single(TokenKind::Comma),
                '.' if !self.peek_at(1).is_some_and(|n| n.is_ascii_digit()) => {
                    self.single(TokenKind::Dot)
                }
                '?' => self.single(TokenKind::Question),
                ':' => self.single(TokenKind::Colon),
                '+' => self.single(TokenKind::Plus),
                '-' => self.single(TokenKind::Minus),
                '*' => self.single(TokenKind::Star),
                '/' => self.single(TokenKind::Slash),
                '%' => self.single(TokenKind::Percent),
                '&' => self.pair('&', TokenKind::AndAnd, TokenKind::Amp),
                '|' => {
                    if self.peek_at(1) == Some('|') {
                        self.pos += 2;
                        TokenKind::OrOr
                    } else {
                        return Err(ParseError::new("Expected '||'", position));
                    }
                }
                '!' => self.pair('=', TokenKind::NotEq, TokenKind::Bang),
                '=' => self.pair('=', TokenKind::Eq, TokenKind::Eq),
                '<' => match self.peek_at(1) {
                    Some('=') => {
                        self.pos += 2;
                        TokenKind::Le
                    }
                    Some('>') => {
                        self.pos += 2;
                        TokenKind::NotEq
                    }
                    _ => self.single(TokenKind::Lt),
                },
                '>' => self.pair('=', TokenKind::Ge, TokenKind::Gt),
                '"' | '\'' => self.string(c, position)?,
                '@' => self.parameter(position)?,
                c if c.is_ascii_digit() || c == '.' => self.number(position)?,
                c if c.is_alphabetic() || c == '_' => self.identifier(),
                other => {
                    return Err(ParseError::new(
                        format!("Unexpected character '{}'", other),
                        position,
                    ));
                }
            };
            tokens.push(Token { kind, position });
        }
    }

    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.pos += 1;
        kind
    }

    fn pair(&mut self, second: char, double: TokenKind, single: TokenKind) -> TokenKind {
        if self.peek_at(1) == Some(second) {
            self.pos += 2;
            double
        } else {
            self.pos += 1;
            single
        }
    }

    /// Quoted literal; a doubled quote inside stands for one quote
    fn string(&mut self, quote: char, position: usize) -> Result<TokenKind, ParseError> {
        self.pos += 1;
        let mut value = String::new();
        loop {
            match self.peek() {
                None => return Err(ParseError::new("Unterminated string literal", position)),
                Some(c) if c == quote => {
                    if self.peek_at(1) == Some(quote) {
                        value.push(quote);
                        self.pos += 2;
                    } else {
                        self.pos += 1;
                        return Ok(TokenKind::Str(value));
                    }
                }
                Some(c) => {
                    value.push(c);
                    self.pos += 1;
                }
            }
        }
    }

    fn parameter(&mut self, position: usize) -> Result<TokenKind, ParseError> {
        self.pos += 1;
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        let digits: String = self.chars[start..self.pos].iter().map(|(_, c)| c).collect();
        digits
            .parse::<usize>()
            .map(TokenKind::Parameter)
            .map_err(|_| ParseError::new("Expected parameter index after '@'", position))
    }

    fn number(&mut self, position: usize) -> Result<TokenKind, ParseError> {
        let start = self.pos;
        let mut is_real = false;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.peek() == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            is_real = true;
            self.pos += 1;
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.pos += 1;
            }
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            let sign = usize::from(matches!(self.peek_at(1), Some('+' | '-')));
            if self.peek_at(1 + sign).is_some_and(|c| c.is_ascii_digit()) {
                is_real = true;
                self.pos += 1 + sign;
                while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.pos += 1;
                }
            }
        }
        let literal: String = self.chars[start..self.pos].iter().map(|(_, c)| c).collect();
        // trailing type suffixes (1m, 2.5d) are accepted and ignored
        if matches!(self.peek(), Some('m' | 'M' | 'd' | 'D' | 'f' | 'F'))
            && !self.peek_at(1).is_some_and(|c| c.is_alphanumeric())
        {
            is_real = true;
            self.pos += 1;
        }
        if is_real {
            literal
                .parse::<f64>()
                .map(TokenKind::Real)
                .map_err(|_| ParseError::new(format!("Invalid real literal '{}'", literal), position))
        } else {
            literal.parse::<i64>().map(TokenKind::Integer).map_err(|_| {
                ParseError::new(format!("Integer literal '{}' out of range", literal), position)
            })
        }
    }

    fn identifier(&mut self) -> TokenKind {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_alphanumeric() || c == '_') {
            self.pos += 1;
        }
        TokenKind::Identifier(self.chars[start..self.pos].iter().map(|(_, c)| c).collect())
    }
}

/// Tokenize `text`
pub fn tokenize(text: &str) -> Result<Vec<Token>, ParseError> {
    Lexer::new(text).tokenize()
}
