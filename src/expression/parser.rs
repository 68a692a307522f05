//! Recursive-descent parser
//!
//! Precedence, loosest first:
//!
//! | level          | operators                  |
//! |----------------|----------------------------|
//! | conditional    | `c ? a : b`                |
//! | or             | `\|\|` `or`                |
//! | and            | `&&` `and`                 |
//! | equality       | `==` `=` `!=` `<>`         |
//! | relational     | `<` `<=` `>` `>=`          |
//! | additive       | `+` `-` `&`                |
//! | multiplicative | `*` `/` `%` `mod`          |
//! | unary          | `-` `!` `not`              |
//! | primary        | literals, `@N`, `it`, identifiers, calls, `.` member access, `( )` |

use super::ast::{BinaryOp, Expr, Literal, OrderingClause, UnaryOp};
use super::error::ParseError;
use super::lexer::{Token, TokenKind, tokenize};

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(text: &str) -> Result<Self, ParseError> {
        Ok(Self {
            tokens: tokenize(text)?,
            pos: 0,
        })
    }

    fn peek(&self) -> &Token {
        // tokenize always ends with Eof
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn check(&self, kind: &TokenKind) -> bool {
        &self.peek().kind == kind
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Token, ParseError> {
        if self.check(&kind) {
            Ok(self.advance())
        } else {
            Err(ParseError::new(format!("{} expected", what), self.peek().position))
        }
    }

    /// True when the next token is the given keyword (case-insensitive)
    fn check_keyword(&self, keyword: &str) -> bool {
        matches!(&self.peek().kind, TokenKind::Identifier(name) if name.eq_ignore_ascii_case(keyword))
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.check_keyword(keyword) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_end(&self) -> Result<(), ParseError> {
        match &self.peek().kind {
            TokenKind::Eof => Ok(()),
            other => Err(ParseError::new(
                format!("Syntax error: unexpected {:?}", other),
                self.peek().position,
            )),
        }
    }

    /// Parse a complete expression
    pub fn parse_expression(mut self) -> Result<Expr, ParseError> {
        let expr = self.expression()?;
        self.expect_end()?;
        Ok(expr)
    }

    /// Parse a comma separated ordering list (`Key [asc|ascending|desc|descending], ...`)
    pub fn parse_orderings(mut self) -> Result<Vec<OrderingClause>, ParseError> {
        let mut clauses = Vec::new();
        loop {
            let expr = self.expression()?;
            let descending = if self.eat_keyword("desc") || self.eat_keyword("descending") {
                true
            } else {
                if !self.eat_keyword("asc") {
                    self.eat_keyword("ascending");
                }
                false
            };
            clauses.push(OrderingClause { expr, descending });
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect_end()?;
        Ok(clauses)
    }

    fn expression(&mut self) -> Result<Expr, ParseError> {
        if self.check(&TokenKind::Eof) {
            return Err(ParseError::new("Expression expected", self.peek().position));
        }
        self.conditional()
    }

    fn conditional(&mut self) -> Result<Expr, ParseError> {
        let test = self.logical_or()?;
        if self.check(&TokenKind::Question) {
            let position = self.advance().position;
            let if_true = self.expression()?;
            self.expect(TokenKind::Colon, "':'")?;
            let if_false = self.expression()?;
            return Ok(Expr::Conditional {
                test: Box::new(test),
                if_true: Box::new(if_true),
                if_false: Box::new(if_false),
                position,
            });
        }
        Ok(test)
    }

    fn binary(op: BinaryOp, left: Expr, right: Expr, position: usize) -> Expr {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
            position,
        }
    }

    fn logical_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.logical_and()?;
        loop {
            let position = self.peek().position;
            if self.eat(&TokenKind::OrOr) || self.eat_keyword("or") {
                let right = self.logical_and()?;
                left = Self::binary(BinaryOp::Or, left, right, position);
            } else {
                return Ok(left);
            }
        }
    }

    fn logical_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.equality()?;
        loop {
            let position = self.peek().position;
            if self.eat(&TokenKind::AndAnd) || self.eat_keyword("and") {
                let right = self.equality()?;
                left = Self::binary(BinaryOp::And, left, right, position);
            } else {
                return Ok(left);
            }
        }
    }

    fn equality(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.relational()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Eq => BinaryOp::Eq,
                TokenKind::NotEq => BinaryOp::NotEq,
                _ => return Ok(left),
            };
            let position = self.advance().position;
            let right = self.relational()?;
            left = Self::binary(op, left, right, position);
        }
    }

    fn relational(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.additive()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Lt => BinaryOp::Lt,
                TokenKind::Le => BinaryOp::Le,
                TokenKind::Gt => BinaryOp::Gt,
                TokenKind::Ge => BinaryOp::Ge,
                _ => return Ok(left),
            };
            let position = self.advance().position;
            let right = self.additive()?;
            left = Self::binary(op, left, right, position);
        }
    }

    fn additive(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.multiplicative()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                TokenKind::Amp => BinaryOp::Concat,
                _ => return Ok(left),
            };
            let position = self.advance().position;
            let right = self.multiplicative()?;
            left = Self::binary(op, left, right, position);
        }
    }

    fn multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.unary()?;
        loop {
            let position = self.peek().position;
            let op = match self.peek().kind {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Mod,
                _ if self.check_keyword("mod") => BinaryOp::Mod,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.unary()?;
            left = Self::binary(op, left, right, position);
        }
    }

    fn unary(&mut self) -> Result<Expr, ParseError> {
        let position = self.peek().position;
        let op = if self.eat(&TokenKind::Minus) {
            UnaryOp::Neg
        } else if self.eat(&TokenKind::Bang) || self.eat_keyword("not") {
            UnaryOp::Not
        } else {
            return self.postfix();
        };
        let operand = self.unary()?;
        // fold negative literals so `-5` stays a constant
        if op == UnaryOp::Neg {
            if let Expr::Literal { value, .. } = &operand {
                match value {
                    Literal::Int(i) => {
                        return Ok(Expr::Literal {
                            value: Literal::Int(-i),
                            position,
                        });
                    }
                    Literal::Decimal(d) => {
                        return Ok(Expr::Literal {
                            value: Literal::Decimal(-d),
                            position,
                        });
                    }
                    _ => {}
                }
            }
        }
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
            position,
        })
    }

    fn postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.primary()?;
        while self.check(&TokenKind::Dot) {
            self.advance();
            let token = self.advance();
            let name = match token.kind {
                TokenKind::Identifier(name) => name,
                _ => return Err(ParseError::new("Identifier expected after '.'", token.position)),
            };
            if self.check(&TokenKind::LParen) {
                let args = self.arguments()?;
                expr = Expr::Call {
                    target: Some(Box::new(expr)),
                    name,
                    args,
                    position: token.position,
                };
            } else {
                expr = Expr::Member {
                    target: Box::new(expr),
                    name,
                    position: token.position,
                };
            }
        }
        Ok(expr)
    }

    fn arguments(&mut self) -> Result<Vec<Expr>, ParseError> {
        self.expect(TokenKind::LParen, "'('")?;
        let mut args = Vec::new();
        if self.eat(&TokenKind::RParen) {
            return Ok(args);
        }
        loop {
            args.push(self.expression()?);
            if self.eat(&TokenKind::Comma) {
                continue;
            }
            self.expect(TokenKind::RParen, "')' or ','")?;
            return Ok(args);
        }
    }

    fn primary(&mut self) -> Result<Expr, ParseError> {
        let token = self.advance();
        let position = token.position;
        let literal = |value| Ok(Expr::Literal { value, position });
        match token.kind {
            TokenKind::Integer(i) => literal(Literal::Int(i)),
            TokenKind::Real(d) => literal(Literal::Decimal(d)),
            TokenKind::Str(s) => literal(Literal::String(s)),
            TokenKind::Parameter(index) => Ok(Expr::Parameter { index, position }),
            TokenKind::LParen => {
                let inner = self.expression()?;
                self.expect(TokenKind::RParen, "')'")?;
                Ok(inner)
            }
            TokenKind::Identifier(name) => self.identifier(name, position),
            TokenKind::Eof => Err(ParseError::new("Expression expected", position)),
            other => Err(ParseError::new(
                format!("Syntax error: unexpected {:?}", other),
                position,
            )),
        }
    }

    fn identifier(&mut self, name: String, position: usize) -> Result<Expr, ParseError> {
        match name.to_ascii_lowercase().as_str() {
            "true" => return Ok(Expr::Literal { value: Literal::Bool(true), position }),
            "false" => return Ok(Expr::Literal { value: Literal::Bool(false), position }),
            "null" => return Ok(Expr::Literal { value: Literal::Null, position }),
            "it" => return Ok(Expr::It { position }),
            _ => {}
        }
        if !self.check(&TokenKind::LParen) {
            return Ok(Expr::Identifier { name, position });
        }
        let mut args = self.arguments()?;
        if name.eq_ignore_ascii_case("iif") {
            if args.len() != 3 {
                return Err(ParseError::new("iif requires three arguments", position));
            }
            let if_false = args.pop();
            let if_true = args.pop();
            let test = args.pop();
            if let (Some(test), Some(if_true), Some(if_false)) = (test, if_true, if_false) {
                return Ok(Expr::Conditional {
                    test: Box::new(test),
                    if_true: Box::new(if_true),
                    if_false: Box::new(if_false),
                    position,
                });
            }
        }
        Ok(Expr::Call {
            target: None,
            name,
            args,
            position,
        })
    }
}

/// Parse expression text into a syntax tree
pub fn parse_expression(text: &str) -> Result<Expr, ParseError> {
    Parser::new(text)?.parse_expression()
}

/// Parse an ordering list such as `"Level desc, Name"`
pub fn parse_orderings(text: &str) -> Result<Vec<OrderingClause>, ParseError> {
    Parser::new(text)?.parse_orderings()
}
