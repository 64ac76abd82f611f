#![forbid(unsafe_code)]

//! Recursive-descent parser over the token stream.

use super::lexer::{Spanned, Token, tokenize};
use super::{BinaryOp, Expr, Literal, LogicalOp, ParseError, UnaryOp};
use crate::value::Value;

/// Deepest expression tree accepted before parsing gives up.
///
/// Brackets, unary operators, and every link of a binary or postfix chain
/// count one level, so evaluation and drop recursion stay bounded.
const MAX_NESTING: usize = 128;

/// Parse an attribute expression.
///
/// An empty (or all-whitespace) source yields the `undefined` literal.
///
/// # Errors
///
/// Returns a [`ParseError`] on lexing failures, unexpected tokens, or
/// trailing input after a complete expression.
pub fn parse(source: &str) -> Result<Expr, ParseError> {
    let tokens = tokenize(source)?;
    if tokens.is_empty() {
        return Ok(Expr::Literal(Literal::Undefined));
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        end: source.len(),
        depth: 0,
    };
    let expr = parser.expression()?;
    if let Some((token, span)) = parser.tokens.get(parser.pos) {
        return Err(ParseError::new(
            format!("unexpected trailing {token:?}"),
            span.start,
        ));
    }
    Ok(expr)
}

struct Parser<'src> {
    tokens: Vec<Spanned<'src>>,
    pos: usize,
    end: usize,
    depth: usize,
}

impl<'src> Parser<'src> {
    fn peek(&self) -> Option<&Token<'src>> {
        self.tokens.get(self.pos).map(|(token, _)| token)
    }

    fn offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map_or(self.end, |(_, span)| span.start)
    }

    fn bump(&mut self) -> Option<Token<'src>> {
        let token = self.tokens.get(self.pos).map(|(token, _)| token.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Token<'_>) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &Token<'_>) -> Result<(), ParseError> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("expected {expected:?}")))
        }
    }

    fn unexpected(&self, context: &str) -> ParseError {
        match self.peek() {
            Some(token) => ParseError::new(format!("{context}, found {token:?}"), self.offset()),
            None => ParseError::new(format!("{context}, found end of input"), self.end),
        }
    }

    fn expression(&mut self) -> Result<Expr, ParseError> {
        self.nested(Self::conditional)
    }

    fn nested(
        &mut self,
        parse: fn(&mut Self) -> Result<Expr, ParseError>,
    ) -> Result<Expr, ParseError> {
        self.deepen()?;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn deepen(&mut self) -> Result<(), ParseError> {
        if self.depth >= MAX_NESTING {
            return Err(ParseError::new("expression nested too deeply", self.offset()));
        }
        self.depth += 1;
        Ok(())
    }

    fn conditional(&mut self) -> Result<Expr, ParseError> {
        let test = self.logical_or()?;
        if !self.eat(&Token::Question) {
            return Ok(test);
        }
        let consequent = self.expression()?;
        self.expect(&Token::Colon)?;
        let alternate = self.expression()?;
        Ok(Expr::Conditional {
            test: Box::new(test),
            consequent: Box::new(consequent),
            alternate: Box::new(alternate),
        })
    }

    fn logical_or(&mut self) -> Result<Expr, ParseError> {
        let entry = self.depth;
        let mut left = self.logical_and()?;
        while self.eat(&Token::OrOr) {
            self.deepen()?;
            let right = self.logical_and()?;
            left = Expr::Logical {
                op: LogicalOp::Or,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        self.depth = entry;
        Ok(left)
    }

    fn logical_and(&mut self) -> Result<Expr, ParseError> {
        let entry = self.depth;
        let mut left = self.equality()?;
        while self.eat(&Token::AndAnd) {
            self.deepen()?;
            let right = self.equality()?;
            left = Expr::Logical {
                op: LogicalOp::And,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        self.depth = entry;
        Ok(left)
    }

    fn equality(&mut self) -> Result<Expr, ParseError> {
        self.binary_level(Self::comparison, |token| match token {
            Token::Eq => Some(BinaryOp::Eq),
            Token::Ne => Some(BinaryOp::Ne),
            Token::StrictEq => Some(BinaryOp::StrictEq),
            Token::StrictNe => Some(BinaryOp::StrictNe),
            _ => None,
        })
    }

    fn comparison(&mut self) -> Result<Expr, ParseError> {
        self.binary_level(Self::additive, |token| match token {
            Token::Lt => Some(BinaryOp::Lt),
            Token::Le => Some(BinaryOp::Le),
            Token::Gt => Some(BinaryOp::Gt),
            Token::Ge => Some(BinaryOp::Ge),
            _ => None,
        })
    }

    fn additive(&mut self) -> Result<Expr, ParseError> {
        self.binary_level(Self::product, |token| match token {
            Token::Plus => Some(BinaryOp::Add),
            Token::Minus => Some(BinaryOp::Sub),
            _ => None,
        })
    }

    fn product(&mut self) -> Result<Expr, ParseError> {
        self.binary_level(Self::unary, |token| match token {
            Token::Star => Some(BinaryOp::Mul),
            Token::Slash => Some(BinaryOp::Div),
            Token::Percent => Some(BinaryOp::Rem),
            _ => None,
        })
    }

    /// Left-associative fold of `operand (op operand)*`.
    fn binary_level(
        &mut self,
        operand: fn(&mut Self) -> Result<Expr, ParseError>,
        operator: fn(&Token<'_>) -> Option<BinaryOp>,
    ) -> Result<Expr, ParseError> {
        let entry = self.depth;
        let mut left = operand(self)?;
        while let Some(op) = self.peek().and_then(operator) {
            self.pos += 1;
            self.deepen()?;
            let right = operand(self)?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        self.depth = entry;
        Ok(left)
    }

    fn unary(&mut self) -> Result<Expr, ParseError> {
        let op = match self.peek() {
            Some(Token::Minus) => UnaryOp::Neg,
            Some(Token::Plus) => UnaryOp::Plus,
            Some(Token::Bang) => UnaryOp::Not,
            _ => return self.postfix(),
        };
        self.pos += 1;
        let operand = self.nested(Self::unary)?;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn postfix(&mut self) -> Result<Expr, ParseError> {
        let entry = self.depth;
        let mut expr = self.primary()?;
        loop {
            if matches!(
                self.peek(),
                Some(Token::Dot | Token::LBracket | Token::LParen)
            ) {
                self.deepen()?;
            }
            if self.eat(&Token::Dot) {
                let property = self.property_name()?;
                expr = Expr::Member {
                    object: Box::new(expr),
                    property,
                };
            } else if self.eat(&Token::LBracket) {
                let index = self.expression()?;
                self.expect(&Token::RBracket)?;
                expr = Expr::Index {
                    object: Box::new(expr),
                    index: Box::new(index),
                };
            } else if self.eat(&Token::LParen) {
                let args = self.list(&Token::RParen, Self::expression)?;
                expr = Expr::Call {
                    callee: Box::new(expr),
                    args,
                };
            } else {
                self.depth = entry;
                return Ok(expr);
            }
        }
    }

    fn primary(&mut self) -> Result<Expr, ParseError> {
        let offset = self.offset();
        let Some(token) = self.bump() else {
            return Err(ParseError::new("expected expression, found end of input", offset));
        };
        let expr = match token {
            Token::True => Expr::Literal(Literal::Bool(true)),
            Token::False => Expr::Literal(Literal::Bool(false)),
            Token::Null => Expr::Literal(Literal::Null),
            Token::Undefined => Expr::Literal(Literal::Undefined),
            Token::Number(n) => Expr::Literal(Literal::Number(n)),
            Token::Str(s) => Expr::Literal(Literal::String(s)),
            Token::Ident(name) => Expr::Identifier(name.to_owned()),
            Token::LParen => {
                let inner = self.expression()?;
                self.expect(&Token::RParen)?;
                inner
            }
            Token::LBracket => Expr::Array(self.list(&Token::RBracket, Self::expression)?),
            Token::LBrace => Expr::Object(self.list(&Token::RBrace, Self::object_entry)?),
            other => {
                return Err(ParseError::new(
                    format!("expected expression, found {other:?}"),
                    offset,
                ));
            }
        };
        Ok(expr)
    }

    /// Comma-separated items up to `close`, trailing comma allowed.
    fn list<T>(
        &mut self,
        close: &Token<'_>,
        item: fn(&mut Self) -> Result<T, ParseError>,
    ) -> Result<Vec<T>, ParseError> {
        let mut items = Vec::new();
        loop {
            if self.eat(close) {
                return Ok(items);
            }
            items.push(item(self)?);
            if !self.eat(&Token::Comma) {
                self.expect(close)?;
                return Ok(items);
            }
        }
    }

    fn object_entry(&mut self) -> Result<(String, Expr), ParseError> {
        let literal_key = match self.peek() {
            Some(Token::Str(s)) => Some(s.clone()),
            Some(Token::Number(n)) => Some(Value::Number(*n).to_string()),
            _ => None,
        };
        let key = match literal_key {
            Some(key) => {
                self.pos += 1;
                key
            }
            None => self.property_name()?,
        };
        self.entry_value(key)
    }

    fn entry_value(&mut self, key: String) -> Result<(String, Expr), ParseError> {
        self.expect(&Token::Colon)?;
        let value = self.expression()?;
        Ok((key, value))
    }

    /// Identifier or keyword used as a property name.
    fn property_name(&mut self) -> Result<String, ParseError> {
        let name = match self.peek() {
            Some(Token::Ident(name)) => (*name).to_owned(),
            Some(Token::True) => "true".to_owned(),
            Some(Token::False) => "false".to_owned(),
            Some(Token::Null) => "null".to_owned(),
            Some(Token::Undefined) => "undefined".to_owned(),
            _ => return Err(self.unexpected("expected property name")),
        };
        self.pos += 1;
        Ok(name)
    }
}
