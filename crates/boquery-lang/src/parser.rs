//! Recursive descent parser for criteria and order-criteria strings.

use boquery_proto::{
    ComparisonOp, Criteria, CriterionValue, OrderCriteria, QueryField, SortDirection, Value,
};

use crate::error::ParseError;
use crate::lexer::{tokenize, SpannedToken, Token};
use crate::span::Span;

/// Parser over a tokenized criteria string.
pub struct Parser<'source> {
    tokens: Vec<SpannedToken>,
    pos: usize,
    source: &'source str,
}

impl<'source> Parser<'source> {
    /// Create a parser for the given source.
    pub fn new(source: &'source str) -> Result<Self, ParseError> {
        Ok(Self {
            tokens: tokenize(source)?,
            pos: 0,
            source,
        })
    }

    /// Parse a complete criteria string. Blank input yields `None`.
    pub fn parse_criteria(&mut self) -> Result<Option<Criteria>, ParseError> {
        if self.tokens.is_empty() {
            return Ok(None);
        }
        let criteria = self.parse_or()?;
        self.expect_end()?;
        Ok(Some(criteria))
    }

    /// Parse a complete order-criteria string. Blank input yields empty order.
    pub fn parse_order_criteria(&mut self) -> Result<OrderCriteria, ParseError> {
        let mut order = OrderCriteria::new();
        if self.tokens.is_empty() {
            return Ok(order);
        }

        loop {
            let (field, _) = self.parse_path()?;
            let direction = match self.peek().map(|t| &t.token) {
                Some(Token::Asc) => {
                    self.advance();
                    SortDirection::Ascending
                }
                Some(Token::Desc) => {
                    self.advance();
                    SortDirection::Descending
                }
                _ => SortDirection::Ascending,
            };
            order.push(field, direction);

            match self.peek().map(|t| &t.token) {
                Some(Token::Comma) => {
                    self.advance();
                }
                None => break,
                Some(_) => {
                    let tok = self.advance_or_eof()?;
                    return Err(ParseError::new(
                        format!("expected ',' or end of order criteria, found {}", tok.token),
                        tok.span,
                    ));
                }
            }
        }

        Ok(order)
    }

    /// Parse OR chains (lowest precedence).
    fn parse_or(&mut self) -> Result<Criteria, ParseError> {
        let mut left = self.parse_and()?;

        while self.peek_is(&Token::Or) {
            self.advance();
            let right = self.parse_and()?;
            left = left.or(right);
        }

        Ok(left)
    }

    /// Parse AND chains.
    fn parse_and(&mut self) -> Result<Criteria, ParseError> {
        let mut left = self.parse_unary()?;

        while self.peek_is(&Token::And) {
            self.advance();
            let right = self.parse_unary()?;
            left = left.and(right);
        }

        Ok(left)
    }

    /// Parse NOT, a parenthesised group, or a comparison.
    fn parse_unary(&mut self) -> Result<Criteria, ParseError> {
        match self.peek().map(|t| &t.token) {
            Some(Token::Not) => {
                self.advance();
                Ok(self.parse_unary()?.not())
            }
            Some(Token::LParen) => {
                self.advance();
                let inner = self.parse_or()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            _ => self.parse_comparison(),
        }
    }

    /// Parse a leaf comparison.
    fn parse_comparison(&mut self) -> Result<Criteria, ParseError> {
        let (field, field_span) = self.parse_path()?;
        let op_tok = self.advance_or_eof()?;

        let (op, value) = match op_tok.token {
            Token::Eq | Token::Ne | Token::Lt | Token::Le | Token::Gt | Token::Ge => {
                let op = match op_tok.token {
                    Token::Eq => ComparisonOp::Equals,
                    Token::Ne => ComparisonOp::NotEquals,
                    Token::Lt => ComparisonOp::LessThan,
                    Token::Le => ComparisonOp::LessThanEqual,
                    Token::Gt => ComparisonOp::GreaterThan,
                    _ => ComparisonOp::GreaterThanEqual,
                };
                let value = self.parse_value()?;
                (op.normalise_for(&value), value)
            }
            Token::Is => {
                let negated = if self.peek_is(&Token::Not) {
                    self.advance();
                    true
                } else {
                    false
                };
                let null_tok = self.advance_or_eof()?;
                if null_tok.token != Token::Null {
                    return Err(ParseError::new(
                        format!("expected NULL after IS, found {}", null_tok.token),
                        null_tok.span,
                    ));
                }
                let op = if negated {
                    ComparisonOp::IsNot
                } else {
                    ComparisonOp::Is
                };
                (op, CriterionValue::Literal(Value::Null))
            }
            Token::Like => (ComparisonOp::Like, self.parse_value()?),
            Token::In => (ComparisonOp::In, self.parse_list()?),
            Token::Not => {
                let next = self.advance_or_eof()?;
                match next.token {
                    Token::Like => (ComparisonOp::NotLike, self.parse_value()?),
                    Token::In => (ComparisonOp::NotIn, self.parse_list()?),
                    other => {
                        return Err(ParseError::new(
                            format!("expected LIKE or IN after NOT, found {}", other),
                            next.span,
                        ))
                    }
                }
            }
            other => {
                return Err(ParseError::new(
                    format!("expected comparison operator, found {}", other),
                    op_tok.span,
                )
                .with_hint(format!(
                    "'{}' must be followed by =, <>, <, >, <=, >=, LIKE, IN or IS",
                    &self.source[field_span.start..field_span.end]
                )))
            }
        };

        Ok(Criteria::Comparison { field, op, value })
    }

    /// Parse a dotted field path.
    fn parse_path(&mut self) -> Result<(QueryField, Span), ParseError> {
        let (first, mut span) = self.expect_ident()?;
        let mut path = first;

        while self.peek_is(&Token::Dot) {
            self.advance();
            let (segment, segment_span) = self.expect_ident()?;
            path.push('.');
            path.push_str(&segment);
            span = span.merge(segment_span);
        }

        Ok((QueryField::from_path(&path), span))
    }

    /// Parse a single value.
    fn parse_value(&mut self) -> Result<CriterionValue, ParseError> {
        let tok = self.advance_or_eof()?;
        let value = match tok.token {
            Token::String(s) => Value::String(s),
            Token::Int(i) => Value::Int64(i),
            Token::Float(f) => Value::Float64(f),
            Token::True => Value::Bool(true),
            Token::False => Value::Bool(false),
            Token::Null => Value::Null,
            Token::Ident(word) => {
                if word.eq_ignore_ascii_case("today") {
                    return Ok(CriterionValue::Today);
                }
                if word.eq_ignore_ascii_case("now") {
                    return Ok(CriterionValue::Now);
                }
                Value::String(word)
            }
            Token::Eq => {
                return Err(ParseError::new("expected a value, found '='", tok.span)
                    .with_hint("use '=' for equality comparison"))
            }
            other => {
                return Err(ParseError::new(
                    format!("expected a value, found {}", other),
                    tok.span,
                ))
            }
        };
        Ok(CriterionValue::Literal(value))
    }

    /// Parse a parenthesised value list for IN / NOT IN.
    fn parse_list(&mut self) -> Result<CriterionValue, ParseError> {
        self.expect(Token::LParen)?;
        let mut values = Vec::new();

        if self.peek_is(&Token::RParen) {
            self.advance();
            return Ok(CriterionValue::List(values));
        }

        loop {
            let start = self.peek().map(|t| t.span).unwrap_or_else(|| Span::end_of(self.source));
            match self.parse_value()? {
                CriterionValue::Literal(v) => values.push(v),
                _ => {
                    return Err(ParseError::new(
                        "Today and Now are not allowed inside IN lists",
                        start,
                    ))
                }
            }
            if self.peek_is(&Token::Comma) {
                self.advance();
            } else {
                break;
            }
        }

        self.expect(Token::RParen)?;
        Ok(CriterionValue::List(values))
    }

    fn peek(&self) -> Option<&SpannedToken> {
        self.tokens.get(self.pos)
    }

    fn peek_is(&self, token: &Token) -> bool {
        self.peek().map(|t| &t.token == token).unwrap_or(false)
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn advance_or_eof(&mut self) -> Result<SpannedToken, ParseError> {
        match self.tokens.get(self.pos) {
            Some(tok) => {
                let tok = tok.clone();
                self.pos += 1;
                Ok(tok)
            }
            None => Err(ParseError::new(
                "unexpected end of criteria",
                Span::end_of(self.source),
            )),
        }
    }

    fn expect(&mut self, expected: Token) -> Result<SpannedToken, ParseError> {
        let tok = self.advance_or_eof()?;
        if tok.token == expected {
            Ok(tok)
        } else {
            Err(ParseError::new(
                format!("expected {}, found {}", expected, tok.token),
                tok.span,
            ))
        }
    }

    fn expect_ident(&mut self) -> Result<(String, Span), ParseError> {
        let tok = self.advance_or_eof()?;
        match tok.token {
            Token::Ident(name) => Ok((name, tok.span)),
            other => Err(ParseError::new(
                format!("expected a property name, found {}", other),
                tok.span,
            )),
        }
    }

    fn expect_end(&self) -> Result<(), ParseError> {
        match self.peek() {
            None => Ok(()),
            Some(tok) => Err(ParseError::new(
                format!("unexpected {} after end of criteria", tok.token),
                tok.span,
            )
            .with_hint("combine conditions with AND or OR")),
        }
    }
}

/// Parse a criteria string.
pub fn parse_criteria(source: &str) -> Result<Option<Criteria>, ParseError> {
    Parser::new(source)?.parse_criteria()
}

/// Parse an order-criteria string such as `Surname DESC, Owner.FirstName`.
pub fn parse_order_criteria(source: &str) -> Result<OrderCriteria, ParseError> {
    Parser::new(source)?.parse_order_criteria()
}
