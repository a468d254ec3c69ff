//! Lexer for criteria strings using logos.

use crate::error::ParseError;
use crate::span::Span;
use logos::Logos;

/// Token types for the criteria grammar.
///
/// Keywords are matched case-insensitively, so `and`, `AND` and `And` are
/// the same token.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
pub enum Token {
    // Logical operators
    #[token("and", ignore(ascii_case))]
    And,
    #[token("or", ignore(ascii_case))]
    Or,
    #[token("not", ignore(ascii_case))]
    Not,

    // Keyword operators
    #[token("like", ignore(ascii_case))]
    Like,
    #[token("is", ignore(ascii_case))]
    Is,
    #[token("in", ignore(ascii_case))]
    In,

    // Literals
    #[token("null", ignore(ascii_case))]
    Null,
    #[token("true", ignore(ascii_case))]
    True,
    #[token("false", ignore(ascii_case))]
    False,

    // Sort direction
    #[token("asc", ignore(ascii_case))]
    Asc,
    #[token("desc", ignore(ascii_case))]
    Desc,

    // Comparison operators
    #[token("=")]
    Eq,
    #[token("<>")]
    #[token("!=")]
    Ne,
    #[token("<=")]
    Le,
    #[token(">=")]
    Ge,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,

    // Identifier (property, relationship, or bare-word value)
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),

    // Quoted string; a doubled quote inside is a literal quote
    #[regex(r"'([^']|'')*'", |lex| unquote(lex.slice(), '\''))]
    #[regex(r#""([^"]|"")*""#, |lex| unquote(lex.slice(), '"'))]
    String(String),

    // Integer literal
    #[regex(r"-?[0-9]+", |lex| lex.slice().parse::<i64>().ok())]
    Int(i64),

    // Decimal literal
    #[regex(r"-?[0-9]+\.[0-9]+", |lex| lex.slice().parse::<f64>().ok())]
    Float(f64),

    // Punctuation
    #[token(".")]
    Dot,
    #[token(",")]
    Comma,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
}

/// Strip the surrounding quotes and collapse doubled quotes.
fn unquote(slice: &str, quote: char) -> String {
    let inner = &slice[1..slice.len() - 1];
    let doubled: String = [quote, quote].iter().collect();
    inner.replace(&doubled, &quote.to_string())
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::And => write!(f, "AND"),
            Token::Or => write!(f, "OR"),
            Token::Not => write!(f, "NOT"),
            Token::Like => write!(f, "LIKE"),
            Token::Is => write!(f, "IS"),
            Token::In => write!(f, "IN"),
            Token::Null => write!(f, "NULL"),
            Token::True => write!(f, "TRUE"),
            Token::False => write!(f, "FALSE"),
            Token::Asc => write!(f, "ASC"),
            Token::Desc => write!(f, "DESC"),
            Token::Eq => write!(f, "'='"),
            Token::Ne => write!(f, "'<>'"),
            Token::Le => write!(f, "'<='"),
            Token::Ge => write!(f, "'>='"),
            Token::Lt => write!(f, "'<'"),
            Token::Gt => write!(f, "'>'"),
            Token::Ident(name) => write!(f, "identifier '{}'", name),
            Token::String(s) => write!(f, "string '{}'", s),
            Token::Int(i) => write!(f, "integer {}", i),
            Token::Float(v) => write!(f, "number {}", v),
            Token::Dot => write!(f, "'.'"),
            Token::Comma => write!(f, "','"),
            Token::LParen => write!(f, "'('"),
            Token::RParen => write!(f, "')'"),
        }
    }
}

/// A token with its span in the source.
#[derive(Debug, Clone, PartialEq)]
pub struct SpannedToken {
    pub token: Token,
    pub span: Span,
}

/// Tokenize a criteria string.
///
/// Unlike a lenient lexer this stops at the first character that cannot
/// start a token (an unterminated quote, a stray `#`), since silently
/// dropping part of a filter would widen the query.
pub fn tokenize(source: &str) -> Result<Vec<SpannedToken>, ParseError> {
    let mut lexer = Token::lexer(source);
    let mut tokens = Vec::new();

    while let Some(result) = lexer.next() {
        let span: Span = lexer.span().into();
        match result {
            Ok(token) => tokens.push(SpannedToken { token, span }),
            Err(()) => {
                let err = ParseError::new(format!("unexpected input '{}'", lexer.slice()), span);
                let err = if lexer.slice().starts_with('\'') || lexer.slice().starts_with('"') {
                    err.with_hint("string literals must be closed; write '' for a quote inside")
                } else {
                    err
                };
                return Err(err);
            }
        }
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(source: &str) -> Vec<Token> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|t| t.token)
            .collect()
    }

    #[test]
    fn test_simple_comparison() {
        assert_eq!(
            kinds("Surname = 'Smith'"),
            vec![
                Token::Ident("Surname".to_string()),
                Token::Eq,
                Token::String("Smith".to_string()),
            ]
        );
    }

    #[test]
    fn test_keywords_are_case_insensitive() {
        assert_eq!(
            kinds("a and b AND c Or d"),
            vec![
                Token::Ident("a".to_string()),
                Token::And,
                Token::Ident("b".to_string()),
                Token::And,
                Token::Ident("c".to_string()),
                Token::Or,
                Token::Ident("d".to_string()),
            ]
        );
    }

    #[test]
    fn test_keyword_prefix_is_identifier() {
        assert_eq!(
            kinds("IsActive Insurance"),
            vec![
                Token::Ident("IsActive".to_string()),
                Token::Ident("Insurance".to_string()),
            ]
        );
    }

    #[test]
    fn test_doubled_quote_escape() {
        assert_eq!(
            kinds("'O''Brien' \"say \"\"hi\"\"\""),
            vec![
                Token::String("O'Brien".to_string()),
                Token::String("say \"hi\"".to_string()),
            ]
        );
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            kinds("<> != <= >= < >"),
            vec![Token::Ne, Token::Ne, Token::Le, Token::Ge, Token::Lt, Token::Gt]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            kinds("123 -456 3.5 -2.25"),
            vec![
                Token::Int(123),
                Token::Int(-456),
                Token::Float(3.5),
                Token::Float(-2.25),
            ]
        );
    }

    #[test]
    fn test_dotted_path() {
        assert_eq!(
            kinds("Car.Owner.Surname"),
            vec![
                Token::Ident("Car".to_string()),
                Token::Dot,
                Token::Ident("Owner".to_string()),
                Token::Dot,
                Token::Ident("Surname".to_string()),
            ]
        );
    }

    #[test]
    fn test_unterminated_string_is_an_error() {
        let err = tokenize("Surname = 'abc").unwrap_err();
        assert_eq!(err.span.start, 10);
        assert!(err.hint.is_some());
    }
}
