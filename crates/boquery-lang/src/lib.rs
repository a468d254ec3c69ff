//! boquery criteria language
//!
//! This crate parses the textual filter and ordering expressions accepted by
//! the loader into the structured IR of `boquery-proto`.
//!
//! # Criteria syntax
//!
//! ```text
//! Surname = 'Smith'
//! Surname LIKE 'Sm%' AND Age >= 18
//! Car.Owner.Surname <> 'O''Brien'
//! DateOfBirth = Today OR Approved IS NOT NULL
//! NOT (Status IN ('Closed', 'Void'))
//! ```
//!
//! Keywords are case-insensitive. `field = NULL` means `field IS NULL`.
//! `Today` and `Now` are kept symbolic and resolved when the query runs.
//!
//! # Order syntax
//!
//! ```text
//! Surname
//! Surname DESC, Owner.FirstName ASC
//! ```
//!
//! # Usage
//!
//! ```rust
//! use boquery_lang::{parse_criteria, parse_order_criteria};
//!
//! let criteria = parse_criteria("Surname = 'Smith' AND Age > 18").unwrap();
//! assert!(criteria.is_some());
//!
//! let order = parse_order_criteria("Surname DESC").unwrap();
//! assert_eq!(order.len(), 1);
//! ```

pub mod error;
pub mod lexer;
pub mod parser;
pub mod span;

pub use error::ParseError;
pub use parser::{parse_criteria, parse_order_criteria, Parser};
pub use span::Span;

/// Tokenize a criteria string (for debugging/testing).
///
/// ```rust
/// let tokens = boquery_lang::tokenize("Surname = 'x'").unwrap();
/// assert_eq!(tokens.len(), 3);
/// ```
pub fn tokenize(source: &str) -> Result<Vec<lexer::SpannedToken>, ParseError> {
    lexer::tokenize(source)
}
