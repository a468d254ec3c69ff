//! In-process criteria evaluation.
//!
//! This module provides the `CriteriaEvaluator` used by the in-memory store.
//! Evaluation follows SQL three-valued logic so that the in-memory and SQLite
//! backends agree on rows involving NULLs: a comparison against NULL is
//! unknown, `NOT unknown` is unknown, and only rows evaluating to true match.

use std::cmp::Ordering;

use boquery_proto::{ComparisonOp, Criteria, CriterionValue, LogicalOp, QueryField, Value};
use chrono::NaiveDateTime;

/// Something criteria fields can be looked up in.
pub trait FieldSource {
    /// Value of a resolved field. `None` reads as NULL.
    fn field_value(&self, field: &QueryField) -> Option<&Value>;
}

/// Evaluates criteria against records.
pub struct CriteriaEvaluator;

impl CriteriaEvaluator {
    /// Check whether a record matches.
    pub fn matches<R: FieldSource + ?Sized>(
        criteria: &Criteria,
        record: &R,
        now: NaiveDateTime,
    ) -> bool {
        Self::evaluate(criteria, record, now) == Some(true)
    }

    /// Evaluate to true, false, or unknown (`None`).
    pub fn evaluate<R: FieldSource + ?Sized>(
        criteria: &Criteria,
        record: &R,
        now: NaiveDateTime,
    ) -> Option<bool> {
        match criteria {
            Criteria::Comparison { field, op, value } => {
                let field_value = record.field_value(field).unwrap_or(&Value::Null);
                Self::compare(field_value, *op, &value.resolve(now))
            }
            Criteria::Composite { left, op, right } => {
                let l = Self::evaluate(left, record, now);
                let r = Self::evaluate(right, record, now);
                match op {
                    LogicalOp::And => match (l, r) {
                        (Some(false), _) | (_, Some(false)) => Some(false),
                        (Some(true), Some(true)) => Some(true),
                        _ => None,
                    },
                    LogicalOp::Or => match (l, r) {
                        (Some(true), _) | (_, Some(true)) => Some(true),
                        (Some(false), Some(false)) => Some(false),
                        _ => None,
                    },
                }
            }
            Criteria::Not(inner) => Self::evaluate(inner, record, now).map(|b| !b),
        }
    }

    fn compare(field_value: &Value, op: ComparisonOp, value: &CriterionValue) -> Option<bool> {
        match op {
            ComparisonOp::Is | ComparisonOp::IsNot => {
                let is = match value {
                    CriterionValue::Literal(Value::Null) => field_value.is_null(),
                    CriterionValue::Literal(v) => values_equal(field_value, v),
                    _ => false,
                };
                Some(if op == ComparisonOp::Is { is } else { !is })
            }
            ComparisonOp::In | ComparisonOp::NotIn => {
                let list: &[Value] = match value {
                    CriterionValue::List(values) => values,
                    CriterionValue::Literal(v) => std::slice::from_ref(v),
                    _ => &[],
                };
                let negate = op == ComparisonOp::NotIn;
                if list.is_empty() {
                    return Some(negate);
                }
                if field_value.is_null() {
                    return None;
                }
                if list.iter().any(|v| values_equal(field_value, v)) {
                    Some(!negate)
                } else if list.iter().any(Value::is_null) {
                    None
                } else {
                    Some(negate)
                }
            }
            ComparisonOp::Like | ComparisonOp::NotLike => {
                let pattern = match value {
                    CriterionValue::Literal(p) if !p.is_null() => p.to_string(),
                    _ => return None,
                };
                if field_value.is_null() {
                    return None;
                }
                let text = field_value.to_string();
                let matched = Self::like_match(&text, &pattern);
                Some(if op == ComparisonOp::Like { matched } else { !matched })
            }
            _ => {
                let rhs = match value {
                    CriterionValue::Literal(v) => v,
                    _ => return None,
                };
                if field_value.is_null() || rhs.is_null() {
                    return None;
                }
                let ordering = compare_values(field_value, rhs);
                Some(match op {
                    ComparisonOp::Equals => ordering == Some(Ordering::Equal),
                    ComparisonOp::NotEquals => ordering != Some(Ordering::Equal),
                    ComparisonOp::GreaterThan => ordering == Some(Ordering::Greater),
                    ComparisonOp::LessThan => ordering == Some(Ordering::Less),
                    ComparisonOp::GreaterThanEqual => {
                        matches!(ordering, Some(Ordering::Greater | Ordering::Equal))
                    }
                    ComparisonOp::LessThanEqual => {
                        matches!(ordering, Some(Ordering::Less | Ordering::Equal))
                    }
                    _ => false,
                })
            }
        }
    }

    /// Match a string against a SQL LIKE pattern.
    ///
    /// `%` matches zero or more characters and `_` exactly one. Matching is
    /// case-sensitive, as the SQLite store is configured to be.
    pub fn like_match(value: &str, pattern: &str) -> bool {
        let value: Vec<char> = value.chars().collect();
        let pattern: Vec<char> = pattern.chars().collect();
        Self::like_match_from(&value, &pattern)
    }

    /// Greedy matcher that backtracks only to the most recent `%`, so the
    /// cost stays within `value.len() * pattern.len()` steps.
    fn like_match_from(value: &[char], pattern: &[char]) -> bool {
        let (mut v, mut p) = (0, 0);
        // Pattern index after the last `%` and the value index it resumes from.
        let mut resume: Option<(usize, usize)> = None;

        while v < value.len() {
            match pattern.get(p) {
                Some('%') => {
                    p += 1;
                    resume = Some((p, v));
                }
                Some(&c) if c == '_' || c == value[v] => {
                    p += 1;
                    v += 1;
                }
                _ => match resume {
                    Some((after_wildcard, from)) => {
                        p = after_wildcard;
                        v = from + 1;
                        resume = Some((after_wildcard, from + 1));
                    }
                    None => return false,
                },
            }
        }

        pattern[p..].iter().all(|&c| c == '%')
    }
}

/// Check if two values are equal, widening numbers and dates.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        _ => compare_values(a, b) == Some(Ordering::Equal),
    }
}

/// Compare two non-null values, returning their ordering if comparable.
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::Int32(_) | Value::Int64(_), Value::Int32(_) | Value::Int64(_)) => {
            Some(a.as_i64()?.cmp(&b.as_i64()?))
        }
        (
            Value::Int32(_) | Value::Int64(_) | Value::Float64(_),
            Value::Int32(_) | Value::Int64(_) | Value::Float64(_),
        ) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
        (Value::Date(_) | Value::DateTime(_), Value::Date(_) | Value::DateTime(_)) => {
            Some(a.as_date_time()?.cmp(&b.as_date_time()?))
        }
        (Value::Guid(a), Value::Guid(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

/// Total order used for sorting: NULLs first, incomparable values equal.
pub fn sort_order(a: &Value, b: &Value) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => compare_values(a, b).unwrap_or(Ordering::Equal),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    struct Record(Vec<(String, Value)>);

    impl FieldSource for Record {
        fn field_value(&self, field: &QueryField) -> Option<&Value> {
            self.0
                .iter()
                .find(|(name, _)| *name == field.property_name)
                .map(|(_, v)| v)
        }
    }

    fn record() -> Record {
        Record(vec![
            ("Surname".to_string(), Value::String("Smith".into())),
            ("Age".to_string(), Value::Int32(30)),
            ("Approved".to_string(), Value::Null),
            (
                "DateOfBirth".to_string(),
                Value::Date(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()),
            ),
        ])
    }

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(15, 30, 0)
            .unwrap()
    }

    fn eval(text: &str) -> Option<bool> {
        let criteria = boquery_lang::parse_criteria(text).unwrap().unwrap();
        CriteriaEvaluator::evaluate(&criteria, &record(), now())
    }

    #[test]
    fn test_simple_comparisons() {
        assert_eq!(eval("Surname = 'Smith'"), Some(true));
        assert_eq!(eval("Surname <> 'Smith'"), Some(false));
        assert_eq!(eval("Age > 18"), Some(true));
        assert_eq!(eval("Age <= 29"), Some(false));
    }

    #[test]
    fn test_null_comparisons_are_unknown() {
        assert_eq!(eval("Approved = true"), None);
        assert_eq!(eval("NOT (Approved = true)"), None);
        assert_eq!(eval("Approved IS NULL"), Some(true));
        assert_eq!(eval("Approved = NULL"), Some(true));
        assert_eq!(eval("Approved <> NULL"), Some(false));
    }

    #[test]
    fn test_three_valued_logic() {
        assert_eq!(eval("Approved = true OR Age > 18"), Some(true));
        assert_eq!(eval("Approved = true AND Age > 99"), Some(false));
        assert_eq!(eval("Approved = true AND Age > 18"), None);
    }

    #[test]
    fn test_in_lists() {
        assert_eq!(eval("Surname IN ('Jones', 'Smith')"), Some(true));
        assert_eq!(eval("Surname NOT IN ('Jones', 'Smith')"), Some(false));
        assert_eq!(eval("Surname IN ('Jones')"), Some(false));
        assert_eq!(eval("Approved IN (true)"), None);
    }

    #[test]
    fn test_like() {
        assert_eq!(eval("Surname LIKE 'Sm%'"), Some(true));
        assert_eq!(eval("Surname LIKE 'sm%'"), Some(false));
        assert_eq!(eval("Surname NOT LIKE '%x%'"), Some(true));
        assert_eq!(eval("Approved LIKE '%'"), None);
    }

    #[test]
    fn test_today_matches_date_only_value() {
        assert_eq!(eval("DateOfBirth = Today"), Some(true));
        assert_eq!(eval("DateOfBirth < Now"), Some(true));
    }

    #[test]
    fn test_like_match_many_wildcards_on_long_value() {
        let value = "a".repeat(2_000);
        assert!(!CriteriaEvaluator::like_match(&value, "%a%a%a%a%a%a%a%a%a%a%a%a%b"));
        assert!(CriteriaEvaluator::like_match(&value, "%a%a%a%a%a%a%a%a%a%a%a%a%"));
        assert!(CriteriaEvaluator::like_match(&format!("{}b", value), "%a%a%a%a%a%a%b"));
    }

    #[test]
    fn test_like_match() {
        assert!(CriteriaEvaluator::like_match("hello", "hello"));
        assert!(CriteriaEvaluator::like_match("hello", "h%"));
        assert!(CriteriaEvaluator::like_match("hello", "%llo"));
        assert!(CriteriaEvaluator::like_match("hello", "h_llo"));
        assert!(CriteriaEvaluator::like_match("", "%"));
        assert!(!CriteriaEvaluator::like_match("hello", "h_lo"));
        assert!(!CriteriaEvaluator::like_match("hello", "world"));
        assert!(CriteriaEvaluator::like_match("a%b", "a%b"));
        assert!(CriteriaEvaluator::like_match("abcbd", "a%b%d"));
        assert!(CriteriaEvaluator::like_match("abc", "%_c"));
        assert!(!CriteriaEvaluator::like_match("ab", "a%b_"));
    }

    #[test]
    fn test_compare_values_widening() {
        assert_eq!(
            compare_values(&Value::Int32(5), &Value::Int64(5)),
            Some(Ordering::Equal)
        );
        assert_eq!(
            compare_values(&Value::Int32(2), &Value::Float64(2.5)),
            Some(Ordering::Less)
        );
        assert_eq!(compare_values(&Value::Int32(2), &Value::String("2".into())), None);
    }

    #[test]
    fn test_sort_order_nulls_first() {
        assert_eq!(sort_order(&Value::Null, &Value::Int32(1)), Ordering::Less);
        assert_eq!(sort_order(&Value::Int32(1), &Value::Null), Ordering::Greater);
        assert_eq!(
            sort_order(&Value::String("b".into()), &Value::String("a".into())),
            Ordering::Greater
        );
    }
}
