//! Query terms and their evaluation against records.

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::attributes::AttributeMap;
use crate::error::Result;
use crate::operator::{Comparison, Modifiers, QueryOperator};

/// One `(key, value, operator)` condition of a query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryTerm {
    /// Attribute key the condition applies to.
    pub key: String,
    /// Value the record attribute is compared against.
    pub value: String,
    /// How the two are compared.
    pub operator: QueryOperator,
}

impl QueryTerm {
    /// Creates a new term.
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>, operator: QueryOperator) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            operator,
        }
    }
}

/// A query whose terms have been prepared for repeated evaluation.
///
/// A record matches when every term holds. An empty query matches every
/// record.
#[derive(Debug, Clone, Default)]
pub struct CompiledQuery {
    terms: Vec<CompiledTerm>,
}

#[derive(Debug, Clone)]
struct CompiledTerm {
    key: String,
    operator: QueryOperator,
    pattern: Pattern,
}

#[derive(Debug, Clone)]
enum Pattern {
    Exists,
    Regex(Regex),
    /// `None` when the query value is not an integer; such a term never holds.
    Numeric(Option<i64>),
    Text(String),
}

impl CompiledQuery {
    /// Prepares `terms` for evaluation.
    ///
    /// # Errors
    ///
    /// Returns [`AslError::InvalidRegex`](crate::AslError::InvalidRegex) if a
    /// regex term does not compile.
    pub fn new(terms: &[QueryTerm]) -> Result<Self> {
        let terms = terms
            .iter()
            .map(CompiledTerm::compile)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { terms })
    }

    /// Returns true if `record` satisfies every term.
    #[must_use]
    pub fn matches(&self, record: &AttributeMap) -> bool {
        self.terms.iter().all(|term| term.matches(record))
    }

    /// Returns the number of terms.
    #[must_use]
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// Returns true if the query has no terms.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

impl CompiledTerm {
    fn compile(term: &QueryTerm) -> Result<Self> {
        let op = term.operator;
        let pattern = if op.comparison() == Comparison::Exists {
            Pattern::Exists
        } else if op.is_regex() {
            let regex = RegexBuilder::new(&term.value)
                .case_insensitive(op.is_casefold())
                .build()?;
            Pattern::Regex(regex)
        } else if op.is_numeric() {
            Pattern::Numeric(parse_integer(&term.value))
        } else if op.is_casefold() {
            Pattern::Text(term.value.to_lowercase())
        } else {
            Pattern::Text(term.value.clone())
        };

        Ok(Self {
            key: term.key.clone(),
            operator: op,
            pattern,
        })
    }

    fn matches(&self, record: &AttributeMap) -> bool {
        let comparison = self.operator.comparison();
        let Some(actual) = record.find(&self.key) else {
            return comparison == Comparison::NotEqual;
        };

        match &self.pattern {
            Pattern::Exists => true,
            Pattern::Regex(regex) => {
                let found = regex.is_match(actual);
                if comparison == Comparison::NotEqual {
                    !found
                } else {
                    found
                }
            }
            Pattern::Numeric(expected) => match (parse_integer(actual), expected) {
                (Some(actual), Some(expected)) => comparison.holds(actual.cmp(expected)),
                _ => false,
            },
            Pattern::Text(expected) => {
                if self.operator.is_casefold() {
                    self.compare_text(&actual.to_lowercase(), expected)
                } else {
                    self.compare_text(actual, expected)
                }
            }
        }
    }

    fn compare_text(&self, actual: &str, expected: &str) -> bool {
        let comparison = self.operator.comparison();
        let shape = self.operator.modifiers() & Modifiers::SUBSTRING;
        let shaped = matches!(comparison, Comparison::Equal | Comparison::NotEqual) && !shape.is_empty();

        if !shaped {
            return comparison.holds(actual.cmp(expected));
        }

        let found = if shape == Modifiers::SUBSTRING {
            actual.contains(expected)
        } else if shape == Modifiers::PREFIX {
            actual.starts_with(expected)
        } else {
            actual.ends_with(expected)
        };

        if comparison == Comparison::NotEqual {
            !found
        } else {
            found
        }
    }
}

/// Parses a decimal integer the way numeric comparisons read attribute text.
fn parse_integer(text: &str) -> Option<i64> {
    text.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AslError, ErrorKind};
    use test_case::test_case;

    fn record(pairs: &[(&str, &str)]) -> AttributeMap {
        let mut map = AttributeMap::new();
        for (k, v) in pairs {
            map.set(*k, *v).expect("set");
        }
        map
    }

    fn single(key: &str, value: &str, op: &str) -> CompiledQuery {
        let op: QueryOperator = op.parse().expect("operator");
        CompiledQuery::new(&[QueryTerm::new(key, value, op)]).expect("compile")
    }

    #[test]
    fn empty_query_matches_everything() {
        let query = CompiledQuery::new(&[]).expect("compile");
        assert!(query.is_empty());
        assert!(query.matches(&AttributeMap::new()));
        assert!(query.matches(&record(&[("Sender", "x")])));
    }

    #[test_case("eq", "daemon", true ; "equal hit")]
    #[test_case("eq", "Daemon", false ; "equal is case sensitive")]
    #[test_case("Ceq", "DAEMON", true ; "casefold equal")]
    #[test_case("ne", "other", true ; "not equal")]
    #[test_case("startswith", "dae", true ; "prefix")]
    #[test_case("endswith", "mon", true ; "suffix")]
    #[test_case("endswith", "dae", false ; "suffix miss")]
    #[test_case("contains", "emo", true ; "substring")]
    #[test_case("Ccontains", "EMO", true ; "casefold substring")]
    #[test_case("match", "^d.*n$", true ; "regex")]
    #[test_case("match", "^x", false ; "regex miss")]
    #[test_case("Cmatch", "^DAE", true ; "casefold regex")]
    #[test_case("gt", "cat", true ; "lexical greater")]
    #[test_case("lt", "cat", false ; "lexical less")]
    fn string_operators(op: &str, value: &str, expected: bool) {
        let query = single("Sender", value, op);
        assert_eq!(query.matches(&record(&[("Sender", "daemon")])), expected);
    }

    #[test_case("==", "5", true ; "numeric equal")]
    #[test_case("==", "05", true ; "numeric equal ignores leading zero")]
    #[test_case("!=", "5", false ; "numeric not equal")]
    #[test_case("<=", "5", true ; "numeric less equal")]
    #[test_case("<", "10", true ; "numeric less not lexical")]
    #[test_case(">", "4", true ; "numeric greater")]
    #[test_case(">=", "6", false ; "numeric greater equal miss")]
    #[test_case("==", "five", false ; "unparsable query value")]
    fn numeric_operators(op: &str, value: &str, expected: bool) {
        let query = single("Level", value, op);
        assert_eq!(query.matches(&record(&[("Level", "5")])), expected);
    }

    #[test]
    fn numeric_against_non_numeric_record_never_matches() {
        let query = single("Level", "5", "!=");
        assert!(!query.matches(&record(&[("Level", "notice")])));
    }

    #[test]
    fn missing_key_matches_only_not_equal() {
        let empty = AttributeMap::new();
        assert!(!single("Sender", "x", "eq").matches(&empty));
        assert!(single("Sender", "x", "ne").matches(&empty));
        assert!(!single("Sender", "x", "contains").matches(&empty));

        let exists = CompiledQuery::new(&[QueryTerm::new("Sender", "", QueryOperator::exists())])
            .expect("compile");
        assert!(!exists.matches(&empty));
    }

    #[test]
    fn exists_ignores_value() {
        let exists = CompiledQuery::new(&[QueryTerm::new("Sender", "zzz", QueryOperator::exists())])
            .expect("compile");
        assert!(exists.matches(&record(&[("Sender", "daemon")])));
    }

    #[test]
    fn all_terms_must_hold() {
        let terms = [
            QueryTerm::new("Sender", "daemon", QueryOperator::equal()),
            QueryTerm::new("Level", "3", "<=".parse().expect("op")),
        ];
        let query = CompiledQuery::new(&terms).expect("compile");
        assert_eq!(query.len(), 2);
        assert!(query.matches(&record(&[("Sender", "daemon"), ("Level", "2")])));
        assert!(!query.matches(&record(&[("Sender", "daemon"), ("Level", "5")])));
    }

    #[test]
    fn invalid_regex_is_value_error() {
        let op: QueryOperator = "match".parse().expect("op");
        let err = CompiledQuery::new(&[QueryTerm::new("Message", "([", op)]).err();
        assert!(matches!(err, Some(AslError::InvalidRegex(_))));
        assert_eq!(err.map(|e| e.kind()), Some(ErrorKind::Value));
    }
}
