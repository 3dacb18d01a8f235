//! Query operator encoding.
//!
//! A [`QueryOperator`] pairs a base [`Comparison`] with orthogonal
//! [`Modifiers`]. Both pack into a single `u32` whose values are part of the
//! facility contract (see [`constants::query_op`](crate::constants::query_op)).

use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::constants::query_op;
use crate::error::{AslError, Result};

/// Base comparison of a query operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    /// Values are equal
    Equal,
    /// Record value is greater
    Greater,
    /// Record value is greater or equal
    GreaterEqual,
    /// Record value is less
    Less,
    /// Record value is less or equal
    LessEqual,
    /// Values differ
    NotEqual,
    /// Key is present, value ignored
    Exists,
}

impl Comparison {
    /// Returns the numeric base code.
    #[must_use]
    pub const fn code(self) -> u32 {
        match self {
            Self::Equal => query_op::EQUAL,
            Self::Greater => query_op::GREATER,
            Self::GreaterEqual => query_op::GREATER_EQUAL,
            Self::Less => query_op::LESS,
            Self::LessEqual => query_op::LESS_EQUAL,
            Self::NotEqual => query_op::NOT_EQUAL,
            Self::Exists => query_op::TRUE,
        }
    }

    /// Returns the comparison for a base code.
    ///
    /// # Errors
    ///
    /// Returns [`AslError::InvalidOperator`] for an unrecognized base.
    pub const fn from_code(code: u32) -> Result<Self> {
        match code {
            query_op::EQUAL => Ok(Self::Equal),
            query_op::GREATER => Ok(Self::Greater),
            query_op::GREATER_EQUAL => Ok(Self::GreaterEqual),
            query_op::LESS => Ok(Self::Less),
            query_op::LESS_EQUAL => Ok(Self::LessEqual),
            query_op::NOT_EQUAL => Ok(Self::NotEqual),
            query_op::TRUE => Ok(Self::Exists),
            other => Err(AslError::InvalidOperator(other)),
        }
    }

    /// Applies this comparison to an ordering of record value against query value.
    #[must_use]
    pub fn holds(self, ordering: std::cmp::Ordering) -> bool {
        use std::cmp::Ordering::{Equal, Greater, Less};
        match self {
            Self::Equal => ordering == Equal,
            Self::NotEqual => ordering != Equal,
            Self::Greater => ordering == Greater,
            Self::GreaterEqual => ordering != Less,
            Self::Less => ordering == Less,
            Self::LessEqual => ordering != Greater,
            Self::Exists => true,
        }
    }
}

bitflags! {
    /// Modifier bits of a query operator.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct Modifiers: u32 {
        /// Compare case-insensitively.
        const CASEFOLD = query_op::CASEFOLD;
        /// Record value starts with the query value.
        const PREFIX = query_op::PREFIX;
        /// Record value ends with the query value.
        const SUFFIX = query_op::SUFFIX;
        /// Record value contains the query value.
        const SUBSTRING = query_op::SUBSTRING;
        /// Compare both sides as integers.
        const NUMERIC = query_op::NUMERIC;
        /// Query value is a regular expression.
        const REGEX = query_op::REGEX;
    }
}

/// A packed comparison descriptor attached to one query attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueryOperator {
    comparison: Comparison,
    modifiers: Modifiers,
}

impl QueryOperator {
    /// Creates an operator from a base comparison and modifiers.
    #[must_use]
    pub const fn new(comparison: Comparison, modifiers: Modifiers) -> Self {
        Self {
            comparison,
            modifiers,
        }
    }

    /// Plain equality.
    #[must_use]
    pub const fn equal() -> Self {
        Self::new(Comparison::Equal, Modifiers::empty())
    }

    /// Key presence test.
    #[must_use]
    pub const fn exists() -> Self {
        Self::new(Comparison::Exists, Modifiers::empty())
    }

    /// Returns a copy with `modifiers` added.
    #[must_use]
    pub const fn with(self, modifiers: Modifiers) -> Self {
        Self::new(self.comparison, self.modifiers.union(modifiers))
    }

    /// Decodes a packed operator code.
    ///
    /// Unknown modifier bits are dropped. A regex with no base comparison
    /// decodes as an equality match.
    ///
    /// # Errors
    ///
    /// Returns [`AslError::InvalidOperator`] if the base comparison is not
    /// recognized.
    pub fn from_code(code: u32) -> Result<Self> {
        let modifiers = Modifiers::from_bits_truncate(code);
        let base = match code & query_op::BASE_MASK {
            0 if modifiers.contains(Modifiers::REGEX) => Comparison::Equal.code(),
            base => base,
        };
        let comparison = Comparison::from_code(base).map_err(|_| AslError::InvalidOperator(code))?;
        Ok(Self::new(comparison, modifiers))
    }

    /// Packs the operator into its numeric code.
    #[must_use]
    pub const fn encode(self) -> u32 {
        self.comparison.code() | self.modifiers.bits()
    }

    /// Returns the base comparison.
    #[must_use]
    pub const fn comparison(self) -> Comparison {
        self.comparison
    }

    /// Returns the modifier bits.
    #[must_use]
    pub const fn modifiers(self) -> Modifiers {
        self.modifiers
    }

    /// Returns true if both sides are compared case-insensitively.
    #[must_use]
    pub const fn is_casefold(self) -> bool {
        self.modifiers.contains(Modifiers::CASEFOLD)
    }

    /// Returns true if both sides are compared as integers.
    #[must_use]
    pub const fn is_numeric(self) -> bool {
        self.modifiers.contains(Modifiers::NUMERIC)
    }

    /// Returns true if the query value is a regular expression.
    #[must_use]
    pub const fn is_regex(self) -> bool {
        self.modifiers.contains(Modifiers::REGEX)
    }
}

impl Default for QueryOperator {
    fn default() -> Self {
        Self::equal()
    }
}

impl From<QueryOperator> for u32 {
    fn from(op: QueryOperator) -> Self {
        op.encode()
    }
}

impl TryFrom<u32> for QueryOperator {
    type Error = AslError;

    fn try_from(code: u32) -> Result<Self> {
        Self::from_code(code)
    }
}

impl fmt::Display for QueryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let base = match self.comparison {
            Comparison::Equal => "eq",
            Comparison::Greater => "gt",
            Comparison::GreaterEqual => "ge",
            Comparison::Less => "lt",
            Comparison::LessEqual => "le",
            Comparison::NotEqual => "ne",
            Comparison::Exists => "exists",
        };
        f.write_str(base)?;
        for (name, _) in self.modifiers.iter_names() {
            write!(f, "|{}", name.to_ascii_lowercase())?;
        }
        Ok(())
    }
}

/// Parses the short operator names used on the command line.
///
/// `eq ne gt ge lt le match` compare strings, a leading `C` folds case,
/// `== != > >= < <=` compare numerically, and `startswith endswith contains`
/// match string shape.
impl FromStr for QueryOperator {
    type Err = AslError;

    fn from_str(s: &str) -> Result<Self> {
        let (casefold, name) = match s.strip_prefix('C') {
            Some(rest) if !rest.is_empty() => (true, rest),
            _ => (false, s),
        };

        let op = match name {
            "eq" => Self::equal(),
            "ne" => Self::new(Comparison::NotEqual, Modifiers::empty()),
            "gt" => Self::new(Comparison::Greater, Modifiers::empty()),
            "ge" => Self::new(Comparison::GreaterEqual, Modifiers::empty()),
            "lt" => Self::new(Comparison::Less, Modifiers::empty()),
            "le" => Self::new(Comparison::LessEqual, Modifiers::empty()),
            "match" => Self::new(Comparison::Equal, Modifiers::REGEX),
            "startswith" => Self::new(Comparison::Equal, Modifiers::PREFIX),
            "endswith" => Self::new(Comparison::Equal, Modifiers::SUFFIX),
            "contains" => Self::new(Comparison::Equal, Modifiers::SUBSTRING),
            "==" if !casefold => Self::new(Comparison::Equal, Modifiers::NUMERIC),
            "!=" if !casefold => Self::new(Comparison::NotEqual, Modifiers::NUMERIC),
            ">" if !casefold => Self::new(Comparison::Greater, Modifiers::NUMERIC),
            ">=" if !casefold => Self::new(Comparison::GreaterEqual, Modifiers::NUMERIC),
            "<" if !casefold => Self::new(Comparison::Less, Modifiers::NUMERIC),
            "<=" if !casefold => Self::new(Comparison::LessEqual, Modifiers::NUMERIC),
            _ => {
                return Err(AslError::invalid_argument(format!(
                    "invalid query operation: {s}"
                )));
            }
        };

        Ok(if casefold {
            op.with(Modifiers::CASEFOLD)
        } else {
            op
        })
    }
}
