//! Records and queries.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::attributes::AttributeMap;
use crate::error::{AslError, Result};
use crate::operator::QueryOperator;
use crate::query::QueryTerm;
use crate::types::MessageKind;

/// An attribute map tagged as either a log record or a search query.
///
/// The kind is fixed at construction. A query additionally carries one
/// [`QueryOperator`] per attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    kind: MessageKind,
    attributes: AttributeMap,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    operators: BTreeMap<String, QueryOperator>,
}

impl Message {
    /// Creates an empty message of the given kind.
    #[must_use]
    pub fn new(kind: MessageKind) -> Self {
        Self {
            kind,
            attributes: AttributeMap::new(),
            operators: BTreeMap::new(),
        }
    }

    /// Creates an empty log record.
    #[must_use]
    pub fn new_record() -> Self {
        Self::new(MessageKind::Record)
    }

    /// Creates an empty search query.
    #[must_use]
    pub fn new_query() -> Self {
        Self::new(MessageKind::Query)
    }

    /// Creates an empty message from a numeric kind code.
    ///
    /// # Errors
    ///
    /// Returns [`AslError::InvalidKind`] for codes other than record and query.
    pub fn from_code(code: u32) -> Result<Self> {
        MessageKind::try_from(code).map(Self::new)
    }

    /// Wraps attributes returned by the facility as a record.
    pub(crate) fn from_attributes(attributes: AttributeMap) -> Self {
        Self {
            kind: MessageKind::Record,
            attributes,
            operators: BTreeMap::new(),
        }
    }

    /// Returns the kind chosen at construction.
    #[must_use]
    pub const fn kind(&self) -> MessageKind {
        self.kind
    }

    /// Returns true for log records.
    #[must_use]
    pub fn is_record(&self) -> bool {
        self.kind == MessageKind::Record
    }

    /// Returns true for search queries.
    #[must_use]
    pub fn is_query(&self) -> bool {
        self.kind == MessageKind::Query
    }

    /// Sets an attribute.
    ///
    /// On a query the attribute is paired with the presence operator, so it
    /// matches any record carrying the key.
    ///
    /// # Errors
    ///
    /// Returns [`AslError::InvalidArgument`] under the rules of
    /// [`AttributeMap::set`].
    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) -> Result<()> {
        let key = key.into();
        self.attributes.set(key.clone(), value)?;
        if self.is_query() {
            self.operators.insert(key, QueryOperator::exists());
        }
        Ok(())
    }

    /// Sets a query condition.
    ///
    /// # Errors
    ///
    /// Returns [`AslError::WrongKind`] on a record, or
    /// [`AslError::InvalidArgument`] under the rules of [`AttributeMap::set`].
    pub fn set_query(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
        operator: QueryOperator,
    ) -> Result<()> {
        self.require(MessageKind::Query)?;
        let key = key.into();
        self.attributes.set(key.clone(), value)?;
        self.operators.insert(key, operator);
        Ok(())
    }

    /// Sets a query condition from a packed operator code.
    ///
    /// # Errors
    ///
    /// Returns [`AslError::InvalidOperator`] for an unknown base comparison,
    /// plus everything [`set_query`](Self::set_query) returns.
    pub fn set_query_code(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
        code: u32,
    ) -> Result<()> {
        self.require(MessageKind::Query)?;
        let operator = QueryOperator::from_code(code)?;
        self.set_query(key, value, operator)
    }

    /// Returns the value of an attribute.
    ///
    /// # Errors
    ///
    /// Returns [`AslError::KeyNotFound`] if the key is not set.
    pub fn get_attribute(&self, key: &str) -> Result<&str> {
        self.attributes.get(key)
    }

    /// Removes an attribute and any operator attached to it.
    ///
    /// Returns true if the attribute was present.
    pub fn delete_attribute(&mut self, key: &str) -> bool {
        self.operators.remove(key);
        self.attributes.delete(key)
    }

    /// Returns the set of attribute keys.
    #[must_use]
    pub fn keys(&self) -> BTreeSet<&str> {
        self.attributes.keys()
    }

    /// Returns an owned snapshot of all attributes.
    #[must_use]
    pub fn as_mapping(&self) -> BTreeMap<String, String> {
        self.attributes.as_mapping()
    }

    /// Returns the attributes.
    #[must_use]
    pub const fn attributes(&self) -> &AttributeMap {
        &self.attributes
    }

    /// Returns the operator attached to `key`, if this is a query with that key.
    #[must_use]
    pub fn operator(&self, key: &str) -> Option<QueryOperator> {
        self.operators.get(key).copied()
    }

    /// Returns the conditions of a query, one per attribute.
    ///
    /// Attributes without an operator compare for equality.
    #[must_use]
    pub fn query_terms(&self) -> Vec<QueryTerm> {
        self.attributes
            .iter()
            .map(|(key, value)| {
                let operator = self.operator(key).unwrap_or_default();
                QueryTerm::new(key, value, operator)
            })
            .collect()
    }

    /// Fails unless this message has the given kind.
    pub(crate) fn require(&self, expected: MessageKind) -> Result<()> {
        if self.kind == expected {
            Ok(())
        } else {
            Err(AslError::WrongKind {
                expected: expected.as_str(),
                actual: self.kind.as_str(),
            })
        }
    }
}
