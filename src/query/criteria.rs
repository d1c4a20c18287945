//! Composable predicates against index fields.
//!
//! A [`Criteria`] is an ordered list of links. Each link joins a node to
//! whatever precedes it with AND or OR. A node is either a single field with
//! its accumulated predicates, or a nested group rendered in parentheses.
//! The last link is the cursor: predicate calls always land on it.
//!
//! ```
//! use solr_osm::query::{Criteria, QueryParser};
//!
//! let criteria = Criteria::where_field("name").unwrap()
//!     .starts_with("sol").unwrap()
//!     .and("popularity").unwrap()
//!     .greater_than(5);
//!
//! assert_eq!(
//!     QueryParser::compile(&criteria),
//!     "name:sol* AND popularity:{5 TO *]"
//! );
//! ```

use crate::{
    error::Error,
    query::{
        field::Field,
        value::{QueryValue, ToQueryValue},
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Conjunction {
    #[default]
    And,
    Or,
}

impl Conjunction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Conjunction::And => "AND",
            Conjunction::Or => "OR",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Is(QueryValue),
    IsNot(QueryValue),
    StartsWith(String),
    EndsWith(String),
    Contains(String),
    Fuzzy {
        term: String,
        distance: Option<f32>,
    },
    /// Passed through to the query string untouched.
    Expression(String),
    /// `QueryValue::Null` marks an open bound.
    Between {
        lower: QueryValue,
        upper: QueryValue,
        include_lower: bool,
        include_upper: bool,
    },
    IsNull,
    IsNotNull,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldCriteria {
    pub field: Field,
    pub predicates: Vec<Predicate>,
    pub boost: Option<f32>,
}

impl FieldCriteria {
    fn new(field: Field) -> Self {
        Self {
            field,
            predicates: Vec::new(),
            boost: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Field(FieldCriteria),
    Group(Criteria),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    pub conjunction: Conjunction,
    pub node: Node,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Criteria {
    links: Vec<Link>,
}

impl Criteria {
    pub fn new(field: Field) -> Self {
        Self {
            links: vec![Link {
                conjunction: Conjunction::And,
                node: Node::Field(FieldCriteria::new(field)),
            }],
        }
    }

    /// Starts a chain on the named field. Empty names are rejected.
    pub fn where_field(name: &str) -> Result<Self, Error> {
        Ok(Self::new(Field::new(name)?))
    }

    /// `*:*`
    pub fn match_all() -> Self {
        Self::new(Field::wildcard()).expression("*:*")
    }

    /// Unqualified, verbatim query text.
    pub fn raw(query: impl Into<String>) -> Self {
        Self::new(Field::wildcard()).expression(query)
    }

    /// Wraps `inner` so it renders inside parentheses when chained.
    pub fn group(inner: Criteria) -> Self {
        Self {
            links: vec![Link {
                conjunction: Conjunction::And,
                node: Node::Group(inner),
            }],
        }
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    /// `true` when no node in the chain carries a predicate.
    pub fn is_empty(&self) -> bool {
        self.links.iter().all(|link| match &link.node {
            Node::Field(fc) => fc.predicates.is_empty(),
            Node::Group(group) => group.is_empty(),
        })
    }

    /// The node predicate calls currently apply to.
    pub fn current(&self) -> Option<&FieldCriteria> {
        match &self.links.last()?.node {
            Node::Field(fc) => Some(fc),
            Node::Group(group) => group.current(),
        }
    }

    fn current_mut(&mut self) -> Option<&mut FieldCriteria> {
        match &mut self.links.last_mut()?.node {
            Node::Field(fc) => Some(fc),
            Node::Group(group) => group.current_mut(),
        }
    }

    fn push_predicate(self, predicate: Predicate) -> Self {
        let mut consumed_self = self;
        if let Some(current) = consumed_self.current_mut() {
            current.predicates.push(predicate);
        }
        consumed_self
    }

    // ==================== Chaining ====================

    pub fn and(self, name: &str) -> Result<Self, Error> {
        Ok(self.and_field(Field::new(name)?))
    }

    pub fn or(self, name: &str) -> Result<Self, Error> {
        Ok(self.or_field(Field::new(name)?))
    }

    pub fn and_field(self, field: Field) -> Self {
        self.link(Conjunction::And, Node::Field(FieldCriteria::new(field)))
    }

    pub fn or_field(self, field: Field) -> Self {
        self.link(Conjunction::Or, Node::Field(FieldCriteria::new(field)))
    }

    /// Appends `other` with AND. A multi-node `other` becomes a group.
    pub fn and_criteria(self, other: Criteria) -> Self {
        self.connect(Conjunction::And, other)
    }

    /// Appends `other` with OR. A multi-node `other` becomes a group.
    pub fn or_criteria(self, other: Criteria) -> Self {
        self.connect(Conjunction::Or, other)
    }

    fn connect(self, conjunction: Conjunction, other: Criteria) -> Self {
        let mut other = other;
        let node = if other.links.len() == 1 {
            match other.links.pop() {
                Some(link) => link.node,
                None => return self,
            }
        } else {
            Node::Group(other)
        };
        self.link(conjunction, node)
    }

    fn link(self, conjunction: Conjunction, node: Node) -> Self {
        let mut consumed_self = self;
        consumed_self.links.push(Link { conjunction, node });
        consumed_self
    }

    // ==================== Predicates ====================

    /// Equality. `null` becomes [`Criteria::is_null`], a list becomes one term per item.
    pub fn is(self, value: impl ToQueryValue) -> Self {
        match value.to_query_value() {
            QueryValue::Null => self.push_predicate(Predicate::IsNull),
            QueryValue::List(values) => values
                .into_iter()
                .fold(self, |acc, v| acc.push_predicate(Predicate::Is(v))),
            v => self.push_predicate(Predicate::Is(v)),
        }
    }

    pub fn is_not(self, value: impl ToQueryValue) -> Self {
        match value.to_query_value() {
            QueryValue::Null => self.push_predicate(Predicate::IsNotNull),
            QueryValue::List(values) => values
                .into_iter()
                .fold(self, |acc, v| acc.push_predicate(Predicate::IsNot(v))),
            v => self.push_predicate(Predicate::IsNot(v)),
        }
    }

    pub fn in_values<I, V>(self, values: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = V>,
        V: ToQueryValue,
    {
        let values: Vec<QueryValue> = values
            .into_iter()
            .flat_map(|v| v.to_query_value().into_items())
            .collect();
        if values.is_empty() {
            return Err(Error::invalid_usage("'in' requires at least one value"));
        }
        Ok(values
            .into_iter()
            .fold(self, |acc, v| acc.push_predicate(Predicate::Is(v))))
    }

    pub fn not_in<I, V>(self, values: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = V>,
        V: ToQueryValue,
    {
        let values: Vec<QueryValue> = values
            .into_iter()
            .flat_map(|v| v.to_query_value().into_items())
            .collect();
        if values.is_empty() {
            return Err(Error::invalid_usage("'not in' requires at least one value"));
        }
        Ok(values
            .into_iter()
            .fold(self, |acc, v| acc.push_predicate(Predicate::IsNot(v))))
    }

    pub fn starts_with(self, prefix: impl ToQueryValue) -> Result<Self, Error> {
        let prefix = single_token(prefix, |t| format!("{}*", t))?;
        Ok(self.push_predicate(Predicate::StartsWith(prefix)))
    }

    pub fn ends_with(self, suffix: impl ToQueryValue) -> Result<Self, Error> {
        let suffix = single_token(suffix, |t| format!("*{}", t))?;
        Ok(self.push_predicate(Predicate::EndsWith(suffix)))
    }

    pub fn contains(self, fragment: impl ToQueryValue) -> Result<Self, Error> {
        let fragment = single_token(fragment, |t| format!("*{}*", t))?;
        Ok(self.push_predicate(Predicate::Contains(fragment)))
    }

    pub fn fuzzy(self, term: impl ToQueryValue) -> Result<Self, Error> {
        let term = single_token(term, |t| format!("{}~", t))?;
        Ok(self.push_predicate(Predicate::Fuzzy {
            term,
            distance: None,
        }))
    }

    /// Fuzzy match with a Levenshtein distance in `0.0..=1.0`.
    pub fn fuzzy_with_distance(
        self,
        term: impl ToQueryValue,
        distance: f32,
    ) -> Result<Self, Error> {
        if !(0.0..=1.0).contains(&distance) {
            return Err(Error::invalid_usage(format!(
                "levenshtein distance {} must be within 0.0 and 1.0",
                distance
            )));
        }
        let term = single_token(term, |t| format!("{}~{}", t, distance))?;
        Ok(self.push_predicate(Predicate::Fuzzy {
            term,
            distance: Some(distance),
        }))
    }

    pub fn expression(self, raw: impl Into<String>) -> Self {
        self.push_predicate(Predicate::Expression(raw.into()))
    }

    /// Inclusive range. A `null` bound is open.
    pub fn between(self, lower: impl ToQueryValue, upper: impl ToQueryValue) -> Self {
        self.between_with(lower, upper, true, true)
    }

    pub fn between_with(
        self,
        lower: impl ToQueryValue,
        upper: impl ToQueryValue,
        include_lower: bool,
        include_upper: bool,
    ) -> Self {
        self.push_predicate(Predicate::Between {
            lower: lower.to_query_value(),
            upper: upper.to_query_value(),
            include_lower,
            include_upper,
        })
    }

    pub fn greater_than(self, value: impl ToQueryValue) -> Self {
        self.between_with(value, QueryValue::Null, false, true)
    }

    pub fn greater_than_equal(self, value: impl ToQueryValue) -> Self {
        self.between_with(value, QueryValue::Null, true, true)
    }

    pub fn less_than(self, value: impl ToQueryValue) -> Self {
        self.between_with(QueryValue::Null, value, true, false)
    }

    pub fn less_than_equal(self, value: impl ToQueryValue) -> Self {
        self.between_with(QueryValue::Null, value, true, true)
    }

    pub fn is_null(self) -> Self {
        self.push_predicate(Predicate::IsNull)
    }

    pub fn is_not_null(self) -> Self {
        self.push_predicate(Predicate::IsNotNull)
    }

    pub fn boost(self, boost: f32) -> Self {
        let mut consumed_self = self;
        if let Some(current) = consumed_self.current_mut() {
            current.boost = Some(boost);
        }
        consumed_self
    }
}

/// Wildcard and fuzzy fragments must stay a single token.
fn single_token(
    value: impl ToQueryValue,
    render: impl Fn(&str) -> String,
) -> Result<String, Error> {
    let value = value.to_query_value().to_string();
    let trimmed = value.trim();
    if trimmed.contains(char::is_whitespace) {
        return Err(Error::invalid_usage(format!(
            "cannot construct query '{}', use expression or multiple clauses instead",
            render(trimmed)
        )));
    }
    Ok(trimmed.to_string())
}
