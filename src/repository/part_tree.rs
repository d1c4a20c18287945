//! Grammar of derived query method names.
//!
//! `findTop3DistinctByNameAndPriceGreaterThanOrPopularityOrderByPriceDesc`
//! reads as: subject `find`, at most 3 results, distinct, two OR-clauses
//! (`Name` AND `PriceGreaterThan`, then `Popularity`), sorted by `Price`
//! descending.

use std::fmt::{self, Display};

use crate::{error::Error, query::Direction};

const SUBJECT_PREFIXES: &[(&str, Subject)] = &[
    ("find", Subject::Find),
    ("read", Subject::Find),
    ("get", Subject::Find),
    ("query", Subject::Find),
    ("search", Subject::Find),
    ("stream", Subject::Find),
    ("count", Subject::Count),
    ("exists", Subject::Exists),
    ("delete", Subject::Delete),
    ("remove", Subject::Delete),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subject {
    Find,
    Count,
    Exists,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    SimpleProperty,
    Negating,
    True,
    False,
    Like,
    NotLike,
    StartingWith,
    EndingWith,
    Containing,
    NotContaining,
    Regex,
    Near,
    Within,
    GreaterThan,
    GreaterThanEqual,
    LessThan,
    LessThanEqual,
    Before,
    After,
    Between,
    In,
    NotIn,
    IsNull,
    IsNotNull,
    Exists,
    IsEmpty,
    IsNotEmpty,
}

// (suffix, keyword); the longest matching suffix wins
const KEYWORD_SUFFIXES: &[(&str, Keyword)] = &[
    ("IsNotNull", Keyword::IsNotNull),
    ("NotNull", Keyword::IsNotNull),
    ("IsNull", Keyword::IsNull),
    ("Null", Keyword::IsNull),
    ("IsLessThanEqual", Keyword::LessThanEqual),
    ("LessThanEqual", Keyword::LessThanEqual),
    ("IsLessThan", Keyword::LessThan),
    ("LessThan", Keyword::LessThan),
    ("IsGreaterThanEqual", Keyword::GreaterThanEqual),
    ("GreaterThanEqual", Keyword::GreaterThanEqual),
    ("IsGreaterThan", Keyword::GreaterThan),
    ("GreaterThan", Keyword::GreaterThan),
    ("IsBefore", Keyword::Before),
    ("Before", Keyword::Before),
    ("IsAfter", Keyword::After),
    ("After", Keyword::After),
    ("IsBetween", Keyword::Between),
    ("Between", Keyword::Between),
    ("IsNotLike", Keyword::NotLike),
    ("NotLike", Keyword::NotLike),
    ("IsLike", Keyword::Like),
    ("Like", Keyword::Like),
    ("IsStartingWith", Keyword::StartingWith),
    ("StartingWith", Keyword::StartingWith),
    ("StartsWith", Keyword::StartingWith),
    ("IsEndingWith", Keyword::EndingWith),
    ("EndingWith", Keyword::EndingWith),
    ("EndsWith", Keyword::EndingWith),
    ("IsNotContaining", Keyword::NotContaining),
    ("NotContaining", Keyword::NotContaining),
    ("NotContains", Keyword::NotContaining),
    ("IsContaining", Keyword::Containing),
    ("Containing", Keyword::Containing),
    ("Contains", Keyword::Containing),
    ("IsNotIn", Keyword::NotIn),
    ("NotIn", Keyword::NotIn),
    ("IsIn", Keyword::In),
    ("In", Keyword::In),
    ("IsNear", Keyword::Near),
    ("Near", Keyword::Near),
    ("IsWithin", Keyword::Within),
    ("Within", Keyword::Within),
    ("MatchesRegex", Keyword::Regex),
    ("Matches", Keyword::Regex),
    ("Regex", Keyword::Regex),
    ("Exists", Keyword::Exists),
    ("IsTrue", Keyword::True),
    ("True", Keyword::True),
    ("IsFalse", Keyword::False),
    ("False", Keyword::False),
    ("IsNotEmpty", Keyword::IsNotEmpty),
    ("NotEmpty", Keyword::IsNotEmpty),
    ("IsEmpty", Keyword::IsEmpty),
    ("Empty", Keyword::IsEmpty),
    ("IsNot", Keyword::Negating),
    ("Not", Keyword::Negating),
    ("Is", Keyword::SimpleProperty),
    ("Equals", Keyword::SimpleProperty),
];

impl Keyword {
    /// Number of method arguments the keyword consumes.
    pub fn parameter_count(&self) -> usize {
        match self {
            Keyword::True
            | Keyword::False
            | Keyword::IsNull
            | Keyword::IsNotNull
            | Keyword::Exists
            | Keyword::IsEmpty
            | Keyword::IsNotEmpty => 0,
            Keyword::Between | Keyword::Within => 2,
            _ => 1,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Keyword::SimpleProperty => "SIMPLE_PROPERTY",
            Keyword::Negating => "NEGATING_SIMPLE_PROPERTY",
            Keyword::True => "TRUE",
            Keyword::False => "FALSE",
            Keyword::Like => "LIKE",
            Keyword::NotLike => "NOT_LIKE",
            Keyword::StartingWith => "STARTING_WITH",
            Keyword::EndingWith => "ENDING_WITH",
            Keyword::Containing => "CONTAINING",
            Keyword::NotContaining => "NOT_CONTAINING",
            Keyword::Regex => "REGEX",
            Keyword::Near => "NEAR",
            Keyword::Within => "WITHIN",
            Keyword::GreaterThan => "GREATER_THAN",
            Keyword::GreaterThanEqual => "GREATER_THAN_EQUAL",
            Keyword::LessThan => "LESS_THAN",
            Keyword::LessThanEqual => "LESS_THAN_EQUAL",
            Keyword::Before => "BEFORE",
            Keyword::After => "AFTER",
            Keyword::Between => "BETWEEN",
            Keyword::In => "IN",
            Keyword::NotIn => "NOT_IN",
            Keyword::IsNull => "IS_NULL",
            Keyword::IsNotNull => "IS_NOT_NULL",
            Keyword::Exists => "EXISTS",
            Keyword::IsEmpty => "IS_EMPTY",
            Keyword::IsNotEmpty => "IS_NOT_EMPTY",
        }
    }

    /// Splits `PriceGreaterThan` into (`Price`, `GreaterThan`).
    fn detect(raw: &str) -> (&str, Keyword) {
        KEYWORD_SUFFIXES
            .iter()
            .filter(|(suffix, _)| raw.len() > suffix.len() && raw.ends_with(suffix))
            .max_by_key(|(suffix, _)| suffix.len())
            .map(|(suffix, keyword)| (&raw[..raw.len() - suffix.len()], *keyword))
            .unwrap_or((raw, Keyword::SimpleProperty))
    }
}

impl Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One predicate of a method name: a property reference and its keyword.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    raw: String,
    source: String,
    keyword: Keyword,
}

impl Part {
    fn parse(raw: &str) -> Result<Self, Error> {
        if raw.is_empty() {
            return Err(Error::invalid_usage("empty predicate part in method name"));
        }
        let (source, keyword) = Keyword::detect(raw);
        Ok(Self {
            raw: raw.to_string(),
            source: source.to_string(),
            keyword,
        })
    }

    /// The text as written, keyword included.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The property reference, e.g. `Price`.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn keyword(&self) -> Keyword {
        self.keyword
    }
}

/// AND-joined parts between two `Or`s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrPart {
    parts: Vec<Part>,
}

impl OrPart {
    pub fn parts(&self) -> &[Part] {
        &self.parts
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderPart {
    pub source: String,
    pub direction: Direction,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartTree {
    method_name: String,
    subject: Subject,
    distinct: bool,
    max_results: Option<u32>,
    clauses: Vec<OrPart>,
    orders: Vec<OrderPart>,
}

impl PartTree {
    pub fn parse(method_name: &str) -> Result<Self, Error> {
        let (subject, rest) = SUBJECT_PREFIXES
            .iter()
            .find_map(|(prefix, subject)| {
                method_name
                    .strip_prefix(prefix)
                    .filter(|rest| rest.is_empty() || starts_upper(rest))
                    .map(|rest| (*subject, rest))
            })
            .ok_or_else(|| {
                Error::invalid_usage(format!("'{}' is not a query method name", method_name))
            })?;

        let (head, order_clause) = match rest.find("OrderBy") {
            Some(pos) => (&rest[..pos], Some(&rest[pos + "OrderBy".len()..])),
            None => (rest, None),
        };

        let (modifiers, predicate) = match head.find("By") {
            Some(pos) => (&head[..pos], &head[pos + 2..]),
            None => (head, ""),
        };

        let clauses = if predicate.is_empty() {
            Vec::new()
        } else {
            split_keyword(predicate, "Or")
                .into_iter()
                .map(|clause| {
                    let parts = split_keyword(clause, "And")
                        .into_iter()
                        .map(Part::parse)
                        .collect::<Result<Vec<_>, _>>()?;
                    Ok(OrPart { parts })
                })
                .collect::<Result<Vec<_>, Error>>()?
        };

        let orders = match order_clause {
            Some(clause) => parse_orders(method_name, clause)?,
            None => Vec::new(),
        };

        Ok(Self {
            method_name: method_name.to_string(),
            subject,
            distinct: modifiers.contains("Distinct"),
            max_results: parse_limit(modifiers)?,
            clauses,
            orders,
        })
    }

    pub fn method_name(&self) -> &str {
        &self.method_name
    }

    pub fn subject(&self) -> Subject {
        self.subject
    }

    pub fn is_distinct(&self) -> bool {
        self.distinct
    }

    pub fn max_results(&self) -> Option<u32> {
        self.max_results
    }

    pub fn clauses(&self) -> &[OrPart] {
        &self.clauses
    }

    pub fn orders(&self) -> &[OrderPart] {
        &self.orders
    }

    pub fn parts(&self) -> impl Iterator<Item = &Part> {
        self.clauses.iter().flat_map(|c| c.parts.iter())
    }
}

fn starts_upper(s: &str) -> bool {
    s.chars().next().is_some_and(|c| c.is_uppercase())
}

/// Splits on `keyword` only where the next character starts a new word.
fn split_keyword<'a>(source: &'a str, keyword: &str) -> Vec<&'a str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut search = 0;
    while let Some(found) = source[search..].find(keyword) {
        let at = search + found;
        let after = at + keyword.len();
        if starts_upper(&source[after..]) {
            pieces.push(&source[start..at]);
            start = after;
        }
        search = after;
    }
    pieces.push(&source[start..]);
    pieces
}

fn parse_limit(modifiers: &str) -> Result<Option<u32>, Error> {
    for marker in ["First", "Top"] {
        let Some(pos) = modifiers.find(marker) else {
            continue;
        };
        let digits: String = modifiers[pos + marker.len()..]
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        if digits.is_empty() {
            return Ok(Some(1));
        }
        let limit: u32 = digits
            .parse()
            .map_err(|_| Error::invalid_usage(format!("invalid result limit '{}'", digits)))?;
        if limit == 0 {
            return Err(Error::invalid_usage("result limit must be positive"));
        }
        return Ok(Some(limit));
    }
    Ok(None)
}

fn parse_orders(method_name: &str, clause: &str) -> Result<Vec<OrderPart>, Error> {
    let mut orders = Vec::new();
    let mut start = 0;
    let mut pos = 0;

    while pos < clause.len() {
        let rest = &clause[pos..];
        let direction = if rest.starts_with("Asc") && ends_word(&rest[3..]) {
            Some((Direction::Asc, 3))
        } else if rest.starts_with("Desc") && ends_word(&rest[4..]) {
            Some((Direction::Desc, 4))
        } else {
            None
        };

        match direction {
            Some((direction, len)) if pos > start => {
                orders.push(OrderPart {
                    source: clause[start..pos].to_string(),
                    direction,
                });
                pos += len;
                start = pos;
            }
            _ => {
                pos += rest.chars().next().map(char::len_utf8).unwrap_or(1);
            }
        }
    }

    if start < clause.len() {
        orders.push(OrderPart {
            source: clause[start..].to_string(),
            direction: Direction::Asc,
        });
    }

    if orders.is_empty() {
        return Err(Error::invalid_usage(format!(
            "'{}' has an empty OrderBy clause",
            method_name
        )));
    }
    Ok(orders)
}

fn ends_word(rest: &str) -> bool {
    rest.is_empty() || starts_upper(rest)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keywords(tree: &PartTree) -> Vec<Vec<(String, Keyword)>> {
        tree.clauses()
            .iter()
            .map(|c| {
                c.parts()
                    .iter()
                    .map(|p| (p.source().to_string(), p.keyword()))
                    .collect()
            })
            .collect()
    }

    #[test]
    fn simple_and_chain() {
        let tree = PartTree::parse("findByPopularityAndPrice").unwrap();
        assert_eq!(tree.subject(), Subject::Find);
        assert_eq!(
            keywords(&tree),
            vec![vec![
                ("Popularity".to_string(), Keyword::SimpleProperty),
                ("Price".to_string(), Keyword::SimpleProperty),
            ]]
        );
    }

    #[test]
    fn or_clauses_group_their_ands() {
        let tree = PartTree::parse("findByNameAndPriceGreaterThanOrAvailableTrue").unwrap();
        assert_eq!(
            keywords(&tree),
            vec![
                vec![
                    ("Name".to_string(), Keyword::SimpleProperty),
                    ("Price".to_string(), Keyword::GreaterThan),
                ],
                vec![("Available".to_string(), Keyword::True)],
            ]
        );
    }

    #[test]
    fn lowercase_or_is_not_a_separator() {
        let tree = PartTree::parse("findByColorAndOrderNumber").unwrap();
        assert_eq!(
            keywords(&tree),
            vec![vec![
                ("Color".to_string(), Keyword::SimpleProperty),
                ("OrderNumber".to_string(), Keyword::SimpleProperty),
            ]]
        );
    }

    #[test]
    fn longest_keyword_wins() {
        let parts = |name: &str| keywords(&PartTree::parse(name).unwrap())[0][0].clone();
        assert_eq!(parts("findByPriceLessThanEqual").1, Keyword::LessThanEqual);
        assert_eq!(parts("findByNameNotLike").1, Keyword::NotLike);
        assert_eq!(parts("findByNameIsNot").1, Keyword::Negating);
        assert_eq!(parts("findByNameNotIn").1, Keyword::NotIn);
        assert_eq!(parts("findByCategoryIsNotNull"), ("Category".to_string(), Keyword::IsNotNull));
        assert_eq!(parts("findByNameRegex").1, Keyword::Regex);
        assert_eq!(parts("findByLocationNear").1, Keyword::Near);
    }

    #[test]
    fn subjects_and_limits() {
        let tree = PartTree::parse("findTop5DistinctByName").unwrap();
        assert_eq!(tree.max_results(), Some(5));
        assert!(tree.is_distinct());

        assert_eq!(PartTree::parse("findFirstByName").unwrap().max_results(), Some(1));
        assert_eq!(PartTree::parse("countByName").unwrap().subject(), Subject::Count);
        assert_eq!(PartTree::parse("existsByName").unwrap().subject(), Subject::Exists);
        assert_eq!(PartTree::parse("removeByName").unwrap().subject(), Subject::Delete);
        assert!(PartTree::parse("findAll").unwrap().clauses().is_empty());
        assert!(PartTree::parse("fetchByName").unwrap_err().is_invalid_usage());
        assert!(PartTree::parse("finder").unwrap_err().is_invalid_usage());
    }

    #[test]
    fn order_by_clause() {
        let tree = PartTree::parse("findByNameOrderByPriceDescPopularity").unwrap();
        assert_eq!(tree.clauses().len(), 1);
        assert_eq!(
            tree.orders(),
            &[
                OrderPart {
                    source: "Price".to_string(),
                    direction: Direction::Desc
                },
                OrderPart {
                    source: "Popularity".to_string(),
                    direction: Direction::Asc
                },
            ]
        );

        let all = PartTree::parse("findAllOrderByNameAsc").unwrap();
        assert!(all.clauses().is_empty());
        assert_eq!(all.orders()[0].source, "Name");
        assert!(PartTree::parse("findByNameOrderBy").is_err());
    }

    #[test]
    fn parameter_counts() {
        assert_eq!(Keyword::Between.parameter_count(), 2);
        assert_eq!(Keyword::True.parameter_count(), 0);
        assert_eq!(Keyword::Containing.parameter_count(), 1);
        assert_eq!(Keyword::NotLike.to_string(), "NOT_LIKE");
    }
}
