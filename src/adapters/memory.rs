//! In-process [`SolrClient`] for tests and local development.
//!
//! Writes are staged until `commit`, as on a real core. Queries are evaluated
//! against committed documents with a small evaluator covering the syntax the
//! query compiler emits: `field:term`, quoted phrases, `*` wildcards, fuzzy
//! `~`, ranges, `-` negation, per-field groups, parentheses and AND/OR.

use std::{
    cmp::Ordering,
    collections::{BTreeMap, HashMap, VecDeque},
};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::{
    adapters::{DocumentRecord, SolrClient, SolrRequest, SolrResponse},
    error::BoxError,
};

const DEFAULT_ROWS: u32 = 10;

enum Staged {
    Add(DocumentRecord),
    DeleteById(String),
    DeleteByQuery(Expr),
}

#[derive(Default)]
struct State {
    committed: BTreeMap<String, DocumentRecord>,
    staged: Vec<Staged>,
    requests: Vec<SolrRequest>,
    scripted: VecDeque<Result<SolrResponse, String>>,
}

pub struct MemoryClient {
    unique_key: String,
    state: Mutex<State>,
}

impl Default for MemoryClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryClient {
    pub fn new() -> Self {
        Self::with_unique_key("id")
    }

    pub fn with_unique_key(field: impl Into<String>) -> Self {
        Self {
            unique_key: field.into(),
            state: Mutex::new(State::default()),
        }
    }

    /// Queues a canned response; queued responses are served before evaluation.
    pub async fn push_response(&self, response: SolrResponse) {
        self.state.lock().await.scripted.push_back(Ok(response));
    }

    /// Queues a failure for the next query.
    pub async fn push_failure(&self, message: impl Into<String>) {
        self.state.lock().await.scripted.push_back(Err(message.into()));
    }

    /// Every query request received so far.
    pub async fn requests(&self) -> Vec<SolrRequest> {
        self.state.lock().await.requests.clone()
    }

    pub async fn last_request(&self) -> Option<SolrRequest> {
        self.state.lock().await.requests.last().cloned()
    }

    pub async fn committed_count(&self) -> usize {
        self.state.lock().await.committed.len()
    }

    pub async fn pending_count(&self) -> usize {
        self.state.lock().await.staged.len()
    }
}

#[async_trait]
impl SolrClient for MemoryClient {
    async fn query(&self, request: SolrRequest) -> Result<SolrResponse, BoxError> {
        let mut state = self.state.lock().await;
        state.requests.push(request.clone());

        if let Some(scripted) = state.scripted.pop_front() {
            return scripted.map_err(BoxError::from);
        }

        let q = parse(&request.q)?;
        let filters = request
            .fq
            .iter()
            .map(|fq| parse(fq))
            .collect::<Result<Vec<_>, _>>()?;

        let mut hits: Vec<&DocumentRecord> = state
            .committed
            .values()
            .filter(|doc| q.matches(doc) && filters.iter().all(|f| f.matches(doc)))
            .collect();

        sort_hits(&mut hits, &request.sort);

        let mut facet_fields = BTreeMap::new();
        if let Some(facet) = &request.facet {
            for field in &facet.fields {
                facet_fields.insert(
                    field.clone(),
                    count_facet(&hits, field, facet.limit, facet.min_count),
                );
            }
        }

        let num_found = hits.len() as u64;
        let start = request.start.unwrap_or(0) as usize;
        let rows = request.rows.unwrap_or(DEFAULT_ROWS) as usize;
        let documents = hits
            .into_iter()
            .skip(start)
            .take(rows)
            .map(|doc| project(doc, &request.fl))
            .collect();

        Ok(SolrResponse {
            num_found,
            documents,
            facet_fields,
        })
    }

    async fn add(&self, documents: Vec<DocumentRecord>) -> Result<(), BoxError> {
        let mut state = self.state.lock().await;
        for doc in documents {
            if doc.value_string(&self.unique_key).is_none() {
                return Err(format!("document is missing unique key '{}'", self.unique_key).into());
            }
            state.staged.push(Staged::Add(doc));
        }
        Ok(())
    }

    async fn delete_by_id(&self, ids: Vec<String>) -> Result<(), BoxError> {
        let mut state = self.state.lock().await;
        state.staged.extend(ids.into_iter().map(Staged::DeleteById));
        Ok(())
    }

    async fn delete_by_query(&self, query: String) -> Result<(), BoxError> {
        let expr = parse(&query)?;
        self.state.lock().await.staged.push(Staged::DeleteByQuery(expr));
        Ok(())
    }

    async fn commit(&self) -> Result<(), BoxError> {
        let mut state = self.state.lock().await;
        let staged = std::mem::take(&mut state.staged);
        for op in staged {
            match op {
                Staged::Add(doc) => {
                    if let Some(id) = doc.value_string(&self.unique_key) {
                        state.committed.insert(id, doc);
                    }
                }
                Staged::DeleteById(id) => {
                    state.committed.remove(&id);
                }
                Staged::DeleteByQuery(expr) => {
                    state.committed.retain(|_, doc| !expr.matches(doc));
                }
            }
        }
        Ok(())
    }

    async fn rollback(&self) -> Result<(), BoxError> {
        self.state.lock().await.staged.clear();
        Ok(())
    }
}

fn project(doc: &DocumentRecord, fl: &[String]) -> DocumentRecord {
    if fl.is_empty() || fl.iter().any(|f| f == "*") {
        return doc.clone();
    }
    let mut projected = DocumentRecord::new();
    for field in fl {
        if let Some(value) = doc.get(field) {
            projected.insert(field.clone(), value.clone());
        }
    }
    projected
}

fn sort_hits(hits: &mut [&DocumentRecord], sort: &[String]) {
    let orders: Vec<(&str, bool)> = sort
        .iter()
        .filter_map(|s| {
            let mut parts = s.split_whitespace();
            let field = parts.next()?;
            let descending = matches!(parts.next(), Some(dir) if dir.eq_ignore_ascii_case("desc"));
            Some((field, descending))
        })
        .collect();
    if orders.is_empty() {
        return;
    }

    hits.sort_by(|a, b| {
        for (field, descending) in &orders {
            let ordering = match (first_value(a, field), first_value(b, field)) {
                (Some(x), Some(y)) => {
                    let ord = compare_values(&x, &y);
                    if *descending { ord.reverse() } else { ord }
                }
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
}

fn count_facet(
    hits: &[&DocumentRecord],
    field: &str,
    limit: u32,
    min_count: u32,
) -> Vec<(String, u64)> {
    let mut counts: HashMap<String, u64> = HashMap::new();
    for doc in hits {
        for value in values_of(doc, field) {
            *counts.entry(value).or_default() += 1;
        }
    }
    let mut counts: Vec<(String, u64)> = counts
        .into_iter()
        .filter(|(_, count)| *count >= min_count as u64)
        .collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    counts.truncate(limit as usize);
    counts
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn values_of(doc: &DocumentRecord, field: &str) -> Vec<String> {
    match doc.get(field) {
        Some(Value::Array(items)) => items.iter().filter_map(scalar_string).collect(),
        Some(value) => scalar_string(value).into_iter().collect(),
        None => Vec::new(),
    }
}

fn first_value(doc: &DocumentRecord, field: &str) -> Option<String> {
    values_of(doc, field).into_iter().next()
}

fn compare_values(a: &str, b: &str) -> Ordering {
    match (a.parse::<f64>(), b.parse::<f64>()) {
        (Ok(x), Ok(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        _ => a.cmp(b),
    }
}

// ==================== Evaluator ====================

#[derive(Debug, Clone, PartialEq)]
enum Test {
    Exact(String),
    Wildcard(String),
    Fuzzy(String),
    Range {
        lower: Option<String>,
        upper: Option<String>,
        include_lower: bool,
        include_upper: bool,
    },
    /// `field:(a b -c)`: any positive term, none of the negated ones. A group
    /// with no positive term matches nothing, as in Lucene.
    Group(Vec<(bool, Test)>),
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    All,
    Not(Box<Expr>),
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Field { field: String, test: Test },
}

impl Expr {
    fn matches(&self, doc: &DocumentRecord) -> bool {
        match self {
            Expr::All => true,
            Expr::Not(inner) => !inner.matches(doc),
            Expr::And(items) => items.iter().all(|e| e.matches(doc)),
            Expr::Or(items) => items.iter().any(|e| e.matches(doc)),
            Expr::Field { field, test } => test.matches(&values_of(doc, field)),
        }
    }
}

impl Test {
    fn matches(&self, values: &[String]) -> bool {
        match self {
            Test::Group(items) => {
                let positives: Vec<&Test> =
                    items.iter().filter(|(neg, _)| !neg).map(|(_, t)| t).collect();
                let negated = items
                    .iter()
                    .filter(|(neg, _)| *neg)
                    .any(|(_, t)| t.matches(values));
                !negated && positives.iter().any(|t| t.matches(values))
            }
            Test::Range {
                lower,
                upper,
                include_lower,
                include_upper,
            } => values.iter().any(|v| {
                let above = match lower {
                    None => true,
                    Some(lo) => match compare_values(v, lo) {
                        Ordering::Greater => true,
                        Ordering::Equal => *include_lower,
                        Ordering::Less => false,
                    },
                };
                let below = match upper {
                    None => true,
                    Some(hi) => match compare_values(v, hi) {
                        Ordering::Less => true,
                        Ordering::Equal => *include_upper,
                        Ordering::Greater => false,
                    },
                };
                above && below
            }),
            Test::Exact(term) => values.iter().any(|v| {
                v.eq_ignore_ascii_case(term)
                    || matches!((v.parse::<f64>(), term.parse::<f64>()), (Ok(a), Ok(b)) if a == b)
            }),
            Test::Wildcard(pattern) => values
                .iter()
                .any(|v| glob(&pattern.to_lowercase(), &v.to_lowercase())),
            Test::Fuzzy(term) => values
                .iter()
                .any(|v| levenshtein(&v.to_lowercase(), &term.to_lowercase()) <= 2),
        }
    }
}

fn glob(pattern: &str, value: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();
    if parts.len() == 1 {
        return pattern == value;
    }
    let mut rest = value;
    for (i, part) in parts.iter().enumerate() {
        if part.is_empty() {
            continue;
        }
        if i == 0 {
            match rest.strip_prefix(part) {
                Some(r) => rest = r,
                None => return false,
            }
        } else if i == parts.len() - 1 {
            return rest.ends_with(part);
        } else {
            match rest.find(part) {
                Some(pos) => rest = &rest[pos + part.len()..],
                None => return false,
            }
        }
    }
    true
}

fn levenshtein(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    for (i, ca) in a.chars().enumerate() {
        let mut current = vec![i + 1];
        for (j, cb) in b.iter().enumerate() {
            let cost = if ca == *cb { 0 } else { 1 };
            current.push((prev[j] + cost).min(prev[j + 1] + 1).min(current[j] + 1));
        }
        prev = current;
    }
    prev[b.len()]
}

fn parse(input: &str) -> Result<Expr, BoxError> {
    let mut parser = Parser {
        chars: input.chars().collect(),
        pos: 0,
    };
    let expr = parser.parse_or()?;
    parser.skip_ws();
    if parser.pos < parser.chars.len() {
        return Err(format!(
            "unsupported query syntax near position {} in '{}'",
            parser.pos, input
        )
        .into());
    }
    Ok(expr)
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn keyword(&mut self, keyword: &str) -> bool {
        self.skip_ws();
        let end = self.pos + keyword.len();
        if end > self.chars.len() {
            return false;
        }
        let candidate: String = self.chars[self.pos..end].iter().collect();
        let delimited = self.chars.get(end).is_none_or(|c| c.is_whitespace());
        if candidate == keyword && delimited {
            self.pos = end;
            true
        } else {
            false
        }
    }

    fn parse_or(&mut self) -> Result<Expr, BoxError> {
        let mut items = vec![self.parse_and()?];
        while self.keyword("OR") {
            items.push(self.parse_and()?);
        }
        Ok(if items.len() == 1 { items.remove(0) } else { Expr::Or(items) })
    }

    fn parse_and(&mut self) -> Result<Expr, BoxError> {
        let mut items = vec![self.parse_unary()?];
        while self.keyword("AND") {
            items.push(self.parse_unary()?);
        }
        Ok(if items.len() == 1 { items.remove(0) } else { Expr::And(items) })
    }

    fn parse_unary(&mut self) -> Result<Expr, BoxError> {
        self.skip_ws();
        if self.peek() == Some('-') {
            self.pos += 1;
            return Ok(Expr::Not(Box::new(self.parse_primary()?)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, BoxError> {
        self.skip_ws();
        if self.peek() == Some('(') {
            self.pos += 1;
            let inner = self.parse_or()?;
            self.skip_ws();
            if self.peek() != Some(')') {
                return Err("unbalanced parentheses".into());
            }
            self.pos += 1;
            self.skip_boost();
            return Ok(inner);
        }

        let start = self.pos;
        let ends_term = |c: char| c.is_whitespace() || matches!(c, ':' | '(' | ')');
        while matches!(self.peek(), Some(c) if !ends_term(c)) {
            self.pos += 1;
        }
        let field: String = self.chars[start..self.pos].iter().collect();
        if field.is_empty() {
            return Err(format!("expected a field at position {}", start).into());
        }

        if self.peek() != Some(':') {
            if field == "*" {
                return Ok(Expr::All);
            }
            return Err(format!("unqualified term '{}' is not supported", field).into());
        }
        self.pos += 1;

        if field == "*" && self.peek() == Some('*') {
            self.pos += 1;
            return Ok(Expr::All);
        }

        let test = if self.peek() == Some('(') {
            self.pos += 1;
            let mut items = Vec::new();
            loop {
                self.skip_ws();
                match self.peek() {
                    Some(')') => {
                        self.pos += 1;
                        break;
                    }
                    None => return Err("unbalanced field group".into()),
                    _ => {}
                }
                let negated = self.peek() == Some('-');
                if negated {
                    self.pos += 1;
                }
                items.push((negated, self.parse_value()?));
            }
            self.skip_boost();
            Test::Group(items)
        } else {
            self.parse_value()?
        };

        Ok(Expr::Field { field, test })
    }

    fn parse_value(&mut self) -> Result<Test, BoxError> {
        let test = match self.peek() {
            Some('"') => {
                self.pos += 1;
                let mut phrase = String::new();
                loop {
                    match self.peek() {
                        Some('\\') => {
                            if let Some(next) = self.chars.get(self.pos + 1) {
                                phrase.push(*next);
                            }
                            self.pos += 2;
                        }
                        Some('"') => {
                            self.pos += 1;
                            break;
                        }
                        Some(c) => {
                            phrase.push(c);
                            self.pos += 1;
                        }
                        None => return Err("unterminated phrase".into()),
                    }
                }
                Test::Exact(phrase)
            }
            Some(open @ ('[' | '{')) => {
                self.pos += 1;
                let start = self.pos;
                while matches!(self.peek(), Some(c) if c != ']' && c != '}') {
                    self.pos += 1;
                }
                let close = self.peek().ok_or("unterminated range")?;
                let body: String = self.chars[start..self.pos].iter().collect();
                self.pos += 1;
                let (lower, upper) = body.split_once(" TO ").ok_or("range without TO")?;
                let bound = |raw: &str| {
                    let raw = raw.trim().trim_matches('"');
                    (raw != "*").then(|| raw.to_string())
                };
                Test::Range {
                    lower: bound(lower),
                    upper: bound(upper),
                    include_lower: open == '[',
                    include_upper: close == ']',
                }
            }
            _ => {
                let start = self.pos;
                while matches!(self.peek(), Some(c) if !c.is_whitespace() && c != ')' && c != '^') {
                    self.pos += 1;
                }
                let token: String = self.chars[start..self.pos].iter().collect();
                if token.is_empty() {
                    return Err(format!("expected a value at position {}", start).into());
                }
                if let Some((term, _)) = token.split_once('~') {
                    Test::Fuzzy(term.to_string())
                } else if token.contains('*') {
                    Test::Wildcard(token)
                } else {
                    Test::Exact(token)
                }
            }
        };
        self.skip_boost();
        Ok(test)
    }

    fn skip_boost(&mut self) {
        if self.peek() == Some('^') {
            self.pos += 1;
            while matches!(self.peek(), Some(c) if c.is_ascii_digit() || c == '.') {
                self.pos += 1;
            }
        }
    }
}
