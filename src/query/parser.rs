use crate::{
    adapters::{FacetParams, SolrRequest},
    error::Error,
    query::{
        criteria::{Criteria, FieldCriteria, Node, Predicate},
        model::{FacetQuery, Query},
        value::QueryValue,
    },
};

/// Renders criteria and queries into Solr request syntax.
///
/// The compiler only reads its input; the same `Criteria` compiles to the
/// same string every time.
pub struct QueryParser;

impl QueryParser {
    /// Compiles a criteria chain to a Solr query string.
    ///
    /// Returns an empty string when no node carries a predicate.
    pub fn compile(criteria: &Criteria) -> String {
        let mut out = String::new();
        for link in criteria.links() {
            let rendered = match &link.node {
                Node::Field(fc) => render_field(fc),
                Node::Group(group) => render_group(group),
            };
            let Some(rendered) = rendered else {
                continue;
            };
            if !out.is_empty() {
                out.push(' ');
                out.push_str(link.conjunction.as_str());
                out.push(' ');
            }
            out.push_str(&rendered);
        }
        out
    }

    /// Builds request parameters for a plain query.
    pub fn construct_request(query: &Query) -> Result<SolrRequest, Error> {
        let q = query
            .criteria()
            .map(QueryParser::compile)
            .unwrap_or_default();
        if q.is_empty() {
            return Err(Error::invalid_usage(
                "query must carry criteria with at least one predicate",
            ));
        }

        let mut request = SolrRequest::new(q);

        for filter in query.filter_queries() {
            if let Some(fq) = filter.criteria().map(QueryParser::compile) {
                if !fq.is_empty() {
                    request.fq.push(fq);
                }
            }
        }

        request.fl = query
            .projection()
            .iter()
            .map(|f| f.name().to_string())
            .collect();

        if let Some(page) = query.page() {
            request.start = Some(page.offset());
            request.rows = Some(page.size());
        }

        if let Some(sort) = query.sort() {
            request.sort = sort
                .orders()
                .iter()
                .map(|order| format!("{} {}", order.field.name(), order.direction.as_str()))
                .collect();
        }

        request.group_fields = query
            .group_by()
            .iter()
            .map(|f| f.name().to_string())
            .collect();

        Ok(request)
    }

    /// Builds request parameters including facet settings.
    pub fn construct_facet_request(query: &FacetQuery) -> Result<SolrRequest, Error> {
        let mut request = Self::construct_request(query.query())?;
        if let Some(options) = query.facet_options() {
            if !options.fields().is_empty() {
                request.facet = Some(FacetParams {
                    fields: options
                        .fields()
                        .iter()
                        .map(|f| f.name().to_string())
                        .collect(),
                    limit: options.limit(),
                    min_count: options.min_count(),
                });
            }
        }
        Ok(request)
    }
}

fn render_group(group: &Criteria) -> Option<String> {
    let rendered_nodes = group
        .links()
        .iter()
        .filter(|link| match &link.node {
            Node::Field(fc) => !fc.predicates.is_empty(),
            Node::Group(inner) => !inner.is_empty(),
        })
        .count();

    let compiled = QueryParser::compile(group);
    match rendered_nodes {
        0 => None,
        1 => Some(compiled),
        _ => Some(format!("({})", compiled)),
    }
}

fn render_field(fc: &FieldCriteria) -> Option<String> {
    let qualifier = if fc.field.is_wildcard() {
        String::new()
    } else {
        format!("{}:", fc.field.name())
    };

    let mut rendered = match fc.predicates.as_slice() {
        [] => return None,
        [Predicate::IsNot(value)] => format!("-{}{}", qualifier, term(value)),
        [Predicate::IsNull] => format!("-{}[* TO *]", qualifier),
        [single] => format!("{}{}", qualifier, fragment(single)),
        // a nested pure-negative group matches nothing, so negate the field instead
        many if many.iter().all(|p| matches!(p, Predicate::IsNot(_))) => {
            let parts: Vec<String> = many
                .iter()
                .filter_map(|p| match p {
                    Predicate::IsNot(value) => Some(term(value)),
                    _ => None,
                })
                .collect();
            format!("-{}({})", qualifier, parts.join(" "))
        }
        many => {
            let parts: Vec<String> = many.iter().map(fragment).collect();
            format!("{}({})", qualifier, parts.join(" "))
        }
    };

    if let Some(boost) = fc.boost {
        rendered.push('^');
        rendered.push_str(&QueryValue::Float(boost as f64).to_string());
    }

    Some(rendered)
}

fn fragment(predicate: &Predicate) -> String {
    match predicate {
        Predicate::Is(value) => term(value),
        Predicate::IsNot(value) => format!("-{}", term(value)),
        Predicate::StartsWith(prefix) => format!("{}*", prefix),
        Predicate::EndsWith(suffix) => format!("*{}", suffix),
        Predicate::Contains(fragment) => format!("*{}*", fragment),
        Predicate::Fuzzy { term, distance } => match distance {
            Some(d) => format!("{}~{}", term, d),
            None => format!("{}~", term),
        },
        Predicate::Expression(raw) => raw.clone(),
        Predicate::Between {
            lower,
            upper,
            include_lower,
            include_upper,
        } => format!(
            "{}{} TO {}{}",
            if *include_lower { '[' } else { '{' },
            range_bound(lower),
            range_bound(upper),
            if *include_upper { ']' } else { '}' },
        ),
        Predicate::IsNull => "-[* TO *]".to_string(),
        Predicate::IsNotNull => "[* TO *]".to_string(),
    }
}

/// Term position: whitespace and timestamps force a quoted phrase.
fn term(value: &QueryValue) -> String {
    let raw = value.to_string();
    if raw.is_empty()
        || raw.contains(char::is_whitespace)
        || matches!(value, QueryValue::Timestamp(_))
    {
        quote(&raw)
    } else {
        raw
    }
}

fn range_bound(value: &QueryValue) -> String {
    match value {
        QueryValue::Null => "*".to_string(),
        QueryValue::Timestamp(_) => value.to_string(),
        other => term(other),
    }
}

fn quote(raw: &str) -> String {
    format!("\"{}\"", raw.replace('"', "\\\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{Direction, Field, FacetOptions, PageRequest, Sort};
    use chrono::{TimeZone, Utc};

    fn c(name: &str) -> Criteria {
        Criteria::where_field(name).unwrap()
    }

    #[test]
    fn single_term() {
        assert_eq!(QueryParser::compile(&c("field").is("value")), "field:value");
        assert_eq!(QueryParser::compile(&c("popularity").is(100)), "popularity:100");
    }

    #[test]
    fn whitespace_values_are_quoted_and_escaped() {
        assert_eq!(
            QueryParser::compile(&c("name").is("hello world")),
            "name:\"hello world\""
        );
        assert_eq!(
            QueryParser::compile(&c("name").is("say \"hi\" now")),
            "name:\"say \\\"hi\\\" now\""
        );
    }

    #[test]
    fn multiple_predicates_share_one_field() {
        let criteria = c("f")
            .starts_with("a")
            .unwrap()
            .ends_with("b")
            .unwrap()
            .contains("c")
            .unwrap()
            .is("d");
        assert_eq!(QueryParser::compile(&criteria), "f:(a* *b *c* d)");
    }

    #[test]
    fn and_chain() {
        let criteria = c("f1")
            .starts_with("a")
            .unwrap()
            .ends_with("b")
            .unwrap()
            .and("f2")
            .unwrap()
            .starts_with("c")
            .unwrap()
            .ends_with("d")
            .unwrap();
        assert_eq!(QueryParser::compile(&criteria), "f1:(a* *b) AND f2:(c* *d)");
    }

    #[test]
    fn or_chain() {
        let criteria = c("f1")
            .starts_with("a")
            .unwrap()
            .or("f2")
            .unwrap()
            .ends_with("b")
            .unwrap()
            .starts_with("c")
            .unwrap();
        assert_eq!(QueryParser::compile(&criteria), "f1:a* OR f2:(*b c*)");
    }

    #[test]
    fn negation_and_fuzzy() {
        assert_eq!(QueryParser::compile(&c("f").is_not("x")), "-f:x");
        assert_eq!(QueryParser::compile(&c("f").is("a").is_not("b")), "f:(a -b)");
        assert_eq!(QueryParser::compile(&c("f").fuzzy("x").unwrap()), "f:x~");
        assert_eq!(
            QueryParser::compile(&c("f").fuzzy_with_distance("x", 0.5).unwrap()),
            "f:x~0.5"
        );
    }

    #[test]
    fn all_negated_values_negate_the_field() {
        let criteria = c("name")
            .is("x")
            .and("popularity")
            .unwrap()
            .not_in(vec![1, 2])
            .unwrap();
        assert_eq!(
            QueryParser::compile(&criteria),
            "name:x AND -popularity:(1 2)"
        );
        assert_eq!(
            QueryParser::compile(&c("cat").is_not(vec!["a", "b c"])),
            "-cat:(a \"b c\")"
        );
    }

    #[test]
    fn ranges_and_null_checks() {
        assert_eq!(QueryParser::compile(&c("price").between(10, 20)), "price:[10 TO 20]");
        assert_eq!(QueryParser::compile(&c("price").greater_than(10)), "price:{10 TO *]");
        assert_eq!(QueryParser::compile(&c("price").less_than(20)), "price:[* TO 20}");
        assert_eq!(QueryParser::compile(&c("price").is_null()), "-price:[* TO *]");
        assert_eq!(QueryParser::compile(&c("price").is_not_null()), "price:[* TO *]");
    }

    #[test]
    fn timestamps() {
        let t = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(
            QueryParser::compile(&c("created").is(t)),
            "created:\"2024-01-02T03:04:05.000Z\""
        );
        assert_eq!(
            QueryParser::compile(&c("created").greater_than_equal(t)),
            "created:[2024-01-02T03:04:05.000Z TO *]"
        );
    }

    #[test]
    fn expression_is_verbatim() {
        assert_eq!(
            QueryParser::compile(&c("name").expression("(a OR b)^3")),
            "name:(a OR b)^3"
        );
    }

    #[test]
    fn wildcard_field_is_unqualified() {
        let all = Criteria::new(Field::wildcard()).expression("*");
        assert_eq!(QueryParser::compile(&all), "*");
        assert_eq!(QueryParser::compile(&Criteria::match_all()), "*:*");
    }

    #[test]
    fn empty_criteria_compiles_to_nothing() {
        assert_eq!(QueryParser::compile(&c("f")), "");
        let partial = c("f").and("g").unwrap().is(1);
        assert_eq!(QueryParser::compile(&partial), "g:1");
    }

    #[test]
    fn boost_follows_the_field() {
        assert_eq!(QueryParser::compile(&c("name").is("solr").boost(2.0)), "name:solr^2.0");
    }

    #[test]
    fn groups_are_parenthesised() {
        let first = c("a").is(1).and("b").unwrap().is(2);
        let second = c("c").is(3).and("d").unwrap().is(4);
        let criteria = Criteria::group(first).or_criteria(second);
        assert_eq!(
            QueryParser::compile(&criteria),
            "(a:1 AND b:2) OR (c:3 AND d:4)"
        );
    }

    #[test]
    fn compile_does_not_mutate() {
        let criteria = c("name").is("x").or("cat").unwrap().is("y");
        let before = criteria.clone();
        let first = QueryParser::compile(&criteria);
        let second = QueryParser::compile(&criteria);
        assert_eq!(first, second);
        assert_eq!(criteria, before);
    }

    #[test]
    fn request_parameters() {
        let query = Query::new(c("name").is("x"))
            .add_filter_query(Query::new(c("inStock").is(true)))
            .add_projection(Field::new("id").unwrap())
            .add_group_by(Field::new("cat").unwrap())
            .with_page(PageRequest::new(2, 10).unwrap())
            .add_sort(Sort::by(Field::new("price").unwrap(), Direction::Desc));

        let request = QueryParser::construct_request(&query).unwrap();
        assert_eq!(request.q, "name:x");
        assert_eq!(request.fq, vec!["inStock:true".to_string()]);
        assert_eq!(request.fl, vec!["id".to_string()]);
        assert_eq!(request.start, Some(20));
        assert_eq!(request.rows, Some(10));
        assert_eq!(request.sort, vec!["price desc".to_string()]);
        assert_eq!(request.group_fields, vec!["cat".to_string()]);
    }

    #[test]
    fn request_without_criteria_is_rejected() {
        let err = QueryParser::construct_request(&Query::default()).unwrap_err();
        assert!(err.is_invalid_usage());
        let err = QueryParser::construct_request(&Query::new(c("name"))).unwrap_err();
        assert!(err.is_invalid_usage());
    }

    #[test]
    fn facet_request() {
        let query = FacetQuery::new(Query::match_all()).with_facet_options(
            FacetOptions::new(vec![Field::new("cat").unwrap()])
                .with_limit(5)
                .with_min_count(2),
        );
        let request = QueryParser::construct_facet_request(&query).unwrap();
        let facet = request.facet.unwrap();
        assert_eq!(facet.fields, vec!["cat".to_string()]);
        assert_eq!(facet.limit, 5);
        assert_eq!(facet.min_count, 2);
    }
}
