use crate::{
    document::EntityMetadata,
    error::Error,
    query::{Criteria, Field, PageRequest, Query, QueryValue, Sort},
    repository::part_tree::{Keyword, PartTree, Subject},
};

#[derive(Debug, Clone, PartialEq)]
struct ResolvedPart {
    field: Field,
    keyword: Keyword,
}

/// Turns a parsed method name into queries for one entity type.
///
/// Properties and keywords are checked once in [`QueryCreator::new`];
/// [`QueryCreator::create_query`] only binds arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryCreator {
    method_name: String,
    subject: Subject,
    clauses: Vec<Vec<ResolvedPart>>,
    sort: Option<Sort>,
    max_results: Option<u32>,
    parameter_count: usize,
}

impl QueryCreator {
    pub fn new(tree: &PartTree, meta: &EntityMetadata) -> Result<Self, Error> {
        let mut clauses = Vec::with_capacity(tree.clauses().len());
        for clause in tree.clauses() {
            let mut resolved = Vec::with_capacity(clause.parts().len());
            for part in clause.parts() {
                let (path, keyword) = match meta.resolve_path(part.source()) {
                    Ok(path) => (path, part.keyword()),
                    // `Domain` is a property, not `Doma` + `In`
                    Err(err) if part.keyword() != Keyword::SimpleProperty => {
                        match meta.resolve_path(part.raw()) {
                            Ok(path) => (path, Keyword::SimpleProperty),
                            Err(_) => return Err(err),
                        }
                    }
                    Err(err) => return Err(err),
                };
                ensure_supported(tree.method_name(), keyword)?;
                resolved.push(ResolvedPart {
                    field: Field::new(path.field_name)?,
                    keyword,
                });
            }
            clauses.push(resolved);
        }

        let mut sort: Option<Sort> = None;
        for order in tree.orders() {
            let path = meta.resolve_path(&order.source)?;
            let field = Field::new(path.field_name)?;
            sort = Some(match sort {
                Some(sort) => sort.then(field, order.direction),
                None => Sort::by(field, order.direction),
            });
        }

        let parameter_count = clauses
            .iter()
            .flatten()
            .map(|p| p.keyword.parameter_count())
            .sum();

        Ok(Self {
            method_name: tree.method_name().to_string(),
            subject: tree.subject(),
            clauses,
            sort,
            max_results: tree.max_results(),
            parameter_count,
        })
    }

    pub fn parameter_count(&self) -> usize {
        self.parameter_count
    }

    pub fn subject(&self) -> Subject {
        self.subject
    }

    pub fn max_results(&self) -> Option<u32> {
        self.max_results
    }

    /// Binds `params` positionally, in part order.
    pub fn create_query(&self, params: &[QueryValue]) -> Result<Query, Error> {
        if params.len() != self.parameter_count {
            return Err(Error::invalid_usage(format!(
                "method '{}' expects {} argument(s) but {} were supplied",
                self.method_name,
                self.parameter_count,
                params.len()
            )));
        }

        let mut cursor = params.iter().cloned();
        let mut root: Option<Criteria> = None;
        let multi_clause = self.clauses.len() > 1;

        for clause in &self.clauses {
            let mut current: Option<Criteria> = None;
            for part in clause {
                let criteria = match current {
                    None => Criteria::new(part.field.clone()),
                    Some(c) => c.and_field(part.field.clone()),
                };
                current = Some(apply(criteria, part.keyword, &mut cursor)?);
            }
            let Some(current) = current else {
                continue;
            };
            root = Some(match root {
                None if multi_clause && current.links().len() > 1 => Criteria::group(current),
                None => current,
                Some(root) => root.or_criteria(current),
            });
        }

        let mut query = Query::new(root.unwrap_or_else(Criteria::match_all));
        if let Some(sort) = &self.sort {
            query = query.add_sort(sort.clone());
        }
        if let Some(limit) = self.max_results {
            query = query.with_page(PageRequest::of_offset(0, limit)?);
        }
        Ok(query)
    }
}

/// `derive(partTree, boundParameters, entityMetadata)` in one call.
pub fn derive(
    tree: &PartTree,
    params: &[QueryValue],
    meta: &EntityMetadata,
) -> Result<Query, Error> {
    QueryCreator::new(tree, meta)?.create_query(params)
}

fn ensure_supported(method_name: &str, keyword: Keyword) -> Result<(), Error> {
    match keyword {
        Keyword::NotLike
        | Keyword::NotContaining
        | Keyword::Within
        | Keyword::Exists
        | Keyword::IsEmpty
        | Keyword::IsNotEmpty => Err(Error::invalid_usage(format!(
            "illegal criteria found '{}' in method '{}'",
            keyword, method_name
        ))),
        _ => Ok(()),
    }
}

fn apply(
    criteria: Criteria,
    keyword: Keyword,
    cursor: &mut impl Iterator<Item = QueryValue>,
) -> Result<Criteria, Error> {
    let mut next = || {
        cursor
            .next()
            .ok_or_else(|| Error::invalid_usage("not enough arguments for method"))
    };

    Ok(match keyword {
        Keyword::SimpleProperty => criteria.is(next()?),
        Keyword::Negating => criteria.is_not(next()?),
        Keyword::True => criteria.is(true),
        Keyword::False => criteria.is(false),
        Keyword::Like | Keyword::StartingWith => criteria.starts_with(next()?)?,
        Keyword::EndingWith => criteria.ends_with(next()?)?,
        Keyword::Containing => criteria.contains(next()?)?,
        Keyword::Regex => criteria.expression(next()?.to_string()),
        Keyword::Near => criteria.fuzzy(next()?)?,
        Keyword::GreaterThan | Keyword::After => criteria.greater_than(next()?),
        Keyword::GreaterThanEqual => criteria.greater_than_equal(next()?),
        Keyword::LessThan | Keyword::Before => criteria.less_than(next()?),
        Keyword::LessThanEqual => criteria.less_than_equal(next()?),
        Keyword::Between => {
            let lower = next()?;
            let upper = next()?;
            criteria.between(lower, upper)
        }
        Keyword::In => criteria.in_values(next()?.into_items())?,
        Keyword::NotIn => criteria.not_in(next()?.into_items())?,
        Keyword::IsNull => criteria.is_null(),
        Keyword::IsNotNull => criteria.is_not_null(),
        other => {
            return Err(Error::invalid_usage(format!(
                "illegal criteria found '{}'",
                other
            )));
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{document::PropertyDescriptor, params, query::QueryParser};

    fn manufacturer() -> &'static [PropertyDescriptor] {
        const PROPERTIES: &[PropertyDescriptor] = &[PropertyDescriptor::new("name")];
        PROPERTIES
    }

    const PRODUCT: &[PropertyDescriptor] = &[
        PropertyDescriptor::new("id"),
        PropertyDescriptor::new("name"),
        PropertyDescriptor::new("popularity"),
        PropertyDescriptor::new("price"),
        PropertyDescriptor::new("available").field("inStock"),
        PropertyDescriptor::new("domain"),
        PropertyDescriptor::new("manufacturer").nested(manufacturer),
    ];

    fn compile(method: &str, params: &[QueryValue]) -> Result<String, Error> {
        let meta = EntityMetadata::from_descriptors("Product", PRODUCT)?;
        let query = derive(&PartTree::parse(method)?, params, &meta)?;
        Ok(QueryParser::compile(query.criteria().unwrap()))
    }

    #[test]
    fn single_property() {
        assert_eq!(compile("findByPopularity", &params![100]).unwrap(), "popularity:100");
    }

    #[test]
    fn and_parts() {
        assert_eq!(
            compile("findByPopularityAndPrice", &params![100, 200.0_f32]).unwrap(),
            "popularity:100 AND price:200.0"
        );
    }

    #[test]
    fn mapped_field_names() {
        assert_eq!(compile("findByAvailableTrue", &params![]).unwrap(), "inStock:true");
        assert_eq!(compile("findByAvailableFalse", &params![]).unwrap(), "inStock:false");
        assert_eq!(
            compile("findByManufacturerName", &params!["acme"]).unwrap(),
            "manufacturer.name:acme"
        );
    }

    #[test]
    fn keyword_table() {
        assert_eq!(compile("findByNameIsNot", &params!["x"]).unwrap(), "-name:x");
        assert_eq!(compile("findByNameLike", &params!["so"]).unwrap(), "name:so*");
        assert_eq!(compile("findByNameStartingWith", &params!["so"]).unwrap(), "name:so*");
        assert_eq!(compile("findByNameEndingWith", &params!["lr"]).unwrap(), "name:*lr");
        assert_eq!(compile("findByNameContaining", &params!["ol"]).unwrap(), "name:*ol*");
        assert_eq!(compile("findByNameRegex", &params!["s.*r"]).unwrap(), "name:s.*r");
        assert_eq!(compile("findByNameNear", &params!["solr"]).unwrap(), "name:solr~");
        assert_eq!(
            compile("findByPriceBetween", &params![10, 20]).unwrap(),
            "price:[10 TO 20]"
        );
        assert_eq!(
            compile("findByPriceGreaterThan", &params![10]).unwrap(),
            "price:{10 TO *]"
        );
        assert_eq!(
            compile("findByPopularityIn", &params![vec![1, 2]]).unwrap(),
            "popularity:(1 2)"
        );
        assert_eq!(compile("findByNameIsNull", &params![]).unwrap(), "-name:[* TO *]");
        assert_eq!(
            compile("findByNameAndPopularityNotIn", &params!["x", vec![1, 2]]).unwrap(),
            "name:x AND -popularity:(1 2)"
        );
    }

    #[test]
    fn or_clauses_fold_left_to_right() {
        assert_eq!(
            compile("findByNameOrPopularity", &params!["x", 1]).unwrap(),
            "name:x OR popularity:1"
        );
        assert_eq!(
            compile("findByNameAndPriceOrPopularity", &params!["x", 1.0, 2]).unwrap(),
            "(name:x AND price:1.0) OR popularity:2"
        );
        assert_eq!(
            compile(
                "findByNameAndPriceOrPopularityAndAvailableTrueOrDomain",
                &params!["x", 1.0, 2, "d"]
            )
            .unwrap(),
            "(name:x AND price:1.0) OR (popularity:2 AND inStock:true) OR domain:d"
        );
    }

    #[test]
    fn keyword_lookalike_property() {
        assert_eq!(compile("findByDomain", &params!["a"]).unwrap(), "domain:a");
    }

    #[test]
    fn sort_and_limit_do_not_touch_criteria() {
        let meta = EntityMetadata::from_descriptors("Product", PRODUCT).unwrap();
        let tree = PartTree::parse("findTop3ByNameOrderByPriceDesc").unwrap();
        let query = derive(&tree, &params!["x"], &meta).unwrap();
        assert_eq!(QueryParser::compile(query.criteria().unwrap()), "name:x");
        let order = &query.sort().unwrap().orders()[0];
        assert_eq!(order.field.name(), "price");
        assert_eq!(order.direction, crate::query::Direction::Desc);
        assert_eq!(query.page().unwrap().size(), 3);
    }

    #[test]
    fn failures() {
        let err = compile("findByNameNotLike", &params!["x"]).unwrap_err();
        assert!(err.is_invalid_usage());
        assert!(err.to_string().contains("NOT_LIKE"));

        assert!(compile("findByColor", &params!["red"]).unwrap_err().is_invalid_usage());
        assert!(compile("findByName", &params![]).unwrap_err().is_invalid_usage());
        assert!(compile("findByName", &params!["a", "b"]).unwrap_err().is_invalid_usage());
        assert!(
            compile("findByNameContaining", &params!["two words"])
                .unwrap_err()
                .is_invalid_usage()
        );
    }

    #[test]
    fn no_predicate_matches_everything() {
        assert_eq!(compile("findAll", &params![]).unwrap(), "*:*");
    }
}
