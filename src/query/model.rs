use crate::{
    error::Error,
    query::{criteria::Criteria, field::Field},
};

/// -----------------------------
/// Query (execution contract)
/// -----------------------------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    criteria: Option<Criteria>,
    filter_queries: Vec<Query>,
    projection: Vec<Field>,
    group_by: Vec<Field>,
    page: Option<PageRequest>,
    sort: Option<Sort>,
}

impl Query {
    pub fn new(criteria: Criteria) -> Self {
        Self {
            criteria: Some(criteria),
            ..Default::default()
        }
    }

    pub fn match_all() -> Self {
        Self::new(Criteria::match_all())
    }

    /// ORs `criteria` into the existing root, or makes it the root.
    /// A chained root is grouped first so the OR applies to all of it.
    pub fn add_criteria(self, criteria: Criteria) -> Self {
        let mut consumed_self = self;
        consumed_self.criteria = Some(match consumed_self.criteria.take() {
            Some(root) if root.links().len() > 1 => Criteria::group(root).or_criteria(criteria),
            Some(root) => root.or_criteria(criteria),
            None => criteria,
        });
        consumed_self
    }

    pub fn add_filter_query(self, filter: Query) -> Self {
        let mut consumed_self = self;
        consumed_self.filter_queries.push(filter);
        consumed_self
    }

    pub fn add_projection(self, field: Field) -> Self {
        let mut consumed_self = self;
        consumed_self.projection.push(field);
        consumed_self
    }

    pub fn add_group_by(self, field: Field) -> Self {
        let mut consumed_self = self;
        consumed_self.group_by.push(field);
        consumed_self
    }

    pub fn with_page(mut self, page: PageRequest) -> Self {
        self.page = Some(page);
        self
    }

    /// Appends the orders of `sort` after any existing ones.
    pub fn add_sort(self, sort: Sort) -> Self {
        let mut consumed_self = self;
        consumed_self.sort = Some(match consumed_self.sort.take() {
            Some(existing) => existing.and(sort),
            None => sort,
        });
        consumed_self
    }

    pub fn criteria(&self) -> Option<&Criteria> {
        self.criteria.as_ref()
    }

    pub fn filter_queries(&self) -> &[Query] {
        &self.filter_queries
    }

    pub fn projection(&self) -> &[Field] {
        &self.projection
    }

    pub fn group_by(&self) -> &[Field] {
        &self.group_by
    }

    pub fn page(&self) -> Option<PageRequest> {
        self.page
    }

    pub fn sort(&self) -> Option<&Sort> {
        self.sort.as_ref()
    }
}

/// Window into a result set: `offset` rows skipped, at most `size` returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageRequest {
    offset: u64,
    size: u32,
}

impl PageRequest {
    /// Zero-based page number.
    pub fn new(page: u64, size: u32) -> Result<Self, Error> {
        if size == 0 {
            return Err(Error::invalid_usage("page size must be positive"));
        }
        let offset = page
            .checked_mul(size as u64)
            .ok_or_else(|| Error::invalid_usage("page offset overflows"))?;
        Ok(Self { offset, size })
    }

    pub fn of_offset(offset: u64, size: u32) -> Result<Self, Error> {
        if size == 0 {
            return Err(Error::invalid_usage("page size must be positive"));
        }
        Ok(Self { offset, size })
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn page_number(&self) -> u64 {
        self.offset / self.size as u64
    }

    pub fn next(&self) -> Self {
        Self {
            offset: self.offset + self.size as u64,
            size: self.size,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Asc => "asc",
            Direction::Desc => "desc",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub field: Field,
    pub direction: Direction,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Sort {
    orders: Vec<Order>,
}

impl Sort {
    pub fn by(field: Field, direction: Direction) -> Self {
        Self {
            orders: vec![Order { field, direction }],
        }
    }

    pub fn then(mut self, field: Field, direction: Direction) -> Self {
        self.orders.push(Order { field, direction });
        self
    }

    pub fn and(mut self, other: Sort) -> Self {
        self.orders.extend(other.orders);
        self
    }

    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacetOptions {
    fields: Vec<Field>,
    limit: u32,
    min_count: u32,
}

impl FacetOptions {
    pub const DEFAULT_LIMIT: u32 = 10;
    pub const DEFAULT_MIN_COUNT: u32 = 1;

    pub fn new(fields: Vec<Field>) -> Self {
        Self {
            fields,
            limit: Self::DEFAULT_LIMIT,
            min_count: Self::DEFAULT_MIN_COUNT,
        }
    }

    pub fn add_facet_on_field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_min_count(mut self, min_count: u32) -> Self {
        self.min_count = min_count;
        self
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn min_count(&self) -> u32 {
        self.min_count
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FacetQuery {
    query: Query,
    facet_options: Option<FacetOptions>,
}

impl FacetQuery {
    pub fn new(query: Query) -> Self {
        Self {
            query,
            facet_options: None,
        }
    }

    pub fn with_facet_options(mut self, options: FacetOptions) -> Self {
        self.facet_options = Some(options);
        self
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn facet_options(&self) -> Option<&FacetOptions> {
        self.facet_options.as_ref()
    }
}

impl From<Query> for FacetQuery {
    fn from(query: Query) -> Self {
        FacetQuery::new(query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::QueryParser;

    #[test]
    fn add_criteria_sets_then_ors() {
        let query = Query::default()
            .add_criteria(Criteria::where_field("a").unwrap().is(1))
            .add_criteria(Criteria::where_field("b").unwrap().is(2));
        assert_eq!(QueryParser::compile(query.criteria().unwrap()), "a:1 OR b:2");
    }

    #[test]
    fn add_criteria_groups_a_chained_root() {
        let root = Criteria::where_field("a")
            .unwrap()
            .is(1)
            .and("b")
            .unwrap()
            .is(2);
        let query = Query::new(root).add_criteria(Criteria::where_field("c").unwrap().is(3));
        assert_eq!(
            QueryParser::compile(query.criteria().unwrap()),
            "(a:1 AND b:2) OR c:3"
        );
    }

    #[test]
    fn page_request_offsets() {
        let page = PageRequest::new(3, 20).unwrap();
        assert_eq!(page.offset(), 60);
        assert_eq!(page.page_number(), 3);
        assert_eq!(page.next().offset(), 80);
        assert!(PageRequest::new(0, 0).unwrap_err().is_invalid_usage());
        assert!(PageRequest::new(u64::MAX, 2).unwrap_err().is_invalid_usage());
    }

    #[test]
    fn sorts_accumulate() {
        let query = Query::match_all()
            .add_sort(Sort::by(Field::new("a").unwrap(), Direction::Asc))
            .add_sort(Sort::by(Field::new("b").unwrap(), Direction::Desc));
        let orders = query.sort().unwrap().orders();
        assert_eq!(orders.len(), 2);
        assert_eq!(orders[1].direction, Direction::Desc);
    }

    #[test]
    fn facet_option_defaults() {
        let options = FacetOptions::new(vec![Field::new("cat").unwrap()]);
        assert_eq!(options.limit(), 10);
        assert_eq!(options.min_count(), 1);
    }
}
