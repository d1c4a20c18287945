use std::{collections::HashMap, fmt, ops::Deref, sync::Arc};

use async_trait::async_trait;

use crate::{
    SolrTemplate,
    document::SolrDocument,
    error::Error,
    query::{FacetOptions, FacetPage, FacetQuery, Page, PageRequest, Query, QueryValue, Sort},
    repository::{
        derived::QueryCreator,
        named::{NamedQueries, canonical_name},
        part_tree::{PartTree, Subject},
        simple::SimpleSolrRepository,
        string_based::StringQuery,
    },
};

/// What a repository method hands back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultKind {
    One,
    List,
    Page,
    Facet,
    Count,
    Exists,
    Delete,
}

/// How a declared method was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    CustomImpl,
    NamedQuery,
    AnnotatedQuery,
    DerivedQuery,
}

/// Declaration of a repository method.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryMethod {
    name: String,
    query: Option<String>,
    result: Option<ResultKind>,
    facet: Option<FacetOptions>,
}

impl QueryMethod {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            query: None,
            result: None,
            facet: None,
        }
    }

    /// Explicit query template with `?N` placeholders.
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn returning(mut self, result: ResultKind) -> Self {
        self.result = Some(result);
        self
    }

    pub fn with_facet(mut self, options: FacetOptions) -> Self {
        self.facet = Some(options);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Arguments of one call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Invocation {
    args: Vec<QueryValue>,
    page: Option<PageRequest>,
    sort: Option<Sort>,
}

impl Invocation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_args(args: Vec<QueryValue>) -> Self {
        Self {
            args,
            ..Self::default()
        }
    }

    pub fn arg(mut self, value: impl crate::query::ToQueryValue) -> Self {
        self.args.push(value.to_query_value());
        self
    }

    pub fn page(mut self, page: PageRequest) -> Self {
        self.page = Some(page);
        self
    }

    pub fn sort(mut self, sort: Sort) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn args(&self) -> &[QueryValue] {
        &self.args
    }

    pub fn page_request(&self) -> Option<PageRequest> {
        self.page
    }

    pub fn sort_order(&self) -> Option<&Sort> {
        self.sort.as_ref()
    }
}

/// Outcome of invoking a repository method.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryResult<T> {
    One(Option<T>),
    List(Vec<T>),
    Page(Page<T>),
    Facets(FacetPage<T>),
    Count(u64),
    Exists(bool),
    Deleted(u64),
}

impl<T> QueryResult<T> {
    fn kind_name(&self) -> &'static str {
        match self {
            Self::One(_) => "one",
            Self::List(_) => "list",
            Self::Page(_) => "page",
            Self::Facets(_) => "facet page",
            Self::Count(_) => "count",
            Self::Exists(_) => "exists",
            Self::Deleted(_) => "delete",
        }
    }

    fn mismatch(&self, expected: &str) -> Error {
        Error::invalid_usage(format!(
            "expected a {} result but the method returned a {} result",
            expected,
            self.kind_name()
        ))
    }

    pub fn into_one(self) -> Result<Option<T>, Error> {
        match self {
            Self::One(value) => Ok(value),
            other => Err(other.mismatch("one")),
        }
    }

    pub fn into_list(self) -> Result<Vec<T>, Error> {
        match self {
            Self::List(values) => Ok(values),
            Self::Page(page) => Ok(page.into_content()),
            other => Err(other.mismatch("list")),
        }
    }

    pub fn into_page(self) -> Result<Page<T>, Error> {
        match self {
            Self::Page(page) => Ok(page),
            Self::Facets(page) => Ok(page.into_page()),
            other => Err(other.mismatch("page")),
        }
    }

    pub fn into_facet_page(self) -> Result<FacetPage<T>, Error> {
        match self {
            Self::Facets(page) => Ok(page),
            other => Err(other.mismatch("facet page")),
        }
    }

    pub fn into_count(self) -> Result<u64, Error> {
        match self {
            Self::Count(count) => Ok(count),
            other => Err(other.mismatch("count")),
        }
    }

    pub fn into_exists(self) -> Result<bool, Error> {
        match self {
            Self::Exists(exists) => Ok(exists),
            other => Err(other.mismatch("exists")),
        }
    }

    pub fn into_deleted(self) -> Result<u64, Error> {
        match self {
            Self::Deleted(count) => Ok(count),
            other => Err(other.mismatch("delete")),
        }
    }
}

/// A hand-written repository method.
#[async_trait]
pub trait CustomMethod<T>: Send + Sync {
    async fn invoke(&self, template: &SolrTemplate, invocation: Invocation)
    -> Result<QueryResult<T>, Error>;
}

enum Strategy<T> {
    Custom(Arc<dyn CustomMethod<T>>),
    Named(StringQuery),
    Annotated(StringQuery),
    Derived(QueryCreator),
}

impl<T> Strategy<T> {
    fn kind(&self) -> StrategyKind {
        match self {
            Self::Custom(_) => StrategyKind::CustomImpl,
            Self::Named(_) => StrategyKind::NamedQuery,
            Self::Annotated(_) => StrategyKind::AnnotatedQuery,
            Self::Derived(_) => StrategyKind::DerivedQuery,
        }
    }
}

struct ResolvedMethod<T> {
    strategy: Strategy<T>,
    /// `None` for a custom method that declares no kind.
    result: Option<ResultKind>,
    facet: Option<FacetOptions>,
}

impl<T> fmt::Debug for ResolvedMethod<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedMethod")
            .field("strategy", &self.strategy.kind())
            .field("result", &self.result)
            .finish()
    }
}

fn default_result(subject: Subject, max_results: Option<u32>, facet: bool) -> ResultKind {
    match subject {
        Subject::Count => ResultKind::Count,
        Subject::Exists => ResultKind::Exists,
        Subject::Delete => ResultKind::Delete,
        Subject::Find if facet => ResultKind::Facet,
        Subject::Find if max_results == Some(1) => ResultKind::One,
        Subject::Find => ResultKind::List,
    }
}

/// -----------------------------
/// RepositoryBuilder
/// -----------------------------

pub struct RepositoryBuilder<T> {
    template: SolrTemplate,
    methods: Vec<QueryMethod>,
    named_queries: NamedQueries,
    custom: HashMap<String, Arc<dyn CustomMethod<T>>>,
}

impl<T: SolrDocument> RepositoryBuilder<T> {
    pub fn new(template: SolrTemplate) -> Self {
        Self {
            template,
            methods: Vec::new(),
            named_queries: NamedQueries::default(),
            custom: HashMap::new(),
        }
    }

    pub fn method(mut self, method: QueryMethod) -> Self {
        self.methods.push(method);
        self
    }

    /// Merged over the catalog loaded from `named_queries_location`.
    pub fn named_queries(mut self, queries: NamedQueries) -> Self {
        self.named_queries.merge(queries);
        self
    }

    pub fn custom(mut self, name: impl Into<String>, method: Arc<dyn CustomMethod<T>>) -> Self {
        self.custom.insert(name.into(), method);
        self
    }

    /// Resolves every declared method once. Derived methods are parsed and
    /// checked against the entity here, so a bad name fails the build.
    pub fn build(self) -> Result<SolrRepository<T>, Error> {
        let Self {
            template,
            methods: declared,
            named_queries,
            mut custom,
        } = self;

        let mut catalog = match &template.config().named_queries_location {
            Some(path) => NamedQueries::load(path)?,
            None => NamedQueries::default(),
        };
        catalog.merge(named_queries);

        let simple = SimpleSolrRepository::<T>::new(template)?;
        let mut methods = HashMap::new();

        for (name, implementation) in custom.drain() {
            let result = declared
                .iter()
                .find(|method| method.name == name)
                .and_then(|method| method.result);
            tracing::debug!(
                target: "solr_osm::repository",
                type_name = T::TYPE,
                method = %name,
                strategy = ?StrategyKind::CustomImpl,
                result = ?result,
                "resolved method"
            );
            methods.insert(
                name,
                ResolvedMethod {
                    strategy: Strategy::Custom(implementation),
                    result,
                    facet: None,
                },
            );
        }

        for method in declared {
            if methods.contains_key(&method.name) {
                continue;
            }
            let resolved = resolve(&simple, &catalog, &method)?;
            tracing::debug!(
                target: "solr_osm::repository",
                type_name = T::TYPE,
                method = %method.name,
                strategy = ?resolved.strategy.kind(),
                result = ?resolved.result,
                "resolved method"
            );
            methods.insert(method.name, resolved);
        }

        Ok(SolrRepository {
            simple,
            methods: Arc::new(methods),
        })
    }
}

fn resolve<T: SolrDocument>(
    simple: &SimpleSolrRepository<T>,
    catalog: &NamedQueries,
    method: &QueryMethod,
) -> Result<ResolvedMethod<T>, Error> {
    let facet = method.facet.is_some();

    if let Some(template) = catalog.get(&canonical_name(T::TYPE, &method.name)) {
        return Ok(ResolvedMethod {
            strategy: Strategy::Named(StringQuery::new(template)),
            result: Some(method.result.unwrap_or_else(|| string_result(&method.name, facet))),
            facet: method.facet.clone(),
        });
    }

    if let Some(template) = &method.query {
        return Ok(ResolvedMethod {
            strategy: Strategy::Annotated(StringQuery::new(template.clone())),
            result: Some(method.result.unwrap_or_else(|| string_result(&method.name, facet))),
            facet: method.facet.clone(),
        });
    }

    let tree = PartTree::parse(&method.name)?;
    let creator = QueryCreator::new(&tree, simple.metadata())?;
    let result = method
        .result
        .unwrap_or_else(|| default_result(tree.subject(), tree.max_results(), facet));
    Ok(ResolvedMethod {
        strategy: Strategy::Derived(creator),
        result: Some(result),
        facet: method.facet.clone(),
    })
}

/// Result kind of a string-based method, guessed from its name.
fn string_result(name: &str, facet: bool) -> ResultKind {
    match PartTree::parse(name) {
        Ok(tree) => default_result(tree.subject(), tree.max_results(), facet),
        Err(_) if facet => ResultKind::Facet,
        Err(_) => ResultKind::List,
    }
}

/// -----------------------------
/// SolrRepository
/// -----------------------------

/// CRUD plus the declared query methods of one document type.
pub struct SolrRepository<T> {
    simple: SimpleSolrRepository<T>,
    methods: Arc<HashMap<String, ResolvedMethod<T>>>,
}

impl<T> Clone for SolrRepository<T> {
    fn clone(&self) -> Self {
        Self {
            simple: self.simple.clone(),
            methods: self.methods.clone(),
        }
    }
}

impl<T> Deref for SolrRepository<T> {
    type Target = SimpleSolrRepository<T>;

    fn deref(&self) -> &Self::Target {
        &self.simple
    }
}

impl<T: SolrDocument> SolrRepository<T> {
    pub fn strategy(&self, name: &str) -> Option<StrategyKind> {
        self.methods.get(name).map(|m| m.strategy.kind())
    }

    pub fn result_kind(&self, name: &str) -> Option<ResultKind> {
        self.methods.get(name).and_then(|m| m.result)
    }

    pub async fn invoke(
        &self,
        name: &str,
        invocation: Invocation,
    ) -> Result<QueryResult<T>, Error> {
        let method = self.methods.get(name).ok_or_else(|| {
            Error::invalid_usage(format!(
                "method '{}' is not declared on the '{}' repository",
                name,
                T::TYPE
            ))
        })?;

        let mut query = match &method.strategy {
            Strategy::Custom(custom) => {
                return custom.invoke(self.simple.template(), invocation).await;
            }
            Strategy::Named(query) | Strategy::Annotated(query) => query.build(&invocation.args)?,
            Strategy::Derived(creator) => creator.create_query(&invocation.args)?,
        };

        if let Some(sort) = invocation.sort {
            query = query.add_sort(sort);
        }
        if let Some(page) = invocation.page {
            query = query.with_page(page);
        }

        self.execute(method, query).await
    }

    async fn execute(
        &self,
        method: &ResolvedMethod<T>,
        query: Query,
    ) -> Result<QueryResult<T>, Error> {
        let Some(kind) = method.result else {
            return Err(Error::invalid_usage("method has no result kind"));
        };
        let template = self.simple.template();
        match kind {
            ResultKind::One => Ok(QueryResult::One(template.query_for_object(&query).await?)),
            ResultKind::List => {
                if query.page().is_some() {
                    let page = template.query_for_page::<T>(&query).await?;
                    Ok(QueryResult::List(page.into_content()))
                } else {
                    Ok(QueryResult::List(self.simple.find_all_matching(query).await?))
                }
            }
            ResultKind::Page => {
                let query = self.with_default_page(query)?;
                Ok(QueryResult::Page(template.query_for_page(&query).await?))
            }
            ResultKind::Facet => {
                let mut facet_query = FacetQuery::new(self.with_default_page(query)?);
                if let Some(options) = &method.facet {
                    facet_query = facet_query.with_facet_options(options.clone());
                }
                Ok(QueryResult::Facets(
                    template.query_for_facet_page(&facet_query).await?,
                ))
            }
            ResultKind::Count => Ok(QueryResult::Count(template.count::<T>(&query).await?)),
            ResultKind::Exists => Ok(QueryResult::Exists(template.count::<T>(&query).await? > 0)),
            ResultKind::Delete => {
                let matched = template.count::<T>(&query).await?;
                if matched > 0 {
                    template.delete_by_query(&query).await?;
                    self.simple.commit_if_configured().await?;
                }
                Ok(QueryResult::Deleted(matched))
            }
        }
    }

    fn with_default_page(&self, query: Query) -> Result<Query, Error> {
        if query.page().is_some() {
            return Ok(query);
        }
        let size = self.simple.template().config().default_page_size;
        Ok(query.with_page(PageRequest::new(0, size)?))
    }
}

#[cfg(all(test, feature = "memory"))]
mod tests {
    use super::*;
    use crate::{
        adapters::memory::MemoryClient,
        document::PropertyDescriptor,
        params,
        query::Field,
        repository::traits::Writable,
    };
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Book {
        id: String,
        title: String,
        pages: i64,
    }

    impl SolrDocument for Book {
        const TYPE: &'static str = "Book";

        fn properties() -> &'static [PropertyDescriptor] {
            const PROPERTIES: &[PropertyDescriptor] = &[
                PropertyDescriptor::new("id"),
                PropertyDescriptor::new("title"),
                PropertyDescriptor::new("pages"),
            ];
            PROPERTIES
        }
    }

    fn book(id: &str, title: &str, pages: i64) -> Book {
        Book {
            id: id.to_string(),
            title: title.to_string(),
            pages,
        }
    }

    struct Thickest;

    #[async_trait]
    impl CustomMethod<Book> for Thickest {
        async fn invoke(
            &self,
            template: &SolrTemplate,
            _invocation: Invocation,
        ) -> Result<QueryResult<Book>, Error> {
            let query = Query::match_all()
                .add_sort(Sort::by(Field::new("pages")?, crate::query::Direction::Desc));
            Ok(QueryResult::One(template.query_for_object(&query).await?))
        }
    }

    async fn seeded() -> SolrTemplate {
        let template = SolrTemplate::new(Arc::new(MemoryClient::new()));
        let repository = SimpleSolrRepository::<Book>::new(template.clone()).unwrap();
        repository
            .save_all(&[book("1", "dune", 412), book("2", "emma", 474), book("3", "ubik", 202)])
            .await
            .unwrap();
        template
    }

    #[tokio::test]
    async fn priority_order() {
        let template = seeded().await;
        let repository = RepositoryBuilder::<Book>::new(template)
            .named_queries(NamedQueries::new().with("Book.findByTitle", "title:?0"))
            .method(QueryMethod::new("findByTitle").with_query("title:nope"))
            .method(QueryMethod::new("findByPages").with_query("pages:?0"))
            .method(QueryMethod::new("findByPagesGreaterThan"))
            .method(QueryMethod::new("findThickest"))
            .custom("findThickest", Arc::new(Thickest))
            .build()
            .unwrap();

        assert_eq!(repository.strategy("findByTitle"), Some(StrategyKind::NamedQuery));
        assert_eq!(repository.strategy("findByPages"), Some(StrategyKind::AnnotatedQuery));
        assert_eq!(
            repository.strategy("findByPagesGreaterThan"),
            Some(StrategyKind::DerivedQuery)
        );
        assert_eq!(repository.strategy("findThickest"), Some(StrategyKind::CustomImpl));

        let named = repository
            .invoke("findByTitle", Invocation::with_args(params!["dune"]))
            .await
            .unwrap()
            .into_list()
            .unwrap();
        assert_eq!(named, vec![book("1", "dune", 412)]);

        let thickest = repository
            .invoke("findThickest", Invocation::new())
            .await
            .unwrap()
            .into_one()
            .unwrap();
        assert_eq!(thickest.unwrap().id, "2");
    }

    #[tokio::test]
    async fn custom_methods_keep_their_declared_kind() {
        let template = seeded().await;
        let undeclared = RepositoryBuilder::<Book>::new(template.clone())
            .custom("findThickest", Arc::new(Thickest))
            .build()
            .unwrap();
        assert_eq!(undeclared.result_kind("findThickest"), None);

        let declared = RepositoryBuilder::<Book>::new(template)
            .method(QueryMethod::new("findThickest").returning(ResultKind::One))
            .custom("findThickest", Arc::new(Thickest))
            .build()
            .unwrap();
        assert_eq!(declared.strategy("findThickest"), Some(StrategyKind::CustomImpl));
        assert_eq!(declared.result_kind("findThickest"), Some(ResultKind::One));
    }

    #[tokio::test]
    async fn result_kinds_follow_subject() {
        let template = seeded().await;
        let repository = RepositoryBuilder::<Book>::new(template)
            .method(QueryMethod::new("countByPagesGreaterThan"))
            .method(QueryMethod::new("existsByTitle"))
            .method(QueryMethod::new("findFirstByTitle"))
            .method(QueryMethod::new("findByPagesLessThan").returning(ResultKind::Page))
            .method(QueryMethod::new("deleteByTitle"))
            .build()
            .unwrap();

        let count = repository
            .invoke("countByPagesGreaterThan", Invocation::new().arg(300))
            .await
            .unwrap();
        assert_eq!(count.into_count().unwrap(), 2);

        let exists = repository
            .invoke("existsByTitle", Invocation::new().arg("ubik"))
            .await
            .unwrap();
        assert!(exists.into_exists().unwrap());

        assert_eq!(repository.result_kind("findFirstByTitle"), Some(ResultKind::One));

        let page = repository
            .invoke("findByPagesLessThan", Invocation::new().arg(500))
            .await
            .unwrap()
            .into_page()
            .unwrap();
        assert_eq!(page.total_elements(), 3);
        assert_eq!(page.pageable().unwrap().size(), 10);

        let deleted = repository
            .invoke("deleteByTitle", Invocation::new().arg("emma"))
            .await
            .unwrap();
        assert_eq!(deleted.into_deleted().unwrap(), 1);
        assert_eq!(crate::repository::Readable::count(&*repository).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn undeclared_and_mismatched() {
        let template = seeded().await;
        let repository = RepositoryBuilder::<Book>::new(template)
            .method(QueryMethod::new("countByTitle"))
            .build()
            .unwrap();

        let err = repository.invoke("findByTitle", Invocation::new()).await.unwrap_err();
        assert!(err.is_invalid_usage());

        let err = repository
            .invoke("countByTitle", Invocation::new().arg("dune"))
            .await
            .unwrap()
            .into_list()
            .unwrap_err();
        assert!(err.is_invalid_usage());
    }

    #[tokio::test]
    async fn bad_derived_methods_fail_the_build() {
        let template = seeded().await;
        let err = RepositoryBuilder::<Book>::new(template)
            .method(QueryMethod::new("findByAuthor"))
            .build()
            .err()
            .unwrap();
        assert!(err.is_invalid_usage());
    }

    #[tokio::test]
    async fn invocation_sort_and_page_apply() {
        let template = seeded().await;
        let repository = RepositoryBuilder::<Book>::new(template)
            .method(QueryMethod::new("findByPagesGreaterThan"))
            .build()
            .unwrap();

        let books = repository
            .invoke(
                "findByPagesGreaterThan",
                Invocation::new()
                    .arg(0)
                    .sort(Sort::by(Field::new("pages").unwrap(), crate::query::Direction::Asc))
                    .page(PageRequest::new(0, 2).unwrap()),
            )
            .await
            .unwrap()
            .into_list()
            .unwrap();
        let ids: Vec<_> = books.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["3", "1"]);
    }
}
