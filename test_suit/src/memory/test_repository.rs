#[cfg(test)]
use std::io::Write;

#[cfg(test)]
use super::*;
#[cfg(test)]
use async_trait::async_trait;
#[cfg(test)]
use solr_osm::{
    Criteria, Error, Field, Query, QueryValue, params,
    query::{Direction, FacetOptions, PageRequest, Sort},
    repository::{
        CustomMethod, Invocation, NamedQueries, Pageable, QueryMethod, QueryResult, Readable,
        RepositoryBuilder, ResultKind, SimpleSolrRepository, SolrRepository, StrategyKind,
        Writable,
    },
};

#[cfg(test)]
fn ids(products: &[Product]) -> Vec<&str> {
    products.iter().map(|p| p.id.as_str()).collect()
}

#[cfg(test)]
async fn repository(template: SolrTemplate, methods: &[&str]) -> SolrRepository<Product> {
    let mut builder = RepositoryBuilder::<Product>::new(template.clone());
    for name in methods {
        builder = builder.method(QueryMethod::new(*name));
    }
    let repository = match builder.build() {
        Ok(repository) => repository,
        Err(err) => panic!("Error: {:#?}", err),
    };
    repository.save_all(&catalog()).await.unwrap();
    repository
}

#[cfg(test)]
async fn list(
    repository: &SolrRepository<Product>,
    method: &str,
    args: Vec<QueryValue>,
) -> Vec<Product> {
    repository
        .invoke(method, Invocation::with_args(args))
        .await
        .unwrap()
        .into_list()
        .unwrap()
}

// ==================== CRUD ====================

#[tokio::test]
async fn test_simple_repository_crud() {
    let (_, template) = setup();
    let repository = SimpleSolrRepository::<Product>::new(template).unwrap();
    repository.save_all(&catalog()).await.unwrap();

    assert_eq!(repository.count().await.unwrap(), 5);
    assert_eq!(repository.id_field().name(), "id");

    let found = repository.find_by_id("3").await.unwrap().unwrap();
    assert_eq!(found.name, "elastic");
    assert_eq!(found.manufacturer.unwrap().country, "nl");
    assert!(repository.find_by_id("42").await.unwrap().is_none());

    assert!(repository.exists_by_id("4").await.unwrap());
    assert!(!repository.exists_by_id("42").await.unwrap());

    let some = repository.find_all_by_ids(vec!["1", "5"]).await.unwrap();
    assert_eq!(ids(&some), vec!["1", "5"]);

    let everything = repository.find_all().await.unwrap();
    assert_eq!(everything.len(), 5);

    let mut changed = found_by_id(&repository, "2").await;
    changed.popularity = 1;
    repository.save(&changed).await.unwrap();
    assert_eq!(found_by_id(&repository, "2").await.popularity, 1);

    repository.delete(&changed).await.unwrap();
    repository.delete_by_id("1").await.unwrap();
    assert_eq!(repository.count().await.unwrap(), 3);

    repository.delete_all().await.unwrap();
    assert_eq!(repository.count().await.unwrap(), 0);
    assert!(repository.find_all().await.unwrap().is_empty());
}

#[cfg(test)]
async fn found_by_id(repository: &SimpleSolrRepository<Product>, id: &str) -> Product {
    match repository.find_by_id(id).await {
        Ok(Some(product)) => product,
        other => panic!("Error: {:#?}", other),
    }
}

#[tokio::test]
async fn test_paging_and_sorting() {
    let (_, template) = setup();
    let repository = SimpleSolrRepository::<Product>::new(template).unwrap();
    repository.save_all(&catalog()).await.unwrap();

    let first = repository
        .find_all_paged(PageRequest::new(0, 2).unwrap())
        .await
        .unwrap();
    assert_eq!(first.total_elements(), 5);
    assert_eq!(first.total_pages(), 3);
    assert!(first.has_next());

    let last = repository
        .find_all_paged(first.pageable().unwrap().next().next())
        .await
        .unwrap();
    assert_eq!(ids(last.content()), vec!["5"]);

    let by_price = repository
        .find_all_sorted(Sort::by(Field::new("price").unwrap(), Direction::Desc))
        .await
        .unwrap();
    assert_eq!(ids(&by_price), vec!["5", "3", "1", "2", "4"]);
}

#[tokio::test]
async fn test_writes_without_auto_commit() {
    let (client, template) = setup_with(SolrConfig {
        commit_on_write: false,
        ..SolrConfig::default()
    });
    let repository = RepositoryBuilder::<Product>::new(template.clone())
        .method(QueryMethod::new("findByName"))
        .build()
        .unwrap();

    repository.save(&product("7", "vespa", 30, 0.0, true)).await.unwrap();
    assert!(list(&repository, "findByName", params!["vespa"]).await.is_empty());
    assert_eq!(client.pending_count().await, 1);

    template.commit().await.unwrap();
    assert_eq!(ids(&list(&repository, "findByName", params!["vespa"]).await), vec!["7"]);
}

// ==================== Derived queries ====================

#[tokio::test]
async fn test_derived_queries() {
    let (_, template) = setup();
    let repository = repository(
        template,
        &[
            "findByName",
            "findByAvailableTrue",
            "findByPriceBetween",
            "findByNameStartingWith",
            "findByManufacturerName",
            "findByCategoriesIn",
            "findByNameOrPopularity",
            "findByPopularityGreaterThanAndAvailableFalse",
            "findByNameNear",
        ],
    )
    .await;

    assert_eq!(ids(&list(&repository, "findByName", params!["lucene"]).await), vec!["2"]);
    assert_eq!(
        ids(&list(&repository, "findByAvailableTrue", params![]).await),
        vec!["1", "2", "4"]
    );
    assert_eq!(
        ids(&list(&repository, "findByPriceBetween", params![10, 100]).await),
        vec!["1", "2", "3"]
    );
    assert_eq!(
        ids(&list(&repository, "findByNameStartingWith", params!["solr"]).await),
        vec!["1", "5"]
    );
    assert_eq!(
        ids(&list(&repository, "findByManufacturerName", params!["apache"]).await),
        vec!["1", "2"]
    );
    assert_eq!(
        ids(&list(&repository, "findByCategoriesIn", params![vec!["library", "server"]]).await),
        vec!["1", "2", "3", "5"]
    );
    assert_eq!(
        ids(&list(&repository, "findByNameOrPopularity", params!["sphinx", 60]).await),
        vec!["3", "4"]
    );
    assert_eq!(
        ids(&list(&repository, "findByPopularityGreaterThanAndAvailableFalse", params![70]).await),
        vec!["5"]
    );
    assert_eq!(
        ids(&list(&repository, "findByNameNear", params!["lucine"]).await),
        vec!["2"]
    );
}

#[tokio::test]
async fn test_derived_limits_and_subjects() {
    let (_, template) = setup();
    let repository = repository(
        template,
        &[
            "findTop2ByAvailableTrueOrderByPopularityDesc",
            "findFirstByAvailableTrueOrderByPriceAsc",
            "countByAvailableFalse",
            "existsByName",
            "deleteByAvailableFalse",
        ],
    )
    .await;

    assert_eq!(
        ids(&list(&repository, "findTop2ByAvailableTrueOrderByPopularityDesc", params![]).await),
        vec!["1", "2"]
    );

    assert_eq!(
        repository.result_kind("findFirstByAvailableTrueOrderByPriceAsc"),
        Some(ResultKind::One)
    );
    let cheapest = repository
        .invoke("findFirstByAvailableTrueOrderByPriceAsc", Invocation::new())
        .await
        .unwrap()
        .into_one()
        .unwrap();
    assert_eq!(cheapest.unwrap().id, "4");

    let count = repository
        .invoke("countByAvailableFalse", Invocation::new())
        .await
        .unwrap();
    assert_eq!(count, QueryResult::Count(2));

    let exists = repository
        .invoke("existsByName", Invocation::new().arg("nope"))
        .await
        .unwrap();
    assert_eq!(exists, QueryResult::Exists(false));

    let deleted = repository
        .invoke("deleteByAvailableFalse", Invocation::new())
        .await
        .unwrap();
    assert_eq!(deleted.into_deleted().unwrap(), 2);
    assert_eq!(repository.count().await.unwrap(), 3);
}

#[tokio::test]
async fn test_derived_page_arguments() {
    let (_, template) = setup();
    let repository = RepositoryBuilder::<Product>::new(template)
        .method(QueryMethod::new("findByCategories").returning(ResultKind::Page))
        .build()
        .unwrap();
    repository.save_all(&catalog()).await.unwrap();

    let page = repository
        .invoke(
            "findByCategories",
            Invocation::new()
                .arg("search")
                .page(PageRequest::new(0, 3).unwrap())
                .sort(Sort::by(Field::new("popularity").unwrap(), Direction::Asc)),
        )
        .await
        .unwrap()
        .into_page()
        .unwrap();
    assert_eq!(page.total_elements(), 4);
    assert_eq!(ids(page.content()), vec!["4", "3", "2"]);
    assert!(page.has_next());
}

#[tokio::test]
async fn test_invalid_derived_methods() {
    let (_, template) = setup();

    let unknown = RepositoryBuilder::<Product>::new(template.clone())
        .method(QueryMethod::new("findByColor"))
        .build();
    assert!(matches!(unknown, Err(Error::InvalidApiUsage(_))));

    let unsupported = RepositoryBuilder::<Product>::new(template.clone())
        .method(QueryMethod::new("findByNameNotLike"))
        .build();
    match unsupported {
        Err(Error::InvalidApiUsage(message)) => assert!(message.contains("NOT_LIKE")),
        Err(err) => panic!("Error: {:#?}", err),
        Ok(_) => panic!("NotLike should not resolve"),
    }

    let repository = repository(template, &["findByName"]).await;
    let err = repository
        .invoke("findByName", Invocation::new())
        .await
        .unwrap_err();
    assert!(err.is_invalid_usage());

    let err = repository
        .invoke("findByName", Invocation::new().arg("solr contains spaces"))
        .await
        .map(|_| ())
        .err();
    assert!(err.is_none(), "exact matches may contain whitespace");

    let err = repository.invoke("findByPrice", Invocation::new()).await.unwrap_err();
    assert!(err.is_invalid_usage());
}

// ==================== String-based queries ====================

#[tokio::test]
async fn test_annotated_query() {
    let (_, template) = setup();
    let builder = RepositoryBuilder::<Product>::new(template)
        .method(QueryMethod::new("findPopular").with_query("popularity:[?0 TO *] AND inStock:?1"));
    let repository = builder.build().unwrap();
    repository.save_all(&catalog()).await.unwrap();

    assert_eq!(repository.strategy("findPopular"), Some(StrategyKind::AnnotatedQuery));
    assert_eq!(
        ids(&list(&repository, "findPopular", params![80, true]).await),
        vec!["1", "2"]
    );

    let err = repository
        .invoke("findPopular", Invocation::with_args(params![80]))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ParameterOutOfRange { index: 1, count: 1 }));
}

#[tokio::test]
async fn test_named_queries_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "# product queries").unwrap();
    writeln!(file, "Product.findByNamedQuery=name:?0").unwrap();
    writeln!(file, "Product.findByName=name:lucene").unwrap();

    let (_, template) = setup_with(SolrConfig {
        named_queries_location: Some(file.path().to_path_buf()),
        ..SolrConfig::default()
    });
    let repository = RepositoryBuilder::<Product>::new(template)
        .method(QueryMethod::new("findByNamedQuery"))
        .method(QueryMethod::new("findByName").with_query("name:?0"))
        .method(QueryMethod::new("countByName"))
        .named_queries(NamedQueries::new().with("Product.countByName", "name:solr*"))
        .build()
        .unwrap();
    repository.save_all(&catalog()).await.unwrap();

    assert_eq!(repository.strategy("findByNamedQuery"), Some(StrategyKind::NamedQuery));
    assert_eq!(repository.strategy("findByName"), Some(StrategyKind::NamedQuery));
    assert_eq!(
        ids(&list(&repository, "findByNamedQuery", params!["sphinx"]).await),
        vec!["4"]
    );
    assert_eq!(
        ids(&list(&repository, "findByName", params!["ignored"]).await),
        vec!["2"]
    );
    let count = repository
        .invoke("countByName", Invocation::new())
        .await
        .unwrap()
        .into_count()
        .unwrap();
    assert_eq!(count, 2);
}

// ==================== Facets & custom methods ====================

#[tokio::test]
async fn test_facet_method() {
    let (_, template) = setup();
    let repository = RepositoryBuilder::<Product>::new(template)
        .method(
            QueryMethod::new("findByAvailableTrue")
                .with_facet(FacetOptions::new(vec![Field::new("cat").unwrap()])),
        )
        .build()
        .unwrap();
    repository.save_all(&catalog()).await.unwrap();

    assert_eq!(repository.result_kind("findByAvailableTrue"), Some(ResultKind::Facet));
    let page = repository
        .invoke("findByAvailableTrue", Invocation::new())
        .await
        .unwrap()
        .into_facet_page()
        .unwrap();

    assert_eq!(page.total_elements(), 3);
    let facets = page.facet_result_page(&Field::new("cat").unwrap()).unwrap();
    let counts: Vec<_> = facets
        .iter()
        .map(|entry| (entry.value.as_str(), entry.count))
        .collect();
    assert_eq!(counts, vec![("search", 3), ("library", 1), ("server", 1)]);
}

#[cfg(test)]
struct CheaperThan;

#[cfg(test)]
#[async_trait]
impl CustomMethod<Product> for CheaperThan {
    async fn invoke(
        &self,
        template: &SolrTemplate,
        invocation: Invocation,
    ) -> Result<QueryResult<Product>, Error> {
        let limit = invocation
            .args()
            .first()
            .cloned()
            .ok_or_else(|| Error::invalid_usage("missing price"))?;
        let query = Query::new(Criteria::where_field("price")?.less_than(limit))
            .add_sort(Sort::by(Field::new("price")?, Direction::Asc));
        let page = template.query_for_page(&query).await?;
        Ok(QueryResult::List(page.into_content()))
    }
}

#[tokio::test]
async fn test_custom_method_wins() {
    let (_, template) = setup();
    let repository = RepositoryBuilder::<Product>::new(template)
        .named_queries(NamedQueries::new().with("Product.findByPriceLessThan", "name:none"))
        .method(QueryMethod::new("findByPriceLessThan").with_query("name:none"))
        .custom("findByPriceLessThan", Arc::new(CheaperThan))
        .build()
        .unwrap();
    repository.save_all(&catalog()).await.unwrap();

    assert_eq!(repository.strategy("findByPriceLessThan"), Some(StrategyKind::CustomImpl));
    assert_eq!(
        ids(&list(&repository, "findByPriceLessThan", params![50]).await),
        vec!["4", "2", "1"]
    );
}
