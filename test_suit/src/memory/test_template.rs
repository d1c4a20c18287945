#[cfg(test)]
use super::*;
#[cfg(test)]
use solr_osm::{
    Criteria, Error, FacetPage, FacetQuery, Field, Page, Query, QueryParser,
    query::{Direction, FacetOptions, PageRequest, Sort},
};

#[cfg(test)]
async fn seeded() -> (Arc<MemoryClient>, SolrTemplate) {
    let (client, template) = setup();
    if let Err(err) = template.save_documents(&catalog()).await {
        panic!("Error: {:#?}", err);
    }
    template.commit().await.unwrap();
    (client, template)
}

#[tokio::test]
async fn test_writes_are_visible_after_commit() {
    let (client, template) = setup();

    template
        .save_document(&product("9", "tantivy", 70, 0.0, true))
        .await
        .unwrap();
    assert_eq!(client.pending_count().await, 1);

    let query = Query::new(Criteria::where_field("name").unwrap().is("tantivy"));
    let before: Option<Product> = template.query_for_object(&query).await.unwrap();
    assert!(before.is_none());

    template.commit().await.unwrap();
    let after: Option<Product> = template.query_for_object(&query).await.unwrap();
    assert_eq!(after.unwrap().id, "9");
}

#[tokio::test]
async fn test_rollback_discards_staged_writes() {
    let (client, template) = seeded().await;

    template
        .save_document(&product("9", "tantivy", 70, 0.0, true))
        .await
        .unwrap();
    template.delete_by_id("1").await.unwrap();
    template.rollback().await.unwrap();
    template.commit().await.unwrap();

    assert_eq!(client.committed_count().await, 5);
    assert_eq!(template.count::<Product>(&Query::match_all()).await.unwrap(), 5);
}

#[tokio::test]
async fn test_criteria_against_mapped_fields() {
    let (client, template) = seeded().await;

    let criteria = Criteria::where_field("inStock")
        .unwrap()
        .is(true)
        .and("manufacturer.name")
        .unwrap()
        .is("apache");
    assert_eq!(
        QueryParser::compile(&criteria),
        "inStock:true AND manufacturer.name:apache"
    );

    let query = Query::new(criteria)
        .add_sort(Sort::by(Field::new("price").unwrap(), Direction::Asc));
    let page: Page<Product> = template.query_for_page(&query).await.unwrap();
    let ids: Vec<_> = page.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["2", "1"]);

    let request = client.last_request().await.unwrap();
    assert_eq!(request.sort, vec!["price asc".to_string()]);
}

#[tokio::test]
async fn test_paging_and_filter_queries() {
    let (_, template) = seeded().await;

    let query = Query::new(Criteria::where_field("cat").unwrap().is("search"))
        .add_filter_query(Query::new(Criteria::where_field("inStock").unwrap().is(true)))
        .with_page(PageRequest::new(1, 2).unwrap());
    let page: Page<Product> = template.query_for_page(&query).await.unwrap();

    assert_eq!(page.total_elements(), 3);
    assert_eq!(page.total_pages(), 2);
    assert_eq!(page.number(), 1);
    assert!(!page.has_next());
    assert_eq!(page.content()[0].id, "4");
}

#[tokio::test]
async fn test_facets_over_categories() {
    let (_, template) = seeded().await;

    let query = FacetQuery::new(Query::match_all()).with_facet_options(
        FacetOptions::new(vec![Field::new("cat").unwrap()]).with_min_count(2),
    );
    let page: FacetPage<Product> = template.query_for_facet_page(&query).await.unwrap();
    let facets = page.facet_result_page(&Field::new("cat").unwrap()).unwrap();

    let counts: Vec<_> = facets
        .iter()
        .map(|entry| (entry.value.as_str(), entry.count))
        .collect();
    assert_eq!(counts, vec![("search", 4), ("server", 3)]);
    assert_eq!(page.total_elements(), 5);
}

#[tokio::test]
async fn test_transport_failures_surface_as_execution_errors() {
    let (client, template) = seeded().await;
    client.push_failure("503 service unavailable").await;

    match template.count::<Product>(&Query::match_all()).await {
        Err(Error::Execution { message, .. }) => assert!(message.contains("503")),
        other => panic!("unexpected: {:?}", other),
    }
}
