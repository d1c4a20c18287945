//! # solr_osm
//!
//! An Object-Search-Mapper for Solr: the search-engine counterpart of an ORM.
//!
//! ## What's inside
//!
//! ### Criteria and query model
//! [`Criteria`](query::Criteria) chains predicates on fields with AND/OR and
//! nested groups. [`QueryParser`](query::QueryParser) compiles them to the
//! Solr query language, quoting phrases and placing wildcards.
//!
//! ### Derived repository queries
//! Repository methods named like `findByNameAndPriceGreaterThan` are parsed
//! into a [`PartTree`](repository::PartTree), resolved against the entity's
//! field mapping and turned into queries. Methods can instead carry an
//! explicit `?0`-style template, come from a named-query catalog, or be
//! implemented by hand.
//!
//! ### Typed execution
//! [`SolrTemplate`] runs compiled queries through any [`SolrClient`] and maps
//! the returned documents back into your types.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use solr_osm::{SolrDocument, SolrTemplate, adapters::memory::MemoryClient};
//! use solr_osm::repository::{QueryMethod, RepositoryBuilder};
//!
//! #[derive(SolrDocument, Serialize, Deserialize)]
//! struct Product {
//!     id: String,
//!     name: String,
//!     #[solr(field = "inStock")]
//!     available: bool,
//! }
//!
//! let template = SolrTemplate::new(Arc::new(MemoryClient::new()));
//! let repository = RepositoryBuilder::<Product>::new(template)
//!     .method(QueryMethod::new("findByAvailableTrue"))
//!     .build()?;
//!
//! let in_stock = repository.invoke("findByAvailableTrue", Invocation::new()).await?;
//! ```
//!
//! ## Feature flags
//!
//! | Flag     | Default | Description                           |
//! |----------|---------|---------------------------------------|
//! | `derive` | ✓       | `#[derive(SolrDocument)]`             |
//! | `memory` | ✓       | In-process client for tests            |

extern crate self as solr_osm;

pub mod adapters;
pub mod config;
pub mod document;
pub mod error;
pub mod query;
pub mod repository;

use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, histogram};

pub use crate::adapters::{DocumentRecord, SolrClient, SolrRequest, SolrResponse};
pub use crate::config::SolrConfig;
pub use crate::document::{EntityMetadata, PropertyDescriptor, SolrDocument};
pub use crate::error::Error;
pub use crate::query::{
    Criteria, FacetEntry, FacetPage, FacetQuery, Field, Page, Query, QueryParser, QueryValue,
    ToQueryValue,
};

#[cfg(feature = "derive")]
pub use solr_osm_derive::SolrDocument;

/// Executes compiled queries and writes through a [`SolrClient`].
///
/// Cheap to clone; clones share the client.
#[derive(Clone)]
pub struct SolrTemplate {
    inner: Arc<Inner>,
}

struct Inner {
    client: Arc<dyn SolrClient>,
    config: SolrConfig,
}

impl SolrTemplate {
    pub fn new(client: Arc<dyn SolrClient>) -> Self {
        Self::with_config(client, SolrConfig::default())
    }

    pub fn with_config(client: Arc<dyn SolrClient>, config: SolrConfig) -> Self {
        Self {
            inner: Arc::new(Inner { client, config }),
        }
    }

    pub fn config(&self) -> &SolrConfig {
        &self.inner.config
    }

    pub fn client(&self) -> &Arc<dyn SolrClient> {
        &self.inner.client
    }

    async fn execute(
        &self,
        type_name: &'static str,
        request: SolrRequest,
    ) -> Result<SolrResponse, Error> {
        tracing::debug!(
            target: "solr_osm::template",
            type_name,
            q = %request.q,
            fq = ?request.fq,
            start = ?request.start,
            rows = ?request.rows,
            "executing query"
        );

        let start = Instant::now();
        let response = self.inner.client.query(request).await.map_err(|err| {
            tracing::warn!(target: "solr_osm::template", type_name, error = %err, "query failed");
            Error::execution(err)
        })?;
        histogram!("solr_osm.query.duration_ms",
            "type" => type_name
        )
        .record(start.elapsed().as_millis() as f64);

        Ok(response)
    }

    // ==================== Reads ====================

    /// First document matching `query`, or `None`.
    pub async fn query_for_object<T: SolrDocument>(
        &self,
        query: &Query,
    ) -> Result<Option<T>, Error> {
        let request = QueryParser::construct_request(query)?.with_rows(1);
        let response = self.execute(T::TYPE, request).await?;
        let meta = EntityMetadata::of::<T>()?;
        response
            .documents
            .into_iter()
            .next()
            .map(|record| record.to_document_with(&meta))
            .transpose()
    }

    pub async fn query_for_page<T: SolrDocument>(&self, query: &Query) -> Result<Page<T>, Error> {
        let request = QueryParser::construct_request(query)?;
        let response = self.execute(T::TYPE, request).await?;
        let meta = EntityMetadata::of::<T>()?;
        let content = response
            .documents
            .into_iter()
            .map(|record| record.to_document_with(&meta))
            .collect::<Result<Vec<T>, Error>>()?;
        Ok(Page::new(content, query.page(), response.num_found))
    }

    /// Page of results plus one facet page per requested facet field.
    pub async fn query_for_facet_page<T: SolrDocument>(
        &self,
        query: &FacetQuery,
    ) -> Result<FacetPage<T>, Error> {
        let request = QueryParser::construct_facet_request(query)?;
        let mut response = self.execute(T::TYPE, request).await?;
        let meta = EntityMetadata::of::<T>()?;

        let facet_fields = std::mem::take(&mut response.facet_fields);
        let content = response
            .documents
            .into_iter()
            .map(|record| record.to_document_with(&meta))
            .collect::<Result<Vec<T>, Error>>()?;

        let mut page = FacetPage::new(Page::new(
            content,
            query.query().page(),
            response.num_found,
        ));

        if let Some(options) = query.facet_options() {
            for field in options.fields() {
                let entries: Vec<FacetEntry> = facet_fields
                    .get(field.name())
                    .map(|counts| {
                        counts
                            .iter()
                            .map(|(value, count)| FacetEntry {
                                field: field.clone(),
                                value: value.clone(),
                                count: *count,
                            })
                            .collect()
                    })
                    .unwrap_or_default();
                let total = entries.len() as u64;
                page.add_facet_result_page(field.clone(), Page::new(entries, None, total));
            }
        }

        Ok(page)
    }

    pub async fn count<T: SolrDocument>(&self, query: &Query) -> Result<u64, Error> {
        let mut request = QueryParser::construct_request(query)?.with_rows(0);
        request.start = None;
        request.sort.clear();
        let response = self.execute(T::TYPE, request).await?;
        Ok(response.num_found)
    }

    // ==================== Writes ====================

    pub async fn save_document<T: SolrDocument>(&self, document: &T) -> Result<(), Error> {
        self.save_documents(std::slice::from_ref(document)).await
    }

    pub async fn save_documents<T: SolrDocument>(&self, documents: &[T]) -> Result<(), Error> {
        if documents.is_empty() {
            return Ok(());
        }
        let meta = EntityMetadata::of::<T>()?;
        let records = documents
            .iter()
            .map(|doc| DocumentRecord::from_document_with(doc, &meta))
            .collect::<Result<Vec<_>, Error>>()?;

        let count = records.len() as u64;
        self.inner.client.add(records).await.map_err(|err| {
            tracing::warn!(
                target: "solr_osm::template",
                type_name = T::TYPE,
                error = %err,
                "add failed"
            );
            Error::execution(err)
        })?;
        counter!("solr_osm.write.documents", "type" => T::TYPE).increment(count);
        Ok(())
    }

    pub async fn delete_by_id(&self, id: impl ToQueryValue) -> Result<(), Error> {
        self.delete_by_ids(vec![id.to_query_value().to_string()]).await
    }

    pub async fn delete_by_ids(&self, ids: Vec<String>) -> Result<(), Error> {
        if ids.is_empty() {
            return Ok(());
        }
        tracing::debug!(target: "solr_osm::template", count = ids.len(), "deleting by id");
        self.inner
            .client
            .delete_by_id(ids)
            .await
            .map_err(Error::execution)
    }

    pub async fn delete_by_query(&self, query: &Query) -> Result<(), Error> {
        let request = QueryParser::construct_request(query)?;
        tracing::debug!(target: "solr_osm::template", q = %request.q, "deleting by query");
        self.inner
            .client
            .delete_by_query(request.q)
            .await
            .map_err(Error::execution)
    }

    pub async fn commit(&self) -> Result<(), Error> {
        self.inner.client.commit().await.map_err(Error::execution)
    }

    pub async fn rollback(&self) -> Result<(), Error> {
        self.inner.client.rollback().await.map_err(Error::execution)
    }
}

#[cfg(all(test, feature = "memory"))]
mod tests {
    use super::*;
    use crate::adapters::memory::MemoryClient;
    use crate::query::{FacetOptions, PageRequest};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        id: String,
        title: String,
        tags: Vec<String>,
    }

    impl SolrDocument for Note {
        const TYPE: &'static str = "Note";

        fn properties() -> &'static [PropertyDescriptor] {
            const PROPERTIES: &[PropertyDescriptor] = &[
                PropertyDescriptor::new("id"),
                PropertyDescriptor::new("title").field("title_s"),
                PropertyDescriptor::new("tags"),
            ];
            PROPERTIES
        }
    }

    fn note(id: &str, title: &str, tags: &[&str]) -> Note {
        Note {
            id: id.to_string(),
            title: title.to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    async fn template() -> (Arc<MemoryClient>, SolrTemplate) {
        let client = Arc::new(MemoryClient::new());
        let template = SolrTemplate::new(client.clone());
        template
            .save_documents(&[
                note("1", "rust", &["lang", "systems"]),
                note("2", "solr", &["search"]),
                note("3", "lucene", &["search", "lang"]),
            ])
            .await
            .unwrap();
        template.commit().await.unwrap();
        (client, template)
    }

    #[tokio::test]
    async fn query_for_object_limits_rows() {
        let (client, template) = template().await;
        let query = Query::new(Criteria::where_field("title_s").unwrap().is("solr"));
        let found: Option<Note> = template.query_for_object(&query).await.unwrap();
        assert_eq!(found.unwrap().id, "2");
        assert_eq!(client.last_request().await.unwrap().rows, Some(1));

        let missing: Option<Note> = template
            .query_for_object(&Query::new(Criteria::where_field("title_s").unwrap().is("go")))
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn pages_and_counts() {
        let (_, template) = template().await;
        let query = Query::new(Criteria::where_field("tags").unwrap().is("search"))
            .with_page(PageRequest::new(0, 1).unwrap());
        let page: Page<Note> = template.query_for_page(&query).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page.total_elements(), 2);
        assert!(page.has_next());

        assert_eq!(template.count::<Note>(&Query::match_all()).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn facet_pages_have_an_entry_per_field() {
        let (_, template) = template().await;
        let query = FacetQuery::new(Query::match_all()).with_facet_options(FacetOptions::new(vec![
            Field::new("tags").unwrap(),
            Field::new("missing").unwrap(),
        ]));
        let page: FacetPage<Note> = template.query_for_facet_page(&query).await.unwrap();
        let tags = page.facet_result_page(&Field::new("tags").unwrap()).unwrap();
        assert_eq!(tags.content()[0].value, "lang");
        assert_eq!(tags.content()[0].count, 2);
        assert!(
            page.facet_result_page(&Field::new("missing").unwrap())
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn client_failures_are_wrapped() {
        let (client, template) = template().await;
        client.push_failure("connection reset").await;
        let err = template
            .query_for_page::<Note>(&Query::match_all())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Execution { .. }));
    }

    #[tokio::test]
    async fn deletes() {
        let (client, template) = template().await;
        template.delete_by_id("1").await.unwrap();
        template
            .delete_by_query(&Query::new(Criteria::where_field("title_s").unwrap().is("solr")))
            .await
            .unwrap();
        template.commit().await.unwrap();
        assert_eq!(client.committed_count().await, 1);
    }

    #[tokio::test]
    async fn query_without_criteria_is_rejected() {
        let (_, template) = template().await;
        let err = template
            .query_for_page::<Note>(&Query::default())
            .await
            .unwrap_err();
        assert!(err.is_invalid_usage());
    }
}
