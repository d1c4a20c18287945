use std::{marker::PhantomData, sync::Arc};

use async_trait::async_trait;

use crate::{
    SolrTemplate,
    adapters::DocumentRecord,
    document::{EntityMetadata, SolrDocument},
    error::Error,
    query::{Criteria, Field, Page, PageRequest, Query, Sort, ToQueryValue},
    repository::traits::{Pageable, Readable, Writable},
};

/// CRUD over one document type.
pub struct SimpleSolrRepository<T> {
    template: SolrTemplate,
    meta: Arc<EntityMetadata>,
    id_field: Field,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for SimpleSolrRepository<T> {
    fn clone(&self) -> Self {
        Self {
            template: self.template.clone(),
            meta: self.meta.clone(),
            id_field: self.id_field.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: SolrDocument> SimpleSolrRepository<T> {
    pub fn new(template: SolrTemplate) -> Result<Self, Error> {
        let meta = EntityMetadata::of::<T>()?;
        let id_field = Field::new(meta.id_property().field_name.clone())?;
        Ok(Self {
            template,
            meta,
            id_field,
            _marker: PhantomData,
        })
    }

    pub fn template(&self) -> &SolrTemplate {
        &self.template
    }

    pub fn metadata(&self) -> &EntityMetadata {
        &self.meta
    }

    pub fn id_field(&self) -> &Field {
        &self.id_field
    }

    /// Fetches every match by counting first and then reading one page of that size.
    pub async fn find_all_matching(&self, query: Query) -> Result<Vec<T>, Error> {
        let total = self.template.count::<T>(&query).await?;
        if total == 0 {
            return Ok(Vec::new());
        }
        let size = u32::try_from(total).unwrap_or(u32::MAX);
        let page = self
            .template
            .query_for_page::<T>(&query.with_page(PageRequest::of_offset(0, size)?))
            .await?;
        Ok(page.into_content())
    }

    pub(crate) async fn commit_if_configured(&self) -> Result<(), Error> {
        if self.template.config().commit_on_write {
            self.template.commit().await?;
        }
        Ok(())
    }

    fn by_id(&self, id: impl ToQueryValue) -> Query {
        Query::new(Criteria::new(self.id_field.clone()).is(id))
    }
}

#[async_trait]
impl<T: SolrDocument> Readable<T> for SimpleSolrRepository<T> {
    async fn find_by_id<I>(&self, id: I) -> Result<Option<T>, Error>
    where
        I: ToQueryValue + Send + Sync,
    {
        self.template.query_for_object(&self.by_id(id)).await
    }

    async fn find_all(&self) -> Result<Vec<T>, Error> {
        self.find_all_matching(Query::match_all()).await
    }

    async fn find_all_by_ids<I>(&self, ids: Vec<I>) -> Result<Vec<T>, Error>
    where
        I: ToQueryValue + Send + Sync,
    {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let size = u32::try_from(ids.len()).unwrap_or(u32::MAX);
        let query = Query::new(Criteria::new(self.id_field.clone()).in_values(ids)?)
            .with_page(PageRequest::of_offset(0, size)?);
        Ok(self.template.query_for_page(&query).await?.into_content())
    }

    async fn count(&self) -> Result<u64, Error> {
        self.template.count::<T>(&Query::match_all()).await
    }

    async fn exists_by_id<I>(&self, id: I) -> Result<bool, Error>
    where
        I: ToQueryValue + Send + Sync,
    {
        Ok(self.template.count::<T>(&self.by_id(id)).await? > 0)
    }
}

#[async_trait]
impl<T: SolrDocument> Writable<T> for SimpleSolrRepository<T> {
    async fn save(&self, document: &T) -> Result<(), Error> {
        self.template.save_document(document).await?;
        self.commit_if_configured().await
    }

    async fn save_all(&self, documents: &[T]) -> Result<(), Error> {
        self.template.save_documents(documents).await?;
        self.commit_if_configured().await
    }

    async fn delete(&self, document: &T) -> Result<(), Error> {
        let record = DocumentRecord::from_document_with(document, &self.meta)?;
        let id = record.value_string(self.id_field.name()).ok_or_else(|| {
            Error::invalid_usage(format!("cannot delete a '{}' without an id", T::TYPE))
        })?;
        self.template.delete_by_ids(vec![id]).await?;
        self.commit_if_configured().await
    }

    async fn delete_by_id<I>(&self, id: I) -> Result<(), Error>
    where
        I: ToQueryValue + Send + Sync,
    {
        self.template.delete_by_id(id).await?;
        self.commit_if_configured().await
    }

    async fn delete_all(&self) -> Result<(), Error> {
        self.template.delete_by_query(&Query::match_all()).await?;
        self.commit_if_configured().await
    }
}

#[async_trait]
impl<T: SolrDocument> Pageable<T> for SimpleSolrRepository<T> {
    async fn find_all_paged(&self, page: PageRequest) -> Result<Page<T>, Error> {
        self.template
            .query_for_page(&Query::match_all().with_page(page))
            .await
    }

    async fn find_all_sorted(&self, sort: Sort) -> Result<Vec<T>, Error> {
        self.find_all_matching(Query::match_all().add_sort(sort)).await
    }
}
