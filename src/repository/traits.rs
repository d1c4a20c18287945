use async_trait::async_trait;

use crate::{
    document::SolrDocument,
    error::Error,
    query::{Page, PageRequest, Sort, ToQueryValue},
};

/// Lookups by id and over the whole collection.
#[async_trait]
pub trait Readable<T: SolrDocument>: Send + Sync {
    async fn find_by_id<I>(&self, id: I) -> Result<Option<T>, Error>
    where
        I: ToQueryValue + Send + Sync;

    async fn find_all(&self) -> Result<Vec<T>, Error>;

    async fn find_all_by_ids<I>(&self, ids: Vec<I>) -> Result<Vec<T>, Error>
    where
        I: ToQueryValue + Send + Sync;

    async fn count(&self) -> Result<u64, Error>;

    async fn exists_by_id<I>(&self, id: I) -> Result<bool, Error>
    where
        I: ToQueryValue + Send + Sync;
}

#[async_trait]
pub trait Writable<T: SolrDocument>: Send + Sync {
    async fn save(&self, document: &T) -> Result<(), Error>;

    async fn save_all(&self, documents: &[T]) -> Result<(), Error>;

    async fn delete(&self, document: &T) -> Result<(), Error>;

    async fn delete_by_id<I>(&self, id: I) -> Result<(), Error>
    where
        I: ToQueryValue + Send + Sync;

    async fn delete_all(&self) -> Result<(), Error>;
}

#[async_trait]
pub trait Pageable<T: SolrDocument>: Send + Sync {
    async fn find_all_paged(&self, page: PageRequest) -> Result<Page<T>, Error>;

    async fn find_all_sorted(&self, sort: Sort) -> Result<Vec<T>, Error>;
}
