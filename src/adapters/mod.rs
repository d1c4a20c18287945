#[cfg(feature = "memory")]
pub mod memory;

pub mod record;

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use record::*;

use crate::error::BoxError;

/// -----------------------------
/// Client contract
/// -----------------------------

/// Transport to a Solr core. Implementations own connection handling,
/// retries and timeouts; every call resolves to a complete response.
#[async_trait]
pub trait SolrClient: Send + Sync {
    async fn query(&self, request: SolrRequest) -> Result<SolrResponse, BoxError>;

    async fn add(&self, documents: Vec<DocumentRecord>) -> Result<(), BoxError>;

    async fn delete_by_id(&self, ids: Vec<String>) -> Result<(), BoxError>;

    async fn delete_by_query(&self, query: String) -> Result<(), BoxError>;

    async fn commit(&self) -> Result<(), BoxError>;

    async fn rollback(&self) -> Result<(), BoxError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetParams {
    pub fields: Vec<String>,
    pub limit: u32,
    pub min_count: u32,
}

/// Compiled request parameters for a `/select` call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolrRequest {
    pub q: String,
    pub fq: Vec<String>,
    pub fl: Vec<String>,
    pub start: Option<u64>,
    pub rows: Option<u32>,
    pub sort: Vec<String>,
    pub group_fields: Vec<String>,
    pub facet: Option<FacetParams>,
}

impl SolrRequest {
    pub fn new(q: impl Into<String>) -> Self {
        Self {
            q: q.into(),
            ..Default::default()
        }
    }

    pub fn with_rows(mut self, rows: u32) -> Self {
        self.rows = Some(rows);
        self
    }

    /// Flattens the request into Solr query parameters.
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = vec![("q".to_string(), self.q.clone())];

        for fq in &self.fq {
            params.push(("fq".to_string(), fq.clone()));
        }
        if !self.fl.is_empty() {
            params.push(("fl".to_string(), self.fl.join(",")));
        }
        if let Some(start) = self.start {
            params.push(("start".to_string(), start.to_string()));
        }
        if let Some(rows) = self.rows {
            params.push(("rows".to_string(), rows.to_string()));
        }
        if !self.sort.is_empty() {
            params.push(("sort".to_string(), self.sort.join(",")));
        }
        if !self.group_fields.is_empty() {
            params.push(("group".to_string(), "true".to_string()));
            for field in &self.group_fields {
                params.push(("group.field".to_string(), field.clone()));
            }
        }
        if let Some(facet) = &self.facet {
            params.push(("facet".to_string(), "true".to_string()));
            for field in &facet.fields {
                params.push(("facet.field".to_string(), field.clone()));
            }
            params.push(("facet.limit".to_string(), facet.limit.to_string()));
            params.push(("facet.mincount".to_string(), facet.min_count.to_string()));
        }

        params
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SolrResponse {
    pub num_found: u64,
    pub documents: Vec<DocumentRecord>,
    /// Facet field -> (value, count) in server order.
    pub facet_fields: BTreeMap<String, Vec<(String, u64)>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_in_solr_order() {
        let mut request = SolrRequest::new("name:x").with_rows(5);
        request.fq.push("inStock:true".to_string());
        request.sort = vec!["price asc".to_string(), "name desc".to_string()];
        request.facet = Some(FacetParams {
            fields: vec!["cat".to_string()],
            limit: 10,
            min_count: 1,
        });

        let params = request.to_params();
        assert_eq!(params[0], ("q".to_string(), "name:x".to_string()));
        assert!(params.contains(&("fq".to_string(), "inStock:true".to_string())));
        assert!(params.contains(&("rows".to_string(), "5".to_string())));
        assert!(params.contains(&("sort".to_string(), "price asc,name desc".to_string())));
        assert!(params.contains(&("facet.field".to_string(), "cat".to_string())));
        assert!(!params.iter().any(|(k, _)| k == "start"));
    }
}
