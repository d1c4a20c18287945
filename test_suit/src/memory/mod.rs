use std::sync::Arc;

use serde::{Deserialize, Serialize};
use solr_osm::{SolrConfig, SolrDocument, SolrTemplate, adapters::memory::MemoryClient};

pub mod test_repository;
pub mod test_template;

/// Example: catalog product
#[derive(SolrDocument, Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[solr(type_name = "Product")]
pub struct Product {
    pub id: String,
    pub name: String,
    pub popularity: i64,
    pub price: f64,
    #[solr(field = "inStock")]
    pub available: bool,
    #[solr(field = "cat")]
    pub categories: Vec<String>,
    #[solr(nested)]
    pub manufacturer: Option<Manufacturer>,
}

#[derive(SolrDocument, Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Manufacturer {
    pub name: String,
    pub country: String,
}

pub fn product(id: &str, name: &str, popularity: i64, price: f64, available: bool) -> Product {
    Product {
        id: id.to_string(),
        name: name.to_string(),
        popularity,
        price,
        available,
        ..Default::default()
    }
}

/// The catalog every test starts from.
pub fn catalog() -> Vec<Product> {
    let mut products = vec![
        product("1", "solr", 100, 49.5, true),
        product("2", "lucene", 80, 19.0, true),
        product("3", "elastic", 60, 99.0, false),
        product("4", "sphinx", 10, 5.0, true),
        product("5", "solrcloud", 90, 149.0, false),
    ];
    products[0].categories = vec!["search".to_string(), "server".to_string()];
    products[1].categories = vec!["search".to_string(), "library".to_string()];
    products[2].categories = vec!["search".to_string(), "server".to_string()];
    products[3].categories = vec!["search".to_string()];
    products[4].categories = vec!["server".to_string()];
    products[0].manufacturer = Some(Manufacturer {
        name: "apache".to_string(),
        country: "us".to_string(),
    });
    products[1].manufacturer = products[0].manufacturer.clone();
    products[2].manufacturer = Some(Manufacturer {
        name: "elastic".to_string(),
        country: "nl".to_string(),
    });
    products
}

pub fn setup() -> (Arc<MemoryClient>, SolrTemplate) {
    setup_with(SolrConfig::default())
}

pub fn setup_with(config: SolrConfig) -> (Arc<MemoryClient>, SolrTemplate) {
    let client = Arc::new(MemoryClient::new());
    let template = SolrTemplate::with_config(client.clone(), config);
    (client, template)
}
