mod memory;

mod test_mapping {
    use serde::{Deserialize, Serialize};
    use solr_osm::{DocumentRecord, EntityMetadata, SolrDocument};

    #[derive(SolrDocument, Serialize, Deserialize, Debug, Clone, PartialEq)]
    #[solr(type_name = "Article")]
    #[serde(rename_all = "camelCase")]
    pub struct Article {
        #[solr(id)]
        pub slug: String,
        pub page_title: String,
        #[solr(field = "body_txt")]
        pub body: String,
        #[serde(rename = "author")]
        #[solr(nested)]
        pub written_by: Option<Author>,
        #[serde(skip)]
        pub cached_html: String,
    }

    #[derive(SolrDocument, Serialize, Deserialize, Debug, Clone, PartialEq)]
    pub struct Author {
        pub name: String,
        #[solr(field = "mail_s")]
        pub email: String,
    }

    #[test]
    fn derive_follows_serde_names() {
        assert_eq!(Article::TYPE, "Article");
        assert_eq!(Author::TYPE, "Author");

        let names: Vec<_> = Article::properties().iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["slug", "pageTitle", "body", "author"]);

        let meta = EntityMetadata::of::<Article>().unwrap();
        assert_eq!(meta.id_property().name, "slug");
        assert_eq!(meta.id_property().field_name, "slug");
        assert_eq!(
            meta.resolve_path("AuthorEmail").unwrap().field_name,
            "author.mail_s"
        );
        assert_eq!(meta.resolve_path("PageTitle").unwrap().field_name, "pageTitle");
        assert_eq!(meta.resolve_path("Body").unwrap().field_name, "body_txt");
    }

    #[test]
    fn derived_mapping_round_trips_through_records() {
        let article = Article {
            slug: "hello".to_string(),
            page_title: "Hello".to_string(),
            body: "first post".to_string(),
            written_by: Some(Author {
                name: "ann".to_string(),
                email: "ann@example.com".to_string(),
            }),
            cached_html: String::new(),
        };

        let record = DocumentRecord::from_document(&article).unwrap();
        assert_eq!(record.value_string("body_txt").as_deref(), Some("first post"));
        assert_eq!(
            record.value_string("author.mail_s").as_deref(),
            Some("ann@example.com")
        );
        assert!(record.get("cachedHtml").is_none());

        let back: Article = record.to_document().unwrap();
        assert_eq!(back, article);
    }
}
