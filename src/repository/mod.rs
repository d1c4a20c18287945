//! Repository layer: method-name derivation, string templates, named queries
//! and the dispatch that picks one of them per declared method.

pub mod derived;
pub mod dispatch;
pub mod named;
pub mod part_tree;
pub mod simple;
pub mod string_based;
pub mod traits;

pub use derived::{QueryCreator, derive};
pub use dispatch::{
    CustomMethod, Invocation, QueryMethod, QueryResult, RepositoryBuilder, ResultKind,
    SolrRepository, StrategyKind,
};
pub use named::{NamedQueries, canonical_name};
pub use part_tree::{Keyword, OrPart, OrderPart, Part, PartTree, Subject};
pub use simple::SimpleSolrRepository;
pub use string_based::{StringQuery, bind_parameters};
pub use traits::{Pageable, Readable, Writable};
