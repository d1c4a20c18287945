pub mod criteria;
pub mod field;
pub mod model;
pub mod page;
pub mod parser;
pub mod value;

pub use criteria::{Conjunction, Criteria, FieldCriteria, Link, Node, Predicate};
pub use field::{Field, WILDCARD};
pub use model::{Direction, FacetOptions, FacetQuery, Order, PageRequest, Query, Sort};
pub use page::{FacetEntry, FacetPage, Page};
pub use parser::QueryParser;
pub use value::{QueryValue, ToQueryValue};
