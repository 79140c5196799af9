//! GraphQL data access for the logistics backend
//!
//! List pages submit a [`FilterSpec`]; the compiler in [`orm`] turns it into a
//! tenant-scoped document for one [`EntitySchema`], and the repository runs it
//! through a [`crate::services::client::GraphqlTransport`].

pub mod entities;
pub mod errors;
pub mod filters;
pub mod orm;
pub mod pagination;
pub mod schema;

pub use errors::{ErrorType, MutationError, MutationResult};
pub use filters::{
    FieldFilter, FilterProperty, FilterSpec, PageRequest, RangeFilter, SortDirection, SortValue,
};
pub use pagination::{ListResult, PaginationEnvelope};
pub use schema::{EntitySchema, FieldDef, FilterKind, KeywordSearch};
