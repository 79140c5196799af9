//! Freightline data-access core
//!
//! Compiles sparse list-page filter state into tenant-scoped GraphQL
//! documents, binds their variables, executes them and unwraps the paginated
//! results. Writes go through optimistic-concurrency and uniqueness checks.

pub mod config;
pub mod graphql;
pub mod services;
