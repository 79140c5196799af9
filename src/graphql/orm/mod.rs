//! Filter-to-query compiler
//!
//! A list request flows through this module as a stateless pipeline:
//!
//! 1. [`normalize`] trims the UI filter state
//! 2. [`build_fragments`] turns it into filter fragments for one schema
//! 3. the assembler wraps the fragments in an operation envelope
//! 4. [`bind`] produces the variable map for the declared variables
//! 5. [`Repository`] executes the request and unwraps the collection
//!
//! Nothing is cached between calls.

pub mod assembler;
pub mod binder;
pub mod builder;
pub mod fragment;
pub mod normalize;
pub mod repository;
pub mod validate;

pub use assembler::{
    CompileOptions, CompiledQuery, ENVELOPE_VARIABLES, OperationKind, compile_create,
    compile_exclusivity_probe, compile_list, compile_single, compile_soft_delete,
    compile_uniqueness_probe, compile_update,
};
pub use binder::{ParameterMap, bind};
pub use builder::{FilterFragments, build_fragments, is_numeric_keyword};
pub use fragment::{Fragment, ScalarType, Transform, VarType, Variable};
pub use normalize::normalize;
pub use repository::{MutationOutcome, Repository, same_timestamp};
pub use validate::{DocumentError, VariableUsage, inspect};
