//! Translation of predicates into upstream filter paths.
//!
//! A predicate is encoded into a set of branches, each holding a mask of
//! allowed values per dimension along with an optional time range. Every
//! branch renders to one distinct request.

pub mod branch;
pub mod encoder;
pub mod query;

pub use branch::{FilterBranch, FilterBranchSet, MaskEntry};
pub use encoder::encode_predicate;
pub use query::{EncodedFilters, data_query_url, render_branch};
