//! Reading Eurostat SDMX datasets with predicate pushdown.
//!
//! A scan binds to a dataset through its dimension catalog, encodes a
//! predicate into upstream filter paths, fetches and merges the TSV responses,
//! and pages the resulting observations out in batches.

pub mod batch;
pub mod catalog;
pub mod config;
pub mod dataflow;
pub mod endpoint;
pub mod fault;
pub mod fetch;
pub mod filter;
pub mod geo;
pub mod predicate;
pub mod projections;
pub mod scan;
pub mod table;
pub mod tsv;

pub(crate) mod request;

#[cfg(test)]
mod testutil;
