//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - DuckDB for the StoreDirectory and RecordStore ports
//! - calamine / csv for decoding uploaded workbooks
//! - an in-memory store for unit tests

pub mod duckdb;
pub mod workbook;

#[cfg(test)]
pub mod memory;
