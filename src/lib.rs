//! Fluxo - client registry spreadsheet pipeline
//!
//! This library reads the shared client workbooks (registry, departures and
//! products), locates their header rows, maps columns to canonical fields,
//! merges rows describing the same company and writes the fixed-layout
//! intake and billing reports for an economic group.

pub mod config;
pub mod dates;
pub mod db;
pub mod error;
pub mod importers;
pub mod reports;
pub mod sheet;
pub mod sync;
pub mod utils;
