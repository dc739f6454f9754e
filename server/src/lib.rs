//! Questbook ledger: a consistency layer between concurrent commands and the
//! community's shared character spreadsheet.
//!
//! [`Repository`] is the entry point. It resolves the workbook's schema once
//! at [`Repository::connect`], then serializes every read-modify-write
//! against the sheet behind a single lock.

pub mod config;
pub mod error;
pub mod repository;
pub mod schema;

pub use error::LedgerError;
pub use repository::{
    Purchase, Repository, Settlement, DEFAULT_NOTES, DEFAULT_QUANTITY, PURCHASE_NOTES,
};
pub use schema::{SchemaError, SheetSchema, Sheets};
