#![warn(missing_docs)]
//! # Character substitution for UTF-16LE text
//!
//! This crate rewrites text files stored as UTF-16 (little endian, with a
//! byte-order mark), replacing single characters according to a table that
//! is loaded from a CSV file of hexadecimal code points:
//!
//! ```text
//! 4E2D,56FD
//! 9AD8,9AD9
//! ```
//!
//! Loading the table is done by [`SubstitutionTable::load`], the rewrite
//! itself by [`Transcoder`].

mod error;
pub mod table;
pub mod utf16le;

pub use error::{Error, MappingError, Result};
pub use table::SubstitutionTable;
pub use utf16le::{Stats, Transcoder};
