//! Errors while loading a table or transcoding a file
use std::{io, path::PathBuf};

use displaydoc::Display;
use thiserror::Error;

/// Result type of this crate
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Error when loading a mapping or transcoding a file
#[derive(Debug, Display, Error)]
pub enum Error {
    /// Failed to open mapping file {path:?}
    OpenMapping {
        /// The mapping file
        path: PathBuf,
        /// The underlying error
        #[source]
        source: io::Error,
    },
    /// Failed to read mapping file {path:?}
    ReadMapping {
        /// The mapping file
        path: PathBuf,
        /// The underlying error
        #[source]
        source: MappingError,
    },
    /// Failed to open input file {path:?}
    OpenInput {
        /// The input file
        path: PathBuf,
        /// The underlying error
        #[source]
        source: io::Error,
    },
    /// Failed to create output file {path:?}
    CreateOutput {
        /// The output file
        path: PathBuf,
        /// The underlying error
        #[source]
        source: io::Error,
    },
    /// Input has less than 2 bytes, expected a byte-order mark
    MissingBom,
    /// Input ends with an incomplete code unit at byte {offset}
    TruncatedUnit {
        /// Offset of the dangling byte from the start of the input
        offset: u64,
    },
    /// Failed to read input
    Read(#[source] io::Error),
    /// Failed to write output
    Write(#[source] io::Error),
}

/// Error in the CSV data of a mapping
#[derive(Debug, Display, Error)]
pub enum MappingError {
    /// Bare `"` in unquoted field on line {line}
    BareQuote {
        /// Line of the quote, starting at 1
        line: u64,
    },
    /// Missing or extraneous `"` in quoted field starting on line {line}
    Quote {
        /// Line where the quoted field starts, starting at 1
        line: u64,
    },
    /// Failed to read mapping data
    Io(#[from] io::Error),
    /// Failed to parse CSV records
    Csv(#[from] csv::Error),
}
