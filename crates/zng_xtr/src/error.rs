//! Error types that can be emitted from this library

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Error type for library
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    /// Transparent warpper for [`std::io::Error`]
    #[error(transparent)]
    IOError(#[from] std::io::Error),

    /// Transparent warpper for [`binrw::Error`]
    #[error(transparent)]
    BinRWError(#[from] binrw::Error),

    /// The container or one of its sub-archives is structurally invalid
    #[error(transparent)]
    #[diagnostic(transparent)]
    Format(#[from] FormatError),

    /// A compressed section could not be decoded
    #[error(transparent)]
    #[diagnostic(transparent)]
    Decompress(#[from] DecompressError),

    /// unable to write {path}
    #[error("unable to write {path}")]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// failure while processing section {name}
    #[error("failure while processing section {name}")]
    Section {
        name: String,
        #[source]
        source: Box<Error>,
    },

    /// {0}
    #[error("{0}")]
    CustomError(String),
}

impl Error {
    /// Attach the name of the section being processed
    pub fn in_section(self, name: impl Into<String>) -> Self {
        Error::Section {
            name: name.into(),
            source: Box::new(self),
        }
    }
}

/// Structural problems with the container layout
#[derive(Error, Diagnostic, Debug, PartialEq, Eq)]
pub enum FormatError {
    /// a read of {needed} bytes at offset {offset:#x} runs past the end of a {available} byte buffer
    #[error("a read of {needed} bytes at offset {offset:#x} runs past the end of a {available} byte buffer")]
    #[diagnostic(help("the file is probably truncated or not an XTR container"))]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// section pointer {index} has no known section type
    #[error("section pointer {index} has no known section type")]
    UnknownSectionIndex { index: usize },

    /// malformed sub-archive: {reason}
    #[error("malformed sub-archive: {reason}")]
    MalformedSubArchive { reason: String },

    /// entry {index} points at offset {offset:#x} outside of a {len} byte section
    #[error("entry {index} points at offset {offset:#x} outside of a {len} byte section")]
    EntryOutOfBounds {
        index: usize,
        offset: usize,
        len: usize,
    },
}

/// Failures of the LZSS decoder
#[derive(Error, Diagnostic, Debug, PartialEq, Eq)]
pub enum DecompressError {
    /// compressed input ended after {produced} of {expected} bytes
    #[error("compressed input ended after {produced} of {expected} bytes")]
    SizeMismatch { expected: usize, produced: usize },

    /// {remaining} bytes of compressed input were left unconsumed
    #[error("{remaining} bytes of compressed input were left unconsumed")]
    OverrunInput { remaining: usize },

    /// a back-reference produced {excess} bytes past the declared size
    #[error("a back-reference produced {excess} bytes past the declared size")]
    OutputOverflow { excess: usize },
}

/// Generic result type with crate's Error as its error variant
pub type Result<T> = core::result::Result<T, Error>;
