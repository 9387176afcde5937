use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while decoding a variant file.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("could not open input: {0}")]
    Open(#[from] niffler::Error),

    #[error("file doesn't appear to be a BCF file")]
    InvalidMagic,

    #[error("unsupported BCF version {major}.{minor}")]
    UnsupportedVersion { major: u8, minor: u8 },

    #[error("invalid header: {0}")]
    InvalidHeader(String),

    /// The stream ended in the middle of a record.
    #[error("truncated record after {0} complete records")]
    Truncated(u64),

    /// A single record could not be decoded; the stream itself is still usable.
    #[error("malformed record: {0}")]
    MalformedRecord(String),
}

/// A decoded record that violates the minimal shape the extractor relies on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("record at {chrom}:{pos} has no alternate allele")]
pub struct MalformedRecord {
    pub chrom: String,
    /// 1-based position
    pub pos: i64,
}

/// Errors that end a table-building run.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("failed to open input {}: {source}", path.display())]
    InputOpen { path: PathBuf, source: DecodeError },

    #[error("failed to read input: {0}")]
    InputRead(DecodeError),

    #[error("failed to create output {}: {source}", path.display())]
    OutputOpen { path: PathBuf, source: io::Error },

    #[error("failed to write header: {0}")]
    HeaderWrite(io::Error),

    #[error("failed to write row for {chrom}:{pos}: {source}")]
    OutputWrite {
        chrom: String,
        pos: i64,
        source: io::Error,
    },

    #[error("failed to finalize output: {0}")]
    OutputClose(io::Error),
}

pub type Result<T> = std::result::Result<T, DecodeError>;
