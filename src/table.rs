//! The table-building loop: header first, then one row per informative site.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use log::{error, trace, warn};
use noodles_bgzf as bgzf;

use crate::encode::{encode, HEADER};
use crate::error::{DecodeError, ExtractError};
use crate::extract::extract;
use crate::reader::VariantReader;
use crate::record::Record;

/// Destination of the encoded table.
pub trait Sink {
    fn append(&mut self, line: &[u8]) -> io::Result<()>;

    /// Flushes and releases the sink. Called exactly once per run.
    fn close(self) -> io::Result<()>;
}

impl<W: Write> Sink for bgzf::io::Writer<W> {
    fn append(&mut self, line: &[u8]) -> io::Result<()> {
        self.write_all(line)
    }

    fn close(self) -> io::Result<()> {
        self.finish().map(drop)
    }
}

impl Sink for Vec<u8> {
    fn append(&mut self, line: &[u8]) -> io::Result<()> {
        self.extend_from_slice(line);
        Ok(())
    }

    fn close(self) -> io::Result<()> {
        Ok(())
    }
}

/// Counters for one run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TableStats {
    /// Records decoded from the input.
    pub records: u64,
    /// Rows written after the header.
    pub rows: u64,
    /// `<NON_REF>` blocks left out of the table.
    pub reference_blocks: u64,
    /// Records skipped because they could not be decoded or had no ALT allele.
    pub malformed: u64,
}

/// Writes the header and one row per informative record to `sink`.
///
/// Malformed records are skipped. Any other input error, and any write error, stops the
/// run; rows written so far stay in the sink.
pub fn write_table<I, T, S>(records: I, sink: &mut S) -> Result<TableStats, ExtractError>
where
    I: IntoIterator<Item = Result<T, DecodeError>>,
    T: Record,
    S: Sink,
{
    sink.append(HEADER).map_err(ExtractError::HeaderWrite)?;

    let mut stats = TableStats::default();
    for result in records {
        let record = match result {
            Ok(record) => record,
            Err(DecodeError::MalformedRecord(message)) => {
                warn!("skipping malformed record: {}", message);
                stats.malformed += 1;
                continue;
            }
            Err(e) => return Err(ExtractError::InputRead(e)),
        };
        stats.records += 1;

        match extract(&record) {
            Ok(Some(row)) => {
                sink.append(&encode(&row))
                    .map_err(|source| ExtractError::OutputWrite {
                        chrom: row.chrom.clone(),
                        pos: row.pos,
                        source,
                    })?;
                stats.rows += 1;
            }
            Ok(None) => {
                trace!("skipping reference block at {}:{}", record.chrom(), record.pos() + 1);
                stats.reference_blocks += 1;
            }
            Err(e) => {
                warn!("skipping malformed record: {}", e);
                stats.malformed += 1;
            }
        }
    }
    Ok(stats)
}

/// Extracts the metrics table of `input` into a bgzipped file at `output`.
///
/// The output is closed exactly once, also when the run fails.
pub fn run<P: AsRef<Path>, Q: AsRef<Path>>(input: P, output: Q) -> Result<TableStats, ExtractError> {
    let (input, output) = (input.as_ref(), output.as_ref());

    let records = VariantReader::from_path(input).map_err(|source| ExtractError::InputOpen {
        path: input.to_path_buf(),
        source,
    })?;
    let file = File::create(output).map_err(|source| ExtractError::OutputOpen {
        path: output.to_path_buf(),
        source,
    })?;
    let mut sink = bgzf::io::Writer::new(file);

    let result = write_table(records, &mut sink);
    match (result, sink.close()) {
        (Ok(stats), Ok(())) => Ok(stats),
        (Ok(_), Err(e)) => Err(ExtractError::OutputClose(e)),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(close_error)) => {
            error!("failed to close {}: {}", output.display(), close_error);
            Err(e)
        }
    }
}
