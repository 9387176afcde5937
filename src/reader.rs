use std::fmt;
use std::io::{self, BufRead, BufReader, Cursor, Read};
use std::mem::size_of;
use std::path::Path;
use std::rc::Rc;

use log::debug;

use crate::error::{DecodeError, Result};
use crate::header::Header;
use crate::parser::{self, describe};
use crate::record::{BcfRecord, Record, VcfRecord};

const BCF_MAJOR_VERSION: u8 = 2;
const BCF_MAGIC: &[u8] = b"BCF";

/// Streams the records of a BCF 2.x file.
pub struct BcfRecords<R: Read> {
    header: Rc<Header>,
    length_buf: [u8; size_of::<u32>() * 2],
    record_buf: Vec<u8>,
    n_records: u64,
    inner: R,
}

impl<R: Read> BcfRecords<R> {
    pub fn header(&self) -> &Header {
        self.header.as_ref()
    }
}

impl<R: Read> BcfRecords<R> {
    /// Reads the magic and the header; the reader is left at the first record.
    pub fn new(mut reader: R) -> Result<Self> {
        let mut input = [0u8; 5];
        reader.read_exact(&mut input)?;
        let (_, version) =
            parser::bcf_version(&input).map_err(|_| DecodeError::InvalidMagic)?;
        if version.major != BCF_MAJOR_VERSION {
            return Err(DecodeError::UnsupportedVersion {
                major: version.major,
                minor: version.minor,
            });
        }

        let mut input = [0u8; size_of::<u32>()];
        reader.read_exact(&mut input)?;
        let (_, header_length) = parser::header_length(&input)
            .map_err(|e| DecodeError::InvalidHeader(describe(e)))?;

        let mut input = vec![0u8; header_length as usize];
        reader.read_exact(&mut input)?;
        let text = std::str::from_utf8(&input)
            .map_err(|e| DecodeError::InvalidHeader(e.to_string()))?;
        let header = Header::parse(text)?;

        Ok(Self {
            header: Rc::new(header),
            length_buf: [0u8; size_of::<u32>() * 2],
            record_buf: Vec::new(),
            n_records: 0,
            inner: reader,
        })
    }

    fn read_record(&mut self) -> Result<Option<BcfRecord>> {
        match read_fully(&mut self.inner, &mut self.length_buf)? {
            0 => return Ok(None),
            n if n < self.length_buf.len() => return Err(DecodeError::Truncated(self.n_records)),
            _ => {}
        }
        let (_, (l_shared, l_indiv)) = parser::record_length(&self.length_buf)
            .map_err(|e| DecodeError::MalformedRecord(describe(e)))?;
        let l_shared = l_shared as usize;
        self.record_buf.resize(l_shared + l_indiv as usize, 0);
        if read_fully(&mut self.inner, &mut self.record_buf)? < self.record_buf.len() {
            return Err(DecodeError::Truncated(self.n_records));
        }
        self.n_records += 1;

        let (shared, indiv) = self.record_buf.split_at(l_shared);
        BcfRecord::decode(shared, indiv, self.header.clone())
            .map(Some)
            .map_err(|e| match e {
                DecodeError::MalformedRecord(message) => DecodeError::MalformedRecord(format!(
                    "BCF record {}: {}",
                    self.n_records, message
                )),
                e => e,
            })
    }
}

/// Reads until `buf` is full or the stream ends; returns the number of bytes read.
fn read_fully<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

impl<R: Read> Iterator for BcfRecords<R> {
    type Item = Result<BcfRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_record().transpose()
    }
}

/// Streams the records of a VCF text file.
pub struct VcfRecords<R: BufRead> {
    header: Rc<Header>,
    line_buf: Vec<u8>,
    line_number: usize,
    inner: R,
}

impl<R: BufRead> VcfRecords<R> {
    /// Reads header lines up to and including `#CHROM`.
    pub fn new(mut reader: R) -> Result<Self> {
        let mut text = String::new();
        let mut line_number = 0;
        loop {
            let n = reader.read_line(&mut text)?;
            if n == 0 {
                return Err(DecodeError::InvalidHeader(
                    "reached end of file before #CHROM line".to_owned(),
                ));
            }
            line_number += 1;
            let last_line = text[text.len() - n..].trim_start();
            if last_line.starts_with("#CHROM") {
                break;
            }
            if !last_line.starts_with("##") && !last_line.trim().is_empty() {
                return Err(DecodeError::InvalidHeader(format!(
                    "line {} is neither a meta line nor the #CHROM line",
                    line_number
                )));
            }
        }
        let header = Header::parse(&text)?;

        Ok(Self {
            header: Rc::new(header),
            line_buf: Vec::new(),
            line_number,
            inner: reader,
        })
    }

    pub fn header(&self) -> &Header {
        self.header.as_ref()
    }

    fn read_record(&mut self) -> Result<Option<VcfRecord>> {
        loop {
            self.line_buf.clear();
            if self.inner.read_until(b'\n', &mut self.line_buf)? == 0 {
                return Ok(None);
            }
            self.line_number += 1;
            let line = match std::str::from_utf8(&self.line_buf) {
                Ok(line) => line.trim_end_matches(|c: char| c == '\n' || c == '\r'),
                Err(e) => {
                    return Err(DecodeError::MalformedRecord(format!(
                        "line {}: {}",
                        self.line_number, e
                    )))
                }
            };
            if line.is_empty() {
                continue;
            }
            return VcfRecord::parse(line, self.header.clone())
                .map(Some)
                .map_err(|e| match e {
                    DecodeError::MalformedRecord(message) => DecodeError::MalformedRecord(
                        format!("line {}: {}", self.line_number, message),
                    ),
                    e => e,
                });
        }
    }
}

impl<R: BufRead> Iterator for VcfRecords<R> {
    type Item = Result<VcfRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_record().transpose()
    }
}

type Input = BufReader<Box<dyn Read>>;

/// A record stream over either encoding, picked by sniffing the (decompressed) input.
pub enum VariantReader {
    Bcf(BcfRecords<Input>),
    Vcf(VcfRecords<Input>),
}

impl VariantReader {
    /// Opens a VCF or BCF file; gzip and bgzip compression are detected transparently.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let (reader, compression) = niffler::from_path(path)?;
        debug!("input compression: {:?}", compression);
        Self::new(reader)
    }

    pub fn new(mut reader: Box<dyn Read>) -> Result<Self> {
        let mut magic = Vec::with_capacity(BCF_MAGIC.len());
        reader
            .by_ref()
            .take(BCF_MAGIC.len() as u64)
            .read_to_end(&mut magic)?;
        let is_bcf = magic == BCF_MAGIC;
        let reader: Box<dyn Read> = Box::new(Cursor::new(magic).chain(reader));
        let reader = BufReader::new(reader);

        let variants = if is_bcf {
            VariantReader::Bcf(BcfRecords::new(reader)?)
        } else {
            VariantReader::Vcf(VcfRecords::new(reader)?)
        };
        debug!(
            "reading {} input ({}), {} samples",
            variants,
            variants.header().file_format().unwrap_or("no ##fileformat"),
            variants.header().samples().len()
        );
        Ok(variants)
    }

    pub fn header(&self) -> &Header {
        match self {
            VariantReader::Bcf(records) => records.header(),
            VariantReader::Vcf(records) => records.header(),
        }
    }
}

impl fmt::Display for VariantReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariantReader::Bcf(_) => write!(f, "BCF"),
            VariantReader::Vcf(_) => write!(f, "VCF"),
        }
    }
}

impl Iterator for VariantReader {
    type Item = Result<Box<dyn Record>>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            VariantReader::Bcf(records) => records
                .next()
                .map(|r| r.map(|record| Box::new(record) as Box<dyn Record>)),
            VariantReader::Vcf(records) => records
                .next()
                .map(|r| r.map(|record| Box::new(record) as Box<dyn Record>)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const VCF: &str = "##fileformat=VCFv4.2\n\
##INFO=<ID=ReadPosRankSum,Number=1,Type=Float,Description=\"rprs\">\n\
##contig=<ID=chr1>\n\
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n\
chr1\t1\t.\tA\t<NON_REF>\t.\t.\t.\n\
\n\
chr1\t2\t.\tC\tT\t10\t.\tReadPosRankSum=0.5\n\
chr1\tnot-a-position\t.\tC\tT\t10\t.\t.\n";

    fn open(text: &'static str) -> Result<VariantReader> {
        VariantReader::new(Box::new(text.as_bytes()))
    }

    #[test]
    fn test_text_input_is_read_as_vcf() {
        let reader = open(VCF).unwrap();
        assert_eq!(reader.to_string(), "VCF");
        assert_eq!(reader.header().file_format(), Some("VCFv4.2"));

        let results: Vec<_> = reader.collect();
        assert_eq!(results.len(), 3);
        let second = results[1].as_ref().unwrap();
        assert_eq!(second.pos(), 1);
        assert_eq!(second.ref_allele(), b"C");
        match &results[2] {
            Err(DecodeError::MalformedRecord(message)) => assert!(message.starts_with("line 8")),
            other => panic!("expected a malformed record, got {:?}", other.is_ok()),
        }
    }

    #[test]
    fn test_header_only_input_has_no_records() {
        let reader = open("##fileformat=VCFv4.2\n#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n")
            .unwrap();
        assert_eq!(reader.count(), 0);
    }

    #[test]
    fn test_missing_header_is_rejected() {
        assert!(matches!(
            open("chr1\t1\t.\tA\tG\t.\t.\t.\n"),
            Err(DecodeError::InvalidHeader(_))
        ));
        assert!(matches!(
            open("##fileformat=VCFv4.2\n"),
            Err(DecodeError::InvalidHeader(_))
        ));
    }

    #[test]
    fn test_bcf_magic_with_wrong_version() {
        let result = BcfRecords::new(&b"BCF\x01\x00"[..]);
        assert!(matches!(
            result,
            Err(DecodeError::UnsupportedVersion { major: 1, minor: 0 })
        ));
        assert!(matches!(
            BcfRecords::new(&b"XYZ\x02\x02"[..]),
            Err(DecodeError::InvalidMagic)
        ));
    }
}
