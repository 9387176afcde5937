use std::rc::Rc;

use itertools::Itertools;

use crate::error::{DecodeError, Result};
use crate::header::{Header, InfoType};
use crate::record::Record;
use crate::types::{missing_float, Text, TypedVec, INT32_MISSING};

const MISSING: &str = ".";

/// A VCF text record. Site columns are split eagerly, INFO and FORMAT values are
/// typed on lookup.
#[derive(Debug)]
pub struct VcfRecord {
    chrom: String,
    pos: i64,
    ref_allele: Text,
    alt_alleles: Vec<Text>,
    qual: Option<f32>,
    info: String,
    format_keys: Vec<String>,
    samples: Vec<String>,
    header: Rc<Header>,
}

impl VcfRecord {
    pub(crate) fn parse(line: &str, header: Rc<Header>) -> Result<Self> {
        let columns = line.split('\t').collect_vec();
        if columns.len() < 8 {
            return Err(malformed(format!(
                "expected at least 8 columns, found {}",
                columns.len()
            )));
        }

        // stored 0-based
        let pos = columns[1]
            .parse::<i64>()
            .ok()
            .and_then(|pos| pos.checked_sub(1))
            .ok_or_else(|| malformed(format!("invalid POS: {}", columns[1])))?;
        let alt_alleles = if columns[4] == MISSING {
            Vec::new()
        } else {
            columns[4].split(',').map(|a| a.as_bytes().to_vec()).collect()
        };
        let qual = if columns[5] == MISSING {
            None
        } else {
            Some(
                columns[5]
                    .parse()
                    .map_err(|_| malformed(format!("invalid QUAL: {}", columns[5])))?,
            )
        };
        let format_keys = match columns.get(8) {
            Some(keys) if *keys != MISSING => keys.split(':').map(str::to_owned).collect(),
            _ => Vec::new(),
        };

        Ok(Self {
            chrom: columns[0].to_owned(),
            pos,
            ref_allele: columns[3].as_bytes().to_vec(),
            alt_alleles,
            qual,
            info: columns[7].to_owned(),
            format_keys,
            samples: columns.iter().skip(9).map(|s| (*s).to_owned()).collect(),
            header,
        })
    }

    fn info_value(&self, tag: &str) -> Option<Option<&str>> {
        if self.info == MISSING {
            return None;
        }
        self.info.split(';').find_map(|entry| match entry.split_once('=') {
            Some((key, value)) if key == tag => Some(Some(value)),
            None if entry == tag => Some(None),
            _ => None,
        })
    }
}

fn malformed(message: String) -> DecodeError {
    DecodeError::MalformedRecord(message)
}

/// Types a comma separated value; `None` if any element fails to parse.
fn typed_value(kind: InfoType, value: &str) -> Option<TypedVec> {
    match kind {
        InfoType::Integer => value
            .split(',')
            .map(|v| {
                if v == MISSING {
                    Some(INT32_MISSING)
                } else {
                    v.parse().ok()
                }
            })
            .collect::<Option<Vec<i32>>>()
            .map(TypedVec::Int32),
        InfoType::Float => value
            .split(',')
            .map(|v| {
                if v == MISSING {
                    Some(missing_float())
                } else {
                    v.parse().ok()
                }
            })
            .collect::<Option<Vec<f32>>>()
            .map(TypedVec::Float32),
        InfoType::Flag => Some(TypedVec::Missing),
        InfoType::Character | InfoType::String => {
            Some(TypedVec::UString(value.as_bytes().to_vec()))
        }
    }
}

impl Record for VcfRecord {
    fn chrom(&self) -> &str {
        &self.chrom
    }

    fn pos(&self) -> i64 {
        self.pos
    }

    fn ref_allele(&self) -> &[u8] {
        &self.ref_allele
    }

    fn alt_alleles(&self) -> &[Text] {
        &self.alt_alleles
    }

    fn qual(&self) -> Option<f32> {
        self.qual
    }

    fn info(&self, tag: &[u8]) -> Option<TypedVec> {
        let tag = std::str::from_utf8(tag).ok()?;
        let kind = self
            .header
            .info()
            .get(tag)
            .map_or(InfoType::String, |definition| *definition.kind());
        match self.info_value(tag)? {
            Some(value) => typed_value(kind, value),
            None => Some(TypedVec::Missing),
        }
    }

    fn format(&self, tag: &[u8]) -> Option<Vec<TypedVec>> {
        let tag = std::str::from_utf8(tag).ok()?;
        let index = self.format_keys.iter().position(|key| key == tag)?;
        let kind = self
            .header
            .format()
            .get(tag)
            .map_or(InfoType::String, |definition| *definition.kind());
        self.samples
            .iter()
            .map(|sample| match sample.split(':').nth(index) {
                // trailing fields may be dropped from a sample
                None => Some(TypedVec::Missing),
                Some(value) => typed_value(kind, value),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::is_missing_float;

    fn header() -> Rc<Header> {
        let text = "##fileformat=VCFv4.2\n\
##INFO=<ID=RAW_MQandDP,Number=2,Type=Integer,Description=\"raw\">\n\
##INFO=<ID=MQRankSum,Number=1,Type=Float,Description=\"mqrs\">\n\
##INFO=<ID=DS,Number=0,Type=Flag,Description=\"downsampled\">\n\
##FORMAT=<ID=GT,Number=1,Type=String,Description=\"Genotype\">\n\
##FORMAT=<ID=SB,Number=4,Type=Integer,Description=\"sb\">\n\
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tS1\tS2\n";
        Rc::new(Header::parse(text).unwrap())
    }

    #[test]
    fn test_site_columns() {
        let line = "chr1\t100\t.\tA\tG,<NON_REF>\t30.5\t.\tDP=3\tGT:SB\t0/1:1,2,3,4\t./.";
        let record = VcfRecord::parse(line, header()).unwrap();
        assert_eq!(record.chrom(), "chr1");
        assert_eq!(record.pos(), 99);
        assert_eq!(record.ref_allele(), b"A");
        assert_eq!(record.alt_alleles(), &[b"G".to_vec(), b"<NON_REF>".to_vec()]);
        assert_eq!(record.qual(), Some(30.5));
    }

    #[test]
    fn test_missing_alt_and_qual() {
        let record = VcfRecord::parse("chr1\t5\t.\tA\t.\t.\t.\t.", header()).unwrap();
        assert!(record.alt_alleles().is_empty());
        assert_eq!(record.qual(), None);
        assert_eq!(record.info(b"MQRankSum"), None);
        assert_eq!(record.format(b"SB"), None);
    }

    #[test]
    fn test_info_is_typed_from_header() {
        let line = "chr1\t1\t.\tA\tG\t1\t.\tRAW_MQandDP=40,15;MQRankSum=.;DS\tGT\t0/1\t0/0";
        let record = VcfRecord::parse(line, header()).unwrap();
        assert_eq!(
            record.info(b"RAW_MQandDP"),
            Some(TypedVec::Int32(vec![40, 15]))
        );
        let mqrs = record.info(b"MQRankSum").unwrap();
        assert!(is_missing_float(mqrs.float().unwrap()[0]));
        assert_eq!(record.info(b"DS"), Some(TypedVec::Missing));
        assert_eq!(record.info(b"ReadPosRankSum"), None);
    }

    #[test]
    fn test_unparseable_info_is_absent() {
        let line = "chr1\t1\t.\tA\tG\t1\t.\tRAW_MQandDP=40,abc\t.";
        let record = VcfRecord::parse(line, header()).unwrap();
        assert_eq!(record.info(b"RAW_MQandDP"), None);
    }

    #[test]
    fn test_format_per_sample() {
        let line = "chr1\t1\t.\tA\tG\t1\t.\t.\tGT:SB\t0/1:1,2,3,4\t0/0";
        let record = VcfRecord::parse(line, header()).unwrap();
        let sb = record.format(b"SB").unwrap();
        assert_eq!(sb[0], TypedVec::Int32(vec![1, 2, 3, 4]));
        assert_eq!(sb[1], TypedVec::Missing);
        assert_eq!(
            record.format(b"GT").unwrap()[0],
            TypedVec::UString(b"0/1".to_vec())
        );
    }

    #[test]
    fn test_short_line_is_malformed() {
        let result = VcfRecord::parse("chr1\t1\tA", header());
        assert!(matches!(result, Err(DecodeError::MalformedRecord(_))));
        let result = VcfRecord::parse("chr1\tx\t.\tA\tG\t1\t.\t.", header());
        assert!(matches!(result, Err(DecodeError::MalformedRecord(_))));
    }

    #[test]
    fn test_position_below_range_is_malformed() {
        let line = "chr1\t-9223372036854775808\t.\tA\tG\t1\t.\t.";
        match VcfRecord::parse(line, header()) {
            Err(DecodeError::MalformedRecord(message)) => {
                assert_eq!(message, "invalid POS: -9223372036854775808")
            }
            other => panic!("expected a malformed record, got {:?}", other),
        }
    }
}
