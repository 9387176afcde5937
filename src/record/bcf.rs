use std::rc::Rc;

use crate::error::{DecodeError, Result};
use crate::header::Header;
use crate::parser::{describe, format_block, shared_block};
use crate::record::Record;
use crate::types::{is_missing_float, Text, TypedVec};

/// A BCF record with its site and sample blocks fully decoded.
#[derive(Debug)]
pub struct BcfRecord {
    // position in `header.contigs()`, checked on decode
    contig: usize,
    pos: i64,
    ref_allele: Text,
    alt_alleles: Vec<Text>,
    qual: Option<f32>,
    info: Vec<(usize, TypedVec)>,
    format: Vec<(usize, Vec<TypedVec>)>,
    header: Rc<Header>,
}

impl BcfRecord {
    /// Decodes the shared and per-sample blocks of one record.
    pub(crate) fn decode(shared: &[u8], indiv: &[u8], header: Rc<Header>) -> Result<Self> {
        let (_, block) = shared_block(shared).map_err(|e| malformed(describe(e)))?;
        let site = block.site;

        let contig = usize::try_from(site.chrom)
            .ok()
            .and_then(|offset| header.contig_index(offset))
            .ok_or_else(|| malformed(format!("unknown contig offset {}", site.chrom)))?;

        let format = if site.n_fmt == 0 || indiv.is_empty() {
            Vec::new()
        } else {
            let (_, format) = format_block(site.n_fmt, site.n_sample, indiv)
                .map_err(|e| malformed(describe(e)))?;
            format
        };

        let mut alleles = block.alleles.into_iter();
        let ref_allele = alleles
            .next()
            .ok_or_else(|| malformed("record without a reference allele".to_owned()))?;

        Ok(Self {
            contig,
            pos: i64::from(site.pos),
            ref_allele,
            alt_alleles: alleles.collect(),
            qual: if is_missing_float(site.qual) {
                None
            } else {
                Some(site.qual)
            },
            info: block.info,
            format,
            header,
        })
    }
}

fn malformed(message: String) -> DecodeError {
    DecodeError::MalformedRecord(message)
}

impl Record for BcfRecord {
    fn chrom(&self) -> &str {
        self.header.contigs()[self.contig].id()
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
        let offset = self.header.info_offset(tag)?;
        self.info
            .iter()
            .find(|(key, _)| *key == offset)
            .map(|(_, data)| data.clone())
    }

    fn format(&self, tag: &[u8]) -> Option<Vec<TypedVec>> {
        let tag = std::str::from_utf8(tag).ok()?;
        let offset = self.header.format_offset(tag)?;
        self.format
            .iter()
            .find(|(key, _)| *key == offset)
            .map(|(_, samples)| samples.clone())
    }
}
