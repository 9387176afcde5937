//! Projection of a variant record onto the columns of the VQSR metrics table.
//!
//! Optional fields never fail the extraction: when a field is absent, has an unexpected
//! type or is too short, the column falls back to a sentinel (`-9999`, `-9999.0`, or an
//! empty strand-bias list). A present value is copied as stored, so a missing (`.`)
//! element comes through as [`INT32_MISSING`](crate::types::INT32_MISSING) or the
//! missing-float NaN.

use crate::error::MalformedRecord;
use crate::record::Record;
use crate::types::{missing_float, TypedVec};

/// Symbolic allele that marks GVCF reference-confidence blocks.
pub const NON_REF_ALLELE: &[u8] = b"<NON_REF>";

pub const MISSING_INT: i32 = -9999;
pub const MISSING_FLOAT: f32 = -9999.0;

const RAW_MQ_AND_DP: &[u8] = b"RAW_MQandDP";
const MQ_RANK_SUM: &[u8] = b"MQRankSum";
const READ_POS_RANK_SUM: &[u8] = b"ReadPosRankSum";
const STRAND_BIAS: &[u8] = b"SB";
const STRAND_BIAS_VALUES: usize = 4;

/// One line of the metrics table.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedRow {
    pub chrom: String,
    /// 1-based
    pub pos: i64,
    pub ref_allele: String,
    pub alts: Vec<String>,
    pub qual: f32,
    pub raw_dp: i32,
    pub raw_mq: i32,
    pub mq_rank_sum: f32,
    pub read_pos_rank_sum: f32,
    /// Four values from the first sample, or empty.
    pub strand_bias: Vec<i32>,
}

/// Builds the table row for a record.
///
/// Returns `Ok(None)` for reference blocks (first ALT is `<NON_REF>`), and an error for
/// records without any ALT allele.
pub fn extract<R: Record + ?Sized>(record: &R) -> Result<Option<ExtractedRow>, MalformedRecord> {
    let alts = record.alt_alleles();
    let first = alts.first().ok_or_else(|| MalformedRecord {
        chrom: record.chrom().to_owned(),
        pos: record.pos() + 1,
    })?;
    if first.as_slice() == NON_REF_ALLELE {
        return Ok(None);
    }

    // RAW_MQandDP is stored as (MQ, DP); column order in the table is DP then MQ.
    let (raw_mq, raw_dp) = record
        .info(RAW_MQ_AND_DP)
        .as_ref()
        .and_then(TypedVec::integer)
        .and_then(|values| match values {
            [mq, dp, ..] => Some((*mq, *dp)),
            _ => None,
        })
        .unwrap_or((MISSING_INT, MISSING_INT));

    Ok(Some(ExtractedRow {
        chrom: record.chrom().to_owned(),
        pos: record.pos() + 1,
        ref_allele: String::from_utf8_lossy(record.ref_allele()).into_owned(),
        alts: alts
            .iter()
            .map(|alt| String::from_utf8_lossy(alt).into_owned())
            .collect(),
        qual: record.qual().unwrap_or_else(missing_float),
        raw_dp,
        raw_mq,
        mq_rank_sum: first_float(record, MQ_RANK_SUM),
        read_pos_rank_sum: first_float(record, READ_POS_RANK_SUM),
        strand_bias: strand_bias(record),
    }))
}

fn first_float<R: Record + ?Sized>(record: &R, tag: &[u8]) -> f32 {
    record
        .info(tag)
        .as_ref()
        .and_then(TypedVec::float)
        .and_then(|values| values.first().copied())
        .unwrap_or(MISSING_FLOAT)
}

fn strand_bias<R: Record + ?Sized>(record: &R) -> Vec<i32> {
    record
        .format(STRAND_BIAS)
        .and_then(|samples| samples.into_iter().next())
        .as_ref()
        .and_then(TypedVec::integer)
        .and_then(|values| values.get(..STRAND_BIAS_VALUES))
        .map(<[i32]>::to_vec)
        .unwrap_or_default()
}
