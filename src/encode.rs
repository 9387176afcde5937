//! Text encoding of table rows.
//!
//! Floats are written like C's `%f`: fixed notation with six fractional digits, taken from
//! the exact value of the `f32`. NaN becomes `nan` (`-nan` with the sign bit set) and
//! infinities become `inf`/`-inf`. Integers are plain decimal.

use std::fmt;

use itertools::Itertools;

use crate::extract::ExtractedRow;

pub const COLUMNS: [&str; 10] = [
    "CHROM",
    "POS",
    "REF",
    "ALT",
    "QUAL",
    "RAW_DP",
    "RAW_MQ",
    "MQRankSum",
    "ReadPosRankSum",
    "SB",
];

pub const HEADER: &[u8] = b"CHROM\tPOS\tREF\tALT\tQUAL\tRAW_DP\tRAW_MQ\tMQRankSum\tReadPosRankSum\tSB\n";

/// Formats an `f32` with six fractional digits.
#[derive(Debug, Clone, Copy)]
pub struct Fixed(pub f32);

impl fmt::Display for Fixed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = f64::from(self.0);
        if value.is_nan() {
            f.write_str(if value.is_sign_negative() { "-nan" } else { "nan" })
        } else if value.is_infinite() {
            f.write_str(if value > 0.0 { "inf" } else { "-inf" })
        } else {
            write!(f, "{:.6}", value)
        }
    }
}

impl fmt::Display for ExtractedRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            self.chrom,
            self.pos,
            self.ref_allele,
            self.alts.iter().join(","),
            Fixed(self.qual),
            self.raw_dp,
            self.raw_mq,
            Fixed(self.mq_rank_sum),
            Fixed(self.read_pos_rank_sum),
            self.strand_bias.iter().join(","),
        )
    }
}

/// Encodes a row as one newline-terminated, tab-separated line.
pub fn encode(row: &ExtractedRow) -> Vec<u8> {
    row.to_string().into_bytes()
}
