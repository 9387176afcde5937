#![allow(dead_code)]

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use noodles_bgzf as bgzf;

pub const MISSING_FLOAT: u32 = 0x7F80_0001;

pub const VCF_HEADER: &str = "##fileformat=VCFv4.2\n\
##FILTER=<ID=PASS,Description=\"All filters passed\">\n\
##FILTER=<ID=LowQual,Description=\"Low quality\">\n\
##INFO=<ID=RAW_MQandDP,Number=2,Type=Integer,Description=\"Raw data (sum of squared MQ and total depth)\">\n\
##INFO=<ID=MQRankSum,Number=1,Type=Float,Description=\"Z-score from Wilcoxon rank sum test of Alt vs. Ref read mapping qualities\">\n\
##INFO=<ID=ReadPosRankSum,Number=1,Type=Float,Description=\"Z-score from Wilcoxon rank sum test of Alt vs. Ref read position bias\">\n\
##FORMAT=<ID=GT,Number=1,Type=String,Description=\"Genotype\">\n\
##FORMAT=<ID=SB,Number=4,Type=Integer,Description=\"Per-sample component statistics for strand bias\">\n\
##contig=<ID=chr1,length=248956422>\n\
##contig=<ID=chr2,length=242193529>\n\
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tNA12878\n";

// string dictionary offsets of VCF_HEADER
pub const RAW_MQ_AND_DP: u8 = 2;
pub const MQ_RANK_SUM: u8 = 3;
pub const READ_POS_RANK_SUM: u8 = 4;
pub const GT: u8 = 5;
pub const SB: u8 = 6;

pub const TABLE_HEADER: &str =
    "CHROM\tPOS\tREF\tALT\tQUAL\tRAW_DP\tRAW_MQ\tMQRankSum\tReadPosRankSum\tSB";

pub fn descriptor(kind: u8, n: usize) -> Vec<u8> {
    if n < 15 {
        vec![((n as u8) << 4) | kind]
    } else {
        // overflow length as a typed int32
        let mut out = vec![0xF0 | kind, 0x13];
        out.extend_from_slice(&(n as i32).to_le_bytes());
        out
    }
}

pub fn typed_string(s: &str) -> Vec<u8> {
    let mut out = descriptor(7, s.len());
    out.extend_from_slice(s.as_bytes());
    out
}

pub fn typed_ints(values: &[i32]) -> Vec<u8> {
    let mut out = descriptor(3, values.len());
    for value in values {
        out.extend_from_slice(&value.to_le_bytes());
    }
    out
}

pub fn typed_floats(bits: &[u32]) -> Vec<u8> {
    let mut out = descriptor(5, bits.len());
    for value in bits {
        out.extend_from_slice(&value.to_le_bytes());
    }
    out
}

/// One BCF record with a single sample.
pub struct BcfSite {
    pub contig: i32,
    /// 0-based
    pub pos: i32,
    pub qual: u32,
    pub alleles: Vec<&'static str>,
    pub info: Vec<(u8, Vec<u8>)>,
    /// key, descriptor and the sample's values
    pub format: Vec<(u8, Vec<u8>)>,
}

impl BcfSite {
    pub fn new(contig: i32, pos: i32, qual: f32, alleles: &[&'static str]) -> Self {
        Self {
            contig,
            pos,
            qual: qual.to_bits(),
            alleles: alleles.to_vec(),
            info: Vec::new(),
            format: Vec::new(),
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut shared = Vec::new();
        shared.extend_from_slice(&self.contig.to_le_bytes());
        shared.extend_from_slice(&self.pos.to_le_bytes());
        let rlen = self.alleles.first().map_or(0, |a| a.len()) as i32;
        shared.extend_from_slice(&rlen.to_le_bytes());
        shared.extend_from_slice(&self.qual.to_le_bytes());
        shared.extend_from_slice(&(self.info.len() as u16).to_le_bytes());
        shared.extend_from_slice(&(self.alleles.len() as u16).to_le_bytes());
        shared.extend_from_slice(&[1, 0, 0]);
        shared.push(self.format.len() as u8);
        shared.push(0x07); // empty ID
        for allele in &self.alleles {
            shared.extend(typed_string(allele));
        }
        shared.extend([0x11, 0x00]); // FILTER=PASS
        for (key, value) in &self.info {
            shared.extend([0x11, *key]);
            shared.extend_from_slice(value);
        }

        let mut indiv = Vec::new();
        for (key, value) in &self.format {
            indiv.extend([0x11, *key]);
            indiv.extend_from_slice(value);
        }

        let mut out = Vec::new();
        out.extend_from_slice(&(shared.len() as u32).to_le_bytes());
        out.extend_from_slice(&(indiv.len() as u32).to_le_bytes());
        out.extend(shared);
        out.extend(indiv);
        out
    }
}

/// Magic, header and the given records, uncompressed.
pub fn bcf_bytes(header: &str, sites: &[BcfSite]) -> Vec<u8> {
    let mut out = b"BCF\x02\x02".to_vec();
    out.extend_from_slice(&(header.len() as u32 + 1).to_le_bytes());
    out.extend_from_slice(header.as_bytes());
    out.push(0);
    for site in sites {
        out.extend(site.encode());
    }
    out
}

pub fn write_bgzf(path: &Path, data: &[u8]) {
    let mut writer = bgzf::io::Writer::new(File::create(path).unwrap());
    writer.write_all(data).unwrap();
    writer.finish().unwrap();
}

pub fn read_bgzf(path: &Path) -> String {
    let mut reader = bgzf::io::Reader::new(File::open(path).unwrap());
    let mut text = String::new();
    reader.read_to_string(&mut text).unwrap();
    text
}
