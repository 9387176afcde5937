//! VCF header parsing, shared by the text and the binary readers.
//!
//! Besides the typed INFO/FORMAT/FILTER/contig definitions, the header carries the two
//! BCF dictionaries: a string dictionary shared by FILTER, INFO and FORMAT IDs (with
//! `PASS` pinned to offset 0), and a contig dictionary. Offsets follow the order of first
//! appearance unless a line carries an explicit `IDX`.

use std::collections::HashMap;
use std::str::FromStr;

use getset::Getters;
use indexmap::IndexMap;
use multimap::MultiMap;
use nom::branch::alt;
use nom::bytes::complete::{escaped_transform, is_not, tag, take_till1, take_while};
use nom::character::complete::{char, digit1};
use nom::combinator::{all_consuming, map, map_res, opt, rest, value};
use nom::multi::separated_list0;
use nom::sequence::{delimited, preceded, separated_pair};
use nom::IResult;
use strum::EnumString;

use crate::error::{DecodeError, Result};

#[derive(Debug, Clone, Copy, Eq, PartialEq, EnumString)]
pub enum InfoType {
    Integer,
    Float,
    Flag,
    Character,
    String,
}

#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum InfoNumber {
    Count(usize),
    Alleles,
    AlternateAlleles,
    Genotypes,
    Unknown,
}

#[derive(Debug, Clone, PartialEq)]
pub enum HeaderValue {
    String(String),
    Structured(IndexMap<String, String>),
}

/// An `##INFO` or `##FORMAT` definition.
#[derive(Debug, Clone, Getters)]
pub struct FieldDefinition {
    #[getset(get = "pub")]
    id: String,
    #[getset(get = "pub")]
    number: InfoNumber,
    #[getset(get = "pub")]
    kind: InfoType,
    #[getset(get = "pub")]
    description: String,
    idx: Option<usize>,
}

#[derive(Debug, Clone, Getters)]
pub struct HeaderFilter {
    #[getset(get = "pub")]
    id: String,
    #[getset(get = "pub")]
    description: String,
    idx: Option<usize>,
}

#[derive(Debug, Clone, Getters)]
pub struct HeaderContig {
    #[getset(get = "pub")]
    id: String,
    #[getset(get = "pub")]
    length: Option<usize>,
    idx: Option<usize>,
}

#[derive(Debug, Clone, Default, Getters)]
pub struct Header {
    #[getset(get = "pub")]
    meta: MultiMap<String, HeaderValue>,
    #[getset(get = "pub")]
    info: IndexMap<String, FieldDefinition>,
    #[getset(get = "pub")]
    format: IndexMap<String, FieldDefinition>,
    #[getset(get = "pub")]
    filters: IndexMap<String, HeaderFilter>,
    #[getset(get = "pub")]
    contigs: Vec<HeaderContig>,
    #[getset(get = "pub")]
    samples: Vec<String>,
    info_tag_to_offset: HashMap<String, usize>,
    format_tag_to_offset: HashMap<String, usize>,
    // contig dictionary offset -> position in `contigs`
    contig_offsets: HashMap<usize, usize>,
}

/// Assigns dictionary offsets the way BCF writers do.
#[derive(Debug, Default)]
struct Dictionary {
    offsets: HashMap<String, usize>,
    next: usize,
}

impl Dictionary {
    fn insert(&mut self, id: &str, idx: Option<usize>) -> Result<usize> {
        if let Some(&offset) = self.offsets.get(id) {
            return Ok(offset);
        }
        let offset = idx.unwrap_or(self.next);
        let next = offset
            .checked_add(1)
            .ok_or_else(|| invalid(format!("IDX out of range for {}: {}", id, offset)))?;
        self.next = self.next.max(next);
        self.offsets.insert(id.to_owned(), offset);
        Ok(offset)
    }
}

impl Header {
    /// Parses the header text, up to and including the `#CHROM` line.
    pub fn parse(text: &str) -> Result<Self> {
        let mut header = Header::default();
        let mut strings = Dictionary::default();
        strings.insert("PASS", None)?;
        let mut contigs = Dictionary::default();
        let mut seen_column_line = false;

        for line in text.split('\n') {
            let line = line.trim_end_matches(|c: char| c == '\r' || c == '\0');
            if line.is_empty() {
                continue;
            }
            if seen_column_line {
                return Err(invalid(format!("unexpected line after #CHROM: {}", line)));
            }
            if line.starts_with("##") {
                header.add_meta_line(line, &mut strings, &mut contigs)?;
            } else if line.starts_with("#CHROM") {
                header.samples = line.split('\t').skip(9).map(str::to_owned).collect();
                seen_column_line = true;
            } else {
                return Err(invalid(format!("unexpected header line: {}", line)));
            }
        }

        if !seen_column_line {
            return Err(invalid("missing #CHROM line".to_owned()));
        }
        Ok(header)
    }

    fn add_meta_line(
        &mut self,
        line: &str,
        strings: &mut Dictionary,
        contigs: &mut Dictionary,
    ) -> Result<()> {
        let (key, value) = match meta_line(line) {
            Ok((_, entry)) => entry,
            Err(_) => {
                log::debug!("ignoring header line without a key: {}", line);
                return Ok(());
            }
        };

        match key {
            "INFO" | "FORMAT" | "FILTER" | "contig" => {
                let fields = structured_fields(value)
                    .ok_or_else(|| invalid(format!("malformed {} line: {}", key, line)))?;
                match key {
                    "INFO" => {
                        let definition = FieldDefinition::try_from(fields)?;
                        let offset = strings.insert(&definition.id, definition.idx)?;
                        self.info_tag_to_offset
                            .insert(definition.id.clone(), offset);
                        self.info.insert(definition.id.clone(), definition);
                    }
                    "FORMAT" => {
                        let definition = FieldDefinition::try_from(fields)?;
                        let offset = strings.insert(&definition.id, definition.idx)?;
                        self.format_tag_to_offset
                            .insert(definition.id.clone(), offset);
                        self.format.insert(definition.id.clone(), definition);
                    }
                    "FILTER" => {
                        let filter = HeaderFilter::try_from(fields)?;
                        strings.insert(&filter.id, filter.idx)?;
                        self.filters.insert(filter.id.clone(), filter);
                    }
                    _ => {
                        let contig = HeaderContig::try_from(fields)?;
                        let offset = contigs.insert(&contig.id, contig.idx)?;
                        self.contig_offsets.insert(offset, self.contigs.len());
                        self.contigs.push(contig);
                    }
                }
            }
            _ => {
                let value = match structured_fields(value) {
                    Some(fields) => HeaderValue::Structured(fields.into_iter().collect()),
                    None => HeaderValue::String(value.to_owned()),
                };
                self.meta.insert(key.to_owned(), value);
            }
        }
        Ok(())
    }

    /// The `##fileformat` line, if present.
    pub fn file_format(&self) -> Option<&str> {
        match self.meta.get("fileformat") {
            Some(HeaderValue::String(version)) => Some(version),
            _ => None,
        }
    }

    pub fn info_offset(&self, tag: &str) -> Option<usize> {
        self.info_tag_to_offset.get(tag).copied()
    }

    pub fn format_offset(&self, tag: &str) -> Option<usize> {
        self.format_tag_to_offset.get(tag).copied()
    }

    /// Position in [`Header::contigs`] of the contig stored at the given dictionary offset.
    pub fn contig_index(&self, offset: usize) -> Option<usize> {
        self.contig_offsets.get(&offset).copied()
    }
}

fn invalid(message: String) -> DecodeError {
    DecodeError::InvalidHeader(message)
}

type Fields = Vec<(String, String)>;

fn take_field(fields: &mut HashMap<String, String>, key: &str) -> Option<String> {
    fields.remove(key)
}

fn take_idx(fields: &mut HashMap<String, String>) -> Result<Option<usize>> {
    take_field(fields, "IDX")
        .map(|idx| {
            idx.parse()
                .map_err(|_| invalid(format!("invalid IDX value: {}", idx)))
        })
        .transpose()
}

fn take_id(fields: &mut HashMap<String, String>) -> Result<String> {
    take_field(fields, "ID").ok_or_else(|| invalid("definition without ID".to_owned()))
}

impl TryFrom<Fields> for FieldDefinition {
    type Error = DecodeError;

    fn try_from(fields: Fields) -> Result<Self> {
        let mut fields: HashMap<_, _> = fields.into_iter().collect();
        let id = take_id(&mut fields)?;
        let number = match take_field(&mut fields, "Number") {
            Some(number) => all_consuming(info_number)(number.as_str())
                .map(|(_, number)| number)
                .map_err(|_| invalid(format!("unknown Number for {}: {}", id, number)))?,
            None => InfoNumber::Unknown,
        };
        let kind = take_field(&mut fields, "Type")
            .ok_or_else(|| invalid(format!("{} has no Type", id)))?;
        let kind = InfoType::from_str(&kind)
            .map_err(|_| invalid(format!("unknown Type for {}: {}", id, kind)))?;
        Ok(FieldDefinition {
            number,
            kind,
            description: take_field(&mut fields, "Description").unwrap_or_default(),
            idx: take_idx(&mut fields)?,
            id,
        })
    }
}

impl TryFrom<Fields> for HeaderFilter {
    type Error = DecodeError;

    fn try_from(fields: Fields) -> Result<Self> {
        let mut fields: HashMap<_, _> = fields.into_iter().collect();
        Ok(HeaderFilter {
            id: take_id(&mut fields)?,
            description: take_field(&mut fields, "Description").unwrap_or_default(),
            idx: take_idx(&mut fields)?,
        })
    }
}

impl TryFrom<Fields> for HeaderContig {
    type Error = DecodeError;

    fn try_from(fields: Fields) -> Result<Self> {
        let mut fields: HashMap<_, _> = fields.into_iter().collect();
        Ok(HeaderContig {
            id: take_id(&mut fields)?,
            length: take_field(&mut fields, "length").and_then(|s| s.parse().ok()),
            idx: take_idx(&mut fields)?,
        })
    }
}

fn info_number(input: &str) -> IResult<&str, InfoNumber> {
    alt((
        map_res(digit1, |digits: &str| digits.parse().map(InfoNumber::Count)),
        value(InfoNumber::AlternateAlleles, tag("A")),
        value(InfoNumber::Alleles, tag("R")),
        value(InfoNumber::Genotypes, tag("G")),
        value(InfoNumber::Unknown, tag(".")),
    ))(input)
}

/// A double-quoted value with `\"` and `\\` unescaped.
fn quoted(input: &str) -> IResult<&str, String> {
    delimited(
        char('"'),
        map(
            opt(escaped_transform(
                is_not("\\\""),
                '\\',
                alt((value("\\", tag("\\")), value("\"", tag("\"")))),
            )),
            Option::unwrap_or_default,
        ),
        char('"'),
    )(input)
}

fn key_value(input: &str) -> IResult<&str, (&str, String)> {
    separated_pair(
        take_till1(|c: char| c == '=' || c == ',' || c == '>'),
        char('='),
        alt((
            quoted,
            map(take_while(|c: char| c != ',' && c != '>'), str::to_owned),
        )),
    )(input)
}

fn structured(input: &str) -> IResult<&str, Vec<(&str, String)>> {
    delimited(char('<'), separated_list0(char(','), key_value), char('>'))(input)
}

fn meta_line(input: &str) -> IResult<&str, (&str, &str)> {
    preceded(
        tag("##"),
        separated_pair(take_till1(|c: char| c == '='), char('='), rest),
    )(input)
}

fn structured_fields(value: &str) -> Option<Fields> {
    let (_, fields) = all_consuming(structured)(value).ok()?;
    Some(
        fields
            .into_iter()
            .map(|(k, v)| (k.to_owned(), v))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const HEADER: &str = "##fileformat=VCFv4.2\n\
##FILTER=<ID=LowQual,Description=\"Low quality\">\n\
##FORMAT=<ID=GT,Number=1,Type=String,Description=\"Genotype\">\n\
##FORMAT=<ID=SB,Number=4,Type=Integer,Description=\"Per-sample component statistics, \\\"SB\\\"\">\n\
##INFO=<ID=DP,Number=1,Type=Integer,Description=\"Approximate read depth\">\n\
##INFO=<ID=MQRankSum,Number=1,Type=Float,Description=\"\">\n\
##FORMAT=<ID=DP,Number=1,Type=Integer,Description=\"Read depth\">\n\
##contig=<ID=chr1,length=248956422>\n\
##contig=<ID=chr2,length=242193529>\n\
##GATKCommandLine=<ID=HaplotypeCaller,CommandLine=\"HaplotypeCaller --emit-ref-confidence GVCF\">\n\
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tNA12878\n";

    #[test]
    fn test_parse_definitions() {
        let header = Header::parse(HEADER).unwrap();
        assert_eq!(header.file_format(), Some("VCFv4.2"));
        assert_eq!(header.samples(), &vec!["NA12878".to_owned()]);

        let sb = &header.format()["SB"];
        assert_eq!(sb.number(), &InfoNumber::Count(4));
        assert_eq!(sb.kind(), &InfoType::Integer);
        assert_eq!(header.info()["MQRankSum"].kind(), &InfoType::Float);
        assert_eq!(header.info()["MQRankSum"].description(), "");
        assert_eq!(
            sb.description(),
            "Per-sample component statistics, \"SB\""
        );

        let contigs: Vec<_> = header.contigs().iter().map(|c| c.id().as_str()).collect();
        assert_eq!(contigs, vec!["chr1", "chr2"]);
        assert_eq!(header.contigs()[0].length(), &Some(248956422));
        assert!(header.meta().get("GATKCommandLine").is_some());
    }

    #[test]
    fn test_dictionary_is_shared_and_starts_with_pass() {
        let header = Header::parse(HEADER).unwrap();
        // PASS=0, LowQual=1, GT=2, SB=3, DP=4, MQRankSum=5
        assert_eq!(header.format_offset("GT"), Some(2));
        assert_eq!(header.format_offset("SB"), Some(3));
        assert_eq!(header.info_offset("DP"), Some(4));
        assert_eq!(header.format_offset("DP"), Some(4));
        assert_eq!(header.info_offset("MQRankSum"), Some(5));
        assert_eq!(header.info_offset("AF"), None);
        assert_eq!(header.contig_index(1), Some(1));
        assert_eq!(header.contig_index(2), None);
    }

    #[test]
    fn test_explicit_idx_wins() {
        let text = "##fileformat=VCFv4.2\n\
##INFO=<ID=RAW_MQandDP,Number=2,Type=Integer,Description=\"raw\",IDX=7>\n\
##INFO=<ID=ReadPosRankSum,Number=1,Type=Float,Description=\"rprs\">\n\
##contig=<ID=chrM,IDX=3>\n\
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n\0";
        let header = Header::parse(text).unwrap();
        assert_eq!(header.info_offset("RAW_MQandDP"), Some(7));
        assert_eq!(header.info_offset("ReadPosRankSum"), Some(8));
        assert_eq!(header.contig_index(3), Some(0));
        assert!(header.samples().is_empty());
    }

    #[test]
    fn test_idx_at_end_of_range_is_rejected() {
        let text = "##INFO=<ID=X,Number=1,Type=Integer,Description=\"x\",IDX=18446744073709551615>\n\
#CHROM\tPOS\n";
        assert!(matches!(
            Header::parse(text),
            Err(DecodeError::InvalidHeader(_))
        ));
    }

    #[test]
    fn test_quoted_values_are_unescaped() {
        let (_, value) = quoted(r#""a \\ b \"c\"", rest"#).unwrap();
        assert_eq!(value, r#"a \ b "c""#);
        assert_eq!(quoted("\"\"").unwrap().1, "");
    }

    #[test]
    fn test_missing_column_line_is_rejected() {
        let result = Header::parse("##fileformat=VCFv4.2\n");
        assert!(matches!(result, Err(DecodeError::InvalidHeader(_))));
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let text = "##INFO=<ID=X,Number=1,Type=Double,Description=\"x\">\n#CHROM\tPOS\n";
        assert!(matches!(
            Header::parse(text),
            Err(DecodeError::InvalidHeader(_))
        ));
    }

    #[test]
    fn test_info_number() {
        assert_eq!(info_number("2").unwrap().1, InfoNumber::Count(2));
        assert_eq!(info_number("A").unwrap().1, InfoNumber::AlternateAlleles);
        assert_eq!(info_number(".").unwrap().1, InfoNumber::Unknown);
        assert!(info_number("Z").is_err());
    }
}
