use std::convert::TryFrom;

use nom::bytes::complete::{tag, take};
use nom::error::{Error, ErrorKind};
use nom::multi::count;
use nom::number::complete::{le_f32, le_i16, le_i32, le_i8, le_u16, le_u24, le_u32, le_u8};
use nom::sequence::tuple;
use nom::IResult;

use crate::types::{
    Text, TypeDescriptor, TypeKind, TypedVec, Version, END_OF_VECTOR_FLOAT,
    END_OF_VECTOR_INT_16, END_OF_VECTOR_INT_32, END_OF_VECTOR_INT_8, INT32_MISSING,
    MISSING_INT_16, MISSING_INT_8,
};

/// Fixed-size part of a record's shared block, directly after the two length words.
#[derive(Debug)]
pub(crate) struct SiteInfo {
    pub(crate) chrom: i32,
    pub(crate) pos: i32,
    pub(crate) qual: f32,
    pub(crate) n_info: usize,
    pub(crate) n_allele: usize,
    pub(crate) n_sample: usize,
    pub(crate) n_fmt: usize,
}

#[derive(Debug)]
pub(crate) struct SharedBlock {
    pub(crate) site: SiteInfo,
    pub(crate) alleles: Vec<Text>,
    pub(crate) info: Vec<(usize, TypedVec)>,
}

pub(crate) fn bcf_version(input: &[u8]) -> IResult<&[u8], Version> {
    let (input, _) = tag(b"BCF")(input)?;
    let (input, major) = le_u8(input)?;
    let (input, minor) = le_u8(input)?;
    Ok((input, Version { major, minor }))
}

pub(crate) fn header_length(input: &[u8]) -> IResult<&[u8], u32> {
    le_u32(input)
}

pub(crate) fn record_length(input: &[u8]) -> IResult<&[u8], (u32, u32)> {
    tuple((le_u32, le_u32))(input)
}

fn failure<T>(input: &[u8], kind: ErrorKind) -> IResult<&[u8], T> {
    Err(nom::Err::Failure(Error::new(input, kind)))
}

pub(crate) fn type_descriptor(input: &[u8]) -> IResult<&[u8], TypeDescriptor> {
    let (rest, byte) = le_u8(input)?;
    let kind = match TypeKind::try_from(byte & 0b1111) {
        Ok(kind) => kind,
        Err(_) => return failure(input, ErrorKind::Tag),
    };
    let num_elements = (byte >> 4) as usize;
    // 15 means the real length follows as a typed integer
    let (rest, num_elements) = if num_elements == 15 {
        let (rest, length) = typed_int(rest)?;
        match usize::try_from(length) {
            Ok(length) => (rest, length),
            Err(_) => return failure(input, ErrorKind::Verify),
        }
    } else {
        (rest, num_elements)
    };
    Ok((rest, TypeDescriptor { kind, num_elements }))
}

/// A single typed integer, as used for overflow lengths and dictionary keys.
fn typed_int(input: &[u8]) -> IResult<&[u8], i32> {
    let (rest, TypeDescriptor { kind, num_elements }) = type_descriptor(input)?;
    if num_elements != 1 {
        return failure(input, ErrorKind::Verify);
    }
    match kind {
        TypeKind::Int8 => le_i8(rest).map(|(rest, v)| (rest, i32::from(v))),
        TypeKind::Int16 => le_i16(rest).map(|(rest, v)| (rest, i32::from(v))),
        TypeKind::Int32 => le_i32(rest),
        _ => failure(input, ErrorKind::Verify),
    }
}

fn dictionary_key(input: &[u8]) -> IResult<&[u8], usize> {
    let (rest, key) = typed_int(input)?;
    match usize::try_from(key) {
        Ok(key) => Ok((rest, key)),
        Err(_) => failure(input, ErrorKind::Verify),
    }
}

pub(crate) fn typed_string(input: &[u8]) -> IResult<&[u8], Text> {
    let (rest, TypeDescriptor { kind, num_elements }) = type_descriptor(input)?;
    match kind {
        TypeKind::String => {
            let (rest, data) = take(num_elements)(rest)?;
            Ok((rest, trim_nul(data).to_vec()))
        }
        // an empty ID is sometimes written as a bare missing descriptor
        TypeKind::Missing => Ok((rest, Text::new())),
        _ => failure(input, ErrorKind::Verify),
    }
}

fn trim_nul(data: &[u8]) -> &[u8] {
    let end = data.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    &data[..end]
}

fn widen<T>(values: Vec<T>, missing: T, end_of_vector: T) -> Vec<i32>
where
    T: Copy + PartialEq + Into<i32>,
{
    values
        .into_iter()
        .take_while(|&v| v != end_of_vector)
        .map(|v| if v == missing { INT32_MISSING } else { v.into() })
        .collect()
}

/// `num_elements` values of the given kind, converted into a [`TypedVec`].
fn typed_values(kind: TypeKind, num_elements: usize, input: &[u8]) -> IResult<&[u8], TypedVec> {
    let width = match kind {
        TypeKind::Missing => 0,
        TypeKind::Int8 | TypeKind::String => 1,
        TypeKind::Int16 => 2,
        TypeKind::Int32 | TypeKind::Float32 => 4,
    };
    if num_elements.saturating_mul(width) > input.len() {
        return failure(input, ErrorKind::Eof);
    }
    let (input, vec) = match kind {
        TypeKind::Missing => (input, TypedVec::Missing),
        TypeKind::Int8 => {
            let (input, data) = count(le_i8, num_elements)(input)?;
            (
                input,
                TypedVec::Int32(widen(data, MISSING_INT_8, END_OF_VECTOR_INT_8)),
            )
        }
        TypeKind::Int16 => {
            let (input, data) = count(le_i16, num_elements)(input)?;
            (
                input,
                TypedVec::Int32(widen(data, MISSING_INT_16, END_OF_VECTOR_INT_16)),
            )
        }
        TypeKind::Int32 => {
            let (input, data) = count(le_i32, num_elements)(input)?;
            (
                input,
                TypedVec::Int32(widen(data, INT32_MISSING, END_OF_VECTOR_INT_32)),
            )
        }
        TypeKind::Float32 => {
            let (input, data) = count(le_u32, num_elements)(input)?;
            let data = data
                .into_iter()
                .take_while(|&bits| bits != END_OF_VECTOR_FLOAT)
                .map(f32::from_bits)
                .collect();
            (input, TypedVec::Float32(data))
        }
        TypeKind::String => {
            let (input, data) = take(num_elements)(input)?;
            (input, TypedVec::UString(trim_nul(data).to_vec()))
        }
    };
    Ok((input, vec))
}

pub(crate) fn typed_vec(input: &[u8]) -> IResult<&[u8], TypedVec> {
    let (input, TypeDescriptor { kind, num_elements }) = type_descriptor(input)?;
    typed_values(kind, num_elements, input)
}

fn info_pair(input: &[u8]) -> IResult<&[u8], (usize, TypedVec)> {
    let (input, key) = dictionary_key(input)?;
    let (input, data) = typed_vec(input)?;
    Ok((input, (key, data)))
}

/// One FORMAT field: the dictionary key followed by one value vector per sample.
pub(crate) fn genotype_field(
    n_sample: usize,
    input: &[u8],
) -> IResult<&[u8], (usize, Vec<TypedVec>)> {
    let (input, key) = dictionary_key(input)?;
    let (input, TypeDescriptor { kind, num_elements }) = type_descriptor(input)?;
    let (input, samples) = count(
        |input| typed_values(kind, num_elements, input),
        n_sample,
    )(input)?;
    Ok((input, (key, samples)))
}

fn site_info(input: &[u8]) -> IResult<&[u8], SiteInfo> {
    let (input, (chrom, pos, _rlen, qual, n_info, n_allele, n_sample, n_fmt)) = tuple((
        le_i32, le_i32, le_i32, le_f32, le_u16, le_u16, le_u24, le_u8,
    ))(input)?;
    Ok((
        input,
        SiteInfo {
            chrom,
            pos,
            qual,
            n_info: n_info as usize,
            n_allele: n_allele as usize,
            n_sample: n_sample as usize,
            n_fmt: n_fmt as usize,
        },
    ))
}

/// The shared (site-level) block of a record: everything except the per-sample data.
pub(crate) fn shared_block(input: &[u8]) -> IResult<&[u8], SharedBlock> {
    let (input, site) = site_info(input)?;
    let (input, _id) = typed_string(input)?;
    let (input, alleles) = count(typed_string, site.n_allele)(input)?;
    let (input, _filters) = typed_vec(input)?;
    let (input, info) = count(info_pair, site.n_info)(input)?;
    Ok((
        input,
        SharedBlock {
            site,
            alleles,
            info,
        },
    ))
}

pub(crate) fn format_block(
    n_fmt: usize,
    n_sample: usize,
    input: &[u8],
) -> IResult<&[u8], Vec<(usize, Vec<TypedVec>)>> {
    count(|input| genotype_field(n_sample, input), n_fmt)(input)
}

/// Describes a nom failure without borrowing the input.
pub(crate) fn describe(error: nom::Err<Error<&[u8]>>) -> String {
    match error {
        nom::Err::Incomplete(_) => "unexpected end of data".to_owned(),
        nom::Err::Error(e) | nom::Err::Failure(e) => format!(
            "{} at {} bytes before the end of the block",
            e.code.description(),
            e.input.len()
        ),
    }
}
