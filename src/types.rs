use num_enum::TryFromPrimitive;

pub(crate) const MISSING_FLOAT: u32 = 0x7F80_0001;
pub(crate) const END_OF_VECTOR_FLOAT: u32 = 0x7F80_0002;
pub(crate) const MISSING_INT_8: i8 = i8::MIN;
pub(crate) const END_OF_VECTOR_INT_8: i8 = i8::MIN + 1;
pub(crate) const MISSING_INT_16: i16 = i16::MIN;
pub(crate) const END_OF_VECTOR_INT_16: i16 = i16::MIN + 1;
pub(crate) const END_OF_VECTOR_INT_32: i32 = i32::MIN + 1;

/// Value standing in for a missing (`.`) integer, after widening to `i32`.
pub const INT32_MISSING: i32 = i32::MIN;

pub type Text = Vec<u8>;

#[derive(Debug)]
pub struct Version {
    pub(crate) major: u8,
    pub(crate) minor: u8,
}

#[derive(Debug)]
pub struct TypeDescriptor {
    pub(crate) kind: TypeKind,
    pub(crate) num_elements: usize,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, TryFromPrimitive)]
#[repr(u8)]
pub enum TypeKind {
    Missing = 0,
    Int8 = 1,
    Int16 = 2,
    Int32 = 3,
    Float32 = 5,
    String = 7,
}

/// The decoded value of one INFO field, or of one sample's FORMAT field.
///
/// Integers of every width are widened to `i32`. Missing elements are kept in place
/// ([`INT32_MISSING`], or the missing-float NaN), end-of-vector padding is dropped.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedVec {
    Missing,
    Int32(Vec<i32>),
    Float32(Vec<f32>),
    UString(Vec<u8>),
}

impl TypedVec {
    pub fn integer(&self) -> Option<&[i32]> {
        match self {
            TypedVec::Int32(v) => Some(v.as_slice()),
            _ => None,
        }
    }

    pub fn float(&self) -> Option<&[f32]> {
        match self {
            TypedVec::Float32(v) => Some(v.as_slice()),
            _ => None,
        }
    }
}

pub fn missing_float() -> f32 {
    f32::from_bits(MISSING_FLOAT)
}

pub fn is_missing_float(value: f32) -> bool {
    value.to_bits() == MISSING_FLOAT
}
