//! Extracts the site metrics used for VQSR training from a GVCF (VCF or BCF, optionally
//! gzipped) into a bgzipped, tab-separated table.

pub mod encode;
pub mod error;
pub mod extract;
pub mod header;
pub(crate) mod parser;
pub mod reader;
pub mod record;
pub mod table;
pub mod types;

pub use encode::encode;
pub use error::{DecodeError, ExtractError, MalformedRecord};
pub use extract::{extract, ExtractedRow};
pub use reader::{BcfRecords, VariantReader, VcfRecords};
pub use record::{BcfRecord, Record, VcfRecord};
pub use table::{run, write_table, Sink, TableStats};
