mod bcf;
mod vcf;

use crate::types::{Text, TypedVec};
pub use bcf::BcfRecord;
pub use vcf::VcfRecord;

/// Read-only view of one decoded variant site.
pub trait Record {
    /// Contig name, i.e. CHROM.
    fn chrom(&self) -> &str;

    /// Position of the site, 0-based (VCF POS minus one).
    fn pos(&self) -> i64;

    fn ref_allele(&self) -> &[u8];

    /// Alternate alleles in file order. Empty when ALT is `.`.
    fn alt_alleles(&self) -> &[Text];

    /// QUAL, or `None` when it is missing.
    fn qual(&self) -> Option<f32>;

    /// Value of the given INFO tag, typed according to the header.
    /// `None` when the tag is not set on this record or its value cannot be decoded.
    fn info(&self, tag: &[u8]) -> Option<TypedVec>;

    /// Value of the given FORMAT tag, one entry per sample.
    fn format(&self, tag: &[u8]) -> Option<Vec<TypedVec>>;
}

impl<R: Record + ?Sized> Record for Box<R> {
    fn chrom(&self) -> &str {
        (**self).chrom()
    }

    fn pos(&self) -> i64 {
        (**self).pos()
    }

    fn ref_allele(&self) -> &[u8] {
        (**self).ref_allele()
    }

    fn alt_alleles(&self) -> &[Text] {
        (**self).alt_alleles()
    }

    fn qual(&self) -> Option<f32> {
        (**self).qual()
    }

    fn info(&self, tag: &[u8]) -> Option<TypedVec> {
        (**self).info(tag)
    }

    fn format(&self, tag: &[u8]) -> Option<Vec<TypedVec>> {
        (**self).format(tag)
    }
}
