// RRC Core Types and Constants

use crate::error::{CodecError, Result};

/// Container magic bytes
pub const RRC_MAGIC: &[u8; 3] = b"RRC";

/// Container format version (follows the magic)
pub const RRC_FORMAT_VERSION: u8 = 1;

/// SAM flag bit marking a read aligned to the reverse strand
pub const REVERSE_STRAND_MASK: u32 = 0x10;

/// The flag model covers the full 12-bit SAM flag word
pub const FLAG_ALPHABET_SIZE: u32 = 1 << 12;

/// Largest read length a container may declare
pub const MAX_CODEC_READ_LENGTH: u32 = u16::MAX as u32;

/// Largest growable-alphabet ceiling a container may declare
pub const MAX_CODEC_ALPHABET_CARDINALITY: u32 = 1 << 20;

/// Largest number of read-position buckets for the SNP offset context
pub const MAX_SNP_POSITION_BUCKETS: u32 = 64;

/// Nucleotide classes used as substitution contexts and decoded base symbols
/// (A=0, C=1, G=2, T=3, N=4, Other=5)
///
/// `Other` only ever appears as a context: inserted bases have no reference
/// base, so they are decoded under this placeholder class.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BasePair {
    A = 0,
    C = 1,
    G = 2,
    T = 3,
    N = 4,
    Other = 5,
}

impl BasePair {
    /// Number of context classes (including `Other`)
    pub const CONTEXTS: u32 = 6;

    /// Number of decodable base symbols (A, C, G, T, N)
    pub const SYMBOLS: u32 = 5;

    /// Classify an ASCII base; anything outside ACGT falls into N
    #[inline]
    pub fn from_ascii(c: u8) -> Self {
        match c.to_ascii_uppercase() {
            b'A' => BasePair::A,
            b'C' => BasePair::C,
            b'G' => BasePair::G,
            b'T' => BasePair::T,
            _ => BasePair::N,
        }
    }

    /// Printable base character (`Other` has no base and prints as N)
    #[inline]
    pub fn to_ascii(self) -> u8 {
        match self {
            BasePair::A => b'A',
            BasePair::C => b'C',
            BasePair::G => b'G',
            BasePair::T => b'T',
            BasePair::N | BasePair::Other => b'N',
        }
    }

    /// Convert a decoded base symbol back to a base
    #[inline]
    pub fn from_symbol(val: u32) -> Option<Self> {
        match val {
            0 => Some(BasePair::A),
            1 => Some(BasePair::C),
            2 => Some(BasePair::G),
            3 => Some(BasePair::T),
            4 => Some(BasePair::N),
            _ => None,
        }
    }

    /// Context id of this class in the base model
    #[inline]
    pub fn context(self) -> u32 {
        self as u32
    }
}

/// Limits that shape the context models.
///
/// Encoder and decoder must agree on every field, so they are carried in the
/// container header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecLimits {
    /// Maximum read length; also bounds the SNP and indel count alphabets
    pub max_read_length: u32,
    /// Ceiling on the number of distinct position deltas (index 0 included)
    pub max_alphabet_cardinality: u32,
    /// Number of read-position buckets mixed into the SNP offset context
    pub snp_position_buckets: u32,
}

impl Default for CodecLimits {
    fn default() -> Self {
        CodecLimits {
            max_read_length: 1024,
            max_alphabet_cardinality: 1 << 16,
            snp_position_buckets: 8,
        }
    }
}

impl CodecLimits {
    /// Reject limits the models cannot be built for
    pub fn validate(&self) -> Result<()> {
        if self.max_read_length == 0 || self.max_read_length > MAX_CODEC_READ_LENGTH {
            return Err(CodecError::InvalidContainer(format!(
                "max_read_length must be in 1..={MAX_CODEC_READ_LENGTH}, got {}",
                self.max_read_length
            )));
        }
        if self.max_alphabet_cardinality < 2
            || self.max_alphabet_cardinality > MAX_CODEC_ALPHABET_CARDINALITY
        {
            return Err(CodecError::InvalidContainer(format!(
                "max_alphabet_cardinality must be in 2..={MAX_CODEC_ALPHABET_CARDINALITY}, got {}",
                self.max_alphabet_cardinality
            )));
        }
        if self.snp_position_buckets == 0 || self.snp_position_buckets > MAX_SNP_POSITION_BUCKETS
        {
            return Err(CodecError::InvalidContainer(format!(
                "snp_position_buckets must be in 1..={MAX_SNP_POSITION_BUCKETS}, got {}",
                self.snp_position_buckets
            )));
        }
        Ok(())
    }

    /// Bits reserved for the running offset inside a variant context.
    ///
    /// One bit more than the read length needs: deletion offsets are
    /// reference-relative and can run past the read length.
    #[inline]
    pub fn variant_offset_bits(&self) -> u32 {
        (u32::BITS - self.max_read_length.leading_zeros()) + 1
    }

    /// Alphabet size of the variant offset model
    #[inline]
    pub fn variant_alphabet_size(&self) -> u32 {
        1 << self.variant_offset_bits()
    }

    /// Number of variant offset contexts (bucket, running offset, strand bit)
    #[inline]
    pub fn variant_contexts(&self) -> u32 {
        self.snp_position_buckets << (self.variant_offset_bits() + 1)
    }

    /// Alphabet size of the SNP and indel count models
    #[inline]
    pub fn count_alphabet_size(&self) -> u32 {
        self.max_read_length + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_classification() {
        assert_eq!(BasePair::from_ascii(b'A'), BasePair::A);
        assert_eq!(BasePair::from_ascii(b'c'), BasePair::C);
        assert_eq!(BasePair::from_ascii(b'G'), BasePair::G);
        assert_eq!(BasePair::from_ascii(b't'), BasePair::T);
        assert_eq!(BasePair::from_ascii(b'N'), BasePair::N);
        assert_eq!(BasePair::from_ascii(b'R'), BasePair::N);
    }

    #[test]
    fn test_symbol_mapping() {
        for sym in 0..BasePair::SYMBOLS {
            let base = BasePair::from_symbol(sym).unwrap();
            assert_eq!(base as u32, sym);
        }
        assert_eq!(BasePair::from_symbol(5), None);
        assert_eq!(BasePair::Other.to_ascii(), b'N');
    }

    #[test]
    fn test_default_limits_shape() {
        let limits = CodecLimits::default();
        limits.validate().unwrap();
        // 1024 needs 11 bits, plus one spare bit
        assert_eq!(limits.variant_offset_bits(), 12);
        assert_eq!(limits.variant_alphabet_size(), 4096);
        assert_eq!(limits.variant_contexts(), 8 << 13);
        assert!(limits.variant_alphabet_size() > 2 * limits.max_read_length);
    }

    #[test]
    fn test_invalid_limits() {
        let mut limits = CodecLimits::default();
        limits.snp_position_buckets = 0;
        assert!(limits.validate().is_err());

        let mut limits = CodecLimits::default();
        limits.max_read_length = MAX_CODEC_READ_LENGTH + 1;
        assert!(limits.validate().is_err());

        let mut limits = CodecLimits::default();
        limits.max_alphabet_cardinality = 1;
        assert!(limits.validate().is_err());
    }
}
