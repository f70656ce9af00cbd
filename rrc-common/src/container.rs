// Container framing
// [magic "RRC"][version][flags][limits][block count][read count per block]
// followed by the arithmetic-coded payload up to end of file

use std::io::{Read, Write};

use crate::error::{CodecError, Result};
use crate::types::{CodecLimits, RRC_FORMAT_VERSION, RRC_MAGIC};
use crate::varint::{read_varint, read_varint_u32, write_varint};

const FLAG_EXPLICIT_CIGARS: u8 = 0x01;

/// Header preceding the arithmetic-coded read payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerHeader {
    pub limits: CodecLimits,
    /// Every read is followed by a CIGAR flag (and possibly an explicit CIGAR)
    pub explicit_cigars: bool,
    /// Number of reads per chromosome block, in reference order
    pub block_read_counts: Vec<u64>,
}

impl ContainerHeader {
    pub fn new(limits: CodecLimits, explicit_cigars: bool) -> Self {
        ContainerHeader {
            limits,
            explicit_cigars,
            block_read_counts: Vec::new(),
        }
    }

    /// Total number of reads over all blocks
    pub fn total_reads(&self) -> u64 {
        self.block_read_counts.iter().sum()
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> Result<usize> {
        let flags = if self.explicit_cigars {
            FLAG_EXPLICIT_CIGARS
        } else {
            0
        };
        writer.write_all(RRC_MAGIC)?;
        writer.write_all(&[RRC_FORMAT_VERSION, flags])?;

        let mut written = RRC_MAGIC.len() + 2;
        written += write_varint(writer, self.limits.max_read_length as u64)?;
        written += write_varint(writer, self.limits.max_alphabet_cardinality as u64)?;
        written += write_varint(writer, self.limits.snp_position_buckets as u64)?;
        written += write_varint(writer, self.block_read_counts.len() as u64)?;
        for &count in &self.block_read_counts {
            written += write_varint(writer, count)?;
        }
        Ok(written)
    }

    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let mut magic = [0u8; 3];
        reader.read_exact(&mut magic)?;
        if &magic != RRC_MAGIC {
            return Err(CodecError::InvalidContainer(format!(
                "bad magic {magic:02x?}"
            )));
        }

        let mut version_flags = [0u8; 2];
        reader.read_exact(&mut version_flags)?;
        let [version, flags] = version_flags;
        if version != RRC_FORMAT_VERSION {
            return Err(CodecError::InvalidContainer(format!(
                "unsupported format version {version} (expected {RRC_FORMAT_VERSION})"
            )));
        }
        if flags & !FLAG_EXPLICIT_CIGARS != 0 {
            return Err(CodecError::InvalidContainer(format!(
                "unknown header flags {flags:#04x}"
            )));
        }

        let limits = CodecLimits {
            max_read_length: read_varint_u32(reader, "max_read_length")?,
            max_alphabet_cardinality: read_varint_u32(reader, "max_alphabet_cardinality")?,
            snp_position_buckets: read_varint_u32(reader, "snp_position_buckets")?,
        };
        limits.validate()?;

        let num_blocks = read_varint_u32(reader, "block count")?;
        let mut block_read_counts = Vec::with_capacity(num_blocks.min(4096) as usize);
        for _ in 0..num_blocks {
            block_read_counts.push(read_varint(reader)?.0);
        }

        Ok(ContainerHeader {
            limits,
            explicit_cigars: flags & FLAG_EXPLICIT_CIGARS != 0,
            block_read_counts,
        })
    }
}
