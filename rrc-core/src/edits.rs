// Edit-list assembly
// Decodes the counts and positions of the deletions, insertions and SNPs of
// a read that does not match its reference window exactly

use rrc_common::{snp_position_bucket, BasePair, CodecError, ModelBank, Result, SymbolDecoder};

use crate::fields::{decode_base, decode_indel_count, decode_snp_count, decode_variant_offset};

/// How the edit counts of a mismatching read were coded.
///
/// Most mismatching reads carry only substitutions, so the SNP count is
/// coded first on its own. A zero there is a marker: the indel-count model
/// is then read three times, giving the real SNP count, the deletion count
/// and the insertion count, in that order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditCounts {
    /// Non-zero SNP count, no indels
    DirectSnp { snps: u32 },
    /// Zero SNP count followed by the three indel-model decodes
    IndelTriple {
        snps: u32,
        deletions: u32,
        insertions: u32,
    },
}

impl EditCounts {
    pub fn snps(&self) -> u32 {
        match *self {
            EditCounts::DirectSnp { snps } | EditCounts::IndelTriple { snps, .. } => snps,
        }
    }

    pub fn deletions(&self) -> u32 {
        match *self {
            EditCounts::DirectSnp { .. } => 0,
            EditCounts::IndelTriple { deletions, .. } => deletions,
        }
    }

    pub fn insertions(&self) -> u32 {
        match *self {
            EditCounts::DirectSnp { .. } => 0,
            EditCounts::IndelTriple { insertions, .. } => insertions,
        }
    }
}

/// A base present in the read but not in the reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Insertion {
    /// Target (read) offset of the inserted base
    pub position: u32,
    pub base: BasePair,
}

/// A substituted read base
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snp {
    /// Target (read) offset
    pub position: u32,
    /// Reference base it replaces (the decode context)
    pub reference: BasePair,
    pub base: BasePair,
}

/// Deletions and insertions of one read, absolute and position-sorted.
/// SNPs are decoded later, interleaved with the merge, because their base
/// context depends on the reference cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditLists {
    pub counts: EditCounts,
    /// Reference-relative offsets of deleted reference bases
    pub deletions: Vec<u32>,
    pub insertions: Vec<Insertion>,
}

fn check_count(what: &'static str, count: u32, max_read_length: u32) -> Result<u32> {
    if count > max_read_length {
        return Err(CodecError::CapacityExceeded {
            what,
            value: count as u64,
            limit: max_read_length as u64,
        });
    }
    Ok(count)
}

/// Decode the SNP count and, behind a zero, the indel triple
pub fn decode_edit_counts<D: SymbolDecoder>(
    models: &mut ModelBank,
    source: &mut D,
    read_length: u32,
) -> Result<EditCounts> {
    let max = models.limits.max_read_length;
    let snps = check_count("SNP count", decode_snp_count(models, source)?, max)?;

    let counts = if snps != 0 {
        EditCounts::DirectSnp { snps }
    } else {
        let snps = check_count("SNP count", decode_indel_count(models, source)?, max)?;
        let deletions = check_count("deletion count", decode_indel_count(models, source)?, max)?;
        let insertions = check_count("insertion count", decode_indel_count(models, source)?, max)?;
        EditCounts::IndelTriple {
            snps,
            deletions,
            insertions,
        }
    };

    if counts.snps() + counts.insertions() > read_length {
        return Err(CodecError::corrupt(format!(
            "{} SNPs and {} insertions in a read of length {read_length}",
            counts.snps(),
            counts.insertions()
        )));
    }
    Ok(counts)
}

/// Decode counts, then every deletion and insertion position (and the
/// inserted bases), each list as a running sum seeded at zero
pub fn decode_edit_lists<D: SymbolDecoder>(
    models: &mut ModelBank,
    source: &mut D,
    read_length: u32,
    reverse: bool,
) -> Result<EditLists> {
    let counts = decode_edit_counts(models, source, read_length)?;

    let mut deletions = Vec::with_capacity(counts.deletions() as usize);
    let mut running = 0u32;
    for _ in 0..counts.deletions() {
        running += decode_variant_offset(models, source, 0, running, reverse)?;
        deletions.push(running);
    }

    // An inserted base has no reference base, so it decodes under `Other`
    let mut insertions = Vec::with_capacity(counts.insertions() as usize);
    let mut running = 0u32;
    for _ in 0..counts.insertions() {
        running += decode_variant_offset(models, source, 0, running, reverse)?;
        let base = decode_base(models, source, BasePair::Other)?;
        insertions.push(Insertion {
            position: running,
            base,
        });
    }

    Ok(EditLists {
        counts,
        deletions,
        insertions,
    })
}

/// Decode the next SNP offset and return the absolute target position.
///
/// The context mixes the read-position bucket of `previous` (the last SNP
/// position, 0 before the first) with `previous` itself and the strand bit.
pub fn decode_snp_position<D: SymbolDecoder>(
    models: &mut ModelBank,
    source: &mut D,
    previous: u32,
    read_length: u32,
    reverse: bool,
) -> Result<u32> {
    let bucket = snp_position_bucket(
        previous + 1,
        read_length,
        models.limits.snp_position_buckets,
    );
    let offset = decode_variant_offset(models, source, bucket, previous, reverse)?;
    Ok(previous + offset)
}
