// Read encoder
// Field-by-field mirror of the decoder: same models, same contexts, same
// order, so a stream written here decodes back to the same reads

use rrc_common::{
    match_context, snp_position_bucket, variant_context, BasePair, CodecError, CodecLimits,
    ModelBank, Result, SymbolEncoder, REVERSE_STRAND_MASK,
};

/// Everything the encoder needs to know about one aligned read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadEdits {
    pub length: u32,
    /// 1-based alignment position
    pub position: u32,
    pub flag: u32,
    /// Read equals the reference window; the edit lists are ignored
    pub exact_match: bool,
    /// (target offset, substituted base), increasing offsets
    pub snps: Vec<(u32, BasePair)>,
    /// Reference offsets (from the aligned position) of deleted bases
    pub deletions: Vec<u32>,
    /// (target offset, inserted base), increasing offsets
    pub insertions: Vec<(u32, BasePair)>,
    pub explicit_cigar: Option<String>,
}

impl ReadEdits {
    pub fn exact(length: u32, position: u32, flag: u32) -> Self {
        ReadEdits {
            length,
            position,
            flag,
            exact_match: true,
            snps: Vec::new(),
            deletions: Vec::new(),
            insertions: Vec::new(),
            explicit_cigar: None,
        }
    }

    /// A mismatching read with no edits yet
    pub fn edited(length: u32, position: u32, flag: u32) -> Self {
        ReadEdits {
            exact_match: false,
            ..ReadEdits::exact(length, position, flag)
        }
    }

    pub fn with_snp(mut self, offset: u32, base: BasePair) -> Self {
        self.snps.push((offset, base));
        self
    }

    pub fn with_deletion(mut self, reference_offset: u32) -> Self {
        self.deletions.push(reference_offset);
        self
    }

    pub fn with_insertion(mut self, offset: u32, base: BasePair) -> Self {
        self.insertions.push((offset, base));
        self
    }

    pub fn with_cigar(mut self, cigar: impl Into<String>) -> Self {
        self.explicit_cigar = Some(cigar.into());
        self
    }

    /// Reference offset under each target index, `None` for inserted bases.
    ///
    /// Same precedence as the decoder's merge: deletions at or behind the
    /// reference cursor are skipped first, then an insertion due at the
    /// current target index, then one reference base.
    pub fn reference_offsets(&self) -> Vec<Option<u32>> {
        let mut offsets = Vec::with_capacity(self.length as usize);
        let (mut r, mut d, mut i) = (0u32, 0usize, 0usize);
        while (offsets.len() as u32) < self.length {
            let t = offsets.len() as u32;
            if d < self.deletions.len() && self.deletions[d] <= r {
                r += 1;
                d += 1;
            } else if i < self.insertions.len() && self.insertions[i].0 == t {
                offsets.push(None);
                i += 1;
            } else {
                offsets.push(Some(r));
                r += 1;
            }
        }
        offsets
    }
}

fn check_sorted(what: &str, positions: impl Iterator<Item = u32>, strict: bool) -> Result<()> {
    let mut previous: Option<u32> = None;
    for p in positions {
        if let Some(prev) = previous {
            if p < prev || (strict && p == prev) {
                return Err(CodecError::corrupt(format!(
                    "{what} offsets out of order: {p} after {prev}"
                )));
            }
        }
        previous = Some(p);
    }
    Ok(())
}

/// Encoder-side session: model bank plus the previous position/match carry
pub struct ReadEncoder {
    models: ModelBank,
    explicit_cigars: bool,
    previous_position: u32,
    previous_match: bool,
    reads_encoded: u64,
}

impl ReadEncoder {
    pub fn new(limits: CodecLimits, explicit_cigars: bool) -> Result<Self> {
        Ok(ReadEncoder {
            models: ModelBank::new(limits)?,
            explicit_cigars,
            previous_position: 0,
            previous_match: false,
            reads_encoded: 0,
        })
    }

    pub fn reads_encoded(&self) -> u64 {
        self.reads_encoded
    }

    pub fn models(&self) -> &ModelBank {
        &self.models
    }

    pub fn start_chromosome(&mut self) {
        self.previous_position = 0;
    }

    /// Encode one read aligned against `reference` (the chromosome bases)
    pub fn encode_read<E: SymbolEncoder>(
        &mut self,
        sink: &mut E,
        read: &ReadEdits,
        reference: &[u8],
    ) -> Result<()> {
        for k in 0..4 {
            let byte = (read.length >> (8 * k)) & 0xff;
            self.models.read_length.encode(k, byte, sink)?;
        }

        let delta = self.encode_position(sink, read.position)?;
        self.models.flag.encode(0, read.flag, sink)?;

        let ctx = match_context(delta, self.previous_match);
        self.models
            .match_flag
            .encode(ctx, u32::from(read.exact_match), sink)?;
        self.previous_match = read.exact_match;

        if !read.exact_match {
            self.encode_edits(sink, read, reference)?;
        }

        if self.explicit_cigars {
            self.encode_cigar(sink, read.explicit_cigar.as_deref())?;
        }
        self.reads_encoded += 1;
        Ok(())
    }

    /// Returns the delta seen by the match context
    fn encode_position<E: SymbolEncoder>(&mut self, sink: &mut E, position: u32) -> Result<u32> {
        let previous = self.previous_position;
        let raw = position.wrapping_sub(previous).wrapping_add(1);

        match self.models.position_alphabet.index_of(raw) {
            Some(index) => self.models.position.encode(0, index, sink)?,
            None => {
                self.models.position.encode(0, 0, sink)?;
                for k in 0..4 {
                    let byte = (raw >> (8 * (3 - k))) & 0xff;
                    self.models.position_escape.encode(k, byte, sink)?;
                }
                let index = self.models.position_alphabet.register(raw)?;
                self.models.position.observe(0, index)?;
            }
        }

        self.previous_position = position;
        Ok(if position < previous {
            position
        } else {
            position.wrapping_sub(previous).wrapping_add(1)
        })
    }

    fn encode_edits<E: SymbolEncoder>(
        &mut self,
        sink: &mut E,
        read: &ReadEdits,
        reference: &[u8],
    ) -> Result<()> {
        check_sorted("SNP", read.snps.iter().map(|s| s.0), true)?;
        check_sorted("deletion", read.deletions.iter().copied(), false)?;
        check_sorted("insertion", read.insertions.iter().map(|i| i.0), true)?;

        let reverse = read.flag & REVERSE_STRAND_MASK != 0;
        let bits = self.models.limits.variant_offset_bits();

        if read.deletions.is_empty() && read.insertions.is_empty() && !read.snps.is_empty() {
            self.models.snp_count.encode(0, read.snps.len() as u32, sink)?;
        } else {
            self.models.snp_count.encode(0, 0, sink)?;
            for count in [read.snps.len(), read.deletions.len(), read.insertions.len()] {
                self.models.indel_count.encode(0, count as u32, sink)?;
            }
        }

        let mut running = 0u32;
        for &d in &read.deletions {
            let ctx = variant_context(0, running, reverse, bits)?;
            self.models.variant.encode(ctx, d - running, sink)?;
            running = d;
        }

        let mut running = 0u32;
        for &(offset, base) in &read.insertions {
            let ctx = variant_context(0, running, reverse, bits)?;
            self.models.variant.encode(ctx, offset - running, sink)?;
            self.models
                .base
                .encode(BasePair::Other.context(), base as u32, sink)?;
            running = offset;
        }

        let reference_offsets = read.reference_offsets();
        let buckets = self.models.limits.snp_position_buckets;
        let mut previous = 0u32;
        for &(offset, base) in &read.snps {
            let bucket = snp_position_bucket(previous + 1, read.length, buckets);
            let ctx = variant_context(bucket, previous, reverse, bits)?;
            self.models.variant.encode(ctx, offset - previous, sink)?;

            let reference_offset = reference_offsets
                .get(offset as usize)
                .copied()
                .flatten()
                .ok_or_else(|| {
                    CodecError::corrupt(format!("SNP at target offset {offset} has no reference base"))
                })?;
            let index = (read.position as usize + reference_offset as usize).saturating_sub(1);
            let context = reference
                .get(index)
                .map(|&b| BasePair::from_ascii(b))
                .ok_or(CodecError::ReferenceOverrun {
                    position: index as u64 + 1,
                    reference_len: reference.len() as u64,
                })?;
            self.models.base.encode(context.context(), base as u32, sink)?;
            previous = offset;
        }
        Ok(())
    }

    fn encode_cigar<E: SymbolEncoder>(&mut self, sink: &mut E, cigar: Option<&str>) -> Result<()> {
        let Some(cigar) = cigar else {
            return self.models.cigar_flag.encode(0, 1, sink);
        };
        if cigar.len() > 255 {
            return Err(CodecError::CapacityExceeded {
                what: "explicit CIGAR length",
                value: cigar.len() as u64,
                limit: 255,
            });
        }
        self.models.cigar_flag.encode(0, 0, sink)?;
        self.models.cigar.encode(0, cigar.len() as u32, sink)?;
        for c in cigar.bytes() {
            self.models.cigar.encode(0, c as u32, sink)?;
        }
        Ok(())
    }
}
