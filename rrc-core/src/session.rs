// Decoder session
// Owns the model bank and the carry state that links consecutive reads

use rrc_common::{CodecError, CodecLimits, ModelBank, Result, SymbolDecoder};

use crate::cigar::{absolute_to_relative, build_cigar, Cigar};
use crate::edits::{decode_edit_lists, decode_snp_position, EditCounts, Snp};
use crate::env_cache::debug_fields;
use crate::fields::{
    decode_base, decode_explicit_cigar, decode_flag, decode_match, decode_position,
    decode_read_length,
};
use crate::merge::{copy_match, ReadMerger};
use crate::record::{EditPath, ReadRecord};
use crate::reference::{Reference, DEFAULT_MAX_REFERENCE_LENGTH};

/// Configuration for a decoder session
#[derive(Debug, Clone)]
pub struct DecoderConfig {
    pub verbosity: u32,
    /// Longest chromosome the reference loader accepts
    pub max_reference_length: u64,
    /// Refuse reads whose indel path has unequal deletion and insertion counts
    pub strict_indel_balance: bool,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        DecoderConfig {
            verbosity: 1,
            max_reference_length: DEFAULT_MAX_REFERENCE_LENGTH,
            strict_indel_balance: false,
        }
    }
}

/// Sequential read decoder.
///
/// Reads must be decoded in stream order: every decode feeds the model
/// statistics and the previous position/match carried into the next one.
/// `start_chromosome` resets the position carry only; model statistics and
/// the previous match outcome live for the whole session.
pub struct DecoderSession {
    config: DecoderConfig,
    models: ModelBank,
    explicit_cigars: bool,
    previous_position: u32,
    previous_match: bool,
    reads_decoded: u64,
    indel_imbalances: u64,
}

impl DecoderSession {
    pub fn new(limits: CodecLimits, explicit_cigars: bool, config: DecoderConfig) -> Result<Self> {
        Ok(DecoderSession {
            config,
            models: ModelBank::new(limits)?,
            explicit_cigars,
            previous_position: 0,
            previous_match: false,
            reads_decoded: 0,
            indel_imbalances: 0,
        })
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    pub fn models(&self) -> &ModelBank {
        &self.models
    }

    pub fn previous_position(&self) -> u32 {
        self.previous_position
    }

    pub fn previous_match(&self) -> bool {
        self.previous_match
    }

    pub fn reads_decoded(&self) -> u64 {
        self.reads_decoded
    }

    /// Reads whose deletion and insertion counts disagreed
    pub fn indel_imbalances(&self) -> u64 {
        self.indel_imbalances
    }

    /// Positions restart from 0 on a new chromosome
    pub fn start_chromosome(&mut self) {
        self.previous_position = 0;
    }

    /// Decode the next read against `reference`.
    ///
    /// Field order: length, position, flag, match flag, then (mismatch only)
    /// counts, deletions, insertions and the SNPs interleaved with the merge,
    /// and finally the CIGAR override when the stream carries one.
    pub fn decode_read<D: SymbolDecoder>(
        &mut self,
        source: &mut D,
        reference: &Reference,
    ) -> Result<ReadRecord> {
        let length = decode_read_length(&mut self.models, source)?;
        let max_read_length = self.models.limits.max_read_length;
        if length > max_read_length {
            return Err(CodecError::CapacityExceeded {
                what: "read length",
                value: length as u64,
                limit: max_read_length as u64,
            });
        }

        let position = decode_position(&mut self.models, source, self.previous_position)?;
        self.previous_position = position.position;

        let flag = decode_flag(&mut self.models, source)?;
        let exact = decode_match(&mut self.models, source, position.delta, self.previous_match)?;
        self.previous_match = exact;

        if debug_fields() {
            eprintln!(
                "RRC_DEBUG_FIELDS: read {} len={length} pos={} flag={:#x} match={exact}",
                self.reads_decoded, position.position, flag.flag
            );
        }

        let (sequence, snps, cigar, edit_path) = if exact {
            let sequence = copy_match(reference, position.position, length)?;
            (sequence, Vec::new(), Cigar::all_match(length), EditPath::Match)
        } else {
            self.reconstruct(source, reference, position.position, length, flag.reverse)?
        };

        let explicit_cigar = if self.explicit_cigars {
            decode_explicit_cigar(&mut self.models, source)?
        } else {
            None
        };

        self.reads_decoded += 1;
        Ok(ReadRecord {
            length,
            position: position.position,
            flag: flag.flag,
            reverse: flag.reverse,
            edit_path,
            sequence,
            snps,
            cigar,
            explicit_cigar,
        })
    }

    fn reconstruct<D: SymbolDecoder>(
        &mut self,
        source: &mut D,
        reference: &Reference,
        position: u32,
        length: u32,
        reverse: bool,
    ) -> Result<(Vec<u8>, Vec<Snp>, Cigar, EditPath)> {
        let lists = decode_edit_lists(&mut self.models, source, length, reverse)?;
        self.check_indel_balance(&lists.counts)?;

        let mut merger = ReadMerger::new(
            reference,
            position,
            length,
            &lists.deletions,
            &lists.insertions,
        )?;

        let mut snps = Vec::with_capacity(lists.counts.snps() as usize);
        let mut previous = 0;
        for _ in 0..lists.counts.snps() {
            let offset = decode_snp_position(&mut self.models, source, previous, length, reverse)?;
            merger.advance_to(offset)?;
            let context = merger.reference_base()?;
            let base = decode_base(&mut self.models, source, context)?;
            merger.substitute(offset, base)?;
            snps.push(Snp {
                position: offset,
                reference: context,
                base,
            });
            previous = offset;
        }
        let (sequence, stats) = merger.finish()?;

        let relative = absolute_to_relative(&lists.deletions, &lists.insertions);
        let cigar = build_cigar(&relative, length);

        Ok((
            sequence,
            snps,
            cigar,
            EditPath::Edited {
                counts: lists.counts,
                stats,
            },
        ))
    }

    fn check_indel_balance(&mut self, counts: &EditCounts) -> Result<()> {
        if counts.deletions() == counts.insertions() {
            return Ok(());
        }
        self.indel_imbalances += 1;
        if self.config.strict_indel_balance {
            return Err(CodecError::corrupt(format!(
                "{} deletions but {} insertions",
                counts.deletions(),
                counts.insertions()
            )));
        }
        if self.config.verbosity > 0 {
            eprintln!(
                "Warning: read {} has {} deletions but {} insertions",
                self.reads_decoded,
                counts.deletions(),
                counts.insertions()
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rrc_common::FrequencyTable;
    use std::collections::VecDeque;

    struct Scripted(VecDeque<u32>);

    impl SymbolDecoder for Scripted {
        fn decode_symbol(&mut self, table: &FrequencyTable) -> Result<u32> {
            let symbol = self.0.pop_front().ok_or(CodecError::TruncatedStream)?;
            assert!(table.frequency(symbol) > 0, "unscripted symbol {symbol}");
            Ok(symbol)
        }
    }

    fn session(config: DecoderConfig) -> DecoderSession {
        DecoderSession::new(CodecLimits::default(), false, config).unwrap()
    }

    fn quiet() -> DecoderConfig {
        DecoderConfig {
            verbosity: 0,
            ..DecoderConfig::default()
        }
    }

    #[test]
    fn test_match_read() {
        let reference = Reference::new("chr1", b"ACGTACGTAC".to_vec());
        let mut s = session(quiet());
        // len 4, position escape raw 4 (0 + 4 - 1 = 3), flag 0, match
        let mut src = Scripted([4, 0, 0, 0, 0, 0, 0, 0, 4, 0, 1].into_iter().collect());
        let record = s.decode_read(&mut src, &reference).unwrap();
        assert_eq!(record.sequence, b"GTAC");
        assert_eq!(record.cigar.to_string(), "4M");
        assert_eq!(record.position, 3);
        assert!(record.is_match());
        assert!(s.previous_match());
        assert_eq!(s.previous_position(), 3);
    }

    #[test]
    fn test_wrapped_position_is_an_error() {
        let reference = Reference::new("chr1", b"ACGTACGTAC".to_vec());
        let mut s = session(quiet());
        // escape with raw delta 0 at the chromosome start, then a match
        let mut src = Scripted([4, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1].into_iter().collect());
        let err = s.decode_read(&mut src, &reference).unwrap_err();
        assert!(err.is_corruption(), "{err}");
        assert!(matches!(err, CodecError::ReferenceOverrun { .. }));
    }

    #[test]
    fn test_read_length_ceiling() {
        let reference = Reference::new("chr1", b"ACGT".to_vec());
        let mut s = session(quiet());
        let mut src = Scripted([0, 8, 0, 0].into_iter().collect());
        let err = s.decode_read(&mut src, &reference).unwrap_err();
        assert!(err.is_capacity());
    }

    #[test]
    fn test_indel_imbalance_policy() {
        let reference = Reference::new("chr1", b"ACGTACGTAC".to_vec());
        // len 4, pos 1, flag 0, mismatch, snps=0 -> triple (0, 1, 0), deletion at 1
        let script = [4, 0, 0, 0, 0, 0, 0, 0, 2, 0, 0, 0, 0, 1, 0, 1];

        let mut lenient = session(quiet());
        let mut src = Scripted(script.into_iter().collect());
        let record = lenient.decode_read(&mut src, &reference).unwrap();
        assert_eq!(record.sequence, b"AGTA");
        assert_eq!(record.cigar.to_string(), "1M1D3M");
        assert_eq!(lenient.indel_imbalances(), 1);

        let mut strict = session(DecoderConfig {
            strict_indel_balance: true,
            ..quiet()
        });
        let mut src = Scripted(script.into_iter().collect());
        assert!(strict.decode_read(&mut src, &reference).unwrap_err().is_corruption());
    }

    #[test]
    fn test_start_chromosome_resets_position_only() {
        let reference = Reference::new("chr1", b"ACGTACGTAC".to_vec());
        let mut s = session(quiet());
        let mut src = Scripted([1, 0, 0, 0, 0, 0, 0, 0, 6, 0, 1].into_iter().collect());
        s.decode_read(&mut src, &reference).unwrap();
        assert_eq!(s.previous_position(), 5);

        s.start_chromosome();
        assert_eq!(s.previous_position(), 0);
        assert!(s.previous_match());
        assert_eq!(s.models().position_alphabet.cardinality(), 2);
    }
}
