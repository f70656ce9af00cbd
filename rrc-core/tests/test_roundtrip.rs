// Round trips through the real arithmetic coder
// Streams are produced by rrc-writer and decoded by DecoderSession

use rrc_common::{ArithmeticDecoder, ArithmeticEncoder, BasePair, CodecError, CodecLimits};
use rrc_core::{DecoderConfig, DecoderSession, EditCounts, EditPath, ReadRecord, Reference};
use rrc_writer::{ReadEdits, ReadEncoder};

fn quiet() -> DecoderConfig {
    DecoderConfig {
        verbosity: 0,
        ..DecoderConfig::default()
    }
}

/// Encode `reads` against one chromosome
fn encode(limits: CodecLimits, reference: &[u8], reads: &[ReadEdits]) -> Vec<u8> {
    let mut encoder = ReadEncoder::new(limits, false).unwrap();
    let mut sink = ArithmeticEncoder::new(Vec::new());
    for read in reads {
        encoder.encode_read(&mut sink, read, reference).unwrap();
    }
    sink.finish().unwrap().0
}

fn decode_all(
    limits: CodecLimits,
    reference: &Reference,
    payload: &[u8],
    n: usize,
) -> Vec<ReadRecord> {
    let mut session = DecoderSession::new(limits, false, quiet()).unwrap();
    let mut source = ArithmeticDecoder::new(payload).unwrap();
    (0..n)
        .map(|_| session.decode_read(&mut source, reference).unwrap())
        .collect()
}

/// What the read should look like, built without the merge engine
fn expected_sequence(read: &ReadEdits, reference: &[u8]) -> Vec<u8> {
    let mut insertions = read.insertions.iter();
    let mut sequence: Vec<u8> = read
        .reference_offsets()
        .into_iter()
        .map(|offset| match offset {
            Some(r) => reference[(read.position + r - 1) as usize],
            None => insertions.next().unwrap().1.to_ascii(),
        })
        .collect();
    for &(t, base) in &read.snps {
        sequence[t as usize] = base.to_ascii();
    }
    sequence
}

/// Small deterministic generator so failures are reproducible
struct Lcg(u64);

impl Lcg {
    fn next(&mut self, bound: u32) -> u32 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        ((self.0 >> 33) % bound as u64) as u32
    }

    fn base(&mut self) -> BasePair {
        BasePair::from_symbol(self.next(4)).unwrap()
    }

    /// `count` distinct values below `bound`, sorted
    fn distinct(&mut self, count: u32, bound: u32, exclude: &[u32]) -> Vec<u32> {
        let mut values = Vec::new();
        while (values.len() as u32) < count {
            let v = self.next(bound);
            if !values.contains(&v) && !exclude.contains(&v) {
                values.push(v);
            }
        }
        values.sort_unstable();
        values
    }
}

fn random_reference(rng: &mut Lcg, len: usize) -> Vec<u8> {
    (0..len).map(|_| rng.base().to_ascii()).collect()
}

fn random_read(rng: &mut Lcg, reference_len: u32) -> ReadEdits {
    let length = 1 + rng.next(150);
    let flag = if rng.next(2) == 0 { 0 } else { 16 };

    let kind = rng.next(4);
    let (n_snps, n_dels, n_ins) = match kind {
        0 => (0, 0, 0),
        1 => (1 + rng.next(length.min(4)), 0, 0),
        _ => {
            let n_ins = rng.next(length.min(3));
            let n_dels = rng.next(4);
            let n_snps = rng.next((length - n_ins).min(3) + 1);
            (n_snps, n_dels, n_ins)
        }
    };

    let span = length + n_dels;
    let position = 1 + rng.next(reference_len - span + 1);
    if kind == 0 {
        return ReadEdits::exact(length, position, flag);
    }

    let mut read = ReadEdits::edited(length, position, flag);
    let insertions = rng.distinct(n_ins, length, &[]);
    for &t in &insertions {
        read = read.with_insertion(t, rng.base());
    }
    for t in rng.distinct(n_snps, length, &insertions) {
        read = read.with_snp(t, rng.base());
    }
    // offsets below the reference bases the read covers are always reached
    let mut deletions: Vec<u32> = (0..n_dels).map(|_| rng.next(length - n_ins)).collect();
    deletions.sort_unstable();
    for d in deletions {
        read = read.with_deletion(d);
    }
    read
}

#[test]
fn test_concrete_scenarios() {
    let limits = CodecLimits::default();

    let reference = b"ACGTACGTAC";
    let reads = vec![
        ReadEdits::exact(4, 3, 0),
        ReadEdits::edited(4, 1, 0).with_snp(2, BasePair::T),
    ];
    let payload = encode(limits, reference, &reads);
    let chr = Reference::new("chr1", reference.to_vec());
    let records = decode_all(limits, &chr, &payload, 2);

    assert_eq!(records[0].sequence, b"GTAC");
    assert_eq!(records[0].cigar.to_string(), "4M");
    assert!(records[0].is_match());

    assert_eq!(records[1].sequence, b"ACTT");
    assert_eq!(records[1].snps.len(), 1);
    assert_eq!(records[1].snps[0].reference, BasePair::G);
    assert_eq!(records[1].cigar.to_string(), "4M");
    assert!(matches!(
        records[1].edit_path,
        EditPath::Edited {
            counts: EditCounts::DirectSnp { snps: 1 },
            ..
        }
    ));

    let reference = b"ACGTACGT";
    let reads = vec![ReadEdits::edited(4, 1, 0).with_deletion(1)];
    let payload = encode(limits, reference, &reads);
    let chr = Reference::new("chr1", reference.to_vec());
    let records = decode_all(limits, &chr, &payload, 1);
    assert_eq!(records[0].sequence, b"AGTA");
    assert_eq!(records[0].cigar.to_string(), "1M1D3M");
}

#[test]
fn test_balanced_indels() {
    let limits = CodecLimits::default();
    let reference = b"ACGTACGT";
    let reads = vec![ReadEdits::edited(4, 1, 0)
        .with_deletion(1)
        .with_insertion(3, BasePair::C)];
    let payload = encode(limits, reference, &reads);
    let chr = Reference::new("chr1", reference.to_vec());

    let mut session = DecoderSession::new(
        limits,
        false,
        DecoderConfig {
            strict_indel_balance: true,
            ..quiet()
        },
    )
    .unwrap();
    let mut source = ArithmeticDecoder::new(&payload[..]).unwrap();
    let record = session.decode_read(&mut source, &chr).unwrap();

    assert_eq!(record.sequence, b"AGTC");
    assert_eq!(record.cigar.to_string(), "1M1D2M1I");
    assert_eq!(
        record.edit_path,
        EditPath::Edited {
            counts: EditCounts::IndelTriple {
                snps: 0,
                deletions: 1,
                insertions: 1
            },
            stats: rrc_core::MergeStats {
                copied: 3,
                substituted: 0,
                inserted: 1,
                deleted: 1
            },
        }
    );
    assert_eq!(session.indel_imbalances(), 0);
}

#[test]
fn test_random_reads_round_trip() {
    let mut rng = Lcg(0x5eed);
    let limits = CodecLimits::default();
    let reference = random_reference(&mut rng, 4000);
    let reads: Vec<ReadEdits> = (0..400)
        .map(|_| random_read(&mut rng, reference.len() as u32))
        .collect();

    let payload = encode(limits, &reference, &reads);
    let chr = Reference::new("chr1", reference.clone());
    let records = decode_all(limits, &chr, &payload, reads.len());

    for (i, (read, record)) in reads.iter().zip(&records).enumerate() {
        assert_eq!(record.position, read.position, "read {i}");
        assert_eq!(record.flag, read.flag, "read {i}");
        assert_eq!(record.reverse, read.flag & 16 != 0, "read {i}");
        assert_eq!(record.is_match(), read.exact_match, "read {i}");
        assert_eq!(
            record.sequence,
            expected_sequence(read, &reference),
            "read {i}: {read:?}"
        );

        // every target byte written exactly once
        assert_eq!(record.sequence.len() as u32, read.length, "read {i}");
        if let EditPath::Edited { stats, counts } = record.edit_path {
            assert_eq!(stats.written(), read.length, "read {i}");
            assert_eq!(stats.substituted, read.snps.len() as u32, "read {i}");
            assert_eq!(stats.inserted, read.insertions.len() as u32, "read {i}");
            assert_eq!(stats.deleted, read.deletions.len() as u32, "read {i}");
            assert_eq!(counts.snps(), read.snps.len() as u32, "read {i}");
        }

        assert_eq!(record.cigar.query_len(), read.length, "read {i}");
        assert_eq!(
            record.cigar.reference_span(),
            read.length - read.insertions.len() as u32 + read.deletions.len() as u32,
            "read {i}"
        );
    }
}

#[test]
fn test_alphabet_grows_in_first_seen_order() {
    let limits = CodecLimits::default();
    let reference = vec![b'A'; 64];
    // raw deltas (pos - prev + 1): 11, 6, 6, 6, 3, 6
    let positions = [10, 15, 20, 25, 27, 32];
    let reads: Vec<ReadEdits> = positions
        .iter()
        .map(|&p| ReadEdits::exact(8, p, 0))
        .collect();
    let payload = encode(limits, &reference, &reads);

    let chr = Reference::new("chrA", reference);
    let mut session = DecoderSession::new(limits, false, quiet()).unwrap();
    let mut source = ArithmeticDecoder::new(&payload[..]).unwrap();
    for &p in &positions {
        let before = session.previous_position();
        let record = session.decode_read(&mut source, &chr).unwrap();
        assert_eq!(record.position, p);
        assert_eq!(session.previous_position(), p);
        assert!(p >= before);
    }

    let alphabet = &session.models().position_alphabet;
    assert_eq!(alphabet.cardinality(), 4);
    assert_eq!(alphabet.value_at(0).unwrap(), None);
    assert_eq!(alphabet.index_of(11), Some(1));
    assert_eq!(alphabet.index_of(6), Some(2));
    assert_eq!(alphabet.index_of(3), Some(3));
}

#[test]
fn test_chromosome_reset_restarts_positions() {
    let limits = CodecLimits::default();
    let chr1 = b"ACGTACGTACGTACGTACGT".to_vec();
    let chr2 = b"TTTTGGGGCCCCAAAA".to_vec();

    let mut encoder = ReadEncoder::new(limits, false).unwrap();
    let mut sink = ArithmeticEncoder::new(Vec::new());
    encoder.start_chromosome();
    for read in [ReadEdits::exact(4, 9, 0), ReadEdits::exact(4, 13, 0)] {
        encoder.encode_read(&mut sink, &read, &chr1).unwrap();
    }
    encoder.start_chromosome();
    for read in [
        ReadEdits::exact(4, 5, 16),
        ReadEdits::edited(4, 9, 0).with_snp(0, BasePair::A),
    ] {
        encoder.encode_read(&mut sink, &read, &chr2).unwrap();
    }
    let payload = sink.finish().unwrap().0;

    let r1 = Reference::new("chr1", chr1);
    let r2 = Reference::new("chr2", chr2);
    let mut session = DecoderSession::new(limits, false, quiet()).unwrap();
    let mut source = ArithmeticDecoder::new(&payload[..]).unwrap();

    session.start_chromosome();
    assert_eq!(session.decode_read(&mut source, &r1).unwrap().position, 9);
    assert_eq!(session.decode_read(&mut source, &r1).unwrap().sequence, b"ACGT");
    assert_eq!(session.previous_position(), 13);

    session.start_chromosome();
    assert_eq!(session.previous_position(), 0);
    // the match outcome carries across the chromosome boundary
    assert!(session.previous_match());
    let record = session.decode_read(&mut source, &r2).unwrap();
    assert_eq!((record.position, record.sequence.as_slice()), (5, &b"GGGG"[..]));
    assert!(record.reverse);
    let record = session.decode_read(&mut source, &r2).unwrap();
    assert_eq!(record.sequence, b"ACCC");
    assert_eq!(record.snps[0].reference, BasePair::C);
}

#[test]
fn test_decoding_is_deterministic() {
    let mut rng = Lcg(42);
    let limits = CodecLimits::default();
    let reference = random_reference(&mut rng, 1000);
    let reads: Vec<ReadEdits> = (0..50)
        .map(|_| random_read(&mut rng, reference.len() as u32))
        .collect();
    let payload = encode(limits, &reference, &reads);
    let chr = Reference::new("chr1", reference);

    let first = decode_all(limits, &chr, &payload, reads.len());
    let second = decode_all(limits, &chr, &payload, reads.len());
    assert_eq!(first, second);
}

#[test]
fn test_position_alphabet_ceiling_is_capacity_error() {
    let limits = CodecLimits {
        max_alphabet_cardinality: 3,
        ..CodecLimits::default()
    };
    let reference = vec![b'C'; 100];

    let mut encoder = ReadEncoder::new(limits, false).unwrap();
    let mut sink = ArithmeticEncoder::new(Vec::new());
    encoder.encode_read(&mut sink, &ReadEdits::exact(4, 10, 0), &reference).unwrap();
    encoder.encode_read(&mut sink, &ReadEdits::exact(4, 30, 0), &reference).unwrap();
    // a third distinct delta does not fit: the escape is written, the index is not
    assert!(encoder
        .encode_read(&mut sink, &ReadEdits::exact(4, 31, 0), &reference)
        .unwrap_err()
        .is_capacity());
    let payload = sink.finish().unwrap().0;

    let chr = Reference::new("chrC", reference);
    let mut session = DecoderSession::new(limits, false, quiet()).unwrap();
    let mut source = ArithmeticDecoder::new(&payload[..]).unwrap();
    session.decode_read(&mut source, &chr).unwrap();
    session.decode_read(&mut source, &chr).unwrap();
    let err = session.decode_read(&mut source, &chr).unwrap_err();
    assert!(matches!(
        err,
        CodecError::CapacityExceeded {
            what: "position alphabet cardinality",
            ..
        }
    ));
}

#[test]
fn test_match_past_reference_end_is_overrun() {
    let limits = CodecLimits::default();
    let payload = encode(limits, b"ACGTACGTAC", &[ReadEdits::exact(4, 8, 0)]);
    let chr = Reference::new("short", b"ACGTACGTAC".to_vec());

    let mut session = DecoderSession::new(limits, false, quiet()).unwrap();
    let mut source = ArithmeticDecoder::new(&payload[..]).unwrap();
    let err = session.decode_read(&mut source, &chr).unwrap_err();
    assert!(matches!(err, CodecError::ReferenceOverrun { .. }));
    assert!(err.is_corruption());
}

#[test]
fn test_truncated_stream_fails() {
    let mut rng = Lcg(7);
    let limits = CodecLimits::default();
    let reference = random_reference(&mut rng, 1000);
    let reads: Vec<ReadEdits> = (0..200)
        .map(|_| random_read(&mut rng, reference.len() as u32))
        .collect();
    let payload = encode(limits, &reference, &reads);
    let chr = Reference::new("chr1", reference);

    let mut session = DecoderSession::new(limits, false, quiet()).unwrap();
    let mut source = ArithmeticDecoder::new(&payload[..8]).unwrap();
    let err = (0..reads.len())
        .find_map(|_| session.decode_read(&mut source, &chr).err())
        .expect("decoding 200 reads from 8 bytes must fail");
    assert!(err.is_corruption() || err.is_capacity(), "{err}");
}
